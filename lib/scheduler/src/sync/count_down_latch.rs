use std::sync::{Arc, Condvar, Mutex};

/// A latch counter.
///
/// If a counter is cloned, the clone inherits the counter's state for the
/// current generation: cloning after counting down means the clone is also
/// considered counted-down for this generation; cloning before counting down
/// means the clone must also count down this generation.
#[derive(Debug)]
pub struct LatchCounter {
    inner: Arc<LatchInner>,
    generation: usize,
}

/// A latch waiter. Clone semantics mirror [`LatchCounter`].
#[derive(Debug)]
pub struct LatchWaiter {
    inner: Arc<LatchInner>,
    generation: usize,
}

#[derive(Debug)]
struct LatchInner {
    lock: Mutex<LatchState>,
    cond: Condvar,
}

#[derive(Debug)]
struct LatchState {
    generation: usize,
    counters: usize,
    waiters: usize,
    total_counters: usize,
    total_waiters: usize,
}

/// Build a linked counter/waiter pair. Both halves can be cloned to add more
/// participants to the current and future generations.
pub fn build_count_down_latch() -> (LatchCounter, LatchWaiter) {
    let inner = Arc::new(LatchInner {
        lock: Mutex::new(LatchState {
            generation: 0,
            counters: 1,
            waiters: 1,
            total_counters: 1,
            total_waiters: 1,
        }),
        cond: Condvar::new(),
    });

    let counter = LatchCounter {
        inner: Arc::clone(&inner),
        generation: 0,
    };
    let waiter = LatchWaiter {
        inner,
        generation: 0,
    };

    (counter, waiter)
}

impl LatchState {
    fn advance_generation(&mut self) {
        debug_assert_eq!(self.counters, 0);
        debug_assert_eq!(self.waiters, 0);
        self.counters = self.total_counters;
        self.waiters = self.total_waiters;
        self.generation = self.generation.wrapping_add(1);
    }
}

impl LatchCounter {
    /// Decrement the count, waking waiters if it reaches zero. Must not be
    /// called again for the same generation before all waiters have
    /// returned from [`LatchWaiter::wait`], or this panics.
    pub fn count_down(&mut self) {
        let counters;
        {
            let mut lock = self.inner.lock.lock().unwrap();
            if self.generation != lock.generation {
                let latch_gen = lock.generation;
                drop(lock);
                panic!(
                    "counter generation does not match latch generation ({} != {})",
                    self.generation, latch_gen
                );
            }
            lock.counters = lock.counters.checked_sub(1).unwrap();
            counters = lock.counters;
        }

        if counters == 0 {
            self.inner.cond.notify_all();
        }
        self.generation = self.generation.wrapping_add(1);
    }
}

impl LatchWaiter {
    /// Block until the latch count reaches zero for the current generation.
    pub fn wait(&mut self) {
        {
            let lock = self.inner.lock.lock().unwrap();
            let mut lock = self
                .inner
                .cond
                .wait_while(lock, |x| self.generation != x.generation || x.counters > 0)
                .unwrap();

            lock.waiters = lock.waiters.checked_sub(1).unwrap();
            if lock.waiters == 0 {
                lock.advance_generation();
            }
        }
        self.generation = self.generation.wrapping_add(1);
    }
}

impl Clone for LatchCounter {
    fn clone(&self) -> Self {
        let mut lock = self.inner.lock.lock().unwrap();
        lock.total_counters = lock.total_counters.checked_add(1).unwrap();
        if self.generation == lock.generation {
            lock.counters = lock.counters.checked_add(1).unwrap();
        }
        LatchCounter {
            inner: Arc::clone(&self.inner),
            generation: self.generation,
        }
    }
}

impl Clone for LatchWaiter {
    fn clone(&self) -> Self {
        let mut lock = self.inner.lock.lock().unwrap();
        lock.total_waiters = lock.total_waiters.checked_add(1).unwrap();
        if self.generation == lock.generation {
            lock.waiters = lock.waiters.checked_add(1).unwrap();
        }
        LatchWaiter {
            inner: Arc::clone(&self.inner),
            generation: self.generation,
        }
    }
}

impl Drop for LatchCounter {
    fn drop(&mut self) {
        let mut lock = self.inner.lock.lock().unwrap();
        lock.total_counters = lock.total_counters.checked_sub(1).unwrap();
        if self.generation == lock.generation {
            lock.counters = lock.counters.checked_sub(1).unwrap();
        }
        if lock.counters == 0 {
            self.inner.cond.notify_all();
        }
    }
}

impl Drop for LatchWaiter {
    fn drop(&mut self) {
        let mut lock = self.inner.lock.lock().unwrap();
        lock.total_waiters = lock.total_waiters.checked_sub(1).unwrap();
        if self.generation == lock.generation {
            lock.waiters = lock.waiters.checked_sub(1).unwrap();
        }
        if lock.waiters == 0 && lock.counters == 0 {
            lock.advance_generation();
        }
    }
}
