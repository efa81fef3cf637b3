//! A small persistent worker pool used to drive one simulation round per
//! dispatch.
//!
//! Each worker thread parks on a channel between rounds. [`WorkerPool::dispatch`]
//! sends one job to every worker and returns immediately; [`WorkerPool::wait`]
//! blocks until every dispatched job has run and counted down the round's
//! finish latch. Sending `None` (via [`WorkerPool::join`]) tells a worker to
//! exit its loop, mirroring a `taskFn == NULL` shutdown signal.
//!
//! ```
//! use sched_core::pool::WorkerPool;
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use std::sync::Arc;
//!
//! let counter = Arc::new(AtomicU32::new(0));
//! let mut pool = WorkerPool::new(4);
//!
//! for _ in 0..3 {
//!     let jobs = (0..4)
//!         .map(|_| {
//!             let counter = Arc::clone(&counter);
//!             Box::new(move || {
//!                 counter.fetch_add(1, Ordering::SeqCst);
//!             }) as Box<dyn FnOnce() + Send>
//!         })
//!         .collect();
//!     pool.dispatch(jobs);
//!     pool.wait();
//! }
//!
//! assert_eq!(counter.load(Ordering::SeqCst), 12);
//! pool.join();
//! ```

use crossbeam::channel::{unbounded, Sender};

use crate::sync::{build_count_down_latch, LatchCounter, LatchWaiter};

pub type Job = Box<dyn FnOnce() + Send + 'static>;

pub struct WorkerPool {
    n: usize,
    senders: Vec<Sender<Option<Job>>>,
    handles: Vec<std::thread::JoinHandle<()>>,
    finish_waiter: LatchWaiter,
}

impl WorkerPool {
    /// Spawn `n` persistent worker threads. `n == 0` is legal and produces a
    /// pool with no background threads, for callers (such as the
    /// serial-global scheduler policy) that run everything inline instead.
    pub fn new(n: usize) -> Self {
        let (finish_counter, finish_waiter) = build_count_down_latch();

        let mut senders = Vec::with_capacity(n);
        let mut handles = Vec::with_capacity(n);

        for _ in 0..n {
            let (tx, rx) = unbounded::<Option<Job>>();
            let mut fc = finish_counter.clone();
            let handle = std::thread::Builder::new()
                .name("worker".into())
                .spawn(move || {
                    while let Ok(Some(job)) = rx.recv() {
                        job();
                        fc.count_down();
                    }
                })
                .expect("failed to spawn worker thread");
            senders.push(tx);
            handles.push(handle);
        }

        // each worker thread holds its own clone; the original's job here is
        // done, and keeping it alive would permanently block `wait()` since
        // it would never count itself down.
        drop(finish_counter);

        Self {
            n,
            senders,
            handles,
            finish_waiter,
        }
    }

    pub fn num_workers(&self) -> usize {
        self.n
    }

    /// Send exactly one job to each worker. `jobs.len()` must equal
    /// [`WorkerPool::num_workers`].
    pub fn dispatch(&mut self, mut jobs: Vec<Job>) {
        assert_eq!(jobs.len(), self.n, "one job per worker is required");
        for (tx, job) in self.senders.iter().zip(jobs.drain(..)) {
            tx.send(Some(job)).expect("worker thread exited early");
        }
    }

    /// Block until every job dispatched this round has completed.
    pub fn wait(&mut self) {
        self.finish_waiter.wait();
    }

    /// Signal every worker to exit and join their threads.
    pub fn join(mut self) {
        for tx in &self.senders {
            let _ = tx.send(None);
        }
        for h in self.handles.drain(..) {
            let _ = h.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_no_join() {
        let pool = WorkerPool::new(4);
        drop(pool);
    }

    #[test]
    fn test_run_rounds() {
        let counter = Arc::new(AtomicU32::new(0));
        let mut pool = WorkerPool::new(4);

        for _ in 0..10 {
            let jobs: Vec<Job> = (0..4)
                .map(|_| {
                    let counter = Arc::clone(&counter);
                    Box::new(move || {
                        counter.fetch_add(1, Ordering::SeqCst);
                    }) as Job
                })
                .collect();
            pool.dispatch(jobs);
            pool.wait();
        }

        assert_eq!(counter.load(Ordering::SeqCst), 40);
        pool.join();
    }

    #[test]
    fn test_zero_workers() {
        let pool = WorkerPool::new(0);
        assert_eq!(pool.num_workers(), 0);
        pool.join();
    }

    #[test]
    #[should_panic]
    fn test_panic_propagates_from_dispatch_count_mismatch() {
        let mut pool = WorkerPool::new(2);
        let jobs: Vec<Job> = vec![Box::new(|| {})];
        pool.dispatch(jobs);
    }
}
