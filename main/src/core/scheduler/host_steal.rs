//! The work-stealing policy: the hardest of the scheduling variants to get
//! right, since idle threads must be able to take over another thread's
//! host without racing the owning thread or violating the round barrier.
//!
//! Each thread owns two FIFOs of hosts (`unprocessed`, `processed`) and at
//! most one `running_host`. A thread drains its own `unprocessed` FIFO
//! host-by-host; once empty, it steals a host from another thread's
//! `unprocessed` FIFO, migrating it to itself. Stealing always locks the
//! pair of thread states in ascending thread-index order to avoid deadlock.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, RwLock};

use super::policy::{clamped_push, HostHandle, SchedulerPolicy};
use crate::core::support::simulation_time::SimulationTime;
use crate::core::work::event::Event;
use crate::core::work::event_queue::EventQueue;
use crate::core::work::task::TaskRef;
use crate::host::host::HostId;

struct ThreadState {
    unprocessed: VecDeque<HostId>,
    processed: VecDeque<HostId>,
    running_host: Option<HostId>,
}

impl ThreadState {
    fn new() -> Self {
        Self {
            unprocessed: VecDeque::new(),
            processed: VecDeque::new(),
            running_host: None,
        }
    }
}

struct HostEntry {
    host: HostHandle,
    queue: Mutex<EventQueue>,
}

pub struct HostStealPolicy {
    n_threads: usize,
    hosts: RwLock<HashMap<HostId, HostEntry>>,
    host_to_thread: RwLock<HashMap<HostId, usize>>,
    threads: Vec<Mutex<ThreadState>>,
    next_assign: Mutex<usize>,
}

impl HostStealPolicy {
    pub fn new(n_threads: usize) -> Self {
        assert!(n_threads > 0, "host-steal requires at least one thread");
        Self {
            n_threads,
            hosts: RwLock::new(HashMap::new()),
            host_to_thread: RwLock::new(HashMap::new()),
            threads: (0..n_threads).map(|_| Mutex::new(ThreadState::new())).collect(),
            next_assign: Mutex::new(0),
        }
    }

    /// Lock `self.threads[a]` and `self.threads[b]` together, always
    /// acquiring the lower-numbered thread's lock first, returning the
    /// guards in `(a, b)` order regardless of acquisition order.
    fn lock_pair(&self, a: usize, b: usize) -> (MutexGuard<'_, ThreadState>, MutexGuard<'_, ThreadState>) {
        assert_ne!(a, b);
        if a < b {
            let ga = self.threads[a].lock().unwrap();
            let gb = self.threads[b].lock().unwrap();
            (ga, gb)
        } else {
            let gb = self.threads[b].lock().unwrap();
            let ga = self.threads[a].lock().unwrap();
            (ga, gb)
        }
    }

    fn migrate_host(&self, host_id: HostId, from_thread: usize, to_thread: usize) {
        self.host_to_thread.write().unwrap().insert(host_id, to_thread);
        let hosts = self.hosts.read().unwrap();
        if let Some(entry) = hosts.get(&host_id) {
            entry.host.lock().unwrap().migrate(from_thread, to_thread);
        }
    }

    /// Drain `thread_idx`'s own assigned hosts, returning the first
    /// runnable event found. Returns `None` once `unprocessed` is empty and
    /// no running host has a runnable event.
    fn try_own(&self, thread_idx: usize, barrier: SimulationTime) -> Option<(HostHandle, Event)> {
        loop {
            let mut ts = self.threads[thread_idx].lock().unwrap();
            if ts.running_host.is_none() {
                match ts.unprocessed.pop_front() {
                    Some(h) => ts.running_host = Some(h),
                    None => return None,
                }
            }
            let running = ts.running_host.unwrap();
            drop(ts);

            let hosts = self.hosts.read().unwrap();
            let entry = hosts.get(&running).expect("running host missing from registry");
            let host_handle = entry.host.clone();
            let mut q = entry.queue.lock().unwrap();
            let found = q.pop_before(barrier);
            drop(q);
            drop(hosts);

            if let Some(event) = found {
                return Some((host_handle, event));
            }

            let mut ts = self.threads[thread_idx].lock().unwrap();
            ts.processed.push_back(running);
            ts.running_host = None;
        }
    }

    /// Attempt to steal from every other thread in ascending-offset order.
    fn try_steal(&self, thread_idx: usize, barrier: SimulationTime) -> Option<(HostHandle, Event)> {
        for offset in 1..self.n_threads {
            let victim = (thread_idx + offset) % self.n_threads;
            if let Some(result) = self.try_steal_from(thread_idx, victim, barrier) {
                return Some(result);
            }
        }
        None
    }

    fn try_steal_from(
        &self,
        self_idx: usize,
        victim_idx: usize,
        barrier: SimulationTime,
    ) -> Option<(HostHandle, Event)> {
        loop {
            let (mut self_ts, mut victim_ts) = self.lock_pair(self_idx, victim_idx);
            let stolen = match victim_ts.unprocessed.pop_front() {
                Some(h) => h,
                None => return None,
            };
            debug_assert!(
                self_ts.running_host.is_none(),
                "a stealing thread must not already be running a host"
            );
            debug_assert_ne!(
                Some(stolen),
                victim_ts.running_host,
                "a stolen host must never be the victim's running host"
            );
            self_ts.running_host = Some(stolen);
            drop(victim_ts);
            drop(self_ts);

            self.migrate_host(stolen, victim_idx, self_idx);

            let hosts = self.hosts.read().unwrap();
            let entry = hosts.get(&stolen).expect("stolen host missing from registry");
            let host_handle = entry.host.clone();
            let mut q = entry.queue.lock().unwrap();
            let found = q.pop_before(barrier);
            drop(q);
            drop(hosts);

            if let Some(event) = found {
                return Some((host_handle, event));
            }

            let mut self_ts = self.threads[self_idx].lock().unwrap();
            self_ts.processed.push_back(stolen);
            self_ts.running_host = None;
        }
    }
}

impl SchedulerPolicy for HostStealPolicy {
    fn add_host(&self, host: HostHandle) {
        let id = host.lock().unwrap().id();
        self.hosts.write().unwrap().insert(
            id,
            HostEntry {
                host,
                queue: Mutex::new(EventQueue::new()),
            },
        );

        let tid = {
            let mut next = self.next_assign.lock().unwrap();
            let tid = *next % self.n_threads;
            *next += 1;
            tid
        };
        self.host_to_thread.write().unwrap().insert(id, tid);
        self.threads[tid].lock().unwrap().unprocessed.push_back(id);
    }

    fn hosts(&self) -> Vec<HostHandle> {
        self.hosts.read().unwrap().values().map(|e| e.host.clone()).collect()
    }

    fn host(&self, id: HostId) -> Option<HostHandle> {
        self.hosts.read().unwrap().get(&id).map(|e| e.host.clone())
    }

    fn num_threads(&self) -> usize {
        self.n_threads
    }

    fn begin_round(&self) {
        for t in &self.threads {
            let mut ts = t.lock().unwrap();
            debug_assert!(ts.running_host.is_none(), "a host is still running across a round boundary");
            ts.unprocessed = std::mem::take(&mut ts.processed);
        }
    }

    fn push(
        &self,
        src: HostId,
        dst: HostId,
        event_time: SimulationTime,
        barrier: SimulationTime,
        payload: TaskRef,
    ) {
        let hosts = self.hosts.read().unwrap();
        let entry = hosts.get(&dst).expect("push to unregistered host");
        clamped_push(&entry.queue, src, dst, event_time, Some(barrier), payload);
    }

    fn pop(&self, thread_idx: usize, barrier: SimulationTime) -> Option<(HostHandle, Event)> {
        if let Some(result) = self.try_own(thread_idx, barrier) {
            return Some(result);
        }
        self.try_steal(thread_idx, barrier)
    }

    fn next_time(&self) -> SimulationTime {
        self.hosts
            .read()
            .unwrap()
            .values()
            .filter_map(|e| e.queue.lock().unwrap().next_event_time())
            .min()
            .unwrap_or(SimulationTime::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::support::random::Random;
    use crate::host::host::Host;
    use std::sync::Arc;

    fn host(id: u32) -> HostHandle {
        Arc::new(Mutex::new(Host::new(HostId(id), format!("h{id}"), Random::new(id as u64), None, None)))
    }

    #[test]
    fn test_initial_round_robin_assignment() {
        let policy = HostStealPolicy::new(2);
        policy.add_host(host(0));
        policy.add_host(host(1));
        policy.add_host(host(2));

        assert_eq!(*policy.host_to_thread.read().unwrap().get(&HostId(0)).unwrap(), 0);
        assert_eq!(*policy.host_to_thread.read().unwrap().get(&HostId(1)).unwrap(), 1);
        assert_eq!(*policy.host_to_thread.read().unwrap().get(&HostId(2)).unwrap(), 0);
    }

    #[test]
    fn test_steal_drains_victim_and_migrates() {
        let policy = HostStealPolicy::new(2);
        policy.add_host(host(0)); // thread 0
        policy.add_host(host(1)); // thread 1

        policy.push(HostId(1), HostId(1), SimulationTime::SECOND, SimulationTime::MAX, TaskRef::new(|_h| {}));

        // thread 0 has no work of its own; it should steal host 1 from thread 1.
        let (host_handle, event) = policy.pop(0, SimulationTime::MAX).expect("steal should find the event");
        assert_eq!(event.dst_host(), HostId(1));
        assert_eq!(host_handle.lock().unwrap().id(), HostId(1));
        assert_eq!(*policy.host_to_thread.read().unwrap().get(&HostId(1)).unwrap(), 0);

        // host 1 is now owned by thread 0; thread 1 has nothing left to steal.
        assert!(policy.pop(1, SimulationTime::MAX).is_none());
    }

    #[test]
    fn test_begin_round_rotates_fifos() {
        let policy = HostStealPolicy::new(1);
        policy.add_host(host(0));
        policy.push(HostId(0), HostId(0), SimulationTime::SECOND, SimulationTime::MAX, TaskRef::new(|_h| {}));

        assert!(policy.pop(0, SimulationTime::MAX).is_some());
        // host 0 is now in `processed`; nothing left to pop this round.
        assert!(policy.pop(0, SimulationTime::MAX).is_none());

        policy.push(HostId(0), HostId(0), SimulationTime::from_secs(2).unwrap(), SimulationTime::MAX, TaskRef::new(|_h| {}));
        policy.begin_round();
        assert!(policy.pop(0, SimulationTime::MAX).is_some());
    }

    #[test]
    fn test_next_time_empty_queue() {
        let policy = HostStealPolicy::new(1);
        policy.add_host(host(0));
        assert_eq!(policy.next_time(), SimulationTime::MAX);
    }
}
