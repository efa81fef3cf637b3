//! Per-thread queue granularity: hosts are statically assigned to worker
//! threads round-robin at registration time, and `push` routes by
//! `hostToThread[dstHost]`. The causal clamp still applies whenever the
//! pushing and destination hosts live on different threads.

use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use super::policy::{clamped_push, HostHandle, SchedulerPolicy};
use crate::core::support::simulation_time::SimulationTime;
use crate::core::work::event::Event;
use crate::core::work::event_queue::EventQueue;
use crate::core::work::task::TaskRef;
use crate::host::host::HostId;

pub struct ThreadSinglePolicy {
    n_threads: usize,
    hosts: RwLock<HashMap<HostId, HostHandle>>,
    host_to_thread: RwLock<HashMap<HostId, usize>>,
    queues: Vec<Mutex<EventQueue>>,
    next_thread: Mutex<usize>,
}

impl ThreadSinglePolicy {
    pub fn new(n_threads: usize) -> Self {
        assert!(n_threads > 0, "thread-single requires at least one thread");
        Self {
            n_threads,
            hosts: RwLock::new(HashMap::new()),
            host_to_thread: RwLock::new(HashMap::new()),
            queues: (0..n_threads).map(|_| Mutex::new(EventQueue::new())).collect(),
            next_thread: Mutex::new(0),
        }
    }
}

impl SchedulerPolicy for ThreadSinglePolicy {
    fn add_host(&self, host: HostHandle) {
        let id = host.lock().unwrap().id();
        self.hosts.write().unwrap().insert(id, host);

        let mut next = self.next_thread.lock().unwrap();
        let tid = *next;
        *next = (*next + 1) % self.n_threads;
        self.host_to_thread.write().unwrap().insert(id, tid);
    }

    fn hosts(&self) -> Vec<HostHandle> {
        self.hosts.read().unwrap().values().cloned().collect()
    }

    fn host(&self, id: HostId) -> Option<HostHandle> {
        self.hosts.read().unwrap().get(&id).cloned()
    }

    fn num_threads(&self) -> usize {
        self.n_threads
    }

    fn push(
        &self,
        src: HostId,
        dst: HostId,
        event_time: SimulationTime,
        barrier: SimulationTime,
        payload: TaskRef,
    ) {
        let tid = *self
            .host_to_thread
            .read()
            .unwrap()
            .get(&dst)
            .expect("push to unregistered host");
        clamped_push(&self.queues[tid], src, dst, event_time, Some(barrier), payload);
    }

    fn pop(&self, thread_idx: usize, barrier: SimulationTime) -> Option<(HostHandle, Event)> {
        let mut q = self.queues[thread_idx].lock().unwrap();
        let event = q.pop_before(barrier)?;
        let host = self.host(event.dst_host())?;
        Some((host, event))
    }

    fn next_time(&self) -> SimulationTime {
        self.queues
            .iter()
            .filter_map(|q| q.lock().unwrap().next_event_time())
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
    fn test_round_robin_assignment() {
        let policy = ThreadSinglePolicy::new(2);
        policy.add_host(host(0));
        policy.add_host(host(1));
        policy.add_host(host(2));

        assert_eq!(*policy.host_to_thread.read().unwrap().get(&HostId(0)).unwrap(), 0);
        assert_eq!(*policy.host_to_thread.read().unwrap().get(&HostId(1)).unwrap(), 1);
        assert_eq!(*policy.host_to_thread.read().unwrap().get(&HostId(2)).unwrap(), 0);
    }

    #[test]
    fn test_pop_only_sees_own_thread_queue() {
        let policy = ThreadSinglePolicy::new(2);
        policy.add_host(host(0));
        policy.add_host(host(1));

        policy.push(HostId(0), HostId(0), SimulationTime::SECOND, SimulationTime::MAX, TaskRef::new(|_h| {}));
        policy.push(HostId(1), HostId(1), SimulationTime::SECOND, SimulationTime::MAX, TaskRef::new(|_h| {}));

        assert!(policy.pop(1, SimulationTime::MAX).is_none());
        let (_, e) = policy.pop(0, SimulationTime::MAX).unwrap();
        assert_eq!(e.dst_host(), HostId(0));
    }
}
