//! Per-host queue granularity with a static, disjoint assignment of hosts
//! to worker threads (round-robin at registration time). Unlike
//! `host-steal`, ownership never moves once assigned.

use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use super::policy::{clamped_push, HostHandle, SchedulerPolicy};
use crate::core::support::simulation_time::SimulationTime;
use crate::core::work::event::Event;
use crate::core::work::event_queue::EventQueue;
use crate::core::work::task::TaskRef;
use crate::host::host::HostId;

struct HostQueue {
    host: HostHandle,
    queue: Mutex<EventQueue>,
}

pub struct ThreadPerHostPolicy {
    n_threads: usize,
    queues: RwLock<HashMap<HostId, HostQueue>>,
    thread_hosts: Vec<Mutex<Vec<HostId>>>,
    next_thread: Mutex<usize>,
}

impl ThreadPerHostPolicy {
    pub fn new(n_threads: usize) -> Self {
        assert!(n_threads > 0, "thread-per-host requires at least one thread");
        Self {
            n_threads,
            queues: RwLock::new(HashMap::new()),
            thread_hosts: (0..n_threads).map(|_| Mutex::new(Vec::new())).collect(),
            next_thread: Mutex::new(0),
        }
    }
}

impl SchedulerPolicy for ThreadPerHostPolicy {
    fn add_host(&self, host: HostHandle) {
        let id = host.lock().unwrap().id();
        self.queues.write().unwrap().insert(
            id,
            HostQueue {
                host,
                queue: Mutex::new(EventQueue::new()),
            },
        );

        let mut next = self.next_thread.lock().unwrap();
        let tid = *next;
        *next = (*next + 1) % self.n_threads;
        self.thread_hosts[tid].lock().unwrap().push(id);
    }

    fn hosts(&self) -> Vec<HostHandle> {
        self.queues.read().unwrap().values().map(|hq| hq.host.clone()).collect()
    }

    fn host(&self, id: HostId) -> Option<HostHandle> {
        self.queues.read().unwrap().get(&id).map(|hq| hq.host.clone())
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
        let queues = self.queues.read().unwrap();
        let hq = queues.get(&dst).expect("push to unregistered host");
        clamped_push(&hq.queue, src, dst, event_time, Some(barrier), payload);
    }

    fn pop(&self, thread_idx: usize, barrier: SimulationTime) -> Option<(HostHandle, Event)> {
        let owned = self.thread_hosts[thread_idx].lock().unwrap().clone();
        let queues = self.queues.read().unwrap();
        for id in owned {
            let hq = queues.get(&id)?;
            let mut q = hq.queue.lock().unwrap();
            if let Some(event) = q.pop_before(barrier) {
                return Some((hq.host.clone(), event));
            }
        }
        None
    }

    fn next_time(&self) -> SimulationTime {
        self.queues
            .read()
            .unwrap()
            .values()
            .filter_map(|hq| hq.queue.lock().unwrap().next_event_time())
            .min()
            .unwrap_or(SimulationTime::MAX)
    }
}
