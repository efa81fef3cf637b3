//! Per-host queue granularity with a single worker (the calling thread)
//! draining every host's queue in turn. No barrier-crossing parallelism;
//! this is the non-stealing predecessor of `host-steal`.

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

pub struct HostSinglePolicy {
    order: Mutex<Vec<HostId>>,
    queues: RwLock<HashMap<HostId, HostQueue>>,
}

impl HostSinglePolicy {
    pub fn new() -> Self {
        Self {
            order: Mutex::new(Vec::new()),
            queues: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for HostSinglePolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedulerPolicy for HostSinglePolicy {
    fn add_host(&self, host: HostHandle) {
        let id = host.lock().unwrap().id();
        self.order.lock().unwrap().push(id);
        self.queues.write().unwrap().insert(
            id,
            HostQueue {
                host,
                queue: Mutex::new(EventQueue::new()),
            },
        );
    }

    fn hosts(&self) -> Vec<HostHandle> {
        self.queues.read().unwrap().values().map(|hq| hq.host.clone()).collect()
    }

    fn host(&self, id: HostId) -> Option<HostHandle> {
        self.queues.read().unwrap().get(&id).map(|hq| hq.host.clone())
    }

    fn num_threads(&self) -> usize {
        0
    }

    fn push(
        &self,
        src: HostId,
        dst: HostId,
        event_time: SimulationTime,
        _barrier: SimulationTime,
        payload: TaskRef,
    ) {
        // A single inline worker drains every host in turn here — there is
        // no concurrently-running round for an inter-host event to land
        // inside of, so the causal clamp never applies.
        let queues = self.queues.read().unwrap();
        let hq = queues.get(&dst).expect("push to unregistered host");
        clamped_push(&hq.queue, src, dst, event_time, None, payload);
    }

    fn pop(&self, _thread_idx: usize, barrier: SimulationTime) -> Option<(HostHandle, Event)> {
        let order = self.order.lock().unwrap().clone();
        let queues = self.queues.read().unwrap();
        for id in order {
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
    fn test_drains_each_host_queue() {
        let policy = HostSinglePolicy::new();
        policy.add_host(host(0));
        policy.add_host(host(1));

        policy.push(HostId(0), HostId(0), SimulationTime::from_secs(2).unwrap(), SimulationTime::MAX, TaskRef::new(|_h| {}));
        policy.push(HostId(1), HostId(1), SimulationTime::from_secs(1).unwrap(), SimulationTime::MAX, TaskRef::new(|_h| {}));

        let mut seen = Vec::new();
        while let Some((_, e)) = policy.pop(0, SimulationTime::MAX) {
            seen.push(e.dst_host());
        }
        seen.sort();
        assert_eq!(seen, vec![HostId(0), HostId(1)]);
    }
}
