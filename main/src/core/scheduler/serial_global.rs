//! The simplest policy: a single global priority queue, one worker (the
//! calling thread), no barrier beyond the outer round loop. Forced whenever
//! `nWorkers == 0`.

use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use super::policy::{clamped_push, HostHandle, SchedulerPolicy};
use crate::core::support::simulation_time::SimulationTime;
use crate::core::work::event::Event;
use crate::core::work::event_queue::EventQueue;
use crate::core::work::task::TaskRef;
use crate::host::host::HostId;

pub struct SerialGlobalPolicy {
    hosts: RwLock<HashMap<HostId, HostHandle>>,
    queue: Mutex<EventQueue>,
}

impl SerialGlobalPolicy {
    pub fn new() -> Self {
        Self {
            hosts: RwLock::new(HashMap::new()),
            queue: Mutex::new(EventQueue::new()),
        }
    }
}

impl Default for SerialGlobalPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedulerPolicy for SerialGlobalPolicy {
    fn add_host(&self, host: HostHandle) {
        let id = host.lock().unwrap().id();
        self.hosts.write().unwrap().insert(id, host);
    }

    fn hosts(&self) -> Vec<HostHandle> {
        self.hosts.read().unwrap().values().cloned().collect()
    }

    fn host(&self, id: HostId) -> Option<HostHandle> {
        self.hosts.read().unwrap().get(&id).cloned()
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
        clamped_push(&self.queue, src, dst, event_time, None, payload);
    }

    fn pop(&self, _thread_idx: usize, barrier: SimulationTime) -> Option<(HostHandle, Event)> {
        let mut q = self.queue.lock().unwrap();
        let event = q.pop_before(barrier)?;
        let host = self.host(event.dst_host())?;
        Some((host, event))
    }

    fn next_time(&self) -> SimulationTime {
        self.queue
            .lock()
            .unwrap()
            .next_event_time()
            .unwrap_or(SimulationTime::MAX)
    }
}
