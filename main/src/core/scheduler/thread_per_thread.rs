//! `thread-per-thread`: per-thread queue granularity with static host
//! assignment, identical in structure to [`ThreadSinglePolicy`] — this name
//! and `thread-single` describe the same queue/locality combination. Kept
//! as its own type so the policy enum has a distinct, named arm on the
//! config surface; the decision to treat it as structurally identical to
//! `thread-single` is recorded in `DESIGN.md`.

use super::policy::{HostHandle, SchedulerPolicy};
use super::thread_single::ThreadSinglePolicy;
use crate::core::support::simulation_time::SimulationTime;
use crate::core::work::event::Event;
use crate::core::work::task::TaskRef;
use crate::host::host::HostId;

pub struct ThreadPerThreadPolicy(ThreadSinglePolicy);

impl ThreadPerThreadPolicy {
    pub fn new(n_threads: usize) -> Self {
        Self(ThreadSinglePolicy::new(n_threads))
    }
}

impl SchedulerPolicy for ThreadPerThreadPolicy {
    fn add_host(&self, host: HostHandle) {
        self.0.add_host(host);
    }

    fn hosts(&self) -> Vec<HostHandle> {
        self.0.hosts()
    }

    fn host(&self, id: HostId) -> Option<HostHandle> {
        self.0.host(id)
    }

    fn num_threads(&self) -> usize {
        self.0.num_threads()
    }

    fn push(
        &self,
        src: HostId,
        dst: HostId,
        event_time: SimulationTime,
        barrier: SimulationTime,
        payload: TaskRef,
    ) {
        self.0.push(src, dst, event_time, barrier, payload);
    }

    fn pop(&self, thread_idx: usize, barrier: SimulationTime) -> Option<(HostHandle, Event)> {
        self.0.pop(thread_idx, barrier)
    }

    fn next_time(&self) -> SimulationTime {
        self.0.next_time()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::support::random::Random;
    use crate::host::host::Host;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_behaves_like_thread_single() {
        let policy = ThreadPerThreadPolicy::new(2);
        let host0 = Arc::new(Mutex::new(Host::new(HostId(0), "h0", Random::new(0), None, None)));
        policy.add_host(host0);

        policy.push(HostId(0), HostId(0), SimulationTime::SECOND, SimulationTime::MAX, TaskRef::new(|_h| {}));
        let (_, e) = policy.pop(0, SimulationTime::MAX).unwrap();
        assert_eq!(e.dst_host(), HostId(0));
    }
}
