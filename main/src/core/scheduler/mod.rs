//! The Scheduler: the policy-agnostic synchronization core. Owns the
//! thread pool handle and forwards every operation to whichever
//! [`SchedulerPolicy`] was selected for this run.

pub mod host_single;
pub mod host_steal;
pub mod policy;
pub mod serial_global;
pub mod thread_per_host;
pub mod thread_per_thread;
pub mod thread_single;

use std::sync::Arc;

use sched_core::pool::Job;
use sched_core::WorkerPool;

pub use policy::{HostHandle, SchedulerPolicy};

use crate::core::support::configuration::SchedulerPolicyKind;
use crate::core::support::simulation_time::SimulationTime;
use crate::core::work::event::Event;
use crate::core::work::task::TaskRef;
use crate::host::host::HostId;

/// Construct the policy named by config. `n_worker_threads == 0` always
/// forces `serial-global` regardless of the configured kind, since there is
/// no pool to hand the other policies' round jobs to.
pub fn build_policy(kind: SchedulerPolicyKind, n_worker_threads: u32) -> Arc<dyn SchedulerPolicy> {
    if n_worker_threads == 0 {
        return Arc::new(serial_global::SerialGlobalPolicy::new());
    }
    let n = n_worker_threads as usize;
    match kind {
        SchedulerPolicyKind::Serial => Arc::new(serial_global::SerialGlobalPolicy::new()),
        SchedulerPolicyKind::HostSingle => Arc::new(host_single::HostSinglePolicy::new()),
        SchedulerPolicyKind::HostSteal => Arc::new(host_steal::HostStealPolicy::new(n)),
        SchedulerPolicyKind::ThreadSingle => Arc::new(thread_single::ThreadSinglePolicy::new(n)),
        SchedulerPolicyKind::ThreadPerHost => Arc::new(thread_per_host::ThreadPerHostPolicy::new(n)),
        SchedulerPolicyKind::ThreadPerThread => Arc::new(thread_per_thread::ThreadPerThreadPolicy::new(n)),
    }
}

pub struct Scheduler {
    policy: Arc<dyn SchedulerPolicy>,
    pool: Option<WorkerPool>,
    n_threads: usize,
}

impl Scheduler {
    pub fn new(policy: Arc<dyn SchedulerPolicy>) -> Self {
        let n_threads = policy.num_threads();
        let pool = if n_threads > 0 {
            Some(WorkerPool::new(n_threads))
        } else {
            None
        };
        Self {
            policy,
            pool,
            n_threads,
        }
    }

    pub fn policy(&self) -> &Arc<dyn SchedulerPolicy> {
        &self.policy
    }

    pub fn add_host(&self, host: HostHandle) {
        self.policy.add_host(host);
    }

    /// Boot every registered host, returning the `(host, time, task)`
    /// triples to push as the initial events.
    pub fn start(&self) -> Vec<(HostId, SimulationTime, TaskRef)> {
        let mut initial = Vec::new();
        for handle in self.policy.hosts() {
            let mut host = handle.lock().unwrap();
            let id = host.id();
            for (time, task) in host.boot() {
                initial.push((id, time, task));
            }
        }
        initial
    }

    pub fn push(
        &self,
        src: HostId,
        dst: HostId,
        event_time: SimulationTime,
        barrier: SimulationTime,
        payload: TaskRef,
    ) {
        self.policy.push(src, dst, event_time, barrier, payload);
    }

    pub fn pop(&self, thread_idx: usize, barrier: SimulationTime) -> Option<(HostHandle, Event)> {
        self.policy.pop(thread_idx, barrier)
    }

    /// Publish the round window and release workers from the pre-round
    /// barrier. `round_job` builds the per-thread closure run on each
    /// worker (or inline, for the serial-global / zero-thread case).
    pub fn continue_next_round<F>(&mut self, mut round_job: F)
    where
        F: FnMut(usize) + Send + Clone + 'static,
    {
        self.policy.begin_round();

        match &mut self.pool {
            Some(pool) => {
                let jobs: Vec<Job> = (0..self.n_threads)
                    .map(|tid| {
                        let mut job = round_job.clone();
                        Box::new(move || job(tid)) as Job
                    })
                    .collect();
                pool.dispatch(jobs);
            }
            None => round_job(0),
        }
    }

    /// Block until the round's workers have all drained to the barrier,
    /// then return the global minimum next-event time.
    pub fn await_next_round(&mut self) -> SimulationTime {
        if let Some(pool) = &mut self.pool {
            pool.wait();
        }
        self.policy.next_time()
    }

    pub fn finish(self) {
        if let Some(pool) = self.pool {
            pool.join();
        }
    }
}
