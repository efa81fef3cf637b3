//! The policy interface every scheduler policy implements, and the shared
//! causal-clamp push helper they all use.
//!
//! Modeled as a trait object rather than a function-pointer vtable: the
//! [`Scheduler`](super::Scheduler) owns one `Arc<dyn SchedulerPolicy>` and
//! forwards every operation to it.

use std::sync::{Arc, Mutex};

use crate::core::support::simulation_time::SimulationTime;
use crate::core::work::event::Event;
use crate::core::work::event_queue::EventQueue;
use crate::core::work::task::TaskRef;
use crate::host::host::{Host, HostId};

pub type HostHandle = Arc<Mutex<Host>>;

pub trait SchedulerPolicy: Send + Sync {
    fn add_host(&self, host: HostHandle);
    fn hosts(&self) -> Vec<HostHandle>;
    fn host(&self, id: HostId) -> Option<HostHandle>;
    fn num_threads(&self) -> usize;

    /// Called once at the start of every round, before any `pop`. Policies
    /// with per-thread FIFOs (host-steal) rotate them here; policies with
    /// no round-local state can rely on the default no-op.
    fn begin_round(&self) {}

    /// Enqueue a task from `src` to `dst` scheduled for `event_time`,
    /// applying the causal clamp against `barrier` when `src != dst`.
    fn push(
        &self,
        src: HostId,
        dst: HostId,
        event_time: SimulationTime,
        barrier: SimulationTime,
        payload: TaskRef,
    );

    /// Pop the next event runnable by `thread_idx` with `time < barrier`.
    fn pop(&self, thread_idx: usize, barrier: SimulationTime) -> Option<(HostHandle, Event)>;

    /// The minimum pending-event time across every queue this policy owns,
    /// or [`SimulationTime::MAX`] if all queues are empty.
    fn next_time(&self) -> SimulationTime;
}

/// Push `payload` into `queue`, clamping `event_time` up to `barrier` first
/// when the push crosses hosts and would otherwise land inside the current
/// round. Same-host pushes are never clamped — a host schedules its own
/// future the same way whether or not another round is in flight.
///
/// `barrier` is `None` for policies with no real round barrier to protect
/// (serial-global, host-single: a single inline worker drains every host in
/// turn, so there is no concurrently-running round for an inter-host event
/// to land inside of). Passing `Some(SimulationTime::MAX)` there instead
/// would clamp every inter-host event to a time that can never be popped.
pub(crate) fn clamped_push(
    queue: &Mutex<EventQueue>,
    src: HostId,
    dst: HostId,
    event_time: SimulationTime,
    barrier: Option<SimulationTime>,
    payload: TaskRef,
) {
    let time = match barrier {
        Some(barrier) if src != dst && event_time < barrier => {
            log::warn!(
                "causal clamp: {} -> {} event at {} rewritten to barrier {}",
                src,
                dst,
                event_time,
                barrier
            );
            barrier
        }
        _ => event_time,
    };

    let mut q = queue.lock().expect("event queue mutex poisoned");
    let seq = q.next_sequence();
    q.push(Event::new(time, seq, src, dst, payload));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_clamped_push_rewrites_inter_host_time() {
        let queue = Mutex::new(EventQueue::new());
        let barrier = SimulationTime::from_millis(10).unwrap();
        let early = SimulationTime::from_millis(5).unwrap();

        clamped_push(&queue, HostId(0), HostId(1), early, Some(barrier), TaskRef::new(|_h| {}));

        let mut q = queue.lock().unwrap();
        let popped = q.pop().unwrap();
        assert_eq!(popped.time(), barrier);
    }

    #[test]
    fn test_clamped_push_leaves_intra_host_time_alone() {
        let queue = Mutex::new(EventQueue::new());
        let barrier = SimulationTime::from_millis(10).unwrap();
        let early = SimulationTime::from_millis(5).unwrap();

        clamped_push(&queue, HostId(0), HostId(0), early, Some(barrier), TaskRef::new(|_h| {}));

        let mut q = queue.lock().unwrap();
        let popped = q.pop().unwrap();
        assert_eq!(popped.time(), early);
    }

    #[test]
    fn test_clamped_push_leaves_late_events_alone() {
        let queue = Mutex::new(EventQueue::new());
        let barrier = SimulationTime::from_millis(10).unwrap();
        let late = SimulationTime::from_millis(20).unwrap();

        clamped_push(&queue, HostId(0), HostId(1), late, Some(barrier), TaskRef::new(|_h| {}));

        let mut q = queue.lock().unwrap();
        let popped = q.pop().unwrap();
        assert_eq!(popped.time(), late);
    }

    #[test]
    fn test_clamped_push_with_no_barrier_never_clamps() {
        let queue = Mutex::new(EventQueue::new());
        let early = SimulationTime::from_millis(5).unwrap();

        clamped_push(&queue, HostId(0), HostId(1), early, None, TaskRef::new(|_h| {}));

        let mut q = queue.lock().unwrap();
        let popped = q.pop().unwrap();
        assert_eq!(popped.time(), early);
    }
}
