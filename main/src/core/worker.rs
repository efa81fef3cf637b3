//! The worker thread-local context and the public operations host/process
//! code reaches through it.
//!
//! A `Worker` is installed into thread-local storage for the duration of a
//! round on whichever thread runs it (a pool thread, or the calling thread
//! for the serial-global / zero-worker case) and torn down at round's end.
//! Event payloads never receive the context directly — they reach it
//! through the free functions below via [`Worker::with`], the safe
//! thread-local accessor pattern.

use std::cell::RefCell;
use std::sync::Arc;

use crate::core::controller::ControllerShared;
use crate::core::scheduler::SchedulerPolicy;
use crate::core::support::simulation_time::{EmulatedTime, SimulationTime, SIMTIME_ONE_MILLISECOND};
use crate::core::work::task::TaskRef;
use crate::host::host::{Host, HostId};
use crate::host::packet::Packet;
use crate::network::topology::Topology;

pub struct Clock {
    pub now: SimulationTime,
    pub last: SimulationTime,
    pub barrier: SimulationTime,
}

pub struct WorkerContext {
    pub thread_idx: usize,
    pub clock: Clock,
    pub active_host: Option<HostId>,
    /// Points at the `Host` whose `Mutex` `run_round` currently holds locked
    /// for event execution, valid only between the two `Worker::with` calls
    /// bracketing `event.execute` below. Lets host-subsystem callbacks
    /// (`send_packet`) reach the active host's state without re-locking the
    /// mutex the caller up the stack already holds.
    active_host_ptr: Option<*mut Host>,
    policy: Arc<dyn SchedulerPolicy>,
    topology: Arc<dyn Topology>,
    controller: Arc<ControllerShared>,
}

thread_local! {
    static WORKER: RefCell<Option<WorkerContext>> = const { RefCell::new(None) };
}

pub struct Worker;

impl Worker {
    /// Run `f` with this thread's worker context, if one is installed.
    /// Returns `None` off-worker instead of panicking, so callers that may
    /// run both on and off a worker thread (tests, tooling) can branch.
    pub fn with<F, O>(f: F) -> Option<O>
    where
        F: FnOnce(&mut WorkerContext) -> O,
    {
        WORKER.with(|w| w.borrow_mut().as_mut().map(f))
    }

    fn install(ctx: WorkerContext) {
        WORKER.with(|w| *w.borrow_mut() = Some(ctx));
    }

    fn clear() {
        WORKER.with(|w| *w.borrow_mut() = None);
    }
}

/// Round-trip a latency in fractional milliseconds to a simulation-time
/// duration, rounding up: `deliverTime = clock.now + ceil(latency * 1ms)`.
fn latency_ms_to_simtime(latency_ms: f64) -> SimulationTime {
    let nanos = (latency_ms * SIMTIME_ONE_MILLISECOND as f64).ceil();
    SimulationTime::from_nanos(nanos.max(0.0) as u64).unwrap_or(SimulationTime::MAX)
}

/// Resolve src/dst to addresses (opaque here), query the topology
/// for reliability and latency, sample the active host's RNG to decide
/// whether to drop, and — if not dropped — schedule a delivery event.
pub fn send_packet(packet: Packet) {
    Worker::with(|ctx| {
        let src = packet.src;
        let dst = packet.dst;
        let latency_ms = ctx.topology.get_latency(src, dst);
        let reliability = ctx.topology.get_reliability(src, dst);
        let bootstrap_active = ctx.clock.now < ctx.controller.bootstrap_end_time();

        let dropped = if packet.is_control || bootstrap_active {
            false
        } else {
            assert_eq!(
                ctx.active_host,
                Some(src),
                "sendPacket called with src other than the currently executing host"
            );
            let host_ptr = ctx
                .active_host_ptr
                .expect("sendPacket called while no host is locked for execution");
            // SAFETY: `host_ptr` was derived from the `MutexGuard<Host>` that
            // `run_round` holds locked on this thread for the entire duration
            // of the event currently executing, and is cleared before that
            // guard drops. `src` is asserted above to be that same active
            // host, so re-locking its mutex here (as a fresh
            // `ctx.policy.host(src).lock()` would) would deadlock on this
            // thread instead of reaching it.
            let host = unsafe { &mut *host_ptr };
            host.get_random().next_f64() >= reliability
        };

        if dropped {
            log::debug!("packet {} -> {} dropped (PDS_INET_DROPPED)", src, dst);
            return;
        }

        let deliver_time = ctx.clock.now + latency_ms_to_simtime(latency_ms);
        let delivered = packet.clone();
        ctx.policy.push(
            src,
            dst,
            deliver_time,
            ctx.clock.barrier,
            TaskRef::new(move |_host| {
                let _ = &delivered;
            }),
        );
        ctx.topology.increment_path_packet_counter(src, dst);
        let latency = latency_ms_to_simtime(latency_ms);
        if latency > SimulationTime::ZERO {
            ctx.controller.update_min_runahead(latency);
        }
    });
}

/// Schedule `task` to run against the active host after `delay`.
pub fn schedule_task(task: TaskRef, delay: SimulationTime) {
    Worker::with(|ctx| {
        let host = ctx.active_host.expect("scheduleTask called without an active host");
        let time = ctx.clock.now + delay;
        ctx.policy.push(host, host, time, ctx.clock.barrier, task);
    });
}

pub fn get_current_time() -> SimulationTime {
    Worker::with(|ctx| ctx.clock.now).expect("getCurrentTime called off a worker thread")
}

pub fn get_emulated_time() -> EmulatedTime {
    EmulatedTime::from_abs_simtime(get_current_time())
}

pub fn update_min_time_jump(latency: SimulationTime) {
    Worker::with(|ctx| ctx.controller.update_min_runahead(latency));
}

pub fn is_bootstrap_active() -> bool {
    Worker::with(|ctx| ctx.clock.now < ctx.controller.bootstrap_end_time()).unwrap_or(false)
}

/// Drive one round on `thread_idx`: install the worker context, pop and
/// execute events with `time < end` until none remain, then tear the
/// context down. This is the body every scheduler policy's round job runs.
pub fn run_round(
    thread_idx: usize,
    start: SimulationTime,
    end: SimulationTime,
    policy: Arc<dyn SchedulerPolicy>,
    topology: Arc<dyn Topology>,
    controller: Arc<ControllerShared>,
) {
    Worker::install(WorkerContext {
        thread_idx,
        clock: Clock {
            now: start,
            last: start,
            barrier: end,
        },
        active_host: None,
        active_host_ptr: None,
        policy: Arc::clone(&policy),
        topology,
        controller,
    });

    loop {
        let Some((host_handle, event)) = policy.pop(thread_idx, end) else {
            break;
        };

        Worker::with(|ctx| {
            assert!(
                ctx.clock.barrier == end && event.time() >= start && event.time() < end,
                "event executed outside its round window"
            );
            ctx.clock.now = event.time();
            ctx.active_host = Some(event.dst_host());
        });

        {
            let mut host = host_handle.lock().unwrap();
            Worker::with(|ctx| ctx.active_host_ptr = Some(&mut *host as *mut Host));
            event.execute(&mut host);
            Worker::with(|ctx| ctx.active_host_ptr = None);
        }

        Worker::with(|ctx| {
            ctx.clock.last = ctx.clock.now;
            ctx.active_host = None;
        });
    }

    Worker::clear();
}
