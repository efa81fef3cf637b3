//! The Controller: global run-ahead, window computation, and the top-level
//! run loop. Owns nothing about scheduling mechanics — it only decides
//! `[windowStart, windowEnd)` each round and when to stop.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, RwLock};

use crate::core::manager::Manager;
use crate::core::support::configuration::ConfigDocument;
use crate::core::support::random::Random;
use crate::core::support::simulation_time::SimulationTime;
use crate::network::dns::Dns;
use crate::network::topology::Topology;

/// Falls back to this when no path latency has been observed yet.
fn default_min_jump_time() -> SimulationTime {
    SimulationTime::from_millis(10).expect("10ms is a valid SimulationTime")
}

pub struct ControllerConfig {
    pub min_run_ahead_config: SimulationTime,
    pub bootstrap_end_time: SimulationTime,
    pub end_time: SimulationTime,
    /// `false` forces every `updateMinRunahead` call to be a no-op — an
    /// escape hatch for reproducing runs against a fixed runahead.
    pub dynamic_runahead: bool,
    /// Multi-threaded runs start with `windowEnd = minJumpTime`; serial-global
    /// starts with `windowEnd = SIMTIME_MAX` since there is only one round
    /// barrier in effect.
    pub serial_global: bool,
}

struct WindowState {
    window_start: SimulationTime,
    window_end: SimulationTime,
    min_jump_time: Option<SimulationTime>,
    next_min_jump_time: Option<SimulationTime>,
}

/// The state the Controller shares with workers (via `Worker::with`) and the
/// Manager. Kept behind an `Arc` so worker threads can observe
/// `bootstrapEndTime` and stage runahead updates without a back-pointer into
/// the Controller itself.
pub struct ControllerShared {
    min_run_ahead_config: SimulationTime,
    bootstrap_end_time: SimulationTime,
    end_time: SimulationTime,
    dynamic_runahead: bool,
    window: RwLock<WindowState>,
    num_plugin_errors: AtomicU32,
    shutdown_requested: AtomicBool,
}

impl ControllerShared {
    pub fn new(config: ControllerConfig) -> Self {
        let window_end = if config.serial_global {
            SimulationTime::MAX
        } else {
            config.min_run_ahead_config.max(default_min_jump_time())
        };
        Self {
            min_run_ahead_config: config.min_run_ahead_config,
            bootstrap_end_time: config.bootstrap_end_time,
            end_time: config.end_time,
            dynamic_runahead: config.dynamic_runahead,
            window: RwLock::new(WindowState {
                window_start: SimulationTime::ZERO,
                window_end,
                min_jump_time: None,
                next_min_jump_time: None,
            }),
            num_plugin_errors: AtomicU32::new(0),
            shutdown_requested: AtomicBool::new(false),
        }
    }

    pub fn bootstrap_end_time(&self) -> SimulationTime {
        self.bootstrap_end_time
    }

    pub fn end_time(&self) -> SimulationTime {
        self.end_time
    }

    pub fn current_window(&self) -> (SimulationTime, SimulationTime) {
        let w = self.window.read().unwrap();
        (w.window_start, w.window_end)
    }

    /// Ask for SIGINT/SIGTERM-triggered cooperative shutdown: the current
    /// round completes naturally, but the next `finished_round` call always
    /// reports `keepRunning = false`.
    pub fn request_shutdown(&self) {
        self.shutdown_requested.store(true, Ordering::SeqCst);
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::SeqCst)
    }

    pub fn increment_plugin_errors(&self) {
        self.num_plugin_errors.fetch_add(1, Ordering::SeqCst);
    }

    pub fn num_plugin_errors(&self) -> u32 {
        self.num_plugin_errors.load(Ordering::SeqCst)
    }

    /// Stage `observed_latency` as the next round's minimum jump time if it
    /// is strictly smaller than what's already staged. Double checked: a
    /// cheap read-lock check first, a write-lock recheck before mutating,
    /// since this is called from every worker on every send.
    pub fn update_min_runahead(&self, observed_latency: SimulationTime) {
        assert!(observed_latency > SimulationTime::ZERO);

        if !self.dynamic_runahead {
            return;
        }

        let should_update = |w: &WindowState| match w.next_min_jump_time {
            Some(staged) => observed_latency < staged,
            None => true,
        };

        {
            let w = self.window.read().unwrap();
            if !should_update(&w) {
                return;
            }
        }

        let mut w = self.window.write().unwrap();
        if !should_update(&w) {
            return;
        }
        w.next_min_jump_time = Some(observed_latency);
    }

    fn get_min_time_jump(&self, staged: Option<SimulationTime>) -> SimulationTime {
        staged.unwrap_or_else(default_min_jump_time).max(self.min_run_ahead_config)
    }

    /// Promote the staged runahead, compute the next window, and decide
    /// whether another round should run.
    pub fn finished_round(&self, min_next_event_time: SimulationTime) -> (SimulationTime, SimulationTime, bool) {
        let mut w = self.window.write().unwrap();
        w.min_jump_time = w.next_min_jump_time.or(w.min_jump_time);

        let runahead = self.get_min_time_jump(w.min_jump_time);
        let new_start = min_next_event_time;
        let new_end = new_start.checked_add(runahead).unwrap_or(SimulationTime::MAX).min(self.end_time);

        w.window_start = new_start;
        w.window_end = new_end;

        let keep_running = new_start < new_end && new_start < self.end_time && !self.shutdown_requested();
        (new_start, new_end, keep_running)
    }
}

pub struct Controller {
    shared: Arc<ControllerShared>,
    random: Random,
}

impl Controller {
    pub fn new(doc: &ConfigDocument) -> Self {
        let general = &doc.general;
        let min_run_ahead_config = SimulationTime::from_millis(general.min_run_ahead_millis as u64)
            .unwrap_or(SimulationTime::ZERO);
        let bootstrap_end_time = general
            .bootstrap_end_time_seconds
            .and_then(SimulationTime::from_secs)
            .unwrap_or(SimulationTime::ZERO);
        let end_time = SimulationTime::from_secs(general.stop_time_seconds).unwrap_or(SimulationTime::MAX);
        let serial_global = general.n_worker_threads == 0
            || matches!(
                general.scheduler_policy,
                crate::core::support::configuration::SchedulerPolicyKind::Serial
            );

        let shared = Arc::new(ControllerShared::new(ControllerConfig {
            min_run_ahead_config,
            bootstrap_end_time,
            end_time,
            dynamic_runahead: true,
            serial_global,
        }));

        Self {
            shared,
            random: Random::new(general.random_seed as u64),
        }
    }

    pub fn shared(&self) -> Arc<ControllerShared> {
        Arc::clone(&self.shared)
    }

    /// Build the Manager, run the round loop to completion, and return the
    /// process exit code: `0` clean, nonzero if any plugin errored, `1` on
    /// setup failure.
    pub fn run(
        mut self,
        doc: &ConfigDocument,
        topology: Arc<dyn Topology>,
        dns: Arc<dyn Dns>,
    ) -> i32 {
        let manager_seed = self.random.next_u64();
        let manager = match Manager::new(doc, Arc::clone(&self.shared), topology, dns, manager_seed) {
            Ok(m) => m,
            Err(e) => {
                log::error!("manager setup failed: {e:#}");
                return 1;
            }
        };

        log::info!("running simulation");
        manager.run();
        log::info!("finished simulation");

        let errors = self.shared.num_plugin_errors();
        if errors > 0 {
            log::warn!("{errors} managed processes exited with a non-zero error code");
            errors as i32
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shared(serial_global: bool) -> ControllerShared {
        ControllerShared::new(ControllerConfig {
            min_run_ahead_config: SimulationTime::ZERO,
            bootstrap_end_time: SimulationTime::ZERO,
            end_time: SimulationTime::from_secs(100).unwrap(),
            dynamic_runahead: true,
            serial_global,
        })
    }

    #[test]
    fn test_initial_window_multi_threaded_uses_default_jump() {
        let c = shared(false);
        let (start, end) = c.current_window();
        assert_eq!(start, SimulationTime::ZERO);
        assert_eq!(end, SimulationTime::from_millis(10).unwrap());
    }

    #[test]
    fn test_initial_window_serial_global_spans_everything() {
        let c = shared(true);
        let (_, end) = c.current_window();
        assert_eq!(end, SimulationTime::MAX);
    }

    #[test]
    fn test_update_min_runahead_only_shrinks() {
        let c = shared(false);
        c.update_min_runahead(SimulationTime::from_millis(50).unwrap());
        c.update_min_runahead(SimulationTime::from_millis(80).unwrap());
        let (_, _, _keep) = c.finished_round(SimulationTime::ZERO);
        let (_, end) = c.current_window();
        assert_eq!(end, SimulationTime::from_millis(50).unwrap());
    }

    #[test]
    fn test_finished_round_clamps_to_end_time() {
        let c = shared(false);
        c.update_min_runahead(SimulationTime::from_secs(10).unwrap());
        let (start, end, keep) = c.finished_round(SimulationTime::from_secs(95).unwrap());
        assert_eq!(start, SimulationTime::from_secs(95).unwrap());
        assert_eq!(end, SimulationTime::from_secs(100).unwrap());
        assert!(keep);
    }

    #[test]
    fn test_finished_round_stops_at_end_time() {
        let c = shared(false);
        let (_, _, keep) = c.finished_round(SimulationTime::from_secs(100).unwrap());
        assert!(!keep);
    }

    #[test]
    fn test_request_shutdown_stops_next_round() {
        let c = shared(false);
        c.request_shutdown();
        let (_, _, keep) = c.finished_round(SimulationTime::from_secs(1).unwrap());
        assert!(!keep);
    }
}
