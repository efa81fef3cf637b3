//! The full routing/topology graph is out of scope: this module models
//! only the interface the core event loop needs — latency,
//! reliability, and a packet-counter hook — behind a trait, plus a minimal
//! deterministic implementation so the crate is runnable end to end.

use std::collections::HashMap;

use crate::host::host::HostId;

pub trait Topology: Send + Sync {
    /// One-way latency between `src` and `dst`, in milliseconds.
    fn get_latency(&self, src: HostId, dst: HostId) -> f64;

    /// Probability in `[0.0, 1.0]` that a packet between `src` and `dst`
    /// arrives; `1.0 - reliability` is the drop probability.
    fn get_reliability(&self, src: HostId, dst: HostId) -> f64;

    fn increment_path_packet_counter(&self, src: HostId, dst: HostId);
}

/// A topology with a uniform latency/reliability for every host pair except
/// a host talking to itself (latency 0, reliability 1), with optional
/// per-pair overrides. Sufficient to drive deterministic end-to-end runs
/// without a real topology file format, which is out of scope here.
pub struct UniformTopology {
    default_latency_ms: f64,
    default_reliability: f64,
    overrides: HashMap<(HostId, HostId), (f64, f64)>,
}

impl UniformTopology {
    pub fn new(default_latency_ms: f64, default_reliability: f64) -> Self {
        Self {
            default_latency_ms,
            default_reliability,
            overrides: HashMap::new(),
        }
    }

    pub fn set_link(&mut self, src: HostId, dst: HostId, latency_ms: f64, reliability: f64) {
        self.overrides.insert((src, dst), (latency_ms, reliability));
    }
}

impl Topology for UniformTopology {
    fn get_latency(&self, src: HostId, dst: HostId) -> f64 {
        if src == dst {
            return 0.0;
        }
        self.overrides
            .get(&(src, dst))
            .map(|(lat, _)| *lat)
            .unwrap_or(self.default_latency_ms)
    }

    fn get_reliability(&self, src: HostId, dst: HostId) -> f64 {
        if src == dst {
            return 1.0;
        }
        self.overrides
            .get(&(src, dst))
            .map(|(_, rel)| *rel)
            .unwrap_or(self.default_reliability)
    }

    fn increment_path_packet_counter(&self, _src: HostId, _dst: HostId) {
        // No per-path telemetry sink in this abstraction; a fuller topology
        // would bump a counter here for routing statistics.
    }
}
