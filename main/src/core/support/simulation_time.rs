//! Re-exports of the time types shared with the rest of the workspace, kept
//! as a thin module so call sites read `support::simulation_time::*` the
//! same way they would if the types lived here directly.

pub use sim_time::emulated_time::{AtomicEmulatedTime, EmulatedTime};
pub use sim_time::simulation_time::{
    SimulationTime, SIMTIME_INVALID, SIMTIME_MAX, SIMTIME_MIN, SIMTIME_ONE_HOUR,
    SIMTIME_ONE_MICROSECOND, SIMTIME_ONE_MILLISECOND, SIMTIME_ONE_MINUTE, SIMTIME_ONE_NANOSECOND,
    SIMTIME_ONE_SECOND,
};
