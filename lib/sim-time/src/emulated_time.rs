//! An instant in time as observed by guest-visible clocks: simulation time
//! plus a fixed offset so the simulation appears to start at a recent,
//! realistic wall-clock date instead of the Unix epoch.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::simulation_time::{self, CSimulationTime, SimulationTime};

pub type CEmulatedTime = u64;

/// Seconds from the Unix epoch to 00:00:00 UTC on 1 January, 2000.
pub const SIMULATION_START_SEC: u64 = 946_684_800;
pub const EMUTIME_INVALID: CEmulatedTime = u64::MAX;
pub const EMUTIME_MAX: CEmulatedTime = u64::MAX - 1;
pub const EMUTIME_MIN: CEmulatedTime = 0;

pub const EMUTIME_SIMULATION_START: CEmulatedTime =
    SIMULATION_START_SEC * simulation_time::SIMTIME_ONE_SECOND;
const _: () = assert!(
    EMUTIME_SIMULATION_START == SIMULATION_START_SEC * simulation_time::SIMTIME_ONE_SECOND
);

pub const EMUTIME_UNIX_EPOCH: CEmulatedTime = 0;

/// An instant in time (analogous to [`std::time::Instant`]) visible to
/// simulated guests. Internally represented as nanoseconds since the Unix
/// epoch.
#[derive(Copy, Clone, Eq, PartialEq, Debug, PartialOrd, Ord, Hash)]
pub struct EmulatedTime(CEmulatedTime);

impl EmulatedTime {
    pub const SIMULATION_START: Self = Self(EMUTIME_SIMULATION_START);
    pub const UNIX_EPOCH: Self = Self(EMUTIME_UNIX_EPOCH);
    pub const MAX: Self = Self(EMUTIME_MAX);
    pub const MIN: Self = Self(EMUTIME_MIN);

    pub const fn from_c_emutime(val: CEmulatedTime) -> Option<Self> {
        if val == EMUTIME_INVALID || val > EMUTIME_MAX {
            None
        } else {
            Some(Self(val))
        }
    }

    pub const fn to_c_emutime(val: Option<Self>) -> CEmulatedTime {
        match val {
            Some(v) => v.0,
            None => EMUTIME_INVALID,
        }
    }

    /// The instant `val` simulation-time units after the simulation began.
    pub fn from_abs_simtime(val: SimulationTime) -> Self {
        Self::SIMULATION_START + val
    }

    /// The simulation time elapsed since the simulation began.
    pub fn to_abs_simtime(self) -> SimulationTime {
        self.duration_since(&Self::SIMULATION_START)
    }

    pub fn duration_since(&self, earlier: &EmulatedTime) -> SimulationTime {
        self.checked_duration_since(earlier).unwrap()
    }

    pub fn checked_duration_since(&self, earlier: &EmulatedTime) -> Option<SimulationTime> {
        let d = self.0.checked_sub(earlier.0)?;
        SimulationTime::from_c_simtime(d)
    }

    pub fn saturating_duration_since(&self, earlier: &EmulatedTime) -> SimulationTime {
        self.checked_duration_since(earlier)
            .unwrap_or(SimulationTime::ZERO)
    }

    pub fn checked_add(&self, duration: SimulationTime) -> Option<EmulatedTime> {
        EmulatedTime::from_c_emutime(self.0.checked_add(CSimulationTime::from(duration))?)
    }

    pub fn checked_sub(&self, duration: SimulationTime) -> Option<EmulatedTime> {
        EmulatedTime::from_c_emutime(self.0.checked_sub(CSimulationTime::from(duration))?)
    }

    pub fn saturating_add(&self, duration: SimulationTime) -> EmulatedTime {
        self.checked_add(duration).unwrap_or(EmulatedTime::MAX)
    }

    pub fn saturating_sub(&self, duration: SimulationTime) -> EmulatedTime {
        self.checked_sub(duration)
            .unwrap_or(EmulatedTime::SIMULATION_START)
    }
}

impl std::ops::Add<SimulationTime> for EmulatedTime {
    type Output = EmulatedTime;

    fn add(self, other: SimulationTime) -> Self {
        self.checked_add(other).unwrap()
    }
}

impl std::ops::AddAssign<SimulationTime> for EmulatedTime {
    fn add_assign(&mut self, rhs: SimulationTime) {
        *self = *self + rhs;
    }
}

impl std::ops::Sub<SimulationTime> for EmulatedTime {
    type Output = EmulatedTime;

    fn sub(self, other: SimulationTime) -> Self {
        self.checked_sub(other).unwrap()
    }
}

impl std::ops::Sub<EmulatedTime> for EmulatedTime {
    type Output = SimulationTime;

    fn sub(self, other: EmulatedTime) -> Self::Output {
        self.duration_since(&other)
    }
}

impl std::ops::SubAssign<SimulationTime> for EmulatedTime {
    fn sub_assign(&mut self, rhs: SimulationTime) {
        *self = self.checked_sub(rhs).unwrap();
    }
}

/// An [`EmulatedTime`] that can be read and written atomically, used for the
/// handful of clock fields shared across threads without a surrounding lock.
#[derive(Debug)]
pub struct AtomicEmulatedTime(AtomicU64);

impl AtomicEmulatedTime {
    pub fn new(t: EmulatedTime) -> Self {
        Self(AtomicU64::new(t.0))
    }

    pub fn load(&self, order: Ordering) -> EmulatedTime {
        EmulatedTime(self.0.load(order))
    }

    pub fn store(&self, val: EmulatedTime, order: Ordering) {
        self.0.store(val.0, order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_abs_simtime() {
        assert_eq!(
            EmulatedTime::from_abs_simtime(SimulationTime::ZERO),
            EmulatedTime::SIMULATION_START
        );
        assert_eq!(
            EmulatedTime::from_abs_simtime(SimulationTime::SECOND),
            EmulatedTime::SIMULATION_START + SimulationTime::SECOND
        );
    }

    #[test]
    fn test_to_abs_simtime() {
        assert_eq!(
            EmulatedTime::SIMULATION_START.to_abs_simtime(),
            SimulationTime::ZERO
        );
        assert_eq!(
            (EmulatedTime::SIMULATION_START + SimulationTime::SECOND).to_abs_simtime(),
            SimulationTime::SECOND
        );
    }

    #[test]
    fn test_atomic_roundtrip() {
        let a = AtomicEmulatedTime::new(EmulatedTime::SIMULATION_START);
        assert_eq!(a.load(Ordering::SeqCst), EmulatedTime::SIMULATION_START);
        a.store(EmulatedTime::SIMULATION_START + SimulationTime::HOUR, Ordering::SeqCst);
        assert_eq!(
            a.load(Ordering::SeqCst),
            EmulatedTime::SIMULATION_START + SimulationTime::HOUR
        );
    }
}
