//! Deals with durations and instants relative to the start of a simulation.

use std::time::Duration;

/// A moment in time, or a duration, measured in nanoseconds since the start of
/// the simulation (`t = 0`).
///
/// Two sentinel values are reserved and excluded from the valid range:
/// [`SimulationTime::INVALID`] (all bits set) and anything larger than
/// [`SimulationTime::MAX`].
#[derive(Copy, Clone, Eq, PartialEq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct SimulationTime(u64);

/// The raw integer representation used at the edges of this type (config
/// parsing, FFI-shaped call sites, etc).
pub type CSimulationTime = u64;

pub const SIMTIME_ONE_NANOSECOND: CSimulationTime = 1;
pub const SIMTIME_ONE_MICROSECOND: CSimulationTime = 1000 * SIMTIME_ONE_NANOSECOND;
pub const SIMTIME_ONE_MILLISECOND: CSimulationTime = 1000 * SIMTIME_ONE_MICROSECOND;
pub const SIMTIME_ONE_SECOND: CSimulationTime = 1000 * SIMTIME_ONE_MILLISECOND;
pub const SIMTIME_ONE_MINUTE: CSimulationTime = 60 * SIMTIME_ONE_SECOND;
pub const SIMTIME_ONE_HOUR: CSimulationTime = 60 * SIMTIME_ONE_MINUTE;

pub const SIMTIME_INVALID: CSimulationTime = u64::MAX;
pub const SIMTIME_MAX: CSimulationTime = u64::MAX - 1;
pub const SIMTIME_MIN: CSimulationTime = 0;

impl SimulationTime {
    pub const ZERO: Self = Self(0);
    pub const NANOSECOND: Self = Self(SIMTIME_ONE_NANOSECOND);
    pub const MICROSECOND: Self = Self(SIMTIME_ONE_MICROSECOND);
    pub const MILLISECOND: Self = Self(SIMTIME_ONE_MILLISECOND);
    pub const SECOND: Self = Self(SIMTIME_ONE_SECOND);
    pub const MINUTE: Self = Self(SIMTIME_ONE_MINUTE);
    pub const HOUR: Self = Self(SIMTIME_ONE_HOUR);

    pub const MIN: Self = Self(SIMTIME_MIN);
    pub const MAX: Self = Self(SIMTIME_MAX);

    /// Construct from a raw nanosecond count, rejecting the sentinel and
    /// out-of-range values.
    pub const fn from_c_simtime(val: CSimulationTime) -> Option<Self> {
        if val == SIMTIME_INVALID || val > SIMTIME_MAX {
            None
        } else {
            Some(Self(val))
        }
    }

    /// Convert back to the raw sentinel-carrying representation.
    pub const fn to_c_simtime(val: Option<Self>) -> CSimulationTime {
        match val {
            Some(v) => v.0,
            None => SIMTIME_INVALID,
        }
    }

    pub const fn as_nanos(&self) -> u64 {
        self.0
    }

    pub const fn as_micros(&self) -> u64 {
        self.0 / SIMTIME_ONE_MICROSECOND
    }

    pub const fn as_millis(&self) -> u64 {
        self.0 / SIMTIME_ONE_MILLISECOND
    }

    pub const fn as_secs(&self) -> u64 {
        self.0 / SIMTIME_ONE_SECOND
    }

    pub const fn from_nanos(nanos: u64) -> Option<Self> {
        Self::from_c_simtime(nanos)
    }

    pub const fn from_millis(millis: u64) -> Option<Self> {
        match millis.checked_mul(SIMTIME_ONE_MILLISECOND) {
            Some(n) => Self::from_c_simtime(n),
            None => None,
        }
    }

    pub const fn from_secs(secs: u64) -> Option<Self> {
        match secs.checked_mul(SIMTIME_ONE_SECOND) {
            Some(n) => Self::from_c_simtime(n),
            None => None,
        }
    }

    pub fn checked_add(&self, other: Self) -> Option<Self> {
        Self::from_c_simtime(self.0.checked_add(other.0)?)
    }

    pub fn checked_sub(&self, other: Self) -> Option<Self> {
        Self::from_c_simtime(self.0.checked_sub(other.0)?)
    }

    pub fn saturating_add(&self, other: Self) -> Self {
        match self.checked_add(other) {
            Some(t) => t,
            None => Self::MAX,
        }
    }

    pub fn saturating_sub(&self, other: Self) -> Self {
        match self.checked_sub(other) {
            Some(t) => t,
            None => Self::ZERO,
        }
    }
}

impl std::convert::TryFrom<Duration> for SimulationTime {
    type Error = ();

    fn try_from(value: Duration) -> Result<Self, Self::Error> {
        let nanos: u64 = value.as_nanos().try_into().map_err(|_| ())?;
        Self::from_c_simtime(nanos).ok_or(())
    }
}

impl std::convert::From<SimulationTime> for CSimulationTime {
    fn from(value: SimulationTime) -> Self {
        value.0
    }
}

impl std::convert::From<SimulationTime> for Duration {
    fn from(value: SimulationTime) -> Self {
        Duration::from_nanos(value.0)
    }
}

impl std::ops::Add for SimulationTime {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.checked_add(rhs).unwrap()
    }
}

impl std::ops::Sub for SimulationTime {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self.checked_sub(rhs).unwrap()
    }
}

impl std::ops::Mul<u64> for SimulationTime {
    type Output = Self;

    fn mul(self, rhs: u64) -> Self {
        Self::from_c_simtime(self.0.checked_mul(rhs).unwrap()).unwrap()
    }
}

impl std::fmt::Display for SimulationTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}ns", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_c_simtime() {
        assert_eq!(SimulationTime::from_c_simtime(0), Some(SimulationTime::ZERO));
        assert_eq!(SimulationTime::from_c_simtime(SIMTIME_INVALID), None);
        assert_eq!(SimulationTime::from_c_simtime(SIMTIME_MAX + 1), None);
        assert_eq!(SimulationTime::from_c_simtime(SIMTIME_MAX), Some(SimulationTime::MAX));
    }

    #[test]
    fn test_to_c_simtime() {
        assert_eq!(SimulationTime::to_c_simtime(Some(SimulationTime::ZERO)), 0);
        assert_eq!(SimulationTime::to_c_simtime(None), SIMTIME_INVALID);
    }

    #[test]
    fn test_arithmetic() {
        let a = SimulationTime::from_secs(5).unwrap();
        let b = SimulationTime::MILLISECOND * 250;
        assert_eq!((a + b).as_millis(), 5250);
        assert_eq!(a.checked_sub(b).unwrap().as_millis(), 4750);
    }

    #[test]
    fn test_saturating() {
        assert_eq!(SimulationTime::ZERO.saturating_sub(SimulationTime::SECOND), SimulationTime::ZERO);
        assert_eq!(SimulationTime::MAX.saturating_add(SimulationTime::SECOND), SimulationTime::MAX);
    }

    #[test]
    fn test_constants_ordering() {
        assert!(SimulationTime::NANOSECOND < SimulationTime::MICROSECOND);
        assert!(SimulationTime::MICROSECOND < SimulationTime::MILLISECOND);
        assert!(SimulationTime::MILLISECOND < SimulationTime::SECOND);
        assert!(SimulationTime::SECOND < SimulationTime::MINUTE);
    }
}
