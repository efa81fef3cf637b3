//! A single unit of scheduled work: a time, a monotonic sequence number
//! assigned at push, the hosts it flows between, and a payload task.

use std::cmp::Ordering;

use crate::core::support::simulation_time::SimulationTime;
use crate::core::work::task::TaskRef;
use crate::host::host::{Host, HostId};

#[derive(Clone)]
pub struct Event {
    time: SimulationTime,
    sequence: u64,
    src_host: HostId,
    dst_host: HostId,
    payload: TaskRef,
}

impl Event {
    pub fn new(
        time: SimulationTime,
        sequence: u64,
        src_host: HostId,
        dst_host: HostId,
        payload: TaskRef,
    ) -> Self {
        Self {
            time,
            sequence,
            src_host,
            dst_host,
            payload,
        }
    }

    pub fn time(&self) -> SimulationTime {
        self.time
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn src_host(&self) -> HostId {
        self.src_host
    }

    pub fn dst_host(&self) -> HostId {
        self.dst_host
    }

    pub fn execute(&self, host: &mut Host) {
        self.payload.execute(host);
    }
}

impl std::fmt::Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("time", &self.time)
            .field("sequence", &self.sequence)
            .field("src_host", &self.src_host)
            .field("dst_host", &self.dst_host)
            .finish()
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.sequence == other.sequence
    }
}

impl Eq for Event {}

/// Events compare by `(time, sequence)`, sequence being assigned
/// monotonically at push within one destination queue — a total order
/// within any single queue.
impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .cmp(&other.time)
            .then_with(|| self.sequence.cmp(&other.sequence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(time_ns: u64, seq: u64) -> Event {
        Event::new(
            SimulationTime::from_nanos(time_ns).unwrap(),
            seq,
            HostId(0),
            HostId(1),
            TaskRef::new(|_h| {}),
        )
    }

    #[test]
    fn test_orders_by_time_then_sequence() {
        let a = ev(10, 5);
        let b = ev(10, 6);
        let c = ev(11, 0);
        assert!(a < b);
        assert!(b < c);
        assert!(a < c);
    }

    #[test]
    fn test_equal_requires_both_fields() {
        let a = ev(10, 5);
        let b = ev(10, 5);
        assert_eq!(a, b);
    }
}
