//! The per-host state abstraction. Everything a real host owns (network
//! interfaces, sockets, the routing table, process memory) is out of scope
//! here — `Host` keeps just enough state to drive the scheduling protocol
//! and a handful of host-level operations (`boot`, `shutdown`, `migrate`,
//! `getRandom`).

use std::fmt;

use crate::core::support::random::Random;
use crate::core::support::simulation_time::SimulationTime;
use crate::core::work::task::TaskRef;
use crate::host::process::Process;

/// A stable identifier for a host, unique per manager. Derived from the
/// host's position in the registration order (stand-in for a hash of its
/// hostname).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HostId(pub u32);

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "host#{}", self.0)
    }
}

pub struct Host {
    id: HostId,
    name: String,
    rng: Random,
    processes: Vec<Process>,
    bandwidth_up_kibps: Option<u64>,
    bandwidth_down_kibps: Option<u64>,
    booted: bool,
}

impl Host {
    pub fn new(
        id: HostId,
        name: impl Into<String>,
        rng: Random,
        bandwidth_up_kibps: Option<u64>,
        bandwidth_down_kibps: Option<u64>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            rng,
            processes: Vec::new(),
            bandwidth_up_kibps,
            bandwidth_down_kibps,
            booted: false,
        }
    }

    pub fn id(&self) -> HostId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bandwidth_up_kibps(&self) -> Option<u64> {
        self.bandwidth_up_kibps
    }

    pub fn bandwidth_down_kibps(&self) -> Option<u64> {
        self.bandwidth_down_kibps
    }

    pub fn add_application(&mut self, process: Process) {
        self.processes.push(process);
    }

    /// Boot the host: produce the `(start_time, entry_point)` pairs for
    /// every registered process, to be scheduled by the caller as events
    /// with `src == dst == self.id()`. Idempotent after the first call (a
    /// host boots exactly once).
    pub fn boot(&mut self) -> Vec<(SimulationTime, TaskRef)> {
        if self.booted {
            return Vec::new();
        }
        self.booted = true;
        self.processes
            .iter()
            .map(|p| (p.record.start_time, p.entry_point.clone()))
            .collect()
    }

    pub fn shutdown(&mut self) {
        self.processes.clear();
        self.booted = false;
    }

    pub fn free_all_applications(&mut self) {
        self.processes.clear();
    }

    pub fn get_random(&mut self) -> &mut Random {
        &mut self.rng
    }

    /// Invoked by the host-steal policy when this host moves from one
    /// worker thread to another. There is no thread-local host state to
    /// move in this abstraction, so this just traces the event; a fuller
    /// host would relocate any thread-affine resources here.
    pub fn migrate(&mut self, from_thread: usize, to_thread: usize) {
        log::trace!(
            "{} migrated: thread {} -> thread {}",
            self.name,
            from_thread,
            to_thread
        );
    }
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("n_processes", &self.processes.len())
            .field("booted", &self.booted)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::process::ProcessRecord;

    fn process(start_secs: u64) -> Process {
        let record = ProcessRecord {
            plugin_id: "ping".into(),
            preload_id: None,
            start_time: SimulationTime::from_secs(start_secs).unwrap(),
            stop_time: None,
            argv: vec![],
        };
        Process::new("ping", record, TaskRef::new(|_host: &mut Host| {}))
    }

    #[test]
    fn test_boot_is_idempotent() {
        let mut host = Host::new(HostId(0), "a", Random::new(1), None, None);
        host.add_application(process(5));
        let first = host.boot();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].0, SimulationTime::from_secs(5).unwrap());

        let second = host.boot();
        assert!(second.is_empty());
    }

    #[test]
    fn test_shutdown_clears_processes() {
        let mut host = Host::new(HostId(1), "b", Random::new(2), None, None);
        host.add_application(process(1));
        host.boot();
        host.shutdown();
        assert!(host.boot().is_empty());
    }
}
