//! A guest process running on a [`Host`](super::host::Host).
//!
//! The plugin-interposition machinery that actually runs guest code is out
//! of scope; a process here is reduced to the metadata needed to schedule
//! its start/stop events and an opaque entry-point task.

use crate::core::support::simulation_time::SimulationTime;
use crate::core::work::task::TaskRef;

#[derive(Debug, Clone)]
pub struct ProcessRecord {
    pub plugin_id: String,
    pub preload_id: Option<String>,
    pub start_time: SimulationTime,
    pub stop_time: Option<SimulationTime>,
    pub argv: Vec<String>,
}

/// A process's guest-code entry point, invoked with the active host as its
/// context when its start event fires. Opaque beyond that: what the closure
/// does (load a plugin, trap syscalls, ...) is not this crate's concern.
#[derive(Clone)]
pub struct Process {
    pub name: String,
    pub record: ProcessRecord,
    pub entry_point: TaskRef,
}

impl Process {
    pub fn new(name: impl Into<String>, record: ProcessRecord, entry_point: TaskRef) -> Self {
        Self {
            name: name.into(),
            record,
            entry_point,
        }
    }
}

impl std::fmt::Debug for Process {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Process")
            .field("name", &self.name)
            .field("record", &self.record)
            .finish()
    }
}
