//! Deferred computation run within a host's context.
//!
//! `Task` owns the callback; `TaskRef` is the shareable handle stored in an
//! [`Event`](super::event::Event). Cloning a `TaskRef` is cheap and shares
//! the same underlying closure, which matters when the same payload is
//! referenced by more than one in-flight event (e.g. a retransmit timer
//! that reschedules itself).

use std::sync::{Arc, Mutex};

use crate::host::host::Host;

pub struct Task {
    callback: Box<dyn FnMut(&mut Host) + Send>,
}

impl Task {
    pub fn new<F>(callback: F) -> Self
    where
        F: FnMut(&mut Host) + Send + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }

    pub fn execute(&mut self, host: &mut Host) {
        (self.callback)(host);
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task").finish_non_exhaustive()
    }
}

/// A reference-counted handle to a [`Task`].
#[derive(Clone, Debug)]
pub struct TaskRef(Arc<Mutex<Task>>);

impl TaskRef {
    pub fn new<F>(callback: F) -> Self
    where
        F: FnMut(&mut Host) + Send + 'static,
    {
        Self(Arc::new(Mutex::new(Task::new(callback))))
    }

    pub fn execute(&self, host: &mut Host) {
        self.0
            .lock()
            .expect("task mutex poisoned by a panicking event")
            .execute(host);
    }
}
