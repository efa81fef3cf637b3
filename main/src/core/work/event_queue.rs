//! The priority queue backing a single event queue — per-host under the
//! host-granularity policies, per-thread under `thread-single`, or a single
//! global instance under `serial-global`.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use super::event::Event;
use crate::core::support::simulation_time::SimulationTime;

#[derive(Debug)]
pub struct EventQueue {
    queue: BinaryHeap<Reverse<Event>>,
    push_sequence_counter: u64,
    last_event_time: SimulationTime,
    n_pushed: u64,
    n_popped: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self {
            queue: BinaryHeap::new(),
            push_sequence_counter: 0,
            last_event_time: SimulationTime::ZERO,
            n_pushed: 0,
            n_popped: 0,
        }
    }

    /// The next sequence number to assign to a pushed event.
    pub fn next_sequence(&mut self) -> u64 {
        let seq = self.push_sequence_counter;
        self.push_sequence_counter += 1;
        seq
    }

    /// Push a new event. Panics if its time precedes the last popped
    /// event's time — a causality violation this queue's caller must never
    /// produce.
    pub fn push(&mut self, event: Event) {
        assert!(
            event.time() >= self.last_event_time,
            "event queue time moved backward: pushed {:?} but last event time was {:?}",
            event.time(),
            self.last_event_time
        );
        self.n_pushed += 1;
        self.queue.push(Reverse(event));
    }

    /// Pop the earliest event, if any.
    pub fn pop(&mut self) -> Option<Event> {
        let event = self.queue.pop().map(|Reverse(e)| e);
        if let Some(ref e) = event {
            assert!(e.time() >= self.last_event_time);
            self.last_event_time = e.time();
            self.n_popped += 1;
        }
        event
    }

    /// Pop the earliest event only if it is strictly before `barrier`.
    pub fn pop_before(&mut self, barrier: SimulationTime) -> Option<Event> {
        if self.next_event_time()? < barrier {
            self.pop()
        } else {
            None
        }
    }

    pub fn next_event_time(&self) -> Option<SimulationTime> {
        self.queue.peek().map(|Reverse(e)| e.time())
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn n_pushed(&self) -> u64 {
        self.n_pushed
    }

    pub fn n_popped(&self) -> u64 {
        self.n_popped
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}
