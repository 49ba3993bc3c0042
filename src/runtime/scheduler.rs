//! Ready queue for the round scheduler.
//!
//! A single FIFO lane: every ready process is weighted equally. The queue
//! deduplicates, so a process woken twice before it runs is stepped once.

use crate::types::ProcessId;
use std::collections::{HashSet, VecDeque};

/// FIFO queue of processes with work available now.
#[derive(Debug, Default)]
pub struct ReadyQueue {
    lane: VecDeque<ProcessId>,
    scheduled: HashSet<ProcessId>,
}

impl ReadyQueue {
    /// Creates a new empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of queued processes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.scheduled.len()
    }

    /// Returns true if no process is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scheduled.is_empty()
    }

    /// Returns true if `process` is queued.
    #[must_use]
    pub fn contains(&self, process: ProcessId) -> bool {
        self.scheduled.contains(&process)
    }

    /// Appends `process` to the back of the queue.
    ///
    /// Does nothing if it is already queued.
    pub fn push(&mut self, process: ProcessId) {
        if self.scheduled.insert(process) {
            self.lane.push_back(process);
        }
    }

    /// Takes the process at the head of the queue.
    pub fn pop(&mut self) -> Option<ProcessId> {
        let process = self.lane.pop_front()?;
        self.scheduled.remove(&process);
        Some(process)
    }

    /// Removes `process` wherever it sits in the queue.
    pub fn remove(&mut self, process: ProcessId) -> bool {
        if self.scheduled.remove(&process) {
            self.lane.retain(|queued| *queued != process);
            true
        } else {
            false
        }
    }
}
