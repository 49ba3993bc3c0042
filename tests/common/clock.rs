//! A virtual clock standing in for the host's timer facility.
//!
//! Callbacks registered with [`VirtualClock::schedule`] run when the test
//! advances time past their deadline, in deadline order (ties in scheduling
//! order). No borrow of the clock is held while a callback runs.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

type Callback = Box<dyn FnOnce()>;

#[derive(Default)]
struct Inner {
    now: Cell<u64>,
    next_seq: Cell<u64>,
    pending: RefCell<BTreeMap<(u64, u64), Callback>>,
    cancelled: Cell<u64>,
}

/// Shared handle to a virtual clock.
#[derive(Clone, Default)]
pub struct VirtualClock(Rc<Inner>);

/// Identifies one scheduled callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerKey(u64, u64);

impl VirtualClock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn now(&self) -> u64 {
        self.0.now.get()
    }

    /// Runs `f` once the clock reaches `now() + delay`.
    pub fn schedule(&self, delay: u64, f: impl FnOnce() + 'static) -> TimerKey {
        let seq = self.0.next_seq.get();
        self.0.next_seq.set(seq + 1);
        let key = (self.now() + delay, seq);
        self.0.pending.borrow_mut().insert(key, Box::new(f));
        TimerKey(key.0, key.1)
    }

    /// Drops a scheduled callback. Returns false if it already ran.
    pub fn cancel(&self, key: TimerKey) -> bool {
        let removed = self.0.pending.borrow_mut().remove(&(key.0, key.1));
        if removed.is_some() {
            self.0.cancelled.set(self.0.cancelled.get() + 1);
        }
        removed.is_some()
    }

    /// Moves time forward by `delta`, firing every callback that comes due.
    pub fn advance(&self, delta: u64) {
        let target = self.now() + delta;
        loop {
            let due = {
                let mut pending = self.0.pending.borrow_mut();
                match pending.keys().next().copied() {
                    Some(key) if key.0 <= target => pending.remove(&key).map(|f| (key.0, f)),
                    _ => None,
                }
            };
            let Some((at, f)) = due else { break };
            self.0.now.set(at);
            f();
        }
        self.0.now.set(target);
    }

    /// Number of callbacks waiting to fire.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.0.pending.borrow().len()
    }

    /// Number of callbacks removed through [`cancel`](Self::cancel).
    #[must_use]
    pub fn cancelled(&self) -> u64 {
        self.0.cancelled.get()
    }
}
