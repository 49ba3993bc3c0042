//! The host's "yield and resume" primitive.
//!
//! The runtime never loops on its own. When ready work exists and no round is
//! pending, it asks the host for one through [`Host::request_round`]; the host
//! later calls [`Runtime::run_round`](super::Runtime::run_round) from its own
//! event loop, after whatever other duties (rendering, input) it has.
//!
//! `request_round` is called while the runtime is mid-operation and must not
//! call back into the runtime synchronously. Record the request and act on it
//! from the next turn of the host loop.

use std::cell::Cell;

/// Schedules a zero-delay callback that runs the next round.
pub trait Host {
    /// Requests that the host run one more round soon.
    fn request_round(&self);
}

impl<F: Fn()> Host for F {
    fn request_round(&self) {
        self();
    }
}

/// A host that ignores requests.
///
/// Suits headless drivers that call
/// [`Runtime::run_until_idle`](super::Runtime::run_until_idle) themselves.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHost;

impl Host for NoopHost {
    fn request_round(&self) {}
}

/// A host that counts requests for an external loop to poll.
#[derive(Debug, Default)]
pub struct ManualHost {
    pending: Cell<u64>,
    total: Cell<u64>,
}

impl ManualHost {
    /// Creates a host with no pending requests.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes one pending request, if any.
    pub fn take_request(&self) -> bool {
        let pending = self.pending.get();
        if pending == 0 {
            return false;
        }
        self.pending.set(pending - 1);
        true
    }

    /// Returns the number of requests not yet taken.
    #[must_use]
    pub fn pending(&self) -> u64 {
        self.pending.get()
    }

    /// Returns the number of requests ever made.
    #[must_use]
    pub fn total_requests(&self) -> u64 {
        self.total.get()
    }
}

impl Host for ManualHost {
    fn request_round(&self) {
        self.pending.set(self.pending.get() + 1);
        self.total.set(self.total.get() + 1);
    }
}
