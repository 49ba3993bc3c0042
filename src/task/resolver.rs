//! Completion callbacks and cancellation hooks for `Bind` nodes.

use core::fmt;
use std::marker::PhantomData;
use std::rc::Weak;

use super::raw::Value;
use crate::runtime::state::Shared;
use crate::runtime::RuntimeHandle;
use crate::types::ProcessId;

/// Cancels an outstanding asynchronous operation.
///
/// Returned from a `Bind` operation. The runtime invokes it at most once, and
/// only if the owning process is killed while still waiting on that operation.
pub struct CancelHook(Box<dyn FnOnce()>);

impl CancelHook {
    /// Wraps a cancellation closure.
    #[must_use]
    pub fn new(f: impl FnOnce() + 'static) -> Self {
        Self(Box::new(f))
    }

    pub(crate) fn fire(self) {
        (self.0)();
    }
}

impl fmt::Debug for CancelHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CancelHook")
    }
}

/// Untyped completion handle for one `Bind` visit.
#[derive(Clone)]
pub(crate) struct RawResolver {
    shared: Weak<Shared>,
    process: ProcessId,
    token: u64,
}

impl RawResolver {
    pub(crate) fn new(shared: Weak<Shared>, process: ProcessId, token: u64) -> Self {
        Self {
            shared,
            process,
            token,
        }
    }

    /// Delivers the outcome. Returns false if it was ignored.
    pub(crate) fn complete(&self, outcome: Result<Value, Value>) -> bool {
        self.shared
            .upgrade()
            .is_some_and(|shared| shared.complete(self.process, self.token, outcome))
    }
}

/// The completion callback handed to a `Bind` operation.
///
/// Exactly one completion is honoured per `Bind` visit. Later calls, calls for
/// a process that has since been killed, and calls after the runtime has been
/// dropped are all ignored; each method reports whether it took effect.
///
/// A resolver may be invoked synchronously from inside the operation itself.
/// The step still ends there, and the process resumes from the back of the
/// ready queue.
pub struct Resolver<E, A> {
    raw: RawResolver,
    _marker: PhantomData<fn(A, E)>,
}

impl<E, A> Clone for Resolver<E, A> {
    fn clone(&self) -> Self {
        Self {
            raw: self.raw.clone(),
            _marker: PhantomData,
        }
    }
}

impl<E: 'static, A: 'static> Resolver<E, A> {
    pub(crate) fn from_raw(raw: RawResolver) -> Self {
        Self {
            raw,
            _marker: PhantomData,
        }
    }

    /// Completes the operation successfully.
    pub fn succeed(&self, value: A) -> bool {
        self.raw.complete(Ok(Box::new(value)))
    }

    /// Completes the operation with a failure.
    pub fn fail(&self, error: E) -> bool {
        self.raw.complete(Err(Box::new(error)))
    }

    /// Completes the operation with either outcome.
    pub fn resolve(&self, result: Result<A, E>) -> bool {
        match result {
            Ok(value) => self.succeed(value),
            Err(error) => self.fail(error),
        }
    }

    /// Returns the id of the process waiting on this operation.
    #[must_use]
    pub fn process(&self) -> ProcessId {
        self.raw.process
    }

    /// Returns a handle to the runtime executing the process.
    #[must_use]
    pub fn handle(&self) -> RuntimeHandle {
        RuntimeHandle::from_weak(self.raw.shared.clone())
    }
}

impl<E, A> fmt::Debug for Resolver<E, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("process", &self.raw.process)
            .field("token", &self.raw.token)
            .finish()
    }
}
