//! Type-erased task nodes interpreted by the step engine.
//!
//! The typed [`Task`](super::Task) facade guarantees that every erased value
//! reaching a continuation has the type that continuation was built for.

use std::any::Any;

use super::resolver::{CancelHook, RawResolver};
use crate::types::Message;

/// An erased success or failure value.
pub(crate) type Value = Box<dyn Any>;

/// An erased continuation, consumed exactly once.
pub(crate) type Cont = Box<dyn FnOnce(Value) -> RawTask>;

/// An erased asynchronous operation.
pub(crate) type AsyncOp = Box<dyn FnOnce(RawResolver) -> Option<CancelHook>>;

/// An erased mailbox handler.
pub(crate) type ReceiveFn = Box<dyn FnOnce(Message) -> RawTask>;

/// Recovers a value erased by the typed facade.
pub(crate) fn unerase<T: 'static>(value: Value) -> T {
    match value.downcast::<T>() {
        Ok(value) => *value,
        Err(_) => unreachable!(
            "task value is not a {}; typed combinators keep erased values in sync",
            std::any::type_name::<T>()
        ),
    }
}

/// The closed set of task nodes.
pub(crate) enum RawTask {
    Done(Value),
    Failed(Value),
    Bind(AsyncOp),
    AndThen(Link, Cont),
    OnError(Link, Cont),
    Receive(ReceiveFn),
}

impl RawTask {
    pub(crate) fn and_then(self, f: Cont) -> Self {
        Self::AndThen(Link::new(self), f)
    }

    pub(crate) fn on_error(self, f: Cont) -> Self {
        Self::OnError(Link::new(self), f)
    }

    pub(crate) fn from_outcome(outcome: Result<Value, Value>) -> Self {
        match outcome {
            Ok(value) => Self::Done(value),
            Err(error) => Self::Failed(error),
        }
    }

    pub(crate) const fn name(&self) -> &'static str {
        match self {
            Self::Done(_) => "Done",
            Self::Failed(_) => "Failed",
            Self::Bind(_) => "Bind",
            Self::AndThen(..) => "AndThen",
            Self::OnError(..) => "OnError",
            Self::Receive(_) => "Receive",
        }
    }
}

impl std::fmt::Debug for RawTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The inner task of an `AndThen`/`OnError` node.
///
/// Left-nested chains are linked lists of these, so dropping one iteratively
/// keeps the host stack flat however deep the chain is.
pub(crate) struct Link(Option<Box<RawTask>>);

impl Link {
    fn new(task: RawTask) -> Self {
        Self(Some(Box::new(task)))
    }

    pub(crate) fn into_task(mut self) -> RawTask {
        match self.0.take() {
            Some(task) => *task,
            None => unreachable!("link emptied before it was consumed"),
        }
    }
}

impl Drop for Link {
    fn drop(&mut self) {
        let mut next = self.0.take();
        while let Some(mut task) = next {
            next = match &mut *task {
                RawTask::AndThen(link, _) | RawTask::OnError(link, _) => link.0.take(),
                _ => None,
            };
        }
    }
}
