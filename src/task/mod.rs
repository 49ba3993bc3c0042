//! The task algebra.
//!
//! A [`Task<E, A>`] is an inert description of a computation that eventually
//! succeeds with an `A` or fails with an `E`. Building a task runs nothing;
//! spawning it as a process hands it to the step engine, which interprets it
//! node by node.
//!
//! Every task is built from six primitives:
//!
//! | Primitive | Constructor | Meaning |
//! |-----------|-------------|---------|
//! | `Done` | [`Task::succeed`] | terminal success |
//! | `Failed` | [`Task::fail`] | terminal failure |
//! | `Bind` | [`Task::bind`] | wait for an external completion |
//! | `AndThen` | [`Task::and_then`] | continue after success |
//! | `OnError` | [`Task::on_error`] | recover after failure |
//! | `Receive` | [`Task::receive`] | wait for a mailbox message |
//!
//! Everything else ([`Task::map`], [`Task::sequence`], [`Task::spawn`], ...)
//! is derived from those.
//!
//! # Example
//!
//! ```
//! use taskrt::{RuntimeBuilder, Task};
//!
//! let mut runtime = RuntimeBuilder::new().build().unwrap();
//! let task: Task<String, i32> = Task::receive(|msg| match msg.downcast::<i32>() {
//!     Ok(n) => Task::succeed(n + 1),
//!     Err(_) => Task::fail("not a number".to_string()),
//! });
//! let pid = runtime.spawn(task);
//! runtime.send(pid, 41_i32);
//! runtime.run_until_idle();
//! assert_eq!(runtime.take_exit::<String, i32>(pid), Some(Ok(42)));
//! ```

mod raw;
mod resolver;

pub(crate) use raw::{unerase, Cont, Link, RawTask, Value};
pub(crate) use resolver::RawResolver;
pub use resolver::{CancelHook, Resolver};

use core::fmt;
use std::marker::PhantomData;

use crate::types::{Message, ProcessId};

/// An inert description of an asynchronous computation.
///
/// Continuations are consumed exactly once; a task is a value that can be
/// moved around and composed, never a running computation.
#[must_use = "tasks do nothing until spawned"]
pub struct Task<E, A> {
    raw: RawTask,
    _marker: PhantomData<fn() -> (E, A)>,
}

impl<E: 'static, A: 'static> Task<E, A> {
    pub(crate) const fn from_raw(raw: RawTask) -> Self {
        Self {
            raw,
            _marker: PhantomData,
        }
    }

    pub(crate) fn into_raw(self) -> RawTask {
        self.raw
    }

    /// A task that immediately succeeds with `value`.
    pub fn succeed(value: A) -> Self {
        Self::from_raw(RawTask::Done(Box::new(value)))
    }

    /// A task that immediately fails with `error`.
    pub fn fail(error: E) -> Self {
        Self::from_raw(RawTask::Failed(Box::new(error)))
    }

    /// A task that succeeds or fails according to `result`.
    pub fn from_result(result: Result<A, E>) -> Self {
        match result {
            Ok(value) => Self::succeed(value),
            Err(error) => Self::fail(error),
        }
    }

    /// A task that waits for an externally triggered completion.
    ///
    /// When the step engine reaches this node it calls `op` exactly once with
    /// a [`Resolver`]. The process stays suspended until the resolver is
    /// invoked. If `op` returns a [`CancelHook`] and the process is killed
    /// before completion, the hook runs once.
    pub fn bind<F>(op: F) -> Self
    where
        F: FnOnce(Resolver<E, A>) -> Option<CancelHook> + 'static,
    {
        Self::from_raw(RawTask::Bind(Box::new(move |raw: RawResolver| {
            op(Resolver::from_raw(raw))
        })))
    }

    /// A task that waits for one message from the running process's mailbox.
    pub fn receive<F>(f: F) -> Self
    where
        F: FnOnce(Message) -> Self + 'static,
    {
        Self::from_raw(RawTask::Receive(Box::new(move |msg| f(msg).raw)))
    }

    /// Runs `f` on this task's success value and continues with its result.
    ///
    /// Failures skip `f`.
    pub fn and_then<B, F>(self, f: F) -> Task<E, B>
    where
        B: 'static,
        F: FnOnce(A) -> Task<E, B> + 'static,
    {
        Task::from_raw(
            self.raw
                .and_then(Box::new(move |value| f(unerase::<A>(value)).raw)),
        )
    }

    /// Runs `f` on this task's failure and continues with its result.
    ///
    /// Successes skip `f`.
    pub fn on_error<E2, F>(self, f: F) -> Task<E2, A>
    where
        E2: 'static,
        F: FnOnce(E) -> Task<E2, A> + 'static,
    {
        Task::from_raw(
            self.raw
                .on_error(Box::new(move |error| f(unerase::<E>(error)).raw)),
        )
    }

    /// Transforms the success value.
    pub fn map<B, F>(self, f: F) -> Task<E, B>
    where
        B: 'static,
        F: FnOnce(A) -> B + 'static,
    {
        self.and_then(move |value| Task::succeed(f(value)))
    }

    /// Transforms the failure value.
    pub fn map_err<E2, F>(self, f: F) -> Task<E2, A>
    where
        E2: 'static,
        F: FnOnce(E) -> E2 + 'static,
    {
        self.on_error(move |error| Task::fail(f(error)))
    }

    /// Runs `tasks` one after another, collecting their values in order.
    ///
    /// Stops at the first failure.
    pub fn sequence<I>(tasks: I) -> Task<E, Vec<A>>
    where
        I: IntoIterator<Item = Self>,
    {
        tasks
            .into_iter()
            .fold(Task::succeed(Vec::new()), |acc, task| {
                acc.and_then(move |mut values: Vec<A>| {
                    task.map(move |value| {
                        values.push(value);
                        values
                    })
                })
            })
    }
}

impl<E: 'static> Task<E, ProcessId> {
    /// Starts `child` as a new, independent process and yields its id.
    ///
    /// The child is not linked to its parent: killing the parent does not
    /// kill the child. Its exit record is discarded when it ends.
    pub fn spawn<E2: 'static, B: 'static>(child: Task<E2, B>) -> Self {
        Self::bind(move |resolver| {
            if let Ok(pid) = resolver.handle().spawn_detached(child) {
                resolver.succeed(pid);
            }
            None
        })
    }

    /// Yields the id of the process running this task.
    pub fn current() -> Self {
        Self::bind(|resolver| {
            resolver.succeed(resolver.process());
            None
        })
    }
}

impl<E: 'static> Task<E, ()> {
    /// Kills `process`. Killing an exited process is a no-op.
    pub fn kill(process: ProcessId) -> Self {
        Self::bind(move |resolver| {
            resolver.handle().kill(process);
            resolver.succeed(());
            None
        })
    }

    /// Delivers `msg` to the mailbox of `process` without waiting for it to
    /// be handled. Messages to exited processes are dropped.
    pub fn send<M: 'static>(process: ProcessId, msg: M) -> Self {
        Self::bind(move |resolver| {
            resolver.handle().send(process, msg);
            resolver.succeed(());
            None
        })
    }
}

impl<E, A> fmt::Debug for Task<E, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Task").field(&self.raw).finish()
    }
}
