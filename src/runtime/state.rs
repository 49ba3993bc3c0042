//! Runtime state shared between the runtime, its handles and resolvers.
//!
//! Everything mutable lives in one [`State`] behind a `RefCell`. Each method
//! here borrows it for a short, closure-free critical section. Anything that
//! may run user code (cancel hooks, the failure hook, dropping a task or a
//! message) happens after the borrow is released, so user code can always
//! call back into the runtime.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use super::config::RuntimeConfig;
use super::host::Host;
use super::process::{ProcessCore, ProcessRecord, ProcessState};
use super::scheduler::ReadyQueue;
use crate::error::{Error, ErrorKind};
use crate::manager::Registry;
use crate::task::{CancelHook, RawResolver, RawTask, Value};
use crate::tracing_compat::{debug, trace};
use crate::types::{Message, ProcessId};
use crate::util::Arena;

/// The runtime's mutable tables.
pub(crate) struct State {
    pub(crate) processes: Arena<ProcessRecord>,
    pub(crate) ready: ReadyQueue,
    pub(crate) registry: Registry,
    in_round: bool,
    round_requested: bool,
}

impl State {
    fn new() -> Self {
        Self {
            processes: Arena::new(),
            ready: ReadyQueue::new(),
            registry: Registry::default(),
            in_round: false,
            round_requested: false,
        }
    }

    fn record(&self, pid: ProcessId) -> Option<&ProcessRecord> {
        self.processes.get(pid.arena_index())
    }

    fn record_mut(&mut self, pid: ProcessId) -> Option<&mut ProcessRecord> {
        self.processes.get_mut(pid.arena_index())
    }

    fn remove(&mut self, pid: ProcessId) -> Option<ProcessRecord> {
        self.processes.remove(pid.arena_index())
    }
}

/// What a step ended with, as reported back to the process table.
pub(crate) enum StepEnd {
    /// Budget ran out with work remaining.
    Yielded,
    /// Blocked on an empty mailbox.
    AwaitingMessage,
    /// Blocked on an outstanding `Bind`.
    AwaitingAsync,
    /// Reached a terminal value with an empty stack.
    Finished(Result<Value, Value>),
    /// Killed while the step was in progress.
    Killed,
}

/// Result of storing a `Bind`'s cancel hook after its operation returned.
pub(crate) enum BindSettle {
    /// The operation completed synchronously. The outcome waits in the
    /// record until the process is stepped again.
    Resolved,
    /// The process now waits for a completion.
    Pending,
    /// The process was killed from inside the operation.
    Killed,
}

/// Runtime internals shared through `Rc`/`Weak`.
pub(crate) struct Shared {
    state: RefCell<State>,
    host: Rc<dyn Host>,
    pub(crate) config: RuntimeConfig,
}

impl Shared {
    pub(crate) fn new(config: RuntimeConfig, host: Rc<dyn Host>) -> Self {
        Self {
            state: RefCell::new(State::new()),
            host,
            config,
        }
    }

    /// Runs `f` with the state borrowed. `f` must not call user code.
    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        f(&mut self.state.borrow_mut())
    }

    // === Process table ===

    pub(crate) fn spawn_raw(&self, task: RawTask, retain_exit: bool) -> ProcessId {
        let pid = {
            let mut state = self.state.borrow_mut();
            let index = state.processes.insert_with(|index| {
                ProcessRecord::new(ProcessId::from_arena(index), task, retain_exit)
            });
            let pid = ProcessId::from_arena(index);
            state.ready.push(pid);
            pid
        };
        debug!(process = %pid, retain_exit, "process spawned");
        self.wake();
        pid
    }

    pub(crate) fn status(&self, pid: ProcessId) -> Option<ProcessState> {
        self.state.borrow().record(pid).map(|record| record.state)
    }

    pub(crate) fn process_count(&self) -> usize {
        self.state.borrow().processes.len()
    }

    pub(crate) fn ready_len(&self) -> usize {
        self.state.borrow().ready.len()
    }

    /// Appends `msg` to the mailbox of `pid`.
    ///
    /// Wakes the process if it was blocked on `Receive`. Returns false, and
    /// drops the message, if `pid` does not name a live process.
    pub(crate) fn deliver(&self, pid: ProcessId, msg: Message) -> bool {
        let rejected = {
            let mut state = self.state.borrow_mut();
            match state.record_mut(pid) {
                Some(record) if record.is_live() => {
                    record.mailbox.push_back(msg);
                    if record.state == ProcessState::BlockedOnReceive {
                        record.state = ProcessState::Ready;
                        state.ready.push(pid);
                    }
                    None
                }
                _ => Some(msg),
            }
        };
        match rejected {
            None => {
                self.wake();
                true
            }
            Some(msg) => {
                trace!(process = %pid, message = ?msg, "message to exited process dropped");
                drop(msg);
                false
            }
        }
    }

    /// Applies the completion of the `Bind` visit identified by `token`.
    ///
    /// Only the first completion of the current visit of a live process is
    /// honoured. Returns whether this one was.
    pub(crate) fn complete(
        &self,
        pid: ProcessId,
        token: u64,
        outcome: Result<Value, Value>,
    ) -> bool {
        let (accepted, stale_hook, woke) = {
            let mut state = self.state.borrow_mut();
            match state.record_mut(pid) {
                Some(record)
                    if record.state == ProcessState::BlockedOnAsync
                        && record.bind_token == token
                        && record.resolution.is_none() =>
                {
                    record.resolution = Some(outcome);
                    let hook = record.cancel.take();
                    let suspended = record.core.is_some();
                    if suspended {
                        record.state = ProcessState::Ready;
                        state.ready.push(pid);
                    }
                    (None, hook, suspended)
                }
                _ => (Some(outcome), None, false),
            }
        };
        drop(stale_hook);
        if woke {
            self.wake();
        }
        match accepted {
            None => true,
            Some(outcome) => {
                trace!(process = %pid, token, "completion ignored");
                drop(outcome);
                false
            }
        }
    }

    /// Kills `pid`. Killing an exited or unknown process does nothing.
    ///
    /// Fires the outstanding cancel hook, if any, exactly once.
    pub(crate) fn kill(&self, pid: ProcessId) -> bool {
        let (hook, core, mailbox, resolution, removed) = {
            let mut state = self.state.borrow_mut();
            let Some(record) = state.record_mut(pid) else {
                return false;
            };
            if !record.is_live() {
                return false;
            }
            let mid_step = record.core.is_none();
            record.state = ProcessState::Killed;
            let hook = record.cancel.take();
            let mailbox = std::mem::take(&mut record.mailbox);
            let core = record.core.take();
            // Mid-step, the step engine owns the pending resolution and the
            // record's removal.
            let resolution = if mid_step {
                None
            } else {
                record.resolution.take()
            };
            let retain = record.retain_exit;
            state.ready.remove(pid);
            let removed = if mid_step || retain {
                None
            } else {
                state.remove(pid)
            };
            (hook, core, mailbox, resolution, removed)
        };
        debug!(process = %pid, cancel_hook = hook.is_some(), "process killed");
        if let Some(hook) = hook {
            hook.fire();
        }
        drop((core, mailbox, resolution, removed));
        true
    }

    /// Removes a terminal process record. Returns false for live processes.
    pub(crate) fn reap(&self, pid: ProcessId) -> bool {
        let removed = {
            let mut state = self.state.borrow_mut();
            match state.record(pid) {
                Some(record) if record.state.is_terminal() && record.core.is_none() => {
                    state.remove(pid)
                }
                _ => None,
            }
        };
        removed.is_some()
    }

    /// Takes the exit value of a finished process if it has the given types.
    pub(crate) fn take_exit<E: 'static, A: 'static>(&self, pid: ProcessId) -> Option<Result<A, E>> {
        let record = {
            let mut state = self.state.borrow_mut();
            let typed = match state.record(pid)?.exit.as_ref()? {
                Ok(value) => value.is::<A>(),
                Err(error) => error.is::<E>(),
            };
            if !typed {
                return None;
            }
            state.remove(pid)?
        };
        match record.exit? {
            Ok(value) => value.downcast::<A>().ok().map(|value| Ok(*value)),
            Err(error) => error.downcast::<E>().ok().map(|error| Err(*error)),
        }
    }

    // === Host rescheduling ===

    /// Asks the host for a round if there is ready work and none is pending.
    pub(crate) fn wake(&self) {
        let request = {
            let mut state = self.state.borrow_mut();
            let request = !state.in_round && !state.round_requested && !state.ready.is_empty();
            if request {
                state.round_requested = true;
            }
            request
        };
        if request {
            self.host.request_round();
        }
    }

    pub(crate) fn begin_round(&self) {
        let mut state = self.state.borrow_mut();
        state.in_round = true;
        state.round_requested = false;
    }

    pub(crate) fn pop_ready(&self) -> Option<ProcessId> {
        self.state.borrow_mut().ready.pop()
    }

    /// Ends a round and returns whether work was left over.
    pub(crate) fn end_round(&self) -> bool {
        let deferred = {
            let mut state = self.state.borrow_mut();
            state.in_round = false;
            !state.ready.is_empty()
        };
        self.wake();
        deferred
    }

    // === Step lifecycle ===

    /// Takes the core of a ready process and marks it running.
    pub(crate) fn begin_step(&self, pid: ProcessId) -> Option<ProcessCore> {
        let mut state = self.state.borrow_mut();
        let record = state.record_mut(pid)?;
        if record.state != ProcessState::Ready {
            return None;
        }
        let mut core = record.core.take()?;
        record.state = ProcessState::Running;
        if let Some(outcome) = record.resolution.take() {
            core.root = Some(RawTask::from_outcome(outcome));
        }
        Some(core)
    }

    /// Returns true once `pid` has been killed (or removed) mid-step.
    pub(crate) fn is_killed(&self, pid: ProcessId) -> bool {
        self.state
            .borrow()
            .record(pid)
            .map_or(true, |record| record.state == ProcessState::Killed)
    }

    pub(crate) fn take_message(&self, pid: ProcessId) -> Option<Message> {
        self.state.borrow_mut().record_mut(pid)?.mailbox.pop_front()
    }

    /// Starts a new `Bind` visit and returns the resolver for it.
    pub(crate) fn arm_bind(self: &Rc<Self>, pid: ProcessId) -> Option<RawResolver> {
        let mut state = self.state.borrow_mut();
        let record = state.record_mut(pid)?;
        record.bind_token += 1;
        record.state = ProcessState::BlockedOnAsync;
        Some(RawResolver::new(
            Rc::downgrade(self),
            pid,
            record.bind_token,
        ))
    }

    /// Records the outcome of running a `Bind` operation.
    pub(crate) fn settle_bind(&self, pid: ProcessId, hook: Option<CancelHook>) -> BindSettle {
        let (settle, fire, unused) = {
            let mut state = self.state.borrow_mut();
            match state.record_mut(pid) {
                Some(record) if record.state == ProcessState::BlockedOnAsync => {
                    if record.resolution.is_some() {
                        (BindSettle::Resolved, None, hook)
                    } else {
                        record.cancel = hook;
                        (BindSettle::Pending, None, None)
                    }
                }
                // Killed from inside the operation: the hook is only owed if
                // the operation had not completed first.
                Some(record) => {
                    if record.resolution.take().is_some() {
                        (BindSettle::Killed, None, hook)
                    } else {
                        (BindSettle::Killed, hook, None)
                    }
                }
                None => (BindSettle::Killed, hook, None),
            }
        };
        drop(unused);
        if let Some(hook) = fire {
            hook.fire();
        }
        settle
    }

    /// Returns a stepped core to the table according to how the step ended.
    pub(crate) fn end_step(&self, pid: ProcessId, core: ProcessCore, end: StepEnd) {
        match end {
            StepEnd::Yielded => {
                let mut state = self.state.borrow_mut();
                if let Some(record) = state.record_mut(pid) {
                    record.state = ProcessState::Ready;
                    record.core = Some(core);
                    state.ready.push(pid);
                }
            }
            StepEnd::AwaitingMessage => {
                let mut state = self.state.borrow_mut();
                if let Some(record) = state.record_mut(pid) {
                    record.core = Some(core);
                    if record.mailbox.is_empty() {
                        record.state = ProcessState::BlockedOnReceive;
                    } else {
                        record.state = ProcessState::Ready;
                        state.ready.push(pid);
                    }
                }
            }
            StepEnd::AwaitingAsync => {
                let mut state = self.state.borrow_mut();
                if let Some(record) = state.record_mut(pid) {
                    record.core = Some(core);
                    if record.resolution.is_some() {
                        record.state = ProcessState::Ready;
                        state.ready.push(pid);
                    }
                }
            }
            StepEnd::Finished(outcome) => self.finish(pid, core, outcome),
            StepEnd::Killed => {
                let removed = {
                    let mut state = self.state.borrow_mut();
                    match state.record(pid) {
                        Some(record) if !record.retain_exit => state.remove(pid),
                        _ => None,
                    }
                };
                drop((core, removed));
            }
        }
    }

    fn finish(&self, pid: ProcessId, core: ProcessCore, outcome: Result<Value, Value>) {
        drop(core);
        match &outcome {
            Ok(_) => debug!(process = %pid, "process finished"),
            Err(error) => {
                debug!(process = %pid, "process failed with an unhandled error");
                if let Some(hook) = &self.config.on_unhandled_failure {
                    hook(pid, error.as_ref());
                }
            }
        }
        let (mailbox, removed, outcome) = {
            let mut state = self.state.borrow_mut();
            match state.record_mut(pid) {
                None => (VecDeque::new(), None, Some(outcome)),
                Some(record) => {
                    record.state = if outcome.is_ok() {
                        ProcessState::Finished
                    } else {
                        ProcessState::Failed
                    };
                    let mailbox = std::mem::take(&mut record.mailbox);
                    if record.retain_exit {
                        record.exit = Some(outcome);
                        (mailbox, None, None)
                    } else {
                        (mailbox, state.remove(pid), Some(outcome))
                    }
                }
            }
        };
        drop((mailbox, removed, outcome));
    }
}

/// Upgrades a weak runtime pointer, or reports the runtime as gone.
pub(crate) fn upgrade(shared: &Weak<Shared>) -> crate::error::Result<Rc<Shared>> {
    shared
        .upgrade()
        .ok_or_else(|| Error::new(ErrorKind::RuntimeDropped))
}
