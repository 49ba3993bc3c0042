//! Process records and continuation stacks.

use std::collections::VecDeque;

use crate::task::{CancelHook, Cont, RawTask, Value};
use crate::types::{Message, ProcessId};

/// Lifecycle state of a process.
///
/// ```text
/// Ready ──► Running ──► BlockedOnReceive ──(delivery)──► Ready
///              │   └──► BlockedOnAsync ───(completion)─► Ready
///              ├──► Finished | Failed
///  (any live) ─┴──► Killed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessState {
    /// Has work and sits in the ready queue.
    Ready,
    /// Currently being stepped.
    Running,
    /// Waiting for a mailbox message.
    BlockedOnReceive,
    /// Waiting for an external completion.
    BlockedOnAsync,
    /// Ran to a terminal success.
    Finished,
    /// Ran to a failure nothing handled.
    Failed,
    /// Killed before it ended on its own.
    Killed,
}

impl ProcessState {
    /// Returns true once the process can never run again.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Failed | Self::Killed)
    }

    /// Returns true while the process is waiting on a suspension point.
    #[must_use]
    pub const fn is_blocked(self) -> bool {
        matches!(self, Self::BlockedOnReceive | Self::BlockedOnAsync)
    }
}

/// One pending continuation.
pub(crate) enum Frame {
    AndThen(Cont),
    OnError(Cont),
}

/// Per-process LIFO stack of pending continuations, innermost on top.
#[derive(Default)]
pub(crate) struct ContinuationStack {
    frames: Vec<Frame>,
}

impl ContinuationStack {
    pub(crate) fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    /// Pops to the nearest `AndThen` frame, discarding `OnError` frames.
    pub(crate) fn unwind_success(&mut self) -> Option<Cont> {
        while let Some(frame) = self.frames.pop() {
            if let Frame::AndThen(f) = frame {
                return Some(f);
            }
        }
        None
    }

    /// Pops to the nearest `OnError` frame, discarding `AndThen` frames.
    pub(crate) fn unwind_failure(&mut self) -> Option<Cont> {
        while let Some(frame) = self.frames.pop() {
            if let Frame::OnError(f) = frame {
                return Some(f);
            }
        }
        None
    }

    pub(crate) fn depth(&self) -> usize {
        self.frames.len()
    }
}

/// The part of a process the step engine works on.
///
/// Taken out of the process table for the duration of a step so that user
/// closures run without any runtime borrow held.
pub(crate) struct ProcessCore {
    /// `None` while suspended on a `Bind` that has not completed.
    pub(crate) root: Option<RawTask>,
    pub(crate) stack: ContinuationStack,
}

impl ProcessCore {
    pub(crate) fn new(task: RawTask) -> Self {
        Self {
            root: Some(task),
            stack: ContinuationStack::default(),
        }
    }
}

/// A process table entry.
pub(crate) struct ProcessRecord {
    pub(crate) id: ProcessId,
    pub(crate) state: ProcessState,
    /// `None` while the process is being stepped or once it has exited.
    pub(crate) core: Option<ProcessCore>,
    pub(crate) mailbox: VecDeque<Message>,
    /// Identifies the current `Bind` visit; completions for older visits are stale.
    pub(crate) bind_token: u64,
    pub(crate) cancel: Option<CancelHook>,
    /// A completion that arrived while the process was mid-step.
    pub(crate) resolution: Option<Result<Value, Value>>,
    pub(crate) exit: Option<Result<Value, Value>>,
    /// Keep the record after exit so the spawner can collect the result.
    pub(crate) retain_exit: bool,
}

impl ProcessRecord {
    pub(crate) fn new(id: ProcessId, task: RawTask, retain_exit: bool) -> Self {
        Self {
            id,
            state: ProcessState::Ready,
            core: Some(ProcessCore::new(task)),
            mailbox: VecDeque::new(),
            bind_token: 0,
            cancel: None,
            resolution: None,
            exit: None,
            retain_exit,
        }
    }

    pub(crate) fn is_live(&self) -> bool {
        !self.state.is_terminal()
    }
}
