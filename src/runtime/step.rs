//! The step engine.
//!
//! [`step`] advances one process by interpreting its root task against its
//! continuation stack. Evaluation is a loop over an explicit stack, so the
//! host stack stays flat however deep the task chain is.

use std::rc::Rc;

use super::process::Frame;
use super::state::{BindSettle, Shared, StepEnd};
use crate::task::RawTask;
use crate::tracing_compat::trace;
use crate::types::ProcessId;

/// Steps `pid` for at most `budget` node visits and returns the number used.
///
/// Stops early when the process blocks, finishes, visits a `Bind`, or is
/// killed. Returns 0 if `pid` is not a ready process.
pub(crate) fn step(shared: &Rc<Shared>, pid: ProcessId, budget: usize) -> usize {
    let Some(mut core) = shared.begin_step(pid) else {
        return 0;
    };
    let mut visited = 0;

    let end = loop {
        if visited >= budget {
            break StepEnd::Yielded;
        }
        let Some(node) = core.root.take() else {
            // Suspended on a `Bind` whose completion has not arrived.
            break StepEnd::AwaitingAsync;
        };
        visited += 1;

        match node {
            RawTask::Done(value) => match core.stack.unwind_success() {
                Some(f) => core.root = Some(f(value)),
                None => break StepEnd::Finished(Ok(value)),
            },
            RawTask::Failed(error) => match core.stack.unwind_failure() {
                Some(f) => core.root = Some(f(error)),
                None => break StepEnd::Finished(Err(error)),
            },
            RawTask::AndThen(inner, f) => {
                core.stack.push(Frame::AndThen(f));
                core.root = Some(inner.into_task());
                continue;
            }
            RawTask::OnError(inner, f) => {
                core.stack.push(Frame::OnError(f));
                core.root = Some(inner.into_task());
                continue;
            }
            RawTask::Receive(f) => match shared.take_message(pid) {
                Some(msg) => core.root = Some(f(msg)),
                None => {
                    core.root = Some(RawTask::Receive(f));
                    break StepEnd::AwaitingMessage;
                }
            },
            RawTask::Bind(op) => {
                let Some(resolver) = shared.arm_bind(pid) else {
                    break StepEnd::Killed;
                };
                let hook = op(resolver);
                // A synchronous completion still ends the step: the process
                // resumes from the back of the ready queue.
                match shared.settle_bind(pid, hook) {
                    BindSettle::Resolved | BindSettle::Pending => break StepEnd::AwaitingAsync,
                    BindSettle::Killed => break StepEnd::Killed,
                }
            }
        }

        // User code ran above and may have killed this process.
        if shared.is_killed(pid) {
            break StepEnd::Killed;
        }
    };

    trace!(
        process = %pid,
        visited,
        depth = core.stack.depth(),
        "step ended"
    );
    shared.end_step(pid, core, end);
    visited
}
