//! The restricted channel a manager talks through.

use core::fmt;
use std::cell::RefCell;
use std::collections::HashSet;
use std::marker::PhantomData;
use std::rc::Rc;

use super::ManagerMsg;
use crate::error::Result;
use crate::runtime::RuntimeHandle;
use crate::task::Task;
use crate::tracing_compat::warn;
use crate::types::{Message, ProcessId};

/// A manager's only outward handle.
///
/// Pairs the manager with its owning application process (to report results)
/// and with itself (for bookkeeping routed to
/// [`on_self_msg`](super::EffectManager::on_self_msg)). One router exists per
/// manager process, created when the process boots.
///
/// A router can only kill processes it spawned itself. Clones share that
/// set of children.
pub struct Router<S> {
    owner: ProcessId,
    self_id: ProcessId,
    handle: RuntimeHandle,
    children: Rc<RefCell<HashSet<ProcessId>>>,
    _marker: PhantomData<fn(S)>,
}

impl<S: 'static> Router<S> {
    pub(crate) fn new(owner: ProcessId, self_id: ProcessId, handle: RuntimeHandle) -> Self {
        Self {
            owner,
            self_id,
            handle,
            children: Rc::default(),
            _marker: PhantomData,
        }
    }

    /// Returns the owning application process.
    #[must_use]
    pub fn owner(&self) -> ProcessId {
        self.owner
    }

    /// Returns the manager's own process id.
    #[must_use]
    pub fn process_id(&self) -> ProcessId {
        self.self_id
    }

    /// Enqueues `msg` into the owner's mailbox.
    ///
    /// Returns false if the owner has exited.
    pub fn deliver_to_owner(&self, msg: Message) -> bool {
        self.handle.deliver(self.owner, msg)
    }

    /// Enqueues `msg` into the manager's own mailbox, tagged for `on_self_msg`.
    pub fn deliver_to_self(&self, msg: S) -> bool {
        self.handle.deliver(
            self.self_id,
            Message::new(ManagerMsg::SelfMsg(Message::new(msg))),
        )
    }

    /// Starts `task` as a child process of the runtime.
    ///
    /// The child is independent of the manager: killing one does not kill
    /// the other.
    pub fn spawn<E: 'static, A: 'static>(&self, task: Task<E, A>) -> Result<ProcessId> {
        let pid = self.handle.spawn_detached(task)?;
        let mut children = self.children.borrow_mut();
        // Detached children are reaped on exit.
        children.retain(|child| self.handle.status(*child).is_some());
        children.insert(pid);
        Ok(pid)
    }

    /// Kills a child spawned through this router.
    ///
    /// Returns false, without touching the process, for anything else,
    /// including the owner and the manager itself.
    pub fn kill(&self, process: ProcessId) -> bool {
        if !self.children.borrow_mut().remove(&process) {
            warn!(
                manager = %self.self_id,
                target = %process,
                "router refused to kill a process it did not spawn"
            );
            return false;
        }
        self.handle.kill(process)
    }

    /// A task that delivers `msg` to the owner when run.
    pub fn send_to_app<E: 'static>(&self, msg: Message) -> Task<E, ()> {
        let router = self.clone();
        Task::bind(move |resolver| {
            router.deliver_to_owner(msg);
            resolver.succeed(());
            None
        })
    }

    /// A task that delivers `msg` to this manager's `on_self_msg` when run.
    pub fn send_to_self<E: 'static>(&self, msg: S) -> Task<E, ()> {
        let router = self.clone();
        Task::bind(move |resolver| {
            router.deliver_to_self(msg);
            resolver.succeed(());
            None
        })
    }
}

impl<S> Clone for Router<S> {
    fn clone(&self) -> Self {
        Self {
            owner: self.owner,
            self_id: self.self_id,
            handle: self.handle.clone(),
            children: Rc::clone(&self.children),
            _marker: PhantomData,
        }
    }
}

impl<S> fmt::Debug for Router<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("owner", &self.owner)
            .field("self_id", &self.self_id)
            .finish_non_exhaustive()
    }
}
