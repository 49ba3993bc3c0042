//! Effect managers.
//!
//! A manager is a long-lived process that owns one effect [`Category`]. It is
//! registered once, started with an owning application process, and from then
//! on receives an update on every dispatch: the commands and subscriptions for
//! its category, already flattened and re-tagged. It decides what to start and
//! stop, and reports results back through its [`Router`].
//!
//! The manager process is an ordinary task loop:
//!
//! ```text
//! boot ─► init ─► Receive ─┬─ update    ─► on_effects  ─┐
//!                  ▲       └─ self msg  ─► on_self_msg ─┤
//!                  └────────────────────────────────────┘
//! ```
//!
//! A handler failure ends the loop; the manager is not restarted and later
//! updates for it are dropped.

mod router;

pub use router::Router;

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::effect::{Effect, EffectKind, Effects, Flattened};
use crate::error::{Error, ErrorKind, Result};
use crate::runtime::state::Shared;
use crate::task::{RawTask, Task};
use crate::tracing_compat::{debug, warn};
use crate::types::{Category, Message, ProcessId};

/// Which leaf kinds a manager accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManagerKind {
    /// Commands only.
    Command,
    /// Subscriptions only.
    Subscription,
    /// Both commands and subscriptions.
    Both,
}

impl ManagerKind {
    /// Returns true if leaves of `kind` are delivered to this manager.
    #[must_use]
    pub const fn accepts(self, kind: EffectKind) -> bool {
        matches!(
            (self, kind),
            (Self::Both, _)
                | (Self::Command, EffectKind::Command)
                | (Self::Subscription, EffectKind::Subscription)
        )
    }
}

/// An effect value for managers that never receive that kind of leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoEffect {}

impl Effect for NoEffect {
    fn retag(self, _: &crate::effect::Tagger) -> Self {
        match self {}
    }
}

/// The lifecycle contract of an effect manager.
///
/// Handlers thread `State` through the manager loop: each returns a task that
/// yields the next state. They run inside the manager process, so they may
/// spawn children and wait on `Bind`s like any other task.
pub trait EffectManager: 'static {
    /// State threaded through the handlers.
    type State: 'static;
    /// Command leaf values for this category.
    type Command: Effect;
    /// Subscription leaf values for this category.
    type Subscription: Effect;
    /// Internal bookkeeping messages sent through [`Router::deliver_to_self`].
    type SelfMsg: 'static;
    /// Failure type of the handler tasks.
    type Error: 'static;

    /// The category this manager owns.
    fn category(&self) -> Category;

    /// The leaf kinds this manager accepts.
    fn kind(&self) -> ManagerKind;

    /// Produces the initial state.
    fn init(&self) -> Task<Self::Error, Self::State>;

    /// Handles the effects of one dispatch.
    ///
    /// Called on every dispatch, with empty lists when the bag held nothing
    /// for this category. A subscription missing from `subscriptions` is no
    /// longer wanted.
    fn on_effects(
        &self,
        router: &Router<Self::SelfMsg>,
        commands: Vec<Self::Command>,
        subscriptions: Vec<Self::Subscription>,
        state: Self::State,
    ) -> Task<Self::Error, Self::State>;

    /// Handles a message the manager sent itself.
    fn on_self_msg(
        &self,
        router: &Router<Self::SelfMsg>,
        msg: Self::SelfMsg,
        state: Self::State,
    ) -> Task<Self::Error, Self::State>;
}

/// The messages a manager process understands.
pub(crate) enum ManagerMsg {
    Effects {
        commands: Vec<Box<dyn std::any::Any>>,
        subscriptions: Vec<Box<dyn std::any::Any>>,
    },
    SelfMsg(Message),
}

/// A registered manager with its types erased.
pub(crate) trait ErasedManager {
    /// Builds the manager process's root task.
    fn boot(self: Box<Self>, owner: ProcessId) -> RawTask;
}

struct Erased<M>(M);

impl<M: EffectManager> ErasedManager for Erased<M> {
    fn boot(self: Box<Self>, owner: ProcessId) -> RawTask {
        let manager = Rc::new(self.0);
        let task = Task::<M::Error, Router<M::SelfMsg>>::bind(move |resolver| {
            resolver.succeed(Router::new(owner, resolver.process(), resolver.handle()));
            None
        })
        .and_then(move |router| {
            let init = manager.init();
            init.and_then(move |state| serve(manager, router, state))
        });
        task.into_raw()
    }
}

/// One turn of the manager loop: wait for a message, handle it, repeat.
fn serve<M: EffectManager>(
    manager: Rc<M>,
    router: Router<M::SelfMsg>,
    state: M::State,
) -> Task<M::Error, ()> {
    Task::receive(move |msg| {
        let next = match msg.downcast::<ManagerMsg>() {
            Ok(ManagerMsg::Effects {
                commands,
                subscriptions,
            }) => {
                let me = router.process_id();
                let commands = downcast_all::<M::Command>(me, commands);
                let subscriptions = downcast_all::<M::Subscription>(me, subscriptions);
                manager.on_effects(&router, commands, subscriptions, state)
            }
            Ok(ManagerMsg::SelfMsg(inner)) => match inner.downcast::<M::SelfMsg>() {
                Ok(inner) => manager.on_self_msg(&router, inner, state),
                Err(inner) => {
                    warn!(
                        manager = %router.process_id(),
                        message = ?inner,
                        "self message of unexpected type dropped"
                    );
                    Task::succeed(state)
                }
            },
            Err(other) => {
                warn!(
                    manager = %router.process_id(),
                    message = ?other,
                    "manager received a foreign message"
                );
                Task::succeed(state)
            }
        };
        next.and_then(move |state| serve(manager, router, state))
    })
}

fn downcast_all<T: 'static>(manager: ProcessId, values: Vec<Box<dyn std::any::Any>>) -> Vec<T> {
    values
        .into_iter()
        .filter_map(|value| match value.downcast::<T>() {
            Ok(value) => Some(*value),
            Err(_) => {
                warn!(
                    manager = %manager,
                    expected = std::any::type_name::<T>(),
                    "effect of unexpected type dropped"
                );
                None
            }
        })
        .collect()
}

struct Entry {
    kind: ManagerKind,
    pending: Option<Box<dyn ErasedManager>>,
    process: Option<ProcessId>,
}

/// Category → manager table.
///
/// Open for registration until the managers start, frozen afterwards.
#[derive(Default)]
pub(crate) struct Registry {
    entries: BTreeMap<Category, Entry>,
    started: bool,
}

impl Registry {
    fn check_open(&self, category: &Category) -> Result<()> {
        if self.started {
            return Err(Error::registry_frozen(category));
        }
        if self.entries.contains_key(category) {
            return Err(Error::duplicate_category(category));
        }
        Ok(())
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_started(&self) -> bool {
        self.started
    }

    pub(crate) fn process(&self, category: &Category) -> Option<ProcessId> {
        self.entries.get(category).and_then(|entry| entry.process)
    }
}

/// Registers `manager`. Fails on a duplicate category or a frozen registry.
pub(crate) fn register<M: EffectManager>(shared: &Shared, manager: M) -> Result<()> {
    let category = manager.category();
    let kind = manager.kind();
    shared.with_state(|state| state.registry.check_open(&category))?;
    debug!(category = %category, ?kind, "effect manager registered");
    let pending: Box<dyn ErasedManager> = Box::new(Erased(manager));
    shared.with_state(|state| {
        state.registry.entries.insert(
            category,
            Entry {
                kind,
                pending: Some(pending),
                process: None,
            },
        );
    });
    Ok(())
}

/// Spawns every registered manager with `owner` as its owning process.
pub(crate) fn start(shared: &Shared, owner: ProcessId) -> Result<()> {
    if shared.status(owner).map_or(true, |state| state.is_terminal()) {
        return Err(Error::unknown_process(owner));
    }
    let pending = shared.with_state(|state| {
        if state.registry.started {
            return Err(Error::new(ErrorKind::RegistryFrozen)
                .with_message("managers already started"));
        }
        state.registry.started = true;
        Ok(state
            .registry
            .entries
            .iter_mut()
            .filter_map(|(category, entry)| {
                entry.pending.take().map(|manager| (category.clone(), manager))
            })
            .collect::<Vec<_>>())
    })?;
    for (category, manager) in pending {
        let pid = shared.spawn_raw(manager.boot(owner), false);
        debug!(category = %category, process = %pid, owner = %owner, "effect manager started");
        shared.with_state(|state| {
            if let Some(entry) = state.registry.entries.get_mut(&category) {
                entry.process = Some(pid);
            }
        });
    }
    Ok(())
}

/// Sends every registered manager its share of `flat`.
///
/// Every manager receives an update, even an empty one. Effects for unknown
/// categories, or of a kind the manager did not declare, are dropped.
pub(crate) fn dispatch(shared: &Shared, mut flat: Flattened) -> Result<()> {
    let targets = shared.with_state(|state| {
        if !state.registry.started {
            return Err(Error::new(ErrorKind::ManagersNotStarted));
        }
        Ok(state
            .registry
            .entries
            .iter()
            .filter_map(|(category, entry)| {
                entry
                    .process
                    .map(|pid| (category.clone(), entry.kind, pid))
            })
            .collect::<Vec<_>>())
    })?;

    for (category, kind, pid) in targets {
        let Effects {
            mut commands,
            mut subscriptions,
        } = flat.remove(&category).unwrap_or_default();
        if !kind.accepts(EffectKind::Command) && !commands.is_empty() {
            warn!(category = %category, count = commands.len(), "manager takes no commands; dropped");
            commands.clear();
        }
        if !kind.accepts(EffectKind::Subscription) && !subscriptions.is_empty() {
            warn!(
                category = %category,
                count = subscriptions.len(),
                "manager takes no subscriptions; dropped"
            );
            subscriptions.clear();
        }
        debug!(
            category = %category,
            commands = commands.len(),
            subscriptions = subscriptions.len(),
            "dispatch"
        );
        shared.deliver(
            pid,
            Message::new(ManagerMsg::Effects {
                commands,
                subscriptions,
            }),
        );
    }

    for (category, effects) in flat {
        warn!(category = %category, ?effects, "no manager registered; effects dropped");
    }
    Ok(())
}
