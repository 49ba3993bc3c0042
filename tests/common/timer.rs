//! A time effect manager driven by [`VirtualClock`].
//!
//! Subscriptions ([`Every`]) keep one watcher process per interval; the
//! watcher sleeps on a `Bind` whose cancel hook unschedules the clock entry,
//! so stopping a subscription kills the watcher and leaves nothing pending.
//! Commands ([`After`]) spawn one-shot sleepers that report to the owner.

use std::collections::BTreeMap;
use std::convert::Infallible;

use taskrt::{
    CancelHook, Category, Effect, EffectManager, ManagerKind, Message, ProcessId, Router, Tagger,
    Task,
};

use super::clock::VirtualClock;

/// Category name of the time manager.
pub const TIME: &str = "Time";

/// A task that completes after `delay` virtual milliseconds.
pub fn sleep<E: 'static>(clock: &VirtualClock, delay: u64) -> Task<E, ()> {
    let clock = clock.clone();
    Task::bind(move |resolver| {
        let key = clock.schedule(delay, move || {
            resolver.succeed(());
        });
        Some(CancelHook::new(move || {
            clock.cancel(key);
        }))
    })
}

/// Subscription: a message every `interval` milliseconds carrying the time.
#[derive(Clone)]
pub struct Every {
    pub interval: u64,
    tagger: Tagger,
}

impl Every {
    pub fn new<Msg: 'static>(interval: u64, f: impl Fn(u64) -> Msg + 'static) -> Self {
        Self {
            interval,
            tagger: Tagger::new(f),
        }
    }
}

impl Effect for Every {
    fn retag(mut self, tagger: &Tagger) -> Self {
        self.tagger = self.tagger.then(tagger);
        self
    }
}

/// Command: one message after `delay` milliseconds.
#[derive(Clone)]
pub struct After {
    pub delay: u64,
    tagger: Tagger,
}

impl After {
    pub fn new<Msg: 'static>(delay: u64, f: impl Fn(u64) -> Msg + 'static) -> Self {
        Self {
            delay,
            tagger: Tagger::new(f),
        }
    }
}

impl Effect for After {
    fn retag(mut self, tagger: &Tagger) -> Self {
        self.tagger = self.tagger.then(tagger);
        self
    }
}

/// Bookkeeping sent from watchers to the manager.
#[derive(Debug)]
pub enum TimeMsg {
    Tick(u64),
}

struct Watch {
    process: ProcessId,
    taggers: Vec<Tagger>,
}

/// Manager state: one watcher per subscribed interval.
#[derive(Default)]
pub struct TimeState {
    watchers: BTreeMap<u64, Watch>,
}

impl TimeState {
    pub fn intervals(&self) -> Vec<u64> {
        self.watchers.keys().copied().collect()
    }
}

pub struct TimeManager {
    clock: VirtualClock,
}

impl TimeManager {
    pub fn new(clock: VirtualClock) -> Self {
        Self { clock }
    }
}

fn watch(clock: VirtualClock, interval: u64, router: Router<TimeMsg>) -> Task<Infallible, ()> {
    sleep(&clock, interval).and_then(move |()| {
        router
            .send_to_self(TimeMsg::Tick(interval))
            .and_then(move |()| watch(clock, interval, router))
    })
}

impl EffectManager for TimeManager {
    type State = TimeState;
    type Command = After;
    type Subscription = Every;
    type SelfMsg = TimeMsg;
    type Error = Infallible;

    fn category(&self) -> Category {
        Category::new(TIME)
    }

    fn kind(&self) -> ManagerKind {
        ManagerKind::Both
    }

    fn init(&self) -> Task<Infallible, TimeState> {
        Task::succeed(TimeState::default())
    }

    fn on_effects(
        &self,
        router: &Router<TimeMsg>,
        commands: Vec<After>,
        subscriptions: Vec<Every>,
        mut state: TimeState,
    ) -> Task<Infallible, TimeState> {
        for After { delay, tagger } in commands {
            let clock = self.clock.clone();
            let reply_to = router.clone();
            let oneshot = sleep::<Infallible>(&clock, delay).and_then(move |()| {
                reply_to.send_to_app(tagger.apply(Message::new(clock.now())))
            });
            if let Err(err) = router.spawn(oneshot) {
                tracing::warn!(delay, error = %err, "one-shot timer not started");
            }
        }

        let mut wanted: BTreeMap<u64, Vec<Tagger>> = BTreeMap::new();
        for Every { interval, tagger } in subscriptions {
            wanted.entry(interval).or_default().push(tagger);
        }
        let stale: Vec<u64> = state
            .watchers
            .keys()
            .filter(|interval| !wanted.contains_key(interval))
            .copied()
            .collect();
        for interval in stale {
            if let Some(watch) = state.watchers.remove(&interval) {
                router.kill(watch.process);
            }
        }
        for (interval, taggers) in wanted {
            if let Some(existing) = state.watchers.get_mut(&interval) {
                existing.taggers = taggers;
            } else if let Ok(process) =
                router.spawn(watch(self.clock.clone(), interval, router.clone()))
            {
                state.watchers.insert(interval, Watch { process, taggers });
            }
        }
        Task::succeed(state)
    }

    fn on_self_msg(
        &self,
        router: &Router<TimeMsg>,
        msg: TimeMsg,
        state: TimeState,
    ) -> Task<Infallible, TimeState> {
        let TimeMsg::Tick(interval) = msg;
        if let Some(watch) = state.watchers.get(&interval) {
            let now = self.clock.now();
            for tagger in &watch.taggers {
                router.deliver_to_owner(tagger.apply(Message::new(now)));
            }
        }
        Task::succeed(state)
    }
}
