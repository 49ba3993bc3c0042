//! Effect bags: immutable trees of desired commands and subscriptions.
//!
//! Application code describes what it wants done as a [`Bag`]. Leaves name the
//! manager [`Category`](crate::types::Category) that handles them; `map`
//! nodes re-tag the messages a subtree will eventually produce so that a
//! child component's effects can be embedded in its parent's.
//!
//! [`flatten`] turns a bag into per-category lists in construction order,
//! which the dispatcher then hands to each manager.

mod bag;
mod flatten;

pub use bag::Bag;
pub use flatten::{flatten, Effects, Flattened};

use core::fmt;
use std::rc::Rc;

use crate::tracing_compat::warn;
use crate::types::Message;

/// Whether a leaf is a one-shot command or a standing subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectKind {
    /// Performed once per dispatch that contains it.
    Command,
    /// Desired for as long as it keeps appearing in dispatched bags.
    Subscription,
}

/// A value that can sit in a bag leaf.
///
/// `retag` composes `tagger` onto every message this value will eventually
/// produce. Values that never produce messages return themselves unchanged.
pub trait Effect: Clone + 'static {
    /// Composes `tagger` onto this value's outgoing messages.
    #[must_use]
    fn retag(self, tagger: &Tagger) -> Self;
}

/// A message transformer attached to a `map` node.
///
/// Taggers operate on erased [`Message`]s. A tagger built for input type `A`
/// passes any message of another type through untouched.
#[derive(Clone)]
pub struct Tagger(Rc<dyn Fn(Message) -> Message>);

impl Tagger {
    /// Wraps a typed conversion.
    pub fn new<A, B, F>(f: F) -> Self
    where
        A: 'static,
        B: 'static,
        F: Fn(A) -> B + 'static,
    {
        Self(Rc::new(move |msg: Message| match msg.downcast::<A>() {
            Ok(value) => Message::new(f(value)),
            Err(msg) => {
                warn!(
                    expected = std::any::type_name::<A>(),
                    actual = msg.type_name(),
                    "tagger applied to a message of another type"
                );
                msg
            }
        }))
    }

    /// The tagger that changes nothing.
    #[must_use]
    pub fn identity() -> Self {
        Self(Rc::new(|msg| msg))
    }

    /// A tagger that ignores its input and produces a clone of `value`.
    pub fn constant<B: Clone + 'static>(value: B) -> Self {
        Self(Rc::new(move |_| Message::new(value.clone())))
    }

    /// Applies this tagger.
    #[must_use]
    pub fn apply(&self, msg: Message) -> Message {
        (self.0)(msg)
    }

    /// Returns a tagger that applies `self` and then `outer`.
    #[must_use]
    pub fn then(&self, outer: &Self) -> Self {
        let inner = Rc::clone(&self.0);
        let outer = Rc::clone(&outer.0);
        Self(Rc::new(move |msg| outer(inner(msg))))
    }
}

impl fmt::Debug for Tagger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Tagger")
    }
}
