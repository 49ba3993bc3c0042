//! The effect bag tree.

use core::fmt;
use std::any::Any;
use std::marker::PhantomData;
use std::rc::Rc;

use super::{Effect, EffectKind, Tagger};
use crate::types::Category;

/// Clones a leaf value and applies the tagger chain to it, innermost first.
pub(crate) type Prepare = fn(&dyn Any, &[Tagger]) -> Box<dyn Any>;

pub(crate) enum Node {
    Leaf {
        category: Category,
        kind: EffectKind,
        value: Rc<dyn Any>,
        prepare: Prepare,
    },
    Batch(Vec<Rc<Node>>),
    Map(Tagger, Rc<Node>),
}

fn prepare<T: Effect>(value: &dyn Any, taggers: &[Tagger]) -> Box<dyn Any> {
    let Some(value) = value.downcast_ref::<T>() else {
        unreachable!("leaf value is not a {}", std::any::type_name::<T>())
    };
    let value = taggers
        .iter()
        .rev()
        .fold(value.clone(), |value, tagger| value.retag(tagger));
    Box::new(value)
}

/// An immutable tree of desired commands and subscriptions.
///
/// `Msg` is the message type the bag's effects eventually deliver to the
/// owning process. Bags are cheap to clone and are rebuilt wholesale on every
/// state transition.
pub struct Bag<Msg> {
    pub(crate) node: Rc<Node>,
    _marker: PhantomData<fn() -> Msg>,
}

impl<Msg: 'static> Bag<Msg> {
    fn from_node(node: Node) -> Self {
        Self {
            node: Rc::new(node),
            _marker: PhantomData,
        }
    }

    /// The empty bag.
    #[must_use]
    pub fn none() -> Self {
        Self::from_node(Node::Batch(Vec::new()))
    }

    /// A single command for the manager of `category`.
    pub fn command<T: Effect>(category: impl Into<Category>, value: T) -> Self {
        Self::leaf(category.into(), EffectKind::Command, value)
    }

    /// A single subscription for the manager of `category`.
    pub fn subscription<T: Effect>(category: impl Into<Category>, value: T) -> Self {
        Self::leaf(category.into(), EffectKind::Subscription, value)
    }

    fn leaf<T: Effect>(category: Category, kind: EffectKind, value: T) -> Self {
        Self::from_node(Node::Leaf {
            category,
            kind,
            value: Rc::new(value),
            prepare: prepare::<T>,
        })
    }

    /// Combines bags, keeping sibling order.
    pub fn batch(bags: impl IntoIterator<Item = Self>) -> Self {
        Self::from_node(Node::Batch(bags.into_iter().map(|bag| bag.node).collect()))
    }

    /// Re-tags every message this bag's effects will produce.
    pub fn map<B, F>(self, f: F) -> Bag<B>
    where
        B: 'static,
        F: Fn(Msg) -> B + 'static,
    {
        Bag::from_node(Node::Map(Tagger::new(f), self.node))
    }

    /// Returns true if the bag contains no leaves.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        let mut pending = vec![&*self.node];
        while let Some(node) = pending.pop() {
            match node {
                Node::Leaf { .. } => return false,
                Node::Batch(children) => pending.extend(children.iter().map(|c| &**c)),
                Node::Map(_, inner) => pending.push(inner),
            }
        }
        true
    }
}

impl<Msg> Clone for Bag<Msg> {
    fn clone(&self) -> Self {
        Self {
            node: Rc::clone(&self.node),
            _marker: PhantomData,
        }
    }
}

impl<Msg: 'static> Default for Bag<Msg> {
    fn default() -> Self {
        Self::none()
    }
}

impl<Msg: 'static> FromIterator<Self> for Bag<Msg> {
    fn from_iter<I: IntoIterator<Item = Self>>(iter: I) -> Self {
        Self::batch(iter)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leaf { category, kind, .. } => f
                .debug_struct("Leaf")
                .field("category", category)
                .field("kind", kind)
                .finish_non_exhaustive(),
            Self::Batch(children) => f.debug_list().entries(children.iter()).finish(),
            Self::Map(_, inner) => f.debug_tuple("Map").field(inner).finish(),
        }
    }
}

impl<Msg> fmt::Debug for Bag<Msg> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Bag").field(&self.node).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct Ping;

    impl Effect for Ping {
        fn retag(self, _: &Tagger) -> Self {
            self
        }
    }

    #[test]
    fn emptiness() {
        assert!(Bag::<()>::none().is_empty());
        let nested = Bag::<()>::none().map(|()| 1_u8).map(|_: u8| ());
        assert!(Bag::batch([Bag::none(), nested]).is_empty());
        assert!(!Bag::<()>::batch([Bag::none(), Bag::command("Net", Ping)]).is_empty());
    }

    #[test]
    fn debug_shows_structure() {
        let bag: Bag<u8> = Bag::batch([Bag::subscription("Time", Ping)]);
        let text = format!("{bag:?}");
        assert!(text.contains("Leaf"), "{text}");
        assert!(text.contains("Time"), "{text}");
        assert!(text.contains("Subscription"), "{text}");
    }
}
