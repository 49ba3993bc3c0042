//! Bag flattening.

use std::any::Any;
use std::collections::BTreeMap;

use smallvec::SmallVec;

use super::bag::{Bag, Node};
use super::{EffectKind, Tagger};
use crate::types::Category;

/// The effects one category receives from a single dispatch.
///
/// Each entry is the leaf value, cloned and re-tagged by every `map` on its
/// path, boxed as the concrete effect type it was built from.
#[derive(Default)]
pub struct Effects {
    /// Commands in construction order.
    pub commands: Vec<Box<dyn Any>>,
    /// Subscriptions in construction order.
    pub subscriptions: Vec<Box<dyn Any>>,
}

impl Effects {
    /// Returns true if neither list has entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty() && self.subscriptions.is_empty()
    }

    /// Iterates over the commands that are a `T`.
    pub fn commands_of<T: 'static>(&self) -> impl Iterator<Item = &T> {
        self.commands.iter().filter_map(|c| c.downcast_ref::<T>())
    }

    /// Iterates over the subscriptions that are a `T`.
    pub fn subscriptions_of<T: 'static>(&self) -> impl Iterator<Item = &T> {
        self.subscriptions.iter().filter_map(|s| s.downcast_ref::<T>())
    }
}

impl std::fmt::Debug for Effects {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effects")
            .field("commands", &self.commands.len())
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}

/// Per-category effects, ordered by category name.
pub type Flattened = BTreeMap<Category, Effects>;

/// Flattens `bag` into per-category command and subscription lists.
///
/// The walk is depth-first in sibling order, so each list keeps construction
/// order. Nothing is de-duplicated. Categories with no leaves are absent.
pub fn flatten<Msg: 'static>(bag: &Bag<Msg>) -> Flattened {
    let mut out = Flattened::new();
    // Taggers on the path to the node being visited, outermost first.
    let mut chain: SmallVec<[Tagger; 4]> = SmallVec::new();
    let mut pending: Vec<(&Node, usize)> = vec![(&*bag.node, 0)];

    while let Some((node, depth)) = pending.pop() {
        chain.truncate(depth);
        match node {
            Node::Leaf {
                category,
                kind,
                value,
                prepare,
            } => {
                let prepared = prepare(&**value, &chain);
                let entry = out.entry(category.clone()).or_default();
                match kind {
                    EffectKind::Command => entry.commands.push(prepared),
                    EffectKind::Subscription => entry.subscriptions.push(prepared),
                }
            }
            Node::Batch(children) => {
                pending.extend(children.iter().rev().map(|child| (&**child, depth)));
            }
            Node::Map(tagger, inner) => {
                chain.push(tagger.clone());
                pending.push((&**inner, depth + 1));
            }
        }
    }
    out
}
