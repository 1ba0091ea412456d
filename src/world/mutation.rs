//! The closed set of single-document updates the world store understands.
//!
//! Every change to persisted game state is expressed as an optional
//! [`Condition`] plus one [`Mutation`]. The store evaluates both against the
//! current bytes of a single document and writes the result atomically, so a
//! condition that held during evaluation still holds at commit time.

use serde::{Deserialize, Serialize};

use crate::world::errors::WorldError;
use crate::world::types::{
    CapacityPolicy, CharacterRecord, ContainerRecord, ContainerRef, Holder, ItemInstance,
    RoomRecord,
};

/// Predicate a document must satisfy for a conditional update to apply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Condition {
    /// The item is currently in the document's item sequence.
    ItemPresent(String),
    /// The document's gold balance is at least this amount.
    GoldAtLeast(u64),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Mutation {
    /// Add (or subtract) gold. Only characters carry gold.
    AdjustGold(i64),
    /// Append an item, subject to the capacity policy.
    PushItem(ItemInstance),
    /// Put an item back at the position it was pulled from after a failed
    /// transfer. Ignores the capacity policy.
    RestoreItem { item: ItemInstance, index: usize },
    /// Remove an item. Removing an absent item leaves the document untouched.
    PullItem(String),
    /// Append to the embedded contents of a container item held in this document.
    PushNested {
        container_id: String,
        item: ItemInstance,
    },
    /// Remove from the embedded contents of a container item held in this document.
    PullNested {
        container_id: String,
        item_id: String,
    },
}

/// What applying a mutation did to the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationEffect {
    /// New gold balance
    Gold(u64),
    Pushed,
    /// The removed item and the position it held
    Pulled { item: ItemInstance, index: usize },
    /// The mutation found nothing to change; the document is not rewritten.
    Untouched,
}

/// Result of a (possibly conditional) update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Applied(MutationEffect),
    /// The condition did not hold, or the document does not exist.
    NotMatched,
}

/// A persisted document the store can run conditions and mutations against.
pub trait Document: Holder {
    /// `None` when the document type has no gold balance.
    fn gold(&self) -> Option<u64> {
        None
    }

    fn gold_mut(&mut self) -> Option<&mut u64> {
        None
    }
}

impl Document for CharacterRecord {
    fn gold(&self) -> Option<u64> {
        Some(self.gold)
    }

    fn gold_mut(&mut self) -> Option<&mut u64> {
        Some(&mut self.gold)
    }
}

impl Document for RoomRecord {}

impl Document for ContainerRecord {}

impl Condition {
    pub fn holds<D: Document>(&self, doc: &D) -> bool {
        match self {
            Condition::ItemPresent(item_id) => doc.holds(item_id),
            Condition::GoldAtLeast(amount) => doc.gold().is_some_and(|gold| gold >= *amount),
        }
    }
}

impl Mutation {
    /// Apply the mutation to an in-memory copy of `target`'s document.
    ///
    /// On error the caller must discard `doc`; nothing is written.
    pub fn apply<D: Document>(
        &self,
        target: &ContainerRef,
        doc: &mut D,
        policy: &CapacityPolicy,
    ) -> Result<MutationEffect, WorldError> {
        match self {
            Mutation::AdjustGold(delta) => {
                let Some(gold) = doc.gold_mut() else {
                    return Err(WorldError::InvalidMutation(format!(
                        "{} has no gold balance",
                        target
                    )));
                };
                *gold = apply_delta(target, *gold, *delta)?;
                Ok(MutationEffect::Gold(*gold))
            }
            Mutation::PushItem(item) => {
                if doc.items().len() >= policy.max_embedded_items {
                    return Err(WorldError::ContainerFull {
                        container: target.clone(),
                        capacity: policy.max_embedded_items,
                    });
                }
                push_unique(target, doc.items_mut(), item.clone())?;
                Ok(MutationEffect::Pushed)
            }
            Mutation::RestoreItem { item, index } => {
                insert_unique(target, doc.items_mut(), *index, item.clone())?;
                Ok(MutationEffect::Pushed)
            }
            Mutation::PullItem(item_id) => Ok(match take_item(doc.items_mut(), item_id) {
                Some((index, item)) => MutationEffect::Pulled { item, index },
                None => MutationEffect::Untouched,
            }),
            Mutation::PushNested { container_id, item } => {
                let Some(contents) = embedded_contents(doc.items_mut(), container_id) else {
                    return Ok(MutationEffect::Untouched);
                };
                push_unique(target, contents, item.clone())?;
                Ok(MutationEffect::Pushed)
            }
            Mutation::PullNested {
                container_id,
                item_id,
            } => {
                let pulled = embedded_contents(doc.items_mut(), container_id)
                    .and_then(|contents| take_item(contents, item_id));
                Ok(match pulled {
                    Some((index, item)) => MutationEffect::Pulled { item, index },
                    None => MutationEffect::Untouched,
                })
            }
        }
    }
}

fn apply_delta(target: &ContainerRef, gold: u64, delta: i64) -> Result<u64, WorldError> {
    if delta >= 0 {
        gold.checked_add(delta.unsigned_abs())
            .ok_or_else(|| WorldError::GoldOverflow(format!("{} + {}", target, delta)))
    } else {
        gold.checked_sub(delta.unsigned_abs()).ok_or_else(|| {
            WorldError::InvalidMutation(format!(
                "{} would drop below zero ({} {})",
                target, gold, delta
            ))
        })
    }
}

/// Item ids are unique within a container.
fn push_unique(
    target: &ContainerRef,
    items: &mut Vec<ItemInstance>,
    item: ItemInstance,
) -> Result<(), WorldError> {
    let end = items.len();
    insert_unique(target, items, end, item)
}

/// Insert at `index`, or at the end when the sequence has since shrunk.
fn insert_unique(
    target: &ContainerRef,
    items: &mut Vec<ItemInstance>,
    index: usize,
    item: ItemInstance,
) -> Result<(), WorldError> {
    if items.iter().any(|existing| existing.id == item.id) {
        return Err(WorldError::InvalidMutation(format!(
            "{} already holds an item with id {}",
            target, item.id
        )));
    }
    items.insert(index.min(items.len()), item);
    Ok(())
}

fn take_item(items: &mut Vec<ItemInstance>, item_id: &str) -> Option<(usize, ItemInstance)> {
    let index = items.iter().position(|item| item.id == item_id)?;
    Some((index, items.remove(index)))
}

fn embedded_contents<'a>(
    items: &'a mut [ItemInstance],
    container_id: &str,
) -> Option<&'a mut Vec<ItemInstance>> {
    items
        .iter_mut()
        .find(|item| item.id == container_id)
        .and_then(|item| item.contents.as_mut())
}
