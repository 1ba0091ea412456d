//! Race-safe relocation of one item between two containers.
//!
//! A transfer is two single-document writes in a fixed order:
//!
//! 1. Conditionally remove the item from the source ("pull it if it is still
//!    there"). Of all actors racing for the same item, exactly one of these
//!    matches; everyone else gets [`WorldError::Conflict`] and nothing is
//!    written on their behalf.
//! 2. Push the removed item into the destination.
//!
//! Removing before inserting means the worst case of a crash or failure
//! between the two steps is a missing item that the coordinator puts back,
//! never a duplicated one. The coordinator does not retry; callers choose
//! whether to re-read and try again.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::world::audit::{AuditAction, AuditEntry};
use crate::world::errors::WorldError;
use crate::world::mutation::{Mutation, MutationEffect, UpdateOutcome};
use crate::world::session::ActorSession;
use crate::world::storage::WorldStore;
use crate::world::types::{ContainerRef, ItemInstance};

/// Proof of a committed transfer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransferReceipt {
    pub id: Uuid,
    pub source: ContainerRef,
    pub destination: ContainerRef,
    pub item: ItemInstance,
    /// Whether an embedded copy of a container held by the actor was updated too
    pub embedded_copy_synced: bool,
    pub completed_at: DateTime<Utc>,
}

/// Moves items between containers using only per-document conditional updates.
#[derive(Clone)]
pub struct TransferCoordinator {
    store: Arc<WorldStore>,
}

impl TransferCoordinator {
    pub fn new(store: Arc<WorldStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &WorldStore {
        &self.store
    }

    /// Move `item_id` from `source` to `destination` on behalf of `actor`.
    pub fn transfer(
        &self,
        source: &ContainerRef,
        destination: &ContainerRef,
        item_id: &str,
        actor: &mut ActorSession,
    ) -> Result<TransferReceipt, WorldError> {
        validate_route(source, destination, item_id)?;

        let Some((item, index)) = self.store.pull_item_if_present(source, item_id)? else {
            warn!(
                "{} lost the race for {} in {}",
                actor.actor_id(),
                item_id,
                source
            );
            return Err(WorldError::Conflict {
                item_id: item_id.to_string(),
                container: source.clone(),
            });
        };

        if let Err(err) = self.store.push_item(destination, item.clone()) {
            warn!(
                "could not place {} into {}: {}; returning it to {}",
                item_id, destination, err, source
            );
            return Err(self.restore(source, item, index, err));
        }

        let embedded_copy_synced =
            self.sync_embedded_copy(source, destination, &item, actor.actor_id());

        let receipt = TransferReceipt {
            id: Uuid::new_v4(),
            source: source.clone(),
            destination: destination.clone(),
            item,
            embedded_copy_synced,
            completed_at: Utc::now(),
        };
        info!(
            "{} moved {} from {} to {}",
            actor.actor_id(),
            item_id,
            source,
            destination
        );

        self.record(AuditEntry::new(
            receipt.id,
            actor.actor_id(),
            AuditAction::Transfer {
                source: source.clone(),
                destination: destination.clone(),
                item_id: item_id.to_string(),
            },
            format!("moved {} from {} to {}", receipt.item.name, source, destination),
        ));

        if let Err(err) = actor.refresh(&self.store, &[source, destination]) {
            warn!(
                "{} could not refresh cached views after transfer: {}",
                actor.actor_id(),
                err
            );
            actor.invalidate(&[source, destination]);
        }

        Ok(receipt)
    }

    /// Put a pulled item back into its source after the destination refused it.
    fn restore(
        &self,
        source: &ContainerRef,
        item: ItemInstance,
        index: usize,
        original: WorldError,
    ) -> WorldError {
        let item_id = item.id.clone();
        match self.store.restore_item(source, item, index) {
            Ok(()) => {
                debug!("restored {} to {}", item_id, source);
                original
            }
            Err(compensation) => {
                error!(
                    "item {} is out of every container: restore to {} failed: {}",
                    item_id, source, compensation
                );
                WorldError::CompensationFailed {
                    original: Box::new(original),
                    compensation: Box::new(compensation),
                }
            }
        }
    }

    /// Keep the copy of a container embedded in a character's inventory in step
    /// with the container's canonical record.
    ///
    /// The carrier is looked for among the acting character and any character
    /// endpoint of the move; a character that does not hold the container is
    /// left untouched. Only the carrier can touch that copy, so a plain update
    /// is enough. Returns true when an embedded copy was changed.
    fn sync_embedded_copy(
        &self,
        source: &ContainerRef,
        destination: &ContainerRef,
        item: &ItemInstance,
        actor_id: &str,
    ) -> bool {
        let mut carriers = vec![ContainerRef::character(actor_id)];
        for endpoint in [source, destination] {
            if matches!(endpoint, ContainerRef::Character(_))
                && !carriers.iter().any(|known| known.same_document(endpoint))
            {
                carriers.push(endpoint.clone());
            }
        }

        let mut mutations = Vec::new();
        if let ContainerRef::Item(container_id) = source {
            mutations.push(Mutation::PullNested {
                container_id: container_id.clone(),
                item_id: item.id.clone(),
            });
        }
        if let ContainerRef::Item(container_id) = destination {
            mutations.push(Mutation::PushNested {
                container_id: container_id.clone(),
                item: item.clone(),
            });
        }

        let mut synced = false;
        for mutation in &mutations {
            for carrier in &carriers {
                match self.store.update_where(carrier, None, mutation) {
                    Ok(UpdateOutcome::Applied(MutationEffect::Untouched)) => {}
                    Ok(_) => {
                        debug!("synced embedded copy in {} for {}", carrier, item.id);
                        synced = true;
                    }
                    // The actor need not be a character at all
                    Err(WorldError::NotFound(_)) => {}
                    Err(err) => {
                        warn!(
                            "embedded copy in {} is stale after moving {}: {}",
                            carrier, item.id, err
                        );
                    }
                }
            }
        }
        synced
    }

    pub(crate) fn record(&self, entry: AuditEntry) {
        if let Err(err) = self.store.append_audit(&entry) {
            warn!("failed to append audit entry {}: {}", entry.id, err);
        }
    }
}

fn validate_route(
    source: &ContainerRef,
    destination: &ContainerRef,
    item_id: &str,
) -> Result<(), WorldError> {
    if source.same_document(destination) {
        return Err(WorldError::InvalidTransfer(format!(
            "{} is both source and destination",
            source
        )));
    }
    if let ContainerRef::Item(container_id) = destination {
        if container_id == item_id {
            return Err(WorldError::InvalidTransfer(format!(
                "{} cannot be placed inside itself",
                item_id
            )));
        }
    }
    Ok(())
}
