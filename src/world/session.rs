//! Per-actor cache of container views.
//!
//! An actor (player session or NPC controller) reads containers into local
//! views to decide what to do. Views go stale the moment anyone else writes,
//! which is fine: the transfer protocol never trusts a view, it re-checks
//! presence atomically in the store. After a committed transfer the
//! coordinator refreshes the views of both containers involved.

use std::collections::HashMap;

use log::debug;

use crate::world::errors::WorldError;
use crate::world::storage::WorldStore;
use crate::world::types::{ContainerRef, ContainerView};

#[derive(Debug, Clone)]
pub struct ActorSession {
    actor_id: String,
    views: HashMap<ContainerRef, ContainerView>,
}

impl ActorSession {
    pub fn new(actor_id: &str) -> Self {
        Self {
            actor_id: actor_id.to_string(),
            views: HashMap::new(),
        }
    }

    pub fn actor_id(&self) -> &str {
        &self.actor_id
    }

    /// Load (or reload) a container into the cache and return the fresh view.
    pub fn observe(
        &mut self,
        store: &WorldStore,
        container: &ContainerRef,
    ) -> Result<&ContainerView, WorldError> {
        let view = store.load_container(container)?;
        debug!("{} observed {} ({} items)", self.actor_id, container, view.items.len());
        self.views.insert(container.clone(), view);
        Ok(&self.views[container])
    }

    /// Cached view, if this actor has looked at the container.
    pub fn view(&self, container: &ContainerRef) -> Option<&ContainerView> {
        self.views.get(container)
    }

    /// Reload every listed container. Stops at the first failure.
    pub fn refresh(
        &mut self,
        store: &WorldStore,
        containers: &[&ContainerRef],
    ) -> Result<(), WorldError> {
        for container in containers {
            self.observe(store, container)?;
        }
        Ok(())
    }

    /// Drop cached views so the next read goes to the store.
    pub fn invalidate(&mut self, containers: &[&ContainerRef]) {
        for container in containers {
            self.views.remove(*container);
        }
    }

    pub fn cached_count(&self) -> usize {
        self.views.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::storage::WorldStoreBuilder;
    use crate::world::types::{ItemInstance, RoomRecord};
    use tempfile::TempDir;

    #[test]
    fn observe_caches_and_refresh_replaces() {
        let dir = TempDir::new().expect("tempdir");
        let store = WorldStoreBuilder::new(dir.path())
            .without_world_seed()
            .open()
            .expect("store");
        store
            .put_room(RoomRecord::new("hall", "Hall", ""))
            .expect("room");
        let hall = ContainerRef::room("hall");

        let mut session = ActorSession::new("alice");
        assert!(session.view(&hall).is_none());
        session.observe(&store, &hall).expect("observe");
        assert!(session.view(&hall).is_some_and(|v| v.items.is_empty()));

        store
            .push_item(&hall, ItemInstance::new("torch_1", "torch", "Torch"))
            .expect("push");
        assert!(!session.view(&hall).is_some_and(|v| v.holds("torch_1")), "cache is stale until refreshed");

        session.refresh(&store, &[&hall]).expect("refresh");
        assert!(session.view(&hall).is_some_and(|v| v.holds("torch_1")));

        session.invalidate(&[&hall]);
        assert_eq!(session.cached_count(), 0);
    }
}
