use std::path::{Path, PathBuf};

use chrono::Utc;
use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::world::audit::AuditEntry;
use crate::world::errors::WorldError;
use crate::world::mutation::{Condition, Document, Mutation, MutationEffect, UpdateOutcome};
use crate::world::seed::{canonical_world_seed, WorldSeed};
use crate::world::types::{
    CapacityPolicy, CharacterRecord, ContainerRecord, ContainerRef, ContainerView, Holder,
    ItemInstance, ItemKind, RoomRecord, ShopRecord, CHARACTER_SCHEMA_VERSION,
    CONTAINER_SCHEMA_VERSION, KIND_SCHEMA_VERSION, ROOM_SCHEMA_VERSION, SHOP_SCHEMA_VERSION,
};

const TREE_PRIMARY: &str = "world";
const TREE_OBJECTS: &str = "world_objects";
const TREE_LOGS: &str = "world_logs";

/// A versioned record stored as one bincode document.
trait Record: Serialize + DeserializeOwned {
    const ENTITY: &'static str;
    const SCHEMA_VERSION: u8;

    fn schema_version(&self) -> u8;

    fn set_schema_version(&mut self, version: u8);

    fn touch(&mut self) {}
}

impl Record for CharacterRecord {
    const ENTITY: &'static str = "character";
    const SCHEMA_VERSION: u8 = CHARACTER_SCHEMA_VERSION;

    fn schema_version(&self) -> u8 {
        self.schema_version
    }

    fn set_schema_version(&mut self, version: u8) {
        self.schema_version = version;
    }

    fn touch(&mut self) {
        CharacterRecord::touch(self);
    }
}

impl Record for RoomRecord {
    const ENTITY: &'static str = "room";
    const SCHEMA_VERSION: u8 = ROOM_SCHEMA_VERSION;

    fn schema_version(&self) -> u8 {
        self.schema_version
    }

    fn set_schema_version(&mut self, version: u8) {
        self.schema_version = version;
    }
}

impl Record for ContainerRecord {
    const ENTITY: &'static str = "container";
    const SCHEMA_VERSION: u8 = CONTAINER_SCHEMA_VERSION;

    fn schema_version(&self) -> u8 {
        self.schema_version
    }

    fn set_schema_version(&mut self, version: u8) {
        self.schema_version = version;
    }
}

impl Record for ItemKind {
    const ENTITY: &'static str = "kind";
    const SCHEMA_VERSION: u8 = KIND_SCHEMA_VERSION;

    fn schema_version(&self) -> u8 {
        self.schema_version
    }

    fn set_schema_version(&mut self, version: u8) {
        self.schema_version = version;
    }
}

impl Record for ShopRecord {
    const ENTITY: &'static str = "shop";
    const SCHEMA_VERSION: u8 = SHOP_SCHEMA_VERSION;

    fn schema_version(&self) -> u8 {
        self.schema_version
    }

    fn set_schema_version(&mut self, version: u8) {
        self.schema_version = version;
    }
}

/// Helper builder so tests can easily create throwaway stores with custom paths.
pub struct WorldStoreBuilder {
    path: PathBuf,
    ensure_world_seed: bool,
    policy: CapacityPolicy,
}

impl WorldStoreBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ensure_world_seed: true,
            policy: CapacityPolicy::default(),
        }
    }

    /// Opt out of seeding the canonical world during initialization (useful for targeted tests).
    pub fn without_world_seed(mut self) -> Self {
        self.ensure_world_seed = false;
        self
    }

    pub fn with_capacity(mut self, policy: CapacityPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn open(self) -> Result<WorldStore, WorldError> {
        WorldStore::open_with_options(self.path, self.ensure_world_seed, self.policy)
    }
}

/// Sled-backed document store for characters, rooms, containers and shops.
///
/// Each record is a single document under a single key. The only
/// synchronization primitive is [`WorldStore::update_where`], which commits
/// with compare-and-swap against the exact bytes it evaluated.
pub struct WorldStore {
    db: sled::Db,
    primary: sled::Tree,
    objects: sled::Tree,
    logs: sled::Tree,
    policy: CapacityPolicy,
    #[cfg(test)]
    faults: std::sync::Mutex<Vec<(ContainerRef, bool)>>,
}

impl WorldStore {
    /// Open (or create) the store rooted at `path`, seeding the canonical world if no
    /// rooms exist yet.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, WorldError> {
        Self::open_with_options(path, true, CapacityPolicy::default())
    }

    fn open_with_options<P: AsRef<Path>>(
        path: P,
        seed_world: bool,
        policy: CapacityPolicy,
    ) -> Result<Self, WorldError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let db = sled::open(path_ref)?;
        let primary = db.open_tree(TREE_PRIMARY)?;
        let objects = db.open_tree(TREE_OBJECTS)?;
        let logs = db.open_tree(TREE_LOGS)?;
        let store = Self {
            db,
            primary,
            objects,
            logs,
            policy,
            #[cfg(test)]
            faults: std::sync::Mutex::new(Vec::new()),
        };

        if seed_world {
            store.seed_world_if_needed()?;
        }

        Ok(store)
    }

    pub fn capacity(&self) -> CapacityPolicy {
        self.policy
    }

    fn character_key(id: &str) -> Vec<u8> {
        format!("characters:{}", id.to_ascii_lowercase()).into_bytes()
    }

    fn room_key(id: &str) -> Vec<u8> {
        format!("rooms:{}", id).into_bytes()
    }

    fn shop_key(shopkeeper_id: &str) -> Vec<u8> {
        format!("shops:{}", shopkeeper_id.to_ascii_lowercase()).into_bytes()
    }

    fn container_key(id: &str) -> Vec<u8> {
        format!("containers:{}", id).into_bytes()
    }

    fn kind_key(id: &str) -> Vec<u8> {
        format!("kinds:{}", id).into_bytes()
    }

    fn locate(&self, target: &ContainerRef) -> (&sled::Tree, Vec<u8>) {
        match target {
            ContainerRef::Character(id) => (&self.primary, Self::character_key(id)),
            ContainerRef::Room(id) => (&self.primary, Self::room_key(id)),
            ContainerRef::Item(id) => (&self.objects, Self::container_key(id)),
        }
    }

    fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, WorldError> {
        Ok(bincode::serialize(value)?)
    }

    fn decode<T: Record>(bytes: &[u8]) -> Result<T, WorldError> {
        let record: T = bincode::deserialize(bytes)?;
        if record.schema_version() != T::SCHEMA_VERSION {
            return Err(WorldError::SchemaMismatch {
                entity: T::ENTITY,
                expected: T::SCHEMA_VERSION,
                found: record.schema_version(),
            });
        }
        Ok(record)
    }

    fn put_record<T: Record>(
        tree: &sled::Tree,
        key: Vec<u8>,
        mut record: T,
    ) -> Result<(), WorldError> {
        record.set_schema_version(T::SCHEMA_VERSION);
        record.touch();
        let bytes = Self::encode(&record)?;
        tree.insert(key, bytes)?;
        tree.flush()?;
        Ok(())
    }

    fn get_record<T: Record>(tree: &sled::Tree, key: &[u8], label: &str) -> Result<T, WorldError> {
        let Some(bytes) = tree.get(key)? else {
            return Err(WorldError::NotFound(format!("{}: {}", T::ENTITY, label)));
        };
        Self::decode(&bytes)
    }

    /// Insert or update a character record.
    pub fn put_character(&self, character: CharacterRecord) -> Result<(), WorldError> {
        let key = Self::character_key(&character.id);
        Self::put_record(&self.primary, key, character)
    }

    /// Fetch a character record by id.
    pub fn get_character(&self, id: &str) -> Result<CharacterRecord, WorldError> {
        Self::get_record(&self.primary, &Self::character_key(id), id)
    }

    /// List all character ids currently stored.
    pub fn list_character_ids(&self) -> Result<Vec<String>, WorldError> {
        self.list_ids(&self.primary, "characters:")
    }

    pub fn put_room(&self, room: RoomRecord) -> Result<(), WorldError> {
        let key = Self::room_key(&room.id);
        Self::put_record(&self.primary, key, room)
    }

    pub fn get_room(&self, id: &str) -> Result<RoomRecord, WorldError> {
        Self::get_record(&self.primary, &Self::room_key(id), id)
    }

    pub fn list_room_ids(&self) -> Result<Vec<String>, WorldError> {
        self.list_ids(&self.primary, "rooms:")
    }

    /// Insert or update the canonical record of a container item.
    pub fn put_container(&self, container: ContainerRecord) -> Result<(), WorldError> {
        let key = Self::container_key(&container.id);
        Self::put_record(&self.objects, key, container)
    }

    pub fn get_container(&self, id: &str) -> Result<ContainerRecord, WorldError> {
        Self::get_record(&self.objects, &Self::container_key(id), id)
    }

    /// Insert or update an item kind definition.
    pub fn put_kind(&self, kind: ItemKind) -> Result<(), WorldError> {
        let key = Self::kind_key(&kind.id);
        Self::put_record(&self.objects, key, kind)
    }

    pub fn get_kind(&self, id: &str) -> Result<ItemKind, WorldError> {
        Self::get_record(&self.objects, &Self::kind_key(id), id)
    }

    /// Insert or update a shop. A markup that is not a positive finite number is rejected.
    pub fn put_shop(&self, shop: ShopRecord) -> Result<(), WorldError> {
        shop.check_markup()?;
        let key = Self::shop_key(&shop.shopkeeper_id);
        Self::put_record(&self.primary, key, shop)
    }

    /// Fetch the shop run by `shopkeeper_id`.
    pub fn get_shop(&self, shopkeeper_id: &str) -> Result<ShopRecord, WorldError> {
        Self::get_record(&self.primary, &Self::shop_key(shopkeeper_id), shopkeeper_id)
    }

    fn list_ids(&self, tree: &sled::Tree, prefix: &str) -> Result<Vec<String>, WorldError> {
        let mut ids = Vec::new();
        for entry in tree.scan_prefix(prefix.as_bytes()) {
            let (key, _) = entry?;
            let text = String::from_utf8_lossy(&key);
            if let Some(id) = text.strip_prefix(prefix) {
                ids.push(id.to_string());
            }
        }
        Ok(ids)
    }

    /// Read a snapshot of the items (and gold, for characters) held by `container`.
    pub fn load_container(&self, container: &ContainerRef) -> Result<ContainerView, WorldError> {
        let (items, gold) = match container {
            ContainerRef::Character(id) => {
                let character = self.get_character(id)?;
                (character.inventory, Some(character.gold))
            }
            ContainerRef::Room(id) => (self.get_room(id)?.floor, None),
            ContainerRef::Item(id) => (self.get_container(id)?.contents, None),
        };
        Ok(ContainerView {
            container: container.clone(),
            items,
            gold,
            loaded_at: Utc::now(),
        })
    }

    /// Atomically apply `mutation` to the document behind `target` if `condition` holds.
    ///
    /// A conditional update against a missing document reports `NotMatched`; an
    /// unconditional one fails with `NotFound`. When another writer replaces the
    /// document between read and commit, the condition is evaluated again against
    /// the new contents.
    pub fn update_where(
        &self,
        target: &ContainerRef,
        condition: Option<&Condition>,
        mutation: &Mutation,
    ) -> Result<UpdateOutcome, WorldError> {
        #[cfg(test)]
        if self.take_fault(target, condition.is_some()) {
            return Err(WorldError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("injected write failure on {}", target),
            )));
        }
        match target {
            ContainerRef::Character(_) => {
                self.update_document::<CharacterRecord>(target, condition, mutation)
            }
            ContainerRef::Room(_) => self.update_document::<RoomRecord>(target, condition, mutation),
            ContainerRef::Item(_) => {
                self.update_document::<ContainerRecord>(target, condition, mutation)
            }
        }
    }

    /// Make the next update of `target` fail. `conditional` selects whether the
    /// conditional or the unconditional kind of update is hit.
    #[cfg(test)]
    pub(crate) fn fail_next_update(&self, target: &ContainerRef, conditional: bool) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.push((target.clone(), conditional));
        }
    }

    #[cfg(test)]
    fn take_fault(&self, target: &ContainerRef, conditional: bool) -> bool {
        let Ok(mut faults) = self.faults.lock() else {
            return false;
        };
        match faults
            .iter()
            .position(|(armed, kind)| armed.same_document(target) && *kind == conditional)
        {
            Some(index) => {
                faults.remove(index);
                true
            }
            None => false,
        }
    }

    fn update_document<D: Record + Document>(
        &self,
        target: &ContainerRef,
        condition: Option<&Condition>,
        mutation: &Mutation,
    ) -> Result<UpdateOutcome, WorldError> {
        let (tree, key) = self.locate(target);
        loop {
            let Some(current) = tree.get(&key)? else {
                if condition.is_some() {
                    debug!("{} missing, conditional update not matched", target);
                    return Ok(UpdateOutcome::NotMatched);
                }
                return Err(WorldError::NotFound(target.to_string()));
            };

            let mut doc: D = Self::decode(&current)?;
            if let Some(condition) = condition {
                if !condition.holds(&doc) {
                    debug!("{} did not match {:?}", target, condition);
                    return Ok(UpdateOutcome::NotMatched);
                }
            }

            let effect = mutation.apply(target, &mut doc, &self.policy)?;
            if effect == MutationEffect::Untouched {
                return Ok(UpdateOutcome::Applied(effect));
            }
            doc.touch();
            let bytes = Self::encode(&doc)?;

            match tree.compare_and_swap(&key, Some(&current), Some(bytes))? {
                Ok(()) => {
                    tree.flush()?;
                    return Ok(UpdateOutcome::Applied(effect));
                }
                Err(_) => {
                    debug!("{} changed during update, re-evaluating", target);
                }
            }
        }
    }

    /// Remove `item_id` from `source` only if it is there right now.
    ///
    /// Returns the removed item and the position it held, or `None` when no
    /// document matched.
    pub fn pull_item_if_present(
        &self,
        source: &ContainerRef,
        item_id: &str,
    ) -> Result<Option<(ItemInstance, usize)>, WorldError> {
        let condition = Condition::ItemPresent(item_id.to_string());
        let mutation = Mutation::PullItem(item_id.to_string());
        match self.update_where(source, Some(&condition), &mutation)? {
            UpdateOutcome::Applied(MutationEffect::Pulled { item, index }) => Ok(Some((item, index))),
            UpdateOutcome::NotMatched => Ok(None),
            UpdateOutcome::Applied(other) => Err(WorldError::InvalidMutation(format!(
                "conditional pull from {} produced {:?}",
                source, other
            ))),
        }
    }

    /// Debit `amount` gold from a character only if the balance covers it.
    ///
    /// Returns the new balance, or `None` when no document matched.
    pub fn debit_gold_if_at_least(
        &self,
        character_id: &str,
        amount: u64,
    ) -> Result<Option<u64>, WorldError> {
        let delta = i64::try_from(amount)
            .map_err(|_| WorldError::GoldOverflow(format!("debit of {}", amount)))?;
        let target = ContainerRef::character(character_id);
        let condition = Condition::GoldAtLeast(amount);
        match self.update_where(&target, Some(&condition), &Mutation::AdjustGold(-delta))? {
            UpdateOutcome::Applied(MutationEffect::Gold(balance)) => Ok(Some(balance)),
            UpdateOutcome::NotMatched => Ok(None),
            UpdateOutcome::Applied(other) => Err(WorldError::InvalidMutation(format!(
                "conditional debit of {} produced {:?}",
                target, other
            ))),
        }
    }

    /// Unconditionally add `delta` gold to a character. Returns the new balance.
    pub fn adjust_gold(&self, character_id: &str, delta: i64) -> Result<u64, WorldError> {
        let target = ContainerRef::character(character_id);
        match self.update_where(&target, None, &Mutation::AdjustGold(delta))? {
            UpdateOutcome::Applied(MutationEffect::Gold(balance)) => Ok(balance),
            other => Err(WorldError::InvalidMutation(format!(
                "gold adjustment of {} produced {:?}",
                target, other
            ))),
        }
    }

    /// Unconditionally append `item` to `destination`, honoring the capacity policy.
    pub fn push_item(
        &self,
        destination: &ContainerRef,
        item: ItemInstance,
    ) -> Result<(), WorldError> {
        self.update_where(destination, None, &Mutation::PushItem(item))?;
        Ok(())
    }

    /// Put an item back at `index` in the container it came from after a failed transfer.
    pub fn restore_item(
        &self,
        source: &ContainerRef,
        item: ItemInstance,
        index: usize,
    ) -> Result<(), WorldError> {
        self.update_where(source, None, &Mutation::RestoreItem { item, index })?;
        Ok(())
    }

    /// Write every record of `seed`, replacing existing documents with the same ids.
    pub fn apply_seed(&self, seed: &WorldSeed) -> Result<usize, WorldError> {
        let mut written = 0usize;
        for kind in &seed.kinds {
            self.put_kind(kind.clone())?;
            written += 1;
        }
        for room in &seed.rooms {
            self.put_room(room.clone())?;
            written += 1;
        }
        for container in &seed.containers {
            self.put_container(container.clone())?;
            written += 1;
        }
        for character in &seed.characters {
            self.put_character(character.clone())?;
            written += 1;
        }
        for shop in &seed.shops {
            self.put_shop(shop.clone())?;
            written += 1;
        }
        debug!("applied world seed ({} records)", written);
        Ok(written)
    }

    pub fn seed_world_if_needed(&self) -> Result<usize, WorldError> {
        if self.primary.scan_prefix(b"rooms:").next().is_some() {
            return Ok(0);
        }
        self.apply_seed(&canonical_world_seed(Utc::now()))
    }

    /// Append an entry to the audit log.
    pub fn append_audit(&self, entry: &AuditEntry) -> Result<(), WorldError> {
        // Monotonic per database, so keys sort in append order
        let key = format!("audit:{:020}", self.db.generate_id()?).into_bytes();
        let bytes = serde_json::to_vec(entry)?;
        self.logs.insert(key, bytes)?;
        self.logs.flush()?;
        Ok(())
    }

    /// Most recent audit entries, newest first.
    pub fn recent_audit(&self, limit: usize) -> Result<Vec<AuditEntry>, WorldError> {
        let mut entries = Vec::new();
        for entry in self.logs.scan_prefix(b"audit:").rev().take(limit) {
            let (_, value) = entry?;
            entries.push(serde_json::from_slice(&value)?);
        }
        Ok(entries)
    }

    /// True when `character_id` carries a container item with id `container_id`.
    pub fn character_holds(&self, character_id: &str, container_id: &str) -> Result<bool, WorldError> {
        Ok(self.get_character(character_id)?.holds(container_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::seed::{CANONICAL_ROOM_IDS, SHOP_STOCK_ROOM_ID};
    use tempfile::TempDir;

    fn empty_store(dir: &TempDir) -> WorldStore {
        WorldStoreBuilder::new(dir.path())
            .without_world_seed()
            .open()
            .expect("store")
    }

    #[test]
    fn store_round_trip_character() {
        let dir = TempDir::new().expect("tempdir");
        let store = empty_store(&dir);
        let character = CharacterRecord::new("Alice", "Alice", "square").with_gold(42);
        store.put_character(character).expect("put");

        let fetched = store.get_character("alice").expect("get");
        assert_eq!(fetched.gold, 42);
        assert_eq!(fetched.schema_version, CHARACTER_SCHEMA_VERSION);
        assert_eq!(store.list_character_ids().expect("ids"), vec!["alice"]);
    }

    #[test]
    fn missing_records_are_not_found() {
        let dir = TempDir::new().expect("tempdir");
        let store = empty_store(&dir);
        assert!(matches!(store.get_room("nowhere"), Err(WorldError::NotFound(_))));
        assert!(matches!(store.get_shop("nobody"), Err(WorldError::NotFound(_))));
    }

    #[test]
    fn conditional_update_on_missing_document_is_not_matched() {
        let dir = TempDir::new().expect("tempdir");
        let store = empty_store(&dir);
        let pulled = store
            .pull_item_if_present(&ContainerRef::room("void"), "torch")
            .expect("pull");
        assert!(pulled.is_none());

        let err = store
            .push_item(&ContainerRef::room("void"), ItemInstance::new("t", "torch", "Torch"))
            .unwrap_err();
        assert!(matches!(err, WorldError::NotFound(_)));
    }

    #[test]
    fn conditional_pull_removes_once() {
        let dir = TempDir::new().expect("tempdir");
        let store = empty_store(&dir);
        store
            .put_room(
                RoomRecord::new("hall", "Hall", "")
                    .with_item(ItemInstance::new("torch_1", "torch", "Torch")),
            )
            .expect("room");

        let hall = ContainerRef::room("hall");
        let first = store.pull_item_if_present(&hall, "torch_1").expect("first");
        let second = store.pull_item_if_present(&hall, "torch_1").expect("second");
        assert_eq!(first.map(|(item, index)| (item.id, index)), Some(("torch_1".to_string(), 0)));
        assert!(second.is_none());
        assert!(store.get_room("hall").expect("room").floor.is_empty());
    }

    #[test]
    fn stale_schema_is_rejected_on_read_and_update() {
        let dir = TempDir::new().expect("tempdir");
        let store = empty_store(&dir);
        let mut character = CharacterRecord::new("old", "Old Timer", "hall").with_gold(5);
        character.schema_version = 99;
        let bytes = bincode::serialize(&character).expect("encode");
        store
            .primary
            .insert(WorldStore::character_key("old"), bytes)
            .expect("raw insert");

        let expect_mismatch = |err: WorldError| match err {
            WorldError::SchemaMismatch {
                entity,
                expected,
                found,
            } => {
                assert_eq!(entity, "character");
                assert_eq!(expected, CHARACTER_SCHEMA_VERSION);
                assert_eq!(found, 99);
            }
            other => panic!("expected schema mismatch, got {:?}", other),
        };

        expect_mismatch(store.get_character("old").unwrap_err());
        expect_mismatch(
            store
                .update_where(&ContainerRef::character("old"), None, &Mutation::AdjustGold(1))
                .unwrap_err(),
        );
        expect_mismatch(store.debit_gold_if_at_least("old", 1).unwrap_err());
    }

    #[test]
    fn shop_with_bad_markup_is_not_stored() {
        let dir = TempDir::new().expect("tempdir");
        let store = empty_store(&dir);
        let shop = ShopRecord::new("grim", "Anvil", ContainerRef::room("stock"));
        for bad in [f64::NAN, 0.0, -2.0] {
            let err = store.put_shop(shop.clone().with_markup(bad)).unwrap_err();
            assert!(matches!(err, WorldError::InvalidMutation(_)));
        }
        assert!(matches!(store.get_shop("grim"), Err(WorldError::NotFound(_))));
        store.put_shop(shop.with_markup(1.1)).expect("valid shop");
    }

    #[test]
    fn debit_requires_balance() {
        let dir = TempDir::new().expect("tempdir");
        let store = empty_store(&dir);
        store
            .put_character(CharacterRecord::new("bram", "Bram", "hall").with_gold(30))
            .expect("put");

        assert_eq!(store.debit_gold_if_at_least("bram", 40).expect("debit"), None);
        assert_eq!(store.debit_gold_if_at_least("bram", 30).expect("debit"), Some(0));
        assert_eq!(store.debit_gold_if_at_least("ghost", 1).expect("debit"), None);
        assert_eq!(store.adjust_gold("bram", 12).expect("credit"), 12);
    }

    #[test]
    fn seeding_world_only_happens_once() {
        let dir = TempDir::new().expect("tempdir");
        {
            let store = WorldStoreBuilder::new(dir.path()).open().expect("store");
            for room_id in CANONICAL_ROOM_IDS {
                store.get_room(room_id).expect("room present");
            }
        }

        let store = WorldStoreBuilder::new(dir.path())
            .without_world_seed()
            .open()
            .expect("reopen store");
        let count = store.seed_world_if_needed().expect("seed check");
        assert_eq!(count, 0, "should not reseed when rooms already exist");
        let stock = store.get_room(SHOP_STOCK_ROOM_ID).expect("stock room persists");
        assert!(!stock.floor.is_empty());
    }

    #[test]
    fn audit_entries_come_back_newest_first() {
        let dir = TempDir::new().expect("tempdir");
        let store = empty_store(&dir);
        for n in 0..3 {
            let entry = AuditEntry::note("tester", &format!("entry {}", n));
            store.append_audit(&entry).expect("append");
        }
        let entries = store.recent_audit(2).expect("recent");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].summary, "entry 2");
        assert_eq!(entries[1].summary, "entry 1");
    }
}
