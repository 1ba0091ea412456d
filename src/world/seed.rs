//! Canonical demo world and the JSON seed loader.
//!
//! Seed files let operators author a world without recompiling. Item
//! instances are only ever created here; the transfer coordinator relocates
//! them but never mints or destroys one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::world::errors::WorldError;
use crate::world::types::{
    check_markup, CharacterRecord, ContainerRecord, ContainerRef, ItemInstance, ItemKind, RoomRecord,
    ShopRecord,
};

pub const TOWN_SQUARE_ROOM_ID: &str = "town_square";
pub const SMITHY_ROOM_ID: &str = "smithy";
pub const SHOP_STOCK_ROOM_ID: &str = "smithy_stock";
pub const CANONICAL_ROOM_IDS: [&str; 3] = [TOWN_SQUARE_ROOM_ID, SMITHY_ROOM_ID, SHOP_STOCK_ROOM_ID];

/// Everything needed to author (or re-author) a world.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorldSeed {
    pub kinds: Vec<ItemKind>,
    pub rooms: Vec<RoomRecord>,
    pub containers: Vec<ContainerRecord>,
    pub characters: Vec<CharacterRecord>,
    pub shops: Vec<ShopRecord>,
}

/// The small market town used by `lootkeeper seed` and the integration tests.
pub fn canonical_world_seed(now: DateTime<Utc>) -> WorldSeed {
    let kinds = vec![
        ItemKind::new("sword", "Iron Sword", 40).with_description("Plain, sharp, dependable."),
        ItemKind::new("shield", "Oak Shield", 55),
        ItemKind::new("rope", "Coil of Rope", 5),
        ItemKind::new("torch", "Torch", 2),
        ItemKind::new("backpack", "Backpack", 20).with_description("Holds a dozen small things."),
        ItemKind::new("potion", "Healing Potion", 10),
    ];

    let rope = ItemInstance::new("rope_1", "rope", "Coil of Rope");
    let backpack = ContainerRecord::new("backpack_alice", "Alice's Backpack").with_item(rope.clone());
    let backpack_item = ItemInstance::new("backpack_alice", "backpack", "Alice's Backpack")
        .with_contents(vec![rope]);

    let rooms = vec![
        RoomRecord::new(
            TOWN_SQUARE_ROOM_ID,
            "Town Square",
            "Cobblestones ring a dry fountain.",
        )
        .with_item(ItemInstance::new("torch_1", "torch", "Torch"))
        .with_occupant("alice")
        .with_occupant("bram")
        .with_created_at(now),
        RoomRecord::new(SMITHY_ROOM_ID, "Smithy", "Heat rolls off the forge.")
            .with_occupant("grim")
            .with_created_at(now),
        RoomRecord::new(
            SHOP_STOCK_ROOM_ID,
            "Smithy Stockroom",
            "Racks of finished work wait for buyers.",
        )
        .with_item(ItemInstance::new("sword_1", "sword", "Iron Sword").with_bonus(1))
        .with_item(ItemInstance::new("shield_1", "shield", "Oak Shield"))
        .with_item(ItemInstance::new("potion_1", "potion", "Healing Potion").with_quantity(3))
        .with_created_at(now),
    ];

    let characters = vec![
        CharacterRecord::new("alice", "Alice", TOWN_SQUARE_ROOM_ID)
            .with_gold(100)
            .with_item(backpack_item),
        CharacterRecord::new("bram", "Bram", TOWN_SQUARE_ROOM_ID).with_gold(30),
        CharacterRecord::new("grim", "Grim the Smith", SMITHY_ROOM_ID).with_gold(250),
    ];

    let shops = vec![ShopRecord::new(
        "grim",
        "The Iron Anvil",
        ContainerRef::room(SHOP_STOCK_ROOM_ID),
    )];

    WorldSeed {
        kinds,
        rooms,
        containers: vec![backpack],
        characters,
        shops,
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct SeedFile {
    #[serde(default)]
    kinds: Vec<KindSeed>,
    #[serde(default)]
    rooms: Vec<RoomSeed>,
    #[serde(default)]
    containers: Vec<ContainerSeed>,
    #[serde(default)]
    characters: Vec<CharacterSeed>,
    #[serde(default)]
    shops: Vec<ShopSeed>,
}

#[derive(Debug, Deserialize, Serialize)]
struct KindSeed {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
    base_price: u64,
}

#[derive(Debug, Deserialize, Serialize)]
struct RoomSeed {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    floor: Vec<ItemInstance>,
    #[serde(default)]
    occupants: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize)]
struct ContainerSeed {
    id: String,
    name: String,
    #[serde(default)]
    contents: Vec<ItemInstance>,
}

#[derive(Debug, Deserialize, Serialize)]
struct CharacterSeed {
    id: String,
    name: String,
    #[serde(default)]
    gold: u64,
    room: String,
    #[serde(default)]
    inventory: Vec<ItemInstance>,
}

#[derive(Debug, Deserialize, Serialize)]
struct ShopSeed {
    shopkeeper: String,
    name: String,
    /// Container reference in text form, e.g. `room:smithy_stock`
    stock: String,
    #[serde(default)]
    markup: Option<f64>,
    #[serde(default)]
    prices: HashMap<String, u64>,
}

impl WorldSeed {
    /// Load a seed from a JSON file.
    ///
    /// Shops that do not name a markup get `default_markup`.
    pub fn from_json_file<P: AsRef<Path>>(path: P, default_markup: f64) -> Result<Self, WorldError> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&contents, default_markup)
    }

    pub fn from_json_str(contents: &str, default_markup: f64) -> Result<Self, WorldError> {
        let file: SeedFile = serde_json::from_str(contents)?;
        let now = Utc::now();

        let kinds = file
            .kinds
            .into_iter()
            .map(|seed| ItemKind::new(&seed.id, &seed.name, seed.base_price).with_description(&seed.description))
            .collect();

        let rooms = file
            .rooms
            .into_iter()
            .map(|seed| {
                let mut room = RoomRecord::new(&seed.id, &seed.name, &seed.description)
                    .with_created_at(now);
                room.floor = seed.floor;
                for occupant in seed.occupants {
                    room = room.with_occupant(&occupant);
                }
                room
            })
            .collect();

        let containers = file
            .containers
            .into_iter()
            .map(|seed| {
                let mut container = ContainerRecord::new(&seed.id, &seed.name);
                container.contents = seed.contents;
                container
            })
            .collect();

        let characters = file
            .characters
            .into_iter()
            .map(|seed| {
                let mut character =
                    CharacterRecord::new(&seed.id, &seed.name, &seed.room).with_gold(seed.gold);
                character.inventory = seed.inventory;
                character
            })
            .collect();

        let mut shops = Vec::new();
        for seed in file.shops {
            let stock: ContainerRef = seed.stock.parse()?;
            let shop_markup = seed.markup.unwrap_or(default_markup);
            check_markup(&seed.shopkeeper, shop_markup)?;
            let mut shop =
                ShopRecord::new(&seed.shopkeeper, &seed.name, stock).with_markup(shop_markup);
            shop.price_overrides = seed.prices;
            shops.push(shop);
        }

        Ok(Self {
            kinds,
            rooms,
            containers,
            characters,
            shops,
        })
    }

    /// Reprice every shop in the seed.
    pub fn with_shop_markup(mut self, markup: f64) -> Self {
        for shop in &mut self.shops {
            shop.markup = markup;
        }
        self
    }

    /// Ids of item instances that appear in more than one placement.
    ///
    /// Embedded copies inside a container item are skipped; only the canonical
    /// container record counts as the owner of its contents.
    pub fn duplicate_item_ids(&self) -> Vec<String> {
        let mut seen: HashMap<&str, usize> = HashMap::new();
        let placements = self
            .rooms
            .iter()
            .flat_map(|room| room.floor.iter())
            .chain(self.characters.iter().flat_map(|c| c.inventory.iter()))
            .chain(self.containers.iter().flat_map(|c| c.contents.iter()));
        for item in placements {
            *seen.entry(item.id.as_str()).or_default() += 1;
        }
        let mut dupes: Vec<String> = seen
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(id, _)| id.to_string())
            .collect();
        dupes.sort();
        dupes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_world_places_each_item_once() {
        let seed = canonical_world_seed(Utc::now());
        assert!(seed.duplicate_item_ids().is_empty());
        assert_eq!(seed.rooms.len(), CANONICAL_ROOM_IDS.len());
        assert_eq!(seed.shops[0].stock, ContainerRef::room(SHOP_STOCK_ROOM_ID));
    }

    #[test]
    fn json_seed_parses() {
        let json = r#"{
            "kinds": [{"id": "lamp", "name": "Brass Lamp", "base_price": 12}],
            "rooms": [{"id": "attic", "name": "Attic",
                       "floor": [{"id": "lamp_1", "kind": "lamp", "name": "Brass Lamp", "quantity": 1}],
                       "occupants": ["mira"]}],
            "characters": [{"id": "mira", "name": "Mira", "gold": 15, "room": "attic"}],
            "shops": [{"shopkeeper": "mira", "name": "Attic Sale", "stock": "room:attic",
                       "markup": 1.5, "prices": {"lamp_1": 9}}]
        }"#;
        let seed = WorldSeed::from_json_str(json, 1.0).expect("seed");
        assert_eq!(seed.kinds[0].base_price, 12);
        assert_eq!(seed.rooms[0].floor[0].id, "lamp_1");
        assert!(seed.rooms[0].occupants.contains("mira"));
        assert_eq!(seed.characters[0].gold, 15);
        assert_eq!(seed.shops[0].markup, 1.5);
        assert_eq!(seed.shops[0].price_overrides.get("lamp_1"), Some(&9));
    }

    #[test]
    fn json_seed_rejects_bad_stock_reference() {
        let json = r#"{"shops": [{"shopkeeper": "x", "name": "X", "stock": "attic"}]}"#;
        let err = WorldSeed::from_json_str(json, 1.0).unwrap_err();
        assert!(matches!(err, WorldError::InvalidContainerRef(_)));
    }

    #[test]
    fn json_seed_applies_default_markup_only_when_unset() {
        let json = r#"{"shops": [
            {"shopkeeper": "a", "name": "A", "stock": "room:a"},
            {"shopkeeper": "b", "name": "B", "stock": "room:b", "markup": 2.0}
        ]}"#;
        let seed = WorldSeed::from_json_str(json, 1.5).expect("seed");
        assert_eq!(seed.shops[0].markup, 1.5);
        assert_eq!(seed.shops[1].markup, 2.0);

        let err = WorldSeed::from_json_str(json, 0.0).unwrap_err();
        assert!(matches!(err, WorldError::InvalidMutation(_)));
    }

    #[test]
    fn duplicate_placements_are_reported() {
        let mut seed = canonical_world_seed(Utc::now());
        seed.rooms[0]
            .floor
            .push(ItemInstance::new("sword_1", "sword", "Iron Sword"));
        assert_eq!(seed.duplicate_item_ids(), vec!["sword_1".to_string()]);
    }
}
