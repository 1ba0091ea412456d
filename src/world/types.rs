use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use crate::world::errors::WorldError;

pub const KIND_SCHEMA_VERSION: u8 = 1;
pub const CHARACTER_SCHEMA_VERSION: u8 = 1;
pub const ROOM_SCHEMA_VERSION: u8 = 1;
pub const CONTAINER_SCHEMA_VERSION: u8 = 1;
pub const SHOP_SCHEMA_VERSION: u8 = 1;

/// Default cap on any embedded item sequence.
pub const DEFAULT_MAX_EMBEDDED_ITEMS: usize = 64;

/// Address of anything that holds a sequence of items.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ContainerRef {
    /// A character's active inventory.
    Character(String),
    /// A room's floor inventory.
    Room(String),
    /// The canonical record of an item acting as a container.
    Item(String),
}

impl ContainerRef {
    pub fn character(id: &str) -> Self {
        Self::Character(id.to_string())
    }

    pub fn room(id: &str) -> Self {
        Self::Room(id.to_string())
    }

    pub fn item(id: &str) -> Self {
        Self::Item(id.to_string())
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Character(id) | Self::Room(id) | Self::Item(id) => id,
        }
    }

    /// True when both refs address the same stored document.
    ///
    /// Character ids are keyed case-insensitively; rooms and items are not.
    pub fn same_document(&self, other: &ContainerRef) -> bool {
        match (self, other) {
            (Self::Character(a), Self::Character(b)) => a.eq_ignore_ascii_case(b),
            _ => self == other,
        }
    }
}

impl fmt::Display for ContainerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Character(id) => write!(f, "char:{}", id),
            Self::Room(id) => write!(f, "room:{}", id),
            Self::Item(id) => write!(f, "item:{}", id),
        }
    }
}

impl FromStr for ContainerRef {
    type Err = WorldError;

    /// Parses `char:<id>`, `room:<id>` or `item:<id>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((prefix, id)) = s.trim().split_once(':') else {
            return Err(WorldError::InvalidContainerRef(s.to_string()));
        };
        if id.is_empty() {
            return Err(WorldError::InvalidContainerRef(s.to_string()));
        }
        match prefix.to_ascii_lowercase().as_str() {
            "char" | "character" => Ok(Self::Character(id.to_string())),
            "room" => Ok(Self::Room(id.to_string())),
            "item" => Ok(Self::Item(id.to_string())),
            _ => Err(WorldError::InvalidContainerRef(s.to_string())),
        }
    }
}

/// Immutable item type definition. Instances point at a kind by id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemKind {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Price in gold before shop markup
    pub base_price: u64,
    #[serde(default = "default_kind_schema")]
    pub schema_version: u8,
}

fn default_kind_schema() -> u8 {
    KIND_SCHEMA_VERSION
}

impl ItemKind {
    pub fn new(id: &str, name: &str, base_price: u64) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: String::new(),
            base_price,
            schema_version: KIND_SCHEMA_VERSION,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }
}

/// A concrete item sitting in exactly one container.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemInstance {
    /// Unique within the container currently holding it
    pub id: String,
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub bonus: Option<i32>,
    pub quantity: u32,
    /// Embedded copy of the contents when this item is itself a container
    #[serde(default)]
    pub contents: Option<Vec<ItemInstance>>,
}

impl ItemInstance {
    pub fn new(id: &str, kind: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            kind: kind.to_string(),
            name: name.to_string(),
            bonus: None,
            quantity: 1,
            contents: None,
        }
    }

    pub fn with_bonus(mut self, bonus: i32) -> Self {
        self.bonus = Some(bonus);
        self
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity.max(1);
        self
    }

    /// Mark the item as a container holding `contents`.
    pub fn with_contents(mut self, contents: Vec<ItemInstance>) -> Self {
        self.contents = Some(contents);
        self
    }

    pub fn is_container(&self) -> bool {
        self.contents.is_some()
    }
}

/// Anything persisted with an embedded item sequence.
pub trait Holder {
    fn items(&self) -> &[ItemInstance];
    fn items_mut(&mut self) -> &mut Vec<ItemInstance>;

    fn find_item(&self, item_id: &str) -> Option<&ItemInstance> {
        self.items().iter().find(|item| item.id == item_id)
    }

    fn holds(&self, item_id: &str) -> bool {
        self.find_item(item_id).is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CharacterRecord {
    pub id: String,
    pub display_name: String,
    pub gold: u64,
    #[serde(default)]
    pub inventory: Vec<ItemInstance>,
    pub room: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl CharacterRecord {
    pub fn new(id: &str, display_name: &str, room: &str) -> Self {
        let now = Utc::now();
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            gold: 0,
            inventory: Vec::new(),
            room: room.to_string(),
            created_at: now,
            updated_at: now,
            schema_version: CHARACTER_SCHEMA_VERSION,
        }
    }

    pub fn with_gold(mut self, gold: u64) -> Self {
        self.gold = gold;
        self
    }

    pub fn with_item(mut self, item: ItemInstance) -> Self {
        self.inventory.push(item);
        self
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Holder for CharacterRecord {
    fn items(&self) -> &[ItemInstance] {
        &self.inventory
    }

    fn items_mut(&mut self) -> &mut Vec<ItemInstance> {
        &mut self.inventory
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomRecord {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub floor: Vec<ItemInstance>,
    /// Character ids currently present
    #[serde(default)]
    pub occupants: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl RoomRecord {
    pub fn new(id: &str, name: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            floor: Vec::new(),
            occupants: BTreeSet::new(),
            created_at: Utc::now(),
            schema_version: ROOM_SCHEMA_VERSION,
        }
    }

    pub fn with_item(mut self, item: ItemInstance) -> Self {
        self.floor.push(item);
        self
    }

    pub fn with_occupant(mut self, character_id: &str) -> Self {
        self.occupants.insert(character_id.to_string());
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

impl Holder for RoomRecord {
    fn items(&self) -> &[ItemInstance] {
        &self.floor
    }

    fn items_mut(&mut self) -> &mut Vec<ItemInstance> {
        &mut self.floor
    }
}

/// Canonical record for an item that holds other items (backpack, chest).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContainerRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub contents: Vec<ItemInstance>,
    pub schema_version: u8,
}

impl ContainerRecord {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            contents: Vec::new(),
            schema_version: CONTAINER_SCHEMA_VERSION,
        }
    }

    pub fn with_item(mut self, item: ItemInstance) -> Self {
        self.contents.push(item);
        self
    }
}

impl Holder for ContainerRecord {
    fn items(&self) -> &[ItemInstance] {
        &self.contents
    }

    fn items_mut(&mut self) -> &mut Vec<ItemInstance> {
        &mut self.contents
    }
}

/// A shopkeeper's storefront. Keyed by the shopkeeper's character id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShopRecord {
    pub shopkeeper_id: String,
    pub name: String,
    /// Where goods for sale are kept
    pub stock: ContainerRef,
    /// Multiplier applied to an item kind's base price
    pub markup: f64,
    /// Fixed prices per item instance id (override markup pricing)
    #[serde(default)]
    pub price_overrides: HashMap<String, u64>,
    pub schema_version: u8,
}

impl ShopRecord {
    pub fn new(shopkeeper_id: &str, name: &str, stock: ContainerRef) -> Self {
        Self {
            shopkeeper_id: shopkeeper_id.to_string(),
            name: name.to_string(),
            stock,
            markup: 1.0,
            price_overrides: HashMap::new(),
            schema_version: SHOP_SCHEMA_VERSION,
        }
    }

    pub fn with_markup(mut self, markup: f64) -> Self {
        self.markup = markup;
        self
    }

    pub fn with_price(mut self, item_id: &str, price: u64) -> Self {
        self.price_overrides.insert(item_id.to_string(), price);
        self
    }

    /// Reject a markup that would price goods at zero or nonsense.
    pub fn check_markup(&self) -> Result<(), WorldError> {
        check_markup(&self.shopkeeper_id, self.markup)
    }

    /// Price of an item of `kind`, honoring any fixed price for `item_id`.
    pub fn price_for(&self, item_id: &str, kind: &ItemKind) -> u64 {
        if let Some(price) = self.price_overrides.get(item_id) {
            return *price;
        }
        (kind.base_price as f64 * self.markup).round() as u64
    }
}

/// A markup must be a finite multiplier above zero.
pub fn check_markup(shopkeeper_id: &str, markup: f64) -> Result<(), WorldError> {
    if !markup.is_finite() || markup <= 0.0 {
        return Err(WorldError::InvalidMutation(format!(
            "shop {} has markup {}",
            shopkeeper_id, markup
        )));
    }
    Ok(())
}

/// Capacity limits applied to embedded item sequences.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CapacityPolicy {
    pub max_embedded_items: usize,
}

impl Default for CapacityPolicy {
    fn default() -> Self {
        Self {
            max_embedded_items: DEFAULT_MAX_EMBEDDED_ITEMS,
        }
    }
}

/// Snapshot of one container as read from the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContainerView {
    pub container: ContainerRef,
    pub items: Vec<ItemInstance>,
    /// Only characters carry gold
    pub gold: Option<u64>,
    pub loaded_at: DateTime<Utc>,
}

impl ContainerView {
    pub fn holds(&self, item_id: &str) -> bool {
        self.items.iter().any(|item| item.id == item_id)
    }
}
