//! World persistence and the item-transfer protocol.
//! Characters, rooms and container items live as sled documents; items move
//! between them through [`TransferCoordinator`], which relies only on
//! single-document conditional updates for safety under concurrent actors.

pub mod audit;
pub mod errors;
pub mod mutation;
pub mod purchase;
pub mod seed;
pub mod session;
pub mod storage;
pub mod transfer;
pub mod types;

pub use audit::{AuditAction, AuditEntry};
pub use errors::WorldError;
pub use mutation::{Condition, Document, Mutation, MutationEffect, UpdateOutcome};
pub use purchase::{PurchaseReceipt, Settlement};
pub use seed::{
    canonical_world_seed, WorldSeed, CANONICAL_ROOM_IDS, SHOP_STOCK_ROOM_ID, SMITHY_ROOM_ID,
    TOWN_SQUARE_ROOM_ID,
};
pub use session::ActorSession;
pub use storage::{WorldStore, WorldStoreBuilder};
pub use transfer::{TransferCoordinator, TransferReceipt};
pub use types::*;
