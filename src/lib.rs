//! # Lootkeeper - race-safe item transfers for RPG worlds
//!
//! Lootkeeper stores role-playing-game state (characters, rooms, container
//! items, shops) as documents in an embedded sled database and moves items
//! between them without ever duplicating or losing one, even when many actors
//! grab for the same item at once.
//!
//! ## Features
//!
//! - **Optimistic transfers**: every move starts with an atomic "remove it if it
//!   is still there"; losers of a race get a `Conflict` and nothing changes.
//! - **Purchases with compensation**: buy = conditional debit, transfer, credit.
//!   A failed transfer refunds the buyer.
//! - **Nested containers**: pulling from a backpack you carry keeps the copy
//!   embedded in your inventory in step.
//! - **Audit log**: every committed transfer, purchase and refund is recorded.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use lootkeeper::world::{ActorSession, ContainerRef, TransferCoordinator, WorldStore};
//!
//! fn main() -> anyhow::Result<()> {
//!     let store = Arc::new(WorldStore::open("./data/world")?);
//!     let coordinator = TransferCoordinator::new(store);
//!     let mut alice = ActorSession::new("alice");
//!
//!     coordinator.transfer(
//!         &ContainerRef::room("town_square"),
//!         &ContainerRef::character("alice"),
//!         "torch_1",
//!         &mut alice,
//!     )?;
//!     coordinator.buy("alice", "grim", "sword_1", &mut alice)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`world`] - records, the document store, transfers and purchases
//! - [`config`] - configuration management and validation

pub mod config;
pub mod world;
