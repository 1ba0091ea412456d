use thiserror::Error;

use crate::world::types::ContainerRef;

/// Errors that can arise while reading or mutating the world store.
#[derive(Debug, Error)]
pub enum WorldError {
    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Audit entries and seed files are JSON.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Wrapper around IO errors (directory creation, seed files).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Returned when fetching a record that is not present.
    #[error("record not found: {0}")]
    NotFound(String),

    /// Returned when deserializing a record with an unexpected schema version.
    #[error("schema mismatch for {entity}: expected {expected}, got {found}")]
    SchemaMismatch {
        entity: &'static str,
        expected: u8,
        found: u8,
    },

    /// Another actor removed the item from the source first. Nothing was mutated.
    #[error("conflict: item {item_id} is no longer in {container}")]
    Conflict {
        item_id: String,
        container: ContainerRef,
    },

    /// The conditional debit matched no document. Nothing was mutated.
    #[error("insufficient funds: {character_id} cannot pay {price} gold")]
    InsufficientFunds { character_id: String, price: u64 },

    /// Pushing into the container would exceed the embedded capacity.
    #[error("container full: {container} holds at most {capacity} items")]
    ContainerFull {
        container: ContainerRef,
        capacity: usize,
    },

    #[error("invalid transfer: {0}")]
    InvalidTransfer(String),

    #[error("invalid mutation: {0}")]
    InvalidMutation(String),

    /// The shop has no price for the requested item.
    #[error("not for sale: {0}")]
    NotForSale(String),

    #[error("gold overflow: {0}")]
    GoldOverflow(String),

    #[error("invalid container reference: {0}")]
    InvalidContainerRef(String),

    /// A compensating write failed after the original failure; both are kept.
    #[error("compensation failed after `{original}`: {compensation}")]
    CompensationFailed {
        original: Box<WorldError>,
        compensation: Box<WorldError>,
    },
}

impl WorldError {
    /// True for the outcome of losing an optimistic race.
    pub fn is_conflict(&self) -> bool {
        matches!(self, WorldError::Conflict { .. })
    }
}
