//! Append-only audit trail of committed transfers and purchases.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::world::types::ContainerRef;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditAction {
    Transfer {
        source: ContainerRef,
        destination: ContainerRef,
        item_id: String,
    },
    Purchase {
        buyer: String,
        shopkeeper: String,
        item_id: String,
        price: u64,
        settled: bool,
    },
    Refund {
        character_id: String,
        amount: u64,
    },
    Note,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditEntry {
    pub id: Uuid,
    pub at: DateTime<Utc>,
    pub actor: String,
    pub action: AuditAction,
    pub summary: String,
}

impl AuditEntry {
    pub fn new(id: Uuid, actor: &str, action: AuditAction, summary: String) -> Self {
        Self {
            id,
            at: Utc::now(),
            actor: actor.to_string(),
            action,
            summary,
        }
    }

    /// Free-form entry, mostly for operators and tests.
    pub fn note(actor: &str, summary: &str) -> Self {
        Self::new(Uuid::new_v4(), actor, AuditAction::Note, summary.to_string())
    }
}
