//! Buying an item from a shopkeeper.
//!
//! A purchase is a short saga over three documents:
//!
//! 1. conditional debit of the buyer ("only if gold >= price"),
//! 2. transfer of the item from the shop's stock into the buyer's inventory,
//! 3. unconditional credit of the shopkeeper.
//!
//! The debit is provisional until step 2 commits. If the transfer fails for
//! any reason the buyer is refunded and the transfer's error is returned.
//! Step 3 is not compensated: if the credit fails the purchase still stands
//! and the receipt reports the settlement as outstanding.

use chrono::{DateTime, Utc};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::world::audit::{AuditAction, AuditEntry};
use crate::world::errors::WorldError;
use crate::world::session::ActorSession;
use crate::world::transfer::{TransferCoordinator, TransferReceipt};
use crate::world::types::{ContainerRef, ShopRecord};

/// Whether the shopkeeper has been paid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Settlement {
    Settled { shopkeeper_balance: u64 },
    /// The credit failed; the buyer paid and holds the item regardless.
    Outstanding { reason: String },
}

impl Settlement {
    pub fn is_settled(&self) -> bool {
        matches!(self, Settlement::Settled { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PurchaseReceipt {
    pub id: Uuid,
    pub buyer: String,
    pub shopkeeper: String,
    pub price: u64,
    pub buyer_balance: u64,
    pub transfer: TransferReceipt,
    pub settlement: Settlement,
    pub completed_at: DateTime<Utc>,
}

impl TransferCoordinator {
    /// What `shopkeeper_id` charges for `item_id` right now.
    ///
    /// Reads only. An item missing from the stock is a [`WorldError::Conflict`].
    pub fn quote(&self, shop: &ShopRecord, item_id: &str) -> Result<u64, WorldError> {
        shop.check_markup()?;
        if let Some(price) = shop.price_overrides.get(item_id) {
            return Ok(*price);
        }
        let stock = self.store().load_container(&shop.stock)?;
        let Some(item) = stock.items.iter().find(|item| item.id == item_id) else {
            return Err(WorldError::Conflict {
                item_id: item_id.to_string(),
                container: shop.stock.clone(),
            });
        };
        let kind = match self.store().get_kind(&item.kind) {
            Ok(kind) => kind,
            Err(WorldError::NotFound(_)) => {
                return Err(WorldError::NotForSale(format!(
                    "{} (unknown kind {})",
                    item_id, item.kind
                )))
            }
            Err(err) => return Err(err),
        };
        Ok(shop.price_for(item_id, &kind))
    }

    /// `character_id` buys `item_id` from the shop run by `shopkeeper_id`.
    pub fn buy(
        &self,
        character_id: &str,
        shopkeeper_id: &str,
        item_id: &str,
        actor: &mut ActorSession,
    ) -> Result<PurchaseReceipt, WorldError> {
        let shop = self.store().get_shop(shopkeeper_id)?;
        let price = self.quote(&shop, item_id)?;
        let delta = credit_delta(price)?;

        let Some(buyer_balance) = self.store().debit_gold_if_at_least(character_id, price)? else {
            info!(
                "{} cannot afford {} from {} ({} gold)",
                character_id, item_id, shopkeeper_id, price
            );
            return Err(WorldError::InsufficientFunds {
                character_id: character_id.to_string(),
                price,
            });
        };

        let buyer = ContainerRef::character(character_id);
        let transfer = match self.transfer(&shop.stock, &buyer, item_id, actor) {
            Ok(receipt) => receipt,
            Err(err) => return Err(self.refund(character_id, price, delta, actor, err)),
        };

        let settlement = match self.store().adjust_gold(shopkeeper_id, delta) {
            Ok(shopkeeper_balance) => Settlement::Settled { shopkeeper_balance },
            Err(err) => {
                warn!(
                    "purchase of {} by {} stands but {} was not paid {} gold: {}",
                    item_id, character_id, shopkeeper_id, price, err
                );
                Settlement::Outstanding {
                    reason: err.to_string(),
                }
            }
        };

        let receipt = PurchaseReceipt {
            id: Uuid::new_v4(),
            buyer: character_id.to_string(),
            shopkeeper: shopkeeper_id.to_string(),
            price,
            buyer_balance,
            transfer,
            settlement,
            completed_at: Utc::now(),
        };
        info!(
            "{} bought {} from {} for {} gold",
            character_id, item_id, shopkeeper_id, price
        );
        self.record(AuditEntry::new(
            receipt.id,
            actor.actor_id(),
            AuditAction::Purchase {
                buyer: character_id.to_string(),
                shopkeeper: shopkeeper_id.to_string(),
                item_id: item_id.to_string(),
                price,
                settled: receipt.settlement.is_settled(),
            },
            format!(
                "{} bought {} from {} for {} gold",
                character_id, receipt.transfer.item.name, shop.name, price
            ),
        ));

        Ok(receipt)
    }

    /// Undo the provisional debit and hand back the error that caused it.
    fn refund(
        &self,
        character_id: &str,
        price: u64,
        delta: i64,
        actor: &ActorSession,
        original: WorldError,
    ) -> WorldError {
        match self.store().adjust_gold(character_id, delta) {
            Ok(balance) => {
                warn!(
                    "refunded {} gold to {} (balance {}) after failed purchase: {}",
                    price, character_id, balance, original
                );
                self.record(AuditEntry::new(
                    Uuid::new_v4(),
                    actor.actor_id(),
                    AuditAction::Refund {
                        character_id: character_id.to_string(),
                        amount: price,
                    },
                    format!("refunded {} gold: {}", price, original),
                ));
                original
            }
            Err(compensation) => {
                error!(
                    "{} paid {} gold without receiving the item; refund failed: {}",
                    character_id, price, compensation
                );
                WorldError::CompensationFailed {
                    original: Box::new(original),
                    compensation: Box::new(compensation),
                }
            }
        }
    }
}

fn credit_delta(price: u64) -> Result<i64, WorldError> {
    i64::try_from(price).map_err(|_| WorldError::GoldOverflow(format!("credit of {}", price)))
}
