//! Integration tests for buying from a shopkeeper

use std::sync::Arc;

use lootkeeper::world::{
    ActorSession, AuditAction, CapacityPolicy, ContainerRef, Holder, ItemInstance, Settlement,
    ShopRecord, TransferCoordinator, WorldError, WorldStoreBuilder, SHOP_STOCK_ROOM_ID,
};
use tempfile::tempdir;

fn canonical_coordinator(path: &std::path::Path) -> TransferCoordinator {
    let store = WorldStoreBuilder::new(path).open().unwrap();
    TransferCoordinator::new(Arc::new(store))
}

#[test]
fn test_buy_moves_item_and_gold() {
    let tmp = tempdir().unwrap();
    let coordinator = canonical_coordinator(tmp.path());
    let mut session = ActorSession::new("alice");

    let receipt = coordinator
        .buy("alice", "grim", "sword_1", &mut session)
        .unwrap();

    assert_eq!(receipt.price, 40);
    assert_eq!(receipt.buyer_balance, 60);
    assert_eq!(
        receipt.settlement,
        Settlement::Settled {
            shopkeeper_balance: 290
        }
    );
    assert_eq!(receipt.transfer.item.bonus, Some(1));

    let store = coordinator.store();
    let alice = store.get_character("alice").unwrap();
    assert_eq!(alice.gold, 60);
    assert!(alice.holds("sword_1"));
    assert_eq!(store.get_character("grim").unwrap().gold, 290);
    assert!(!store.get_room(SHOP_STOCK_ROOM_ID).unwrap().holds("sword_1"));

    let history = store.recent_audit(10).unwrap();
    assert!(matches!(
        history[0].action,
        AuditAction::Purchase { price: 40, settled: true, .. }
    ));
    assert!(matches!(history[1].action, AuditAction::Transfer { .. }));
}

#[test]
fn test_buy_without_enough_gold_changes_nothing() {
    let tmp = tempdir().unwrap();
    let coordinator = canonical_coordinator(tmp.path());
    let mut session = ActorSession::new("bram");
    let store = coordinator.store();
    let stock_before = store.get_room(SHOP_STOCK_ROOM_ID).unwrap();

    let err = coordinator
        .buy("bram", "grim", "sword_1", &mut session)
        .unwrap_err();

    match err {
        WorldError::InsufficientFunds { character_id, price } => {
            assert_eq!(character_id, "bram");
            assert_eq!(price, 40);
        }
        other => panic!("expected insufficient funds, got {:?}", other),
    }
    let bram = store.get_character("bram").unwrap();
    assert_eq!(bram.gold, 30);
    assert!(bram.inventory.is_empty());
    assert_eq!(store.get_character("grim").unwrap().gold, 250);
    assert_eq!(store.get_room(SHOP_STOCK_ROOM_ID).unwrap(), stock_before);
}

#[test]
fn test_sold_item_conflicts_before_any_debit() {
    let tmp = tempdir().unwrap();
    let coordinator = canonical_coordinator(tmp.path());
    let mut alice = ActorSession::new("alice");
    let mut grim = ActorSession::new("grim");

    // Grim takes the sword off the rack himself
    coordinator
        .transfer(
            &ContainerRef::room(SHOP_STOCK_ROOM_ID),
            &ContainerRef::character("grim"),
            "sword_1",
            &mut grim,
        )
        .unwrap();

    let err = coordinator
        .buy("alice", "grim", "sword_1", &mut alice)
        .unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(coordinator.store().get_character("alice").unwrap().gold, 100);
}

#[test]
fn test_failed_transfer_refunds_buyer() {
    let tmp = tempdir().unwrap();
    let coordinator = canonical_coordinator(tmp.path());
    let store = coordinator.store();
    // A fixed price lets the quote succeed for an item that is not on the rack
    let shop = store.get_shop("grim").unwrap().with_price("sword_2", 45);
    store.put_shop(shop).unwrap();
    let mut session = ActorSession::new("alice");

    let err = coordinator
        .buy("alice", "grim", "sword_2", &mut session)
        .unwrap_err();

    assert!(err.is_conflict());
    let alice = store.get_character("alice").unwrap();
    assert_eq!(alice.gold, 100, "debit must be refunded");
    assert!(!alice.holds("sword_2"));
    assert_eq!(store.get_character("grim").unwrap().gold, 250);

    let history = store.recent_audit(10).unwrap();
    assert_eq!(history.len(), 1);
    assert!(matches!(
        history[0].action,
        AuditAction::Refund { amount: 45, .. }
    ));
}

#[test]
fn test_full_inventory_refunds_and_restocks() {
    let tmp = tempdir().unwrap();
    let store = WorldStoreBuilder::new(tmp.path())
        .with_capacity(CapacityPolicy {
            max_embedded_items: 1,
        })
        .open()
        .unwrap();
    let coordinator = TransferCoordinator::new(Arc::new(store));
    let mut session = ActorSession::new("alice");

    let err = coordinator
        .buy("alice", "grim", "shield_1", &mut session)
        .unwrap_err();

    assert!(matches!(err, WorldError::ContainerFull { .. }));
    let store = coordinator.store();
    assert_eq!(store.get_character("alice").unwrap().gold, 100);
    assert!(store.get_room(SHOP_STOCK_ROOM_ID).unwrap().holds("shield_1"));
}

#[test]
fn test_unpaid_shopkeeper_leaves_purchase_standing() {
    let tmp = tempdir().unwrap();
    let coordinator = canonical_coordinator(tmp.path());
    let store = coordinator.store();
    // A shop whose keeper has no character record cannot be credited
    store
        .put_shop(ShopRecord::new(
            "ghost",
            "Haunted Stall",
            ContainerRef::room(SHOP_STOCK_ROOM_ID),
        ))
        .unwrap();
    let mut session = ActorSession::new("alice");

    let receipt = coordinator
        .buy("alice", "ghost", "potion_1", &mut session)
        .unwrap();

    assert_eq!(receipt.price, 10);
    assert!(matches!(receipt.settlement, Settlement::Outstanding { .. }));
    let alice = store.get_character("alice").unwrap();
    assert_eq!(alice.gold, 90);
    assert!(alice.holds("potion_1"));
}

#[test]
fn test_quote_prefers_override_then_markup() {
    let tmp = tempdir().unwrap();
    let coordinator = canonical_coordinator(tmp.path());
    let shop = coordinator
        .store()
        .get_shop("grim")
        .unwrap()
        .with_markup(1.5)
        .with_price("potion_1", 7);

    assert_eq!(coordinator.quote(&shop, "shield_1").unwrap(), 83);
    assert_eq!(coordinator.quote(&shop, "potion_1").unwrap(), 7);
    assert!(coordinator.quote(&shop, "torch_1").unwrap_err().is_conflict());
}

#[test]
fn test_unknown_shop_is_not_found() {
    let tmp = tempdir().unwrap();
    let coordinator = canonical_coordinator(tmp.path());
    let mut session = ActorSession::new("alice");

    let err = coordinator
        .buy("alice", "nobody", "sword_1", &mut session)
        .unwrap_err();
    assert!(matches!(err, WorldError::NotFound(_)));
    assert_eq!(coordinator.store().get_character("alice").unwrap().gold, 100);
}

#[test]
fn test_item_of_unknown_kind_is_not_for_sale() {
    let tmp = tempdir().unwrap();
    let coordinator = canonical_coordinator(tmp.path());
    let store = coordinator.store();
    let stock = ContainerRef::room(SHOP_STOCK_ROOM_ID);
    store
        .push_item(&stock, ItemInstance::new("relic_1", "relic", "Odd Relic"))
        .unwrap();
    let mut session = ActorSession::new("alice");

    let err = coordinator
        .buy("alice", "grim", "relic_1", &mut session)
        .unwrap_err();

    assert!(matches!(err, WorldError::NotForSale(_)));
    assert_eq!(store.get_character("alice").unwrap().gold, 100);
    assert!(store.get_room(SHOP_STOCK_ROOM_ID).unwrap().holds("relic_1"));
    assert!(store.recent_audit(10).unwrap().is_empty());
}

#[test]
fn test_shop_with_nan_markup_cannot_be_stored() {
    let tmp = tempdir().unwrap();
    let coordinator = canonical_coordinator(tmp.path());
    let store = coordinator.store();
    let shop = store.get_shop("grim").unwrap();

    let err = store.put_shop(shop.clone().with_markup(f64::NAN)).unwrap_err();
    assert!(matches!(err, WorldError::InvalidMutation(_)));
    assert_eq!(store.get_shop("grim").unwrap(), shop);

    let mut session = ActorSession::new("bram");
    let err = coordinator
        .buy("bram", "grim", "shield_1", &mut session)
        .unwrap_err();
    assert!(matches!(err, WorldError::InsufficientFunds { price: 55, .. }));
    assert_eq!(store.get_character("bram").unwrap().gold, 30);
    assert!(store.get_room(SHOP_STOCK_ROOM_ID).unwrap().holds("shield_1"));
}
