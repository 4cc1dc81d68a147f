use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Item, Units};

pub type OrderId = i64;

/// An immutable record of one purchase.
///
/// Orders are keyed by `(buyer, order_id)`, where `order_id` is a per-buyer
/// sequence starting at 1. The purchased item is stored as a value copy
/// taken at purchase time, never a reference back into the catalog, so
/// re-listing the same catalog id later cannot rewrite what was bought.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub buyer: String,
    /// Per-buyer sequence number, starting at 1.
    pub order_id: OrderId,
    /// When the purchase was committed.
    pub time: DateTime<Utc>,
    /// Snapshot of the listed item as the buyer saw it.
    pub item: Item,
}

impl Order {
    pub fn new(
        buyer: impl Into<String>,
        order_id: OrderId,
        time: DateTime<Utc>,
        item: Item,
    ) -> Self {
        Self {
            buyer: buyer.into(),
            order_id,
            time,
            item,
        }
    }

    /// Amount the buyer paid. Payments match the listed cost exactly, so
    /// this is always the snapshot cost.
    pub fn amount_paid(&self) -> Units {
        self.item.cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_snapshots_item_by_value() {
        let mut listed = Item::new(1, "Shoes", "Clothing", "url", 1500, 4, 5);
        let order = Order::new("bob", 1, Utc::now(), listed.clone());

        // Re-listing mutates the catalog entry, not the recorded order.
        listed.name = "Sneakers".into();
        listed.cost = 9999;

        assert_eq!(order.item.name, "Shoes");
        assert_eq!(order.item.cost, 1500);
        assert_eq!(order.amount_paid(), 1500);
    }

    #[test]
    fn test_order_identity() {
        let item = Item::new(2, "Hat", "Clothing", "url", 200, 3, 9);
        let order = Order::new("alice", 3, Utc::now(), item);

        assert_eq!(order.buyer, "alice");
        assert_eq!(order.order_id, 3);
    }
}
