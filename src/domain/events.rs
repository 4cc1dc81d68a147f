use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Item, ItemId, Order, OrderId, Units};

/// A fact appended to the ledger's event log.
///
/// Events are immutable and append-only. Collaborators replay them to
/// reconstruct listing and purchase history without walking per-order state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LedgerEvent {
    /// An item was listed (or re-listed) in the catalog.
    Listed {
        item_id: ItemId,
        name: String,
        category: String,
        cost: Units,
        rating: i64,
        stock: i64,
    },
    /// A purchase was committed.
    Purchased {
        order_id: OrderId,
        buyer: String,
        item_id: ItemId,
        time: DateTime<Utc>,
    },
}

impl LedgerEvent {
    pub fn listed(item: &Item) -> Self {
        LedgerEvent::Listed {
            item_id: item.id,
            name: item.name.clone(),
            category: item.category.clone(),
            cost: item.cost,
            rating: item.rating,
            stock: item.stock,
        }
    }

    pub fn purchased(order: &Order) -> Self {
        LedgerEvent::Purchased {
            order_id: order.order_id,
            buyer: order.buyer.clone(),
            item_id: order.item.id,
            time: order.time,
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            LedgerEvent::Listed { .. } => EventKind::Listed,
            LedgerEvent::Purchased { .. } => EventKind::Purchased,
        }
    }

    /// The catalog id this event is about.
    pub fn item_id(&self) -> ItemId {
        match self {
            LedgerEvent::Listed { item_id, .. } => *item_id,
            LedgerEvent::Purchased { item_id, .. } => *item_id,
        }
    }

    /// The buyer involved, for purchase events.
    pub fn buyer(&self) -> Option<&str> {
        match self {
            LedgerEvent::Listed { .. } => None,
            LedgerEvent::Purchased { buyer, .. } => Some(buyer),
        }
    }

    pub fn order_id(&self) -> Option<OrderId> {
        match self {
            LedgerEvent::Listed { .. } => None,
            LedgerEvent::Purchased { order_id, .. } => Some(*order_id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Listed,
    Purchased,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Listed => "listed",
            EventKind::Purchased => "purchased",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "listed" => Some(EventKind::Listed),
            "purchased" => Some(EventKind::Purchased),
            _ => None,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An event as persisted: the payload plus its position in the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    /// Monotonically increasing position in the log, assigned at append.
    pub sequence: i64,
    /// When the event was appended.
    pub recorded_at: DateTime<Utc>,
    pub event: LedgerEvent,
}
