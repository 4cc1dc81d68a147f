use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Order, Units};

/// Identity and balances of a ledger instance.
///
/// There is exactly one per database file, created when the ledger is
/// initialized. The owner is fixed for the life of the ledger: only the
/// owner may list items or withdraw proceeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    /// Stable identity of this ledger instance.
    pub ledger_id: Uuid,
    pub owner: String,
    /// Units held from sales and not yet withdrawn.
    pub balance: Units,
    /// Units swept out by past withdrawals.
    pub withdrawn_total: Units,
    pub created_at: DateTime<Utc>,
}

impl LedgerState {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            ledger_id: Uuid::new_v4(),
            owner: owner.into(),
            balance: 0,
            withdrawn_total: 0,
            created_at: Utc::now(),
        }
    }

    /// Every unit that ever entered the ledger, held or withdrawn.
    pub fn lifetime_total(&self) -> Units {
        self.balance + self.withdrawn_total
    }

    pub fn is_owner(&self, caller: &str) -> bool {
        self.owner == caller
    }
}

/// Total units ever paid into the ledger, derived from the order log.
/// Every order settles at its snapshot cost, so this is the sum of
/// snapshot costs across all recorded orders.
pub fn settled_total(orders: &[Order]) -> Units {
    orders.iter().map(|order| order.amount_paid()).sum()
}

/// Count recorded orders per buyer.
/// Returns a map of buyer -> number of orders.
pub fn count_orders_by_buyer(orders: &[Order]) -> HashMap<String, i64> {
    let mut counts: HashMap<String, i64> = HashMap::new();

    for order in orders {
        *counts.entry(order.buyer.clone()).or_insert(0) += 1;
    }

    counts
}

/// Report produced by a full consistency check of the ledger.
#[derive(Debug, Clone)]
pub struct IntegrityReport {
    pub item_count: i64,
    pub order_count: i64,
    pub event_count: i64,
    pub balance: Units,
    pub withdrawn_total: Units,
    pub settled_total: Units,
    /// True when every unit ever paid in is accounted for:
    /// settled_total == balance + withdrawn_total.
    pub is_balanced: bool,
    pub issues: Vec<String>,
}

impl IntegrityReport {
    pub fn is_healthy(&self) -> bool {
        self.is_balanced && self.issues.is_empty()
    }
}

/// Build an integrity report from the full order log plus stored counters
/// and stats gathered by the storage layer.
///
/// `counters` holds the persisted per-buyer order counters, which must agree
/// with the order log: each buyer's order ids run 1..=counter with no gaps.
#[allow(clippy::too_many_arguments)]
pub fn build_integrity_report(
    orders: &[Order],
    counters: &HashMap<String, i64>,
    item_count: i64,
    event_count: i64,
    purchased_event_count: i64,
    balance: Units,
    withdrawn_total: Units,
    has_sequence_gaps: bool,
    invalid_items: i64,
) -> IntegrityReport {
    let mut issues = Vec::new();

    let settled = settled_total(orders);
    let is_balanced = settled == balance + withdrawn_total;

    if balance < 0 {
        issues.push(format!("ledger balance is negative ({})", balance));
    }
    if withdrawn_total < 0 {
        issues.push(format!(
            "withdrawn total is negative ({})",
            withdrawn_total
        ));
    }

    // Each buyer's order ids must run 1..=n with no gaps, and the persisted
    // counter must equal n.
    let mut ids_by_buyer: HashMap<String, Vec<i64>> = HashMap::new();
    for order in orders {
        ids_by_buyer
            .entry(order.buyer.clone())
            .or_default()
            .push(order.order_id);
    }
    for ids in ids_by_buyer.values_mut() {
        ids.sort_unstable();
    }

    let mut buyer_names: Vec<&String> = ids_by_buyer.keys().collect();
    buyer_names.sort();

    for buyer in buyer_names {
        let ids = &ids_by_buyer[buyer];

        let expected: Vec<i64> = (1..=ids.len() as i64).collect();
        if *ids != expected {
            issues.push(format!(
                "buyer '{}' has order ids {:?}, expected 1..={}",
                buyer,
                ids,
                ids.len()
            ));
        }

        let counter = counters.get(buyer).copied().unwrap_or(0);
        if counter != ids.len() as i64 {
            issues.push(format!(
                "buyer '{}' counter is {} but {} orders are recorded",
                buyer,
                counter,
                ids.len()
            ));
        }
    }

    for (buyer, counter) in counters {
        if *counter > 0 && !ids_by_buyer.contains_key(buyer) {
            issues.push(format!(
                "buyer '{}' counter is {} but no orders are recorded",
                buyer, counter
            ));
        }
    }

    if has_sequence_gaps {
        issues.push("event log has gaps in its sequence numbers".to_string());
    }

    let order_count = orders.len() as i64;
    if purchased_event_count != order_count {
        issues.push(format!(
            "{} purchase events recorded for {} orders",
            purchased_event_count, order_count
        ));
    }

    if invalid_items > 0 {
        issues.push(format!(
            "{} catalog items have a negative cost, rating, or stock",
            invalid_items
        ));
    }

    IntegrityReport {
        item_count,
        order_count,
        event_count,
        balance,
        withdrawn_total,
        settled_total: settled,
        is_balanced,
        issues,
    }
}
