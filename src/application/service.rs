use crate::domain::{
    build_integrity_report, EventKind, IntegrityReport, Item, ItemId, LedgerState, Order,
    OrderId, StoredEvent, Units,
};
use crate::storage::{PurchaseOutcome, Repository};

use super::MarketError;

/// Application service providing high-level operations for the marketplace
/// ledger. This is the primary interface for any client (CLI, API, TUI, etc.).
pub struct MarketService {
    repo: Repository,
}

/// Result of listing an item
#[derive(Debug)]
pub struct ListingResult {
    pub item: Item,
    /// True when an earlier listing under the same id was replaced.
    pub replaced: bool,
    /// Event log sequence of the listing event.
    pub sequence: i64,
}

/// Result of a completed purchase
#[derive(Debug)]
pub struct PurchaseResult {
    pub order: Order,
    /// Event log sequence of the purchase event.
    pub sequence: i64,
}

/// Result of withdrawing the balance
#[derive(Debug)]
pub struct WithdrawResult {
    /// Amount swept out by this withdrawal.
    pub amount: Units,
    /// Lifetime total withdrawn, including this withdrawal.
    pub withdrawn_total: Units,
}

impl MarketService {
    /// Create a new market service with the given repository.
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Initialize a new ledger at the given path, owned by `owner`.
    pub async fn init(database_path: &str, owner: &str) -> Result<Self, MarketError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        let service = Self::new(repo);

        // A database holds exactly one ledger with a fixed owner.
        if let Some(existing) = service.repo.get_ledger().await? {
            return Err(MarketError::AlreadyInitialized(existing.owner));
        }

        let state = LedgerState::new(owner);
        service.repo.create_ledger(&state).await?;

        Ok(service)
    }

    /// Connect to an existing ledger database.
    pub async fn connect(database_path: &str) -> Result<Self, MarketError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Get the ledger state (identity, owner, balances).
    pub async fn ledger_state(&self) -> Result<LedgerState, MarketError> {
        self.repo
            .get_ledger()
            .await?
            .ok_or(MarketError::NotInitialized)
    }

    /// Current unwithdrawn balance.
    pub async fn balance(&self) -> Result<Units, MarketError> {
        Ok(self.ledger_state().await?.balance)
    }

    // ========================
    // Listing operations
    // ========================

    /// List an item in the catalog. Owner only.
    /// Listing an id that is already in use replaces the stored entry.
    pub async fn list_item(&self, caller: &str, item: Item) -> Result<ListingResult, MarketError> {
        let ledger = self.ledger_state().await?;
        if !ledger.is_owner(caller) {
            return Err(MarketError::Unauthorized(caller.to_string()));
        }

        item.validate()
            .map_err(|e| MarketError::InvalidListing(e.to_string()))?;

        let record = self.repo.record_listing(&item).await?;

        Ok(ListingResult {
            item,
            replaced: record.replaced,
            sequence: record.sequence,
        })
    }

    /// Get an item by id.
    pub async fn get_item(&self, id: ItemId) -> Result<Item, MarketError> {
        self.repo
            .get_item(id)
            .await?
            .ok_or(MarketError::ItemNotFound(id))
    }

    /// List the whole catalog, ordered by id.
    pub async fn list_catalog(&self) -> Result<Vec<Item>, MarketError> {
        Ok(self.repo.list_items().await?)
    }

    // ========================
    // Purchase operations
    // ========================

    /// Buy one unit of an item as `buyer`. Anyone may buy, the owner
    /// included; the payment must match the listed cost exactly.
    pub async fn buy(
        &self,
        buyer: &str,
        item_id: ItemId,
        payment: Units,
    ) -> Result<PurchaseResult, MarketError> {
        // The purchase credits the ledger row, so it must exist.
        self.ledger_state().await?;

        match self.repo.record_purchase(buyer, item_id, payment).await? {
            PurchaseOutcome::Completed { order, sequence } => {
                Ok(PurchaseResult { order, sequence })
            }
            PurchaseOutcome::UnknownItem => Err(MarketError::ItemNotFound(item_id)),
            PurchaseOutcome::WrongPayment { cost } => Err(MarketError::InsufficientPayment {
                item_id,
                cost,
                payment,
            }),
        }
    }

    /// Get one order by its (buyer, order id) key.
    pub async fn get_order(&self, buyer: &str, order_id: OrderId) -> Result<Order, MarketError> {
        self.repo
            .get_order(buyer, order_id)
            .await?
            .ok_or_else(|| MarketError::OrderNotFound {
                buyer: buyer.to_string(),
                order_id,
            })
    }

    /// List orders, optionally narrowed to one buyer and/or one item.
    pub async fn list_orders(
        &self,
        buyer: Option<&str>,
        item_id: Option<ItemId>,
    ) -> Result<Vec<Order>, MarketError> {
        let orders = match (buyer, item_id) {
            (Some(buyer), Some(item_id)) => {
                let mut orders = self.repo.list_orders_for_buyer(buyer).await?;
                orders.retain(|order| order.item.id == item_id);
                orders
            }
            (Some(buyer), None) => self.repo.list_orders_for_buyer(buyer).await?,
            (None, Some(item_id)) => self.repo.list_orders_for_item(item_id).await?,
            (None, None) => self.repo.list_orders().await?,
        };

        Ok(orders)
    }

    /// Number of orders a buyer has placed. Zero for unknown buyers.
    pub async fn order_count(&self, buyer: &str) -> Result<i64, MarketError> {
        Ok(self.repo.get_order_count(buyer).await?)
    }

    /// Whether a buyer has ever bought the given item.
    pub async fn has_bought(&self, buyer: &str, item_id: ItemId) -> Result<bool, MarketError> {
        Ok(self.repo.has_order_for_item(buyer, item_id).await?)
    }

    // ========================
    // Withdrawal
    // ========================

    /// Withdraw the full balance. Owner only; fails when the balance
    /// is zero.
    pub async fn withdraw(&self, caller: &str) -> Result<WithdrawResult, MarketError> {
        let ledger = self.ledger_state().await?;
        if !ledger.is_owner(caller) {
            return Err(MarketError::Unauthorized(caller.to_string()));
        }

        let amount = self.repo.withdraw_all().await?;
        if amount == 0 {
            return Err(MarketError::NothingToWithdraw);
        }

        Ok(WithdrawResult {
            amount,
            withdrawn_total: ledger.withdrawn_total + amount,
        })
    }

    // ========================
    // Event log
    // ========================

    /// Read the event log in sequence order, with optional filters.
    pub async fn list_events(
        &self,
        kind: Option<EventKind>,
        buyer: Option<&str>,
        item_id: Option<ItemId>,
        since_sequence: Option<i64>,
        limit: Option<usize>,
    ) -> Result<Vec<StoredEvent>, MarketError> {
        Ok(self
            .repo
            .list_events(kind, buyer, item_id, since_sequence, limit)
            .await?)
    }

    // ========================
    // Integrity
    // ========================

    /// Check ledger integrity and return a report.
    pub async fn check_integrity(&self) -> Result<IntegrityReport, MarketError> {
        let ledger = self.ledger_state().await?;
        let stats = self.repo.get_integrity_stats().await?;
        let orders = self.repo.list_orders().await?;
        let counters = self.repo.list_order_counters().await?;

        let report = build_integrity_report(
            &orders,
            &counters,
            stats.item_count,
            stats.event_count,
            stats.purchased_event_count,
            ledger.balance,
            ledger.withdrawn_total,
            stats.has_sequence_gaps,
            stats.invalid_items,
        );

        Ok(report)
    }
}
