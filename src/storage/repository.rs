use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::{
    EventKind, Item, ItemId, LedgerEvent, LedgerState, Order, OrderId, StoredEvent, Units,
};

use super::MIGRATION_001_INITIAL;

/// Statistics for ledger integrity verification.
#[derive(Debug, Clone)]
pub struct IntegrityStats {
    pub item_count: i64,
    pub event_count: i64,
    pub purchased_event_count: i64,
    pub has_sequence_gaps: bool,
    pub invalid_items: i64,
}

/// Result of recording a listing.
#[derive(Debug, Clone)]
pub struct ListingRecord {
    /// True when an entry already listed under the same id was replaced.
    pub replaced: bool,
    /// Sequence assigned to the listing event.
    pub sequence: i64,
}

/// Result of attempting a purchase as a single transaction.
#[derive(Debug, Clone)]
pub enum PurchaseOutcome {
    /// The purchase committed; the order and its event sequence are final.
    Completed { order: Order, sequence: i64 },
    /// No item is listed under the requested id. Nothing was written.
    UnknownItem,
    /// Payment does not match the listed cost. Nothing was written.
    WrongPayment { cost: Units },
}

/// Repository for persisting and querying the catalog, orders, and event log.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given path.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;

        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // Ledger state
    // ========================

    /// Create the single ledger row. Fails if one already exists.
    pub async fn create_ledger(&self, state: &LedgerState) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO ledger (id, ledger_id, owner, balance, withdrawn_total, created_at)
            VALUES (1, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(state.ledger_id.to_string())
        .bind(&state.owner)
        .bind(state.balance)
        .bind(state.withdrawn_total)
        .bind(state.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to create ledger")?;
        Ok(())
    }

    /// Get the ledger state, if the ledger has been initialized.
    pub async fn get_ledger(&self) -> Result<Option<LedgerState>> {
        let row = sqlx::query(
            r#"
            SELECT ledger_id, owner, balance, withdrawn_total, created_at
            FROM ledger
            WHERE id = 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch ledger state")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_ledger(&row)?)),
            None => Ok(None),
        }
    }

    /// Sweep the full balance into withdrawn_total, atomically.
    /// Returns the amount swept; zero means there was nothing to withdraw.
    pub async fn withdraw_all(&self) -> Result<Units> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin withdrawal transaction")?;

        let row = sqlx::query("SELECT balance FROM ledger WHERE id = 1")
            .fetch_one(&mut *tx)
            .await
            .context("Failed to read balance")?;
        let amount: Units = row.get("balance");

        if amount != 0 {
            sqlx::query(
                r#"
                UPDATE ledger
                SET balance = 0, withdrawn_total = withdrawn_total + ?
                WHERE id = 1
                "#,
            )
            .bind(amount)
            .execute(&mut *tx)
            .await
            .context("Failed to sweep balance")?;
        }

        tx.commit().await.context("Failed to commit withdrawal")?;

        Ok(amount)
    }

    // ========================
    // Item operations
    // ========================

    /// Save a catalog item and append the listing event, atomically.
    /// An item already listed under the same id is replaced in place.
    pub async fn record_listing(&self, item: &Item) -> Result<ListingRecord> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin listing transaction")?;

        let existing = sqlx::query("SELECT 1 AS present FROM items WHERE id = ?")
            .bind(item.id)
            .fetch_optional(&mut *tx)
            .await
            .context("Failed to check for existing item")?;
        let replaced = existing.is_some();

        sqlx::query(
            r#"
            INSERT INTO items (id, name, category, image, cost, rating, stock)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                category = excluded.category,
                image = excluded.image,
                cost = excluded.cost,
                rating = excluded.rating,
                stock = excluded.stock
            "#,
        )
        .bind(item.id)
        .bind(&item.name)
        .bind(&item.category)
        .bind(&item.image)
        .bind(item.cost)
        .bind(item.rating)
        .bind(item.stock)
        .execute(&mut *tx)
        .await
        .context("Failed to save item")?;

        let event = LedgerEvent::listed(item);
        let sequence = Self::append_event(&mut tx, &event).await?;

        tx.commit().await.context("Failed to commit listing")?;

        Ok(ListingRecord { replaced, sequence })
    }

    /// Get an item by id.
    pub async fn get_item(&self, id: ItemId) -> Result<Option<Item>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, category, image, cost, rating, stock
            FROM items
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch item")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_item(&row)?)),
            None => Ok(None),
        }
    }

    /// List all catalog items, ordered by id.
    pub async fn list_items(&self) -> Result<Vec<Item>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, category, image, cost, rating, stock
            FROM items
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list items")?;

        rows.iter().map(Self::row_to_item).collect()
    }

    // ========================
    // Order operations
    // ========================

    /// Attempt a purchase as a single transaction.
    ///
    /// On success this advances the buyer's order counter, records the order
    /// with a snapshot of the item as currently listed, depletes stock,
    /// credits the balance, and appends the purchase event. On any refusal
    /// (unknown item, wrong payment) the transaction is dropped unwritten.
    pub async fn record_purchase(
        &self,
        buyer: &str,
        item_id: ItemId,
        payment: Units,
    ) -> Result<PurchaseOutcome> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin purchase transaction")?;

        let row = sqlx::query(
            r#"
            SELECT id, name, category, image, cost, rating, stock
            FROM items
            WHERE id = ?
            "#,
        )
        .bind(item_id)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to fetch item")?;

        let item = match row {
            Some(row) => Self::row_to_item(&row)?,
            None => return Ok(PurchaseOutcome::UnknownItem),
        };

        if payment != item.cost {
            return Ok(PurchaseOutcome::WrongPayment { cost: item.cost });
        }

        let order_id: OrderId = sqlx::query(
            r#"
            INSERT INTO buyers (name, order_count)
            VALUES (?, 1)
            ON CONFLICT(name) DO UPDATE SET order_count = order_count + 1
            RETURNING order_count
            "#,
        )
        .bind(buyer)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to advance order counter")?
        .get("order_count");

        // The order snapshots the item as listed, before stock depletion.
        let order = Order::new(buyer, order_id, Utc::now(), item.clone());

        sqlx::query(
            r#"
            INSERT INTO orders (buyer, order_id, time, item_id, item_name, item_category,
                                item_image, item_cost, item_rating, item_stock)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&order.buyer)
        .bind(order.order_id)
        .bind(order.time.to_rfc3339())
        .bind(order.item.id)
        .bind(&order.item.name)
        .bind(&order.item.category)
        .bind(&order.item.image)
        .bind(order.item.cost)
        .bind(order.item.rating)
        .bind(order.item.stock)
        .execute(&mut *tx)
        .await
        .context("Failed to save order")?;

        sqlx::query("UPDATE items SET stock = ? WHERE id = ?")
            .bind(item.stock_after_sale())
            .bind(item.id)
            .execute(&mut *tx)
            .await
            .context("Failed to update stock")?;

        sqlx::query("UPDATE ledger SET balance = balance + ? WHERE id = 1")
            .bind(payment)
            .execute(&mut *tx)
            .await
            .context("Failed to credit balance")?;

        let event = LedgerEvent::purchased(&order);
        let sequence = Self::append_event(&mut tx, &event).await?;

        tx.commit().await.context("Failed to commit purchase")?;

        Ok(PurchaseOutcome::Completed { order, sequence })
    }

    /// Get one order by its (buyer, order id) key.
    pub async fn get_order(&self, buyer: &str, order_id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(
            r#"
            SELECT buyer, order_id, time, item_id, item_name, item_category,
                   item_image, item_cost, item_rating, item_stock
            FROM orders
            WHERE buyer = ? AND order_id = ?
            "#,
        )
        .bind(buyer)
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch order")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_order(&row)?)),
            None => Ok(None),
        }
    }

    /// List every recorded order, grouped by buyer.
    pub async fn list_orders(&self) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            r#"
            SELECT buyer, order_id, time, item_id, item_name, item_category,
                   item_image, item_cost, item_rating, item_stock
            FROM orders
            ORDER BY buyer, order_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list orders")?;

        rows.iter().map(Self::row_to_order).collect()
    }

    /// List a buyer's orders in the order they were placed.
    pub async fn list_orders_for_buyer(&self, buyer: &str) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            r#"
            SELECT buyer, order_id, time, item_id, item_name, item_category,
                   item_image, item_cost, item_rating, item_stock
            FROM orders
            WHERE buyer = ?
            ORDER BY order_id
            "#,
        )
        .bind(buyer)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list orders for buyer")?;

        rows.iter().map(Self::row_to_order).collect()
    }

    /// List all orders that bought a given catalog id.
    pub async fn list_orders_for_item(&self, item_id: ItemId) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            r#"
            SELECT buyer, order_id, time, item_id, item_name, item_category,
                   item_image, item_cost, item_rating, item_stock
            FROM orders
            WHERE item_id = ?
            ORDER BY buyer, order_id
            "#,
        )
        .bind(item_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list orders for item")?;

        rows.iter().map(Self::row_to_order).collect()
    }

    /// Whether a buyer has ever bought a given catalog id.
    pub async fn has_order_for_item(&self, buyer: &str, item_id: ItemId) -> Result<bool> {
        let row = sqlx::query(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM orders WHERE buyer = ? AND item_id = ?
            ) AS present
            "#,
        )
        .bind(buyer)
        .bind(item_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to check orders for item")?;

        Ok(row.get::<i64, _>("present") != 0)
    }

    /// Number of orders a buyer has placed. Zero for unknown buyers.
    pub async fn get_order_count(&self, buyer: &str) -> Result<i64> {
        let row = sqlx::query("SELECT order_count FROM buyers WHERE name = ?")
            .bind(buyer)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch order count")?;

        Ok(row.map(|r| r.get::<i64, _>("order_count")).unwrap_or(0))
    }

    /// All per-buyer order counters.
    pub async fn list_order_counters(&self) -> Result<HashMap<String, i64>> {
        let rows = sqlx::query("SELECT name, order_count FROM buyers")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list order counters")?;

        let mut counters = HashMap::new();
        for row in rows {
            counters.insert(row.get::<String, _>("name"), row.get::<i64, _>("order_count"));
        }

        Ok(counters)
    }

    // ========================
    // Event log
    // ========================

    /// Append an event inside an open transaction, assigning the next
    /// sequence number atomically.
    async fn append_event(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        event: &LedgerEvent,
    ) -> Result<i64> {
        let sequence: i64 = sqlx::query(
            r#"
            UPDATE sequence_counter
            SET value = value + 1
            WHERE name = 'event_sequence'
            RETURNING value
            "#,
        )
        .fetch_one(&mut **tx)
        .await
        .context("Failed to get next event sequence")?
        .get("value");

        let payload = serde_json::to_string(event)?;

        sqlx::query(
            r#"
            INSERT INTO events (sequence, kind, recorded_at, item_id, buyer, order_id, payload)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(sequence)
        .bind(event.kind().as_str())
        .bind(Utc::now().to_rfc3339())
        .bind(event.item_id())
        .bind(event.buyer())
        .bind(event.order_id())
        .bind(&payload)
        .execute(&mut **tx)
        .await
        .context("Failed to append event")?;

        Ok(sequence)
    }

    /// List events in log order with optional filters.
    pub async fn list_events(
        &self,
        kind: Option<EventKind>,
        buyer: Option<&str>,
        item_id: Option<ItemId>,
        since_sequence: Option<i64>,
        limit: Option<usize>,
    ) -> Result<Vec<StoredEvent>> {
        // Build query dynamically based on filters
        let mut query =
            String::from("SELECT sequence, recorded_at, payload FROM events WHERE 1=1");

        if kind.is_some() {
            query.push_str(" AND kind = ?");
        }
        if buyer.is_some() {
            query.push_str(" AND buyer = ?");
        }
        if item_id.is_some() {
            query.push_str(" AND item_id = ?");
        }
        if since_sequence.is_some() {
            query.push_str(" AND sequence > ?");
        }

        query.push_str(" ORDER BY sequence");

        if let Some(lim) = limit {
            query.push_str(&format!(" LIMIT {}", lim));
        }

        let mut sql_query = sqlx::query(&query);

        if let Some(k) = kind {
            sql_query = sql_query.bind(k.as_str());
        }
        if let Some(b) = buyer {
            sql_query = sql_query.bind(b);
        }
        if let Some(id) = item_id {
            sql_query = sql_query.bind(id);
        }
        if let Some(seq) = since_sequence {
            sql_query = sql_query.bind(seq);
        }

        let rows = sql_query
            .fetch_all(&self.pool)
            .await
            .context("Failed to list events")?;

        rows.iter().map(Self::row_to_event).collect()
    }

    /// Get statistics for integrity checking.
    pub async fn get_integrity_stats(&self) -> Result<IntegrityStats> {
        // Count items
        let item_count: i64 = sqlx::query("SELECT COUNT(*) as count FROM items")
            .fetch_one(&self.pool)
            .await?
            .get("count");

        // Count events
        let event_count: i64 = sqlx::query("SELECT COUNT(*) as count FROM events")
            .fetch_one(&self.pool)
            .await?
            .get("count");

        let purchased_event_count: i64 =
            sqlx::query("SELECT COUNT(*) as count FROM events WHERE kind = 'purchased'")
                .fetch_one(&self.pool)
                .await?
                .get("count");

        // Check for sequence gaps
        let sequence_check = sqlx::query(
            r#"
            SELECT
                MIN(sequence) as min_seq,
                MAX(sequence) as max_seq,
                COUNT(*) as count
            FROM events
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let min_seq: Option<i64> = sequence_check.get("min_seq");
        let max_seq: Option<i64> = sequence_check.get("max_seq");
        let count: i64 = sequence_check.get("count");

        let has_sequence_gaps = match (min_seq, max_seq) {
            (Some(min), Some(max)) => (max - min + 1) != count,
            _ => false,
        };

        // Check for invalid item fields
        let invalid_items: i64 = sqlx::query(
            r#"
            SELECT COUNT(*) as count
            FROM items
            WHERE cost < 0 OR rating < 0 OR stock < 0
            "#,
        )
        .fetch_one(&self.pool)
        .await?
        .get("count");

        Ok(IntegrityStats {
            item_count,
            event_count,
            purchased_event_count,
            has_sequence_gaps,
            invalid_items,
        })
    }

    // ========================
    // Row mappers
    // ========================

    fn row_to_ledger(row: &sqlx::sqlite::SqliteRow) -> Result<LedgerState> {
        let ledger_id_str: String = row.get("ledger_id");
        let created_at_str: String = row.get("created_at");

        Ok(LedgerState {
            ledger_id: Uuid::parse_str(&ledger_id_str).context("Invalid ledger ID")?,
            owner: row.get("owner"),
            balance: row.get("balance"),
            withdrawn_total: row.get("withdrawn_total"),
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .context("Invalid created_at timestamp")?
                .with_timezone(&Utc),
        })
    }

    fn row_to_item(row: &sqlx::sqlite::SqliteRow) -> Result<Item> {
        Ok(Item {
            id: row.get("id"),
            name: row.get("name"),
            category: row.get("category"),
            image: row.get("image"),
            cost: row.get("cost"),
            rating: row.get("rating"),
            stock: row.get("stock"),
        })
    }

    fn row_to_order(row: &sqlx::sqlite::SqliteRow) -> Result<Order> {
        let time_str: String = row.get("time");

        Ok(Order {
            buyer: row.get("buyer"),
            order_id: row.get("order_id"),
            time: DateTime::parse_from_rfc3339(&time_str)
                .context("Invalid order timestamp")?
                .with_timezone(&Utc),
            item: Item {
                id: row.get("item_id"),
                name: row.get("item_name"),
                category: row.get("item_category"),
                image: row.get("item_image"),
                cost: row.get("item_cost"),
                rating: row.get("item_rating"),
                stock: row.get("item_stock"),
            },
        })
    }

    fn row_to_event(row: &sqlx::sqlite::SqliteRow) -> Result<StoredEvent> {
        let recorded_at_str: String = row.get("recorded_at");
        let payload: String = row.get("payload");

        Ok(StoredEvent {
            sequence: row.get("sequence"),
            recorded_at: DateTime::parse_from_rfc3339(&recorded_at_str)
                .context("Invalid recorded_at timestamp")?
                .with_timezone(&Utc),
            event: serde_json::from_str(&payload).context("Invalid event payload")?,
        })
    }
}
