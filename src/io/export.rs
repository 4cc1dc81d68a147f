use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::MarketService;
use crate::domain::{Item, LedgerState, Order, StoredEvent};

/// Database snapshot for full export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub ledger: LedgerState,
    pub items: Vec<Item>,
    pub orders: Vec<Order>,
    pub events: Vec<StoredEvent>,
}

/// Exporter for converting ledger data to various formats
pub struct Exporter<'a> {
    service: &'a MarketService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a MarketService) -> Self {
        Self { service }
    }

    /// Export the catalog to CSV format
    pub async fn export_catalog_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let items = self.service.list_catalog().await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        // Write header
        csv_writer.write_record(&[
            "id", "name", "category", "image", "cost", "rating", "stock",
        ])?;

        let mut count = 0;
        for item in &items {
            csv_writer.write_record(&[
                item.id.to_string(),
                item.name.clone(),
                item.category.clone(),
                item.image.clone(),
                item.cost.to_string(),
                item.rating.to_string(),
                item.stock.to_string(),
            ])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export all orders to CSV format
    pub async fn export_orders_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let orders = self.service.list_orders(None, None).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        // Write header
        csv_writer.write_record(&[
            "buyer",
            "order_id",
            "time",
            "item_id",
            "item_name",
            "item_category",
            "item_cost",
            "item_rating",
            "item_stock",
        ])?;

        let mut count = 0;
        for order in &orders {
            csv_writer.write_record(&[
                order.buyer.clone(),
                order.order_id.to_string(),
                order.time.to_rfc3339(),
                order.item.id.to_string(),
                order.item.name.clone(),
                order.item.category.clone(),
                order.item.cost.to_string(),
                order.item.rating.to_string(),
                order.item.stock.to_string(),
            ])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export the event log to CSV format
    pub async fn export_events_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let events = self.service.list_events(None, None, None, None, None).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        // Write header
        csv_writer.write_record(&[
            "sequence",
            "recorded_at",
            "kind",
            "item_id",
            "buyer",
            "order_id",
        ])?;

        let mut count = 0;
        for stored in &events {
            csv_writer.write_record(&[
                stored.sequence.to_string(),
                stored.recorded_at.to_rfc3339(),
                stored.event.kind().to_string(),
                stored.event.item_id().to_string(),
                stored.event.buyer().unwrap_or_default().to_string(),
                stored
                    .event
                    .order_id()
                    .map(|id| id.to_string())
                    .unwrap_or_default(),
            ])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export the full database as JSON snapshot
    pub async fn export_full_json<W: Write>(&self, mut writer: W) -> Result<LedgerSnapshot> {
        let ledger = self.service.ledger_state().await?;
        let items = self.service.list_catalog().await?;
        let orders = self.service.list_orders(None, None).await?;
        let events = self.service.list_events(None, None, None, None, None).await?;

        let snapshot = LedgerSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            ledger,
            items,
            orders,
            events,
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(snapshot)
    }
}
