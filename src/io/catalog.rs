use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::Read;

use crate::application::{MarketError, MarketService};
use crate::domain::{Item, ItemId, LedgerState};

/// A catalog file: the items to list when seeding a ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogFile {
    pub items: Vec<Item>,
}

/// Outcome of one catalog entry during seeding.
#[derive(Debug, Clone)]
pub struct SeedOutcome {
    pub item_id: ItemId,
    pub name: String,
    pub status: SeedStatus,
}

/// What happened to a catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedStatus {
    /// Listed as a new catalog entry.
    Listed,
    /// Replaced an entry already listed under the same id.
    Replaced,
    /// Rejected; the reason is recorded and seeding continues.
    Skipped(String),
}

/// Result of seeding a catalog into the ledger.
#[derive(Debug, Clone)]
pub struct SeedResult {
    /// The ledger the catalog was seeded into.
    pub ledger: LedgerState,
    pub outcomes: Vec<SeedOutcome>,
    pub dry_run: bool,
}

impl SeedResult {
    pub fn listed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == SeedStatus::Listed)
            .count()
    }

    pub fn replaced(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == SeedStatus::Replaced)
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, SeedStatus::Skipped(_)))
            .count()
    }
}

/// Seeder for bootstrapping a ledger's catalog from a JSON file.
pub struct Seeder<'a> {
    service: &'a MarketService,
}

impl<'a> Seeder<'a> {
    pub fn new(service: &'a MarketService) -> Self {
        Self { service }
    }

    /// Parse a catalog from JSON.
    pub fn read_catalog<R: Read>(reader: R) -> Result<CatalogFile> {
        serde_json::from_reader(reader).context("Failed to parse catalog JSON")
    }

    /// Seed a catalog as `caller`, listing each entry in file order.
    ///
    /// Entries that fail listing validation are skipped and recorded;
    /// authorization and storage failures abort the whole run.
    pub async fn seed<R: Read>(
        &self,
        reader: R,
        caller: &str,
        dry_run: bool,
    ) -> Result<SeedResult, MarketError> {
        let catalog = Self::read_catalog(reader)
            .map_err(|e| MarketError::InvalidCatalog(format!("{e:#}")))?;
        self.seed_catalog(&catalog, caller, dry_run).await
    }

    /// Seed an already-parsed catalog.
    pub async fn seed_catalog(
        &self,
        catalog: &CatalogFile,
        caller: &str,
        dry_run: bool,
    ) -> Result<SeedResult, MarketError> {
        let ledger = self.service.ledger_state().await?;

        // Fail before touching any entry, not on the first one.
        if !ledger.is_owner(caller) {
            return Err(MarketError::Unauthorized(caller.to_string()));
        }

        let mut outcomes = Vec::with_capacity(catalog.items.len());

        for item in &catalog.items {
            let status = if dry_run {
                self.dry_run_status(item).await?
            } else {
                match self.service.list_item(caller, item.clone()).await {
                    Ok(result) if result.replaced => SeedStatus::Replaced,
                    Ok(_) => SeedStatus::Listed,
                    Err(MarketError::InvalidListing(reason)) => SeedStatus::Skipped(reason),
                    Err(e) => return Err(e),
                }
            };

            outcomes.push(SeedOutcome {
                item_id: item.id,
                name: item.name.clone(),
                status,
            });
        }

        Ok(SeedResult {
            ledger,
            outcomes,
            dry_run,
        })
    }

    /// What listing this entry would do, without writing anything.
    async fn dry_run_status(&self, item: &Item) -> Result<SeedStatus, MarketError> {
        if let Err(e) = item.validate() {
            return Ok(SeedStatus::Skipped(e.to_string()));
        }

        match self.service.get_item(item.id).await {
            Ok(_) => Ok(SeedStatus::Replaced),
            Err(MarketError::ItemNotFound(_)) => Ok(SeedStatus::Listed),
            Err(e) => Err(e),
        }
    }
}
