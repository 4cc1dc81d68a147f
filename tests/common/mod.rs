// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use mercatus::application::MarketService;
use mercatus::domain::Item;
use tempfile::TempDir;

/// Owner every test ledger is initialized with
pub const OWNER: &str = "alice";

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(MarketService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = MarketService::init(db_path.to_str().unwrap(), OWNER).await?;
    Ok((service, temp_dir))
}

/// Test fixture: a small standard catalog
pub struct StandardCatalog;

impl StandardCatalog {
    pub fn shoes() -> Item {
        Item::new(
            1,
            "Shoes",
            "Clothing",
            "https://example.com/shoes.png",
            1500,
            4,
            5,
        )
    }

    pub fn camera() -> Item {
        Item::new(
            2,
            "Camera",
            "Electronics",
            "https://example.com/camera.png",
            120_000,
            5,
            2,
        )
    }

    /// Priced at ledger scale to exercise wide unit magnitudes
    pub fn drone() -> Item {
        Item::new(
            3,
            "Drone",
            "Electronics",
            "https://example.com/drone.png",
            1_000_000_000_000_000,
            4,
            3,
        )
    }

    /// List the standard items as the owner
    pub async fn list_all(service: &MarketService) -> Result<()> {
        for item in [Self::shoes(), Self::camera(), Self::drone()] {
            service.list_item(OWNER, item).await?;
        }
        Ok(())
    }
}
