mod common;

use anyhow::Result;
use common::{OWNER, StandardCatalog, test_service};
use mercatus::application::MarketError;
use mercatus::io::{Exporter, SeedStatus, Seeder};

const CATALOG_JSON: &str = r#"{
  "items": [
    {
      "id": 1,
      "name": "Shoes",
      "category": "Clothing",
      "image": "https://example.com/shoes.png",
      "cost": 1500,
      "rating": 4,
      "stock": 5
    },
    {
      "id": 2,
      "name": "Camera",
      "category": "Electronics",
      "image": "https://example.com/camera.png",
      "cost": 120000,
      "rating": 5,
      "stock": 2
    }
  ]
}"#;

#[tokio::test]
async fn test_seed_lists_catalog_entries() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let seeder = Seeder::new(&service);

    let result = seeder.seed(CATALOG_JSON.as_bytes(), OWNER, false).await?;

    assert_eq!(result.outcomes.len(), 2);
    assert_eq!(result.listed(), 2);
    assert_eq!(result.replaced(), 0);
    assert_eq!(result.skipped(), 0);

    // The result names the ledger that was seeded.
    let state = service.ledger_state().await?;
    assert_eq!(result.ledger.ledger_id, state.ledger_id);
    assert_eq!(result.ledger.owner, OWNER);

    let catalog = service.list_catalog().await?;
    assert_eq!(catalog.len(), 2);
    assert_eq!(service.get_item(1).await?.name, "Shoes");
    assert_eq!(service.get_item(2).await?.cost, 120_000);

    Ok(())
}

#[tokio::test]
async fn test_seed_from_file_on_disk() -> Result<()> {
    let (service, temp) = test_service().await?;
    let path = temp.path().join("catalog.json");
    std::fs::write(&path, CATALOG_JSON)?;

    let seeder = Seeder::new(&service);
    let file = std::fs::File::open(&path)?;
    let result = seeder.seed(file, OWNER, false).await?;

    assert_eq!(result.listed(), 2);
    assert_eq!(service.list_catalog().await?.len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_seed_twice_replaces_entries() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let seeder = Seeder::new(&service);

    seeder.seed(CATALOG_JSON.as_bytes(), OWNER, false).await?;
    let second = seeder.seed(CATALOG_JSON.as_bytes(), OWNER, false).await?;

    assert_eq!(second.listed(), 0);
    assert_eq!(second.replaced(), 2);

    // Still two catalog entries, not four.
    assert_eq!(service.list_catalog().await?.len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_seed_dry_run_writes_nothing() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let seeder = Seeder::new(&service);

    let result = seeder.seed(CATALOG_JSON.as_bytes(), OWNER, true).await?;

    assert!(result.dry_run);
    assert_eq!(result.listed(), 2);

    assert!(service.list_catalog().await?.is_empty());
    let events = service.list_events(None, None, None, None, None).await?;
    assert!(events.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_seed_requires_owner() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let seeder = Seeder::new(&service);

    let err = seeder
        .seed(CATALOG_JSON.as_bytes(), "bob", false)
        .await
        .unwrap_err();
    assert!(matches!(err, MarketError::Unauthorized(caller) if caller == "bob"));

    assert!(service.list_catalog().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_seed_skips_invalid_entries_and_continues() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let seeder = Seeder::new(&service);

    let json = r#"{
      "items": [
        {"id": 1, "name": "Shoes", "category": "Clothing", "image": "", "cost": 1500, "rating": 4, "stock": 5},
        {"id": 2, "name": "Broken", "category": "Electronics", "image": "", "cost": -5, "rating": 1, "stock": 1},
        {"id": 3, "name": "Drone", "category": "Electronics", "image": "", "cost": 90000, "rating": 4, "stock": 3}
      ]
    }"#;

    let result = seeder.seed(json.as_bytes(), OWNER, false).await?;

    assert_eq!(result.listed(), 2);
    assert_eq!(result.skipped(), 1);
    assert!(matches!(result.outcomes[1].status, SeedStatus::Skipped(_)));

    // The bad entry never reached the catalog; the rest did.
    let catalog = service.list_catalog().await?;
    assert_eq!(catalog.len(), 2);
    assert!(service.get_item(2).await.is_err());

    Ok(())
}

#[tokio::test]
async fn test_seed_rejects_malformed_json() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let seeder = Seeder::new(&service);

    let result = seeder.seed("not json".as_bytes(), OWNER, false).await;
    assert!(matches!(result, Err(MarketError::InvalidCatalog(_))));

    Ok(())
}

#[tokio::test]
async fn test_export_catalog_csv() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardCatalog::list_all(&service).await?;

    let exporter = Exporter::new(&service);
    let mut buffer = Vec::new();
    let count = exporter.export_catalog_csv(&mut buffer).await?;
    assert_eq!(count, 3);

    let text = String::from_utf8(buffer)?;
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "id,name,category,image,cost,rating,stock");
    assert!(lines[1].starts_with("1,Shoes,Clothing,"));
    assert!(lines[1].ends_with("1500,4,5"));

    Ok(())
}

#[tokio::test]
async fn test_export_orders_csv() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardCatalog::list_all(&service).await?;
    service.buy("bob", 1, 1500).await?;
    service.buy("carol", 2, 120_000).await?;

    let exporter = Exporter::new(&service);
    let mut buffer = Vec::new();
    let count = exporter.export_orders_csv(&mut buffer).await?;
    assert_eq!(count, 2);

    let text = String::from_utf8(buffer)?;
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines[0],
        "buyer,order_id,time,item_id,item_name,item_category,item_cost,item_rating,item_stock"
    );
    assert!(lines[1].starts_with("bob,1,"));
    assert!(lines[2].starts_with("carol,1,"));

    Ok(())
}

#[tokio::test]
async fn test_export_events_csv() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service.list_item(OWNER, StandardCatalog::shoes()).await?;
    service.buy("bob", 1, 1500).await?;

    let exporter = Exporter::new(&service);
    let mut buffer = Vec::new();
    let count = exporter.export_events_csv(&mut buffer).await?;
    assert_eq!(count, 2);

    let text = String::from_utf8(buffer)?;
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "sequence,recorded_at,kind,item_id,buyer,order_id");
    assert!(lines[1].starts_with("1,"));
    assert!(lines[1].contains(",listed,1,,"));
    assert!(lines[2].contains(",purchased,1,bob,1"));

    Ok(())
}

#[tokio::test]
async fn test_export_full_json_snapshot() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardCatalog::list_all(&service).await?;
    service.buy("bob", 1, 1500).await?;

    let exporter = Exporter::new(&service);
    let mut buffer = Vec::new();
    let snapshot = exporter.export_full_json(&mut buffer).await?;

    assert_eq!(snapshot.items.len(), 3);
    assert_eq!(snapshot.orders.len(), 1);
    assert_eq!(snapshot.events.len(), 4);
    assert_eq!(snapshot.ledger.balance, 1500);

    // The written JSON parses back to the same shape.
    let parsed: serde_json::Value = serde_json::from_slice(&buffer)?;
    assert_eq!(parsed["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(parsed["items"].as_array().unwrap().len(), 3);
    assert_eq!(parsed["orders"].as_array().unwrap().len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_catalog_render_survives_multibyte_names() -> Result<()> {
    use mercatus::application::MarketService;
    use mercatus::cli::{Cli, Commands};
    use mercatus::domain::Item;

    let temp_dir = tempfile::TempDir::new()?;
    let db = temp_dir
        .path()
        .join("test.db")
        .to_str()
        .unwrap()
        .to_string();

    let service = MarketService::init(&db, OWNER).await?;
    let long_name = "€".repeat(30);
    let item = Item::new(1, &long_name, "Münzen & Kuriositäten", "", 900, 4, 1);
    service.list_item(OWNER, item).await?;
    drop(service);

    // Both columns get truncated without splitting a multi-byte character.
    let cli = Cli {
        database: db,
        verbose: false,
        command: Commands::Catalog,
    };
    cli.run().await?;

    Ok(())
}
