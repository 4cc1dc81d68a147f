mod common;

use anyhow::Result;
use common::{OWNER, StandardCatalog, test_service};
use mercatus::{EventKind, LedgerEvent};

#[tokio::test]
async fn test_events_are_recorded_in_sequence() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardCatalog::list_all(&service).await?;

    service.buy("bob", 1, 1500).await?;
    service.buy("carol", 2, 120_000).await?;

    let events = service.list_events(None, None, None, None, None).await?;
    assert_eq!(events.len(), 5);

    // Sequences are assigned 1..n with no gaps.
    let sequences: Vec<i64> = events.iter().map(|e| e.sequence).collect();
    assert_eq!(sequences, vec![1, 2, 3, 4, 5]);

    assert_eq!(events[0].event.kind(), EventKind::Listed);
    assert_eq!(events[2].event.kind(), EventKind::Listed);
    assert_eq!(events[3].event.kind(), EventKind::Purchased);
    assert_eq!(events[4].event.kind(), EventKind::Purchased);

    Ok(())
}

#[tokio::test]
async fn test_listing_event_carries_item_fields() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service.list_item(OWNER, StandardCatalog::shoes()).await?;

    let events = service
        .list_events(Some(EventKind::Listed), None, None, None, None)
        .await?;
    assert_eq!(events.len(), 1);

    match &events[0].event {
        LedgerEvent::Listed {
            item_id,
            name,
            category,
            cost,
            rating,
            stock,
        } => {
            assert_eq!(*item_id, 1);
            assert_eq!(name, "Shoes");
            assert_eq!(category, "Clothing");
            assert_eq!(*cost, 1500);
            assert_eq!(*rating, 4);
            assert_eq!(*stock, 5);
        }
        other => panic!("expected a listing event, got {:?}", other),
    }

    Ok(())
}

#[tokio::test]
async fn test_purchase_event_carries_order_fields() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service.list_item(OWNER, StandardCatalog::shoes()).await?;
    let result = service.buy("bob", 1, 1500).await?;

    let events = service
        .list_events(Some(EventKind::Purchased), None, None, None, None)
        .await?;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].sequence, result.sequence);

    match &events[0].event {
        LedgerEvent::Purchased {
            order_id,
            buyer,
            item_id,
            time,
        } => {
            assert_eq!(*order_id, 1);
            assert_eq!(buyer, "bob");
            assert_eq!(*item_id, 1);
            assert_eq!(*time, result.order.time);
        }
        other => panic!("expected a purchase event, got {:?}", other),
    }

    Ok(())
}

#[tokio::test]
async fn test_events_filter_by_buyer_and_item() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardCatalog::list_all(&service).await?;

    service.buy("bob", 1, 1500).await?;
    service.buy("bob", 2, 120_000).await?;
    service.buy("carol", 2, 120_000).await?;

    // bob's purchases of item 1: exactly one event.
    let events = service
        .list_events(Some(EventKind::Purchased), Some("bob"), Some(1), None, None)
        .await?;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event.buyer(), Some("bob"));
    assert_eq!(events[0].event.item_id(), 1);

    // carol never bought item 1.
    let events = service
        .list_events(
            Some(EventKind::Purchased),
            Some("carol"),
            Some(1),
            None,
            None,
        )
        .await?;
    assert!(events.is_empty());

    // All purchases of item 2, regardless of buyer.
    let events = service
        .list_events(Some(EventKind::Purchased), None, Some(2), None, None)
        .await?;
    assert_eq!(events.len(), 2);

    // The event stream agrees with the has-bought answer.
    assert!(service.has_bought("bob", 1).await?);
    assert!(!service.has_bought("carol", 1).await?);

    Ok(())
}

#[tokio::test]
async fn test_events_since_and_limit() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardCatalog::list_all(&service).await?;
    service.buy("bob", 1, 1500).await?;

    let events = service.list_events(None, None, None, Some(2), None).await?;
    let sequences: Vec<i64> = events.iter().map(|e| e.sequence).collect();
    assert_eq!(sequences, vec![3, 4]);

    let events = service.list_events(None, None, None, None, Some(2)).await?;
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].sequence, 1);
    assert_eq!(events[1].sequence, 2);

    Ok(())
}

#[tokio::test]
async fn test_relisting_appends_not_rewrites() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service.list_item(OWNER, StandardCatalog::shoes()).await?;

    let mut updated = StandardCatalog::shoes();
    updated.cost = 2000;
    service.list_item(OWNER, updated).await?;

    // Both listings stay in the stream, oldest first.
    let events = service
        .list_events(Some(EventKind::Listed), None, Some(1), None, None)
        .await?;
    assert_eq!(events.len(), 2);

    let costs: Vec<i64> = events
        .iter()
        .map(|e| match &e.event {
            LedgerEvent::Listed { cost, .. } => *cost,
            other => panic!("expected a listing event, got {:?}", other),
        })
        .collect();
    assert_eq!(costs, vec![1500, 2000]);

    Ok(())
}

#[tokio::test]
async fn test_refused_operations_leave_no_events() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service.list_item(OWNER, StandardCatalog::shoes()).await?;

    let _ = service.buy("bob", 1, 999).await;
    let _ = service.buy("bob", 42, 1500).await;
    let _ = service.list_item("bob", StandardCatalog::camera()).await;
    let _ = service.withdraw("bob").await;

    let events = service.list_events(None, None, None, None, None).await?;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event.kind(), EventKind::Listed);

    Ok(())
}
