use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::application::MarketService;
use crate::domain::{format_units, parse_units, EventKind, Item, ItemId, OrderId};

/// Mercatus - Marketplace Ledger
#[derive(Parser)]
#[command(name = "mercatus")]
#[command(about = "A local-first marketplace ledger for listing, buying and settling")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, default_value = "mercatus.db")]
    pub database: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new ledger database
    Init {
        /// Owner of the ledger; only the owner may list items and withdraw
        #[arg(long)]
        owner: String,
    },

    /// Seed the catalog from a JSON file
    Seed {
        /// Path to the catalog file
        file: String,

        /// Who is seeding (must be the owner)
        #[arg(long = "as")]
        caller: String,

        /// Preview without listing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// List an item in the catalog (re-listing an id replaces it)
    List {
        /// Catalog id for the item
        id: ItemId,

        /// Item name
        name: String,

        /// Item category
        #[arg(short, long)]
        category: String,

        /// Image URL
        #[arg(long, default_value = "")]
        image: String,

        /// Exact purchase price (e.g., "1500" or "1,500")
        #[arg(long)]
        cost: String,

        /// Display rating (conventionally 1-5)
        #[arg(long, default_value = "0")]
        rating: i64,

        /// Units in stock
        #[arg(long)]
        stock: i64,

        /// Who is listing (must be the owner)
        #[arg(long = "as")]
        caller: String,
    },

    /// Buy one unit of an item
    Buy {
        /// Catalog id of the item to buy
        item_id: ItemId,

        /// Payment offered; must match the listed cost exactly
        #[arg(short, long)]
        payment: String,

        /// Who is buying
        #[arg(long = "as")]
        buyer: String,
    },

    /// Withdraw the full balance to the owner
    Withdraw {
        /// Who is withdrawing (must be the owner)
        #[arg(long = "as")]
        caller: String,
    },

    /// Show one item
    Item {
        /// Catalog id
        id: ItemId,

        /// Also report whether this buyer has bought the item
        #[arg(long)]
        buyer: Option<String>,
    },

    /// List the whole catalog
    Catalog,

    /// Show one order
    Order {
        /// Buyer the order belongs to
        buyer: String,

        /// Per-buyer order id
        order_id: OrderId,
    },

    /// List recorded orders
    Orders {
        /// Filter by buyer
        #[arg(long)]
        buyer: Option<String>,

        /// Filter by catalog id
        #[arg(long)]
        item: Option<ItemId>,
    },

    /// Show ledger identity and balances
    Balance,

    /// List the event log
    Events {
        /// Filter by kind: listed, purchased
        #[arg(long)]
        kind: Option<String>,

        /// Filter by buyer
        #[arg(long)]
        buyer: Option<String>,

        /// Filter by catalog id
        #[arg(long)]
        item: Option<ItemId>,

        /// Only events after this sequence number
        #[arg(long)]
        since: Option<i64>,

        /// Maximum number of events to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Verify ledger integrity
    Check,

    /// Export data to CSV or JSON
    Export {
        /// What to export: catalog, orders, events, full
        export_type: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Init { owner } => {
                let service = MarketService::init(&self.database, &owner).await?;
                let state = service.ledger_state().await?;
                println!("Ledger initialized: {}", self.database);
                println!("  Ledger ID: {}", state.ledger_id);
                println!("  Owner:     {}", state.owner);
            }

            Commands::Seed {
                file,
                caller,
                dry_run,
            } => {
                let service = MarketService::connect(&self.database).await?;
                run_seed_command(&service, &file, &caller, dry_run).await?;
            }

            Commands::List {
                id,
                name,
                category,
                image,
                cost,
                rating,
                stock,
                caller,
            } => {
                let service = MarketService::connect(&self.database).await?;
                let cost_units = parse_units(&cost)
                    .context("Invalid cost format. Use digits like '1500' or '1,500'")?;

                let item = Item::new(id, name, category, image, cost_units, rating, stock);
                let result = service.list_item(&caller, item).await?;

                if result.replaced {
                    println!(
                        "Re-listed item {}: {} (replaced the previous listing)",
                        result.item.id, result.item.name
                    );
                } else {
                    println!("Listed item {}: {}", result.item.id, result.item.name);
                }
                println!("  Cost:  {}", format_units(result.item.cost));
                println!("  Stock: {}", result.item.stock);

                if self.verbose {
                    eprintln!("[event #{}] listed", result.sequence);
                }
            }

            Commands::Buy {
                item_id,
                payment,
                buyer,
            } => {
                let service = MarketService::connect(&self.database).await?;
                let payment_units = parse_units(&payment)
                    .context("Invalid payment format. Use digits like '1500' or '1,500'")?;

                let result = service.buy(&buyer, item_id, payment_units).await?;
                let order = &result.order;

                println!(
                    "Purchased item {}: {} for {}",
                    order.item.id,
                    order.item.name,
                    format_units(order.amount_paid())
                );
                println!("  Order #{} for {}", order.order_id, order.buyer);

                if self.verbose {
                    eprintln!("[event #{}] purchased", result.sequence);
                }
            }

            Commands::Withdraw { caller } => {
                let service = MarketService::connect(&self.database).await?;
                let result = service.withdraw(&caller).await?;

                println!("Withdrew {}", format_units(result.amount));
                println!(
                    "  Total withdrawn to date: {}",
                    format_units(result.withdrawn_total)
                );
            }

            Commands::Item { id, buyer } => {
                let service = MarketService::connect(&self.database).await?;
                run_item_command(&service, id, buyer.as_deref()).await?;
            }

            Commands::Catalog => {
                let service = MarketService::connect(&self.database).await?;
                run_catalog_command(&service).await?;
            }

            Commands::Order { buyer, order_id } => {
                let service = MarketService::connect(&self.database).await?;
                run_order_command(&service, &buyer, order_id).await?;
            }

            Commands::Orders { buyer, item } => {
                let service = MarketService::connect(&self.database).await?;
                run_orders_command(&service, buyer.as_deref(), item).await?;
            }

            Commands::Balance => {
                let service = MarketService::connect(&self.database).await?;
                run_balance_command(&service).await?;
            }

            Commands::Events {
                kind,
                buyer,
                item,
                since,
                limit,
            } => {
                let service = MarketService::connect(&self.database).await?;
                run_events_command(&service, kind.as_deref(), buyer.as_deref(), item, since, limit)
                    .await?;
            }

            Commands::Check => {
                let service = MarketService::connect(&self.database).await?;
                run_check_command(&service).await?;
            }

            Commands::Export {
                export_type,
                output,
            } => {
                let service = MarketService::connect(&self.database).await?;
                run_export_command(&service, &export_type, output.as_deref()).await?;
            }
        }

        Ok(())
    }
}

async fn run_seed_command(
    service: &MarketService,
    path: &str,
    caller: &str,
    dry_run: bool,
) -> Result<()> {
    use crate::io::{SeedStatus, Seeder};
    use std::fs::File;

    let file = File::open(path).with_context(|| format!("Failed to open catalog file: {}", path))?;

    let seeder = Seeder::new(service);
    let result = seeder.seed(file, caller, dry_run).await?;

    if result.dry_run {
        println!("Dry run: nothing was written.\n");
    }

    println!(
        "Seeding ledger {} (owner: {})",
        result.ledger.ledger_id, result.ledger.owner
    );
    println!();

    for outcome in &result.outcomes {
        match &outcome.status {
            SeedStatus::Listed => {
                println!("  listed   {}: {}", outcome.item_id, outcome.name);
            }
            SeedStatus::Replaced => {
                println!("  replaced {}: {}", outcome.item_id, outcome.name);
            }
            SeedStatus::Skipped(reason) => {
                println!(
                    "  skipped  {}: {} ({})",
                    outcome.item_id, outcome.name, reason
                );
            }
        }
    }

    println!();
    println!(
        "{} listed, {} replaced, {} skipped",
        result.listed(),
        result.replaced(),
        result.skipped()
    );

    Ok(())
}

async fn run_item_command(service: &MarketService, id: ItemId, buyer: Option<&str>) -> Result<()> {
    let item = service.get_item(id).await?;

    println!("Item {}: {}", item.id, item.name);
    println!("  Category: {}", item.category);
    if !item.image.is_empty() {
        println!("  Image:    {}", item.image);
    }
    println!("  Cost:     {}", format_units(item.cost));
    println!("  Rating:   {}/5", item.rating);
    println!(
        "  Stock:    {} ({})",
        item.stock,
        if item.in_stock() {
            "In Stock"
        } else {
            "Out of Stock"
        }
    );

    if let Some(buyer) = buyer {
        let bought = service.has_bought(buyer, id).await?;
        println!();
        println!(
            "  {} has {}bought this item",
            buyer,
            if bought { "" } else { "not " }
        );
    }

    Ok(())
}

async fn run_catalog_command(service: &MarketService) -> Result<()> {
    let items = service.list_catalog().await?;

    if items.is_empty() {
        println!("No items listed.");
    } else {
        println!(
            "{:<6} {:<25} {:<15} {:>12} {:>7} {:>6}",
            "ID", "NAME", "CATEGORY", "COST", "RATING", "STOCK"
        );
        println!("{}", "-".repeat(76));
        for item in items {
            println!(
                "{:<6} {:<25} {:<15} {:>12} {:>7} {:>6}",
                item.id,
                truncate(&item.name, 25),
                truncate(&item.category, 15),
                format_units(item.cost),
                item.rating,
                item.stock
            );
        }
    }

    Ok(())
}

async fn run_order_command(service: &MarketService, buyer: &str, order_id: OrderId) -> Result<()> {
    let order = service.get_order(buyer, order_id).await?;

    println!("Order #{} for {}", order.order_id, order.buyer);
    println!("  Time:  {}", order.time.format("%Y-%m-%d %H:%M:%S"));
    println!(
        "  Item:  {}: {} ({})",
        order.item.id, order.item.name, order.item.category
    );
    println!("  Paid:  {}", format_units(order.amount_paid()));

    Ok(())
}

async fn run_orders_command(
    service: &MarketService,
    buyer: Option<&str>,
    item_id: Option<ItemId>,
) -> Result<()> {
    let orders = service.list_orders(buyer, item_id).await?;

    if orders.is_empty() {
        println!("No orders found.");
    } else {
        println!(
            "{:<15} {:>6} {:<12} {:<25} {:>12}",
            "BUYER", "ORDER", "DATE", "ITEM", "PAID"
        );
        println!("{}", "-".repeat(74));
        for order in &orders {
            println!(
                "{:<15} {:>6} {:<12} {:<25} {:>12}",
                truncate(&order.buyer, 15),
                order.order_id,
                order.time.format("%Y-%m-%d").to_string(),
                truncate(&order.item.name, 25),
                format_units(order.amount_paid())
            );
        }
    }

    // The stored counter is authoritative for a buyer's order count.
    if let Some(buyer) = buyer {
        let count = service.order_count(buyer).await?;
        println!();
        println!("{} has {} order(s) on record", buyer, count);
    }

    Ok(())
}

async fn run_balance_command(service: &MarketService) -> Result<()> {
    let state = service.ledger_state().await?;

    println!("Ledger {}", state.ledger_id);
    println!("  Owner:   {}", state.owner);
    println!(
        "  Created: {}",
        state.created_at.format("%Y-%m-%d %H:%M:%S")
    );
    println!();
    println!("  {:<18} {:>14}", "Balance:", format_units(state.balance));
    println!(
        "  {:<18} {:>14}",
        "Withdrawn total:",
        format_units(state.withdrawn_total)
    );
    println!(
        "  {:<18} {:>14}",
        "Lifetime total:",
        format_units(state.lifetime_total())
    );

    Ok(())
}

async fn run_events_command(
    service: &MarketService,
    kind: Option<&str>,
    buyer: Option<&str>,
    item_id: Option<ItemId>,
    since: Option<i64>,
    limit: Option<usize>,
) -> Result<()> {
    let kind_parsed = match kind {
        Some(s) => Some(EventKind::from_str(s).ok_or_else(|| {
            anyhow::anyhow!("Invalid event kind '{}'. Valid kinds: listed, purchased", s)
        })?),
        None => None,
    };

    let events = service
        .list_events(kind_parsed, buyer, item_id, since, limit)
        .await?;

    if events.is_empty() {
        println!("No events found.");
        return Ok(());
    }

    println!(
        "{:<6} {:<20} {:<10} {:>6} {:<15} {:>6}",
        "SEQ", "RECORDED", "KIND", "ITEM", "BUYER", "ORDER"
    );
    println!("{}", "-".repeat(70));
    for stored in &events {
        let event = &stored.event;
        println!(
            "{:<6} {:<20} {:<10} {:>6} {:<15} {:>6}",
            stored.sequence,
            stored.recorded_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            event.kind().to_string(),
            event.item_id(),
            truncate(event.buyer().unwrap_or("-"), 15),
            event
                .order_id()
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".to_string())
        );
    }

    Ok(())
}

async fn run_check_command(service: &MarketService) -> Result<()> {
    println!("Checking ledger integrity...\n");

    let report = service.check_integrity().await?;

    println!("Items:  {}", report.item_count);
    println!("Orders: {}", report.order_count);
    println!("Events: {}", report.event_count);
    println!();

    println!("Balance accounting:");
    println!(
        "  {:<16} {:>14}",
        "Settled total:",
        format_units(report.settled_total)
    );
    println!(
        "  {:<16} {:>14}",
        "Held balance:",
        format_units(report.balance)
    );
    println!(
        "  {:<16} {:>14}",
        "Withdrawn:",
        format_units(report.withdrawn_total)
    );
    println!("  {}", "-".repeat(32));
    println!(
        "  {:<16} {:>14}  {}",
        "Accounted:",
        format_units(report.balance + report.withdrawn_total),
        if report.is_balanced {
            "OK"
        } else {
            "UNBALANCED!"
        }
    );
    println!();

    if report.is_healthy() {
        println!("Ledger is consistent.");
    } else {
        println!("Issues found:");
        for issue in &report.issues {
            println!("  - {}", issue);
        }
        anyhow::bail!("Ledger integrity check failed");
    }

    Ok(())
}

async fn run_export_command(
    service: &MarketService,
    export_type: &str,
    output: Option<&str>,
) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;
    use std::io::{stdout, Write};

    let exporter = Exporter::new(service);

    // Determine output writer
    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    match export_type {
        "catalog" => {
            let count = exporter.export_catalog_csv(writer).await?;
            if output.is_some() {
                eprintln!("Exported {} items", count);
            }
        }
        "orders" => {
            let count = exporter.export_orders_csv(writer).await?;
            if output.is_some() {
                eprintln!("Exported {} orders", count);
            }
        }
        "events" => {
            let count = exporter.export_events_csv(writer).await?;
            if output.is_some() {
                eprintln!("Exported {} events", count);
            }
        }
        "full" => {
            let snapshot = exporter.export_full_json(writer).await?;
            if output.is_some() {
                eprintln!(
                    "Exported full ledger: {} items, {} orders, {} events",
                    snapshot.items.len(),
                    snapshot.orders.len(),
                    snapshot.events.len()
                );
            }
        }
        _ => {
            anyhow::bail!(
                "Invalid export type '{}'. Valid types: catalog, orders, events, full",
                export_type
            );
        }
    }

    Ok(())
}

fn truncate(s: &str, max_len: usize) -> String {
    // Count and cut in chars, not bytes; names and identities may be
    // multi-byte and a byte slice could split a character.
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}
