use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use rust_decimal::Decimal;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use storefront::catalog::{Category, Item};
use storefront::config::Config;
use storefront::gateway::RestGateway;
use storefront::orders::{format_currency, NewOrder, NewOrderLine, Order, OrderStatus};
use storefront::Storefront;

#[derive(Parser, Debug)]
#[command(name = "storefront")]
#[command(about = "Browse the catalog and manage orders from the terminal")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/storefront/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// List categories with their item counts
  Catalog,
  /// List the items of one category
  Category { slug: String },
  /// Show one item
  Item { id: i64 },
  /// Refetch the catalog regardless of cache age
  Refresh,
  /// List your orders
  Orders,
  /// Show one order with its lines
  Order { id: String },
  /// Place an order
  Checkout {
    /// Order line as ITEM_ID:QUANTITY, repeatable
    #[arg(short, long = "line", required = true, value_parser = parse_line)]
    lines: Vec<(i64, u32)>,
    #[arg(long)]
    address: String,
    #[arg(long, default_value = "creditCard")]
    payment: String,
    #[arg(long)]
    notes: Option<String>,
  },
  /// Set an order's status
  Status { id: String, status: OrderStatus },
  /// Cancel an order
  Cancel {
    id: String,
    #[arg(short, long)]
    reason: String,
  },
}

fn parse_line(s: &str) -> Result<(i64, u32), String> {
  let (item, quantity) = s
    .split_once(':')
    .ok_or_else(|| format!("expected ITEM_ID:QUANTITY, got {:?}", s))?;
  let item = item
    .trim()
    .parse()
    .map_err(|e| format!("bad item id {:?}: {}", item, e))?;
  let quantity: u32 = quantity
    .trim()
    .parse()
    .map_err(|e| format!("bad quantity {:?}: {}", quantity, e))?;
  if quantity == 0 {
    return Err("quantity must be at least 1".to_string());
  }
  Ok((item, quantity))
}

/// Log to a file in the data directory; the terminal is for command output.
fn init_logging() -> Option<WorkerGuard> {
  let log_dir = dirs::data_dir()?.join("storefront");
  std::fs::create_dir_all(&log_dir).ok()?;

  let appender = tracing_appender::rolling::never(log_dir, "storefront.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let filter = EnvFilter::try_from_env("STOREFRONT_LOG")
    .unwrap_or_else(|_| EnvFilter::new("storefront=info"));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(writer)
    .with_ansi(false)
    .init();

  Some(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;
  let _log_guard = init_logging();

  let args = Args::parse();
  let config = Config::load(args.config.as_deref())?;
  let app = Storefront::from_config(&config)?;

  run(&app, args.command).await
}

async fn run(app: &Storefront<RestGateway>, command: Command) -> Result<()> {
  let catalog = &app.catalog;
  let orders = &app.orders;

  match command {
    Command::Catalog => {
      catalog.fetch_data().await?;
      for category in catalog.categories() {
        print_category(&category, catalog.items_by_category(category.id).len());
      }
    }
    Command::Category { slug } => {
      catalog.fetch_data().await?;
      let category = catalog
        .category_by_slug(&slug)
        .ok_or_else(|| eyre!("No category with slug {:?}", slug))?;
      println!("{}", category.name);
      for item in catalog.items_by_category(category.id) {
        print_item(&item);
      }
    }
    Command::Item { id } => {
      catalog.fetch_data().await?;
      let item = catalog
        .item_by_id(id)
        .ok_or_else(|| eyre!("No item with id {}", id))?;
      print_item(&item);
      if !item.description.is_empty() {
        println!("  {}", item.description);
      }
      if let Some(info) = &item.nutritional_info {
        println!("  Nutrition: {}", info);
      }
      println!("  Image: {}", item.hero_image.as_str());
    }
    Command::Refresh => {
      catalog.refresh().await?;
      let state = catalog.state();
      println!(
        "{} categories, {} items",
        state.categories.len(),
        state.items.len()
      );
    }
    Command::Orders => {
      orders.fetch_orders().await?;
      for order in orders.orders() {
        print_order(&order);
      }
    }
    Command::Order { id } => {
      let order = orders.get_order_by_id(&id).await.ok_or_else(|| {
        eyre!(
          "{}",
          orders
            .error()
            .unwrap_or_else(|| format!("Order {} not found", id))
        )
      })?;
      print_order(&order);
      println!("  Ship to: {}", order.shipping_address);
      if let Some(tracking) = &order.tracking_number {
        println!("  Tracking: {}", tracking);
      }
      for line in &order.items {
        let title = line
          .item
          .as_ref()
          .map(|item| item.title.as_str())
          .unwrap_or("(unknown item)");
        println!(
          "  {} x {} @ {}",
          line.quantity,
          title,
          format_currency(line.price_at_purchase)
        );
      }
    }
    Command::Checkout {
      lines,
      address,
      payment,
      notes,
    } => {
      catalog.fetch_data().await?;
      let mut order_lines = Vec::with_capacity(lines.len());
      let mut total = Decimal::ZERO;
      for (item_id, quantity) in lines {
        let item = catalog
          .item_by_id(item_id)
          .ok_or_else(|| eyre!("No item with id {}", item_id))?;
        if !item.orderable {
          return Err(eyre!("{} cannot be ordered right now", item.title));
        }
        total += item.price * Decimal::from(quantity);
        order_lines.push(NewOrderLine {
          item_id,
          quantity,
          price_at_purchase: item.price,
        });
      }

      let order_id = orders
        .create_order(NewOrder {
          items: order_lines,
          total_amount: total,
          shipping_address: address,
          payment_method: payment,
          notes,
          status: OrderStatus::Pending,
        })
        .await?;
      println!("Order {} placed", order_id);
    }
    Command::Status { id, status } => {
      orders.update_order_status(&id, status).await?;
      println!("Order {} is now {}", id, status);
    }
    Command::Cancel { id, reason } => {
      orders.cancel_order(&id, &reason).await?;
      println!("Order {} cancelled", id);
    }
  }

  Ok(())
}

fn print_category(category: &Category, item_count: usize) {
  println!("{:<24} {:<20} {}", category.name, category.slug, item_count);
}

fn print_item(item: &Item) {
  let availability = if item.orderable { "" } else { " (unavailable)" };
  println!(
    "  #{:<6} {:<32} {}{}",
    item.id,
    item.title,
    format_currency(item.price),
    availability
  );
}

fn print_order(order: &Order) {
  println!(
    "{}  {:<10} {:<10} {:<8} {}",
    order.slug, order.status, order.date, order.item, order.details
  );
}
