//! Scripted walkthrough of the vending machine.
//!
//! Reproduces the classic session: exact payment, a rejected penny, an
//! underpaid attempt, overpayment with change, a sold-out product, and the
//! operator readouts — with the front panel printing live as it changes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vending_core::environment::SystemClock;
use vending_machine::{
    Coin, DisplaySink, MachineConfig, Money, Product, ProductId, VendingEnvironment,
    VendingMachine,
};

/// Front panel that prints every text change.
struct PanelPrinter;

impl DisplaySink for PanelPrinter {
    fn text_changed(&self, text: &str) {
        println!("[panel] {text}");
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vending_machine=debug,vending_runtime=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn catalog() -> HashMap<ProductId, Product> {
    HashMap::from([
        (
            ProductId::from("cola"),
            Product::new("Cola", Money::from_dollars(1), 3),
        ),
        (
            ProductId::from("chips"),
            Product::new("Chips", Money::from_cents(50), 10),
        ),
        (
            ProductId::from("candy"),
            Product::new("Candy", Money::from_cents(65), 10),
        ),
    ])
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    println!("=== Vending Machine Demo ===\n");

    let config = MachineConfig::from_env();
    let env = VendingEnvironment::new(Arc::new(SystemClock), config.display_revert);
    let machine = VendingMachine::new(config.initial_reserve(), catalog(), env);
    machine.attach_display(Arc::new(PanelPrinter)).await;

    println!("\n--- Exact change for chips ---");
    machine.insert_coin(Coin::Quarter).await?;
    machine.insert_coin(Coin::Quarter).await?;
    machine.purchase("chips").await?;

    println!("(waiting for the display to revert)");
    tokio::time::sleep(config.display_revert + Duration::from_millis(200)).await;

    println!("\n--- Pennies bounce to the coin return ---");
    machine.insert_coin(Coin::Penny).await?;
    println!("{}", machine.tray_text().await);

    println!("\n--- Underpaying shows the price ---");
    if let Err(err) = machine.purchase("cola").await {
        println!("Purchase rejected (as expected): {err}");
    }

    println!("\n--- Overpaying returns change ---");
    for _ in 0..8 {
        machine.insert_coin(Coin::Quarter).await?;
    }
    machine.purchase("cola").await?;
    println!("{}", machine.tray_text().await);
    println!("Machine holds {}", machine.machine_total().await);

    println!("(waiting for the display to revert)");
    tokio::time::sleep(config.display_revert + Duration::from_millis(200)).await;

    println!("\n--- Sold out ---");
    machine.set_product_inventory("candy", 0).await?;
    if let Err(err) = machine.purchase("candy").await {
        println!("Purchase rejected (as expected): {err}");
    }
    machine.set_product_inventory("candy", 10).await?;

    println!("\n--- Collecting the tray ---");
    machine.return_coins().await?;
    machine.empty_coin_return().await?;
    println!("{}", machine.tray_text().await);

    println!("\n--- Diagnostics ---");
    println!("{}", machine.diagnostics_text().await);

    let snapshot = machine.state_snapshot().await;
    println!("\n--- State snapshot ---");
    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    machine.shutdown(Duration::from_secs(5)).await?;
    println!("\n=== Demo Complete ===");

    Ok(())
}
