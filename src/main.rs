use anyhow::{Context, Result, anyhow};
use chrono::Local;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use pricewatch::config::{self, AppConfig};
use pricewatch::deals::{self, Deal, DealQuery};
use pricewatch::monitor::{ItemOutcome, ItemStatus, PassReport};
use pricewatch::plugins::NotifierRegistry;
use pricewatch::scheduler::PriceScheduler;
use pricewatch::utils::logging;
use pricewatch::{HttpFetcher, Monitor, StateFile};

/// Track product prices and get alerted on drops.
#[derive(Debug, Parser)]
#[command(name = "pricewatch", version, about)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, env = "PRICEWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Price history file
    #[arg(long, global = true, env = "PRICEWATCH_DATA")]
    data: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Start monitoring a product
    Add {
        url: String,
        name: String,
        /// Alert when the price falls to or below this value
        #[arg(long)]
        target: Option<Decimal>,
    },
    /// Stop monitoring a product
    Remove { name: String },
    /// Check every product once
    Check {
        /// Only print warnings and alerts
        #[arg(long)]
        quiet: bool,
    },
    /// Show price statistics for every product
    Status,
    /// Write the full price history as CSV
    Export { file: PathBuf },
    /// Check on the configured interval until interrupted
    Monitor,
    /// Search eBay auctions ending soon
    Deals {
        search: String,
        /// Highest current bid to consider
        #[arg(long, default_value = "50")]
        max_price: Decimal,
        #[arg(long, default_value_t = 0)]
        min_bids: u32,
        /// Only auctions ending within this many hours
        #[arg(long, default_value_t = 24)]
        ending_soon: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(config::default_config_path);
    let data_path = cli.data.unwrap_or_else(config::default_data_path);
    let quiet = matches!(cli.command, Commands::Check { quiet: true });

    let _log_guard = logging::init(Some(&log_dir(&data_path)), quiet)
        .map_err(|e| anyhow!("Failed to initialise logging: {}", e))?;

    let config = AppConfig::load(&config_path);
    if !config_path.exists() {
        match config.save(&config_path) {
            Ok(()) => info!("Wrote default configuration to {}", config_path.display()),
            Err(e) => warn!("Could not write {}: {}", config_path.display(), e),
        }
    }

    let fetcher = HttpFetcher::from_config(&config.fetch).context("Failed to build HTTP client")?;
    let notifiers = NotifierRegistry::from_config(&config).await;
    let monitor = Arc::new(Monitor::new(
        fetcher,
        &config,
        StateFile::new(&data_path),
        notifiers,
    ));

    match cli.command {
        Commands::Add { url, name, target } => {
            let report = monitor.add_item(&name, &url, target).await?;
            match report.initial_price {
                Some(price) => println!("Current price: ${:.2}", price),
                None => println!("Could not fetch price. Added anyway (might work later)"),
            }
            println!("Added: {} ({})", report.name, report.site_family);
            if let Some(target) = target {
                println!("   Target price: ${:.2}", target);
            }
        }
        Commands::Remove { name } => {
            monitor.remove_item(&name).await?;
            println!("Removed: {}", name);
        }
        Commands::Check { quiet } => {
            let report = monitor.run_pass(&CancellationToken::new()).await;
            print_pass(&report, quiet);
            if let Some(e) = &report.save_error {
                return Err(anyhow!("Failed to save price history: {}", e));
            }
        }
        Commands::Status => print_status(&monitor.status().await),
        Commands::Export { file } => {
            let rows = monitor.export_csv(&file).await?;
            println!("Exported {} reading(s) to {}", rows, file.display());
        }
        Commands::Deals {
            search,
            max_price,
            min_bids,
            ending_soon,
        } => {
            let query = DealQuery {
                search,
                max_price,
                min_bids,
                ending_within_hours: ending_soon,
            };
            let found = monitor.find_deals(&query).await?;
            print_deals(&found);
            if !found.is_empty() {
                match deals::save_deals(&log_dir(&data_path), &found, Local::now()) {
                    Ok(path) => println!("\nDeals saved to {}", path.display()),
                    Err(e) => warn!("Could not save deals: {}", e),
                }
            }
        }
        Commands::Monitor => {
            let cancel = CancellationToken::new();
            let on_signal = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Shutting down...");
                    on_signal.cancel();
                }
            });

            let scheduler = PriceScheduler::from_config(Arc::clone(&monitor), &config);
            let stats = scheduler.run(cancel).await;
            println!(
                "Ran {} pass(es): {} reading(s), {} alert(s)",
                stats.passes_run, stats.readings_recorded, stats.alerts_sent
            );
        }
    }

    monitor.notifiers().shutdown().await?;
    Ok(())
}

fn log_dir(data_path: &Path) -> PathBuf {
    match data_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn print_pass(report: &PassReport, quiet: bool) {
    if report.items.is_empty() {
        if !quiet {
            println!("No products being monitored");
        }
        return;
    }

    for item in &report.items {
        match &item.outcome {
            ItemOutcome::Recorded { price, event, alerts_sent, .. } => {
                if !quiet {
                    println!("{}: ${:.2} ({:+.1}%)", item.name, price, event.magnitude_percent);
                }
                if *alerts_sent > 0 {
                    println!("   {} alert(s) sent", alerts_sent);
                }
            }
            ItemOutcome::FetchFailed { reason } => println!("{}: could not fetch price ({})", item.name, reason),
            ItemOutcome::NoPrice => println!("{}: no price found on page", item.name),
            ItemOutcome::Removed | ItemOutcome::Skipped => {}
        }
    }

    if !quiet {
        println!(
            "Check completed: {} recorded, {} failed, {} alert(s)",
            report.recorded(),
            report.failed(),
            report.alerts_sent()
        );
    }
}

fn print_deals(found: &[Deal]) {
    if found.is_empty() {
        println!("No deals found matching criteria");
        return;
    }

    println!("Top eBay Deals");
    println!("{}", "=".repeat(80));
    for (i, deal) in found.iter().take(10).enumerate() {
        println!("\n{}. {}", i + 1, deal.summary);
        println!("   Link: {}", deal.url);
    }
}

fn print_status(items: &[ItemStatus]) {
    if items.is_empty() {
        println!("No products being monitored");
        println!("\nTo get started:");
        println!("  pricewatch add 'PRODUCT_URL' 'Product Name'");
        return;
    }

    println!("PRICE MONITORING STATUS");
    println!("{}", "=".repeat(50));

    let mut total_savings = Decimal::ZERO;
    for item in items {
        println!("\n{} ({})", item.name, item.site_family);
        let Some(stats) = &item.stats else {
            println!("   No readings yet");
            continue;
        };

        println!("   Current:     ${:.2}", stats.current);
        println!("   Lowest:      ${:.2}", stats.lowest);
        println!("   Highest:     ${:.2}", stats.highest);
        println!("   Average:     ${:.2}", stats.average);
        println!("   Readings:    {}", stats.readings);
        if let Some(change) = stats.recent_change_percent {
            println!("   Last change: {:+.1}%", change);
        }
        if let (Some(target), Some(distance)) = (item.target_price, stats.distance_to_target) {
            if stats.target_reached() {
                println!("   Target:      ${:.2} (reached)", target);
            } else {
                println!("   Target:      ${:.2} (${:.2} to go)", target, distance);
            }
        }
        if stats.max_savings > Decimal::ZERO {
            println!("   Max savings: ${:.2}", stats.max_savings);
        }
        total_savings += stats.max_savings;
    }

    if total_savings > Decimal::ZERO {
        println!("\nTotal potential savings: ${:.2}", total_savings);
    }
}
