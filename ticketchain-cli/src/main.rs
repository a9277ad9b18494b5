//! TicketChain booking client.
//!
//! Records bus ticket bookings in a hash-chained ledger stored in a file that
//! other clients may write to concurrently.
//!
//! Usage:
//!   ticketchain --store data/tickets.json book --name Alice --route "A to B" --tickets 2
//!   ticketchain --store data/tickets.json history
//!   ticketchain --store data/tickets.json verify

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use ticketchain_ledger::codec;
use ticketchain_sync::{
    BlockSummary, FileStore, FileStoreConfig, RemoteStore, Route, StoreError, SyncConfig,
    SyncController,
};
use tracing::{Level, debug, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "ticketchain")]
#[command(about = "Book bus tickets on a tamper-evident shared ledger")]
struct Args {
    /// Path to the shared ledger snapshot
    #[arg(short, long, default_value = "data/tickets.json")]
    store: PathBuf,

    /// Path to a JSON file with retry and timeout settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Book tickets and append the booking to the ledger
    Book {
        /// Passenger name
        #[arg(short, long)]
        name: String,

        /// Route: "A to B", "B to C" or "A to C"
        #[arg(short, long)]
        route: String,

        /// Number of tickets (1-5)
        #[arg(short, long, default_value = "1")]
        tickets: u32,

        /// Print the booking as JSON
        #[arg(long)]
        json: bool,
    },
    /// List every block in ledger order
    History {
        /// Print the history as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check the chain integrity of the stored snapshot
    Verify,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    let config = match &args.config {
        Some(path) => SyncConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => SyncConfig::default(),
    };
    let store = FileStore::new(FileStoreConfig {
        path: args.store.clone(),
    });

    match args.command {
        Command::Book {
            name,
            route,
            tickets,
            json,
        } => {
            let route: Route = route.parse()?;
            let controller = open(store, config).await?;

            let summary = controller
                .book(&name, route, tickets)
                .await
                .context("booking failed")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!(
                    "Booked {} ticket(s) on {} for {} (block #{}, {})",
                    tickets, route, name.trim(), summary.index, summary.hash
                );
            }
        }
        Command::History { json } => {
            let controller = open(store, config).await?;

            let history = controller.history().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&history)?);
            } else {
                print_history(&history);
            }
        }
        Command::Verify => verify(&store).await?,
    }

    Ok(())
}

async fn open(store: FileStore, config: SyncConfig) -> Result<SyncController> {
    let controller = SyncController::new(Arc::new(store), config);
    debug!("Sync settings: {:?}", controller.config());
    controller.start().await.context("loading ledger")?;
    Ok(controller)
}

fn print_history(history: &[BlockSummary]) {
    println!(
        "{:>4}  {:<27}  {:<16}  {:<7}  {:>7}  {}",
        "#", "timestamp", "name", "route", "tickets", "hash"
    );
    for entry in history {
        let name = match (&entry.name, entry.is_genesis()) {
            (Some(name), _) => name.as_str(),
            (None, true) => "(genesis)",
            (None, false) => "-",
        };
        println!(
            "{:>4}  {:<27}  {:<16}  {:<7}  {:>7}  {}",
            entry.index,
            entry.timestamp,
            name,
            entry.route.as_deref().unwrap_or("-"),
            entry.tickets.map_or_else(|| "-".to_string(), |t| t.to_string()),
            entry.hash.get(..16).unwrap_or(&entry.hash),
        );
    }
}

async fn verify(store: &FileStore) -> Result<()> {
    let snapshot = match store.fetch().await {
        Ok(snapshot) => snapshot,
        Err(StoreError::NotFound) => {
            println!("No ledger at {} yet", store.path().display());
            return Ok(());
        }
        Err(e) => return Err(e).context("reading snapshot"),
    };

    let ledger = codec::decode(&snapshot.bytes).context("decoding snapshot")?;
    if let Err(e) = ledger.validate() {
        bail!("ledger is corrupt at block {}: {e}", e.index());
    }

    info!("Verified revision {}", snapshot.revision);
    println!(
        "OK: {} blocks, tail {}",
        ledger.len(),
        ledger.tail_hash().unwrap_or("-")
    );
    Ok(())
}
