//! nregalens CLI - runs the batch sync job and small query commands.
//!
//! The dashboard's HTTP layer embeds the library directly; this binary
//! exists for operations: seeding and refreshing the cache database and
//! spot-checking what the retrieval flows return.

use std::io;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use nregalens::api::DataGovClient;
use nregalens::cache::CacheStore;
use nregalens::config::Config;
use nregalens::models::Indicators;
use nregalens::service::{
    CachePolicy, RetrievalService, SyncService, DEFAULT_HISTORY_LIMIT,
};

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g. RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn usage() {
    eprintln!("usage: nregalens <command>");
    eprintln!();
    eprintln!("commands:");
    eprintln!("  sync                          run the batch district sync");
    eprintln!("  states                        list states");
    eprintln!("  districts <state>             list districts of a state");
    eprintln!("  performance <district> <state>  latest snapshot with indicators");
    eprintln!("  history <district> <state>      recent performance periods");
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    init_tracing();

    let args: Vec<String> = std::env::args().collect();
    let Some(command) = args.get(1) else {
        usage();
        return Ok(());
    };

    let config = Config::from_env()?;
    let client = DataGovClient::new(&config.api_url, &config.api_key)?;
    let store = Arc::new(CacheStore::open(&config.db_path)?);

    match command.as_str() {
        "sync" => {
            let sync = SyncService::new(client, store, &config.financial_year)
                .with_pacing(config.sync_pacing);
            let report = sync.run().await?;
            info!(
                run_id = report.run_id,
                synced = report.records_synced,
                total = report.districts_total,
                "sync finished"
            );
            println!(
                "synced {}/{} districts (run {})",
                report.records_synced, report.districts_total, report.run_id
            );
        }
        "states" => {
            let service = RetrievalService::new(client, Some(store), CachePolicy::ReadThrough)
                .with_list_freshness(config.list_cache_window);
            for state in service.list_states().await? {
                println!("{}  {}", state.code, state.name);
            }
        }
        "districts" => {
            let Some(state_name) = args.get(2) else {
                usage();
                return Ok(());
            };
            let service = RetrievalService::new(client, Some(store), CachePolicy::ReadThrough)
                .with_list_freshness(config.list_cache_window);
            for district in service.list_districts(state_name).await? {
                println!("{}  {}", district.code, district.name);
            }
        }
        "performance" => {
            let (Some(district), Some(state)) = (args.get(2), args.get(3)) else {
                usage();
                return Ok(());
            };
            let financial_year = args
                .get(4)
                .cloned()
                .unwrap_or_else(|| config.financial_year.clone());
            let service = RetrievalService::new(client, Some(store), CachePolicy::WriteThrough);
            match service
                .latest_performance(district, state, &financial_year)
                .await?
            {
                Some(snapshot) => print_snapshot(&snapshot.indicators, &snapshot.record.month),
                None => println!("no data for {district}, {state}, {financial_year}"),
            }
        }
        "history" => {
            let (Some(district), Some(state)) = (args.get(2), args.get(3)) else {
                usage();
                return Ok(());
            };
            let financial_year = args
                .get(4)
                .cloned()
                .unwrap_or_else(|| config.financial_year.clone());
            let service = RetrievalService::new(client, Some(store), CachePolicy::WriteThrough);
            let records = service
                .performance_history(district, state, &financial_year, DEFAULT_HISTORY_LIMIT)
                .await?;
            if records.is_empty() {
                println!("no history for {district}, {state}, {financial_year}");
            }
            for record in records {
                let indicators = Indicators::compute(&record);
                print_snapshot(&indicators, &record.month);
            }
        }
        _ => usage(),
    }

    Ok(())
}

fn print_snapshot(indicators: &Indicators, month: &str) {
    println!(
        "{} {} ({}/100, {}) [{}]",
        indicators.performance_icon,
        indicators.performance_level.label(),
        indicators.overall_score,
        month,
        indicators.performance_color
    );
}
