use anyhow::{Context, Result};
use bridgescope::{
    apis::CoinGeckoClient,
    bridge::BridgeAddresses,
    config,
    logger::{self, LogTag},
    rpc::{RpcClient, RpcStats},
    tokens::TokenRegistry,
    tracker::{TrackerHandle, TrackerSettings, TrackerSnapshot},
};
use clap::Parser;
use colored::Colorize;
use std::sync::Arc;
use tabled::{
    settings::{object::Rows, Alignment, Style},
    Table, Tabled,
};

/// Track wrapped bridge assets on Solana and their USD value
#[derive(Parser, Debug)]
#[command(name = "bridgescope", version, about)]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = config::CONFIG_FILE_PATH)]
    config: String,

    /// Print the first fully priced snapshot and exit
    #[arg(long)]
    once: bool,

    /// Print snapshots as JSON instead of a table
    #[arg(long)]
    json: bool,

    /// Enable debug output for these tags (comma separated, or "all")
    #[arg(long, value_delimiter = ',')]
    debug: Vec<String>,

    #[arg(long)]
    verbose: bool,
}

#[derive(Tabled)]
struct AssetRow {
    #[tabled(rename = "Symbol")]
    symbol: String,
    #[tabled(rename = "Chain")]
    chain: u8,
    #[tabled(rename = "Origin Address")]
    address: String,
    #[tabled(rename = "Wrapped Mint")]
    mint: String,
    #[tabled(rename = "Meta")]
    meta: String,
    #[tabled(rename = "Supply")]
    amount: u64,
    #[tabled(rename = "USD")]
    usd: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        logger::error(LogTag::System, &format!("{:#}", e));
        logger::flush();
        std::process::exit(1);
    }

    logger::flush();
}

async fn run(cli: Cli) -> Result<()> {
    config::load_config_from_path(&cli.config)
        .with_context(|| format!("loading {}", cli.config))?;
    let cfg = config::get_config_clone();

    logger::init(&cli.debug, cli.verbose, Some(cfg.logger.file_path.as_str()));
    logger::info(LogTag::System, "bridgescope starting");

    let settings = TrackerSettings::from_config(&cfg)?;
    let rpc = Arc::new(RpcClient::from_config(&cfg.rpc)?);
    logger::info(
        LogTag::Rpc,
        &format!("RPC {} (websocket {})", rpc.url(), rpc.ws_url()),
    );
    let coingecko = Arc::new(CoinGeckoClient::new(&cfg.pricing)?);
    let registry = Arc::new(
        TokenRegistry::from_config(&cfg.tokens, &coingecko)
            .await
            .context("loading token directories")?,
    );

    let handle = TrackerHandle::spawn(rpc.clone(), registry, coingecko, settings)?;

    if cli.once {
        let snapshot = tokio::select! {
            snapshot = handle.wait_for(|s| !s.loading && s.priced) => Some(snapshot?),
            _ = tokio::signal::ctrl_c() => None,
        };
        if let Some(snapshot) = snapshot {
            print_snapshot(&snapshot, handle.addresses(), &rpc.stats(), cli.json)?;
        }
        handle.shutdown().await;
        return Ok(());
    }

    let mut snapshots = handle.subscribe();
    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    logger::warning(LogTag::System, "Tracker stopped publishing");
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                if !snapshot.loading {
                    print_snapshot(&snapshot, handle.addresses(), &rpc.stats(), cli.json)?;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                logger::info(LogTag::System, "Ctrl-C received, shutting down");
                break;
            }
        }
    }

    handle.shutdown().await;
    Ok(())
}

fn print_snapshot(
    snapshot: &TrackerSnapshot,
    addresses: &BridgeAddresses,
    rpc: &RpcStats,
    json: bool,
) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(snapshot)?);
        return Ok(());
    }

    let rows: Vec<AssetRow> = snapshot
        .external_assets
        .iter()
        .map(|record| AssetRow {
            symbol: record.symbol.clone().unwrap_or_else(|| "?".to_string()),
            chain: record.chain,
            address: record.address.clone(),
            mint: record
                .mint_address
                .map(|m| m.to_string())
                .unwrap_or_else(|| "-".to_string()),
            meta: record
                .mint_address
                .and_then(|m| addresses.wrapped_meta(&m).ok())
                .map(|m| m.to_string())
                .unwrap_or_else(|| "-".to_string()),
            amount: record.amount,
            usd: format!("{:.2}", record.amount_in_usd),
        })
        .collect();

    let mut table = Table::new(rows);
    table
        .with(Style::modern())
        .modify(Rows::first(), Alignment::center());
    println!("{}", table);

    let status = if snapshot.priced {
        "priced".green()
    } else {
        "awaiting prices".yellow()
    };
    println!(
        "{} assets | total {} USD | generation {} | {} | {}",
        snapshot.external_assets.len(),
        format!("{:.2}", snapshot.total_in_usd).bold(),
        snapshot.generation,
        status,
        snapshot.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!(
        "rpc: {} requests | {:.1}% ok | avg {}ms",
        rpc.total_requests,
        rpc.success_rate() * 100.0,
        rpc.average_response_time_ms
    );
    Ok(())
}
