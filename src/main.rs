//! DeFi Insight - multi-source protocol analysis
//!
//! Fans out to risk, sentiment, governance, yield and trend sources under
//! shared per-domain request budgets.

use std::process::ExitCode;

use clap::Parser;
use futures::future::join_all;
use serde::Serialize;
use tracing::{error, info};

use defi_insight::{
    cli::{Cli, Command, OutputFormat},
    config::Config,
    intelligence::{Aggregator, ChainTvlAdapter, DexAdapter, PriceAdapter, SourceClient},
    setup_tracing,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Config first: its env files may carry RUST_LOG
    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Setup tracing
    if let Err(e) = setup_tracing(&cli.log_level, cli.log_format.as_deref()) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    match cli.command {
        Command::Analyze { protocols, format } => run_analyze(&config, &protocols, format).await,
        Command::Verify { protocol, text } => run_verify(&config, &protocol, &text).await,
        Command::Dex { dex, format } => run_dex(&config, &dex, format).await,
        Command::Chains { history, format } => {
            run_chains(&config, history.as_deref(), format).await
        }
        Command::Tvl { protocols, format } => run_tvl(&config, &protocols, format).await,
        Command::Price { tokens, format } => run_price(&config, &tokens, format).await,
        Command::Limits => run_limits(&config),
    }
}

/// Run the aggregator for every protocol concurrently
async fn run_analyze(config: &Config, protocols: &[String], format: OutputFormat) -> ExitCode {
    let aggregator = match Aggregator::from_config(config) {
        Ok(aggregator) => aggregator,
        Err(e) => {
            eprintln!("❌ {e}");
            return ExitCode::FAILURE;
        }
    };

    info!(protocols = protocols.len(), "Analyzing protocols");
    let results = join_all(
        protocols
            .iter()
            .map(|protocol| aggregator.get_comprehensive_analysis(protocol)),
    )
    .await;

    let mut failed = false;
    let mut insights = Vec::with_capacity(results.len());
    for (protocol, result) in protocols.iter().zip(results) {
        match result {
            Ok(insight) => insights.push(insight),
            Err(e) => {
                error!(protocol = %protocol, error = %e, "Analysis failed");
                eprintln!("❌ {protocol}: {e}");
                failed = true;
            }
        }
    }

    match format {
        OutputFormat::Json => match serde_json::to_string_pretty(&insights) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("❌ Failed to serialize to JSON: {e}");
                return ExitCode::FAILURE;
            }
        },
        OutputFormat::Text => {
            for insight in &insights {
                println!("📊 {}", insight.protocol);
                println!("   {}", insight.summary);
                println!(
                    "   TVL: ${:.0} ({}), average APY: {:.2}%",
                    insight.risk.details.tvl_usd,
                    insight.trends.tvl.trend,
                    insight.yields.average_apy
                );
                println!();
            }
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Check stated figures against on-chain TVL
async fn run_verify(config: &Config, protocol: &str, text: &str) -> ExitCode {
    let aggregator = match Aggregator::from_config(config) {
        Ok(aggregator) => aggregator,
        Err(e) => {
            eprintln!("❌ {e}");
            return ExitCode::FAILURE;
        }
    };

    match aggregator.onchain().verify_stated_figures(text, protocol).await {
        Ok(check) => {
            if check.figures.is_empty() {
                println!("No monetary figures found.");
                return ExitCode::SUCCESS;
            }

            println!("On-chain TVL for {}: ${:.0}", check.protocol, check.onchain_tvl);
            for checked in &check.figures {
                let mark = if checked.within_tolerance { "✅" } else { "❌" };
                match checked.deviation {
                    Some(d) => println!("{mark} {} ({:.1}% off)", checked.figure.raw, d * 100.0),
                    None => println!("{mark} {} (no on-chain TVL)", checked.figure.raw),
                }
            }

            if check.verified {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            eprintln!("❌ Verification failed: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Build the shared client, reporting failure on stderr
fn source_client(config: &Config) -> Option<SourceClient> {
    SourceClient::from_config(config)
        .inspect_err(|e| eprintln!("❌ {e}"))
        .ok()
}

/// Pretty-print `value` as JSON on stdout
fn print_json<T: Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("❌ Failed to serialize to JSON: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Show DEX volume and top pairs
async fn run_dex(config: &Config, dex: &str, format: OutputFormat) -> ExitCode {
    let Some(client) = source_client(config) else {
        return ExitCode::FAILURE;
    };

    match DexAdapter::new(client, &config.sources).stats(dex).await {
        Ok(stats) => match format {
            OutputFormat::Json => print_json(&stats),
            OutputFormat::Text => {
                println!("📊 {}", stats.dex);
                println!(
                    "   24h volume: ${:.0} ({:+.2}%), all-time: ${:.0}",
                    stats.daily_volume, stats.volume_change_24h, stats.total_volume
                );
                for pair in &stats.top_pairs {
                    println!(
                        "   {:<20} ${:>16.0} {:+.2}%",
                        pair.pair, pair.volume_24h, pair.price_change_24h
                    );
                }
                ExitCode::SUCCESS
            }
        },
        Err(e) => {
            eprintln!("❌ {dex}: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Show TVL per chain, or one chain's history
async fn run_chains(config: &Config, history: Option<&str>, format: OutputFormat) -> ExitCode {
    let Some(client) = source_client(config) else {
        return ExitCode::FAILURE;
    };
    let adapter = ChainTvlAdapter::new(client, &config.sources);

    if let Some(chain) = history {
        return match adapter.chain_history(chain).await {
            Ok(points) => match format {
                OutputFormat::Json => print_json(&points),
                OutputFormat::Text => {
                    println!("📈 {chain}");
                    for point in &points {
                        let day = chrono::DateTime::from_timestamp(point.date, 0)
                            .map_or_else(|| point.date.to_string(), |d| d.date_naive().to_string());
                        println!("   {day}  ${:.0}", point.tvl);
                    }
                    ExitCode::SUCCESS
                }
            },
            Err(e) => {
                eprintln!("❌ {chain}: {e}");
                ExitCode::FAILURE
            }
        };
    }

    match adapter.all_chains().await {
        Ok(chains) => match format {
            OutputFormat::Json => print_json(&chains),
            OutputFormat::Text => {
                let mut ranked: Vec<_> = chains.values().collect();
                ranked.sort_by(|a, b| b.tvl.total_cmp(&a.tvl));
                for chain in ranked {
                    println!(
                        "  {:<24} ${:>18.0} {}",
                        chain.name,
                        chain.tvl,
                        chain.token_symbol.as_deref().unwrap_or("")
                    );
                }
                ExitCode::SUCCESS
            }
        },
        Err(e) => {
            eprintln!("❌ Failed to fetch chains: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Show current TVL of several protocols
async fn run_tvl(config: &Config, protocols: &[String], format: OutputFormat) -> ExitCode {
    let Some(client) = source_client(config) else {
        return ExitCode::FAILURE;
    };

    match ChainTvlAdapter::new(client, &config.sources)
        .protocols_tvl(protocols)
        .await
    {
        Ok(tvl) => match format {
            OutputFormat::Json => print_json(&tvl),
            OutputFormat::Text => {
                for (name, value) in &tvl {
                    println!("  {name:<24} ${value:>18.0}");
                }
                ExitCode::SUCCESS
            }
        },
        Err(e) => {
            eprintln!("❌ Failed to fetch TVL: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Show USD spot prices
async fn run_price(config: &Config, tokens: &[String], format: OutputFormat) -> ExitCode {
    let Some(client) = source_client(config) else {
        return ExitCode::FAILURE;
    };

    match PriceAdapter::new(client, &config.sources).prices(tokens).await {
        Ok(prices) => match format {
            OutputFormat::Json => print_json(&prices),
            OutputFormat::Text => {
                for token in tokens {
                    match prices.get(token) {
                        Some(usd) => println!("  {token:<24} ${usd}"),
                        None => println!("  {token:<24} (unknown)"),
                    }
                }
                ExitCode::SUCCESS
            }
        },
        Err(e) => {
            eprintln!("❌ Failed to fetch prices: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Print the effective admission budgets
fn run_limits(config: &Config) -> ExitCode {
    let admission = &config.admission;

    let mut domains: Vec<_> = admission.domains.iter().collect();
    domains.sort_by(|a, b| a.0.cmp(b.0));

    println!("Admission budgets:");
    for (domain, budget) in domains {
        println!(
            "  {domain:<24} {:>4} per {:?}",
            budget.max_requests, budget.window
        );
    }
    println!(
        "  {:<24} {:>4} per {:?}",
        "(other)", admission.default.max_requests, admission.default.window
    );
    println!(
        "\n429 retries: {} (default wait {:?})",
        admission.max_retries, admission.default_retry_after
    );

    ExitCode::SUCCESS
}
