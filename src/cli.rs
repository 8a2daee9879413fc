//! Command-line interface

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// DeFi Insight - rate-limited multi-source protocol analysis
#[derive(Parser, Debug)]
#[command(name = "defi-insight")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long, env = "DEFI_INSIGHT_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        long,
        default_value = "warn",
        env = "DEFI_INSIGHT_LOG_LEVEL",
        global = true
    )]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "DEFI_INSIGHT_LOG_FORMAT", global = true)]
    pub log_format: Option<String>,

    /// Subcommand
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build a composite insight for one or more protocols
    Analyze {
        /// Protocol slugs (e.g. aave, uniswap)
        #[arg(required = true)]
        protocols: Vec<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Check the monetary figures in a text against on-chain TVL
    Verify {
        /// Protocol slug
        protocol: String,

        /// Text containing figures such as "$1.5B"
        text: String,
    },

    /// Show volume and top pairs of a DEX
    Dex {
        /// DEX slug (e.g. uniswap)
        dex: String,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Show current TVL per chain, or the TVL history of one chain
    Chains {
        /// Chain name for a daily history (e.g. Ethereum)
        #[arg(long)]
        history: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Show current TVL of several protocols
    Tvl {
        /// Protocol slugs
        #[arg(required = true)]
        protocols: Vec<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Show USD spot prices of tokens
    Price {
        /// Token ids (e.g. ethereum, aave)
        #[arg(required = true)]
        tokens: Vec<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Show the effective admission budgets
    Limits,
}

/// Output format for data commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One summary paragraph per protocol
    Text,
    /// Pretty-printed composite records
    Json,
}
