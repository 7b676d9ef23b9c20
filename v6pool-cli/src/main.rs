//! v6pool CLI
//!
//! A command-line interface for IPv6 range arithmetic and subnet pools.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use v6pool_core::{Address, AddressRange, Network, NetworkMask};
use v6pool_engine::{Config, PoolRegistry};

const DEFAULT_LOG_LEVEL: &str = "info";

/// v6pool - IPv6 address arithmetic and subnet allocation
#[derive(Parser)]
#[command(name = "v6pool")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "v6pool.toml")]
    config: PathBuf,

    /// Log level (error, warn, info, debug, trace); overrides `[common] log_level`
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decompose an address range into the minimal list of CIDR networks
    Subnets {
        /// First address of the range
        first: Address,
        /// Last address of the range
        last: Address,
    },

    /// Split a network into subnets of a longer prefix length
    Split {
        /// Network in CIDR notation
        network: Network,
        /// Prefix length of the subnets
        prefix_length: u8,
        /// Print at most this many subnets
        #[arg(long, default_value_t = 64)]
        limit: usize,
    },

    /// Print the smallest network containing two addresses
    Common {
        one: Address,
        two: Address,
    },

    /// Allocate subnets from a configured pool
    Allocate {
        /// Pool name
        pool: String,
        /// Number of subnets to allocate
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,
    },

    /// Show configured pools and their free subnets
    Status {
        /// Pool name (all pools when omitted)
        pool: Option<String>,
        /// Print at most this many free subnets per pool
        #[arg(long, default_value_t = 16)]
        limit: usize,
    },

    /// Generate a sample configuration file
    GenConfig {
        /// Output path for the configuration file
        #[arg(short, long, default_value = "v6pool.toml")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Pool commands read the config first so its log level can apply
    let config = match cli.command {
        Commands::Allocate { .. } | Commands::Status { .. } => Some(load_config(&cli.config)?),
        _ => None,
    };

    // Initialize logging
    let level = log_filter(
        std::env::var("RUST_LOG").ok(),
        cli.log_level.as_deref(),
        config.as_ref().map(|config| config.common.log_level.as_str()),
    );
    init_logging(&level);
    if config.is_some() {
        info!("Configuration loaded from {:?}", cli.config);
    }

    match (cli.command, config) {
        (Commands::Subnets { first, last }, _) => print_subnets(first, last),
        (
            Commands::Split {
                network,
                prefix_length,
                limit,
            },
            _,
        ) => print_split(&network, prefix_length, limit),
        (Commands::Common { one, two }, _) => {
            println!("{}", Network::from_two_addresses(one, two));
            Ok(())
        }
        (Commands::Allocate { pool, count }, Some(config)) => allocate(&config, &pool, count),
        (Commands::Status { pool, limit }, Some(config)) => status(&config, pool.as_deref(), limit),
        (Commands::GenConfig { output }, _) => generate_config(output),
        (Commands::Allocate { .. } | Commands::Status { .. }, None) => {
            bail!("No configuration loaded")
        }
    }
}

/// Pick the log filter: `RUST_LOG`, then `--log-level`, then `[common] log_level`
fn log_filter(rust_log: Option<String>, cli_level: Option<&str>, config_level: Option<&str>) -> String {
    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .or_else(|| cli_level.map(str::to_string))
        .or_else(|| config_level.map(str::to_string))
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
}

fn init_logging(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_subnets(first: Address, last: Address) -> Result<()> {
    let range = AddressRange::from_first_and_last(first, last).context("Invalid address range")?;
    debug!("decomposing {}", range);

    for network in range.to_subnets() {
        println!("{}", network);
    }
    Ok(())
}

fn print_split(network: &Network, prefix_length: u8, limit: usize) -> Result<()> {
    let mask = NetworkMask::from_prefix_length(prefix_length).context("Invalid prefix length")?;
    let subnets = network
        .split(mask)
        .with_context(|| format!("Failed to split {}", network))?;

    let (shown, truncated) = take_limited(subnets, limit);
    for subnet in &shown {
        println!("{}", subnet);
    }

    if truncated {
        info!("output limited to {} subnets, use --limit to show more", limit);
    }
    Ok(())
}

/// Collect at most `limit` items and report whether any were left over
fn take_limited<I: Iterator>(mut items: I, limit: usize) -> (Vec<I::Item>, bool) {
    let shown: Vec<I::Item> = items.by_ref().take(limit).collect();
    let truncated = items.next().is_some();
    (shown, truncated)
}

fn allocate(config: &Config, pool: &str, count: usize) -> Result<()> {
    let mut registry = PoolRegistry::from_config(config).context("Failed to build pools")?;

    for _ in 0..count {
        let network = registry
            .allocate(pool)
            .with_context(|| format!("Failed to allocate from pool {}", pool))?;
        println!("{}", network);
    }

    info!("{}", registry.status(pool)?);
    Ok(())
}

fn status(config: &Config, pool: Option<&str>, limit: usize) -> Result<()> {
    let registry = PoolRegistry::from_config(config).context("Failed to build pools")?;

    let names: Vec<&str> = match pool {
        Some(name) => {
            if registry.pool(name).is_none() {
                bail!("Unknown pool: {}", name);
            }
            vec![name]
        }
        None => registry.names().collect(),
    };

    for name in names {
        println!("{}", registry.status(name)?);
        if let Some(pool) = registry.pool(name) {
            for network in pool.free_networks().take(limit) {
                println!("  free {}", network);
            }
        }
    }
    Ok(())
}

fn generate_config(output: PathBuf) -> Result<()> {
    let sample = Config::sample();

    if output.exists() {
        bail!(
            "Configuration file already exists: {:?}. Remove it first or use a different path.",
            output
        );
    }

    std::fs::write(&output, sample)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!("Sample configuration written to {:?}", output);
    println!("Edit the file to define your pools, then run:");
    println!("  v6pool -c {:?} status", output);

    Ok(())
}

fn load_config(path: &Path) -> Result<Config> {
    Config::load(path).with_context(|| format!("Failed to load config from {:?}", path))
}
