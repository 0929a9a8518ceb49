//! Command-line interface definitions using clap

use clap::{Parser, Subcommand};

/// ShortVault - cache-coherent short link storage
#[derive(Parser)]
#[command(name = "shortvault")]
#[command(version)]
#[command(about = "Short link storage with coherent caches across backends", long_about = None)]
pub struct Cli {
    /// Configuration file path (default: config.toml)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run background maintenance (cache subscription, sweeper, heartbeat) until Ctrl+C
    Serve,

    /// Create a short link
    Create {
        /// Target URL (http or https)
        target_url: String,

        /// Preferred short code instead of a generated one
        #[arg(long)]
        alias: Option<String>,

        /// Expire after N seconds (0 = never)
        #[arg(long, default_value_t = 0)]
        expire_after: i64,
    },

    /// Resolve a short link and count the visit
    Get {
        /// Short code
        id: String,
    },

    /// Delete a short link with its secret
    Delete {
        /// Short code
        id: String,

        /// Secret returned at creation
        secret: String,
    },

    /// Show visit counters of a short link
    Stats {
        /// Short code
        id: String,
    },

    /// Run one expiration sweep
    Sweep {
        /// Only report candidates, delete nothing
        #[arg(long)]
        dry_run: bool,
    },

    /// Check every configured backend once
    Health {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

/// Configuration management commands
#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Generate example configuration file
    Generate {
        /// Output path (default: config.toml)
        output_path: Option<String>,

        /// Force overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration as TOML
    Show,
}
