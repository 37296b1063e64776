use clap::{Parser, Subcommand, ValueEnum};
use factcheck_cache::DEFAULT_NAMESPACE;

#[derive(Parser)]
#[command(name = "factcache")]
#[command(about = "Inspect and operate the fact-checker cache")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (defaults to ./factcheck-cache.toml when present)
    #[arg(short, long, global = true, env = "FACTCHECK_CACHE_CONFIG")]
    pub config: Option<String>,

    /// Output format
    #[arg(short, long, global = true)]
    pub format: Option<OutputFormat>,

    /// Log level when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,
}

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    Json,
    #[default]
    Table,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show hit/miss counters and tier sizes
    Stats,
    /// Probe every tier
    Health,
    /// List keys matching a glob pattern
    Keys(KeysArgs),
    /// List namespaces present in any tier
    Namespaces,
    /// Print a cached value as JSON
    Get(KeyArgs),
    /// Store a JSON value
    Set(SetArgs),
    /// Remove a key from every tier
    Delete(KeyArgs),
    /// Remove all entries, or all entries of one namespace
    Clear(ClearArgs),
    /// Purge expired entries now
    Cleanup,
    /// Sample usage periodically (Ctrl-C stops early)
    Monitor(MonitorArgs),
    /// Write a timestamped backup of the local tiers
    Backup(DirArgs),
    /// Restore the newest backup from a directory
    Restore(DirArgs),
}

#[derive(clap::Args)]
pub struct KeysArgs {
    /// Glob pattern (`*`, `?`) matched against keys without namespace
    #[arg(default_value = "*")]
    pub pattern: String,
    /// Limit to one namespace (all namespaces if omitted)
    #[arg(short, long)]
    pub namespace: Option<String>,
}

#[derive(clap::Args)]
pub struct KeyArgs {
    /// Cache key (e.g. claim:123)
    pub key: String,
    #[arg(short, long, default_value = DEFAULT_NAMESPACE)]
    pub namespace: String,
}

#[derive(clap::Args)]
pub struct SetArgs {
    /// Cache key (e.g. claim:123)
    pub key: String,
    /// JSON value (e.g. '{"status":"VERIFIED"}')
    pub value: String,
    /// TTL in seconds (configured default if omitted)
    #[arg(long)]
    pub ttl: Option<u64>,
    #[arg(short, long, default_value = DEFAULT_NAMESPACE)]
    pub namespace: String,
}

#[derive(clap::Args)]
pub struct ClearArgs {
    /// Only this namespace
    #[arg(short, long)]
    pub namespace: Option<String>,
}

#[derive(clap::Args)]
pub struct MonitorArgs {
    /// Total duration in seconds
    #[arg(short, long, default_value_t = 10)]
    pub duration: u64,
    /// Sampling interval in seconds
    #[arg(short, long, default_value_t = 1)]
    pub interval: u64,
}

#[derive(clap::Args)]
pub struct DirArgs {
    /// Backup directory
    pub dir: String,
}
