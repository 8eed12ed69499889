use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

/// Command-line arguments for the exambank binary.
#[derive(Debug, Parser)]
#[command(
    name = "exambank",
    version,
    about = "Inspect and maintain the exambank listing cache"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "EXAMBANK_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Print the cache key for a listing page.
    Key(KeyArgs),
    /// Print the cached page stored under a listing key.
    Show(ShowArgs),
    /// Evict every cached listing page that contains a question.
    Invalidate(QuestionArgs),
    /// Print the listing keys currently indexed for a question.
    Index(QuestionArgs),
}

/// Parameters that identify one listing page.
#[derive(Debug, Args, Clone)]
pub struct ListingArgs {
    /// List as this user; omit for the system listing.
    #[arg(long = "user", value_name = "ID")]
    pub user: Option<i64>,

    #[arg(long, default_value_t = 1, value_name = "PAGE")]
    pub page: u32,

    #[arg(long, default_value_t = 10, value_name = "SIZE")]
    pub size: u32,

    /// Restrict to one subject; omit for all subjects.
    #[arg(long = "subject", value_name = "ID")]
    pub subject: Option<i64>,
}

#[derive(Debug, Args, Clone)]
pub struct KeyArgs {
    #[command(flatten)]
    pub listing: ListingArgs,
}

#[derive(Debug, Args, Clone)]
pub struct ShowArgs {
    #[command(flatten)]
    pub listing: ListingArgs,

    #[command(flatten)]
    pub overrides: RuntimeOverrides,
}

#[derive(Debug, Args, Clone)]
pub struct QuestionArgs {
    /// Question id.
    #[arg(value_name = "QUESTION_ID")]
    pub question: i64,

    #[command(flatten)]
    pub overrides: RuntimeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct RuntimeOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the Redis connection URL.
    #[arg(long = "redis-url", value_name = "URL")]
    pub redis_url: Option<String>,

    /// Override the per-operation cache timeout in milliseconds.
    #[arg(long = "cache-operation-timeout-ms", value_name = "MILLIS")]
    pub cache_operation_timeout_ms: Option<u64>,
}
