use std::path::PathBuf;

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};

/// tagexpire — set expiration on Quay image tags from ordered regex rules
#[derive(Parser, Debug, Default)]
#[command(name = "tagexpire", version, about)]
pub struct Cli {
    /// Path to the YAML configuration file
    #[arg(long, env = "TAGEXPIRE_CONFIG", default_value = "config.yml")]
    pub config: PathBuf,

    /// Quay URL (e.g., https://quay.example.com)
    #[arg(long, env = "QUAY_URL")]
    pub url: Option<String>,

    /// Quay OAuth token
    #[arg(long, env = "QUAY_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Compute decisions without changing anything
    #[arg(long, env = "QUAY_DRY_RUN", action = ArgAction::SetTrue, value_parser = BoolishValueParser::new())]
    pub dry_run: bool,

    /// Expiration for tags no rule matches (e.g., 336h, 14d)
    #[arg(long, env = "QUAY_IMAGE_EXPIRE")]
    pub default_expiration: Option<String>,

    /// Repositories processed in parallel
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Upper bound on repository listing pages
    #[arg(long)]
    pub max_pages: Option<usize>,

    /// Verbose output
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}
