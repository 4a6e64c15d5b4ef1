#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

pub use toml_config::{BackendKind, BookingConfig};

#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "clinic-booking")]
#[command(about = "Find doctors and book appointment slots")]
pub struct CliConfig {
    /// Path to TOML configuration file (in-memory backend when omitted)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Session access token issued by the auth service
    #[arg(long, env = "CLINIC_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Act as this user id (memory backend only)
    #[arg(long)]
    pub as_user: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: cli::Command,
}
