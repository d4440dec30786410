//! CLI interface for Alternative Stocks

pub mod commands;
mod output;

pub use output::*;

use clap::{Args, Parser, Subcommand};

use crate::config::{Config, StoreBackend};

#[derive(Parser)]
#[command(name = "altstocks")]
#[command(version)]
#[command(about = "REST backend for the Alternative Stocks app", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default altstocks.toml configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Start the HTTP API server
    Serve(ServeArgs),

    /// Print a signed session token for an email (for manual API testing)
    Token {
        /// Email to embed in the token
        #[arg(short, long)]
        email: String,

        /// Signing secret (defaults to the configured one)
        #[arg(long, env = "ACCESS_TOKEN_SECRET", hide_env_values = true)]
        secret: Option<String>,
    },
}

/// Overrides applied on top of altstocks.toml
#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,

    /// Token signing secret
    #[arg(long, env = "ACCESS_TOKEN_SECRET", hide_env_values = true)]
    pub secret: Option<String>,

    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    /// Frontend origin allowed to call the API (repeatable)
    #[arg(long = "allowed-origin", env = "ALLOWED_ORIGINS", value_delimiter = ',')]
    pub allowed_origins: Vec<String>,

    /// Keep documents in memory instead of PostgreSQL
    #[arg(long)]
    pub memory: bool,
}

impl ServeArgs {
    /// Apply command line and environment overrides to `config`
    pub fn apply(self, config: &mut Config) {
        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(secret) = self.secret {
            config.auth.secret = secret;
        }
        if let Some(url) = self.database_url {
            config.store.url = url;
            config.store.backend = StoreBackend::Postgres;
        }
        if !self.allowed_origins.is_empty() {
            config.server.allowed_origins = self.allowed_origins;
        }
        if self.memory {
            config.store.backend = StoreBackend::Memory;
        }
    }
}
