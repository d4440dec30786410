//! CLI command implementations

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::api;
use crate::auth::{IdentityClaim, TokenService};
use crate::cli::{error, info, success, warn, ServeArgs};
use crate::config::{self, loader::CONFIG_FILENAME};

/// Write a default altstocks.toml configuration file
pub async fn init(force: bool) -> Result<()> {
    let config_path = Path::new(CONFIG_FILENAME);

    if config_path.exists() && !force {
        warn(&format!("{} already exists (use --force to overwrite)", CONFIG_FILENAME));
        return Ok(());
    }

    let content = config::loader::default_config_content();
    fs::write(config_path, content)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    success(&format!("Created {}", CONFIG_FILENAME));
    info("Set ACCESS_TOKEN_SECRET and run 'altstocks serve' to start the API");

    Ok(())
}

/// Start the HTTP API server
pub async fn serve(args: ServeArgs) -> Result<()> {
    let mut config = config::load_config_or_default().context("Failed to load configuration")?;
    args.apply(&mut config);

    info(&format!(
        "Starting server at http://{}:{}",
        config.server.host, config.server.port
    ));

    if let Err(e) = api::run_server(config).await {
        error(&format!("Server failed: {}", e));
        return Err(e.into());
    }
    Ok(())
}

/// Print a signed session token for `email`
pub async fn token(email: &str, secret: Option<String>) -> Result<()> {
    let mut config = config::load_config_or_default().context("Failed to load configuration")?;
    if let Some(secret) = secret {
        config.auth.secret = secret;
    }
    config.validate()?;

    let claim = IdentityClaim::new(email);
    crate::auth::validate_email("email", &claim.email)?;

    let tokens = TokenService::new(
        config.auth.secret.as_bytes(),
        chrono::Duration::seconds(config.auth.token_ttl_secs),
    );
    println!("{}", tokens.issue(&claim)?);
    Ok(())
}
