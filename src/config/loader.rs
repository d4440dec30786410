//! Configuration loading and environment variable interpolation

use crate::error::{Error, Result};
use regex::Regex;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use super::Config;

pub const CONFIG_FILENAME: &str = "altstocks.toml";

/// Load altstocks.toml if one exists, otherwise fall back to defaults
pub fn load_config_or_default() -> Result<Config> {
    match find_config_file() {
        Ok(path) => {
            tracing::info!("Loading configuration from {}", path.display());
            load_config_from_path(&path)
        }
        Err(Error::ConfigNotFound) => {
            tracing::info!("No {} found, using defaults", CONFIG_FILENAME);
            Ok(Config::default())
        }
        Err(e) => Err(e),
    }
}

/// Load configuration from a specific path
pub fn load_config_from_path(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path).map_err(|_| Error::ConfigNotFound)?;
    let content = interpolate_env_vars(&content);
    let config: Config = toml::from_str(&content)?;
    Ok(config)
}

/// Write configuration to a specific path
pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    fs::write(path, content)?;
    Ok(())
}

/// Find the configuration file, searching upward from current directory
fn find_config_file() -> Result<PathBuf> {
    let mut current = env::current_dir().map_err(|e| Error::Config(e.to_string()))?;

    loop {
        let config_path = current.join(CONFIG_FILENAME);
        if config_path.exists() {
            return Ok(config_path);
        }

        if !current.pop() {
            return Err(Error::ConfigNotFound);
        }
    }
}

/// Interpolate environment variables in the format ${VAR_NAME} or ${VAR_NAME:-default}
fn interpolate_env_vars(content: &str) -> String {
    // This regex is a compile-time constant, panicking is acceptable here
    // as it indicates a programming error in the codebase, not a runtime issue
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]*))?\}")
        .expect("Invalid regex pattern - this is a bug in the codebase");

    re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");

        env::var(var_name).unwrap_or_else(|_| default.to_string())
    })
    .to_string()
}

/// Generate a default configuration file content
pub fn default_config_content() -> &'static str {
    r#"# Alternative Stocks API configuration

[server]
host = "0.0.0.0"
port = ${PORT:-5000}
# Frontends allowed to call the API with the session cookie
allowed_origins = ["http://localhost:5173"]

[auth]
secret = "${ACCESS_TOKEN_SECRET}"
token_ttl_secs = 3600
# Require the owner's session for create/update/delete
enforce_ownership_on_writes = false

[auth.cookie]
# Cross-site production deployments: secure = true, same_site = "none"
secure = false
same_site = "lax"

[store]
backend = "postgres"  # or "memory"
url = "${DATABASE_URL:-host=localhost user=postgres password=postgres dbname=altstocks}"
"#
}
