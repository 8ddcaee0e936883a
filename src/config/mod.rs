mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Load configuration from a TOML file, then apply environment overrides
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    apply_env_overrides(&mut config)?;
    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./config.toml",
        "./synedrius.toml",
        "~/.config/synedrius/config.toml",
        "/etc/synedrius/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    let mut config = Config::default();
    apply_env_overrides(&mut config)?;
    validate_config(&config)?;
    Ok(config)
}

/// Apply overrides from the process environment.
///
/// Recognized variables: `PORT`, `SESSION_SECRET`, `NODE_ENV`,
/// `DATABASE_PATH`, `URL`, `EMAIL_FROM_NAME`, `EMAIL_FROM_ADDRESS`,
/// `EMAIL_RELAY_URL`, `EMAIL_RELAY_API_KEY`.
pub fn apply_env_overrides(config: &mut Config) -> Result<()> {
    apply_overrides_from(config, |key| std::env::var(key).ok())
}

fn apply_overrides_from<F>(config: &mut Config, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(port) = var("PORT") {
        config.server.port = port
            .trim()
            .parse()
            .with_context(|| format!("PORT is not a valid port number: {port:?}"))?;
    }
    if let Some(env) = var("NODE_ENV") {
        config.server.production = env.trim().eq_ignore_ascii_case("production");
    }
    if let Some(url) = var("URL") {
        config.server.public_url = Some(url.trim_end_matches('/').to_string());
    }
    if let Some(secret) = var("SESSION_SECRET") {
        config.auth.session_secret = secret;
    }
    if let Some(path) = var("DATABASE_PATH") {
        config.database.path = PathBuf::from(shellexpand::tilde(&path).as_ref());
    }
    if let Some(name) = var("EMAIL_FROM_NAME") {
        config.mail.from_name = name;
    }
    if let Some(address) = var("EMAIL_FROM_ADDRESS") {
        config.mail.from_address = address;
    }
    if let Some(url) = var("EMAIL_RELAY_URL") {
        config.mail.relay_url = Some(url);
        config.mail.transport = MailTransport::Relay;
    }
    if let Some(key) = var("EMAIL_RELAY_API_KEY") {
        config.mail.relay_api_key = Some(key);
    }

    Ok(())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if config.server.production && config.auth.session_secret.trim().is_empty() {
        anyhow::bail!("A session secret is required in production (set SESSION_SECRET)");
    }

    if config.auth.session_ttl_days == 0 {
        anyhow::bail!("auth.session_ttl_days must be at least 1");
    }

    if config.auth.code_ttl_secs == 0 {
        anyhow::bail!("auth.code_ttl_secs must be at least 1");
    }

    if config.auth.code_requests_per_minute == 0 || config.auth.verify_requests_per_minute == 0 {
        anyhow::bail!("auth login rate limits must be at least 1 per minute");
    }

    if config.storage.max_upload_bytes == 0 {
        anyhow::bail!("storage.max_upload_bytes must be greater than 0");
    }

    if config.mail.transport == MailTransport::Relay
        && config.mail.relay_url.as_deref().map_or(true, |u| u.trim().is_empty())
    {
        anyhow::bail!("Mail transport 'relay' requires mail.relay_url");
    }

    if config.storage.uploads_dir == config.storage.tmp_dir {
        tracing::warn!(
            "storage.tmp_dir equals storage.uploads_dir; in-flight uploads will be publicly visible"
        );
    }

    Ok(())
}
