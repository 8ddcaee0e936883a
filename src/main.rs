mod cli;

use synedrius::{config, mail, server};
use synedrius_db::pool::{get_conn, init_pool};
use synedrius_db::queries::users;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&Path>,
) -> Result<()> {
    // Load config
    let mut config = config::load_config_or_default(config_path)?;

    // Override host/port from CLI if specified
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    if config.auth.session_secret.trim().is_empty() {
        tracing::warn!("No session secret configured; generated one for this run, sessions will not survive a restart");
        config.auth.session_secret = server::auth::generate_secret();
    }

    tracing::info!("Starting Synedrius server");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );

    let db_path = config.database.path.to_string_lossy().to_string();
    tracing::info!("Initializing database at {}", db_path);
    let db_pool = init_pool(&db_path)?;

    let mailer = mail::build_mailer(&config.mail)?;
    tracing::info!("Using '{}' mail transport", mailer.name());

    let result = server::start_server(config, db_pool, mailer).await;
    tracing::info!("Shutting down...");
    result
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "synedrius=trace,synedrius_db=debug,tower_http=debug".to_string()
        } else {
            "synedrius=debug,synedrius_db=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::CreateUser { email, username } => {
            create_user(cli.config.as_deref(), &email, username.as_deref())
        }
        Commands::GenerateSecret => {
            println!("{}", server::auth::generate_secret());
            Ok(())
        }
        Commands::Version => {
            println!("synedrius {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            config::load_config(p)?
        }
        None => {
            println!("No config file specified, using defaults");
            config::load_config_or_default(None)?
        }
    };

    println!("✓ Configuration is valid");
    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Production: {}", config.server.production);
    println!("  Database: {:?}", config.database.path);
    println!("  Uploads: {:?}", config.storage.uploads_dir);
    println!("  Mail transport: {:?}", config.mail.transport);
    if config.auth.session_secret.trim().is_empty() {
        println!("  Session secret: not set (a random one is generated at startup)");
    }

    Ok(())
}

fn create_user(config_path: Option<&Path>, email: &str, username: Option<&str>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;

    let username = match username {
        Some(name) => name.to_string(),
        None => email.split('@').next().unwrap_or_default().to_string(),
    };

    let pool = init_pool(&config.database.path.to_string_lossy())?;
    let conn = get_conn(&pool)?;
    let user = users::create_user(&conn, email, &username)
        .with_context(|| format!("Failed to create user {email}"))?;

    println!("Created user {} <{}> ({})", user.username, user.email, user.id);
    Ok(())
}
