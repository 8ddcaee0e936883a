use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "synedrius")]
#[command(author, version, about = "Team management server with emailed login codes")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web server
    Start {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config and PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Register a user who can then log in by email
    CreateUser {
        /// Email address the login code is sent to
        #[arg(required = true)]
        email: String,

        /// Display name (defaults to the part of the email before '@')
        #[arg(short, long)]
        username: Option<String>,
    },

    /// Generate a random session secret
    GenerateSecret,

    /// Display version information
    Version,
}
