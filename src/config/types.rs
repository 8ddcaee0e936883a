use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub mail: MailConfig,

    #[serde(default)]
    pub seo: SeoConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory holding the static pages and scripts
    #[serde(default = "default_public_dir")]
    pub public_dir: PathBuf,

    /// Production mode marks session cookies `Secure`
    #[serde(default)]
    pub production: bool,

    /// Public base URL used for canonical and Open Graph links
    #[serde(default)]
    pub public_url: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3000
}
fn default_public_dir() -> PathBuf {
    PathBuf::from("public")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_dir: default_public_dir(),
            production: false,
            public_url: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("synedrius.db")
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Flat directory of stored logos, served under `/uploads/`
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: PathBuf,

    /// Scratch directory for multipart uploads in flight
    #[serde(default = "default_tmp_dir")]
    pub tmp_dir: PathBuf,

    /// Largest accepted upload or fetched image, in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Timeout for fetching a remote logo URL
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
}

fn default_uploads_dir() -> PathBuf {
    PathBuf::from("public/uploads")
}
fn default_tmp_dir() -> PathBuf {
    PathBuf::from("tmp")
}
fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}
fn default_fetch_timeout() -> u64 {
    30
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            uploads_dir: default_uploads_dir(),
            tmp_dir: default_tmp_dir(),
            max_upload_bytes: default_max_upload_bytes(),
            fetch_timeout_secs: default_fetch_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Key for signing session cookies and hashing login codes
    /// (generate with `synedrius generate-secret`)
    #[serde(default)]
    pub session_secret: String,

    /// Session lifetime in days (default: 30)
    #[serde(default = "default_session_ttl_days")]
    pub session_ttl_days: u64,

    /// One-time code lifetime in seconds (default: 600)
    #[serde(default = "default_code_ttl_secs")]
    pub code_ttl_secs: u64,

    /// Code requests accepted per email address per minute (default: 5)
    #[serde(default = "default_code_requests_per_minute")]
    pub code_requests_per_minute: u32,

    /// Verification attempts accepted per email address per minute (default: 10)
    #[serde(default = "default_verify_requests_per_minute")]
    pub verify_requests_per_minute: u32,
}

fn default_session_ttl_days() -> u64 {
    30
}
fn default_code_ttl_secs() -> u64 {
    600
}
fn default_code_requests_per_minute() -> u32 {
    5
}
fn default_verify_requests_per_minute() -> u32 {
    10
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_secret: String::new(),
            session_ttl_days: default_session_ttl_days(),
            code_ttl_secs: default_code_ttl_secs(),
            code_requests_per_minute: default_code_requests_per_minute(),
            verify_requests_per_minute: default_verify_requests_per_minute(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MailTransport {
    /// Write messages to the log and keep them in memory
    #[default]
    Log,
    /// POST messages as JSON to an HTTP mail relay
    Relay,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MailConfig {
    #[serde(default)]
    pub transport: MailTransport,

    #[serde(default = "default_from_name")]
    pub from_name: String,

    #[serde(default = "default_from_address")]
    pub from_address: String,

    #[serde(default)]
    pub relay_url: Option<String>,

    #[serde(default)]
    pub relay_api_key: Option<String>,
}

fn default_from_name() -> String {
    "Project Synedrius".to_string()
}
fn default_from_address() -> String {
    "no-reply@localhost".to_string()
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            transport: MailTransport::default(),
            from_name: default_from_name(),
            from_address: default_from_address(),
            relay_url: None,
            relay_api_key: None,
        }
    }
}

/// Defaults for page metadata served by `/api/meta`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SeoConfig {
    #[serde(default = "default_seo_title")]
    pub title: String,

    #[serde(default = "default_seo_description")]
    pub description: String,

    #[serde(default = "default_seo_author")]
    pub author: String,

    #[serde(default = "default_seo_keywords")]
    pub keywords: String,

    #[serde(default = "default_seo_robots")]
    pub robots: String,

    #[serde(default = "default_og_type")]
    pub og_type: String,

    #[serde(default = "default_og_locale")]
    pub og_locale: String,
}

fn default_seo_title() -> String {
    "Project Synedrius".to_string()
}
fn default_seo_description() -> String {
    "A platform for syndicates to collaborate with wikis, forums, and chats.".to_string()
}
fn default_seo_author() -> String {
    "Quidque Studio".to_string()
}
fn default_seo_keywords() -> String {
    "syndicates, wiki, chat, forum, Project Synedrius".to_string()
}
fn default_seo_robots() -> String {
    "index, follow".to_string()
}
fn default_og_type() -> String {
    "website".to_string()
}
fn default_og_locale() -> String {
    "en_US".to_string()
}

impl Default for SeoConfig {
    fn default() -> Self {
        Self {
            title: default_seo_title(),
            description: default_seo_description(),
            author: default_seo_author(),
            keywords: default_seo_keywords(),
            robots: default_seo_robots(),
            og_type: default_og_type(),
            og_locale: default_og_locale(),
        }
    }
}
