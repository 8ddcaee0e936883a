//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which creates an in-memory DB, a config rooted in
//! a temp directory, a recording [`LogMailer`] and the full [`AppContext`].
//! The [`TestHarness::with_server`] constructor starts Axum on a random port
//! for HTTP-level testing.
#![allow(dead_code)]

use std::io::Cursor;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::Router;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use tempfile::TempDir;

use synedrius::config::Config;
use synedrius::mail::log::LogMailer;
use synedrius::server::{create_router, AppContext};
use synedrius_common::UserId;
use synedrius_db::models::{Team, User};
use synedrius_db::pool::{init_memory_pool, DbPool};
use synedrius_db::queries::{teams, users};

pub const TEST_SECRET: &str = "integration-test-secret";

/// Test harness wrapping a fully-constructed [`AppContext`].
pub struct TestHarness {
    pub ctx: AppContext,
    pub db: DbPool,
    pub mailer: Arc<LogMailer>,
    pub dir: TempDir,
}

impl TestHarness {
    /// Create a new harness with the default test configuration.
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Create a new harness, letting the caller adjust the config first.
    pub fn with_config(customize: impl FnOnce(&mut Config)) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let public_dir = dir.path().join("public");
        std::fs::create_dir_all(&public_dir).expect("failed to create public dir");
        std::fs::write(public_dir.join("index.html"), "<h1>teams</h1>").unwrap();
        std::fs::write(public_dir.join("login.html"), "<h1>login</h1>").unwrap();

        let mut config = Config::default();
        config.server.public_dir = public_dir.clone();
        config.storage.uploads_dir = public_dir.join("uploads");
        config.storage.tmp_dir = dir.path().join("tmp");
        config.storage.fetch_timeout_secs = 5;
        config.auth.session_secret = TEST_SECRET.to_string();
        customize(&mut config);

        let db = init_memory_pool().expect("failed to create in-memory pool");
        let mailer = Arc::new(LogMailer::new());
        let ctx = AppContext::new(config, db.clone(), mailer.clone())
            .expect("failed to build app context");
        ctx.prepare_storage().expect("failed to prepare storage");

        Self {
            ctx,
            db,
            mailer,
            dir,
        }
    }

    /// Start an Axum server on a random port and return the harness together
    /// with the bound socket address.
    pub async fn with_server() -> (Self, SocketAddr) {
        Self::serve(Self::new()).await
    }

    /// Start an Axum server with an adjusted config on a random port.
    pub async fn with_server_config(customize: impl FnOnce(&mut Config)) -> (Self, SocketAddr) {
        Self::serve(Self::with_config(customize)).await
    }

    async fn serve(harness: Self) -> (Self, SocketAddr) {
        let app = harness.router();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (harness, addr)
    }

    /// Router for `tower::ServiceExt::oneshot` tests.
    pub fn router(&self) -> Router {
        create_router(self.ctx.clone())
    }

    /// Get a database connection from the pool.
    pub fn conn(&self) -> synedrius_db::pool::PooledConnection {
        synedrius_db::pool::get_conn(&self.db).expect("failed to get db connection")
    }

    pub fn create_user(&self, email: &str, username: &str) -> User {
        users::create_user(&self.conn(), email, username).expect("failed to create user")
    }

    pub fn create_team(&self, name: &str, owner: UserId) -> Team {
        teams::create_team(&self.conn(), name, None, owner).expect("failed to create team")
    }

    pub fn team(&self, team: &Team) -> Team {
        teams::get_team(&self.conn(), team.id)
            .unwrap()
            .expect("team disappeared")
    }

    /// The six-digit code in the latest mail sent to `email`.
    pub fn last_code(&self, email: &str) -> String {
        let message = self.mailer.last_to(email).expect("no mail sent");
        let start = message
            .body
            .find("code is ")
            .expect("mail body has no code")
            + "code is ".len();
        message.body[start..start + 6].to_string()
    }

    /// Log in through the HTTP API and return a `Cookie` header value.
    pub async fn login(&self, addr: SocketAddr, email: &str) -> String {
        let client = reqwest::Client::new();
        let resp = client
            .post(format!("http://{addr}/login/getCode"))
            .json(&serde_json::json!({ "email": email }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);

        let code = self.last_code(email);
        let resp = client
            .post(format!("http://{addr}/login/verify"))
            .json(&serde_json::json!({ "email": email, "code": code }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);

        session_cookie(&resp).expect("verify did not set a session cookie")
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.ctx.config.storage.uploads_dir.clone()
    }

    /// Names of the files currently in the uploads directory.
    pub fn uploaded_files(&self) -> Vec<String> {
        list_dir(&self.ctx.config.storage.uploads_dir)
    }

    /// Names of the files currently in the temp directory.
    pub fn temp_files(&self) -> Vec<String> {
        list_dir(&self.ctx.config.storage.tmp_dir)
    }
}

/// `name=value` of the session cookie set by a response, if any.
pub fn session_cookie(resp: &reqwest::Response) -> Option<String> {
    resp.headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("synedrius_session="))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

pub fn list_dir(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().to_string())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

pub fn test_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    }))
}

pub fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), format)
        .expect("failed to encode test image");
    bytes
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(&test_image(width, height), ImageFormat::Png)
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(&test_image(width, height), ImageFormat::Jpeg)
}
