//! Config file loading with process environment overrides.

use serial_test::serial;
use synedrius::config::{load_config, load_config_or_default, MailTransport};

const ENV_VARS: &[&str] = &[
    "PORT",
    "NODE_ENV",
    "URL",
    "SESSION_SECRET",
    "DATABASE_PATH",
    "EMAIL_FROM_NAME",
    "EMAIL_FROM_ADDRESS",
    "EMAIL_RELAY_URL",
    "EMAIL_RELAY_API_KEY",
];

fn clear_env() {
    for var in ENV_VARS {
        std::env::remove_var(var);
    }
}

fn write_config(dir: &tempfile::TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("config.toml");
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
#[serial]
fn load_file_without_env() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        r#"
        [server]
        port = 8090

        [database]
        path = "/var/lib/synedrius/app.db"

        [seo]
        title = "Club Teams"
        "#,
    );

    let config = load_config(&path).unwrap();
    assert_eq!(config.server.port, 8090);
    assert_eq!(config.database.path.to_str(), Some("/var/lib/synedrius/app.db"));
    assert_eq!(config.seo.title, "Club Teams");
    assert!(!config.server.production);
}

#[test]
#[serial]
fn env_overrides_file_values() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "[server]\nport = 8090\n");

    std::env::set_var("PORT", "9123");
    std::env::set_var("NODE_ENV", "production");
    std::env::set_var("SESSION_SECRET", "from-env");
    std::env::set_var("EMAIL_RELAY_URL", "https://relay.example/send");
    let result = load_config(&path);
    clear_env();

    let config = result.unwrap();
    assert_eq!(config.server.port, 9123);
    assert!(config.server.production);
    assert_eq!(config.auth.session_secret, "from-env");
    assert_eq!(config.mail.transport, MailTransport::Relay);
}

#[test]
#[serial]
fn production_without_secret_is_rejected() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "[server]\nproduction = true\n");

    let err = load_config(&path).unwrap_err();
    assert!(err.to_string().contains("session secret"));
}

#[test]
#[serial]
fn invalid_port_env_is_an_error() {
    clear_env();
    std::env::set_var("PORT", "not-a-port");
    let result = load_config_or_default(None);
    clear_env();

    assert!(result.is_err());
}

#[test]
#[serial]
fn malformed_file_is_an_error() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "[server\nport = ");

    assert!(load_config(&path).is_err());
}
