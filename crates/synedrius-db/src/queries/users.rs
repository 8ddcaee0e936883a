//! User database queries.
//!
//! Accounts are looked up by email when a login code is requested; emails
//! are normalized to lower case on the way in.

use rusqlite::Connection;
use synedrius_common::{Error, Result, UserId};

use crate::models::{format_timestamp, now, User};

const COLS: &str = "id, email, username, is_verified, created_at";

/// Normalize an email address for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Create a new, unverified user.
///
/// # Returns
///
/// * `Ok(User)` - The created user
/// * `Err(Error::Conflict)` - If the email is already registered
pub fn create_user(conn: &Connection, email: &str, username: &str) -> Result<User> {
    let id = UserId::new();
    let email = normalize_email(email);
    let created_at = now();

    conn.execute(
        "INSERT INTO users (id, email, username, is_verified, created_at)
         VALUES (:id, :email, :username, 0, :created_at)",
        rusqlite::named_params! {
            ":id": id.to_string(),
            ":email": email,
            ":username": username,
            ":created_at": format_timestamp(created_at),
        },
    )
    .map_err(|e| {
        if e.to_string().contains("UNIQUE constraint failed") {
            Error::Conflict(format!("Email '{}' is already registered", email))
        } else {
            Error::database(e.to_string())
        }
    })?;

    Ok(User {
        id,
        email,
        username: username.to_string(),
        is_verified: false,
        created_at,
    })
}

/// Get a user by ID.
pub fn get_user(conn: &Connection, id: UserId) -> Result<Option<User>> {
    let q = format!("SELECT {COLS} FROM users WHERE id = ?1");
    match conn.query_row(&q, [id.to_string()], User::from_row) {
        Ok(user) => Ok(Some(user)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Get a user by email (case-insensitive).
pub fn get_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>> {
    let q = format!("SELECT {COLS} FROM users WHERE email = ?1");
    match conn.query_row(&q, [normalize_email(email)], User::from_row) {
        Ok(user) => Ok(Some(user)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Mark a user's email as verified (after a successful code login).
///
/// # Returns
///
/// * `Ok(true)` - If the user exists
/// * `Ok(false)` - If the user does not exist
pub fn mark_verified(conn: &Connection, id: UserId) -> Result<bool> {
    let rows = conn
        .execute(
            "UPDATE users SET is_verified = 1 WHERE id = ?1",
            [id.to_string()],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows > 0)
}
