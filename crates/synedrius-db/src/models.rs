//! Rust structs mapping to database tables.
//!
//! Each model implements `from_row` for constructing itself from a
//! `rusqlite::Row`. Timestamps are stored as fixed-width RFC 3339 strings
//! (microsecond precision, `Z` suffix) so that they order correctly when
//! compared as text.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::Type;
use serde::{Deserialize, Serialize};
use synedrius_common::{LoginCodeId, SessionId, TeamId, UserId};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// helpers
// ---------------------------------------------------------------------------

/// Current time truncated to the precision stored in the database, so a
/// freshly built model compares equal to the row read back.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Format a timestamp the way every table stores it.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_id<T: From<Uuid>>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T> {
    let s: String = row.get(idx)?;
    let uuid = Uuid::parse_str(&s)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))?;
    Ok(T::from(uuid))
}

fn parse_timestamp(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let s: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// Account that can log in with an emailed code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub username: String,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, 0)?,
            email: row.get(1)?,
            username: row.get(2)?,
            is_verified: row.get::<_, i32>(3)? != 0,
            created_at: parse_timestamp(row, 4)?,
        })
    }
}

// ---------------------------------------------------------------------------
// LoginCode
// ---------------------------------------------------------------------------

/// Issued one-time code. Only a keyed hash of the code is kept.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginCode {
    pub id: LoginCodeId,
    pub user_id: UserId,
    pub code_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Failed verifications against this code
    pub attempts: u32,
}

impl LoginCode {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, 0)?,
            user_id: parse_id(row, 1)?,
            code_hash: row.get(2)?,
            created_at: parse_timestamp(row, 3)?,
            expires_at: parse_timestamp(row, 4)?,
            attempts: row.get(5)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Server-side session referenced by the browser cookie.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: SessionId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, 0)?,
            user_id: parse_id(row, 1)?,
            created_at: parse_timestamp(row, 2)?,
            expires_at: parse_timestamp(row, 3)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Team
// ---------------------------------------------------------------------------

/// Team record. `logo` holds a Stored Image reference (`/uploads/...`) or
/// an external image URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub logo: Option<String>,
    pub owner_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Team {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, 0)?,
            name: row.get(1)?,
            logo: row.get(2)?,
            owner_id: parse_id(row, 3)?,
            created_at: parse_timestamp(row, 4)?,
            updated_at: parse_timestamp(row, 5)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TeamMember {
    pub team_id: TeamId,
    pub user_id: UserId,
    pub joined_at: DateTime<Utc>,
}

impl TeamMember {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            team_id: parse_id(row, 0)?,
            user_id: parse_id(row, 1)?,
            joined_at: parse_timestamp(row, 2)?,
        })
    }
}
