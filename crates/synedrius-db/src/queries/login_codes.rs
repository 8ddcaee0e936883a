//! One-time login code queries.
//!
//! A user holds at most one live code: issuing a new one replaces any
//! earlier codes. Expired rows are never returned and can be purged. A code
//! is revoked once it has collected too many failed verifications.

use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;
use synedrius_common::{Error, LoginCodeId, Result, UserId};

use crate::models::{format_timestamp, now, LoginCode, Session};
use crate::queries::{sessions, users};

const COLS: &str = "id, user_id, code_hash, created_at, expires_at, attempts";

/// Store a new code hash for a user, replacing earlier codes.
///
/// # Arguments
///
/// * `conn` - Database connection
/// * `user_id` - Owner of the code
/// * `code_hash` - Keyed hash of the code (the clear code is never stored)
/// * `ttl` - Lifetime of the code
pub fn create_code(
    conn: &Connection,
    user_id: UserId,
    code_hash: &str,
    ttl: Duration,
) -> Result<LoginCode> {
    let id = LoginCodeId::new();
    let created_at = now();
    let expires_at = created_at + ttl;

    let tx = conn
        .unchecked_transaction()
        .map_err(|e| Error::database(e.to_string()))?;

    tx.execute(
        "DELETE FROM login_codes WHERE user_id = ?1",
        [user_id.to_string()],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    tx.execute(
        "INSERT INTO login_codes (id, user_id, code_hash, created_at, expires_at)
         VALUES (:id, :user_id, :code_hash, :created_at, :expires_at)",
        rusqlite::named_params! {
            ":id": id.to_string(),
            ":user_id": user_id.to_string(),
            ":code_hash": code_hash,
            ":created_at": format_timestamp(created_at),
            ":expires_at": format_timestamp(expires_at),
        },
    )
    .map_err(|e| Error::database(e.to_string()))?;

    tx.commit().map_err(|e| Error::database(e.to_string()))?;

    Ok(LoginCode {
        id,
        user_id,
        code_hash: code_hash.to_string(),
        created_at,
        expires_at,
        attempts: 0,
    })
}

/// List the user's codes that have not expired at `at`.
pub fn active_codes_for_user(
    conn: &Connection,
    user_id: UserId,
    at: DateTime<Utc>,
) -> Result<Vec<LoginCode>> {
    let q = format!(
        "SELECT {COLS} FROM login_codes
         WHERE user_id = ?1 AND expires_at > ?2
         ORDER BY created_at DESC"
    );
    let mut stmt = conn
        .prepare(&q)
        .map_err(|e| Error::database(e.to_string()))?;

    let codes = stmt
        .query_map(
            rusqlite::params![user_id.to_string(), format_timestamp(at)],
            LoginCode::from_row,
        )
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(codes)
}

/// Consume one code. Returns `false` if it was already consumed or revoked,
/// so at most one caller can ever redeem a given code.
pub fn consume_code(conn: &Connection, id: LoginCodeId) -> Result<bool> {
    let n = conn
        .execute("DELETE FROM login_codes WHERE id = ?1", [id.to_string()])
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

/// Redeem a matched code in one transaction: consume it, mark its user
/// verified and open a session.
///
/// Returns `None` without side effects if the code was already consumed or
/// revoked.
pub fn redeem_code(
    conn: &Connection,
    code: &LoginCode,
    session_ttl: Duration,
) -> Result<Option<Session>> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| Error::database(e.to_string()))?;

    if !consume_code(&tx, code.id)? {
        return Ok(None);
    }
    users::mark_verified(&tx, code.user_id)?;
    let session = sessions::create_session(&tx, code.user_id, session_ttl)?;

    tx.commit().map_err(|e| Error::database(e.to_string()))?;
    Ok(Some(session))
}

/// Count a failed verification against the user's codes and revoke those
/// that reached `max_attempts`.
///
/// Returns the number of revoked codes.
pub fn record_failed_attempt(
    conn: &Connection,
    user_id: UserId,
    max_attempts: u32,
) -> Result<usize> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| Error::database(e.to_string()))?;

    tx.execute(
        "UPDATE login_codes SET attempts = attempts + 1 WHERE user_id = ?1",
        [user_id.to_string()],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    let revoked = tx
        .execute(
            "DELETE FROM login_codes WHERE user_id = ?1 AND attempts >= ?2",
            rusqlite::params![user_id.to_string(), max_attempts],
        )
        .map_err(|e| Error::database(e.to_string()))?;

    tx.commit().map_err(|e| Error::database(e.to_string()))?;
    Ok(revoked)
}

/// Delete all codes that expired before `at`.
pub fn purge_expired(conn: &Connection, at: DateTime<Utc>) -> Result<usize> {
    conn.execute(
        "DELETE FROM login_codes WHERE expires_at <= ?1",
        [format_timestamp(at)],
    )
    .map_err(|e| Error::database(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::init_memory_pool;
    use crate::queries::users;

    #[test]
    fn test_create_code() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let user = users::create_user(&conn, "a@example.com", "A").unwrap();

        let code = create_code(&conn, user.id, "hash-1", Duration::seconds(600)).unwrap();
        assert_eq!(code.user_id, user.id);
        assert_eq!(code.expires_at - code.created_at, Duration::seconds(600));

        let active = active_codes_for_user(&conn, user.id, Utc::now()).unwrap();
        assert_eq!(active, vec![code]);
    }

    #[test]
    fn test_new_code_replaces_old() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let user = users::create_user(&conn, "a@example.com", "A").unwrap();

        create_code(&conn, user.id, "first", Duration::seconds(600)).unwrap();
        create_code(&conn, user.id, "second", Duration::seconds(600)).unwrap();

        let active = active_codes_for_user(&conn, user.id, Utc::now()).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].code_hash, "second");
    }

    #[test]
    fn test_expired_codes_are_hidden_and_purged() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let user = users::create_user(&conn, "a@example.com", "A").unwrap();

        create_code(&conn, user.id, "stale", Duration::seconds(600)).unwrap();

        let later = Utc::now() + Duration::seconds(601);
        assert!(active_codes_for_user(&conn, user.id, later).unwrap().is_empty());

        assert_eq!(purge_expired(&conn, later).unwrap(), 1);
        assert_eq!(purge_expired(&conn, later).unwrap(), 0);
    }

    #[test]
    fn test_consume_code_only_once() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let user = users::create_user(&conn, "a@example.com", "A").unwrap();

        let code = create_code(&conn, user.id, "hash", Duration::seconds(600)).unwrap();
        assert!(consume_code(&conn, code.id).unwrap());
        assert!(!consume_code(&conn, code.id).unwrap());
        assert!(active_codes_for_user(&conn, user.id, Utc::now()).unwrap().is_empty());
    }

    #[test]
    fn test_failed_attempts_revoke_code() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let user = users::create_user(&conn, "a@example.com", "A").unwrap();

        create_code(&conn, user.id, "hash", Duration::seconds(600)).unwrap();
        assert_eq!(record_failed_attempt(&conn, user.id, 3).unwrap(), 0);
        assert_eq!(record_failed_attempt(&conn, user.id, 3).unwrap(), 0);

        let active = active_codes_for_user(&conn, user.id, Utc::now()).unwrap();
        assert_eq!(active[0].attempts, 2);

        assert_eq!(record_failed_attempt(&conn, user.id, 3).unwrap(), 1);
        assert!(active_codes_for_user(&conn, user.id, Utc::now()).unwrap().is_empty());
    }

    #[test]
    fn test_new_code_starts_without_attempts() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let user = users::create_user(&conn, "a@example.com", "A").unwrap();

        create_code(&conn, user.id, "first", Duration::seconds(600)).unwrap();
        record_failed_attempt(&conn, user.id, 5).unwrap();
        let code = create_code(&conn, user.id, "second", Duration::seconds(600)).unwrap();

        let active = active_codes_for_user(&conn, user.id, Utc::now()).unwrap();
        assert_eq!(active, vec![code]);
        assert_eq!(active[0].attempts, 0);
    }

    #[test]
    fn test_redeem_code_once() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let user = users::create_user(&conn, "a@example.com", "A").unwrap();
        create_code(&conn, user.id, "hash", Duration::seconds(600)).unwrap();

        // Two verifications that both matched the same code
        let first = active_codes_for_user(&conn, user.id, Utc::now()).unwrap();
        let second = active_codes_for_user(&conn, user.id, Utc::now()).unwrap();

        let session = redeem_code(&conn, &first[0], Duration::days(1))
            .unwrap()
            .unwrap();
        assert_eq!(session.user_id, user.id);
        assert!(users::get_user(&conn, user.id).unwrap().unwrap().is_verified);

        assert!(redeem_code(&conn, &second[0], Duration::days(1))
            .unwrap()
            .is_none());

        let sessions: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sessions WHERE user_id = ?1",
                [user.id.to_string()],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(sessions, 1);
    }
}
