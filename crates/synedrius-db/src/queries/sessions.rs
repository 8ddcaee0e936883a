//! Browser session queries.

use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;
use synedrius_common::{Error, Result, SessionId, UserId};

use crate::models::{format_timestamp, now, Session};

const COLS: &str = "id, user_id, created_at, expires_at";

/// Open a new session for a user.
pub fn create_session(conn: &Connection, user_id: UserId, ttl: Duration) -> Result<Session> {
    let id = SessionId::new();
    let created_at = now();
    let expires_at = created_at + ttl;

    conn.execute(
        "INSERT INTO sessions (id, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![
            id.to_string(),
            user_id.to_string(),
            format_timestamp(created_at),
            format_timestamp(expires_at),
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(Session {
        id,
        user_id,
        created_at,
        expires_at,
    })
}

/// Look up a session that is still valid at `at`.
pub fn get_active_session(
    conn: &Connection,
    id: SessionId,
    at: DateTime<Utc>,
) -> Result<Option<Session>> {
    let q = format!("SELECT {COLS} FROM sessions WHERE id = ?1 AND expires_at > ?2");
    let result = conn.query_row(
        &q,
        rusqlite::params![id.to_string(), format_timestamp(at)],
        Session::from_row,
    );
    match result {
        Ok(s) => Ok(Some(s)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Delete a session (logout).
///
/// # Returns
///
/// * `Ok(true)` - If the session existed
/// * `Ok(false)` - If there was nothing to delete
pub fn delete_session(conn: &Connection, id: SessionId) -> Result<bool> {
    let n = conn
        .execute("DELETE FROM sessions WHERE id = ?1", [id.to_string()])
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

/// Delete all sessions that expired before `at`.
pub fn purge_expired(conn: &Connection, at: DateTime<Utc>) -> Result<usize> {
    conn.execute(
        "DELETE FROM sessions WHERE expires_at <= ?1",
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
    fn test_create_and_get_session() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let user = users::create_user(&conn, "a@example.com", "A").unwrap();

        let session = create_session(&conn, user.id, Duration::days(30)).unwrap();
        let found = get_active_session(&conn, session.id, Utc::now()).unwrap();
        assert_eq!(found, Some(session));
    }

    #[test]
    fn test_sessions_are_independent() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let a = users::create_user(&conn, "a@example.com", "A").unwrap();
        let b = users::create_user(&conn, "b@example.com", "B").unwrap();

        let sa = create_session(&conn, a.id, Duration::days(1)).unwrap();
        let sb = create_session(&conn, b.id, Duration::days(1)).unwrap();

        assert!(delete_session(&conn, sa.id).unwrap());
        assert!(get_active_session(&conn, sa.id, Utc::now()).unwrap().is_none());
        let still = get_active_session(&conn, sb.id, Utc::now()).unwrap().unwrap();
        assert_eq!(still.user_id, b.id);
    }

    #[test]
    fn test_expired_session_is_rejected() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let user = users::create_user(&conn, "a@example.com", "A").unwrap();

        let session = create_session(&conn, user.id, Duration::hours(1)).unwrap();
        let later = Utc::now() + Duration::hours(2);
        assert!(get_active_session(&conn, session.id, later).unwrap().is_none());
        assert_eq!(purge_expired(&conn, later).unwrap(), 1);
    }

    #[test]
    fn test_delete_unknown_session() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        assert!(!delete_session(&conn, SessionId::new()).unwrap());
    }
}
