//! Team database queries.
//!
//! Creating a team also records its owner as the first member.

use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior};
use synedrius_common::{Error, Result, TeamId, UserId};

use crate::models::{format_timestamp, now, Team, TeamMember};

const COLS: &str = "id, name, logo, owner_id, created_at, updated_at";

/// Create a team owned by `owner_id`.
///
/// The name is trimmed; an empty name is rejected.
pub fn create_team(
    conn: &Connection,
    name: &str,
    logo: Option<&str>,
    owner_id: UserId,
) -> Result<Team> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::validation("Team name is required"));
    }

    let id = TeamId::new();
    let created_at = now();
    let stamp = format_timestamp(created_at);

    let tx = conn
        .unchecked_transaction()
        .map_err(|e| Error::database(e.to_string()))?;

    tx.execute(
        "INSERT INTO teams (id, name, logo, owner_id, created_at, updated_at)
         VALUES (:id, :name, :logo, :owner_id, :created_at, :updated_at)",
        rusqlite::named_params! {
            ":id": id.to_string(),
            ":name": name,
            ":logo": logo,
            ":owner_id": owner_id.to_string(),
            ":created_at": stamp,
            ":updated_at": stamp,
        },
    )
    .map_err(|e| Error::database(e.to_string()))?;

    tx.execute(
        "INSERT INTO team_members (team_id, user_id, joined_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![id.to_string(), owner_id.to_string(), stamp],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    tx.commit().map_err(|e| Error::database(e.to_string()))?;

    Ok(Team {
        id,
        name: name.to_string(),
        logo: logo.map(String::from),
        owner_id,
        created_at,
        updated_at: created_at,
    })
}

/// Get a team by ID.
pub fn get_team(conn: &Connection, id: TeamId) -> Result<Option<Team>> {
    let q = format!("SELECT {COLS} FROM teams WHERE id = ?1");
    conn.query_row(&q, [id.to_string()], Team::from_row)
        .optional()
        .map_err(|e| Error::database(e.to_string()))
}

/// List the teams a user belongs to, newest first.
pub fn list_teams_for_user(conn: &Connection, user_id: UserId) -> Result<Vec<Team>> {
    let mut stmt = conn
        .prepare(
            "SELECT t.id, t.name, t.logo, t.owner_id, t.created_at, t.updated_at
             FROM teams t
             INNER JOIN team_members m ON m.team_id = t.id
             WHERE m.user_id = ?1
             ORDER BY t.created_at DESC",
        )
        .map_err(|e| Error::database(e.to_string()))?;

    let teams = stmt
        .query_map([user_id.to_string()], Team::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(teams)
}

/// Swap a team's logo reference and return the one it replaced.
///
/// The read and the write happen under one write lock, so concurrent swaps
/// each see the reference the other wrote.
///
/// # Returns
///
/// * `Ok(Some(previous))` - If the team exists and was updated
/// * `Ok(None)` - If no such team exists
pub fn replace_logo(
    conn: &Connection,
    id: TeamId,
    logo: Option<&str>,
) -> Result<Option<Option<String>>> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
        .map_err(|e| Error::database(e.to_string()))?;

    let previous: Option<Option<String>> = tx
        .query_row(
            "SELECT logo FROM teams WHERE id = ?1",
            [id.to_string()],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| Error::database(e.to_string()))?;

    if previous.is_none() {
        return Ok(None);
    }

    tx.execute(
        "UPDATE teams SET logo = ?1, updated_at = ?2 WHERE id = ?3",
        rusqlite::params![logo, format_timestamp(now()), id.to_string()],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    tx.commit().map_err(|e| Error::database(e.to_string()))?;
    Ok(previous)
}

/// Number of teams whose logo is `logo`.
pub fn count_logo_references(conn: &Connection, logo: &str) -> Result<usize> {
    conn.query_row(
        "SELECT COUNT(*) FROM teams WHERE logo = ?1",
        [logo],
        |row| row.get(0),
    )
    .map_err(|e| Error::database(e.to_string()))
}

/// Add a member to a team. Adding an existing member is a no-op.
pub fn add_member(conn: &Connection, team_id: TeamId, user_id: UserId) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO team_members (team_id, user_id, joined_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![
            team_id.to_string(),
            user_id.to_string(),
            format_timestamp(now())
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;
    Ok(())
}

/// Check whether a user belongs to a team.
pub fn is_member(conn: &Connection, team_id: TeamId, user_id: UserId) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM team_members WHERE team_id = ?1 AND user_id = ?2",
            [team_id.to_string(), user_id.to_string()],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(found.is_some())
}

/// List a team's members in join order.
pub fn list_members(conn: &Connection, team_id: TeamId) -> Result<Vec<TeamMember>> {
    let mut stmt = conn
        .prepare(
            "SELECT team_id, user_id, joined_at FROM team_members
             WHERE team_id = ?1 ORDER BY joined_at",
        )
        .map_err(|e| Error::database(e.to_string()))?;

    let members = stmt
        .query_map([team_id.to_string()], TeamMember::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(members)
}
