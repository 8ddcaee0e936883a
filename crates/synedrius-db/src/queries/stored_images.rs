//! Uploaded logo files and the users who uploaded them.
//!
//! A row exists for every file the upload pipeline committed to the
//! uploads directory, keyed by its stored file name.

use rusqlite::{Connection, OptionalExtension};
use synedrius_common::{Error, Result, UserId};

use crate::models::{format_timestamp, now};

/// Record that `owner_id` uploaded the file stored as `name`.
pub fn record_image(conn: &Connection, name: &str, owner_id: UserId) -> Result<()> {
    conn.execute(
        "INSERT INTO stored_images (name, owner_id, created_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![name, owner_id.to_string(), format_timestamp(now())],
    )
    .map_err(|e| Error::database(e.to_string()))?;
    Ok(())
}

/// Look up who uploaded a stored file.
pub fn image_owner(conn: &Connection, name: &str) -> Result<Option<UserId>> {
    let owner: Option<String> = conn
        .query_row(
            "SELECT owner_id FROM stored_images WHERE name = ?1",
            [name],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| Error::database(e.to_string()))?;

    owner
        .map(|id| {
            id.parse::<UserId>()
                .map_err(|e| Error::database(format!("Invalid owner id for {name}: {e}")))
        })
        .transpose()
}

/// Forget a stored file. Returns `false` if it was not recorded.
pub fn delete_image(conn: &Connection, name: &str) -> Result<bool> {
    let n = conn
        .execute("DELETE FROM stored_images WHERE name = ?1", [name])
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}
