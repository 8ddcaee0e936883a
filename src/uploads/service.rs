//! Upload pipeline coordinating validation, normalization, storage and the
//! team record.
//!
//! Order of effects for one upload:
//!
//! 1. Team permission check (if a team is named). Nothing is written yet.
//! 2. Bytes are read from the temp file (which is then deleted) or fetched.
//! 3. Decode, resize and encode on the blocking pool, then write the new
//!    file atomically.
//! 4. Record the uploader of the new file and, for a team upload, swap the
//!    team's logo reference. On failure the new file is removed again.
//! 5. Delete the logo the swap replaced if it is a local upload that no
//!    other team still shows.
//!
//! Failures in step 2 to 4 leave no file at the final destination. Step 5
//! and temp-file deletion are best effort and reported as [`CleanupError`]s.

use super::error::{CleanupError, UploadError};
use super::fetch::RemoteFetcher;
use super::normalize::normalize;
use super::source::{UploadSource, UploadedFile};
use super::storage::{LogoStorage, StoredImage};
use bytes::Bytes;
use synedrius_common::paths::is_image_media_type;
use synedrius_common::{Error, TeamId, UserId};
use synedrius_db::pool::{get_conn, DbPool};
use synedrius_db::queries::{stored_images, teams};

/// One upload to process.
#[derive(Debug)]
pub struct UploadRequest {
    pub source: UploadSource,
    /// Team whose logo the upload replaces
    pub team_id: Option<TeamId>,
    /// Authenticated caller
    pub user_id: UserId,
}

/// Result of a successful upload.
#[derive(Debug)]
pub struct UploadOutcome {
    pub stored: StoredImage,
    pub width: u32,
    pub height: u32,
    pub team_id: Option<TeamId>,
    /// Reference of the logo this upload replaced
    pub replaced: Option<String>,
    /// Non-fatal cleanup failures (already logged)
    pub cleanup: Vec<CleanupError>,
}

pub struct UploadService {
    db: DbPool,
    storage: LogoStorage,
    fetcher: RemoteFetcher,
    max_bytes: usize,
}

impl UploadService {
    pub fn new(db: DbPool, storage: LogoStorage, fetcher: RemoteFetcher, max_bytes: usize) -> Self {
        Self {
            db,
            storage,
            fetcher,
            max_bytes,
        }
    }

    pub fn storage(&self) -> &LogoStorage {
        &self.storage
    }

    /// Run the whole pipeline for one upload.
    pub async fn process(&self, request: UploadRequest) -> Result<UploadOutcome, UploadError> {
        let mut cleanup = Vec::new();
        let result = self.run(request, &mut cleanup).await;

        for err in &cleanup {
            tracing::warn!("Upload cleanup: {}", err);
        }

        result.map(|mut outcome| {
            outcome.cleanup = cleanup;
            outcome
        })
    }

    async fn run(
        &self,
        request: UploadRequest,
        cleanup: &mut Vec<CleanupError>,
    ) -> Result<UploadOutcome, UploadError> {
        let UploadRequest {
            source,
            team_id,
            user_id,
        } = request;

        if let Some(team_id) = team_id {
            if let Err(e) = self.check_owner(team_id, user_id) {
                cleanup.extend(source.discard());
                return Err(e);
            }
        }

        let (bytes, original_name) = match source {
            UploadSource::File(file) => self.read_file(file, cleanup).await?,
            UploadSource::RemoteUrl(url) => {
                let fetched = self.fetcher.fetch(&url).await?;
                if let Some(media_type) = fetched.media_type.as_deref() {
                    if !is_image_media_type(media_type) {
                        tracing::debug!(
                            "Remote logo declares {}; decoding by content",
                            media_type
                        );
                    }
                }
                (fetched.bytes, fetched.name)
            }
        };

        let storage = self.storage.clone();
        let (stored, width, height) = tokio::task::spawn_blocking(move || {
            let normalized = normalize(&bytes)?;
            let stored = storage.write(&original_name, &normalized.jpeg)?;
            Ok::<_, UploadError>((stored, normalized.width, normalized.height))
        })
        .await
        .map_err(|e| UploadError::Task(e.to_string()))??;

        tracing::info!(
            "Stored logo {} ({}x{}) for user {}",
            stored.name,
            width,
            height,
            user_id
        );

        let committed = self
            .record(&stored, user_id)
            .and_then(|()| match team_id {
                Some(team_id) => self.swap_logo(team_id, &stored.url),
                None => Ok(None),
            });
        let previous = match committed {
            Ok(previous) => previous,
            Err(e) => {
                self.discard_uncommitted(&stored, cleanup).await;
                return Err(e);
            }
        };

        let replaced = previous.filter(|old| *old != stored.url);
        if let Some(old) = &replaced {
            self.release_logo(old, cleanup).await;
        }

        Ok(UploadOutcome {
            stored,
            width,
            height,
            team_id,
            replaced,
            cleanup: Vec::new(),
        })
    }

    /// The caller must own the team.
    fn check_owner(&self, team_id: TeamId, user_id: UserId) -> Result<(), UploadError> {
        let conn = get_conn(&self.db)?;
        let team = teams::get_team(&conn, team_id)?.ok_or_else(|| Error::not_found("team", team_id))?;
        if team.owner_id != user_id {
            return Err(Error::Forbidden("Only the team owner can change its logo".to_string()).into());
        }
        Ok(())
    }

    fn record(&self, stored: &StoredImage, user_id: UserId) -> Result<(), UploadError> {
        let conn = get_conn(&self.db)?;
        stored_images::record_image(&conn, &stored.name, user_id)?;
        Ok(())
    }

    /// Point the team at `url` and return the reference it replaced.
    fn swap_logo(&self, team_id: TeamId, url: &str) -> Result<Option<String>, UploadError> {
        let conn = get_conn(&self.db)?;
        let previous = teams::replace_logo(&conn, team_id, Some(url))?
            .ok_or_else(|| Error::not_found("team", team_id))?;
        Ok(previous)
    }

    /// Undo step 4 for a file whose commit failed.
    async fn discard_uncommitted(&self, stored: &StoredImage, cleanup: &mut Vec<CleanupError>) {
        if let Err(c) = self.storage.remove_uncommitted(stored).await {
            cleanup.push(c);
        }
        if let Err(c) = self.forget(&stored.name) {
            cleanup.push(c);
        }
    }

    /// Delete a replaced local logo unless some team still references it.
    async fn release_logo(&self, old: &str, cleanup: &mut Vec<CleanupError>) {
        let Some(name) = LogoStorage::stored_name(old) else {
            return;
        };

        let references = get_conn(&self.db).and_then(|conn| teams::count_logo_references(&conn, old));
        match references {
            Ok(0) => {}
            Ok(n) => {
                tracing::info!("Keeping replaced logo {}, still used by {} team(s)", old, n);
                return;
            }
            Err(source) => {
                cleanup.push(CleanupError::Record {
                    name: name.to_string(),
                    source,
                });
                return;
            }
        }

        match self.storage.delete_if_exists(old).await {
            Ok(true) => tracing::info!("Deleted replaced logo {}", old),
            Ok(false) => tracing::debug!("Replaced logo {} not on disk", old),
            Err(e) => {
                cleanup.push(e);
                return;
            }
        }
        if let Err(c) = self.forget(name) {
            cleanup.push(c);
        }
    }

    fn forget(&self, name: &str) -> Result<(), CleanupError> {
        get_conn(&self.db)
            .and_then(|conn| stored_images::delete_image(&conn, name))
            .map(|_| ())
            .map_err(|source| CleanupError::Record {
                name: name.to_string(),
                source,
            })
    }

    /// Validate and read a received file, deleting its temp file either way.
    async fn read_file(
        &self,
        file: UploadedFile,
        cleanup: &mut Vec<CleanupError>,
    ) -> Result<(Bytes, String), UploadError> {
        let UploadedFile {
            temp,
            media_type,
            original_name,
        } = file;

        let result = if !is_image_media_type(&media_type) {
            tracing::debug!("Rejected upload {:?} declared as {}", original_name, media_type);
            Err(UploadError::NotAnImage { media_type })
        } else {
            match tokio::fs::read(temp.path()).await {
                Ok(data) if data.is_empty() => Err(UploadError::Missing),
                Ok(data) if data.len() > self.max_bytes => Err(UploadError::TooLarge {
                    max_bytes: self.max_bytes,
                }),
                Ok(data) => Ok((Bytes::from(data), original_name)),
                Err(e) => Err(UploadError::Io(e)),
            }
        };

        if let Err(e) = temp.close() {
            cleanup.push(e);
        }
        result
    }
}
