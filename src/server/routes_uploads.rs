//! `POST /upload`: multipart file or JSON URL in, stored logo reference out.
//!
//! Multipart bodies carry a `file` field (plus optional `teamId` or `url`
//! text fields); JSON bodies are `{"url": "...", "teamId": "..."}`. The file
//! is streamed to a temp file in the configured temp directory; the upload
//! pipeline deletes it when done.

use std::path::Path;

use axum::{
    extract::{
        multipart::{Field, MultipartError},
        DefaultBodyLimit, FromRequest, Multipart, Request, State,
    },
    http::StatusCode,
    routing::post,
    Extension, Json, Router,
};
use axum_extra::{headers::ContentType, typed_header::TypedHeader};
use serde::{Deserialize, Serialize};
use synedrius_common::{Error, TeamId};
use tokio::io::AsyncWriteExt;

use super::auth::AuthSession;
use super::error::AppError;
use super::AppContext;
use crate::uploads::{
    TempUpload, UploadError, UploadOutcome, UploadRequest, UploadSource, UploadedFile,
};

/// Allowance for multipart boundaries and text fields on top of the file.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn upload_routes(ctx: &AppContext) -> Router<AppContext> {
    let limit = ctx.config.storage.max_upload_bytes + MULTIPART_OVERHEAD;
    Router::new().route("/upload", post(upload).layer(DefaultBodyLimit::max(limit)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlUploadRequest {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub team_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
    pub filename: String,
    pub width: u32,
    pub height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
}

impl From<UploadOutcome> for UploadResponse {
    fn from(outcome: UploadOutcome) -> Self {
        Self {
            url: outcome.stored.url,
            filename: outcome.stored.name,
            width: outcome.width,
            height: outcome.height,
            team_id: outcome.team_id.map(|id| id.to_string()),
        }
    }
}

async fn upload(
    State(ctx): State<AppContext>,
    Extension(auth): Extension<AuthSession>,
    content_type: Option<TypedHeader<ContentType>>,
    request: Request,
) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
    let content_type = content_type
        .map(|TypedHeader(ct)| ct.to_string().to_ascii_lowercase())
        .unwrap_or_default();

    let (source, team_id) = if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(request, &ctx)
            .await
            .map_err(|e| Error::validation(e.body_text()))?;
        read_multipart(&ctx, multipart).await?
    } else if content_type.starts_with("application/json") {
        let Json(body) = Json::<UrlUploadRequest>::from_request(request, &ctx)
            .await
            .map_err(|e| Error::validation(e.body_text()))?;
        let url = body.url.trim();
        if url.is_empty() {
            return Err(UploadError::Missing.into());
        }
        (
            UploadSource::RemoteUrl(url.to_string()),
            parse_team_id(body.team_id.as_deref())?,
        )
    } else {
        return Err(UploadError::Missing.into());
    };

    let request = UploadRequest {
        source,
        team_id,
        user_id: auth.user.id,
    };

    // Runs detached: a client disconnect must not cancel it mid-write.
    let service = ctx.uploads.clone();
    let outcome = tokio::spawn(async move { service.process(request).await })
        .await
        .map_err(|e| UploadError::Task(e.to_string()))??;

    Ok((StatusCode::CREATED, Json(UploadResponse::from(outcome))))
}

fn parse_team_id(raw: Option<&str>) -> Result<Option<TeamId>, UploadError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => s
            .parse()
            .map(Some)
            .map_err(|_| Error::validation("Invalid team id").into()),
    }
}

fn multipart_error(e: MultipartError, max_bytes: usize) -> UploadError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        UploadError::TooLarge { max_bytes }
    } else {
        Error::validation(e.body_text()).into()
    }
}

async fn read_multipart(
    ctx: &AppContext,
    mut multipart: Multipart,
) -> Result<(UploadSource, Option<TeamId>), UploadError> {
    let max_bytes = ctx.config.storage.max_upload_bytes;
    let mut file: Option<UploadedFile> = None;
    let mut url: Option<String> = None;
    let mut team: Option<String> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_bytes))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let original_name = field.file_name().unwrap_or_default().to_string();
                // Browsers send an empty, unnamed part when no file is chosen.
                if original_name.is_empty() {
                    continue;
                }
                if file.is_some() {
                    return Err(Error::validation("Only one file can be uploaded").into());
                }
                let media_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                if !synedrius_common::paths::is_image_media_type(&media_type) {
                    return Err(UploadError::NotAnImage { media_type });
                }

                let temp = spool_field(&mut field, &ctx.config.storage.tmp_dir, max_bytes).await?;
                file = Some(UploadedFile {
                    temp,
                    media_type,
                    original_name,
                });
            }
            Some("url") => {
                url = Some(field.text().await.map_err(|e| multipart_error(e, max_bytes))?);
            }
            Some("teamId") => {
                team = Some(field.text().await.map_err(|e| multipart_error(e, max_bytes))?);
            }
            _ => {}
        }
    }

    let url = url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty());
    let source = match (file, url) {
        (Some(file), None) => UploadSource::File(file),
        (None, Some(url)) => UploadSource::RemoteUrl(url),
        (None, None) => return Err(UploadError::Missing),
        (Some(_), Some(_)) => return Err(UploadError::Ambiguous),
    };

    Ok((source, parse_team_id(team.as_deref())?))
}

/// Stream one multipart field into a new temp file, enforcing the size cap.
async fn spool_field(
    field: &mut Field<'_>,
    dir: &Path,
    max_bytes: usize,
) -> Result<TempUpload, UploadError> {
    let (temp, file) = TempUpload::create_in(dir)?;
    let mut file = tokio::fs::File::from_std(file);
    let mut written = 0usize;

    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| multipart_error(e, max_bytes))?
    {
        written += chunk.len();
        if written > max_bytes {
            return Err(UploadError::TooLarge { max_bytes });
        }
        file.write_all(&chunk).await?;
    }
    file.flush().await?;

    tracing::debug!("Spooled {} byte upload to {:?}", written, temp.path());
    Ok(temp)
}
