//! Team endpoints. All of them require a session.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use synedrius_common::{Error, TeamId, UserId};
use synedrius_db::models::{Team, TeamMember};
use synedrius_db::pool::{get_conn, PooledConnection};
use synedrius_db::queries::{stored_images, teams};

use super::auth::AuthSession;
use super::error::AppError;
use super::AppContext;
use crate::uploads::{fetch::parse_remote_url, LogoStorage, PUBLIC_PREFIX};

pub fn team_routes() -> Router<AppContext> {
    Router::new()
        .route("/newTeam", post(create_team))
        .route("/api/teams", get(list_teams))
        .route("/api/teams/:id", get(get_team))
}

#[derive(Debug, Deserialize)]
pub struct NewTeamRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub logo: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TeamDetail {
    #[serde(flatten)]
    pub team: Team,
    pub members: Vec<TeamMember>,
}

/// Accept no logo, an external http(s) URL or a stored upload reference.
///
/// A stored upload must have been uploaded by `user_id`, still be on disk
/// and not be shown by any team yet.
fn validate_logo(
    ctx: &AppContext,
    conn: &PooledConnection,
    user_id: UserId,
    logo: Option<String>,
) -> Result<Option<String>, Error> {
    let Some(logo) = logo.map(|l| l.trim().to_string()).filter(|l| !l.is_empty()) else {
        return Ok(None);
    };

    if !logo.starts_with(PUBLIC_PREFIX) {
        parse_remote_url(&logo)
            .map_err(|_| Error::validation("Logo must be an uploaded image or an http(s) URL"))?;
        return Ok(Some(logo));
    }

    let not_yours = || Error::validation("Logo must reference an image you uploaded");
    let (Some(name), Some(path)) = (
        LogoStorage::stored_name(&logo),
        ctx.uploads.storage().resolve_reference(&logo),
    ) else {
        return Err(not_yours());
    };

    if stored_images::image_owner(conn, name)? != Some(user_id) {
        return Err(not_yours());
    }
    if !path.is_file() {
        tracing::debug!("Logo {} is recorded but missing on disk", logo);
        return Err(not_yours());
    }
    if teams::count_logo_references(conn, &logo)? > 0 {
        return Err(Error::Conflict("Logo is already used by another team".to_string()));
    }

    Ok(Some(logo))
}

async fn create_team(
    State(ctx): State<AppContext>,
    Extension(auth): Extension<AuthSession>,
    Json(payload): Json<NewTeamRequest>,
) -> Result<(StatusCode, Json<Team>), AppError> {
    let conn = get_conn(&ctx.db)?;
    let logo = validate_logo(&ctx, &conn, auth.user.id, payload.logo)?;
    let team = teams::create_team(&conn, &payload.name, logo.as_deref(), auth.user.id)?;

    tracing::info!(team_id = %team.id, owner = %auth.user.id, "Team created: {}", team.name);
    Ok((StatusCode::CREATED, Json(team)))
}

async fn list_teams(
    State(ctx): State<AppContext>,
    Extension(auth): Extension<AuthSession>,
) -> Result<Json<Vec<Team>>, AppError> {
    let conn = get_conn(&ctx.db)?;
    Ok(Json(teams::list_teams_for_user(&conn, auth.user.id)?))
}

async fn get_team(
    State(ctx): State<AppContext>,
    Extension(auth): Extension<AuthSession>,
    Path(id): Path<String>,
) -> Result<Json<TeamDetail>, AppError> {
    let team_id: TeamId = id
        .parse()
        .map_err(|_| Error::validation("Invalid team id"))?;

    let conn = get_conn(&ctx.db)?;
    let team = teams::get_team(&conn, team_id)?.ok_or_else(|| Error::not_found("team", team_id))?;

    if !teams::is_member(&conn, team_id, auth.user.id)? {
        return Err(Error::Forbidden("Not a member of this team".to_string()).into());
    }

    let members = teams::list_members(&conn, team_id)?;
    Ok(Json(TeamDetail { team, members }))
}
