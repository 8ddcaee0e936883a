//! One-time-code login endpoints used by `login.html`.

use axum::{extract::State, routing::post, Json, Router};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

use super::auth::{removal_cookie, session_cookie, sign_session_id, verify_session_cookie, SESSION_COOKIE_NAME};
use super::error::AppError;
use super::AppContext;

pub fn login_routes() -> Router<AppContext> {
    Router::new()
        .route("/login/getCode", post(get_code))
        .route("/login/verify", post(verify))
        .route("/logout", post(logout))
}

#[derive(Debug, Deserialize)]
pub struct GetCodeRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: &str) -> Json<Self> {
        Json(Self {
            message: message.to_string(),
        })
    }
}

async fn get_code(
    State(ctx): State<AppContext>,
    Json(payload): Json<GetCodeRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    ctx.login_limits.check_code_request(&payload.email)?;
    ctx.login.request_code(&payload.email).await?;
    Ok(MessageResponse::new("Verification code sent to your email"))
}

async fn verify(
    State(ctx): State<AppContext>,
    jar: CookieJar,
    Json(payload): Json<VerifyRequest>,
) -> Result<(CookieJar, Json<MessageResponse>), AppError> {
    ctx.login_limits.check_verify(&payload.email)?;
    let (_, session) = ctx.login.verify_code(&payload.email, &payload.code)?;
    let value = sign_session_id(&ctx.config.auth.session_secret, session.id)?;

    // A new login replaces the session this browser had before.
    if let Some(old) = jar
        .get(SESSION_COOKIE_NAME)
        .and_then(|c| verify_session_cookie(&ctx.config.auth.session_secret, c.value()))
    {
        ctx.login.logout(old)?;
    }

    Ok((
        jar.add(session_cookie(&ctx.config, value)),
        MessageResponse::new("Login successful"),
    ))
}

async fn logout(
    State(ctx): State<AppContext>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<MessageResponse>), AppError> {
    if let Some(id) = jar
        .get(SESSION_COOKIE_NAME)
        .and_then(|c| verify_session_cookie(&ctx.config.auth.session_secret, c.value()))
    {
        ctx.login.logout(id)?;
    }

    Ok((jar.remove(removal_cookie()), MessageResponse::new("Logged out")))
}
