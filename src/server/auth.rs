//! Session cookies and the authentication middleware.
//!
//! The cookie carries `<session id>.<hmac>`; the signature lets forged or
//! tampered cookies be rejected without a database lookup. The session row
//! itself is the source of truth for expiry and logout.

use crate::config::Config;
use crate::login::{hmac_hex, verify_hmac_hex};
use crate::server::error::AppError;
use crate::server::AppContext;
use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use synedrius_common::{Error, Result, SessionId};
use synedrius_db::models::User;

pub const SESSION_COOKIE_NAME: &str = "synedrius_session";

/// Authenticated caller, inserted as a request extension by [`require_session`].
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub session_id: SessionId,
    pub user: User,
}

/// Signed cookie value for a session.
pub fn sign_session_id(secret: &str, id: SessionId) -> Result<String> {
    let id = id.to_string();
    let sig = hmac_hex(secret, id.as_bytes())?;
    Ok(format!("{id}.{sig}"))
}

/// Extract the session id from a cookie value if the signature checks out.
pub fn verify_session_cookie(secret: &str, value: &str) -> Option<SessionId> {
    let (id, sig) = value.split_once('.')?;
    if !verify_hmac_hex(secret, id.as_bytes(), sig) {
        return None;
    }
    id.parse().ok()
}

/// Build the session cookie: HTTP-only, SameSite=Strict, Secure in production.
pub fn session_cookie(config: &Config, value: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(config.server.production)
        .max_age(time::Duration::days(config.auth.session_ttl_days as i64))
        .build()
}

/// Cookie that clears the session cookie.
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, "")).path("/").build()
}

/// Resolve the caller's session from the cookie jar.
///
/// Missing, forged, expired and logged-out sessions all resolve to `None`.
pub fn current_session(ctx: &AppContext, jar: &CookieJar) -> Result<Option<AuthSession>> {
    let Some(cookie) = jar.get(SESSION_COOKIE_NAME) else {
        return Ok(None);
    };
    let Some(session_id) = verify_session_cookie(&ctx.config.auth.session_secret, cookie.value())
    else {
        tracing::debug!("Ignoring session cookie with a bad signature");
        return Ok(None);
    };

    Ok(ctx
        .login
        .session_user(session_id)?
        .map(|(session, user)| AuthSession {
            session_id: session.id,
            user,
        }))
}

/// Middleware rejecting requests without a live session.
pub async fn require_session(
    State(ctx): State<AppContext>,
    jar: CookieJar,
    mut request: Request<Body>,
    next: Next,
) -> std::result::Result<Response, AppError> {
    let session = current_session(&ctx, &jar)?
        .ok_or_else(|| Error::Unauthorized("Login required".to_string()))?;

    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}

/// Generate a random session secret
pub fn generate_secret() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    hex::encode(bytes)
}
