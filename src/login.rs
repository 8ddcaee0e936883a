//! Passwordless login with emailed one-time codes.
//!
//! A code is a random 6-digit number. Only its HMAC-SHA256 (keyed with the
//! session secret) is stored, so a leaked database does not reveal live
//! codes. Verifying a code consumes it and opens a new server-side session
//! in one transaction. A code is revoked after [`MAX_CODE_ATTEMPTS`] wrong
//! guesses.

use crate::config::Config;
use crate::mail::{MailMessage, Mailer};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;
use std::sync::Arc;
use synedrius_common::{Error, Result, SessionId};
use synedrius_db::models::{Session, User};
use synedrius_db::pool::{get_conn, DbPool};
use synedrius_db::queries::{login_codes, sessions, users};

type HmacSha256 = Hmac<Sha256>;

/// Number of digits in a one-time code.
pub const CODE_LENGTH: usize = 6;

/// Wrong guesses a code survives before it is revoked.
pub const MAX_CODE_ATTEMPTS: u32 = 5;

const INVALID_CODE: &str = "Invalid or expired code";

/// Hex-encoded HMAC-SHA256 of `data` keyed with `secret`.
pub fn hmac_hex(secret: &str, data: &[u8]) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| Error::internal(format!("Invalid HMAC key: {e}")))?;
    mac.update(data);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time check of a hex HMAC produced by [`hmac_hex`].
pub fn verify_hmac_hex(secret: &str, data: &[u8], expected_hex: &str) -> bool {
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(data);

    let Ok(expected) = hex::decode(expected_hex) else {
        return false;
    };
    mac.verify_slice(&expected).is_ok()
}

/// Generate a random one-time code, zero-padded to [`CODE_LENGTH`] digits.
pub fn generate_code() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{n:06}")
}

fn validate_email(email: &str) -> Result<&str> {
    let email = email.trim();
    let valid = email.len() <= 254
        && email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty());
    if valid {
        Ok(email)
    } else {
        Err(Error::validation("A valid email address is required"))
    }
}

/// Issues and checks one-time codes and manages sessions.
pub struct LoginService {
    db: DbPool,
    mailer: Arc<dyn Mailer>,
    secret: String,
    code_ttl: Duration,
    session_ttl: Duration,
    site_name: String,
}

impl LoginService {
    pub fn new(db: DbPool, mailer: Arc<dyn Mailer>, config: &Config) -> Self {
        Self {
            db,
            mailer,
            secret: config.auth.session_secret.clone(),
            code_ttl: Duration::seconds(config.auth.code_ttl_secs as i64),
            session_ttl: Duration::days(config.auth.session_ttl_days as i64),
            site_name: config.seo.title.clone(),
        }
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    /// Issue a new code for a registered email and mail it.
    ///
    /// Any earlier code for the same user stops working.
    pub async fn request_code(&self, email: &str) -> Result<()> {
        let email = validate_email(email)?;
        let code = generate_code();

        let user = {
            let conn = get_conn(&self.db)?;
            let user = users::get_user_by_email(&conn, email)?
                .ok_or_else(|| Error::not_found("user", email))?;
            let hash = hmac_hex(&self.secret, code.as_bytes())?;
            login_codes::create_code(&conn, user.id, &hash, self.code_ttl)?;
            user
        };

        let minutes = (self.code_ttl.num_seconds() + 59) / 60;
        let message = MailMessage::new(
            user.email.clone(),
            format!("Your {} login code", self.site_name),
            format!(
                "Hello {},\n\nYour verification code is {code}.\nIt expires in {minutes} minutes.\n",
                user.username
            ),
        );

        self.mailer.send(&message).await.map_err(|e| {
            tracing::error!(to = %user.email, "Failed to send login code: {}", e);
            Error::Upstream("Failed to send verification code".to_string())
        })?;

        tracing::info!(user_id = %user.id, "Login code issued");
        Ok(())
    }

    /// Check a code and open a session.
    ///
    /// Unknown emails, wrong codes and expired codes all fail with the same
    /// `Unauthorized` error.
    pub fn verify_code(&self, email: &str, code: &str) -> Result<(User, Session)> {
        let email = validate_email(email)?;
        let code = code.trim();
        if code.is_empty() {
            return Err(Error::validation("A verification code is required"));
        }

        let conn = get_conn(&self.db)?;
        let now = Utc::now();
        let purged = login_codes::purge_expired(&conn, now)?;
        if purged > 0 {
            tracing::debug!("Purged {} expired login codes", purged);
        }

        let Some(user) = users::get_user_by_email(&conn, email)? else {
            return Err(Error::Unauthorized(INVALID_CODE.to_string()));
        };

        let well_formed = code.len() == CODE_LENGTH && code.bytes().all(|b| b.is_ascii_digit());
        let active = login_codes::active_codes_for_user(&conn, user.id, now)?;
        let matched = if well_formed {
            active
                .iter()
                .find(|c| verify_hmac_hex(&self.secret, code.as_bytes(), &c.code_hash))
        } else {
            None
        };

        let Some(matched) = matched else {
            if !active.is_empty() {
                let revoked =
                    login_codes::record_failed_attempt(&conn, user.id, MAX_CODE_ATTEMPTS)?;
                if revoked > 0 {
                    tracing::warn!(
                        user_id = %user.id,
                        "Login code revoked after {} failed attempts",
                        MAX_CODE_ATTEMPTS
                    );
                }
            }
            tracing::debug!(user_id = %user.id, "Rejected login code");
            return Err(Error::Unauthorized(INVALID_CODE.to_string()));
        };

        let Some(session) = login_codes::redeem_code(&conn, matched, self.session_ttl)? else {
            tracing::debug!(user_id = %user.id, "Login code already redeemed");
            return Err(Error::Unauthorized(INVALID_CODE.to_string()));
        };

        tracing::info!(user_id = %user.id, "User logged in");
        Ok((
            User {
                is_verified: true,
                ..user
            },
            session,
        ))
    }

    /// Resolve a live session to its user.
    pub fn session_user(&self, id: SessionId) -> Result<Option<(Session, User)>> {
        let conn = get_conn(&self.db)?;
        let Some(session) = sessions::get_active_session(&conn, id, Utc::now())? else {
            return Ok(None);
        };
        Ok(users::get_user(&conn, session.user_id)?.map(|user| (session, user)))
    }

    /// End a session. Ending an unknown session is not an error.
    pub fn logout(&self, id: SessionId) -> Result<()> {
        let conn = get_conn(&self.db)?;
        if sessions::delete_session(&conn, id)? {
            tracing::info!(session_id = %id, "Session ended");
        }
        Ok(())
    }

    /// Drop expired codes and sessions.
    pub fn purge_expired(&self) -> Result<(usize, usize)> {
        let conn = get_conn(&self.db)?;
        let now = Utc::now();
        let codes = login_codes::purge_expired(&conn, now)?;
        let sessions = sessions::purge_expired(&conn, now)?;
        Ok((codes, sessions))
    }
}
