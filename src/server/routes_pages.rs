//! HTML entry pages, session status and page metadata.

use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use synedrius_common::Error;

use super::auth::current_session;
use super::error::AppError;
use super::AppContext;
use crate::config::Config;

pub fn page_routes() -> Router<AppContext> {
    Router::new()
        .route("/", get(index))
        .route("/login", get(login_page))
        .route("/api/session", get(session_status))
        .route("/api/meta", get(page_meta))
}

async fn index(State(ctx): State<AppContext>, jar: CookieJar) -> Result<Response, AppError> {
    if current_session(&ctx, &jar)?.is_none() {
        return Ok(Redirect::to("/login").into_response());
    }
    Ok(serve_page(&ctx, "index.html").await?.into_response())
}

async fn login_page(State(ctx): State<AppContext>, jar: CookieJar) -> Result<Response, AppError> {
    if current_session(&ctx, &jar)?.is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    Ok(serve_page(&ctx, "login.html").await?.into_response())
}

async fn serve_page(ctx: &AppContext, name: &str) -> Result<Html<String>, Error> {
    let path = ctx.config.server.public_dir.join(name);
    match tokio::fs::read_to_string(&path).await {
        Ok(html) => Ok(Html(html)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::not_found("page", name)),
        Err(e) => Err(Error::Io(e)),
    }
}

#[derive(Debug, Serialize)]
pub struct SessionUser {
    pub id: String,
    pub email: String,
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct SessionStatus {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<SessionUser>,
}

async fn session_status(
    State(ctx): State<AppContext>,
    jar: CookieJar,
) -> Result<Json<SessionStatus>, AppError> {
    let session = current_session(&ctx, &jar)?;
    Ok(Json(SessionStatus {
        authenticated: session.is_some(),
        user: session.map(|s| SessionUser {
            id: s.user.id.to_string(),
            email: s.user.email,
            username: s.user.username,
        }),
    }))
}

#[derive(Debug, Deserialize)]
pub struct MetaQuery {
    pub page: Option<String>,
}

/// Metadata for `<head>` tags, filled by the page scripts.
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub title: String,
    pub site_name: String,
    pub description: String,
    pub author: String,
    pub keywords: String,
    pub robots: String,
    pub url: Option<String>,
    pub image: Option<String>,
    pub og_type: String,
    pub og_locale: String,
}

impl PageMeta {
    pub fn for_page(config: &Config, page: Option<&str>) -> Self {
        let seo = &config.seo;
        let url = config.server.public_url.clone();
        let title = page
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(String::from)
            .unwrap_or_else(|| seo.title.clone());

        Self {
            title,
            site_name: seo.title.clone(),
            description: seo.description.clone(),
            author: seo.author.clone(),
            keywords: seo.keywords.clone(),
            robots: seo.robots.clone(),
            image: url.as_ref().map(|u| format!("{u}/assets/images/favicon.ico")),
            url,
            og_type: seo.og_type.clone(),
            og_locale: seo.og_locale.clone(),
        }
    }
}

async fn page_meta(State(ctx): State<AppContext>, Query(query): Query<MetaQuery>) -> Json<PageMeta> {
    Json(PageMeta::for_page(&ctx.config, query.page.as_deref()))
}
