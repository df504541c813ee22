//! Session view rebuilt from the token on every request, plus the cookie
//! and extractor plumbing around it.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use super::{SessionClaims, SIGN_IN_PATH};
use crate::config::AuthConfig;
use crate::AppState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
}

/// The authenticated session as exposed to pages and the session endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub user: SessionUser,
    /// RFC 3339 expiry of the underlying token
    pub expires: String,
}

impl From<SessionClaims> for Session {
    fn from(claims: SessionClaims) -> Self {
        let expires = DateTime::<Utc>::from_timestamp(claims.exp, 0)
            .map(|t| t.to_rfc3339())
            .unwrap_or_default();

        Self {
            user: SessionUser {
                id: claims.sub,
                name: claims.name,
                email: claims.email,
                role: claims.role,
            },
            expires,
        }
    }
}

/// Build the cookie that carries a freshly issued token.
pub fn session_cookie(config: &AuthConfig, token: String) -> Cookie<'static> {
    Cookie::build((config.cookie_name.clone(), token))
        .path("/")
        .http_only(true)
        .secure(config.secure_cookie)
        .same_site(SameSite::Lax)
        .build()
}

/// Cookie used to discard the session client-side.
pub fn removal_cookie(config: &AuthConfig) -> Cookie<'static> {
    Cookie::build((config.cookie_name.clone(), "")).path("/").build()
}

/// Extract the token from an `Authorization: Bearer` header, falling back to
/// the session cookie.
pub fn extract_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    if let Some(auth_header) = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    {
        if let Some(token) = auth_header.strip_prefix("Bearer ") {
            let token = token.trim();
            if !token.is_empty() {
                return Some(token.to_string());
            }
        }
    }

    CookieJar::from_headers(headers)
        .get(cookie_name)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

/// Only same-origin absolute paths are accepted as post-sign-in targets.
///
/// Anything outside printable ASCII is refused: browsers drop tabs and
/// newlines while parsing a `Location`, and control characters are not
/// valid in a header value at all.
pub fn safe_callback(callback: Option<&str>) -> String {
    match callback {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && path.chars().all(|c| c.is_ascii_graphic()) =>
        {
            path.to_string()
        }
        _ => "/".to_string(),
    }
}

/// Sign-in URL that returns the visitor to `callback` afterwards.
pub fn sign_in_url(sign_in_path: &str, callback: &str) -> String {
    match reqwest::Url::parse("http://storefront.invalid") {
        Ok(mut url) => {
            url.set_path(sign_in_path);
            url.query_pairs_mut().append_pair("callbackUrl", callback);
            format!("{}?{}", url.path(), url.query().unwrap_or_default())
        }
        Err(_) => sign_in_path.to_string(),
    }
}

/// Rejection for pages that need a session: send the visitor to sign in.
#[derive(Debug)]
pub struct SignInRedirect(String);

impl IntoResponse for SignInRedirect {
    fn into_response(self) -> Response {
        Redirect::to(&self.0).into_response()
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Session {
    type Rejection = SignInRedirect;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth = &state.config.auth;
        let callback = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let reject = || SignInRedirect(sign_in_url(SIGN_IN_PATH, callback));

        let token = extract_token(&parts.headers, &auth.cookie_name).ok_or_else(reject)?;
        match state.sessions.verify(&token) {
            Ok(claims) => Ok(Session::from(claims)),
            Err(e) => {
                tracing::debug!(error = %e, "Rejected session token");
                Err(reject())
            }
        }
    }
}
