use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use super::error::ApiError;
use crate::auth::{
    authorize, removal_cookie, safe_callback, session_cookie, sign_in_url, Credentials, Session,
    SIGN_IN_PATH,
};
use crate::AppState;

/// Sign-in form posted by the sign-in page
#[derive(Deserialize)]
pub struct SignInForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(rename = "callbackUrl")]
    pub callback_url: Option<String>,
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub session: Session,
}

/// Credentials sign-in callback.
///
/// On success the session cookie is set and the visitor is sent on to the
/// callback URL. On failure no session is created and the visitor goes back
/// to the sign-in page.
pub async fn callback_credentials(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<SignInForm>,
) -> Result<Response, ApiError> {
    let credentials = Credentials {
        username: form.username,
        password: form.password,
    };
    let callback = safe_callback(form.callback_url.as_deref());

    let user = match authorize(&state.db, &credentials).await? {
        Some(user) => user,
        None => {
            tracing::info!("Sign-in failed");
            // Keep the callback so a retry still lands on the requested page
            let target = format!(
                "{}&error=CredentialsSignin",
                sign_in_url(SIGN_IN_PATH, &callback)
            );
            return Ok(Redirect::to(&target).into_response());
        }
    };

    let token = state.sessions.issue(&user).map_err(|e| {
        tracing::error!(error = %e, "Failed to sign session token");
        ApiError::internal("Failed to create session")
    })?;

    tracing::info!(user_id = %user.id, role = %user.role, "User signed in");

    let jar = jar.add(session_cookie(&state.config.auth, token));
    Ok((jar, Redirect::to(&callback)).into_response())
}

/// Token sign-in for API clients; the token is sent back as a bearer token.
pub async fn issue_token(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Json(credentials) =
        payload.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;

    let user = authorize(&state.db, &credentials)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;

    let token = state.sessions.issue(&user).map_err(|e| {
        tracing::error!(error = %e, "Failed to sign session token");
        ApiError::internal("Failed to create session")
    })?;
    let claims = state.sessions.verify(&token).map_err(|e| {
        tracing::error!(error = %e, "Freshly issued token failed verification");
        ApiError::internal("Failed to create session")
    })?;

    Ok(Json(TokenResponse {
        token,
        session: Session::from(claims),
    }))
}

/// Current session, or `{}` when signed out
pub async fn session(session: Option<Session>) -> Json<Value> {
    match session {
        Some(session) => Json(serde_json::to_value(session).unwrap_or_else(|_| json!({}))),
        None => Json(json!({})),
    }
}

/// Discard the session cookie. Tokens are stateless, so nothing is revoked
/// server-side.
pub async fn sign_out(State(state): State<Arc<AppState>>, jar: CookieJar) -> impl IntoResponse {
    let jar = jar.remove(removal_cookie(&state.config.auth));
    (jar, Redirect::to("/"))
}
