// Storefront pages
// Askama templates rendered on the server

mod templates;

use askama::Template;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::auth::{safe_callback, Session, SIGN_IN_PATH};
use crate::catalog::CatalogError;
use crate::AppState;

pub use templates::*;

// Helper to render templates and handle errors
fn render_template<T: Template>(template: T) -> Response {
    render_with_status(StatusCode::OK, template)
}

fn render_with_status<T: Template>(status: StatusCode, template: T) -> Response {
    match template.render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Template error");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Template error: {}", e)).into_response()
        }
    }
}

pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        // Public routes
        .route("/", get(home))
        .route("/products/:id", get(product_detail))
        .route(SIGN_IN_PATH, get(sign_in_page))
        // Protected routes
        .route("/account", get(account))
}

/// Render a catalog failure as a page with the matching status.
fn catalog_error_page(session: Option<&Session>, err: CatalogError) -> Response {
    let (status, title, message) = match &err {
        CatalogError::NotFound(_) => (
            StatusCode::NOT_FOUND,
            "Product not found",
            "That product does not exist or is no longer available.",
        ),
        _ => {
            tracing::error!(error = %err, "Catalog fetch failed");
            (
                StatusCode::BAD_GATEWAY,
                "Catalog unavailable",
                "Products could not be loaded right now. Please try again shortly.",
            )
        }
    };

    render_with_status(
        status,
        ErrorTemplate {
            user: session.map(|s| s.user.clone()),
            title: title.to_string(),
            message: message.to_string(),
        },
    )
}

// Product grid
async fn home(State(state): State<Arc<AppState>>, session: Option<Session>) -> Response {
    match state.catalog.list_products().await {
        Ok(products) => render_template(IndexTemplate::new(session.as_ref(), &products)),
        Err(e) => catalog_error_page(session.as_ref(), e),
    }
}

async fn product_detail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    session: Option<Session>,
) -> Response {
    match state.catalog.get_product(&id).await {
        Ok(product) => render_template(ProductTemplate::new(session.as_ref(), &product)),
        Err(e) => catalog_error_page(session.as_ref(), e),
    }
}

#[derive(Deserialize)]
struct SignInQuery {
    #[serde(rename = "callbackUrl")]
    callback_url: Option<String>,
    error: Option<String>,
}

async fn sign_in_page(session: Option<Session>, Query(query): Query<SignInQuery>) -> Response {
    render_template(SignInTemplate {
        user: session.map(|s| s.user),
        action: "/api/auth/callback/credentials".to_string(),
        callback_url: safe_callback(query.callback_url.as_deref()),
        failed: query.error.is_some(),
    })
}

// Requires a session; the extractor redirects to sign-in otherwise
async fn account(session: Session) -> Response {
    render_template(AccountTemplate::new(session))
}
