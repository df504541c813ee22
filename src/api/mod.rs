pub mod auth;
pub mod error;
mod products;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub use error::ApiError;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Sign-in plumbing (public)
    let auth_routes = Router::new()
        .route("/callback/credentials", post(auth::callback_credentials))
        .route("/token", post(auth::issue_token))
        .route("/session", get(auth::session))
        .route("/signout", post(auth::sign_out));

    // Catalog pass-through
    let product_routes = Router::new()
        .route("/products", get(products::list_products))
        .route("/products/:id", get(products::get_product));

    let static_files = ServeDir::new(&state.config.server.static_dir);

    Router::new()
        .route("/health", get(health_check))
        .merge(crate::ui::create_router())
        .nest("/api/auth", auth_routes)
        .nest("/api", product_routes)
        .nest_service("/static", static_files)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        response::Response,
    };
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::catalog::testing::{product, StaticCatalog};
    use crate::catalog::CatalogProvider;
    use crate::config::Config;

    async fn app_with(catalog: StaticCatalog) -> (Router, crate::DbPool) {
        let mut config = Config::default();
        config.catalog.secret_key = "sk_test_123".to_string();
        config.auth.session_secret = "router-test-secret-router-test-secret".to_string();

        let db = crate::db::test_pool().await;
        let catalog: Arc<dyn CatalogProvider> = Arc::new(catalog);
        let state = Arc::new(AppState::new(config, db.clone(), catalog));
        (create_router(state), db)
    }

    async fn app() -> (Router, crate::DbPool) {
        app_with(StaticCatalog::new(vec![
            product("prod_b", "Beanie", Some(2500)),
            product("prod_a", "Apron", Some(1800)),
            product("prod_c", "Cap", None),
        ]))
        .await
    }

    async fn send(app: &Router, request: Request<Body>) -> Response {
        app.clone().oneshot(request).await.unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn get_with_cookie(uri: &str, cookie: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap()
    }

    fn sign_in_request(username: &str, password: &str, callback: &str) -> Request<Body> {
        sign_in_form(format!(
            "username={}&password={}&callbackUrl={}",
            username.replace('@', "%40"),
            password,
            callback.replace('/', "%2F")
        ))
    }

    fn sign_in_form(body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/auth/callback/credentials")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap()
    }

    fn token_request(body: &'static str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/auth/token")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn body_json(response: Response) -> Value {
        serde_json::from_str(&body_string(response).await).unwrap()
    }

    fn location(response: &Response) -> &str {
        response.headers()[header::LOCATION].to_str().unwrap()
    }

    /// `name=value` part of the session Set-Cookie header, if any
    fn session_cookie_pair(response: &Response) -> Option<String> {
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with("storefront.session-token="))
            .and_then(|v| v.split(';').next())
            .map(str::to_string)
    }

    async fn seed_user(db: &crate::DbPool, email: &str, password: &str, role: &str) -> String {
        crate::cli::create_user(db, email, "Jane Smith", role, password)
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _db) = app().await;
        let response = send(&app, get("/health")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "OK");
    }

    #[tokio::test]
    async fn test_home_renders_cards_in_catalog_order() {
        let (app, _db) = app().await;
        let response = send(&app, get("/")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let html = body_string(response).await;
        assert_eq!(html.matches("class=\"product-card\"").count(), 3);
        let beanie = html.find("Beanie").unwrap();
        let apron = html.find("Apron").unwrap();
        let cap = html.find("Cap").unwrap();
        assert!(beanie < apron && apron < cap);
        assert!(html.contains("25.00 USD"));
    }

    #[tokio::test]
    async fn test_home_catalog_failure_is_bad_gateway() {
        let (app, _db) = app_with(StaticCatalog::failing()).await;
        let response = send(&app, get("/")).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(body_string(response).await.contains("Catalog unavailable"));
    }

    #[tokio::test]
    async fn test_product_page() {
        let (app, _db) = app().await;

        let response = send(&app, get("/products/prod_a")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response).await.contains("Apron"));

        let response = send(&app, get("/products/prod_missing")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_api_products() {
        let (app, _db) = app().await;

        let response = send(&app, get("/api/products")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let ids: Vec<&str> = json
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["prod_b", "prod_a", "prod_c"]);
        assert_eq!(json[0]["default_price"]["unit_amount"], 2500);
        assert_eq!(json[0]["object"], "product");

        let response = send(&app, get("/api/products/prod_a")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["id"], "prod_a");
    }

    #[tokio::test]
    async fn test_api_product_not_found() {
        let (app, _db) = app().await;
        let response = send(&app, get("/api/products/prod_missing")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"]["code"], "not_found");
    }

    #[tokio::test]
    async fn test_account_redirects_to_sign_in_without_session() {
        let (app, _db) = app().await;
        let response = send(&app, get("/account")).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/auth/signin?callbackUrl=%2Faccount");

        let forged = get_with_cookie("/account", "storefront.session-token=forged");
        let response = send(&app, forged).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn test_sign_in_page() {
        let (app, _db) = app().await;

        let response = send(&app, get("/auth/signin?callbackUrl=%2Faccount")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_string(response).await;
        assert!(html.contains("name=\"password\""));
        assert!(!html.contains("Sign in failed"));

        let response = send(&app, get("/auth/signin?error=CredentialsSignin")).await;
        assert!(body_string(response).await.contains("Sign in failed"));
    }

    #[tokio::test]
    async fn test_sign_in_flow_establishes_session() {
        let (app, db) = app().await;
        let user_id = seed_user(&db, "jsmith@example.com", "s3cret", "admin").await;

        let request = sign_in_request("jsmith@example.com", "s3cret", "/account");
        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/account");
        let cookie = session_cookie_pair(&response).expect("session cookie");

        let response = send(&app, get_with_cookie("/account", &cookie)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_string(response).await;
        assert!(html.contains("jsmith@example.com"));
        assert!(html.contains("admin"));

        let response = send(&app, get_with_cookie("/api/auth/session", &cookie)).await;
        let session = body_json(response).await;
        assert_eq!(session["user"]["id"], user_id.as_str());
        assert_eq!(session["user"]["role"], "admin");
        assert_eq!(session["user"]["email"], "jsmith@example.com");
        assert!(session["expires"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_failed_sign_in_creates_no_session() {
        let (app, db) = app().await;
        seed_user(&db, "jsmith@example.com", "s3cret", "admin").await;

        let attempts = [
            ("jsmith@example.com", "wrong"),
            ("nobody@example.com", "s3cret"),
        ];
        for (username, password) in attempts {
            let response = send(&app, sign_in_request(username, password, "/account")).await;
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
            assert_eq!(
                location(&response),
                "/auth/signin?callbackUrl=%2Faccount&error=CredentialsSignin"
            );
            assert!(session_cookie_pair(&response).is_none());
        }
    }

    #[tokio::test]
    async fn test_failed_sign_in_retry_reaches_callback() {
        let (app, db) = app().await;
        seed_user(&db, "jsmith@example.com", "s3cret", "user").await;

        let request = sign_in_request("jsmith@example.com", "wrong", "/account");
        let response = send(&app, request).await;
        let retry_page = send(&app, get(location(&response))).await;
        let html = body_string(retry_page).await;
        assert!(html.contains("Sign in failed"));
        assert!(html.contains("account\">"));

        let request = sign_in_request("jsmith@example.com", "s3cret", "/account");
        let response = send(&app, request).await;
        assert_eq!(location(&response), "/account");
    }

    #[tokio::test]
    async fn test_sign_in_with_control_char_callback_redirects_home() {
        let (app, db) = app().await;
        seed_user(&db, "jsmith@example.com", "s3cret", "user").await;

        for callback in ["%2Fa%0Ab", "%2Fa%7Fb", "%2F%09%2Fevil.example"] {
            let body = format!(
                "username=jsmith%40example.com&password=s3cret&callbackUrl={}",
                callback
            );
            let response = send(&app, sign_in_form(body)).await;
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
            assert_eq!(location(&response), "/");
            assert!(session_cookie_pair(&response).is_some());
        }
    }

    #[tokio::test]
    async fn test_sign_in_ignores_offsite_callback() {
        let (app, db) = app().await;
        seed_user(&db, "jsmith@example.com", "s3cret", "user").await;

        let response = send(
            &app,
            sign_in_request("jsmith@example.com", "s3cret", "//evil.example"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");
    }

    #[tokio::test]
    async fn test_session_endpoint_empty_when_signed_out() {
        let (app, _db) = app().await;
        let response = send(&app, get("/api/auth/session")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, serde_json::json!({}));
    }

    #[tokio::test]
    async fn test_token_endpoint_and_bearer_session() {
        let (app, db) = app().await;
        seed_user(&db, "jsmith@example.com", "s3cret", "user").await;

        let request = token_request(r#"{"username":"jsmith@example.com","password":"s3cret"}"#);
        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let token = json["token"].as_str().unwrap().to_string();
        assert_eq!(json["session"]["user"]["role"], "user");

        let request = Request::builder()
            .uri("/api/auth/session")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        let session = body_json(send(&app, request).await).await;
        assert_eq!(session["user"]["email"], "jsmith@example.com");
    }

    #[tokio::test]
    async fn test_token_endpoint_rejects_bad_credentials() {
        let (app, _db) = app().await;
        let request = token_request(r#"{"username":"nobody@example.com","password":"x"}"#);
        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"]["code"], "unauthorized");
    }

    #[tokio::test]
    async fn test_token_endpoint_rejects_malformed_body() {
        let (app, _db) = app().await;

        for body in [r#"{"username":"jsmith@example.com""#, r#"{"password":"x"}"#] {
            let response = send(&app, token_request(body)).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            let json = body_json(response).await;
            assert_eq!(json["error"]["code"], "bad_request");
            assert!(!json["error"]["message"].as_str().unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_sign_out_clears_cookie() {
        let (app, db) = app().await;
        seed_user(&db, "jsmith@example.com", "s3cret", "user").await;
        let response = send(&app, sign_in_request("jsmith@example.com", "s3cret", "/")).await;
        let cookie = session_cookie_pair(&response).unwrap();

        let request = Request::builder()
            .method("POST")
            .uri("/api/auth/signout")
            .header(header::COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");

        let removal = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with("storefront.session-token="))
            .unwrap()
            .to_string();
        assert!(removal.contains("Max-Age=0"));
    }
}
