//! Stripe REST client for the product catalog.
//!
//! One request per call: no retries, no caching, first page only.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use super::{is_valid_id, CatalogError, CatalogProvider, Product};
use crate::config::CatalogConfig;

/// Stripe catalog client authenticated with a server-held secret key.
pub struct StripeClient {
    base_url: String,
    secret_key: String,
    api_version: String,
    client: reqwest::Client,
}

/// Envelope for list endpoints.
#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    data: Vec<T>,
    #[serde(default)]
    has_more: bool,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorObject,
}

#[derive(Debug, Deserialize)]
struct ErrorObject {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl StripeClient {
    pub fn new(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("storefront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            base_url: config.api_base.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
            api_version: config.api_version.clone(),
            client,
        })
    }

    /// Make an authenticated GET request to the Stripe API.
    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, CatalogError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(url = %url, "Catalog request");

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.secret_key)
            .header("Stripe-Version", &self.api_version)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(api_error(status.as_u16(), &body));
        }

        serde_json::from_slice(&body).map_err(|e| CatalogError::Decode(e.to_string()))
    }
}

/// Build an error from Stripe's `{"error": {...}}` envelope, falling back to
/// the raw body when it is not one.
fn api_error(status: u16, body: &[u8]) -> CatalogError {
    match serde_json::from_slice::<ErrorEnvelope>(body) {
        Ok(envelope) => CatalogError::Api {
            status,
            kind: envelope.error.kind,
            code: envelope.error.code,
            message: envelope
                .error
                .message
                .unwrap_or_else(|| "no message".to_string()),
        },
        Err(_) => CatalogError::Api {
            status,
            kind: "unknown".to_string(),
            code: None,
            message: String::from_utf8_lossy(body).into_owned(),
        },
    }
}

#[async_trait]
impl CatalogProvider for StripeClient {
    async fn list_products(&self) -> Result<Vec<Product>, CatalogError> {
        let list: ListResponse<Product> = self
            .get("/v1/products", &[("expand[]", "data.default_price")])
            .await?;

        if list.has_more {
            tracing::debug!(
                returned = list.data.len(),
                "Catalog has more products than the first page"
            );
        }

        Ok(list.data)
    }

    async fn get_product(&self, id: &str) -> Result<Product, CatalogError> {
        if !is_valid_id(id) {
            return Err(CatalogError::NotFound(id.to_string()));
        }

        let path = format!("/v1/products/{}", id);
        match self.get(&path, &[("expand[]", "default_price")]).await {
            Err(CatalogError::Api { status: 404, .. }) => {
                Err(CatalogError::NotFound(id.to_string()))
            }
            other => other,
        }
    }
}
