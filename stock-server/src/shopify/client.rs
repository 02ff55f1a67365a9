//! ShopifyClient — reqwest wrapper over the admin REST API

use async_trait::async_trait;
use reqwest::{Client, Method, Response, StatusCode};
use serde::Deserialize;
use shared::remote::{ProductPage, ProductPatch, RemoteInventoryLevel, RemoteProduct, RemoteWebhook};
use std::time::Duration;

use super::{CatalogApi, ShopifyError};

/// Stable admin API version this client targets.
pub const API_VERSION: &str = "2024-01";

/// Page size for cursor pagination (remote maximum).
const PAGE_LIMIT: u32 = 250;

/// Bounded in-call retries when the remote answers 429.
const MAX_RATE_LIMIT_RETRIES: u32 = 5;

/// Fallback wait when a 429 carries no Retry-After hint.
const DEFAULT_RETRY_AFTER_SECS: u64 = 10;

// Response envelopes: the API wraps every payload in a named object.

#[derive(Deserialize)]
struct ProductsEnvelope {
    products: Vec<RemoteProduct>,
}

#[derive(Deserialize)]
struct ProductEnvelope {
    product: RemoteProduct,
}

#[derive(Deserialize)]
struct LevelsEnvelope {
    inventory_levels: Vec<RemoteInventoryLevel>,
}

#[derive(Deserialize)]
struct WebhooksEnvelope {
    webhooks: Vec<RemoteWebhook>,
}

#[derive(Deserialize)]
struct WebhookEnvelope {
    webhook: RemoteWebhook,
}

/// HTTP client for one store's admin API.
pub struct ShopifyClient {
    client: Client,
    base_url: String,
    access_token: String,
    shop_domain: String,
}

impl ShopifyClient {
    pub fn new(shop_domain: &str, access_token: &str) -> Result<Self, ShopifyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ShopifyError::Network(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: format!("https://{shop_domain}/admin/api/{API_VERSION}"),
            access_token: access_token.to_string(),
            shop_domain: shop_domain.to_string(),
        })
    }

    /// Issue one request, absorbing rate limits with the server's wait hint
    /// (bounded attempts) and mapping error statuses to the taxonomy.
    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&serde_json::Value>,
    ) -> Result<Response, ShopifyError> {
        let url = format!("{}{path}", self.base_url);
        let mut attempt = 0u32;

        loop {
            let mut request = self
                .client
                .request(method.clone(), &url)
                .header("X-Shopify-Access-Token", &self.access_token)
                .header("Accept", "application/json");
            if !query.is_empty() {
                request = request.query(query);
            }
            if let Some(json) = body {
                request = request.json(json);
            }

            let response = request
                .send()
                .await
                .map_err(|e| ShopifyError::Network(e.to_string()))?;

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS {
                let retry_after = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse::<f64>().ok())
                    .filter(|secs| *secs >= 0.0)
                    .map(Duration::from_secs_f64)
                    .unwrap_or(Duration::from_secs(DEFAULT_RETRY_AFTER_SECS));

                attempt += 1;
                if attempt > MAX_RATE_LIMIT_RETRIES {
                    return Err(ShopifyError::RateLimited { retry_after });
                }
                tracing::warn!(
                    shop = %self.shop_domain,
                    attempt,
                    wait_secs = retry_after.as_secs_f64(),
                    "Rate limited by remote API, backing off"
                );
                tokio::time::sleep(retry_after).await;
                continue;
            }

            if status.is_success() {
                return Ok(response);
            }

            let code = status.as_u16();
            return Err(match code {
                401 | 403 => ShopifyError::AuthRevoked { status: code },
                500..=599 => ShopifyError::Server { status: code },
                _ => {
                    let message = response.text().await.unwrap_or_default();
                    ShopifyError::Api {
                        status: code,
                        message,
                    }
                }
            });
        }
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        response: Response,
    ) -> Result<T, ShopifyError> {
        response
            .json::<T>()
            .await
            .map_err(|e| ShopifyError::Decode(e.to_string()))
    }
}

/// Extract the `page_info` cursor of the `rel="next"` link from a `Link`
/// response header.
///
/// Header shape:
/// `<https://shop/admin/api/2024-01/products.json?page_info=abc&limit=250>; rel="next"`
pub fn parse_link_next(header: &str) -> Option<String> {
    for part in header.split(',') {
        let part = part.trim();
        if !part.contains("rel=\"next\"") {
            continue;
        }
        let url = part.strip_prefix('<')?.split('>').next()?;
        for pair in url.split('?').nth(1)?.split('&') {
            if let Some(value) = pair.strip_prefix("page_info=") {
                return Some(value.to_string());
            }
        }
    }
    None
}

#[async_trait]
impl CatalogApi for ShopifyClient {
    async fn fetch_products(&self, cursor: Option<&str>) -> Result<ProductPage, ShopifyError> {
        let mut query: Vec<(&str, String)> = vec![("limit", PAGE_LIMIT.to_string())];
        if let Some(cursor) = cursor {
            query.push(("page_info", cursor.to_string()));
        }

        let response = self
            .send(Method::GET, "/products.json", &query, None)
            .await?;

        let next_cursor = response
            .headers()
            .get("Link")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_link_next);

        let envelope: ProductsEnvelope = Self::decode(response).await?;
        Ok(ProductPage {
            products: envelope.products,
            next_cursor,
        })
    }

    async fn fetch_product(&self, remote_id: i64) -> Result<Option<RemoteProduct>, ShopifyError> {
        let path = format!("/products/{remote_id}.json");
        match self.send(Method::GET, &path, &[], None).await {
            Ok(response) => {
                let envelope: ProductEnvelope = Self::decode(response).await?;
                Ok(Some(envelope.product))
            }
            Err(ShopifyError::Api { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn fetch_inventory_levels(
        &self,
        inventory_item_ids: &[i64],
    ) -> Result<Vec<RemoteInventoryLevel>, ShopifyError> {
        if inventory_item_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids = inventory_item_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let query = [
            ("inventory_item_ids", ids),
            ("limit", PAGE_LIMIT.to_string()),
        ];

        let response = self
            .send(Method::GET, "/inventory_levels.json", &query, None)
            .await?;
        let envelope: LevelsEnvelope = Self::decode(response).await?;
        Ok(envelope.inventory_levels)
    }

    async fn update_product(
        &self,
        remote_id: i64,
        patch: &ProductPatch,
    ) -> Result<(), ShopifyError> {
        let path = format!("/products/{remote_id}.json");
        let body = serde_json::json!({
            "product": {
                "id": remote_id,
                "status": patch.status,
            }
        });
        self.send(Method::PUT, &path, &[], Some(&body)).await?;
        Ok(())
    }

    async fn get_webhooks(&self) -> Result<Vec<RemoteWebhook>, ShopifyError> {
        let response = self.send(Method::GET, "/webhooks.json", &[], None).await?;
        let envelope: WebhooksEnvelope = Self::decode(response).await?;
        Ok(envelope.webhooks)
    }

    async fn create_webhook(
        &self,
        topic: &str,
        address: &str,
    ) -> Result<RemoteWebhook, ShopifyError> {
        let body = serde_json::json!({
            "webhook": {
                "topic": topic,
                "address": address,
                "format": "json",
            }
        });
        let response = self
            .send(Method::POST, "/webhooks.json", &[], Some(&body))
            .await?;
        let envelope: WebhookEnvelope = Self::decode(response).await?;
        Ok(envelope.webhook)
    }
}
