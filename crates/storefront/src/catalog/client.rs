//! HTTP client for the catalog service.
//!
//! Uses `reqwest` for HTTP and caches records with `moka`.

use std::sync::Arc;

use moka::future::Cache;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use easykart_core::ProductId;

use super::cache::{CacheKey, CacheValue};
use super::types::{ProductListResponse, ProductRecord};
use super::{CatalogError, CatalogLookup};
use crate::config::StorefrontConfig;

/// Client for the catalog service.
///
/// Cheaply cloneable; clones share the HTTP connection pool and cache.
#[derive(Clone)]
pub struct CatalogClient {
    inner: Arc<CatalogClientInner>,
}

struct CatalogClientInner {
    client: reqwest::Client,
    base_url: Url,
    cache: Cache<CacheKey, CacheValue>,
}

impl CatalogClient {
    /// Create a new catalog client.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Http` if the HTTP client cannot be built.
    pub fn new(config: &StorefrontConfig) -> Result<Self, CatalogError> {
        let cache = Cache::builder()
            .max_capacity(config.catalog_cache.max_capacity)
            .time_to_live(config.catalog_cache.time_to_live)
            .build();

        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(CatalogClientInner {
                client,
                base_url: config.api_url.clone(),
                cache,
            }),
        })
    }

    /// Build a URL from path segments, percent-encoding each one.
    fn url(&self, segments: &[&str]) -> Result<Url, CatalogError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| CatalogError::Url(self.inner.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Issue a GET and decode the JSON body.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        not_found: impl FnOnce() -> CatalogError,
    ) -> Result<T, CatalogError> {
        let response = self.inner.client.get(url).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(CatalogError::RateLimited(retry_after));
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(not_found());
        }

        // Read as text first for better error diagnostics
        let body = response.text().await?;

        if !status.is_success() {
            tracing::warn!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "Catalog service returned non-success status"
            );
            return Err(CatalogError::Api {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse catalog response"
            );
            CatalogError::Parse(e)
        })
    }
}

impl CatalogLookup for CatalogClient {
    #[instrument(skip(self), fields(product_id = %id))]
    async fn fetch_product(&self, id: &ProductId) -> Result<ProductRecord, CatalogError> {
        let cache_key = CacheKey::Product(id.clone());

        if let Some(CacheValue::Product(record)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*record);
        }

        let url = self.url(&["product", id.as_str()])?;
        let record: ProductRecord = self
            .get_json(url, || CatalogError::NotFound(id.clone()))
            .await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(record.clone())))
            .await;

        Ok(record)
    }

    #[instrument(skip(self))]
    async fn list_products(&self) -> Result<Vec<ProductRecord>, CatalogError> {
        if let Some(CacheValue::Products(records)) = self.inner.cache.get(&CacheKey::Products).await
        {
            debug!("Cache hit for product list");
            return Ok(records);
        }

        let url = self.url(&["products"])?;
        let response: ProductListResponse = self
            .get_json(url, || CatalogError::Api {
                status: 404,
                message: "product list not found".to_string(),
            })
            .await?;
        let records = response.into_records();

        self.inner
            .cache
            .insert(CacheKey::Products, CacheValue::Products(records.clone()))
            .await;

        Ok(records)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::extract::{Path, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::{Json, Router};
    use rust_decimal::Decimal;

    use super::*;

    /// Serve a fake catalog on an ephemeral port and return its base URL.
    async fn spawn_catalog(hits: Arc<AtomicUsize>) -> Url {
        async fn product(
            State(hits): State<Arc<AtomicUsize>>,
            Path(id): Path<String>,
        ) -> axum::response::Response {
            hits.fetch_add(1, Ordering::SeqCst);
            match id.as_str() {
                "1" => Json(serde_json::json!({
                    "id": 1, "title": "Mug", "price": 10, "thumbnail": "mug.jpg"
                }))
                .into_response(),
                "busy" => {
                    let mut headers = HeaderMap::new();
                    headers.insert("Retry-After", "42".parse().unwrap());
                    (StatusCode::TOO_MANY_REQUESTS, headers).into_response()
                }
                "broken" => (StatusCode::INTERNAL_SERVER_ERROR, "db down").into_response(),
                "garbled" => "not json".into_response(),
                _ => StatusCode::NOT_FOUND.into_response(),
            }
        }

        async fn products() -> Json<serde_json::Value> {
            Json(serde_json::json!({
                "data": [
                    {"id": 1, "title": "Mug", "price": 10},
                    {"id": 2, "title": "Bag", "price": 5}
                ]
            }))
        }

        let app = Router::new()
            .route("/product/{id}", get(product))
            .route("/products", get(products))
            .with_state(hits);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Url::parse(&format!("http://{addr}/")).unwrap()
    }

    async fn client() -> (CatalogClient, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let url = spawn_catalog(Arc::clone(&hits)).await;
        let config = StorefrontConfig::with_endpoints(url, std::env::temp_dir());
        (CatalogClient::new(&config).unwrap(), hits)
    }

    #[tokio::test]
    async fn test_fetch_product_and_cache() {
        let (client, hits) = client().await;

        let record = client.fetch_product(&ProductId::from("1")).await.unwrap();
        assert_eq!(record.name, "Mug");
        assert_eq!(record.price, Decimal::from(10));
        assert_eq!(record.image.as_deref(), Some("mug.jpg"));

        let again = client.fetch_product(&ProductId::from("1")).await.unwrap();
        assert_eq!(again, record);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fetch_product_errors() {
        let (client, _) = client().await;

        let err = client.fetch_product(&ProductId::from("404")).await.unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(id) if id.as_str() == "404"));

        let err = client.fetch_product(&ProductId::from("busy")).await.unwrap_err();
        assert!(matches!(err, CatalogError::RateLimited(42)));

        let err = client.fetch_product(&ProductId::from("broken")).await.unwrap_err();
        assert!(matches!(err, CatalogError::Api { status: 500, .. }));

        let err = client.fetch_product(&ProductId::from("garbled")).await.unwrap_err();
        assert!(matches!(err, CatalogError::Parse(_)));
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let (client, hits) = client().await;
        let _ = client.fetch_product(&ProductId::from("broken")).await;
        let _ = client.fetch_product(&ProductId::from("broken")).await;
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_list_products() {
        let (client, _) = client().await;
        let records = client.list_products().await.unwrap();
        let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Mug", "Bag"]);
    }

    #[test]
    fn test_url_encodes_segments() {
        let config = StorefrontConfig::with_endpoints(
            Url::parse("https://shop.example.com/api/").unwrap(),
            std::env::temp_dir(),
        );
        let client = CatalogClient::new(&config).unwrap();
        let url = client.url(&["product", "a/b"]).unwrap();
        assert_eq!(url.as_str(), "https://shop.example.com/api/product/a%2Fb");
    }
}
