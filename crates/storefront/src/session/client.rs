//! HTTP client for the identity service.

use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use tracing::instrument;
use url::Url;

use super::{IdentityError, IdentityLookup, SessionUser};
use crate::config::StorefrontConfig;

/// Client for `GET /me`.
#[derive(Clone)]
pub struct IdentityClient {
    inner: Arc<IdentityClientInner>,
}

struct IdentityClientInner {
    client: reqwest::Client,
    me_url: Url,
}

impl IdentityClient {
    /// Create a new identity client.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint URL is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: &StorefrontConfig) -> Result<Self, IdentityError> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(IdentityClientInner {
                client,
                me_url: config.endpoint("me")?,
            }),
        })
    }
}

impl IdentityLookup for IdentityClient {
    #[instrument(skip_all)]
    async fn current_user(&self, token: &SecretString) -> Result<SessionUser, IdentityError> {
        // The service expects the raw token, without a scheme prefix
        let mut auth = HeaderValue::from_str(token.expose_secret())
            .map_err(|_| IdentityError::InvalidToken)?;
        auth.set_sensitive(true);

        let response = self
            .inner
            .client
            .get(self.inner.me_url.clone())
            .header(AUTHORIZATION, auth)
            .send()
            .await?;
        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(IdentityError::Unauthorized);
        }

        let body = response.text().await?;
        if !status.is_success() {
            return Err(IdentityError::Api {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}
