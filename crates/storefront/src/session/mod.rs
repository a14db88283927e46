//! Session identity resolved at startup.
//!
//! The stored credential token is exchanged for the current user once,
//! before anything renders. A missing token skips the call; any failure
//! leaves the session unauthenticated rather than failing startup.

mod client;

pub use client::IdentityClient;

use std::future::Future;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument, warn};

use easykart_core::UserId;

use crate::error::set_sentry_user;
use crate::store::TokenStore;

/// Errors that can occur when resolving the current user.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Token was rejected.
    #[error("Token rejected")]
    Unauthorized,

    /// Service returned an unexpected status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Token contains characters not allowed in a header.
    #[error("Invalid token format")]
    InvalidToken,

    /// Request URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// The authenticated user, as returned by the identity service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: UserId,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Any other fields returned by the service.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Source of the current user for a token.
pub trait IdentityLookup: Send + Sync {
    /// Resolve the user the token belongs to.
    fn current_user(
        &self,
        token: &SecretString,
    ) -> impl Future<Output = Result<SessionUser, IdentityError>> + Send;
}

/// Read-only identity context for the rest of the application.
#[derive(Debug, Clone, Default)]
pub struct Session {
    user: Option<SessionUser>,
}

impl Session {
    /// A session with no user.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self { user: None }
    }

    /// Resolve the session from the stored token.
    ///
    /// This is the startup gate: callers await it before rendering anything.
    #[instrument(skip_all)]
    pub async fn resolve<I: IdentityLookup>(tokens: &TokenStore, identity: &I) -> Self {
        let Some(token) = tokens.load() else {
            info!("No stored token, continuing as guest");
            return Self::anonymous();
        };

        match identity.current_user(&token).await {
            Ok(user) => {
                info!(user_id = %user.id, "Session user resolved");
                set_sentry_user(&user.id, user.email.as_deref());
                Self { user: Some(user) }
            }
            Err(e) => {
                warn!(error = %e, "Failed to resolve session user, continuing as guest");
                Self::anonymous()
            }
        }
    }

    /// The current user, if authenticated.
    #[must_use]
    pub const fn user(&self) -> Option<&SessionUser> {
        self.user.as_ref()
    }

    /// Whether a user is signed in.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}
