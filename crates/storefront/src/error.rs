//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type for the command surface. Cart
//! operations themselves never fail the session; errors here come from
//! startup, user input and explicit catalog queries.

use thiserror::Error;

use crate::cart::StagedEditError;
use crate::catalog::CatalogError;
use crate::config::ConfigError;
use crate::session::IdentityError;
use crate::store::StoreError;

/// Application-level error type for the storefront client.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Durable store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Catalog service operation failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Identity service operation failed.
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    /// Staged edits could not be committed.
    #[error("Cart update: {0}")]
    StagedEdit(#[from] StagedEditError),

    /// Bad input from the user.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl AppError {
    /// Log the error and capture unexpected failures to Sentry.
    pub fn report(&self) {
        if matches!(self, Self::Config(_) | Self::Store(_) | Self::Catalog(_)) {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Command failed"
            );
        } else {
            tracing::warn!(error = %self, "Command rejected");
        }
    }

    /// Process exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InvalidInput(_) | Self::StagedEdit(_) => 2,
            Self::Config(_) => 78,
            Self::Store(_) => 74,
            Self::Catalog(_) | Self::Identity(_) => 69,
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Capture an error that is handled locally but still worth reporting.
pub fn capture_error<E: std::error::Error + ?Sized>(err: &E) {
    sentry::capture_error(err);
}

/// Set the Sentry user context from a user ID.
///
/// Call this after the session user is resolved to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added product", Some(&[("product_id", "123")][..]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
