//! Error translation at the service boundary, with Sentry integration.
//!
//! Services return `Result<T, CommerceError>`. Every failure carries enough to
//! pick what the user sees: field errors go onto the form, server messages win
//! over the step-specific fallback, cancellations are not shown at all.

use bubblemart_core::FieldErrors;
use thiserror::Error;

use crate::api::ApiError;
use crate::session::TokenStoreError;

/// Shown when a request failed and the server gave no usable message.
const NETWORK_FALLBACK: &str = "Network error, please check your connection";

/// Commerce-level error type.
#[derive(Debug, Error)]
pub enum CommerceError {
    /// Client-side validation failed; no request was made.
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    /// The API call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The operation needs a signed-in user.
    #[error("Not signed in")]
    NotAuthenticated,

    /// A required identifier was missing (e.g. no order id in the URL).
    #[error("Missing {0}")]
    MissingIdentifier(&'static str),

    /// Requested more units than are available.
    #[error("Only {available} unit(s) available, {requested} requested")]
    InsufficientStock { requested: u32, available: u32 },

    /// Quantity must be at least one.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(u32),

    /// A payment redirect URL that cannot be navigated to.
    #[error("Invalid redirect URL: {0}")]
    InvalidRedirect(String),

    /// Reading or writing the persisted token failed.
    #[error("Token storage error: {0}")]
    TokenStore(#[from] TokenStoreError),
}

impl CommerceError {
    /// Message to show the user.
    ///
    /// A message from the server wins; otherwise local errors describe
    /// themselves and failed requests fall back to `fallback`.
    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Api(err) => match err.server_message() {
                Some(message) => message.to_string(),
                None if matches!(err, ApiError::Network(_)) => NETWORK_FALLBACK.to_string(),
                None => fallback.to_string(),
            },
            Self::Validation(errors) => errors
                .iter()
                .next()
                .and_then(|(_, messages)| messages.first())
                .cloned()
                .unwrap_or_else(|| fallback.to_string()),
            Self::NotAuthenticated => "Please login!".to_string(),
            Self::InsufficientStock { available, .. } => {
                format!("Only {available} unit(s) left in stock")
            }
            Self::InvalidQuantity(_) => "Quantity must be at least 1".to_string(),
            Self::MissingIdentifier(_) | Self::InvalidRedirect(_) | Self::TokenStore(_) => {
                fallback.to_string()
            }
        }
    }

    /// Whether the failure should be swallowed without telling the user.
    #[must_use]
    pub fn is_silent(&self) -> bool {
        matches!(self, Self::Api(err) if err.is_cancellation())
    }

    /// Whether retrying the same operation can succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        !matches!(self, Self::MissingIdentifier(_))
    }

    /// Whether the server rejected the session.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Api(err) if err.is_unauthorized())
    }

    /// Per-field messages, from client validation or the server.
    #[must_use]
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Self::Validation(errors) => Some(errors),
            Self::Api(err) => err.field_errors(),
            _ => None,
        }
    }
}

impl From<FieldErrors> for CommerceError {
    fn from(errors: FieldErrors) -> Self {
        Self::Validation(errors)
    }
}

/// Result type alias for `CommerceError`.
pub type Result<T> = std::result::Result<T, CommerceError>;

/// Set the Sentry user context.
///
/// Call this once the signed-in user is known.
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

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_server_message_wins_over_fallback() {
        let err = CommerceError::Api(ApiError::Http {
            status: 400,
            message: Some("Product is out of stock".to_string()),
            field_errors: None,
        });
        assert_eq!(err.user_message("fallback"), "Product is out of stock");

        let err = CommerceError::Api(ApiError::Http {
            status: 500,
            message: None,
            field_errors: None,
        });
        assert_eq!(
            err.user_message("Unable to add product! Please try again"),
            "Unable to add product! Please try again"
        );
    }

    #[test]
    fn test_validation_message_is_first_field_error() {
        let mut errors = FieldErrors::new();
        errors.add("receiverName", "Receiver's name is required");
        let err = CommerceError::from(errors);
        assert_eq!(err.user_message("x"), "Receiver's name is required");
        assert!(err.field_errors().unwrap().contains("receiverName"));
    }

    #[test]
    fn test_cancellation_is_silent() {
        assert!(CommerceError::Api(ApiError::Cancelled).is_silent());
        assert!(!CommerceError::NotAuthenticated.is_silent());
    }

    #[test]
    fn test_missing_identifier_is_not_retryable() {
        assert!(!CommerceError::MissingIdentifier("order id").is_retryable());
        assert!(CommerceError::Api(ApiError::Cancelled).is_retryable());
    }

    #[test]
    fn test_unauthorized() {
        let err = CommerceError::Api(ApiError::Unauthorized { message: None });
        assert!(err.is_unauthorized());
        assert_eq!(err.user_message("Session expired"), "Session expired");
    }
}
