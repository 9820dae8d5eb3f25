//! Wire envelopes shared by every endpoint, plus request/response bodies
//! that are specific to the gateway rather than the domain.

use bubblemart_core::{FieldErrors, Pagination};
use serde::{Deserialize, Serialize};

/// Every successful payload is wrapped as `{ "data": T, "pagination"?: ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub data: T,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

impl<T> ApiEnvelope<T> {
    #[must_use]
    pub fn into_data(self) -> T {
        self.data
    }
}

/// One page of a paginated list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Option<Pagination>,
}

impl<T> Page<T> {
    /// Page number to request next, if the server advertised one.
    #[must_use]
    pub fn next_page(&self) -> Option<u32> {
        self.pagination.as_ref().and_then(Pagination::next_page)
    }
}

impl<T> From<ApiEnvelope<Vec<T>>> for Page<T> {
    fn from(envelope: ApiEnvelope<Vec<T>>) -> Self {
        Self {
            items: envelope.data,
            pagination: envelope.pagination,
        }
    }
}

/// Error body: `{ "message"?: string, "error"?: { field: [messages] } }`.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    /// Usually a field map, but some endpoints put a plain string here.
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

impl ErrorBody {
    pub fn field_errors(&self) -> Option<FieldErrors> {
        let value = self.error.as_ref()?;
        serde_json::from_value::<FieldErrors>(value.clone())
            .ok()
            .filter(|errors| !errors.is_empty())
    }

    /// `message`, or the `error` value when that is a plain string.
    pub fn message(&self) -> Option<String> {
        self.message
            .clone()
            .or_else(|| self.error.as_ref()?.as_str().map(str::to_owned))
            .filter(|m| !m.trim().is_empty())
    }
}

/// Query for paginated lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageQuery {
    pub page: u32,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_without_pagination() {
        let envelope: ApiEnvelope<Vec<u32>> = serde_json::from_str(r#"{"data": [1, 2]}"#).unwrap();
        let page = Page::from(envelope);
        assert_eq!(page.items, vec![1, 2]);
        assert_eq!(page.next_page(), None);
    }

    #[test]
    fn test_error_body_with_fields() {
        let body: ErrorBody = serde_json::from_str(
            r#"{"message": "Validation failed", "error": {"email": ["Email already taken"]}}"#,
        )
        .unwrap();
        assert_eq!(body.message().as_deref(), Some("Validation failed"));
        assert!(body.field_errors().unwrap().contains("email"));
    }

    #[test]
    fn test_error_body_with_string_error() {
        let body: ErrorBody = serde_json::from_str(r#"{"error": "Out of stock"}"#).unwrap();
        assert_eq!(body.message().as_deref(), Some("Out of stock"));
        assert!(body.field_errors().is_none());
    }
}
