//! Credential records behind log products.
//!
//! Admins page through the pool of a single product and edit or delete
//! individual rows. Buyers page through the credentials they purchased.

use bubblemart_core::{FieldErrors, LogCredential, LogId, LogInput, ProductId};
use tracing::{info, instrument};

use super::{fetch_failed, mutation_failed};
use crate::api::{Page, PageQuery};
use crate::error::{CommerceError, Result};
use crate::state::ClientState;
use crate::store::EntityStore;

const LIST_FALLBACK: &str = "Unknown error occurred whilst fetching logs!";
const UPDATE_FALLBACK: &str = "Unknown error occurred whilst updating products";
const DELETE_FALLBACK: &str = "Unknown error occurred whilst deleting log";

/// Log credential service.
#[derive(Clone)]
pub struct LogService {
    state: ClientState,
}

impl LogService {
    #[must_use]
    pub const fn new(state: ClientState) -> Self {
        Self { state }
    }

    /// Load one page of a log product's credential pool (admin).
    ///
    /// Page 1 replaces what the store held, so switching products never
    /// mixes pools. Later pages merge.
    ///
    /// # Errors
    ///
    /// Returns `MissingIdentifier` for a blank id, or an error if the request
    /// fails; the message is also recorded on the store.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn list_for_product(&self, product_id: &ProductId, page: u32) -> Result<()> {
        if product_id.is_blank() {
            return Err(CommerceError::MissingIdentifier("product id"));
        }
        self.load_page(
            self.state.product_log_store(),
            &format!("/log/{product_id}"),
            page,
        )
        .await
    }

    /// Load one page of the signed-in buyer's purchased credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails; the message is also recorded on
    /// the store.
    #[instrument(skip(self))]
    pub async fn list_purchased(&self, page: u32) -> Result<()> {
        self.load_page(self.state.purchased_log_store(), "/log", page)
            .await
    }

    async fn load_page(
        &self,
        store: &EntityStore<LogCredential>,
        path: &str,
        page: u32,
    ) -> Result<()> {
        let page = page.max(1);
        if page == 1 {
            store.set_error(None);
        } else {
            store.begin_fetch_next();
        }

        match self
            .state
            .api()
            .get_query::<Vec<LogCredential>, _>(path, &PageQuery { page })
            .await
        {
            Ok(envelope) => {
                let fetched = Page::from(envelope);
                if page == 1 {
                    store.set_page(fetched.items, fetched.pagination);
                } else {
                    store.merge_page(fetched.items, fetched.pagination);
                }
                Ok(())
            }
            Err(e) => Err(fetch_failed(&self.state, store, e.into(), LIST_FALLBACK)),
        }
    }

    /// Change the email and password of one credential (admin).
    ///
    /// # Errors
    ///
    /// Returns a `Validation` error if either field is blank, or an error if
    /// the request fails.
    #[instrument(skip(self, email, password), fields(log_id = %id))]
    pub async fn update(&self, id: &LogId, email: &str, password: &str) -> Result<()> {
        if id.is_blank() {
            return Err(CommerceError::MissingIdentifier("log id"));
        }
        let input = LogInput {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        if !input.is_complete() {
            let mut errors = FieldErrors::new();
            if input.email.is_empty() {
                errors.add("email", "Please provide an email");
            }
            if input.password.trim().is_empty() {
                errors.add("password", "Please provide a password");
            }
            return Err(errors.into());
        }

        let returned = self
            .state
            .api()
            .patch::<_, Option<LogCredential>>(&format!("/log/{id}"), &input)
            .await
            .map_err(|e| mutation_failed(&self.state, e.into(), UPDATE_FALLBACK))?
            .into_data();

        for store in self.stores() {
            match &returned {
                Some(credential) if store.get(id).is_some() => store.upsert(credential.clone()),
                _ => {
                    store.update(id, |credential| {
                        credential.email.clone_from(&input.email);
                        credential.password.clone_from(&input.password);
                    });
                }
            }
        }
        info!("Log updated");
        self.state.events().success("Log updated successfully!");
        Ok(())
    }

    /// Delete one credential (admin).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(log_id = %id))]
    pub async fn delete(&self, id: &LogId) -> Result<()> {
        if id.is_blank() {
            return Err(CommerceError::MissingIdentifier("log id"));
        }
        self.state
            .api()
            .delete(&format!("/log/{id}"))
            .await
            .map_err(|e| mutation_failed(&self.state, e.into(), DELETE_FALLBACK))?;

        for store in self.stores() {
            store.remove(id);
        }
        info!("Log deleted");
        self.state.events().success("Log deleted successfully!");
        Ok(())
    }

    fn stores(&self) -> [&EntityStore<LogCredential>; 2] {
        [
            self.state.product_log_store(),
            self.state.purchased_log_store(),
        ]
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::events::{ToastLevel, UiEvent};
    use crate::test_support::{envelope, signed_in_state};

    fn log_json(id: &str, email: &str) -> serde_json::Value {
        json!({ "id": id, "email": email, "password": "hunter2", "productId": "p1" })
    }

    fn next_link() -> serde_json::Value {
        json!({
            "total": 4,
            "pageNum": 2,
            "activePage": 1,
            "previousLink": null,
            "nextLink": {
                "host": "api.test",
                "route": "/log/p1",
                "baseUrl": "https://api.test",
                "commonUrl": "https://api.test/log/p1",
                "link": "https://api.test/log/p1?page=2"
            }
        })
    }

    #[tokio::test]
    async fn test_pages_merge_after_first() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/log/p1"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [log_json("l1", "a@x.com"), log_json("l2", "b@x.com")],
                "pagination": next_link()
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/log/p1"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!([
                log_json("l3", "c@x.com")
            ]))))
            .mount(&server)
            .await;

        let state = signed_in_state(&server);
        let logs = state.logs();
        let product = ProductId::new("p1");
        logs.list_for_product(&product, 1).await.unwrap();
        assert_eq!(state.product_log_store().snapshot().next_page(), Some(2));

        logs.list_for_product(&product, 2).await.unwrap();
        let snapshot = state.product_log_store().snapshot();
        assert_eq!(snapshot.len(), 3);
        assert!(!snapshot.loading_next);
    }

    #[tokio::test]
    async fn test_update_patches_and_toasts() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/log/l1"))
            .and(body_json(json!({ "email": "new@x.com", "password": "s3cret" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let state = signed_in_state(&server);
        let existing: LogCredential = serde_json::from_value(log_json("l1", "old@x.com")).unwrap();
        state.product_log_store().set_all(vec![existing]);
        let mut events = state.events().subscribe();

        state
            .logs()
            .update(&LogId::new("l1"), " new@x.com ", "s3cret")
            .await
            .unwrap();

        let updated = state.product_log_store().get(&LogId::new("l1")).unwrap();
        assert_eq!(updated.email, "new@x.com");
        assert_eq!(
            events.recv().await.unwrap(),
            UiEvent::Toast {
                level: ToastLevel::Success,
                message: "Log updated successfully!".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_blank_update_stays_local() {
        let server = MockServer::start().await;
        let state = signed_in_state(&server);
        let err = state
            .logs()
            .update(&LogId::new("l1"), "", "pw")
            .await
            .unwrap_err();
        assert!(err.field_errors().unwrap().contains("email"));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_failure_toasts_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/log/l1"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let state = signed_in_state(&server);
        let existing: LogCredential = serde_json::from_value(log_json("l1", "a@x.com")).unwrap();
        state.product_log_store().set_all(vec![existing]);
        let mut events = state.events().subscribe();

        assert!(state.logs().delete(&LogId::new("l1")).await.is_err());
        assert!(state.product_log_store().get(&LogId::new("l1")).is_some());
        assert_eq!(
            events.recv().await.unwrap(),
            UiEvent::Toast {
                level: ToastLevel::Error,
                message: DELETE_FALLBACK.to_string()
            }
        );
    }
}
