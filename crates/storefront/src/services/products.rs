//! Catalog reads and admin product management.
//!
//! Product details are cached for 5 minutes; admin edits and deletes
//! invalidate the cached entry.

use bubblemart_core::{NewProduct, Product, ProductId, ProductKind, ProductUpdate};
use tracing::{debug, info, instrument};

use super::{fetch_list, fetch_next, mutation_failed};
use crate::error::{CommerceError, Result};
use crate::state::ClientState;

const LIST_FALLBACK: &str = "Error encountered whilst fetching product list!";
const DETAIL_FALLBACK: &str = "Unknown error occurred whilst fetching product details!";
const CREATE_FALLBACK: &str = "Unable to add product! Please try again";
const UPDATE_FALLBACK: &str = "Unable to update product! Please try again";
const DELETE_FALLBACK: &str = "Unknown error occurred whilst deleting product!";

/// Product service.
#[derive(Clone)]
pub struct ProductService {
    state: ClientState,
}

impl ProductService {
    #[must_use]
    pub const fn new(state: ClientState) -> Self {
        Self { state }
    }

    /// Load the first page of products of `kind`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails; the message is also recorded on
    /// the collection for `kind`.
    #[instrument(skip(self), fields(kind = %kind))]
    pub async fn list(&self, kind: ProductKind) -> Result<()> {
        fetch_list(
            &self.state,
            self.state.catalog().for_kind(kind),
            &format!("/product?page=1&type={kind}"),
            LIST_FALLBACK,
        )
        .await
    }

    /// Load the next page of products of `kind`, if there is one.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(kind = %kind))]
    pub async fn load_next_page(&self, kind: ProductKind) -> Result<bool> {
        fetch_next(
            &self.state,
            self.state.catalog().for_kind(kind),
            |page| format!("/product?page={page}&type={kind}"),
            LIST_FALLBACK,
        )
        .await
    }

    /// Fetch one product.
    ///
    /// Admin reads ask the server for the admin view and bypass the cache.
    ///
    /// # Errors
    ///
    /// Returns `MissingIdentifier` for a blank id, or an error if the request
    /// fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get(&self, id: &ProductId, admin: bool) -> Result<Product> {
        if id.is_blank() {
            return Err(CommerceError::MissingIdentifier("product id"));
        }

        let cache = self.state.product_cache();
        if !admin && let Some(product) = cache.get(id).await {
            debug!("Cache hit for product");
            return Ok(product);
        }

        let path = if admin {
            format!("/product/{id}?isAdmin=true")
        } else {
            format!("/product/{id}")
        };
        let product = self
            .state
            .api()
            .get::<Product>(&path)
            .await
            .map_err(|e| self.state.intercept(e.into()))?
            .into_data();

        if !admin {
            cache.insert(id.clone(), product.clone()).await;
        }
        Ok(product)
    }

    /// Message to show when [`get`](Self::get) fails.
    #[must_use]
    pub fn detail_error_message(err: &CommerceError) -> String {
        match err {
            CommerceError::MissingIdentifier(_) => "Product ID not found!".to_string(),
            _ => err.user_message(DETAIL_FALLBACK),
        }
    }

    /// Create a product and put it at the top of its collection.
    ///
    /// Credential rows with an empty email or password are dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, product), fields(kind = %product.kind))]
    pub async fn create(&self, product: NewProduct) -> Result<Product> {
        let body = product.without_incomplete_logs();
        match self.state.api().post::<_, Product>("/product", &body).await {
            Ok(envelope) => {
                let created = envelope.into_data();
                info!(product_id = %created.id, "Product created");
                self.state
                    .catalog()
                    .for_kind(created.kind)
                    .prepend(created.clone());
                self.state.events().success("Product added successfully");
                Ok(created)
            }
            Err(e) => Err(mutation_failed(&self.state, e.into(), CREATE_FALLBACK)),
        }
    }

    /// Edit a product.
    ///
    /// # Errors
    ///
    /// Returns `MissingIdentifier` for a blank id, or an error if the request
    /// fails.
    #[instrument(skip(self, update), fields(product_id = %id))]
    pub async fn update(&self, id: &ProductId, update: ProductUpdate) -> Result<Product> {
        if id.is_blank() {
            return Err(CommerceError::MissingIdentifier("product id"));
        }
        match self
            .state
            .api()
            .patch::<_, Product>(&format!("/product/{id}"), &update)
            .await
        {
            Ok(envelope) => {
                let updated = envelope.into_data();
                self.state.product_cache().invalidate(id).await;
                self.state.catalog().upsert(updated.clone());
                self.state.events().success("Product updated successfully");
                Ok(updated)
            }
            Err(e) => Err(mutation_failed(&self.state, e.into(), UPDATE_FALLBACK)),
        }
    }

    /// Delete a product and drop it from both collections.
    ///
    /// # Errors
    ///
    /// Returns `MissingIdentifier` for a blank id, or an error if the request
    /// fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn delete(&self, id: &ProductId) -> Result<()> {
        if id.is_blank() {
            return Err(CommerceError::MissingIdentifier("product id"));
        }
        let name = self.state.catalog().find(id).map(|p| p.name);

        match self.state.api().delete(&format!("/product/{id}")).await {
            Ok(()) => {
                self.state.product_cache().invalidate(id).await;
                self.state.catalog().remove(id);
                let message = name.map_or_else(
                    || "Product deleted successfully!".to_string(),
                    |name| format!("{name} deleted successfully!"),
                );
                self.state.events().success(message);
                Ok(())
            }
            Err(e) => Err(mutation_failed(&self.state, e.into(), DELETE_FALLBACK)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bubblemart_core::LogInput;
    use rust_decimal::Decimal;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::test_support::{envelope, product, signed_in_state, state};

    #[tokio::test]
    async fn test_list_and_next_page() {
        let server = MockServer::start().await;
        let next_link = json!({
            "host": "api.test",
            "route": "/product",
            "baseUrl": "https://api.test",
            "commonUrl": "https://api.test/product",
            "link": "https://api.test/product?page=2"
        });
        Mock::given(method("GET"))
            .and(path("/product"))
            .and(query_param("page", "1"))
            .and(query_param("type", "gift"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [product("g1", ProductKind::Gift, 5_000, 2)],
                "pagination": { "total": 2, "pageNum": 2, "activePage": 1, "nextLink": next_link }
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/product"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [product("g2", ProductKind::Gift, 7_000, 1)],
                "pagination": { "total": 2, "pageNum": 2, "activePage": 2 }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let state = state(&server);
        let products = state.products();
        products.list(ProductKind::Gift).await.unwrap();
        assert!(products.load_next_page(ProductKind::Gift).await.unwrap());
        assert!(!products.load_next_page(ProductKind::Gift).await.unwrap());

        let gifts = state.catalog().for_kind(ProductKind::Gift).snapshot();
        assert_eq!(gifts.len(), 2);
        assert!(!state.catalog().for_kind(ProductKind::Log).snapshot().is_loaded());
    }

    #[tokio::test]
    async fn test_list_failure_uses_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/product"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let state = state(&server);
        assert!(state.products().list(ProductKind::Log).await.is_err());
        let logs = state.catalog().for_kind(ProductKind::Log).snapshot();
        assert_eq!(logs.error.as_deref(), Some(LIST_FALLBACK));
        assert!(!logs.is_loaded());
    }

    #[tokio::test]
    async fn test_get_is_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/product/g1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(envelope(product("g1", ProductKind::Gift, 5_000, 2))),
            )
            .expect(1)
            .mount(&server)
            .await;

        let state = state(&server);
        let id = ProductId::new("g1");
        let first = state.products().get(&id, false).await.unwrap();
        let second = state.products().get(&id, false).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_admin_get_asks_for_admin_view() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/product/l1"))
            .and(query_param("isAdmin", "true"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(envelope(product("l1", ProductKind::Log, 2_000, 4))),
            )
            .expect(2)
            .mount(&server)
            .await;

        let state = signed_in_state(&server);
        let id = ProductId::new("l1");
        state.products().get(&id, true).await.unwrap();
        state.products().get(&id, true).await.unwrap();
    }

    #[tokio::test]
    async fn test_blank_id_is_missing_identifier() {
        let server = MockServer::start().await;
        let state = state(&server);
        let err = state
            .products()
            .get(&ProductId::new(""), false)
            .await
            .unwrap_err();
        assert!(!err.is_retryable());
        assert_eq!(
            ProductService::detail_error_message(&err),
            "Product ID not found!"
        );
    }

    #[tokio::test]
    async fn test_create_drops_incomplete_logs_and_prepends() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/product"))
            .and(body_json(json!({
                "name": "Netflix",
                "type": "log",
                "quantity": 1,
                "amount": "2000",
                "image": "https://cdn.test/n.png",
                "description": "",
                "logs": [{ "email": "a@b.co", "password": "pw" }]
            })))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(envelope(product("l9", ProductKind::Log, 2_000, 1))),
            )
            .expect(1)
            .mount(&server)
            .await;

        let state = signed_in_state(&server);
        state
            .catalog()
            .for_kind(ProductKind::Log)
            .set_all(vec![product("l1", ProductKind::Log, 1_000, 3)]);

        let new_product = NewProduct {
            name: "Netflix".to_string(),
            kind: ProductKind::Log,
            quantity: 1,
            amount: Decimal::from(2_000),
            image: "https://cdn.test/n.png".to_string(),
            description: String::new(),
            logs: Some(vec![
                LogInput {
                    email: "a@b.co".to_string(),
                    password: "pw".to_string(),
                },
                LogInput {
                    email: String::new(),
                    password: "orphan".to_string(),
                },
            ]),
        };
        state.products().create(new_product).await.unwrap();

        let logs = state.catalog().for_kind(ProductKind::Log).items().unwrap();
        assert_eq!(logs[0].id.as_str(), "l9");
        assert_eq!(logs.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_removes_from_catalog() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/product/g1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": null })))
            .expect(1)
            .mount(&server)
            .await;

        let state = signed_in_state(&server);
        let mut events = state.events().subscribe();
        state
            .catalog()
            .for_kind(ProductKind::Gift)
            .set_all(vec![product("g1", ProductKind::Gift, 5_000, 2)]);

        state.products().delete(&ProductId::new("g1")).await.unwrap();
        assert!(state.catalog().find(&ProductId::new("g1")).is_none());
        assert_eq!(
            events.recv().await.unwrap(),
            crate::events::UiEvent::Toast {
                level: crate::events::ToastLevel::Success,
                message: "Product g1 deleted successfully!".to_string()
            }
        );
    }
}
