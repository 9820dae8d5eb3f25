//! Order lists and order detail.

use bubblemart_core::{CreateOrderRequest, Order, OrderId};
use tracing::{info, instrument};

use super::{fetch_list, fetch_next};
use crate::error::{CommerceError, Result};
use crate::state::ClientState;
use crate::store::EntityStore;

const LIST_FALLBACK: &str = "Unknown error occurred whilst fetching order!";
const DETAIL_FALLBACK: &str = "Error encountered whilst fetching order details";

/// Order service.
#[derive(Clone)]
pub struct OrderService {
    state: ClientState,
}

impl OrderService {
    #[must_use]
    pub const fn new(state: ClientState) -> Self {
        Self { state }
    }

    fn store(&self, admin: bool) -> &EntityStore<Order> {
        if admin {
            self.state.admin_order_store()
        } else {
            self.state.order_store()
        }
    }

    /// Load the signed-in user's orders, or every order when `admin`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails; the message is also recorded on
    /// the store.
    #[instrument(skip(self))]
    pub async fn list(&self, admin: bool) -> Result<()> {
        let path = if admin { "/order?type=admin" } else { "/order" };
        fetch_list(&self.state, self.store(admin), path, LIST_FALLBACK).await
    }

    /// Load the next page of orders, if there is one.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn load_next_page(&self, admin: bool) -> Result<bool> {
        fetch_next(
            &self.state,
            self.store(admin),
            |page| {
                if admin {
                    format!("/order?type=admin&page={page}")
                } else {
                    format!("/order?page={page}")
                }
            },
            LIST_FALLBACK,
        )
        .await
    }

    /// Fetch one order. A listed copy is refreshed with the result.
    ///
    /// # Errors
    ///
    /// Returns `MissingIdentifier` (not retryable) for a blank id, or an error
    /// if the request fails.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn get(&self, id: &OrderId) -> Result<Order> {
        if id.is_blank() {
            return Err(CommerceError::MissingIdentifier("order id"));
        }
        let order = self
            .state
            .api()
            .get::<Order>(&format!("/order/{id}"))
            .await
            .map_err(|e| self.state.intercept(e.into()))?
            .into_data();

        self.replace_listed(&order);
        Ok(order)
    }

    /// Message to show when [`get`](Self::get) fails.
    #[must_use]
    pub fn detail_error_message(err: &CommerceError) -> String {
        match err {
            CommerceError::MissingIdentifier(_) => "Order ID not found!".to_string(),
            _ => err.user_message(DETAIL_FALLBACK),
        }
    }

    /// Create an order from cart lines.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, request), fields(lines = request.cart_ids.len()))]
    pub async fn create(&self, request: &CreateOrderRequest) -> Result<Order> {
        let order = self
            .state
            .api()
            .post::<_, Order>("/order", request)
            .await
            .map_err(|e| self.state.intercept(e.into()))?
            .into_data();
        info!(order_id = %order.id, "Order created");

        let store = self.state.order_store();
        if store.snapshot().is_loaded() {
            store.prepend(order.clone());
        }
        Ok(order)
    }

    /// Replace `order` wherever it is listed. Lists that do not hold it are
    /// left alone.
    pub(crate) fn replace_listed(&self, order: &Order) {
        for store in [self.state.order_store(), self.state.admin_order_store()] {
            store.update(&order.id, |listed| *listed = order.clone());
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bubblemart_core::OrderStatus;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::test_support::{envelope, signed_in_state};

    fn order_json(id: &str, status: &str) -> serde_json::Value {
        json!({ "id": id, "cartItems": [], "status": status })
    }

    #[tokio::test]
    async fn test_own_and_admin_lists_are_separate() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/order"))
            .and(query_param("type", "admin"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!([
                order_json("o1", "PAID"),
                order_json("o2", "PENDING")
            ]))))
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/order"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(envelope(json!([order_json("o1", "PAID")]))),
            )
            .mount(&server)
            .await;

        let state = signed_in_state(&server);
        state.orders().list(false).await.unwrap();
        state.orders().list(true).await.unwrap();

        assert_eq!(state.order_store().snapshot().len(), 1);
        assert_eq!(state.admin_order_store().snapshot().len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_ids_keep_last() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/order"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!([
                order_json("o1", "PENDING"),
                order_json("o1", "PAID")
            ]))))
            .mount(&server)
            .await;

        let state = signed_in_state(&server);
        state.orders().list(false).await.unwrap();
        let orders = state.order_store().items().unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].status, OrderStatus::Paid);
    }

    #[tokio::test]
    async fn test_get_refreshes_listed_copy() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/order/o1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(envelope(order_json("o1", "PAID"))),
            )
            .mount(&server)
            .await;

        let state = signed_in_state(&server);
        let pending: Order = serde_json::from_value(order_json("o1", "PENDING")).unwrap();
        state.order_store().set_all(vec![pending]);

        let order = state.orders().get(&OrderId::new("o1")).await.unwrap();
        assert!(order.status == OrderStatus::Paid);
        assert_eq!(
            state.order_store().get(&OrderId::new("o1")).unwrap().status,
            OrderStatus::Paid
        );
        // Not listed there, so not added.
        assert!(!state.admin_order_store().snapshot().is_loaded());
    }

    #[tokio::test]
    async fn test_missing_order_id_is_not_retryable() {
        let server = MockServer::start().await;
        let state = signed_in_state(&server);
        let err = state.orders().get(&OrderId::new(" ")).await.unwrap_err();
        assert!(matches!(err, CommerceError::MissingIdentifier("order id")));
        assert!(!err.is_retryable());
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
