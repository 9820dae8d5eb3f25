//! End-to-end tests for the Bubblemart client.
//!
//! Each test drives [`ClientState`] against a `wiremock` server standing in
//! for the commerce API, then inspects the stores and the UI events.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p bubblemart-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `checkout` - order, cart clear and payment sequencing
//! - `cart` - debounced quantity updates and totals
//! - `session` - restore, expiry and logout

use std::sync::Arc;
use std::time::Duration;

use bubblemart_core::{
    CartLine, CartLineId, Currency, Money, Product, ProductId, ProductKind,
};
use bubblemart_storefront::session::{MemoryTokenStore, TokenStore};
use bubblemart_storefront::store::CartItem;
use bubblemart_storefront::{ClientConfig, ClientState, UiEvent};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::sync::broadcast;
use url::Url;
use wiremock::MockServer;

/// Bearer token used by signed-in fixtures.
pub const TOKEN: &str = "integration-token";

/// Provider page returned by payment fixtures.
pub const PAY_URL: &str = "https://checkout.paystack.test/session-1";

pub fn naira() -> Currency {
    Currency {
        symbol: "₦".to_string(),
        name: "NGN".to_string(),
    }
}

pub fn product(id: &str, kind: ProductKind, unit: i64, stock: u32) -> Product {
    Product {
        id: ProductId::new(id),
        name: format!("Product {id}"),
        kind,
        quantity: stock,
        amount: Money::from_whole(unit, naira()),
        description: String::new(),
        image: String::new(),
        created_at: None,
        total_sales: 0,
    }
}

pub fn line(id: &str, product: Product, quantity: u32) -> CartLine {
    let total = product.amount.whole * Decimal::from(quantity);
    CartLine {
        id: CartLineId::new(id),
        product_details: product,
        quantity,
        total_price: Money::from_whole(total, naira()),
        is_available: Some(true),
        created_at: None,
        paid_at: None,
        delivered_at: None,
    }
}

/// `{ "data": value }`
pub fn envelope(value: impl serde::Serialize) -> Value {
    json!({ "data": value })
}

pub fn user_json() -> Value {
    json!({
        "id": "u1",
        "email": "ada@example.com",
        "name": "Ada",
        "role": "USER"
    })
}

/// Payment session as `POST /payment/:id` returns it.
pub fn payment_session_json(reference: &str) -> Value {
    json!({
        "authorization_url": PAY_URL,
        "access_code": "access-1",
        "reference": reference
    })
}

/// Config pointed at `server` with a short debounce window.
pub fn config(server: &MockServer) -> ClientConfig {
    let mut config = ClientConfig::new(Url::parse(&server.uri()).expect("mock server uri"));
    config.app_url = "https://shop.test".to_string();
    config.quantity_debounce = Duration::from_millis(40);
    config
}

/// Signed-out client state with an in-memory token store.
pub fn state(server: &MockServer) -> ClientState {
    ClientState::new(config(server), Arc::new(MemoryTokenStore::default()))
        .expect("client state")
}

/// Client state whose token store already holds [`TOKEN`], as after a
/// previous run. Call `session().load_app()` to restore it.
pub fn persisted_state(server: &MockServer) -> ClientState {
    let store = MemoryTokenStore::with_token(SecretString::from(TOKEN));
    ClientState::new(config(server), Arc::new(store)).expect("client state")
}

/// Client state that is signed in without any request having been made.
pub fn signed_in_state(server: &MockServer) -> ClientState {
    let state = persisted_state(server);
    state.api().set_auth_token(Some(SecretString::from(TOKEN)));
    state
}

/// Put lines straight into the cart store.
pub fn fill_cart(state: &ClientState, lines: Vec<CartLine>) {
    state
        .cart_store()
        .set_all(lines.into_iter().map(CartItem::from).collect());
}

/// Whether the token store still holds a token.
pub fn has_persisted_token(state: &ClientState) -> bool {
    state.token_store().load().ok().flatten().is_some()
}

/// Every event published so far.
pub fn drain(events: &mut broadcast::Receiver<UiEvent>) -> Vec<UiEvent> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    seen
}

/// Requests received by `server` as `METHOD path` strings, in order.
pub async fn request_log(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|r| format!("{} {}", r.method, r.url.path()))
        .collect()
}
