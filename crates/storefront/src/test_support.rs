//! Fixtures shared by unit tests.

use std::sync::Arc;
use std::time::Duration;

use bubblemart_core::{CartLine, CartLineId, Currency, Money, Product, ProductId, ProductKind};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use url::Url;
use wiremock::MockServer;

use crate::config::ClientConfig;
use crate::session::MemoryTokenStore;
use crate::state::ClientState;

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

/// Config pointed at a mock server, with a short debounce window.
pub fn config(server: &MockServer) -> ClientConfig {
    let mut config = ClientConfig::new(Url::parse(&server.uri()).unwrap());
    config.app_url = "https://shop.test".to_string();
    config.quantity_debounce = Duration::from_millis(50);
    config
}

/// Client state backed by an in-memory token store.
pub fn state(server: &MockServer) -> ClientState {
    ClientState::new(config(server), Arc::new(MemoryTokenStore::default())).unwrap()
}

/// Client state that already carries a bearer token.
pub fn signed_in_state(server: &MockServer) -> ClientState {
    let state = state(server);
    state
        .api()
        .set_auth_token(Some(secrecy::SecretString::from("t0k3n")));
    state
}
