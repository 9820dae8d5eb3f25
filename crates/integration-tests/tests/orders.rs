//! Orders, payment verification and the product cache.

use bubblemart_core::{OrderId, PaymentAction, ProductId, ProductKind};
use bubblemart_integration_tests::{
    envelope, payment_session_json, product, request_log, signed_in_state, state,
};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_verified_payment_is_served_from_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/order"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!([
            { "id": "o1", "status": "PENDING", "checkoutDetails": payment_session_json("ref-1") }
        ]))))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/payment/o1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({
            "id": "o1",
            "status": "PAID",
            "paidAt": "2026-10-01T10:00:00Z",
            "checkoutDetails": payment_session_json("ref-1")
        }))))
        .expect(1)
        .mount(&server)
        .await;

    let state = signed_in_state(&server);
    let id = OrderId::new("o1");
    state.orders().list(false).await.unwrap();
    assert_eq!(
        state.order_store().get(&id).unwrap().payment_action(),
        PaymentAction::CompletePayment
    );

    let order = state.payments().verify(&id).await.unwrap();
    assert!(order.is_paid());
    // The listed order card now offers the receipt.
    assert_eq!(
        state.order_store().get(&id).unwrap().payment_action(),
        PaymentAction::ViewReceipt
    );

    let again = state.payments().verify(&id).await.unwrap();
    assert_eq!(again, order);
}

#[tokio::test]
async fn test_unpaid_verification_is_not_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/payment/o2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(envelope(json!({ "id": "o2", "status": "PENDING" }))),
        )
        .expect(2)
        .mount(&server)
        .await;

    let state = signed_in_state(&server);
    let id = OrderId::new("o2");
    assert!(!state.payments().verify(&id).await.unwrap().is_paid());
    assert!(!state.payments().verify(&id).await.unwrap().is_paid());
}

#[tokio::test]
async fn test_product_reads_use_cache_until_admin_read() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/product/g1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(envelope(product("g1", ProductKind::Gift, 5_000, 4))),
        )
        .expect(2)
        .mount(&server)
        .await;

    let state = state(&server);
    let id = ProductId::new("g1");
    let first = state.products().get(&id, false).await.unwrap();
    let cached = state.products().get(&id, false).await.unwrap();
    assert_eq!(first, cached);
    assert_eq!(request_log(&server).await.len(), 1);

    // Admin reads always go to the server.
    state.products().get(&id, true).await.unwrap();
    assert_eq!(request_log(&server).await.len(), 2);
}
