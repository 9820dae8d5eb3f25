//! Checkout sequencing against a mock API.

use bubblemart_core::{ContactInfo, Order, OrderId, OrderStatus, ProductKind};
use bubblemart_integration_tests::{
    PAY_URL, drain, envelope, fill_cart, line, payment_session_json, product, request_log,
    signed_in_state,
};
use bubblemart_storefront::{CheckoutPhase, CommerceError, Route, UiEvent};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn contact() -> ContactInfo {
    ContactInfo {
        sender_name: "Ada".to_string(),
        receiver_name: "Grace".to_string(),
        receiver_address: "1 Marina, Lagos".to_string(),
        receiver_phone_number: "0801 234 5678".to_string(),
        short_note: "Happy birthday".to_string(),
        ..ContactInfo::default()
    }
}

async fn mount_order(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/order"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(envelope(json!({ "id": "o1", "status": "PENDING" }))),
        )
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_cart_clear(server: &MockServer) {
    Mock::given(method("DELETE"))
        .and(path("/cart"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_checkout_runs_order_clear_then_payment() {
    let server = MockServer::start().await;
    mount_order(&server).await;
    mount_cart_clear(&server).await;
    Mock::given(method("POST"))
        .and(path("/payment/o1"))
        .and(body_json(json!({
            "callbackUrl": "https://shop.test/orders/o1/success"
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(envelope(payment_session_json("ref-1"))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let state = signed_in_state(&server);
    fill_cart(
        &state,
        vec![line("c1", product("l1", ProductKind::Log, 3_000, 4), 1)],
    );
    let mut events = state.events().subscribe();

    let checkout = state.checkout();
    let mut phases = checkout.subscribe();
    let session = checkout.run(None).await.unwrap();

    assert_eq!(session.reference, "ref-1");
    assert_eq!(phases.borrow_and_update().phase, CheckoutPhase::Redirecting);
    assert_eq!(checkout.snapshot().order_id, Some(OrderId::new("o1")));
    assert!(!state.cart_store().snapshot().is_loaded());

    assert_eq!(
        request_log(&server).await,
        vec!["POST /order", "DELETE /cart", "POST /payment/o1"]
    );
    assert!(drain(&mut events).contains(&UiEvent::Redirect(PAY_URL.to_string())));
}

#[tokio::test]
async fn test_gift_cart_requires_contact_before_any_request() {
    let server = MockServer::start().await;
    let state = signed_in_state(&server);
    fill_cart(
        &state,
        vec![
            line("c1", product("l1", ProductKind::Log, 3_000, 4), 1),
            line("c2", product("g1", ProductKind::Gift, 5_000, 2), 1),
        ],
    );

    let incomplete = ContactInfo {
        receiver_phone_number: "12ab".to_string(),
        ..contact()
    };
    let checkout = state.checkout();
    let err = checkout.run(Some(incomplete)).await.unwrap_err();

    assert!(matches!(err, CommerceError::Validation(_)));
    let snapshot = checkout.snapshot();
    assert_eq!(snapshot.phase, CheckoutPhase::Idle);
    assert!(snapshot.field_errors.contains("receiverPhoneNumber"));
    assert!(!snapshot.field_errors.contains("senderName"));
    assert!(request_log(&server).await.is_empty());
    assert_eq!(state.cart_store().snapshot().len(), 2);
}

#[tokio::test]
async fn test_gift_cart_sends_contact_with_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/order"))
        .and(body_json(json!({
            "cartIds": ["c2"],
            "contactInformation": {
                "senderName": "Ada",
                "receiverName": "Grace",
                "receiverAddress": "1 Marina, Lagos",
                "receiverPhoneNumber": "08012345678",
                "shortNote": "Happy birthday",
                "longitude": 0.0,
                "latitude": 0.0
            }
        })))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(envelope(json!({ "id": "o1", "status": "PENDING" }))),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_cart_clear(&server).await;
    Mock::given(method("POST"))
        .and(path("/payment/o1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(envelope(payment_session_json("ref-2"))),
        )
        .mount(&server)
        .await;

    let state = signed_in_state(&server);
    fill_cart(
        &state,
        vec![line("c2", product("g1", ProductKind::Gift, 5_000, 2), 1)],
    );
    state.checkout().run(Some(contact())).await.unwrap();
}

#[tokio::test]
async fn test_failed_payment_can_be_resumed_without_new_order() {
    let server = MockServer::start().await;
    mount_order(&server).await;
    mount_cart_clear(&server).await;
    Mock::given(method("POST"))
        .and(path("/payment/o1"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/payment/o1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(envelope(payment_session_json("ref-3"))),
        )
        .mount(&server)
        .await;
    let logs = vec![line("c1", product("l1", ProductKind::Log, 3_000, 4), 2)];
    Mock::given(method("GET"))
        .and(path("/order/o1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({
            "id": "o1",
            "status": "PENDING",
            "cartItems": &logs,
            "checkoutDetails": null
        }))))
        .expect(1)
        .mount(&server)
        .await;

    let state = signed_in_state(&server);
    fill_cart(&state, logs);
    let mut events = state.events().subscribe();

    let checkout = state.checkout();
    assert!(checkout.run(None).await.is_err());
    let snapshot = checkout.snapshot();
    assert_eq!(snapshot.phase, CheckoutPhase::Failed);
    assert!(snapshot.banner.is_some());
    assert_eq!(snapshot.order_id, Some(OrderId::new("o1")));

    // The order exists, unpaid and without a payment session.
    let order = state.orders().get(&OrderId::new("o1")).await.unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert!(order.checkout_details.is_none());
    assert_eq!(order.cart_items.len(), 1);
    checkout.resume_payment(&order).await.unwrap();

    assert_eq!(
        request_log(&server).await,
        vec![
            "POST /order",
            "DELETE /cart",
            "POST /payment/o1",
            "GET /order/o1",
            "POST /payment/o1"
        ]
    );
    assert!(drain(&mut events).contains(&UiEvent::Redirect(PAY_URL.to_string())));
}

#[tokio::test]
async fn test_paid_order_resumes_to_receipt() {
    let server = MockServer::start().await;
    let state = signed_in_state(&server);
    let mut events = state.events().subscribe();

    let order: Order = serde_json::from_value(json!({
        "id": "o9",
        "status": "PAID",
        "paidAt": "2026-10-01T10:00:00Z",
        "checkoutDetails": payment_session_json("ref-9")
    }))
    .unwrap();
    state.checkout().resume_payment(&order).await.unwrap();

    assert_eq!(
        drain(&mut events),
        vec![UiEvent::Navigate(Route::OrderSuccess(OrderId::new("o9")))]
    );
    assert!(request_log(&server).await.is_empty());
}

#[tokio::test]
async fn test_empty_cart_does_not_create_order() {
    let server = MockServer::start().await;
    let state = signed_in_state(&server);
    state.cart_store().set_all(Vec::new());

    let checkout = state.checkout();
    let err = checkout.run(None).await.unwrap_err();

    assert!(matches!(err, CommerceError::Validation(_)));
    assert!(checkout.snapshot().field_errors.contains("cart"));
    assert!(request_log(&server).await.is_empty());
}
