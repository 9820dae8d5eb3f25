//! Session lifecycle: restore at start-up, expiry and logout.

use bubblemart_core::{CartLineId, ProductKind};
use bubblemart_integration_tests::{
    config, drain, envelope, fill_cart, has_persisted_token, line, persisted_state, product,
    request_log, signed_in_state, state, user_json, TOKEN,
};
use bubblemart_storefront::session::TokenStore;
use bubblemart_storefront::{ClientState, LogoutReason, Route, ToastLevel, UiEvent};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_user_and_cart(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/user"))
        .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(user_json())))
        .expect(1)
        .mount(server)
        .await;
    let lines = vec![line("c1", product("g1", ProductKind::Gift, 5_000, 3), 1)];
    Mock::given(method("GET"))
        .and(path("/cart"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(lines)))
        .expect(1)
        .mount(server)
        .await;
}

fn expired_events() -> Vec<UiEvent> {
    vec![
        UiEvent::Toast {
            level: ToastLevel::Error,
            message: "Session expired! Please login again".to_string(),
        },
        UiEvent::Navigate(Route::Home),
    ]
}

#[tokio::test]
async fn test_load_app_restores_persisted_session() {
    let server = MockServer::start().await;
    mount_user_and_cart(&server).await;

    let state = persisted_state(&server);
    assert!(state.session().load_app().await.unwrap());

    let session = state.session_state().borrow().clone();
    assert!(session.has_token);
    assert_eq!(session.user.map(|u| u.name).as_deref(), Some("Ada"));
    assert_eq!(state.cart_store().snapshot().len(), 1);
}

#[tokio::test]
async fn test_load_app_without_token_stays_signed_out() {
    let server = MockServer::start().await;
    let state = state(&server);

    assert!(!state.session().load_app().await.unwrap());
    assert!(!state.session().is_authenticated());
    assert!(request_log(&server).await.is_empty());
}

#[tokio::test]
async fn test_token_file_survives_restart() {
    let server = MockServer::start().await;
    mount_user_and_cart(&server).await;
    let dir = tempfile::tempdir().unwrap();

    let mut cfg = config(&server);
    cfg.data_dir = dir.path().to_path_buf();
    let first = ClientState::from_config(cfg.clone()).unwrap();
    first
        .token_store()
        .save(&secrecy::SecretString::from(TOKEN))
        .unwrap();
    assert!(cfg.token_path().exists());

    let second = ClientState::from_config(cfg).unwrap();
    assert!(second.session().load_app().await.unwrap());
    assert!(second.session().is_authenticated());
}

#[tokio::test]
async fn test_unauthorized_response_tears_down_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/order"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "message": "jwt expired" })),
        )
        .mount(&server)
        .await;

    let state = signed_in_state(&server);
    fill_cart(
        &state,
        vec![line("c1", product("g1", ProductKind::Gift, 5_000, 3), 1)],
    );
    let mut events = state.events().subscribe();

    let err = state.orders().list(false).await.unwrap_err();
    assert!(err.is_unauthorized());

    assert!(!state.session().is_authenticated());
    assert!(!has_persisted_token(&state));
    assert!(!state.cart_store().snapshot().is_loaded());
    assert!(!state.order_store().snapshot().is_loaded());
    assert_eq!(state.session_state().borrow().user, None);
    assert_eq!(drain(&mut events), expired_events());
}

#[tokio::test]
async fn test_repeated_unauthorized_ends_session_once() {
    let server = MockServer::start().await;
    for route in ["/order", "/cart"] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
    }

    let state = signed_in_state(&server);
    let mut events = state.events().subscribe();

    let orders = state.orders();
    let cart = state.cart();
    let (listed, fetched) = tokio::join!(orders.list(false), cart.fetch());
    assert!(listed.is_err());
    assert!(fetched.is_err());

    // Already signed out: a later rejection changes nothing.
    assert!(state.orders().list(false).await.unwrap_err().is_unauthorized());

    assert!(!state.session().is_authenticated());
    assert_eq!(drain(&mut events), expired_events());
}

#[tokio::test]
async fn test_unauthorized_during_quantity_update_tears_down_session() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/cart"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let state = signed_in_state(&server);
    fill_cart(
        &state,
        vec![line("c1", product("g1", ProductKind::Gift, 5_000, 3), 1)],
    );
    let mut events = state.events().subscribe();

    state
        .cart()
        .update_quantity(&CartLineId::new("c1"), 2)
        .unwrap();
    state.cart().settle().await;

    assert!(!state.session().is_authenticated());
    assert!(!state.cart_store().snapshot().is_loaded());
    assert_eq!(drain(&mut events), expired_events());
}

#[tokio::test]
async fn test_logout_clears_everything() {
    let server = MockServer::start().await;
    let state = signed_in_state(&server);
    fill_cart(
        &state,
        vec![line("c1", product("l1", ProductKind::Log, 2_000, 3), 1)],
    );
    let mut events = state.events().subscribe();

    state.session().logout(LogoutReason::UserInitiated);

    assert!(!state.session().is_authenticated());
    assert!(!has_persisted_token(&state));
    assert!(!state.cart_store().snapshot().is_loaded());
    assert_eq!(
        drain(&mut events),
        vec![
            UiEvent::Toast {
                level: ToastLevel::Info,
                message: "Logged out".to_string(),
            },
            UiEvent::Navigate(Route::Home),
        ]
    );

    // Gated operations now send the user to the login page.
    assert!(state.session().require(Some("/orders")).is_err());
    assert_eq!(
        drain(&mut events).last(),
        Some(&UiEvent::Navigate(Route::Login {
            redirect: Some("/orders".to_string())
        }))
    );
}
