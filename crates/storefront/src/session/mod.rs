//! Session lifecycle.
//!
//! A session starts when a token arrives (login or restored from storage) and
//! ends on logout, whether the user asked for it or the API answered 401.
//! Both endings run the same teardown:
//!
//! 1. Clear the bearer token on the API client
//! 2. Abort every outstanding request and pending quantity update
//! 3. Reset every store and cache
//! 4. Delete the persisted token
//! 5. Toast and navigate home

mod token_store;

use bubblemart_core::User;
use secrecy::SecretString;
use tracing::{info, instrument, warn};

use crate::error::{Result, clear_sentry_user};
use crate::events::{Route, ToastLevel};
use crate::state::ClientState;

pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore, TokenStoreError};

/// What the view needs to know about the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub user: Option<User>,
    pub has_token: bool,
    /// Message from the last failed user-details fetch.
    pub error: Option<String>,
}

impl SessionState {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(User::is_admin)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    UserInitiated,
    /// The API rejected the token.
    Expired,
}

impl LogoutReason {
    const fn toast(self) -> (ToastLevel, &'static str) {
        match self {
            Self::UserInitiated => (ToastLevel::Info, "Logged out"),
            Self::Expired => (ToastLevel::Error, "Session expired! Please login again"),
        }
    }
}

/// Session operations over the shared client state.
#[derive(Clone)]
pub struct Session {
    state: ClientState,
}

impl Session {
    #[must_use]
    pub const fn new(state: ClientState) -> Self {
        Self { state }
    }

    /// Restore a persisted token at start-up.
    ///
    /// Returns whether a session was restored. An unreadable token file is
    /// treated as no token.
    ///
    /// # Errors
    ///
    /// Returns an error if the restored token is rejected.
    #[instrument(skip(self))]
    pub async fn load_app(&self) -> Result<bool> {
        let token = match self.state.token_store().load() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Failed to read persisted token");
                None
            }
        };

        let Some(token) = token else {
            return Ok(false);
        };

        self.start(token).await?;
        Ok(true)
    }

    /// A new token arrived: use it, persist it, then load the user and cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be persisted or the user details
    /// cannot be fetched.
    #[instrument(skip(self, token))]
    pub async fn on_auth_change(&self, token: SecretString) -> Result<User> {
        self.state.token_store().save(&token)?;
        self.start(token).await
    }

    async fn start(&self, token: SecretString) -> Result<User> {
        self.state.api().set_auth_token(Some(token));
        self.state.session_tx().send_modify(|s| s.has_token = true);

        let users = self.state.users();
        let cart = self.state.cart();
        let (user, _cart) = tokio::join!(users.current(), cart.fetch());
        user
    }

    /// End the session.
    pub fn logout(&self, reason: LogoutReason) {
        let state = &self.state;

        state.api().set_auth_token(None);
        state.api().cancel_all();
        state.quantity_updates().cancel_all();
        state.clear_stores();

        if let Err(e) = state.token_store().clear() {
            warn!(error = %e, "Failed to delete persisted token");
        }

        state.session_tx().send_replace(SessionState::default());
        clear_sentry_user();

        info!(?reason, "Session ended");
        let (level, message) = reason.toast();
        state.events().toast(level, message);
        state.events().navigate(Route::Home);
    }

    /// Whether a token is set.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state.api().has_auth_token()
    }

    /// Gate an operation that needs a session.
    ///
    /// Without one, asks the view to go to the login page (returning to
    /// `redirect` afterwards) and fails with `NotAuthenticated`.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::NotAuthenticated` when signed out.
    pub fn require(&self, redirect: Option<&str>) -> Result<()> {
        if self.is_authenticated() {
            return Ok(());
        }
        let events = self.state.events();
        events.toast(ToastLevel::Warning, "Please login!");
        events.navigate(Route::Login {
            redirect: redirect.map(str::to_string),
        });
        Err(crate::error::CommerceError::NotAuthenticated)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bubblemart_core::ProductKind;
    use secrecy::ExposeSecret;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::error::CommerceError;
    use crate::events::UiEvent;
    use crate::store::CartItem;
    use crate::test_support::{envelope, line, product, signed_in_state, state};

    fn user_json() -> serde_json::Value {
        json!({
            "id": "u1",
            "email": "ada@example.com",
            "name": "Ada",
            "role": "USER",
            "totalCarts": 1,
            "totalOrders": 0,
            "totalCompletedOrders": 0
        })
    }

    #[tokio::test]
    async fn test_auth_change_loads_user_and_cart() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .and(header("authorization", "Bearer fresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(user_json())))
            .expect(1)
            .mount(&server)
            .await;
        let lines = vec![line("c1", product("g1", ProductKind::Gift, 5_000, 3), 1)];
        Mock::given(method("GET"))
            .and(path("/cart"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(lines)))
            .expect(1)
            .mount(&server)
            .await;

        let state = state(&server);
        let user = state
            .session()
            .on_auth_change(SecretString::from("fresh"))
            .await
            .unwrap();

        assert_eq!(user.name, "Ada");
        assert!(state.session_state().borrow().has_token);
        assert_eq!(state.cart_store().snapshot().len(), 1);
        assert_eq!(
            state.token_store().load().unwrap().unwrap().expose_secret(),
            "fresh"
        );
    }

    #[tokio::test]
    async fn test_unauthorized_user_fetch_tears_down() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/cart"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!([]))))
            .mount(&server)
            .await;

        let state = state(&server);
        let mut events = state.events().subscribe();
        let err = state
            .session()
            .on_auth_change(SecretString::from("stale"))
            .await
            .unwrap_err();

        assert!(err.is_unauthorized());
        assert!(!state.api().has_auth_token());
        assert!(state.token_store().load().unwrap().is_none());
        assert!(!state.cart_store().snapshot().is_loaded());
        assert_eq!(*state.session_state().borrow(), SessionState::default());

        let mut saw_home = false;
        while let Ok(event) = events.try_recv() {
            saw_home |= event == UiEvent::Navigate(Route::Home);
        }
        assert!(saw_home);
    }

    #[tokio::test]
    async fn test_logout_clears_everything() {
        let server = MockServer::start().await;
        let state = signed_in_state(&server);
        state
            .token_store()
            .save(&SecretString::from("t0k3n"))
            .unwrap();
        state.cart_store().set_all(vec![CartItem::from(line(
            "c1",
            product("l1", ProductKind::Log, 2_000, 5),
            1,
        ))]);

        state.session().logout(LogoutReason::UserInitiated);

        assert!(!state.api().has_auth_token());
        assert!(state.token_store().load().unwrap().is_none());
        assert!(state.cart_store().items().is_none());
    }

    #[tokio::test]
    async fn test_load_app_without_token_is_noop() {
        let server = MockServer::start().await;
        let state = state(&server);
        assert!(!state.session().load_app().await.unwrap());
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_require_redirects_to_login() {
        let server = MockServer::start().await;
        let state = state(&server);
        let mut events = state.events().subscribe();

        let err = state.session().require(Some("/cart")).unwrap_err();
        assert!(matches!(err, CommerceError::NotAuthenticated));

        assert_eq!(
            events.recv().await.unwrap(),
            UiEvent::Toast {
                level: ToastLevel::Warning,
                message: "Please login!".to_string()
            }
        );
        assert_eq!(
            events.recv().await.unwrap(),
            UiEvent::Navigate(Route::Login {
                redirect: Some("/cart".to_string())
            })
        );
    }
}
