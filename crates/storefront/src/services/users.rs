//! Current user and the admin customer views.

use bubblemart_core::{User, UserId};
use tracing::{debug, instrument};

use super::{fetch_list, fetch_next};
use crate::error::{CommerceError, Result, set_sentry_user};
use crate::state::ClientState;

const CURRENT_FALLBACK: &str = "Unknown error occurred whilst fetching user details";
const LIST_FALLBACK: &str = "Unknown error occurred whilst fetching users!";

/// User service.
#[derive(Clone)]
pub struct UserService {
    state: ClientState,
}

impl UserService {
    #[must_use]
    pub const fn new(state: ClientState) -> Self {
        Self { state }
    }

    /// Load the signed-in user into the session state.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails. A 401 ends the session; any
    /// other failure is recorded on the session state.
    #[instrument(skip(self))]
    pub async fn current(&self) -> Result<User> {
        let session = self.state.session_tx();
        session.send_modify(|s| s.error = None);

        match self.state.api().get::<User>("/user").await {
            Ok(envelope) => {
                let user = envelope.into_data();
                debug!(user_id = %user.id, "Loaded current user");
                set_sentry_user(&user.id, Some(&user.email));
                session.send_modify(|s| {
                    s.user = Some(user.clone());
                    s.error = None;
                });
                Ok(user)
            }
            Err(e) => {
                let err = self.state.intercept(e.into());
                if !err.is_silent() && !err.is_unauthorized() {
                    let message = err.user_message(CURRENT_FALLBACK);
                    session.send_modify(|s| s.error = Some(message));
                }
                Err(err)
            }
        }
    }

    /// Load the customer list (admin).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails; the message is also recorded on
    /// the store.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<()> {
        fetch_list(&self.state, self.state.user_store(), "/users", LIST_FALLBACK).await
    }

    /// Load the next page of customers, if there is one.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn load_next_page(&self) -> Result<bool> {
        fetch_next(
            &self.state,
            self.state.user_store(),
            |page| format!("/users?page={page}"),
            LIST_FALLBACK,
        )
        .await
    }

    /// Fetch one customer (admin). A listed copy is refreshed with the result.
    ///
    /// # Errors
    ///
    /// Returns `MissingIdentifier` for a blank id, or an error if the request
    /// fails.
    #[instrument(skip(self), fields(user_id = %id))]
    pub async fn get(&self, id: &UserId) -> Result<User> {
        if id.is_blank() {
            return Err(CommerceError::MissingIdentifier("user id"));
        }
        let user = self
            .state
            .api()
            .get::<User>(&format!("/user/{id}"))
            .await
            .map_err(|e| self.state.intercept(e.into()))?
            .into_data();

        self.state
            .user_store()
            .update(id, |listed| *listed = user.clone());
        Ok(user)
    }

    /// Message to show when [`get`](Self::get) or [`current`](Self::current)
    /// fails.
    #[must_use]
    pub fn detail_error_message(err: &CommerceError) -> String {
        match err {
            CommerceError::MissingIdentifier(_) => "User ID not found!".to_string(),
            _ => err.user_message(CURRENT_FALLBACK),
        }
    }
}
