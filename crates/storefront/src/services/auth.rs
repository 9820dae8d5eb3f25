//! Login and registration.

use bubblemart_core::{Email, FieldErrors, User};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::{CommerceError, Result};
use crate::events::Route;
use crate::state::ClientState;

const AUTH_FALLBACK: &str = "Unknown error occurred whilst login in!";

/// Registration form input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl Registration {
    /// Check the form the way it is checked before submit.
    ///
    /// # Errors
    ///
    /// Returns one message per failing field (`name`, `email`, `password`,
    /// `confirmPassword`).
    pub fn validate(&self) -> std::result::Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.name.trim().is_empty() {
            errors.add("name", "Please provide your name");
        }
        match Email::parse(&self.email) {
            Err(bubblemart_core::EmailError::Empty) => {
                errors.add("email", "Please provide your email");
            }
            Err(e) => errors.add("email", e.to_string()),
            Ok(_) => {}
        }
        if self.password.is_empty() {
            errors.add("password", "Please provide your password");
        }
        if self.confirm_password.is_empty() {
            errors.add("confirmPassword", "Please repeat your password");
        } else if self.confirm_password != self.password {
            errors.add("confirmPassword", "Passwords do not match");
        }
        errors.into_result()
    }

    fn normalized(&self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            email: Email::parse(&self.email)
                .map_or_else(|_| self.email.trim().to_string(), Email::into_inner),
            password: self.password.clone(),
            confirm_password: self.confirm_password.clone(),
        }
    }
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct AuthToken {
    token: String,
}

#[derive(Deserialize)]
struct AuthPayload {
    auth: AuthToken,
}

/// `/auth/login` answers either inside the usual envelope or bare.
#[derive(Deserialize)]
#[serde(untagged)]
enum LoginResponse {
    Enveloped { data: AuthPayload },
    Bare(AuthPayload),
}

impl LoginResponse {
    fn into_token(self) -> SecretString {
        let (Self::Enveloped { data: payload } | Self::Bare(payload)) = self;
        SecretString::from(payload.auth.token)
    }
}

/// Authentication service.
#[derive(Clone)]
pub struct AuthService {
    state: ClientState,
}

impl AuthService {
    #[must_use]
    pub const fn new(state: ClientState) -> Self {
        Self { state }
    }

    /// Sign in and start a session with the returned token.
    ///
    /// A rejected login is returned as is; there is no session to tear down
    /// yet.
    ///
    /// # Errors
    ///
    /// Returns a `Validation` error for blank fields (no request is made), or
    /// an error if login or the follow-up user fetch fails.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let mut errors = FieldErrors::new();
        if email.trim().is_empty() {
            errors.add("email", "Please provide your email");
        }
        if password.is_empty() {
            errors.add("password", "Please provide your password");
        }
        errors.into_result()?;

        let response: LoginResponse = self
            .state
            .api()
            .post_raw(
                "/auth/login",
                &Credentials {
                    email: email.trim(),
                    password,
                },
            )
            .await?;
        info!("Login accepted");

        self.state
            .session()
            .on_auth_change(response.into_token())
            .await
    }

    /// Create an account, then send the user to the login page.
    ///
    /// # Errors
    ///
    /// Returns a `Validation` error when the form fails its checks (no
    /// request is made), or an error if the request fails. Server-side field
    /// errors are available through [`CommerceError::field_errors`].
    #[instrument(skip(self, registration), fields(email = %registration.email.trim()))]
    pub async fn register(&self, registration: &Registration) -> Result<()> {
        registration.validate()?;

        self.state
            .api()
            .post_raw::<_, serde::de::IgnoredAny>("/auth/register", &registration.normalized())
            .await?;
        info!("Account registered");

        self.state
            .events()
            .navigate(Route::Login { redirect: None });
        Ok(())
    }

    /// Banner text for a failed login or registration.
    #[must_use]
    pub fn error_message(err: &CommerceError) -> String {
        err.user_message(AUTH_FALLBACK)
    }
}
