//! Account commands: login, registration, logout and the current user.

use bubblemart_storefront::services::{AuthService, Registration, UserService};
use bubblemart_storefront::{ClientState, LogoutReason};

use crate::error::CliError;
use crate::render;

/// Sign in and persist the token for later commands.
pub async fn login(state: &ClientState, email: &str, password: &str) -> Result<(), CliError> {
    let user = state
        .auth()
        .login(email, password)
        .await
        .map_err(|e| {
            let message = AuthService::error_message(&e);
            CliError::reported(e, message)
        })?;
    tracing::info!(user_id = %user.id, "Signed in");
    render::message(&format!("Welcome back, {}", user.name));
    Ok(())
}

/// Create an account.
pub async fn register(state: &ClientState, registration: &Registration) -> Result<(), CliError> {
    state.auth().register(registration).await.map_err(|e| {
        let message = AuthService::error_message(&e);
        CliError::reported(e, message)
    })?;
    render::message("Account created, you can now log in");
    Ok(())
}

pub fn logout(state: &ClientState) {
    state.session().logout(LogoutReason::UserInitiated);
}

/// Show the signed-in user.
pub async fn whoami(state: &ClientState) -> Result<(), CliError> {
    state.session().require(None)?;
    let user = state.users().current().await.map_err(|e| {
        let message = UserService::detail_error_message(&e);
        CliError::reported(e, message)
    })?;
    render::user(&user);
    Ok(())
}
