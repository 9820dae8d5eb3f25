//! Bubblemart storefront library.
//!
//! The commerce state core behind every Bubblemart front end: the REST
//! gateway client, observable entity stores, the commerce services, checkout
//! orchestration and the session lifecycle. A view layer builds one
//! [`ClientState`], subscribes to the stores and the [`EventBus`], and calls
//! the services.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod checkout;
pub mod config;
pub mod debounce;
pub mod error;
pub mod events;
pub mod services;
pub mod session;
pub mod state;
pub mod store;

#[cfg(test)]
mod test_support;

pub use checkout::{Checkout, CheckoutPhase, CheckoutState};
pub use config::{ClientConfig, ConfigError};
pub use error::{CommerceError, Result};
pub use events::{EventBus, Route, ToastLevel, UiEvent};
pub use session::{LogoutReason, Session, SessionState};
pub use state::ClientState;
