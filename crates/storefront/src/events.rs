//! Events the core asks the view layer to act on.
//!
//! Toasts, in-app navigation and full-page redirects are published on a
//! broadcast bus. A view subscribes once and renders whatever arrives.

use std::fmt;

use bubblemart_core::OrderId;
use tokio::sync::broadcast;
use tracing::debug;

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Success,
    Info,
    Warning,
    Error,
}

/// In-app destinations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    /// Login page, returning to `redirect` afterwards.
    Login { redirect: Option<String> },
    Cart,
    Orders,
    /// Payment return page for an order.
    OrderSuccess(OrderId),
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Home => f.write_str("/"),
            Self::Login { redirect: None } => f.write_str("/auth/login"),
            Self::Login {
                redirect: Some(path),
            } => write!(f, "/auth/login?redirect={path}"),
            Self::Cart => f.write_str("/cart"),
            Self::Orders => f.write_str("/orders"),
            Self::OrderSuccess(id) => write!(f, "/orders/{id}/success"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    Toast { level: ToastLevel, message: String },
    Navigate(Route),
    /// Leave the app for an external URL (payment provider).
    Redirect(String),
}

/// Broadcast bus for [`UiEvent`]s. Clones publish to the same subscribers.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<UiEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<UiEvent> {
        self.tx.subscribe()
    }

    /// Publish an event. Dropped silently when nobody is listening.
    pub fn emit(&self, event: UiEvent) {
        debug!(?event, "UI event");
        let _ = self.tx.send(event);
    }

    pub fn toast(&self, level: ToastLevel, message: impl Into<String>) {
        self.emit(UiEvent::Toast {
            level,
            message: message.into(),
        });
    }

    pub fn success(&self, message: impl Into<String>) {
        self.toast(ToastLevel::Success, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.toast(ToastLevel::Error, message);
    }

    pub fn navigate(&self, route: Route) {
        self.emit(UiEvent::Navigate(route));
    }
}
