//! Payment initiation, verification and the admin payment list.
//!
//! Verification is safe to repeat. Once an order comes back paid it is kept
//! for the rest of the session and never verified again.

use bubblemart_core::{InitiatePaymentRequest, Order, OrderId, PaymentSession};
use tracing::{debug, info, instrument};
use url::Url;

use super::{fetch_list, fetch_next};
use crate::error::{CommerceError, Result};
use crate::events::UiEvent;
use crate::state::ClientState;

const LIST_FALLBACK: &str = "Unknown error occurred whilst fetching payments!";
const VERIFY_FALLBACK: &str = "Unknown error occurred whilst fetching order!";

/// Loading text for the receipt page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptCopy {
    /// Just back from the payment provider.
    Verifying,
    /// Opening the receipt of an order already known to be paid.
    Fetching,
}

impl ReceiptCopy {
    /// Pick the copy: a known payment reference means the order was paid
    /// before this visit.
    #[must_use]
    pub fn for_reference(reference: Option<&str>) -> Self {
        match reference {
            Some(r) if !r.trim().is_empty() => Self::Fetching,
            _ => Self::Verifying,
        }
    }

    #[must_use]
    pub const fn loading_text(self) -> &'static str {
        match self {
            Self::Verifying => "Verifying order...",
            Self::Fetching => "Fetching details...",
        }
    }
}

/// Payment service.
#[derive(Clone)]
pub struct PaymentService {
    state: ClientState,
}

impl PaymentService {
    #[must_use]
    pub const fn new(state: ClientState) -> Self {
        Self { state }
    }

    /// Start a payment session for an order.
    ///
    /// The provider sends the user back to the order's success page. Any
    /// listed copy of the order gets the new session attached.
    ///
    /// # Errors
    ///
    /// Returns `MissingIdentifier` for a blank id, or an error if the request
    /// fails.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn initiate(&self, order_id: &OrderId) -> Result<PaymentSession> {
        if order_id.is_blank() {
            return Err(CommerceError::MissingIdentifier("order id"));
        }
        let body = InitiatePaymentRequest {
            callback_url: self.state.config().payment_callback_url(order_id),
        };
        let session = self
            .state
            .api()
            .post::<_, PaymentSession>(&format!("/payment/{order_id}"), &body)
            .await
            .map_err(|e| self.state.intercept(e.into()))?
            .into_data();
        info!(reference = %session.reference, "Payment session created");

        for store in [self.state.order_store(), self.state.admin_order_store()] {
            store.update(order_id, |order| {
                order.checkout_details = Some(session.clone());
            });
        }
        Ok(session)
    }

    /// Send the view to an external payment page.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRedirect` unless `url` is an absolute `http(s)` URL.
    pub fn redirect(&self, url: &str) -> Result<()> {
        let url = validate_redirect(url)?;
        self.state.events().emit(UiEvent::Redirect(url.to_string()));
        Ok(())
    }

    /// Verify (or re-fetch) the payment result of an order.
    ///
    /// # Errors
    ///
    /// Returns `MissingIdentifier` (not retryable) for a blank id, or an error
    /// if the request fails.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn verify(&self, order_id: &OrderId) -> Result<Order> {
        if order_id.is_blank() {
            return Err(CommerceError::MissingIdentifier("order id"));
        }
        if let Some(order) = self.state.paid_orders().get(order_id).await {
            debug!("Order already confirmed paid");
            return Ok(order);
        }

        let order = self
            .state
            .api()
            .get::<Order>(&format!("/payment/{order_id}"))
            .await
            .map_err(|e| self.state.intercept(e.into()))?
            .into_data();

        if order.is_paid() {
            info!("Payment confirmed");
            self.state
                .paid_orders()
                .insert(order_id.clone(), order.clone())
                .await;
        }
        self.state.orders().replace_listed(&order);
        Ok(order)
    }

    /// Message to show when [`verify`](Self::verify) fails.
    #[must_use]
    pub fn verify_error_message(err: &CommerceError) -> String {
        match err {
            CommerceError::MissingIdentifier(_) => "Order ID not found!".to_string(),
            _ => err.user_message(VERIFY_FALLBACK),
        }
    }

    /// Load the payment records (admin).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails; the message is also recorded on
    /// the store.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<()> {
        fetch_list(
            &self.state,
            self.state.payment_store(),
            "/payments",
            LIST_FALLBACK,
        )
        .await
    }

    /// Load the next page of payment records, if there is one.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn load_next_page(&self) -> Result<bool> {
        fetch_next(
            &self.state,
            self.state.payment_store(),
            |page| format!("/payments?page={page}"),
            LIST_FALLBACK,
        )
        .await
    }
}

/// Accept only absolute `http(s)` URLs with a host.
///
/// # Errors
///
/// Returns `InvalidRedirect` otherwise.
pub fn validate_redirect(raw: &str) -> Result<Url> {
    let invalid = || CommerceError::InvalidRedirect(raw.to_string());
    let url = Url::parse(raw.trim()).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none_or(str::is_empty) {
        return Err(invalid());
    }
    Ok(url)
}
