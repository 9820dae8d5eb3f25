//! Checkout orchestration.
//!
//! One attempt walks the cart through order creation, cart clearing and
//! payment initiation, then hands the browser to the payment provider:
//!
//! ```text
//! Idle -> ValidatingContact (gift carts only) -> CreatingOrder -> ClearingCart
//!      -> InitiatingPayment -> Redirecting
//! any step -> Failed -> Idle
//! ```
//!
//! Nothing is rolled back. An order whose payment could not be initiated stays
//! `PENDING` on the server and is picked up again through
//! [`Checkout::resume_payment`], which starts at `InitiatingPayment`.

use bubblemart_core::{
    ContactInfo, CreateOrderRequest, FieldErrors, Order, OrderId, PaymentAction, PaymentSession,
};
use tokio::sync::watch;
use tracing::{info, instrument, warn};

use crate::error::{CommerceError, Result};
use crate::events::Route;
use crate::state::ClientState;

const CREATE_FALLBACK: &str = "Unable to create order! Please try again";
const PAYMENT_FALLBACK: &str = "Unable to initiate payment! Please try again";

/// Where an attempt is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckoutPhase {
    #[default]
    Idle,
    ValidatingContact,
    CreatingOrder,
    ClearingCart,
    InitiatingPayment,
    /// The browser is leaving for the payment page. Terminal.
    Redirecting,
    /// A step failed; the banner says which. The user may retry.
    Failed,
}

impl CheckoutPhase {
    /// Whether a new attempt may start from here.
    #[must_use]
    pub const fn is_ready(self) -> bool {
        matches!(self, Self::Idle | Self::Failed)
    }
}

/// What the checkout form renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckoutState {
    pub phase: CheckoutPhase,
    /// Dismissible error shown above the form.
    pub banner: Option<String>,
    /// Per-field contact form errors.
    pub field_errors: FieldErrors,
    /// Order created by this attempt, kept after a payment failure.
    pub order_id: Option<OrderId>,
}

/// Checkout flow over the shared client state.
///
/// Holds its own observable state, so a view keeps one instance per checkout
/// form.
pub struct Checkout {
    state: ClientState,
    tx: watch::Sender<CheckoutState>,
}

impl Checkout {
    #[must_use]
    pub fn new(state: ClientState) -> Self {
        let (tx, _rx) = watch::channel(CheckoutState::default());
        Self { state, tx }
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CheckoutState> {
        self.tx.subscribe()
    }

    #[must_use]
    pub fn snapshot(&self) -> CheckoutState {
        self.tx.borrow().clone()
    }

    /// Close the error banner and return to `Idle`.
    pub fn dismiss_banner(&self) {
        self.tx.send_modify(|s| {
            s.banner = None;
            if s.phase == CheckoutPhase::Failed {
                s.phase = CheckoutPhase::Idle;
            }
        });
    }

    fn enter(&self, phase: CheckoutPhase) {
        self.tx.send_modify(|s| s.phase = phase);
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Check out the whole cart.
    ///
    /// `contact` is required (and validated) only when the cart holds a gift
    /// line. For log-only carts it is ignored.
    ///
    /// # Errors
    ///
    /// Returns `NotAuthenticated` when signed out, a `Validation` error when
    /// the cart is empty or the contact form fails (no request is made), or
    /// the error of the step that failed.
    #[instrument(skip(self, contact))]
    pub async fn run(&self, contact: Option<ContactInfo>) -> Result<PaymentSession> {
        self.state.session().require(Some(&Route::Cart.to_string()))?;
        self.tx.send_replace(CheckoutState::default());

        let cart = self.state.cart_store().snapshot();
        if cart.is_empty() {
            let mut errors = FieldErrors::new();
            errors.add("cart", "Your cart is empty");
            return Err(self.reject_form(errors));
        }

        let contact_information = if cart.needs_address() {
            self.enter(CheckoutPhase::ValidatingContact);
            let contact = contact.unwrap_or_default();
            if let Err(errors) = contact.validate() {
                return Err(self.reject_form(errors));
            }
            Some(contact.normalized())
        } else {
            None
        };

        self.enter(CheckoutPhase::CreatingOrder);
        let request = CreateOrderRequest {
            cart_ids: cart.line_ids(),
            contact_information,
        };
        let order = match self.state.orders().create(&request).await {
            Ok(order) => order,
            Err(e) => return Err(self.fail(e, CREATE_FALLBACK)),
        };
        self.tx.send_modify(|s| s.order_id = Some(order.id.clone()));

        self.enter(CheckoutPhase::ClearingCart);
        if let Err(e) = self.state.cart().clear_quietly().await {
            warn!(error = %e, order_id = %order.id, "Failed to clear cart after checkout");
        }

        self.pay(&order.id).await
    }

    /// Continue paying for an existing order, from its order card.
    ///
    /// A paid order opens its receipt. An order with a live payment session
    /// goes straight back to it without a request. Anything else initiates a
    /// new session.
    ///
    /// # Errors
    ///
    /// Returns the error of the payment step; it is also toasted.
    #[instrument(skip(self, order), fields(order_id = %order.id))]
    pub async fn resume_payment(&self, order: &Order) -> Result<()> {
        match order.payment_action() {
            PaymentAction::ViewReceipt => {
                self.state
                    .events()
                    .navigate(Route::OrderSuccess(order.id.clone()));
                Ok(())
            }
            PaymentAction::CompletePayment => {
                let url = order
                    .checkout_details
                    .as_ref()
                    .map(|session| session.authorization_url.as_str())
                    .unwrap_or_default();
                self.enter(CheckoutPhase::Redirecting);
                self.state.payments().redirect(url).inspect_err(|e| {
                    self.state.events().error(e.user_message(PAYMENT_FALLBACK));
                    self.enter(CheckoutPhase::Idle);
                })
            }
            PaymentAction::PayNow => {
                self.tx.send_modify(|s| {
                    *s = CheckoutState {
                        order_id: Some(order.id.clone()),
                        ..CheckoutState::default()
                    };
                });
                match self.pay(&order.id).await {
                    Ok(_) => Ok(()),
                    Err(e) => {
                        if !e.is_silent() && !e.is_unauthorized() {
                            self.state.events().error(e.user_message(PAYMENT_FALLBACK));
                        }
                        self.dismiss_banner();
                        Err(e)
                    }
                }
            }
        }
    }

    /// Initiate a payment session for `order_id` and redirect to it.
    async fn pay(&self, order_id: &OrderId) -> Result<PaymentSession> {
        self.enter(CheckoutPhase::InitiatingPayment);
        let session = match self.state.payments().initiate(order_id).await {
            Ok(session) => session,
            Err(e) => return Err(self.fail(e, PAYMENT_FALLBACK)),
        };

        self.enter(CheckoutPhase::Redirecting);
        if let Err(e) = self.state.payments().redirect(&session.authorization_url) {
            return Err(self.fail(e, PAYMENT_FALLBACK));
        }
        info!(order_id = %order_id, "Redirecting to payment provider");
        Ok(session)
    }

    fn reject_form(&self, errors: FieldErrors) -> CommerceError {
        self.tx.send_modify(|s| {
            s.phase = CheckoutPhase::Idle;
            s.field_errors = errors.clone();
        });
        CommerceError::Validation(errors)
    }

    /// Record a failed step. Cancellations and expired sessions go back to
    /// `Idle` without a banner.
    fn fail(&self, err: CommerceError, fallback: &str) -> CommerceError {
        let quiet = err.is_silent() || err.is_unauthorized();
        if !quiet {
            warn!(error = %err, "Checkout step failed");
        }
        self.tx.send_modify(|s| {
            if quiet {
                s.phase = CheckoutPhase::Idle;
                s.banner = None;
            } else {
                s.phase = CheckoutPhase::Failed;
                s.banner = Some(err.user_message(fallback));
                if let Some(errors) = err.field_errors() {
                    s.field_errors = errors.clone();
                }
            }
        });
        err
    }
}
