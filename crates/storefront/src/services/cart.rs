//! Cart operations.
//!
//! Quantity changes are optimistic: the line shows the requested quantity at
//! once, and the `PUT /cart` is debounced per line. Only the last value of a
//! burst is sent, and a line never has two updates in flight.

use bubblemart_core::{CartLine, CartLineId, CartLineInput, ProductId};
use tracing::{debug, instrument, warn};

use super::{fetch_failed, mutation_failed};
use crate::error::{CommerceError, Result};
use crate::events::ToastLevel;
use crate::state::ClientState;
use crate::store::{CartItem, LinePhase};

const FETCH_FALLBACK: &str = "Error encountered whilst fetching cart list";
const ADD_FALLBACK: &str = "Unable to add product to cart! Please try again";
const UPDATE_FALLBACK: &str = "Unable to update cart! Please try again";
const REMOVE_FALLBACK: &str = "Unable to remove item from cart! Please try again";
const CLEAR_FALLBACK: &str = "Unable to clear cart! Please try again";

/// Cart service.
#[derive(Clone)]
pub struct CartService {
    state: ClientState,
}

impl CartService {
    #[must_use]
    pub const fn new(state: ClientState) -> Self {
        Self { state }
    }

    /// Load the cart. Lines are merged into what the store already holds.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails; the message is also recorded on
    /// the cart store.
    #[instrument(skip(self))]
    pub async fn fetch(&self) -> Result<()> {
        let store = self.state.cart_store();
        store.set_error(None);
        match self.state.api().get::<Vec<CartLine>>("/cart").await {
            Ok(envelope) => {
                let lines = envelope.into_data();
                debug!(count = lines.len(), "Fetched cart");
                store.set_all(lines.into_iter().map(CartItem::from).collect());
                Ok(())
            }
            Err(e) => Err(fetch_failed(&self.state, store, e.into(), FETCH_FALLBACK)),
        }
    }

    /// Add `quantity` units of a product to the cart.
    ///
    /// Rejected locally, without a request, for a zero quantity, when signed
    /// out (the view is sent to the login page instead) or when the product is
    /// known to have too little stock.
    ///
    /// # Errors
    ///
    /// Returns an error on local rejection or if the request fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add(&self, product_id: &ProductId, quantity: u32) -> Result<CartItem> {
        if quantity == 0 {
            return Err(CommerceError::InvalidQuantity(quantity));
        }
        self.state.session().require(None)?;

        if let Some(product) = self.state.catalog().find(product_id)
            && !product.has_stock_for(quantity)
        {
            let err = CommerceError::InsufficientStock {
                requested: quantity,
                available: product.quantity,
            };
            self.state
                .events()
                .toast(ToastLevel::Warning, err.user_message(ADD_FALLBACK));
            return Err(err);
        }

        let body = CartLineInput {
            product_id: product_id.clone(),
            quantity,
        };
        match self
            .state
            .api()
            .post::<_, CartLine>("/cart", &body)
            .await
        {
            Ok(envelope) => {
                let item = CartItem::from(envelope.into_data());
                self.state.cart_store().upsert(item.clone());
                self.state.events().success("Added to cart");
                Ok(item)
            }
            Err(e) => Err(mutation_failed(&self.state, e.into(), ADD_FALLBACK)),
        }
    }

    /// Ask for a new quantity on a line.
    ///
    /// The line shows `quantity` immediately; the request goes out once the
    /// line has been quiet for the debounce window.
    ///
    /// # Errors
    ///
    /// Returns an error, without touching the line, if the line is unknown,
    /// the quantity is zero or it exceeds the product's stock.
    #[instrument(skip(self), fields(line_id = %line_id))]
    pub fn update_quantity(&self, line_id: &CartLineId, quantity: u32) -> Result<()> {
        let store = self.state.cart_store();
        let item = store
            .get(line_id)
            .ok_or(CommerceError::MissingIdentifier("cart line"))?;

        if !item.is_interactive() {
            debug!("Ignoring quantity change on a line being deleted");
            return Ok(());
        }
        if quantity == 0 {
            return Err(CommerceError::InvalidQuantity(quantity));
        }

        let product = &item.line.product_details;
        if !product.has_stock_for(quantity) {
            let err = CommerceError::InsufficientStock {
                requested: quantity,
                available: product.quantity,
            };
            self.state
                .events()
                .toast(ToastLevel::Warning, err.user_message(UPDATE_FALLBACK));
            return Err(err);
        }

        store.update(line_id, |item| {
            item.pending_quantity = Some(quantity);
            item.phase = LinePhase::Syncing;
        });

        let state = self.state.clone();
        let product_id = product.id.clone();
        let key = line_id.clone();
        self.state
            .quantity_updates()
            .schedule(line_id.clone(), quantity, move |quantity| {
                let service = Self::new(state.clone());
                let line_id = key.clone();
                let product_id = product_id.clone();
                async move {
                    // Failures are reported on the line and as a toast.
                    let _ = service.commit_quantity(&line_id, &product_id, quantity).await;
                }
            });
        Ok(())
    }

    /// Wait until every scheduled quantity update has been sent and answered.
    pub async fn settle(&self) {
        self.state.quantity_updates().settle().await;
    }

    /// Send one quantity update and fold the answer into the line.
    #[instrument(skip(self), fields(line_id = %line_id, product_id = %product_id))]
    async fn commit_quantity(
        &self,
        line_id: &CartLineId,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<()> {
        let body = CartLineInput {
            product_id: product_id.clone(),
            quantity,
        };
        let result = self.state.api().put::<_, CartLine>("/cart", &body).await;
        let store = self.state.cart_store();

        match result {
            Ok(envelope) => {
                let confirmed = envelope.into_data();
                debug!(quantity = confirmed.quantity, "Quantity confirmed");
                // Written in place rather than merged: a confirmed decrease
                // must replace the higher quantity.
                store.update(line_id, |item| {
                    item.line = CartLine {
                        id: item.line.id.clone(),
                        ..confirmed
                    };
                    settle_line(item, quantity);
                });
                Ok(())
            }
            Err(e) => {
                let err = mutation_failed(&self.state, e.into(), UPDATE_FALLBACK);
                if !err.is_silent() {
                    warn!(error = %err, "Quantity update failed, restoring confirmed value");
                    store.update(line_id, |item| settle_line(item, quantity));
                }
                Err(err)
            }
        }
    }

    /// Remove a line.
    ///
    /// The line is shown as deleting until the server answers; on failure it
    /// is restored. Unknown lines are a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(line_id = %line_id))]
    pub async fn remove_line(&self, line_id: &CartLineId) -> Result<()> {
        let store = self.state.cart_store();
        let found = store.update(line_id, |item| {
            item.phase = LinePhase::Deleting;
            item.pending_quantity = None;
        });
        if !found {
            return Ok(());
        }
        self.state.quantity_updates().cancel(line_id);

        match self.state.api().delete(&format!("/cart/{line_id}")).await {
            Ok(()) => {
                store.remove(line_id);
                Ok(())
            }
            Err(e) => {
                let err = mutation_failed(&self.state, e.into(), REMOVE_FALLBACK);
                store.update(line_id, |item| item.phase = LinePhase::Idle);
                Err(err)
            }
        }
    }

    /// Empty the cart on the server, then locally.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails; the local cart is left as is.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<()> {
        match self.state.api().delete("/cart").await {
            Ok(()) => {
                self.state.quantity_updates().cancel_all();
                self.state.cart_store().clear();
                Ok(())
            }
            Err(e) => Err(mutation_failed(&self.state, e.into(), CLEAR_FALLBACK)),
        }
    }

    /// Like [`clear`](Self::clear) but without toasting a failure.
    pub(crate) async fn clear_quietly(&self) -> Result<()> {
        self.state.api().delete("/cart").await?;
        self.state.quantity_updates().cancel_all();
        self.state.cart_store().clear();
        Ok(())
    }
}

/// Collapse the pending value once the update for `sent` has finished, unless
/// a newer value is already waiting.
fn settle_line(item: &mut CartItem, sent: u32) {
    if item.pending_quantity == Some(sent) {
        item.pending_quantity = None;
    }
    if item.pending_quantity.is_none() {
        item.phase = LinePhase::Idle;
    }
}
