//! Cart lines as held by the client.

use bubblemart_core::{CartLine, CartLineId, ProductId, format_whole};
use rust_decimal::Decimal;

use super::{Collection, Entity};

/// Currency symbol used for an empty cart's total.
const DEFAULT_CURRENCY_SYMBOL: &str = "₦";

/// What the client is doing with a line right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinePhase {
    #[default]
    Idle,
    /// A quantity update is waiting for its debounce window or in flight.
    Syncing,
    /// A delete is in flight; the line is shown dimmed and non-interactive.
    Deleting,
}

/// A cart line plus the client-only state layered on top of it.
///
/// `line.quantity` is the confirmed server value; `pending_quantity` is what
/// the user has asked for but the server has not yet acknowledged.
#[derive(Debug, Clone, PartialEq)]
pub struct CartItem {
    pub line: CartLine,
    pub pending_quantity: Option<u32>,
    pub phase: LinePhase,
}

impl CartItem {
    /// Quantity to show: the pending value if there is one.
    #[must_use]
    pub fn display_quantity(&self) -> u32 {
        self.pending_quantity.unwrap_or(self.line.quantity)
    }

    #[must_use]
    pub const fn product_id(&self) -> &ProductId {
        self.line.product_id()
    }

    /// Whether the line accepts interaction.
    #[must_use]
    pub fn is_interactive(&self) -> bool {
        self.phase != LinePhase::Deleting
    }
}

impl From<CartLine> for CartItem {
    fn from(line: CartLine) -> Self {
        Self {
            line,
            pending_quantity: None,
            phase: LinePhase::Idle,
        }
    }
}

impl Entity for CartItem {
    type Id = CartLineId;

    const ADDITIVE_SET_ALL: bool = true;

    fn id(&self) -> &CartLineId {
        &self.line.id
    }

    /// Keep the server line with the larger quantity, so a stale
    /// lower-quantity response cannot overwrite a newer one. Client-only
    /// state survives the merge.
    fn reconcile(existing: &Self, incoming: Self) -> Self {
        let line = if incoming.line.quantity >= existing.line.quantity {
            incoming.line
        } else {
            existing.line.clone()
        };
        Self {
            line,
            pending_quantity: existing.pending_quantity,
            phase: existing.phase,
        }
    }
}

impl Collection<CartItem> {
    /// True if any line ships something physical.
    #[must_use]
    pub fn needs_address(&self) -> bool {
        self.iter().any(|item| item.line.kind().requires_delivery())
    }

    /// `Σ quantity × unit price` in whole units, using displayed quantities.
    #[must_use]
    pub fn total_whole(&self) -> Decimal {
        self.iter()
            .map(|item| item.line.line_whole(item.display_quantity()))
            .sum()
    }

    /// Total formatted like the server formats amounts, e.g. `₦12,000`.
    #[must_use]
    pub fn formatted_total(&self) -> String {
        let symbol = self
            .iter()
            .next()
            .map_or(DEFAULT_CURRENCY_SYMBOL, |item| {
                item.line.product_details.amount.currency.symbol.as_str()
            });
        format_whole(symbol, self.total_whole())
    }

    /// Ids of every line, in display order.
    #[must_use]
    pub fn line_ids(&self) -> Vec<CartLineId> {
        self.iter().map(|item| item.line.id.clone()).collect()
    }
}
