//! Cart lines as returned by `/cart`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{CartLineId, ProductId};
use super::money::Money;
use super::product::Product;
use super::status::ProductKind;

/// One product reserved in the current user's cart.
///
/// The line id is distinct from the product id; updates go through
/// `PUT /cart` keyed by product, deletes through `DELETE /cart/:id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub id: CartLineId,
    pub product_details: Product,
    pub quantity: u32,
    pub total_price: Money,
    #[serde(default)]
    pub is_available: Option<bool>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub delivered_at: Option<DateTime<Utc>>,
}

impl CartLine {
    /// Product behind this line.
    #[must_use]
    pub const fn product_id(&self) -> &ProductId {
        &self.product_details.id
    }

    #[must_use]
    pub const fn kind(&self) -> ProductKind {
        self.product_details.kind
    }

    /// `quantity × unit price` in whole currency units.
    #[must_use]
    pub fn line_whole(&self, quantity: u32) -> Decimal {
        Decimal::from(quantity).saturating_mul(self.product_details.amount.whole)
    }
}

/// Body for `POST /cart` and `PUT /cart`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineInput {
    pub product_id: ProductId,
    pub quantity: u32,
}
