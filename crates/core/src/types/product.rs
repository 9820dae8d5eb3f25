//! Catalog types: products and the credential records behind log products.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{LogId, ProductId, UserId};
use super::money::Money;
use super::status::ProductKind;

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ProductKind,
    /// Units available. For logs this is the number of unassigned credentials.
    pub quantity: u32,
    pub amount: Money,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub total_sales: u64,
}

impl Product {
    /// Whether at least `quantity` units can be reserved.
    #[must_use]
    pub const fn has_stock_for(&self, quantity: u32) -> bool {
        quantity <= self.quantity
    }
}

/// One credential row submitted when creating a log product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LogInput {
    pub email: String,
    pub password: String,
}

impl LogInput {
    /// Rows missing either field are dropped before submission.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.email.trim().is_empty() && !self.password.trim().is_empty()
    }
}

/// Body for `POST /product`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ProductKind,
    pub quantity: u32,
    pub amount: Decimal,
    pub image: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<Vec<LogInput>>,
}

impl NewProduct {
    /// Drop incomplete credential rows, the way the product form does.
    #[must_use]
    pub fn without_incomplete_logs(mut self) -> Self {
        if let Some(logs) = self.logs.take() {
            self.logs = Some(logs.into_iter().filter(LogInput::is_complete).collect());
        }
        self
    }
}

/// Body for `PATCH /product/:id`. Only set fields are sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProductUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Replacement credential pool for a log product.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<Vec<LogInput>>,
}

impl ProductUpdate {
    /// Replace the credential pool. Incomplete rows are dropped and the
    /// quantity follows the number of submitted rows.
    #[must_use]
    pub fn with_logs(mut self, logs: Vec<LogInput>) -> Self {
        let logs: Vec<LogInput> = logs.into_iter().filter(LogInput::is_complete).collect();
        self.quantity = Some(u32::try_from(logs.len()).unwrap_or(u32::MAX));
        self.logs = Some(logs);
        self
    }
}

/// A product reference that the API sometimes populates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductRef {
    Id(ProductId),
    Details(Box<Product>),
}

impl ProductRef {
    /// The referenced product's id either way.
    #[must_use]
    pub fn id(&self) -> &ProductId {
        match self {
            Self::Id(id) => id,
            Self::Details(product) => &product.id,
        }
    }
}

/// A credential record backing one unit of a log product.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogCredential {
    pub id: LogId,
    pub email: String,
    pub password: String,
    /// Buyer the credential was handed to, if sold.
    #[serde(default)]
    pub assigned_to: Option<UserId>,
    #[serde(rename = "productId", default)]
    pub product: Option<ProductRef>,
}

impl core::fmt::Debug for LogCredential {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LogCredential")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("assigned_to", &self.assigned_to)
            .finish_non_exhaustive()
    }
}
