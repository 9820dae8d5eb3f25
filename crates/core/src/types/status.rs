//! Status and discriminator enums shared across entities.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Order payment/fulfilment status.
///
/// Monotonic on the client: `Pending` → `Paid` → `Delivered`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Paid,
    Delivered,
}

impl OrderStatus {
    /// Whether moving from `self` to `next` keeps the status monotonic.
    #[must_use]
    pub fn can_advance_to(self, next: Self) -> bool {
        next >= self
    }
}

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[default]
    User,
    Admin,
}

/// The two kinds of product sold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductKind {
    /// Digital account credentials; quantity is the size of the credential pool.
    Log,
    /// Physical product; checkout needs delivery contact information.
    Gift,
}

impl ProductKind {
    /// Wire value used in query strings.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::Gift => "gift",
        }
    }

    /// Whether buying this kind needs a delivery address.
    #[must_use]
    pub const fn requires_delivery(self) -> bool {
        matches!(self, Self::Gift)
    }
}

impl fmt::Display for ProductKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown [`ProductKind`].
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown product type: {0} (expected `log` or `gift`)")]
pub struct UnknownProductKind(pub String);

impl FromStr for ProductKind {
    type Err = UnknownProductKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "log" | "logs" => Ok(Self::Log),
            "gift" | "gifts" => Ok(Self::Gift),
            other => Err(UnknownProductKind(other.to_owned())),
        }
    }
}
