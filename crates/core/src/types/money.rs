//! Server-formatted monetary amounts.
//!
//! The API always sends money pre-formatted. The client treats it as
//! display-only, with one exception: running totals are summed from the
//! `whole` component and formatted with [`format_whole`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Currency attached to an amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    /// Display symbol (e.g. `₦`).
    pub symbol: String,
    /// Currency name (e.g. `NGN`).
    pub name: String,
}

/// Pre-formatted strings for an amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedAmount {
    /// e.g. `₦5,000`
    pub with_currency: String,
    /// e.g. `5,000`
    pub without_currency: String,
}

/// An amount as supplied by the API (`AmountType`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in the smallest unit the server uses.
    pub amount: Decimal,
    /// Amount in whole currency units; the only field the client sums.
    /// Usually integral, but the API may send a fraction.
    pub whole: Decimal,
    /// Currency details.
    pub currency: Currency,
    /// Display strings.
    pub formatted: FormattedAmount,
}

impl Money {
    /// Build an amount from whole units, formatting it the way the API does.
    ///
    /// Used for client-side running totals and for test fixtures.
    #[must_use]
    pub fn from_whole(whole: impl Into<Decimal>, currency: Currency) -> Self {
        let whole = whole.into();
        let without_currency = group_thousands(whole);
        Self {
            amount: whole,
            whole,
            formatted: FormattedAmount {
                with_currency: format!("{}{without_currency}", currency.symbol),
                without_currency,
            },
            currency,
        }
    }

    /// Display string including the currency symbol.
    #[must_use]
    pub fn display(&self) -> &str {
        &self.formatted.with_currency
    }
}

/// Format whole units with a currency symbol and thousands separators.
///
/// Fractions are kept, without trailing zeros.
///
/// ```
/// use bubblemart_core::format_whole;
/// use rust_decimal::Decimal;
///
/// assert_eq!(format_whole("₦", Decimal::from(12_000)), "₦12,000");
/// assert_eq!(format_whole("₦", Decimal::from(-1_500)), "-₦1,500");
/// assert_eq!(format_whole("₦", Decimal::new(15_005, 1)), "₦1,500.5");
/// ```
#[must_use]
pub fn format_whole(symbol: &str, whole: Decimal) -> String {
    if whole.is_sign_negative() && !whole.is_zero() {
        format!("-{symbol}{}", group_thousands(whole))
    } else {
        format!("{symbol}{}", group_thousands(whole))
    }
}

/// Digits of `|value|` with the integer part grouped in threes with commas.
fn group_thousands(value: Decimal) -> String {
    let text = value.abs().normalize().to_string();
    let (digits, fraction) = match text.split_once('.') {
        Some((digits, fraction)) => (digits, Some(fraction)),
        None => (text.as_str(), None),
    };

    let mut out = String::with_capacity(text.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if let Some(fraction) = fraction {
        out.push('.');
        out.push_str(fraction);
    }
    out
}
