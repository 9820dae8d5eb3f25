//! Orders, payment sessions and admin payment records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::cart::CartLine;
use super::contact::ContactInfo;
use super::id::{CartLineId, OrderId, PaymentId, UserId};
use super::status::OrderStatus;

/// A hosted payment page returned by payment initiation.
///
/// Field names follow the payment provider, not the API's camelCase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSession {
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,
}

/// An order created from the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    #[serde(default)]
    pub cart_items: Vec<CartLine>,
    #[serde(default)]
    pub checkout_details: Option<PaymentSession>,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub delivered_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub payment_initiated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub payment_reference: Option<String>,
    #[serde(default)]
    pub refunded_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub contact_information: Option<ContactInfo>,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// What the order list offers for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentAction {
    /// Paid: show the receipt.
    ViewReceipt,
    /// Unpaid with a live payment session: send the user back to it.
    CompletePayment,
    /// Unpaid without a session: initiate one.
    PayNow,
}

impl Order {
    #[must_use]
    pub const fn is_paid(&self) -> bool {
        self.paid_at.is_some()
    }

    /// Whether a refund was recorded. Independent of [`Order::status`].
    #[must_use]
    pub const fn is_refunded(&self) -> bool {
        self.refunded_at.is_some()
    }

    /// Whether fulfilling this order needs delivery details.
    #[must_use]
    pub fn needs_address(&self) -> bool {
        self.cart_items
            .iter()
            .any(|line| line.kind().requires_delivery())
    }

    #[must_use]
    pub const fn payment_action(&self) -> PaymentAction {
        if self.is_paid() {
            PaymentAction::ViewReceipt
        } else if self.checkout_details.is_some() {
            PaymentAction::CompletePayment
        } else {
            PaymentAction::PayNow
        }
    }

    /// Total in whole currency units, summed from the lines.
    #[must_use]
    pub fn total_whole(&self) -> Decimal {
        self.cart_items
            .iter()
            .map(|line| line.line_whole(line.quantity))
            .sum()
    }
}

/// Body for `POST /order`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub cart_ids: Vec<CartLineId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_information: Option<ContactInfo>,
}

/// Body for `POST /payment/:orderId`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiatePaymentRequest {
    pub callback_url: String,
}

/// An admin payment record from `/payments`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: PaymentId,
    #[serde(default)]
    pub user: Option<UserId>,
    #[serde(default)]
    pub order: Option<OrderId>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub initiated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
}

/// Human form of a provider payment method: `bank_transfer` → `Bank transfer`.
///
/// ```
/// use bubblemart_core::format_payment_method;
///
/// assert_eq!(format_payment_method(Some("bank_transfer")), "Bank transfer");
/// assert_eq!(format_payment_method(None), "-");
/// ```
#[must_use]
pub fn format_payment_method(method: Option<&str>) -> String {
    let Some(method) = method.filter(|m| !m.is_empty()) else {
        return "-".to_owned();
    };
    let spaced = method.replace('_', " ");
    let mut chars = spaced.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn pending_order() -> Order {
        serde_json::from_str(
            r#"{
                "id": "o1",
                "cartItems": [],
                "checkoutDetails": null,
                "paidAt": null,
                "deliveredAt": null,
                "paymentInitiatedAt": null,
                "paymentReference": null,
                "refundedAt": null,
                "status": "PENDING",
                "createdAt": "2024-05-01T09:30:00Z"
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_payment_action_follows_order_state() {
        let mut order = pending_order();
        assert_eq!(order.payment_action(), PaymentAction::PayNow);

        order.checkout_details = Some(PaymentSession {
            authorization_url: "https://checkout.example.com/abc".to_string(),
            access_code: "abc".to_string(),
            reference: "ref-1".to_string(),
        });
        assert_eq!(order.payment_action(), PaymentAction::CompletePayment);

        order.paid_at = Some(Utc::now());
        order.status = OrderStatus::Paid;
        assert_eq!(order.payment_action(), PaymentAction::ViewReceipt);
    }

    #[test]
    fn test_refund_does_not_change_status() {
        let mut order = pending_order();
        order.status = OrderStatus::Paid;
        order.refunded_at = Some(Utc::now());
        assert!(order.is_refunded());
        assert_eq!(order.status, OrderStatus::Paid);
    }

    #[test]
    fn test_create_order_omits_missing_contact() {
        let request = CreateOrderRequest {
            cart_ids: vec![CartLineId::new("c1")],
            contact_information: None,
        };
        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            r#"{"cartIds":["c1"]}"#
        );
    }

    #[test]
    fn test_format_payment_method() {
        assert_eq!(format_payment_method(Some("card")), "Card");
        assert_eq!(format_payment_method(Some("mobile_money")), "Mobile money");
        assert_eq!(format_payment_method(Some("")), "-");
    }
}
