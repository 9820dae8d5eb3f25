//! Delivery contact information for gift orders.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::field_errors::FieldErrors;

/// Phone numbers: optional leading `+`, then 7 to 15 digits.
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9]{7,15}$").expect("Invalid regex"));

/// Contact information attached to an order that ships something physical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfo {
    pub sender_name: String,
    pub receiver_name: String,
    pub receiver_address: String,
    pub receiver_phone_number: String,
    #[serde(default)]
    pub short_note: String,
    #[serde(default)]
    pub longitude: f64,
    #[serde(default)]
    pub latitude: f64,
}

impl ContactInfo {
    /// Check the fields a delivery cannot go out without.
    ///
    /// Names and address must be non-blank; the phone number must match
    /// `+?[0-9]{7,15}` once spaces and dashes are removed. Errors are keyed by
    /// the wire field name.
    ///
    /// # Errors
    ///
    /// Returns every failing field at once.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();

        if self.sender_name.trim().is_empty() {
            errors.add("senderName", "Sender's name is required");
        }
        if self.receiver_name.trim().is_empty() {
            errors.add("receiverName", "Receiver's name is required");
        }
        if self.receiver_address.trim().is_empty() {
            errors.add("receiverAddress", "Receiver's address is required");
        }

        let phone = normalize_phone(&self.receiver_phone_number);
        if phone.is_empty() {
            errors.add("receiverPhoneNumber", "Receiver's phone number is required");
        } else if !PHONE_RE.is_match(&phone) {
            errors.add("receiverPhoneNumber", "Enter a valid phone number");
        }

        errors.into_result()
    }

    /// Copy with whitespace trimmed and the phone number normalized.
    #[must_use]
    pub fn normalized(&self) -> Self {
        Self {
            sender_name: self.sender_name.trim().to_owned(),
            receiver_name: self.receiver_name.trim().to_owned(),
            receiver_address: self.receiver_address.trim().to_owned(),
            receiver_phone_number: normalize_phone(&self.receiver_phone_number),
            short_note: self.short_note.trim().to_owned(),
            longitude: self.longitude,
            latitude: self.latitude,
        }
    }
}

fn normalize_phone(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect()
}
