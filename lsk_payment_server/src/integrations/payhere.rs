//! PayHere gateway integration: the wire format of payment notifications, signature verification, and conversion
//! into the engine's [`PaymentEvent`].
//!
//! PayHere signs each server-to-server notification with
//! `md5sig = UPPER(md5(merchant_id + order_id + amount + currency + status_code + UPPER(md5(merchant_secret))))`.
//! The signature is recomputed over the raw delivered strings, before any of them is parsed, and compared in
//! constant time. Nothing downstream of this module ever sees an unverified notification.

use std::fmt::Display;

use lsk_common::{Money, Secret};
use lsk_payment_engine::db_types::PaymentEvent;
use md5::{Digest, Md5};
use serde::Deserialize;
use subtle::ConstantTimeEq;
use thiserror::Error;

/// PayHere's final-success status. All other codes are acknowledged and ignored.
pub const STATUS_SUCCESS: &str = "2";

//--------------------------------------  PayHereNotification  -------------------------------------------------------
/// The fields PayHere delivers in a notify callback, JSON or form-encoded. All values arrive as strings and are kept
/// that way until the signature has been checked.
#[derive(Debug, Clone, Deserialize)]
pub struct PayHereNotification {
    pub merchant_id: String,
    pub order_id: String,
    pub payment_id: String,
    pub payhere_amount: String,
    pub payhere_currency: String,
    pub status_code: String,
    pub md5sig: String,
    /// The owning user id.
    #[serde(default)]
    pub custom_1: String,
    /// The payment purpose tag, e.g. "wallet_deposit".
    #[serde(default)]
    pub custom_2: String,
}

/// PayHere status codes: 2 success, 0 pending, -1 cancelled, -2 failed, -3 chargeback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Success,
    Pending,
    Cancelled,
    Failed,
    Chargeback,
    Unknown,
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentStatus::Success => "success",
            PaymentStatus::Pending => "pending",
            PaymentStatus::Cancelled => "cancelled",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Chargeback => "chargeback",
            PaymentStatus::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

impl PayHereNotification {
    pub fn status(&self) -> PaymentStatus {
        match self.status_code.as_str() {
            STATUS_SUCCESS => PaymentStatus::Success,
            "0" => PaymentStatus::Pending,
            "-1" => PaymentStatus::Cancelled,
            "-2" => PaymentStatus::Failed,
            "-3" => PaymentStatus::Chargeback,
            _ => PaymentStatus::Unknown,
        }
    }
}

//--------------------------------------   SignatureVerifier   -------------------------------------------------------
#[derive(Debug, Clone, Error)]
pub enum SignatureError {
    #[error("The merchant id in the notification is not ours.")]
    MerchantIdMismatch,
    #[error("The delivered md5sig does not match the computed signature.")]
    SignatureMismatch,
}

/// Verifies that a notification genuinely originated from PayHere and was not tampered with in transit.
///
/// Constructed from explicitly injected configuration so it can be swapped per environment and built with
/// throwaway credentials in tests.
#[derive(Clone)]
pub struct SignatureVerifier {
    merchant_id: String,
    merchant_secret: Secret<String>,
}

impl SignatureVerifier {
    pub fn new(merchant_id: &str, merchant_secret: Secret<String>) -> Self {
        Self { merchant_id: merchant_id.to_string(), merchant_secret }
    }

    /// Recompute the signature PayHere should have sent for these raw field values.
    pub fn expected_signature(&self, order_id: &str, amount: &str, currency: &str, status_code: &str) -> String {
        let secret_hash = md5_hex_upper(self.merchant_secret.reveal().as_bytes());
        let base = format!("{}{order_id}{amount}{currency}{status_code}{secret_hash}", self.merchant_id);
        md5_hex_upper(base.as_bytes())
    }

    /// Hard gate: no state may be touched unless this returns `Ok`.
    pub fn verify(&self, n: &PayHereNotification) -> Result<(), SignatureError> {
        if n.merchant_id != self.merchant_id {
            return Err(SignatureError::MerchantIdMismatch);
        }
        let expected =
            self.expected_signature(&n.order_id, &n.payhere_amount, &n.payhere_currency, &n.status_code);
        if expected.as_bytes().ct_eq(n.md5sig.as_bytes()).into() {
            Ok(())
        } else {
            Err(SignatureError::SignatureMismatch)
        }
    }
}

fn md5_hex_upper(data: &[u8]) -> String {
    hex::encode_upper(Md5::digest(data))
}

//--------------------------------------      Conversion       -------------------------------------------------------
#[derive(Debug, Clone, Error)]
pub enum NotificationConversionError {
    #[error("The notification contained an invalid amount: {0}")]
    InvalidAmount(String),
    #[error("The notification is missing the owning user id (custom_1).")]
    MissingOwner,
}

/// Convert a verified, successful notification into a payment event for the engine. Amounts must parse as
/// fixed-point decimals and be strictly positive; the owning user id is required.
pub fn payment_event_from_notification(
    n: PayHereNotification,
) -> Result<PaymentEvent, NotificationConversionError> {
    let amount = n
        .payhere_amount
        .parse::<Money>()
        .map_err(|_| NotificationConversionError::InvalidAmount(n.payhere_amount.clone()))?;
    if !amount.is_positive() {
        return Err(NotificationConversionError::InvalidAmount(n.payhere_amount));
    }
    if n.custom_1.is_empty() {
        return Err(NotificationConversionError::MissingOwner);
    }
    Ok(PaymentEvent {
        payment_id: n.payment_id.into(),
        order_id: n.order_id.into(),
        owner_user_id: n.custom_1,
        purpose_tag: n.custom_2,
        amount,
        currency_code: n.payhere_currency,
    })
}
