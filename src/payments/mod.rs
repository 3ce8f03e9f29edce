//! Usage: PaymentProvider trait - the abstraction behind every checkout flow.
//!
//! Each gateway (Razorpay, PhonePe, QR) implements this trait to customize
//! checkout behavior. Business logic dispatches through
//! `PaymentProviderRegistry` instead of hardcoded gateway branches; the
//! hosting environment loads gateway SDKs and feeds their callbacks back in.

pub(crate) mod phonepe;
pub(crate) mod qr;
pub(crate) mod razorpay;
pub(crate) mod registry;

use std::future::Future;
use std::pin::Pin;

use rand::Rng;
use serde_json::Value;

use crate::client::MedikartClient;
use crate::shared::error::AppResult;

/// What the caller wants to charge, before any gateway is involved.
#[derive(Debug, Clone)]
pub struct CheckoutIntent {
    pub amount_paise: i64,
    pub currency: String,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    /// Where the gateway should land the user afterwards (provider-specific use).
    pub redirect_url: Option<String>,
}

impl CheckoutIntent {
    pub fn new(amount_paise: i64) -> Self {
        Self {
            amount_paise,
            currency: "INR".to_string(),
            customer_email: None,
            customer_phone: None,
            redirect_url: None,
        }
    }
}

/// Everything the hosting environment needs to open a gateway checkout:
/// the backend order id plus the provider-specific configuration payload.
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub provider: &'static str,
    pub order_id: String,
    pub payload: Value,
    pub redirect_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    Verified { order_id: String },
    Pending,
    Failed { reason: String },
}

/// Each gateway implements this trait.
///
/// Object-safe so the registry can hold `Box<dyn PaymentProvider>`; async
/// methods therefore return boxed futures.
pub trait PaymentProvider: Send + Sync {
    /// The provider key ("razorpay", "phonepe", "qr").
    fn key(&self) -> &'static str;

    /// Create a backend payment order and build the gateway checkout config.
    fn create_checkout_session<'a>(
        &'a self,
        client: &'a MedikartClient,
        intent: &'a CheckoutIntent,
    ) -> Pin<Box<dyn Future<Output = AppResult<CheckoutSession>> + Send + 'a>>;

    /// Relay the gateway's callback to the backend verification endpoint and
    /// report the settled outcome.
    fn confirm_payment<'a>(
        &'a self,
        client: &'a MedikartClient,
        callback: &'a Value,
    ) -> Pin<Box<dyn Future<Output = AppResult<PaymentOutcome>> + Send + 'a>>;
}

/// Receipt nonce for idempotent backend order creation.
pub(crate) fn new_receipt() -> String {
    format!("rcpt_{:016x}", rand::thread_rng().gen::<u64>())
}

pub(crate) fn required_callback_field<'a>(callback: &'a Value, key: &str) -> AppResult<&'a str> {
    callback
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| format!("VALIDATION_ERROR: payment callback missing {key}").into())
}
