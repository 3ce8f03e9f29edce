//! Usage: Razorpay adapter.
//!
//! Specializations:
//! - Checkout config carries the publishable key id plus prefill contact data
//! - Callback relay forwards `razorpay_order_id` / `razorpay_payment_id` /
//!   `razorpay_signature` for backend HMAC verification

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

use crate::api::orders::CreatePaymentOrder;
use crate::client::MedikartClient;
use crate::payments::{
    new_receipt, required_callback_field, CheckoutIntent, CheckoutSession, PaymentOutcome,
    PaymentProvider,
};
use crate::shared::error::{codes, AppError, AppResult};

pub(crate) const PROVIDER_KEY: &str = "razorpay";
const DISPLAY_NAME: &str = "Medikart";

pub(crate) struct RazorpayProvider {
    key_id: Option<String>,
}

impl RazorpayProvider {
    pub(crate) fn new(key_id: Option<String>) -> Self {
        Self { key_id }
    }

    async fn create(
        &self,
        client: &MedikartClient,
        intent: &CheckoutIntent,
    ) -> AppResult<CheckoutSession> {
        let key_id = self.key_id.as_deref().ok_or_else(|| {
            AppError::new(
                codes::VALIDATION_ERROR,
                "razorpay key id is not configured",
            )
        })?;

        let order = client
            .create_payment_order(&CreatePaymentOrder {
                amount_paise: intent.amount_paise,
                currency: intent.currency.clone(),
                receipt: new_receipt(),
            })
            .await?;

        let payload = serde_json::json!({
            "key": key_id,
            "name": DISPLAY_NAME,
            "order_id": order.order_id,
            "amount": order.amount_paise,
            "currency": order.currency,
            "prefill": {
                "email": intent.customer_email,
                "contact": intent.customer_phone,
            },
        });

        Ok(CheckoutSession {
            provider: PROVIDER_KEY,
            order_id: order.order_id,
            payload,
            redirect_url: None,
        })
    }

    async fn confirm(
        &self,
        client: &MedikartClient,
        callback: &Value,
    ) -> AppResult<PaymentOutcome> {
        let order_id = required_callback_field(callback, "razorpay_order_id")?;
        let payment_id = required_callback_field(callback, "razorpay_payment_id")?;
        let signature = required_callback_field(callback, "razorpay_signature")?;

        let verification = client
            .verify_payment(&serde_json::json!({
                "provider": PROVIDER_KEY,
                "razorpay_order_id": order_id,
                "razorpay_payment_id": payment_id,
                "razorpay_signature": signature,
            }))
            .await?;

        if verification.verified {
            Ok(PaymentOutcome::Verified {
                order_id: verification.order_id.unwrap_or_else(|| order_id.to_string()),
            })
        } else {
            Ok(PaymentOutcome::Failed {
                reason: verification
                    .reason
                    .unwrap_or_else(|| "signature verification failed".to_string()),
            })
        }
    }
}

impl PaymentProvider for RazorpayProvider {
    fn key(&self) -> &'static str {
        PROVIDER_KEY
    }

    fn create_checkout_session<'a>(
        &'a self,
        client: &'a MedikartClient,
        intent: &'a CheckoutIntent,
    ) -> Pin<Box<dyn Future<Output = AppResult<CheckoutSession>> + Send + 'a>> {
        Box::pin(self.create(client, intent))
    }

    fn confirm_payment<'a>(
        &'a self,
        client: &'a MedikartClient,
        callback: &'a Value,
    ) -> Pin<Box<dyn Future<Output = AppResult<PaymentOutcome>> + Send + 'a>> {
        Box::pin(self.confirm(client, callback))
    }
}
