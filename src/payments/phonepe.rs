//! Usage: PhonePe adapter.
//!
//! Specializations:
//! - Request payload is base64-encoded and signed with the merchant salt:
//!   `X-VERIFY = sha256(base64Payload + apiPath + saltKey) + "###" + saltIndex`
//! - The signed payload goes to the backend initiate endpoint, which proxies
//!   it to PhonePe and returns the gateway redirect URL

use std::future::Future;
use std::pin::Pin;

use base64::Engine;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::api::orders::CreatePaymentOrder;
use crate::client::config::PhonePeConfig;
use crate::client::dispatcher::ApiRequest;
use crate::client::MedikartClient;
use crate::payments::{
    new_receipt, required_callback_field, CheckoutIntent, CheckoutSession, PaymentOutcome,
    PaymentProvider,
};
use crate::shared::error::{codes, AppError, AppResult};

pub(crate) const PROVIDER_KEY: &str = "phonepe";
/// PhonePe pay API path; part of the checksum input even though the backend
/// does the actual gateway call.
const PAY_API_PATH: &str = "/pg/v1/pay";
const INITIATE_PATH: &str = "/payments/phonepe/initiate";

pub(crate) struct PhonePeProvider {
    config: PhonePeConfig,
}

impl PhonePeProvider {
    pub(crate) fn new(config: PhonePeConfig) -> Self {
        Self { config }
    }

    fn ensure_configured(&self) -> AppResult<()> {
        if self.config.merchant_id.trim().is_empty() || self.config.salt_key.trim().is_empty() {
            return Err(AppError::new(
                codes::VALIDATION_ERROR,
                "phonepe merchant credentials are not configured",
            ));
        }
        Ok(())
    }

    async fn create(
        &self,
        client: &MedikartClient,
        intent: &CheckoutIntent,
    ) -> AppResult<CheckoutSession> {
        self.ensure_configured()?;

        let order = client
            .create_payment_order(&CreatePaymentOrder {
                amount_paise: intent.amount_paise,
                currency: intent.currency.clone(),
                receipt: new_receipt(),
            })
            .await?;

        let pay_request = serde_json::json!({
            "merchantId": self.config.merchant_id,
            "merchantTransactionId": order.order_id,
            "amount": order.amount_paise,
            "redirectUrl": intent.redirect_url,
            "redirectMode": "REDIRECT",
            "paymentInstrument": { "type": "PAY_PAGE" },
        });
        let encoded = base64::engine::general_purpose::STANDARD.encode(
            serde_json::to_vec(&pay_request)
                .map_err(|e| format!("VALIDATION_ERROR: failed to encode pay request: {e}"))?,
        );
        let checksum = x_verify(
            &encoded,
            PAY_API_PATH,
            &self.config.salt_key,
            self.config.salt_index,
        );

        let request = ApiRequest::post_json(INITIATE_PATH, &serde_json::json!({ "request": encoded }))?
            .with_header("X-VERIFY", checksum);
        let response = client
            .execute(request)
            .await?
            .expect_success(codes::VALIDATION_ERROR)?
            .value()?;

        let redirect_url = response
            .get("redirect_url")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        Ok(CheckoutSession {
            provider: PROVIDER_KEY,
            order_id: order.order_id,
            payload: serde_json::json!({ "request": encoded }),
            redirect_url,
        })
    }

    async fn confirm(
        &self,
        client: &MedikartClient,
        callback: &Value,
    ) -> AppResult<PaymentOutcome> {
        let transaction_id = required_callback_field(callback, "merchantTransactionId")?;

        let verification = client
            .verify_payment(&serde_json::json!({
                "provider": PROVIDER_KEY,
                "merchantTransactionId": transaction_id,
            }))
            .await?;

        if verification.verified {
            Ok(PaymentOutcome::Verified {
                order_id: verification
                    .order_id
                    .unwrap_or_else(|| transaction_id.to_string()),
            })
        } else {
            Ok(PaymentOutcome::Failed {
                reason: verification
                    .reason
                    .unwrap_or_else(|| "phonepe verification failed".to_string()),
            })
        }
    }
}

/// PhonePe checksum header over the base64 payload and API path.
pub(crate) fn x_verify(base64_payload: &str, api_path: &str, salt_key: &str, salt_index: u32) -> String {
    let mut hasher = Sha256::new();
    hasher.update(base64_payload.as_bytes());
    hasher.update(api_path.as_bytes());
    hasher.update(salt_key.as_bytes());
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(digest.len() * 2 + 8);
    for byte in digest {
        hex.push_str(&format!("{byte:02x}"));
    }
    format!("{hex}###{salt_index}")
}

impl PaymentProvider for PhonePeProvider {
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
