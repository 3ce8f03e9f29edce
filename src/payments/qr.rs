//! Usage: QR adapter - backend-generated QR code plus status polling.

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;
use tokio::time::Duration;

use crate::api::orders::CreatePaymentOrder;
use crate::client::dispatcher::ApiRequest;
use crate::client::MedikartClient;
use crate::payments::{
    new_receipt, required_callback_field, CheckoutIntent, CheckoutSession, PaymentOutcome,
    PaymentProvider,
};
use crate::shared::error::{codes, AppResult};

pub(crate) const PROVIDER_KEY: &str = "qr";
const SESSION_PATH: &str = "/payments/qr/session";

const MAX_POLL_ATTEMPTS: u32 = 30;
const POLL_INTERVAL: Duration = Duration::from_secs(2);

pub(crate) struct QrProvider;

impl QrProvider {
    async fn create(
        &self,
        client: &MedikartClient,
        intent: &CheckoutIntent,
    ) -> AppResult<CheckoutSession> {
        let order = client
            .create_payment_order(&CreatePaymentOrder {
                amount_paise: intent.amount_paise,
                currency: intent.currency.clone(),
                receipt: new_receipt(),
            })
            .await?;

        let request = ApiRequest::post_json(
            SESSION_PATH,
            &serde_json::json!({ "order_id": order.order_id }),
        )?;
        let payload = client
            .execute(request)
            .await?
            .expect_success(codes::VALIDATION_ERROR)?
            .value()?;

        Ok(CheckoutSession {
            provider: PROVIDER_KEY,
            order_id: order.order_id,
            payload,
            redirect_url: None,
        })
    }

    /// Poll the QR session until it settles or the budget runs out. A session
    /// still pending after the last attempt is reported as `Pending`; the
    /// caller decides whether to poll again later.
    async fn confirm(
        &self,
        client: &MedikartClient,
        callback: &Value,
    ) -> AppResult<PaymentOutcome> {
        let session_id = required_callback_field(callback, "qr_session_id")?;

        for attempt in 0..MAX_POLL_ATTEMPTS {
            if attempt > 0 {
                tokio::time::sleep(POLL_INTERVAL).await;
            }

            let response = client
                .execute(ApiRequest::get(format!("{SESSION_PATH}/{session_id}")))
                .await?
                .expect_success(codes::VALIDATION_ERROR)?
                .value()?;

            let status = response
                .get("status")
                .and_then(Value::as_str)
                .unwrap_or("pending");
            let order_id = response
                .get("order_id")
                .and_then(Value::as_str)
                .unwrap_or(session_id);

            if let Some(outcome) = settle(status, order_id) {
                return Ok(outcome);
            }
            tracing::debug!(session_id, attempt, "qr session still pending");
        }

        Ok(PaymentOutcome::Pending)
    }
}

/// `None` means keep polling.
fn settle(status: &str, order_id: &str) -> Option<PaymentOutcome> {
    match status {
        "paid" => Some(PaymentOutcome::Verified {
            order_id: order_id.to_string(),
        }),
        "expired" | "failed" => Some(PaymentOutcome::Failed {
            reason: format!("qr session {status}"),
        }),
        _ => None,
    }
}

impl PaymentProvider for QrProvider {
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
