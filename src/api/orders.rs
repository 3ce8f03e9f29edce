//! Usage: Payment-order creation, verification relay, and order history.

use serde::{Deserialize, Serialize};

use crate::client::dispatcher::ApiRequest;
use crate::client::MedikartClient;
use crate::shared::error::{codes, AppResult};

const PAYMENT_ORDER_PATH: &str = "/orders/payment-order";
const VERIFY_PAYMENT_PATH: &str = "/orders/verify-payment";
const ORDERS_PATH: &str = "/orders";

#[derive(Debug, Clone, Serialize)]
pub struct CreatePaymentOrder {
    pub amount_paise: i64,
    pub currency: String,
    pub receipt: String,
}

/// Backend-created order the payment providers hand to their gateways.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentOrder {
    pub order_id: String,
    pub amount_paise: i64,
    pub currency: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerificationResult {
    pub verified: bool,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSummary {
    pub order_id: String,
    pub status: String,
    pub amount_paise: i64,
    pub created_at: String,
}

impl MedikartClient {
    /// Create a backend payment order for the given amount. Providers call
    /// this before opening their checkout.
    pub async fn create_payment_order(
        &self,
        order: &CreatePaymentOrder,
    ) -> AppResult<PaymentOrder> {
        self.execute(ApiRequest::post_json(PAYMENT_ORDER_PATH, order)?)
            .await?
            .expect_success(codes::VALIDATION_ERROR)?
            .json()
    }

    /// Relay a gateway callback to the backend for signature verification.
    /// The gateway's word is never trusted directly.
    pub async fn verify_payment(
        &self,
        callback: &serde_json::Value,
    ) -> AppResult<VerificationResult> {
        self.execute(ApiRequest::post_json(VERIFY_PAYMENT_PATH, callback)?)
            .await?
            .expect_success(codes::VALIDATION_ERROR)?
            .json()
    }

    pub async fn my_orders(&self) -> AppResult<Vec<OrderSummary>> {
        self.execute(ApiRequest::get(ORDERS_PATH))
            .await?
            .expect_success(codes::VALIDATION_ERROR)?
            .json()
    }
}
