//! Usage: Read-only endpoints backing the admin dashboard shell.

use serde::Deserialize;

use crate::api::orders::OrderSummary;
use crate::client::dispatcher::ApiRequest;
use crate::client::MedikartClient;
use crate::shared::error::{codes, AppResult};

const ADMIN_ORDERS_PATH: &str = "/admin/orders";
const ADMIN_LEADS_PATH: &str = "/admin/leads";

#[derive(Debug, Clone, Deserialize)]
pub struct Lead {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub message: String,
    pub created_at: String,
}

impl MedikartClient {
    /// All orders, admin view. The backend enforces the role; this client
    /// only carries the token.
    pub async fn admin_orders(&self) -> AppResult<Vec<OrderSummary>> {
        self.execute(ApiRequest::get(ADMIN_ORDERS_PATH))
            .await?
            .expect_success(codes::VALIDATION_ERROR)?
            .json()
    }

    pub async fn admin_leads(&self) -> AppResult<Vec<Lead>> {
        self.execute(ApiRequest::get(ADMIN_LEADS_PATH))
            .await?
            .expect_success(codes::VALIDATION_ERROR)?
            .json()
    }
}
