//! Usage: Cart CRUD endpoints.

use serde::{Deserialize, Serialize};

use crate::client::dispatcher::ApiRequest;
use crate::client::MedikartClient;
use crate::shared::error::{codes, AppResult};

const CART_PATH: &str = "/cart";

/// Prices are carried in paise to keep arithmetic exact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    pub id: String,
    pub product_id: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price_paise: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cart {
    pub items: Vec<CartItem>,
    pub total_paise: i64,
}

#[derive(Debug, Clone, Serialize)]
struct AddItemRequest<'a> {
    product_id: &'a str,
    quantity: u32,
}

#[derive(Debug, Clone, Serialize)]
struct UpdateQuantityRequest {
    quantity: u32,
}

impl MedikartClient {
    pub async fn cart(&self) -> AppResult<Cart> {
        self.execute(ApiRequest::get(CART_PATH))
            .await?
            .expect_success(codes::VALIDATION_ERROR)?
            .json()
    }

    pub async fn add_cart_item(&self, product_id: &str, quantity: u32) -> AppResult<Cart> {
        let request = ApiRequest::post_json(
            format!("{CART_PATH}/items"),
            &AddItemRequest {
                product_id,
                quantity,
            },
        )?;
        self.execute(request)
            .await?
            .expect_success(codes::VALIDATION_ERROR)?
            .json()
    }

    pub async fn update_cart_item(&self, item_id: &str, quantity: u32) -> AppResult<Cart> {
        let request = ApiRequest::patch_json(
            format!("{CART_PATH}/items/{item_id}"),
            &UpdateQuantityRequest { quantity },
        )?;
        self.execute(request)
            .await?
            .expect_success(codes::VALIDATION_ERROR)?
            .json()
    }

    pub async fn remove_cart_item(&self, item_id: &str) -> AppResult<Cart> {
        self.execute(ApiRequest::delete(format!("{CART_PATH}/items/{item_id}")))
            .await?
            .expect_success(codes::VALIDATION_ERROR)?
            .json()
    }

    pub async fn clear_cart(&self) -> AppResult<()> {
        self.execute(ApiRequest::delete(CART_PATH))
            .await?
            .expect_success(codes::VALIDATION_ERROR)?;
        Ok(())
    }
}
