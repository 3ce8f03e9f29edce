//! Usage: Contact / lead form submission.

use serde::Serialize;

use crate::client::dispatcher::ApiRequest;
use crate::client::MedikartClient;
use crate::shared::error::{codes, AppResult};

const CONTACT_PATH: &str = "/contact";

#[derive(Debug, Clone, Serialize)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub message: String,
}

impl MedikartClient {
    /// Submit a contact/lead form. Works with or without a session.
    pub async fn submit_contact(&self, message: &ContactMessage) -> AppResult<()> {
        self.execute(ApiRequest::post_json(CONTACT_PATH, message)?)
            .await?
            .expect_success(codes::VALIDATION_ERROR)?;
        Ok(())
    }
}
