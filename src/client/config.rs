//! Usage: Client configuration (base URL, timeouts, payment credentials).

use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://api.medikart.example.com";
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u32 = 30;
const MAX_REQUEST_TIMEOUT_SECONDS: u32 = 5 * 60;
pub const DEFAULT_SIGN_IN_PATH: &str = "/signin";

const ENV_BASE_URL: &str = "MEDIKART_API_BASE_URL";
const ENV_RAZORPAY_KEY_ID: &str = "MEDIKART_RAZORPAY_KEY_ID";
const ENV_PHONEPE_MERCHANT_ID: &str = "MEDIKART_PHONEPE_MERCHANT_ID";
const ENV_PHONEPE_SALT_KEY: &str = "MEDIKART_PHONEPE_SALT_KEY";
const ENV_PHONEPE_SALT_INDEX: &str = "MEDIKART_PHONEPE_SALT_INDEX";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhonePeConfig {
    pub merchant_id: String,
    pub salt_key: String,
    pub salt_index: u32,
}

impl Default for PhonePeConfig {
    fn default() -> Self {
        Self {
            merchant_id: String::new(),
            salt_key: String::new(),
            salt_index: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub request_timeout_seconds: u32,
    /// Where the hosting environment should send the user after a fatal
    /// refresh failure. The library only reports it; navigation is the host's job.
    pub sign_in_path: String,
    pub razorpay_key_id: Option<String>,
    pub phonepe: PhonePeConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_seconds: DEFAULT_REQUEST_TIMEOUT_SECONDS,
            sign_in_path: DEFAULT_SIGN_IN_PATH.to_string(),
            razorpay_key_id: None,
            phonepe: PhonePeConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Read configuration from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(base_url) = read_env(ENV_BASE_URL) {
            config.base_url = base_url;
        }
        config.razorpay_key_id = read_env(ENV_RAZORPAY_KEY_ID);
        if let Some(merchant_id) = read_env(ENV_PHONEPE_MERCHANT_ID) {
            config.phonepe.merchant_id = merchant_id;
        }
        if let Some(salt_key) = read_env(ENV_PHONEPE_SALT_KEY) {
            config.phonepe.salt_key = salt_key;
        }
        if let Some(index) = read_env(ENV_PHONEPE_SALT_INDEX).and_then(|v| v.parse::<u32>().ok()) {
            config.phonepe.salt_index = index;
        }
        sanitize(&mut config);
        config
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        sanitize(&mut self);
        self
    }
}

fn read_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(crate) fn sanitize(config: &mut ClientConfig) -> bool {
    let mut changed = false;

    let trimmed = config.base_url.trim().trim_end_matches('/').to_string();
    if trimmed != config.base_url {
        config.base_url = trimmed;
        changed = true;
    }
    if config.base_url.is_empty() {
        config.base_url = DEFAULT_BASE_URL.to_string();
        changed = true;
    }

    if config.request_timeout_seconds == 0 {
        config.request_timeout_seconds = DEFAULT_REQUEST_TIMEOUT_SECONDS;
        changed = true;
    }
    if config.request_timeout_seconds > MAX_REQUEST_TIMEOUT_SECONDS {
        config.request_timeout_seconds = MAX_REQUEST_TIMEOUT_SECONDS;
        changed = true;
    }

    if config.sign_in_path.trim().is_empty() {
        config.sign_in_path = DEFAULT_SIGN_IN_PATH.to_string();
        changed = true;
    }

    if config.phonepe.salt_index == 0 {
        config.phonepe.salt_index = 1;
        changed = true;
    }

    changed
}
