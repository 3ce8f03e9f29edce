//! Usage: PaymentProviderRegistry - provider lookup via trait dispatch.
//!
//! Constructed with the client context (no global singleton); adding a
//! gateway only requires implementing `PaymentProvider` and registering here.

use std::collections::HashMap;

use crate::client::config::ClientConfig;
use crate::payments::phonepe::PhonePeProvider;
use crate::payments::qr::QrProvider;
use crate::payments::razorpay::RazorpayProvider;
use crate::payments::PaymentProvider;

pub struct PaymentProviderRegistry {
    by_key: HashMap<&'static str, Box<dyn PaymentProvider>>,
}

impl PaymentProviderRegistry {
    pub(crate) fn new(config: &ClientConfig) -> Self {
        let providers: Vec<Box<dyn PaymentProvider>> = vec![
            Box::new(RazorpayProvider::new(config.razorpay_key_id.clone())),
            Box::new(PhonePeProvider::new(config.phonepe.clone())),
            Box::new(QrProvider),
        ];

        let mut by_key: HashMap<&'static str, Box<dyn PaymentProvider>> = HashMap::new();
        for provider in providers {
            by_key.insert(provider.key(), provider);
        }

        Self { by_key }
    }

    pub fn get(&self, key: &str) -> Option<&dyn PaymentProvider> {
        self.by_key.get(key).map(|p| p.as_ref())
    }

    pub fn keys(&self) -> Vec<&str> {
        self.by_key.keys().copied().collect()
    }
}
