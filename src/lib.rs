//! Usage: Authenticated API client for the Medikart backend.
//!
//! The interesting part is the token-refresh pipeline: every request flows
//! through one dispatcher that injects the bearer token, and 401s funnel into
//! a single-flight refresh coordinator that performs at most one refresh
//! exchange no matter how many requests fail concurrently. Everything hangs
//! off one explicitly constructed [`MedikartClient`]; there are no ambient
//! globals.

mod api;
mod auth;
mod client;
mod payments;
mod session;
mod shared;

pub use api::admin::Lead;
pub use api::cart::{Cart, CartItem};
pub use api::contact::ContactMessage;
pub use api::orders::{CreatePaymentOrder, OrderSummary, PaymentOrder, VerificationResult};
pub use auth::role::Role;
pub use auth::{LoginRequest, RegisterRequest, VerifyCodeRequest};
pub use client::config::{ClientConfig, PhonePeConfig};
pub use client::dispatcher::{ApiRequest, ApiResponse};
pub use client::refresh::{LoggingSessionExpiredSink, SessionExpiredSink};
pub use client::MedikartClient;
pub use payments::registry::PaymentProviderRegistry;
pub use payments::{CheckoutIntent, CheckoutSession, PaymentOutcome, PaymentProvider};
pub use session::persistence::{FileSessionStore, MemorySessionStore, SessionPersistence};
pub use session::store::TokenStore;
pub use session::{AuthUser, Session};
pub use shared::error::{codes, AppError, AppResult};
