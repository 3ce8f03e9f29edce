//! Usage: Session data model and the token store that owns it.

pub(crate) mod persistence;
pub(crate) mod store;

use serde::{Deserialize, Serialize};

use crate::auth::role::Role;

/// Authenticated user identity, as the backend reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    #[serde(rename = "user_id")]
    pub id: String,
    #[serde(rename = "full_name")]
    pub display_name: String,
    pub email: String,
    pub role: Role,
}

/// The full session: tokens plus the identity they belong to.
///
/// Created on a successful handshake, access token rotated in place on refresh,
/// destroyed on logout or a failed refresh. Owned exclusively by [`store::TokenStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub user: AuthUser,
}

#[cfg(test)]
pub(crate) fn test_session(access_token: &str) -> Session {
    Session {
        access_token: access_token.to_string(),
        refresh_token: Some("refresh-1".to_string()),
        user: AuthUser {
            id: "u1".to_string(),
            display_name: "A".to_string(),
            email: "a@b.com".to_string(),
            role: Role::Patient,
        },
    }
}
