//! Usage: User roles and the canonical role-to-dashboard table.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Doctor,
    Admin,
}

impl Role {
    /// The single source of truth for post-login navigation. Hosts read this
    /// instead of keeping their own redirect tables.
    pub fn dashboard_path(&self) -> &'static str {
        match self {
            Role::Patient => "/dashboard/patient",
            Role::Doctor => "/dashboard/doctor",
            Role::Admin => "/admin",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Doctor => "doctor",
            Role::Admin => "admin",
        }
    }
}
