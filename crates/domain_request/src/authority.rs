//! Actors and roles
//!
//! Profile metadata stores the role as free text. It is parsed once, when the
//! actor is resolved, and anything missing or unrecognised becomes
//! [`Role::User`].

use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::UserId;

/// Role of an authenticated user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// May force any transition
    Admin,
    /// Pays requests out
    Finance,
    #[default]
    User,
}

impl Role {
    /// Parses the role stored in profile metadata
    pub fn from_metadata(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_uppercase()).as_deref() {
            Some("ADMIN") => Role::Admin,
            Some("FINANCE") => Role::Finance,
            _ => Role::User,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Finance => "FINANCE",
            Role::User => "USER",
        }
    }

    /// FINANCE and ADMIN may accept and complete requests
    pub fn can_disburse(&self) -> bool {
        matches!(self, Role::Admin | Role::Finance)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved user acting on the lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
    pub display_name: String,
    pub email: Option<String>,
}

impl Actor {
    pub fn new(id: UserId, role: Role) -> Self {
        Self {
            id,
            role,
            display_name: id.to_string(),
            email: None,
        }
    }

    pub fn with_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
