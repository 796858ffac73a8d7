//! Strongly-typed identifiers for lifecycle entities
//!
//! Newtype wrappers around UUIDs keep a request id from ever being passed
//! where a block or expense id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident => $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Short tag shown before the UUID, e.g. `REQ-0190...`
            pub const PREFIX: &'static str = $prefix;

            /// Fresh time-ordered (v7) identifier, so rows sort by creation
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}-{}", Self::PREFIX, self.0)
            }
        }

        /// Accepts both `PREFIX-uuid` and a bare UUID
        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let bare = s
                    .strip_prefix(Self::PREFIX)
                    .and_then(|rest| rest.strip_prefix('-'))
                    .unwrap_or(s);
                Uuid::parse_str(bare).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Uuid {
                id.0
            }
        }
    };
}

define_id!(
    /// A fund request (deposit or reimbursement)
    RequestId => "REQ"
);
define_id!(
    /// An accounting block opened for an accepted deposit
    BlockId => "BLK"
);
define_id!(ExpenseId => "EXP");
define_id!(
    /// A person known to the identity directory
    UserId => "USR"
);

/// Company responsible for a request and its accounting block
///
/// Companies are identified by their registered name, which is also what the
/// closing statement prints.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Company(String);

impl Company {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Company {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Company {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_display() {
        let id = RequestId::new();
        assert!(id.to_string().starts_with("REQ-"));
    }

    #[test]
    fn test_id_parsing_accepts_prefixed_and_bare() {
        let original = BlockId::new();
        let parsed: BlockId = original.to_string().parse().unwrap();
        assert_eq!(original, parsed);

        let bare: BlockId = original.as_uuid().to_string().parse().unwrap();
        assert_eq!(original, bare);
    }

    #[test]
    fn test_company_trims_name() {
        let company = Company::new("  Acme Ltda ");
        assert_eq!(company.as_str(), "Acme Ltda");
        assert!(!company.is_blank());
        assert!(Company::new("   ").is_blank());
    }
}
