//! Sequential block codes
//!
//! Codes read `NN-PRC`: a numeric sequence zero-padded to at least two
//! digits. The first block ever created is `01-PRC`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::AccountingError;

const SUFFIX: &str = "PRC";

/// Human-readable block identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BlockCode {
    sequence: u32,
}

impl BlockCode {
    pub fn first() -> Self {
        Self { sequence: 1 }
    }

    pub fn from_sequence(sequence: u32) -> Self {
        Self { sequence }
    }

    pub fn parse(code: &str) -> Result<Self, AccountingError> {
        let invalid = || AccountingError::InvalidBlockCode(code.to_string());
        let (prefix, suffix) = code.trim().split_once('-').ok_or_else(invalid)?;
        if suffix != SUFFIX || prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let sequence = prefix.parse::<u32>().map_err(|_| invalid())?;
        Ok(Self { sequence })
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    /// Code following the most recently created one
    pub fn next_after(latest: Option<&BlockCode>) -> Result<BlockCode, AccountingError> {
        match latest {
            None => Ok(Self::first()),
            Some(code) => code
                .sequence
                .checked_add(1)
                .map(Self::from_sequence)
                .ok_or_else(|| AccountingError::InvalidBlockCode(code.to_string())),
        }
    }
}

impl fmt::Display for BlockCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{}", self.sequence, SUFFIX)
    }
}

impl TryFrom<String> for BlockCode {
    type Error = AccountingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<BlockCode> for String {
    fn from(code: BlockCode) -> String {
        code.to_string()
    }
}

impl std::str::FromStr for BlockCode {
    type Err = AccountingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_code() {
        assert_eq!(BlockCode::next_after(None).unwrap().to_string(), "01-PRC");
    }

    #[test]
    fn test_increment_pads_to_two_digits() {
        let latest = BlockCode::parse("07-PRC").unwrap();
        assert_eq!(BlockCode::next_after(Some(&latest)).unwrap().to_string(), "08-PRC");

        let latest = BlockCode::parse("99-PRC").unwrap();
        assert_eq!(BlockCode::next_after(Some(&latest)).unwrap().to_string(), "100-PRC");
    }

    #[test]
    fn test_rejects_malformed_codes() {
        for code in ["PRC", "7-ABC", "-PRC", "x1-PRC", "01PRC"] {
            assert!(BlockCode::parse(code).is_err(), "{code} should be rejected");
        }
    }
}
