use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::DatabaseError;

// ========== Transaction Types ==========

/// Lifecycle of a locally stored transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Signed but not yet seen on chain
    Pending,
    /// Handed to a node for broadcasting
    Relayed,
    /// Rejected by the node or dropped
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Relayed => "relayed",
            TransactionStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TransactionStatus::Pending),
            "relayed" => Ok(TransactionStatus::Relayed),
            "failed" => Ok(TransactionStatus::Failed),
            other => Err(DatabaseError::InvalidData(format!(
                "unknown transaction status: {}",
                other
            ))),
        }
    }
}

/// A signed transaction as persisted in the `transactions` table.
///
/// Hashes and addresses are stored as `0x`-prefixed lower-case hex, integer
/// amounts as decimal strings to keep 256-bit precision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub tx_hash: String,
    pub chain_id: u64,
    pub from_address: String,
    pub to_address: Option<String>,
    pub value: String,
    pub nonce: String,
    pub gas_price: String,
    pub gas_limit: String,
    pub input: String,
    pub signature_r: String,
    pub signature_s: String,
    pub signature_v: u32,
    pub status: TransactionStatus,
    pub created_at: i64,
}

// ========== Address Book Types ==========

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressBookEntry {
    pub address: String,
    pub name: Option<String>,
    /// Derivation path of the hardware-wallet key owning this address, e.g. "m/44'/60'/0'/0/0"
    pub trezor_derivation_path: Option<String>,
    pub created_at: i64,
}

/// Normalize a hex address for use as a lookup key
pub fn normalize_address(address: &str) -> String {
    let trimmed = address.trim();
    let body = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    format!("0x{}", body.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip_through_text() {
        for status in [
            TransactionStatus::Pending,
            TransactionStatus::Relayed,
            TransactionStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<TransactionStatus>().unwrap(), status);
        }
        assert!("confirmed".parse::<TransactionStatus>().is_err());
    }

    #[test]
    fn test_normalize_address() {
        assert_eq!(normalize_address("0xABCdef01"), "0xabcdef01");
        assert_eq!(normalize_address("ABCDEF01"), "0xabcdef01");
        assert_eq!(normalize_address(" 0XAB "), "0xab");
    }
}
