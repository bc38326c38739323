//! Ethereum support: address verification, sign-request building and
//! signature finalization for legacy (EIP-155) transactions.

use ethereum_types::{Address, H256, U256};

pub mod address;
pub mod finalize;
pub mod transaction;

pub use address::decode_device_address;
pub use finalize::{finalize, signed_transaction_hash};
pub use transaction::{build_sign_request, SignRequest, MAX_INITIAL_CHUNK};

/// A transaction waiting for a hardware-wallet signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransaction {
    pub from: Address,
    /// `None` for contract creation, which this flow does not sign
    pub to: Option<Address>,
    pub value: U256,
    pub nonce: U256,
    pub gas_price: U256,
    pub gas_limit: U256,
    pub chain_id: u64,
    pub input: Vec<u8>,
    /// Placeholder hash of the unsigned transaction, replaced once signed
    pub tx_hash: Option<H256>,
}

/// Signature exactly as reported by the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureComponents {
    pub r: Vec<u8>,
    pub s: Vec<u8>,
    pub v: u32,
}

impl SignatureComponents {
    /// Extract the signature from a final `EthereumTxRequest`.
    ///
    /// Returns `Ok(None)` when the request only asks for more payload.
    pub fn from_tx_request(
        request: &crate::messages::EthereumTxRequest,
    ) -> crate::error::Result<Option<Self>> {
        match (&request.signature_r, &request.signature_s, request.signature_v) {
            (None, None, None) => Ok(None),
            (Some(r), Some(s), Some(v)) => {
                for (name, component) in [("r", r), ("s", s)] {
                    if component.is_empty() || component.len() > 32 {
                        return Err(crate::error::SigningError::MalformedSignature(format!(
                            "{} has {} bytes",
                            name,
                            component.len()
                        )));
                    }
                }
                Ok(Some(Self {
                    r: r.clone(),
                    s: s.clone(),
                    v,
                }))
            }
            _ => Err(crate::error::SigningError::MalformedSignature(
                "incomplete signature components".to_string(),
            )),
        }
    }
}
