use ethereum_types::{Address, H256};
use thiserror::Error;

use crate::session::SessionState;

/// Errors surfaced by a signing session.
///
/// An address mismatch is not an error; it ends the session as cancelled.
#[derive(Error, Debug)]
pub enum SigningError {
    #[error("no hardware-wallet derivation path configured for {0:#x}")]
    MissingDerivationPath(Address),

    #[error("invalid derivation path: {0}")]
    InvalidPath(String),

    #[error("contract creation cannot be signed with this flow")]
    MissingRecipient,

    #[error("unsupported chain id {0}: the device protocol carries 32-bit chain ids")]
    UnsupportedChainId(u64),

    #[error("device reported a malformed address: {0}")]
    MalformedAddress(String),

    #[error("device reported a malformed signature: {0}")]
    MalformedSignature(String),

    #[error("unexpected {message_type} message while {state:?}")]
    UnexpectedMessage {
        state: SessionState,
        message_type: &'static str,
    },

    #[error("device failure (code {code:?}): {message}")]
    Device { code: Option<i32>, message: String },

    #[error("transport error: {0}")]
    Transport(#[from] anyhow::Error),

    #[error("session already finished")]
    SessionClosed,

    /// The device produced a valid signature but the store swap failed.
    #[error("transaction {tx_hash:#x} was signed but could not be stored: {source}")]
    PersistenceFailed {
        tx_hash: H256,
        #[source]
        source: anyhow::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SigningError>;
