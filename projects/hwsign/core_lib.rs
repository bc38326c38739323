//! Hardware-wallet co-signing of Ethereum transactions
//!
//! A [`SigningSession`] talks to a Trezor or KeepKey over any [`Transport`],
//! verifies that the device owns the sender address, requests the signature
//! and swaps the stored transaction record for the signed one.

pub mod chains;
pub mod config;
pub mod device;
pub mod encoding;
pub mod error;
pub mod messages;
pub mod path;
pub mod prompts;
pub mod session;
pub mod store;
pub mod transport;

pub use chains::ethereum::{PendingTransaction, SignRequest, SignatureComponents};
pub use config::SignerConfig;
pub use device::DeviceModel;
pub use error::{Result, SigningError};
pub use messages::Message;
pub use path::DerivationPath;
pub use prompts::{PinKind, SessionPrompts, StaticPrompts};
pub use session::{CancelReason, SessionContext, SessionState, SigningOutcome, SigningSession};
pub use store::{AddressBook, SignedTransaction, TransactionStore};
pub use transport::{ScriptedTransport, Transport};
