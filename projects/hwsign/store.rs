//! Persistence seams used by the signing session, with their SQLite implementation

use anyhow::Context;
use async_trait::async_trait;
use ethereum_types::{Address, H256};
use hwsign_db::{Database, TransactionRecord, TransactionStatus};

use crate::chains::ethereum::{PendingTransaction, SignatureComponents};

/// Maps sender addresses to the derivation path of the hardware key that owns them
#[async_trait]
pub trait AddressBook: Send + Sync {
    async fn derivation_path(&self, address: &Address) -> anyhow::Result<Option<String>>;
}

/// Stores signed transactions keyed by hash
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Drop the record stored under `previous` (if any) and insert `signed`, atomically.
    async fn replace_signed(&self, previous: Option<H256>, signed: &SignedTransaction) -> anyhow::Result<()>;
}

/// A transaction together with the device signature and its final hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub transaction: PendingTransaction,
    pub signature: SignatureComponents,
    pub tx_hash: H256,
}

impl SignedTransaction {
    pub fn to_record(&self, created_at: i64) -> TransactionRecord {
        let tx = &self.transaction;
        TransactionRecord {
            tx_hash: format!("{:#x}", self.tx_hash),
            chain_id: tx.chain_id,
            from_address: format!("{:#x}", tx.from),
            to_address: tx.to.map(|to| format!("{:#x}", to)),
            value: tx.value.to_string(),
            nonce: tx.nonce.to_string(),
            gas_price: tx.gas_price.to_string(),
            gas_limit: tx.gas_limit.to_string(),
            input: format!("0x{}", hex::encode(&tx.input)),
            signature_r: format!("0x{}", hex::encode(&self.signature.r)),
            signature_s: format!("0x{}", hex::encode(&self.signature.s)),
            signature_v: self.signature.v,
            status: TransactionStatus::Pending,
            created_at,
        }
    }
}

#[async_trait]
impl AddressBook for Database {
    async fn derivation_path(&self, address: &Address) -> anyhow::Result<Option<String>> {
        let entry = self
            .get_address_book_entry(&format!("{:#x}", address))
            .await
            .with_context(|| format!("failed to look up {:#x} in the address book", address))?;

        Ok(entry
            .and_then(|e| e.trezor_derivation_path)
            .filter(|path| !path.trim().is_empty()))
    }
}

#[async_trait]
impl TransactionStore for Database {
    async fn replace_signed(&self, previous: Option<H256>, signed: &SignedTransaction) -> anyhow::Result<()> {
        let previous = previous.map(|h| format!("{:#x}", h));
        let record = signed.to_record(Database::current_timestamp());

        self.replace_transaction(previous.as_deref(), &record)
            .await
            .with_context(|| format!("failed to store signed transaction {}", record.tx_hash))
    }
}
