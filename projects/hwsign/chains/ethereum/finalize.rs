//! Signature finalization: hash recomputation and the store swap

use ethers_core::types::{NameOrAddress, Signature, TransactionRequest, U256};
use ethers_core::utils::keccak256;
use ethereum_types::H256;
use std::sync::Arc;

use super::{PendingTransaction, SignatureComponents};
use crate::error::{Result, SigningError};
use crate::store::{SignedTransaction, TransactionStore};

/// keccak256 of the RLP-encoded signed legacy transaction
pub fn signed_transaction_hash(tx: &PendingTransaction, signature: &SignatureComponents) -> H256 {
    let mut request = TransactionRequest::new()
        .from(tx.from)
        .gas(tx.gas_limit)
        .gas_price(tx.gas_price)
        .value(tx.value)
        .data(tx.input.clone())
        .nonce(tx.nonce)
        .chain_id(tx.chain_id);
    request.to = tx.to.map(NameOrAddress::Address);
    let signature = Signature {
        r: U256::from_big_endian(&signature.r),
        s: U256::from_big_endian(&signature.s),
        v: u64::from(signature.v),
    };

    H256::from(keccak256(request.rlp_signed(&signature)))
}

/// Record the new hash on `tx` and swap the stored record on a background task.
///
/// The device signature is final at this point, so a store failure is
/// reported as [`SigningError::PersistenceFailed`] carrying the new hash.
pub async fn finalize<S>(
    tx: &mut PendingTransaction,
    signature: SignatureComponents,
    store: Arc<S>,
) -> Result<H256>
where
    S: TransactionStore + ?Sized + 'static,
{
    let tx_hash = signed_transaction_hash(tx, &signature);
    let previous_hash = tx.tx_hash.replace(tx_hash);

    tracing::info!(
        "signed transaction {:#x} (replacing {})",
        tx_hash,
        previous_hash
            .map(|h| format!("{:#x}", h))
            .unwrap_or_else(|| "nothing".to_string())
    );

    let signed = SignedTransaction {
        transaction: tx.clone(),
        signature,
        tx_hash,
    };
    let persisted = tokio::spawn(async move { store.replace_signed(previous_hash, &signed).await }).await;

    match persisted {
        Ok(Ok(())) => Ok(tx_hash),
        Ok(Err(source)) => Err(SigningError::PersistenceFailed { tx_hash, source }),
        Err(join_error) => Err(SigningError::PersistenceFailed {
            tx_hash,
            source: anyhow::Error::new(join_error),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethereum_types::Address;

    fn sample() -> (PendingTransaction, SignatureComponents) {
        let tx = PendingTransaction {
            from: Address::repeat_byte(0x11),
            to: Some(Address::repeat_byte(0xab)),
            value: 1000u64.into(),
            nonce: 5u64.into(),
            gas_price: 20u64.into(),
            gas_limit: 21000u64.into(),
            chain_id: 1,
            input: vec![],
            tx_hash: None,
        };
        let signature = SignatureComponents {
            r: vec![0x11; 32],
            s: vec![0x22; 32],
            v: 37,
        };
        (tx, signature)
    }

    #[test]
    fn hash_depends_on_signature() {
        let (tx, signature) = sample();
        let first = signed_transaction_hash(&tx, &signature);

        let mut other = signature.clone();
        other.v = 38;
        assert_ne!(first, signed_transaction_hash(&tx, &other));
        assert_eq!(first, signed_transaction_hash(&tx, &signature));
    }

    #[test]
    fn hash_ignores_sender_field() {
        let (mut tx, signature) = sample();
        let first = signed_transaction_hash(&tx, &signature);
        tx.from = Address::repeat_byte(0x99);
        assert_eq!(first, signed_transaction_hash(&tx, &signature));
    }
}
