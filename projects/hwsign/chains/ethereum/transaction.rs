//! Ethereum sign-request building

use serde::Serialize;

use super::PendingTransaction;
use crate::device::DeviceModel;
use crate::encoding::u256_to_device_bytes;
use crate::error::{Result, SigningError};
use crate::messages::{EthereumSignTx, EthereumSignTxKeepKey, Message};
use crate::path::DerivationPath;

/// Largest payload prefix the firmware accepts inside the sign request itself
pub const MAX_INITIAL_CHUNK: usize = 1024;

/// Device-specific sign request; both variants carry the same fields
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "model", content = "request", rename_all = "lowercase")]
pub enum SignRequest {
    Trezor(EthereumSignTx),
    KeepKey(EthereumSignTxKeepKey),
}

impl SignRequest {
    pub fn data_length(&self) -> u32 {
        match self {
            SignRequest::Trezor(m) => m.data_length.unwrap_or(0),
            SignRequest::KeepKey(m) => m.data_length.unwrap_or(0),
        }
    }

    pub fn initial_chunk_len(&self) -> usize {
        let chunk = match self {
            SignRequest::Trezor(m) => m.data_initial_chunk.as_ref(),
            SignRequest::KeepKey(m) => m.data_initial_chunk.as_ref(),
        };
        chunk.map(Vec::len).unwrap_or(0)
    }

    pub fn into_message(self) -> Message {
        match self {
            SignRequest::Trezor(m) => Message::EthereumSignTx(m),
            SignRequest::KeepKey(m) => Message::EthereumSignTxKeepKey(m),
        }
    }
}

/// Build the sign request for `tx` in the layout `model` understands
pub fn build_sign_request(
    tx: &PendingTransaction,
    path: &DerivationPath,
    model: DeviceModel,
) -> Result<SignRequest> {
    let to = tx.to.ok_or(SigningError::MissingRecipient)?;
    let chain_id = u32::try_from(tx.chain_id).map_err(|_| SigningError::UnsupportedChainId(tx.chain_id))?;
    let data_length = u32::try_from(tx.input.len()).map_err(|_| {
        SigningError::Config(format!("transaction input of {} bytes is too large", tx.input.len()))
    })?;
    let initial_chunk = tx.input[..tx.input.len().min(MAX_INITIAL_CHUNK)].to_vec();

    let nonce = Some(u256_to_device_bytes(tx.nonce));
    let gas_price = Some(u256_to_device_bytes(tx.gas_price));
    let gas_limit = Some(u256_to_device_bytes(tx.gas_limit));
    let value = Some(u256_to_device_bytes(tx.value));
    let address_n = path.address_n();

    let request = match model {
        DeviceModel::Trezor => SignRequest::Trezor(EthereumSignTx {
            address_n,
            nonce,
            gas_price,
            gas_limit,
            value,
            data_initial_chunk: Some(initial_chunk),
            data_length: Some(data_length),
            chain_id: Some(chain_id),
            to: Some(format!("{:#x}", to)),
        }),
        DeviceModel::KeepKey => SignRequest::KeepKey(EthereumSignTxKeepKey {
            address_n,
            nonce,
            gas_price,
            gas_limit,
            to: Some(to.as_bytes().to_vec()),
            value,
            data_initial_chunk: Some(initial_chunk),
            data_length: Some(data_length),
            chain_id: Some(chain_id),
        }),
    };

    tracing::debug!(
        "built {} sign request: chain {}, {} data bytes",
        model,
        chain_id,
        data_length
    );
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethereum_types::{Address, U256};

    fn pending(input: Vec<u8>) -> PendingTransaction {
        PendingTransaction {
            from: Address::repeat_byte(0x11),
            to: Some(Address::repeat_byte(0xab)),
            value: U256::from(1000),
            nonce: U256::from(5),
            gas_price: U256::from(20),
            gas_limit: U256::from(21000),
            chain_id: 1,
            input,
            tx_hash: None,
        }
    }

    fn path() -> DerivationPath {
        "m/44'/60'/0'/0/0".parse().unwrap()
    }

    #[test]
    fn trezor_request_carries_hex_recipient() {
        let request = build_sign_request(&pending(vec![]), &path(), DeviceModel::Trezor).unwrap();
        match request {
            SignRequest::Trezor(m) => {
                assert_eq!(m.to.as_deref(), Some("0xabababababababababababababababababababab"));
                assert_eq!(m.value, Some(vec![0x03, 0xe8]));
                assert_eq!(m.nonce, Some(vec![0x05]));
                assert_eq!(m.gas_price, Some(vec![20]));
                assert_eq!(m.gas_limit, Some(vec![0x52, 0x08]));
                assert_eq!(m.chain_id, Some(1));
                assert_eq!(m.data_length, Some(0));
                assert_eq!(m.address_n, vec![0x8000_002c, 0x8000_003c, 0x8000_0000, 0, 0]);
            }
            other => panic!("expected Trezor layout, got {:?}", other),
        }
    }

    #[test]
    fn keepkey_request_carries_raw_recipient() {
        let request = build_sign_request(&pending(vec![1, 2, 3]), &path(), DeviceModel::KeepKey).unwrap();
        match request {
            SignRequest::KeepKey(m) => {
                assert_eq!(m.to, Some(vec![0xab; 20]));
                assert_eq!(m.data_length, Some(3));
                assert_eq!(m.data_initial_chunk, Some(vec![1, 2, 3]));
            }
            other => panic!("expected KeepKey layout, got {:?}", other),
        }
    }

    #[test]
    fn data_length_matches_input_for_any_size() {
        for len in [0usize, 1, 1023, 1024, 1025, 5000] {
            let request = build_sign_request(&pending(vec![0x5a; len]), &path(), DeviceModel::Trezor).unwrap();
            assert_eq!(request.data_length() as usize, len);
            assert_eq!(request.initial_chunk_len(), len.min(MAX_INITIAL_CHUNK));
        }
    }

    #[test]
    fn zero_value_encodes_empty() {
        let mut tx = pending(vec![]);
        tx.value = U256::zero();
        let request = build_sign_request(&tx, &path(), DeviceModel::KeepKey).unwrap();
        match request {
            SignRequest::KeepKey(m) => assert_eq!(m.value, Some(vec![])),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn chain_id_overflow_is_rejected() {
        let mut tx = pending(vec![]);
        tx.chain_id = u64::from(u32::MAX) + 1;
        assert!(matches!(
            build_sign_request(&tx, &path(), DeviceModel::Trezor),
            Err(SigningError::UnsupportedChainId(id)) if id == tx.chain_id
        ));

        tx.chain_id = u64::from(u32::MAX);
        assert!(build_sign_request(&tx, &path(), DeviceModel::Trezor).is_ok());
    }

    #[test]
    fn contract_creation_is_rejected() {
        let mut tx = pending(vec![]);
        tx.to = None;
        assert!(matches!(
            build_sign_request(&tx, &path(), DeviceModel::KeepKey),
            Err(SigningError::MissingRecipient)
        ));
    }
}
