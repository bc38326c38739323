//! Device protocol messages
//!
//! Hand-maintained subset of the Trezor/KeepKey protobuf schema covering the
//! Ethereum signing flow and the interactive prompts that can interrupt it.

use prost::Message as _;
use serde::Serialize;

/// Wire message type ids shared by Trezor and KeepKey firmware
pub mod message_type {
    pub const INITIALIZE: u16 = 0;
    pub const SUCCESS: u16 = 2;
    pub const FAILURE: u16 = 3;
    pub const FEATURES: u16 = 17;
    pub const PIN_MATRIX_REQUEST: u16 = 18;
    pub const PIN_MATRIX_ACK: u16 = 19;
    pub const CANCEL: u16 = 20;
    pub const BUTTON_REQUEST: u16 = 26;
    pub const BUTTON_ACK: u16 = 27;
    pub const PASSPHRASE_REQUEST: u16 = 41;
    pub const PASSPHRASE_ACK: u16 = 42;
    pub const ETHEREUM_GET_ADDRESS: u16 = 56;
    pub const ETHEREUM_ADDRESS: u16 = 57;
    pub const ETHEREUM_SIGN_TX: u16 = 58;
    pub const ETHEREUM_TX_REQUEST: u16 = 59;
    pub const ETHEREUM_TX_ACK: u16 = 60;
}

/// `FailureType` values the session reacts to
pub mod failure_type {
    pub const ACTION_CANCELLED: i32 = 4;
    pub const PIN_CANCELLED: i32 = 6;
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Initialize {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Success {
    #[prost(string, optional, tag = "1")]
    pub message: Option<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Failure {
    #[prost(int32, optional, tag = "1")]
    pub code: Option<i32>,
    #[prost(string, optional, tag = "2")]
    pub message: Option<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Features {
    #[prost(string, optional, tag = "1")]
    pub vendor: Option<String>,
    #[prost(uint32, optional, tag = "2")]
    pub major_version: Option<u32>,
    #[prost(uint32, optional, tag = "3")]
    pub minor_version: Option<u32>,
    #[prost(uint32, optional, tag = "4")]
    pub patch_version: Option<u32>,
    #[prost(bool, optional, tag = "5")]
    pub bootloader_mode: Option<bool>,
    #[prost(string, optional, tag = "6")]
    pub device_id: Option<String>,
    #[prost(bool, optional, tag = "7")]
    pub pin_protection: Option<bool>,
    #[prost(bool, optional, tag = "8")]
    pub passphrase_protection: Option<bool>,
    #[prost(string, optional, tag = "10")]
    pub label: Option<String>,
    #[prost(bool, optional, tag = "12")]
    pub initialized: Option<bool>,
    #[prost(string, optional, tag = "21")]
    pub model: Option<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PinMatrixRequest {
    /// 1 = current PIN, 2 = new PIN (first), 3 = new PIN (second)
    #[prost(int32, optional, tag = "1")]
    pub r#type: Option<i32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PinMatrixAck {
    #[prost(string, required, tag = "1")]
    pub pin: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Cancel {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ButtonRequest {
    #[prost(int32, optional, tag = "1")]
    pub code: Option<i32>,
    #[prost(string, optional, tag = "2")]
    pub data: Option<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ButtonAck {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PassphraseRequest {
    #[prost(bool, optional, tag = "1")]
    pub on_device: Option<bool>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PassphraseAck {
    #[prost(string, optional, tag = "1")]
    pub passphrase: Option<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EthereumGetAddress {
    #[prost(uint32, repeated, packed = "false", tag = "1")]
    pub address_n: Vec<u32>,
    #[prost(bool, optional, tag = "2")]
    pub show_display: Option<bool>,
}

/// Older firmware (and KeepKey) fill `address_bytes`, newer Trezor firmware
/// sends the checksummed hex string instead.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EthereumAddress {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub address_bytes: Option<Vec<u8>>,
    #[prost(string, optional, tag = "2")]
    pub address: Option<String>,
}

/// Trezor layout: recipient as a hex string in field 11
#[serde_with::serde_as]
#[serde_with::skip_serializing_none]
#[derive(Clone, PartialEq, Serialize, ::prost::Message)]
#[serde(rename_all = "camelCase")]
pub struct EthereumSignTx {
    #[prost(uint32, repeated, packed = "false", tag = "1")]
    pub address_n: Vec<u32>,
    #[prost(bytes = "vec", optional, tag = "2")]
    #[serde_as(as = "Option<serde_with::hex::Hex>")]
    pub nonce: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "3")]
    #[serde_as(as = "Option<serde_with::hex::Hex>")]
    pub gas_price: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "4")]
    #[serde_as(as = "Option<serde_with::hex::Hex>")]
    pub gas_limit: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "6")]
    #[serde_as(as = "Option<serde_with::hex::Hex>")]
    pub value: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "7")]
    #[serde_as(as = "Option<serde_with::hex::Hex>")]
    pub data_initial_chunk: Option<Vec<u8>>,
    #[prost(uint32, optional, tag = "8")]
    pub data_length: Option<u32>,
    #[prost(uint32, optional, tag = "9")]
    pub chain_id: Option<u32>,
    #[prost(string, optional, tag = "11")]
    pub to: Option<String>,
}

/// KeepKey layout: recipient as 20 raw bytes in field 5
#[serde_with::serde_as]
#[serde_with::skip_serializing_none]
#[derive(Clone, PartialEq, Serialize, ::prost::Message)]
#[serde(rename_all = "camelCase")]
pub struct EthereumSignTxKeepKey {
    #[prost(uint32, repeated, packed = "false", tag = "1")]
    pub address_n: Vec<u32>,
    #[prost(bytes = "vec", optional, tag = "2")]
    #[serde_as(as = "Option<serde_with::hex::Hex>")]
    pub nonce: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "3")]
    #[serde_as(as = "Option<serde_with::hex::Hex>")]
    pub gas_price: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "4")]
    #[serde_as(as = "Option<serde_with::hex::Hex>")]
    pub gas_limit: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "5")]
    #[serde_as(as = "Option<serde_with::hex::Hex>")]
    pub to: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "6")]
    #[serde_as(as = "Option<serde_with::hex::Hex>")]
    pub value: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "7")]
    #[serde_as(as = "Option<serde_with::hex::Hex>")]
    pub data_initial_chunk: Option<Vec<u8>>,
    #[prost(uint32, optional, tag = "8")]
    pub data_length: Option<u32>,
    #[prost(uint32, optional, tag = "9")]
    pub chain_id: Option<u32>,
}

/// Either a request for more payload (`data_length` set) or the final signature
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EthereumTxRequest {
    #[prost(uint32, optional, tag = "1")]
    pub data_length: Option<u32>,
    #[prost(uint32, optional, tag = "2")]
    pub signature_v: Option<u32>,
    #[prost(bytes = "vec", optional, tag = "3")]
    pub signature_r: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "4")]
    pub signature_s: Option<Vec<u8>>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EthereumTxAck {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub data_chunk: Option<Vec<u8>>,
}

/// Every protocol message this crate sends or expects to receive
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Initialize(Initialize),
    Success(Success),
    Failure(Failure),
    Features(Features),
    PinMatrixRequest(PinMatrixRequest),
    PinMatrixAck(PinMatrixAck),
    Cancel(Cancel),
    ButtonRequest(ButtonRequest),
    ButtonAck(ButtonAck),
    PassphraseRequest(PassphraseRequest),
    PassphraseAck(PassphraseAck),
    EthereumGetAddress(EthereumGetAddress),
    EthereumAddress(EthereumAddress),
    EthereumSignTx(EthereumSignTx),
    EthereumSignTxKeepKey(EthereumSignTxKeepKey),
    EthereumTxRequest(EthereumTxRequest),
    EthereumTxAck(EthereumTxAck),
}

impl Message {
    /// Wire message type id
    pub fn message_type(&self) -> u16 {
        use message_type::*;
        match self {
            Message::Initialize(_) => INITIALIZE,
            Message::Success(_) => SUCCESS,
            Message::Failure(_) => FAILURE,
            Message::Features(_) => FEATURES,
            Message::PinMatrixRequest(_) => PIN_MATRIX_REQUEST,
            Message::PinMatrixAck(_) => PIN_MATRIX_ACK,
            Message::Cancel(_) => CANCEL,
            Message::ButtonRequest(_) => BUTTON_REQUEST,
            Message::ButtonAck(_) => BUTTON_ACK,
            Message::PassphraseRequest(_) => PASSPHRASE_REQUEST,
            Message::PassphraseAck(_) => PASSPHRASE_ACK,
            Message::EthereumGetAddress(_) => ETHEREUM_GET_ADDRESS,
            Message::EthereumAddress(_) => ETHEREUM_ADDRESS,
            Message::EthereumSignTx(_) | Message::EthereumSignTxKeepKey(_) => ETHEREUM_SIGN_TX,
            Message::EthereumTxRequest(_) => ETHEREUM_TX_REQUEST,
            Message::EthereumTxAck(_) => ETHEREUM_TX_ACK,
        }
    }

    /// Human readable name, used in logs and errors
    pub fn name(&self) -> &'static str {
        match self {
            Message::Initialize(_) => "Initialize",
            Message::Success(_) => "Success",
            Message::Failure(_) => "Failure",
            Message::Features(_) => "Features",
            Message::PinMatrixRequest(_) => "PinMatrixRequest",
            Message::PinMatrixAck(_) => "PinMatrixAck",
            Message::Cancel(_) => "Cancel",
            Message::ButtonRequest(_) => "ButtonRequest",
            Message::ButtonAck(_) => "ButtonAck",
            Message::PassphraseRequest(_) => "PassphraseRequest",
            Message::PassphraseAck(_) => "PassphraseAck",
            Message::EthereumGetAddress(_) => "EthereumGetAddress",
            Message::EthereumAddress(_) => "EthereumAddress",
            Message::EthereumSignTx(_) => "EthereumSignTx",
            Message::EthereumSignTxKeepKey(_) => "EthereumSignTx(KeepKey)",
            Message::EthereumTxRequest(_) => "EthereumTxRequest",
            Message::EthereumTxAck(_) => "EthereumTxAck",
        }
    }

    /// Protobuf payload, without transport framing
    pub fn encode_payload(&self) -> Vec<u8> {
        match self {
            Message::Initialize(m) => m.encode_to_vec(),
            Message::Success(m) => m.encode_to_vec(),
            Message::Failure(m) => m.encode_to_vec(),
            Message::Features(m) => m.encode_to_vec(),
            Message::PinMatrixRequest(m) => m.encode_to_vec(),
            Message::PinMatrixAck(m) => m.encode_to_vec(),
            Message::Cancel(m) => m.encode_to_vec(),
            Message::ButtonRequest(m) => m.encode_to_vec(),
            Message::ButtonAck(m) => m.encode_to_vec(),
            Message::PassphraseRequest(m) => m.encode_to_vec(),
            Message::PassphraseAck(m) => m.encode_to_vec(),
            Message::EthereumGetAddress(m) => m.encode_to_vec(),
            Message::EthereumAddress(m) => m.encode_to_vec(),
            Message::EthereumSignTx(m) => m.encode_to_vec(),
            Message::EthereumSignTxKeepKey(m) => m.encode_to_vec(),
            Message::EthereumTxRequest(m) => m.encode_to_vec(),
            Message::EthereumTxAck(m) => m.encode_to_vec(),
        }
    }

    /// Decode a payload received from the device.
    ///
    /// Type 58 is decoded with the Trezor layout; the session never receives
    /// sign requests, only sends them.
    pub fn decode(message_type: u16, payload: &[u8]) -> Result<Self, DecodeError> {
        use message_type::*;
        let message = match message_type {
            INITIALIZE => Message::Initialize(Initialize::decode(payload)?),
            SUCCESS => Message::Success(Success::decode(payload)?),
            FAILURE => Message::Failure(Failure::decode(payload)?),
            FEATURES => Message::Features(Features::decode(payload)?),
            PIN_MATRIX_REQUEST => Message::PinMatrixRequest(PinMatrixRequest::decode(payload)?),
            PIN_MATRIX_ACK => Message::PinMatrixAck(PinMatrixAck::decode(payload)?),
            CANCEL => Message::Cancel(Cancel::decode(payload)?),
            BUTTON_REQUEST => Message::ButtonRequest(ButtonRequest::decode(payload)?),
            BUTTON_ACK => Message::ButtonAck(ButtonAck::decode(payload)?),
            PASSPHRASE_REQUEST => Message::PassphraseRequest(PassphraseRequest::decode(payload)?),
            PASSPHRASE_ACK => Message::PassphraseAck(PassphraseAck::decode(payload)?),
            ETHEREUM_GET_ADDRESS => Message::EthereumGetAddress(EthereumGetAddress::decode(payload)?),
            ETHEREUM_ADDRESS => Message::EthereumAddress(EthereumAddress::decode(payload)?),
            ETHEREUM_SIGN_TX => Message::EthereumSignTx(EthereumSignTx::decode(payload)?),
            ETHEREUM_TX_REQUEST => Message::EthereumTxRequest(EthereumTxRequest::decode(payload)?),
            ETHEREUM_TX_ACK => Message::EthereumTxAck(EthereumTxAck::decode(payload)?),
            other => return Err(DecodeError::UnknownMessageType(other)),
        };
        Ok(message)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("unknown message type {0}")]
    UnknownMessageType(u16),
    #[error("protobuf decode error: {0}")]
    Protobuf(#[from] prost::DecodeError),
}
