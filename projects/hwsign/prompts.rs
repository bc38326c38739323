//! User interaction requested by the device during a session

use async_trait::async_trait;
use ethereum_types::Address;

/// Which PIN the device is asking for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinKind {
    Current,
    NewFirst,
    NewSecond,
    Unknown(i32),
}

impl PinKind {
    pub fn from_wire(value: Option<i32>) -> Self {
        match value {
            Some(1) | None => PinKind::Current,
            Some(2) => PinKind::NewFirst,
            Some(3) => PinKind::NewSecond,
            Some(other) => PinKind::Unknown(other),
        }
    }
}

/// Callbacks into the UI layer. Returning `None` from a prompt cancels the session.
#[async_trait]
pub trait SessionPrompts: Send + Sync {
    /// PIN entered on the scrambled matrix shown by the device
    async fn pin(&self, kind: PinKind) -> Option<String>;

    async fn passphrase(&self) -> Option<String>;

    /// The device waits for a physical button press
    async fn button_request(&self, _code: Option<i32>) {}

    /// The device controls a different key than the transaction sender
    async fn address_mismatch(&self, reported: Address, expected: Address) {
        tracing::warn!(
            "device reported address {:#x}, transaction is from {:#x}",
            reported,
            expected
        );
    }
}

/// Prompts answered from fixed values; `None` fields cancel when asked.
#[derive(Debug, Clone, Default)]
pub struct StaticPrompts {
    pub pin: Option<String>,
    pub passphrase: Option<String>,
}

#[async_trait]
impl SessionPrompts for StaticPrompts {
    async fn pin(&self, _kind: PinKind) -> Option<String> {
        self.pin.clone()
    }

    async fn passphrase(&self) -> Option<String> {
        self.passphrase.clone()
    }
}
