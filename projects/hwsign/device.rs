//! Device model detection

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SigningError};
use crate::messages::{Features, Initialize, Message};
use crate::transport::Transport;

/// Firmware family; decides the sign-request wire layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceModel {
    /// Recipient sent as a hex string
    Trezor,
    /// Recipient sent as raw bytes
    KeepKey,
}

impl DeviceModel {
    /// KeepKey firmware reports vendor "keepkey.com"; everything else speaks the Trezor layout
    pub fn from_features(features: &Features) -> Self {
        let vendor = features.vendor.as_deref().unwrap_or_default();
        if vendor.to_lowercase().contains("keepkey") {
            DeviceModel::KeepKey
        } else {
            DeviceModel::Trezor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceModel::Trezor => "trezor",
            DeviceModel::KeepKey => "keepkey",
        }
    }
}

impl fmt::Display for DeviceModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceModel {
    type Err = SigningError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trezor" => Ok(DeviceModel::Trezor),
            "keepkey" => Ok(DeviceModel::KeepKey),
            other => Err(SigningError::Config(format!("unknown device model: {}", other))),
        }
    }
}

/// Send `Initialize` and read the device `Features`
pub async fn initialize<T: Transport + ?Sized>(transport: &mut T) -> Result<Features> {
    transport.send(Message::Initialize(Initialize {})).await?;

    match transport.receive().await? {
        Message::Features(features) => {
            tracing::info!(
                "connected to {} {}.{}.{} (label: {})",
                features.vendor.as_deref().unwrap_or("unknown vendor"),
                features.major_version.unwrap_or(0),
                features.minor_version.unwrap_or(0),
                features.patch_version.unwrap_or(0),
                features.label.as_deref().unwrap_or("-"),
            );
            Ok(features)
        }
        Message::Failure(failure) => Err(SigningError::Device {
            code: failure.code,
            message: failure.message.unwrap_or_default(),
        }),
        other => Err(SigningError::Transport(anyhow::anyhow!(
            "expected Features after Initialize, got {}",
            other.name()
        ))),
    }
}
