//! Signer settings persisted as preferences in the local database

use hwsign_db::Database;
use serde::Serialize;

use crate::device::DeviceModel;
use crate::error::{Result, SigningError};

const CHAIN_ID_KEY: &str = "chain_id";
const DEVICE_MODEL_KEY: &str = "device_model";
const SHOW_DISPLAY_KEY: &str = "show_display";

/// Keys accepted by [`SignerConfig::set`]
pub const CONFIG_KEYS: [&str; 3] = [CHAIN_ID_KEY, DEVICE_MODEL_KEY, SHOW_DISPLAY_KEY];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignerConfig {
    /// Default chain id for `hwsign preview` when `--chain-id` is omitted
    pub chain_id: u64,
    /// `None` means detect from the device `Features`
    pub device_model: Option<DeviceModel>,
    /// Ask the device to display the address before signing
    pub show_display: bool,
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            chain_id: 1,
            device_model: None,
            show_display: false,
        }
    }
}

impl SignerConfig {
    /// Read all settings, falling back to defaults for missing keys
    pub async fn load(db: &Database) -> Result<Self> {
        let mut config = Self::default();

        if let Some(value) = read(db, CHAIN_ID_KEY).await? {
            config.chain_id = parse_chain_id(&value)?;
        }
        if let Some(value) = read(db, DEVICE_MODEL_KEY).await? {
            config.device_model = parse_device_model(&value)?;
        }
        if let Some(value) = read(db, SHOW_DISPLAY_KEY).await? {
            config.show_display = parse_bool(&value)?;
        }

        tracing::debug!("loaded signer config: {:?}", config);
        Ok(config)
    }

    pub async fn save(&self, db: &Database) -> Result<()> {
        write(db, CHAIN_ID_KEY, &self.chain_id.to_string()).await?;
        let model = self.device_model.map(|m| m.as_str()).unwrap_or("auto");
        write(db, DEVICE_MODEL_KEY, model).await?;
        write(db, SHOW_DISPLAY_KEY, &self.show_display.to_string()).await?;
        Ok(())
    }

    /// Validate and store a single setting
    pub async fn set(db: &Database, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            CHAIN_ID_KEY => {
                parse_chain_id(value)?;
            }
            DEVICE_MODEL_KEY => {
                parse_device_model(value)?;
            }
            SHOW_DISPLAY_KEY => {
                parse_bool(value)?;
            }
            other => {
                return Err(SigningError::Config(format!(
                    "unknown setting '{}', expected one of {}",
                    other,
                    CONFIG_KEYS.join(", ")
                )))
            }
        }

        write(db, key, value).await?;
        tracing::info!("set {} = {}", key, value);
        Ok(())
    }
}

async fn read(db: &Database, key: &str) -> Result<Option<String>> {
    db.get_preference(key)
        .await
        .map_err(|e| SigningError::Config(format!("failed to read {}: {}", key, e)))
}

async fn write(db: &Database, key: &str, value: &str) -> Result<()> {
    db.set_preference(key, value)
        .await
        .map_err(|e| SigningError::Config(format!("failed to write {}: {}", key, e)))
}

fn parse_chain_id(value: &str) -> Result<u64> {
    match value.trim().parse::<u64>() {
        Ok(0) | Err(_) => Err(SigningError::Config(format!("invalid chain id: {}", value))),
        Ok(id) => Ok(id),
    }
}

fn parse_device_model(value: &str) -> Result<Option<DeviceModel>> {
    if value.trim().eq_ignore_ascii_case("auto") {
        return Ok(None);
    }
    value.parse().map(Some)
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(SigningError::Config(format!("expected true or false, got {}", other))),
    }
}
