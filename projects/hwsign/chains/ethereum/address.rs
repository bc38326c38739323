//! Ethereum address reported by the device

use ethereum_types::Address;

use crate::error::{Result, SigningError};
use crate::messages::EthereumAddress;

/// Decode the address from an `EthereumAddress` response.
///
/// Raw bytes take precedence; newer Trezor firmware only sends the hex string.
pub fn decode_device_address(response: &EthereumAddress) -> Result<Address> {
    if let Some(bytes) = response.address_bytes.as_ref().filter(|b| !b.is_empty()) {
        if bytes.len() != 20 {
            return Err(SigningError::MalformedAddress(format!(
                "invalid address length: {}",
                bytes.len()
            )));
        }
        return Ok(Address::from_slice(bytes));
    }

    let text = response
        .address
        .as_deref()
        .ok_or_else(|| SigningError::MalformedAddress("empty address response".to_string()))?;
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    let bytes = hex::decode(digits).map_err(|e| SigningError::MalformedAddress(format!("{}: {}", text, e)))?;
    if bytes.len() != 20 {
        return Err(SigningError::MalformedAddress(format!(
            "invalid address length: {}",
            bytes.len()
        )));
    }

    Ok(Address::from_slice(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_raw_bytes() {
        let response = EthereumAddress {
            address_bytes: Some(vec![0x42; 20]),
            address: None,
        };
        assert_eq!(decode_device_address(&response).unwrap(), Address::repeat_byte(0x42));
    }

    #[test]
    fn decodes_checksummed_string() {
        let response = EthereumAddress {
            address_bytes: None,
            address: Some("0x8ba1f109551bD432803012645Ac136ddd64DBA72".to_string()),
        };
        let address = decode_device_address(&response).unwrap();
        assert_eq!(
            format!("{:#x}", address),
            "0x8ba1f109551bd432803012645ac136ddd64dba72"
        );
    }

    #[test]
    fn rejects_short_address() {
        let response = EthereumAddress {
            address_bytes: Some(vec![1, 2, 3]),
            address: None,
        };
        assert!(matches!(
            decode_device_address(&response),
            Err(SigningError::MalformedAddress(_))
        ));
        assert!(decode_device_address(&EthereumAddress::default()).is_err());
    }
}
