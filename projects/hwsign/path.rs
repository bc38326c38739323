//! BIP-32 style derivation paths

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SigningError;

/// High bit marking a hardened index on the wire
pub const HARDENED_FLAG: u32 = 0x8000_0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathComponent {
    pub index: u32,
    pub hardened: bool,
}

impl PathComponent {
    pub fn hardened(index: u32) -> Self {
        Self { index, hardened: true }
    }

    pub fn normal(index: u32) -> Self {
        Self { index, hardened: false }
    }

    /// Raw index with the hardening flag ORed in
    pub fn number_with_hardening_flag(&self) -> u32 {
        if self.hardened {
            self.index | HARDENED_FLAG
        } else {
            self.index
        }
    }
}

/// An ordered, already-resolved key derivation path such as `m/44'/60'/0'/0/0`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivationPath {
    components: Vec<PathComponent>,
}

impl DerivationPath {
    pub fn new(components: Vec<PathComponent>) -> Self {
        Self { components }
    }

    pub fn components(&self) -> &[PathComponent] {
        &self.components
    }

    /// Per-component protocol encoding (`address_n`)
    pub fn address_n(&self) -> Vec<u32> {
        self.components
            .iter()
            .map(PathComponent::number_with_hardening_flag)
            .collect()
    }
}

impl FromStr for DerivationPath {
    type Err = SigningError;

    fn from_str(path: &str) -> Result<Self, Self::Err> {
        let path = path.trim();
        let rest = path
            .strip_prefix("m/")
            .or_else(|| path.strip_prefix("M/"))
            .ok_or_else(|| SigningError::InvalidPath(format!("{} must start with 'm/'", path)))?;

        let mut components = Vec::new();
        for part in rest.split('/') {
            let (digits, hardened) = match part.strip_suffix(['\'', 'h', 'H']) {
                Some(digits) => (digits, true),
                None => (part, false),
            };
            let index: u32 = digits
                .parse()
                .map_err(|_| SigningError::InvalidPath(format!("invalid segment '{}' in {}", part, path)))?;
            if index & HARDENED_FLAG != 0 {
                return Err(SigningError::InvalidPath(format!(
                    "index {} in {} exceeds 2^31 - 1",
                    index, path
                )));
            }
            components.push(PathComponent { index, hardened });
        }

        Ok(Self { components })
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("m")?;
        for component in &self.components {
            write!(f, "/{}", component.index)?;
            if component.hardened {
                f.write_str("'")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_standard_ethereum_path() {
        let path: DerivationPath = "m/44'/60'/0'/0/0".parse().unwrap();
        assert_eq!(
            path.components(),
            &[
                PathComponent::hardened(44),
                PathComponent::hardened(60),
                PathComponent::hardened(0),
                PathComponent::normal(0),
                PathComponent::normal(0),
            ]
        );
        assert_eq!(
            path.address_n(),
            vec![0x8000_002c, 0x8000_003c, 0x8000_0000, 0, 0]
        );
        assert_eq!(path.to_string(), "m/44'/60'/0'/0/0");
    }

    #[test]
    fn accepts_h_suffix() {
        let path: DerivationPath = "m/44h/60H/1'/0/3".parse().unwrap();
        assert_eq!(path.to_string(), "m/44'/60'/1'/0/3");
    }

    #[test]
    fn rejects_malformed_paths() {
        for bad in ["44'/60'", "m/", "m/44'/x", "m/2147483648", "m/44''"] {
            assert!(
                matches!(bad.parse::<DerivationPath>(), Err(SigningError::InvalidPath(_))),
                "{} should be rejected",
                bad
            );
        }
    }
}
