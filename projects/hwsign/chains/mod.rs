//! Chain-specific signing flows

pub mod ethereum;
