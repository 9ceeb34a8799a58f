use crate::error::{Result, SiloError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Network prefix for mainnet addresses.
pub const MAINNET_PREFIX: &str = "s";
/// Network prefix for testnet addresses.
pub const TESTNET_PREFIX: &str = "ts";

fn split_prefix(s: &str) -> Option<&str> {
    s.strip_prefix(TESTNET_PREFIX)
        .or_else(|| s.strip_prefix(MAINNET_PREFIX))
}

/// Wallet address on the Silo network.
///
/// Addresses are `s…` (mainnet) or `ts…` (testnet) followed by a protocol
/// digit and a payload. Key material never appears here: an address is just
/// the identity a node reports and a proposal or order names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct WalletAddress(String);

impl WalletAddress {
    pub fn parse(address: impl Into<String>) -> Result<Self> {
        let address = address.into();
        let valid = matches!(
            split_prefix(&address),
            Some(rest) if rest.len() >= 2
                && rest.starts_with(|c: char| ('0'..='3').contains(&c))
                && rest.bytes().all(|b| b.is_ascii_alphanumeric())
        );
        if !valid {
            return Err(SiloError::InvalidAddress(address));
        }
        Ok(Self(address))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Miner actor id, the `s0…`/`ts0…` form of a storage provider's address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct MinerId(String);

impl MinerId {
    pub fn parse(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        let valid = matches!(
            split_prefix(&id),
            Some(rest) if rest.len() >= 2
                && rest.starts_with('0')
                && rest[1..].bytes().all(|b| b.is_ascii_digit())
        );
        if !valid {
            return Err(SiloError::InvalidMinerId(id));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Transport-level peer identity of a provider, opaque to this client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct PeerId(String);

impl PeerId {
    pub fn parse(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.len() < 8 || !id.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(SiloError::InvalidPeerId(id));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

macro_rules! string_newtype_impls {
    ($($ty:ident),*) => {
        $(
            impl From<$ty> for String {
                fn from(value: $ty) -> Self {
                    value.0
                }
            }

            impl TryFrom<String> for $ty {
                type Error = SiloError;

                fn try_from(s: String) -> Result<Self> {
                    Self::parse(s)
                }
            }

            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }
        )*
    };
}

string_newtype_impls!(WalletAddress, MinerId, PeerId);
