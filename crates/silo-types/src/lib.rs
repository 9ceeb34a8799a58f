//! Base value types shared across the Silo client crates.
//!
//! Everything here is a small validated newtype over what the node puts on
//! the wire: content identifiers in IPLD link form, atto-denominated token
//! amounts carried as decimal strings, and the address/peer identifier
//! family. These types own parsing and display; protocol behavior lives in
//! `silo-market`.

pub mod address;
pub mod amount;
pub mod cid;
pub mod error;

pub use address::{MinerId, PeerId, WalletAddress, MAINNET_PREFIX, TESTNET_PREFIX};
pub use amount::{TokenAmount, ATTO_PER_SILO, SILO_DECIMALS};
pub use cid::ContentId;
pub use error::{Result, SiloError};
