use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SiloError {
    #[error("Invalid content identifier: {0}")]
    InvalidCid(String),

    #[error("Invalid wallet address: {0}")]
    InvalidAddress(String),

    #[error("Invalid miner id: {0}")]
    InvalidMinerId(String),

    #[error("Invalid peer id: {0}")]
    InvalidPeerId(String),

    #[error("Invalid token amount: {0}")]
    InvalidAmount(String),
}

pub type Result<T> = std::result::Result<T, SiloError>;
