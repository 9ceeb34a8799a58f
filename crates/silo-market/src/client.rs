use async_trait::async_trait;
use futures_util::stream::BoxStream;
use silo_types::{ContentId, MinerId, TokenAmount, WalletAddress};
use thiserror::Error;

use crate::publish::DealProposal;
use crate::retrieval::{FileDestination, RetrievalOfferRaw, RetrievalOrder};
use crate::types::{AddedChunk, ChainHead, DealRecord, MinerPower, RetrievalReceipt};

#[derive(Error, Debug)]
pub enum RpcError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Node rejected request: {code} {message}")]
    Rejected { code: i64, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type RpcResult<T> = std::result::Result<T, RpcError>;

/// Stream of chunks produced while content is imported into a store.
///
/// Large payloads are split by the store; each item carries the root of one
/// stored chunk. An `Err` item aborts the import at that position.
pub type ChunkStream = BoxStream<'static, RpcResult<AddedChunk>>;

/// Trait for Silo node RPC implementations
#[async_trait]
pub trait NodeClient: Send + Sync {
    /// List all storage deals this client participates in
    async fn list_deals(&self) -> RpcResult<Vec<DealRecord>>;

    /// Look up a single deal by its proposal identifier
    async fn deal_info(&self, proposal: &ContentId) -> RpcResult<DealRecord>;

    /// Query providers for retrieval offers on a payload
    async fn find_offers(&self, root: &ContentId) -> RpcResult<Vec<RetrievalOfferRaw>>;

    /// Execute a retrieval transfer to a local destination
    async fn start_retrieval(
        &self,
        order: &RetrievalOrder,
        destination: &FileDestination,
    ) -> RpcResult<RetrievalReceipt>;

    /// Check whether the payload is already present locally
    async fn has_local_content(&self, root: &ContentId) -> RpcResult<bool>;

    /// Propose a new storage deal to a miner
    async fn start_deal(&self, proposal: &DealProposal) -> RpcResult<ContentId>;

    /// Get the node's default wallet address
    async fn default_wallet_address(&self) -> RpcResult<WalletAddress>;

    /// Get the balance of a wallet address
    async fn wallet_balance(&self, address: &WalletAddress) -> RpcResult<TokenAmount>;

    /// Get the current chain head
    async fn chain_head(&self) -> RpcResult<ChainHead>;

    /// List all miners known to the chain state
    async fn list_miners(&self) -> RpcResult<Vec<MinerId>>;

    /// Get the power figures of a single miner
    async fn miner_power(&self, miner: &MinerId) -> RpcResult<MinerPower>;
}

/// Trait for content store implementations
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Import a payload, yielding one chunk per stored block root
    async fn add_content(&self, payload: Vec<u8>) -> RpcResult<ChunkStream>;
}
