use silo_types::{ContentId, MinerId};
use thiserror::Error;

use crate::client::RpcError;

/// Reasons an offer returned by a provider is rejected during validation.
///
/// Offers arrive from untrusted peers, so every field is checked before the
/// negotiator acts on one. The defect names the first check that failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OfferDefect {
    /// Provider attached an error message instead of a usable offer
    #[error("provider reported: {0}")]
    PeerReported(String),

    /// Root field fails content identifier validation
    #[error("invalid offer root {0:?}")]
    InvalidRoot(String),

    /// Offer is for a different payload than the one queried
    #[error("offer root {offered} does not match the queried root")]
    RootMismatch { offered: ContentId },

    /// Offer advertises a zero-byte payload
    #[error("offer advertises zero size")]
    ZeroSize,

    /// Price field is not a non-negative integer amount
    #[error("unparseable price {0:?}")]
    InvalidPrice(String),

    /// Miner identifier fails address validation
    #[error("invalid miner identifier {0:?}")]
    InvalidMiner(String),

    /// Miner peer identifier fails validation
    #[error("invalid miner peer identifier {0:?}")]
    InvalidPeer(String),
}

/// Storage market error types
#[derive(Error, Debug)]
pub enum MarketError {
    /// Node reported a deal status code outside the known catalog
    #[error("Unknown deal state: deal {deal_id} reported status code {code}")]
    UnknownDealState { deal_id: u64, code: u64 },

    /// A node query scoped to one content identifier failed
    #[error("Query for {root} failed: {source}")]
    Query {
        root: ContentId,
        #[source]
        source: RpcError,
    },

    /// No provider answered the retrieval query
    #[error("No offers available for {root}")]
    NoOffersAvailable { root: ContentId },

    /// The selected offer failed validation
    #[error("Malformed offer for {root} from {miner:?}: {defect}")]
    MalformedOffer {
        root: ContentId,
        miner: String,
        defect: OfferDefect,
    },

    /// The retrieval transfer itself failed after an offer was accepted
    #[error("Retrieval of {root} from {miner} failed: {source}")]
    RetrievalTransport {
        root: ContentId,
        miner: MinerId,
        #[source]
        source: RpcError,
    },

    /// The retrieval was cancelled before the transfer finished
    #[error("Retrieval of {root} cancelled")]
    Cancelled { root: ContentId },

    /// Publishing content as a storage deal failed
    #[error("Publish failed{}: {source}", root_suffix(.root))]
    Publish {
        root: Option<ContentId>,
        #[source]
        source: RpcError,
    },

    /// Invalid retrieval phase transition
    #[error("Invalid phase transition: from {from:?} to {to:?}")]
    InvalidPhaseTransition { from: String, to: String },

    /// Node RPC failure outside any more specific context
    #[error("Node error: {0}")]
    Node(#[from] RpcError),
}

fn root_suffix(root: &Option<ContentId>) -> String {
    match root {
        Some(root) => format!(" for {root}"),
        None => String::new(),
    }
}

/// Result type for storage market operations
pub type Result<T> = std::result::Result<T, MarketError>;
