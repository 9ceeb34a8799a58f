//! # Silo Market
//!
//! Client-side deal lifecycle and retrieval negotiation for the Silo storage
//! network.
//!
//! ## Overview
//!
//! A Silo node exposes its market, wallet, and chain state over RPC. This
//! crate reads that state and drives the client-side workflows on top of it:
//! interpreting reported deal statuses, negotiating payload retrievals
//! against provider offers, and publishing content as storage deals.
//!
//! ## Architecture
//!
//! - **Status Interpretation**: the protocol's integer status codes resolved
//!   against a closed catalog, never guessed
//! - **Deal Listing**: ranked view of every deal the client participates in,
//!   with per-record failure isolation
//! - **Retrieval Negotiation**: phase-tracked offer selection and transfer
//!   hand-off, cancellable mid-transfer
//! - **Publishing**: chunked payload import with one storage deal proposed
//!   per chunk root
//! - **Wallet and Chain Views**: balance, chain head, and miner power
//!   snapshots
//!
//! All network access goes through the [`NodeClient`] and [`ContentStore`]
//! traits; nothing in this crate talks to a socket directly.

pub mod chain;
pub mod client;
pub mod deal_state;
pub mod error;
pub mod listing;
pub mod publish;
pub mod retrieval;
pub mod types;
pub mod wallet;

pub use chain::{chain_head, MinerListing, MinerSurvey, SurveyFailure};
pub use client::{ChunkStream, ContentStore, NodeClient, RpcError, RpcResult};
pub use deal_state::{DealClassification, DealState, DealStatus, DEAL_STATUS_CATALOG};
pub use error::{MarketError, OfferDefect, Result};
pub use listing::{interpret_deals, rank_deals, DealListing, ListingFailure};
pub use publish::{
    DataRef, DealProposal, DealPublisher, DealTerms, PublishedDeal, DEFAULT_MIN_DURATION_BLOCKS,
    GRAPHSYNC_TRANSFER,
};
pub use retrieval::{
    FileDestination, RetrievalAttempt, RetrievalConfig, RetrievalDelivery, RetrievalNegotiator,
    RetrievalOffer, RetrievalOfferRaw, RetrievalOrder, RetrievalPhase,
};
pub use types::{AddedChunk, ChainHead, DealRecord, MinerPower, RetrievalReceipt};
pub use wallet::WalletSummary;
