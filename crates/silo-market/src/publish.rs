//! Publishing content as storage deals.
//!
//! A payload is imported into the content store, which splits it into one or
//! more chunks. Every chunk root is proposed to the configured miner as its
//! own storage deal; the publisher stops at the first chunk or proposal that
//! fails and reports which root it was handling.

use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use silo_types::{ContentId, MinerId, TokenAmount, WalletAddress};
use tracing::{debug, info, warn};

use crate::client::{ContentStore, NodeClient};
use crate::error::{MarketError, Result};

/// Data transfer channel used for deal payloads
pub const GRAPHSYNC_TRANSFER: &str = "graphsync";

/// Default minimum deal duration, in blocks
pub const DEFAULT_MIN_DURATION_BLOCKS: u64 = 300;

/// Reference to the payload a deal stores.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DataRef {
    pub transfer_type: String,
    pub root: ContentId,
    /// Filled in by the node once the piece is computed
    pub piece_cid: Option<ContentId>,
    pub piece_size: u64,
}

impl DataRef {
    /// Graphsync reference to a chunk root; the node computes the piece.
    pub fn graphsync(root: ContentId) -> DataRef {
        DataRef {
            transfer_type: GRAPHSYNC_TRANSFER.to_string(),
            root,
            piece_cid: None,
            piece_size: 0,
        }
    }
}

/// Storage deal proposal submitted to the node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DealProposal {
    pub data: DataRef,
    pub wallet: WalletAddress,
    pub miner: MinerId,
    pub epoch_price: TokenAmount,
    pub min_blocks_duration: u64,
}

impl DealProposal {
    pub fn for_chunk(root: ContentId, wallet: WalletAddress, terms: &DealTerms) -> DealProposal {
        DealProposal {
            data: DataRef::graphsync(root),
            wallet,
            miner: terms.miner.clone(),
            epoch_price: terms.epoch_price,
            min_blocks_duration: terms.min_blocks_duration,
        }
    }
}

/// Commercial terms a publisher proposes to one miner.
#[derive(Debug, Clone)]
pub struct DealTerms {
    pub miner: MinerId,
    /// Price offered per epoch of storage
    pub epoch_price: TokenAmount,
    pub min_blocks_duration: u64,
}

impl DealTerms {
    pub fn new(miner: MinerId, epoch_price: TokenAmount) -> DealTerms {
        DealTerms {
            miner,
            epoch_price,
            min_blocks_duration: DEFAULT_MIN_DURATION_BLOCKS,
        }
    }

    /// Smallest total spend these terms can settle at, `None` on overflow
    pub fn min_total_price(&self) -> Option<TokenAmount> {
        self.epoch_price.checked_mul(self.min_blocks_duration)
    }
}

/// One deal accepted by the node for a published chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedDeal {
    /// Proposal identifier the node assigned to the deal
    pub deal_cid: ContentId,
    /// Chunk root the deal stores
    pub root: ContentId,
}

/// Imports payloads and proposes a storage deal per chunk.
pub struct DealPublisher {
    terms: DealTerms,
}

impl DealPublisher {
    pub fn new(terms: DealTerms) -> Self {
        Self { terms }
    }

    pub fn terms(&self) -> &DealTerms {
        &self.terms
    }

    /// Import `payload` and propose one deal per stored chunk.
    ///
    /// Chunks are proposed in store order. The first failing chunk or
    /// proposal aborts the run; deals already accepted by the node stay
    /// accepted and are not rolled back.
    pub async fn publish(
        &self,
        store: &dyn ContentStore,
        node: &dyn NodeClient,
        payload: Vec<u8>,
        wallet: WalletAddress,
    ) -> Result<Vec<PublishedDeal>> {
        let payload_len = payload.len();
        let mut chunks = store.add_content(payload).await.map_err(|source| {
            MarketError::Publish {
                root: None,
                source,
            }
        })?;
        debug!(bytes = payload_len, "📥 Importing payload into content store");

        let mut published = Vec::new();
        while let Some(item) = chunks.next().await {
            let chunk = item.map_err(|source| MarketError::Publish {
                root: None,
                source,
            })?;

            let proposal =
                DealProposal::for_chunk(chunk.root.clone(), wallet.clone(), &self.terms);
            let deal_cid = match node.start_deal(&proposal).await {
                Ok(deal_cid) => deal_cid,
                Err(source) => {
                    return Err(MarketError::Publish {
                        root: Some(chunk.root),
                        source,
                    })
                }
            };

            info!(
                deal = %deal_cid,
                root = %chunk.root,
                miner = %self.terms.miner,
                price = %self.terms.epoch_price,
                "✅ Storage deal published"
            );
            published.push(PublishedDeal {
                deal_cid,
                root: chunk.root,
            });
        }

        if published.is_empty() {
            warn!("⚠️ Content store produced no chunks for payload");
        }
        Ok(published)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms() -> DealTerms {
        DealTerms::new(
            MinerId::parse("s01000").unwrap(),
            TokenAmount::from_attos(2_500_000_000),
        )
    }

    #[test]
    fn test_terms_default_duration() {
        let terms = terms();
        assert_eq!(terms.min_blocks_duration, 300);
        assert_eq!(
            terms.min_total_price(),
            Some(TokenAmount::from_attos(750_000_000_000))
        );
    }

    #[test]
    fn test_min_total_price_overflow() {
        let terms = DealTerms {
            miner: MinerId::parse("s01000").unwrap(),
            epoch_price: TokenAmount::from_attos(u128::MAX),
            min_blocks_duration: 2,
        };
        assert_eq!(terms.min_total_price(), None);
    }

    #[test]
    fn test_proposal_wire_shape() {
        let root = ContentId::parse("bafychunkroot001").unwrap();
        let wallet = WalletAddress::parse("s1clientwallet001").unwrap();
        let proposal = DealProposal::for_chunk(root, wallet, &terms());

        let value = serde_json::to_value(&proposal).unwrap();
        assert_eq!(value["Data"]["TransferType"], "graphsync");
        assert_eq!(value["Data"]["Root"]["/"], "bafychunkroot001");
        assert_eq!(value["Data"]["PieceCid"], serde_json::Value::Null);
        assert_eq!(value["Data"]["PieceSize"], 0);
        assert_eq!(value["Wallet"], "s1clientwallet001");
        assert_eq!(value["Miner"], "s01000");
        assert_eq!(value["EpochPrice"], "2500000000");
        assert_eq!(value["MinBlocksDuration"], 300);
    }
}
