//! Chain and miner views read from the node.

use futures_util::future::join_all;
use silo_types::MinerId;
use tracing::{debug, warn};

use crate::client::NodeClient;
use crate::error::{MarketError, Result};
use crate::types::{ChainHead, MinerPower};

/// Fetch the node's current chain head.
pub async fn chain_head(node: &dyn NodeClient) -> Result<ChainHead> {
    let head = node.chain_head().await?;
    debug!(
        height = head.height,
        blocks = head.cids.len(),
        "Chain head fetched"
    );
    Ok(head)
}

/// Power figures for one miner.
#[derive(Debug, Clone)]
pub struct MinerListing {
    pub miner: MinerId,
    pub power: MinerPower,
}

/// A miner whose power lookup failed.
#[derive(Debug)]
pub struct SurveyFailure {
    pub miner: MinerId,
    pub error: MarketError,
}

/// Power survey across every miner the chain knows.
#[derive(Debug, Default)]
pub struct MinerSurvey {
    pub miners: Vec<MinerListing>,
    pub failures: Vec<SurveyFailure>,
}

impl MinerSurvey {
    /// List miners and fetch their power figures concurrently.
    ///
    /// One miner's failed lookup lands in `failures` without touching the
    /// rest of the survey.
    pub async fn fetch(node: &dyn NodeClient) -> Result<MinerSurvey> {
        let ids = node.list_miners().await?;
        debug!(count = ids.len(), "🔍 Surveying miners");

        let results = join_all(ids.iter().map(|miner| node.miner_power(miner))).await;

        let mut survey = MinerSurvey::default();
        for (miner, result) in ids.into_iter().zip(results) {
            match result {
                Ok(power) => survey.miners.push(MinerListing { miner, power }),
                Err(error) => {
                    warn!(miner = %miner, error = %error, "⚠️ Miner power lookup failed");
                    survey.failures.push(SurveyFailure {
                        miner,
                        error: MarketError::Node(error),
                    });
                }
            }
        }
        Ok(survey)
    }

    /// Total raw power of the successfully surveyed miners, in bytes.
    ///
    /// Miners whose power string does not parse contribute nothing.
    pub fn total_raw_power(&self) -> u128 {
        self.miners
            .iter()
            .filter_map(|listing| listing.power.raw_bytes())
            .fold(0u128, |total, power| total.saturating_add(power))
    }
}
