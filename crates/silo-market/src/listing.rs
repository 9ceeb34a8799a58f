use silo_types::ContentId;
use tracing::{debug, warn};

use crate::client::NodeClient;
use crate::deal_state::DealState;
use crate::error::{MarketError, Result};
use crate::types::DealRecord;

/// Sort deals ascending by `deal_id`, preserving input order between equal
/// ids.
pub fn rank_deals(mut deals: Vec<DealRecord>) -> Vec<DealRecord> {
    deals.sort_by_key(|deal| deal.deal_id);
    deals
}

/// Interpret each record's status code in isolation.
///
/// One unrecognized code does not poison the batch: its slot carries the
/// error and every other record still resolves.
pub fn interpret_deals(records: &[DealRecord]) -> Vec<Result<DealState>> {
    records
        .iter()
        .map(|record| DealState::interpret(record.deal_id, record.state))
        .collect()
}

/// A record whose status code could not be interpreted.
#[derive(Debug)]
pub struct ListingFailure {
    pub deal_id: u64,
    pub error: MarketError,
}

/// Ranked, interpreted view of the node's deal list.
#[derive(Debug, Default)]
pub struct DealListing {
    /// Deals with a recognized status, ascending by deal id
    pub deals: Vec<DealState>,
    /// Deals whose reported code fell outside the catalog
    pub failures: Vec<ListingFailure>,
}

impl DealListing {
    /// Rank raw records, then interpret each one in isolation.
    pub fn from_records(records: Vec<DealRecord>) -> DealListing {
        let ranked = rank_deals(records);
        let mut listing = DealListing::default();
        for (record, interpreted) in ranked.iter().zip(interpret_deals(&ranked)) {
            match interpreted {
                Ok(state) => listing.deals.push(state),
                Err(error) => listing.failures.push(ListingFailure {
                    deal_id: record.deal_id,
                    error,
                }),
            }
        }
        listing
    }

    /// Fetch the node's deal list and interpret it.
    pub async fn fetch(node: &dyn NodeClient) -> Result<DealListing> {
        let records = node.list_deals().await?;
        debug!(count = records.len(), "📥 Fetched deal records");

        let listing = DealListing::from_records(records);
        for failure in &listing.failures {
            warn!(
                deal_id = failure.deal_id,
                error = %failure.error,
                "⚠️ Skipping deal with unrecognized status code"
            );
        }
        Ok(listing)
    }

    /// Fetch and interpret a single deal by its proposal identifier.
    pub async fn fetch_one(node: &dyn NodeClient, proposal: &ContentId) -> Result<DealState> {
        let record = node
            .deal_info(proposal)
            .await
            .map_err(|source| MarketError::Query {
                root: proposal.clone(),
                source,
            })?;
        DealState::interpret(record.deal_id, record.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deal_state::DealClassification;
    use chrono::Utc;
    use silo_types::{MinerId, TokenAmount};

    fn record(deal_id: u64, code: u64, size_bytes: u64) -> DealRecord {
        DealRecord {
            proposal_cid: ContentId::parse("bafyproposal0001").unwrap(),
            state: code,
            message: String::new(),
            provider: MinerId::parse("s01000").unwrap(),
            size_bytes,
            price_per_epoch: TokenAmount::ZERO,
            duration_epochs: 1480,
            deal_id,
            verified: false,
            creation_time: Utc::now(),
        }
    }

    #[test]
    fn test_rank_deals_orders_by_id() {
        let ranked = rank_deals(vec![
            record(9, 6, 0),
            record(2, 5, 0),
            record(5, 16, 0),
        ]);
        let ids: Vec<u64> = ranked.iter().map(|r| r.deal_id).collect();
        assert_eq!(ids, vec![2, 5, 9]);
    }

    #[test]
    fn test_rank_deals_is_stable_for_equal_ids() {
        let ranked = rank_deals(vec![
            record(7, 6, 111),
            record(3, 5, 0),
            record(7, 16, 222),
        ]);
        assert_eq!(ranked[0].deal_id, 3);
        // The two id-7 records keep their input order
        assert_eq!(ranked[1].size_bytes, 111);
        assert_eq!(ranked[2].size_bytes, 222);
    }

    #[test]
    fn test_interpretation_failures_are_isolated() {
        let listing = DealListing::from_records(vec![
            record(1, 6, 0),
            record(2, 999, 0),
            record(3, 22, 0),
        ]);

        assert_eq!(listing.deals.len(), 2);
        assert_eq!(listing.deals[0].classification(), DealClassification::Success);
        assert_eq!(listing.deals[1].classification(), DealClassification::Failure);

        assert_eq!(listing.failures.len(), 1);
        assert_eq!(listing.failures[0].deal_id, 2);
        assert!(matches!(
            listing.failures[0].error,
            MarketError::UnknownDealState { deal_id: 2, code: 999 }
        ));
    }

    #[test]
    fn test_from_records_ranks_before_interpreting() {
        let listing = DealListing::from_records(vec![
            record(30, 6, 0),
            record(10, 6, 0),
            record(20, 999, 0),
        ]);
        let ids: Vec<u64> = listing.deals.iter().map(|d| d.deal_id).collect();
        assert_eq!(ids, vec![10, 30]);
        assert_eq!(listing.failures[0].deal_id, 20);
    }

    #[test]
    fn test_empty_listing() {
        let listing = DealListing::from_records(Vec::new());
        assert!(listing.deals.is_empty());
        assert!(listing.failures.is_empty());
    }
}
