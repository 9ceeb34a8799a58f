use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use silo_types::{ContentId, MinerId, TokenAmount};

/// One storage deal as reported by the node's market API.
///
/// `state` is the raw protocol status code; interpret it through
/// [`crate::DealState::interpret`] before acting on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DealRecord {
    pub proposal_cid: ContentId,
    pub state: u64,
    /// Progress or failure note attached by the node, often empty
    pub message: String,
    pub provider: MinerId,
    #[serde(rename = "Size")]
    pub size_bytes: u64,
    pub price_per_epoch: TokenAmount,
    #[serde(rename = "Duration")]
    pub duration_epochs: u64,
    #[serde(rename = "DealID")]
    pub deal_id: u64,
    pub verified: bool,
    pub creation_time: DateTime<Utc>,
}

/// Outcome of a completed retrieval transfer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RetrievalReceipt {
    pub bytes_written: u64,
}

/// One stored chunk produced while importing content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AddedChunk {
    /// Import path of the chunk within the store
    pub path: String,
    /// Root of the stored chunk, used as the deal payload identifier
    pub root: ContentId,
}

/// Current head of the chain as seen by the node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChainHead {
    pub cids: Vec<ContentId>,
    pub height: u64,
}

/// Power figures for a single miner.
///
/// The node reports power as decimal strings because the values exceed what
/// common JSON consumers handle as numbers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MinerPower {
    pub raw_byte_power: String,
    #[serde(rename = "QualityAdjPower")]
    pub quality_adjusted_power: String,
}

impl MinerPower {
    /// Raw storage power in bytes, if the reported string parses
    pub fn raw_bytes(&self) -> Option<u128> {
        parse_power(&self.raw_byte_power)
    }

    /// Quality-adjusted power in bytes, if the reported string parses
    pub fn quality_adjusted_bytes(&self) -> Option<u128> {
        parse_power(&self.quality_adjusted_power)
    }
}

fn parse_power(s: &str) -> Option<u128> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deal_record_wire_shape() {
        let json = r#"{
            "ProposalCid": {"/": "bafyproposal0001"},
            "State": 6,
            "Message": "",
            "Provider": "s01000",
            "Size": 2048,
            "PricePerEpoch": "500000000000",
            "Duration": 1480,
            "DealID": 77,
            "Verified": false,
            "CreationTime": "2024-03-01T12:00:00Z"
        }"#;

        let record: DealRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.state, 6);
        assert_eq!(record.deal_id, 77);
        assert_eq!(record.size_bytes, 2048);
        assert_eq!(record.provider.as_str(), "s01000");
        assert_eq!(
            record.price_per_epoch,
            TokenAmount::from_attos(500_000_000_000)
        );

        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back["DealID"], 77);
        assert_eq!(back["Size"], 2048);
        assert_eq!(back["ProposalCid"]["/"], "bafyproposal0001");
    }

    #[test]
    fn test_miner_power_parsing() {
        let power = MinerPower {
            raw_byte_power: "109951162777600".to_string(),
            quality_adjusted_power: "219902325555200".to_string(),
        };
        assert_eq!(power.raw_bytes(), Some(109_951_162_777_600));
        assert_eq!(power.quality_adjusted_bytes(), Some(219_902_325_555_200));

        let bad = MinerPower {
            raw_byte_power: "".to_string(),
            quality_adjusted_power: "+5".to_string(),
        };
        assert_eq!(bad.raw_bytes(), None);
        assert_eq!(bad.quality_adjusted_bytes(), None);
    }

    #[test]
    fn test_chain_head_wire_shape() {
        let json = r#"{"Cids": [{"/": "bafyheadblock001"}], "Height": 250344}"#;
        let head: ChainHead = serde_json::from_str(json).unwrap();
        assert_eq!(head.height, 250344);
        assert_eq!(head.cids.len(), 1);
        assert_eq!(head.cids[0].as_str(), "bafyheadblock001");
    }
}
