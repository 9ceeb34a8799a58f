//! Retrieval negotiation against provider offers.
//!
//! The negotiator drives one payload retrieval end to end:
//! - query providers for offers on a root
//! - validate and select the first usable offer
//! - place an order committing to the offer's asking price
//! - hand the transfer to the node and account for the outcome
//!
//! Transfers themselves run inside the node. This module owns offer
//! validation, phase tracking, and where the payload lands on disk.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use silo_types::{ContentId, MinerId, PeerId, TokenAmount, WalletAddress};
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::client::NodeClient;
use crate::error::{MarketError, OfferDefect, Result};
use crate::types::RetrievalReceipt;

/// A retrieval offer exactly as a provider sent it.
///
/// Providers are untrusted, so nothing here beyond JSON structure is
/// guaranteed; [`RetrievalOfferRaw::validate`] turns one into a usable
/// [`RetrievalOffer`] or names the defect.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RetrievalOfferRaw {
    /// Root in the node's link envelope, inner text unvalidated
    #[serde(with = "silo_types::cid::raw_link")]
    pub root: String,
    pub size: u64,
    /// Asking price in attos, unparsed
    pub min_price: String,
    pub payment_interval: u64,
    pub payment_interval_increase: u64,
    pub miner: String,
    #[serde(rename = "MinerPeerID")]
    pub miner_peer_id: String,
    /// Error message a provider may attach instead of a usable offer
    #[serde(default)]
    pub err: Option<String>,
}

impl RetrievalOfferRaw {
    /// Validate every field against the root the query was for.
    pub fn validate(
        &self,
        queried_root: &ContentId,
    ) -> std::result::Result<RetrievalOffer, OfferDefect> {
        if let Some(err) = &self.err {
            if !err.is_empty() {
                return Err(OfferDefect::PeerReported(err.clone()));
            }
        }

        if self.size == 0 {
            return Err(OfferDefect::ZeroSize);
        }

        let min_price = TokenAmount::parse_attos(&self.min_price)
            .map_err(|_| OfferDefect::InvalidPrice(self.min_price.clone()))?;

        let miner = MinerId::parse(self.miner.clone())
            .map_err(|_| OfferDefect::InvalidMiner(self.miner.clone()))?;

        let miner_peer = PeerId::parse(self.miner_peer_id.clone())
            .map_err(|_| OfferDefect::InvalidPeer(self.miner_peer_id.clone()))?;

        let root = ContentId::parse(self.root.clone())
            .map_err(|_| OfferDefect::InvalidRoot(self.root.clone()))?;
        if &root != queried_root {
            return Err(OfferDefect::RootMismatch { offered: root });
        }

        Ok(RetrievalOffer {
            root,
            size: self.size,
            min_price,
            payment_interval: self.payment_interval,
            payment_interval_increase: self.payment_interval_increase,
            miner,
            miner_peer,
        })
    }
}

/// An offer that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalOffer {
    pub root: ContentId,
    pub size: u64,
    /// Asking price for the whole payload, in attos
    pub min_price: TokenAmount,
    pub payment_interval: u64,
    pub payment_interval_increase: u64,
    pub miner: MinerId,
    pub miner_peer: PeerId,
}

/// Retrieval order submitted to the node to execute a transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RetrievalOrder {
    pub root: ContentId,
    pub size: u64,
    /// Payment ceiling for the transfer
    pub total: TokenAmount,
    pub payment_interval: u64,
    pub payment_interval_increase: u64,
    pub client: WalletAddress,
    pub miner: MinerId,
    #[serde(rename = "MinerPeerID")]
    pub miner_peer: PeerId,
}

impl RetrievalOrder {
    /// Build an order from a validated offer.
    ///
    /// `total` commits to exactly the offer's asking price; the node rejects
    /// any transfer that would cost more.
    pub fn from_offer(offer: &RetrievalOffer, client: WalletAddress) -> RetrievalOrder {
        RetrievalOrder {
            root: offer.root.clone(),
            size: offer.size,
            total: offer.min_price,
            payment_interval: offer.payment_interval,
            payment_interval_increase: offer.payment_interval_increase,
            client,
            miner: offer.miner.clone(),
            miner_peer: offer.miner_peer.clone(),
        }
    }
}

/// Where a retrieved payload is written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FileDestination {
    pub path: PathBuf,
    #[serde(rename = "IsCAR")]
    pub is_car: bool,
}

impl FileDestination {
    /// Pick a fresh destination for a payload.
    ///
    /// The file name carries the root plus a random nonce so concurrent
    /// retrievals of the same payload never write to the same path.
    pub fn fresh(config: &RetrievalConfig, root: &ContentId) -> FileDestination {
        let nonce: u64 = rand::random();
        let extension = if config.as_car { "car" } else { "bin" };
        let path = config
            .output_dir
            .join(format!("{}-{}.{}", root, nonce, extension));
        FileDestination {
            path,
            is_car: config.as_car,
        }
    }
}

/// Configuration for retrieval transfers
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    /// Directory retrieved payloads are written into
    pub output_dir: PathBuf,
    /// Write payloads as CAR archives instead of raw bytes
    pub as_car: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("retrievals"),
            as_car: false,
        }
    }
}

/// Phase of a single retrieval attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetrievalPhase {
    /// Collecting offers from providers
    Querying,
    /// A validated offer is held, no transfer started yet
    OfferSelected,
    /// Transfer handed to the node, waiting for the outcome
    Retrieving,
    /// Payload written to its destination
    Completed,
    /// Attempt ended without a payload
    Failed,
}

impl RetrievalPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, RetrievalPhase::Completed | RetrievalPhase::Failed)
    }

    pub fn can_transition_to(self, next: RetrievalPhase) -> bool {
        use RetrievalPhase::*;
        match (self, next) {
            // From Querying
            (Querying, OfferSelected) => true,
            (Querying, Failed) => true, // No offers, or first offer malformed

            // From OfferSelected
            (OfferSelected, Retrieving) => true,
            (OfferSelected, Failed) => true,

            // From Retrieving
            (Retrieving, Completed) => true,
            (Retrieving, Failed) => true, // Transfer error or cancellation

            // Terminal states cannot transition
            (Completed, _) | (Failed, _) => false,

            // All other transitions are invalid
            _ => false,
        }
    }
}

/// Everything a finished retrieval produced.
#[derive(Debug, Clone)]
pub struct RetrievalDelivery {
    pub root: ContentId,
    pub miner: MinerId,
    pub path: PathBuf,
    pub bytes_written: u64,
}

/// State machine for one retrieval attempt.
///
/// Each step validates the current phase before acting, so the attempt can
/// be driven directly in tests without a node. Failure from any non-terminal
/// phase is always allowed; forward movement never skips a phase.
#[derive(Debug)]
pub struct RetrievalAttempt {
    root: ContentId,
    client: WalletAddress,
    phase: RetrievalPhase,
    offer: Option<RetrievalOffer>,
    order: Option<RetrievalOrder>,
    destination: Option<FileDestination>,
}

fn invalid_transition(from: RetrievalPhase, to: RetrievalPhase) -> MarketError {
    MarketError::InvalidPhaseTransition {
        from: format!("{:?}", from),
        to: format!("{:?}", to),
    }
}

impl RetrievalAttempt {
    pub fn new(root: ContentId, client: WalletAddress) -> Self {
        Self {
            root,
            client,
            phase: RetrievalPhase::Querying,
            offer: None,
            order: None,
            destination: None,
        }
    }

    pub fn root(&self) -> &ContentId {
        &self.root
    }

    pub fn phase(&self) -> RetrievalPhase {
        self.phase
    }

    /// The validated offer this attempt committed to, once one is selected
    pub fn selected_offer(&self) -> Option<&RetrievalOffer> {
        self.offer.as_ref()
    }

    fn transition_to(&mut self, next: RetrievalPhase) -> Result<()> {
        if !self.phase.can_transition_to(next) {
            return Err(invalid_transition(self.phase, next));
        }
        debug!(
            root = %self.root,
            from = ?self.phase,
            to = ?next,
            "Retrieval phase advanced"
        );
        self.phase = next;
        Ok(())
    }

    /// Move to `Failed` from any non-terminal phase and hand the error back.
    pub fn fail(&mut self, error: MarketError) -> MarketError {
        if !self.phase.is_terminal() {
            debug!(root = %self.root, from = ?self.phase, "Retrieval attempt failed");
            self.phase = RetrievalPhase::Failed;
        }
        error
    }

    /// Validate and commit to the first offer in the response.
    ///
    /// An empty response or a first offer that fails validation moves the
    /// attempt to `Failed`; a later offer in the list is never consulted.
    pub fn select_offer(&mut self, offers: &[RetrievalOfferRaw]) -> Result<&RetrievalOffer> {
        if self.phase != RetrievalPhase::Querying {
            return Err(invalid_transition(self.phase, RetrievalPhase::OfferSelected));
        }

        let first = match offers.first() {
            Some(first) => first,
            None => {
                return Err(self.fail(MarketError::NoOffersAvailable {
                    root: self.root.clone(),
                }))
            }
        };

        match first.validate(&self.root) {
            Ok(offer) => {
                self.transition_to(RetrievalPhase::OfferSelected)?;
                info!(
                    root = %self.root,
                    miner = %offer.miner,
                    price = %offer.min_price,
                    size = offer.size,
                    "✅ Offer selected"
                );
                Ok(self.offer.insert(offer))
            }
            Err(defect) => {
                warn!(
                    root = %self.root,
                    miner = %first.miner,
                    defect = %defect,
                    "⚠️ First offer failed validation"
                );
                Err(self.fail(MarketError::MalformedOffer {
                    root: self.root.clone(),
                    miner: first.miner.clone(),
                    defect,
                }))
            }
        }
    }

    /// Build the order and destination for the selected offer and move to
    /// `Retrieving`.
    pub fn begin_transfer(
        &mut self,
        config: &RetrievalConfig,
    ) -> Result<(RetrievalOrder, FileDestination)> {
        let offer = self
            .offer
            .as_ref()
            .ok_or_else(|| invalid_transition(self.phase, RetrievalPhase::Retrieving))?
            .clone();
        self.transition_to(RetrievalPhase::Retrieving)?;

        let order = RetrievalOrder::from_offer(&offer, self.client.clone());
        let destination = FileDestination::fresh(config, &self.root);
        info!(
            root = %self.root,
            miner = %offer.miner,
            total = %order.total,
            path = %destination.path.display(),
            "📥 Starting retrieval transfer"
        );

        self.order = Some(order.clone());
        self.destination = Some(destination.clone());
        Ok((order, destination))
    }

    /// Record the node's receipt and move to `Completed`.
    pub fn complete(&mut self, receipt: RetrievalReceipt) -> Result<RetrievalDelivery> {
        let order = self
            .order
            .clone()
            .ok_or_else(|| invalid_transition(self.phase, RetrievalPhase::Completed))?;
        let destination = self
            .destination
            .clone()
            .ok_or_else(|| invalid_transition(self.phase, RetrievalPhase::Completed))?;
        self.transition_to(RetrievalPhase::Completed)?;

        let delivery = RetrievalDelivery {
            root: self.root.clone(),
            miner: order.miner,
            path: destination.path,
            bytes_written: receipt.bytes_written,
        };
        info!(
            root = %delivery.root,
            miner = %delivery.miner,
            bytes = delivery.bytes_written,
            path = %delivery.path.display(),
            "✅ Retrieval completed"
        );
        Ok(delivery)
    }
}

/// Drives retrieval attempts against a node.
pub struct RetrievalNegotiator {
    config: RetrievalConfig,
}

impl RetrievalNegotiator {
    pub fn new(config: RetrievalConfig) -> Self {
        Self { config }
    }

    /// Query, select, and prepare the transfer for one attempt.
    async fn negotiate(
        &self,
        node: &dyn NodeClient,
        attempt: &mut RetrievalAttempt,
    ) -> Result<(RetrievalOrder, FileDestination)> {
        // Advisory only: a payload already present locally is still retrieved.
        match node.has_local_content(attempt.root()).await {
            Ok(true) => debug!(root = %attempt.root(), "Payload already present locally"),
            Ok(false) => {}
            Err(error) => {
                warn!(root = %attempt.root(), error = %error, "⚠️ Local content check failed")
            }
        }

        let offers = match node.find_offers(attempt.root()).await {
            Ok(offers) => offers,
            Err(source) => {
                return Err(attempt.fail(MarketError::Query {
                    root: attempt.root().clone(),
                    source,
                }))
            }
        };
        debug!(root = %attempt.root(), count = offers.len(), "📥 Collected retrieval offers");

        attempt.select_offer(&offers)?;
        attempt.begin_transfer(&self.config)
    }

    /// Retrieve a payload, writing it to a fresh destination.
    pub async fn retrieve(
        &self,
        node: &dyn NodeClient,
        root: ContentId,
        client: WalletAddress,
    ) -> Result<RetrievalDelivery> {
        let mut attempt = RetrievalAttempt::new(root, client);
        let (order, destination) = self.negotiate(node, &mut attempt).await?;

        match node.start_retrieval(&order, &destination).await {
            Ok(receipt) => attempt.complete(receipt),
            Err(source) => Err(attempt.fail(MarketError::RetrievalTransport {
                root: attempt.root().clone(),
                miner: order.miner.clone(),
                source,
            })),
        }
    }

    /// Like [`RetrievalNegotiator::retrieve`], but the transfer races a
    /// cancellation signal.
    ///
    /// Signal with [`Notify::notify_one`] so a cancellation issued while the
    /// negotiation is still in flight is not lost. A cancelled attempt fails
    /// with [`MarketError::Cancelled`] and the in-flight transfer future is
    /// dropped.
    pub async fn retrieve_with_cancel(
        &self,
        node: &dyn NodeClient,
        root: ContentId,
        client: WalletAddress,
        cancel: &Notify,
    ) -> Result<RetrievalDelivery> {
        let mut attempt = RetrievalAttempt::new(root, client);
        let (order, destination) = self.negotiate(node, &mut attempt).await?;

        tokio::select! {
            biased;
            _ = cancel.notified() => {
                info!(root = %attempt.root(), miner = %order.miner, "Retrieval cancelled");
                Err(attempt.fail(MarketError::Cancelled {
                    root: attempt.root().clone(),
                }))
            }
            result = node.start_retrieval(&order, &destination) => match result {
                Ok(receipt) => attempt.complete(receipt),
                Err(source) => Err(attempt.fail(MarketError::RetrievalTransport {
                    root: attempt.root().clone(),
                    miner: order.miner.clone(),
                    source,
                })),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queried_root() -> ContentId {
        ContentId::parse("bafypayload000001").unwrap()
    }

    fn client() -> WalletAddress {
        WalletAddress::parse("s1clientwallet001").unwrap()
    }

    fn raw_offer() -> RetrievalOfferRaw {
        RetrievalOfferRaw {
            root: "bafypayload000001".to_string(),
            size: 4096,
            min_price: "2000".to_string(),
            payment_interval: 1048576,
            payment_interval_increase: 1048576,
            miner: "s01000".to_string(),
            miner_peer_id: "12D3KooWExamplePeer".to_string(),
            err: None,
        }
    }

    #[test]
    fn test_valid_offer_passes_validation() {
        let offer = raw_offer().validate(&queried_root()).unwrap();
        assert_eq!(offer.size, 4096);
        assert_eq!(offer.min_price, TokenAmount::from_attos(2000));
        assert_eq!(offer.miner.as_str(), "s01000");
        assert_eq!(offer.root, queried_root());
    }

    #[test]
    fn test_offer_defects() {
        let mut raw = raw_offer();
        raw.err = Some("routing: not found".to_string());
        assert!(matches!(
            raw.validate(&queried_root()),
            Err(OfferDefect::PeerReported(_))
        ));

        let mut raw = raw_offer();
        raw.size = 0;
        assert!(matches!(
            raw.validate(&queried_root()),
            Err(OfferDefect::ZeroSize)
        ));

        let mut raw = raw_offer();
        raw.min_price = "-5".to_string();
        assert!(matches!(
            raw.validate(&queried_root()),
            Err(OfferDefect::InvalidPrice(_))
        ));

        let mut raw = raw_offer();
        raw.miner = "not-a-miner".to_string();
        assert!(matches!(
            raw.validate(&queried_root()),
            Err(OfferDefect::InvalidMiner(_))
        ));

        let mut raw = raw_offer();
        raw.root = "bafyotherpayload1".to_string();
        assert!(matches!(
            raw.validate(&queried_root()),
            Err(OfferDefect::RootMismatch { .. })
        ));

        let mut raw = raw_offer();
        raw.root = "!!".to_string();
        assert!(matches!(
            raw.validate(&queried_root()),
            Err(OfferDefect::InvalidRoot(_))
        ));
    }

    #[test]
    fn test_empty_peer_error_is_ignored() {
        let mut raw = raw_offer();
        raw.err = Some(String::new());
        assert!(raw.validate(&queried_root()).is_ok());
    }

    #[test]
    fn test_zero_price_is_valid() {
        let mut raw = raw_offer();
        raw.min_price = "0".to_string();
        let offer = raw.validate(&queried_root()).unwrap();
        assert!(offer.min_price.is_zero());
    }

    #[test]
    fn test_order_total_is_offer_price() {
        let offer = raw_offer().validate(&queried_root()).unwrap();
        let order = RetrievalOrder::from_offer(&offer, client());
        assert_eq!(order.total, offer.min_price);
        assert_eq!(order.root, offer.root);
        assert_eq!(order.miner, offer.miner);
    }

    #[test]
    fn test_phase_transition_table() {
        use RetrievalPhase::*;
        assert!(Querying.can_transition_to(OfferSelected));
        assert!(Querying.can_transition_to(Failed));
        assert!(!Querying.can_transition_to(Retrieving));
        assert!(!Querying.can_transition_to(Completed));

        assert!(OfferSelected.can_transition_to(Retrieving));
        assert!(OfferSelected.can_transition_to(Failed));
        assert!(!OfferSelected.can_transition_to(Completed));
        assert!(!OfferSelected.can_transition_to(Querying));

        assert!(Retrieving.can_transition_to(Completed));
        assert!(Retrieving.can_transition_to(Failed));
        assert!(!Retrieving.can_transition_to(OfferSelected));

        for next in [Querying, OfferSelected, Retrieving, Completed, Failed] {
            assert!(!Completed.can_transition_to(next));
            assert!(!Failed.can_transition_to(next));
        }
        assert!(Completed.is_terminal());
        assert!(Failed.is_terminal());
        assert!(!Querying.is_terminal());
    }

    #[test]
    fn test_attempt_happy_path() {
        let mut attempt = RetrievalAttempt::new(queried_root(), client());
        assert_eq!(attempt.phase(), RetrievalPhase::Querying);

        attempt.select_offer(&[raw_offer()]).unwrap();
        assert_eq!(attempt.phase(), RetrievalPhase::OfferSelected);
        assert!(attempt.selected_offer().is_some());

        let config = RetrievalConfig::default();
        let (order, destination) = attempt.begin_transfer(&config).unwrap();
        assert_eq!(attempt.phase(), RetrievalPhase::Retrieving);
        assert_eq!(order.total, TokenAmount::from_attos(2000));
        assert!(!destination.is_car);

        let delivery = attempt
            .complete(RetrievalReceipt { bytes_written: 4096 })
            .unwrap();
        assert_eq!(attempt.phase(), RetrievalPhase::Completed);
        assert_eq!(delivery.bytes_written, 4096);
        assert_eq!(delivery.miner.as_str(), "s01000");
        assert_eq!(delivery.path, destination.path);
    }

    #[test]
    fn test_no_offers_fails_attempt() {
        let mut attempt = RetrievalAttempt::new(queried_root(), client());
        let err = attempt.select_offer(&[]).unwrap_err();
        assert!(matches!(err, MarketError::NoOffersAvailable { .. }));
        assert_eq!(attempt.phase(), RetrievalPhase::Failed);
    }

    #[test]
    fn test_malformed_first_offer_fails_without_consulting_second() {
        let mut bad = raw_offer();
        bad.size = 0;
        bad.miner = "s09999".to_string();
        let good = raw_offer();

        let mut attempt = RetrievalAttempt::new(queried_root(), client());
        let err = attempt.select_offer(&[bad, good]).unwrap_err();
        match err {
            MarketError::MalformedOffer { miner, defect, .. } => {
                // The failure names the first offer's miner, not the second's
                assert_eq!(miner, "s09999");
                assert_eq!(defect, OfferDefect::ZeroSize);
            }
            other => panic!("expected MalformedOffer, got {:?}", other),
        }
        assert_eq!(attempt.phase(), RetrievalPhase::Failed);
        assert!(attempt.selected_offer().is_none());
    }

    #[test]
    fn test_transfer_requires_selected_offer() {
        let mut attempt = RetrievalAttempt::new(queried_root(), client());
        let err = attempt.begin_transfer(&RetrievalConfig::default()).unwrap_err();
        assert!(matches!(err, MarketError::InvalidPhaseTransition { .. }));
        assert_eq!(attempt.phase(), RetrievalPhase::Querying);
    }

    #[test]
    fn test_complete_requires_transfer_in_flight() {
        let mut attempt = RetrievalAttempt::new(queried_root(), client());
        attempt.select_offer(&[raw_offer()]).unwrap();
        let err = attempt
            .complete(RetrievalReceipt { bytes_written: 1 })
            .unwrap_err();
        assert!(matches!(err, MarketError::InvalidPhaseTransition { .. }));
        assert_eq!(attempt.phase(), RetrievalPhase::OfferSelected);
    }

    #[test]
    fn test_terminal_attempt_stays_terminal() {
        let mut attempt = RetrievalAttempt::new(queried_root(), client());
        attempt.select_offer(&[]).unwrap_err();
        assert_eq!(attempt.phase(), RetrievalPhase::Failed);

        let err = attempt.select_offer(&[raw_offer()]).unwrap_err();
        assert!(matches!(err, MarketError::InvalidPhaseTransition { .. }));
        assert_eq!(attempt.phase(), RetrievalPhase::Failed);
    }

    #[test]
    fn test_destinations_are_fresh_per_transfer() {
        let config = RetrievalConfig::default();
        let root = queried_root();
        let first = FileDestination::fresh(&config, &root);
        let second = FileDestination::fresh(&config, &root);
        assert_ne!(first.path, second.path);

        let name = first.path.file_name().unwrap().to_string_lossy();
        assert!(name.starts_with("bafypayload000001-"));
        assert!(name.ends_with(".bin"));
    }

    #[test]
    fn test_car_destination_extension() {
        let config = RetrievalConfig {
            output_dir: PathBuf::from("out"),
            as_car: true,
        };
        let destination = FileDestination::fresh(&config, &queried_root());
        assert!(destination.is_car);
        assert_eq!(
            destination.path.extension().and_then(|e| e.to_str()),
            Some("car")
        );
    }

    #[test]
    fn test_offer_wire_shape() {
        let json = r#"{
            "Root": {"/": "bafypayload000001"},
            "Size": 4096,
            "MinPrice": "2000",
            "PaymentInterval": 1048576,
            "PaymentIntervalIncrease": 1048576,
            "Miner": "s01000",
            "MinerPeerID": "12D3KooWExamplePeer"
        }"#;
        let raw: RetrievalOfferRaw = serde_json::from_str(json).unwrap();
        assert_eq!(raw.err, None);
        assert!(raw.validate(&queried_root()).is_ok());

        let offer = raw.validate(&queried_root()).unwrap();
        let order = RetrievalOrder::from_offer(&offer, client());
        let value = serde_json::to_value(&order).unwrap();
        assert_eq!(value["Total"], "2000");
        assert_eq!(value["MinerPeerID"], "12D3KooWExamplePeer");
        assert_eq!(value["Client"], "s1clientwallet001");
        assert_eq!(value["Root"]["/"], "bafypayload000001");
    }
}
