use serde::{Deserialize, Serialize};

use crate::error::{MarketError, Result};

/// Symbolic deal status mirroring the protocol's status code table.
///
/// Discriminants are wire-stable: each variant's value is the integer code
/// nodes report for it. Codes are appended by protocol revisions, so the tail
/// of the table does not follow lifecycle order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u64)]
pub enum DealStatus {
    /// Status has not been determined
    Unknown = 0,
    /// Node has no record of the proposal
    ProposalNotFound = 1,
    /// Provider rejected the proposal
    ProposalRejected = 2,
    /// Provider accepted the proposal
    ProposalAccepted = 3,
    /// Deal data staged for sealing
    Staged = 4,
    /// Provider is sealing the sector holding the data
    Sealing = 5,
    /// Data sealed and proving; the deal is live
    Active = 6,
    /// Deal passed its end epoch
    Expired = 7,
    /// Deal data faulted and the provider penalized
    Slashed = 8,
    /// Provider is rejecting the deal
    Rejecting = 9,
    /// Deal is unwinding toward a terminal error
    Failing = 10,
    /// Client funds deposited with the market
    FundsReserved = 11,
    /// Client polling the provider for a response
    CheckForAcceptance = 12,
    /// Provider validating the proposal
    Validating = 13,
    /// Provider decided and is dispatching its response
    AcceptWait = 14,
    /// Data transfer is about to begin
    StartDataTransfer = 15,
    /// Data moving to the provider
    Transferring = 16,
    /// Provider waiting for an out-of-band transfer
    WaitingForData = 17,
    /// Provider verifying the received payload against the proposal
    VerifyData = 18,
    /// Provider depositing its collateral
    ReserveProviderFunds = 19,
    /// Client depositing the payment
    ReserveClientFunds = 20,
    /// Waiting for the provider deposit to land on chain
    ProviderFunding = 21,
    /// Terminal failure
    Error = 22,
    /// Waiting for the client deposit to land on chain
    ClientFunding = 23,
    /// Deal ready to publish
    Publish = 24,
    /// Publish message in flight on chain
    Publishing = 25,
    /// Cleanup after publish
    Finalizing = 26,
    /// Provider paused, waiting for a transfer restart
    ProviderTransferAwaitRestart = 27,
    /// Client restarting a stalled transfer
    ClientTransferRestart = 28,
    /// Data published, waiting for sector pre-commit
    AwaitingPreCommit = 29,
}

/// Every status in protocol code order. `DEAL_STATUS_CATALOG[code]` is the
/// status for `code`; coherence with the discriminants is covered by tests.
pub const DEAL_STATUS_CATALOG: [DealStatus; 30] = [
    DealStatus::Unknown,
    DealStatus::ProposalNotFound,
    DealStatus::ProposalRejected,
    DealStatus::ProposalAccepted,
    DealStatus::Staged,
    DealStatus::Sealing,
    DealStatus::Active,
    DealStatus::Expired,
    DealStatus::Slashed,
    DealStatus::Rejecting,
    DealStatus::Failing,
    DealStatus::FundsReserved,
    DealStatus::CheckForAcceptance,
    DealStatus::Validating,
    DealStatus::AcceptWait,
    DealStatus::StartDataTransfer,
    DealStatus::Transferring,
    DealStatus::WaitingForData,
    DealStatus::VerifyData,
    DealStatus::ReserveProviderFunds,
    DealStatus::ReserveClientFunds,
    DealStatus::ProviderFunding,
    DealStatus::Error,
    DealStatus::ClientFunding,
    DealStatus::Publish,
    DealStatus::Publishing,
    DealStatus::Finalizing,
    DealStatus::ProviderTransferAwaitRestart,
    DealStatus::ClientTransferRestart,
    DealStatus::AwaitingPreCommit,
];

/// Coarse reading of a status for consumers that only care about outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DealClassification {
    /// The deal is live and the data is being proven
    Success,
    /// The deal ended in an unrecoverable error
    Failure,
    /// Everything else: the deal is still moving through its lifecycle
    Pending,
}

impl DealStatus {
    /// Look up the status for a protocol code. `None` for codes outside the
    /// catalog; nodes running a newer protocol revision can report those.
    pub fn from_code(code: u64) -> Option<DealStatus> {
        usize::try_from(code)
            .ok()
            .and_then(|idx| DEAL_STATUS_CATALOG.get(idx))
            .copied()
    }

    /// The protocol code for this status
    pub fn code(self) -> u64 {
        self as u64
    }

    /// Wire name of the status
    pub fn name(self) -> &'static str {
        match self {
            DealStatus::Unknown => "Unknown",
            DealStatus::ProposalNotFound => "ProposalNotFound",
            DealStatus::ProposalRejected => "ProposalRejected",
            DealStatus::ProposalAccepted => "ProposalAccepted",
            DealStatus::Staged => "Staged",
            DealStatus::Sealing => "Sealing",
            DealStatus::Active => "Active",
            DealStatus::Expired => "Expired",
            DealStatus::Slashed => "Slashed",
            DealStatus::Rejecting => "Rejecting",
            DealStatus::Failing => "Failing",
            DealStatus::FundsReserved => "FundsReserved",
            DealStatus::CheckForAcceptance => "CheckForAcceptance",
            DealStatus::Validating => "Validating",
            DealStatus::AcceptWait => "AcceptWait",
            DealStatus::StartDataTransfer => "StartDataTransfer",
            DealStatus::Transferring => "Transferring",
            DealStatus::WaitingForData => "WaitingForData",
            DealStatus::VerifyData => "VerifyData",
            DealStatus::ReserveProviderFunds => "ReserveProviderFunds",
            DealStatus::ReserveClientFunds => "ReserveClientFunds",
            DealStatus::ProviderFunding => "ProviderFunding",
            DealStatus::Error => "Error",
            DealStatus::ClientFunding => "ClientFunding",
            DealStatus::Publish => "Publish",
            DealStatus::Publishing => "Publishing",
            DealStatus::Finalizing => "Finalizing",
            DealStatus::ProviderTransferAwaitRestart => "ProviderTransferAwaitRestart",
            DealStatus::ClientTransferRestart => "ClientTransferRestart",
            DealStatus::AwaitingPreCommit => "AwaitingPreCommit",
        }
    }

    /// Collapse the status into success, failure, or still-pending.
    ///
    /// Exactly one status is a success ([`DealStatus::Active`]) and exactly
    /// one a failure ([`DealStatus::Error`]); every other status means the
    /// deal has not settled.
    pub fn classification(self) -> DealClassification {
        match self {
            DealStatus::Active => DealClassification::Success,
            DealStatus::Error => DealClassification::Failure,
            _ => DealClassification::Pending,
        }
    }
}

impl std::fmt::Display for DealStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A deal's reported code resolved against the status catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealState {
    pub deal_id: u64,
    /// Code as reported by the node
    pub code: u64,
    pub status: DealStatus,
}

impl DealState {
    /// Resolve a reported status code for a deal.
    ///
    /// Fails with [`MarketError::UnknownDealState`] when the code falls
    /// outside the catalog; an unrecognized code is never mapped to a
    /// stand-in status.
    pub fn interpret(deal_id: u64, code: u64) -> Result<DealState> {
        let status =
            DealStatus::from_code(code).ok_or(MarketError::UnknownDealState { deal_id, code })?;
        Ok(DealState {
            deal_id,
            code,
            status,
        })
    }

    /// Wire name of the resolved status
    pub fn name(&self) -> &'static str {
        self.status.name()
    }

    /// Coarse outcome of the resolved status
    pub fn classification(&self) -> DealClassification {
        self.status.classification()
    }
}
