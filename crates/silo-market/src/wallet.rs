use std::fmt;

use silo_types::{TokenAmount, WalletAddress};
use tracing::info;

use crate::client::NodeClient;
use crate::error::Result;

/// The node's default wallet and its balance, as one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletSummary {
    pub address: WalletAddress,
    pub balance: TokenAmount,
}

impl WalletSummary {
    /// Fetch the default wallet address, then its current balance.
    pub async fn fetch(node: &dyn NodeClient) -> Result<WalletSummary> {
        let address = node.default_wallet_address().await?;
        let balance = node.wallet_balance(&address).await?;
        info!(address = %address, balance = %balance, "💰 Wallet summary fetched");
        Ok(WalletSummary { address, balance })
    }
}

impl fmt::Display for WalletSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.address, self.balance)
    }
}
