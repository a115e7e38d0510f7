//! Chain collaborator interface
//!
//! Everything that touches a chain (balances, contract calls, transaction
//! submission and parsing) goes through [`ChainClient`]. Implementations own
//! wallets, signing and RPC; routes only decide *which* call to make.

use async_trait::async_trait;
use eyre::Result;
use std::fmt::Debug;

use crate::routes::RouteKind;
use crate::types::{SendToken, TokenId, UnsignedMessage};

/// A transfer as handed to the chain layer, amounts in raw source units
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendRequest {
    pub route: RouteKind,
    pub token: SendToken,
    pub amount: u128,
    pub source_chain: String,
    pub sender: String,
    pub dest_chain: String,
    pub recipient: String,
    /// Relayer fee, raw source units (automatic routes only)
    pub relayer_fee: Option<u128>,
    /// Portion of `amount` to swap into destination gas, raw source units
    pub to_native_token: u128,
}

#[async_trait]
pub trait ChainClient: Send + Sync + Debug {
    /// Gas token balance, raw units
    async fn native_balance(&self, chain: &str, wallet: &str) -> Result<u128>;

    /// Token balance, raw units; `None` when the token does not exist on `chain`
    async fn token_balance(
        &self,
        chain: &str,
        token: &TokenId,
        wallet: &str,
    ) -> Result<Option<u128>>;

    /// Source-chain gas for submitting `request`, raw gas token units
    async fn estimate_send_gas(&self, request: &SendRequest) -> Result<u128>;

    /// Destination-chain gas for redeeming `vaa`, raw gas token units
    async fn estimate_claim_gas(&self, chain: &str, route: RouteKind, vaa: &[u8]) -> Result<u128>;

    /// Submit a transfer; returns the source transaction id
    async fn send(&self, request: &SendRequest) -> Result<String>;

    /// Submit a redemption on the destination chain; returns the transaction id
    async fn redeem(&self, chain: &str, route: RouteKind, vaa: &[u8], payer: &str)
        -> Result<String>;

    /// Parse the bridge message emitted by a source transaction
    async fn get_message(&self, tx: &str, chain: &str) -> Result<UnsignedMessage>;

    /// Whether the relayer contract on the token's chain accepts it
    async fn is_accepted_token(&self, token: &TokenId) -> Result<bool>;

    /// Relayer fee quote, raw units of `token` on `source_chain`
    async fn relayer_fee(
        &self,
        source_chain: &str,
        dest_chain: &str,
        token: &TokenId,
        route: RouteKind,
    ) -> Result<u128>;

    /// Destination gas received for swapping `amount` (raw source units)
    async fn native_token_amount(
        &self,
        dest_chain: &str,
        token: &TokenId,
        amount: u128,
        wallet: &str,
    ) -> Result<u128>;

    /// Largest swappable amount, raw source units
    async fn max_swap_amount(&self, dest_chain: &str, token: &TokenId, wallet: &str)
        -> Result<u128>;

    /// Gas delivered by the relayer's swap for `message`.
    ///
    /// `Ok(None)` when the swap event has not been observed (yet).
    async fn fetch_swap_event(&self, message: &UnsignedMessage) -> Result<Option<u128>>;

    /// Whether `vaa` was already redeemed on `dest_chain`
    async fn is_transfer_completed(&self, dest_chain: &str, vaa: &[u8]) -> Result<bool>;
}
