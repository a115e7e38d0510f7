//! Route strategies
//!
//! A route is one mechanism for moving a token between chains. Every route
//! implements [`RouteStrategy`]; the set of routes is closed and tagged by
//! [`RouteKind`].
//!
//! ## Submodules
//!
//! - `bridge` - manual lock-and-mint, the recipient redeems
//! - `relay` - lock-and-mint redeemed by a relayer, optional gas drop-off
//! - `cctp` - stablecoin burn-and-mint, manual and relayed
//! - `gateway` - transfers into and out of Cosmos chains
//! - `fees` - relay fee arithmetic

pub mod bridge;
pub mod cctp;
pub mod fees;
pub mod gateway;
pub mod relay;

pub use bridge::BridgeRoute;
pub use cctp::{CctpManualRoute, CctpRelayRoute};
pub use gateway::CosmosGatewayRoute;
pub use relay::RelayRoute;

use async_trait::async_trait;
use bigdecimal::{BigDecimal, Zero};
use eyre::eyre;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::amount::{format_amount, parse_units, to_decimal_amount, MAX_DECIMALS};
use crate::attestation::AttestationFetcher;
use crate::chain::{ChainClient, SendRequest};
use crate::config::{NetworkConfig, TokenConfig};
use crate::display::{DisplayRow, TransferDisplayData, NO_INPUT};
use crate::error::{RouteError, RouteResult};
use crate::types::{
    PayloadKind, Protocol, RouteOptions, RouteRequest, SignedMessage, TransferRequest,
    UnsignedMessage,
};

// ============================================================================
// Route tags
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RouteKind {
    Bridge,
    Relay,
    CctpManual,
    CctpRelay,
    CosmosGateway,
}

impl RouteKind {
    pub const ALL: [RouteKind; 5] = [
        RouteKind::Bridge,
        RouteKind::Relay,
        RouteKind::CctpManual,
        RouteKind::CctpRelay,
        RouteKind::CosmosGateway,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RouteKind::Bridge => "bridge",
            RouteKind::Relay => "relay",
            RouteKind::CctpManual => "cctpManual",
            RouteKind::CctpRelay => "cctpRelay",
            RouteKind::CosmosGateway => "cosmosGateway",
        }
    }
}

impl fmt::Display for RouteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RouteKind {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RouteKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| eyre!("Unknown route: {}", s))
    }
}

// ============================================================================
// Shared context and requests
// ============================================================================

/// Collaborators shared by every route
#[derive(Debug, Clone)]
pub struct RouteContext {
    pub config: Arc<NetworkConfig>,
    pub client: Arc<dyn ChainClient>,
    pub attestations: Arc<AttestationFetcher>,
}

impl RouteContext {
    pub fn new(
        config: Arc<NetworkConfig>,
        client: Arc<dyn ChainClient>,
        attestations: Arc<AttestationFetcher>,
    ) -> Self {
        Self {
            config,
            client,
            attestations,
        }
    }
}

/// Inputs for a pre-send preview. Gas estimates are in the respective
/// chain's gas token.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewRequest {
    pub token: String,
    pub dest_token: String,
    pub amount: BigDecimal,
    pub source_chain: String,
    pub dest_chain: String,
    pub sending_gas_est: Option<BigDecimal>,
    pub claiming_gas_est: Option<BigDecimal>,
    pub options: RouteOptions,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DestInfoRequest {
    pub message: UnsignedMessage,
    /// Destination transaction, once known
    pub receive_tx: Option<String>,
    pub transfer_complete: bool,
}

// ============================================================================
// Strategy trait
// ============================================================================

/// One transfer mechanism
///
/// Only the route-specific operations are required; token fan-out, signed
/// message lookup and completion checks have shared defaults, and operations a
/// mechanism cannot perform default to [`RouteError::UnsupportedOperation`].
#[async_trait]
pub trait RouteStrategy: Send + Sync + Debug {
    fn kind(&self) -> RouteKind;

    fn context(&self) -> &RouteContext;

    fn native_gas_dropoff_supported(&self) -> bool {
        false
    }

    /// Whether transfers are redeemed without user action
    fn automatic_deposit(&self) -> bool {
        false
    }

    /// Whether this particular message is redeemed by a relayer
    fn is_automatic(&self, message: &UnsignedMessage) -> bool {
        message.payload_kind == PayloadKind::Automatic
    }

    fn is_supported_chain(&self, chain: &str) -> bool;

    /// Never errors: failed sub-checks are logged and mean "unavailable"
    async fn is_route_available(&self, request: &RouteRequest) -> bool;

    async fn is_supported_source_token(
        &self,
        token: Option<&TokenConfig>,
        dest_token: Option<&TokenConfig>,
        source_chain: Option<&str>,
    ) -> RouteResult<bool>;

    async fn is_supported_dest_token(
        &self,
        token: Option<&TokenConfig>,
        source_token: Option<&TokenConfig>,
        dest_chain: Option<&str>,
    ) -> RouteResult<bool>;

    /// Candidates usable as the source token, checked concurrently.
    /// A failed check excludes that candidate only.
    async fn supported_source_tokens(
        &self,
        candidates: &[TokenConfig],
        dest_token: Option<&TokenConfig>,
        source_chain: Option<&str>,
    ) -> Vec<TokenConfig> {
        let checks = candidates
            .iter()
            .map(|token| self.is_supported_source_token(Some(token), dest_token, source_chain));
        let results = join_all(checks).await;
        retain_supported(self.kind(), candidates, results)
    }

    async fn supported_dest_tokens(
        &self,
        candidates: &[TokenConfig],
        source_token: Option<&TokenConfig>,
        dest_chain: Option<&str>,
    ) -> Vec<TokenConfig> {
        let checks = candidates
            .iter()
            .map(|token| self.is_supported_dest_token(Some(token), source_token, dest_chain));
        let results = join_all(checks).await;
        retain_supported(self.kind(), candidates, results)
    }

    fn compute_receive_amount(
        &self,
        send_amount: &BigDecimal,
        _options: &RouteOptions,
    ) -> RouteResult<BigDecimal> {
        Ok(send_amount.clone())
    }

    fn compute_send_amount(
        &self,
        receive_amount: &BigDecimal,
        _options: &RouteOptions,
    ) -> RouteResult<BigDecimal> {
        Ok(receive_amount.clone())
    }

    fn min_send_amount(&self, _options: &RouteOptions) -> RouteResult<BigDecimal> {
        Ok(BigDecimal::zero())
    }

    /// Relayer fee quote in human units of `token_key` on the source chain
    async fn relayer_fee(
        &self,
        _source_chain: &str,
        _dest_chain: &str,
        _token_key: &str,
    ) -> RouteResult<BigDecimal> {
        Err(RouteError::unsupported("relayer_fee", self.kind()))
    }

    /// Destination gas received for swapping `amount` of `token_key`
    async fn native_token_amount(
        &self,
        _dest_chain: &str,
        _token_key: &str,
        _amount: &BigDecimal,
        _wallet: &str,
    ) -> RouteResult<BigDecimal> {
        Err(RouteError::unsupported("native_token_amount", self.kind()))
    }

    async fn max_swap_amount(
        &self,
        _dest_chain: &str,
        _token_key: &str,
        _wallet: &str,
    ) -> RouteResult<BigDecimal> {
        Err(RouteError::unsupported("max_swap_amount", self.kind()))
    }

    /// Source-chain gas estimate in the source gas token
    async fn estimate_send_gas(&self, request: &TransferRequest) -> RouteResult<BigDecimal>;

    async fn estimate_claim_gas(
        &self,
        _dest_chain: &str,
        _signed: &SignedMessage,
    ) -> RouteResult<BigDecimal> {
        Err(RouteError::unsupported("estimate_claim_gas", self.kind()))
    }

    /// Submit the transfer; returns the source transaction id
    async fn send(&self, request: &TransferRequest) -> RouteResult<String>;

    async fn redeem(
        &self,
        _dest_chain: &str,
        _signed: &SignedMessage,
        _payer: &str,
    ) -> RouteResult<String> {
        Err(RouteError::unsupported("redeem", self.kind()))
    }

    /// Parse a source transaction, rejecting messages of another route
    async fn get_message(&self, tx: &str, chain: &str) -> RouteResult<UnsignedMessage>;

    async fn get_signed_message(&self, message: &UnsignedMessage) -> RouteResult<SignedMessage> {
        let vaa = self.context().attestations.fetch(&message.id()).await?;
        Ok(SignedMessage::new(message.clone(), vaa))
    }

    async fn get_preview(&self, request: &PreviewRequest) -> RouteResult<TransferDisplayData>;

    async fn get_transfer_source_info(
        &self,
        message: &UnsignedMessage,
    ) -> RouteResult<TransferDisplayData>;

    async fn get_transfer_dest_info(
        &self,
        request: &DestInfoRequest,
    ) -> RouteResult<TransferDisplayData>;

    async fn is_transfer_completed(
        &self,
        dest_chain: &str,
        signed: &SignedMessage,
    ) -> RouteResult<bool> {
        Ok(self
            .context()
            .client
            .is_transfer_completed(dest_chain, &signed.vaa)
            .await?)
    }
}

// ============================================================================
// Helpers shared by route implementations
// ============================================================================

fn retain_supported(
    kind: RouteKind,
    candidates: &[TokenConfig],
    results: Vec<RouteResult<bool>>,
) -> Vec<TokenConfig> {
    candidates
        .iter()
        .zip(results)
        .filter_map(|(token, result)| match result {
            Ok(true) => Some(token.clone()),
            Ok(false) => None,
            Err(e) => {
                debug!(route = %kind, token = %token.key, error = %e, "Token support check failed");
                None
            }
        })
        .collect()
}

/// Collapse an availability check into a boolean, logging failures
pub(crate) fn probe_result(
    kind: RouteKind,
    request: &RouteRequest,
    result: RouteResult<bool>,
) -> bool {
    match result {
        Ok(available) => {
            debug!(
                route = %kind,
                source_chain = %request.source_chain,
                dest_chain = %request.dest_chain,
                token = %request.source_token,
                available,
                "Route availability probed"
            );
            available
        }
        Err(e) => {
            warn!(
                route = %kind,
                source_chain = %request.source_chain,
                dest_chain = %request.dest_chain,
                error = %e,
                "Route availability check failed"
            );
            false
        }
    }
}

/// Reject messages whose payload kind or protocol belongs to another route
pub(crate) fn expect_payload(
    kind: RouteKind,
    message: UnsignedMessage,
    payload: PayloadKind,
    protocol: Protocol,
) -> RouteResult<UnsignedMessage> {
    if message.protocol != protocol {
        return Err(RouteError::InvalidPayload {
            route: kind,
            reason: format!("expected {} message, got {}", protocol, message.protocol),
        });
    }
    if message.payload_kind != payload {
        return Err(RouteError::InvalidPayload {
            route: kind,
            reason: format!("expected {} payload, got {}", payload, message.payload_kind),
        });
    }
    Ok(message)
}

/// Convert a transfer request into raw source-chain units
pub(crate) fn send_request(
    config: &NetworkConfig,
    kind: RouteKind,
    request: &TransferRequest,
) -> RouteResult<SendRequest> {
    let decimals = config.token_decimals(&request.source_chain, &request.token)?;
    let amount = parse_units(&request.amount, decimals)?;
    let relayer_fee = request
        .options
        .relayer_fee()
        .map(|fee| parse_units(fee, decimals))
        .transpose()?;
    let to_native_token = parse_units(&request.options.to_native_token(), decimals)?;

    Ok(SendRequest {
        route: kind,
        token: request.token.clone(),
        amount,
        source_chain: request.source_chain.clone(),
        sender: request.sender.clone(),
        dest_chain: request.dest_chain.clone(),
        recipient: request.recipient.clone(),
        relayer_fee,
        to_native_token,
    })
}

/// Raw gas token units on `chain` to a human amount
pub(crate) fn gas_amount(config: &NetworkConfig, chain: &str, raw: u128) -> RouteResult<BigDecimal> {
    let gas_token = config.gas_token(chain)?;
    let decimals = gas_token.decimals.for_chain(config.chain(chain)?);
    Ok(to_decimal_amount(raw, decimals))
}

/// Canonical-precision message amount to a human amount
pub(crate) fn canonical_amount(raw: u128) -> BigDecimal {
    to_decimal_amount(raw, MAX_DECIMALS)
}

/// "<amount> <display name>"
pub(crate) fn token_text(
    config: &NetworkConfig,
    amount: &BigDecimal,
    places: u8,
    token_key: &str,
) -> String {
    format!("{} {}", format_amount(amount, places), config.display_name(token_key))
}

pub(crate) fn gas_symbol(config: &NetworkConfig, chain: &str) -> String {
    config
        .chain(chain)
        .map(|c| config.display_name(&c.gas_token))
        .unwrap_or_default()
}

/// "Gas fee" row for the source transaction
pub(crate) fn source_gas_row(
    config: &NetworkConfig,
    message: &UnsignedMessage,
) -> RouteResult<DisplayRow> {
    let value = match message.gas_fee {
        Some(raw) => {
            let gas = gas_amount(config, &message.from_chain, raw)?;
            let gas_token = &config.chain(&message.from_chain)?.gas_token;
            token_text(config, &gas, MAX_DECIMALS, gas_token)
        }
        None => NO_INPUT.to_string(),
    };
    Ok(DisplayRow::new("Gas fee", value))
}

/// "~ <amount> <gas symbol>" or the placeholder
pub(crate) fn gas_estimate_text(
    config: &NetworkConfig,
    chain: &str,
    estimate: Option<&BigDecimal>,
) -> String {
    match estimate {
        Some(gas) => format!("~ {} {}", format_amount(gas, 6), gas_symbol(config, chain)),
        None => NO_INPUT.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::{sample_config, sample_message};
    use crate::types::SendToken;
    use std::str::FromStr;

    #[test]
    fn test_route_kind_names() {
        for kind in RouteKind::ALL {
            assert_eq!(RouteKind::from_str(kind.as_str()).unwrap(), kind);
        }
        assert_eq!(RouteKind::from_str("CCTPRELAY").unwrap(), RouteKind::CctpRelay);
        assert!(RouteKind::from_str("hashflow").is_err());
        assert_eq!(
            serde_json::to_string(&RouteKind::CosmosGateway).unwrap(),
            "\"cosmosGateway\""
        );
    }

    #[test]
    fn test_expect_payload() {
        let message = sample_message(PayloadKind::Manual, Protocol::TokenBridge);
        assert!(expect_payload(
            RouteKind::Bridge,
            message.clone(),
            PayloadKind::Manual,
            Protocol::TokenBridge
        )
        .is_ok());

        let err = expect_payload(
            RouteKind::Relay,
            message.clone(),
            PayloadKind::Automatic,
            Protocol::TokenBridge,
        )
        .unwrap_err();
        assert!(matches!(err, RouteError::InvalidPayload { route: RouteKind::Relay, .. }));

        let err = expect_payload(RouteKind::CctpManual, message, PayloadKind::Manual, Protocol::Cctp)
            .unwrap_err();
        assert!(matches!(err, RouteError::InvalidPayload { .. }));
    }

    #[test]
    fn test_send_request_units() {
        let config = sample_config();
        let usdc = config.token("USDCeth").unwrap().token_id.clone().unwrap();
        let request = TransferRequest {
            token: SendToken::Token(usdc),
            amount: BigDecimal::from_str("100").unwrap(),
            source_chain: "ethereum".to_string(),
            sender: "0xsender".to_string(),
            dest_chain: "polygon".to_string(),
            recipient: "0xrecipient".to_string(),
            options: RouteOptions::relay(
                BigDecimal::from_str("2").unwrap(),
                BigDecimal::from_str("1.5").unwrap(),
            ),
        };

        let send = send_request(&config, RouteKind::Relay, &request).unwrap();
        assert_eq!(send.amount, 100_000_000);
        assert_eq!(send.relayer_fee, Some(2_000_000));
        assert_eq!(send.to_native_token, 1_500_000);
    }

    #[test]
    fn test_gas_amount_and_text() {
        let config = sample_config();
        let gas = gas_amount(&config, "ethereum", 1_500_000_000_000_000).unwrap();
        assert_eq!(gas, BigDecimal::from_str("0.0015").unwrap());
        assert_eq!(
            gas_estimate_text(&config, "ethereum", Some(&gas)),
            "~ 0.0015 ETH"
        );
        assert_eq!(gas_estimate_text(&config, "ethereum", None), NO_INPUT);
    }

    #[test]
    fn test_source_gas_row() {
        let config = sample_config();
        let mut message = sample_message(PayloadKind::Manual, Protocol::TokenBridge);
        message.gas_fee = Some(2_000_000_000_000_000);
        assert_eq!(source_gas_row(&config, &message).unwrap().value, "0.002 ETH");

        message.gas_fee = None;
        assert_eq!(source_gas_row(&config, &message).unwrap().value, NO_INPUT);
    }
}
