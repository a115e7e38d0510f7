//! Manual lock-and-mint through the token bridge
//!
//! The sender locks (or burns a wrapped) token on the source chain; once the
//! message is attested the recipient redeems it on the destination chain.
//! The free functions here are the manual-transfer building blocks that the
//! other routes reuse.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use tracing::info;

use super::{
    canonical_amount, expect_payload, gas_amount, gas_estimate_text, gas_symbol, probe_result,
    send_request, source_gas_row, token_text, DestInfoRequest, PreviewRequest, RouteContext,
    RouteKind, RouteStrategy,
};
use crate::amount::{format_amount, MAX_DECIMALS};
use crate::config::{NetworkConfig, TokenConfig};
use crate::display::{DisplayRow, TransferDisplayData, NO_INPUT};
use crate::error::{RouteError, RouteResult};
use crate::types::{
    PayloadKind, Protocol, RouteRequest, SignedMessage, TransferRequest, UnsignedMessage,
};

#[derive(Debug, Clone)]
pub struct BridgeRoute {
    ctx: RouteContext,
}

impl BridgeRoute {
    pub fn new(ctx: RouteContext) -> Self {
        Self { ctx }
    }

    /// Token bridge rule without the enablement check, shared with Relay
    pub(crate) fn token_bridge_available(&self, request: &RouteRequest) -> RouteResult<bool> {
        if request.source_chain == request.dest_chain {
            return Ok(false);
        }
        if !self.is_supported_chain(&request.source_chain)
            || !self.is_supported_chain(&request.dest_chain)
        {
            return Ok(false);
        }
        let config = &self.ctx.config;
        let source = config.token(&request.source_token)?;
        let dest = config.token(&request.dest_token)?;
        Ok(same_wrapped_asset(config, source, dest))
    }
}

/// Both tokens resolve to the same bridged identity
pub(crate) fn same_wrapped_asset(
    config: &NetworkConfig,
    source: &TokenConfig,
    dest: &TokenConfig,
) -> bool {
    match (config.wrapped_token_id(source), config.wrapped_token_id(dest)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Token-side support rule: bridgeable, on a supported chain, and matching the
/// counterpart's wrapped identity when one is selected.
pub(crate) fn bridge_token_supported(
    config: &NetworkConfig,
    token: Option<&TokenConfig>,
    counterpart: Option<&TokenConfig>,
    chain_supported: bool,
) -> bool {
    let Some(token) = token else {
        return false;
    };
    if !chain_supported || config.wrapped_token_id(token).is_none() {
        return false;
    }
    counterpart.map_or(true, |other| same_wrapped_asset(config, token, other))
}

// ============================================================================
// Manual transfer building blocks
// ============================================================================

/// Submit a transfer; `relayed` keeps relayer fee and drop-off in the request
pub(crate) async fn submit(
    ctx: &RouteContext,
    kind: RouteKind,
    request: &TransferRequest,
    relayed: bool,
) -> RouteResult<String> {
    let mut send = send_request(&ctx.config, kind, request)?;
    if !relayed {
        send.relayer_fee = None;
        send.to_native_token = 0;
    }

    let tx = ctx.client.send(&send).await?;
    info!(
        route = %kind,
        tx = %tx,
        source_chain = %send.source_chain,
        dest_chain = %send.dest_chain,
        amount = send.amount,
        "Transfer submitted"
    );
    Ok(tx)
}

pub(crate) async fn estimate_send(
    ctx: &RouteContext,
    kind: RouteKind,
    request: &TransferRequest,
    relayed: bool,
) -> RouteResult<BigDecimal> {
    let mut send = send_request(&ctx.config, kind, request)?;
    if !relayed {
        send.relayer_fee = None;
        send.to_native_token = 0;
    }
    let raw = ctx.client.estimate_send_gas(&send).await?;
    gas_amount(&ctx.config, &request.source_chain, raw)
}

pub(crate) async fn estimate_claim(
    ctx: &RouteContext,
    kind: RouteKind,
    dest_chain: &str,
    signed: &SignedMessage,
) -> RouteResult<BigDecimal> {
    let raw = ctx
        .client
        .estimate_claim_gas(dest_chain, kind, &signed.vaa)
        .await?;
    gas_amount(&ctx.config, dest_chain, raw)
}

pub(crate) async fn redeem_manual(
    ctx: &RouteContext,
    kind: RouteKind,
    dest_chain: &str,
    signed: &SignedMessage,
    payer: &str,
) -> RouteResult<String> {
    let tx = ctx
        .client
        .redeem(dest_chain, kind, &signed.vaa, payer)
        .await?;
    info!(
        route = %kind,
        tx = %tx,
        dest_chain = %dest_chain,
        message = %signed.message.id(),
        "Transfer redeemed"
    );
    Ok(tx)
}

/// Amount received plus both chains' gas estimates
pub(crate) fn manual_preview(config: &NetworkConfig, request: &PreviewRequest) -> TransferDisplayData {
    let source_gas = request.sending_gas_est.as_ref();
    let dest_gas = request.claiming_gas_est.as_ref();

    let total = match (source_gas, dest_gas) {
        (Some(send), Some(claim)) => format!(
            "{} {} & {} {}",
            format_amount(send, 6),
            gas_symbol(config, &request.source_chain),
            format_amount(claim, 6),
            gas_symbol(config, &request.dest_chain)
        ),
        _ => NO_INPUT.to_string(),
    };

    vec![
        DisplayRow::new(
            "Amount",
            token_text(config, &request.amount, 6, &request.dest_token),
        ),
        DisplayRow::estimate("Total fee estimates", total).with_rows(vec![
            DisplayRow::estimate(
                "Source chain gas estimate",
                gas_estimate_text(config, &request.source_chain, source_gas),
            ),
            DisplayRow::estimate(
                "Destination chain gas estimate",
                gas_estimate_text(config, &request.dest_chain, dest_gas),
            ),
        ]),
    ]
}

pub(crate) fn manual_source_info(
    config: &NetworkConfig,
    message: &UnsignedMessage,
) -> RouteResult<TransferDisplayData> {
    Ok(vec![
        DisplayRow::new(
            "Amount",
            token_text(
                config,
                &canonical_amount(message.amount),
                MAX_DECIMALS,
                &message.token_key,
            ),
        ),
        source_gas_row(config, message)?,
    ])
}

pub(crate) fn manual_dest_info(config: &NetworkConfig, request: &DestInfoRequest) -> TransferDisplayData {
    let message = &request.message;
    let status = if request.transfer_complete {
        "Redeemed"
    } else {
        "Awaiting redeem"
    };
    vec![
        DisplayRow::new(
            "Amount",
            token_text(
                config,
                &canonical_amount(message.amount),
                MAX_DECIMALS,
                &message.token_key,
            ),
        ),
        DisplayRow::new("Status", status),
    ]
}

// ============================================================================
// Strategy
// ============================================================================

#[async_trait]
impl RouteStrategy for BridgeRoute {
    fn kind(&self) -> RouteKind {
        RouteKind::Bridge
    }

    fn context(&self) -> &RouteContext {
        &self.ctx
    }

    fn is_supported_chain(&self, chain: &str) -> bool {
        self.ctx
            .config
            .chain(chain)
            .map_or(false, |c| c.contracts.token_bridge.is_some())
    }

    async fn is_route_available(&self, request: &RouteRequest) -> bool {
        if !self.ctx.config.is_route_enabled(self.kind()) {
            return false;
        }
        probe_result(self.kind(), request, self.token_bridge_available(request))
    }

    async fn is_supported_source_token(
        &self,
        token: Option<&TokenConfig>,
        dest_token: Option<&TokenConfig>,
        source_chain: Option<&str>,
    ) -> RouteResult<bool> {
        let chain_supported = source_chain.map_or(true, |c| self.is_supported_chain(c));
        Ok(bridge_token_supported(
            &self.ctx.config,
            token,
            dest_token,
            chain_supported,
        ))
    }

    async fn is_supported_dest_token(
        &self,
        token: Option<&TokenConfig>,
        source_token: Option<&TokenConfig>,
        dest_chain: Option<&str>,
    ) -> RouteResult<bool> {
        let chain_supported = dest_chain.map_or(true, |c| self.is_supported_chain(c));
        Ok(bridge_token_supported(
            &self.ctx.config,
            token,
            source_token,
            chain_supported,
        ))
    }

    async fn estimate_send_gas(&self, request: &TransferRequest) -> RouteResult<BigDecimal> {
        estimate_send(&self.ctx, self.kind(), request, false).await
    }

    async fn estimate_claim_gas(
        &self,
        dest_chain: &str,
        signed: &SignedMessage,
    ) -> RouteResult<BigDecimal> {
        estimate_claim(&self.ctx, self.kind(), dest_chain, signed).await
    }

    async fn send(&self, request: &TransferRequest) -> RouteResult<String> {
        if !self.is_supported_chain(&request.source_chain) {
            return Err(RouteError::unsupported("send", self.kind()));
        }
        submit(&self.ctx, self.kind(), request, false).await
    }

    async fn redeem(
        &self,
        dest_chain: &str,
        signed: &SignedMessage,
        payer: &str,
    ) -> RouteResult<String> {
        if !self.is_supported_chain(dest_chain) {
            return Err(RouteError::unsupported("redeem", self.kind()));
        }
        redeem_manual(&self.ctx, self.kind(), dest_chain, signed, payer).await
    }

    async fn get_message(&self, tx: &str, chain: &str) -> RouteResult<UnsignedMessage> {
        let message = self.ctx.client.get_message(tx, chain).await?;
        expect_payload(self.kind(), message, PayloadKind::Manual, Protocol::TokenBridge)
    }

    async fn get_preview(&self, request: &PreviewRequest) -> RouteResult<TransferDisplayData> {
        Ok(manual_preview(&self.ctx.config, request))
    }

    async fn get_transfer_source_info(
        &self,
        message: &UnsignedMessage,
    ) -> RouteResult<TransferDisplayData> {
        manual_source_info(&self.ctx.config, message)
    }

    async fn get_transfer_dest_info(
        &self,
        request: &DestInfoRequest,
    ) -> RouteResult<TransferDisplayData> {
        Ok(manual_dest_info(&self.ctx.config, request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::find_row;
    use crate::testing::fixtures::{
        route_request, sample_client, sample_context, sample_message, transfer_request,
    };
    use crate::testing::mocks::MockChainClient;
    use crate::types::RouteOptions;
    use std::str::FromStr;
    use std::sync::Arc;

    fn route_with(client: MockChainClient) -> (BridgeRoute, Arc<MockChainClient>) {
        let client = Arc::new(client);
        (BridgeRoute::new(sample_context(client.clone())), client)
    }

    #[tokio::test]
    async fn test_availability() {
        let (route, _) = route_with(sample_client());

        assert!(route.is_route_available(&route_request("WETH", "WETH", "1", "ethereum", "polygon")).await);
        // native ETH bridges as WETH
        assert!(route.is_route_available(&route_request("ETH", "WETH", "1", "ethereum", "solana")).await);
        // same chain
        assert!(!route.is_route_available(&route_request("WETH", "WETH", "1", "ethereum", "ethereum")).await);
        // different wrapped identity
        assert!(!route.is_route_available(&route_request("WETH", "WMATIC", "1", "ethereum", "polygon")).await);
        // osmosis has no token bridge
        assert!(!route.is_route_available(&route_request("WETH", "WETH", "1", "ethereum", "osmosis")).await);
        // unknown token key is logged and treated as unavailable
        assert!(!route.is_route_available(&route_request("NOPE", "WETH", "1", "ethereum", "polygon")).await);
    }

    #[tokio::test]
    async fn test_disabled_route_is_unavailable() {
        let client = Arc::new(sample_client());
        let mut ctx = sample_context(client);
        let mut config = (*ctx.config).clone();
        config.routes = vec![RouteKind::Relay];
        ctx.config = Arc::new(config);
        let route = BridgeRoute::new(ctx);

        assert!(!route.is_route_available(&route_request("WETH", "WETH", "1", "ethereum", "polygon")).await);
    }

    #[tokio::test]
    async fn test_supported_tokens() {
        let (route, _) = route_with(sample_client());
        let config = route.context().config.clone();
        let weth = config.token("WETH").unwrap();
        let eth = config.token("ETH").unwrap();
        let osmo = config.token("OSMO").unwrap();

        assert!(route.is_supported_source_token(Some(eth), Some(weth), Some("ethereum")).await.unwrap());
        assert!(!route.is_supported_source_token(None, Some(weth), None).await.unwrap());
        assert!(!route.is_supported_source_token(Some(osmo), None, None).await.unwrap());
        assert!(!route.is_supported_dest_token(Some(weth), Some(eth), Some("osmosis")).await.unwrap());

        let candidates: Vec<TokenConfig> = config.tokens.values().cloned().collect();
        let supported = route.supported_dest_tokens(&candidates, Some(eth), Some("polygon")).await;
        let keys: Vec<&str> = supported.iter().map(|t| t.key.as_str()).collect();
        assert_eq!(keys, vec!["ETH", "WETH"]);
    }

    #[tokio::test]
    async fn test_send_strips_relay_options() {
        let (route, client) = route_with(sample_client());
        let mut request = transfer_request("WETH", "1.5", "ethereum", "polygon");
        request.options = RouteOptions::relay(BigDecimal::from(1), BigDecimal::from(1));

        let tx = route.send(&request).await.unwrap();
        assert!(tx.starts_with("0x"));

        let sends = client.sends();
        assert_eq!(sends.len(), 1);
        assert_eq!(sends[0].route, RouteKind::Bridge);
        assert_eq!(sends[0].amount, 1_500_000_000_000_000_000);
        assert_eq!(sends[0].relayer_fee, None);
        assert_eq!(sends[0].to_native_token, 0);
    }

    #[tokio::test]
    async fn test_send_from_unsupported_chain() {
        let (route, client) = route_with(sample_client());
        let request = transfer_request("OSMO", "1", "osmosis", "ethereum");
        let err = route.send(&request).await.unwrap_err();
        assert!(matches!(err, RouteError::UnsupportedOperation { route: RouteKind::Bridge, .. }));
        assert!(client.sends().is_empty());
    }

    #[tokio::test]
    async fn test_gas_estimates() {
        let (route, _) = route_with(sample_client());
        let request = transfer_request("WETH", "1", "ethereum", "polygon");
        assert_eq!(
            route.estimate_send_gas(&request).await.unwrap(),
            BigDecimal::from_str("0.0015").unwrap()
        );

        let signed = SignedMessage::new(
            sample_message(PayloadKind::Manual, Protocol::TokenBridge),
            vec![1, 2, 3],
        );
        assert_eq!(
            route.estimate_claim_gas("polygon", &signed).await.unwrap(),
            BigDecimal::from_str("0.002").unwrap()
        );
    }

    #[tokio::test]
    async fn test_get_message_rejects_relay_payload() {
        let message = sample_message(PayloadKind::Automatic, Protocol::TokenBridge);
        let (route, _) = route_with(sample_client().with_message(message));

        let err = route.get_message("0xsendtx", "ethereum").await.unwrap_err();
        assert!(matches!(err, RouteError::InvalidPayload { .. }));
    }

    #[tokio::test]
    async fn test_redeem_records_call() {
        let message = sample_message(PayloadKind::Manual, Protocol::TokenBridge);
        let (route, client) = route_with(sample_client());
        let signed = SignedMessage::new(message, vec![4, 5]);

        route.redeem("polygon", &signed, "0xpayer").await.unwrap();
        assert_eq!(
            client.redeems(),
            vec![("polygon".to_string(), RouteKind::Bridge, "0xpayer".to_string())]
        );
        assert!(matches!(
            route.redeem("osmosis", &signed, "0xpayer").await,
            Err(RouteError::UnsupportedOperation { .. })
        ));
    }

    #[tokio::test]
    async fn test_display_rows() {
        let (route, _) = route_with(sample_client());
        let preview = route
            .get_preview(&PreviewRequest {
                token: "WETH".to_string(),
                dest_token: "WETH".to_string(),
                amount: BigDecimal::from_str("1.25").unwrap(),
                source_chain: "ethereum".to_string(),
                dest_chain: "polygon".to_string(),
                sending_gas_est: Some(BigDecimal::from_str("0.0015").unwrap()),
                claiming_gas_est: None,
                options: RouteOptions::None,
            })
            .await
            .unwrap();
        assert_eq!(find_row(&preview, "Amount").unwrap().value, "1.25 WETH");
        let fees = find_row(&preview, "Total fee estimates").unwrap();
        assert_eq!(fees.value, NO_INPUT);
        assert_eq!(fees.rows[0].value, "~ 0.0015 ETH");
        assert_eq!(fees.rows[1].value, NO_INPUT);

        let message = sample_message(PayloadKind::Manual, Protocol::TokenBridge);
        let source = route.get_transfer_source_info(&message).await.unwrap();
        assert_eq!(find_row(&source, "Amount").unwrap().value, "1 WETH");

        let dest = route
            .get_transfer_dest_info(&DestInfoRequest {
                message,
                receive_tx: None,
                transfer_complete: false,
            })
            .await
            .unwrap();
        assert_eq!(find_row(&dest, "Status").unwrap().value, "Awaiting redeem");
    }
}
