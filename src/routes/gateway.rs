//! Transfers between a Cosmos chain and a token-bridge chain via the IBC gateway
//!
//! Deposits into Cosmos are completed by the gateway itself; withdrawals out of
//! Cosmos land on a token-bridge chain and are redeemed manually.

use async_trait::async_trait;
use bigdecimal::BigDecimal;

use super::bridge::{self, bridge_token_supported, same_wrapped_asset};
use super::{
    canonical_amount, expect_payload, probe_result, token_text, DestInfoRequest, PreviewRequest,
    RouteContext, RouteKind, RouteStrategy,
};
use crate::amount::MAX_DECIMALS;
use crate::config::{ChainConfig, TokenConfig};
use crate::display::{DisplayRow, TransferDisplayData};
use crate::error::{RouteError, RouteResult};
use crate::types::{
    PayloadKind, Protocol, RouteRequest, SignedMessage, TransferRequest, UnsignedMessage,
};

#[derive(Debug, Clone)]
pub struct CosmosGatewayRoute {
    ctx: RouteContext,
}

impl CosmosGatewayRoute {
    pub fn new(ctx: RouteContext) -> Self {
        Self { ctx }
    }

    fn dest_is_cosmos(&self, dest_chain: &str) -> bool {
        self.ctx
            .config
            .chain(dest_chain)
            .map_or(false, ChainConfig::is_cosmos)
    }

    fn check_available(&self, request: &RouteRequest) -> RouteResult<bool> {
        let config = &self.ctx.config;
        let source = config.chain(&request.source_chain)?;
        let dest = config.chain(&request.dest_chain)?;
        if source.key == dest.key || source.is_cosmos() == dest.is_cosmos() {
            return Ok(false);
        }
        if !chain_has_gateway_side(source) || !chain_has_gateway_side(dest) {
            return Ok(false);
        }
        let source_token = config.token(&request.source_token)?;
        let dest_token = config.token(&request.dest_token)?;
        Ok(same_wrapped_asset(config, source_token, dest_token))
    }
}

/// Cosmos chains need the IBC gateway, everything else the token bridge
fn chain_has_gateway_side(chain: &ChainConfig) -> bool {
    if chain.is_cosmos() {
        chain.contracts.ibc_gateway.is_some()
    } else {
        chain.contracts.token_bridge.is_some()
    }
}

#[async_trait]
impl RouteStrategy for CosmosGatewayRoute {
    fn kind(&self) -> RouteKind {
        RouteKind::CosmosGateway
    }

    fn context(&self) -> &RouteContext {
        &self.ctx
    }

    fn is_automatic(&self, message: &UnsignedMessage) -> bool {
        self.dest_is_cosmos(&message.to_chain)
    }

    fn is_supported_chain(&self, chain: &str) -> bool {
        self.ctx
            .config
            .chain(chain)
            .map_or(false, chain_has_gateway_side)
    }

    async fn is_route_available(&self, request: &RouteRequest) -> bool {
        if !self.ctx.config.is_route_enabled(self.kind()) {
            return false;
        }
        probe_result(self.kind(), request, self.check_available(request))
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
        bridge::estimate_send(&self.ctx, self.kind(), request, false).await
    }

    async fn estimate_claim_gas(
        &self,
        dest_chain: &str,
        signed: &SignedMessage,
    ) -> RouteResult<BigDecimal> {
        if self.dest_is_cosmos(dest_chain) {
            return Err(RouteError::unsupported("estimate_claim_gas", self.kind()));
        }
        bridge::estimate_claim(&self.ctx, self.kind(), dest_chain, signed).await
    }

    async fn send(&self, request: &TransferRequest) -> RouteResult<String> {
        if !self.is_supported_chain(&request.source_chain) {
            return Err(RouteError::unsupported("send", self.kind()));
        }
        bridge::submit(&self.ctx, self.kind(), request, false).await
    }

    async fn redeem(
        &self,
        dest_chain: &str,
        signed: &SignedMessage,
        payer: &str,
    ) -> RouteResult<String> {
        if self.dest_is_cosmos(dest_chain) || !self.is_supported_chain(dest_chain) {
            return Err(RouteError::unsupported("redeem", self.kind()));
        }
        bridge::redeem_manual(&self.ctx, self.kind(), dest_chain, signed, payer).await
    }

    async fn get_message(&self, tx: &str, chain: &str) -> RouteResult<UnsignedMessage> {
        let message = self.ctx.client.get_message(tx, chain).await?;
        let payload = if self.dest_is_cosmos(&message.to_chain) {
            PayloadKind::Automatic
        } else {
            PayloadKind::Manual
        };
        expect_payload(self.kind(), message, payload, Protocol::Gateway)
    }

    async fn get_preview(&self, request: &PreviewRequest) -> RouteResult<TransferDisplayData> {
        Ok(bridge::manual_preview(&self.ctx.config, request))
    }

    async fn get_transfer_source_info(
        &self,
        message: &UnsignedMessage,
    ) -> RouteResult<TransferDisplayData> {
        bridge::manual_source_info(&self.ctx.config, message)
    }

    async fn get_transfer_dest_info(
        &self,
        request: &DestInfoRequest,
    ) -> RouteResult<TransferDisplayData> {
        if !self.is_automatic(&request.message) {
            return Ok(bridge::manual_dest_info(&self.ctx.config, request));
        }

        let message = &request.message;
        let status = if request.transfer_complete {
            "Completed"
        } else {
            "Pending"
        };
        Ok(vec![
            DisplayRow::new(
                "Amount",
                token_text(
                    &self.ctx.config,
                    &canonical_amount(message.amount),
                    MAX_DECIMALS,
                    &message.token_key,
                ),
            ),
            DisplayRow::new("Status", status),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::find_row;
    use crate::testing::fixtures::{route_request, sample_client, sample_context, sample_message};
    use std::sync::Arc;

    fn gateway_message(to_chain: &str, payload: PayloadKind) -> UnsignedMessage {
        let mut message = sample_message(payload, Protocol::Gateway);
        message.to_chain = to_chain.to_string();
        message
    }

    #[tokio::test]
    async fn test_availability_requires_exactly_one_cosmos_side() {
        let route = CosmosGatewayRoute::new(sample_context(Arc::new(sample_client())));

        assert!(
            route
                .is_route_available(&route_request("WETH", "WETH", "1", "ethereum", "osmosis"))
                .await
        );
        assert!(
            route
                .is_route_available(&route_request("WETH", "WETH", "1", "osmosis", "ethereum"))
                .await
        );
        assert!(
            !route
                .is_route_available(&route_request("WETH", "WETH", "1", "ethereum", "polygon"))
                .await
        );
        assert!(
            !route
                .is_route_available(&route_request("WETH", "WMATIC", "1", "ethereum", "osmosis"))
                .await
        );
    }

    #[tokio::test]
    async fn test_direction_decides_automatic() {
        let route = CosmosGatewayRoute::new(sample_context(Arc::new(sample_client())));
        assert!(route.is_automatic(&gateway_message("osmosis", PayloadKind::Automatic)));
        assert!(!route.is_automatic(&gateway_message("ethereum", PayloadKind::Manual)));

        let signed = SignedMessage::new(gateway_message("osmosis", PayloadKind::Automatic), vec![1]);
        assert!(matches!(
            route.redeem("osmosis", &signed, "osmo1payer").await,
            Err(RouteError::UnsupportedOperation { .. })
        ));
        assert!(matches!(
            route.estimate_claim_gas("osmosis", &signed).await,
            Err(RouteError::UnsupportedOperation { .. })
        ));
    }

    #[tokio::test]
    async fn test_get_message_checks_direction() {
        let client = sample_client().with_message(gateway_message("osmosis", PayloadKind::Manual));
        let route = CosmosGatewayRoute::new(sample_context(Arc::new(client)));
        assert!(matches!(
            route.get_message("0xsendtx", "ethereum").await,
            Err(RouteError::InvalidPayload { .. })
        ));

        let client = sample_client().with_message(gateway_message("ethereum", PayloadKind::Manual));
        let route = CosmosGatewayRoute::new(sample_context(Arc::new(client)));
        assert!(route.get_message("0xsendtx", "osmosis").await.is_ok());
    }

    #[tokio::test]
    async fn test_dest_info_for_deposit() {
        let route = CosmosGatewayRoute::new(sample_context(Arc::new(sample_client())));
        let info = route
            .get_transfer_dest_info(&DestInfoRequest {
                message: gateway_message("osmosis", PayloadKind::Automatic),
                receive_tx: None,
                transfer_complete: true,
            })
            .await
            .unwrap();
        assert_eq!(find_row(&info, "Status").unwrap().value, "Completed");
        assert_eq!(find_row(&info, "Amount").unwrap().value, "1 WETH");
    }
}
