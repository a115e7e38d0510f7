//! Stablecoin burn-and-mint (CCTP)
//!
//! The token is burned on the source chain and minted natively on the
//! destination, so both sides must be the issuer's own deployment. The manual
//! variant is redeemed by the recipient; the relay variant by a relayer, with
//! the same fee model as [`super::RelayRoute`].

use async_trait::async_trait;
use bigdecimal::BigDecimal;

use super::bridge;
use super::relay;
use super::{
    expect_payload, fees, probe_result, DestInfoRequest, PreviewRequest, RouteContext, RouteKind,
    RouteStrategy,
};
use crate::config::TokenConfig;
use crate::display::TransferDisplayData;
use crate::error::{RouteError, RouteResult};
use crate::types::{
    PayloadKind, Protocol, RouteOptions, RouteRequest, SignedMessage, TransferRequest,
    UnsignedMessage,
};

/// A CCTP token on its issuing chain, paired with another CCTP token
fn cctp_token_supported(
    token: Option<&TokenConfig>,
    counterpart: Option<&TokenConfig>,
    chain: Option<&str>,
    chain_supported: bool,
) -> bool {
    let Some(token) = token else {
        return false;
    };
    if !token.cctp || !chain_supported {
        return false;
    }
    if let Some(chain) = chain {
        if !token.is_native_to(chain) {
            return false;
        }
    }
    counterpart.map_or(true, |other| other.cctp)
}

// ============================================================================
// CCTP Manual
// ============================================================================

#[derive(Debug, Clone)]
pub struct CctpManualRoute {
    ctx: RouteContext,
}

impl CctpManualRoute {
    pub fn new(ctx: RouteContext) -> Self {
        Self { ctx }
    }

    /// Burn-and-mint rule without the enablement check
    pub(crate) fn cctp_available(&self, request: &RouteRequest) -> RouteResult<bool> {
        if request.source_chain == request.dest_chain
            || !self.is_supported_chain(&request.source_chain)
            || !self.is_supported_chain(&request.dest_chain)
        {
            return Ok(false);
        }
        let source = self.ctx.config.token(&request.source_token)?;
        let dest = self.ctx.config.token(&request.dest_token)?;
        Ok(source.cctp
            && dest.cctp
            && source.is_native_to(&request.source_chain)
            && dest.is_native_to(&request.dest_chain))
    }
}

#[async_trait]
impl RouteStrategy for CctpManualRoute {
    fn kind(&self) -> RouteKind {
        RouteKind::CctpManual
    }

    fn context(&self) -> &RouteContext {
        &self.ctx
    }

    fn is_supported_chain(&self, chain: &str) -> bool {
        self.ctx
            .config
            .chain(chain)
            .map_or(false, |c| c.contracts.cctp_token_messenger.is_some())
    }

    async fn is_route_available(&self, request: &RouteRequest) -> bool {
        if !self.ctx.config.is_route_enabled(self.kind()) {
            return false;
        }
        probe_result(self.kind(), request, self.cctp_available(request))
    }

    async fn is_supported_source_token(
        &self,
        token: Option<&TokenConfig>,
        dest_token: Option<&TokenConfig>,
        source_chain: Option<&str>,
    ) -> RouteResult<bool> {
        let chain_supported = source_chain.map_or(true, |c| self.is_supported_chain(c));
        Ok(cctp_token_supported(token, dest_token, source_chain, chain_supported))
    }

    async fn is_supported_dest_token(
        &self,
        token: Option<&TokenConfig>,
        source_token: Option<&TokenConfig>,
        dest_chain: Option<&str>,
    ) -> RouteResult<bool> {
        let chain_supported = dest_chain.map_or(true, |c| self.is_supported_chain(c));
        Ok(cctp_token_supported(token, source_token, dest_chain, chain_supported))
    }

    async fn estimate_send_gas(&self, request: &TransferRequest) -> RouteResult<BigDecimal> {
        bridge::estimate_send(&self.ctx, self.kind(), request, false).await
    }

    async fn estimate_claim_gas(
        &self,
        dest_chain: &str,
        signed: &SignedMessage,
    ) -> RouteResult<BigDecimal> {
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
        if !self.is_supported_chain(dest_chain) {
            return Err(RouteError::unsupported("redeem", self.kind()));
        }
        bridge::redeem_manual(&self.ctx, self.kind(), dest_chain, signed, payer).await
    }

    async fn get_message(&self, tx: &str, chain: &str) -> RouteResult<UnsignedMessage> {
        let message = self.ctx.client.get_message(tx, chain).await?;
        expect_payload(self.kind(), message, PayloadKind::Manual, Protocol::Cctp)
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
        Ok(bridge::manual_dest_info(&self.ctx.config, request))
    }
}

// ============================================================================
// CCTP Relay
// ============================================================================

#[derive(Debug, Clone)]
pub struct CctpRelayRoute {
    ctx: RouteContext,
    manual: CctpManualRoute,
}

impl CctpRelayRoute {
    pub fn new(ctx: RouteContext) -> Self {
        Self {
            manual: CctpManualRoute::new(ctx.clone()),
            ctx,
        }
    }

    async fn check_available(&self, request: &RouteRequest) -> RouteResult<bool> {
        if !self.manual.cctp_available(request)? {
            return Ok(false);
        }
        if !self.is_supported_chain(&request.source_chain)
            || !self.is_supported_chain(&request.dest_chain)
        {
            return Ok(false);
        }
        relay::fee_clears_minimum(&self.ctx, self.kind(), request).await
    }

    fn relay_chain_supported(&self, chain: Option<&str>) -> bool {
        chain.map_or(true, |c| {
            self.is_supported_chain(c) && self.manual.is_supported_chain(c)
        })
    }
}

#[async_trait]
impl RouteStrategy for CctpRelayRoute {
    fn kind(&self) -> RouteKind {
        RouteKind::CctpRelay
    }

    fn context(&self) -> &RouteContext {
        &self.ctx
    }

    fn native_gas_dropoff_supported(&self) -> bool {
        true
    }

    fn automatic_deposit(&self) -> bool {
        true
    }

    fn is_supported_chain(&self, chain: &str) -> bool {
        self.ctx
            .config
            .chain(chain)
            .map_or(false, |c| c.contracts.cctp_relayer.is_some())
    }

    async fn is_route_available(&self, request: &RouteRequest) -> bool {
        if !self.ctx.config.is_route_enabled(self.kind()) {
            return false;
        }
        probe_result(self.kind(), request, self.check_available(request).await)
    }

    async fn is_supported_source_token(
        &self,
        token: Option<&TokenConfig>,
        dest_token: Option<&TokenConfig>,
        source_chain: Option<&str>,
    ) -> RouteResult<bool> {
        Ok(cctp_token_supported(
            token,
            dest_token,
            source_chain,
            self.relay_chain_supported(source_chain),
        ))
    }

    async fn is_supported_dest_token(
        &self,
        token: Option<&TokenConfig>,
        source_token: Option<&TokenConfig>,
        dest_chain: Option<&str>,
    ) -> RouteResult<bool> {
        Ok(cctp_token_supported(
            token,
            source_token,
            dest_chain,
            self.relay_chain_supported(dest_chain),
        ))
    }

    fn compute_receive_amount(
        &self,
        send_amount: &BigDecimal,
        options: &RouteOptions,
    ) -> RouteResult<BigDecimal> {
        Ok(fees::receive_amount(send_amount, options))
    }

    fn compute_send_amount(
        &self,
        receive_amount: &BigDecimal,
        options: &RouteOptions,
    ) -> RouteResult<BigDecimal> {
        Ok(fees::send_amount(receive_amount, options))
    }

    fn min_send_amount(&self, options: &RouteOptions) -> RouteResult<BigDecimal> {
        fees::min_send_amount_for(options)
    }

    async fn relayer_fee(
        &self,
        source_chain: &str,
        dest_chain: &str,
        token_key: &str,
    ) -> RouteResult<BigDecimal> {
        relay::quote_relayer_fee(&self.ctx, self.kind(), source_chain, dest_chain, token_key).await
    }

    async fn native_token_amount(
        &self,
        dest_chain: &str,
        token_key: &str,
        amount: &BigDecimal,
        wallet: &str,
    ) -> RouteResult<BigDecimal> {
        relay::native_token_amount(&self.ctx, dest_chain, token_key, amount, wallet).await
    }

    async fn max_swap_amount(
        &self,
        dest_chain: &str,
        token_key: &str,
        wallet: &str,
    ) -> RouteResult<BigDecimal> {
        relay::max_swap_amount(&self.ctx, dest_chain, token_key, wallet).await
    }

    async fn estimate_send_gas(&self, request: &TransferRequest) -> RouteResult<BigDecimal> {
        bridge::estimate_send(&self.ctx, self.kind(), request, true).await
    }

    async fn send(&self, request: &TransferRequest) -> RouteResult<String> {
        if !self.is_supported_chain(&request.source_chain) {
            return Err(RouteError::unsupported("send", self.kind()));
        }
        bridge::submit(&self.ctx, self.kind(), request, true).await
    }

    async fn get_message(&self, tx: &str, chain: &str) -> RouteResult<UnsignedMessage> {
        let message = self.ctx.client.get_message(tx, chain).await?;
        expect_payload(self.kind(), message, PayloadKind::Automatic, Protocol::Cctp)
    }

    async fn get_preview(&self, request: &PreviewRequest) -> RouteResult<TransferDisplayData> {
        relay::relay_preview(&self.ctx.config, request)
    }

    async fn get_transfer_source_info(
        &self,
        message: &UnsignedMessage,
    ) -> RouteResult<TransferDisplayData> {
        relay::relay_source_info(&self.ctx.config, message)
    }

    async fn get_transfer_dest_info(
        &self,
        request: &DestInfoRequest,
    ) -> RouteResult<TransferDisplayData> {
        relay::relay_dest_info(&self.ctx, self.kind(), request).await
    }
}
