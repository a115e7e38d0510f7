//! Automatic lock-and-mint: a relayer redeems on the recipient's behalf
//!
//! The relayer is paid out of the sent amount and can swap part of it into
//! destination gas ("native gas drop-off"). Availability layers the relayer
//! requirements on top of the token bridge rule.

use async_trait::async_trait;
use bigdecimal::{BigDecimal, Zero};
use tracing::{debug, warn};

use super::bridge::{self, bridge_token_supported, BridgeRoute};
use super::{
    canonical_amount, expect_payload, fees, gas_amount, gas_estimate_text, gas_symbol,
    probe_result, source_gas_row, token_text, DestInfoRequest, PreviewRequest, RouteContext,
    RouteKind, RouteStrategy,
};
use crate::amount::{denormalize, format_amount, parse_units, round_to, to_decimal_amount, MAX_DECIMALS};
use crate::config::{NetworkConfig, TokenConfig};
use crate::display::{DisplayRow, TransferDisplayData, ValueStatus, NO_INPUT};
use crate::error::{RouteError, RouteResult};
use crate::types::{
    PayloadKind, Protocol, RouteOptions, RouteRequest, SendToken, TokenId, TransferRequest,
    UnsignedMessage,
};

#[derive(Debug, Clone)]
pub struct RelayRoute {
    ctx: RouteContext,
    bridge: BridgeRoute,
}

impl RelayRoute {
    pub fn new(ctx: RouteContext) -> Self {
        Self {
            bridge: BridgeRoute::new(ctx.clone()),
            ctx,
        }
    }

    async fn check_available(&self, request: &RouteRequest) -> RouteResult<bool> {
        if !self.bridge.token_bridge_available(request)? {
            return Ok(false);
        }
        if !self.is_supported_chain(&request.source_chain)
            || !self.is_supported_chain(&request.dest_chain)
        {
            return Ok(false);
        }
        let token = self.ctx.config.token(&request.source_token)?;
        if !is_accepted(&self.ctx, token).await? {
            return Ok(false);
        }
        fee_clears_minimum(&self.ctx, self.kind(), request).await
    }

    async fn token_supported(
        &self,
        token: Option<&TokenConfig>,
        counterpart: Option<&TokenConfig>,
        chain: Option<&str>,
    ) -> RouteResult<bool> {
        let chain_supported = chain.map_or(true, |c| {
            self.is_supported_chain(c) && self.bridge.is_supported_chain(c)
        });
        if !bridge_token_supported(&self.ctx.config, token, counterpart, chain_supported) {
            return Ok(false);
        }
        match token {
            Some(token) => is_accepted(&self.ctx, token).await,
            None => Ok(false),
        }
    }
}

// ============================================================================
// Relay building blocks
// ============================================================================

fn bridged_id(config: &NetworkConfig, token: &TokenConfig) -> RouteResult<TokenId> {
    config
        .wrapped_token_id(token)
        .ok_or_else(|| RouteError::unavailable(format!("token {} is not bridgeable", token.key)))
}

/// Precision of `token`'s bridged identity on `chain`
fn bridged_decimals(config: &NetworkConfig, chain: &str, id: &TokenId) -> RouteResult<u8> {
    config.token_decimals(chain, &SendToken::Token(id.clone()))
}

async fn is_accepted(ctx: &RouteContext, token: &TokenConfig) -> RouteResult<bool> {
    let id = bridged_id(&ctx.config, token)?;
    Ok(ctx.client.is_accepted_token(&id).await?)
}

pub(crate) async fn quote_relayer_fee(
    ctx: &RouteContext,
    kind: RouteKind,
    source_chain: &str,
    dest_chain: &str,
    token_key: &str,
) -> RouteResult<BigDecimal> {
    let token = ctx.config.token(token_key)?;
    let id = bridged_id(&ctx.config, token)?;
    let raw = ctx
        .client
        .relayer_fee(source_chain, dest_chain, &id, kind)
        .await?;
    let decimals = bridged_decimals(&ctx.config, source_chain, &id)?;
    Ok(to_decimal_amount(raw, decimals))
}

/// A fee must be quotable and the amount must clear the zero drop-off minimum
pub(crate) async fn fee_clears_minimum(
    ctx: &RouteContext,
    kind: RouteKind,
    request: &RouteRequest,
) -> RouteResult<bool> {
    let fee = match quote_relayer_fee(
        ctx,
        kind,
        &request.source_chain,
        &request.dest_chain,
        &request.source_token,
    )
    .await
    {
        Ok(fee) => fee,
        Err(e) => {
            debug!(route = %kind, token = %request.source_token, error = %e, "No relayer fee quote");
            return Ok(false);
        }
    };
    let minimum = fees::min_send_amount(&fee, &BigDecimal::zero());
    Ok(request.amount >= minimum)
}

pub(crate) async fn native_token_amount(
    ctx: &RouteContext,
    dest_chain: &str,
    token_key: &str,
    amount: &BigDecimal,
    wallet: &str,
) -> RouteResult<BigDecimal> {
    let id = bridged_id(&ctx.config, ctx.config.token(token_key)?)?;
    let decimals = bridged_decimals(&ctx.config, dest_chain, &id)?;
    let raw = parse_units(&amount.with_scale(decimals as i64), decimals)?;
    let native = ctx
        .client
        .native_token_amount(dest_chain, &id, raw, wallet)
        .await?;
    gas_amount(&ctx.config, dest_chain, native)
}

pub(crate) async fn max_swap_amount(
    ctx: &RouteContext,
    dest_chain: &str,
    token_key: &str,
    wallet: &str,
) -> RouteResult<BigDecimal> {
    let id = bridged_id(&ctx.config, ctx.config.token(token_key)?)?;
    let decimals = bridged_decimals(&ctx.config, dest_chain, &id)?;
    let raw = ctx.client.max_swap_amount(dest_chain, &id, wallet).await?;
    Ok(to_decimal_amount(raw, decimals))
}

pub(crate) fn relay_preview(
    config: &NetworkConfig,
    request: &PreviewRequest,
) -> RouteResult<TransferDisplayData> {
    let source_gas_key = &config.chain(&request.source_chain)?.gas_token;
    let dest_gas_key = &config.chain(&request.dest_chain)?.gas_token;
    let is_native = &request.token == source_gas_key;
    let relayer_fee = request.options.relayer_fee();
    let sending_gas = request.sending_gas_est.as_ref();

    let total = match (sending_gas, relayer_fee) {
        (Some(gas), Some(fee)) => {
            // native sends pay gas in the token being sent
            let fee = if is_native { fee + gas } else { fee.clone() };
            let fee = round_to(&fee, 6);
            if is_native {
                token_text(config, &fee, 6, &request.token)
            } else {
                format!(
                    "{} {} & {}",
                    format_amount(gas, 6),
                    gas_symbol(config, &request.source_chain),
                    token_text(config, &fee, 6, &request.token)
                )
            }
        }
        _ => NO_INPUT.to_string(),
    };

    let receive = fees::receive_amount(&request.amount, &request.options);
    let mut rows = vec![DisplayRow::new(
        "Amount",
        token_text(config, &round_to(&receive, 6), 6, &request.dest_token),
    )];

    let receive_native = request.options.receive_native_amount();
    if receive_native > BigDecimal::zero() {
        rows.push(DisplayRow::estimate(
            "Native gas on destination",
            token_text(config, &receive_native, 6, dest_gas_key),
        ));
    }

    rows.push(
        DisplayRow::estimate("Total fee estimates", total).with_rows(vec![
            DisplayRow::estimate(
                "Source chain gas estimate",
                gas_estimate_text(config, &request.source_chain, sending_gas),
            ),
            DisplayRow::new(
                "Relayer fee",
                relayer_fee.map_or_else(
                    || NO_INPUT.to_string(),
                    |fee| token_text(config, fee, 6, &request.token),
                ),
            ),
        ]),
    );
    Ok(rows)
}

pub(crate) fn relay_source_info(
    config: &NetworkConfig,
    message: &UnsignedMessage,
) -> RouteResult<TransferDisplayData> {
    let dest_gas_key = &config.chain(&message.to_chain)?.gas_token;
    let fee = canonical_amount(message.relayer_fee.unwrap_or(0));
    let to_native = canonical_amount(message.to_native_token_amount.unwrap_or(0));

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
        DisplayRow::new(
            "Relayer fee",
            token_text(config, &fee, MAX_DECIMALS, &message.token_key),
        ),
        DisplayRow::estimate(
            "Convert to native gas token",
            format!(
                "≈ {} \u{2192} {}",
                token_text(config, &to_native, MAX_DECIMALS, &message.token_key),
                config.display_name(dest_gas_key)
            ),
        ),
    ])
}

/// Gas drop-off the recipient should get, from the current swap rate
async fn estimate_dropoff(ctx: &RouteContext, message: &UnsignedMessage) -> RouteResult<BigDecimal> {
    let to_native = message.to_native_token_amount.unwrap_or(0);
    let decimals = bridged_decimals(&ctx.config, &message.to_chain, &message.token_id)?;
    let raw = denormalize(to_native, decimals, MAX_DECIMALS)?;
    let native = ctx
        .client
        .native_token_amount(&message.to_chain, &message.token_id, raw, &message.recipient)
        .await?;
    gas_amount(&ctx.config, &message.to_chain, native)
}

/// Received amount and native gas. Gas is `Final` once the relayer's swap
/// event is found and an `Estimate` from the current rate otherwise. Without
/// a drop-off there is no gas row.
pub(crate) async fn relay_dest_info(
    ctx: &RouteContext,
    kind: RouteKind,
    request: &DestInfoRequest,
) -> RouteResult<TransferDisplayData> {
    let message = &request.message;
    let config = &ctx.config;
    let dest_gas_key = config.chain(&message.to_chain)?.gas_token.clone();

    let dropoff = message.to_native_token_amount.unwrap_or(0);

    let mut native = None;
    if dropoff > 0 && request.receive_tx.is_some() {
        match ctx.client.fetch_swap_event(message).await {
            Ok(Some(raw)) => {
                native = Some((gas_amount(config, &message.to_chain, raw)?, ValueStatus::Final));
            }
            Ok(None) => {
                debug!(route = %kind, message = %message.id(), "Swap event not found yet");
            }
            Err(e) => {
                warn!(route = %kind, message = %message.id(), error = %e, "Could not fetch swap event");
            }
        }
    }
    let native = match native {
        Some(found) => Some(found),
        None if dropoff > 0 => Some((estimate_dropoff(ctx, message).await?, ValueStatus::Estimate)),
        None => None,
    };

    let received = message
        .amount
        .checked_sub(message.relayer_fee.unwrap_or(0))
        .and_then(|rest| rest.checked_sub(dropoff))
        .ok_or_else(|| RouteError::InvalidPayload {
            route: kind,
            reason: "fees exceed the transferred amount".to_string(),
        })?;

    let mut rows = vec![DisplayRow::new(
        "Amount",
        token_text(
            config,
            &canonical_amount(received),
            MAX_DECIMALS,
            &message.token_key,
        ),
    )];
    // absent when no drop-off was requested
    if let Some((native_amount, status)) = native {
        let mut native_row = DisplayRow::new(
            "Native gas token",
            token_text(config, &native_amount, MAX_DECIMALS, &dest_gas_key),
        );
        native_row.status = status;
        rows.push(native_row);
    }
    Ok(rows)
}

// ============================================================================
// Strategy
// ============================================================================

#[async_trait]
impl RouteStrategy for RelayRoute {
    fn kind(&self) -> RouteKind {
        RouteKind::Relay
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
            .map_or(false, |c| c.contracts.relayer.is_some())
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
        self.token_supported(token, dest_token, source_chain).await
    }

    async fn is_supported_dest_token(
        &self,
        token: Option<&TokenConfig>,
        source_token: Option<&TokenConfig>,
        dest_chain: Option<&str>,
    ) -> RouteResult<bool> {
        self.token_supported(token, source_token, dest_chain).await
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
        quote_relayer_fee(&self.ctx, self.kind(), source_chain, dest_chain, token_key).await
    }

    async fn native_token_amount(
        &self,
        dest_chain: &str,
        token_key: &str,
        amount: &BigDecimal,
        wallet: &str,
    ) -> RouteResult<BigDecimal> {
        native_token_amount(&self.ctx, dest_chain, token_key, amount, wallet).await
    }

    async fn max_swap_amount(
        &self,
        dest_chain: &str,
        token_key: &str,
        wallet: &str,
    ) -> RouteResult<BigDecimal> {
        max_swap_amount(&self.ctx, dest_chain, token_key, wallet).await
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
        expect_payload(self.kind(), message, PayloadKind::Automatic, Protocol::TokenBridge)
    }

    async fn get_preview(&self, request: &PreviewRequest) -> RouteResult<TransferDisplayData> {
        relay_preview(&self.ctx.config, request)
    }

    async fn get_transfer_source_info(
        &self,
        message: &UnsignedMessage,
    ) -> RouteResult<TransferDisplayData> {
        relay_source_info(&self.ctx.config, message)
    }

    async fn get_transfer_dest_info(
        &self,
        request: &DestInfoRequest,
    ) -> RouteResult<TransferDisplayData> {
        relay_dest_info(&self.ctx, self.kind(), request).await
    }
}
