//! Relay fee arithmetic
//!
//! All amounts are human units of the send token. The relayer takes its fee
//! and the gas drop-off out of the sent amount:
//!
//! ```text
//! receive = send - to_native - relayer_fee
//! send    = receive + to_native
//! min     = round6((relayer_fee + to_native) * 1.05)
//! ```

use bigdecimal::{BigDecimal, Zero};

use crate::amount::round_to;
use crate::error::{RouteError, RouteResult};
use crate::types::RouteOptions;

/// Minimum must clear the fees by this margin or the relay reverts
pub const MIN_SEND_MARGIN_PERCENT: u32 = 105;

/// Fractional digits of the minimum send amount
pub const MIN_SEND_PLACES: u8 = 6;

/// Amount the recipient gets. May be negative; callers that need a valid
/// amount go through the dispatcher's checked variant.
pub fn receive_amount(send_amount: &BigDecimal, options: &RouteOptions) -> BigDecimal {
    let fee = options.relayer_fee().cloned().unwrap_or_else(BigDecimal::zero);
    send_amount - options.to_native_token() - fee
}

/// Amount to send so the recipient gets `receive_amount` plus the drop-off
pub fn send_amount(receive_amount: &BigDecimal, options: &RouteOptions) -> BigDecimal {
    receive_amount + options.to_native_token()
}

pub fn min_send_amount(relayer_fee: &BigDecimal, to_native_token: &BigDecimal) -> BigDecimal {
    let fees = relayer_fee + to_native_token;
    let padded = fees * BigDecimal::new(MIN_SEND_MARGIN_PERCENT.into(), 2);
    round_to(&padded, MIN_SEND_PLACES)
}

/// [`min_send_amount`] from route options; a missing relayer fee is an error
pub fn min_send_amount_for(options: &RouteOptions) -> RouteResult<BigDecimal> {
    let fee = options
        .relayer_fee()
        .ok_or_else(|| RouteError::arithmetic("relayer fee is required for the minimum send amount"))?;
    Ok(min_send_amount(fee, &options.to_native_token()))
}
