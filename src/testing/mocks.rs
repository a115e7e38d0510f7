//! In-memory collaborators
//!
//! Configured with builder methods before being shared; call records are
//! read back through accessor methods.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use eyre::{eyre, Result};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::attestation::AttestationSource;
use crate::chain::{ChainClient, SendRequest};
use crate::config::TokenConfig;
use crate::display::{DisplayRow, TransferDisplayData};
use crate::error::{RouteError, RouteResult};
use crate::routes::{DestInfoRequest, PreviewRequest, RouteContext, RouteKind, RouteStrategy};
use crate::types::{MessageId, RouteRequest, TokenId, TransferRequest, UnsignedMessage};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// Chain client
// ============================================================================

#[derive(Debug, Default)]
pub struct MockChainClient {
    native_balances: HashMap<String, u128>,
    token_balances: HashMap<TokenId, u128>,
    failing_tokens: HashSet<TokenId>,
    accepted_tokens: HashSet<TokenId>,
    relayer_fees: HashMap<TokenId, u128>,
    send_gas: u128,
    claim_gas: u128,
    /// raw native = raw token * mul / div
    swap_rate: (u128, u128),
    max_swap: u128,
    swap_event: Option<u128>,
    swap_event_fails: bool,
    message: Option<UnsignedMessage>,
    completion_errors: u32,
    completed_after: u32,
    completion_checks: AtomicU32,
    swap_event_lookups: AtomicU32,
    tx_counter: AtomicU64,
    sends: Mutex<Vec<SendRequest>>,
    redeems: Mutex<Vec<(String, RouteKind, String)>>,
}

impl MockChainClient {
    pub fn new() -> Self {
        Self {
            swap_rate: (1, 1),
            ..Default::default()
        }
    }

    pub fn with_native_balance(mut self, chain: &str, amount: u128) -> Self {
        self.native_balances.insert(chain.to_string(), amount);
        self
    }

    pub fn with_token_balance(mut self, token: &TokenId, amount: u128) -> Self {
        self.token_balances.insert(token.clone(), amount);
        self
    }

    /// Every token-specific call for `token` errors
    pub fn with_failing_token(mut self, token: &TokenId) -> Self {
        self.failing_tokens.insert(token.clone());
        self
    }

    pub fn with_accepted_token(mut self, token: &TokenId) -> Self {
        self.accepted_tokens.insert(token.clone());
        self
    }

    pub fn with_relayer_fee(mut self, token: &TokenId, fee: u128) -> Self {
        self.relayer_fees.insert(token.clone(), fee);
        self
    }

    pub fn without_relayer_fee(mut self, token: &TokenId) -> Self {
        self.relayer_fees.remove(token);
        self
    }

    pub fn with_send_gas(mut self, gas: u128) -> Self {
        self.send_gas = gas;
        self
    }

    pub fn with_claim_gas(mut self, gas: u128) -> Self {
        self.claim_gas = gas;
        self
    }

    pub fn with_swap_rate(mut self, mul: u128, div: u128) -> Self {
        self.swap_rate = (mul, div.max(1));
        self
    }

    pub fn with_max_swap(mut self, amount: u128) -> Self {
        self.max_swap = amount;
        self
    }

    pub fn with_swap_event(mut self, amount: Option<u128>) -> Self {
        self.swap_event = amount;
        self
    }

    pub fn with_failing_swap_event(mut self) -> Self {
        self.swap_event_fails = true;
        self
    }

    /// Message returned by `get_message` for any transaction
    pub fn with_message(mut self, message: UnsignedMessage) -> Self {
        self.message = Some(message);
        self
    }

    /// The first `count` completion checks error
    pub fn with_completion_errors(mut self, count: u32) -> Self {
        self.completion_errors = count;
        self
    }

    /// Completion checks answer `false` this many times before `true`
    pub fn completed_after(mut self, checks: u32) -> Self {
        self.completed_after = checks;
        self
    }

    pub fn sends(&self) -> Vec<SendRequest> {
        lock(&self.sends).clone()
    }

    /// (chain, route, payer) of every redeem
    pub fn redeems(&self) -> Vec<(String, RouteKind, String)> {
        lock(&self.redeems).clone()
    }

    pub fn completion_checks(&self) -> u32 {
        self.completion_checks.load(Ordering::SeqCst)
    }

    pub fn swap_event_lookups(&self) -> u32 {
        self.swap_event_lookups.load(Ordering::SeqCst)
    }

    fn next_tx(&self) -> String {
        let n = self.tx_counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("0x{:064x}", n)
    }

    fn check_token(&self, token: &TokenId) -> Result<()> {
        if self.failing_tokens.contains(token) {
            return Err(eyre!("RPC error for token {}", token));
        }
        Ok(())
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    async fn native_balance(&self, chain: &str, _wallet: &str) -> Result<u128> {
        Ok(self.native_balances.get(chain).copied().unwrap_or(0))
    }

    async fn token_balance(
        &self,
        _chain: &str,
        token: &TokenId,
        _wallet: &str,
    ) -> Result<Option<u128>> {
        self.check_token(token)?;
        Ok(self.token_balances.get(token).copied())
    }

    async fn estimate_send_gas(&self, _request: &SendRequest) -> Result<u128> {
        Ok(self.send_gas)
    }

    async fn estimate_claim_gas(&self, _chain: &str, _route: RouteKind, _vaa: &[u8]) -> Result<u128> {
        Ok(self.claim_gas)
    }

    async fn send(&self, request: &SendRequest) -> Result<String> {
        lock(&self.sends).push(request.clone());
        Ok(self.next_tx())
    }

    async fn redeem(
        &self,
        chain: &str,
        route: RouteKind,
        _vaa: &[u8],
        payer: &str,
    ) -> Result<String> {
        lock(&self.redeems).push((chain.to_string(), route, payer.to_string()));
        Ok(self.next_tx())
    }

    async fn get_message(&self, tx: &str, _chain: &str) -> Result<UnsignedMessage> {
        self.message
            .clone()
            .ok_or_else(|| eyre!("transaction {} not found", tx))
    }

    async fn is_accepted_token(&self, token: &TokenId) -> Result<bool> {
        self.check_token(token)?;
        Ok(self.accepted_tokens.contains(token))
    }

    async fn relayer_fee(
        &self,
        _source_chain: &str,
        _dest_chain: &str,
        token: &TokenId,
        _route: RouteKind,
    ) -> Result<u128> {
        self.check_token(token)?;
        self.relayer_fees
            .get(token)
            .copied()
            .ok_or_else(|| eyre!("no relayer fee quote for {}", token))
    }

    async fn native_token_amount(
        &self,
        _dest_chain: &str,
        token: &TokenId,
        amount: u128,
        _wallet: &str,
    ) -> Result<u128> {
        self.check_token(token)?;
        let (mul, div) = self.swap_rate;
        amount
            .checked_mul(mul)
            .map(|v| v / div.max(1))
            .ok_or_else(|| eyre!("swap amount overflow"))
    }

    async fn max_swap_amount(&self, _dest_chain: &str, token: &TokenId, _wallet: &str) -> Result<u128> {
        self.check_token(token)?;
        Ok(self.max_swap)
    }

    async fn fetch_swap_event(&self, _message: &UnsignedMessage) -> Result<Option<u128>> {
        self.swap_event_lookups.fetch_add(1, Ordering::SeqCst);
        if self.swap_event_fails {
            return Err(eyre!("event query failed"));
        }
        Ok(self.swap_event)
    }

    async fn is_transfer_completed(&self, dest_chain: &str, _vaa: &[u8]) -> Result<bool> {
        let check = self.completion_checks.fetch_add(1, Ordering::SeqCst) + 1;
        if check <= self.completion_errors {
            return Err(eyre!("RPC error querying {}", dest_chain));
        }
        Ok(check - self.completion_errors > self.completed_after)
    }
}

// ============================================================================
// Attestation source
// ============================================================================

#[derive(Debug)]
pub struct MockAttestationSource {
    /// Calls that return an error first
    failures: u32,
    /// Calls that return "not signed" after the failures
    pending: u32,
    vaa: Option<Vec<u8>>,
    calls: AtomicU32,
}

impl MockAttestationSource {
    /// Pending `pending` times, then ready
    pub fn ready_after(pending: u32, vaa: Vec<u8>) -> Self {
        Self {
            failures: 0,
            pending,
            vaa: Some(vaa),
            calls: AtomicU32::new(0),
        }
    }

    /// Errors `failures` times, then ready
    pub fn failing_then_ready(failures: u32, vaa: Vec<u8>) -> Self {
        Self {
            failures,
            pending: 0,
            vaa: Some(vaa),
            calls: AtomicU32::new(0),
        }
    }

    /// Never signed
    pub fn never() -> Self {
        Self {
            failures: 0,
            pending: 0,
            vaa: None,
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AttestationSource for MockAttestationSource {
    async fn fetch_signed(&self, id: &MessageId) -> Result<Option<Vec<u8>>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.failures {
            return Err(eyre!("guardian RPC unavailable for {}", id));
        }
        if call <= self.failures + self.pending {
            return Ok(None);
        }
        Ok(self.vaa.clone())
    }
}

// ============================================================================
// Route
// ============================================================================

/// Route with fixed answers, for dispatcher tests
#[derive(Debug)]
pub struct MockRoute {
    kind: RouteKind,
    ctx: RouteContext,
    available: bool,
    supported: HashSet<String>,
}

impl MockRoute {
    pub fn new(kind: RouteKind, ctx: RouteContext) -> Self {
        Self {
            kind,
            ctx,
            available: false,
            supported: HashSet::new(),
        }
    }

    pub fn available(mut self, available: bool) -> Self {
        self.available = available;
        self
    }

    /// Token keys supported on both sides
    pub fn supporting(mut self, keys: &[&str]) -> Self {
        self.supported = keys.iter().map(|k| k.to_string()).collect();
        self
    }

    fn supports(&self, token: Option<&TokenConfig>) -> bool {
        token.map_or(false, |t| self.supported.contains(&t.key))
    }
}

#[async_trait]
impl RouteStrategy for MockRoute {
    fn kind(&self) -> RouteKind {
        self.kind
    }

    fn context(&self) -> &RouteContext {
        &self.ctx
    }

    fn is_supported_chain(&self, _chain: &str) -> bool {
        true
    }

    async fn is_route_available(&self, _request: &RouteRequest) -> bool {
        self.available
    }

    async fn is_supported_source_token(
        &self,
        token: Option<&TokenConfig>,
        _dest_token: Option<&TokenConfig>,
        _source_chain: Option<&str>,
    ) -> RouteResult<bool> {
        Ok(self.supports(token))
    }

    async fn is_supported_dest_token(
        &self,
        token: Option<&TokenConfig>,
        _source_token: Option<&TokenConfig>,
        _dest_chain: Option<&str>,
    ) -> RouteResult<bool> {
        Ok(self.supports(token))
    }

    async fn estimate_send_gas(&self, _request: &TransferRequest) -> RouteResult<BigDecimal> {
        Ok(BigDecimal::from(0))
    }

    async fn send(&self, _request: &TransferRequest) -> RouteResult<String> {
        Err(RouteError::unsupported("send", self.kind))
    }

    async fn get_message(&self, tx: &str, _chain: &str) -> RouteResult<UnsignedMessage> {
        Err(RouteError::NotFound {
            what: format!("message for {}", tx),
        })
    }

    async fn get_preview(&self, _request: &PreviewRequest) -> RouteResult<TransferDisplayData> {
        Ok(vec![DisplayRow::new("Route", self.kind.as_str())])
    }

    async fn get_transfer_source_info(
        &self,
        _message: &UnsignedMessage,
    ) -> RouteResult<TransferDisplayData> {
        Ok(Vec::new())
    }

    async fn get_transfer_dest_info(
        &self,
        _request: &DestInfoRequest,
    ) -> RouteResult<TransferDisplayData> {
        Ok(Vec::new())
    }
}
