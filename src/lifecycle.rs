//! Transfer lifecycle
//!
//! ```text
//! Submitted -> AttestationPending -> AttestationReady -+-> AutomaticRelayPending -> Completed
//!                    |                                 +-> AwaitingManualRedeem  -> Redeemed
//!                    +-> Failed
//! ```
//!
//! [`TransferState::on`] is the pure transition function; terminal states
//! (`Completed`, `Redeemed`, `Failed`) absorb every event. [`TransferTracker`]
//! drives one transfer through the states using a route strategy and is owned
//! by a single caller.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{RouteError, RouteResult};
use crate::routes::RouteStrategy;
use crate::types::{SignedMessage, UnsignedMessage};

/// Where a transfer is
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferState {
    Submitted,
    AttestationPending,
    AttestationReady,
    AutomaticRelayPending,
    Completed,
    AwaitingManualRedeem,
    Redeemed,
    Failed { reason: String },
}

/// What happened to a transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEvent {
    PollStarted,
    AttestationReady,
    AttestationExhausted,
    HandoffToRelayer,
    AwaitRedeem,
    RelayCompleted,
    RedeemSubmitted,
    Failed(String),
}

impl TransferState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferState::Submitted => "submitted",
            TransferState::AttestationPending => "attestation_pending",
            TransferState::AttestationReady => "attestation_ready",
            TransferState::AutomaticRelayPending => "automatic_relay_pending",
            TransferState::Completed => "completed",
            TransferState::AwaitingManualRedeem => "awaiting_manual_redeem",
            TransferState::Redeemed => "redeemed",
            TransferState::Failed { .. } => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferState::Completed | TransferState::Redeemed | TransferState::Failed { .. }
        )
    }

    /// Whether the funds reached the recipient
    pub fn is_delivered(&self) -> bool {
        matches!(self, TransferState::Completed | TransferState::Redeemed)
    }

    /// Next state after `event`. Events that do not apply leave the state as is.
    pub fn on(&self, event: &TransferEvent) -> TransferState {
        use TransferEvent as E;
        use TransferState as S;

        if self.is_terminal() {
            return self.clone();
        }

        match (self, event) {
            (_, E::Failed(reason)) => S::Failed {
                reason: reason.clone(),
            },
            (S::Submitted, E::PollStarted) => S::AttestationPending,
            (S::Submitted | S::AttestationPending, E::AttestationReady) => S::AttestationReady,
            (S::Submitted | S::AttestationPending, E::AttestationExhausted) => S::Failed {
                reason: "attestation not available before timeout".to_string(),
            },
            (S::AttestationReady, E::HandoffToRelayer) => S::AutomaticRelayPending,
            (S::AttestationReady, E::AwaitRedeem) => S::AwaitingManualRedeem,
            (S::AutomaticRelayPending, E::RelayCompleted) => S::Completed,
            // redeemed by someone else
            (S::AwaitingManualRedeem, E::RelayCompleted) => S::Redeemed,
            (S::AwaitingManualRedeem, E::RedeemSubmitted) => S::Redeemed,
            (state, _) => state.clone(),
        }
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferState::Failed { reason } => write!(f, "failed: {}", reason),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

// ============================================================================
// Tracker
// ============================================================================

#[derive(Debug)]
pub struct TransferTracker {
    route: Arc<dyn RouteStrategy>,
    send_tx: String,
    source_chain: String,
    state: TransferState,
    history: Vec<TransferState>,
    message: Option<UnsignedMessage>,
    signed: Option<SignedMessage>,
    redeem_tx: Option<String>,
}

impl TransferTracker {
    /// Track a freshly submitted transaction
    pub fn new(route: Arc<dyn RouteStrategy>, send_tx: &str, source_chain: &str) -> Self {
        Self {
            route,
            send_tx: send_tx.to_string(),
            source_chain: source_chain.to_string(),
            state: TransferState::Submitted,
            history: vec![TransferState::Submitted],
            message: None,
            signed: None,
            redeem_tx: None,
        }
    }

    /// Resume tracking from an already parsed message
    pub fn from_message(route: Arc<dyn RouteStrategy>, message: UnsignedMessage) -> Self {
        let mut tracker = Self::new(route, &message.send_tx, &message.from_chain);
        tracker.message = Some(message);
        tracker
    }

    pub fn state(&self) -> &TransferState {
        &self.state
    }

    /// Every state visited, oldest first
    pub fn history(&self) -> &[TransferState] {
        &self.history
    }

    pub fn message(&self) -> Option<&UnsignedMessage> {
        self.message.as_ref()
    }

    pub fn signed(&self) -> Option<&SignedMessage> {
        self.signed.as_ref()
    }

    pub fn redeem_tx(&self) -> Option<&str> {
        self.redeem_tx.as_deref()
    }

    /// Label for display; relay completion is inferred, not observed directly
    pub fn status_label(&self) -> &'static str {
        match self.state {
            TransferState::AutomaticRelayPending => "likely pending",
            ref other => other.as_str(),
        }
    }

    pub fn apply(&mut self, event: TransferEvent) -> &TransferState {
        let next = self.state.on(&event);
        if next == self.state {
            debug!(tx = %self.send_tx, state = %self.state, event = ?event, "Event ignored");
            return &self.state;
        }

        info!(
            tx = %self.send_tx,
            route = %self.route.kind(),
            from = %self.state,
            to = %next,
            "Transfer state changed"
        );
        self.history.push(next.clone());
        self.state = next;
        &self.state
    }

    /// Parse the source transaction (once)
    pub async fn fetch_message(&mut self) -> RouteResult<UnsignedMessage> {
        if let Some(message) = &self.message {
            return Ok(message.clone());
        }
        let message = self
            .route
            .get_message(&self.send_tx, &self.source_chain)
            .await?;
        self.message = Some(message.clone());
        Ok(message)
    }

    /// Poll for the attestation, then hand off to the relayer or wait for a
    /// manual redeem depending on the message.
    pub async fn wait_for_attestation(&mut self) -> RouteResult<SignedMessage> {
        if let Some(signed) = &self.signed {
            return Ok(signed.clone());
        }
        if self.state.is_terminal() {
            return Err(RouteError::unavailable(format!(
                "transfer {} already ended ({})",
                self.send_tx, self.state
            )));
        }
        let message = self.fetch_message().await?;

        self.apply(TransferEvent::PollStarted);
        match self.route.get_signed_message(&message).await {
            Ok(signed) => {
                self.signed = Some(signed.clone());
                self.apply(TransferEvent::AttestationReady);
                if self.route.is_automatic(&message) {
                    self.apply(TransferEvent::HandoffToRelayer);
                } else {
                    self.apply(TransferEvent::AwaitRedeem);
                }
                Ok(signed)
            }
            Err(e @ RouteError::Timeout { .. }) => {
                self.apply(TransferEvent::AttestationExhausted);
                Err(e)
            }
            Err(e) => {
                self.apply(TransferEvent::Failed(e.to_string()));
                Err(e)
            }
        }
    }

    fn require_signed(&self) -> RouteResult<&SignedMessage> {
        self.signed.as_ref().ok_or_else(|| RouteError::NotFound {
            what: format!("signed message for {}", self.send_tx),
        })
    }

    /// One destination completion check. Lookup errors keep the transfer
    /// pending.
    pub async fn poll_completion(&mut self) -> RouteResult<bool> {
        if self.state.is_terminal() {
            return Ok(self.state.is_delivered());
        }
        let signed = self.require_signed()?.clone();

        match self
            .route
            .is_transfer_completed(&signed.message.to_chain, &signed)
            .await
        {
            Ok(true) => {
                self.apply(TransferEvent::RelayCompleted);
                Ok(true)
            }
            Ok(false) => Ok(false),
            Err(e) => {
                warn!(
                    tx = %self.send_tx,
                    dest_chain = %signed.message.to_chain,
                    error = %e,
                    "Completion lookup failed, transfer stays pending"
                );
                Ok(false)
            }
        }
    }

    /// Poll until the relayer delivers. No upper bound; drop the future to stop.
    pub async fn wait_for_relay(&mut self, interval: Duration) -> RouteResult<()> {
        if self.state != TransferState::AutomaticRelayPending && !self.state.is_delivered() {
            return Err(RouteError::unavailable(format!(
                "transfer {} is not waiting for a relayer ({})",
                self.send_tx, self.state
            )));
        }

        info!(
            tx = %self.send_tx,
            interval_ms = interval.as_millis() as u64,
            "Waiting for relayer"
        );
        while !self.poll_completion().await? {
            tokio::time::sleep(interval).await;
        }
        Ok(())
    }

    /// Redeem a manual transfer on the destination chain
    pub async fn redeem(&mut self, payer: &str) -> RouteResult<String> {
        if self.state != TransferState::AwaitingManualRedeem {
            return Err(RouteError::unavailable(format!(
                "transfer {} is not awaiting a manual redeem ({})",
                self.send_tx, self.state
            )));
        }
        let signed = self.require_signed()?.clone();
        let tx = self
            .route
            .redeem(&signed.message.to_chain, &signed, payer)
            .await?;
        self.redeem_tx = Some(tx.clone());
        self.apply(TransferEvent::RedeemSubmitted);
        Ok(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::{BridgeRoute, RelayRoute};
    use crate::testing::fixtures::{sample_client, sample_context, sample_context_with, sample_message};
    use crate::testing::mocks::MockAttestationSource;
    use crate::types::{PayloadKind, Protocol};

    fn all_events() -> Vec<TransferEvent> {
        vec![
            TransferEvent::PollStarted,
            TransferEvent::AttestationReady,
            TransferEvent::AttestationExhausted,
            TransferEvent::HandoffToRelayer,
            TransferEvent::AwaitRedeem,
            TransferEvent::RelayCompleted,
            TransferEvent::RedeemSubmitted,
            TransferEvent::Failed("boom".to_string()),
        ]
    }

    #[test]
    fn test_terminal_states_absorb_every_event() {
        let terminals = [
            TransferState::Completed,
            TransferState::Redeemed,
            TransferState::Failed {
                reason: "x".to_string(),
            },
        ];
        for state in terminals {
            assert!(state.is_terminal());
            for event in all_events() {
                assert_eq!(state.on(&event), state);
            }
        }
    }

    #[test]
    fn test_manual_path() {
        let state = TransferState::Submitted
            .on(&TransferEvent::PollStarted)
            .on(&TransferEvent::AttestationReady)
            .on(&TransferEvent::AwaitRedeem);
        assert_eq!(state, TransferState::AwaitingManualRedeem);
        assert_eq!(state.on(&TransferEvent::RedeemSubmitted), TransferState::Redeemed);
        // destination shows the transfer done before our own redeem
        assert_eq!(state.on(&TransferEvent::RelayCompleted), TransferState::Redeemed);
    }

    #[test]
    fn test_automatic_path_and_invalid_events() {
        let state = TransferState::AttestationReady.on(&TransferEvent::HandoffToRelayer);
        assert_eq!(state, TransferState::AutomaticRelayPending);
        // a relayed transfer cannot be redeemed manually
        assert_eq!(state.on(&TransferEvent::RedeemSubmitted), state);
        assert_eq!(state.on(&TransferEvent::RelayCompleted), TransferState::Completed);
    }

    #[test]
    fn test_exhausted_attestation_fails() {
        let state = TransferState::AttestationPending.on(&TransferEvent::AttestationExhausted);
        assert!(matches!(state, TransferState::Failed { .. }));
        assert_eq!(state.as_str(), "failed");
    }

    #[tokio::test]
    async fn test_manual_tracker() {
        let message = sample_message(PayloadKind::Manual, Protocol::TokenBridge);
        let client = Arc::new(sample_client().with_message(message));
        let route = Arc::new(BridgeRoute::new(sample_context(client.clone())));
        let mut tracker = TransferTracker::new(route, "0xsendtx", "ethereum");

        let signed = tracker.wait_for_attestation().await.unwrap();
        assert!(!signed.vaa.is_empty());
        assert_eq!(tracker.state(), &TransferState::AwaitingManualRedeem);

        let tx = tracker.redeem("0xpayer").await.unwrap();
        assert_eq!(tracker.redeem_tx(), Some(tx.as_str()));
        assert_eq!(tracker.state(), &TransferState::Redeemed);
        assert_eq!(
            tracker.history(),
            &[
                TransferState::Submitted,
                TransferState::AttestationPending,
                TransferState::AttestationReady,
                TransferState::AwaitingManualRedeem,
                TransferState::Redeemed,
            ]
        );
        assert_eq!(client.redeems().len(), 1);
    }

    #[tokio::test]
    async fn test_relay_tracker_waits_for_completion() {
        let message = sample_message(PayloadKind::Automatic, Protocol::TokenBridge);
        let client = Arc::new(
            sample_client()
                .with_message(message)
                .with_completion_errors(1)
                .completed_after(2),
        );
        let route = Arc::new(RelayRoute::new(sample_context(client.clone())));
        let mut tracker = TransferTracker::new(route, "0xsendtx", "ethereum");

        tracker.wait_for_attestation().await.unwrap();
        assert_eq!(tracker.state(), &TransferState::AutomaticRelayPending);
        assert_eq!(tracker.status_label(), "likely pending");
        assert!(matches!(
            tracker.redeem("0xpayer").await,
            Err(RouteError::Unavailable { .. })
        ));

        tracker.wait_for_relay(Duration::from_millis(1)).await.unwrap();
        assert_eq!(tracker.state(), &TransferState::Completed);
        assert_eq!(tracker.status_label(), "completed");
        assert!(client.completion_checks() >= 3);
        assert!(client.redeems().is_empty());
    }

    #[tokio::test]
    async fn test_attestation_timeout_fails_transfer() {
        let message = sample_message(PayloadKind::Manual, Protocol::TokenBridge);
        let client = Arc::new(sample_client());
        let ctx = sample_context_with(client, MockAttestationSource::never(), 2);
        let route = Arc::new(BridgeRoute::new(ctx));
        let mut tracker = TransferTracker::from_message(route, message);

        let err = tracker.wait_for_attestation().await.unwrap_err();
        assert!(matches!(err, RouteError::Timeout { attempts: 2 }));
        assert!(matches!(tracker.state(), TransferState::Failed { .. }));
        assert!(tracker.poll_completion().await.is_ok());
        assert!(matches!(tracker.state(), TransferState::Failed { .. }));
    }

    #[tokio::test]
    async fn test_failed_transfer_is_not_polled_again() {
        let message = sample_message(PayloadKind::Manual, Protocol::TokenBridge);
        let client = Arc::new(sample_client());
        // the third attempt would succeed
        let source = MockAttestationSource::failing_then_ready(2, vec![0x01]);
        let ctx = sample_context_with(client, source, 2);
        let route = Arc::new(BridgeRoute::new(ctx));
        let mut tracker = TransferTracker::from_message(route, message);

        assert!(tracker.wait_for_attestation().await.is_err());
        assert!(matches!(tracker.state(), TransferState::Failed { .. }));

        let err = tracker.wait_for_attestation().await.unwrap_err();
        assert!(matches!(err, RouteError::Unavailable { .. }));
        assert!(tracker.signed().is_none());
        assert!(matches!(tracker.state(), TransferState::Failed { .. }));
        assert!(matches!(
            tracker.redeem("0xpayer").await,
            Err(RouteError::Unavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_manual_transfer_redeemed_elsewhere() {
        let message = sample_message(PayloadKind::Manual, Protocol::TokenBridge);
        let client = Arc::new(sample_client().with_message(message));
        let route = Arc::new(BridgeRoute::new(sample_context(client.clone())));
        let mut tracker = TransferTracker::new(route, "0xsendtx", "ethereum");

        tracker.wait_for_attestation().await.unwrap();
        assert_eq!(tracker.state(), &TransferState::AwaitingManualRedeem);
        assert!(tracker.poll_completion().await.unwrap());
        assert_eq!(tracker.state(), &TransferState::Redeemed);
        assert!(client.redeems().is_empty());
    }

    #[tokio::test]
    async fn test_wrong_route_fails_on_message_parse() {
        let message = sample_message(PayloadKind::Manual, Protocol::TokenBridge);
        let client = Arc::new(sample_client().with_message(message));
        let route = Arc::new(RelayRoute::new(sample_context(client)));
        let mut tracker = TransferTracker::new(route, "0xsendtx", "ethereum");

        let err = tracker.wait_for_attestation().await.unwrap_err();
        assert!(matches!(err, RouteError::InvalidPayload { .. }));
        assert_eq!(tracker.state(), &TransferState::Submitted);
    }

    #[tokio::test]
    async fn test_poll_completion_requires_attestation() {
        let message = sample_message(PayloadKind::Automatic, Protocol::TokenBridge);
        let client = Arc::new(sample_client());
        let route = Arc::new(RelayRoute::new(sample_context(client)));
        let mut tracker = TransferTracker::from_message(route, message);

        assert!(matches!(
            tracker.poll_completion().await,
            Err(RouteError::NotFound { .. })
        ));
        assert!(matches!(
            tracker.wait_for_relay(Duration::from_millis(1)).await,
            Err(RouteError::Unavailable { .. })
        ));
    }
}
