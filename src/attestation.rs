//! Attestation fetching
//!
//! A sent message becomes redeemable once the guardian network has signed it.
//! [`AttestationFetcher`] polls an [`AttestationSource`] on a fixed interval
//! with a bounded attempt count. Attested bytes never change, so ready bytes
//! are cached until capacity forces out the oldest entry.
//!
//! Polling runs inside the caller's future; dropping that future stops it.

use async_trait::async_trait;
use base64::Engine;
use eyre::{eyre, Result, WrapErr};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::{AttestationConfig, NetworkConfig};
use crate::error::{RouteError, RouteResult};
use crate::types::MessageId;

// ============================================================================
// Sources
// ============================================================================

/// Where signed messages come from
#[async_trait]
pub trait AttestationSource: Send + Sync + Debug {
    /// Signed bytes for `id`, or `None` if not signed yet
    async fn fetch_signed(&self, id: &MessageId) -> Result<Option<Vec<u8>>>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignedVaaResponse {
    vaa_bytes: String,
}

/// Guardian REST endpoint: `GET {base}/v1/signed_vaa/{chain_id}/{emitter}/{sequence}`
#[derive(Debug, Clone)]
pub struct HttpAttestationSource {
    client: reqwest::Client,
    base_url: String,
    config: Arc<NetworkConfig>,
}

impl HttpAttestationSource {
    pub fn new(base_url: &str, config: Arc<NetworkConfig>) -> Result<Self> {
        crate::config::validate_rpc_url(base_url, "attestation url")?;
        let client = reqwest::Client::builder()
            .timeout(config.attestation.request_timeout())
            .build()
            .wrap_err("Failed to build attestation HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            config,
        })
    }

    /// Build from `attestation.rpc_url`
    pub fn from_config(config: Arc<NetworkConfig>) -> Result<Self> {
        let url = config
            .attestation
            .rpc_url
            .clone()
            .ok_or_else(|| eyre!("attestation.rpc_url is not configured"))?;
        Self::new(&url, config)
    }

    fn url_for(&self, id: &MessageId) -> Result<String> {
        let chain_id = self
            .config
            .to_chain_id(&id.chain)
            .map_err(|e| eyre!("{}", e))?;
        Ok(format!(
            "{}/v1/signed_vaa/{}/{}/{}",
            self.base_url, chain_id, id.emitter, id.sequence
        ))
    }
}

#[async_trait]
impl AttestationSource for HttpAttestationSource {
    async fn fetch_signed(&self, id: &MessageId) -> Result<Option<Vec<u8>>> {
        let url = self.url_for(id)?;
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .wrap_err_with(|| format!("Attestation request failed for {}", id))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(eyre!(
                "Attestation endpoint returned {} for {}",
                response.status(),
                id
            ));
        }

        let body: SignedVaaResponse = response
            .json()
            .await
            .wrap_err("Invalid attestation response body")?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(body.vaa_bytes.as_bytes())
            .wrap_err("Attestation bytes are not valid base64")?;
        Ok(Some(bytes))
    }
}

// ============================================================================
// Fetcher
// ============================================================================

/// Polling parameters
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Delay between attempts
    pub interval: Duration,
    /// Attempts before giving up (at least 1)
    pub max_attempts: u32,
    /// Upper bound for a single source request
    pub request_timeout: Duration,
    /// Signed messages kept in the cache (at least 1)
    pub cache_capacity: usize,
}

impl Default for PollConfig {
    fn default() -> Self {
        AttestationConfig::default().into()
    }
}

impl From<AttestationConfig> for PollConfig {
    fn from(config: AttestationConfig) -> Self {
        Self {
            interval: config.poll_interval(),
            max_attempts: config.max_attempts.max(1),
            request_timeout: config.request_timeout(),
            cache_capacity: config.cache_capacity.max(1),
        }
    }
}

/// Outcome of polling for an attestation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttestationPoll {
    Ready(Vec<u8>),
    /// Not signed yet (single attempt)
    Pending,
    /// Attempts exhausted (bounded poll)
    TimedOut { attempts: u32 },
}

impl AttestationPoll {
    pub fn is_ready(&self) -> bool {
        matches!(self, AttestationPoll::Ready(_))
    }
}

/// Signed bytes by message, evicting the oldest insert when full
#[derive(Debug)]
struct AttestationCache {
    /// Message -> (bytes, insertion order)
    map: HashMap<MessageId, (Vec<u8>, u64)>,
    max_size: usize,
    inserted: u64,
}

impl AttestationCache {
    fn new(max_size: usize) -> Self {
        Self {
            map: HashMap::new(),
            max_size: max_size.max(1),
            inserted: 0,
        }
    }

    fn get(&self, id: &MessageId) -> Option<Vec<u8>> {
        self.map.get(id).map(|(bytes, _)| bytes.clone())
    }

    fn insert(&mut self, id: MessageId, bytes: Vec<u8>) {
        if !self.map.contains_key(&id) {
            while self.map.len() >= self.max_size {
                let oldest = self
                    .map
                    .iter()
                    .min_by_key(|(_, (_, order))| *order)
                    .map(|(key, _)| key.clone());
                match oldest {
                    Some(key) => {
                        self.map.remove(&key);
                    }
                    None => break,
                }
            }
        }
        self.inserted += 1;
        self.map.insert(id, (bytes, self.inserted));
    }

    fn len(&self) -> usize {
        self.map.len()
    }
}

#[derive(Debug)]
pub struct AttestationFetcher {
    source: Arc<dyn AttestationSource>,
    config: PollConfig,
    cache: RwLock<AttestationCache>,
}

impl AttestationFetcher {
    pub fn new(source: Arc<dyn AttestationSource>, config: PollConfig) -> Self {
        Self {
            source,
            cache: RwLock::new(AttestationCache::new(config.cache_capacity)),
            config,
        }
    }

    pub fn poll_config(&self) -> &PollConfig {
        &self.config
    }

    pub async fn cached(&self, id: &MessageId) -> Option<Vec<u8>> {
        self.cache.read().await.get(id)
    }

    /// Number of cached signed messages
    pub async fn cached_len(&self) -> usize {
        self.cache.read().await.len()
    }

    /// Single attempt. Source errors and request timeouts count as pending.
    pub async fn poll_once(&self, id: &MessageId) -> AttestationPoll {
        if let Some(bytes) = self.cached(id).await {
            return AttestationPoll::Ready(bytes);
        }

        let fetched =
            tokio::time::timeout(self.config.request_timeout, self.source.fetch_signed(id)).await;

        match fetched {
            Ok(Ok(Some(bytes))) => {
                info!(message = %id, bytes = bytes.len(), "Attestation ready");
                self.cache.write().await.insert(id.clone(), bytes.clone());
                AttestationPoll::Ready(bytes)
            }
            Ok(Ok(None)) => {
                debug!(message = %id, "Attestation not signed yet");
                AttestationPoll::Pending
            }
            Ok(Err(e)) => {
                warn!(message = %id, error = %e, "Attestation lookup failed");
                AttestationPoll::Pending
            }
            Err(_) => {
                warn!(
                    message = %id,
                    timeout_ms = self.config.request_timeout.as_millis() as u64,
                    "Attestation request timed out"
                );
                AttestationPoll::Pending
            }
        }
    }

    /// Poll until ready or `max_attempts` is exhausted
    pub async fn poll(&self, id: &MessageId) -> AttestationPoll {
        let max_attempts = self.config.max_attempts.max(1);
        for attempt in 1..=max_attempts {
            if let AttestationPoll::Ready(bytes) = self.poll_once(id).await {
                return AttestationPoll::Ready(bytes);
            }
            if attempt < max_attempts {
                tokio::time::sleep(self.config.interval).await;
            }
        }

        warn!(message = %id, attempts = max_attempts, "Attestation polling exhausted");
        AttestationPoll::TimedOut {
            attempts: max_attempts,
        }
    }

    /// Single attempt; `NotFound` when not signed yet
    pub async fn fetch_once(&self, id: &MessageId) -> RouteResult<Vec<u8>> {
        match self.poll_once(id).await {
            AttestationPoll::Ready(bytes) => Ok(bytes),
            _ => Err(RouteError::NotFound {
                what: format!("attestation for {}", id),
            }),
        }
    }

    /// Bounded poll; `Timeout` when attempts run out
    pub async fn fetch(&self, id: &MessageId) -> RouteResult<Vec<u8>> {
        match self.poll(id).await {
            AttestationPoll::Ready(bytes) => Ok(bytes),
            AttestationPoll::TimedOut { attempts } => Err(RouteError::Timeout { attempts }),
            AttestationPoll::Pending => Err(RouteError::Timeout {
                attempts: self.config.max_attempts,
            }),
        }
    }
}
