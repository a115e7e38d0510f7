//! Static network configuration: chains, tokens, enabled routes
//!
//! Loaded once at startup and passed around as `Arc<NetworkConfig>`; never
//! mutated afterwards.
//!
//! # Environment Variable Schema
//!
//! ```text
//! BRIDGE_ROUTES_CONFIG=./network.json   # JSON file with chains/tokens/routes
//! ENABLED_ROUTES=bridge,relay           # optional, overrides "routes"
//! ATTESTATION_RPC_URL=https://...       # optional guardian REST endpoint
//! ATTESTATION_POLL_INTERVAL_MS=5000     # optional
//! ATTESTATION_MAX_ATTEMPTS=120          # optional
//! ATTESTATION_REQUEST_TIMEOUT_MS=10000  # optional
//! ATTESTATION_CACHE_CAPACITY=1024       # optional
//! ```

use eyre::{eyre, Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::error::{RouteError, RouteResult};
use crate::routes::RouteKind;
use crate::types::{ChainId, SendToken, TokenId};

// ============================================================================
// URL Validation
// ============================================================================

/// Validates that a URL uses http/https and has a host component.
pub fn validate_rpc_url(url_str: &str, name: &str) -> Result<()> {
    let parsed =
        url::Url::parse(url_str).map_err(|e| eyre!("{} must be a valid URL: {}", name, e))?;

    let scheme = parsed.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(eyre!(
            "{} must use http:// or https:// scheme, got {}",
            name,
            scheme
        ));
    }

    if parsed.host_str().is_none() {
        return Err(eyre!("{} must have a host component", name));
    }

    if scheme == "http" {
        tracing::warn!(
            "{} uses unencrypted http://, use https:// in production",
            name
        );
    }

    Ok(())
}

// ============================================================================
// Chains
// ============================================================================

/// Chain family; decides address formats and which routes can exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChainContext {
    Ethereum,
    Solana,
    Sui,
    Aptos,
    Cosmos,
}

impl ChainContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainContext::Ethereum => "Ethereum",
            ChainContext::Solana => "Solana",
            ChainContext::Sui => "Sui",
            ChainContext::Aptos => "Aptos",
            ChainContext::Cosmos => "Cosmos",
        }
    }
}

impl fmt::Display for ChainContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Deployed contract addresses; a missing entry means the mechanism does not
/// exist on that chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainContracts {
    #[serde(default)]
    pub core: Option<String>,
    #[serde(default)]
    pub token_bridge: Option<String>,
    #[serde(default)]
    pub relayer: Option<String>,
    #[serde(default)]
    pub cctp_token_messenger: Option<String>,
    #[serde(default)]
    pub cctp_relayer: Option<String>,
    #[serde(default)]
    pub ibc_gateway: Option<String>,
}

/// Configuration for a single chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Chain key (e.g. "ethereum", "osmosis")
    pub key: String,
    pub id: ChainId,
    pub context: ChainContext,
    /// Token key of the chain's gas token
    pub gas_token: String,
    #[serde(default)]
    pub contracts: ChainContracts,
}

impl ChainConfig {
    pub fn is_cosmos(&self) -> bool {
        self.context == ChainContext::Cosmos
    }
}

// ============================================================================
// Tokens
// ============================================================================

/// Per-chain decimal precision with a mandatory fallback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecimalConfig {
    #[serde(flatten)]
    pub per_chain: BTreeMap<String, u8>,
    pub default: u8,
}

impl DecimalConfig {
    pub fn uniform(decimals: u8) -> Self {
        Self {
            per_chain: BTreeMap::new(),
            default: decimals,
        }
    }

    /// Chain key first, then chain context (e.g. "Ethereum"), then default
    pub fn for_chain(&self, chain: &ChainConfig) -> u8 {
        self.per_chain
            .get(&chain.key)
            .or_else(|| self.per_chain.get(chain.context.as_str()))
            .copied()
            .unwrap_or(self.default)
    }
}

/// Canonical description of a token family member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    pub key: String,
    pub symbol: String,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Chain where the token is minted
    pub native_chain: String,
    /// On-chain identity; `None` for gas tokens
    #[serde(default)]
    pub token_id: Option<TokenId>,
    pub decimals: DecimalConfig,
    /// Key of the wrapped counterpart of a gas token (ETH -> WETH)
    #[serde(default)]
    pub wrapped_asset: Option<String>,
    /// Burn-and-mint stablecoin eligible for CCTP routes
    #[serde(default)]
    pub cctp: bool,
}

impl TokenConfig {
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.symbol)
    }

    /// Whether this config entry is the token on its own native chain
    pub fn is_native_to(&self, chain: &str) -> bool {
        self.native_chain == chain
            && self
                .token_id
                .as_ref()
                .map_or(true, |id| id.chain == self.native_chain)
    }
}

// ============================================================================
// Attestation
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationConfig {
    /// Guardian REST endpoint; `None` when the caller supplies its own source
    #[serde(default)]
    pub rpc_url: Option<String>,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Signed messages kept in memory; oldest evicted first
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

impl Default for AttestationConfig {
    fn default() -> Self {
        Self {
            rpc_url: None,
            poll_interval_ms: default_poll_interval_ms(),
            max_attempts: default_max_attempts(),
            request_timeout_ms: default_request_timeout_ms(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

impl AttestationConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn default_poll_interval_ms() -> u64 {
    5_000
}

fn default_max_attempts() -> u32 {
    120 // 10 minutes at the default interval
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_cache_capacity() -> usize {
    1_024
}

fn default_routes() -> Vec<RouteKind> {
    RouteKind::ALL.to_vec()
}

// ============================================================================
// Network configuration
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub chains: BTreeMap<String, ChainConfig>,
    pub tokens: BTreeMap<String, TokenConfig>,
    /// Globally enabled routes
    #[serde(default = "default_routes")]
    pub routes: Vec<RouteKind>,
    #[serde(default)]
    pub attestation: AttestationConfig,
}

impl NetworkConfig {
    /// Load configuration from environment variables.
    /// Loads .env file if present, then reads from environment
    pub fn load() -> Result<Self> {
        if Path::new(".env").exists() {
            dotenvy::from_filename(".env").wrap_err("Failed to load .env file")?;
        }
        let path = env::var("BRIDGE_ROUTES_CONFIG")
            .map_err(|_| eyre!("BRIDGE_ROUTES_CONFIG environment variable is required"))?;
        Self::load_from_file(&path)
    }

    /// Load from a JSON file, then apply environment overrides
    pub fn load_from_file(path: &str) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read network config from {}", path))?;
        let mut config = Self::from_json(&raw)?;
        config.apply_env_overrides()?;
        config.validate()?;

        tracing::info!(
            chains = config.chains.len(),
            tokens = config.tokens.len(),
            routes = ?config.routes,
            "Network configuration loaded"
        );
        Ok(config)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).wrap_err("Invalid network config JSON")
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(routes) = env::var("ENABLED_ROUTES") {
            self.routes = routes
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| s.parse::<RouteKind>())
                .collect::<Result<Vec<_>>>()
                .wrap_err("ENABLED_ROUTES must be a comma-separated list of route names")?;
        }
        if let Ok(url) = env::var("ATTESTATION_RPC_URL") {
            self.attestation.rpc_url = Some(url);
        }
        if let Some(ms) = env::var("ATTESTATION_POLL_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.attestation.poll_interval_ms = ms;
        }
        if let Some(attempts) = env::var("ATTESTATION_MAX_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.attestation.max_attempts = attempts;
        }
        if let Some(ms) = env::var("ATTESTATION_REQUEST_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.attestation.request_timeout_ms = ms;
        }
        if let Some(capacity) = env::var("ATTESTATION_CACHE_CAPACITY")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.attestation.cache_capacity = capacity;
        }
        Ok(())
    }

    /// Validate cross references between chains and tokens
    pub fn validate(&self) -> Result<()> {
        for (key, chain) in &self.chains {
            if &chain.key != key {
                return Err(eyre!("Chain entry {} has mismatched key {}", key, chain.key));
            }
            if !self.tokens.contains_key(&chain.gas_token) {
                return Err(eyre!(
                    "Gas token {} of chain {} is not configured",
                    chain.gas_token,
                    key
                ));
            }
        }

        for (key, token) in &self.tokens {
            if &token.key != key {
                return Err(eyre!("Token entry {} has mismatched key {}", key, token.key));
            }
            if !self.chains.contains_key(&token.native_chain) {
                return Err(eyre!(
                    "Native chain {} of token {} is not configured",
                    token.native_chain,
                    key
                ));
            }
            if let Some(id) = &token.token_id {
                if !self.chains.contains_key(&id.chain) {
                    return Err(eyre!("Token {} lives on unknown chain {}", key, id.chain));
                }
            }
            if let Some(wrapped) = &token.wrapped_asset {
                if !self.tokens.contains_key(wrapped) {
                    return Err(eyre!(
                        "Wrapped asset {} of token {} is not configured",
                        wrapped,
                        key
                    ));
                }
            }
        }

        if self.attestation.max_attempts == 0 {
            return Err(eyre!("Attestation max_attempts must be at least 1"));
        }
        if self.attestation.cache_capacity == 0 {
            return Err(eyre!("Attestation cache_capacity must be at least 1"));
        }
        if let Some(url) = &self.attestation.rpc_url {
            validate_rpc_url(url, "ATTESTATION_RPC_URL")?;
        }

        Ok(())
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    pub fn is_route_enabled(&self, route: RouteKind) -> bool {
        self.routes.contains(&route)
    }

    pub fn chain(&self, name: &str) -> RouteResult<&ChainConfig> {
        self.chains
            .get(name)
            .ok_or_else(|| RouteError::unavailable(format!("unknown chain {}", name)))
    }

    pub fn chain_by_id(&self, id: ChainId) -> Option<&ChainConfig> {
        self.chains.values().find(|c| c.id == id)
    }

    pub fn to_chain_id(&self, name: &str) -> RouteResult<ChainId> {
        self.chain(name).map(|c| c.id)
    }

    pub fn to_chain_name(&self, id: ChainId) -> RouteResult<&str> {
        self.chain_by_id(id)
            .map(|c| c.key.as_str())
            .ok_or_else(|| RouteError::unavailable(format!("unknown chain id {}", id)))
    }

    pub fn token(&self, key: &str) -> RouteResult<&TokenConfig> {
        self.tokens
            .get(key)
            .ok_or_else(|| RouteError::unavailable(format!("unknown token {}", key)))
    }

    pub fn token_for_id(&self, id: &TokenId) -> Option<&TokenConfig> {
        self.tokens
            .values()
            .find(|t| t.token_id.as_ref() == Some(id))
    }

    /// Gas token config of a chain
    pub fn gas_token(&self, chain: &str) -> RouteResult<&TokenConfig> {
        let chain = self.chain(chain)?;
        self.token(&chain.gas_token)
    }

    pub fn display_name(&self, token_key: &str) -> String {
        self.tokens
            .get(token_key)
            .map(|t| t.display_name().to_string())
            .unwrap_or_else(|| token_key.to_string())
    }

    /// On-chain identity that the bridge transfers for this token: its own id,
    /// or the id of its wrapped counterpart for gas tokens.
    pub fn wrapped_token_id(&self, token: &TokenConfig) -> Option<TokenId> {
        if let Some(id) = &token.token_id {
            return Some(id.clone());
        }
        token
            .wrapped_asset
            .as_ref()
            .and_then(|key| self.tokens.get(key))
            .and_then(|wrapped| wrapped.token_id.clone())
    }

    /// Precision of a send token on a chain
    pub fn token_decimals(&self, chain: &str, token: &SendToken) -> RouteResult<u8> {
        let chain_config = self.chain(chain)?;
        let token_config = match token {
            SendToken::Native => self.token(&chain_config.gas_token)?,
            SendToken::Token(id) => self.token_for_id(id).ok_or_else(|| {
                RouteError::unavailable(format!("no token config for {}", id))
            })?,
        };
        Ok(token_config.decimals.for_chain(chain_config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::sample_config;

    #[test]
    fn test_validate_rpc_url() {
        assert!(validate_rpc_url("https://api.example.com", "TEST").is_ok());
        assert!(validate_rpc_url("http://localhost:7071", "TEST").is_ok());
        assert!(validate_rpc_url("ftp://example.com", "TEST").is_err());
        assert!(validate_rpc_url("not a url", "TEST").is_err());
    }

    #[test]
    fn test_sample_config_is_valid() {
        let config = sample_config();
        config.validate().unwrap();
        assert!(config.is_route_enabled(RouteKind::Relay));
    }

    #[test]
    fn test_decimal_fallback() {
        let config = sample_config();
        let eth = config.token("ETH").unwrap();
        assert_eq!(eth.decimals.for_chain(config.chain("ethereum").unwrap()), 18);
        // Solana has no entry, falls back to default
        assert_eq!(eth.decimals.for_chain(config.chain("solana").unwrap()), 8);
        // Context match: polygon is an Ethereum-context chain
        assert_eq!(eth.decimals.for_chain(config.chain("polygon").unwrap()), 18);
    }

    #[test]
    fn test_token_decimals_by_send_token() {
        let config = sample_config();
        assert_eq!(
            config.token_decimals("ethereum", &SendToken::Native).unwrap(),
            18
        );
        let usdc = config.token("USDCeth").unwrap().token_id.clone().unwrap();
        assert_eq!(
            config
                .token_decimals("ethereum", &SendToken::Token(usdc))
                .unwrap(),
            6
        );
        assert!(config
            .token_decimals("ethereum", &SendToken::Token(TokenId::new("ethereum", "0x00")))
            .is_err());
    }

    #[test]
    fn test_wrapped_token_id() {
        let config = sample_config();
        let eth = config.token("ETH").unwrap();
        let weth = config.token("WETH").unwrap();
        assert_eq!(config.wrapped_token_id(eth), weth.token_id.clone());
        assert_eq!(config.wrapped_token_id(weth), weth.token_id.clone());
    }

    #[test]
    fn test_chain_id_lookups() {
        let config = sample_config();
        let id = config.to_chain_id("polygon").unwrap();
        assert_eq!(config.to_chain_name(id).unwrap(), "polygon");
        assert!(config.to_chain_id("nowhere").is_err());
        assert!(config.to_chain_name(ChainId(9999)).is_err());
    }

    #[test]
    fn test_validate_rejects_dangling_references() {
        let mut config = sample_config();
        config.chains.get_mut("ethereum").unwrap().gas_token = "NOPE".to_string();
        assert!(config.validate().is_err());

        let mut config = sample_config();
        config.tokens.get_mut("ETH").unwrap().wrapped_asset = Some("NOPE".to_string());
        assert!(config.validate().is_err());

        let mut config = sample_config();
        config.attestation.cache_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_round_trip_with_defaults() {
        let raw = r#"{
            "chains": {
                "ethereum": {
                    "key": "ethereum",
                    "id": 2,
                    "context": "Ethereum",
                    "gas_token": "ETH",
                    "contracts": { "token_bridge": "0x01" }
                }
            },
            "tokens": {
                "ETH": {
                    "key": "ETH",
                    "symbol": "ETH",
                    "native_chain": "ethereum",
                    "decimals": { "Ethereum": 18, "default": 8 }
                }
            }
        }"#;
        let config = NetworkConfig::from_json(raw).unwrap();
        config.validate().unwrap();
        assert_eq!(config.routes, RouteKind::ALL.to_vec());
        assert_eq!(config.attestation.max_attempts, 120);
        assert_eq!(config.attestation.cache_capacity, 1_024);
        assert_eq!(
            config.tokens["ETH"].decimals.per_chain.get("Ethereum"),
            Some(&18)
        );
        assert!(config.chains["ethereum"].contracts.relayer.is_none());
    }
}
