//! Common types for cross-chain transfers
//!
//! Token and chain identities, per-route options, and the parsed/attested
//! message records that flow from `send` through redemption.

use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

// ============================================================================
// Chain ID (2 bytes)
// ============================================================================

/// Numeric bridge chain ID as carried in attested messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChainId(pub u16);

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Token identity
// ============================================================================

/// A token on one specific chain
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct TokenId {
    /// Chain key (e.g. "ethereum", "polygon")
    pub chain: String,
    /// On-chain address, mint or denom
    pub address: String,
}

impl TokenId {
    pub fn new(chain: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            chain: chain.into(),
            address: address.into(),
        }
    }
}

/// Addresses compare case-insensitively; EVM checksummed and lowercase forms
/// refer to the same token.
impl PartialEq for TokenId {
    fn eq(&self, other: &Self) -> bool {
        self.chain == other.chain && self.address.eq_ignore_ascii_case(&other.address)
    }
}

impl Hash for TokenId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.chain.hash(state);
        self.address.to_ascii_lowercase().hash(state);
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chain, self.address)
    }
}

/// The asset handed to `send`: the chain's gas token or a token contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SendToken {
    Native,
    Token(TokenId),
}

impl fmt::Display for SendToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendToken::Native => write!(f, "native"),
            SendToken::Token(id) => write!(f, "{}", id),
        }
    }
}

// ============================================================================
// Message payloads
// ============================================================================

/// Payload kind fixed when a source transaction is parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PayloadKind {
    /// Plain transfer; the recipient redeems on the destination chain
    Manual,
    /// Transfer with relay instructions; an off-chain relayer redeems
    Automatic,
}

impl PayloadKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadKind::Manual => "manual",
            PayloadKind::Automatic => "automatic",
        }
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Messaging protocol that emitted the message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    TokenBridge,
    Cctp,
    Gateway,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::TokenBridge => "token_bridge",
            Protocol::Cctp => "cctp",
            Protocol::Gateway => "gateway",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Key identifying one attested message on the attestation network
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId {
    pub chain: String,
    pub emitter: String,
    pub sequence: u64,
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.chain, self.emitter, self.sequence)
    }
}

/// A just-submitted source transaction, parsed
///
/// `amount`, `relayer_fee` and `to_native_token_amount` are in canonical
/// precision ([`crate::amount::MAX_DECIMALS`]); `token_decimals` is the
/// token's precision on the source chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedMessage {
    pub send_tx: String,
    pub sender: String,
    pub recipient: String,
    pub amount: u128,
    pub token_id: TokenId,
    pub token_key: String,
    pub token_decimals: u8,
    pub from_chain: String,
    pub to_chain: String,
    pub emitter_address: String,
    pub sequence: u64,
    /// Gas paid on the source chain, raw units of the source gas token
    pub gas_fee: Option<u128>,
    pub payload_kind: PayloadKind,
    pub protocol: Protocol,
    pub relayer_fee: Option<u128>,
    pub to_native_token_amount: Option<u128>,
}

impl UnsignedMessage {
    pub fn id(&self) -> MessageId {
        MessageId {
            chain: self.from_chain.clone(),
            emitter: self.emitter_address.clone(),
            sequence: self.sequence,
        }
    }
}

/// An [`UnsignedMessage`] plus the attested bytes. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedMessage {
    pub message: UnsignedMessage,
    pub vaa: Vec<u8>,
}

impl SignedMessage {
    pub fn new(message: UnsignedMessage, vaa: Vec<u8>) -> Self {
        Self { message, vaa }
    }

    /// Attested bytes as 0x-prefixed hex
    pub fn vaa_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.vaa))
    }
}

// ============================================================================
// Route options and requests
// ============================================================================

/// Parameters of an automatic relay transfer, in human units of the send token
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RelayOptions {
    /// Relayer fee override; `None` until a quote is available
    pub relayer_fee: Option<BigDecimal>,
    /// Amount of the send token to swap into destination gas
    pub to_native_token: Option<BigDecimal>,
    /// Destination gas the recipient receives for `to_native_token`
    pub receive_native_amount: BigDecimal,
}

/// Route-specific parameters for one transfer
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum RouteOptions {
    #[default]
    None,
    Relay(RelayOptions),
}

impl RouteOptions {
    pub fn relay(relayer_fee: BigDecimal, to_native_token: BigDecimal) -> Self {
        RouteOptions::Relay(RelayOptions {
            relayer_fee: Some(relayer_fee),
            to_native_token: Some(to_native_token),
            receive_native_amount: BigDecimal::zero(),
        })
    }

    pub fn relayer_fee(&self) -> Option<&BigDecimal> {
        match self {
            RouteOptions::Relay(opts) => opts.relayer_fee.as_ref(),
            RouteOptions::None => None,
        }
    }

    /// Requested gas drop-off, zero when unset
    pub fn to_native_token(&self) -> BigDecimal {
        match self {
            RouteOptions::Relay(RelayOptions {
                to_native_token: Some(amount),
                ..
            }) => amount.clone(),
            _ => BigDecimal::zero(),
        }
    }

    pub fn receive_native_amount(&self) -> BigDecimal {
        match self {
            RouteOptions::Relay(opts) => opts.receive_native_amount.clone(),
            RouteOptions::None => BigDecimal::zero(),
        }
    }
}

/// Availability query: token keys, chain keys and a human amount
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRequest {
    pub source_token: String,
    pub dest_token: String,
    pub amount: BigDecimal,
    pub source_chain: String,
    pub dest_chain: String,
}

/// Everything `send` needs to submit a transfer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub token: SendToken,
    pub amount: BigDecimal,
    pub source_chain: String,
    pub sender: String,
    pub dest_chain: String,
    pub recipient: String,
    #[serde(default)]
    pub options: RouteOptions,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_token_id_case_insensitive() {
        let a = TokenId::new("ethereum", "0xB4FBF271143F4FBf7B91A5ded31805e42b2208d6");
        let b = TokenId::new("ethereum", "0xb4fbf271143f4fbf7b91a5ded31805e42b2208d6");
        assert_eq!(a, b);

        let other_chain = TokenId::new("polygon", "0xb4fbf271143f4fbf7b91a5ded31805e42b2208d6");
        assert_ne!(a, other_chain);
    }

    #[test]
    fn test_route_options_defaults() {
        let opts = RouteOptions::None;
        assert!(opts.relayer_fee().is_none());
        assert_eq!(opts.to_native_token(), BigDecimal::zero());

        let relay = RouteOptions::relay(
            BigDecimal::from_str("2").unwrap(),
            BigDecimal::from_str("0.5").unwrap(),
        );
        assert_eq!(relay.relayer_fee(), Some(&BigDecimal::from(2)));
        assert_eq!(relay.to_native_token(), BigDecimal::from_str("0.5").unwrap());
    }

    #[test]
    fn test_signed_message_hex() {
        let message = UnsignedMessage {
            send_tx: "0xabc".to_string(),
            sender: "0x1".to_string(),
            recipient: "0x2".to_string(),
            amount: 1,
            token_id: TokenId::new("ethereum", "0xdead"),
            token_key: "WETH".to_string(),
            token_decimals: 18,
            from_chain: "ethereum".to_string(),
            to_chain: "polygon".to_string(),
            emitter_address: "0000".to_string(),
            sequence: 7,
            gas_fee: None,
            payload_kind: PayloadKind::Manual,
            protocol: Protocol::TokenBridge,
            relayer_fee: None,
            to_native_token_amount: None,
        };
        assert_eq!(message.id().to_string(), "ethereum/0000/7");

        let signed = SignedMessage::new(message, vec![0x01, 0xff]);
        assert_eq!(signed.vaa_hex(), "0x01ff");
    }
}
