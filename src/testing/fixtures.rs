//! Sample network used across tests
//!
//! | chain     | id | context  | token bridge | relayer | cctp | ibc gateway |
//! |-----------|----|----------|--------------|---------|------|-------------|
//! | ethereum  | 2  | Ethereum | yes          | yes     | yes  |             |
//! | polygon   | 5  | Ethereum | yes          | yes     | yes  |             |
//! | bsc       | 4  | Ethereum | yes          | yes     |      |             |
//! | solana    | 1  | Solana   | yes          |         |      |             |
//! | osmosis   | 20 | Cosmos   |              |         |      | yes         |

use bigdecimal::BigDecimal;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use super::mocks::{MockAttestationSource, MockChainClient};
use crate::attestation::{AttestationFetcher, PollConfig};
use crate::config::{
    AttestationConfig, ChainConfig, ChainContext, ChainContracts, DecimalConfig, NetworkConfig,
    TokenConfig,
};
use crate::routes::{RouteContext, RouteKind};
use crate::types::{
    ChainId, PayloadKind, Protocol, RouteOptions, RouteRequest, SendToken, TokenId,
    TransferRequest, UnsignedMessage,
};

pub const WETH: &str = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2";
pub const USDC_ETH: &str = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";
pub const USDC_POLYGON: &str = "0x2791Bca1f2de4661ED88A30C99A7a9449Aa84174";
pub const WMATIC: &str = "0x0d500B1d8E8eF31E21C99d1Db9A6444d3ADf1270";
pub const WBNB: &str = "0xbb4CdB9CBd36B01bD1cBaEBF2De08d9173bc095c";
pub const WSOL: &str = "So11111111111111111111111111111111111111112";

pub const TOKEN_BRIDGE_EMITTER: &str =
    "0000000000000000000000003ee18b2214aff97000d974cf647e7c347e8fa585";

fn contract(address: &str) -> Option<String> {
    Some(address.to_string())
}

fn chain(key: &str, id: u16, context: ChainContext, gas_token: &str, contracts: ChainContracts) -> ChainConfig {
    ChainConfig {
        key: key.to_string(),
        id: ChainId(id),
        context,
        gas_token: gas_token.to_string(),
        contracts,
    }
}

fn evm_decimals(default: u8) -> DecimalConfig {
    DecimalConfig {
        per_chain: BTreeMap::from([("Ethereum".to_string(), 18)]),
        default,
    }
}

struct TokenEntry<'a> {
    key: &'a str,
    symbol: &'a str,
    native_chain: &'a str,
    address: Option<&'a str>,
    decimals: DecimalConfig,
    wrapped_asset: Option<&'a str>,
    cctp: bool,
}

fn token(entry: TokenEntry<'_>) -> TokenConfig {
    TokenConfig {
        key: entry.key.to_string(),
        symbol: entry.symbol.to_string(),
        display_name: None,
        native_chain: entry.native_chain.to_string(),
        token_id: entry
            .address
            .map(|address| TokenId::new(entry.native_chain, address)),
        decimals: entry.decimals,
        wrapped_asset: entry.wrapped_asset.map(str::to_string),
        cctp: entry.cctp,
    }
}

pub fn sample_config() -> NetworkConfig {
    let chains = [
        chain(
            "ethereum",
            2,
            ChainContext::Ethereum,
            "ETH",
            ChainContracts {
                core: contract("0x98f3c9e6E3fAce36bAAd05FE09d375Ef1464288B"),
                token_bridge: contract("0x3ee18B2214AFF97000D974cf647E7C347E8fa585"),
                relayer: contract("0xcafd2f0a35a4459fa40c0517e17e6fa2939441ca"),
                cctp_token_messenger: contract("0xBd3fa81B58Ba92a82136038B25aDec7066af3155"),
                cctp_relayer: contract("0x4cb69FaE7e7Af841e44E1A1c30Af640739378bb2"),
                ibc_gateway: None,
            },
        ),
        chain(
            "polygon",
            5,
            ChainContext::Ethereum,
            "MATIC",
            ChainContracts {
                core: contract("0x7A4B5a56256163F07b2C80A7cA55aBE66c4ec4d7"),
                token_bridge: contract("0x5a58505a96D1dbf8dF91cB21B54419FC36e93fdE"),
                relayer: contract("0x37dd5e6a3d3a6e39f6ec8d0b9a4e8f4a1c3a3b1f"),
                cctp_token_messenger: contract("0x9daF8c91AEFAE50b9c0E69629D3F6Ca40cA3B3FE"),
                cctp_relayer: contract("0x4cb69FaE7e7Af841e44E1A1c30Af640739378bb2"),
                ibc_gateway: None,
            },
        ),
        chain(
            "bsc",
            4,
            ChainContext::Ethereum,
            "BNB",
            ChainContracts {
                core: contract("0x98f3c9e6E3fAce36bAAd05FE09d375Ef1464288B"),
                token_bridge: contract("0xB6F6D86a8f9879A9c87f643768d9efc38c1Da6E7"),
                relayer: contract("0xcafd2f0a35a4459fa40c0517e17e6fa2939441ca"),
                ..Default::default()
            },
        ),
        chain(
            "solana",
            1,
            ChainContext::Solana,
            "SOL",
            ChainContracts {
                core: contract("worm2ZoG2kUd4vFXhvjh93UUH596ayRfgQ2MgjNMTth"),
                token_bridge: contract("wormDTUJ6AWPNvk59vGQbDvGJmqbDTdgWgAqcLBCgUb"),
                ..Default::default()
            },
        ),
        chain(
            "osmosis",
            20,
            ChainContext::Cosmos,
            "OSMO",
            ChainContracts {
                ibc_gateway: contract(
                    "wormhole14ejqjyq8um4p3xfqj74yld5waqljf88fz25yxnma0cngspxe3les00fpjx",
                ),
                ..Default::default()
            },
        ),
    ];

    let tokens = [
        token(TokenEntry {
            key: "ETH",
            symbol: "ETH",
            native_chain: "ethereum",
            address: None,
            decimals: evm_decimals(8),
            wrapped_asset: Some("WETH"),
            cctp: false,
        }),
        token(TokenEntry {
            key: "WETH",
            symbol: "WETH",
            native_chain: "ethereum",
            address: Some(WETH),
            decimals: evm_decimals(8),
            wrapped_asset: None,
            cctp: false,
        }),
        token(TokenEntry {
            key: "MATIC",
            symbol: "MATIC",
            native_chain: "polygon",
            address: None,
            decimals: evm_decimals(8),
            wrapped_asset: Some("WMATIC"),
            cctp: false,
        }),
        token(TokenEntry {
            key: "WMATIC",
            symbol: "WMATIC",
            native_chain: "polygon",
            address: Some(WMATIC),
            decimals: evm_decimals(8),
            wrapped_asset: None,
            cctp: false,
        }),
        token(TokenEntry {
            key: "BNB",
            symbol: "BNB",
            native_chain: "bsc",
            address: None,
            decimals: evm_decimals(8),
            wrapped_asset: Some("WBNB"),
            cctp: false,
        }),
        token(TokenEntry {
            key: "WBNB",
            symbol: "WBNB",
            native_chain: "bsc",
            address: Some(WBNB),
            decimals: evm_decimals(8),
            wrapped_asset: None,
            cctp: false,
        }),
        token(TokenEntry {
            key: "SOL",
            symbol: "SOL",
            native_chain: "solana",
            address: None,
            decimals: DecimalConfig {
                per_chain: BTreeMap::from([("solana".to_string(), 9)]),
                default: 8,
            },
            wrapped_asset: Some("WSOL"),
            cctp: false,
        }),
        token(TokenEntry {
            key: "WSOL",
            symbol: "WSOL",
            native_chain: "solana",
            address: Some(WSOL),
            decimals: DecimalConfig {
                per_chain: BTreeMap::from([("solana".to_string(), 9)]),
                default: 8,
            },
            wrapped_asset: None,
            cctp: false,
        }),
        token(TokenEntry {
            key: "OSMO",
            symbol: "OSMO",
            native_chain: "osmosis",
            address: None,
            decimals: DecimalConfig::uniform(6),
            wrapped_asset: None,
            cctp: false,
        }),
        token(TokenEntry {
            key: "USDCeth",
            symbol: "USDC",
            native_chain: "ethereum",
            address: Some(USDC_ETH),
            decimals: DecimalConfig::uniform(6),
            wrapped_asset: None,
            cctp: true,
        }),
        token(TokenEntry {
            key: "USDCpolygon",
            symbol: "USDC",
            native_chain: "polygon",
            address: Some(USDC_POLYGON),
            decimals: DecimalConfig::uniform(6),
            wrapped_asset: None,
            cctp: true,
        }),
    ];

    NetworkConfig {
        chains: chains.into_iter().map(|c| (c.key.clone(), c)).collect(),
        tokens: tokens.into_iter().map(|t| (t.key.clone(), t)).collect(),
        routes: RouteKind::ALL.to_vec(),
        attestation: AttestationConfig::default(),
    }
}

/// Chain client with relayer quotes and gas estimates for the sample network.
///
/// - relayer accepts WETH, WMATIC and both USDCs (not WBNB)
/// - relayer fee: 2 USDC, 0.001 WETH, 0.1 WMATIC
/// - send gas 0.0015, claim gas 0.002 (18-decimal gas tokens)
/// - 1 USDC swaps into 1 MATIC; at most 10 USDC can be swapped
pub fn sample_client() -> MockChainClient {
    let weth = TokenId::new("ethereum", WETH);
    let usdc_eth = TokenId::new("ethereum", USDC_ETH);
    let usdc_polygon = TokenId::new("polygon", USDC_POLYGON);
    let wmatic = TokenId::new("polygon", WMATIC);

    MockChainClient::new()
        .with_accepted_token(&weth)
        .with_accepted_token(&usdc_eth)
        .with_accepted_token(&usdc_polygon)
        .with_accepted_token(&wmatic)
        .with_relayer_fee(&usdc_eth, 2_000_000)
        .with_relayer_fee(&usdc_polygon, 2_000_000)
        .with_relayer_fee(&weth, 1_000_000_000_000_000)
        .with_relayer_fee(&wmatic, 100_000_000_000_000_000)
        .with_send_gas(1_500_000_000_000_000)
        .with_claim_gas(2_000_000_000_000_000)
        .with_swap_rate(1_000_000_000_000, 1)
        .with_max_swap(10_000_000)
}

pub fn sample_vaa() -> Vec<u8> {
    vec![0x01, 0x00, 0x00, 0x00, 0x03, 0x0d]
}

pub fn fast_poll_config(max_attempts: u32) -> PollConfig {
    PollConfig {
        interval: Duration::from_millis(1),
        max_attempts,
        request_timeout: Duration::from_millis(500),
        cache_capacity: 64,
    }
}

/// Sample network, `client`, and an attestation source that is ready at once
pub fn sample_context(client: Arc<MockChainClient>) -> RouteContext {
    sample_context_with(client, MockAttestationSource::ready_after(0, sample_vaa()), 3)
}

pub fn sample_context_with(
    client: Arc<MockChainClient>,
    source: MockAttestationSource,
    max_attempts: u32,
) -> RouteContext {
    let fetcher = AttestationFetcher::new(Arc::new(source), fast_poll_config(max_attempts));
    RouteContext::new(Arc::new(sample_config()), client, Arc::new(fetcher))
}

/// 1 WETH from ethereum to polygon, sequence 42
pub fn sample_message(payload_kind: PayloadKind, protocol: Protocol) -> UnsignedMessage {
    UnsignedMessage {
        send_tx: "0xsendtx".to_string(),
        sender: "0xsender".to_string(),
        recipient: "0xrecipient".to_string(),
        amount: 100_000_000,
        token_id: TokenId::new("ethereum", WETH),
        token_key: "WETH".to_string(),
        token_decimals: 18,
        from_chain: "ethereum".to_string(),
        to_chain: "polygon".to_string(),
        emitter_address: TOKEN_BRIDGE_EMITTER.to_string(),
        sequence: 42,
        gas_fee: None,
        payload_kind,
        protocol,
        relayer_fee: None,
        to_native_token_amount: None,
    }
}

fn decimal(amount: &str) -> BigDecimal {
    BigDecimal::from_str(amount).unwrap_or_default()
}

pub fn route_request(
    source_token: &str,
    dest_token: &str,
    amount: &str,
    source_chain: &str,
    dest_chain: &str,
) -> RouteRequest {
    RouteRequest {
        source_token: source_token.to_string(),
        dest_token: dest_token.to_string(),
        amount: decimal(amount),
        source_chain: source_chain.to_string(),
        dest_chain: dest_chain.to_string(),
    }
}

/// Transfer of `token_key` from `source_chain`; the chain's gas token is sent
/// as [`SendToken::Native`].
pub fn transfer_request(
    token_key: &str,
    amount: &str,
    source_chain: &str,
    dest_chain: &str,
) -> TransferRequest {
    let config = sample_config();
    let is_gas_token = config
        .chains
        .get(source_chain)
        .map_or(false, |c| c.gas_token == token_key);
    let token = match config.tokens.get(token_key) {
        Some(token) if !is_gas_token => config
            .wrapped_token_id(token)
            .map_or(SendToken::Native, SendToken::Token),
        _ => SendToken::Native,
    };

    TransferRequest {
        token,
        amount: decimal(amount),
        source_chain: source_chain.to_string(),
        sender: "0xsender".to_string(),
        dest_chain: dest_chain.to_string(),
        recipient: "0xrecipient".to_string(),
        options: RouteOptions::None,
    }
}
