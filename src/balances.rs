//! Wallet balances for a token picker

use bigdecimal::BigDecimal;
use futures::future::join_all;
use std::collections::BTreeMap;
use tracing::warn;

use crate::amount::to_decimal_amount;
use crate::chain::ChainClient;
use crate::config::{NetworkConfig, TokenConfig};
use crate::error::RouteResult;

/// Balance of every token in `tokens` held by `wallet` on `chain`, looked up
/// concurrently.
///
/// The chain's gas token is read as the native balance, everything else by
/// its bridged token id. A failed lookup, or a token with no deployment on
/// `chain`, yields `None` for that token only.
pub async fn fetch_token_balances(
    client: &dyn ChainClient,
    config: &NetworkConfig,
    chain: &str,
    wallet: &str,
    tokens: &[TokenConfig],
) -> RouteResult<BTreeMap<String, Option<BigDecimal>>> {
    let chain_config = config.chain(chain)?;

    let lookups = tokens.iter().map(|token| async move {
        let decimals = token.decimals.for_chain(chain_config);
        let raw = if token.key == chain_config.gas_token {
            client.native_balance(chain, wallet).await.map(Some)
        } else {
            match config.wrapped_token_id(token) {
                Some(id) => client.token_balance(chain, &id, wallet).await,
                None => Ok(None),
            }
        };

        let balance = match raw {
            Ok(raw) => raw.map(|amount| to_decimal_amount(amount, decimals)),
            Err(e) => {
                warn!(chain = %chain, token = %token.key, error = %e, "Failed to fetch balance");
                None
            }
        };
        (token.key.clone(), balance)
    });

    Ok(join_all(lookups).await.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::{sample_client, sample_config, USDC_ETH, WETH};
    use crate::types::TokenId;
    use std::str::FromStr;

    #[tokio::test]
    async fn test_balances_per_token() {
        let config = sample_config();
        let weth = TokenId::new("ethereum", WETH);
        let usdc = TokenId::new("ethereum", USDC_ETH);
        let client = sample_client()
            .with_native_balance("ethereum", 2_500_000_000_000_000_000)
            .with_token_balance(&usdc, 12_340_000)
            .with_failing_token(&weth);

        let tokens: Vec<TokenConfig> = ["ETH", "WETH", "USDCeth", "WMATIC", "OSMO"]
            .iter()
            .map(|k| config.token(k).unwrap().clone())
            .collect();

        let balances = fetch_token_balances(&client, &config, "ethereum", "0xwallet", &tokens)
            .await
            .unwrap();

        assert_eq!(balances["ETH"], Some(BigDecimal::from_str("2.5").unwrap()));
        assert_eq!(balances["USDCeth"], Some(BigDecimal::from_str("12.34").unwrap()));
        // lookup failed
        assert_eq!(balances["WETH"], None);
        // not deployed on ethereum
        assert_eq!(balances["WMATIC"], None);
        // not bridgeable
        assert_eq!(balances["OSMO"], None);
        assert_eq!(balances.len(), 5);
    }

    #[tokio::test]
    async fn test_unknown_chain() {
        let config = sample_config();
        let client = sample_client();
        assert!(fetch_token_balances(&client, &config, "nowhere", "0xwallet", &[])
            .await
            .is_err());
    }
}
