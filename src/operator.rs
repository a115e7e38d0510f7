//! Route dispatcher
//!
//! Holds one strategy per [`RouteKind`] and answers the questions that span
//! routes: which routes can carry a transfer, which one to use, and which
//! tokens any route supports.

use bigdecimal::{BigDecimal, Zero};
use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::{NetworkConfig, TokenConfig};
use crate::error::{RouteError, RouteResult};
use crate::routes::{
    BridgeRoute, CctpManualRoute, CctpRelayRoute, CosmosGatewayRoute, RelayRoute, RouteContext,
    RouteKind, RouteStrategy,
};
use crate::types::{RouteOptions, RouteRequest};

/// Most specific mechanism first
pub const ROUTE_PREFERENCE: [RouteKind; 5] = [
    RouteKind::CosmosGateway,
    RouteKind::CctpRelay,
    RouteKind::CctpManual,
    RouteKind::Relay,
    RouteKind::Bridge,
];

#[derive(Debug)]
pub struct RouteOperator {
    config: Arc<NetworkConfig>,
    routes: HashMap<RouteKind, Arc<dyn RouteStrategy>>,
}

impl RouteOperator {
    pub fn new(config: Arc<NetworkConfig>) -> Self {
        Self {
            config,
            routes: HashMap::new(),
        }
    }

    /// Register the built-in strategy of every enabled route
    pub fn with_default_routes(ctx: RouteContext) -> Self {
        let mut operator = Self::new(ctx.config.clone());
        for kind in RouteKind::ALL {
            if !ctx.config.is_route_enabled(kind) {
                continue;
            }
            let route: Arc<dyn RouteStrategy> = match kind {
                RouteKind::Bridge => Arc::new(BridgeRoute::new(ctx.clone())),
                RouteKind::Relay => Arc::new(RelayRoute::new(ctx.clone())),
                RouteKind::CctpManual => Arc::new(CctpManualRoute::new(ctx.clone())),
                RouteKind::CctpRelay => Arc::new(CctpRelayRoute::new(ctx.clone())),
                RouteKind::CosmosGateway => Arc::new(CosmosGatewayRoute::new(ctx.clone())),
            };
            operator.routes.insert(kind, route);
        }
        info!(routes = ?operator.registered(), "Route operator initialized");
        operator
    }

    pub fn config(&self) -> &Arc<NetworkConfig> {
        &self.config
    }

    pub fn register(&mut self, route: Arc<dyn RouteStrategy>) -> RouteResult<()> {
        let kind = route.kind();
        if self.routes.contains_key(&kind) {
            return Err(RouteError::DuplicateRoute { route: kind });
        }
        self.routes.insert(kind, route);
        Ok(())
    }

    pub fn get_route(&self, kind: RouteKind) -> RouteResult<Arc<dyn RouteStrategy>> {
        self.routes
            .get(&kind)
            .cloned()
            .ok_or_else(|| RouteError::UnknownRoute {
                route: kind.to_string(),
            })
    }

    /// Look up a route by name (e.g. from a stored transfer record)
    pub fn get_route_by_name(&self, name: &str) -> RouteResult<Arc<dyn RouteStrategy>> {
        let kind = name
            .parse::<RouteKind>()
            .map_err(|_| RouteError::UnknownRoute {
                route: name.to_string(),
            })?;
        self.get_route(kind)
    }

    /// Registered routes in preference order
    pub fn registered(&self) -> Vec<RouteKind> {
        ROUTE_PREFERENCE
            .iter()
            .copied()
            .filter(|kind| self.routes.contains_key(kind))
            .collect()
    }

    fn ordered_routes(&self) -> Vec<Arc<dyn RouteStrategy>> {
        ROUTE_PREFERENCE
            .iter()
            .filter_map(|kind| self.routes.get(kind).cloned())
            .collect()
    }

    // ========================================================================
    // Route selection
    // ========================================================================

    /// Routes that can carry `request`, probed concurrently, in preference order
    pub async fn available_routes(&self, request: &RouteRequest) -> Vec<RouteKind> {
        let routes = self.ordered_routes();
        let probes = routes.iter().map(|route| route.is_route_available(request));
        let results = join_all(probes).await;

        let available: Vec<RouteKind> = routes
            .iter()
            .zip(results)
            .filter_map(|(route, available)| available.then(|| route.kind()))
            .collect();
        debug!(
            source_chain = %request.source_chain,
            dest_chain = %request.dest_chain,
            token = %request.source_token,
            routes = ?available,
            "Available routes"
        );
        available
    }

    /// The most preferred available route, or `pinned` if it is available
    pub async fn select_route(
        &self,
        request: &RouteRequest,
        pinned: Option<RouteKind>,
    ) -> RouteResult<RouteKind> {
        if let Some(kind) = pinned {
            let route = self.get_route(kind)?;
            if route.is_route_available(request).await {
                return Ok(kind);
            }
            return Err(RouteError::unavailable(format!(
                "route {} cannot carry {} from {} to {}",
                kind, request.source_token, request.source_chain, request.dest_chain
            )));
        }

        self.available_routes(request)
            .await
            .into_iter()
            .next()
            .ok_or_else(|| {
                RouteError::unavailable(format!(
                    "no route carries {} from {} to {}",
                    request.source_token, request.source_chain, request.dest_chain
                ))
            })
    }

    // ========================================================================
    // Token discovery
    // ========================================================================

    /// Candidates supported as source token by at least one route
    pub async fn all_supported_source_tokens(
        &self,
        candidates: &[TokenConfig],
        dest_token: Option<&TokenConfig>,
        source_chain: Option<&str>,
    ) -> Vec<TokenConfig> {
        let routes = self.ordered_routes();
        let lookups = routes
            .iter()
            .map(|route| route.supported_source_tokens(candidates, dest_token, source_chain));
        union_in_candidate_order(candidates, join_all(lookups).await)
    }

    /// Candidates supported as destination token by at least one route
    pub async fn all_supported_dest_tokens(
        &self,
        candidates: &[TokenConfig],
        source_token: Option<&TokenConfig>,
        dest_chain: Option<&str>,
    ) -> Vec<TokenConfig> {
        let routes = self.ordered_routes();
        let lookups = routes
            .iter()
            .map(|route| route.supported_dest_tokens(candidates, source_token, dest_chain));
        union_in_candidate_order(candidates, join_all(lookups).await)
    }

    /// Default destination token: the only supported one, or the version native
    /// to `dest_chain` when every supported token shares a symbol.
    pub fn preferred_dest_token(supported: &[TokenConfig], dest_chain: &str) -> Option<String> {
        if supported.len() == 1 {
            return Some(supported[0].key.clone());
        }
        let symbol = &supported.first()?.symbol;
        if !supported.iter().all(|t| &t.symbol == symbol) {
            return None;
        }
        supported
            .iter()
            .find(|t| {
                t.native_chain == dest_chain
                    && t.token_id.as_ref().map_or(false, |id| id.chain == t.native_chain)
            })
            .map(|t| t.key.clone())
    }

    // ========================================================================
    // Amounts
    // ========================================================================

    pub fn compute_receive_amount(
        &self,
        kind: RouteKind,
        send_amount: &BigDecimal,
        options: &RouteOptions,
    ) -> RouteResult<BigDecimal> {
        self.get_route(kind)?
            .compute_receive_amount(send_amount, options)
    }

    pub fn compute_send_amount(
        &self,
        kind: RouteKind,
        receive_amount: &BigDecimal,
        options: &RouteOptions,
    ) -> RouteResult<BigDecimal> {
        self.get_route(kind)?
            .compute_send_amount(receive_amount, options)
    }

    pub fn min_send_amount(&self, kind: RouteKind, options: &RouteOptions) -> RouteResult<BigDecimal> {
        self.get_route(kind)?.min_send_amount(options)
    }

    /// Receive amount that is safe to submit: fees must not exceed the amount
    pub fn checked_receive_amount(
        &self,
        kind: RouteKind,
        send_amount: &BigDecimal,
        options: &RouteOptions,
    ) -> RouteResult<BigDecimal> {
        let receive = self.compute_receive_amount(kind, send_amount, options)?;
        if receive < BigDecimal::zero() {
            return Err(RouteError::arithmetic(format!(
                "fees exceed the amount sent on route {}",
                kind
            )));
        }
        Ok(receive)
    }
}

/// Each supported candidate once, in the order candidates were given
fn union_in_candidate_order(
    candidates: &[TokenConfig],
    per_route: Vec<Vec<TokenConfig>>,
) -> Vec<TokenConfig> {
    let supported: HashSet<String> = per_route
        .into_iter()
        .flatten()
        .map(|token| token.key)
        .collect();
    let mut seen: HashSet<&str> = HashSet::new();
    candidates
        .iter()
        .filter(|token| supported.contains(&token.key) && seen.insert(token.key.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::{route_request, sample_client, sample_config, sample_context};
    use crate::testing::mocks::MockRoute;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn context() -> RouteContext {
        sample_context(Arc::new(sample_client()))
    }

    fn tokens(keys: &[&str]) -> Vec<TokenConfig> {
        let config = sample_config();
        keys.iter()
            .map(|k| config.token(k).unwrap().clone())
            .collect()
    }

    fn keys(tokens: &[TokenConfig]) -> Vec<&str> {
        tokens.iter().map(|t| t.key.as_str()).collect()
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let ctx = context();
        let mut operator = RouteOperator::new(ctx.config.clone());
        operator
            .register(Arc::new(MockRoute::new(RouteKind::Bridge, ctx.clone())))
            .unwrap();
        let err = operator
            .register(Arc::new(MockRoute::new(RouteKind::Bridge, ctx)))
            .unwrap_err();
        assert!(matches!(err, RouteError::DuplicateRoute { route: RouteKind::Bridge }));
    }

    #[test]
    fn test_get_unknown_route() {
        let ctx = context();
        let operator = RouteOperator::new(ctx.config.clone());
        assert!(matches!(
            operator.get_route(RouteKind::Relay),
            Err(RouteError::UnknownRoute { .. })
        ));
        assert!(matches!(
            operator.get_route_by_name("hashflow"),
            Err(RouteError::UnknownRoute { .. })
        ));
    }

    #[test]
    fn test_default_routes_follow_config() {
        let ctx = context();
        let mut config = (*ctx.config).clone();
        config.routes = vec![RouteKind::Bridge, RouteKind::CctpManual];
        let ctx = RouteContext::new(Arc::new(config), ctx.client, ctx.attestations);

        let operator = RouteOperator::with_default_routes(ctx);
        assert_eq!(
            operator.registered(),
            vec![RouteKind::CctpManual, RouteKind::Bridge]
        );
        assert!(operator.get_route_by_name("cctpManual").is_ok());
    }

    #[tokio::test]
    async fn test_select_route_by_preference() {
        let ctx = context();
        let mut operator = RouteOperator::new(ctx.config.clone());
        for kind in [RouteKind::Bridge, RouteKind::Relay, RouteKind::CctpManual] {
            operator
                .register(Arc::new(MockRoute::new(kind, ctx.clone()).available(true)))
                .unwrap();
        }
        operator
            .register(Arc::new(
                MockRoute::new(RouteKind::CctpRelay, ctx.clone()).available(false),
            ))
            .unwrap();

        let request = route_request("USDCeth", "USDCpolygon", "10", "ethereum", "polygon");
        assert_eq!(
            operator.available_routes(&request).await,
            vec![RouteKind::CctpManual, RouteKind::Relay, RouteKind::Bridge]
        );
        assert_eq!(
            operator.select_route(&request, None).await.unwrap(),
            RouteKind::CctpManual
        );
        assert_eq!(
            operator
                .select_route(&request, Some(RouteKind::Bridge))
                .await
                .unwrap(),
            RouteKind::Bridge
        );
        assert!(matches!(
            operator.select_route(&request, Some(RouteKind::CctpRelay)).await,
            Err(RouteError::Unavailable { .. })
        ));
        assert!(matches!(
            operator
                .select_route(&request, Some(RouteKind::CosmosGateway))
                .await,
            Err(RouteError::UnknownRoute { .. })
        ));
    }

    #[test]
    fn test_no_available_route() {
        let ctx = context();
        let mut operator = RouteOperator::new(ctx.config.clone());
        operator
            .register(Arc::new(MockRoute::new(RouteKind::Bridge, ctx)))
            .unwrap();
        let request = route_request("WETH", "WETH", "1", "ethereum", "polygon");
        assert!(tokio_test::block_on(operator.available_routes(&request)).is_empty());
        assert!(matches!(
            tokio_test::block_on(operator.select_route(&request, None)),
            Err(RouteError::Unavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_union_of_supported_tokens() {
        let ctx = context();
        let mut operator = RouteOperator::new(ctx.config.clone());
        operator
            .register(Arc::new(
                MockRoute::new(RouteKind::Bridge, ctx.clone()).supporting(&["WETH", "USDCeth"]),
            ))
            .unwrap();
        operator
            .register(Arc::new(
                MockRoute::new(RouteKind::Relay, ctx).supporting(&["USDCeth", "WMATIC"]),
            ))
            .unwrap();

        let candidates = tokens(&["WMATIC", "USDCeth", "WBNB", "WETH"]);
        let source = operator
            .all_supported_source_tokens(&candidates, None, Some("ethereum"))
            .await;
        assert_eq!(keys(&source), vec!["WMATIC", "USDCeth", "WETH"]);

        let dest = operator
            .all_supported_dest_tokens(&candidates, None, Some("polygon"))
            .await;
        assert_eq!(keys(&dest), vec!["WMATIC", "USDCeth", "WETH"]);
    }

    #[test]
    fn test_preferred_dest_token() {
        let single = tokens(&["WETH"]);
        assert_eq!(
            RouteOperator::preferred_dest_token(&single, "polygon"),
            Some("WETH".to_string())
        );

        let usdc = tokens(&["USDCeth", "USDCpolygon"]);
        assert_eq!(
            RouteOperator::preferred_dest_token(&usdc, "polygon"),
            Some("USDCpolygon".to_string())
        );
        assert_eq!(
            RouteOperator::preferred_dest_token(&usdc, "ethereum"),
            Some("USDCeth".to_string())
        );
        assert_eq!(RouteOperator::preferred_dest_token(&usdc, "solana"), None);

        let mixed = tokens(&["WETH", "USDCpolygon"]);
        assert_eq!(RouteOperator::preferred_dest_token(&mixed, "polygon"), None);
        assert_eq!(RouteOperator::preferred_dest_token(&[], "polygon"), None);
    }

    #[test]
    fn test_amounts_forwarded_to_route() {
        let operator = RouteOperator::with_default_routes(context());
        let options = RouteOptions::relay(dec("2"), dec("1"));

        assert_eq!(
            operator
                .compute_receive_amount(RouteKind::Relay, &dec("100"), &options)
                .unwrap(),
            dec("97")
        );
        assert_eq!(
            operator
                .compute_receive_amount(RouteKind::Bridge, &dec("100"), &options)
                .unwrap(),
            dec("100")
        );
        assert_eq!(
            operator
                .compute_send_amount(RouteKind::CctpRelay, &dec("97"), &options)
                .unwrap(),
            dec("98")
        );
        assert_eq!(
            operator
                .min_send_amount(RouteKind::Relay, &RouteOptions::relay(dec("1.0"), dec("0.5")))
                .unwrap(),
            dec("1.575")
        );
    }

    #[test]
    fn test_checked_receive_amount_rejects_negative() {
        let operator = RouteOperator::with_default_routes(context());
        let options = RouteOptions::relay(dec("2"), dec("1"));

        // unchecked variant passes the negative value through
        assert_eq!(
            operator
                .compute_receive_amount(RouteKind::Relay, &dec("2.5"), &options)
                .unwrap(),
            dec("-0.5")
        );
        assert!(matches!(
            operator.checked_receive_amount(RouteKind::Relay, &dec("2.5"), &options),
            Err(RouteError::ArithmeticInvalid { .. })
        ));
        assert_eq!(
            operator
                .checked_receive_amount(RouteKind::Relay, &dec("3"), &options)
                .unwrap(),
            dec("0")
        );

        // nothing sent, fees still owed
        assert_eq!(
            operator
                .compute_receive_amount(RouteKind::Relay, &dec("0"), &options)
                .unwrap(),
            dec("-3")
        );
        assert!(matches!(
            operator.checked_receive_amount(RouteKind::Relay, &dec("0"), &options),
            Err(RouteError::ArithmeticInvalid { .. })
        ));
        assert_eq!(
            operator
                .compute_send_amount(RouteKind::Relay, &dec("0"), &options)
                .unwrap(),
            dec("1")
        );
    }
}
