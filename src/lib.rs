//! Bridge Routes: Route Selection and Transfer Tracking for Cross-Chain Bridges
//!
//! This crate answers the questions a bridge front end asks before, during and
//! after a cross-chain token transfer:
//!
//! - **Amounts** - decimal normalization between chain precisions and the
//!   8-decimal message precision
//! - **Routes** - one strategy per transfer mechanism (manual bridge, relayed
//!   bridge, CCTP manual, CCTP relayed, Cosmos gateway) behind a common trait
//! - **Operator** - dispatches by route, picks the preferred available route,
//!   unions token support across routes
//! - **Attestations** - polls the guardian network for signed messages with a
//!   bounded retry budget
//! - **Lifecycle** - tracks a transfer from submission to completion or redeem
//! - **Balances** - wallet balances for a token picker
//! - **Testing Module** - in-memory chain client, attestation source and a
//!   sample network (feature `testing`)
//!
//! Chain access is abstracted behind [`chain::ChainClient`]; this crate never
//! signs or builds transactions itself.
//!
//! ## Feature Flags
//!
//! - `testing` - Enable mocks and fixtures (default)

pub mod amount;
pub mod attestation;
pub mod balances;
pub mod chain;
pub mod config;
pub mod display;
pub mod error;
pub mod lifecycle;
pub mod operator;
pub mod routes;
pub mod types;

// Testing utilities (feature-gated)
#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export commonly used items at the crate root
pub use amount::{denormalize, normalize, parse_units, to_decimal_amount, MAX_DECIMALS};
pub use attestation::{
    AttestationFetcher, AttestationPoll, AttestationSource, HttpAttestationSource, PollConfig,
};
pub use balances::fetch_token_balances;
pub use chain::{ChainClient, SendRequest};
pub use config::{ChainConfig, NetworkConfig, TokenConfig};
pub use display::{DisplayRow, TransferDisplayData, ValueStatus};
pub use error::{RouteError, RouteResult};
pub use lifecycle::{TransferEvent, TransferState, TransferTracker};
pub use operator::{RouteOperator, ROUTE_PREFERENCE};
pub use routes::{
    BridgeRoute, CctpManualRoute, CctpRelayRoute, CosmosGatewayRoute, DestInfoRequest,
    PreviewRequest, RelayRoute, RouteContext, RouteKind, RouteStrategy,
};
pub use types::{
    ChainId, MessageId, PayloadKind, Protocol, RouteOptions, RouteRequest, SendToken,
    SignedMessage, TokenId, TransferRequest, UnsignedMessage,
};
