//! Testing Utilities Module
//!
//! In-memory collaborators and a small sample network for unit and
//! integration tests.
//!
//! ## Submodules
//!
//! - `mocks` - `MockChainClient`, `MockAttestationSource` and `MockRoute`
//! - `fixtures` - sample network config, messages and requests

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;
