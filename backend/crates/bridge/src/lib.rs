//! Directory + Second-Factor Bridge
//!
//! Clean Architecture structure:
//! - `domain/` - Login attempt vocabulary, policies, collaborator traits
//! - `application/` - Correlation tracking, forest cache, identity resolution, orchestration
//! - `infra/` - LDAP directory, second-factor HTTP API, in-memory challenge store
//! - `presentation/` - Access requests in, protocol responses out
//!
//! ## Flow
//! - Optional pre-step: an OTP code split off the password field
//! - Identity resolution across every domain of the client's forest
//! - First-factor bind and group policy
//! - Second-factor request, with challenge dialogues kept per correlation id
//!
//! ## Failure Model
//! - Configuration errors keep a client from activating
//! - Every other failure ends the attempt with a generic reject
//! - Expired challenges are a terminal state, not an error

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

// Re-exports for convenience
pub use application::config::{BridgeConfig, ClientConfig, ClientRegistry, RunOptions};
pub use error::{BridgeError, BridgeResult};
pub use infra::{HttpSecondFactorApi, InMemoryChallengeStore, LdapDirectory};
pub use presentation::{AccessRequest, AccessRequestHandler, ProtocolResponse};

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult, OptionExt, ResultExt},
    kind::ErrorKind,
};
