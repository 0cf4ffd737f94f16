//! Application Layer
//!
//! Use cases and application services.

pub mod config;
pub mod correlation;
pub mod forest_cache;
pub mod identity_resolver;
pub mod orchestrator;
pub mod schema_loader;

// Re-exports
pub use config::{BridgeConfig, ClientConfig, ClientRegistry, ClientSettings, RunOptions};
pub use correlation::CorrelationTracker;
pub use forest_cache::ForestCache;
pub use identity_resolver::{DirectoryMatch, ForestScope, IdentityResolver, Resolution};
pub use orchestrator::{AttemptInput, AttemptOutcome, ContinuationInput, SecondFactorOrchestrator};
pub use schema_loader::ForestSchemaLoader;
