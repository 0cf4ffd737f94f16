//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Injectable wall clock (system and manual)
//! - Per-key async mutual exclusion
//! - HTTP client construction for outbound API calls

pub mod clock;
pub mod http;
pub mod sync;
