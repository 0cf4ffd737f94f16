//! Infrastructure Layer
//!
//! Directory, second-factor API and challenge store implementations.

pub mod ldap;
pub mod memory;
pub mod second_factor_api;

pub use ldap::{LdapDirectory, LdapSettings};
pub use memory::InMemoryChallengeStore;
pub use second_factor_api::HttpSecondFactorApi;
