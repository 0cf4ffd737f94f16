//! Domain Layer
//!
//! Login attempt vocabulary and collaborator traits.
//! No I/O happens here.

pub mod entity;
pub mod repository;
pub mod value_object;

// Re-exports
pub use entity::{
    directory_entry::DirectoryEntry, forest_schema::ForestSchema, login_challenge::LoginChallenge,
};
pub use repository::{ChallengeStore, Directory, SecondFactorApi};
