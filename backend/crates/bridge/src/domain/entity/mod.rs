pub mod directory_entry;
pub mod forest_schema;
pub mod login_attempt;
pub mod login_challenge;
pub mod second_factor;
