//! Presentation Layer
//!
//! Parsed access requests in, protocol responses out.

pub mod handler;
pub mod request;
pub mod response;

pub use handler::AccessRequestHandler;
pub use request::AccessRequest;
pub use response::{ProtocolResponse, ResponseCode};
