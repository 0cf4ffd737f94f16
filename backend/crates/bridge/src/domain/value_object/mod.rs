pub mod correlation_id;
pub mod directory_credential;
pub mod identity;
pub mod otp_code;
pub mod pre_authn_mode;
pub mod privacy_mode;
