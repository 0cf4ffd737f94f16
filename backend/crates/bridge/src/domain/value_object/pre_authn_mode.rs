//! Pre-authentication Mode
//!
//! Decides whether a one-time code must accompany the first packet,
//! before the directory is consulted at all.

use derive_more::Display;
use kernel::error::app_error::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Pre-authentication mode
///
/// `Otp` is the zero value: an unrecognized token parses to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
pub enum PreAuthnMode {
    #[default]
    #[display("otp")]
    Otp,
    #[display("none")]
    None,
}

impl PreAuthnMode {
    /// Best-effort, case-insensitive parse that never fails
    fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "none" => PreAuthnMode::None,
            "otp" => PreAuthnMode::Otp,
            _ => PreAuthnMode::default(),
        }
    }
}

/// Settings validated alongside the mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreAuthnSettings {
    pub otp_code_length: usize,
}

impl Default for PreAuthnSettings {
    fn default() -> Self {
        Self { otp_code_length: 6 }
    }
}

/// Parsed pre-authentication policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreAuthnModeDescriptor {
    mode: PreAuthnMode,
    settings: PreAuthnSettings,
}

impl PreAuthnModeDescriptor {
    pub const MIN_OTP_LENGTH: usize = 1;
    pub const MAX_OTP_LENGTH: usize = 20;

    /// Build from the configured mode string and settings
    ///
    /// Blank input means no pre-step. Unknown tokens silently select
    /// [`PreAuthnMode::Otp`]. The code length is checked regardless of mode.
    pub fn create(raw: &str, settings: PreAuthnSettings) -> AppResult<Self> {
        let length = settings.otp_code_length;
        if !(Self::MIN_OTP_LENGTH..=Self::MAX_OTP_LENGTH).contains(&length) {
            return Err(AppError::configuration(format!(
                "OTP code length must be between {} and {}, got {}",
                Self::MIN_OTP_LENGTH,
                Self::MAX_OTP_LENGTH,
                length
            )));
        }

        let mode = if raw.trim().is_empty() {
            PreAuthnMode::None
        } else {
            PreAuthnMode::parse_lenient(raw)
        };

        Ok(Self { mode, settings })
    }

    /// No pre-step, default settings
    pub fn disabled() -> Self {
        Self {
            mode: PreAuthnMode::None,
            settings: PreAuthnSettings::default(),
        }
    }

    pub fn mode(&self) -> PreAuthnMode {
        self.mode
    }

    pub fn otp_code_length(&self) -> usize {
        self.settings.otp_code_length
    }

    pub fn requires_otp(&self) -> bool {
        self.mode == PreAuthnMode::Otp
    }
}

impl Default for PreAuthnModeDescriptor {
    fn default() -> Self {
        Self::disabled()
    }
}
