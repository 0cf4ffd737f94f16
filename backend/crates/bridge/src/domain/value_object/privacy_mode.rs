//! Privacy Mode
//!
//! Controls which personal fields leave the bridge: in the second-factor
//! creation payload and in audit log lines.

use std::borrow::Cow;

use derive_more::Display;
use kernel::error::app_error::{AppError, AppResult};
use serde::{Deserialize, Serialize};

const MASK: &str = "*****";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum PrivacyMode {
    #[display("none")]
    None,
    #[display("full")]
    Full,
    #[display("partial")]
    Partial,
}

impl PrivacyMode {
    fn parse(raw: &str) -> AppResult<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(PrivacyMode::None),
            "full" => Ok(PrivacyMode::Full),
            "partial" => Ok(PrivacyMode::Partial),
            other => Err(AppError::configuration(format!(
                "Unknown privacy mode '{}'",
                other
            ))
            .with_action("Use one of: none, full, partial, partial:<fields>")),
        }
    }
}

/// Personal field subject to the privacy policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum PrivacyField {
    Name,
    Email,
    Phone,
    RemoteHost,
}

impl PrivacyField {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrivacyField::Name => "Name",
            PrivacyField::Email => "Email",
            PrivacyField::Phone => "Phone",
            PrivacyField::RemoteHost => "RemoteHost",
        }
    }
}

/// Parsed privacy policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivacyModeDescriptor {
    mode: PrivacyMode,
    fields: Vec<String>,
}

impl PrivacyModeDescriptor {
    /// Parse `none | full | partial | partial:f1,f2,...`
    ///
    /// The field list is only read for `partial`; entries are trimmed,
    /// blanks dropped and duplicates removed ignoring case, keeping the
    /// first spelling seen.
    pub fn create(raw: &str) -> AppResult<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::none());
        }

        let (mode_token, field_list) = match raw.split_once(':') {
            Some((mode, fields)) => (mode, Some(fields)),
            None => (raw, None),
        };

        let mode = PrivacyMode::parse(mode_token)?;

        let mut fields: Vec<String> = Vec::new();
        if mode == PrivacyMode::Partial {
            for field in field_list.unwrap_or_default().split(',') {
                let field = field.trim();
                if field.is_empty() || fields.iter().any(|f| f.eq_ignore_ascii_case(field)) {
                    continue;
                }
                fields.push(field.to_string());
            }
        }

        Ok(Self { mode, fields })
    }

    pub fn none() -> Self {
        Self {
            mode: PrivacyMode::None,
            fields: Vec::new(),
        }
    }

    pub fn mode(&self) -> PrivacyMode {
        self.mode
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.eq_ignore_ascii_case(name.trim()))
    }

    /// Whether `field` may leave the bridge unmasked
    pub fn discloses(&self, field: PrivacyField) -> bool {
        match self.mode {
            PrivacyMode::None => true,
            PrivacyMode::Full => false,
            PrivacyMode::Partial => self.has_field(field.as_str()),
        }
    }

    /// Value for outbound payloads: dropped when not disclosed
    pub fn filter<T>(&self, field: PrivacyField, value: Option<T>) -> Option<T> {
        value.filter(|_| self.discloses(field))
    }

    /// Value for log lines: replaced by a fixed mask when not disclosed
    pub fn mask<'a>(&self, field: PrivacyField, value: &'a str) -> Cow<'a, str> {
        if value.is_empty() || self.discloses(field) {
            Cow::Borrowed(value)
        } else {
            Cow::Borrowed(MASK)
        }
    }
}

impl Default for PrivacyModeDescriptor {
    fn default() -> Self {
        Self::none()
    }
}
