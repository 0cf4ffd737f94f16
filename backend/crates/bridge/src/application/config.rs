//! Application Configuration
//!
//! Global bridge settings plus per-client policy. Raw client settings are
//! deserialized as-is and validated into [`ClientConfig`]; a client whose
//! settings fail validation never becomes active.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use derive_more::Display;
use platform::http::HttpClientConfig;
use secrecy::SecretString;
use serde::Deserialize;

use crate::domain::entity::second_factor::ApiCredential;
use crate::domain::value_object::{
    directory_credential::DirectoryCredential,
    identity::Identity,
    pre_authn_mode::{PreAuthnModeDescriptor, PreAuthnSettings},
    privacy_mode::PrivacyModeDescriptor,
};
use crate::error::{BridgeError, BridgeResult};

/// Bridge-wide configuration
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Base URL of the second-factor API
    pub api_url: String,
    /// Timeout for each second-factor API call
    pub api_timeout: Duration,
    /// Optional outbound proxy for the second-factor API
    pub api_proxy: Option<String>,
    /// Directory server URL used for ambient and explicit binds
    pub directory_url: String,
    /// Timeout for each directory operation
    pub directory_timeout: Duration,
    /// How often expired challenges are purged
    pub purge_interval: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8080".to_string(),
            api_timeout: Duration::from_secs(65),
            api_proxy: None,
            directory_url: "ldap://localhost:389".to_string(),
            directory_timeout: Duration::from_secs(30),
            purge_interval: Duration::from_secs(60),
        }
    }
}

impl BridgeConfig {
    /// Settings for the shared outbound HTTP client
    pub fn http_client_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            proxy: self.api_proxy.clone(),
            ..HttpClientConfig::with_timeout(self.api_timeout)
        }
    }
}

/// Where the first factor is checked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum FirstFactor {
    #[display("active_directory")]
    ActiveDirectory,
    #[display("none")]
    None,
}

impl FirstFactor {
    fn parse(raw: &str) -> BridgeResult<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "active_directory" | "activedirectory" | "ad" => Ok(FirstFactor::ActiveDirectory),
            "none" | "" => Ok(FirstFactor::None),
            other => Err(BridgeError::Configuration(format!(
                "Unknown first factor source '{}'",
                other
            ))),
        }
    }
}

/// Raw per-client settings as they appear in configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ClientSettings {
    pub name: String,
    pub first_factor: String,
    /// Root domain DN, e.g. `DC=corp,DC=local`
    pub root_domain: Option<String>,
    pub directory_uri: Option<String>,
    pub directory_user: Option<String>,
    pub directory_password: Option<String>,
    pub access_groups: Vec<String>,
    pub second_factor_groups: Vec<String>,
    pub bypass_groups: Vec<String>,
    pub phone_attributes: Vec<String>,
    pub pre_authn_mode: String,
    pub otp_code_length: usize,
    pub privacy_mode: String,
    pub api_key: String,
    pub api_secret: String,
    pub sign_up_groups: Vec<String>,
    pub bypass_second_factor_when_api_unreachable: bool,
    pub challenge_ttl_secs: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            name: String::new(),
            first_factor: "active_directory".to_string(),
            root_domain: None,
            directory_uri: None,
            directory_user: None,
            directory_password: None,
            access_groups: Vec::new(),
            second_factor_groups: Vec::new(),
            bypass_groups: Vec::new(),
            phone_attributes: Vec::new(),
            pre_authn_mode: String::new(),
            otp_code_length: PreAuthnSettings::default().otp_code_length,
            privacy_mode: String::new(),
            api_key: String::new(),
            api_secret: String::new(),
            sign_up_groups: Vec::new(),
            bypass_second_factor_when_api_unreachable: false,
            challenge_ttl_secs: ClientConfig::DEFAULT_CHALLENGE_TTL_SECS,
        }
    }
}

/// Validated per-client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub name: String,
    pub first_factor: FirstFactor,
    pub root_domain: Option<Identity>,
    pub directory_credential: DirectoryCredential,
    pub access_groups: Vec<String>,
    pub second_factor_groups: Vec<String>,
    pub bypass_groups: Vec<String>,
    pub phone_attributes: Vec<String>,
    pub pre_authn: PreAuthnModeDescriptor,
    pub privacy: PrivacyModeDescriptor,
    pub api_credential: ApiCredential,
    pub sign_up_groups: Vec<String>,
    pub bypass_when_api_unreachable: bool,
    pub challenge_ttl: chrono::Duration,
}

impl ClientConfig {
    pub const DEFAULT_CHALLENGE_TTL_SECS: u64 = 300;
    /// One day
    pub const MAX_CHALLENGE_TTL_SECS: u64 = 86_400;
    pub const DEFAULT_PHONE_ATTRIBUTES: &'static [&'static str] = &["mobile", "telephoneNumber"];

    /// Validate raw settings
    pub fn from_settings(settings: ClientSettings) -> BridgeResult<Self> {
        let name = settings.name.trim().to_string();
        if name.is_empty() {
            return Err(BridgeError::Configuration("Client name is required".into()));
        }

        let first_factor = FirstFactor::parse(&settings.first_factor)?;

        let root_domain = settings
            .root_domain
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(Identity::distinguished_name)
            .transpose()
            .map_err(|e| {
                BridgeError::Configuration(format!("Client '{}': {}", name, e.message()))
            })?;
        if first_factor == FirstFactor::ActiveDirectory && root_domain.is_none() {
            return Err(BridgeError::Configuration(format!(
                "Client '{}': root domain is required for directory first factor",
                name
            )));
        }

        let directory_credential = directory_credential(&name, &settings)?;

        let pre_authn = PreAuthnModeDescriptor::create(
            &settings.pre_authn_mode,
            PreAuthnSettings {
                otp_code_length: settings.otp_code_length,
            },
        )?;
        let privacy = PrivacyModeDescriptor::create(&settings.privacy_mode)?;

        if settings.api_key.trim().is_empty() || settings.api_secret.is_empty() {
            return Err(BridgeError::Configuration(format!(
                "Client '{}': API key and secret are required",
                name
            )));
        }

        if !(1..=Self::MAX_CHALLENGE_TTL_SECS).contains(&settings.challenge_ttl_secs) {
            return Err(BridgeError::Configuration(format!(
                "Client '{}': challenge TTL must be between 1 and {} seconds",
                name,
                Self::MAX_CHALLENGE_TTL_SECS
            )));
        }
        let challenge_ttl = i64::try_from(settings.challenge_ttl_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .ok_or_else(|| {
                BridgeError::Configuration(format!("Client '{}': challenge TTL too large", name))
            })?;

        let phone_attributes = if settings.phone_attributes.is_empty() {
            Self::DEFAULT_PHONE_ATTRIBUTES
                .iter()
                .map(|a| a.to_string())
                .collect()
        } else {
            trimmed(settings.phone_attributes)
        };

        Ok(Self {
            name,
            first_factor,
            root_domain,
            directory_credential,
            access_groups: trimmed(settings.access_groups),
            second_factor_groups: trimmed(settings.second_factor_groups),
            bypass_groups: trimmed(settings.bypass_groups),
            phone_attributes,
            pre_authn,
            privacy,
            api_credential: ApiCredential {
                key: settings.api_key.trim().to_string(),
                secret: SecretString::from(settings.api_secret),
            },
            sign_up_groups: trimmed(settings.sign_up_groups),
            bypass_when_api_unreachable: settings.bypass_second_factor_when_api_unreachable,
            challenge_ttl,
        })
    }

    /// Directory attributes needed for group policy and the API profile
    pub fn directory_attributes(&self) -> Vec<String> {
        let mut attrs: Vec<String> = ["displayName", "mail", "memberOf"]
            .iter()
            .map(|a| a.to_string())
            .collect();
        for attr in &self.phone_attributes {
            if !attrs.iter().any(|a| a.eq_ignore_ascii_case(attr)) {
                attrs.push(attr.clone());
            }
        }
        attrs
    }

    /// Whether group membership must be read from the directory
    pub fn uses_group_policy(&self) -> bool {
        !self.access_groups.is_empty()
            || !self.second_factor_groups.is_empty()
            || !self.bypass_groups.is_empty()
    }
}

fn directory_credential(name: &str, settings: &ClientSettings) -> BridgeResult<DirectoryCredential> {
    let user = settings
        .directory_user
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty());
    let password = || SecretString::from(settings.directory_password.clone().unwrap_or_default());

    match (settings.directory_uri.as_deref().map(str::trim), user) {
        (Some(uri), Some(user)) if !uri.is_empty() => {
            let scheme_ok = ["ldap://", "ldaps://"]
                .iter()
                .any(|s| uri.to_ascii_lowercase().starts_with(s));
            if !scheme_ok {
                return Err(BridgeError::Configuration(format!(
                    "Client '{}': directory URI must use ldap:// or ldaps://",
                    name
                )));
            }
            Ok(DirectoryCredential::BasicOverUri {
                uri: uri.to_string(),
                user: user.to_string(),
                password: password(),
            })
        }
        (Some(uri), None) if !uri.is_empty() => Err(BridgeError::Configuration(format!(
            "Client '{}': directory URI requires a directory user",
            name
        ))),
        (_, Some(user)) => Ok(DirectoryCredential::explicit(user, password())),
        (_, None) => Ok(DirectoryCredential::Ambient),
    }
}

fn trimmed(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

/// Process-level overrides
///
/// Only consulted for [`DirectoryCredential::Ambient`] binds.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    values: HashMap<String, String>,
}

impl RunOptions {
    pub const AMBIENT_USER: &'static str = "ambient-user";
    pub const AMBIENT_PASSWORD: &'static str = "ambient-password";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(&key.to_ascii_lowercase()).map(String::as_str)
    }

    /// Ambient bind override, when a user is set
    pub fn ambient_credentials(&self) -> Option<(String, SecretString)> {
        let user = self.get(Self::AMBIENT_USER)?.trim();
        if user.is_empty() {
            return None;
        }
        let password = self.get(Self::AMBIENT_PASSWORD).unwrap_or_default();
        Some((user.to_string(), SecretString::from(password.to_string())))
    }
}

/// Active clients by name
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: HashMap<String, Arc<ClientConfig>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a validated client; later registrations replace earlier ones
    pub fn insert(&mut self, client: ClientConfig) {
        self.clients
            .insert(client.name.to_ascii_lowercase(), Arc::new(client));
    }

    pub fn get(&self, name: &str) -> Option<Arc<ClientConfig>> {
        self.clients.get(&name.trim().to_ascii_lowercase()).cloned()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ClientConfig>> {
        self.clients.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_object::pre_authn_mode::PreAuthnMode;
    use crate::domain::value_object::privacy_mode::PrivacyMode;
    use secrecy::ExposeSecret;

    fn settings() -> ClientSettings {
        ClientSettings {
            name: "vpn".to_string(),
            root_domain: Some("DC=corp,DC=local".to_string()),
            api_key: "key".to_string(),
            api_secret: "secret".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let client = ClientConfig::from_settings(settings()).unwrap();
        assert_eq!(client.first_factor, FirstFactor::ActiveDirectory);
        assert_eq!(client.pre_authn.mode(), PreAuthnMode::None);
        assert_eq!(client.privacy.mode(), PrivacyMode::None);
        assert_eq!(client.challenge_ttl, chrono::Duration::minutes(5));
        assert_eq!(client.phone_attributes, vec!["mobile", "telephoneNumber"]);
        assert!(matches!(client.directory_credential, DirectoryCredential::Ambient));
        assert!(!client.bypass_when_api_unreachable);
    }

    #[test]
    fn test_deserialize_kebab_case() {
        let json = r#"{
            "name": "wifi",
            "first-factor": "none",
            "pre-authn-mode": "otp",
            "otp-code-length": 8,
            "privacy-mode": "partial:Email",
            "api-key": "k",
            "api-secret": "s",
            "bypass-second-factor-when-api-unreachable": true
        }"#;
        let raw: ClientSettings = serde_json::from_str(json).unwrap();
        let client = ClientConfig::from_settings(raw).unwrap();
        assert_eq!(client.first_factor, FirstFactor::None);
        assert_eq!(client.pre_authn.otp_code_length(), 8);
        assert!(client.privacy.has_field("email"));
        assert!(client.bypass_when_api_unreachable);
    }

    #[test]
    fn test_invalid_policies_are_rejected() {
        let bad_privacy = ClientSettings {
            privacy_mode: "bogus".to_string(),
            ..settings()
        };
        assert!(matches!(
            ClientConfig::from_settings(bad_privacy),
            Err(BridgeError::Configuration(_))
        ));

        let bad_length = ClientSettings {
            pre_authn_mode: "otp".to_string(),
            otp_code_length: 21,
            ..settings()
        };
        assert!(matches!(
            ClientConfig::from_settings(bad_length),
            Err(BridgeError::Configuration(_))
        ));
    }

    #[test]
    fn test_required_fields() {
        let no_name = ClientSettings {
            name: " ".to_string(),
            ..settings()
        };
        assert!(ClientConfig::from_settings(no_name).is_err());

        let no_root = ClientSettings {
            root_domain: None,
            ..settings()
        };
        assert!(ClientConfig::from_settings(no_root).is_err());

        let no_key = ClientSettings {
            api_key: String::new(),
            ..settings()
        };
        assert!(ClientConfig::from_settings(no_key).is_err());

        let zero_ttl = ClientSettings {
            challenge_ttl_secs: 0,
            ..settings()
        };
        assert!(ClientConfig::from_settings(zero_ttl).is_err());

        let bad_factor = ClientSettings {
            first_factor: "radius".to_string(),
            ..settings()
        };
        assert!(ClientConfig::from_settings(bad_factor).is_err());
    }

    #[test]
    fn test_challenge_ttl_bounds() {
        let one_day = ClientSettings {
            challenge_ttl_secs: ClientConfig::MAX_CHALLENGE_TTL_SECS,
            ..settings()
        };
        let client = ClientConfig::from_settings(one_day).unwrap();
        assert_eq!(client.challenge_ttl, chrono::Duration::days(1));

        let past_a_day = ClientSettings {
            challenge_ttl_secs: ClientConfig::MAX_CHALLENGE_TTL_SECS + 1,
            ..settings()
        };
        assert!(matches!(
            ClientConfig::from_settings(past_a_day),
            Err(BridgeError::Configuration(_))
        ));

        let huge = ClientSettings {
            challenge_ttl_secs: 9_000_000_000_000_000,
            ..settings()
        };
        assert!(matches!(
            ClientConfig::from_settings(huge),
            Err(BridgeError::Configuration(_))
        ));
    }

    #[test]
    fn test_directory_credential_variants() {
        let explicit = ClientSettings {
            directory_user: Some("svc-bridge".to_string()),
            directory_password: Some("pw".to_string()),
            ..settings()
        };
        let client = ClientConfig::from_settings(explicit).unwrap();
        assert_eq!(client.directory_credential.user(), Some("svc-bridge"));
        assert!(!client.directory_credential.is_secure());

        let over_uri = ClientSettings {
            directory_uri: Some("ldaps://dc1.corp.local".to_string()),
            directory_user: Some("svc-bridge".to_string()),
            ..settings()
        };
        let client = ClientConfig::from_settings(over_uri).unwrap();
        assert!(client.directory_credential.is_secure());

        let uri_without_user = ClientSettings {
            directory_uri: Some("ldaps://dc1.corp.local".to_string()),
            ..settings()
        };
        assert!(ClientConfig::from_settings(uri_without_user).is_err());

        let bad_scheme = ClientSettings {
            directory_uri: Some("http://dc1".to_string()),
            directory_user: Some("svc".to_string()),
            ..settings()
        };
        assert!(ClientConfig::from_settings(bad_scheme).is_err());
    }

    #[test]
    fn test_directory_attributes_deduplicated() {
        let client = ClientConfig::from_settings(ClientSettings {
            phone_attributes: vec!["Mail".to_string(), "ipPhone".to_string()],
            ..settings()
        })
        .unwrap();
        assert_eq!(
            client.directory_attributes(),
            vec!["displayName", "mail", "memberOf", "ipPhone"]
        );
    }

    #[test]
    fn test_run_options_ambient() {
        assert!(RunOptions::new().ambient_credentials().is_none());

        let opts = RunOptions::new()
            .with("Ambient-User", "CORP\\svc")
            .with(RunOptions::AMBIENT_PASSWORD, "pw");
        let (user, password) = opts.ambient_credentials().unwrap();
        assert_eq!(user, "CORP\\svc");
        assert_eq!(password.expose_secret(), "pw");
    }

    #[test]
    fn test_registry_lookup_ignores_case() {
        let mut registry = ClientRegistry::new();
        registry.insert(ClientConfig::from_settings(settings()).unwrap());
        assert!(registry.get("VPN").is_some());
        assert!(registry.get("wifi").is_none());
        assert_eq!(registry.len(), 1);
    }
}
