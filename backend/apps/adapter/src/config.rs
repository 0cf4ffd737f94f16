//! Environment configuration
//!
//! Every setting comes from a `BRIDGE_*` variable; `.env` is loaded first
//! by `main`. Client policies arrive as one JSON array in `BRIDGE_CLIENTS`.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, bail};
use bridge::application::config::ClientSettings;
use bridge::{BridgeConfig, ClientConfig, ClientRegistry, RunOptions};

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:31812";

/// Global bridge settings, defaults for anything unset
pub fn bridge_config<E>(env: E) -> anyhow::Result<BridgeConfig>
where
    E: Fn(&str) -> Option<String>,
{
    let defaults = BridgeConfig::default();

    Ok(BridgeConfig {
        api_url: non_blank(&env, "BRIDGE_API_URL").unwrap_or(defaults.api_url),
        api_timeout: seconds(&env, "BRIDGE_API_TIMEOUT_SECS")?.unwrap_or(defaults.api_timeout),
        api_proxy: non_blank(&env, "BRIDGE_API_PROXY"),
        directory_url: non_blank(&env, "BRIDGE_DIRECTORY_URL").unwrap_or(defaults.directory_url),
        directory_timeout: seconds(&env, "BRIDGE_DIRECTORY_TIMEOUT_SECS")?
            .unwrap_or(defaults.directory_timeout),
        purge_interval: seconds(&env, "BRIDGE_PURGE_INTERVAL_SECS")?
            .unwrap_or(defaults.purge_interval),
    })
}

/// Ambient bind override
pub fn run_options<E>(env: E) -> RunOptions
where
    E: Fn(&str) -> Option<String>,
{
    let mut options = RunOptions::new();
    if let Some(user) = non_blank(&env, "BRIDGE_AMBIENT_USER") {
        options = options.with(RunOptions::AMBIENT_USER, user);
    }
    if let Some(password) = env("BRIDGE_AMBIENT_PASSWORD") {
        options = options.with(RunOptions::AMBIENT_PASSWORD, password);
    }
    options
}

pub fn listen_addr<E>(env: E) -> anyhow::Result<SocketAddr>
where
    E: Fn(&str) -> Option<String>,
{
    let raw = non_blank(&env, "BRIDGE_LISTEN_ADDR").unwrap_or_else(|| DEFAULT_LISTEN_ADDR.into());
    raw.parse()
        .with_context(|| format!("BRIDGE_LISTEN_ADDR '{}' is not a socket address", raw))
}

/// Parse `BRIDGE_CLIENTS` and activate every valid client
///
/// Malformed JSON is fatal. A client that fails validation is logged and
/// left out; the others still start.
pub fn client_registry<E>(env: E) -> anyhow::Result<ClientRegistry>
where
    E: Fn(&str) -> Option<String>,
{
    let Some(raw) = non_blank(&env, "BRIDGE_CLIENTS") else {
        return Ok(ClientRegistry::new());
    };
    let settings: Vec<ClientSettings> = serde_json::from_str(&raw)
        .context("BRIDGE_CLIENTS must be a JSON array of client settings")?;
    Ok(activate(settings))
}

pub fn activate(settings: Vec<ClientSettings>) -> ClientRegistry {
    let mut registry = ClientRegistry::new();

    for client in settings {
        let name = client.name.clone();
        match ClientConfig::from_settings(client) {
            Ok(client) => {
                tracing::info!(
                    client = %client.name,
                    first_factor = %client.first_factor,
                    pre_authn = ?client.pre_authn.mode(),
                    privacy = ?client.privacy.mode(),
                    "Client activated"
                );
                registry.insert(client);
            }
            Err(e) => {
                e.log();
                tracing::error!(client = %name, "Client configuration rejected; client stays inactive");
            }
        }
    }

    registry
}

fn non_blank<E>(env: &E, key: &str) -> Option<String>
where
    E: Fn(&str) -> Option<String>,
{
    env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn seconds<E>(env: &E, key: &str) -> anyhow::Result<Option<Duration>>
where
    E: Fn(&str) -> Option<String>,
{
    let Some(raw) = non_blank(env, key) else {
        return Ok(None);
    };
    let secs: u64 = raw
        .parse()
        .with_context(|| format!("{} must be a whole number of seconds", key))?;
    if secs == 0 {
        bail!("{} must be positive", key);
    }
    Ok(Some(Duration::from_secs(secs)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = bridge_config(env(&[])).unwrap();
        assert_eq!(config.api_url, BridgeConfig::default().api_url);
        assert_eq!(config.purge_interval, Duration::from_secs(60));
        assert_eq!(config.api_proxy, None);
        assert_eq!(
            listen_addr(env(&[])).unwrap(),
            DEFAULT_LISTEN_ADDR.parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    fn test_overrides() {
        let config = bridge_config(env(&[
            ("BRIDGE_API_URL", "https://mfa.example.net"),
            ("BRIDGE_API_TIMEOUT_SECS", "10"),
            ("BRIDGE_API_PROXY", " "),
            ("BRIDGE_DIRECTORY_URL", "ldaps://dc1.corp.local"),
        ]))
        .unwrap();
        assert_eq!(config.api_url, "https://mfa.example.net");
        assert_eq!(config.api_timeout, Duration::from_secs(10));
        assert_eq!(config.api_proxy, None);
        assert_eq!(config.directory_url, "ldaps://dc1.corp.local");
    }

    #[test]
    fn test_bad_seconds_rejected() {
        assert!(bridge_config(env(&[("BRIDGE_PURGE_INTERVAL_SECS", "0")])).is_err());
        assert!(bridge_config(env(&[("BRIDGE_API_TIMEOUT_SECS", "soon")])).is_err());
    }

    #[test]
    fn test_run_options_from_env() {
        let options = run_options(env(&[
            ("BRIDGE_AMBIENT_USER", "svc@corp.local"),
            ("BRIDGE_AMBIENT_PASSWORD", "pw"),
        ]));
        assert_eq!(options.get(RunOptions::AMBIENT_USER), Some("svc@corp.local"));
        assert!(options.ambient_credentials().is_some());

        assert!(run_options(env(&[])).ambient_credentials().is_none());
    }

    #[test]
    fn test_invalid_client_left_inactive() {
        let registry = client_registry(env(&[(
            "BRIDGE_CLIENTS",
            r#"[
                {"name": "vpn", "root-domain": "DC=corp,DC=local", "api-key": "k", "api-secret": "s"},
                {"name": "wifi", "privacy-mode": "sometimes", "first-factor": "none", "api-key": "k", "api-secret": "s"}
            ]"#,
        )]))
        .unwrap();

        assert_eq!(registry.len(), 1);
        assert!(registry.get("vpn").is_some());
        assert!(registry.get("wifi").is_none());
    }

    #[test]
    fn test_malformed_clients_json_is_fatal() {
        assert!(client_registry(env(&[("BRIDGE_CLIENTS", "{not json")])).is_err());
        assert!(client_registry(env(&[])).unwrap().is_empty());
    }
}
