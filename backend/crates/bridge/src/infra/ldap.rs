//! LDAP directory adapter
//!
//! Implements [`Directory`] with `ldap3`. Every call opens its own
//! connection, binds, does its work and unbinds; the bridge handles few
//! enough logins that pooling is not worth the stale-connection handling.
//!
//! Referral chasing follows one hop: referrals returned by the first server
//! are searched on the referred server with the same bind credential.

use std::sync::Arc;
use std::time::Duration;

use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry, SearchResult};
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::application::config::RunOptions;
use crate::domain::entity::directory_entry::DirectoryEntry;
use crate::domain::repository::Directory;
use crate::domain::value_object::directory_credential::{DirectoryCredential, DirectoryQuery};
use crate::error::BridgeResult;

// https://www.rfc-editor.org/rfc/rfc4511#appendix-A
const RC_SUCCESS: u32 = 0;
const RC_SIZE_LIMIT_EXCEEDED: u32 = 4;
const RC_REFERRAL: u32 = 10;
const RC_NO_SUCH_OBJECT: u32 = 32;

const LDAP_PORT: u16 = 389;
const GLOBAL_CATALOG_PORT: u16 = 3268;
const GLOBAL_CATALOG_TLS_PORT: u16 = 3269;

#[derive(Debug, Clone)]
pub struct LdapSettings {
    /// Server for ambient and explicit binds, `ldap://` or `ldaps://`
    pub url: String,
    pub timeout: Duration,
}

/// Resolved bind: server, user, password
struct BindTarget {
    url: String,
    user: String,
    password: SecretString,
}

pub struct LdapDirectory {
    settings: LdapSettings,
    run_options: Arc<RunOptions>,
}

impl LdapDirectory {
    pub fn new(settings: LdapSettings, run_options: Arc<RunOptions>) -> Self {
        Self {
            settings,
            run_options,
        }
    }

    /// The one place credential variants turn into a server and a bind
    fn bind_target(&self, credential: &DirectoryCredential) -> BindTarget {
        match credential {
            DirectoryCredential::Ambient => {
                // no override means an anonymous simple bind
                let (user, password) = self
                    .run_options
                    .ambient_credentials()
                    .unwrap_or_else(|| (String::new(), SecretString::from(String::new())));
                BindTarget {
                    url: self.settings.url.clone(),
                    user,
                    password,
                }
            }
            DirectoryCredential::Explicit { user, password } => BindTarget {
                url: self.settings.url.clone(),
                user: user.clone(),
                password: password.clone(),
            },
            DirectoryCredential::BasicOverUri {
                uri,
                user,
                password,
            } => BindTarget {
                url: uri.clone(),
                user: user.clone(),
                password: password.clone(),
            },
        }
    }

    async fn connect(&self, url: &str) -> BridgeResult<Ldap> {
        let settings = LdapConnSettings::new().set_conn_timeout(self.settings.timeout);
        let (conn, ldap) = LdapConnAsync::with_settings(settings, url).await?;

        let server = url.to_string();
        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                tracing::warn!(server = %server, error = %e, "LDAP connection error");
            }
        });

        Ok(ldap)
    }

    async fn open(&self, target: &BindTarget) -> BridgeResult<Ldap> {
        let mut ldap = self.connect(&target.url).await?;
        ldap.with_timeout(self.settings.timeout)
            .simple_bind(&target.user, target.password.expose_secret())
            .await?
            .success()?;
        Ok(ldap)
    }

    /// One search on an open connection; returns entries and referral URLs
    async fn search_on(
        &self,
        ldap: &mut Ldap,
        base_dn: &str,
        query: &DirectoryQuery,
    ) -> BridgeResult<(Vec<DirectoryEntry>, Vec<String>)> {
        let SearchResult(results, result) = ldap
            .with_timeout(self.settings.timeout)
            .search(base_dn, Scope::Subtree, &query.filter, query.attributes.clone())
            .await?;

        let mut referrals = Vec::new();
        match result.rc {
            RC_SUCCESS | RC_SIZE_LIMIT_EXCEEDED | RC_NO_SUCH_OBJECT => {}
            RC_REFERRAL => referrals.extend(result.refs.iter().cloned()),
            _ => {
                result.success()?;
            }
        }

        let mut entries = Vec::new();
        for entry in results {
            if entry.is_ref() {
                referrals.extend(ldap3::parse_refs(entry.0));
            } else if !entry.is_intermediate() {
                let entry = SearchEntry::construct(entry);
                entries.push(DirectoryEntry::new(entry.dn, entry.attrs));
            }
        }

        Ok((entries, referrals))
    }

    async fn chase(
        &self,
        target: &BindTarget,
        query: &DirectoryQuery,
        referrals: Vec<String>,
    ) -> BridgeResult<Vec<DirectoryEntry>> {
        let mut entries = Vec::new();
        let secure = target.url.to_ascii_lowercase().starts_with("ldaps://");

        for referral in referrals {
            let Some((server, base_dn)) = parse_referral(&referral, secure) else {
                tracing::debug!(referral = %referral, "Ignoring unparseable referral");
                continue;
            };
            let base_dn = base_dn.unwrap_or_else(|| query.base_dn.clone());
            tracing::debug!(server = %server, base_dn = %base_dn, "Chasing referral");

            let referred = BindTarget {
                url: server,
                user: target.user.clone(),
                password: target.password.clone(),
            };
            let mut ldap = self.open(&referred).await?;
            let (found, _) = self.search_on(&mut ldap, &base_dn, query).await?;
            close(ldap).await;

            entries.extend(found);
        }

        Ok(entries)
    }
}

impl Directory for LdapDirectory {
    async fn bind(&self, credential: &DirectoryCredential) -> BridgeResult<()> {
        let target = self.bind_target(credential);
        let ldap = self.open(&target).await?;
        close(ldap).await;
        Ok(())
    }

    async fn search(
        &self,
        credential: &DirectoryCredential,
        query: &DirectoryQuery,
    ) -> BridgeResult<Vec<DirectoryEntry>> {
        let target = self.bind_target(credential);
        let mut ldap = self.open(&target).await?;
        let searched = self.search_on(&mut ldap, &query.base_dn, query).await;
        close(ldap).await;

        let (mut entries, referrals) = searched?;
        if query.chase_referrals && !referrals.is_empty() {
            entries.extend(self.chase(&target, query, referrals).await?);
        }
        Ok(entries)
    }
}

async fn close(mut ldap: Ldap) {
    if let Err(e) = ldap.unbind().await {
        tracing::debug!(error = %e, "LDAP unbind failed");
    }
}

/// Split `ldap://host[:port]/<dn>[?...]` into server URL and base DN
///
/// The scheme is upgraded to `ldaps` when the original bind was secure,
/// moving the well-known plain ports to their TLS counterparts.
fn parse_referral(referral: &str, secure: bool) -> Option<(String, Option<String>)> {
    let url = Url::parse(referral.trim()).ok()?;
    let plain = match url.scheme() {
        "ldap" => true,
        "ldaps" => false,
        _ => return None,
    };
    let host = url.host_str().filter(|h| !h.is_empty())?;

    let (scheme, port) = if secure && plain {
        ("ldaps", tls_port(url.port()))
    } else {
        (url.scheme(), url.port())
    };
    let server = match port {
        Some(port) => format!("{}://{}:{}", scheme, host, port),
        None => format!("{}://{}", scheme, host),
    };

    let base_dn = urlencoding::decode(url.path().trim_start_matches('/'))
        .ok()
        .map(|dn| dn.into_owned())
        .filter(|dn| !dn.is_empty());

    Some((server, base_dn))
}

/// `None` falls back to the ldaps default, 636
fn tls_port(port: Option<u16>) -> Option<u16> {
    match port {
        Some(LDAP_PORT) => None,
        Some(GLOBAL_CATALOG_PORT) => Some(GLOBAL_CATALOG_TLS_PORT),
        other => other,
    }
}
