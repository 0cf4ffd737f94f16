//! Identity Value Object
//!
//! A directory name together with the form it was written in. Comparison
//! is case-insensitive, matching how the directory compares attribute values.

use std::hash::{Hash, Hasher};

use derive_more::Display;
use kernel::error::app_error::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Form of a directory name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum IdentityKind {
    #[display("userPrincipalName")]
    UserPrincipalName,
    #[display("sAMAccountName")]
    SamAccountName,
    #[display("distinguishedName")]
    DistinguishedName,
}

impl IdentityKind {
    /// Directory attribute holding names of this kind
    pub fn attribute(&self) -> &'static str {
        match self {
            IdentityKind::UserPrincipalName => "userPrincipalName",
            IdentityKind::SamAccountName => "sAMAccountName",
            IdentityKind::DistinguishedName => "distinguishedName",
        }
    }

    /// Whether the name is unique across the whole forest
    pub fn is_forest_wide(&self) -> bool {
        !matches!(self, IdentityKind::SamAccountName)
    }
}

/// Directory identity
#[derive(Debug, Clone, Serialize, Deserialize, Display)]
#[display("{name}")]
pub struct Identity {
    kind: IdentityKind,
    name: String,
    /// NetBIOS domain from a `DOMAIN\user` login
    #[serde(default, skip_serializing_if = "Option::is_none")]
    domain_hint: Option<String>,
}

impl Identity {
    pub fn new(kind: IdentityKind, name: impl Into<String>) -> AppResult<Self> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(AppError::invalid_input("Identity name cannot be empty"));
        }
        Ok(Self {
            kind,
            name,
            domain_hint: None,
        })
    }

    pub fn distinguished_name(dn: impl Into<String>) -> AppResult<Self> {
        let identity = Self::new(IdentityKind::DistinguishedName, dn)?;
        if !looks_like_dn(&identity.name) {
            return Err(AppError::invalid_input(format!(
                "'{}' is not a distinguished name",
                identity.name
            )));
        }
        Ok(identity)
    }

    /// Classify a login name as typed by the user
    ///
    /// - `CN=...,DC=...` is a distinguished name
    /// - `DOMAIN\user` is an account name with a NetBIOS hint
    /// - `user@suffix` is a user principal name
    /// - anything else is a bare account name
    pub fn parse(raw: &str) -> AppResult<Self> {
        let raw = raw.trim();

        if looks_like_dn(raw) {
            return Self::new(IdentityKind::DistinguishedName, raw);
        }

        if let Some((domain, user)) = raw.split_once('\\') {
            let mut identity = Self::new(IdentityKind::SamAccountName, user)?;
            let domain = domain.trim();
            if !domain.is_empty() {
                identity.domain_hint = Some(domain.to_string());
            }
            return Ok(identity);
        }

        if let Some((local, suffix)) = raw.rsplit_once('@') {
            if local.is_empty() || suffix.is_empty() {
                return Err(AppError::invalid_input(format!(
                    "'{}' is not a valid user principal name",
                    raw
                )));
            }
            return Self::new(IdentityKind::UserPrincipalName, raw);
        }

        Self::new(IdentityKind::SamAccountName, raw)
    }

    pub fn kind(&self) -> IdentityKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn domain_hint(&self) -> Option<&str> {
        self.domain_hint.as_deref()
    }

    /// Directory attribute to match this identity against
    pub fn attribute(&self) -> &'static str {
        self.kind.attribute()
    }

    /// Suffix after `@` for user principal names
    pub fn upn_suffix(&self) -> Option<&str> {
        match self.kind {
            IdentityKind::UserPrincipalName => self.name.rsplit_once('@').map(|(_, s)| s),
            _ => None,
        }
    }

    /// Case-insensitive comparison against a raw attribute value
    pub fn matches(&self, value: &str) -> bool {
        self.name.eq_ignore_ascii_case(value.trim())
    }

    /// Whether this distinguished name sits at or below `ancestor`
    pub fn is_within(&self, ancestor: &Identity) -> bool {
        if self.kind != IdentityKind::DistinguishedName
            || ancestor.kind != IdentityKind::DistinguishedName
        {
            return false;
        }
        let dn = normalize_dn(&self.name);
        let base = normalize_dn(&ancestor.name);
        dn == base || dn.ends_with(&format!(",{}", base))
    }

    /// DNS name spelled by the `DC=` components of a distinguished name
    pub fn dns_name(&self) -> Option<String> {
        if self.kind != IdentityKind::DistinguishedName {
            return None;
        }
        let labels: Vec<&str> = self
            .name
            .split(',')
            .filter_map(|rdn| {
                let (attr, value) = rdn.split_once('=')?;
                attr.trim()
                    .eq_ignore_ascii_case("dc")
                    .then(|| value.trim())
            })
            .collect();
        (!labels.is_empty()).then(|| labels.join(".").to_ascii_lowercase())
    }
}

impl PartialEq for Identity {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.name.eq_ignore_ascii_case(&other.name)
    }
}

impl Eq for Identity {}

impl Hash for Identity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.name.to_ascii_lowercase().hash(state);
    }
}

fn looks_like_dn(raw: &str) -> bool {
    let Some((attr, _)) = raw.split_once('=') else {
        return false;
    };
    !attr.is_empty() && attr.chars().all(|c| c.is_ascii_alphabetic()) && raw.contains(',')
}

fn normalize_dn(dn: &str) -> String {
    dn.split(',')
        .map(|rdn| rdn.trim().to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kinds() {
        let upn = Identity::parse("alice@corp.example.com").unwrap();
        assert_eq!(upn.kind(), IdentityKind::UserPrincipalName);
        assert_eq!(upn.upn_suffix(), Some("corp.example.com"));

        let sam = Identity::parse("CORP\\alice").unwrap();
        assert_eq!(sam.kind(), IdentityKind::SamAccountName);
        assert_eq!(sam.name(), "alice");
        assert_eq!(sam.domain_hint(), Some("CORP"));

        let bare = Identity::parse("alice").unwrap();
        assert_eq!(bare.kind(), IdentityKind::SamAccountName);
        assert_eq!(bare.domain_hint(), None);

        let dn = Identity::parse("CN=Alice,OU=Staff,DC=corp,DC=example,DC=com").unwrap();
        assert_eq!(dn.kind(), IdentityKind::DistinguishedName);
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert!(Identity::parse("").is_err());
        assert!(Identity::parse("   ").is_err());
        assert!(Identity::parse("CORP\\").is_err());
        assert!(Identity::parse("@corp.com").is_err());
    }

    #[test]
    fn test_equality_is_case_insensitive() {
        let a = Identity::parse("Alice@Corp.com").unwrap();
        let b = Identity::parse("alice@corp.COM").unwrap();
        assert_eq!(a, b);
        assert!(a.matches("ALICE@CORP.COM"));

        let sam = Identity::parse("alice").unwrap();
        assert_ne!(a, sam);
    }

    #[test]
    fn test_attribute_mapping() {
        assert_eq!(
            Identity::parse("a@b.c").unwrap().attribute(),
            "userPrincipalName"
        );
        assert_eq!(Identity::parse("a").unwrap().attribute(), "sAMAccountName");
        assert_eq!(
            Identity::parse("CN=a,DC=b").unwrap().attribute(),
            "distinguishedName"
        );
    }

    #[test]
    fn test_is_within() {
        let user = Identity::distinguished_name("CN=Bob, OU=Staff,DC=emea,DC=corp,DC=com").unwrap();
        let emea = Identity::distinguished_name("DC=EMEA,DC=corp,DC=com").unwrap();
        let corp = Identity::distinguished_name("DC=corp,DC=com").unwrap();
        let apac = Identity::distinguished_name("DC=apac,DC=corp,DC=com").unwrap();

        assert!(user.is_within(&emea));
        assert!(user.is_within(&corp));
        assert!(!user.is_within(&apac));
        assert!(emea.is_within(&emea));
    }

    #[test]
    fn test_dns_name() {
        let dn = Identity::distinguished_name("DC=Corp,DC=Example,DC=com").unwrap();
        assert_eq!(dn.dns_name().as_deref(), Some("corp.example.com"));
        assert!(Identity::parse("alice").unwrap().dns_name().is_none());
    }

    #[test]
    fn test_distinguished_name_rejects_plain_names() {
        assert!(Identity::distinguished_name("corp.example.com").is_err());
    }
}
