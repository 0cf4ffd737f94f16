//! Directory Credential and Query
//!
//! How to authenticate to the directory and what to ask it.

use secrecy::SecretString;

/// Credential used to bind to the directory
#[derive(Debug, Clone)]
pub enum DirectoryCredential {
    /// Process identity; run options may override the user and password
    Ambient,
    /// User and password against the configured server
    Explicit { user: String, password: SecretString },
    /// User and password against a specific `ldap://` or `ldaps://` URI
    BasicOverUri {
        uri: String,
        user: String,
        password: SecretString,
    },
}

impl DirectoryCredential {
    pub fn explicit(user: impl Into<String>, password: SecretString) -> Self {
        DirectoryCredential::Explicit {
            user: user.into(),
            password,
        }
    }

    /// Bind user, if the credential names one
    pub fn user(&self) -> Option<&str> {
        match self {
            DirectoryCredential::Ambient => None,
            DirectoryCredential::Explicit { user, .. }
            | DirectoryCredential::BasicOverUri { user, .. } => Some(user),
        }
    }

    /// Whether the bind goes over TLS from the start
    pub fn is_secure(&self) -> bool {
        matches!(
            self,
            DirectoryCredential::BasicOverUri { uri, .. }
                if uri.trim().to_ascii_lowercase().starts_with("ldaps://")
        )
    }
}

/// Subtree search request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryQuery {
    pub base_dn: String,
    pub filter: String,
    pub chase_referrals: bool,
    pub attributes: Vec<String>,
}

impl DirectoryQuery {
    pub fn new(base_dn: impl Into<String>, filter: impl Into<String>) -> Self {
        Self {
            base_dn: base_dn.into(),
            filter: filter.into(),
            chase_referrals: false,
            attributes: Vec::new(),
        }
    }

    pub fn with_attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = attributes.into_iter().map(Into::into).collect();
        self
    }

    /// Same query with referral chasing switched on
    pub fn chasing(&self) -> Self {
        Self {
            chase_referrals: true,
            ..self.clone()
        }
    }
}
