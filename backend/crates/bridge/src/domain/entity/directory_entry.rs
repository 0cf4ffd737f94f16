//! Directory Entry Entity
//!
//! A search result with attribute names folded to lower case.

use std::collections::HashMap;

use crate::domain::value_object::identity::Identity;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    dn: String,
    attrs: HashMap<String, Vec<String>>,
}

impl DirectoryEntry {
    pub fn new<I, K>(dn: impl Into<String>, attrs: I) -> Self
    where
        I: IntoIterator<Item = (K, Vec<String>)>,
        K: AsRef<str>,
    {
        let mut folded: HashMap<String, Vec<String>> = HashMap::new();
        for (name, values) in attrs {
            folded
                .entry(name.as_ref().to_ascii_lowercase())
                .or_default()
                .extend(values);
        }
        Self {
            dn: dn.into(),
            attrs: folded,
        }
    }

    pub fn dn(&self) -> &str {
        &self.dn
    }

    pub fn values(&self, attribute: &str) -> &[String] {
        self.attrs
            .get(&attribute.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// First non-blank value of `attribute`
    pub fn first(&self, attribute: &str) -> Option<&str> {
        self.values(attribute)
            .iter()
            .map(|v| v.trim())
            .find(|v| !v.is_empty())
    }

    /// First non-blank value across `attributes`, in the given order
    pub fn first_of<S: AsRef<str>>(&self, attributes: &[S]) -> Option<&str> {
        attributes.iter().find_map(|a| self.first(a.as_ref()))
    }

    /// Common names of the groups listed in `memberOf`
    pub fn group_names(&self) -> Vec<&str> {
        self.values("memberOf")
            .iter()
            .filter_map(|dn| {
                let first_rdn = dn.split(',').next()?;
                let (attr, value) = first_rdn.split_once('=')?;
                attr.trim().eq_ignore_ascii_case("cn").then(|| value.trim())
            })
            .collect()
    }

    /// Direct membership in any of `groups`, compared by common name
    pub fn is_member_of_any<S: AsRef<str>>(&self, groups: &[S]) -> bool {
        let names = self.group_names();
        groups.iter().any(|group| {
            names
                .iter()
                .any(|name| name.eq_ignore_ascii_case(group.as_ref().trim()))
        })
    }

    /// The entry's own distinguished name as an identity
    pub fn identity(&self) -> Option<Identity> {
        Identity::distinguished_name(&self.dn).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> DirectoryEntry {
        DirectoryEntry::new(
            "CN=Alice,OU=Staff,DC=corp,DC=local",
            [
                ("displayName", vec!["Alice Liddell".to_string()]),
                ("mail", vec!["alice@corp.local".to_string()]),
                ("mobile", vec!["  ".to_string()]),
                ("telephoneNumber", vec!["+1 555 0100".to_string()]),
                (
                    "memberOf",
                    vec![
                        "CN=VPN Users,OU=Groups,DC=corp,DC=local".to_string(),
                        "CN=MFA-Exempt,OU=Groups,DC=corp,DC=local".to_string(),
                    ],
                ),
            ],
        )
    }

    #[test]
    fn test_attribute_lookup_ignores_case() {
        let entry = alice();
        assert_eq!(entry.first("DISPLAYNAME"), Some("Alice Liddell"));
        assert_eq!(entry.first("Mail"), Some("alice@corp.local"));
        assert!(entry.values("unknown").is_empty());
    }

    #[test]
    fn test_first_of_skips_blank_values() {
        let entry = alice();
        assert_eq!(
            entry.first_of(&["mobile", "telephoneNumber"]),
            Some("+1 555 0100")
        );
    }

    #[test]
    fn test_group_membership() {
        let entry = alice();
        assert_eq!(entry.group_names(), vec!["VPN Users", "MFA-Exempt"]);
        assert!(entry.is_member_of_any(&["vpn users"]));
        assert!(entry.is_member_of_any(&["Admins", "mfa-exempt"]));
        assert!(!entry.is_member_of_any(&["Admins"]));
        assert!(!entry.is_member_of_any::<&str>(&[]));
    }

    #[test]
    fn test_identity() {
        let entry = alice();
        let id = entry.identity().unwrap();
        assert!(id.matches("cn=alice,ou=staff,dc=corp,dc=local"));
    }
}
