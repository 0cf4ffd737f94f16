//! Forest Schema Entity
//!
//! Domain partitions of one directory forest, root domain first.
//! Built once per (client, root domain) and shared read-only.

use crate::domain::value_object::identity::{Identity, IdentityKind};

/// One domain naming context of the forest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainPartition {
    pub base_dn: Identity,
    /// DNS name of the domain, lower case
    pub dns_root: String,
    pub netbios_name: Option<String>,
}

impl DomainPartition {
    pub fn new(base_dn: Identity, dns_root: Option<String>, netbios_name: Option<String>) -> Self {
        let dns_root = dns_root
            .filter(|d| !d.trim().is_empty())
            .or_else(|| base_dn.dns_name())
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        Self {
            base_dn,
            dns_root,
            netbios_name: netbios_name.filter(|n| !n.trim().is_empty()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForestSchema {
    root_domain: Identity,
    partitions: Vec<DomainPartition>,
    /// Alternative UPN suffixes registered on the forest
    upn_suffixes: Vec<String>,
}

impl ForestSchema {
    /// Build from partitions in loader order
    ///
    /// The root domain is moved to the front (added if missing) and
    /// duplicate base DNs are dropped.
    pub fn new(
        root_domain: Identity,
        partitions: Vec<DomainPartition>,
        upn_suffixes: Vec<String>,
    ) -> Self {
        let mut ordered: Vec<DomainPartition> = Vec::with_capacity(partitions.len() + 1);

        let root = partitions
            .iter()
            .find(|p| p.base_dn == root_domain)
            .cloned()
            .unwrap_or_else(|| DomainPartition::new(root_domain.clone(), None, None));
        ordered.push(root);

        for partition in partitions {
            if ordered.iter().all(|p| p.base_dn != partition.base_dn) {
                ordered.push(partition);
            }
        }

        Self {
            root_domain,
            partitions: ordered,
            upn_suffixes: upn_suffixes
                .into_iter()
                .map(|s| s.trim().to_ascii_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    /// Forest with only the root domain
    pub fn single_domain(root_domain: Identity) -> Self {
        Self::new(root_domain, Vec::new(), Vec::new())
    }

    pub fn root_domain(&self) -> &Identity {
        &self.root_domain
    }

    pub fn partitions(&self) -> &[DomainPartition] {
        &self.partitions
    }

    pub fn upn_suffixes(&self) -> &[String] {
        &self.upn_suffixes
    }

    /// All base DNs in loader order
    pub fn base_dns(&self) -> Vec<&Identity> {
        self.partitions.iter().map(|p| &p.base_dn).collect()
    }

    /// Base DNs to search for `identity`, most likely domain first
    ///
    /// The preferred domain is picked from the identity itself (UPN suffix,
    /// NetBIOS hint or DN containment); every other domain follows in
    /// loader order.
    pub fn candidate_base_dns(&self, identity: &Identity) -> Vec<Identity> {
        let preferred = self.preferred_partition(identity);

        let mut candidates = Vec::with_capacity(self.partitions.len());
        if let Some(index) = preferred {
            candidates.push(self.partitions[index].base_dn.clone());
        }
        for (index, partition) in self.partitions.iter().enumerate() {
            if Some(index) != preferred {
                candidates.push(partition.base_dn.clone());
            }
        }
        candidates
    }

    fn preferred_partition(&self, identity: &Identity) -> Option<usize> {
        match identity.kind() {
            IdentityKind::UserPrincipalName => {
                let suffix = identity.upn_suffix()?.to_ascii_lowercase();
                self.partitions
                    .iter()
                    .position(|p| p.dns_root == suffix)
                    .or_else(|| self.upn_suffixes.contains(&suffix).then_some(0))
            }
            IdentityKind::SamAccountName => {
                let hint = identity.domain_hint()?;
                self.partitions.iter().position(|p| {
                    p.netbios_name
                        .as_deref()
                        .is_some_and(|n| n.eq_ignore_ascii_case(hint))
                        || p.dns_root.eq_ignore_ascii_case(hint)
                })
            }
            IdentityKind::DistinguishedName => self
                .partitions
                .iter()
                .enumerate()
                .filter(|(_, p)| identity.is_within(&p.base_dn))
                // deepest naming context wins for nested child domains
                .max_by_key(|(_, p)| p.base_dn.name().len())
                .map(|(index, _)| index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dn(s: &str) -> Identity {
        Identity::distinguished_name(s).unwrap()
    }

    fn forest() -> ForestSchema {
        ForestSchema::new(
            dn("DC=corp,DC=com"),
            vec![
                DomainPartition::new(
                    dn("DC=emea,DC=corp,DC=com"),
                    Some("emea.corp.com".to_string()),
                    Some("EMEA".to_string()),
                ),
                DomainPartition::new(
                    dn("DC=corp,DC=com"),
                    Some("corp.com".to_string()),
                    Some("CORP".to_string()),
                ),
                DomainPartition::new(
                    dn("DC=apac,DC=corp,DC=com"),
                    Some("apac.corp.com".to_string()),
                    Some("APAC".to_string()),
                ),
            ],
            vec!["Corp.Example".to_string()],
        )
    }

    fn names(list: &[Identity]) -> Vec<&str> {
        list.iter().map(|i| i.name()).collect()
    }

    #[test]
    fn test_root_first_then_loader_order() {
        let schema = forest();
        let base: Vec<&str> = schema.base_dns().iter().map(|i| i.name()).collect();
        assert_eq!(
            base,
            vec!["DC=corp,DC=com", "DC=emea,DC=corp,DC=com", "DC=apac,DC=corp,DC=com"]
        );
    }

    #[test]
    fn test_single_domain_derives_dns_root() {
        let schema = ForestSchema::single_domain(dn("DC=corp,DC=local"));
        assert_eq!(schema.partitions().len(), 1);
        assert_eq!(schema.partitions()[0].dns_root, "corp.local");
    }

    #[test]
    fn test_upn_suffix_prefers_matching_domain() {
        let schema = forest();
        let id = Identity::parse("bob@APAC.corp.com").unwrap();
        assert_eq!(
            names(&schema.candidate_base_dns(&id)),
            vec!["DC=apac,DC=corp,DC=com", "DC=corp,DC=com", "DC=emea,DC=corp,DC=com"]
        );
    }

    #[test]
    fn test_alternative_upn_suffix_prefers_root() {
        let schema = forest();
        let id = Identity::parse("bob@corp.example").unwrap();
        assert_eq!(schema.candidate_base_dns(&id)[0].name(), "DC=corp,DC=com");
    }

    #[test]
    fn test_netbios_hint_prefers_domain() {
        let schema = forest();
        let id = Identity::parse("emea\\bob").unwrap();
        assert_eq!(
            names(&schema.candidate_base_dns(&id)),
            vec!["DC=emea,DC=corp,DC=com", "DC=corp,DC=com", "DC=apac,DC=corp,DC=com"]
        );
    }

    #[test]
    fn test_dn_prefers_deepest_containing_domain() {
        let schema = forest();
        let id = Identity::parse("CN=Bob,OU=Users,DC=apac,DC=corp,DC=com").unwrap();
        assert_eq!(schema.candidate_base_dns(&id)[0].name(), "DC=apac,DC=corp,DC=com");
    }

    #[test]
    fn test_bare_name_keeps_loader_order() {
        let schema = forest();
        let id = Identity::parse("bob").unwrap();
        assert_eq!(
            names(&schema.candidate_base_dns(&id)),
            vec!["DC=corp,DC=com", "DC=emea,DC=corp,DC=com", "DC=apac,DC=corp,DC=com"]
        );
    }
}
