//! Identity Resolver
//!
//! Finds a user's directory entry across the domains of a forest.
//! Each candidate base DN gets a plain query, then the same query with
//! referral chasing; the first hit anywhere ends the walk.

use std::sync::Arc;

use crate::application::forest_cache::ForestCache;
use crate::application::schema_loader::ForestSchemaLoader;
use crate::domain::entity::{directory_entry::DirectoryEntry, forest_schema::ForestSchema};
use crate::domain::repository::Directory;
use crate::domain::value_object::{
    directory_credential::{DirectoryCredential, DirectoryQuery},
    identity::Identity,
};
use crate::error::BridgeResult;

/// Entry found and the base DN it was found under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryMatch {
    pub entry: DirectoryEntry,
    pub base_dn: Identity,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(DirectoryMatch),
    /// Every candidate searched in both modes without a hit
    NotFound { attempted: Vec<Identity> },
}

/// Which forest to search, and as whom
#[derive(Debug, Clone, Copy)]
pub struct ForestScope<'a> {
    pub client_name: &'a str,
    pub root_domain: &'a Identity,
    pub credential: &'a DirectoryCredential,
}

pub struct IdentityResolver<D>
where
    D: Directory,
{
    directory: Arc<D>,
    cache: ForestCache,
}

impl<D> IdentityResolver<D>
where
    D: Directory + Send + Sync + 'static,
{
    pub fn new(directory: Arc<D>, cache: ForestCache) -> Self {
        Self { directory, cache }
    }

    /// `(&(objectClass=user)(<attribute>=<escaped value>))`
    pub fn user_filter(identity: &Identity) -> String {
        format!(
            "(&(objectClass=user)({}={}))",
            identity.attribute(),
            ldap3::ldap_escape(identity.name())
        )
    }

    /// Forest schema for `scope`, loaded through the cache
    pub async fn forest(&self, scope: ForestScope<'_>) -> BridgeResult<Arc<ForestSchema>> {
        let loader = ForestSchemaLoader::new(self.directory.clone(), scope.credential.clone());
        let root = scope.root_domain.clone();
        self.cache
            .get(scope.client_name, scope.root_domain, move || loader.load(root))
            .await
    }

    pub async fn find_in_forest(
        &self,
        scope: ForestScope<'_>,
        identity: &Identity,
        attributes: &[String],
    ) -> BridgeResult<Resolution> {
        let schema = self.forest(scope).await?;

        let candidates = schema.candidate_base_dns(identity);
        let filter = Self::user_filter(identity);

        for base_dn in &candidates {
            let plain = DirectoryQuery::new(base_dn.name(), &filter)
                .with_attributes(attributes.iter().cloned());

            for query in [plain.clone(), plain.chasing()] {
                let entries = self.directory.search(scope.credential, &query).await?;
                tracing::debug!(
                    base_dn = %base_dn,
                    chase_referrals = query.chase_referrals,
                    entries = entries.len(),
                    "Identity lookup"
                );

                if let Some(entry) = entries.into_iter().next() {
                    return Ok(Resolution::Found(DirectoryMatch {
                        entry,
                        base_dn: base_dn.clone(),
                    }));
                }
            }
        }

        Ok(Resolution::NotFound {
            attempted: candidates,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::forest_schema::DomainPartition;
    use crate::error::BridgeError;
    use kernel::error::app_error::AppError;
    use std::sync::Mutex;

    /// Returns an entry only for the configured (base DN, chase) pair
    struct RecordingDirectory {
        hit: Option<(String, bool)>,
        fail: bool,
        queries: Mutex<Vec<(String, bool)>>,
    }

    impl RecordingDirectory {
        fn new(hit: Option<(&str, bool)>) -> Self {
            Self {
                hit: hit.map(|(dn, chase)| (dn.to_string(), chase)),
                fail: false,
                queries: Mutex::new(Vec::new()),
            }
        }

        fn trace(&self) -> Vec<(String, bool)> {
            self.queries.lock().unwrap().clone()
        }
    }

    impl Directory for RecordingDirectory {
        async fn bind(&self, _credential: &DirectoryCredential) -> BridgeResult<()> {
            Ok(())
        }

        async fn search(
            &self,
            _credential: &DirectoryCredential,
            query: &DirectoryQuery,
        ) -> BridgeResult<Vec<DirectoryEntry>> {
            self.queries
                .lock()
                .unwrap()
                .push((query.base_dn.clone(), query.chase_referrals));
            if self.fail {
                return Err(BridgeError::Directory(AppError::upstream("unreachable")));
            }
            match &self.hit {
                Some((dn, chase)) if *dn == query.base_dn && *chase == query.chase_referrals => {
                    Ok(vec![DirectoryEntry::new(
                        format!("CN=Bob,{}", dn),
                        [("mail", vec!["bob@corp.com".to_string()])],
                    )])
                }
                _ => Ok(Vec::new()),
            }
        }
    }

    const D1: &str = "DC=corp,DC=com";
    const D2: &str = "DC=emea,DC=corp,DC=com";

    fn dn(s: &str) -> Identity {
        Identity::distinguished_name(s).unwrap()
    }

    async fn warmed_cache() -> ForestCache {
        let cache = ForestCache::new();
        cache
            .get("vpn", &dn(D1), || async {
                Ok(ForestSchema::new(
                    dn(D1),
                    vec![DomainPartition::new(dn(D2), None, Some("EMEA".into()))],
                    Vec::new(),
                ))
            })
            .await
            .unwrap();
        cache
    }

    async fn resolve(directory: Arc<RecordingDirectory>, login: &str) -> BridgeResult<Resolution> {
        let resolver = IdentityResolver::new(directory, warmed_cache().await);
        let root = dn(D1);
        let credential = DirectoryCredential::Ambient;
        resolver
            .find_in_forest(
                ForestScope {
                    client_name: "vpn",
                    root_domain: &root,
                    credential: &credential,
                },
                &Identity::parse(login).unwrap(),
                &["mail".to_string()],
            )
            .await
    }

    #[test]
    fn test_user_filter_escapes_value() {
        let id = Identity::parse("bob*)(cn=*").unwrap();
        assert_eq!(
            IdentityResolver::<RecordingDirectory>::user_filter(&id),
            "(&(objectClass=user)(sAMAccountName=bob\\2a\\29\\28cn=\\2a))"
        );
    }

    #[tokio::test]
    async fn test_match_under_second_domain_with_chasing() {
        let directory = Arc::new(RecordingDirectory::new(Some((D2, true))));
        let resolution = resolve(directory.clone(), "bob").await.unwrap();

        assert_eq!(
            directory.trace(),
            vec![
                (D1.to_string(), false),
                (D1.to_string(), true),
                (D2.to_string(), false),
                (D2.to_string(), true),
            ]
        );
        match resolution {
            Resolution::Found(m) => {
                assert_eq!(m.base_dn, dn(D2));
                assert_eq!(m.entry.first("mail"), Some("bob@corp.com"));
            }
            other => panic!("expected a match, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_plain_hit_skips_chasing() {
        let directory = Arc::new(RecordingDirectory::new(Some((D1, false))));
        let resolution = resolve(directory.clone(), "bob").await.unwrap();

        assert_eq!(directory.trace(), vec![(D1.to_string(), false)]);
        assert!(matches!(resolution, Resolution::Found(m) if m.base_dn == dn(D1)));
    }

    #[tokio::test]
    async fn test_not_found_after_both_modes_everywhere() {
        let directory = Arc::new(RecordingDirectory::new(None));
        let resolution = resolve(directory.clone(), "bob").await.unwrap();

        assert_eq!(directory.trace().len(), 4);
        assert_eq!(
            resolution,
            Resolution::NotFound {
                attempted: vec![dn(D1), dn(D2)]
            }
        );
    }

    #[tokio::test]
    async fn test_netbios_hint_searches_hinted_domain_first() {
        let directory = Arc::new(RecordingDirectory::new(Some((D2, false))));
        resolve(directory.clone(), "EMEA\\bob").await.unwrap();
        assert_eq!(directory.trace(), vec![(D2.to_string(), false)]);
    }

    #[tokio::test]
    async fn test_directory_failure_is_not_not_found() {
        let directory = Arc::new(RecordingDirectory {
            fail: true,
            ..RecordingDirectory::new(None)
        });
        let err = resolve(directory.clone(), "bob").await.unwrap_err();
        assert!(matches!(err, BridgeError::Directory(_)));
        assert_eq!(directory.trace().len(), 1);
    }
}
