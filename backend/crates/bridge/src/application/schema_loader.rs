//! Forest Schema Loader
//!
//! Reads the domain cross-references under the forest's partitions
//! container. A directory without one (plain LDAP, or no read access) is
//! treated as a single-domain forest.

use std::sync::Arc;

use crate::domain::entity::forest_schema::{DomainPartition, ForestSchema};
use crate::domain::repository::Directory;
use crate::domain::value_object::{
    directory_credential::{DirectoryCredential, DirectoryQuery},
    identity::Identity,
};
use crate::error::BridgeResult;

/// crossRef entries flagged as domain naming contexts (systemFlags bit 0x2)
const DOMAIN_CROSS_REF_FILTER: &str =
    "(&(objectClass=crossRef)(systemFlags:1.2.840.113556.1.4.803:=2))";
const PARTITIONS_CONTAINER_FILTER: &str = "(objectClass=crossRefContainer)";

pub struct ForestSchemaLoader<D>
where
    D: Directory,
{
    directory: Arc<D>,
    credential: DirectoryCredential,
}

impl<D> ForestSchemaLoader<D>
where
    D: Directory + Send + Sync + 'static,
{
    pub fn new(directory: Arc<D>, credential: DirectoryCredential) -> Self {
        Self {
            directory,
            credential,
        }
    }

    /// `CN=Partitions,CN=Configuration,<root>`
    pub fn partitions_container(root_domain: &Identity) -> String {
        format!("CN=Partitions,CN=Configuration,{}", root_domain.name())
    }

    pub async fn load(self, root_domain: Identity) -> BridgeResult<ForestSchema> {
        let container = Self::partitions_container(&root_domain);

        let cross_refs = self
            .directory
            .search(
                &self.credential,
                &DirectoryQuery::new(&container, DOMAIN_CROSS_REF_FILTER).with_attributes([
                    "nCName",
                    "dnsRoot",
                    "nETBIOSName",
                ]),
            )
            .await?;

        if cross_refs.is_empty() {
            tracing::info!(
                root_domain = %root_domain,
                "No domain cross-references found; treating as single-domain forest"
            );
            return Ok(ForestSchema::single_domain(root_domain));
        }

        let partitions: Vec<DomainPartition> = cross_refs
            .iter()
            .filter_map(|entry| {
                let naming_context = entry.first("nCName")?;
                match Identity::distinguished_name(naming_context) {
                    Ok(base_dn) => Some(DomainPartition::new(
                        base_dn,
                        entry.first("dnsRoot").map(str::to_string),
                        entry.first("nETBIOSName").map(str::to_string),
                    )),
                    Err(e) => {
                        tracing::warn!(
                            cross_ref = %entry.dn(),
                            error = %e,
                            "Skipping cross-reference with malformed naming context"
                        );
                        None
                    }
                }
            })
            .collect();

        let upn_suffixes = self
            .directory
            .search(
                &self.credential,
                &DirectoryQuery::new(&container, PARTITIONS_CONTAINER_FILTER)
                    .with_attributes(["uPNSuffixes"]),
            )
            .await?
            .iter()
            .flat_map(|entry| entry.values("uPNSuffixes").to_vec())
            .collect();

        let schema = ForestSchema::new(root_domain, partitions, upn_suffixes);
        tracing::info!(
            root_domain = %schema.root_domain(),
            domains = schema.partitions().len(),
            "Forest schema loaded"
        );
        Ok(schema)
    }
}
