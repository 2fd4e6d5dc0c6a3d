//! # Hierarchy Resolver
//!
//! Walks the scope chain of a target (Job → Asset → Site → User) against the
//! configuration store and returns the first record found, or the schema
//! default when nothing in the chain has been saved.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::schema::default_rule_config;
use super::store::ConfigurationStore;
use super::types::{AlertType, CompositeKey, ConfigLevel, ConfigSource, EffectiveConfig};

/// Parentage of assets and jobs, supplied by the surrounding application.
pub trait EntityGraph: Send + Sync {
    /// Site an asset belongs to.
    fn site_of_asset(&self, asset_id: &str) -> Option<String>;

    /// Assets assigned to a job, in assignment order.
    fn assets_of_job(&self, job_id: &str) -> Vec<String>;

    /// Site a job runs at, if recorded directly on the job.
    fn site_of_job(&self, job_id: &str) -> Option<String>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetNode {
    #[serde(default)]
    pub site_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobNode {
    #[serde(default)]
    pub asset_ids: Vec<String>,
    #[serde(default)]
    pub site_id: Option<String>,
}

/// Entity graph held in memory, loadable from a JSON document of the form
/// `{"assets": {"AST-1": {"siteId": "SITE-A"}}, "jobs": {"JOB-1": {"assetIds": ["AST-1"]}}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticEntityGraph {
    #[serde(default)]
    pub assets: BTreeMap<String, AssetNode>,
    #[serde(default)]
    pub jobs: BTreeMap<String, JobNode>,
}

impl StaticEntityGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_asset(mut self, asset_id: impl Into<String>, site_id: impl Into<String>) -> Self {
        self.assets.insert(
            asset_id.into(),
            AssetNode {
                site_id: Some(site_id.into()),
            },
        );
        self
    }

    pub fn with_job<I, S>(mut self, job_id: impl Into<String>, asset_ids: I, site_id: Option<&str>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.jobs.insert(
            job_id.into(),
            JobNode {
                asset_ids: asset_ids.into_iter().map(Into::into).collect(),
                site_id: site_id.map(str::to_string),
            },
        );
        self
    }
}

impl EntityGraph for StaticEntityGraph {
    fn site_of_asset(&self, asset_id: &str) -> Option<String> {
        self.assets.get(asset_id).and_then(|asset| asset.site_id.clone())
    }

    fn assets_of_job(&self, job_id: &str) -> Vec<String> {
        self.jobs
            .get(job_id)
            .map(|job| job.asset_ids.clone())
            .unwrap_or_default()
    }

    fn site_of_job(&self, job_id: &str) -> Option<String> {
        self.jobs.get(job_id).and_then(|job| job.site_id.clone())
    }
}

/// Scopes consulted for `(level, entity_id)`, narrowest first, ending with the
/// current user. Never longer than four entries.
pub fn lookup_chain(
    level: ConfigLevel,
    entity_id: &str,
    user_id: &str,
    graph: &dyn EntityGraph,
) -> Vec<ConfigSource> {
    let mut chain = vec![ConfigSource::new(level, entity_id)];

    match level {
        ConfigLevel::User => return chain,
        ConfigLevel::Site => {}
        ConfigLevel::Asset => {
            if let Some(site_id) = graph.site_of_asset(entity_id) {
                chain.push(ConfigSource::new(ConfigLevel::Site, site_id));
            }
        }
        ConfigLevel::Job => {
            let first_asset = graph.assets_of_job(entity_id).into_iter().next();
            let site_id = graph
                .site_of_job(entity_id)
                .or_else(|| first_asset.as_deref().and_then(|asset| graph.site_of_asset(asset)));
            if let Some(asset_id) = first_asset {
                chain.push(ConfigSource::new(ConfigLevel::Asset, asset_id));
            }
            if let Some(site_id) = site_id {
                chain.push(ConfigSource::new(ConfigLevel::Site, site_id));
            }
        }
    }

    chain.push(ConfigSource::new(ConfigLevel::User, user_id));
    chain
}

/// Resolves effective configurations for one user over one store.
pub struct HierarchyResolver<'a> {
    store: &'a ConfigurationStore,
    graph: &'a dyn EntityGraph,
    user_id: &'a str,
}

impl<'a> HierarchyResolver<'a> {
    pub fn new(store: &'a ConfigurationStore, graph: &'a dyn EntityGraph, user_id: &'a str) -> Self {
        Self {
            store,
            graph,
            user_id,
        }
    }

    pub fn lookup_chain(&self, level: ConfigLevel, entity_id: &str) -> Vec<ConfigSource> {
        lookup_chain(level, entity_id, self.user_id, self.graph)
    }

    /// First record along the lookup chain, or the schema default.
    pub fn resolve(
        &self,
        level: ConfigLevel,
        entity_id: &str,
        alert_type: AlertType,
    ) -> EffectiveConfig {
        for scope in self.lookup_chain(level, entity_id) {
            let key = CompositeKey::new(scope.level, scope.entity_id.clone(), alert_type);
            if let Some(record) = self.store.get(&key) {
                debug!(
                    target_level = %level,
                    target_entity = entity_id,
                    %alert_type,
                    source = %key,
                    "Resolved configuration"
                );
                return EffectiveConfig {
                    alert_type,
                    config: record.config,
                    source: Some(scope),
                };
            }
        }

        debug!(
            target_level = %level,
            target_entity = entity_id,
            %alert_type,
            "No saved configuration in chain; using schema default"
        );
        EffectiveConfig {
            alert_type,
            config: default_rule_config(alert_type),
            source: None,
        }
    }
}
