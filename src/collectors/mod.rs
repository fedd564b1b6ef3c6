//! Metric collectors and their registry.
//!
//! Each collector owns one slice of the remote API surface and maps the
//! raw entries to metric families on every scrape. A collector holds a
//! shared handle to the API client and nothing else, so every scrape
//! reflects the remote's answers at that moment.

mod cluster;
mod exporter;
mod node;
mod quarantine;
mod statistics;
mod version;

pub use cluster::{
    ClusterBackupCollector, ClusterDomainsCollector, ClusterNodesCollector,
    ClusterStatusCollector,
};
pub use exporter::ExporterCollector;
pub use node::{NodePostfixQueueCollector, NodeStatusCollector, NodeSubscriptionCollector};
pub use quarantine::{QuarantineSpamCollector, QuarantineVirusCollector};
pub use statistics::StatisticsMailcountCollector;
pub use version::VersionInfoCollector;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::client::{ApiError, PmgApi};
use crate::metrics::MetricFamily;

/// Registration names of all collectors, in the order `all` expands to.
pub const COLLECTOR_NAMES: [&str; 12] = [
    "exporter_status",
    "cluster_status",
    "subscription",
    "node_status",
    "node_postfix_queue",
    "cluster_nodes",
    "cluster_domains",
    "cluster_backups",
    "quarantine_spam",
    "quarantine_virus",
    "statistics_mailcount",
    "version_info",
];

/// One source of metrics, polled on every scrape.
#[async_trait]
pub trait Collector: Send + Sync {
    /// Registration name of this collector.
    fn name(&self) -> &'static str;

    /// Fetch this collector's slice of the remote API and map it to metric
    /// families. A remote fault fails the whole scrape; a missing field
    /// within a successful response never does.
    async fn collect(&self) -> Result<Vec<MetricFamily>, ApiError>;
}

/// The set of registered collectors, polled serially per scrape.
#[derive(Default)]
pub struct CollectorRegistry {
    collectors: Vec<Box<dyn Collector>>,
}

impl CollectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, collector: Box<dyn Collector>) {
        self.collectors.push(collector);
    }

    /// Registration names, in registration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.collectors.iter().map(|c| c.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }

    /// Poll every collector serially, in registration order.
    ///
    /// The first remote fault aborts the pass; the scrape either reflects
    /// every registered collector or fails as a whole.
    pub async fn gather(&self) -> Result<Vec<MetricFamily>, ApiError> {
        let mut families = Vec::new();
        for collector in &self.collectors {
            debug!(collector = collector.name(), "Running collector");
            families.extend(collector.collect().await?);
        }
        Ok(families)
    }
}

/// Construct the collector registered under `name`.
fn build(name: &str, api: Arc<dyn PmgApi>) -> Option<Box<dyn Collector>> {
    match name {
        "exporter_status" => Some(Box::new(ExporterCollector::new())),
        "cluster_status" => Some(Box::new(ClusterStatusCollector::new(api))),
        "subscription" => Some(Box::new(NodeSubscriptionCollector::new(api))),
        "node_status" => Some(Box::new(NodeStatusCollector::new(api))),
        "node_postfix_queue" => Some(Box::new(NodePostfixQueueCollector::new(api))),
        "cluster_nodes" => Some(Box::new(ClusterNodesCollector::new(api))),
        "cluster_domains" => Some(Box::new(ClusterDomainsCollector::new(api))),
        "cluster_backups" => Some(Box::new(ClusterBackupCollector::new(api))),
        "quarantine_spam" => Some(Box::new(QuarantineSpamCollector::new(api))),
        "quarantine_virus" => Some(Box::new(QuarantineVirusCollector::new(api))),
        "statistics_mailcount" => Some(Box::new(StatisticsMailcountCollector::new(api))),
        "version_info" => Some(Box::new(VersionInfoCollector::new(api))),
        _ => None,
    }
}

/// Resolve requested collector names into a registry.
///
/// `all` expands to the complete vocabulary. Unknown names log a warning
/// and are skipped; the remaining collectors still register.
pub fn resolve(requested: &[String], api: Arc<dyn PmgApi>) -> CollectorRegistry {
    let mut names: Vec<&str> = Vec::new();
    for raw in requested {
        let name = raw.trim();
        if name == "all" {
            names.extend(COLLECTOR_NAMES);
        } else {
            names.push(name);
        }
    }

    let mut registry = CollectorRegistry::new();
    for name in names {
        match build(name, Arc::clone(&api)) {
            Some(collector) => {
                debug!(name, "Registered collector");
                registry.register(collector);
            }
            None => warn!(name, "Unknown collector name, skipping"),
        }
    }
    registry
}
