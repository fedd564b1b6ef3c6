//! Cluster-level collectors: node status, node/domain/backup inventories.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::client::{ApiError, PmgApi};
use crate::mapping;
use crate::metrics::MetricFamily;

use super::Collector;

/// Entries of the cluster status list whose `type` marks them as nodes.
///
/// A standalone PMG reports itself as a single node entry here.
async fn node_entries(api: &dyn PmgApi) -> Result<Vec<Value>, ApiError> {
    let entries = api.get_list("config/cluster/status").await?;
    Ok(entries
        .into_iter()
        .filter(|entry| entry.get("type").and_then(Value::as_str) == Some("node"))
        .collect())
}

/// Online/offline status per cluster node.
pub struct ClusterStatusCollector {
    api: Arc<dyn PmgApi>,
}

impl ClusterStatusCollector {
    pub fn new(api: Arc<dyn PmgApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Collector for ClusterStatusCollector {
    fn name(&self) -> &'static str {
        "cluster_status"
    }

    async fn collect(&self) -> Result<Vec<MetricFamily>, ApiError> {
        debug!("Collecting cluster status metrics");
        let mut status = MetricFamily::gauge_with_labels(
            "pmg_cluster_node_status",
            "Proxmox Mail Gateway cluster node status (1 if online)",
            &["name", "status"],
        );

        for entry in node_entries(self.api.as_ref()).await? {
            let name = mapping::text(&entry, "name", "unknown");
            let state = mapping::text(&entry, "status", "unknown");
            let value = if state == "online" { 1.0 } else { 0.0 };
            status.add_sample(vec![name, state], value);
        }

        Ok(vec![status])
    }
}

/// Node count plus one info sample per cluster node.
pub struct ClusterNodesCollector {
    api: Arc<dyn PmgApi>,
}

impl ClusterNodesCollector {
    pub fn new(api: Arc<dyn PmgApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Collector for ClusterNodesCollector {
    fn name(&self) -> &'static str {
        "cluster_nodes"
    }

    async fn collect(&self) -> Result<Vec<MetricFamily>, ApiError> {
        debug!("Collecting cluster nodes metrics");
        let mut total = MetricFamily::gauge(
            "pmg_cluster_nodes_total",
            "Total number of nodes in the Proxmox Mail Gateway cluster",
        );
        let mut info = MetricFamily::gauge_with_labels(
            "pmg_cluster_node_info",
            "Proxmox Mail Gateway cluster node info (1 if present)",
            &["name"],
        );

        let entries = node_entries(self.api.as_ref()).await?;
        total.add_sample(Vec::new(), entries.len() as f64);
        for entry in &entries {
            info.add_sample(vec![mapping::text(entry, "name", "unknown")], 1.0);
        }

        Ok(vec![total, info])
    }
}

/// Relay domain count plus one info sample per domain.
pub struct ClusterDomainsCollector {
    api: Arc<dyn PmgApi>,
}

impl ClusterDomainsCollector {
    pub fn new(api: Arc<dyn PmgApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Collector for ClusterDomainsCollector {
    fn name(&self) -> &'static str {
        "cluster_domains"
    }

    async fn collect(&self) -> Result<Vec<MetricFamily>, ApiError> {
        debug!("Collecting cluster domains metrics");
        let mut total = MetricFamily::gauge(
            "pmg_cluster_domains_total",
            "Total number of domains in the Proxmox Mail Gateway cluster",
        );
        let mut info = MetricFamily::gauge_with_labels(
            "pmg_cluster_domain_info",
            "Proxmox Mail Gateway cluster domain info (1 if present)",
            &["domain"],
        );

        let entries = self.api.get_list("config/domains").await?;
        total.add_sample(Vec::new(), entries.len() as f64);
        for entry in &entries {
            info.add_sample(vec![mapping::text(entry, "domain", "unknown")], 1.0);
        }

        Ok(vec![total, info])
    }
}

/// Backup remote (PBS) count plus one info sample per configured remote.
pub struct ClusterBackupCollector {
    api: Arc<dyn PmgApi>,
}

impl ClusterBackupCollector {
    pub fn new(api: Arc<dyn PmgApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Collector for ClusterBackupCollector {
    fn name(&self) -> &'static str {
        "cluster_backups"
    }

    async fn collect(&self) -> Result<Vec<MetricFamily>, ApiError> {
        debug!("Collecting cluster backup metrics");
        let mut total = MetricFamily::gauge(
            "pmg_cluster_backups_remotes_total",
            "Total number of backup remotes in the Proxmox Mail Gateway cluster",
        );
        let mut info = MetricFamily::gauge_with_labels(
            "pmg_cluster_backup_remote_info",
            "Proxmox Mail Gateway cluster backup remote info (1 if present)",
            &["datastore", "remote", "server", "disabled"],
        );

        let entries = self.api.get_list("config/pbs").await?;
        total.add_sample(Vec::new(), entries.len() as f64);
        for entry in &entries {
            info.add_sample(
                vec![
                    mapping::text(entry, "datastore", "unknown"),
                    mapping::text(entry, "remote", "unknown"),
                    mapping::text(entry, "server", "unknown"),
                    mapping::text(entry, "disabled", "0"),
                ],
                1.0,
            );
        }

        Ok(vec![total, info])
    }
}
