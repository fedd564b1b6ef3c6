//! Single-node collectors: status, subscription, Postfix queue.
//!
//! These resolve "the" node as the first entry of the node list in
//! remote-returned order. Multi-node deployments are out of scope for the
//! per-node metrics; the cluster collectors cover the inventory instead.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::client::{ApiError, PmgApi};
use crate::mapping;
use crate::metrics::MetricFamily;

use super::Collector;

/// Subscription states the API can report. The status metric enumerates
/// all of them on every scrape so absent states read as explicit zeros.
const SUBSCRIPTION_STATUSES: [&str; 6] =
    ["new", "notfound", "active", "invalid", "expired", "suspended"];

/// Name of the first node in the node list, or `None` when the remote
/// reports no nodes at all.
async fn first_node_name(api: &dyn PmgApi) -> Result<Option<String>, ApiError> {
    let nodes = api.get_list("nodes").await?;
    Ok(nodes
        .first()
        .map(|entry| mapping::text(entry, "node", "unknown")))
}

/// Configuration sync state and uptime of the node.
pub struct NodeStatusCollector {
    api: Arc<dyn PmgApi>,
}

impl NodeStatusCollector {
    pub fn new(api: Arc<dyn PmgApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Collector for NodeStatusCollector {
    fn name(&self) -> &'static str {
        "node_status"
    }

    async fn collect(&self) -> Result<Vec<MetricFamily>, ApiError> {
        debug!("Collecting node status metrics");
        let Some(node) = first_node_name(self.api.as_ref()).await? else {
            return Ok(Vec::new());
        };

        let status = self
            .api
            .get_object(&format!("nodes/{node}/status"))
            .await?;

        let mut insync = MetricFamily::gauge_with_labels(
            "pmg_node_insync",
            "Proxmox Mail Gateway node configuration in sync status (1 if in sync)",
            &["node"],
        );
        let mut uptime = MetricFamily::gauge_with_labels(
            "pmg_node_uptime_seconds",
            "Proxmox Mail Gateway node uptime in seconds",
            &["node"],
        );

        let in_sync = mapping::integer(&status, "insync", 0) == 1;
        insync.add_sample(vec![node.clone()], if in_sync { 1.0 } else { 0.0 });
        uptime.add_sample(vec![node], mapping::integer(&status, "uptime", 0) as f64);

        Ok(vec![insync, uptime])
    }
}

/// Subscription level, due date and status of the node.
pub struct NodeSubscriptionCollector {
    api: Arc<dyn PmgApi>,
}

impl NodeSubscriptionCollector {
    pub fn new(api: Arc<dyn PmgApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Collector for NodeSubscriptionCollector {
    fn name(&self) -> &'static str {
        "subscription"
    }

    async fn collect(&self) -> Result<Vec<MetricFamily>, ApiError> {
        debug!("Collecting node subscription metrics");
        let Some(node) = first_node_name(self.api.as_ref()).await? else {
            return Ok(Vec::new());
        };

        let subscription = self
            .api
            .get_object(&format!("nodes/{node}/subscription"))
            .await?;

        let level = mapping::text(&subscription, "level", "unknown");
        let productname = mapping::text(&subscription, "productname", "unknown");
        let nextdue = mapping::integer(&subscription, "nextdue", 0);
        let status = mapping::text(&subscription, "status", "unknown");

        let mut info = MetricFamily::gauge_with_labels(
            "pmg_subscription_info",
            "Proxmox Mail Gateway node subscription info (always 1, labeled)",
            &["level", "productname"],
        );
        info.add_sample(vec![level.clone(), productname.clone()], 1.0);

        let mut nextdue_metric = MetricFamily::gauge_with_labels(
            "pmg_subscription_nextdue_timestamp_seconds",
            "Proxmox Mail Gateway node subscription next due timestamp",
            &["level", "productname"],
        );
        nextdue_metric.add_sample(vec![level, productname], nextdue as f64);

        let mut status_metric = MetricFamily::gauge_with_labels(
            "pmg_subscription_status",
            "Proxmox Mail Gateway node subscription status (1 if matching status)",
            &["status"],
        );
        for candidate in SUBSCRIPTION_STATUSES {
            let value = if status == candidate { 1.0 } else { 0.0 };
            status_metric.add_sample(vec![candidate.to_string()], value);
        }

        Ok(vec![info, nextdue_metric, status_metric])
    }
}

/// Postfix queue depth per recipient domain.
pub struct NodePostfixQueueCollector {
    api: Arc<dyn PmgApi>,
}

impl NodePostfixQueueCollector {
    pub fn new(api: Arc<dyn PmgApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Collector for NodePostfixQueueCollector {
    fn name(&self) -> &'static str {
        "node_postfix_queue"
    }

    async fn collect(&self) -> Result<Vec<MetricFamily>, ApiError> {
        debug!("Collecting node Postfix queue metrics");
        let Some(node) = first_node_name(self.api.as_ref()).await? else {
            return Ok(Vec::new());
        };

        let rows = self
            .api
            .get_list(&format!("nodes/{node}/postfix/qshape"))
            .await?;

        let mut queue = MetricFamily::gauge_with_labels(
            "pmg_postfix_queue_messages",
            "Messages in the Postfix mail queue by recipient domain",
            &["node", "domain"],
        );

        for row in &rows {
            let domain = mapping::text(row, "domain", "unknown");
            let total = mapping::number(row, "total", 0.0);
            queue.add_sample(vec![node.clone(), domain], total);
        }

        Ok(vec![queue])
    }
}
