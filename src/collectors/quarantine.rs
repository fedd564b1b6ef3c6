//! Quarantine collectors: spam and virus quarantine status.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::client::{ApiError, PmgApi};
use crate::mapping;
use crate::metrics::MetricFamily;

use super::Collector;

/// Size and content of the spam quarantine.
pub struct QuarantineSpamCollector {
    api: Arc<dyn PmgApi>,
}

impl QuarantineSpamCollector {
    pub fn new(api: Arc<dyn PmgApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Collector for QuarantineSpamCollector {
    fn name(&self) -> &'static str {
        "quarantine_spam"
    }

    async fn collect(&self) -> Result<Vec<MetricFamily>, ApiError> {
        debug!("Collecting quarantine spam metrics");
        let status = self.api.get_object("quarantine/spamstatus").await?;

        let mut count = MetricFamily::gauge(
            "pmg_quarantine_spam_count_total",
            "Proxmox Mail Gateway quarantine spam count",
        );
        let mut average_size = MetricFamily::gauge(
            "pmg_quarantine_spam_average_size_bytes",
            "Proxmox Mail Gateway quarantine spam average size in bytes",
        );
        let mut average_level = MetricFamily::gauge(
            "pmg_quarantine_spam_average_level",
            "Proxmox Mail Gateway quarantine spam average spam level",
        );
        let mut disk_usage = MetricFamily::gauge(
            "pmg_quarantine_spam_disk_usage_megabytes",
            "Proxmox Mail Gateway quarantine estimated spam disk usage in megabytes",
        );

        count.add_sample(Vec::new(), mapping::integer(&status, "count", 0) as f64);
        average_size.add_sample(Vec::new(), mapping::number(&status, "avgbytes", 0.0));
        average_level.add_sample(Vec::new(), mapping::number(&status, "avgspam", 0.0));
        disk_usage.add_sample(Vec::new(), mapping::number(&status, "mbytes", 0.0));

        Ok(vec![count, average_size, average_level, disk_usage])
    }
}

/// Size and content of the virus quarantine.
///
/// Same shape as the spam variant minus the average spam level, which the
/// virus status endpoint does not report.
pub struct QuarantineVirusCollector {
    api: Arc<dyn PmgApi>,
}

impl QuarantineVirusCollector {
    pub fn new(api: Arc<dyn PmgApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Collector for QuarantineVirusCollector {
    fn name(&self) -> &'static str {
        "quarantine_virus"
    }

    async fn collect(&self) -> Result<Vec<MetricFamily>, ApiError> {
        debug!("Collecting quarantine virus metrics");
        let status = self.api.get_object("quarantine/virusstatus").await?;

        let mut count = MetricFamily::gauge(
            "pmg_quarantine_virus_count_total",
            "Proxmox Mail Gateway quarantine virus count",
        );
        let mut average_size = MetricFamily::gauge(
            "pmg_quarantine_virus_average_size_bytes",
            "Proxmox Mail Gateway quarantine virus average size in bytes",
        );
        let mut disk_usage = MetricFamily::gauge(
            "pmg_quarantine_virus_disk_usage_megabytes",
            "Proxmox Mail Gateway quarantine estimated virus disk usage in megabytes",
        );

        count.add_sample(Vec::new(), mapping::integer(&status, "count", 0) as f64);
        average_size.add_sample(Vec::new(), mapping::number(&status, "avgbytes", 0.0));
        disk_usage.add_sample(Vec::new(), mapping::number(&status, "mbytes", 0.0));

        Ok(vec![count, average_size, disk_usage])
    }
}
