//! Installed version, release and build metadata.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::client::{ApiError, PmgApi};
use crate::mapping;
use crate::metrics::MetricFamily;

use super::Collector;

/// Info-style metrics carrying the version strings in their labels.
pub struct VersionInfoCollector {
    api: Arc<dyn PmgApi>,
}

impl VersionInfoCollector {
    pub fn new(api: Arc<dyn PmgApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Collector for VersionInfoCollector {
    fn name(&self) -> &'static str {
        "version_info"
    }

    async fn collect(&self) -> Result<Vec<MetricFamily>, ApiError> {
        debug!("Collecting version metrics");
        let version = self.api.get_object("version").await?;

        let mut release = MetricFamily::counter_with_labels(
            "pmg_release_info",
            "Proxmox Mail Gateway release information",
            &["release"],
        );
        release.add_sample(vec![mapping::text(&version, "release", "unknown")], 1.0);

        let mut repository = MetricFamily::counter_with_labels(
            "pmg_repository_info",
            "Git commit hash from which Proxmox Mail Gateway was built",
            &["repo"],
        );
        repository.add_sample(vec![mapping::text(&version, "repoid", "unknown")], 1.0);

        let mut package = MetricFamily::counter_with_labels(
            "pmg_version_info",
            "Currently installed Proxmox Mail Gateway API package version",
            &["version"],
        );
        package.add_sample(vec![mapping::text(&version, "version", "unknown")], 1.0);

        Ok(vec![release, repository, package])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::StubApi;
    use serde_json::json;

    #[tokio::test]
    async fn test_version_labels() {
        let api: Arc<dyn PmgApi> = Arc::new(StubApi::new().with(
            "version",
            json!({"release": "8.1", "repoid": "1a2b3c4d", "version": "8.1.2"}),
        ));

        let families = VersionInfoCollector::new(api).collect().await.unwrap();
        assert_eq!(families.len(), 3);

        assert_eq!(families[0].name, "pmg_release_info");
        assert_eq!(families[0].samples[0].label_values, vec!["8.1"]);
        assert_eq!(families[0].samples[0].value, 1.0);

        assert_eq!(families[1].name, "pmg_repository_info");
        assert_eq!(families[1].samples[0].label_values, vec!["1a2b3c4d"]);

        assert_eq!(families[2].name, "pmg_version_info");
        assert_eq!(families[2].samples[0].label_values, vec!["8.1.2"]);
    }

    #[tokio::test]
    async fn test_missing_fields_default_to_unknown() {
        let api: Arc<dyn PmgApi> = Arc::new(StubApi::new().with("version", json!({})));

        let families = VersionInfoCollector::new(api).collect().await.unwrap();
        for family in &families {
            assert_eq!(family.samples[0].label_values, vec!["unknown"]);
            assert_eq!(family.samples[0].value, 1.0);
        }
    }

    #[tokio::test]
    async fn test_numeric_release_becomes_text() {
        let api: Arc<dyn PmgApi> =
            Arc::new(StubApi::new().with("version", json!({"release": 8})));

        let families = VersionInfoCollector::new(api).collect().await.unwrap();
        assert_eq!(families[0].samples[0].label_values, vec!["8"]);
    }
}
