//! Exporter self-status.

use async_trait::async_trait;

use crate::client::ApiError;
use crate::metrics::MetricFamily;

use super::Collector;

/// Emits a constant gauge proving the exporter process itself is alive.
#[derive(Default)]
pub struct ExporterCollector;

impl ExporterCollector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Collector for ExporterCollector {
    fn name(&self) -> &'static str {
        "exporter_status"
    }

    async fn collect(&self) -> Result<Vec<MetricFamily>, ApiError> {
        let mut up = MetricFamily::gauge("pmg_exporter_up", "PMG Exporter up status (1 if up)");
        up.add_sample(Vec::new(), 1.0);
        Ok(vec![up])
    }
}
