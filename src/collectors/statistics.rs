//! Daily mail statistics, summed across the mailcount rows.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::client::{ApiError, PmgApi};
use crate::mapping;
use crate::metrics::MetricFamily;

use super::Collector;

/// Source field, metric name and help text of every mailcount counter.
const MAILCOUNT_FIELDS: [(&str, &str, &str); 11] = [
    (
        "count",
        "pmg_postfix_messages_total",
        "Total messages processed today (in + out). Resets daily.",
    ),
    (
        "count_in",
        "pmg_postfix_messages_in_total",
        "Total inbound messages today. Resets daily.",
    ),
    (
        "count_out",
        "pmg_postfix_messages_out_total",
        "Total outbound messages today. Resets daily.",
    ),
    (
        "bounces_in",
        "pmg_postfix_bounces_in_total",
        "Total inbound bounces today. Resets daily.",
    ),
    (
        "bounces_out",
        "pmg_postfix_bounces_out_total",
        "Total outbound bounces today. Resets daily.",
    ),
    (
        "spamcount_in",
        "pmg_postfix_spam_in_total",
        "Inbound messages classified as spam today. Resets daily.",
    ),
    (
        "spamcount_out",
        "pmg_postfix_spam_out_total",
        "Outbound messages classified as spam today. Resets daily.",
    ),
    (
        "viruscount_in",
        "pmg_postfix_virus_in_total",
        "Inbound messages with viruses today. Resets daily.",
    ),
    (
        "viruscount_out",
        "pmg_postfix_virus_out_total",
        "Outbound messages with viruses today. Resets daily.",
    ),
    (
        "rbl_rejects",
        "pmg_postfix_rbl_rejects_total",
        "Messages rejected by RBL today. Resets daily.",
    ),
    (
        "pregreet_rejects",
        "pmg_postfix_pregreet_rejects_total",
        "Messages rejected during pregreeting today. Resets daily.",
    ),
];

/// Sums the mailcount statistics rows into one counter per field.
pub struct StatisticsMailcountCollector {
    api: Arc<dyn PmgApi>,
}

impl StatisticsMailcountCollector {
    pub fn new(api: Arc<dyn PmgApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Collector for StatisticsMailcountCollector {
    fn name(&self) -> &'static str {
        "statistics_mailcount"
    }

    async fn collect(&self) -> Result<Vec<MetricFamily>, ApiError> {
        debug!("Collecting mailcount statistics metrics");
        let rows = self.api.get_list("statistics/mailcount").await?;

        // No rows, no metrics. An all-zero day still has rows.
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut families = Vec::with_capacity(MAILCOUNT_FIELDS.len());
        for (field, name, help) in MAILCOUNT_FIELDS {
            let total: f64 = rows.iter().map(|row| mapping::number(row, field, 0.0)).sum();
            let mut family = MetricFamily::counter(name, help);
            family.add_sample(Vec::new(), total);
            families.push(family);
        }

        Ok(families)
    }
}
