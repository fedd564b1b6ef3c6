//! Metric model and Prometheus text exposition rendering.
//!
//! Collectors return batches of [`MetricFamily`] values; nothing is stored
//! between scrapes. The metric and label vocabulary is fixed at compile
//! time, which is why names live as `&'static str`.

use std::fmt::Write;

/// Prometheus metric type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Gauge,
    Counter,
}

impl MetricType {
    /// The TYPE comment string for the exposition format.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Gauge => "gauge",
            MetricType::Counter => "counter",
        }
    }
}

/// A single sample within a family: one label-value tuple and its value.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub label_values: Vec<String>,
    pub value: f64,
}

/// A named, typed metric together with the samples of one collection pass.
#[derive(Debug, Clone)]
pub struct MetricFamily {
    pub name: &'static str,
    pub help: &'static str,
    pub metric_type: MetricType,
    pub label_names: &'static [&'static str],
    pub samples: Vec<Sample>,
}

impl MetricFamily {
    /// Create an unlabeled gauge family.
    pub fn gauge(name: &'static str, help: &'static str) -> Self {
        Self::gauge_with_labels(name, help, &[])
    }

    /// Create a gauge family with a fixed ordered label set.
    pub fn gauge_with_labels(
        name: &'static str,
        help: &'static str,
        label_names: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            help,
            metric_type: MetricType::Gauge,
            label_names,
            samples: Vec::new(),
        }
    }

    /// Create an unlabeled counter family.
    pub fn counter(name: &'static str, help: &'static str) -> Self {
        Self::counter_with_labels(name, help, &[])
    }

    /// Create a counter family with a fixed ordered label set.
    pub fn counter_with_labels(
        name: &'static str,
        help: &'static str,
        label_names: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            help,
            metric_type: MetricType::Counter,
            label_names,
            samples: Vec::new(),
        }
    }

    /// Append a sample. `label_values` must match the family's label names
    /// in length and order.
    pub fn add_sample(&mut self, label_values: Vec<String>, value: f64) {
        debug_assert_eq!(label_values.len(), self.label_names.len());
        self.samples.push(Sample { label_values, value });
    }
}

/// Render families in the Prometheus text exposition format (version 0.0.4).
///
/// Families render in the order given; a family without samples still
/// renders its HELP/TYPE header.
pub fn render(families: &[MetricFamily]) -> String {
    let mut out = String::with_capacity(families.len() * 160);

    for family in families {
        writeln!(out, "# HELP {} {}", family.name, escape_help(family.help)).ok();
        writeln!(out, "# TYPE {} {}", family.name, family.metric_type.as_str()).ok();

        for sample in &family.samples {
            writeln!(
                out,
                "{}{} {}",
                family.name,
                format_labels(family.label_names, &sample.label_values),
                format_value(sample.value)
            )
            .ok();
        }
    }

    out
}

/// Format a label set as `{k="v",...}`, or nothing for unlabeled samples.
fn format_labels(names: &[&str], values: &[String]) -> String {
    if names.is_empty() {
        return String::new();
    }

    let parts: Vec<String> = names
        .iter()
        .zip(values)
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label_value(v)))
        .collect();

    format!("{{{}}}", parts.join(","))
}

/// Escape special characters in label values.
fn escape_label_value(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            _ => result.push(c),
        }
    }
    result
}

/// Escape special characters in HELP text.
fn escape_help(help: &str) -> String {
    let mut result = String::with_capacity(help.len());
    for c in help.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '\n' => result.push_str("\\n"),
            _ => result.push(c),
        }
    }
    result
}

/// Format a floating point value for the exposition format.
fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value.is_sign_positive() {
            "+Inf".to_string()
        } else {
            "-Inf".to_string()
        }
    } else if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}
