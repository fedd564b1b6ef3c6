//! Prometheus exporter for Proxmox Mail Gateway.
//!
//! This crate polls the PMG management API on demand and republishes
//! selected fields as Prometheus metrics over an HTTP `/metrics` endpoint.
//! Nothing is cached: every scrape triggers fresh API calls, so the
//! metrics always reflect the gateway's current answers.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │   PMG REST API  │<────│   Collectors    │<────│   HTTP Server   │
//! │  (ticket auth)  │     │   (registry)    │     │   (/metrics)    │
//! └─────────────────┘     └─────────────────┘     └─────────────────┘
//! ```
//!
//! # Usage
//!
//! Configure via `PMG_*` environment variables (or an env file) and run:
//!
//! ```bash
//! pmg-exporter --collectors all
//! ```
//!
//! # Configuration
//!
//! See [`config::ExporterConfig`] for configuration options.

pub mod client;
pub mod collectors;
pub mod config;
pub mod http;
pub mod mapping;
pub mod metrics;

pub use client::{ApiError, PmgApi, PmgClient};
pub use collectors::{Collector, CollectorRegistry, COLLECTOR_NAMES};
pub use config::ExporterConfig;
pub use http::MetricsServer;
