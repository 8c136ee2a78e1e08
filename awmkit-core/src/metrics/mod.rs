//! Metrics and instrumentation for the watermark kit.
//!
//! Defines Prometheus-compatible metrics for embed/detect operations and
//! exposes a small HTTP exporter that serves `/metrics` in Prometheus
//! text format.
//!
//! Typical usage, spawned from `awmkit-cli`'s `serve-metrics` subcommand:
//!
//! ```ignore
//! use std::net::SocketAddr;
//! use std::sync::Arc;
//! use awmkit_core::metrics::{MetricsRegistry, run_prometheus_http_server};
//!
//! let registry = Arc::new(MetricsRegistry::new()?);
//! let addr: SocketAddr = "127.0.0.1:9898".parse()?;
//! tokio::spawn(run_prometheus_http_server(registry.clone(), addr));
//!
//! registry.awm.embed_seconds.observe(duration_secs);
//! ```

pub mod prometheus;

pub use prometheus::{AwmMetrics, MetricsRegistry, run_prometheus_http_server};
