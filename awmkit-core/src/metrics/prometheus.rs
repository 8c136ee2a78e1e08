//! Prometheus-backed metrics and HTTP exporter.
//!
//! This module defines a [`MetricsRegistry`] that owns a Prometheus
//! registry and a set of strongly-typed watermark-kit metrics, and an
//! async HTTP exporter that serves `/metrics` using `hyper`.

use std::{convert::Infallible, net::SocketAddr, sync::Arc};

use bytes::Bytes;
use http_body_util::Full;
use hyper::{
    Method, Request, Response, StatusCode, body::Incoming, header, server::conn::http1,
    service::service_fn,
};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use prometheus::{
    self, Encoder, Histogram, HistogramOpts, IntCounter, Opts, Registry, TextEncoder,
};

/// Embed/detect/key-store metrics for the watermark kit.
#[derive(Clone)]
pub struct AwmMetrics {
    /// Latency of a full embed operation, in seconds.
    pub embed_seconds: Histogram,
    /// Latency of a full detect operation (across all routed pairs), in
    /// seconds.
    pub detect_seconds: Histogram,
    /// Total embed operations attempted.
    pub embeds_total: IntCounter,
    /// Total detect operations attempted.
    pub detects_total: IntCounter,
    /// Total HMAC mismatches seen during decode.
    pub hmac_mismatches_total: IntCounter,
    /// Total times `KeyStore::active_key` fell back to an implicit
    /// sole-occupant slot instead of an explicitly set active slot.
    pub key_slot_fallbacks_total: IntCounter,
    /// Clone-check verdicts, one counter per [`crate::evidence::CloneVerdict`].
    pub clone_verdict_exact_total: IntCounter,
    pub clone_verdict_likely_total: IntCounter,
    pub clone_verdict_suspect_total: IntCounter,
    pub clone_verdict_unavailable_total: IntCounter,
}

impl AwmMetrics {
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let embed_seconds = Histogram::with_opts(
            HistogramOpts::new("awm_embed_seconds", "Time to embed a watermark, in seconds")
                .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        )?;
        registry.register(Box::new(embed_seconds.clone()))?;

        let detect_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "awm_detect_seconds",
                "Time to detect a watermark across all routed pairs, in seconds",
            )
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        )?;
        registry.register(Box::new(detect_seconds.clone()))?;

        let embeds_total =
            IntCounter::with_opts(Opts::new("awm_embeds_total", "Total embed operations"))?;
        registry.register(Box::new(embeds_total.clone()))?;

        let detects_total =
            IntCounter::with_opts(Opts::new("awm_detects_total", "Total detect operations"))?;
        registry.register(Box::new(detects_total.clone()))?;

        let hmac_mismatches_total = IntCounter::with_opts(Opts::new(
            "awm_hmac_mismatches_total",
            "Total HMAC verification failures during decode",
        ))?;
        registry.register(Box::new(hmac_mismatches_total.clone()))?;

        let key_slot_fallbacks_total = IntCounter::with_opts(Opts::new(
            "awm_key_slot_fallbacks_total",
            "Total implicit sole-occupant active-slot fallbacks",
        ))?;
        registry.register(Box::new(key_slot_fallbacks_total.clone()))?;

        let clone_verdict_exact_total = IntCounter::with_opts(Opts::new(
            "awm_clone_verdict_exact_total",
            "Total clone-check verdicts classified as exact",
        ))?;
        registry.register(Box::new(clone_verdict_exact_total.clone()))?;

        let clone_verdict_likely_total = IntCounter::with_opts(Opts::new(
            "awm_clone_verdict_likely_total",
            "Total clone-check verdicts classified as likely",
        ))?;
        registry.register(Box::new(clone_verdict_likely_total.clone()))?;

        let clone_verdict_suspect_total = IntCounter::with_opts(Opts::new(
            "awm_clone_verdict_suspect_total",
            "Total clone-check verdicts classified as suspect",
        ))?;
        registry.register(Box::new(clone_verdict_suspect_total.clone()))?;

        let clone_verdict_unavailable_total = IntCounter::with_opts(Opts::new(
            "awm_clone_verdict_unavailable_total",
            "Total clone-check verdicts classified as unavailable",
        ))?;
        registry.register(Box::new(clone_verdict_unavailable_total.clone()))?;

        Ok(Self {
            embed_seconds,
            detect_seconds,
            embeds_total,
            detects_total,
            hmac_mismatches_total,
            key_slot_fallbacks_total,
            clone_verdict_exact_total,
            clone_verdict_likely_total,
            clone_verdict_suspect_total,
            clone_verdict_unavailable_total,
        })
    }

    /// Increments the counter matching `verdict`.
    pub fn record_clone_verdict(&self, verdict: crate::evidence::CloneVerdict) {
        use crate::evidence::CloneVerdict;
        match verdict {
            CloneVerdict::Exact => self.clone_verdict_exact_total.inc(),
            CloneVerdict::Likely => self.clone_verdict_likely_total.inc(),
            CloneVerdict::Suspect => self.clone_verdict_suspect_total.inc(),
            CloneVerdict::Unavailable => self.clone_verdict_unavailable_total.inc(),
        }
    }
}

/// Wrapper around a Prometheus registry and the watermark-kit metrics.
///
/// This is the main handle passed around the CLI binary. It can be
/// wrapped in an [`Arc`] and shared across threads/tasks.
#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Registry,
    pub awm: AwmMetrics,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("awmkit".to_string()), None)?;
        let awm = AwmMetrics::register(&registry)?;
        Ok(Self { registry, awm })
    }

    /// Encodes all metrics in this registry into the Prometheus text format.
    pub fn gather_text(&self) -> String {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            eprintln!("failed to encode Prometheus metrics: {e}");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

/// Runs an HTTP server that exposes Prometheus metrics.
///
/// The server listens on `addr` and serves `GET /metrics` with the
/// Prometheus text exposition format. All other paths return 404.
pub async fn run_prometheus_http_server(
    metrics: Arc<MetricsRegistry>,
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = TcpListener::bind(addr).await?;

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let svc = service_fn(move |req| {
                let metrics = metrics.clone();
                handle_request(req, metrics)
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, svc).await {
                eprintln!("prometheus HTTP server error: {err}");
            }
        });
    }
}

async fn handle_request(
    req: Request<Incoming>,
    metrics: Arc<MetricsRegistry>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    match (req.method(), req.uri().path()) {
        (&Method::GET, "/metrics") => {
            let body = metrics.gather_text();
            Ok(Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "text/plain; version=0.0.4")
                .body(Full::new(Bytes::from(body)))
                .unwrap())
        }
        _ => Ok(Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Full::new(Bytes::from("not found")))
            .unwrap()),
    }
}
