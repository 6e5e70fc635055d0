//! Prometheus metrics for conversation-service.

use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::{Once, OnceLock};

// Global registry
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

// Endpoint metrics
pub static CONVERSATION_REQUESTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

// Provider metrics
pub static PROVIDER_LATENCY_SECONDS: OnceLock<HistogramVec> = OnceLock::new();
pub static PROVIDER_ERRORS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static PROVIDER_TOKENS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

// Store metrics
pub static STORE_OPERATION_DURATION_SECONDS: OnceLock<HistogramVec> = OnceLock::new();
pub static STORE_ERRORS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

static INIT: Once = Once::new();

/// Initialize all metrics. Calls after the first are no-ops.
pub fn init_metrics() {
    INIT.call_once(register_metrics);
}

fn register_metrics() {
    let registry = Registry::new();

    // Outcome of every conversation request
    let conversation_requests = IntCounterVec::new(
        Opts::new(
            "conversation_requests_total",
            "Total conversation requests by outcome",
        ),
        &["outcome"],
    )
    .expect("Failed to create conversation_requests_total metric");

    let provider_latency = HistogramVec::new(
        HistogramOpts::new(
            "completion_provider_latency_seconds",
            "Completion provider API latency in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]),
        &["provider", "model"],
    )
    .expect("Failed to create completion_provider_latency_seconds metric");

    let provider_errors = IntCounterVec::new(
        Opts::new(
            "completion_provider_errors_total",
            "Total completion provider errors",
        ),
        &["provider", "error_type"],
    )
    .expect("Failed to create completion_provider_errors_total metric");

    // type: prompt, completion
    let provider_tokens = IntCounterVec::new(
        Opts::new("completion_tokens_total", "Total tokens reported by the provider"),
        &["model", "type"],
    )
    .expect("Failed to create completion_tokens_total metric");

    let store_duration = HistogramVec::new(
        HistogramOpts::new(
            "store_operation_duration_seconds",
            "Usage/subscription store operation duration in seconds",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]),
        &["operation", "collection"],
    )
    .expect("Failed to create store_operation_duration_seconds metric");

    let store_errors = IntCounterVec::new(
        Opts::new("store_errors_total", "Total usage/subscription store errors"),
        &["operation", "collection"],
    )
    .expect("Failed to create store_errors_total metric");

    registry
        .register(Box::new(conversation_requests.clone()))
        .expect("Failed to register conversation_requests_total");
    registry
        .register(Box::new(provider_latency.clone()))
        .expect("Failed to register completion_provider_latency_seconds");
    registry
        .register(Box::new(provider_errors.clone()))
        .expect("Failed to register completion_provider_errors_total");
    registry
        .register(Box::new(provider_tokens.clone()))
        .expect("Failed to register completion_tokens_total");
    registry
        .register(Box::new(store_duration.clone()))
        .expect("Failed to register store_operation_duration_seconds");
    registry
        .register(Box::new(store_errors.clone()))
        .expect("Failed to register store_errors_total");

    let _ = REGISTRY.set(registry);
    let _ = CONVERSATION_REQUESTS_TOTAL.set(conversation_requests);
    let _ = PROVIDER_LATENCY_SECONDS.set(provider_latency);
    let _ = PROVIDER_ERRORS_TOTAL.set(provider_errors);
    let _ = PROVIDER_TOKENS_TOTAL.set(provider_tokens);
    let _ = STORE_OPERATION_DURATION_SECONDS.set(store_duration);
    let _ = STORE_ERRORS_TOTAL.set(store_errors);

    tracing::info!("Prometheus metrics initialized");
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();

    let registry = match REGISTRY.get() {
        Some(r) => r,
        None => {
            tracing::error!("Metrics registry not initialized");
            return "# Metrics registry not initialized\n".to_string();
        }
    };

    let metric_families = registry.gather();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return format!("# Failed to encode metrics: {}\n", e);
    }

    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Failed to convert metrics to UTF-8");
            format!("# Failed to convert metrics to UTF-8: {}\n", e)
        }
    }
}

/// Record the outcome of a conversation request.
pub fn record_conversation(outcome: &str) {
    if let Some(counter) = CONVERSATION_REQUESTS_TOTAL.get() {
        counter.with_label_values(&[outcome]).inc();
    }
}

/// Record a successful provider call.
pub fn record_provider_call(provider: &str, model: &str, duration_secs: f64) {
    if let Some(histogram) = PROVIDER_LATENCY_SECONDS.get() {
        histogram
            .with_label_values(&[provider, model])
            .observe(duration_secs);
    }
}

pub fn record_provider_error(provider: &str, error_type: &str) {
    if let Some(counter) = PROVIDER_ERRORS_TOTAL.get() {
        counter.with_label_values(&[provider, error_type]).inc();
    }
}

pub fn record_tokens(model: &str, prompt_tokens: u32, completion_tokens: u32) {
    if let Some(counter) = PROVIDER_TOKENS_TOTAL.get() {
        counter
            .with_label_values(&[model, "prompt"])
            .inc_by(prompt_tokens as u64);
        counter
            .with_label_values(&[model, "completion"])
            .inc_by(completion_tokens as u64);
    }
}

/// Record a store operation and, when it failed, a store error.
pub fn record_store_operation(operation: &str, collection: &str, duration_secs: f64, ok: bool) {
    if let Some(histogram) = STORE_OPERATION_DURATION_SECONDS.get() {
        histogram
            .with_label_values(&[operation, collection])
            .observe(duration_secs);
    }
    if !ok {
        if let Some(counter) = STORE_ERRORS_TOTAL.get() {
            counter.with_label_values(&[operation, collection]).inc();
        }
    }
}
