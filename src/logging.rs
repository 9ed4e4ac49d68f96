use std::io::IsTerminal;

use color_eyre::Result;
use color_eyre::eyre::Context;
use opentelemetry::KeyValue;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::trace::{SdkTracer, SdkTracerProvider};
use opentelemetry_semantic_conventions::resource::{SERVICE_NAME, SERVICE_VERSION};
use tracing_subscriber::{EnvFilter, Layer, Registry, layer::SubscriberExt, util::SubscriberInitExt};

/// Flushes pending spans when dropped. Hold it for the life of `main`.
#[must_use]
pub struct TracingGuard {
    tracer_provider: Option<SdkTracerProvider>,
}

impl Drop for TracingGuard {
    fn drop(&mut self) {
        if let Some(tracer_provider) = self.tracer_provider.take() {
            if let Err(e) = tracer_provider.shutdown() {
                eprintln!("Failed to flush spans on shutdown: {e:?}");
            }
        }
    }
}

fn log_filter(directives: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(directives)
        .wrap_err_with(|| format!("Invalid log level or filter: {directives}"))
}

fn otlp_tracer(service_name: &str, endpoint: &str) -> Result<(SdkTracer, SdkTracerProvider)> {
    let resource = Resource::builder()
        .with_attributes([
            KeyValue::new(SERVICE_NAME, service_name.to_string()),
            KeyValue::new(SERVICE_VERSION, env!("CARGO_PKG_VERSION")),
        ])
        .build();

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .wrap_err("Failed to create OTLP span exporter")?;

    let tracer_provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(resource)
        .build();
    opentelemetry::global::set_tracer_provider(tracer_provider.clone());

    Ok((tracer_provider.tracer(service_name.to_string()), tracer_provider))
}

/// Install the global subscriber.
///
/// Worker and request spans (`process_job`, `start_import`, `drain_once`) are
/// exported over OTLP/gRPC when `otlp_endpoint` is set. Console output is
/// pretty on a terminal and compact otherwise.
pub fn init_tracing(
    service_name: &str,
    otlp_endpoint: Option<&str>,
    directives: &str,
) -> Result<TracingGuard> {
    let filter = log_filter(directives)?;

    let console: Box<dyn Layer<Registry> + Send + Sync> = if std::io::stderr().is_terminal() {
        tracing_subscriber::fmt::layer()
            .pretty()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .compact()
            .with_ansi(false)
            .with_writer(std::io::stderr)
            .boxed()
    };

    let (telemetry, tracer_provider) = match otlp_endpoint {
        Some(endpoint) => {
            let (tracer, tracer_provider) = otlp_tracer(service_name, endpoint)?;
            (
                Some(tracing_opentelemetry::layer().with_tracer(tracer)),
                Some(tracer_provider),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console)
        .with(telemetry)
        .with(filter)
        .try_init()
        .wrap_err("Failed to install tracing subscriber")?;

    Ok(TracingGuard { tracer_provider })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_levels_and_per_crate_directives() {
        assert!(log_filter("info").is_ok());
        assert!(log_filter("yoinklist=debug,sea_orm=warn").is_ok());
    }

    #[test]
    fn test_rejects_unknown_level() {
        assert!(log_filter("yoinklist=loud").is_err());
    }

    #[test]
    fn test_guard_without_exporter_drops_quietly() {
        drop(TracingGuard {
            tracer_provider: None,
        });
    }
}
