use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Installs the global Prometheus recorder and serves `/metrics` on `listen_address`.
///
/// Must be called at most once per process, since the recorder is global.
pub fn init_metrics(listen_address: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .with_http_listener(listen_address)
        .install()?;

    ::tracing::info!(%listen_address, "prometheus exporter listening");

    Ok(())
}
