use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

/// Prometheus exporter settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Address the scrape endpoint listens on.
    pub listen_address: SocketAddr,
}
