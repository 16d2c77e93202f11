use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::Config;
use crate::shared::{
    DestinationConfig, IoConfig, MetricsConfig, RedeliveryConfig, ValidationError, WorkerConfig,
};

/// Complete configuration of the router binary.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RouterConfig {
    pub destinations: Vec<DestinationConfig>,
    #[serde(default)]
    pub workers: WorkerConfig,
    #[serde(default)]
    pub redelivery: RedeliveryConfig,
    pub io: IoConfig,
    /// Enables the Prometheus exporter when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricsConfig>,
}

impl RouterConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.destinations.is_empty() {
            return Err(ValidationError::NoDestinations);
        }

        let mut names = HashSet::with_capacity(self.destinations.len());
        for destination in &self.destinations {
            destination.validate()?;
            if !names.insert(destination.name.as_str()) {
                return Err(ValidationError::DuplicateDestination(
                    destination.name.clone(),
                ));
            }
            if self.io.output_path(&destination.name) == self.io.dead_letter_path {
                return Err(ValidationError::DeadLetterPathCollision(
                    destination.name.clone(),
                ));
            }
        }

        self.workers.validate()?;
        self.redelivery.validate()
    }
}

impl Config for RouterConfig {
    const LIST_PARSE_KEYS: &'static [&'static str] = &[];
}
