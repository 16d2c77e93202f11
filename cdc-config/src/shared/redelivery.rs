use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Delay applied before a nacked delivery is handed out again.
///
/// The delay grows exponentially with the number of earlier redeliveries of the same event:
/// `initial_delay_ms * backoff_multiplier^redeliveries`, capped at `max_delay_ms`. Fresh input
/// keeps flowing while a delivery waits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RedeliveryConfig {
    /// Delay before the first redelivery.
    ///
    /// Default: 100ms
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Upper bound of the delay between two attempts of the same event.
    ///
    /// Default: 30000ms (30 seconds)
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Factor applied to the delay after each redelivery. Must be >= 1.0.
    ///
    /// Default: 2.0
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

fn default_initial_delay_ms() -> u64 {
    100
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

impl Default for RedeliveryConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl RedeliveryConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// Returns the delay before handing out a delivery that was redelivered `redeliveries`
    /// times already.
    pub fn delay_for(&self, redeliveries: u32) -> Duration {
        if self.initial_delay_ms == 0 {
            return Duration::ZERO;
        }

        let exponent = i32::try_from(redeliveries).unwrap_or(i32::MAX);
        let delay_ms = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(exponent);

        // Cap at max delay
        let capped_delay_ms = delay_ms.min(self.max_delay_ms as f64);

        Duration::from_millis(capped_delay_ms as u64)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.backoff_multiplier.is_nan() || self.backoff_multiplier < 1.0 {
            return Err(ValidationError::InvalidFieldValue {
                field: "redelivery.backoff_multiplier".to_owned(),
                constraint: "must be at least 1.0".to_owned(),
            });
        }

        if self.max_delay_ms < self.initial_delay_ms {
            return Err(ValidationError::InvalidFieldValue {
                field: "redelivery.max_delay_ms".to_owned(),
                constraint: "must not be lower than redelivery.initial_delay_ms".to_owned(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_grows_and_caps() {
        let config = RedeliveryConfig {
            initial_delay_ms: 100,
            max_delay_ms: 1_000,
            backoff_multiplier: 2.0,
        };

        assert_eq!(config.delay_for(0), Duration::from_millis(100));
        assert_eq!(config.delay_for(1), Duration::from_millis(200));
        assert_eq!(config.delay_for(3), Duration::from_millis(800));
        assert_eq!(config.delay_for(4), Duration::from_millis(1_000));
        assert_eq!(config.delay_for(u32::MAX), config.max_delay());
    }

    #[test]
    fn zero_initial_delay_disables_backoff() {
        let config = RedeliveryConfig {
            initial_delay_ms: 0,
            ..RedeliveryConfig::default()
        };

        assert_eq!(config.delay_for(0), Duration::ZERO);
        assert_eq!(config.delay_for(u32::MAX), Duration::ZERO);
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let shrinking = RedeliveryConfig {
            backoff_multiplier: 0.5,
            ..RedeliveryConfig::default()
        };
        assert!(matches!(
            shrinking.validate(),
            Err(ValidationError::InvalidFieldValue { field, .. }) if field == "redelivery.backoff_multiplier"
        ));

        let inverted = RedeliveryConfig {
            initial_delay_ms: 500,
            max_delay_ms: 100,
            backoff_multiplier: 2.0,
        };
        assert!(inverted.validate().is_err());
        assert_eq!(RedeliveryConfig::default().validate(), Ok(()));
    }
}
