//! Per-tenant SLA threshold configuration
//!
//! The provider is the only place thresholds are ever written; the SLA
//! clock always receives thresholds as an explicit parameter and never
//! reads tenant state itself.
use std::sync::Arc;

use anyhow::Context;

use super::error::ConfigValidationError;

pub const DEFAULT_WARNING_HOURS: f64 = 24.0;
pub const DEFAULT_BREACH_HOURS: f64 = 48.0;
pub const MIN_WARNING_HOURS: f64 = 1.0;
pub const MAX_BREACH_HOURS: f64 = 720.0;

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq)]
pub struct SlaThresholds {
    #[n(0)]
    pub warning_hours: f64,
    #[n(1)]
    pub breach_hours: f64,
}

impl Default for SlaThresholds {
    fn default() -> Self {
        Self {
            warning_hours: DEFAULT_WARNING_HOURS,
            breach_hours: DEFAULT_BREACH_HOURS,
        }
    }
}

impl SlaThresholds {
    pub fn new(warning_hours: f64, breach_hours: f64) -> Self {
        Self {
            warning_hours,
            breach_hours,
        }
    }

    /// `1 <= warning < breach <= 720`, checked before any save.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.warning_hours < MIN_WARNING_HOURS {
            return Err(ConfigValidationError::WarningBelowMinimum);
        }
        if self.breach_hours <= self.warning_hours {
            return Err(ConfigValidationError::BreachNotAfterWarning);
        }
        if self.breach_hours > MAX_BREACH_HOURS {
            return Err(ConfigValidationError::BreachAboveMaximum);
        }
        Ok(())
    }
}

/// Resolves per-tenant thresholds from a key-value store, falling back to
/// the platform defaults when a tenant has none saved.
pub struct SlaConfigProvider {
    instance: Arc<sled::Db>,
}

impl SlaConfigProvider {
    pub fn new(instance: Arc<sled::Db>) -> Self {
        Self { instance }
    }

    fn key(tenant_id: &str) -> String {
        format!("sla_config/{tenant_id}")
    }

    pub fn load(&self, tenant_id: &str) -> anyhow::Result<SlaThresholds> {
        match self.instance.get(Self::key(tenant_id).as_bytes())? {
            Some(raw) => {
                minicbor::decode(raw.as_ref()).context("stored SLA thresholds failed to decode")
            }
            None => Ok(SlaThresholds::default()),
        }
    }

    /// Validates locally, then writes. Invalid thresholds never reach the
    /// store.
    pub fn save(&self, thresholds: &SlaThresholds, tenant_id: &str) -> anyhow::Result<()> {
        thresholds.validate()?;
        let encoded = minicbor::to_vec(thresholds)?;
        self.instance
            .insert(Self::key(tenant_id).as_bytes(), encoded)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(SlaThresholds::default().validate(), Ok(()));
    }

    #[test]
    fn validation_rejects_each_rule() {
        assert_eq!(
            SlaThresholds::new(0.5, 48.0).validate(),
            Err(ConfigValidationError::WarningBelowMinimum)
        );
        assert_eq!(
            SlaThresholds::new(24.0, 24.0).validate(),
            Err(ConfigValidationError::BreachNotAfterWarning)
        );
        assert_eq!(
            SlaThresholds::new(24.0, 721.0).validate(),
            Err(ConfigValidationError::BreachAboveMaximum)
        );
    }
}
