use thiserror::Error;

use clusterscan_core::ControllerConfig;

/// Settings the controller refuses to start with.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigGuardRailError {
    #[error("controller_name must not be empty")]
    EmptyControllerName,
    #[error("workers must be at least 1")]
    ZeroWorkers,
    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },
    #[error(
        "retry.backoff_base_ms ({base}) is larger than retry.backoff_max_ms ({max})"
    )]
    BackoffInverted { base: u64, max: u64 },
}

#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push<S: Into<String>>(&mut self, message: S) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint<S: Into<String>, H: Into<String>>(
        &mut self,
        message: S,
        hint: H,
    ) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfigWarning> {
        self.items.iter()
    }
}

const MAX_SENSIBLE_WORKERS: usize = 64;
const MIN_SENSIBLE_CHANNEL_CAPACITY: usize = 16;

pub fn apply_guard_rails(
    config: &ControllerConfig,
) -> Result<ConfigWarnings, ConfigGuardRailError> {
    if config.controller_name.trim().is_empty() {
        return Err(ConfigGuardRailError::EmptyControllerName);
    }
    if config.workers == 0 {
        return Err(ConfigGuardRailError::ZeroWorkers);
    }
    if config.output_namespace.trim().is_empty() {
        return Err(ConfigGuardRailError::EmptyField {
            field: "output_namespace",
        });
    }
    if config.output_file_name.trim().is_empty() {
        return Err(ConfigGuardRailError::EmptyField {
            field: "output_file_name",
        });
    }
    if config.retry.backoff_base_ms > config.retry.backoff_max_ms {
        return Err(ConfigGuardRailError::BackoffInverted {
            base: config.retry.backoff_base_ms,
            max: config.retry.backoff_max_ms,
        });
    }

    let mut warnings = ConfigWarnings::default();

    if config.default_profile.is_none() {
        warnings.push_with_hint(
            "default_profile not configured; scans without scan_profile_name cannot be reported",
            "Set default_profile to the benchmark profile most scans use",
        );
    }

    if config.workers > MAX_SENSIBLE_WORKERS {
        warnings.push(format!(
            "workers = {} exceeds {MAX_SENSIBLE_WORKERS}; extra workers only add store pressure",
            config.workers
        ));
    }

    if config.event_channel_capacity < MIN_SENSIBLE_CHANNEL_CAPACITY {
        warnings.push_with_hint(
            format!(
                "event_channel_capacity = {} is small; bursts will force full resyncs",
                config.event_channel_capacity
            ),
            "Raise event_channel_capacity to at least the expected run-object count",
        );
    }

    if config.retry.jitter_ratio > 1.0 {
        warnings.push(format!(
            "retry.jitter_ratio = {} is above 1.0; retries may fire immediately",
            config.retry.jitter_ratio
        ));
    }

    Ok(warnings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass_with_profile_warning() {
        let warnings =
            apply_guard_rails(&ControllerConfig::default()).expect("defaults are valid");
        assert_eq!(warnings.len(), 1);
        assert!(warnings.items[0].message.contains("default_profile"));

        let warnings = apply_guard_rails(
            &ControllerConfig::default().with_default_profile("cis-1.6"),
        )
        .expect("defaults are valid");
        assert!(warnings.is_empty());
    }

    #[test]
    fn rejects_unusable_settings() {
        let blank = ControllerConfig::default().with_controller_name("  ");
        assert_eq!(
            apply_guard_rails(&blank).expect_err("blank name"),
            ConfigGuardRailError::EmptyControllerName
        );

        let mut idle = ControllerConfig::default();
        idle.workers = 0;
        assert_eq!(
            apply_guard_rails(&idle).expect_err("no workers"),
            ConfigGuardRailError::ZeroWorkers
        );

        let mut inverted = ControllerConfig::default();
        inverted.retry.backoff_base_ms = 10_000;
        inverted.retry.backoff_max_ms = 1_000;
        assert!(matches!(
            apply_guard_rails(&inverted),
            Err(ConfigGuardRailError::BackoffInverted { .. })
        ));
    }
}
