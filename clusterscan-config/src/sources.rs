use std::path::PathBuf;

use crate::util::{env_path, env_string, env_usize};

pub const ENV_CONFIG_PATH: &str = "CLUSTERSCAN_CONFIG_PATH";
pub const ENV_CONFIG_JSON: &str = "CLUSTERSCAN_CONFIG_JSON";
pub const ENV_CONTROLLER_NAME: &str = "CLUSTERSCAN_CONTROLLER_NAME";
pub const ENV_WORKERS: &str = "CLUSTERSCAN_WORKERS";

/// Raw configuration inputs taken from the process environment.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub config_json: Option<String>,
    pub controller_name: Option<String>,
    /// Unparsed so a bad value can be reported instead of ignored.
    pub workers: Option<String>,
}

impl EnvConfig {
    pub fn gather() -> Self {
        Self {
            config_path: env_path(ENV_CONFIG_PATH),
            config_json: env_string(ENV_CONFIG_JSON),
            controller_name: env_string(ENV_CONTROLLER_NAME),
            workers: env_string(ENV_WORKERS),
        }
    }

    pub fn workers(&self) -> anyhow::Result<Option<usize>> {
        self.workers
            .as_deref()
            .map(|raw| env_usize(ENV_WORKERS, raw))
            .transpose()
    }
}
