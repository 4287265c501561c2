use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, anyhow};
use tracing::{debug, info};

use clusterscan_core::ControllerConfig;

use crate::{
    sources::{ENV_CONFIG_JSON, EnvConfig},
    validation::{ConfigWarnings, apply_guard_rails},
};

/// Files probed, relative to the search root, when nothing names a config.
pub const DEFAULT_CANDIDATES: &[&str] = &[
    "clusterscan.toml",
    "clusterscan.json",
    "config/clusterscan.toml",
    "config/clusterscan.json",
];

/// Where the effective configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Default,
    Explicit(PathBuf),
    EnvPath(PathBuf),
    EnvInline,
    File(PathBuf),
}

impl ConfigSource {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Explicit(path) | Self::EnvPath(path) | Self::File(path) => {
                Some(path)
            }
            Self::Default | Self::EnvInline => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigLoaderOptions {
    /// Takes precedence over every environment source.
    pub config_path: Option<PathBuf>,
    /// Directory the default candidates are resolved against. Falls back to
    /// the current directory.
    pub search_root: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: ControllerConfig,
    pub source: ConfigSource,
    pub warnings: ConfigWarnings,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self { options }
    }

    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_search_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.options.search_root = Some(root.into());
        self
    }

    pub fn load(&self) -> anyhow::Result<ConfigLoad> {
        self.load_with_env(EnvConfig::gather())
    }

    /// Resolves the configuration in precedence order: explicit path, env
    /// path, inline env JSON, first default candidate, built-in defaults.
    /// Scalar env overrides apply on top of whichever source won.
    pub fn load_with_env(&self, env: EnvConfig) -> anyhow::Result<ConfigLoad> {
        let (mut config, source) = self.resolve_source(&env)?;

        if let Some(name) = env.controller_name.as_deref() {
            debug!(controller_name = name, "controller name overridden by environment");
            config.controller_name = name.to_string();
        }
        if let Some(workers) = env.workers()? {
            debug!(workers, "worker count overridden by environment");
            config.workers = workers;
        }

        let warnings = apply_guard_rails(&config).with_context(|| match source.path() {
            Some(path) => format!("invalid configuration in {}", path.display()),
            None => "invalid configuration".to_string(),
        })?;

        info!(source = ?source, "configuration loaded");
        Ok(ConfigLoad {
            config,
            source,
            warnings,
        })
    }

    fn resolve_source(
        &self,
        env: &EnvConfig,
    ) -> anyhow::Result<(ControllerConfig, ConfigSource)> {
        if let Some(path) = self.options.config_path.as_ref() {
            let config = load_from_file(path)?;
            return Ok((config, ConfigSource::Explicit(path.clone())));
        }

        if let Some(path) = env.config_path.as_ref() {
            let config = load_from_file(path)?;
            return Ok((config, ConfigSource::EnvPath(path.clone())));
        }

        if let Some(inline) = env.config_json.as_deref() {
            let config = parse_json(inline)
                .with_context(|| format!("failed to parse {ENV_CONFIG_JSON}"))?;
            return Ok((config, ConfigSource::EnvInline));
        }

        let root = match self.options.search_root.clone() {
            Some(root) => root,
            None => std::env::current_dir()
                .context("failed to resolve current directory")?,
        };
        if let Some(path) = find_default_file(&root) {
            let config = load_from_file(&path)?;
            return Ok((config, ConfigSource::File(path)));
        }

        Ok((ControllerConfig::default(), ConfigSource::Default))
    }
}

pub fn find_default_file(root: &Path) -> Option<PathBuf> {
    DEFAULT_CANDIDATES
        .iter()
        .map(|candidate| root.join(candidate))
        .find(|path| path.is_file())
}

pub fn load_from_file(path: &Path) -> anyhow::Result<ControllerConfig> {
    let contents = fs::read_to_string(path).with_context(|| {
        format!("failed to read controller config from {}", path.display())
    })?;

    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => parse_json(&contents)
            .with_context(|| format!("failed to parse {}", path.display())),
        Some(ext) if ext.eq_ignore_ascii_case("toml") => parse_toml(&contents)
            .with_context(|| format!("failed to parse {}", path.display())),
        _ => parse_from_str(&contents)
            .with_context(|| format!("failed to parse {}", path.display())),
    }
}

/// Accepts either TOML or JSON.
pub fn parse_from_str(contents: &str) -> anyhow::Result<ControllerConfig> {
    match parse_toml(contents) {
        Ok(config) => Ok(config),
        Err(toml_err) => parse_json(contents).map_err(|json_err| {
            anyhow!(
                "config is neither valid TOML ({toml_err}) nor JSON ({json_err})"
            )
        }),
    }
}

pub fn parse_toml(contents: &str) -> anyhow::Result<ControllerConfig> {
    toml::from_str(contents).context("invalid TOML controller config")
}

pub fn parse_json(contents: &str) -> anyhow::Result<ControllerConfig> {
    serde_json::from_str(contents).context("invalid JSON controller config")
}

/// TOML rendering of the effective configuration.
pub fn render_toml(config: &ControllerConfig) -> anyhow::Result<String> {
    toml::to_string_pretty(config).context("failed to render controller config")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_from_str_accepts_both_formats() {
        let from_toml = parse_from_str("workers = 2\n").expect("toml parses");
        assert_eq!(from_toml.workers, 2);

        let from_json = parse_from_str(r#"{"workers": 3}"#).expect("json parses");
        assert_eq!(from_json.workers, 3);
        assert_eq!(from_json.controller_name, ControllerConfig::default().controller_name);
    }

    #[test]
    fn parse_from_str_reports_both_failures() {
        let err = parse_from_str("workers = [").expect_err("garbage");
        let message = err.to_string();
        assert!(message.contains("TOML"));
        assert!(message.contains("JSON"));
    }

    #[test]
    fn rendered_toml_parses_back_to_same_config() {
        let config = ControllerConfig::default().with_default_profile("cis-1.6");
        let rendered = render_toml(&config).expect("renders");
        assert_eq!(parse_toml(&rendered).expect("parses"), config);
    }
}
