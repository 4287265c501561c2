//! Configuration loading for the clusterscan controller.
//!
//! Resolves a [`ControllerConfig`](clusterscan_core::ControllerConfig) from
//! an explicit file, the environment, a default file next to the process or
//! built-in defaults, then runs guard rails over the result.
#![allow(missing_docs)]

pub mod loader;
pub mod sources;
mod util;
pub mod validation;

pub use loader::{
    ConfigLoad, ConfigLoader, ConfigLoaderOptions, ConfigSource, load_from_file,
    parse_from_str, render_toml,
};
pub use sources::EnvConfig;
pub use validation::{
    ConfigGuardRailError, ConfigWarning, ConfigWarnings, apply_guard_rails,
};
