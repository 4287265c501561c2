use std::path::PathBuf;

use anyhow::Context;

/// Reads `name`, treating unset and whitespace-only values alike.
pub fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}

pub fn env_path(name: &str) -> Option<PathBuf> {
    env_string(name).map(PathBuf::from)
}

pub fn env_usize(name: &str, raw: &str) -> anyhow::Result<usize> {
    raw.trim()
        .parse()
        .with_context(|| format!("{name} must be a non-negative integer, got {raw:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_usize_reports_variable_name() {
        assert_eq!(env_usize("CLUSTERSCAN_WORKERS", " 8 ").ok(), Some(8));
        let err = env_usize("CLUSTERSCAN_WORKERS", "eight").expect_err("not a number");
        assert!(err.to_string().contains("CLUSTERSCAN_WORKERS"));
    }
}
