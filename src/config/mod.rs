//! Project-level configuration
//!
//! Loads per-project configuration from a `specgrade.toml` file next to
//! the graded contract. Everything is optional; a missing or unreadable
//! file falls back to defaults with a warning.
//!
//! # Configuration Format
//!
//! ```toml
//! # specgrade.toml
//!
//! [scoring]
//! pass_threshold = 60.0
//! # "full-credit" (default) or "zero-credit" for rules with no targets
//! no_target_policy = "full-credit"
//! weights = { functionality = 0.30, security = 0.25, scalability = 0.20, maintainability = 0.15, excellence = 0.10 }
//!
//! [prerequisites]
//! required_version = "3.0.3"
//! tenant_header = "X-Tenant-Id"
//! ```

use crate::models::DEFAULT_PASS_THRESHOLD;
use crate::rules::BuiltinCatalogConfig;
use crate::scoring::{CategoryWeights, NoTargetPolicy};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, warn};

/// Name of the config file looked up next to the contract
pub const CONFIG_FILE_NAME: &str = "specgrade.toml";

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    pub scoring: ScoringConfig,
    pub prerequisites: PrerequisiteConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScoringConfig {
    pub pass_threshold: f64,
    pub no_target_policy: NoTargetPolicy,
    pub weights: CategoryWeights,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            pass_threshold: DEFAULT_PASS_THRESHOLD,
            no_target_policy: NoTargetPolicy::default(),
            weights: CategoryWeights::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PrerequisiteConfig {
    pub required_version: String,
    pub tenant_header: String,
}

impl Default for PrerequisiteConfig {
    fn default() -> Self {
        let defaults = BuiltinCatalogConfig::default();
        Self {
            required_version: defaults.required_version,
            tenant_header: defaults.tenant_header,
        }
    }
}

impl PrerequisiteConfig {
    pub fn catalog_config(&self) -> BuiltinCatalogConfig {
        BuiltinCatalogConfig {
            required_version: self.required_version.clone(),
            tenant_header: self.tenant_header.clone(),
        }
    }
}

/// Load config from `dir/specgrade.toml`, falling back to defaults
pub fn load_project_config(dir: &Path) -> ProjectConfig {
    let path = dir.join(CONFIG_FILE_NAME);
    if !path.exists() {
        debug!("No {} found, using defaults", CONFIG_FILE_NAME);
        return ProjectConfig::default();
    }
    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                debug!("Loaded project config from {}", path.display());
                config
            }
            Err(e) => {
                warn!("Failed to parse {}: {}", path.display(), e);
                ProjectConfig::default()
            }
        },
        Err(e) => {
            warn!("Failed to read {}: {}", path.display(), e);
            ProjectConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_project_config(dir.path());
        assert_eq!(config.scoring.pass_threshold, DEFAULT_PASS_THRESHOLD);
        assert_eq!(config.prerequisites.required_version, "3.0.3");
        assert_eq!(config.prerequisites.tenant_header, "X-Tenant-Id");
    }

    #[test]
    fn test_partial_override() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join(CONFIG_FILE_NAME)).unwrap();
        writeln!(
            file,
            "[scoring]\npass_threshold = 75.0\nno_target_policy = \"zero-credit\"\n\n\
             [prerequisites]\ntenant_header = \"X-Org-Id\""
        )
        .unwrap();

        let config = load_project_config(dir.path());
        assert_eq!(config.scoring.pass_threshold, 75.0);
        assert_eq!(config.scoring.no_target_policy, NoTargetPolicy::ZeroCredit);
        assert_eq!(config.prerequisites.tenant_header, "X-Org-Id");
        // untouched knobs keep defaults
        assert_eq!(config.prerequisites.required_version, "3.0.3");
        assert_eq!(config.scoring.weights, CategoryWeights::default());
    }

    #[test]
    fn test_malformed_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "not [valid toml").unwrap();
        let config = load_project_config(dir.path());
        assert_eq!(config.scoring.pass_threshold, DEFAULT_PASS_THRESHOLD);
    }
}
