use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::shipping_labels::state_machine::DEFAULT_HISTORY_LIMIT;

pub const CONFIG_FILE_NAME: &str = "shipping-labels.toml";

/// Main configuration structure for the shipping label workflow
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ShippingLabelsConfig {
    /// Logging settings
    pub observability: ObservabilityConfig,
    /// State machine and collaborator settings
    pub workflow: WorkflowConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default log level when RUST_LOG is not set
    pub log_level: String,
    /// Emit JSON lines instead of human readable logs
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Transition records kept per session, 0 disables the audit trail
    pub history_limit: usize,
    /// Upper bound for a single data load or address validation call
    pub collaborator_timeout_ms: u64,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            collaborator_timeout_ms: 30_000,
        }
    }
}

impl ShippingLabelsConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration files (shipping-labels.toml, .shipping-labels-rc)
    /// 3. Environment variables (SHIPPING_LABELS__WORKFLOW__HISTORY_LIMIT, ...)
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("."))
    }

    /// Same as [`ShippingLabelsConfig::load`] with files looked up in `dir`
    pub fn load_from(dir: &Path) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        let main_file = dir.join(CONFIG_FILE_NAME);
        if main_file.exists() {
            builder = builder.add_source(File::from(main_file));
        }

        let rc_file = dir.join(".shipping-labels-rc");
        if rc_file.exists() {
            builder = builder.add_source(File::from(rc_file).format(config::FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix("SHIPPING_LABELS")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load `.env` from `dir` if it exists, returns whether a file was loaded
    pub fn load_env_file(dir: &Path) -> Result<bool> {
        let path = dir.join(".env");
        if !path.exists() {
            return Ok(false);
        }
        dotenvy::from_path(&path)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "shipping-labels-{}-{}",
            name,
            uuid::Uuid::new_v4()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_defaults_without_files() {
        let dir = temp_dir("defaults");
        let config = ShippingLabelsConfig::load_from(&dir).unwrap();

        assert_eq!(config.workflow.history_limit, DEFAULT_HISTORY_LIMIT);
        assert_eq!(config.workflow.collaborator_timeout_ms, 30_000);
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = temp_dir("file");
        std::fs::write(
            dir.join(CONFIG_FILE_NAME),
            "[workflow]\nhistory_limit = 5\n\n[observability]\njson_logs = true\n",
        )
        .unwrap();

        let config = ShippingLabelsConfig::load_from(&dir).unwrap();
        assert_eq!(config.workflow.history_limit, 5);
        assert_eq!(config.workflow.collaborator_timeout_ms, 30_000);
        assert!(config.observability.json_logs);
    }

    #[test]
    fn test_env_file_is_optional() {
        let dir = temp_dir("no-env");
        assert!(!ShippingLabelsConfig::load_env_file(&dir).unwrap());
    }

    #[test]
    fn test_malformed_env_file_is_an_error() {
        let dir = temp_dir("bad-env");
        std::fs::write(dir.join(".env"), "SHIPPING_LABELS_BROKEN='unterminated\n").unwrap();

        assert!(ShippingLabelsConfig::load_env_file(&dir).is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = temp_dir("save");
        let mut config = ShippingLabelsConfig::default();
        config.workflow.collaborator_timeout_ms = 1_500;
        config.save_to_file(dir.join(CONFIG_FILE_NAME)).unwrap();

        let loaded = ShippingLabelsConfig::load_from(&dir).unwrap();
        assert_eq!(loaded, config);
    }
}
