//! Runtime configuration from environment variables.
//!
//! | Variable                  | Default                                  |
//! |---------------------------|------------------------------------------|
//! | `DIAGRAM_DB_PATH`         | `<temp dir>/diagram_graph.sqlite3`       |
//! | `DIAGRAM_LOG_LEVEL`       | `debug` in debug builds, else `info`     |
//! | `DIAGRAM_LOG_DIR`         | unset: file logging disabled             |
//! | `DIAGRAM_EDIT_LEASE_SECS` | `3600`; `0` keeps locks until released   |
//!
//! Blank values count as unset.

use crate::logging::{default_log_level, normalize_level, normalize_log_dir};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

pub const DB_PATH_VAR: &str = "DIAGRAM_DB_PATH";
pub const LOG_LEVEL_VAR: &str = "DIAGRAM_LOG_LEVEL";
pub const LOG_DIR_VAR: &str = "DIAGRAM_LOG_DIR";
pub const EDIT_LEASE_SECS_VAR: &str = "DIAGRAM_EDIT_LEASE_SECS";

const DEFAULT_DB_FILE_NAME: &str = "diagram_graph.sqlite3";
const DEFAULT_EDIT_LEASE_SECS: u64 = 3600;

/// Errors from reading configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable holds a value that cannot be used.
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { var, value, reason } => {
                write!(f, "invalid {var}=`{value}`: {reason}")
            }
        }
    }
}

impl Error for ConfigError {}

/// Resolved process configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramConfig {
    pub db_path: PathBuf,
    pub log_level: &'static str,
    pub log_dir: Option<PathBuf>,
    /// `None` means acquired locks never expire.
    pub edit_lease: Option<Duration>,
}

impl Default for DiagramConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level(),
            log_dir: None,
            edit_lease: Some(Duration::from_secs(DEFAULT_EDIT_LEASE_SECS)),
        }
    }
}

impl DiagramConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Reads configuration through `lookup`, one call per variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |var: &str| {
            lookup(var)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let mut config = Self::default();

        if let Some(path) = read(DB_PATH_VAR) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(level) = read(LOG_LEVEL_VAR) {
            config.log_level = normalize_level(&level).map_err(|reason| {
                ConfigError::InvalidValue {
                    var: LOG_LEVEL_VAR,
                    value: level.clone(),
                    reason,
                }
            })?;
        }
        if let Some(dir) = read(LOG_DIR_VAR) {
            config.log_dir = Some(normalize_log_dir(&dir).map_err(|reason| {
                ConfigError::InvalidValue {
                    var: LOG_DIR_VAR,
                    value: dir.clone(),
                    reason,
                }
            })?);
        }
        if let Some(secs) = read(EDIT_LEASE_SECS_VAR) {
            let parsed = secs
                .parse::<u64>()
                .map_err(|err| ConfigError::InvalidValue {
                    var: EDIT_LEASE_SECS_VAR,
                    value: secs.clone(),
                    reason: err.to_string(),
                })?;
            config.edit_lease = (parsed > 0).then(|| Duration::from_secs(parsed));
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, DiagramConfig, EDIT_LEASE_SECS_VAR};
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::time::Duration;

    fn config_from(pairs: &[(&str, &str)]) -> Result<DiagramConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        DiagramConfig::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config, DiagramConfig::default());
        assert_eq!(config.edit_lease, Some(Duration::from_secs(3600)));
        assert!(config.log_dir.is_none());
        assert!(config.db_path.ends_with("diagram_graph.sqlite3"));
    }

    #[test]
    fn values_override_defaults_and_blank_counts_as_unset() {
        let config = config_from(&[
            ("DIAGRAM_DB_PATH", "/var/lib/diagram/graph.db"),
            ("DIAGRAM_LOG_LEVEL", " WARNING "),
            ("DIAGRAM_LOG_DIR", "   "),
            ("DIAGRAM_EDIT_LEASE_SECS", "0"),
        ])
        .unwrap();

        assert_eq!(config.db_path, PathBuf::from("/var/lib/diagram/graph.db"));
        assert_eq!(config.log_level, "warn");
        assert!(config.log_dir.is_none());
        assert_eq!(config.edit_lease, None);
    }

    #[test]
    fn unusable_values_name_the_variable() {
        let err = config_from(&[("DIAGRAM_EDIT_LEASE_SECS", "soon")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { var, .. } if var == EDIT_LEASE_SECS_VAR
        ));
        assert!(err.to_string().contains("DIAGRAM_EDIT_LEASE_SECS"));

        assert!(config_from(&[("DIAGRAM_LOG_DIR", "relative/logs")]).is_err());
        assert!(config_from(&[("DIAGRAM_LOG_LEVEL", "loud")]).is_err());
    }
}
