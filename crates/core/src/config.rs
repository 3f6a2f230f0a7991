//! Operator configuration for the QVegas tunables.
//!
//! Values are resolved with the usual precedence: command line or
//! environment, then the TOML file named by `--config`, then built-in
//! defaults. The result is pushed into a [`QVegasTunables`] store, from which
//! running connections pick it up on their next decision.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::transport::{QVegasParams, QVegasTunables};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("alpha ({alpha}) must not exceed beta ({beta})")]
    InvertedBounds { alpha: i32, beta: i32 },
}

#[derive(clap::Parser, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Lower bound of packets in network.
    #[arg(long, env = "QVEGAS_ALPHA", allow_negative_numbers = true)]
    pub alpha: Option<i32>,

    /// Upper bound of packets in network.
    #[arg(long, env = "QVEGAS_BETA", allow_negative_numbers = true)]
    pub beta: Option<i32>,

    /// Limit on queued packets before leaving slow start.
    #[arg(long, env = "QVEGAS_GAMMA", allow_negative_numbers = true)]
    pub gamma: Option<i32>,

    /// TOML file with a `[qvegas]` table holding `alpha`, `beta` and `gamma`.
    #[arg(long, env = "QVEGAS_CONFIG")]
    pub config: Option<PathBuf>,

    #[arg(long, env = "LOG_LEVEL")]
    pub log_level: Option<LevelFilter>,
}

/// On-disk configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub qvegas: QVegasParams,
}

impl Config {
    /// Publish the configured bounds to running connections.
    pub fn apply(&self, tunables: &QVegasTunables) {
        tunables.store(self.qvegas);
    }
}

impl ConfigArgs {
    fn read_config(path: &Path) -> anyhow::Result<Config> {
        tracing::debug!(path = ?path, "Reading configuration file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str::<Config>(&content)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn build(self) -> anyhow::Result<Config> {
        let mut config = match self.config.as_ref() {
            Some(path) => Self::read_config(path)?,
            None => Config::default(),
        };

        if let Some(alpha) = self.alpha {
            config.qvegas.alpha = alpha;
        }
        if let Some(beta) = self.beta {
            config.qvegas.beta = beta;
        }
        if let Some(gamma) = self.gamma {
            config.qvegas.gamma = gamma;
        }

        config.qvegas.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use clap::Parser;
    use testresult::TestResult;

    use super::*;

    #[test]
    fn test_defaults_without_file() -> TestResult {
        let config = ConfigArgs::default().build()?;
        assert_eq!(config.qvegas, QVegasParams::default());
        Ok(())
    }

    #[test]
    fn test_file_then_args_precedence() -> TestResult {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "[qvegas]\nalpha = 1\nbeta = 6\ngamma = 3")?;

        let args = ConfigArgs {
            beta: Some(8),
            config: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        let config = args.build()?;

        assert_eq!(
            config.qvegas,
            QVegasParams {
                alpha: 1,
                beta: 8,
                gamma: 3
            }
        );
        Ok(())
    }

    #[test]
    fn test_parse_cli_flags() -> TestResult {
        let args = ConfigArgs::try_parse_from(["qvegas", "--alpha", "3", "--gamma", "-1"])?;
        assert_eq!(args.alpha, Some(3));
        assert_eq!(args.gamma, Some(-1));
        let config = args.build()?;
        assert_eq!(config.qvegas.gamma, -1);
        Ok(())
    }

    #[test]
    fn test_inverted_bounds_fail_build() {
        let args = ConfigArgs {
            alpha: Some(9),
            ..Default::default()
        };
        let err = args.build().unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::InvertedBounds { alpha: 9, beta: 4 })
        );
    }

    #[test]
    fn test_missing_file_reports_path() {
        let args = ConfigArgs {
            config: Some(PathBuf::from("/nonexistent/qvegas.toml")),
            ..Default::default()
        };
        let err = args.build().unwrap_err();
        assert!(err.to_string().contains("/nonexistent/qvegas.toml"));
    }

    #[test]
    fn test_apply_updates_tunables() {
        let tunables = QVegasTunables::default();
        let config = Config {
            qvegas: QVegasParams {
                alpha: 1,
                beta: 2,
                gamma: 0,
            },
        };
        config.apply(&tunables);
        assert_eq!(tunables.snapshot(), config.qvegas);
    }
}
