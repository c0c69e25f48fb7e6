//! Configuration file support
//!
//! Optional TOML file, by default at `<data_local_dir>/energyreader/config.toml`.
//! Every key is optional; anything left out keeps its built-in default.
//!
//! ```toml
//! [insights]
//! consumption_change_pct = 15.0
//! value_increase = 50.0
//! above_average_factor = 1.2
//! savings_window = 3
//! solar_offset = 0.15
//! solar_efficiency = 0.8
//! max_insights = 4
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// Thresholds used by the insight rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightConfig {
    /// Month-over-month consumption change (percent) worth reporting
    pub consumption_change_pct: f64,
    /// Bill increase (currency) worth reporting
    pub value_increase: f64,
    /// Latest consumption above `factor × average` triggers a tip
    pub above_average_factor: f64,
    /// Bills averaged for the savings estimate
    pub savings_window: usize,
    /// Share of consumption a solar installation offsets
    pub solar_offset: f64,
    /// Efficiency applied to the solar estimate
    pub solar_efficiency: f64,
    /// Maximum insights returned
    pub max_insights: usize,
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            consumption_change_pct: 15.0,
            value_increase: 50.0,
            above_average_factor: 1.2,
            savings_window: 3,
            solar_offset: 0.15,
            solar_efficiency: 0.8,
            max_insights: 4,
        }
    }
}

/// Top-level application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub insights: InsightConfig,
}

/// Default config file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("energyreader").join("config.toml"))
}

impl AppConfig {
    /// Load configuration (explicit path first, then the default location)
    ///
    /// A missing file yields the defaults; an unreadable or invalid one is an error.
    pub fn load(override_path: Option<&Path>) -> Result<Self> {
        let path = match override_path {
            Some(path) => Some(path.to_path_buf()),
            None => default_config_path(),
        };

        match path {
            Some(path) if path.exists() => {
                debug!(path = %path.display(), "Loading config");
                let content = fs::read_to_string(&path)
                    .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?;
                Self::parse(&content)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Parse config from TOML content
    pub fn parse(content: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))?;

        let mut config = Self::default();

        if let Some(insights) = raw.insights {
            let target = &mut config.insights;
            if let Some(v) = insights.consumption_change_pct {
                target.consumption_change_pct = v;
            }
            if let Some(v) = insights.value_increase {
                target.value_increase = v;
            }
            if let Some(v) = insights.above_average_factor {
                target.above_average_factor = v;
            }
            if let Some(v) = insights.savings_window {
                if v == 0 {
                    return Err(Error::Config(
                        "insights.savings_window must be at least 1".to_string(),
                    ));
                }
                target.savings_window = v;
            }
            if let Some(v) = insights.solar_offset {
                target.solar_offset = v;
            }
            if let Some(v) = insights.solar_efficiency {
                target.solar_efficiency = v;
            }
            if let Some(v) = insights.max_insights {
                target.max_insights = v;
            }
        }

        Ok(config)
    }
}

/// Raw config structure for TOML parsing
#[derive(Debug, Deserialize)]
struct RawConfig {
    insights: Option<RawInsights>,
}

#[derive(Debug, Deserialize)]
struct RawInsights {
    consumption_change_pct: Option<f64>,
    value_increase: Option<f64>,
    above_average_factor: Option<f64>,
    savings_window: Option<usize>,
    solar_offset: Option<f64>,
    solar_efficiency: Option<f64>,
    max_insights: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_empty_uses_defaults() {
        let config = AppConfig::parse("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.insights.max_insights, 4);
    }

    #[test]
    fn test_parse_partial_override() {
        let config = AppConfig::parse(
            r#"
            [insights]
            consumption_change_pct = 10.0
            max_insights = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.insights.consumption_change_pct, 10.0);
        assert_eq!(config.insights.max_insights, 2);
        assert_eq!(config.insights.value_increase, 50.0);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(AppConfig::parse("[insights\n").is_err());
        assert!(AppConfig::parse("[insights]\nsavings_window = 0").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[insights]\nvalue_increase = 80.0").unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.insights.value_increase, 80.0);
    }

    #[test]
    fn test_load_missing_file_defaults() {
        let config = AppConfig::load(Some(Path::new("/nonexistent/energyreader.toml"))).unwrap();
        assert_eq!(config, AppConfig::default());
    }
}
