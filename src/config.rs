use std::fs;
use std::path::Path;

#[cfg(test)]
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::aggregate::DrawModel;
use crate::bands::ClassificationBands;
use crate::error::ConfigError;
use crate::markets::MarketCatalogue;
use crate::normalize::DEFAULT_TEMPERATURE;
use crate::recommend::CompositeBlend;
use crate::weights::WeightTable;

pub const CONFIG_PATH_VAR: &str = "MATCH_RECO_CONFIG";
pub const TEMPERATURE_VAR: &str = "MATCH_RECO_TEMPERATURE";

#[cfg(test)]
pub(crate) static ENV_MUTEX: Lazy<std::sync::Mutex<()>> = Lazy::new(|| std::sync::Mutex::new(()));

/// Static engine tuning. Every field has a default, so a config file only
/// needs the parts it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub weights: WeightTable,
    pub draw: DrawModel,
    pub temperature: f64,
    pub bands: ClassificationBands,
    pub composite: CompositeBlend,
    pub markets: MarketCatalogue,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            weights: WeightTable::default(),
            draw: DrawModel::default(),
            temperature: DEFAULT_TEMPERATURE,
            bands: ClassificationBands::default(),
            composite: CompositeBlend::default(),
            markets: MarketCatalogue::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.weights.validate()?;
        self.draw.validate()?;
        if !self.temperature.is_finite() || self.temperature <= 0.0 {
            return Err(ConfigError::Temperature(self.temperature));
        }
        self.bands.validate()?;
        self.composite.validate()?;
        self.markets.validate()?;
        Ok(())
    }

    pub fn from_json(raw: &str, origin: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|err| ConfigError::Malformed {
            path: origin.to_string(),
            reason: err.to_string(),
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let shown = path.display().to_string();
        let raw = fs::read_to_string(path).map_err(|err| ConfigError::Unreadable {
            path: shown.clone(),
            reason: err.to_string(),
        })?;
        Self::from_json(&raw, &shown)
    }

    /// Defaults, or the file named by `MATCH_RECO_CONFIG`, with
    /// `MATCH_RECO_TEMPERATURE` applied on top. The result is validated.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(Path::new(path.trim()))?,
            _ => Self::default(),
        };
        if let Ok(raw) = std::env::var(TEMPERATURE_VAR) {
            config.temperature = parse_temperature(&raw)?;
        }
        config.validate()?;
        Ok(config)
    }
}

fn parse_temperature(raw: &str) -> Result<f64, ConfigError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| ConfigError::EnvOverride {
            var: TEMPERATURE_VAR,
            value: raw.to_string(),
        })
}

/// Read `.env.local` then `.env` into the process environment; either may be
/// absent.
pub fn load_env_files() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factors::Factor;
    use crate::record::Side;
    use std::env;
    use std::path::PathBuf;

    fn set_env(name: &str, value: &str) {
        // SAFETY: env-touching tests hold ENV_MUTEX.
        unsafe {
            env::set_var(name, value);
        }
    }

    fn remove_env(name: &str) {
        // SAFETY: env-touching tests hold ENV_MUTEX.
        unsafe {
            env::remove_var(name);
        }
    }

    fn reset_env() {
        remove_env(CONFIG_PATH_VAR);
        remove_env(TEMPERATURE_VAR);
    }

    fn write_config(name: &str, raw: &str) -> PathBuf {
        let path = env::temp_dir().join(format!("match_reco_{}_{name}.json", std::process::id()));
        fs::write(&path, raw).expect("temp config should be writable");
        path
    }

    #[test]
    fn defaults_validate() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let config = EngineConfig::from_json(r#"{"temperature": 20.0}"#, "inline").unwrap();
        assert_eq!(config.temperature, 20.0);
        assert_eq!(config.weights, WeightTable::default());
        assert_eq!(config.markets, MarketCatalogue::default());
    }

    #[test]
    fn bad_values_are_config_errors() {
        let mut config = EngineConfig::default();
        config.temperature = 0.0;
        assert_eq!(config.validate(), Err(ConfigError::Temperature(0.0)));

        let mut config = EngineConfig::default();
        config.weights.home.insert(Factor::Conditions, 9.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::WeightSum { side: Side::Home, .. })
        ));
    }

    #[test]
    fn malformed_json_names_its_origin() {
        let err = EngineConfig::from_json("{not json", "cfg.json").unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { ref path, .. } if path == "cfg.json"));
    }

    #[test]
    fn missing_file_is_unreadable() {
        let err = EngineConfig::from_file(Path::new("/nonexistent/match_reco.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Unreadable { .. }));
    }

    #[test]
    fn temperature_override_must_parse() {
        assert_eq!(parse_temperature(" 12.5 "), Ok(12.5));
        assert!(matches!(
            parse_temperature("warm"),
            Err(ConfigError::EnvOverride { .. })
        ));
    }

    #[test]
    fn from_env_defaults_without_variables() {
        let _lock = ENV_MUTEX.lock().expect("env mutex");
        reset_env();
        set_env(CONFIG_PATH_VAR, "   ");
        assert_eq!(EngineConfig::from_env(), Ok(EngineConfig::default()));
        reset_env();
    }

    #[test]
    fn from_env_applies_temperature_over_the_config_file() {
        let _lock = ENV_MUTEX.lock().expect("env mutex");
        reset_env();
        let path = write_config("override", r#"{"temperature": 20.0, "draw": {"bonus": 3.0}}"#);
        set_env(CONFIG_PATH_VAR, &format!(" {} ", path.display()));

        let config = EngineConfig::from_env().unwrap();
        assert_eq!(config.temperature, 20.0);
        assert_eq!(config.draw.bonus, 3.0);
        assert_eq!(config.draw.gap_slope, DrawModel::default().gap_slope);

        set_env(TEMPERATURE_VAR, " 9.5 ");
        let config = EngineConfig::from_env().unwrap();
        assert_eq!(config.temperature, 9.5);
        assert_eq!(config.draw.bonus, 3.0);

        set_env(TEMPERATURE_VAR, "warm");
        assert!(matches!(
            EngineConfig::from_env(),
            Err(ConfigError::EnvOverride { var: TEMPERATURE_VAR, ref value }) if value == "warm"
        ));

        // The override is validated like any other value.
        set_env(TEMPERATURE_VAR, "0");
        assert_eq!(EngineConfig::from_env(), Err(ConfigError::Temperature(0.0)));

        reset_env();
        let _ = fs::remove_file(path);
    }

    #[test]
    fn from_env_reports_a_missing_config_file() {
        let _lock = ENV_MUTEX.lock().expect("env mutex");
        reset_env();
        set_env(CONFIG_PATH_VAR, "/nonexistent/match_reco.json");
        set_env(TEMPERATURE_VAR, "9.5");
        assert!(matches!(
            EngineConfig::from_env(),
            Err(ConfigError::Unreadable { ref path, .. }) if path == "/nonexistent/match_reco.json"
        ));
        reset_env();
    }
}
