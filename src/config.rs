use crate::advisory::AdvisoryConfig;
use crate::heuristics::{ExtractionConfig, HistoryConfig};
use crate::ocr::OcrConfig;
use crate::simulation::SimulationConfig;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use toml_edit::{DocumentMut, Item, value};
use tracing::info;

pub const DEFAULT_CONFIG_PATH: &str = "fatura-solar.toml";

/// Every section is optional; an empty file yields the built-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub extraction: ExtractionConfig,
    pub history: HistoryConfig,
    pub simulation: SimulationConfig,
    pub advisory: AdvisoryConfig,
    pub ocr: OcrConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("failed to edit configuration: {0}")]
    Edit(#[from] toml_edit::TomlError),
    #[error("invalid configuration key {0:?}")]
    Key(String),
    #[error("invalid billing period pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("{0} already exists")]
    Exists(PathBuf),
}

impl ConfigError {
    fn io(path: &Path, source: io::Error) -> Self {
        ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        let cfg: Config = toml::from_str(&content)?;
        cfg.validate()?;
        info!(path = %path.display(), model = ?cfg.simulation.sizing_model, "Loaded configuration");
        Ok(cfg)
    }

    /// An explicit path must exist; otherwise `./fatura-solar.toml` is used
    /// when present, and the defaults when not.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::load(DEFAULT_CONFIG_PATH),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        Regex::new(&self.extraction.billing_period_pattern)?;
        Ok(())
    }

    pub fn write_default(path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            return Err(ConfigError::Exists(path.to_path_buf()));
        }
        let content = toml::to_string_pretty(&Config::default())?;
        fs::write(path, content).map_err(|e| ConfigError::io(path, e))
    }

    /// Set one dotted key (`simulation.offset_ratio`) in place, keeping the
    /// rest of the file's comments and layout. The edited file must still
    /// load as a valid configuration, otherwise nothing is written.
    pub fn update_value(
        path: impl AsRef<Path>,
        key: &str,
        raw: &str,
    ) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(ConfigError::io(path, e)),
        };
        let mut doc = content.parse::<DocumentMut>()?;

        let parts: Vec<&str> = key.split('.').map(str::trim).collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(ConfigError::Key(key.to_string()));
        }
        let Some((last, parents)) = parts.split_last() else {
            return Err(ConfigError::Key(key.to_string()));
        };

        let mut table = doc.as_table_mut();
        for part in parents {
            table = table
                .entry(part)
                .or_insert(toml_edit::table())
                .as_table_mut()
                .ok_or_else(|| ConfigError::Key(key.to_string()))?;
        }
        table[*last] = parse_value(raw);

        let edited = doc.to_string();
        toml::from_str::<Config>(&edited)?.validate()?;

        fs::write(path, edited).map_err(|e| ConfigError::io(path, e))?;
        info!(path = %path.display(), key = %key, value = %raw, "Updated configuration");
        Ok(())
    }
}

/// Booleans and numbers keep their TOML type; anything else is a string.
fn parse_value(raw: &str) -> Item {
    let raw = raw.trim();
    if let Ok(b) = raw.parse::<bool>() {
        return value(b);
    }
    if let Ok(i) = raw.parse::<i64>() {
        return value(i);
    }
    if let Some(f) = raw.parse::<f64>().ok().filter(|f| f.is_finite()) {
        return value(f);
    }
    value(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::SizingModelKind;

    #[test]
    fn test_empty_file_is_default() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.simulation.offset_ratio, 0.85);
        assert_eq!(cfg.simulation.cost_per_kwp, 1300.0);
        assert_eq!(cfg.advisory.backfeed_peak_ratio, 1.4);
        assert_eq!(cfg.history.reference_month.to_string(), "2025-05");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [simulation]
            sizing_model = "insolation_table"
            cost_per_kwp = 1500

            [simulation.location_table.sites]
            "Cascavel - PR" = 138.0

            [history]
            reference_month = "2024-12"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.simulation.sizing_model, SizingModelKind::InsolationTable);
        assert_eq!(cfg.simulation.cost_per_kwp, 1500.0);
        assert_eq!(cfg.simulation.offset_ratio, 0.85);
        assert_eq!(cfg.simulation.location_table.fallback, 120.0);
        assert_eq!(cfg.simulation.location_table.sites.len(), 1);
        assert_eq!(cfg.history.reference_month.to_string(), "2024-12");
        assert_eq!(cfg.extraction.group_a_phrase, "Grupo A");
    }

    #[test]
    fn test_bad_reference_month_rejected() {
        let err = toml::from_str::<Config>("[history]\nreference_month = \"2024-13\"");
        assert!(err.is_err());
    }

    #[test]
    fn test_bad_pattern_rejected() {
        let cfg: Config = toml::from_str("[extraction]\nbilling_period_pattern = \"(\"").unwrap();
        assert!(matches!(cfg.validate(), Err(ConfigError::Pattern(_))));
    }

    #[test]
    fn test_default_round_trips_through_toml() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        let cfg: Config = toml::from_str(&text).unwrap();
        assert_eq!(cfg.simulation.insolation_table.states.len(), 5);
        assert_eq!(cfg.simulation.location_table.sites.len(), 3);
    }

    #[test]
    fn test_update_value_preserves_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.toml");
        fs::write(&path, "# site tuning\n[simulation]\noffset_ratio = 0.85 # proxy\n").unwrap();

        Config::update_value(&path, "simulation.offset_ratio", "0.9").unwrap();
        Config::update_value(&path, "simulation.sizing_model", "insolation_table").unwrap();
        Config::update_value(&path, "advisory.seasonality_above", "5000").unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("# site tuning"));
        let cfg = Config::load(&path).unwrap();
        assert_eq!(cfg.simulation.offset_ratio, 0.9);
        assert_eq!(cfg.simulation.sizing_model, SizingModelKind::InsolationTable);
        assert_eq!(cfg.advisory.seasonality_above, 5000);
    }

    #[test]
    fn test_update_value_rejects_invalid_result() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.toml");
        fs::write(&path, "[simulation]\noffset_ratio = 0.85\n").unwrap();

        let err = Config::update_value(&path, "simulation.offset_ratio", "lots");
        assert!(matches!(err, Err(ConfigError::Parse(_))));
        assert!(matches!(
            Config::update_value(&path, "simulation..x", "1"),
            Err(ConfigError::Key(_))
        ));
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "[simulation]\noffset_ratio = 0.85\n"
        );
    }

    #[test]
    fn test_write_default_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.toml");
        Config::write_default(&path).unwrap();
        assert!(Config::load(&path).is_ok());
        assert!(matches!(
            Config::write_default(&path),
            Err(ConfigError::Exists(_))
        ));
    }
}
