//! Configuration loading and parsing

use anyhow::{Context, Result};
use frc_can_decoder::{LogSource, SessionConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration (loaded from a TOML file)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct InputConfig {
    /// JSON capture files
    #[serde(default)]
    pub files: Vec<PathBuf>,
    /// Directories of YAML device definitions
    #[serde(default)]
    pub library_dirs: Vec<PathBuf>,
    /// Capture tool that wrote the files
    #[serde(default)]
    pub source: LogSource,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
    /// Also list every frame with its decoded fields
    #[serde(default)]
    pub show_frames: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    if config.session.tick_interval_ms == 0 {
        anyhow::bail!("{:?}: session.tick_interval_ms must be positive", path);
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_deserialization() {
        let toml_content = r#"
            [input]
            files = ["match42.json"]
            library_dirs = ["devices"]
            source = "innomaker"

            [session]
            ignored_apis = [1023]
            offline_threshold_secs = 2.5

            [output]
            format = "json"
        "#;

        let config: AppConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.input.files.len(), 1);
        assert_eq!(config.input.source, LogSource::InnoMaker);
        assert_eq!(config.session.ignored_apis, vec![1023]);
        assert_eq!(config.session.offline_threshold_secs, 2.5);
        assert_eq!(config.session.max_read_per_poll, 100);
        assert_eq!(config.output.format, OutputFormat::Json);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert!(config.input.files.is_empty());
        assert_eq!(config.input.source, LogSource::Live);
        assert_eq!(config.session, SessionConfig::default());
        assert_eq!(config.output.format, OutputFormat::Table);
    }

    #[test]
    fn test_load_config_errors() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[session]\ntick_interval_ms = 0").unwrap();
        assert!(load_config(file.path()).is_err());

        let mut bad = NamedTempFile::new().unwrap();
        writeln!(bad, "[input\nfiles = 3").unwrap();
        let err = load_config(bad.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));

        assert!(load_config(Path::new("/nonexistent/app.toml")).is_err());
    }
}
