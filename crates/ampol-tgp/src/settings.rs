use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;

pub const DEFAULT_SETTINGS_FILE: &str = "ampol-tgp.toml";
pub const ENV_PREFIX: &str = "AMPOL_TGP";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Failed to load settings: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Invalid settings: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub scrape: ScrapeSettings,
    pub provision: ProvisionSettings,
    pub run: RunSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ScrapeSettings {
    pub page_url: String,
    pub output: PathBuf,
    pub timeout_secs: u64,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            page_url: crate::PRICING_PAGE_URL.to_string(),
            output: PathBuf::from(crate::store::DEFAULT_OUTPUT),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProvisionSettings {
    pub installer: Vec<String>,
    pub manifest: PathBuf,
}

impl Default for ProvisionSettings {
    fn default() -> Self {
        Self {
            installer: vec!["pip".into(), "install".into(), "-r".into()],
            manifest: PathBuf::from("requirements.txt"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    pub stages: Vec<Vec<String>>,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            stages: vec![vec!["python".into(), "scrape.py".into()]],
        }
    }
}

impl Settings {
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let file = match path {
            Some(p) => File::from(p).required(true),
            None => File::with_name(DEFAULT_SETTINGS_FILE).required(false),
        };

        let settings: Settings = Config::builder()
            .add_source(file)
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?
            .try_deserialize()?;

        settings.validate()
    }

    pub fn validate(self) -> Result<Self, SettingsError> {
        if self.provision.installer.first().is_none_or(|p| p.is_empty()) {
            return Err(SettingsError::Invalid(
                "provision.installer must name a program".to_string(),
            ));
        }
        if self.run.stages.is_empty() {
            return Err(SettingsError::Invalid(
                "run.stages must contain at least one command".to_string(),
            ));
        }
        if self
            .run
            .stages
            .iter()
            .any(|s| s.first().is_none_or(|p| p.is_empty()))
        {
            return Err(SettingsError::Invalid(
                "every run stage must name a program".to_string(),
            ));
        }
        if self.scrape.timeout_secs == 0 {
            return Err(SettingsError::Invalid(
                "scrape.timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_defaults_mirror_install_then_scrape() {
        let settings = Settings::default().validate().unwrap();

        assert_eq!(settings.provision.installer, ["pip", "install", "-r"]);
        assert_eq!(settings.provision.manifest, PathBuf::from("requirements.txt"));
        assert_eq!(settings.run.stages, vec![vec!["python", "scrape.py"]]);
        assert_eq!(settings.scrape.output, PathBuf::from("ampol_tgp_data.csv"));
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(
            &path,
            r#"
[provision]
manifest = "deps.txt"

[run]
stages = [["./scrape"], ["tee", "scrape.log"]]
"#,
        )
        .unwrap();

        let settings = Settings::load(Some(&path)).expect("Failed to load settings");

        assert_eq!(settings.provision.installer, ["pip", "install", "-r"]);
        assert_eq!(settings.provision.manifest, PathBuf::from("deps.txt"));
        assert_eq!(settings.run.stages.len(), 2);
        assert_eq!(settings.run.stages[1], ["tee", "scrape.log"]);
        assert_eq!(settings.scrape.timeout_secs, 30);
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, SettingsError::Load(_)));
    }

    #[test]
    fn test_validate_rejects_empty_stage() {
        let mut settings = Settings::default();
        settings.run.stages.push(Vec::new());

        let err = settings.validate().unwrap_err();
        assert!(matches!(err, SettingsError::Invalid(_)));
    }
}
