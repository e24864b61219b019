//! Configuration handling for menucost
//!
//! Configuration is stored in `.menucost/config.toml` (project) and
//! `~/.config/menucost/config.toml` (global).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{default_price_date, PricePolicy, ResolveOptions, DEFAULT_MULTIPLIERS};

/// Name of the per-project directory
pub const PROJECT_DIR: &str = ".menucost";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Sheet file names, relative to the project directory
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SheetsConfig {
    pub guide: String,
    pub recipes: String,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            guide: "guide.csv".to_string(),
            recipes: "recipes.csv".to_string(),
        }
    }
}

/// Project-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Which price-guide entries feed a cost
    pub policy: PricePolicy,

    /// Use a line's entered cost before computing one
    pub prefer_override: bool,

    /// Markups shown in reports; the first one drives the margin column
    pub cost_multipliers: Vec<f64>,

    /// Date given to guide rows without a readable date
    pub default_date: NaiveDate,

    pub sheets: SheetsConfig,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            policy: PricePolicy::default(),
            prefer_override: false,
            cost_multipliers: DEFAULT_MULTIPLIERS.to_vec(),
            default_date: default_price_date(),
            sheets: SheetsConfig::default(),
        }
    }
}

impl ProjectConfig {
    /// Resolver options implied by this configuration
    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            policy: self.policy,
            prefer_override: self.prefer_override,
        }
    }

    /// Rejects settings the engine cannot use
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(bad) = self
            .cost_multipliers
            .iter()
            .find(|m| !m.is_finite() || **m <= 0.0)
        {
            return Err(ConfigError::Invalid(format!(
                "cost multiplier must be positive, got {}",
                bad
            )));
        }
        if self.sheets.guide.trim().is_empty() || self.sheets.recipes.trim().is_empty() {
            return Err(ConfigError::Invalid("sheet file names cannot be empty".to_string()));
        }
        Ok(())
    }
}

/// Global user configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GlobalConfig {
    /// Default output format (text or json)
    pub default_format: OutputFormat,
}

/// Output format for commands
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Combined configuration (global + project)
#[derive(Debug, Clone)]
pub struct Config {
    pub project: ProjectConfig,
    pub global: GlobalConfig,
    pub project_root: Option<PathBuf>,
}

impl Config {
    /// Loads configuration from default locations
    pub fn load() -> Result<Self> {
        let global = Self::load_global()?;
        let (project, project_root) = Self::load_project()?;

        Ok(Self {
            project,
            global,
            project_root,
        })
    }

    /// Loads configuration for a specific project
    pub fn for_project(project_root: &Path) -> Result<Self> {
        let global = Self::load_global()?;
        let project = Self::load_project_config(project_root)?;

        Ok(Self {
            project,
            global,
            project_root: Some(project_root.to_path_buf()),
        })
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "menucost", "menucost").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Loads global configuration
    fn load_global() -> Result<GlobalConfig> {
        let config_dir = match Self::global_config_dir() {
            Some(dir) => dir,
            None => return Ok(GlobalConfig::default()),
        };

        let config_path = config_dir.join("config.toml");
        if !config_path.exists() {
            return Ok(GlobalConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read global config: {}", config_path.display()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse global config")
    }

    /// Finds and loads project configuration
    fn load_project() -> Result<(ProjectConfig, Option<PathBuf>)> {
        match Self::find_project_root() {
            Some(root) => {
                let config = Self::load_project_config(&root)?;
                Ok((config, Some(root)))
            }
            None => Ok((ProjectConfig::default(), None)),
        }
    }

    /// Loads project configuration from a specific root
    fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
        let config_path = project_root.join(PROJECT_DIR).join("config.toml");

        if !config_path.exists() {
            return Ok(ProjectConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read project config: {}", config_path.display()))?;

        let config: ProjectConfig = toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse project config")?;
        config
            .validate()
            .with_context(|| format!("Invalid project config: {}", config_path.display()))?;
        Ok(config)
    }

    /// Finds the project root by looking for a `.menucost/` directory
    pub fn find_project_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        Self::find_project_root_from(current)
    }

    /// Walks up from `start` looking for a `.menucost/` directory
    pub fn find_project_root_from(start: PathBuf) -> Option<PathBuf> {
        let mut current = start;
        loop {
            if current.join(PROJECT_DIR).is_dir() {
                return Some(current);
            }
            if !current.pop() {
                return None;
            }
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config() {
        let config = Config {
            project: ProjectConfig::default(),
            global: GlobalConfig::default(),
            project_root: None,
        };

        assert_eq!(config.project.policy, PricePolicy::Recent);
        assert!(!config.project.prefer_override);
        assert_eq!(config.project.cost_multipliers, vec![3.0, 3.5]);
        assert_eq!(config.project.sheets.guide, "guide.csv");
        assert_eq!(config.global.default_format, OutputFormat::Text);
    }

    #[test]
    fn parse_project_config() {
        let toml = r#"
policy = "max:2"
prefer_override = true
cost_multipliers = [4.0]
default_date = "2024-06-01"

[sheets]
recipes = "menu.csv"
"#;

        let config: ProjectConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.policy, PricePolicy::Max(2));
        assert!(config.prefer_override);
        assert_eq!(config.cost_multipliers, vec![4.0]);
        assert_eq!(config.default_date, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert_eq!(config.sheets.recipes, "menu.csv");
        assert_eq!(config.sheets.guide, "guide.csv");

        let options = config.resolve_options();
        assert!(options.prefer_override);
    }

    #[test]
    fn bad_policy_is_a_parse_error() {
        let result: Result<ProjectConfig, _> = toml::from_str(r#"policy = "cheapest""#);
        assert!(result.is_err());
    }

    #[test]
    fn non_positive_multiplier_is_invalid() {
        let config = ProjectConfig {
            cost_multipliers: vec![3.0, 0.0],
            ..ProjectConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn parse_global_config() {
        let config: GlobalConfig = toml::from_str(r#"default_format = "json""#).unwrap();
        assert_eq!(config.default_format, OutputFormat::Json);
    }

    #[test]
    fn find_project_root_walks_up() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(PROJECT_DIR)).unwrap();

        let sub_dir = dir.path().join("sub").join("dir");
        fs::create_dir_all(&sub_dir).unwrap();

        let root = Config::find_project_root_from(sub_dir);
        assert_eq!(root.as_deref(), Some(dir.path()));
    }
}
