//! Project management
//!
//! Handles project initialization and loads the kitchen from its sheets.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

use super::config::PROJECT_DIR;
use super::{Config, SheetStore, GUIDE_COLUMNS, RECIPE_COLUMNS};
use crate::domain::Kitchen;

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Not in a menucost project. Run 'menucost init' first.")]
    NotInProject,
}

const DEFAULT_CONFIG: &str = r#"# menucost configuration

# Price selection: recent, all, max:N or min:N
policy = "recent"

# Use entered line costs before computing them
prefer_override = false

# Markups shown in reports; the first drives the margin column
cost_multipliers = [3.0, 3.5]

# Date for guide rows without one
default_date = "2023-01-01"

[sheets]
guide = "guide.csv"
recipes = "recipes.csv"
"#;

/// A menucost project
pub struct Project {
    root: PathBuf,
    config: Config,
}

impl Project {
    /// Opens an existing project at the given path
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.join(PROJECT_DIR).is_dir() {
            return Err(ProjectError::NotInProject.into());
        }

        let config = Config::for_project(&root)?;

        Ok(Self { root, config })
    }

    /// Opens the project at the current directory or a parent
    pub fn open_current() -> Result<Self> {
        let config = Config::load()?;
        let root = config.project_root.clone().ok_or(ProjectError::NotInProject)?;

        Ok(Self { root, config })
    }

    /// Initializes a new project at the given path
    ///
    /// Existing files are left alone, so running it twice is harmless.
    pub fn init(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let project_dir = root.join(PROJECT_DIR);

        fs::create_dir_all(&project_dir).with_context(|| {
            format!("Failed to create {} directory: {}", PROJECT_DIR, project_dir.display())
        })?;

        let config_path = project_dir.join("config.toml");
        if !config_path.exists() {
            fs::write(&config_path, DEFAULT_CONFIG)
                .with_context(|| format!("Failed to write config: {}", config_path.display()))?;
        }

        let project = Self::open(root)?;
        let sheets = project.sheets();
        for (path, columns) in [
            (sheets.guide_path(), GUIDE_COLUMNS.join(",")),
            (sheets.recipes_path(), RECIPE_COLUMNS.join(",")),
        ] {
            if !path.exists() {
                fs::write(path, format!("{}\n", columns))
                    .with_context(|| format!("Failed to write sheet: {}", path.display()))?;
            }
        }

        Ok(project)
    }

    /// Returns the project root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the .menucost directory path
    pub fn project_dir(&self) -> PathBuf {
        self.root.join(PROJECT_DIR)
    }

    /// Returns the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the sheet store
    pub fn sheets(&self) -> SheetStore {
        let dir = self.project_dir();
        let sheets = &self.config.project.sheets;
        SheetStore::new(dir.join(&sheets.guide), dir.join(&sheets.recipes))
            .with_default_date(self.config.project.default_date)
    }

    /// Loads both sheets into a kitchen configured from the project
    pub fn load_kitchen(&self) -> Result<Kitchen> {
        let sheets = self.sheets();
        let catalog = sheets.read_guide()?;
        let graph = sheets.read_recipes()?;
        Ok(Kitchen::from_parts(catalog, graph).with_options(self.config.project.resolve_options()))
    }

    /// Writes both sheets back
    pub fn save(&self, kitchen: &Kitchen) -> Result<()> {
        let sheets = self.sheets();
        sheets.write_guide(kitchen.catalog())?;
        sheets.write_recipes(kitchen.graph())?;
        tracing::debug!(root = %self.root.display(), "saved sheets");
        Ok(())
    }
}
