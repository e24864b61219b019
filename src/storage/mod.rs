//! # Storage Layer
//!
//! Persistence for menucost in plain CSV sheets that a spreadsheet can
//! open directly.
//!
//! ## Storage Formats
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Price guide | CSV | `.menucost/guide.csv` |
//! | Recipes | CSV | `.menucost/recipes.csv` |
//! | Config | TOML | `.menucost/config.toml` |
//!
//! ## Concurrency Safety
//!
//! - [`SheetStore`] takes a shared lock to read and an exclusive lock to write (`fs2`)
//! - All writes are atomic (temp file + rename)
//!
//! ## Key Types
//!
//! - [`Project`] - Entry point for accessing a menucost project
//! - [`SheetStore`] - Read/write the guide and recipe sheets
//! - [`Config`] - Project and global configuration

mod config;
mod project;
mod sheet;

pub use config::{Config, ConfigError, GlobalConfig, OutputFormat, ProjectConfig, SheetsConfig, PROJECT_DIR};
pub use project::{Project, ProjectError};
pub use sheet::{parse_date, parse_number, SheetError, SheetStore, GUIDE_COLUMNS, RECIPE_COLUMNS};
