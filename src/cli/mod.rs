//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting.
//!
//! ## Command Groups
//!
//! | Group | Purpose | Examples |
//! |-------|---------|----------|
//! | Core | Project setup | `init` |
//! | Costing | Resolve and report costs | `cost`, `recipe`, `menu`, `report`, `tree` |
//! | Lookup | Guide and recipe queries | `lookup`, `convert`, `allergens`, `flatten` |
//! | Editing | Change the sheets | `add`, `remove`, `set-price`, `set-size`, `set-conversion`, `set-quantity`, `set-override`, `set-menu-price` |
//!
//! ## Output Formats
//!
//! All commands support `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Verbose Mode
//!
//! Use `--verbose` (or `-v`) for debug logs on stderr:
//! ```bash
//! menucost --verbose menu lunch
//! ```
//!
//! ## Entry Point
//!
//! Parse a [`Cli`] and call [`run()`] to execute the command.

mod app;
mod edit;
mod output;
mod query;

pub use app::{run, Cli, Commands};
pub use output::{Output, OutputFormat};
