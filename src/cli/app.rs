//! Main CLI application structure

use anyhow::Result;
use clap::{Parser, Subcommand};

use super::edit::{self, LineFields};
use super::output::{Output, OutputFormat};
use super::query;
use crate::domain::{Kitchen, PricePolicy};
use crate::storage::{Config, Project};

#[derive(Parser)]
#[command(name = "menucost")]
#[command(author, version, about = "Recipe and menu costing from a supplier price guide")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (defaults to the global config, then text)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable debug logging on stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Price selection policy: recent, all, max:N or min:N
    #[arg(long, global = true)]
    pub policy: Option<PricePolicy>,

    /// Use entered line costs before computing them
    #[arg(long, global = true)]
    pub prefer_override: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new menucost project
    Init {
        /// Path to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,
    },

    /// Cost of one ingredient line
    Cost {
        /// Item (or `recipe` for a header line)
        item: String,
        ingredient: String,
    },

    /// Batch cost and lines of a recipe
    Recipe { name: String },

    /// Cost of every line of an item
    Menu { item: String },

    /// Menu report with marked-up costs and margins
    Report {
        item: String,

        /// Markup to show; repeat for several (defaults to config)
        #[arg(long = "multiplier", short = 'm')]
        multipliers: Vec<f64>,
    },

    /// Nested recipe tree with costs
    Tree { name: String },

    /// Allergens of an ingredient or recipe
    Allergens { name: String },

    /// Base ingredients needed for an amount of a recipe
    Flatten {
        name: String,
        /// Amount to make, e.g. "2 qt"
        quantity: String,
    },

    /// Search the price guide by nickname or description
    Lookup { term: String },

    /// Convert a quantity of an ingredient to another unit
    Convert {
        ingredient: String,
        /// Quantity to convert, e.g. "2 cup"
        from: String,
        /// Target unit or quantity, e.g. "g"
        to: String,
    },

    /// Add a recipe line
    Add {
        /// Item (or `recipe` for a header line)
        item: String,
        ingredient: String,
        quantity: String,

        #[command(flatten)]
        fields: LineFields,
    },

    /// Remove a recipe line
    Remove { item: String, ingredient: String },

    /// Set the price of every guide entry for a nickname
    SetPrice { nickname: String, price: String },

    /// Set the pack size of every guide entry for a nickname
    SetSize { nickname: String, size: String },

    /// Set conversion ratios of a guide nickname, or of a recipe line with --item
    SetConversion {
        /// Guide nickname, or the ingredient of the line with --item
        name: String,
        /// Ratios such as "1 cup per 240 g", `;`-separated, or `none`
        conversion: String,

        /// Recipe item whose line gets the ratios
        #[arg(long)]
        item: Option<String>,
    },

    /// Change the quantity of a recipe line
    SetQuantity {
        item: String,
        ingredient: String,
        quantity: String,
    },

    /// Set the entered cost of a recipe line, or `none` to clear it
    SetOverride {
        item: String,
        ingredient: String,
        cost: String,
    },

    /// Set the selling price of a recipe line, or `none` to clear it
    SetMenuPrice {
        item: String,
        ingredient: String,
        price: String,
    },
}

/// Main entry point for the CLI
pub fn run(cli: Cli) -> Result<()> {
    let format = match cli.format {
        Some(format) => format,
        None => Config::load()?.global.default_format,
    };
    let output = Output::new(format);

    if let Commands::Init { path } = &cli.command {
        let project = Project::init(path)?;
        tracing::debug!(dir = %project.project_dir().display(), "created project directory");
        output.success(&format!("Initialized menucost project at {}", project.root().display()));
        return Ok(());
    }

    let project = Project::open_current()?;
    tracing::debug!(root = %project.root().display(), "opened project");
    let mut kitchen = project.load_kitchen()?;
    apply_overrides(&mut kitchen, cli.policy, cli.prefer_override);

    let multipliers = project.config().project.cost_multipliers.clone();
    let k = &mut kitchen;

    match cli.command {
        Commands::Init { .. } => Ok(()),

        Commands::Cost { item, ingredient } => query::cost(&output, k, &item, &ingredient),
        Commands::Recipe { name } => query::recipe(&output, k, &name, &multipliers),
        Commands::Menu { item } => query::menu(&output, k, &item),
        Commands::Report {
            item,
            multipliers: requested,
        } => {
            let multipliers = if requested.is_empty() { multipliers } else { requested };
            query::report(&output, k, &item, &multipliers)
        }
        Commands::Tree { name } => query::tree(&output, k, &name),
        Commands::Allergens { name } => query::allergens(&output, k, &name),
        Commands::Flatten { name, quantity } => query::flatten(&output, k, &name, &quantity),
        Commands::Lookup { term } => query::lookup(&output, k, &term),
        Commands::Convert { ingredient, from, to } => query::convert(&output, k, &ingredient, &from, &to),

        Commands::Add {
            item,
            ingredient,
            quantity,
            fields,
        } => edit::add(&output, &project, k, &item, &ingredient, &quantity, fields),
        Commands::Remove { item, ingredient } => edit::remove(&output, &project, k, &item, &ingredient),
        Commands::SetPrice { nickname, price } => edit::set_price(&output, &project, k, &nickname, &price),
        Commands::SetSize { nickname, size } => edit::set_size(&output, &project, k, &nickname, &size),
        Commands::SetConversion { name, conversion, item } => {
            edit::set_conversion(&output, &project, k, &name, &conversion, item.as_deref())
        }
        Commands::SetQuantity {
            item,
            ingredient,
            quantity,
        } => edit::set_quantity(&output, &project, k, &item, &ingredient, &quantity),
        Commands::SetOverride {
            item,
            ingredient,
            cost,
        } => edit::set_override(&output, &project, k, &item, &ingredient, &cost),
        Commands::SetMenuPrice {
            item,
            ingredient,
            price,
        } => edit::set_menu_price(&output, &project, k, &item, &ingredient, &price),
    }
}

/// Command-line resolution flags win over the project config
fn apply_overrides(kitchen: &mut Kitchen, policy: Option<PricePolicy>, prefer_override: bool) {
    if let Some(policy) = policy {
        tracing::debug!(%policy, "policy from command line");
        kitchen.set_policy(policy);
    }
    if prefer_override {
        kitchen.set_prefer_override(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_global_resolution_flags() {
        let cli = Cli::try_parse_from([
            "menucost",
            "report",
            "lunch",
            "--policy",
            "max:2",
            "--prefer-override",
            "-m",
            "3",
            "-m",
            "4",
        ])
        .unwrap();
        assert_eq!(cli.policy, Some(PricePolicy::Max(2)));
        assert!(cli.prefer_override);
        match cli.command {
            Commands::Report { multipliers, .. } => assert_eq!(multipliers, vec![3.0, 4.0]),
            _ => panic!("expected report"),
        }
    }

    #[test]
    fn rejects_unknown_policy() {
        assert!(Cli::try_parse_from(["menucost", "menu", "lunch", "--policy", "cheapest"]).is_err());
    }
}
