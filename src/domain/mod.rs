//! Domain models for menu costing
//!
//! Contains the costing logic without any I/O concerns.

mod quantity;
mod conversion;
mod price;
mod diagnostics;
mod catalog;
mod policy;
mod edge;
mod graph;
mod resolver;
mod allergen;
mod flatten;
mod kitchen;
mod report;

pub use quantity::{format_magnitude, Dimension, Measure, Quantity, QuantityError, Unit};
pub use conversion::{convert_quantity, parse_conversion_ratios, ConversionRatio};
pub use price::{default_price_date, PriceEntry};
pub use diagnostics::{CostIssue, Diagnostics};
pub use catalog::{PriceCatalog, PricedOption};
pub use policy::{PolicyError, PricePolicy, SelectPrices};
pub use edge::{RecipeEdge, RECIPE_HEADER};
pub use graph::{GraphError, RecipeGraph};
pub use resolver::{ResolveOptions, ResolverStats};
pub use flatten::FlatRow;
pub use kitchen::{IngredientCost, Kitchen, KitchenError};
pub use report::{
    build_tree, menu_report, recipe_report, CostMultiple, ReportRow, TreeNode, DEFAULT_MULTIPLIERS,
};
