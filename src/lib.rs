//! menucost - recipe and menu costing
//!
//! Costs composite menu items from a supplier price guide. Recipes form a
//! graph whose leaves are priced ingredients; costs resolve recursively,
//! are cached on the graph, and are invalidated when prices or recipes
//! change.

pub mod domain;
pub mod storage;
pub mod cli;

pub use domain::{CostIssue, Kitchen, PriceCatalog, PriceEntry, Quantity, RecipeEdge, RecipeGraph};
