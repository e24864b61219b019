//! The kitchen: catalog, recipe graph and resolution state in one place
//!
//! Every read and edit goes through [`Kitchen`]. Edits invalidate the
//! cached costs that depend on them and drop cached allergen sets, so
//! later queries never see stale values.

use serde::Serialize;
use std::collections::BTreeSet;
use thiserror::Error;

use super::allergen;
use super::catalog::PriceCatalog;
use super::conversion::{convert_quantity, ConversionRatio};
use super::diagnostics::{CostIssue, Diagnostics};
use super::edge::{RecipeEdge, RECIPE_HEADER};
use super::flatten::{self, FlatRow};
use super::graph::{GraphError, RecipeGraph};
use super::policy::PricePolicy;
use super::price::PriceEntry;
use super::quantity::Quantity;
use super::resolver::{CostResolver, ResolveOptions, ResolverStats};

#[derive(Debug, Error, PartialEq)]
pub enum KitchenError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("No price guide entry for '{0}'")]
    UnknownIngredient(String),

    #[error("No recipe named '{0}'")]
    UnknownRecipe(String),
}

/// One ingredient line of an item with its resolved cost
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngredientCost {
    pub ingredient: String,
    pub quantity: String,
    pub cost: f64,
}

/// Catalog, graph and resolver state
#[derive(Debug, Default)]
pub struct Kitchen {
    catalog: PriceCatalog,
    graph: RecipeGraph,
    diagnostics: Diagnostics,
    stats: ResolverStats,
    options: ResolveOptions,
}

impl Kitchen {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assembles a kitchen from loaded data
    pub fn from_parts(catalog: PriceCatalog, graph: RecipeGraph) -> Self {
        Self {
            catalog,
            graph,
            ..Self::default()
        }
    }

    pub fn with_options(mut self, options: ResolveOptions) -> Self {
        self.options = options;
        self
    }

    pub fn catalog(&self) -> &PriceCatalog {
        &self.catalog
    }

    pub fn graph(&self) -> &RecipeGraph {
        &self.graph
    }

    pub fn options(&self) -> ResolveOptions {
        self.options
    }

    pub fn stats(&self) -> ResolverStats {
        self.stats
    }

    /// Changes the price policy; cached costs no longer apply
    pub fn set_policy(&mut self, policy: PricePolicy) {
        if self.options.policy != policy {
            self.options.policy = policy;
            self.reset_costs();
        }
    }

    /// Toggles override preference; cached costs no longer apply
    pub fn set_prefer_override(&mut self, prefer: bool) {
        if self.options.prefer_override != prefer {
            self.options.prefer_override = prefer;
            self.reset_costs();
        }
    }

    fn reset_costs(&mut self) {
        let cached: Vec<(String, String)> = self
            .graph
            .edges()
            .into_iter()
            .filter(|e| e.cost != 0.0)
            .map(|e| (e.parent.clone(), e.child.clone()))
            .collect();
        for (parent, child) in cached {
            self.graph.set_cost(&parent, &child, 0.0);
        }
    }

    fn resolver(&mut self) -> CostResolver<'_> {
        CostResolver::new(
            &self.catalog,
            &mut self.graph,
            &mut self.diagnostics,
            &mut self.stats,
            self.options,
        )
    }

    // Queries

    /// Cost of the edge from `parent` to `child`
    pub fn cost_of(&mut self, parent: &str, child: &str) -> Result<f64, KitchenError> {
        if self.graph.edge(parent, child).is_none() {
            return Err(GraphError::EdgeNotFound(parent.to_string(), child.to_string()).into());
        }
        Ok(self.resolver().cost_of(parent, child))
    }

    /// Cost of one batch of a recipe
    pub fn recipe_cost(&mut self, name: &str) -> Result<f64, KitchenError> {
        if !self.graph.is_recipe(name) {
            return Err(KitchenError::UnknownRecipe(name.to_string()));
        }
        Ok(self.resolver().recipe_cost(name))
    }

    /// Resolves every ingredient of `item`
    pub fn calculate_cost(&mut self, item: &str) -> Vec<IngredientCost> {
        let costs = self.resolver().calculate_cost(item);
        costs
            .into_iter()
            .map(|(ingredient, cost)| {
                let quantity = self
                    .graph
                    .edge(item, &ingredient)
                    .map(|e| e.quantity_text.clone())
                    .unwrap_or_default();
                IngredientCost {
                    ingredient,
                    quantity,
                    cost,
                }
            })
            .collect()
    }

    /// Allergens of a leaf or composite
    pub fn allergens_of(&mut self, name: &str) -> BTreeSet<String> {
        allergen::allergens_of(&self.catalog, &mut self.graph, name)
    }

    /// Base ingredients needed for `quantity` of `name`
    pub fn flatten(&mut self, name: &str, quantity: Quantity) -> Result<Vec<FlatRow>, KitchenError> {
        if !self.graph.contains(name) {
            return Err(KitchenError::UnknownRecipe(name.to_string()));
        }
        Ok(flatten::flatten(
            &self.catalog,
            &self.graph,
            &mut self.diagnostics,
            name,
            quantity,
        ))
    }

    /// Converts `from` into the unit of `to` using an ingredient's conversions
    pub fn convert(&self, ingredient: &str, from: Quantity, to: Quantity) -> Option<Quantity> {
        convert_quantity(from, to, &self.catalog.conversions_for(ingredient))
    }

    /// The edge quantity restated in the catalog's pricing unit
    ///
    /// `None` for composites, zero quantities, or when no conversion applies.
    pub fn equivalent_quantity(&self, parent: &str, child: &str) -> Option<Quantity> {
        let edge = self.graph.edge(parent, child)?;
        if edge.quantity.is_zero() {
            return None;
        }
        let unit = self.catalog.pricing_unit(child)?;
        let mut ratios: Vec<ConversionRatio> = self.catalog.conversions_for(child);
        ratios.extend(edge.conversion_ratios());
        convert_quantity(edge.quantity, Quantity::new(1.0, unit), &ratios)
    }

    /// Guide lookup by nickname or description
    pub fn lookup(&self, term: &str) -> Vec<&PriceEntry> {
        self.catalog.search(term)
    }

    /// Issues recorded so far
    pub fn issues(&self) -> &[CostIssue] {
        self.diagnostics.issues()
    }

    /// Drains recorded issues
    pub fn take_issues(&mut self) -> Vec<CostIssue> {
        self.diagnostics.take()
    }

    // Edits

    /// Zeroes cached costs that depend on `name`
    pub fn invalidate(&mut self, name: &str) -> usize {
        self.graph.invalidate(name)
    }

    /// Invalidates what depends on a single edge
    fn invalidate_edge(&mut self, parent: &str, child: &str) {
        if parent == RECIPE_HEADER {
            self.graph.invalidate(child);
        } else {
            self.graph.set_cost(parent, child, 0.0);
            self.graph.invalidate(parent);
        }
    }

    fn edge_mut(&mut self, parent: &str, child: &str) -> Result<&mut RecipeEdge, KitchenError> {
        self.graph
            .edge_mut(parent, child)
            .ok_or_else(|| GraphError::EdgeNotFound(parent.to_string(), child.to_string()).into())
    }

    fn catalog_changed(&mut self, nickname: &str) {
        self.graph.invalidate(nickname);
        self.graph.clear_allergen_cache();
    }

    /// Adds a price-guide entry
    pub fn add_price(&mut self, entry: PriceEntry) {
        let nickname = entry.nickname.clone();
        self.catalog.insert(entry);
        self.catalog_changed(&nickname);
    }

    /// Sets the price on every entry of a nickname
    pub fn set_price(&mut self, nickname: &str, price: f64) -> Result<usize, KitchenError> {
        let changed = self.catalog.update_entries(nickname, |e| e.price = price);
        if changed == 0 {
            return Err(KitchenError::UnknownIngredient(nickname.to_string()));
        }
        self.catalog_changed(nickname);
        Ok(changed)
    }

    /// Sets the pack size on every entry of a nickname
    pub fn set_size(&mut self, nickname: &str, size: &str) -> Result<usize, KitchenError> {
        let changed = self.catalog.update_entries(nickname, |e| e.set_size(size));
        if changed == 0 {
            return Err(KitchenError::UnknownIngredient(nickname.to_string()));
        }
        self.catalog_changed(nickname);
        Ok(changed)
    }

    /// Sets the conversion on every entry of a nickname
    pub fn set_conversion(
        &mut self,
        nickname: &str,
        conversion: Option<&str>,
    ) -> Result<usize, KitchenError> {
        let conversion = conversion.map(str::to_string);
        let changed = self
            .catalog
            .update_entries(nickname, |e| e.conversion = conversion.clone());
        if changed == 0 {
            return Err(KitchenError::UnknownIngredient(nickname.to_string()));
        }
        self.catalog_changed(nickname);
        Ok(changed)
    }

    /// Adds an ingredient line (or recipe header)
    pub fn add_ingredient(&mut self, edge: RecipeEdge) -> Result<(), KitchenError> {
        let (parent, child) = (edge.parent.clone(), edge.child.clone());
        self.graph.add_edge(edge)?;
        self.invalidate_edge(&parent, &child);
        self.graph.clear_allergen_cache();
        Ok(())
    }

    /// Removes an ingredient line
    pub fn remove_ingredient(&mut self, parent: &str, child: &str) -> Result<RecipeEdge, KitchenError> {
        if self.graph.edge(parent, child).is_none() {
            return Err(GraphError::EdgeNotFound(parent.to_string(), child.to_string()).into());
        }
        self.invalidate_edge(parent, child);
        self.graph.clear_allergen_cache();
        self.graph
            .remove_edge(parent, child)
            .ok_or_else(|| GraphError::EdgeNotFound(parent.to_string(), child.to_string()).into())
    }

    /// Changes the quantity of an ingredient line
    pub fn set_quantity(&mut self, parent: &str, child: &str, quantity: &str) -> Result<(), KitchenError> {
        self.edge_mut(parent, child)?.set_quantity(quantity);
        self.invalidate_edge(parent, child);
        Ok(())
    }

    /// Sets or clears the override cost of an ingredient line
    pub fn set_override(&mut self, parent: &str, child: &str, cost: Option<f64>) -> Result<(), KitchenError> {
        self.edge_mut(parent, child)?.override_cost = cost;
        self.invalidate_edge(parent, child);
        Ok(())
    }

    /// Sets or clears the conversion of an ingredient line
    pub fn set_edge_conversion(
        &mut self,
        parent: &str,
        child: &str,
        conversion: Option<&str>,
    ) -> Result<(), KitchenError> {
        self.edge_mut(parent, child)?.conversion = conversion.map(str::to_string);
        self.invalidate_edge(parent, child);
        Ok(())
    }

    /// Sets or clears the menu price of a line; costs are unaffected
    pub fn set_menu_price(&mut self, parent: &str, child: &str, price: Option<f64>) -> Result<(), KitchenError> {
        self.edge_mut(parent, child)?.menu_price = price;
        Ok(())
    }
}
