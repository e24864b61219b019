//! Cost resolution
//!
//! [`CostResolver::cost_of`] computes what `parent` pays for its edge to
//! `child` and memoizes the result on that edge:
//!
//! 1. In prefer-override mode a usable override cost wins outright.
//! 2. A priced leaf is costed from the catalog through the price policy.
//! 3. A composite's cached header cost is scaled to the requested
//!    quantity; an uncached header is recomputed from its children first.
//!
//! Cached costs stay until [`RecipeGraph::invalidate`] zeroes them. Missing
//! data never aborts resolution: the affected edge costs zero and a
//! [`CostIssue`] is recorded.

use serde::Serialize;

use super::catalog::PriceCatalog;
use super::conversion::resolve_cost_with_conversion;
use super::diagnostics::{CostIssue, Diagnostics};
use super::edge::{RecipeEdge, RECIPE_HEADER};
use super::graph::RecipeGraph;
use super::policy::{weighted_cost, PricePolicy, SelectPrices};
use super::quantity::{Measure, Quantity};

/// Knobs that change how costs resolve
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolveOptions {
    pub policy: PricePolicy,
    /// Prefer user-entered override costs over computed ones
    pub prefer_override: bool,
}

/// Counters for observing resolver work
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolverStats {
    /// Catalog lookups for leaf ingredients
    pub leaf_lookups: u64,
    /// Composite costs summed from their children
    pub recipe_computations: u64,
    /// Cached costs reused without recomputation
    pub cache_hits: u64,
}

/// Resolves and memoizes costs over a borrowed catalog and graph
pub struct CostResolver<'k> {
    catalog: &'k PriceCatalog,
    graph: &'k mut RecipeGraph,
    diagnostics: &'k mut Diagnostics,
    stats: &'k mut ResolverStats,
    options: ResolveOptions,
}

impl<'k> CostResolver<'k> {
    pub fn new(
        catalog: &'k PriceCatalog,
        graph: &'k mut RecipeGraph,
        diagnostics: &'k mut Diagnostics,
        stats: &'k mut ResolverStats,
        options: ResolveOptions,
    ) -> Self {
        Self {
            catalog,
            graph,
            diagnostics,
            stats,
            options,
        }
    }

    /// Weighted cost of `quantity` of a leaf under the active policy
    pub fn leaf_cost(&mut self, edge: &RecipeEdge) -> f64 {
        self.stats.leaf_lookups += 1;
        let options = self.catalog.priced_options(
            &edge.child,
            Some(edge.quantity),
            &edge.conversion_ratios(),
            self.diagnostics,
        );
        if options.is_empty() {
            return 0.0;
        }
        let selected = self.options.policy.select(options);
        weighted_cost(&selected)
    }

    /// Cost of the edge from `parent` to `child`, memoized on the edge
    pub fn cost_of(&mut self, parent: &str, child: &str) -> f64 {
        let Some(edge) = self.graph.edge(parent, child).cloned() else {
            tracing::warn!(parent, child, "no such edge");
            return 0.0;
        };

        if self.options.prefer_override {
            if let Some(cost) = edge.usable_override() {
                tracing::debug!(parent, child, cost, "using override cost");
                self.graph.set_cost(parent, child, cost);
                return cost;
            }
        }

        if self.catalog.is_ingredient(child) {
            let cost = self.leaf_cost(&edge);
            tracing::debug!(parent, child, cost, "priced leaf");
            self.graph.set_cost(parent, child, cost);
            return cost;
        }

        let Some(header) = self.graph.header(child).cloned() else {
            if let Some(cost) = edge.usable_override() {
                self.graph.set_cost(parent, child, cost);
                return cost;
            }
            self.diagnostics.record(CostIssue::UnknownRecipe {
                item: parent.to_string(),
                ingredient: child.to_string(),
                quantity: edge.quantity_text.clone(),
            });
            self.graph.set_cost(parent, child, 0.0);
            return 0.0;
        };

        if self.graph.header_count(child) > 1 {
            self.diagnostics.record(CostIssue::AmbiguousRecipeHeader {
                name: child.to_string(),
            });
        }

        let header_override = header.override_cost.filter(|c| *c > 0.0);
        let recipe_cost = match header_override {
            Some(cost) if self.options.prefer_override => cost,
            _ => header.cost,
        };

        if recipe_cost > 0.0 {
            self.stats.cache_hits += 1;
            return match self.scale_to_request(recipe_cost, &header, edge.quantity) {
                Some(cost) => {
                    self.graph.set_cost(parent, child, cost);
                    cost
                }
                None => {
                    self.record_unresolved(child, &edge);
                    0.0
                }
            };
        }

        let sub_edges: Vec<RecipeEdge> =
            self.graph.child_edges(child).into_iter().cloned().collect();
        if sub_edges.is_empty() {
            return recipe_cost;
        }

        self.stats.recipe_computations += 1;
        tracing::debug!(recipe = child, children = sub_edges.len(), "computing recipe cost");

        let mut total = 0.0;
        for sub in &sub_edges {
            total += self.child_cost(child, sub);
        }
        self.graph.set_cost(RECIPE_HEADER, child, total);

        let cost = match self.scale_to_request(total, &header, edge.quantity) {
            Some(cost) => cost,
            None => {
                self.record_unresolved(child, &edge);
                0.0
            }
        };
        self.graph.set_cost(parent, child, cost);
        cost
    }

    /// Resolves one ingredient of a recipe being summed
    fn child_cost(&mut self, recipe: &str, sub: &RecipeEdge) -> f64 {
        let saved = sub.usable_override();

        if self.options.prefer_override {
            if let Some(cost) = saved {
                self.graph.set_cost(recipe, &sub.child, cost);
                return cost;
            }
        }

        if sub.cost > 0.0 {
            self.stats.cache_hits += 1;
            return sub.cost;
        }

        let mut cost = self.cost_of(recipe, &sub.child);
        if cost <= 0.0 {
            cost = saved.unwrap_or(0.0);
            if cost == 0.0 && !sub.quantity.is_zero() {
                tracing::warn!(recipe, ingredient = %sub.child, quantity = %sub.quantity_text, "no cost");
            }
        }
        self.graph.set_cost(recipe, &sub.child, cost);
        cost
    }

    /// Scales a header's batch cost to the requested quantity
    ///
    /// Same-dimension requests scale by the quantity ratio; others go
    /// through the header's conversion ratios. A zero header quantity
    /// stands for one count.
    fn scale_to_request(
        &self,
        batch_cost: f64,
        header: &RecipeEdge,
        requested: Quantity,
    ) -> Option<f64> {
        let batch = if header.quantity.is_zero() {
            Quantity::count(1.0)
        } else {
            header.quantity
        };

        if requested.is_compatible(&batch) {
            return requested.ratio_to(&batch).map(|ratio| batch_cost * ratio);
        }

        let unit_cost = Measure::scalar(batch_cost) / batch;
        resolve_cost_with_conversion(unit_cost, requested, &header.conversion_ratios())
            .ok()
            .map(|resolved| resolved.cost)
    }

    fn record_unresolved(&mut self, child: &str, edge: &RecipeEdge) {
        self.diagnostics.record(CostIssue::UnresolvedConversion {
            ingredient: child.to_string(),
            quantity: edge.quantity_text.clone(),
        });
    }

    /// Cost of a whole recipe batch
    ///
    /// In prefer-override mode a non-negative header override is used as-is.
    pub fn recipe_cost(&mut self, name: &str) -> f64 {
        if self.options.prefer_override {
            if let Some(cost) = self.graph.header(name).and_then(RecipeEdge::usable_override) {
                self.graph.set_cost(RECIPE_HEADER, name, cost);
                return cost;
            }
        }
        self.cost_of(RECIPE_HEADER, name)
    }

    /// Resolves every ingredient of `item`, returning `(ingredient, cost)` pairs
    pub fn calculate_cost(&mut self, item: &str) -> Vec<(String, f64)> {
        let children = self.graph.children_of(item);
        children
            .into_iter()
            .map(|child| {
                let cost = self.cost_of(item, &child);
                (child, cost)
            })
            .collect()
    }
}
