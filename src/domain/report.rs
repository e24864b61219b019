//! Cost reports and recipe trees
//!
//! A menu report lists an item's lines, then each line's recipe header
//! and ingredients, with marked-up costs and the gap to the menu price.

use serde::Serialize;

use super::edge::{RecipeEdge, RECIPE_HEADER};
use super::graph::RecipeGraph;
use super::kitchen::Kitchen;

/// Markups applied when none are configured
pub const DEFAULT_MULTIPLIERS: [f64; 2] = [3.0, 3.5];

/// Cost times a markup
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostMultiple {
    pub multiplier: f64,
    pub cost: f64,
}

/// One line of a cost report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub item: String,
    pub ingredient: String,
    pub quantity: String,
    /// Quantity restated in the catalog's pricing unit, when it differs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equivalent: Option<String>,
    pub cost: f64,
    pub multiples: Vec<CostMultiple>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub menu_price: Option<f64>,
    /// Menu price minus cost at the first markup
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difference: Option<f64>,
}

impl ReportRow {
    fn from_edge(kitchen: &Kitchen, edge: &RecipeEdge, multipliers: &[f64]) -> Self {
        let equivalent = kitchen
            .equivalent_quantity(&edge.parent, &edge.child)
            .filter(|q| q.unit() != edge.quantity.unit())
            .map(|q| q.to_string());
        let multiples = multipliers
            .iter()
            .map(|&multiplier| CostMultiple {
                multiplier,
                cost: edge.cost * multiplier,
            })
            .collect::<Vec<_>>();
        let difference = match (edge.menu_price, multiples.first()) {
            (Some(price), Some(first)) => Some(price - first.cost),
            _ => None,
        };
        Self {
            item: edge.parent.clone(),
            ingredient: edge.child.clone(),
            quantity: edge.quantity_text.clone(),
            equivalent,
            cost: edge.cost,
            multiples,
            menu_price: edge.menu_price,
            difference,
        }
    }
}

/// Resolves and reports `item`: its lines, then each line's recipe
pub fn menu_report(kitchen: &mut Kitchen, item: &str, multipliers: &[f64]) -> Vec<ReportRow> {
    let lines = kitchen.calculate_cost(item);
    for line in &lines {
        kitchen.calculate_cost(&line.ingredient);
    }

    let kitchen: &Kitchen = kitchen;
    let graph = kitchen.graph();
    let mut edges: Vec<&RecipeEdge> = graph.child_edges(item);
    for line in &lines {
        if let Some(header) = graph.header(&line.ingredient) {
            edges.push(header);
        }
        edges.extend(graph.child_edges(&line.ingredient));
    }

    edges
        .into_iter()
        .map(|edge| ReportRow::from_edge(kitchen, edge, multipliers))
        .collect()
}

/// Resolves and reports one recipe: its header, then its ingredients
pub fn recipe_report(kitchen: &mut Kitchen, name: &str, multipliers: &[f64]) -> Vec<ReportRow> {
    if kitchen.recipe_cost(name).is_err() {
        tracing::debug!(name, "no recipe header, reporting lines only");
    }
    kitchen.calculate_cost(name);

    let kitchen: &Kitchen = kitchen;
    let graph = kitchen.graph();
    let mut edges: Vec<&RecipeEdge> = graph.header(name).into_iter().collect();
    edges.extend(graph.child_edges(name));
    edges
        .into_iter()
        .map(|edge| ReportRow::from_edge(kitchen, edge, multipliers))
        .collect()
}

/// Nested view of a recipe and everything beneath it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeNode {
    pub name: String,
    pub ingredient: String,
    pub quantity: String,
    pub cost: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversion: Option<String>,
    pub note: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

/// Builds the tree rooted at `name`'s recipe header (or a bare node)
pub fn build_tree(graph: &RecipeGraph, name: &str) -> TreeNode {
    match graph.header(name) {
        Some(header) => tree_node(graph, header),
        None => tree_node(graph, &RecipeEdge::new(RECIPE_HEADER, name, "")),
    }
}

fn tree_node(graph: &RecipeGraph, edge: &RecipeEdge) -> TreeNode {
    TreeNode {
        name: edge.parent.clone(),
        ingredient: edge.child.clone(),
        quantity: edge.quantity_text.clone(),
        cost: edge.cost,
        conversion: edge.conversion.clone(),
        note: edge.note.clone(),
        children: graph
            .child_edges(&edge.child)
            .into_iter()
            .map(|child| tree_node(graph, child))
            .collect(),
    }
}
