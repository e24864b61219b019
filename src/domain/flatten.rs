//! Recipe flattening
//!
//! Expands a composite down to the leaves it ultimately uses, scaled to
//! the requested amount, then merges repeated ingredients.

use serde::Serialize;

use super::catalog::PriceCatalog;
use super::conversion::convert_quantity;
use super::diagnostics::{CostIssue, Diagnostics};
use super::graph::RecipeGraph;
use super::quantity::Quantity;

/// One base ingredient and how much of it is needed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatRow {
    pub ingredient: String,
    pub quantity: Quantity,
}

/// Flattens `quantity` of `name` into consolidated base ingredients
pub fn flatten(
    catalog: &PriceCatalog,
    graph: &RecipeGraph,
    diagnostics: &mut Diagnostics,
    name: &str,
    quantity: Quantity,
) -> Vec<FlatRow> {
    let mut rows = Vec::new();
    expand(catalog, graph, diagnostics, name, quantity, &mut rows);
    consolidate(catalog, rows)
}

/// How many batches of `name` make up `quantity`
fn batch_scale(graph: &RecipeGraph, diagnostics: &mut Diagnostics, name: &str, quantity: Quantity) -> f64 {
    let Some(header) = graph.header(name) else {
        tracing::debug!(name, "no recipe header, flattening one batch");
        return 1.0;
    };
    let batch = if header.quantity.is_zero() {
        Quantity::count(1.0)
    } else {
        header.quantity
    };

    if let Some(ratio) = quantity.ratio_to(&batch) {
        return ratio;
    }
    if let Some(ratio) = convert_quantity(quantity, batch, &header.conversion_ratios())
        .and_then(|converted| converted.ratio_to(&batch))
    {
        return ratio;
    }

    diagnostics.record(CostIssue::UnresolvedConversion {
        ingredient: name.to_string(),
        quantity: quantity.to_string(),
    });
    1.0
}

fn expand(
    catalog: &PriceCatalog,
    graph: &RecipeGraph,
    diagnostics: &mut Diagnostics,
    name: &str,
    quantity: Quantity,
    rows: &mut Vec<FlatRow>,
) {
    let scale = batch_scale(graph, diagnostics, name, quantity);

    for edge in graph.child_edges(name) {
        let scaled = edge.quantity.scale(scale);
        if catalog.is_ingredient(&edge.child) || graph.child_edges(&edge.child).is_empty() {
            rows.push(FlatRow {
                ingredient: edge.child.clone(),
                quantity: scaled,
            });
        } else {
            expand(catalog, graph, diagnostics, &edge.child, scaled, rows);
        }
    }
}

/// Merges rows per ingredient in first-appearance order
///
/// Compatible quantities add directly; others go through the catalog's
/// conversions for that ingredient. Anything still unconvertible stays a
/// separate row.
fn consolidate(catalog: &PriceCatalog, rows: Vec<FlatRow>) -> Vec<FlatRow> {
    let mut groups: Vec<(String, Vec<Quantity>)> = Vec::new();

    for row in rows {
        let ratios = catalog.conversions_for(&row.ingredient);
        let idx = match groups.iter().position(|(name, _)| *name == row.ingredient) {
            Some(idx) => idx,
            None => {
                groups.push((row.ingredient.clone(), Vec::new()));
                groups.len() - 1
            }
        };
        let totals = &mut groups[idx].1;

        let merged = totals.iter_mut().any(|total| {
            let addend = if row.quantity.is_compatible(total) {
                Some(row.quantity)
            } else {
                convert_quantity(row.quantity, *total, &ratios)
            };
            match addend.and_then(|q| total.checked_add(&q)) {
                Some(sum) => {
                    *total = sum;
                    true
                }
                None => false,
            }
        });
        if !merged {
            totals.push(row.quantity);
        }
    }

    groups
        .into_iter()
        .flat_map(|(ingredient, totals)| {
            totals.into_iter().map(move |quantity| FlatRow {
                ingredient: ingredient.clone(),
                quantity,
            })
        })
        .collect()
}
