//! Allergen aggregation
//!
//! A leaf's allergens are the tags on its price-guide entries; a
//! composite's are the union over every leaf beneath it. Results are
//! cached on the graph edges that point at the item.

use std::collections::BTreeSet;

use super::catalog::PriceCatalog;
use super::graph::RecipeGraph;

/// Union of tags across every entry of a leaf
pub fn leaf_allergens(catalog: &PriceCatalog, nickname: &str) -> BTreeSet<String> {
    catalog
        .entries_for(nickname)
        .into_iter()
        .flat_map(|entry| entry.allergen_tags().map(str::to_string).collect::<Vec<_>>())
        .collect()
}

/// Allergens of `name`, from cache when available
///
/// The cache lives on edges pointing at `name`, so an item no recipe
/// uses (a top-level menu) is recomputed on every call.
pub fn allergens_of(catalog: &PriceCatalog, graph: &mut RecipeGraph, name: &str) -> BTreeSet<String> {
    if let Some(cached) = graph.cached_allergens(name) {
        tracing::debug!(name, "allergen cache hit");
        return cached;
    }

    let allergens = if catalog.is_ingredient(name) {
        leaf_allergens(catalog, name)
    } else {
        let mut descendants = BTreeSet::new();
        graph.all_descendants(name, &mut descendants);
        descendants
            .iter()
            .filter(|d| catalog.is_ingredient(d))
            .flat_map(|d| leaf_allergens(catalog, d))
            .collect()
    };

    graph.cache_allergens(name, &allergens);
    allergens
}
