//! Recipe edges
//!
//! An edge says "`parent` uses `quantity` of `child`". The edge from the
//! reserved parent [`RECIPE_HEADER`] to a composite is its recipe header:
//! it names the batch quantity the composite's ingredients make and
//! carries the composite's aggregate cost.

use serde::Serialize;
use std::collections::BTreeSet;

use super::conversion::{parse_conversion_ratios, ConversionRatio};
use super::quantity::Quantity;

/// Parent name of recipe header edges
pub const RECIPE_HEADER: &str = "recipe";

/// One row of the recipe sheet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeEdge {
    pub parent: String,
    pub child: String,
    pub quantity: Quantity,
    /// Quantity as written in the sheet
    pub quantity_text: String,
    /// Resolved cost, 0 until computed or after invalidation
    pub cost: f64,
    /// User-entered cost
    pub override_cost: Option<f64>,
    /// `;`-separated `A per B` ratios
    pub conversion: Option<String>,
    pub note: String,
    /// Target selling price
    pub menu_price: Option<f64>,
    #[serde(skip)]
    pub allergens: Option<BTreeSet<String>>,
}

impl RecipeEdge {
    /// Creates an edge with no cost yet
    pub fn new(parent: impl Into<String>, child: impl Into<String>, quantity: &str) -> Self {
        Self {
            parent: parent.into(),
            child: child.into(),
            quantity: Quantity::parse(quantity),
            quantity_text: quantity.trim().to_string(),
            cost: 0.0,
            override_cost: None,
            conversion: None,
            note: String::new(),
            menu_price: None,
            allergens: None,
        }
    }

    /// Creates the recipe header for a composite
    pub fn header(name: impl Into<String>, quantity: &str) -> Self {
        Self::new(RECIPE_HEADER, name, quantity)
    }

    pub fn with_override(mut self, cost: f64) -> Self {
        self.override_cost = Some(cost);
        self
    }

    pub fn with_conversion(mut self, conversion: impl Into<String>) -> Self {
        self.conversion = Some(conversion.into());
        self
    }

    pub fn with_menu_price(mut self, price: f64) -> Self {
        self.menu_price = Some(price);
        self
    }

    /// Returns true if this is a recipe header
    pub fn is_header(&self) -> bool {
        self.parent == RECIPE_HEADER
    }

    /// The override cost, if present and non-negative
    pub fn usable_override(&self) -> Option<f64> {
        self.override_cost.filter(|c| *c >= 0.0)
    }

    /// Parsed conversion ratios declared on this edge
    pub fn conversion_ratios(&self) -> Vec<ConversionRatio> {
        self.conversion
            .as_deref()
            .map(parse_conversion_ratios)
            .unwrap_or_default()
    }

    /// Replaces the quantity, re-parsing it
    pub fn set_quantity(&mut self, quantity: &str) {
        self.quantity = Quantity::parse(quantity);
        self.quantity_text = quantity.trim().to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::quantity::Unit;

    #[test]
    fn header_edges() {
        let header = RecipeEdge::header("sauce", "1 cup");
        assert!(header.is_header());
        assert_eq!(header.quantity, Quantity::new(1.0, Unit::Cup));
        assert!(!RecipeEdge::new("pasta", "sauce", "2 tbsp").is_header());
    }

    #[test]
    fn negative_override_is_unusable() {
        let edge = RecipeEdge::new("pasta", "sauce", "2 tbsp");
        assert_eq!(edge.usable_override(), None);
        assert_eq!(edge.clone().with_override(0.0).usable_override(), Some(0.0));
        assert_eq!(edge.with_override(-1.0).usable_override(), None);
    }

    #[test]
    fn set_quantity_reparses() {
        let mut edge = RecipeEdge::new("bread", "flour", "2 lb");
        edge.set_quantity(" 3 lb ");
        assert_eq!(edge.quantity, Quantity::new(3.0, Unit::Pound));
        assert_eq!(edge.quantity_text, "3 lb");
    }
}
