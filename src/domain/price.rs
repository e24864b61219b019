//! Price-guide entries
//!
//! One row of the supplier price guide. Several entries may share a
//! nickname: the same ingredient bought from different suppliers, in
//! different pack sizes, or on different dates.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::conversion::{parse_conversion_ratios, ConversionRatio};
use super::quantity::{Dimension, Measure, Quantity, Unit};

/// A dated, priced supplier item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceEntry {
    /// Catalog key shared by all entries for one ingredient
    pub nickname: String,
    pub description: String,
    pub supplier: String,
    /// Supplier item number
    pub number: String,
    pub price: f64,
    /// Pricing unit; `lb` means the price is per pound regardless of size
    pub unit: String,
    /// Pack size parsed once at ingestion
    pub size: Quantity,
    /// Pack size as written in the guide, kept for persistence
    pub size_text: String,
    pub brand: String,
    /// Weight hint for averaging; `None` weighs 1
    pub order: Option<f64>,
    pub note: String,
    /// Comma-separated allergen tags
    pub allergen: String,
    /// `;`-separated `A per B` ratios
    pub conversion: Option<String>,
    pub date: NaiveDate,
}

impl PriceEntry {
    /// Creates an entry with the given nickname, price and pack size
    pub fn new(nickname: impl Into<String>, price: f64, size: &str) -> Self {
        Self {
            nickname: nickname.into(),
            description: String::new(),
            supplier: String::new(),
            number: String::new(),
            price,
            unit: String::new(),
            size: Quantity::parse_size(size),
            size_text: size.to_string(),
            brand: String::new(),
            order: None,
            note: String::new(),
            allergen: String::new(),
            conversion: None,
            date: default_price_date(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_supplier(mut self, supplier: impl Into<String>) -> Self {
        self.supplier = supplier.into();
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn with_order(mut self, order: f64) -> Self {
        self.order = Some(order);
        self
    }

    pub fn with_allergen(mut self, allergen: impl Into<String>) -> Self {
        self.allergen = allergen.into();
        self
    }

    pub fn with_conversion(mut self, conversion: impl Into<String>) -> Self {
        self.conversion = Some(conversion.into());
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = date;
        self
    }

    /// Replaces the pack size, re-parsing it
    pub fn set_size(&mut self, size: &str) {
        self.size = Quantity::parse_size(size);
        self.size_text = size.to_string();
    }

    /// Returns true if the price is per pound rather than per pack
    ///
    /// An `lb` unit means per-pound pricing for catch-weight sizes (ranges,
    /// `av`) and sizes that are not a weight. A fixed-weight pack such as
    /// `50 lb` is priced per pack.
    pub fn is_priced_by_pound(&self) -> bool {
        if !self.unit.trim().eq_ignore_ascii_case("lb") {
            return false;
        }
        self.size.dimension() != Dimension::MASS || is_catch_weight(&self.size_text)
    }

    /// The quantity the price buys: one pound for `lb` pricing, else the pack size
    pub fn basis(&self) -> Quantity {
        if self.is_priced_by_pound() {
            Quantity::new(1.0, Unit::Pound)
        } else {
            self.size
        }
    }

    /// Price per base unit of the basis
    pub fn unit_cost(&self) -> Measure {
        Measure::scalar(self.price) / self.basis()
    }

    /// Human-readable cost per unit, e.g. `$0.50 / lb`
    pub fn unit_cost_label(&self) -> String {
        let basis = self.basis();
        if basis.is_zero() {
            return format!("${:.2}", self.price);
        }
        let per = self.price / basis.magnitude();
        format!("${:.2} / {}", per, basis.unit())
    }

    /// Trimmed, non-empty allergen tags
    pub fn allergen_tags(&self) -> impl Iterator<Item = &str> {
        self.allergen
            .split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
    }

    /// Parsed conversion ratios declared on this entry
    pub fn conversion_ratios(&self) -> Vec<ConversionRatio> {
        self.conversion
            .as_deref()
            .map(parse_conversion_ratios)
            .unwrap_or_default()
    }
}

fn is_catch_weight(size: &str) -> bool {
    let lowered = size.to_lowercase();
    lowered.contains('-')
        || lowered
            .split(|c: char| !c.is_ascii_alphabetic())
            .any(|word| matches!(word, "av" | "avg" | "average"))
}

/// Date assigned to entries whose date cell is missing or unreadable
pub fn default_price_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_cost_uses_pack_size() {
        let entry = PriceEntry::new("flour", 25.0, "50 lb");
        let cost = entry.unit_cost() * Quantity::new(2.0, Unit::Pound);
        assert!(cost.is_dimensionless());
        assert!((cost.value() - 1.0).abs() < 1e-9);
        assert_eq!(entry.unit_cost_label(), "$0.50 / lb");
    }

    #[test]
    fn pound_pricing_forces_one_pound_basis() {
        let entry = PriceEntry::new("brisket", 6.0, "12-14 lb").with_unit("LB");
        assert!(entry.is_priced_by_pound());
        let cost = entry.unit_cost() * Quantity::new(3.0, Unit::Pound);
        assert!((cost.value() - 18.0).abs() < 1e-9);
    }

    #[test]
    fn fixed_weight_pack_ignores_pound_unit() {
        let entry = PriceEntry::new("flour", 25.0, "50 lb").with_unit("lb");
        assert!(!entry.is_priced_by_pound());
        let cost = entry.unit_cost() * Quantity::new(2.0, Unit::Pound);
        assert!((cost.value() - 1.0).abs() < 1e-9);

        assert!(PriceEntry::new("turkey", 2.5, "20 lb av").with_unit("lb").is_priced_by_pound());
        assert!(PriceEntry::new("ham", 3.0, "1 case").with_unit("lb").is_priced_by_pound());
    }

    #[test]
    fn allergen_tags_are_trimmed() {
        let entry = PriceEntry::new("pesto", 8.0, "1 qt").with_allergen("tree nut, dairy ,");
        let tags: Vec<_> = entry.allergen_tags().collect();
        assert_eq!(tags, vec!["tree nut", "dairy"]);
    }

    #[test]
    fn conversions_parse_from_text() {
        let entry = PriceEntry::new("sugar", 30.0, "25 lb").with_conversion("1 cup per 200 g");
        assert_eq!(entry.conversion_ratios().len(), 1);
        assert!(PriceEntry::new("salt", 1.0, "1 lb").conversion_ratios().is_empty());
    }
}
