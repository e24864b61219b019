//! Conversion ratios between incompatible dimensions
//!
//! A ratio such as `1 cup per 120 g` bridges volume and mass for one
//! ingredient. Ratios are declared as text, `;`-separated, and tried in
//! order together with their reciprocals.

use serde::Serialize;
use std::fmt;

use super::quantity::{Measure, Quantity, QuantityError};

/// A `<numerator> per <denominator>` pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConversionRatio {
    numerator: Quantity,
    denominator: Quantity,
}

impl ConversionRatio {
    /// Creates a ratio; the denominator must be non-zero
    pub fn new(numerator: Quantity, denominator: Quantity) -> Result<Self, QuantityError> {
        if denominator.is_zero() || numerator.is_zero() {
            return Err(QuantityError::InvalidConversion(format!(
                "{} per {}",
                numerator, denominator
            )));
        }
        Ok(Self {
            numerator,
            denominator,
        })
    }

    /// Parses a single `A per B` clause
    pub fn parse(clause: &str) -> Result<Self, QuantityError> {
        let lowered = clause.to_lowercase();
        let (a, b) = lowered
            .split_once(" per ")
            .ok_or_else(|| QuantityError::InvalidConversion(clause.trim().to_string()))?;
        Self::new(Quantity::try_parse(a)?, Quantity::try_parse(b)?)
    }

    pub fn numerator(&self) -> Quantity {
        self.numerator
    }

    pub fn denominator(&self) -> Quantity {
        self.denominator
    }

    /// Swaps numerator and denominator
    pub fn reciprocal(&self) -> Self {
        Self {
            numerator: self.denominator,
            denominator: self.numerator,
        }
    }

    /// The ratio as a single measure (numerator / denominator)
    pub fn as_measure(&self) -> Measure {
        self.numerator / self.denominator
    }

    /// Converts a quantity across this ratio, in either direction
    ///
    /// A quantity in the denominator's dimension comes back in the
    /// numerator's unit, and vice versa.
    pub fn apply(&self, quantity: Quantity) -> Option<Quantity> {
        if quantity.is_compatible(&self.denominator) {
            let measure = Measure::from(quantity) * self.as_measure();
            Quantity::from_measure(measure, self.numerator.unit())
        } else if quantity.is_compatible(&self.numerator) {
            let measure = Measure::from(quantity) * self.reciprocal().as_measure();
            Quantity::from_measure(measure, self.denominator.unit())
        } else {
            None
        }
    }
}

impl fmt::Display for ConversionRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} per {}", self.numerator, self.denominator)
    }
}

/// Parses `;`-separated `A per B` clauses
///
/// Clauses without `per`, or with unparseable sides, are logged and skipped.
pub fn parse_conversion_ratios(text: &str) -> Vec<ConversionRatio> {
    text.split(';')
        .map(str::trim)
        .filter(|clause| !clause.is_empty())
        .filter_map(|clause| match ConversionRatio::parse(clause) {
            Ok(ratio) => Some(ratio),
            Err(e) => {
                tracing::debug!(conversion = clause, error = %e, "ignoring conversion clause");
                None
            }
        })
        .collect()
}

/// A cost that was reduced to a plain number
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolved {
    pub cost: f64,
    /// The ratio that cancelled the remaining dimension, `None` if none was needed
    pub ratio: Option<ConversionRatio>,
}

/// Multiplies a unit cost by a quantity and reduces it to a plain cost
///
/// If the product still carries a dimension, each ratio and then its
/// reciprocal is tried until one cancels it. The error is returned rather
/// than logged at warn level; callers record it against the ingredient and
/// charge zero.
pub fn resolve_cost_with_conversion(
    unit_cost: Measure,
    target: Quantity,
    ratios: &[ConversionRatio],
) -> Result<Resolved, QuantityError> {
    let cost = unit_cost * target;
    if cost.is_dimensionless() {
        return Ok(Resolved {
            cost: cost.value(),
            ratio: None,
        });
    }

    for ratio in ratios {
        let measure = ratio.as_measure();
        let divided = cost / measure;
        if divided.is_dimensionless() {
            return Ok(Resolved {
                cost: divided.value(),
                ratio: Some(ratio.reciprocal()),
            });
        }
        let multiplied = cost * measure;
        if multiplied.is_dimensionless() {
            return Ok(Resolved {
                cost: multiplied.value(),
                ratio: Some(*ratio),
            });
        }
    }

    tracing::debug!(unit_cost = %unit_cost, target = %target, "no ratio cancels units");
    Err(QuantityError::Unconvertible(cost.to_string()))
}

/// Converts `from` into the unit of `to` using declared ratios
///
/// Tries each ratio directly, then a second pass that chains one more
/// ratio onto every partial result. Returns `None` when nothing reaches
/// the target dimension.
pub fn convert_quantity(
    from: Quantity,
    to: Quantity,
    ratios: &[ConversionRatio],
) -> Option<Quantity> {
    if from.is_compatible(&to) {
        return from.to(to.unit()).ok();
    }

    let mut partial = Vec::new();
    for ratio in ratios {
        if let Some(result) = ratio.apply(from) {
            if result.is_compatible(&to) {
                return result.to(to.unit()).ok();
            }
            partial.push(result);
        }
    }

    for step in partial {
        for ratio in ratios {
            if let Some(result) = ratio.apply(step) {
                if result.is_compatible(&to) {
                    return result.to(to.unit()).ok();
                }
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::quantity::Unit;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn parses_multiple_clauses() {
        let ratios = parse_conversion_ratios("1 cup per 120 g; 1 ct per 50 g");
        assert_eq!(ratios.len(), 2);
        assert_eq!(ratios[0].numerator(), Quantity::new(1.0, Unit::Cup));
        assert_eq!(ratios[1].denominator(), Quantity::new(50.0, Unit::Gram));
    }

    #[test]
    fn clauses_without_per_are_skipped() {
        let ratios = parse_conversion_ratios("about a cup; 1 cup per 120 g");
        assert_eq!(ratios.len(), 1);
        assert!(parse_conversion_ratios("").is_empty());
    }

    #[test]
    fn dimensionless_cost_needs_no_ratio() {
        let unit_cost = Measure::scalar(25.0) / Quantity::new(50.0, Unit::Pound);
        let resolved =
            resolve_cost_with_conversion(unit_cost, Quantity::new(2.0, Unit::Pound), &[]).unwrap();
        assert!(approx(resolved.cost, 1.0));
        assert!(resolved.ratio.is_none());
    }

    #[test]
    fn ratio_bridges_volume_to_mass() {
        // $0.01 per gram, 1 cup weighs 120 g
        let unit_cost = Measure::scalar(1.0) / Quantity::new(100.0, Unit::Gram);
        let ratios = parse_conversion_ratios("1 cup per 120 g");
        let resolved =
            resolve_cost_with_conversion(unit_cost, Quantity::new(2.0, Unit::Cup), &ratios)
                .unwrap();
        assert!(approx(resolved.cost, 2.4));
        assert!(resolved.ratio.is_some());
    }

    #[test]
    fn reciprocal_direction_also_works() {
        // Priced per cup, requested in grams
        let unit_cost = Measure::scalar(3.0) / Quantity::new(1.0, Unit::Cup);
        let ratios = parse_conversion_ratios("1 cup per 120 g");
        let resolved =
            resolve_cost_with_conversion(unit_cost, Quantity::new(240.0, Unit::Gram), &ratios)
                .unwrap();
        assert!(approx(resolved.cost, 6.0));
    }

    #[test]
    fn unresolvable_conversion_errors() {
        let unit_cost = Measure::scalar(3.0) / Quantity::new(1.0, Unit::Cup);
        let result =
            resolve_cost_with_conversion(unit_cost, Quantity::count(2.0), &parse_conversion_ratios("1 cup per 120 g"));
        assert!(matches!(result, Err(QuantityError::Unconvertible(_))));
    }

    #[test]
    fn convert_round_trip() {
        let ratios = parse_conversion_ratios("1 cup per 120 g");
        let grams = Quantity::new(300.0, Unit::Gram);
        let cups = convert_quantity(grams, Quantity::new(1.0, Unit::Cup), &ratios).unwrap();
        assert!(approx(cups.magnitude(), 2.5));
        let back = convert_quantity(cups, grams, &ratios).unwrap();
        assert!((back.magnitude() - 300.0).abs() < 1e-9);
    }

    #[test]
    fn convert_chains_two_ratios() {
        // count -> grams -> cups
        let ratios = parse_conversion_ratios("1 ct per 50 g; 1 cup per 200 g");
        let result = convert_quantity(
            Quantity::count(4.0),
            Quantity::new(1.0, Unit::Cup),
            &ratios,
        )
        .unwrap();
        assert!(approx(result.magnitude(), 1.0));
    }

    #[test]
    fn convert_without_ratio_fails() {
        assert!(convert_quantity(Quantity::count(1.0), Quantity::new(1.0, Unit::Cup), &[]).is_none());
    }

    #[test]
    fn zero_ratio_is_rejected() {
        assert!(ConversionRatio::parse("0 cup per 120 g").is_err());
        assert!(ConversionRatio::parse("1 cup per 0 g").is_err());
    }
}
