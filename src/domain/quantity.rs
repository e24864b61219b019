//! Dimensioned quantities for recipe and price-guide measurements
//!
//! Every quantity carries a magnitude and a [`Unit`] from one of three
//! dimensions: mass, volume or count. Values are compared and combined in
//! base units (grams, milliliters, count) so that `2 tbsp / 1 cup`
//! reduces to a plain number.
//!
//! Derived values such as a cost per pound or a `1 cup per 120 g` ratio are
//! [`Measure`]s: a base-unit value plus a [`Dimension`] exponent vector.
//! A measure whose exponents are all zero is a pure scalar.
//!
//! ## Grammar
//!
//! Recipe quantities (`Quantity::parse`) and price-guide sizes
//! (`Quantity::parse_size`) share one tokenizer. Supplier shorthand is
//! normalized before evaluation:
//!
//! | Text | Meaning |
//! |------|---------|
//! | `ct`, `ea`, `pk`, `pc` | count |
//! | `dz`, `doz` | x12 count |
//! | `#` | lb |
//! | `gl`, `lt` | gal, l |
//! | `flat` | 8 lb |
//! | `av`, `avg`, `average` | x1 |
//! | `A-B` | average of A and B |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Div, Mul};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum QuantityError {
    #[error("Empty quantity")]
    Empty,

    #[error("Unknown unit '{0}'")]
    UnknownUnit(String),

    #[error("Invalid number '{0}'")]
    InvalidNumber(String),

    #[error("Unexpected character '{0}' in quantity")]
    UnexpectedChar(char),

    #[error("Cannot convert {from} to {to}")]
    Incompatible { from: String, to: String },

    #[error("Conversion '{0}' must look like '<quantity> per <quantity>'")]
    InvalidConversion(String),

    #[error("No conversion cancels the units of {0}")]
    Unconvertible(String),
}

/// Exponents over the three base dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Dimension {
    pub mass: i8,
    pub volume: i8,
    pub count: i8,
}

impl Dimension {
    pub const NONE: Dimension = Dimension { mass: 0, volume: 0, count: 0 };
    pub const MASS: Dimension = Dimension { mass: 1, volume: 0, count: 0 };
    pub const VOLUME: Dimension = Dimension { mass: 0, volume: 1, count: 0 };
    pub const COUNT: Dimension = Dimension { mass: 0, volume: 0, count: 1 };

    /// Returns true if all exponents are zero
    pub fn is_dimensionless(&self) -> bool {
        *self == Self::NONE
    }

    /// Returns the exponent vector of the reciprocal
    pub fn inverse(self) -> Self {
        Self {
            mass: -self.mass,
            volume: -self.volume,
            count: -self.count,
        }
    }
}

impl Mul for Dimension {
    type Output = Dimension;

    fn mul(self, rhs: Dimension) -> Dimension {
        Dimension {
            mass: self.mass + rhs.mass,
            volume: self.volume + rhs.volume,
            count: self.count + rhs.count,
        }
    }
}

impl Div for Dimension {
    type Output = Dimension;

    fn div(self, rhs: Dimension) -> Dimension {
        self * rhs.inverse()
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_dimensionless() {
            return write!(f, "1");
        }
        let parts: Vec<String> = [("g", self.mass), ("ml", self.volume), ("count", self.count)]
            .iter()
            .filter(|(_, exp)| *exp != 0)
            .map(|(sym, exp)| {
                if *exp == 1 {
                    sym.to_string()
                } else {
                    format!("{}^{}", sym, exp)
                }
            })
            .collect();
        write!(f, "{}", parts.join("*"))
    }
}

/// Measurement units understood by the parser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Milligram,
    Gram,
    Kilogram,
    Ounce,
    Pound,
    Milliliter,
    Liter,
    Teaspoon,
    Tablespoon,
    FluidOunce,
    Cup,
    Pint,
    Quart,
    Gallon,
    Count,
}

impl Unit {
    /// Returns the dimension this unit measures
    pub fn dimension(self) -> Dimension {
        match self {
            Unit::Milligram | Unit::Gram | Unit::Kilogram | Unit::Ounce | Unit::Pound => {
                Dimension::MASS
            }
            Unit::Milliliter
            | Unit::Liter
            | Unit::Teaspoon
            | Unit::Tablespoon
            | Unit::FluidOunce
            | Unit::Cup
            | Unit::Pint
            | Unit::Quart
            | Unit::Gallon => Dimension::VOLUME,
            Unit::Count => Dimension::COUNT,
        }
    }

    /// Number of base units (g, ml, count) in one of this unit
    pub fn factor(self) -> f64 {
        match self {
            Unit::Milligram => 0.001,
            Unit::Gram => 1.0,
            Unit::Kilogram => 1000.0,
            Unit::Ounce => 28.349523125,
            Unit::Pound => 453.59237,
            Unit::Milliliter => 1.0,
            Unit::Liter => 1000.0,
            Unit::Teaspoon => 4.92892159375,
            Unit::Tablespoon => 14.78676478125,
            Unit::FluidOunce => 29.5735295625,
            Unit::Cup => 236.5882365,
            Unit::Pint => 473.176473,
            Unit::Quart => 946.352946,
            Unit::Gallon => 3785.411784,
            Unit::Count => 1.0,
        }
    }

    /// Short symbol used when displaying quantities
    pub fn symbol(self) -> &'static str {
        match self {
            Unit::Milligram => "mg",
            Unit::Gram => "g",
            Unit::Kilogram => "kg",
            Unit::Ounce => "oz",
            Unit::Pound => "lb",
            Unit::Milliliter => "ml",
            Unit::Liter => "l",
            Unit::Teaspoon => "tsp",
            Unit::Tablespoon => "tbsp",
            Unit::FluidOunce => "floz",
            Unit::Cup => "cup",
            Unit::Pint => "pt",
            Unit::Quart => "qt",
            Unit::Gallon => "gal",
            Unit::Count => "ct",
        }
    }

    /// Looks up a (lowercase) unit token, including common spellings
    pub fn from_token(token: &str) -> Option<Unit> {
        let unit = match token {
            "mg" | "milligram" | "milligrams" => Unit::Milligram,
            "g" | "gr" | "gram" | "grams" => Unit::Gram,
            "kg" | "kilo" | "kilos" | "kilogram" | "kilograms" => Unit::Kilogram,
            "oz" | "ounce" | "ounces" => Unit::Ounce,
            "lb" | "lbs" | "pound" | "pounds" => Unit::Pound,
            "ml" | "milliliter" | "milliliters" | "millilitre" | "millilitres" => Unit::Milliliter,
            "l" | "lt" | "liter" | "liters" | "litre" | "litres" => Unit::Liter,
            "tsp" | "teaspoon" | "teaspoons" => Unit::Teaspoon,
            "tbsp" | "tbs" | "tablespoon" | "tablespoons" => Unit::Tablespoon,
            "floz" | "fl_oz" | "fluid_ounce" | "fluid_ounces" => Unit::FluidOunce,
            "cup" | "cups" | "c" => Unit::Cup,
            "pt" | "pint" | "pints" => Unit::Pint,
            "qt" | "quart" | "quarts" => Unit::Quart,
            "gal" | "gl" | "gallon" | "gallons" => Unit::Gallon,
            "ct" | "cnt" | "count" | "counts" | "ea" | "each" | "pk" | "pack" | "pc" | "pcs"
            | "piece" | "pieces" => Unit::Count,
            _ => return None,
        };
        Some(unit)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// A magnitude in a single unit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Quantity {
    magnitude: f64,
    unit: Unit,
}

impl Quantity {
    /// Creates a quantity from a magnitude and unit
    pub fn new(magnitude: f64, unit: Unit) -> Self {
        Self { magnitude, unit }
    }

    /// Creates a count quantity
    pub fn count(magnitude: f64) -> Self {
        Self::new(magnitude, Unit::Count)
    }

    /// The zero count quantity (empty cells parse to this)
    pub fn zero() -> Self {
        Self::count(0.0)
    }

    pub fn magnitude(&self) -> f64 {
        self.magnitude
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    pub fn dimension(&self) -> Dimension {
        self.unit.dimension()
    }

    /// Magnitude expressed in base units
    pub fn base_value(&self) -> f64 {
        self.magnitude * self.unit.factor()
    }

    /// Returns true if the magnitude is zero
    pub fn is_zero(&self) -> bool {
        self.magnitude == 0.0
    }

    /// Returns true if both quantities measure the same dimension
    pub fn is_compatible(&self, other: &Quantity) -> bool {
        self.dimension() == other.dimension()
    }

    /// Multiplies the magnitude, keeping the unit
    pub fn scale(&self, factor: f64) -> Self {
        Self::new(self.magnitude * factor, self.unit)
    }

    /// Restates this quantity in another unit of the same dimension
    pub fn to(&self, unit: Unit) -> Result<Quantity, QuantityError> {
        if self.dimension() != unit.dimension() {
            return Err(QuantityError::Incompatible {
                from: self.to_string(),
                to: unit.to_string(),
            });
        }
        Ok(Self::new(self.base_value() / unit.factor(), unit))
    }

    /// Adds a compatible quantity, returning the sum in this quantity's unit
    pub fn checked_add(&self, other: &Quantity) -> Option<Quantity> {
        let other = other.to(self.unit).ok()?;
        Some(Self::new(self.magnitude + other.magnitude, self.unit))
    }

    /// Ratio of two compatible quantities, `None` when incompatible or dividing by zero
    pub fn ratio_to(&self, other: &Quantity) -> Option<f64> {
        if !self.is_compatible(other) || other.base_value() == 0.0 {
            return None;
        }
        Some(self.base_value() / other.base_value())
    }

    /// Builds a quantity from a base-unit measure, if the dimensions match
    pub fn from_measure(measure: Measure, unit: Unit) -> Option<Quantity> {
        if measure.dimension() != unit.dimension() {
            return None;
        }
        Some(Self::new(measure.value() / unit.factor(), unit))
    }

    /// Parses a recipe quantity such as `2 lb`, `1/2 cup` or `3`
    ///
    /// Empty text is zero count. A bare number is a count. Text that cannot
    /// be parsed is logged and treated as zero count, so a bad cell never
    /// charges a cost.
    pub fn parse(text: &str) -> Quantity {
        let text = text.trim();
        if text.is_empty() {
            return Self::zero();
        }
        match Self::try_parse(text) {
            Ok(q) => q,
            Err(e) => {
                tracing::warn!(quantity = text, error = %e, "unparseable quantity, using 0 ct");
                Self::zero()
            }
        }
    }

    /// Strict variant of [`Quantity::parse`]
    pub fn try_parse(text: &str) -> Result<Quantity, QuantityError> {
        let normalized = normalize(text);
        if normalized.trim().is_empty() {
            return Err(QuantityError::Empty);
        }
        if let Some((left, right)) = split_range(&normalized) {
            let low = evaluate(left)?;
            let high = evaluate(right)?;
            return Ok(average_range(low, high, left));
        }
        evaluate(&normalized)
    }

    /// Parses a price-guide size such as `50 lb`, `6/10 oz`, `12/24 ct` or `4-5 lb av`
    ///
    /// Unparseable sizes are one count, so the price stands for one unit.
    pub fn parse_size(text: &str) -> Quantity {
        match Self::try_parse_size(text) {
            Ok(q) => q,
            Err(e) => {
                tracing::warn!(size = text, error = %e, "bad size, using 1 ct");
                Self::count(1.0)
            }
        }
    }

    fn try_parse_size(text: &str) -> Result<Quantity, QuantityError> {
        let mut normalized = normalize(text);
        if normalized.trim().is_empty() {
            return Ok(Self::count(1.0));
        }

        // Number-ten can
        normalized = normalized.replace("10/cn", "96 floz");

        if let Some((left, right)) = split_range(&normalized) {
            let low = Self::try_parse_size(left)?;
            let high = Self::try_parse_size(right)?;
            return Ok(average_range(low, high, left));
        }

        // `12/24 ct` is a count per pack; a smaller first operand is a range
        if normalized.matches('/').count() == 1 && has_count_marker(&normalized) {
            if let Some((left, right)) = normalized.split_once('/') {
                let x = evaluate(left)?;
                let y = evaluate(right)?;
                if x.magnitude < y.magnitude {
                    return Ok(average_range(x, y, left));
                }
            }
        }

        evaluate(&normalized.replace('/', "*"))
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", format_magnitude(self.magnitude), self.unit.symbol())
    }
}

impl FromStr for Quantity {
    type Err = QuantityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_parse(s)
    }
}

impl TryFrom<String> for Quantity {
    type Error = QuantityError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Quantity> for String {
    fn from(q: Quantity) -> Self {
        q.to_string()
    }
}

impl Div for Quantity {
    type Output = Measure;

    fn div(self, rhs: Quantity) -> Measure {
        Measure::from(self) / Measure::from(rhs)
    }
}

/// A base-unit value with an arbitrary dimension (cost per gram, cups per gram, ...)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measure {
    value: f64,
    dimension: Dimension,
}

impl Measure {
    pub fn new(value: f64, dimension: Dimension) -> Self {
        Self { value, dimension }
    }

    /// A pure number
    pub fn scalar(value: f64) -> Self {
        Self::new(value, Dimension::NONE)
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    pub fn is_dimensionless(&self) -> bool {
        self.dimension.is_dimensionless()
    }

    pub fn recip(&self) -> Self {
        Self::new(1.0 / self.value, self.dimension.inverse())
    }
}

impl From<Quantity> for Measure {
    fn from(q: Quantity) -> Self {
        Self::new(q.base_value(), q.dimension())
    }
}

impl Mul for Measure {
    type Output = Measure;

    fn mul(self, rhs: Measure) -> Measure {
        Measure::new(self.value * rhs.value, self.dimension * rhs.dimension)
    }
}

impl Div for Measure {
    type Output = Measure;

    fn div(self, rhs: Measure) -> Measure {
        Measure::new(self.value / rhs.value, self.dimension / rhs.dimension)
    }
}

impl Mul<Quantity> for Measure {
    type Output = Measure;

    fn mul(self, rhs: Quantity) -> Measure {
        self * Measure::from(rhs)
    }
}

impl Div<Quantity> for Measure {
    type Output = Measure;

    fn div(self, rhs: Quantity) -> Measure {
        self / Measure::from(rhs)
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_dimensionless() {
            write!(f, "{}", format_magnitude(self.value))
        } else {
            write!(f, "{} {}", format_magnitude(self.value), self.dimension)
        }
    }
}

/// Formats a magnitude with at most four decimals and no trailing zeros
pub fn format_magnitude(value: f64) -> String {
    let rounded = (value * 10_000.0).round() / 10_000.0;
    if rounded.fract() == 0.0 {
        format!("{:.0}", rounded)
    } else {
        let s = format!("{:.4}", rounded);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// Words that scale the magnitude and optionally imply a unit
fn modifier(word: &str) -> Option<(f64, Option<Unit>)> {
    match word {
        "dz" | "doz" | "dozen" => Some((12.0, Some(Unit::Count))),
        "flat" => Some((8.0, Some(Unit::Pound))),
        "av" | "avg" | "average" => Some((1.0, None)),
        _ => None,
    }
}

fn has_count_marker(text: &str) -> bool {
    text.split(|c: char| !c.is_ascii_alphabetic())
        .any(|word| Unit::from_token(word) == Some(Unit::Count) || modifier(word).is_some_and(|(_, u)| u == Some(Unit::Count)))
}

/// Lowercases and rewrites multi-character shorthand before tokenizing
fn normalize(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .replace("fl. oz", "floz")
        .replace("fl oz", "floz")
        .replace('#', " lb ")
}

/// Splits `A-B` ranges; a leading minus is not a range
fn split_range(text: &str) -> Option<(&str, &str)> {
    let trimmed = text.trim();
    let idx = trimmed.char_indices().skip(1).find(|(_, c)| *c == '-')?.0;
    let (left, right) = (&trimmed[..idx], &trimmed[idx + 1..]);
    if left.trim().is_empty() || right.trim().is_empty() {
        return None;
    }
    Some((left, right))
}

/// Averages two range endpoints; a bare-number endpoint adopts the other unit
fn average_range(low: Quantity, high: Quantity, low_text: &str) -> Quantity {
    let low_is_bare = !low_text.chars().any(|c| c.is_ascii_alphabetic());
    let low = if low_is_bare && !low.is_compatible(&high) {
        Quantity::new(low.magnitude, high.unit)
    } else {
        low
    };
    match low.to(high.unit) {
        Ok(low) => Quantity::new((low.magnitude + high.magnitude) / 2.0, high.unit),
        Err(e) => {
            tracing::warn!(error = %e, "range endpoints disagree, using upper bound");
            high
        }
    }
}

#[derive(Debug, PartialEq)]
enum Token {
    Number(f64),
    Word(String),
    Times,
    Over,
}

fn tokenize(text: &str) -> Result<Vec<Token>, QuantityError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() || c == ',' {
            i += 1;
        } else if c.is_ascii_digit() || c == '.' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            let raw: String = chars[start..i].iter().collect();
            let value = raw
                .parse::<f64>()
                .map_err(|_| QuantityError::InvalidNumber(raw.clone()))?;
            tokens.push(Token::Number(value));
        } else if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphabetic() || chars[i] == '_') {
                i += 1;
            }
            tokens.push(Token::Word(chars[start..i].iter().collect()));
        } else if c == '*' {
            tokens.push(Token::Times);
            i += 1;
        } else if c == '/' {
            tokens.push(Token::Over);
            i += 1;
        } else {
            return Err(QuantityError::UnexpectedChar(c));
        }
    }

    Ok(tokens)
}

/// Evaluates a product of numbers and at most one unit
///
/// Juxtaposition and `*` multiply; `/` divides by the next number only,
/// so `1/2 cup` is half a cup.
fn evaluate(text: &str) -> Result<Quantity, QuantityError> {
    let tokens = tokenize(text)?;
    if tokens.is_empty() {
        return Err(QuantityError::Empty);
    }

    let mut magnitude = 1.0;
    let mut unit: Option<Unit> = None;
    let mut dividing = false;

    for token in tokens {
        match token {
            Token::Number(n) => {
                if dividing {
                    if n == 0.0 {
                        return Err(QuantityError::InvalidNumber(text.to_string()));
                    }
                    magnitude /= n;
                } else {
                    magnitude *= n;
                }
                dividing = false;
            }
            Token::Word(word) => {
                if dividing {
                    return Err(QuantityError::UnknownUnit(format!("/{}", word)));
                }
                let (factor, implied) = match modifier(&word) {
                    Some(m) => m,
                    None => {
                        let u = Unit::from_token(&word)
                            .ok_or_else(|| QuantityError::UnknownUnit(word.clone()))?;
                        (1.0, Some(u))
                    }
                };
                magnitude *= factor;
                if let Some(u) = implied {
                    unit = Some(merge_unit(unit, u, &word)?);
                }
            }
            Token::Times => {}
            Token::Over => dividing = true,
        }
    }

    Ok(Quantity::new(magnitude, unit.unwrap_or(Unit::Count)))
}

/// Count markers yield to a real unit (`1 pk 5 lb`); two real units conflict
fn merge_unit(current: Option<Unit>, next: Unit, word: &str) -> Result<Unit, QuantityError> {
    match current {
        None => Ok(next),
        Some(Unit::Count) => Ok(next),
        Some(u) if next == Unit::Count || u == next => Ok(u),
        Some(_) => Err(QuantityError::UnknownUnit(word.to_string())),
    }
}
