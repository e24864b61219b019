//! Price selection policies
//!
//! A leaf ingredient usually has several priced options (suppliers, pack
//! sizes, dates). A [`PricePolicy`] narrows them down, then
//! [`weighted_cost`] averages what is left using each entry's `order`
//! field as a weight.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::catalog::PricedOption;

#[derive(Debug, Error, PartialEq)]
pub enum PolicyError {
    #[error("Unknown price policy '{0}' (expected recent, all, max[:n] or min[:n])")]
    Unknown(String),

    #[error("Invalid entry count '{0}': must be a positive integer")]
    InvalidCount(String),
}

/// Strategy for narrowing priced options before averaging
pub trait SelectPrices {
    fn select<'a>(&self, options: Vec<PricedOption<'a>>) -> Vec<PricedOption<'a>>;
}

/// Which price-guide entries feed a leaf cost
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PricePolicy {
    /// Entries carrying the two most recent distinct dates
    #[default]
    Recent,
    /// The `n` most expensive options
    Max(usize),
    /// The `n` cheapest options
    Min(usize),
    /// Every option
    All,
}

impl SelectPrices for PricePolicy {
    fn select<'a>(&self, mut options: Vec<PricedOption<'a>>) -> Vec<PricedOption<'a>> {
        match *self {
            PricePolicy::All => options,
            PricePolicy::Recent => {
                if options.len() <= 1 {
                    return options;
                }
                options.sort_by(|a, b| b.entry.date.cmp(&a.entry.date));
                let mut dates = Vec::with_capacity(2);
                for option in &options {
                    if !dates.contains(&option.entry.date) {
                        dates.push(option.entry.date);
                        if dates.len() == 2 {
                            break;
                        }
                    }
                }
                options.retain(|o| dates.contains(&o.entry.date));
                options
            }
            PricePolicy::Max(n) => {
                options.sort_by(|a, b| b.cost.total_cmp(&a.cost));
                options.truncate(n);
                options
            }
            PricePolicy::Min(n) => {
                options.sort_by(|a, b| a.cost.total_cmp(&b.cost));
                options.truncate(n);
                options
            }
        }
    }
}

impl fmt::Display for PricePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PricePolicy::Recent => write!(f, "recent"),
            PricePolicy::All => write!(f, "all"),
            PricePolicy::Max(n) => write!(f, "max:{}", n),
            PricePolicy::Min(n) => write!(f, "min:{}", n),
        }
    }
}

impl FromStr for PricePolicy {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        let (name, count) = match lowered.split_once(':') {
            Some((name, count)) => (name, Some(count)),
            None => (lowered.as_str(), None),
        };
        let parse_count = |count: Option<&str>| -> Result<usize, PolicyError> {
            match count {
                None => Ok(1),
                Some(raw) => match raw.trim().parse::<usize>() {
                    Ok(n) if n > 0 => Ok(n),
                    _ => Err(PolicyError::InvalidCount(raw.to_string())),
                },
            }
        };
        match name {
            "recent" if count.is_none() => Ok(PricePolicy::Recent),
            "all" if count.is_none() => Ok(PricePolicy::All),
            "max" => Ok(PricePolicy::Max(parse_count(count)?)),
            "min" => Ok(PricePolicy::Min(parse_count(count)?)),
            _ => Err(PolicyError::Unknown(s.to_string())),
        }
    }
}

impl TryFrom<String> for PricePolicy {
    type Error = PolicyError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<PricePolicy> for String {
    fn from(policy: PricePolicy) -> Self {
        policy.to_string()
    }
}

/// Weighted mean of `(value, weight)` pairs
///
/// Falls back to the plain mean when the weights sum to zero or less;
/// an empty slice is zero.
pub fn weighted_mean(values: &[(f64, f64)]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let total_weight: f64 = values.iter().map(|(_, w)| w).sum();
    if total_weight > 0.0 {
        values.iter().map(|(v, w)| v * w).sum::<f64>() / total_weight
    } else {
        values.iter().map(|(v, _)| v).sum::<f64>() / values.len() as f64
    }
}

/// Averages selected options, weighting each by its entry's `order` (default 1)
pub fn weighted_cost(selected: &[PricedOption<'_>]) -> f64 {
    let pairs: Vec<(f64, f64)> = selected
        .iter()
        .map(|o| (o.cost, o.entry.order.unwrap_or(1.0)))
        .collect();
    weighted_mean(&pairs)
}
