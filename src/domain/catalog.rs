//! Price catalog
//!
//! Holds every price-guide entry, indexed by nickname. The catalog is
//! read-only while costs are resolved; edits go through
//! [`crate::domain::kitchen::Kitchen`] so dependent costs are invalidated.

use serde::Serialize;
use std::collections::HashMap;

use super::conversion::{parse_conversion_ratios, resolve_cost_with_conversion, ConversionRatio};
use super::diagnostics::{CostIssue, Diagnostics};
use super::price::PriceEntry;
use super::quantity::{Quantity, Unit};

/// One entry's cost for a requested quantity
#[derive(Debug, Clone, Serialize)]
pub struct PricedOption<'a> {
    pub entry: &'a PriceEntry,
    /// Cost of the requested quantity
    pub cost: f64,
    /// Ratio that bridged dimensions, if one was needed
    pub conversion: Option<ConversionRatio>,
}

/// All price-guide entries, indexed by nickname
#[derive(Debug, Default, Clone)]
pub struct PriceCatalog {
    entries: Vec<PriceEntry>,
    by_nickname: HashMap<String, Vec<usize>>,
}

impl PriceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog from entries, keeping their order
    pub fn from_entries(entries: impl IntoIterator<Item = PriceEntry>) -> Self {
        let mut catalog = Self::new();
        for entry in entries {
            catalog.insert(entry);
        }
        catalog
    }

    pub fn insert(&mut self, entry: PriceEntry) {
        let idx = self.entries.len();
        self.by_nickname
            .entry(entry.nickname.clone())
            .or_default()
            .push(idx);
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in ingestion order
    pub fn entries(&self) -> &[PriceEntry] {
        &self.entries
    }

    /// Returns true if `name` is a priced leaf ingredient
    pub fn is_ingredient(&self, name: &str) -> bool {
        self.by_nickname.contains_key(name)
    }

    /// All entries sharing a nickname
    pub fn entries_for(&self, nickname: &str) -> Vec<&PriceEntry> {
        self.by_nickname
            .get(nickname)
            .map(|idxs| idxs.iter().map(|&i| &self.entries[i]).collect())
            .unwrap_or_default()
    }

    /// Applies `f` to every entry of a nickname, returning how many changed
    pub fn update_entries(&mut self, nickname: &str, mut f: impl FnMut(&mut PriceEntry)) -> usize {
        let Some(idxs) = self.by_nickname.get(nickname) else {
            return 0;
        };
        for &i in idxs {
            f(&mut self.entries[i]);
        }
        idxs.len()
    }

    /// Guide lookup: exact nickname first, else a case-insensitive description match
    pub fn search(&self, term: &str) -> Vec<&PriceEntry> {
        let exact = self.entries_for(term);
        if !exact.is_empty() {
            return exact;
        }
        let needle = term.to_lowercase();
        self.entries
            .iter()
            .filter(|e| e.description.to_lowercase().contains(&needle))
            .collect()
    }

    /// Every distinct conversion declared for a nickname, in first-seen order
    pub fn conversions_for(&self, nickname: &str) -> Vec<ConversionRatio> {
        let mut seen: Vec<&str> = Vec::new();
        for entry in self.entries_for(nickname) {
            if let Some(text) = entry.conversion.as_deref() {
                if !text.trim().is_empty() && !seen.contains(&text) {
                    seen.push(text);
                }
            }
        }
        seen.into_iter().flat_map(parse_conversion_ratios).collect()
    }

    /// Costs `quantity` of a nickname against every entry
    ///
    /// Each entry is tried with its own conversions first, then the other
    /// entries' conversions for the nickname, then `extra` (an edge-level
    /// override). An absent quantity means one unit of the entry's basis.
    /// A failed conversion still contributes a zero-cost option.
    pub fn priced_options(
        &self,
        nickname: &str,
        quantity: Option<Quantity>,
        extra: &[ConversionRatio],
        diagnostics: &mut Diagnostics,
    ) -> Vec<PricedOption<'_>> {
        let shared = self.conversions_for(nickname);
        let mut options = Vec::new();

        for entry in self.entries_for(nickname) {
            if entry.price <= 0.0 {
                diagnostics.record(CostIssue::NonPositivePrice {
                    nickname: nickname.to_string(),
                    supplier: entry.supplier.clone(),
                });
            }

            let basis = entry.basis();
            if basis.is_zero() {
                tracing::warn!(nickname, size = %entry.size_text, "zero pack size, skipping entry");
                continue;
            }

            let target = quantity.unwrap_or_else(|| Quantity::new(1.0, basis.unit()));
            if target.is_zero() {
                options.push(PricedOption {
                    entry,
                    cost: 0.0,
                    conversion: None,
                });
                continue;
            }

            let mut ratios = entry.conversion_ratios();
            let others: Vec<ConversionRatio> = shared
                .iter()
                .filter(|r| !ratios.contains(*r))
                .copied()
                .collect();
            ratios.extend(others);
            ratios.extend_from_slice(extra);

            let (cost, conversion) =
                match resolve_cost_with_conversion(entry.unit_cost(), target, &ratios) {
                    Ok(resolved) => (resolved.cost, resolved.ratio),
                    Err(e) => {
                        tracing::debug!(nickname, error = %e, "entry cannot price quantity");
                        diagnostics.record(CostIssue::UnresolvedConversion {
                            ingredient: nickname.to_string(),
                            quantity: target.to_string(),
                        });
                        (0.0, None)
                    }
                };

            if cost < 0.0 {
                tracing::debug!(nickname, cost, "dropping negative cost");
                continue;
            }
            options.push(PricedOption {
                entry,
                cost,
                conversion,
            });
        }

        if options.is_empty() {
            diagnostics.record(CostIssue::MissingPrice {
                nickname: nickname.to_string(),
                quantity: quantity.map(|q| q.to_string()).unwrap_or_default(),
            });
        }
        options
    }

    /// The pricing unit of a nickname's first entry
    pub fn pricing_unit(&self, nickname: &str) -> Option<Unit> {
        self.entries_for(nickname).first().map(|e| e.basis().unit())
    }
}
