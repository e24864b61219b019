//! Cost resolution issues
//!
//! Resolution never fails on missing data: it charges zero and moves on.
//! Each gap is logged and recorded here so callers can tell a real zero
//! from an unresolved one.

use serde::Serialize;
use thiserror::Error;

/// A business-level gap found while resolving costs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CostIssue {
    #[error("no usable price for {nickname} ({quantity})")]
    MissingPrice { nickname: String, quantity: String },

    #[error("price guide entry for {nickname} from '{supplier}' has no price")]
    NonPositivePrice { nickname: String, supplier: String },

    #[error("unknown recipe {ingredient} in {item} ({quantity})")]
    UnknownRecipe {
        item: String,
        ingredient: String,
        quantity: String,
    },

    #[error("no conversion found for {ingredient} ({quantity})")]
    UnresolvedConversion { ingredient: String, quantity: String },

    #[error("multiple recipes found for {name}, using the first")]
    AmbiguousRecipeHeader { name: String },
}

/// Collected issues, deduplicated in first-seen order
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    issues: Vec<CostIssue>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs and stores an issue; repeats are logged at debug level only
    pub fn record(&mut self, issue: CostIssue) {
        if self.issues.contains(&issue) {
            tracing::debug!(%issue, "repeated cost issue");
            return;
        }
        tracing::warn!(%issue, "cost issue");
        self.issues.push(issue);
    }

    pub fn issues(&self) -> &[CostIssue] {
        &self.issues
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    /// Drains all recorded issues
    pub fn take(&mut self) -> Vec<CostIssue> {
        std::mem::take(&mut self.issues)
    }
}
