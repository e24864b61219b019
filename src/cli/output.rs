//! Output formatting for CLI commands

use serde::Serialize;

use crate::domain::CostIssue;
pub use crate::storage::OutputFormat;

/// Output helper for consistent formatting
pub struct Output {
    format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Prints a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Text => println!("{}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({
                        "success": true,
                        "message": message
                    })
                );
            }
        }
    }

    /// Prints structured data
    pub fn data<T: Serialize>(&self, data: &T) {
        match self.format {
            OutputFormat::Text => {
                // Commands render their own text; this is the fallback
                if let Ok(json) = serde_json::to_string_pretty(data) {
                    println!("{}", json);
                }
            }
            OutputFormat::Json => {
                if let Ok(json) = serde_json::to_string(data) {
                    println!("{}", json);
                }
            }
        }
    }

    /// Prints structured data with the cost issues found while producing it
    ///
    /// JSON output wraps both in one object; text output is left to the
    /// caller, followed by [`Output::issues`].
    pub fn data_with_issues<T: Serialize>(&self, data: &T, issues: &[CostIssue]) {
        self.data(&serde_json::json!({
            "data": data,
            "issues": issues,
        }));
    }

    /// Lists cost issues after a text result
    pub fn issues(&self, issues: &[CostIssue]) {
        if self.format != OutputFormat::Text || issues.is_empty() {
            return;
        }
        println!();
        println!("Issues ({}):", issues.len());
        for issue in issues {
            println!("  - {}", issue);
        }
    }

    /// Returns true if using JSON format
    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }
}

/// Formats an amount of money
pub fn money(amount: f64) -> String {
    format!("${:.2}", amount)
}
