use serde::Serialize;
use std::collections::HashMap;

/// One CSV row as read from the source file: raw string values keyed by the
/// source column name. Lives only long enough to be normalized.
#[derive(Debug, Clone)]
pub struct RawRecord {
    /// 1-based line number in the source file, for log messages.
    pub line: u64,
    fields: HashMap<String, String>,
}

impl RawRecord {
    pub fn new(line: u64, fields: HashMap<String, String>) -> Self {
        Self { line, fields }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }
}

/// Price tier derived from the run-wide price distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PriceCategory {
    Low,
    Medium,
    High,
}

impl PriceCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceCategory::Low => "Low",
            PriceCategory::Medium => "Medium",
            PriceCategory::High => "High",
        }
    }
}

/// A normalized catalog record. Invariant: required fields are non-empty and
/// numeric fields parsed before a value of this type is constructed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub product_id: String,
    pub name: String,
    pub brand: String,
    pub gender: String,
    pub price: f64,
    pub rating: f64,
    pub num_images: i32,
    pub description: String,
    pub primary_color: String,
    /// Assigned by the categorization pass once all prices are known.
    pub price_category: Option<PriceCategory>,
}

/// Why the transformer dropped a record. Rejections fail the record, never
/// the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    MissingField(&'static str),
    UnparsableNumber { field: &'static str, value: String },
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::MissingField(field) => {
                write!(f, "required field '{field}' is missing or empty")
            }
            RejectReason::UnparsableNumber { field, value } => {
                write!(f, "field '{field}' has unparsable numeric value '{value}'")
            }
        }
    }
}

/// End-of-run counters, accumulated by the orchestrator and printed once.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    /// Data rows read from the CSV, excluding the header.
    pub rows_read: u64,
    /// Structurally broken rows skipped by the extractor policy.
    pub malformed: u64,
    /// Records that passed validation.
    pub accepted: u64,
    /// Records dropped by validation.
    pub rejected: u64,
    /// In-run repeats of an already-accepted product id.
    pub duplicates: u64,
    /// Rows durably written to the catalog table.
    pub inserted: u64,
}
