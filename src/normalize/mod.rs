use crate::catalog::Catalog;
use crate::error::{PricingError, Result};
use crate::sources::{DocumentKind, SourceSpec};
use serde_json::Value;
use serde::Serialize;

pub mod instance;
pub mod reserved_v2;
pub mod storage;

pub use instance::{LegacyReservedNormalizer, OnDemandNormalizer};
pub use reserved_v2::ReservedV2Normalizer;
pub use storage::StorageNormalizer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagnosticKind {
    UnresolvedRegion,
    MalformedEntry,
    SourceSkipped,
}

/// A contained, reportable problem: a skipped source, region block or
/// entry. Diagnostics never abort ingestion; they end up on the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub source: String,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn unresolved_region(region: &str) -> Self {
        Self {
            source: String::new(),
            kind: DiagnosticKind::UnresolvedRegion,
            message: format!("unknown region identifier '{}'", region),
        }
    }

    pub fn malformed_entry(message: impl Into<String>) -> Self {
        Self {
            source: String::new(),
            kind: DiagnosticKind::MalformedEntry,
            message: message.into(),
        }
    }

    pub fn source_skipped(source: &str, error: &PricingError) -> Self {
        Self {
            source: source.to_string(),
            kind: DiagnosticKind::SourceSkipped,
            message: error.to_string(),
        }
    }

    pub fn with_source(mut self, source: &str) -> Self {
        self.source = source.to_string();
        self
    }
}

/// One pricing scheme's reconciliation into the catalog. Implementations
/// must be idempotent: normalizing the same document twice leaves the
/// catalog in the same state as once.
pub trait Normalizer {
    fn normalize(&self, doc: &Value, catalog: &mut Catalog) -> Result<Vec<Diagnostic>>;
}

/// Pick the normalizer matching a source's document kind.
pub fn normalizer_for(spec: &SourceSpec) -> Box<dyn Normalizer> {
    match &spec.kind {
        DocumentKind::OnDemand { platform } => Box::new(OnDemandNormalizer {
            platform: platform.clone(),
        }),
        DocumentKind::LegacyReserved { platform, tier } => Box::new(LegacyReservedNormalizer {
            platform: platform.clone(),
            tier: *tier,
        }),
        DocumentKind::ReservedV2 { platform } => Box::new(ReservedV2Normalizer {
            platform: platform.clone(),
        }),
        DocumentKind::Storage => Box::new(StorageNormalizer {
            generation: spec.generation,
        }),
    }
}

/// The region blocks every document family nests under `config`.
pub(crate) fn regions_of(doc: &Value) -> Result<&Vec<Value>> {
    doc["config"]["regions"]
        .as_array()
        .ok_or_else(|| PricingError::MissingField("config.regions".to_string()))
}

/// Price cells are strings like "0.070"; offerings that do not exist for a
/// cell say "N/A". Either way a missing price is None, never an error.
pub(crate) fn parse_price(cell: &Value) -> Option<f64> {
    match cell {
        Value::String(s) if s != "N/A" => s.parse().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

/// Look up the USD price of a named value column.
pub(crate) fn column_price(value_columns: &Value, name: &str) -> Option<f64> {
    value_columns.as_array()?.iter().find_map(|col| {
        if col["name"].as_str() == Some(name) {
            parse_price(&col["prices"]["USD"])
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn not_available_cells_have_no_price() {
        assert_eq!(parse_price(&json!("N/A")), None);
        assert_eq!(parse_price(&json!("0.070")), Some(0.070));
        assert_eq!(parse_price(&json!(null)), None);
    }

    #[test]
    fn column_lookup_matches_by_name() {
        let columns = json!([
            {"name": "linux", "prices": {"USD": "0.070"}},
            {"name": "mswin", "prices": {"USD": "0.091"}}
        ]);
        assert_eq!(column_price(&columns, "mswin"), Some(0.091));
        assert_eq!(column_price(&columns, "rhel"), None);
    }

    #[test]
    fn document_without_region_blocks_is_rejected() {
        let doc = json!({"vers": 0.01});
        assert!(matches!(
            regions_of(&doc),
            Err(PricingError::MissingField(_))
        ));
    }
}
