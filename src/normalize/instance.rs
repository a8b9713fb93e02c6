use super::{column_price, regions_of, Diagnostic, Normalizer};
use crate::catalog::{
    Catalog, LegacyTier, PricingRecord, PurchaseOption, ReservationTerm, TermLength,
};
use crate::error::Result;
use serde_json::Value;
use tracing::warn;

/// Shared walk for the per-operating-system instance documents: region
/// blocks containing instanceTypes containing sizes. `emit` decides which
/// records one size's value columns produce.
fn walk_sizes(
    doc: &Value,
    catalog: &mut Catalog,
    platform: &str,
    emit: impl Fn(&Value, &str) -> Vec<PricingRecord>,
) -> Result<Vec<Diagnostic>> {
    let unit = doc["config"]["rate"].as_str().unwrap_or("perhr").to_string();
    let mut diagnostics = Vec::new();

    for region_block in regions_of(doc)? {
        let Some(region_name) = region_block["region"].as_str() else {
            diagnostics.push(Diagnostic::malformed_entry("region block without a name"));
            continue;
        };
        let Some(region) = catalog.resolve_region_mut(region_name) else {
            warn!(region = region_name, "unable to resolve region, skipping block");
            diagnostics.push(Diagnostic::unresolved_region(region_name));
            continue;
        };

        let instance_types = region_block["instanceTypes"]
            .as_array()
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        for instance_type in instance_types {
            let sizes = instance_type["sizes"]
                .as_array()
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            for size in sizes {
                let Some(api_name) = size["size"].as_str() else {
                    diagnostics.push(Diagnostic::malformed_entry(format!(
                        "size without an api name in region {}",
                        region_name
                    )));
                    continue;
                };
                let records = emit(&size["valueColumns"], &unit);
                if records.is_empty() {
                    continue;
                }
                let product = region.find_or_create_product(api_name, platform);
                for record in records {
                    product.upsert_record(record);
                }
            }
        }
    }
    Ok(diagnostics)
}

/// Normalizes the `{os}-od` documents: one hourly on-demand price per size,
/// published in the value column named after the platform tag.
pub struct OnDemandNormalizer {
    pub platform: String,
}

impl Normalizer for OnDemandNormalizer {
    fn normalize(&self, doc: &Value, catalog: &mut Catalog) -> Result<Vec<Diagnostic>> {
        walk_sizes(doc, catalog, &self.platform, |columns, unit| {
            let Some(rate) = column_price(columns, &self.platform) else {
                return Vec::new();
            };
            vec![PricingRecord {
                purchase_option: PurchaseOption::OnDemand,
                term: ReservationTerm::None,
                upfront: None,
                rate: Some(rate),
                currency: "USD".to_string(),
                unit: unit.to_string(),
            }]
        })
    }
}

/// Normalizes the tiered `{os}-ri-{tier}` documents. Each size publishes an
/// upfront and an hourly column per term length; a record is emitted for a
/// length when at least one of the pair is priced.
pub struct LegacyReservedNormalizer {
    pub platform: String,
    pub tier: LegacyTier,
}

impl Normalizer for LegacyReservedNormalizer {
    fn normalize(&self, doc: &Value, catalog: &mut Catalog) -> Result<Vec<Diagnostic>> {
        let tier = self.tier;
        walk_sizes(doc, catalog, &self.platform, move |columns, unit| {
            let mut records = Vec::new();
            for (length, upfront_col, hourly_col) in [
                (TermLength::Yr1, "yrTerm1", "yrTerm1Hourly"),
                (TermLength::Yr3, "yrTerm3", "yrTerm3Hourly"),
            ] {
                let upfront = column_price(columns, upfront_col);
                let hourly = column_price(columns, hourly_col);
                if upfront.is_none() && hourly.is_none() {
                    continue;
                }
                records.push(PricingRecord {
                    purchase_option: PurchaseOption::Reserved,
                    term: ReservationTerm::Legacy { tier, length },
                    upfront,
                    rate: hourly,
                    currency: "USD".to_string(),
                    unit: unit.to_string(),
                });
            }
            records
        })
    }
}
