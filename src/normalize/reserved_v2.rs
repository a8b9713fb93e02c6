use super::{column_price, regions_of, Diagnostic, Normalizer};
use crate::catalog::{Catalog, PaymentOption, PricingRecord, PurchaseOption, ReservationTerm, TermLength};
use crate::error::Result;
use serde_json::Value;
use tracing::warn;

/// Normalizes the `ri-v2` documents, which replaced the utilization tiers
/// with explicit term-length and payment-option axes. Instance types carry
/// their api name directly and nest terms → purchaseOptions → valueColumns.
pub struct ReservedV2Normalizer {
    pub platform: String,
}

impl Normalizer for ReservedV2Normalizer {
    fn normalize(&self, doc: &Value, catalog: &mut Catalog) -> Result<Vec<Diagnostic>> {
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
                let Some(api_name) = instance_type["type"].as_str() else {
                    diagnostics.push(Diagnostic::malformed_entry(format!(
                        "instance type without an api name in region {}",
                        region_name
                    )));
                    continue;
                };

                let terms = instance_type["terms"]
                    .as_array()
                    .map(Vec::as_slice)
                    .unwrap_or(&[]);
                for term_block in terms {
                    let term_name = term_block["term"].as_str().unwrap_or("");
                    let Some(length) = TermLength::from_doc(term_name) else {
                        diagnostics.push(Diagnostic::malformed_entry(format!(
                            "unknown reservation term '{}' for {}",
                            term_name, api_name
                        )));
                        continue;
                    };

                    let purchase_options = term_block["purchaseOptions"]
                        .as_array()
                        .map(Vec::as_slice)
                        .unwrap_or(&[]);
                    for option_block in purchase_options {
                        let option_name = option_block["purchaseOption"].as_str().unwrap_or("");
                        let Some(payment) = PaymentOption::from_doc(option_name) else {
                            diagnostics.push(Diagnostic::malformed_entry(format!(
                                "unknown purchase option '{}' for {}",
                                option_name, api_name
                            )));
                            continue;
                        };

                        let columns = &option_block["valueColumns"];
                        let upfront = column_price(columns, "upfront");
                        let hourly = column_price(columns, "effectiveHourly");
                        if upfront.is_none() && hourly.is_none() {
                            continue;
                        }
                        region
                            .find_or_create_product(api_name, &self.platform)
                            .upsert_record(PricingRecord {
                                purchase_option: PurchaseOption::Reserved,
                                term: ReservationTerm::V2 { length, payment },
                                upfront,
                                rate: hourly,
                                currency: "USD".to_string(),
                                unit: "perhr".to_string(),
                            });
                    }
                }
            }
        }
        Ok(diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IngestConfig;
    use crate::normalize::DiagnosticKind;
    use serde_json::json;

    fn doc() -> Value {
        json!({
            "config": {
                "regions": [
                    {
                        "region": "us-east-1",
                        "instanceTypes": [
                            {
                                "type": "m3.medium",
                                "terms": [
                                    {
                                        "term": "yrTerm1",
                                        "purchaseOptions": [
                                            {
                                                "purchaseOption": "noUpfront",
                                                "valueColumns": [
                                                    {"name": "upfront", "prices": {"USD": "0"}},
                                                    {"name": "effectiveHourly", "prices": {"USD": "0.045"}}
                                                ]
                                            },
                                            {
                                                "purchaseOption": "allUpfront",
                                                "valueColumns": [
                                                    {"name": "upfront", "prices": {"USD": "338"}},
                                                    {"name": "effectiveHourly", "prices": {"USD": "0.0386"}}
                                                ]
                                            },
                                            {
                                                "purchaseOption": "convertibleJumbo",
                                                "valueColumns": []
                                            }
                                        ]
                                    },
                                    {
                                        "term": "yrTerm3",
                                        "purchaseOptions": [
                                            {
                                                "purchaseOption": "partialUpfront",
                                                "valueColumns": [
                                                    {"name": "upfront", "prices": {"USD": "337"}},
                                                    {"name": "effectiveHourly", "prices": {"USD": "0.026"}}
                                                ]
                                            }
                                        ]
                                    }
                                ]
                            }
                        ]
                    }
                ]
            }
        })
    }

    #[test]
    fn term_and_payment_axes_map_onto_v2_terms() {
        let mut catalog = Catalog::from_config(&IngestConfig::default());
        let normalizer = ReservedV2Normalizer {
            platform: "linux".to_string(),
        };
        let diagnostics = normalizer.normalize(&doc(), &mut catalog).unwrap();

        let product = catalog
            .get_product_type("us-east-1", "m3.medium", "linux")
            .unwrap();
        assert_eq!(product.records().count(), 3);

        let no_upfront = product
            .record(
                PurchaseOption::Reserved,
                ReservationTerm::V2 {
                    length: TermLength::Yr1,
                    payment: PaymentOption::NoUpfront,
                },
            )
            .unwrap();
        assert_eq!(no_upfront.upfront, Some(0.0));
        assert_eq!(no_upfront.rate, Some(0.045));

        let partial_3yr = product
            .record(
                PurchaseOption::Reserved,
                ReservationTerm::V2 {
                    length: TermLength::Yr3,
                    payment: PaymentOption::PartialUpfront,
                },
            )
            .unwrap();
        assert_eq!(partial_3yr.upfront, Some(337.0));

        // The unrecognized purchase option was reported, not fatal
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::MalformedEntry);
        assert!(diagnostics[0].message.contains("convertibleJumbo"));
    }

    #[test]
    fn v2_normalization_is_idempotent() {
        let mut once = Catalog::from_config(&IngestConfig::default());
        let normalizer = ReservedV2Normalizer {
            platform: "linux".to_string(),
        };
        normalizer.normalize(&doc(), &mut once).unwrap();
        let mut twice = once.clone();
        normalizer.normalize(&doc(), &mut twice).unwrap();
        assert_eq!(once, twice);
    }
}
