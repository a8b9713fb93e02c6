use super::{parse_price, regions_of, Diagnostic, Normalizer};
use crate::catalog::{Catalog, StoragePrice};
use crate::error::Result;
use crate::sources::Generation;
use serde_json::Value;
use tracing::warn;

/// Normalizes the volume pricing documents. A region's storage pricing is
/// split across a current-generation and a previous-generation document;
/// previous-generation classes supplement the current set and never
/// overwrite a class both documents carry. Applying the two documents is
/// therefore order-independent, and a region named by neither simply keeps
/// an empty storage map.
pub struct StorageNormalizer {
    pub generation: Generation,
}

impl Normalizer for StorageNormalizer {
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

            let types = region_block["types"]
                .as_array()
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            for volume_type in types {
                let Some(class_name) = volume_type["name"].as_str() else {
                    diagnostics.push(Diagnostic::malformed_entry(format!(
                        "volume type without a name in region {}",
                        region_name
                    )));
                    continue;
                };

                let values = volume_type["values"]
                    .as_array()
                    .map(Vec::as_slice)
                    .unwrap_or(&[]);
                for value in values {
                    let Some(rate) = parse_price(&value["prices"]["USD"]) else {
                        continue;
                    };
                    let unit = value["rate"].as_str().unwrap_or("").to_string();
                    // Classes with a single rate keep their plain name; a
                    // class priced along several rates (e.g. provisioned
                    // IOPS storage plus IOPS) gets one entry per rate.
                    let class_key = if values.len() == 1 {
                        class_name.to_string()
                    } else {
                        format!("{}.{}", class_name, unit)
                    };
                    let price = StoragePrice {
                        rate,
                        currency: "USD".to_string(),
                        unit,
                    };
                    match self.generation {
                        Generation::Current => region.upsert_storage_price(&class_key, price),
                        Generation::Previous => {
                            region.add_storage_price_if_absent(&class_key, price)
                        }
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
    use serde_json::json;

    fn storage_doc(region: &str, class: &str, price: &str) -> Value {
        json!({
            "config": {
                "regions": [
                    {
                        "region": region,
                        "types": [
                            {
                                "name": class,
                                "values": [
                                    {"prices": {"USD": price}, "rate": "perGBmoProvStorage"}
                                ]
                            }
                        ]
                    }
                ]
            }
        })
    }

    fn catalog() -> Catalog {
        Catalog::from_config(&IngestConfig::default())
    }

    #[test]
    fn previous_generation_classes_supplement_the_current_set() {
        let mut catalog = catalog();
        let current = StorageNormalizer {
            generation: Generation::Current,
        };
        let previous = StorageNormalizer {
            generation: Generation::Previous,
        };
        current
            .normalize(&storage_doc("us-east-1", "ebsGPSSD", "0.10"), &mut catalog)
            .unwrap();
        previous
            .normalize(&storage_doc("us-east-1", "ebsVols", "0.05"), &mut catalog)
            .unwrap();

        let region = catalog.get_region("us-east-1").unwrap();
        assert_eq!(region.storage_price("ebsGPSSD").unwrap().rate, 0.10);
        assert_eq!(region.storage_price("ebsVols").unwrap().rate, 0.05);
    }

    #[test]
    fn current_generation_wins_for_shared_classes() {
        let current_doc = storage_doc("eu-west-1", "ebsVols", "0.055");
        let previous_doc = storage_doc("eu-west-1", "ebsVols", "0.11");
        let current = StorageNormalizer {
            generation: Generation::Current,
        };
        let previous = StorageNormalizer {
            generation: Generation::Previous,
        };

        // Either application order converges on the current price
        let mut catalog_a = catalog();
        current.normalize(&current_doc, &mut catalog_a).unwrap();
        previous.normalize(&previous_doc, &mut catalog_a).unwrap();

        let mut catalog_b = catalog();
        previous.normalize(&previous_doc, &mut catalog_b).unwrap();
        current.normalize(&current_doc, &mut catalog_b).unwrap();

        for catalog in [&catalog_a, &catalog_b] {
            let region = catalog.get_region("eu-west-1").unwrap();
            assert_eq!(region.storage_price("ebsVols").unwrap().rate, 0.055);
        }
        assert_eq!(catalog_a, catalog_b);
    }

    #[test]
    fn multi_rate_classes_get_one_entry_per_rate() {
        let doc = json!({
            "config": {
                "regions": [
                    {
                        "region": "us-west-2",
                        "types": [
                            {
                                "name": "ebsPIOPSSSD",
                                "values": [
                                    {"prices": {"USD": "0.125"}, "rate": "perGBmoProvStorage"},
                                    {"prices": {"USD": "0.065"}, "rate": "perPIOPSreq"}
                                ]
                            }
                        ]
                    }
                ]
            }
        });
        let mut catalog = catalog();
        StorageNormalizer {
            generation: Generation::Current,
        }
        .normalize(&doc, &mut catalog)
        .unwrap();

        let region = catalog.get_region("us-west-2").unwrap();
        assert_eq!(
            region
                .storage_price("ebsPIOPSSSD.perGBmoProvStorage")
                .unwrap()
                .rate,
            0.125
        );
        assert_eq!(region.storage_price("ebsPIOPSSSD.perPIOPSreq").unwrap().rate, 0.065);
    }

    #[test]
    fn regions_in_neither_document_stay_queryable_with_no_storage() {
        let mut catalog = catalog();
        StorageNormalizer {
            generation: Generation::Current,
        }
        .normalize(&storage_doc("us-east-1", "ebsGPSSD", "0.10"), &mut catalog)
        .unwrap();

        let untouched = catalog.get_region("ap-east-1").unwrap();
        assert!(untouched.storage_prices().is_empty());
    }
}
