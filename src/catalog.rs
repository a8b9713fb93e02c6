use crate::config::IngestConfig;
use crate::error::{PricingError, Result};
use crate::regions::RegionRegistry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PurchaseOption {
    OnDemand,
    Reserved,
}

/// Coarse utilization tiers of the original reserved-instance offering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LegacyTier {
    Light,
    Medium,
    Heavy,
}

impl LegacyTier {
    pub const ALL: [LegacyTier; 3] = [LegacyTier::Light, LegacyTier::Medium, LegacyTier::Heavy];

    /// URL path segment for this tier.
    pub fn segment(&self) -> &'static str {
        match self {
            LegacyTier::Light => "light",
            LegacyTier::Medium => "medium",
            LegacyTier::Heavy => "heavy",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TermLength {
    Yr1,
    Yr3,
}

impl TermLength {
    /// Term spelling used in reserved pricing documents ("yrTerm1", "yrTerm3").
    pub fn from_doc(term: &str) -> Option<Self> {
        match term {
            "yrTerm1" => Some(TermLength::Yr1),
            "yrTerm3" => Some(TermLength::Yr3),
            _ => None,
        }
    }

    pub fn years(&self) -> u32 {
        match self {
            TermLength::Yr1 => 1,
            TermLength::Yr3 => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PaymentOption {
    NoUpfront,
    PartialUpfront,
    AllUpfront,
}

impl PaymentOption {
    pub fn from_doc(option: &str) -> Option<Self> {
        match option {
            "noUpfront" => Some(PaymentOption::NoUpfront),
            "partialUpfront" => Some(PaymentOption::PartialUpfront),
            "allUpfront" => Some(PaymentOption::AllUpfront),
            _ => None,
        }
    }
}

/// Reservation axis of a price point. Legacy utilization tiers and v2
/// payment options both mean "reserved" but are distinct offerings with
/// distinct semantics; they never collapse into one another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ReservationTerm {
    None,
    Legacy { tier: LegacyTier, length: TermLength },
    V2 { length: TermLength, payment: PaymentOption },
}

impl fmt::Display for ReservationTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReservationTerm::None => write!(f, "on-demand"),
            ReservationTerm::Legacy { tier, length } => {
                write!(f, "{:?}/{}yr", tier, length.years())
            }
            ReservationTerm::V2 { length, payment } => {
                write!(f, "{}yr/{:?}", length.years(), payment)
            }
        }
    }
}

/// One immutable price point. Reserved offerings are priced as an upfront
/// payment plus a running rate; on-demand and storage carry only the rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingRecord {
    pub purchase_option: PurchaseOption,
    pub term: ReservationTerm,
    pub upfront: Option<f64>,
    pub rate: Option<f64>,
    pub currency: String,
    /// Pricing unit as declared by the document, e.g. "perhr".
    pub unit: String,
}

/// A priced product family within one region: an instance type under one
/// platform tag. Identity is the (region, api_name, platform) triple.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductType {
    pub api_name: String,
    pub platform: String,
    records: BTreeMap<(PurchaseOption, ReservationTerm), PricingRecord>,
}

impl ProductType {
    fn new(api_name: &str, platform: &str) -> Self {
        Self {
            api_name: api_name.to_string(),
            platform: platform.to_string(),
            records: BTreeMap::new(),
        }
    }

    /// Insert or replace the record for its (purchase option, term) key.
    /// Later documents win, which is what makes re-ingestion idempotent.
    pub fn upsert_record(&mut self, record: PricingRecord) {
        self.records
            .insert((record.purchase_option, record.term), record);
    }

    pub fn record(
        &self,
        purchase_option: PurchaseOption,
        term: ReservationTerm,
    ) -> Option<&PricingRecord> {
        self.records.get(&(purchase_option, term))
    }

    pub fn records(&self) -> impl Iterator<Item = &PricingRecord> {
        self.records.values()
    }
}

/// Per-volume-class storage price attached directly to a region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoragePrice {
    pub rate: f64,
    pub currency: String,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub name: String,
    product_types: BTreeMap<(String, String), ProductType>,
    storage_prices: BTreeMap<String, StoragePrice>,
}

impl Region {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            product_types: BTreeMap::new(),
            storage_prices: BTreeMap::new(),
        }
    }

    /// Resolve the (api_name, platform) slot, creating it on first
    /// reference. All normalizers funnel through here so that documents
    /// describing the same product land on the same entity.
    pub fn find_or_create_product(&mut self, api_name: &str, platform: &str) -> &mut ProductType {
        self.product_types
            .entry((api_name.to_string(), platform.to_string()))
            .or_insert_with(|| ProductType::new(api_name, platform))
    }

    pub fn get_product_type(&self, api_name: &str, platform: &str) -> Option<&ProductType> {
        self.product_types
            .get(&(api_name.to_string(), platform.to_string()))
    }

    pub fn product_types(&self) -> impl Iterator<Item = &ProductType> {
        self.product_types.values()
    }

    pub fn product_count(&self) -> usize {
        self.product_types.len()
    }

    /// Current-generation storage data: always wins.
    pub fn upsert_storage_price(&mut self, class: &str, price: StoragePrice) {
        self.storage_prices.insert(class.to_string(), price);
    }

    /// Previous-generation storage data: a disjoint supplement, never an
    /// overwrite.
    pub fn add_storage_price_if_absent(&mut self, class: &str, price: StoragePrice) {
        self.storage_prices
            .entry(class.to_string())
            .or_insert(price);
    }

    pub fn storage_price(&self, class: &str) -> Option<&StoragePrice> {
        self.storage_prices.get(class)
    }

    pub fn storage_prices(&self) -> &BTreeMap<String, StoragePrice> {
        &self.storage_prices
    }
}

/// The aggregate root: every known region, created up front, plus the
/// registry that canonicalizes identifiers on the way in and on lookup.
/// Mutated only by normalizers during ingestion; queries take &self.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    registry: RegionRegistry,
    regions: BTreeMap<String, Region>,
}

impl Catalog {
    /// Creates all configured regions upfront since the different document
    /// families use different naming conventions; nothing is created
    /// ad hoc from document contents.
    pub fn new(registry: RegionRegistry, region_names: &[String]) -> Self {
        let regions = region_names
            .iter()
            .map(|name| (name.clone(), Region::new(name)))
            .collect();
        Self { registry, regions }
    }

    pub fn from_config(config: &IngestConfig) -> Self {
        Self::new(RegionRegistry::from_config(config), &config.regions)
    }

    pub fn registry(&self) -> &RegionRegistry {
        &self.registry
    }

    /// Canonicalize and fetch a region for mutation. Only normalizers get
    /// to call this; the catalog is read-only to everyone else. Returns
    /// None for identifiers the registry cannot place; callers report
    /// those as diagnostics rather than failing the document.
    pub(crate) fn resolve_region_mut(&mut self, raw: &str) -> Option<&mut Region> {
        let canonical = self.registry.resolve(raw)?.to_string();
        self.regions.get_mut(&canonical)
    }

    pub fn get_region(&self, identifier: &str) -> Result<&Region> {
        let canonical = self
            .registry
            .resolve(identifier)
            .ok_or_else(|| PricingError::RegionNotFound(identifier.to_string()))?;
        self.regions
            .get(canonical)
            .ok_or_else(|| PricingError::RegionNotFound(identifier.to_string()))
    }

    pub fn list_regions(&self) -> impl Iterator<Item = &Region> {
        self.regions.values()
    }

    pub fn get_product_type(
        &self,
        region_identifier: &str,
        api_name: &str,
        platform: &str,
    ) -> Result<&ProductType> {
        let region = self.get_region(region_identifier)?;
        region
            .get_product_type(api_name, platform)
            .ok_or_else(|| PricingError::ProductNotFound {
                region: region.name.clone(),
                api_name: api_name.to_string(),
                platform: platform.to_string(),
            })
    }

    pub fn list_all_product_types(&self) -> impl Iterator<Item = &ProductType> {
        self.regions.values().flat_map(|r| r.product_types())
    }
}
