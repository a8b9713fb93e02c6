use crate::error::{PricingError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;

/// Configuration for an ingestion run: endpoint layout, retry policy and the
/// source tables (regions, aliases, platform tags). The upstream naming
/// scheme has grown over the years, so everything enumerable lives here as
/// data rather than as compiled-in constants. Defaults reproduce the
/// published document universe; a TOML file can override any of it.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub ec2_base_url: String,
    pub ebs_base_url: String,
    /// Bounded retry: attempts per URL before the source is given up on.
    pub retry_limit: u32,
    /// Seconds to sleep between attempts; gets past upstream throttling.
    pub retry_backoff_secs: u64,
    pub max_concurrent_fetches: usize,
    pub regions: Vec<String>,
    /// Historical spellings still present in some document families.
    pub region_aliases: HashMap<String, String>,
    pub platforms: Vec<PlatformSpec>,
}

/// One operating-system/software-bundle axis and which document families
/// publish pricing for it.
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformSpec {
    /// Tag used in current-generation URL segments and on-demand value columns.
    pub tag: String,
    #[serde(default = "default_true")]
    pub on_demand_current: bool,
    #[serde(default = "default_true")]
    pub on_demand_previous: bool,
    #[serde(default)]
    pub legacy_reserved: bool,
    /// Previous-generation legacy reserved URLs use different path segments
    /// for some platforms; None means the tag itself.
    #[serde(default)]
    pub legacy_previous_segment: Option<String>,
    /// Path slug in the ri-v2 document family; None means no v2 document.
    #[serde(default)]
    pub reserved_v2_slug: Option<String>,
    #[serde(default = "default_true")]
    pub reserved_v2_previous: bool,
}

fn default_true() -> bool {
    true
}

impl PlatformSpec {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            on_demand_current: true,
            on_demand_previous: true,
            legacy_reserved: false,
            legacy_previous_segment: None,
            reserved_v2_slug: None,
            reserved_v2_previous: true,
        }
    }

    fn legacy(mut self, previous_segment: Option<&str>) -> Self {
        self.legacy_reserved = true;
        self.legacy_previous_segment = previous_segment.map(str::to_string);
        self
    }

    fn v2(mut self, slug: &str) -> Self {
        self.reserved_v2_slug = Some(slug.to_string());
        self
    }

    fn current_generation_only(mut self) -> Self {
        self.on_demand_previous = false;
        self.reserved_v2_previous = false;
        self
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        let regions = [
            "eu-west-1",
            "sa-east-1",
            "us-east-1",
            "ap-northeast-1",
            "us-west-2",
            "us-west-1",
            "ap-southeast-1",
            "ap-southeast-2",
            "eu-central-1",
            "us-gov-west-1",
            "us-gov-east-1",
            "ap-northeast-2",
            "ap-south-1",
            "us-east-2",
            "ca-central-1",
            "eu-west-2",
            "eu-west-3",
            "ap-northeast-3",
            "eu-north-1",
            "ap-east-1",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let region_aliases = [
            ("us-east", "us-east-1"),
            ("us-west", "us-west-1"),
            ("eu-ireland", "eu-west-1"),
            ("apac-sin", "ap-southeast-1"),
            ("apac-syd", "ap-southeast-2"),
            ("apac-tokyo", "ap-northeast-1"),
            ("eu-frankfurt", "eu-central-1"),
        ]
        .iter()
        .map(|(a, c)| (a.to_string(), c.to_string()))
        .collect();

        let platforms = vec![
            PlatformSpec::new("linux").legacy(None).v2("linux-unix"),
            PlatformSpec::new("mswin").legacy(None).v2("windows"),
            PlatformSpec::new("rhel")
                .legacy(Some("redhatlinux"))
                .v2("red-hat-enterprise-linux"),
            PlatformSpec::new("sles")
                .legacy(Some("suselinux"))
                .v2("suse-linux"),
            PlatformSpec::new("mswinSQL")
                .legacy(Some("mswinsqlstd"))
                .v2("windows-with-sql-server-standard"),
            PlatformSpec::new("mswinSQLWeb")
                .legacy(Some("mswinsqlweb"))
                .v2("windows-with-sql-server-web"),
            // Introduced later than the original set; no previous-generation documents.
            PlatformSpec::new("mswinSQLEnterprise")
                .v2("windows-with-sql-server-enterprise")
                .current_generation_only(),
            PlatformSpec::new("linuxSQL").v2("linux-with-sql-server-standard"),
            PlatformSpec::new("linuxSQLWeb").v2("linux-with-sql-server-web"),
            PlatformSpec::new("linuxSQLEnterprise").v2("linux-with-sql-server-enterprise"),
        ];

        Self {
            ec2_base_url: "https://a0.awsstatic.com/pricing/1/ec2/".to_string(),
            ebs_base_url: "https://a0.awsstatic.com/pricing/1/ebs/".to_string(),
            retry_limit: 3,
            retry_backoff_secs: 5,
            max_concurrent_fetches: 8,
            regions,
            region_aliases,
            platforms,
        }
    }
}

impl IngestConfig {
    pub fn load(config_path: &str) -> Result<Self> {
        let config_content = fs::read_to_string(config_path).map_err(|e| {
            PricingError::Config(format!(
                "Failed to read config file '{}': {}",
                config_path, e
            ))
        })?;

        let config: IngestConfig = toml::from_str(&config_content)?;
        config.validate()?;
        Ok(config)
    }

    /// Structural sanity checks. A broken region table is fatal to the whole
    /// run, unlike any individual document failure.
    pub fn validate(&self) -> Result<()> {
        if self.regions.is_empty() {
            return Err(PricingError::Config("no regions configured".to_string()));
        }
        if self.retry_limit == 0 {
            return Err(PricingError::Config(
                "retry_limit must be at least 1".to_string(),
            ));
        }
        for (alias, canonical) in &self.region_aliases {
            if !self.regions.contains(canonical) {
                return Err(PricingError::Config(format!(
                    "alias '{}' points at unknown region '{}'",
                    alias, canonical
                )));
            }
        }
        for platform in &self.platforms {
            if platform.tag.is_empty() {
                return Err(PricingError::Config("platform with empty tag".to_string()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = IngestConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.regions.len(), 20);
        assert_eq!(config.platforms.len(), 10);
    }

    #[test]
    fn toml_override_keeps_defaults_for_absent_keys() {
        let config: IngestConfig = toml::from_str(
            r#"
            ec2_base_url = "http://localhost:9000/ec2/"
            retry_limit = 1
            "#,
        )
        .unwrap();
        assert_eq!(config.ec2_base_url, "http://localhost:9000/ec2/");
        assert_eq!(config.retry_limit, 1);
        // Untouched keys keep their compiled-in defaults
        assert_eq!(config.retry_backoff_secs, 5);
        assert_eq!(config.regions.len(), 20);
    }

    #[test]
    fn alias_to_unknown_region_is_rejected() {
        let mut config = IngestConfig::default();
        config
            .region_aliases
            .insert("eu-madrid".to_string(), "eu-south-2".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn platform_table_matches_published_universe() {
        let config = IngestConfig::default();
        let legacy: Vec<&str> = config
            .platforms
            .iter()
            .filter(|p| p.legacy_reserved)
            .map(|p| p.tag.as_str())
            .collect();
        assert_eq!(
            legacy,
            vec!["linux", "mswin", "rhel", "sles", "mswinSQL", "mswinSQLWeb"]
        );

        let v2_current = config
            .platforms
            .iter()
            .filter(|p| p.reserved_v2_slug.is_some())
            .count();
        let v2_previous = config
            .platforms
            .iter()
            .filter(|p| p.reserved_v2_slug.is_some() && p.reserved_v2_previous)
            .count();
        assert_eq!(v2_current, 10);
        assert_eq!(v2_previous, 9);
    }
}
