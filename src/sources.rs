use crate::catalog::LegacyTier;
use crate::config::IngestConfig;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generation {
    Current,
    Previous,
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Generation::Current => write!(f, "current"),
            Generation::Previous => write!(f, "previous"),
        }
    }
}

/// Which pricing scheme a document follows, with the parameters its
/// normalizer needs.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentKind {
    OnDemand { platform: String },
    LegacyReserved { platform: String, tier: LegacyTier },
    ReservedV2 { platform: String },
    Storage,
}

/// One fetchable document in the ingestion plan.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSpec {
    pub url: String,
    pub kind: DocumentKind,
    pub generation: Generation,
}

impl SourceSpec {
    /// Stable human-readable name for logs and diagnostics.
    pub fn label(&self) -> String {
        match &self.kind {
            DocumentKind::OnDemand { platform } => {
                format!("on-demand/{}/{}", self.generation, platform)
            }
            DocumentKind::LegacyReserved { platform, tier } => format!(
                "reserved-legacy/{}/{}/{}",
                self.generation,
                platform,
                tier.segment()
            ),
            DocumentKind::ReservedV2 { platform } => {
                format!("reserved-v2/{}/{}", self.generation, platform)
            }
            DocumentKind::Storage => format!("storage/{}", self.generation),
        }
    }
}

/// Enumerate every document of a full ingestion pass, in the fixed family
/// order: on-demand, legacy reserved, v2 reserved, storage. The upstream
/// layout never settled on one naming template, so each family builds its
/// URLs its own way; platforms missing from a family or generation simply
/// contribute nothing here.
pub fn build_source_list(config: &IngestConfig) -> Vec<SourceSpec> {
    let ec2 = &config.ec2_base_url;
    let ebs = &config.ebs_base_url;
    let mut sources = Vec::new();

    for platform in &config.platforms {
        if platform.on_demand_current {
            sources.push(SourceSpec {
                url: format!("{}{}-od.min.js", ec2, platform.tag),
                kind: DocumentKind::OnDemand {
                    platform: platform.tag.clone(),
                },
                generation: Generation::Current,
            });
        }
    }
    for platform in &config.platforms {
        if platform.on_demand_previous {
            sources.push(SourceSpec {
                url: format!("{}previous-generation/{}-od.min.js", ec2, platform.tag),
                kind: DocumentKind::OnDemand {
                    platform: platform.tag.clone(),
                },
                generation: Generation::Previous,
            });
        }
    }

    for platform in &config.platforms {
        if !platform.legacy_reserved {
            continue;
        }
        for tier in LegacyTier::ALL {
            sources.push(SourceSpec {
                url: format!("{}{}-ri-{}.min.js", ec2, platform.tag, tier.segment()),
                kind: DocumentKind::LegacyReserved {
                    platform: platform.tag.clone(),
                    tier,
                },
                generation: Generation::Current,
            });
            // Amazon changed both the segment order and some platform
            // spellings for previous-generation reserved URLs.
            let segment = platform
                .legacy_previous_segment
                .as_deref()
                .unwrap_or(&platform.tag);
            sources.push(SourceSpec {
                url: format!(
                    "{}previous-generation/{}_{}.min.js",
                    ec2,
                    tier.segment(),
                    segment
                ),
                kind: DocumentKind::LegacyReserved {
                    platform: platform.tag.clone(),
                    tier,
                },
                generation: Generation::Previous,
            });
        }
    }

    for platform in &config.platforms {
        if let Some(slug) = &platform.reserved_v2_slug {
            sources.push(SourceSpec {
                url: format!("{}ri-v2/{}-shared.min.js", ec2, slug),
                kind: DocumentKind::ReservedV2 {
                    platform: platform.tag.clone(),
                },
                generation: Generation::Current,
            });
        }
    }
    for platform in &config.platforms {
        if let Some(slug) = &platform.reserved_v2_slug {
            if platform.reserved_v2_previous {
                sources.push(SourceSpec {
                    url: format!("{}previous-generation/ri-v2/{}-shared.min.js", ec2, slug),
                    kind: DocumentKind::ReservedV2 {
                        platform: platform.tag.clone(),
                    },
                    generation: Generation::Previous,
                });
            }
        }
    }

    sources.push(SourceSpec {
        url: format!("{}pricing-ebs.min.js", ebs),
        kind: DocumentKind::Storage,
        generation: Generation::Current,
    });
    sources.push(SourceSpec {
        url: format!("{}pricing-ebs-previous-generation.min.js", ebs),
        kind: DocumentKind::Storage,
        generation: Generation::Previous,
    });

    sources
}
