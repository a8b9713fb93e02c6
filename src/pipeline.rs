use crate::catalog::Catalog;
use crate::config::IngestConfig;
use crate::error::{PricingError, Result};
use crate::fetch::{DocumentFetcher, HttpClientPort, ReqwestHttp};
use crate::normalize::{normalizer_for, Diagnostic};
use crate::sources::build_source_list;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{info, instrument, warn};

/// Outcome of one ingestion pass: per-source tallies plus the diagnostic
/// list of everything that was skipped and why.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub sources_total: usize,
    pub sources_ok: usize,
    pub sources_failed: usize,
    pub diagnostics: Vec<Diagnostic>,
}

/// Drives a full ingestion pass: enumerate the document universe, fetch
/// concurrently under a worker bound, then apply each document's normalizer
/// to the catalog serially in the fixed family order. Any individual source
/// failing is contained; the pass always yields a usable catalog.
pub struct IngestionPipeline {
    config: IngestConfig,
    http: Arc<dyn HttpClientPort>,
}

impl IngestionPipeline {
    pub fn new(config: IngestConfig, http: Arc<dyn HttpClientPort>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, http })
    }

    pub fn with_default_http(config: IngestConfig) -> Result<Self> {
        Self::new(config, Arc::new(ReqwestHttp::new()))
    }

    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(Catalog, IngestReport)> {
        let started_at = Utc::now();
        let sources = build_source_list(&self.config);
        info!(sources = sources.len(), "starting ingestion pass");

        let fetcher = Arc::new(DocumentFetcher::new(
            self.http.clone(),
            self.config.retry_limit,
            self.config.retry_backoff_secs,
        ));
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_fetches));

        // Fetches are independent and run concurrently; handles stay in
        // source order so catalog writes happen single-file in the fixed
        // family order regardless of completion order.
        let mut handles = Vec::with_capacity(sources.len());
        for spec in &sources {
            let fetcher = fetcher.clone();
            let semaphore = semaphore.clone();
            let url = spec.url.clone();
            handles.push(tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| PricingError::Config(format!("fetch pool closed: {}", e)))?;
                fetcher.fetch(&url).await
            }));
        }

        let mut catalog = Catalog::from_config(&self.config);
        let mut report = IngestReport {
            started_at,
            finished_at: started_at,
            sources_total: sources.len(),
            sources_ok: 0,
            sources_failed: 0,
            diagnostics: Vec::new(),
        };

        for (spec, handle) in sources.iter().zip(handles) {
            let label = spec.label();
            let fetched = match handle.await {
                Ok(result) => result,
                Err(e) => Err(PricingError::FetchFailed {
                    url: spec.url.clone(),
                    attempts: 0,
                    reason: format!("fetch task aborted: {}", e),
                }),
            };
            match fetched {
                Ok(doc) => match normalizer_for(spec).normalize(&doc, &mut catalog) {
                    Ok(diagnostics) => {
                        report.sources_ok += 1;
                        report
                            .diagnostics
                            .extend(diagnostics.into_iter().map(|d| d.with_source(&label)));
                    }
                    Err(e) => {
                        warn!(source = %label, error = %e, "normalization failed, skipping source");
                        report.sources_failed += 1;
                        report.diagnostics.push(Diagnostic::source_skipped(&label, &e));
                    }
                },
                Err(e) => {
                    warn!(source = %label, error = %e, "fetch failed, skipping source");
                    report.sources_failed += 1;
                    report.diagnostics.push(Diagnostic::source_skipped(&label, &e));
                }
            }
        }

        report.finished_at = Utc::now();
        info!(
            ok = report.sources_ok,
            failed = report.sources_failed,
            diagnostics = report.diagnostics.len(),
            "ingestion pass complete"
        );
        Ok((catalog, report))
    }
}
