//! The daily refresh pipeline.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::extractor::{extract_file, WorkbookReader};
use crate::telemetry::{SiteCode, TelemetryStore};

use super::agent::{push_tail, CollectionAgent, OUTPUT_TAIL_CAP};
use super::error::PipelineError;
use super::reconcile::collect_workbooks;

/// Roster resolved for one refresh run.
#[derive(Debug, Clone)]
pub struct Roster {
    pub urls: Vec<String>,
    pub asins: HashSet<String>,
    /// Snapshot date the roster was taken on.
    pub batch_date: Option<NaiveDate>,
}

/// Outcome of a successful refresh run, embedded in the job result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshReport {
    pub site: String,
    pub batch_date: Option<NaiveDate>,
    pub url_count: usize,
    pub batch_size: usize,
    pub batch_count: usize,
    pub export_dir: String,
    pub workbook_count: usize,
    pub imported_rows: usize,
    /// Workbooks that failed extraction, as `filename: reason`.
    pub failed_files: Vec<String>,
    pub stdout_tail: String,
}

/// Orchestrates one site refresh: resolve the roster, drive the agent in
/// batches, reconcile the output directory, extract, and merge.
pub struct RefreshPipeline {
    config: PipelineConfig,
    store: Arc<dyn TelemetryStore>,
    agent: Arc<dyn CollectionAgent>,
    reader: Arc<dyn WorkbookReader>,
}

impl RefreshPipeline {
    pub fn new(
        config: PipelineConfig,
        store: Arc<dyn TelemetryStore>,
        agent: Arc<dyn CollectionAgent>,
        reader: Arc<dyn WorkbookReader>,
    ) -> Self {
        Self {
            config,
            store,
            agent,
            reader,
        }
    }

    /// Resolve the roster for `site`, failing fast when the newest
    /// snapshot cannot supply a full run.
    pub fn resolve_roster(&self, site: SiteCode) -> Result<Roster, PipelineError> {
        let need = self.config.roster_size;
        let targets = self.store.latest_targets(site, need)?;

        let mut urls = Vec::with_capacity(targets.len());
        let mut asins = HashSet::with_capacity(targets.len());
        let mut batch_date = None;
        for target in targets {
            if asins.insert(target.asin.clone()) {
                urls.push(target.product_url);
                batch_date.get_or_insert(target.snapshot_date);
            }
        }

        if urls.len() < need {
            return Err(PipelineError::Undersupply {
                site: site.as_str().to_string(),
                have: urls.len(),
                need,
            });
        }

        Ok(Roster {
            urls,
            asins,
            batch_date,
        })
    }

    /// Run the full refresh for `site`. Output lands under a directory
    /// unique to `run_id` so concurrent runs cannot claim each other's
    /// files.
    pub async fn run(&self, site: SiteCode, run_id: &str) -> Result<RefreshReport, PipelineError> {
        let roster = self.resolve_roster(site)?;

        let export_dir: PathBuf = self.config.output_root.join(run_id);
        tokio::fs::create_dir_all(&export_dir).await?;
        let started_at = SystemTime::now();

        let batches: Vec<&[String]> = roster.urls.chunks(self.config.batch_size).collect();
        let total = batches.len();
        info!(
            site = site.as_str(),
            run_id,
            url_count = roster.urls.len(),
            batch_count = total,
            "starting refresh run"
        );

        let mut stdout_tail = String::new();
        for (i, chunk) in batches.iter().enumerate() {
            let index = i + 1;
            info!(site = site.as_str(), run_id, batch = index, total, "running batch");
            match self.agent.run_batch(&export_dir, chunk).await {
                Ok(output) => {
                    for line in output.stdout_tail.lines() {
                        push_tail(&mut stdout_tail, line, OUTPUT_TAIL_CAP);
                    }
                }
                Err(PipelineError::AgentTimeout { secs }) => {
                    return Err(PipelineError::BatchTimeout { index, total, secs });
                }
                Err(e) => {
                    return Err(PipelineError::BatchFailed {
                        index,
                        total,
                        detail: e.to_string(),
                    });
                }
            }
        }

        let workbooks = collect_workbooks(&export_dir, &roster.asins, started_at)?;
        if workbooks.is_empty() {
            return Err(PipelineError::NoOutput {
                dir: export_dir.display().to_string(),
            });
        }

        let mut rows = Vec::new();
        let mut failed_files = Vec::new();
        for workbook in &workbooks {
            let name = workbook
                .path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| workbook.path.display().to_string());
            match extract_file(self.reader.as_ref(), &workbook.path, &workbook.asin, site) {
                Ok(extracted) => rows.extend(extracted),
                Err(e) => {
                    warn!(file = %name, error = %e, "workbook extraction failed");
                    failed_files.push(format!("{name}: {e}"));
                }
            }
        }

        if rows.is_empty() {
            // Surface at most the first few per-file failures.
            let mut detail = failed_files
                .iter()
                .take(5)
                .cloned()
                .collect::<Vec<_>>()
                .join("; ");
            if failed_files.len() > 5 {
                detail.push_str(&format!(" (and {} more)", failed_files.len() - 5));
            }
            return Err(PipelineError::NoRows {
                file_count: workbooks.len(),
                detail,
            });
        }

        let imported_rows = self.store.upsert_daily_rows(&rows)?;
        info!(
            site = site.as_str(),
            run_id,
            imported_rows,
            workbook_count = workbooks.len(),
            failed = failed_files.len(),
            "refresh run imported"
        );

        Ok(RefreshReport {
            site: site.as_str().to_string(),
            batch_date: roster.batch_date,
            url_count: roster.urls.len(),
            batch_size: self.config.batch_size,
            batch_count: total,
            export_dir: export_dir.display().to_string(),
            workbook_count: workbooks.len(),
            imported_rows,
            failed_files,
            stdout_tail,
        })
    }
}
