//! Fetch every page, normalize each entry into the run's ledger, then export.
//! Any error aborts the run before the destination is touched.

use log::{debug, info};
use monizze_core::{Ledger, Result};
use monizze_fetch::{HistoryPages, PageSource};
use monizze_ingest::Normalizer;
use std::path::{Path, PathBuf};

use crate::atomic::preflight;
use crate::csv_export::CsvExporter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub pages: usize,
    pub entries: usize,
    pub duplicates: usize,
    pub rows: usize,
    pub path: PathBuf,
}

/// Drain `pages` into a fresh ledger. Returns the ledger and the number of raw
/// entries seen.
pub async fn collect_history<S: PageSource>(
    pages: &mut HistoryPages<S>,
    normalizer: &Normalizer,
) -> Result<(Ledger, usize)> {
    let mut ledger = Ledger::new();
    let mut entries = 0;

    while let Some(page) = pages.next_page().await? {
        entries += page.entries.len();
        for entry in &page.entries {
            let record = normalizer.normalize(entry)?;
            ledger.admit(record)?;
        }
        debug!("{} distinct transactions after page {}", ledger.len(), pages.fetched());
    }

    Ok((ledger, entries))
}

pub async fn run_export<S: PageSource>(
    mut pages: HistoryPages<S>,
    normalizer: &Normalizer,
    exporter: &CsvExporter,
    dest: &Path,
) -> Result<ExportSummary> {
    preflight(dest)?;

    let (ledger, entries) = collect_history(&mut pages, normalizer).await?;
    let duplicates = ledger.duplicates();
    let records = ledger.into_ordered();
    exporter.export(&records, dest)?;

    let summary = ExportSummary {
        pages: pages.fetched(),
        entries,
        duplicates,
        rows: records.len(),
        path: dest.to_path_buf(),
    };
    info!(
        "exported {} transactions from {} pages ({} repeats dropped)",
        summary.rows, summary.pages, summary.duplicates
    );
    Ok(summary)
}
