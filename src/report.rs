//! Import outcome aggregation

use serde::Serialize;

/// Maximum number of per-candidate samples carried in a report. Everything
/// past this is counted but not listed, to bound response size.
pub const MAX_SAMPLES: usize = 10;

/// Classification of a single candidate during reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportOutcome {
    /// Inserted as a new song.
    Imported,
    /// An identical `(title, artist)` pair already exists; carries the
    /// display string of the duplicate.
    Skipped(String),
    /// Rejected by validation; carries the error message.
    Failed(String),
}

/// Summary of one import batch.
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: usize,
    pub failed: usize,
    pub total: usize,
    /// Display names of skipped duplicates, at most [`MAX_SAMPLES`].
    pub skipped_samples: Vec<String>,
    /// Validation error messages, at most [`MAX_SAMPLES`].
    pub error_samples: Vec<String>,
}

impl ImportReport {
    /// One-line human summary, e.g. `imported 5, skipped 2, failed 0 (total 7)`.
    pub fn summary(&self) -> String {
        format!(
            "imported {}, skipped {}, failed {} (total {})",
            self.imported, self.skipped, self.failed, self.total
        )
    }
}

/// Tally per-candidate outcomes into a report.
///
/// `total` always equals `imported + skipped + failed`; sample lists keep
/// the earliest entries.
pub fn build_report(outcomes: &[ImportOutcome]) -> ImportReport {
    let mut report = ImportReport {
        imported: 0,
        skipped: 0,
        failed: 0,
        total: outcomes.len(),
        skipped_samples: Vec::new(),
        error_samples: Vec::new(),
    };

    for outcome in outcomes {
        match outcome {
            ImportOutcome::Imported => report.imported += 1,
            ImportOutcome::Skipped(name) => {
                report.skipped += 1;
                if report.skipped_samples.len() < MAX_SAMPLES {
                    report.skipped_samples.push(name.clone());
                }
            }
            ImportOutcome::Failed(message) => {
                report.failed += 1;
                if report.error_samples.len() < MAX_SAMPLES {
                    report.error_samples.push(message.clone());
                }
            }
        }
    }

    report
}
