//! Batch reconciliation of song candidates against the store
//!
//! One engine serves both candidate sources: spreadsheet rows are mapped
//! through a [`ColumnMap`] into the same candidate stream the OCR extraction
//! produces, and everything funnels through a single per-batch transaction.
//! Per-candidate problems (empty title, duplicate) are recorded outcomes and
//! never abort the batch; only engine-level failures roll it back.

use crate::parser::{display_name, ImportCandidate};
use crate::report::{build_report, ImportOutcome, ImportReport};
use crate::store::{self, SongStore};
use anyhow::{bail, Context, Result};
use regex::Regex;
use sqlx::{Sqlite, Transaction};

/// Spreadsheet row as it arrives from the upload layer: column name to cell.
pub type Row = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Create tags referenced by candidates that don't exist yet. When off,
    /// unknown tags are skipped.
    pub auto_create_tags: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            auto_create_tags: true,
        }
    }
}

/// Maps spreadsheet columns onto song fields. Only the title column is
/// required; the default matches the published import template.
#[derive(Debug, Clone)]
pub struct ColumnMap {
    pub title: String,
    pub artist: Option<String>,
    pub tags: Option<String>,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            title: "title".to_string(),
            artist: Some("artist".to_string()),
            tags: Some("tags".to_string()),
        }
    }
}

#[derive(Clone)]
pub struct ImportEngine {
    store: SongStore,
}

impl ImportEngine {
    pub fn new(store: SongStore) -> Self {
        Self { store }
    }

    /// Import a list of extracted candidates as one batch.
    pub async fn import_candidates(
        &self,
        candidates: &[ImportCandidate],
        options: &ImportOptions,
    ) -> Result<ImportReport> {
        if candidates.is_empty() {
            bail!("nothing to import: candidate list is empty");
        }
        self.reconcile(candidates, options).await
    }

    /// Import an explicit subset of previewed candidates, selected by index.
    ///
    /// This is the commit half of the two-phase OCR flow: the caller shows
    /// the extracted candidates to a human, collects the confirmed indexes
    /// and hands both back here.
    pub async fn import_selected(
        &self,
        candidates: &[ImportCandidate],
        selected: &[usize],
        options: &ImportOptions,
    ) -> Result<ImportReport> {
        if selected.is_empty() {
            bail!("nothing to import: no candidates selected");
        }
        let mut subset = Vec::with_capacity(selected.len());
        for &index in selected {
            let candidate = candidates
                .get(index)
                .with_context(|| format!("selected index {} out of range (0..{})", index, candidates.len()))?;
            subset.push(candidate.clone());
        }
        self.reconcile(&subset, options).await
    }

    /// Import spreadsheet rows as one batch.
    ///
    /// The title column must be present on the first row; its absence is a
    /// batch-level failure before any processing. Artist and tag columns are
    /// optional, the tag cell is split on comma, full-width comma or
    /// whitespace.
    pub async fn import_rows(
        &self,
        rows: &[Row],
        columns: &ColumnMap,
        options: &ImportOptions,
    ) -> Result<ImportReport> {
        let candidates = map_rows(rows, columns)?;
        self.reconcile(&candidates, options).await
    }

    /// Run the per-candidate classification loop inside one transaction.
    async fn reconcile(
        &self,
        candidates: &[ImportCandidate],
        options: &ImportOptions,
    ) -> Result<ImportReport> {
        let mut tx = self.store.begin().await?;
        let mut outcomes = Vec::with_capacity(candidates.len());

        for (index, candidate) in candidates.iter().enumerate() {
            let title = candidate.title.trim();
            // Artist is optional everywhere; missing means empty string.
            let artist = candidate.artist.trim();

            if title.is_empty() {
                outcomes.push(ImportOutcome::Failed(format!(
                    "row {}: title must not be empty",
                    index + 1
                )));
                continue;
            }
            if title.chars().count() > 100 {
                outcomes.push(ImportOutcome::Failed(format!(
                    "row {}: title exceeds 100 characters",
                    index + 1
                )));
                continue;
            }
            if artist.chars().count() > 100 {
                outcomes.push(ImportOutcome::Failed(format!(
                    "row {}: artist exceeds 100 characters",
                    index + 1
                )));
                continue;
            }

            // Visible within the transaction, so an earlier insert in the
            // same batch makes a later identical candidate a duplicate.
            if store::find_song_by_title_artist(&mut tx, title, artist)
                .await?
                .is_some()
            {
                outcomes.push(ImportOutcome::Skipped(display_name(title, artist)));
                continue;
            }

            let song_id = store::insert_song(&mut tx, title, artist).await?;
            outcomes.push(ImportOutcome::Imported);

            for tag in &candidate.tags {
                let tag = tag.trim();
                if tag.is_empty() {
                    continue;
                }
                // Song import success is independent of tag success.
                if let Err(error) = attach_tag(&mut tx, song_id, tag, options).await {
                    tracing::warn!("failed to attach tag \"{}\" to song {}: {:#}", tag, song_id, error);
                }
            }
        }

        tx.commit()
            .await
            .context("Failed to commit import transaction")?;

        let report = build_report(&outcomes);
        tracing::info!("import finished: {}", report.summary());
        Ok(report)
    }
}

async fn attach_tag(
    tx: &mut Transaction<'static, Sqlite>,
    song_id: i64,
    name: &str,
    options: &ImportOptions,
) -> Result<()> {
    if name.chars().count() > 50 {
        bail!("tag name exceeds 50 characters");
    }

    let tag_id = if options.auto_create_tags {
        store::find_or_create_tag(tx, name).await?
    } else {
        match store::find_tag(tx, name).await? {
            Some(id) => id,
            None => {
                tracing::debug!("tag \"{}\" does not exist, skipped", name);
                return Ok(());
            }
        }
    };

    store::link_song_tag(tx, song_id, tag_id).await
}

/// Map spreadsheet rows to candidates, enforcing the title-column
/// precondition. Rows with an empty title become candidates anyway so the
/// reconciliation loop records them as failed instead of dropping them.
fn map_rows(rows: &[Row], columns: &ColumnMap) -> Result<Vec<ImportCandidate>> {
    if rows.is_empty() {
        bail!("nothing to import: row list is empty");
    }
    if !rows[0].contains_key(&columns.title) {
        bail!("missing required column: {}", columns.title);
    }

    let tag_delimiter = Regex::new(r"[,，\s]+").unwrap();

    let candidates = rows
        .iter()
        .map(|row| {
            let title = cell_text(row, &columns.title).unwrap_or_default();
            let artist = columns
                .artist
                .as_deref()
                .and_then(|col| cell_text(row, col))
                .unwrap_or_default();
            let tags = columns
                .tags
                .as_deref()
                .and_then(|col| cell_text(row, col))
                .map(|cell| {
                    tag_delimiter
                        .split(&cell)
                        .filter(|t| !t.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();

            ImportCandidate::new(title, artist).with_tags(tags)
        })
        .collect();

    Ok(candidates)
}

fn cell_text(row: &Row, column: &str) -> Option<String> {
    match row.get(column)? {
        serde_json::Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
