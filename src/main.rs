use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use songbook::import::{ColumnMap, ImportEngine, ImportOptions, Row};
use songbook::ocr::{self, OcrLine, SimulatedRecognizer, TextRecognizer};
use songbook::parser::ImportCandidate;
use songbook::report::ImportReport;
use songbook::store::SongStore;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "songbook-import")]
#[command(about = "Bulk song-list import", long_about = None)]
struct Cli {
    /// Path to the song database
    #[arg(short, long, env = "SONGBOOK_DATABASE")]
    database: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import spreadsheet rows from a JSON file (array of row objects).
    /// Expected columns: "title" (required), "artist", "tags"
    Rows {
        /// JSON file with the rows to import
        file: PathBuf,

        /// Title column name
        #[arg(long, default_value = "title")]
        title_column: String,

        /// Artist column name
        #[arg(long, default_value = "artist")]
        artist_column: String,

        /// Tags column name (cell split on comma or whitespace)
        #[arg(long, default_value = "tags")]
        tags_column: String,

        /// Skip tags that don't exist instead of creating them
        #[arg(long)]
        no_create_tags: bool,
    },

    /// Import raw text lines (one per line), e.g. pasted OCR output
    Lines {
        /// Text file with one raw line per row
        file: PathBuf,

        /// Only show the extracted candidates, don't commit anything
        #[arg(long)]
        preview: bool,

        /// Comma-separated candidate indexes to commit (from a preview run);
        /// all candidates when omitted
        #[arg(long, value_delimiter = ',')]
        select: Vec<usize>,

        /// Skip tags that don't exist instead of creating them
        #[arg(long)]
        no_create_tags: bool,
    },

    /// Run the simulated recognizer fixture and preview what it extracts
    Simulate,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let store = SongStore::new(&cli.database).await?;
    let engine = ImportEngine::new(store);

    match cli.command {
        Command::Rows {
            file,
            title_column,
            artist_column,
            tags_column,
            no_create_tags,
        } => {
            let content = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let rows: Vec<Row> =
                serde_json::from_str(&content).context("Expected a JSON array of row objects")?;

            let columns = ColumnMap {
                title: title_column,
                artist: Some(artist_column),
                tags: Some(tags_column),
            };
            let options = ImportOptions {
                auto_create_tags: !no_create_tags,
            };

            let report = engine.import_rows(&rows, &columns, &options).await?;
            print_report(&report);
        }

        Command::Lines {
            file,
            preview,
            select,
            no_create_tags,
        } => {
            let content = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let lines: Vec<OcrLine> = content.lines().map(OcrLine::from).collect();

            let candidates = ocr::extract_songs(&lines);
            print_candidates(&candidates);

            if preview {
                return Ok(());
            }

            let options = ImportOptions {
                auto_create_tags: !no_create_tags,
            };
            let report = if select.is_empty() {
                engine.import_candidates(&candidates, &options).await?
            } else {
                engine.import_selected(&candidates, &select, &options).await?
            };
            print_report(&report);
        }

        Command::Simulate => {
            let recognizer = SimulatedRecognizer;
            let recognized = recognizer
                .recognize(std::path::Path::new("<fixture>"))
                .await?;
            let candidates = ocr::extract_songs(&recognized.lines);
            print_candidates(&candidates);
        }
    }

    Ok(())
}

fn print_candidates(candidates: &[ImportCandidate]) {
    println!("{} candidates:", candidates.len());
    for (index, candidate) in candidates.iter().enumerate() {
        println!(
            "  [{}] {} (confidence {:.1})",
            index,
            candidate.display_name(),
            candidate.confidence
        );
    }
}

fn print_report(report: &ImportReport) {
    println!("{}", report.summary());
    for sample in &report.skipped_samples {
        println!("  skipped: {}", sample);
    }
    for sample in &report.error_samples {
        println!("  error: {}", sample);
    }
}
