//! Text-recognition boundary and song extraction
//!
//! The actual OCR call is an external collaborator: this module only defines
//! the line format recognizers return, a trait to inject a recognizer at the
//! boundary, and the extraction pass that turns recognized lines into song
//! candidates.

use crate::parser::{ImportCandidate, LineParser};
use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

/// One line of recognized text.
///
/// Recognition backends disagree on the field carrying the text (`text`,
/// `Text` or `content`), and some return bare strings. Only the text is
/// consumed; confidence and geometry are carried through untouched.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OcrLine {
    Text(String),
    Block(OcrBlock),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OcrBlock {
    pub text: Option<String>,
    #[serde(rename = "Text")]
    pub text_cap: Option<String>,
    pub content: Option<String>,
    pub confidence: Option<f32>,
    pub position: Option<serde_json::Value>,
    pub angle: Option<serde_json::Value>,
}

impl OcrLine {
    /// The trimmed text of this line, resolving the field-name variants in
    /// priority order.
    pub fn text(&self) -> &str {
        match self {
            OcrLine::Text(s) => s.trim(),
            OcrLine::Block(block) => block
                .text
                .as_deref()
                .or(block.text_cap.as_deref())
                .or(block.content.as_deref())
                .unwrap_or("")
                .trim(),
        }
    }
}

impl From<&str> for OcrLine {
    fn from(text: &str) -> Self {
        OcrLine::Text(text.to_string())
    }
}

/// Result of recognizing one image.
#[derive(Debug, Clone)]
pub struct RecognizedText {
    pub lines: Vec<OcrLine>,
    /// Overall recognition confidence reported by the backend.
    pub confidence: f32,
}

/// A text-recognition backend.
///
/// Implementations wrap an OCR service (or a fixture); the import pipeline
/// never branches on which one is in use.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// Short backend name for logging, e.g. "simulated".
    fn name(&self) -> &str;

    /// Recognize the text lines in the image at `image_path`.
    async fn recognize(&self, image_path: &Path) -> Result<RecognizedText>;
}

/// Fixture recognizer returning a fixed sample playlist.
///
/// Stands in when no real OCR backend is configured; also used by tests to
/// exercise the extraction pipeline without network access.
#[derive(Debug, Default)]
pub struct SimulatedRecognizer;

const SAMPLE_PLAYLIST: &[&str] = &[
    "1. 起风了 - 买辣椒也用券",
    "2. 夜曲 - 周杰伦",
    "3. 告白气球 - 周杰伦",
    "4. 稻香 - 周杰伦",
    "5. 七里香 - 周杰伦",
    "6. 青花瓷 - 周杰伦",
    "7. 演员 - 薛之谦",
    "8. 体面 - 于文文",
    "9. 成都 - 赵雷",
    "10. 理想 - 赵雷",
];

#[async_trait]
impl TextRecognizer for SimulatedRecognizer {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn recognize(&self, image_path: &Path) -> Result<RecognizedText> {
        tracing::info!(
            "simulated recognition for {} ({} sample lines)",
            image_path.display(),
            SAMPLE_PLAYLIST.len()
        );
        Ok(RecognizedText {
            lines: SAMPLE_PLAYLIST.iter().map(|s| OcrLine::from(*s)).collect(),
            confidence: 0.9,
        })
    }
}

/// Extract song candidates from a sequence of recognized lines.
///
/// Lines are deduplicated by exact trimmed text within one call (a repeated
/// line is skipped before any parsing) and surviving lines are run through
/// the line parser. Output order matches first-occurrence input order.
pub fn extract_songs(lines: &[OcrLine]) -> Vec<ImportCandidate> {
    let parser = LineParser::new();
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    for line in lines {
        let text = line.text();
        if text.is_empty() {
            continue;
        }
        if !seen.insert(text.to_string()) {
            continue;
        }
        if let Some(song) = parser.parse_line(text) {
            tracing::debug!(
                "extracted \"{}\" - \"{}\" (confidence {})",
                song.title,
                song.artist,
                song.confidence
            );
            candidates.push(song);
        }
    }

    tracing::info!("extracted {} songs from {} lines", candidates.len(), lines.len());
    candidates
}
