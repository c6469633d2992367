//! End-to-end import flows against a real temp database.

use songbook::import::{ColumnMap, ImportEngine, ImportOptions, Row};
use songbook::ocr::{self, OcrLine, SimulatedRecognizer, TextRecognizer};
use songbook::store::SongStore;
use std::path::Path;

async fn setup() -> (tempfile::TempDir, SongStore, ImportEngine) {
    let dir = tempfile::tempdir().unwrap();
    let store = SongStore::new(dir.path().join("songs.sqlite")).await.unwrap();
    let engine = ImportEngine::new(store.clone());
    (dir, store, engine)
}

#[tokio::test]
async fn recognize_extract_confirm_commit() {
    let (_dir, store, engine) = setup().await;

    // Phase one: recognize and extract for preview.
    let recognized = SimulatedRecognizer
        .recognize(Path::new("playlist.jpg"))
        .await
        .unwrap();
    let candidates = ocr::extract_songs(&recognized.lines);
    assert_eq!(candidates.len(), 10);

    // Phase two: a human confirmed three of them.
    let report = engine
        .import_selected(&candidates, &[0, 1, 8], &ImportOptions::default())
        .await
        .unwrap();
    assert_eq!(report.imported, 3);
    assert_eq!(report.total, 3);

    let songs = store.list_songs().await.unwrap();
    assert_eq!(songs.len(), 3);
    let titles: Vec<&str> = songs.iter().map(|s| s.title.as_str()).collect();
    assert!(titles.contains(&"起风了"));
    assert!(titles.contains(&"夜曲"));
    assert!(titles.contains(&"成都"));
}

#[tokio::test]
async fn ocr_lines_with_noise_and_duplicates() {
    let (_dir, store, engine) = setup().await;

    let raw = [
        "歌单",
        "1. 起风了 - 买辣椒也用券",
        "02:20",
        "2. 夜曲 - 周杰伦",
        "1. 起风了 - 买辣椒也用券",
        "关注主播不迷路",
        "UP",
    ];
    let lines: Vec<OcrLine> = raw.iter().map(|s| OcrLine::from(*s)).collect();

    let candidates = ocr::extract_songs(&lines);
    // Header, clock time and call-to-action are noise; the repeated line is
    // deduplicated before parsing.
    assert_eq!(candidates.len(), 3);
    assert_eq!(candidates[2].title, "UP");

    let report = engine
        .import_candidates(&candidates, &ImportOptions::default())
        .await
        .unwrap();
    assert_eq!(report.imported, 3);
    assert_eq!(report.total, report.imported + report.skipped + report.failed);
    assert_eq!(store.song_count().await.unwrap(), 3);
}

#[tokio::test]
async fn spreadsheet_rows_then_ocr_sees_duplicates() {
    let (_dir, store, engine) = setup().await;

    let rows: Vec<Row> = vec![serde_json::json!({
        "title": "夜曲",
        "artist": "周杰伦",
        "tags": "国语,经典"
    })]
    .into_iter()
    .map(|v| v.as_object().unwrap().clone())
    .collect();

    let report = engine
        .import_rows(&rows, &ColumnMap::default(), &ImportOptions::default())
        .await
        .unwrap();
    assert_eq!(report.imported, 1);
    assert!(store.find_tag_id("国语").await.unwrap().is_some());
    assert!(store.find_tag_id("经典").await.unwrap().is_some());

    // The same song arriving later through the OCR path is a duplicate.
    let lines = [OcrLine::from("3. 夜曲 - 周杰伦"), OcrLine::from("4. 七里香 - 周杰伦")];
    let candidates = ocr::extract_songs(&lines);
    let report = engine
        .import_candidates(&candidates, &ImportOptions::default())
        .await
        .unwrap();

    assert_eq!(report.imported, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.skipped_samples, vec!["夜曲 - 周杰伦".to_string()]);
    assert_eq!(store.song_count().await.unwrap(), 2);
}

#[tokio::test]
async fn full_reimport_skips_everything() {
    let (_dir, store, engine) = setup().await;

    let recognized = SimulatedRecognizer
        .recognize(Path::new("playlist.jpg"))
        .await
        .unwrap();
    let candidates = ocr::extract_songs(&recognized.lines);
    let options = ImportOptions::default();

    let first = engine.import_candidates(&candidates, &options).await.unwrap();
    assert_eq!(first.imported, 10);
    assert_eq!(first.skipped, 0);

    let second = engine.import_candidates(&candidates, &options).await.unwrap();
    assert_eq!(second.imported, 0);
    assert_eq!(second.skipped, 10);
    assert_eq!(second.skipped_samples.len(), 10);

    assert_eq!(store.song_count().await.unwrap(), 10);
}
