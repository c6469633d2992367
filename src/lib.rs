//! Songbook - bulk-import core for a streamer song-list service
//!
//! This library turns spreadsheet rows or OCR'd playlist photos into song
//! candidates, reconciles them against a persistent SQLite song/tag store
//! and summarises the batch in an import report.

pub mod import;
pub mod ocr;
pub mod parser;
pub mod report;
pub mod store;
