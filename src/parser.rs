//! Heuristic parsing of raw playlist text lines
//!
//! A photographed or screenshotted song list comes back from text recognition
//! as a flat sequence of lines mixed with page headers, timestamps and other
//! noise. This module decides line by line whether the text plausibly encodes
//! a "title - artist" pair and extracts it.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// A tentative song extracted from one line of raw input.
///
/// Candidates are transient: they exist between extraction and
/// reconciliation and are never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportCandidate {
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Extraction confidence in 0.0..=1.0, higher for separator matches.
    pub confidence: f32,
    /// The raw line the candidate was extracted from.
    pub source_line: String,
}

impl ImportCandidate {
    pub fn new(title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            tags: Vec::new(),
            confidence: 1.0,
            source_line: String::new(),
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Display string used in duplicate reports, e.g. `起风了 - 买辣椒也用券`.
    pub fn display_name(&self) -> String {
        display_name(&self.title, &self.artist)
    }
}

pub(crate) fn display_name(title: &str, artist: &str) -> String {
    if artist.is_empty() {
        title.to_string()
    } else {
        format!("{} - {}", title, artist)
    }
}

/// Legitimate very short titles that would otherwise be filtered as noise.
/// Checked before any exclusion pattern.
const SHORT_TITLE_ALLOWLIST: &[&str] = &["UP", "GO", "ON", "NO", "HI", "WE", "MY", "SO"];

/// Title/artist separators, tried in order; the first one present in the
/// line wins.
const SEPARATORS: &[&str] = &[" - ", "－", "—", " — ", " / ", "/", "  ", "\t"];

/// Line parser with the exclusion patterns compiled once.
pub struct LineParser {
    exclude_patterns: Vec<Regex>,
    ordinal_prefix: Regex,
    ordinal_line: Regex,
}

impl Default for LineParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LineParser {
    pub fn new() -> Self {
        let exclude_patterns = [
            // Pure digits (track numbers without a title on the same line).
            r"^\d+$",
            // A lone CJK character is almost always a stray fragment.
            r"^[\u{4e00}-\u{9fa5}]$",
            // Pure punctuation.
            r"^[，。！？、；：“”‘’（）【】\s]+$",
            // Page/total/playlist structural markers.
            r"^(第|页|共|总|合计|小计|歌单|播放列表)",
            // Temporal words.
            r"^(时间|日期|年|月|日|点|分|秒)",
            // Social-media calls to action.
            r"^(扫码|关注|订阅|点赞|收藏)",
            // Genre label followed by a colon, e.g. "欧美:" or "流行：".
            r"^(欧美|中文|英文|韩文|日文|粤语|说唱|流行|摇滚|民谣|电子|古典)[:：]",
            r"(?i)^(Genre|Category|Type)[:：]",
            // Bare clock times like "02:20".
            r"^\d{2}[:：]\d{2}$",
        ]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect();

        Self {
            exclude_patterns,
            // Leading numeric ordinal like "3. ", "12) " or "5、".
            ordinal_prefix: Regex::new(r"^\d+[.)、]\s*").unwrap(),
            ordinal_line: Regex::new(r"^\d+[.)、]\s*(.+)$").unwrap(),
        }
    }

    /// Parse one trimmed line of raw text into a candidate, or reject it
    /// as noise. Deterministic: no external state is consulted.
    pub fn parse_line(&self, text: &str) -> Option<ImportCandidate> {
        if text.is_empty() {
            return None;
        }

        // Allow-listed short titles bypass every exclusion rule.
        if SHORT_TITLE_ALLOWLIST.contains(&text.to_uppercase().as_str()) {
            return Some(candidate(text, "", 0.8, text));
        }

        if self.exclude_patterns.iter().any(|p| p.is_match(text)) {
            return None;
        }

        // Separator-based extraction: split into title / artist.
        for separator in SEPARATORS {
            if !text.contains(separator) {
                continue;
            }
            let parts: Vec<&str> = text
                .split(separator)
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .collect();
            if parts.len() < 2 {
                continue;
            }
            let title = self.ordinal_prefix.replace(parts[0], "");
            let title = title.trim();
            let artist = parts[1];
            if char_len_in(title, 1, 50) {
                return Some(candidate(title, artist, 0.8, text));
            }
        }

        // No separator: short lines may still be a bare title, possibly
        // behind an ordinal prefix. Longer lines are rejected outright.
        if char_len_in(text, 1, 30) {
            if let Some(caps) = self.ordinal_line.captures(text) {
                let title = caps.get(1).map(|m| m.as_str().trim()).unwrap_or("");
                if char_len_in(title, 1, 50) {
                    return Some(candidate(title, "", 0.6, text));
                }
            } else {
                let confidence = if text.chars().count() <= 3 { 0.7 } else { 0.5 };
                return Some(candidate(text, "", confidence, text));
            }
        }

        None
    }
}

fn candidate(title: &str, artist: &str, confidence: f32, source_line: &str) -> ImportCandidate {
    ImportCandidate {
        title: title.to_string(),
        artist: artist.to_string(),
        tags: Vec::new(),
        confidence,
        source_line: source_line.to_string(),
    }
}

fn char_len_in(text: &str, min: usize, max: usize) -> bool {
    let len = text.chars().count();
    len >= min && len <= max
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Option<ImportCandidate> {
        LineParser::new().parse_line(text)
    }

    #[test]
    fn test_ordinal_with_separator() {
        let song = parse("3. 起风了 - 买辣椒也用券").unwrap();
        assert_eq!(song.title, "起风了");
        assert_eq!(song.artist, "买辣椒也用券");
        assert_eq!(song.confidence, 0.8);
    }

    #[test]
    fn test_plain_separator() {
        let song = parse("夜曲 - 周杰伦").unwrap();
        assert_eq!(song.title, "夜曲");
        assert_eq!(song.artist, "周杰伦");
        assert_eq!(song.confidence, 0.8);
    }

    #[test]
    fn test_slash_separator() {
        let song = parse("Shape of You / Ed Sheeran").unwrap();
        assert_eq!(song.title, "Shape of You");
        assert_eq!(song.artist, "Ed Sheeran");
    }

    #[test]
    fn test_fullwidth_dash_separator() {
        let song = parse("告白气球－周杰伦").unwrap();
        assert_eq!(song.title, "告白气球");
        assert_eq!(song.artist, "周杰伦");
    }

    #[test]
    fn test_tab_separator() {
        let song = parse("成都\t赵雷").unwrap();
        assert_eq!(song.title, "成都");
        assert_eq!(song.artist, "赵雷");
    }

    #[test]
    fn test_short_title_allowlist() {
        let song = parse("UP").unwrap();
        assert_eq!(song.title, "UP");
        assert_eq!(song.artist, "");
        assert_eq!(song.confidence, 0.8);

        // Case-insensitive.
        let song = parse("go").unwrap();
        assert_eq!(song.title, "go");
        assert_eq!(song.confidence, 0.8);
    }

    #[test]
    fn test_clock_time_rejected() {
        assert!(parse("02:20").is_none());
        assert!(parse("12：34").is_none());
    }

    #[test]
    fn test_noise_lines_rejected() {
        assert!(parse("12345").is_none());
        assert!(parse("爱").is_none());
        assert!(parse("，。！").is_none());
        assert!(parse("第1页").is_none());
        assert!(parse("播放列表").is_none());
        assert!(parse("关注我的直播间").is_none());
        assert!(parse("流行：").is_none());
        assert!(parse("Genre: Pop").is_none());
    }

    #[test]
    fn test_allowlist_beats_exclusion() {
        // "NO" would otherwise survive anyway, but "ON" etc. must win even
        // against future pattern changes; check a couple of them.
        for token in ["NO", "ON", "HI", "WE"] {
            let song = parse(token).unwrap();
            assert_eq!(song.title, token);
        }
    }

    #[test]
    fn test_ordinal_fallback_without_separator() {
        let song = parse("7、演员").unwrap();
        assert_eq!(song.title, "演员");
        assert_eq!(song.artist, "");
        assert_eq!(song.confidence, 0.6);
    }

    #[test]
    fn test_bare_title_fallback() {
        let song = parse("体面").unwrap();
        assert_eq!(song.title, "体面");
        assert_eq!(song.confidence, 0.7);

        let song = parse("Bohemian Rhapsody").unwrap();
        assert_eq!(song.title, "Bohemian Rhapsody");
        assert_eq!(song.confidence, 0.5);
    }

    #[test]
    fn test_long_line_without_separator_rejected() {
        let long = "这是一段很长的文字，完全不像是歌曲名称，应该被当作噪音过滤掉才对";
        assert!(parse(long).is_none());
    }

    #[test]
    fn test_separator_splits_within_title_bounds() {
        // Titles longer than 50 characters are not accepted from a split.
        let long_title = "a".repeat(60);
        assert!(parse(&format!("{} - artist", long_title)).is_none());
    }

    #[test]
    fn test_trailing_separator_falls_through() {
        // "夜曲 /" contains a separator but yields only one non-empty part,
        // so it is handled by the bare-title fallback instead.
        let song = parse("夜曲 /").unwrap();
        assert_eq!(song.title, "夜曲 /");
        assert_eq!(song.confidence, 0.5);
    }

    #[test]
    fn test_deterministic() {
        let parser = LineParser::new();
        let a = parser.parse_line("9. 成都 - 赵雷").unwrap();
        let b = parser.parse_line("9. 成都 - 赵雷").unwrap();
        assert_eq!(a.title, b.title);
        assert_eq!(a.artist, b.artist);
        assert_eq!(a.confidence, b.confidence);
    }
}
