//! Mention counting and the append-only mention log.

use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use stonks_core::CoreError;
use tracing::{debug, info};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MentionTally {
    counts: HashMap<String, usize>,
}

impl MentionTally {
    pub fn from_mentions<I, S>(mentions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut counts = HashMap::new();
        for mention in mentions {
            *counts.entry(mention.into()).or_insert(0) += 1;
        }
        Self { counts }
    }

    pub fn get(&self, symbol: &str) -> usize {
        self.counts.get(symbol).copied().unwrap_or(0)
    }

    /// Number of distinct symbols.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// All symbols by count, highest first; ties break alphabetically.
    pub fn ranked(&self) -> Vec<(&str, usize)> {
        let mut ranked: Vec<(&str, usize)> = self
            .counts
            .iter()
            .map(|(symbol, count)| (symbol.as_str(), *count))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked
    }

    pub fn top(&self, n: usize) -> Vec<(&str, usize)> {
        let mut ranked = self.ranked();
        ranked.truncate(n);
        ranked
    }
}

/// Operator table of the `n` most mentioned symbols.
pub fn render_top(tally: &MentionTally, n: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<10} {:>8}", "ticker", "mentions");
    for (symbol, count) in tally.top(n) {
        let _ = writeln!(out, "{:<10} {:>8}", symbol, count);
    }
    out
}

/// Append-only `timestamp,ticker,mentions` file without a header row.
#[derive(Debug, Clone)]
pub struct MentionLog {
    path: PathBuf,
}

impl MentionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one row per distinct symbol, all stamped with `timestamp`.
    ///
    /// Returns the number of rows written. The parent directory is created on
    /// first use.
    pub fn append(
        &self,
        tally: &MentionTally,
        timestamp: NaiveDateTime,
    ) -> Result<usize, CoreError> {
        if tally.is_empty() {
            info!("No mentions found, {} left unchanged", self.path.display());
            return Ok(0);
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.exists() {
                debug!("Creating output directory {}", parent.display());
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        // Render first so the file sees a single write per run.
        let stamp = timestamp.format(TIMESTAMP_FORMAT).to_string();
        let mut rows = String::new();
        let ranked = tally.ranked();
        for (symbol, count) in &ranked {
            let _ = writeln!(rows, "{},{},{}", stamp, symbol, count);
        }

        let mut writer = BufWriter::new(file);
        writer.write_all(rows.as_bytes())?;
        writer.flush()?;

        info!(
            "Appended {} rows to {}",
            ranked.len(),
            self.path.display()
        );
        Ok(ranked.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn stamp(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 2, 3)
            .unwrap()
            .and_hms_micro_opt(hour, 4, 5, 123_456)
            .unwrap()
    }

    #[test]
    fn test_tally_counts() {
        let tally = MentionTally::from_mentions(["GME", "AMC", "GME", "TSLA", "GME", "AMC"]);
        assert_eq!(tally.get("GME"), 3);
        assert_eq!(tally.get("AMC"), 2);
        assert_eq!(tally.get("NOK"), 0);
        assert_eq!(tally.len(), 3);
        assert_eq!(tally.total(), 6);
    }

    #[test]
    fn test_ranking_breaks_ties_alphabetically() {
        let tally = MentionTally::from_mentions(["TSLA", "BB", "GME", "GME", "AMC"]);
        assert_eq!(
            tally.ranked(),
            vec![("GME", 2), ("AMC", 1), ("BB", 1), ("TSLA", 1)]
        );
        assert_eq!(tally.top(2), vec![("GME", 2), ("AMC", 1)]);
    }

    #[test]
    fn test_render_top_limits_rows() {
        let mentions: Vec<String> = (0..15).map(|i| format!("T{:02}", i)).collect();
        let tally = MentionTally::from_mentions(mentions);
        let table = render_top(&tally, 10);
        assert_eq!(table.lines().count(), 11);
        assert!(table.starts_with("ticker"));
        assert!(table.contains("T00"));
        assert!(!table.contains("T14"));
    }

    #[test]
    fn test_append_creates_directory_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output").join("mentions.csv");
        let log = MentionLog::new(&path);

        let tally = MentionTally::from_mentions(["GME", "AMC", "GME"]);
        let written = log.append(&tally, stamp(12)).unwrap();
        assert_eq!(written, 2);

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents,
            "2021-02-03 12:04:05.123456,GME,2\n2021-02-03 12:04:05.123456,AMC,1\n"
        );
    }

    #[test]
    fn test_append_never_rewrites_previous_rows() {
        let dir = tempfile::tempdir().unwrap();
        let log = MentionLog::new(dir.path().join("mentions.csv"));

        log.append(&MentionTally::from_mentions(["GME"]), stamp(9))
            .unwrap();
        log.append(&MentionTally::from_mentions(["GME", "BB"]), stamp(10))
            .unwrap();

        let contents = fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(
            lines,
            vec![
                "2021-02-03 09:04:05.123456,GME,1",
                "2021-02-03 10:04:05.123456,BB,1",
                "2021-02-03 10:04:05.123456,GME,1",
            ]
        );
    }

    #[test]
    fn test_empty_tally_leaves_log_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output").join("mentions.csv");
        let written = MentionLog::new(&path)
            .append(&MentionTally::default(), stamp(8))
            .unwrap();
        assert_eq!(written, 0);
        assert!(!path.exists());
    }
}
