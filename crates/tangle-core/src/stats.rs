use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Closed set of statistics keys an analysis may record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatKey {
    ScannedFiles,
    SkippedFiles,
    ScanningRuntime,
    FileResultsCreationRuntime,
    EntityResultsCreationRuntime,
    AnalysisRuntime,
    TotalRuntime,
    ExtractedFileResults,
    ExtractedEntityResults,
    ParsingHits,
    ParsingMisses,
    Runtime,
}

impl StatKey {
    pub fn key(&self) -> &'static str {
        match self {
            StatKey::ScannedFiles => "scanned_files",
            StatKey::SkippedFiles => "skipped_files",
            StatKey::ScanningRuntime => "scanning_runtime",
            StatKey::FileResultsCreationRuntime => "file_results_creation_runtime",
            StatKey::EntityResultsCreationRuntime => "entity_results_creation_runtime",
            StatKey::AnalysisRuntime => "analysis_runtime",
            StatKey::TotalRuntime => "total_runtime",
            StatKey::ExtractedFileResults => "extracted_file_results",
            StatKey::ExtractedEntityResults => "extracted_entity_results",
            StatKey::ParsingHits => "parsing_hits",
            StatKey::ParsingMisses => "parsing_misses",
            StatKey::Runtime => "runtime",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatValue {
    Count(u64),
    Duration(Duration),
}

/// Counter and timing store of one analysis. `add` is first-write-wins so a
/// phase cannot accidentally overwrite an earlier measurement; `increment`
/// accumulates.
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    data: BTreeMap<String, StatValue>,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_count(&mut self, key: StatKey, value: u64) {
        self.data
            .entry(key.key().to_string())
            .or_insert(StatValue::Count(value));
    }

    pub fn add_duration(&mut self, key: StatKey, value: Duration) {
        self.data
            .entry(key.key().to_string())
            .or_insert(StatValue::Duration(value));
    }

    /// Record a duration under `<prefix>-<key>`, used for per-metric runtimes.
    pub fn add_prefixed_duration(&mut self, prefix: &str, key: StatKey, value: Duration) {
        self.data
            .entry(format!("{prefix}-{}", key.key()))
            .or_insert(StatValue::Duration(value));
    }

    pub fn increment(&mut self, key: StatKey) {
        match self
            .data
            .entry(key.key().to_string())
            .or_insert(StatValue::Count(0))
        {
            StatValue::Count(n) => *n += 1,
            StatValue::Duration(_) => {}
        }
    }

    pub fn count(&self, key: StatKey) -> u64 {
        match self.data.get(key.key()) {
            Some(StatValue::Count(n)) => *n,
            _ => 0,
        }
    }

    pub fn data(&self) -> &BTreeMap<String, StatValue> {
        &self.data
    }

    /// The export view: counters as numbers, durations pre-formatted.
    pub fn formatted(&self) -> BTreeMap<String, serde_json::Value> {
        self.data
            .iter()
            .map(|(name, value)| {
                let rendered = match value {
                    StatValue::Count(n) => serde_json::Value::from(*n),
                    StatValue::Duration(d) => serde_json::Value::from(format_duration(*d)),
                };
                (name.clone(), rendered)
            })
            .collect()
    }
}

/// Render a duration as `HH:MM:SS + {ms} ms`.
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    let milliseconds = duration.subsec_millis();
    format!("{hours:02}:{minutes:02}:{seconds:02} + {milliseconds} ms")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increment_accumulates() {
        let mut stats = Statistics::new();
        stats.increment(StatKey::ParsingHits);
        stats.increment(StatKey::ParsingHits);
        stats.increment(StatKey::ParsingHits);
        assert_eq!(stats.count(StatKey::ParsingHits), 3);
    }

    #[test]
    fn test_add_is_first_write_wins() {
        let mut stats = Statistics::new();
        stats.add_count(StatKey::ScannedFiles, 10);
        stats.add_count(StatKey::ScannedFiles, 99);
        assert_eq!(stats.count(StatKey::ScannedFiles), 10);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(
            format_duration(Duration::from_millis(3_723_042)),
            "01:02:03 + 42 ms"
        );
        assert_eq!(format_duration(Duration::ZERO), "00:00:00 + 0 ms");
    }

    #[test]
    fn test_prefixed_duration_key() {
        let mut stats = Statistics::new();
        stats.add_prefixed_duration(
            "source-lines-of-code-metric",
            StatKey::Runtime,
            Duration::from_millis(5),
        );
        assert!(stats
            .data()
            .contains_key("source-lines-of-code-metric-runtime"));
    }

    #[test]
    fn test_formatted_renders_durations() {
        let mut stats = Statistics::new();
        stats.add_duration(StatKey::ScanningRuntime, Duration::from_millis(1500));
        stats.add_count(StatKey::ScannedFiles, 2);
        let formatted = stats.formatted();
        assert_eq!(formatted["scanning_runtime"], "00:00:01 + 500 ms");
        assert_eq!(formatted["scanned_files"], 2);
    }
}
