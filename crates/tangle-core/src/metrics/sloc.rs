use rayon::prelude::*;
use serde_json::json;

use crate::language::CommentStyle;
use crate::metrics::{
    record_local, GraphSet, LocalMetricData, Metric, MetricId, OverallMetricData, ResultFilter,
};
use crate::result::ResultStore;

pub const SLOC_IN_FILE: &str = "sloc-in-file";
pub const SLOC_IN_ENTITY: &str = "sloc-in-entity";
pub const AVG_SLOC_IN_FILE: &str = "avg-sloc-in-file";
pub const AVG_SLOC_IN_ENTITY: &str = "avg-sloc-in-entity";
pub const TOTAL_SLOC_IN_FILES: &str = "total-sloc-in-files";
pub const TOTAL_SLOC_IN_ENTITIES: &str = "total-sloc-in-entities";

/// Comment-aware source-lines-of-code counter over the token stream, using
/// each language's line/block comment markers.
pub struct SourceLinesOfCodeMetric {
    local_data: LocalMetricData,
    overall_data: OverallMetricData,
}

impl SourceLinesOfCodeMetric {
    pub fn new() -> Self {
        Self {
            local_data: LocalMetricData::new(),
            overall_data: OverallMetricData::new(),
        }
    }
}

impl Default for SourceLinesOfCodeMetric {
    fn default() -> Self {
        Self::new()
    }
}

/// A line counts when it is non-empty after trimming and not commented out.
/// Lines that open, close, or wholly contain a block comment never count.
pub fn count_sloc(tokens: &[String], style: CommentStyle) -> u64 {
    let source = tokens.join(" ");
    let mut count = 0u64;
    let mut active_block_comment = false;

    for line in source.split('\n') {
        let opens = line.contains(style.block_open);
        let closes = line.contains(style.block_close);
        if opens && !closes {
            active_block_comment = true;
            continue;
        }
        if !opens && closes {
            active_block_comment = false;
            continue;
        }
        if opens && closes {
            continue;
        }
        if line.trim_start().starts_with(style.line) {
            continue;
        }
        if !active_block_comment && !line.trim().is_empty() {
            count += 1;
        }
    }
    count
}

impl Metric for SourceLinesOfCodeMetric {
    fn id(&self) -> MetricId {
        MetricId::SourceLinesOfCode
    }

    fn metric_name(&self) -> &'static str {
        "source-lines-of-code-metric"
    }

    fn pretty_metric_name(&self) -> &'static str {
        "source lines of code metric"
    }

    fn calculate(&mut self, filter: ResultFilter, results: &mut ResultStore, _graphs: &GraphSet) {
        let selected: Vec<(String, CommentStyle, Vec<String>)> = results
            .iter()
            .filter(|(_, r)| match filter {
                ResultFilter::FileResults => r.is_file(),
                ResultFilter::EntityResults => r.is_entity(),
            })
            .map(|(name, r)| {
                (
                    name.clone(),
                    r.scanned_language().comment_style(),
                    r.scanned_tokens().to_vec(),
                )
            })
            .collect();

        let counts: Vec<(String, u64)> = selected
            .par_iter()
            .map(|(name, style, tokens)| (name.clone(), count_sloc(tokens, *style)))
            .collect();

        let key = match filter {
            ResultFilter::FileResults => SLOC_IN_FILE,
            ResultFilter::EntityResults => SLOC_IN_ENTITY,
        };

        let mut total = 0u64;
        for (name, sloc) in &counts {
            if let Some(result) = results.get_mut(name) {
                result.metrics_mut().insert(key.to_string(), json!(sloc));
            }
            record_local(&mut self.local_data, name, key, json!(sloc));
            total += sloc;
        }

        if !counts.is_empty() {
            let average = total as f64 / counts.len() as f64;
            match filter {
                ResultFilter::FileResults => {
                    self.overall_data
                        .insert(AVG_SLOC_IN_FILE.to_string(), json!(average));
                    self.overall_data
                        .insert(TOTAL_SLOC_IN_FILES.to_string(), json!(total));
                }
                ResultFilter::EntityResults => {
                    self.overall_data
                        .insert(AVG_SLOC_IN_ENTITY.to_string(), json!(average));
                    self.overall_data
                        .insert(TOTAL_SLOC_IN_ENTITIES.to_string(), json!(total));
                }
            }
        }
    }

    fn take_local_data(&mut self) -> LocalMetricData {
        std::mem::take(&mut self.local_data)
    }

    fn take_overall_data(&mut self) -> OverallMetricData {
        std::mem::take(&mut self.overall_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::Language;
    use crate::result::{FileResult, ScanResult};
    use crate::tokenizer::tokenize;

    #[test]
    fn test_count_sloc_skips_comments_and_blanks() {
        let source = "int a;\n\n// comment\nint b;\n/*\nblock\n*/\nint c;\n";
        let tokens = tokenize(source);
        assert_eq!(count_sloc(&tokens, Language::C.comment_style()), 3);
    }

    #[test]
    fn test_count_sloc_one_line_block_comment() {
        let source = "int a;\n/* gone */\nint b;\n";
        let tokens = tokenize(source);
        assert_eq!(count_sloc(&tokens, Language::C.comment_style()), 2);
    }

    #[test]
    fn test_sloc_upper_bound() {
        // sloc can never exceed the number of non-blank lines
        let source = "a\nb\n\nc\n// d\n";
        let tokens = tokenize(source);
        let non_blank = source.lines().filter(|l| !l.trim().is_empty()).count() as u64;
        assert!(count_sloc(&tokens, Language::C.comment_style()) <= non_blank);
    }

    #[test]
    fn test_metric_writes_totals() {
        let mut store = ResultStore::new();
        for (name, body) in [("a.c", "int a;\nint b;\n"), ("b.c", "int c;\n")] {
            let source = body.to_string();
            store.insert(ScanResult::File(FileResult::new(
                name,
                &format!("proj/{name}"),
                &format!("/tmp/proj/{name}"),
                name,
                "",
                "TEST",
                Language::C,
                tokenize(&source),
                source.clone(),
                String::new(),
            )));
        }

        let mut metric = SourceLinesOfCodeMetric::new();
        metric.calculate(ResultFilter::FileResults, &mut store, &GraphSet::new());

        let overall = metric.take_overall_data();
        assert_eq!(overall[TOTAL_SLOC_IN_FILES], json!(3));
        assert_eq!(overall[AVG_SLOC_IN_FILE], json!(1.5));

        let sloc = store
            .get("proj/a.c")
            .unwrap()
            .metrics()
            .get(SLOC_IN_FILE)
            .and_then(|v| v.as_u64());
        assert_eq!(sloc, Some(2));
    }
}
