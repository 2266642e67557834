use serde_json::json;

use crate::metrics::{
    record_local, GraphSet, LocalMetricData, Metric, MetricId, OverallMetricData, ResultFilter,
};
use crate::result::{ResultStore, ScanResult};

pub const WS_COMPLEXITY_IN_FILE: &str = "ws-complexity-in-file";

/// Indentation-based complexity: the sum over non-empty source lines of
/// leading tabs plus leading spaces divided by four. A cheap stand-in for
/// nesting depth that needs no grammar at all.
pub struct WhitespaceMetric {
    local_data: LocalMetricData,
    overall_data: OverallMetricData,
}

impl WhitespaceMetric {
    pub fn new() -> Self {
        Self {
            local_data: LocalMetricData::new(),
            overall_data: OverallMetricData::new(),
        }
    }
}

impl Default for WhitespaceMetric {
    fn default() -> Self {
        Self::new()
    }
}

fn leading_tabs(line: &str) -> usize {
    let without_spaces: String = line.chars().filter(|c| *c != ' ').collect();
    without_spaces.chars().take_while(|c| *c == '\t').count()
}

fn leading_spaces(line: &str) -> usize {
    let without_tabs: String = line.chars().filter(|c| *c != '\t').collect();
    without_tabs.chars().take_while(|c| *c == ' ').count()
}

fn complexity_of(line: &str) -> f64 {
    leading_tabs(line) as f64 + leading_spaces(line) as f64 / 4.0
}

pub fn whitespace_complexity(source: &str) -> f64 {
    source
        .split('\n')
        .filter(|line| !line.trim().is_empty())
        .map(complexity_of)
        .sum()
}

impl Metric for WhitespaceMetric {
    fn id(&self) -> MetricId {
        MetricId::WhitespaceComplexity
    }

    fn metric_name(&self) -> &'static str {
        "whitespace-metric"
    }

    fn pretty_metric_name(&self) -> &'static str {
        "whitespace metric"
    }

    fn calculate(&mut self, filter: ResultFilter, results: &mut ResultStore, _graphs: &GraphSet) {
        // entities carry no raw source; this metric is file-scoped
        if filter != ResultFilter::FileResults {
            return;
        }

        let complexities: Vec<(String, f64)> = results
            .file_results()
            .map(|f| (f.unique_name.clone(), whitespace_complexity(&f.source)))
            .collect();

        for (name, complexity) in complexities {
            if let Some(ScanResult::File(file)) = results.get_mut(&name) {
                file.metrics
                    .insert(WS_COMPLEXITY_IN_FILE.to_string(), json!(complexity));
            }
            record_local(
                &mut self.local_data,
                &name,
                WS_COMPLEXITY_IN_FILE,
                json!(complexity),
            );
        }
    }

    fn take_local_data(&mut self) -> LocalMetricData {
        std::mem::take(&mut self.local_data)
    }

    fn take_overall_data(&mut self) -> OverallMetricData {
        std::mem::take(&mut self.overall_data)
    }
}
