use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::analysis::Analysis;
use crate::graph::GraphDump;
use crate::result::{EntityResult, FileResult, MetricMap};

/// Everything an exporter may want from one finished analysis, collated into
/// a single serializable value. The core guarantees this shape and nothing
/// about what exporters do with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultBundle {
    pub analysis_name: String,
    pub project_name: String,
    pub analysis_date: String,
    pub version: String,

    /// Counters as numbers, durations pre-formatted as `HH:MM:SS + ms`.
    pub statistics: BTreeMap<String, serde_json::Value>,
    pub overall_metric_results: MetricMap,
    pub local_metric_results: BTreeMap<String, MetricMap>,

    pub graphs: Vec<GraphDump>,
    pub file_results: Vec<FileResult>,
    pub entity_results: Vec<EntityResult>,
}

impl ResultBundle {
    pub fn from_analysis(analysis: &Analysis) -> Self {
        Self {
            analysis_name: analysis.analysis_name.clone(),
            project_name: analysis.project_name.clone(),
            analysis_date: analysis.analysis_date.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            statistics: analysis.statistics.formatted(),
            overall_metric_results: analysis.overall_metric_results.clone(),
            local_metric_results: analysis.local_metric_results.clone(),
            graphs: analysis
                .graph_representations
                .values()
                .map(|g| g.to_dump())
                .collect(),
            file_results: analysis.results.file_results().cloned().collect(),
            entity_results: analysis.results.entity_results().cloned().collect(),
        }
    }
}
