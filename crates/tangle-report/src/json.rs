use serde_json::json;

use tangle_core::bundle::ResultBundle;

/// Statistics, metric results and a node-link dump of every graph as one
/// JSON document.
pub fn format_statistics_and_metrics(bundle: &ResultBundle) -> String {
    let document = json!({
        "analysis-name": bundle.analysis_name,
        "project-name": bundle.project_name,
        "analysis-date": bundle.analysis_date,
        "version": bundle.version,
        "statistics": bundle.statistics,
        "overall-metric-results": bundle.overall_metric_results,
        "local-metric-results": bundle.local_metric_results,
        "graphs": bundle.graphs,
    });
    serde_json::to_string_pretty(&document).expect("bundle should be serializable")
}
