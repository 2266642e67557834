use colored::Colorize;

use tangle_core::bundle::ResultBundle;

/// Aligned name/value table under a heading.
fn format_table(heading: &str, rows: &[(String, String)]) -> String {
    let width = rows.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    let mut out = String::new();
    out.push_str(heading);
    out.push('\n');
    for (name, value) in rows {
        out.push_str(&format!("  {name:<width$}  {value}\n"));
    }
    out.push('\n');
    out
}

fn value_rows(map: &std::collections::BTreeMap<String, serde_json::Value>) -> Vec<(String, String)> {
    map.iter()
        .map(|(name, value)| {
            let rendered = match value {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Number(n) => match n.as_f64() {
                    Some(f) if f.fract() != 0.0 => format!("{f:.2}"),
                    _ => n.to_string(),
                },
                other => other.to_string(),
            };
            (name.clone(), rendered)
        })
        .collect()
}

/// The tabular file export: statistics, overall metrics, and the per-result
/// local metrics.
pub fn format_statistics_and_metrics(bundle: &ResultBundle, include_local: bool) -> String {
    let mut out = String::new();

    out.push_str(&format_table(
        &format!(
            "the following statistics were collected in {}",
            bundle.analysis_name
        ),
        &value_rows(&bundle.statistics),
    ));

    out.push_str(&format_table(
        &format!(
            "the following overall metrics were collected in {}",
            bundle.analysis_name
        ),
        &value_rows(&bundle.overall_metric_results),
    ));

    if include_local {
        out.push_str(&format!(
            "the following local metrics were collected in {}\n",
            bundle.analysis_name
        ));
        for (result_name, metrics) in &bundle.local_metric_results {
            out.push_str(&format_table(result_name, &value_rows(metrics)));
        }
    }
    out
}

/// Console variant with colored headings. `include_local` distinguishes the
/// full table from the overall-only view.
pub fn print_statistics_and_metrics(bundle: &ResultBundle, include_local: bool) {
    println!(
        "{}",
        format!(
            "the following statistics were collected in {}",
            bundle.analysis_name
        )
        .bold()
    );
    for (name, value) in value_rows(&bundle.statistics) {
        println!("  {}: {value}", name.cyan());
    }

    println!(
        "{}",
        format!(
            "the following overall metrics were collected in {}",
            bundle.analysis_name
        )
        .bold()
    );
    for (name, value) in value_rows(&bundle.overall_metric_results) {
        println!("  {}: {value}", name.cyan());
    }

    if include_local {
        println!(
            "{}",
            format!(
                "the following local metrics were collected in {}",
                bundle.analysis_name
            )
            .bold()
        );
        for (result_name, metrics) in &bundle.local_metric_results {
            println!("  {}", result_name.green());
            for (name, value) in value_rows(metrics) {
                println!("    {}: {value}", name.cyan());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;
    use tangle_core::analysis::Analysis;
    use tangle_core::result::MetricMap;

    fn bundle() -> ResultBundle {
        let mut analysis = Analysis::new("scan", "proj", PathBuf::from("/tmp/proj"));
        analysis
            .overall_metric_results
            .insert("avg-sloc-in-file".to_string(), json!(2.25));
        let mut local = MetricMap::new();
        local.insert("sloc-in-file".to_string(), json!(9));
        analysis
            .local_metric_results
            .insert("proj/a.go".to_string(), local);
        ResultBundle::from_analysis(&analysis)
    }

    #[test]
    fn test_file_table_contains_sections() {
        let rendered = format_statistics_and_metrics(&bundle(), true);
        assert!(rendered.contains("statistics were collected in scan"));
        assert!(rendered.contains("overall metrics were collected in scan"));
        assert!(rendered.contains("avg-sloc-in-file"));
        assert!(rendered.contains("2.25"));
        assert!(rendered.contains("proj/a.go"));
    }

    #[test]
    fn test_overall_only_excludes_local() {
        let rendered = format_statistics_and_metrics(&bundle(), false);
        assert!(!rendered.contains("proj/a.go"));
    }
}
