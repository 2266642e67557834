//! Exporters over the analysis result bundle: GraphML, DOT, JSON, and
//! tabular text for files and the console. The core only guarantees the
//! bundle shape; everything here is presentation.

pub mod dot;
pub mod graphml;
pub mod json;
pub mod text;

use std::fs;
use std::path::PathBuf;

use tracing::info;

use tangle_core::analysis::Analysis;
use tangle_core::bundle::ResultBundle;
use tangle_core::error::CoreError;

/// Run every export the analysis has configured. A missing export directory
/// is fatal and is raised to the caller.
pub fn export_analysis(analysis: &Analysis, bundle: &ResultBundle) -> Result<(), CoreError> {
    let export_directory = analysis
        .export_directory
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    if !export_directory.is_dir() {
        return Err(CoreError::ExportDirectoryMissing(export_directory));
    }

    if analysis.export_graphml {
        for dump in &bundle.graphs {
            let path = export_directory.join(format!("tangle-{}.graphml", dump.graph_type.key()));
            fs::write(&path, graphml::format_graphml(dump))
                .map_err(|e| CoreError::Export(e.to_string()))?;
        }
    }

    if analysis.export_dot {
        for dump in &bundle.graphs {
            let path = export_directory.join(format!("tangle-{}.dot", dump.graph_type.key()));
            fs::write(&path, dot::format_dot(dump))
                .map_err(|e| CoreError::Export(e.to_string()))?;
        }
    }

    if analysis.export_json {
        let path = export_directory.join("tangle-statistics-and-metrics.json");
        fs::write(&path, json::format_statistics_and_metrics(bundle))
            .map_err(|e| CoreError::Export(e.to_string()))?;
    }

    if analysis.export_tabular_file {
        let path = export_directory.join("tangle-statistics-and-metrics.txt");
        fs::write(&path, text::format_statistics_and_metrics(bundle, true))
            .map_err(|e| CoreError::Export(e.to_string()))?;
    }

    if analysis.export_tabular_console_overall {
        text::print_statistics_and_metrics(bundle, false);
    } else if analysis.export_tabular_console {
        text::print_statistics_and_metrics(bundle, true);
    }

    info!(
        "all your generated/exported data can be found here: {}",
        export_directory.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn analysis_with_exports(directory: Option<PathBuf>) -> Analysis {
        let mut analysis = Analysis::new("scan", "proj", PathBuf::from("/tmp/proj"));
        analysis.export_directory = directory;
        analysis.export_graphml = true;
        analysis.export_json = true;
        analysis.export_tabular_file = true;
        analysis
    }

    #[test]
    fn test_missing_export_directory_is_fatal() {
        let analysis = analysis_with_exports(Some(PathBuf::from("/no/such/dir")));
        let bundle = ResultBundle::from_analysis(&analysis);
        let err = export_analysis(&analysis, &bundle).unwrap_err();
        assert!(matches!(err, CoreError::ExportDirectoryMissing(_)));
    }

    #[test]
    fn test_exports_write_configured_files() {
        let tmp = TempDir::new().unwrap();
        let mut analysis = analysis_with_exports(Some(tmp.path().to_path_buf()));
        analysis
            .requested_graphs
            .insert(tangle_core::graph::GraphType::FileResultDependencyGraph);
        analysis.create_graph_representation(
            tangle_core::graph::GraphType::FileResultDependencyGraph,
        );
        let bundle = ResultBundle::from_analysis(&analysis);

        export_analysis(&analysis, &bundle).unwrap();

        assert!(tmp
            .path()
            .join("tangle-file_result_dependency_graph.graphml")
            .exists());
        assert!(tmp.path().join("tangle-statistics-and-metrics.json").exists());
        assert!(tmp.path().join("tangle-statistics-and-metrics.txt").exists());
    }
}
