//! The analysis orchestrator: sequences scanning, parsing, entity
//! extraction, metric calculation and graph annotation for every configured
//! analysis.

use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::analysis::Analysis;
use crate::error::CoreError;
use crate::graph::FilesystemNodeKind;
use crate::metrics;
use crate::parser::LanguageParser;
use crate::stats::StatKey;
use crate::walker::{self, dotted_extension};

pub struct Analyzer {
    parsers: Vec<Box<dyn LanguageParser>>,
    cancelled: Arc<AtomicBool>,
}

impl Analyzer {
    pub fn new(parsers: Vec<Box<dyn LanguageParser>>) -> Self {
        Self {
            parsers,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shared flag checked at phase boundaries (between files, between
    /// metrics, between graphs). Setting it stops the run cooperatively.
    pub fn cancellation_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Run every analysis in order. A failing analysis aborts the run; its
    /// error class decides the caller's exit code.
    pub fn start_analyzing(&mut self, analyses: &mut [Analysis]) -> Result<(), CoreError> {
        let total = analyses.len();
        for (index, analysis) in analyses.iter_mut().enumerate() {
            if self.is_cancelled() {
                info!("cancellation requested, stopping before {}", analysis.analysis_name);
                break;
            }
            info!(
                "performing analysis {}/{}: {}",
                index + 1,
                total,
                analysis.analysis_name
            );

            analysis.start_timer();
            self.start_scanning(analysis)?;
            analysis.stop_timer();
            if let Some(duration) = analysis.duration() {
                analysis
                    .statistics
                    .add_duration(StatKey::AnalysisRuntime, duration);
                analysis
                    .statistics
                    .add_duration(StatKey::TotalRuntime, duration);
            }

            for parser in &mut self.parsers {
                parser.take_results();
            }
        }
        Ok(())
    }

    /// One analysis, phase by phase. The filesystem graph always comes
    /// first; dependency resolution may consult it but never the reverse.
    fn start_scanning(&mut self, analysis: &mut Analysis) -> Result<(), CoreError> {
        let canonical = fs::canonicalize(&analysis.source_directory)
            .map_err(|_| CoreError::SourceDirectoryMissing(analysis.source_directory.clone()))?;
        analysis.source_directory = canonical;

        walker::create_filesystem_graph(analysis)?;
        if self.is_cancelled() {
            return Ok(());
        }

        if analysis.file_scan_requested || analysis.entity_scan_requested {
            self.create_file_results(analysis);
        }
        if analysis.entity_scan_requested && !self.is_cancelled() {
            self.create_entity_results(analysis);
        }

        for parser in &mut self.parsers {
            if !parser.results().is_empty() {
                parser.after_generated_file_results(analysis);
            }
        }
        for parser in &mut self.parsers {
            if !parser.results().is_empty() {
                analysis.results.merge(parser.take_results());
            }
        }

        analysis.statistics.add_count(
            StatKey::ExtractedFileResults,
            analysis.results.number_of_file_results() as u64,
        );
        if analysis.entity_scan_requested {
            analysis.statistics.add_count(
                StatKey::ExtractedEntityResults,
                analysis.results.number_of_entity_results() as u64,
            );
        }
        info!("scanning complete");

        if analysis.contains_code_metrics() {
            info!(
                "starting code metric calculation for analysis {}",
                analysis.analysis_name
            );
            for id in analysis.registered_code_metrics() {
                if self.is_cancelled() {
                    return Ok(());
                }
                let mut metric = metrics::instantiate(id);
                analysis.calculate_metric(metric.as_mut());
            }
        }

        if analysis.contains_graph_metrics() {
            analysis.calculate_graph_representations();
            info!(
                "starting graph metric calculation for analysis {}",
                analysis.analysis_name
            );
            for id in analysis.registered_graph_metrics() {
                if self.is_cancelled() {
                    return Ok(());
                }
                let mut metric = metrics::instantiate(id);
                analysis.calculate_metric(metric.as_mut());
            }
            analysis.add_local_metric_results_to_graphs();
        }

        info!("calculated and collected metric data");
        Ok(())
    }

    /// Token extraction over the filesystem graph's file nodes. The node map
    /// is moved out for the duration of the loop so parsers can freely
    /// mutate the analysis (statistics, results).
    fn create_file_results(&mut self, analysis: &mut Analysis) {
        info!(
            "starting token extraction for file results in {}",
            analysis.analysis_name
        );
        let creation_starts = Instant::now();

        let nodes = analysis.take_filesystem_nodes();
        for node in nodes.values() {
            if self.is_cancelled() {
                break;
            }
            if node.kind != FilesystemNodeKind::File {
                continue;
            }
            let Some(content) = node.content.as_deref() else {
                continue;
            };

            let extension = dotted_extension(&node.absolute_path);
            let file_name = node
                .absolute_path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();

            let parser = self
                .parsers
                .iter_mut()
                .find(|p| p.handles_extension(&extension, &analysis.only_permit_languages));
            match parser {
                Some(parser) => {
                    parser.generate_file_result(
                        analysis,
                        &file_name,
                        &node.absolute_path,
                        content,
                    );
                }
                None => {
                    warn!("no parser claims {extension}, skipping {file_name}");
                }
            }
        }
        analysis.restore_filesystem_nodes(nodes);

        analysis
            .statistics
            .add_duration(StatKey::FileResultsCreationRuntime, creation_starts.elapsed());
    }

    fn create_entity_results(&mut self, analysis: &mut Analysis) {
        info!("starting entity extraction in {}", analysis.analysis_name);
        let creation_starts = Instant::now();

        for parser in &mut self.parsers {
            if !parser.results().is_empty() {
                parser.generate_entity_results(analysis);
            }
        }

        analysis.statistics.add_duration(
            StatKey::EntityResultsCreationRuntime,
            creation_starts.elapsed(),
        );
    }
}
