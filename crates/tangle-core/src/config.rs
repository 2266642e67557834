use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::analysis::Analysis;
use crate::error::CoreError;
use crate::graph::GraphType;
use crate::language::Language;
use crate::metrics::MetricId;

/// Top-level declarative configuration: project identity, log level, and
/// one or more analyses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub project_name: String,
    #[serde(default)]
    pub loglevel: LogLevel,
    #[serde(default)]
    pub analyses: Vec<AnalysisConfig>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Error,
}

impl LogLevel {
    /// Directive for the tracing env-filter.
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub analysis_name: String,
    pub source_directory: String,
    #[serde(default)]
    pub only_permit_languages: Vec<String>,
    #[serde(default)]
    pub only_permit_file_extensions: Vec<String>,
    #[serde(default)]
    pub only_permit_files_matching_absolute_path: Vec<String>,
    #[serde(default)]
    pub ignore_directories_containing: Vec<String>,
    #[serde(default)]
    pub ignore_files_containing: Vec<String>,
    #[serde(default)]
    pub ignore_dependencies_containing: Vec<String>,
    #[serde(default)]
    pub ignore_entities_containing: Vec<String>,
    #[serde(default)]
    pub import_aliases: BTreeMap<String, String>,
    #[serde(default)]
    pub file_scan: Vec<String>,
    #[serde(default)]
    pub entity_scan: Vec<String>,
    #[serde(default)]
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportConfig {
    pub directory: Option<String>,
    #[serde(default)]
    pub graphml: bool,
    #[serde(default)]
    pub dot: bool,
    #[serde(default)]
    pub json: bool,
    #[serde(default)]
    pub tabular_file: bool,
    #[serde(default)]
    pub tabular_console: bool,
    #[serde(default)]
    pub tabular_console_overall: bool,
}

/// One scan token: either a metric to register or a graph to build.
enum ScanToken {
    Metric(MetricId),
    Graph(GraphType),
}

fn parse_scan_token(token: &str, entity_scope: bool) -> Result<ScanToken, CoreError> {
    let parsed = match token {
        "number_of_methods" => ScanToken::Metric(MetricId::NumberOfMethods),
        "source_lines_of_code" => ScanToken::Metric(MetricId::SourceLinesOfCode),
        "fan_in_out" => ScanToken::Metric(MetricId::FanInOut),
        "louvain_modularity" => ScanToken::Metric(MetricId::LouvainModularity),
        "tfidf" => ScanToken::Metric(MetricId::Tfidf),
        "whitespace_complexity" if !entity_scope => {
            ScanToken::Metric(MetricId::WhitespaceComplexity)
        }
        "dependency_graph" => {
            if entity_scope {
                ScanToken::Graph(GraphType::EntityResultDependencyGraph)
            } else {
                ScanToken::Graph(GraphType::FileResultDependencyGraph)
            }
        }
        "inheritance_graph" if entity_scope => {
            ScanToken::Graph(GraphType::EntityResultInheritanceGraph)
        }
        "complete_graph" if entity_scope => ScanToken::Graph(GraphType::EntityResultCompleteGraph),
        _ => {
            let scope = if entity_scope { "entity_scan" } else { "file_scan" };
            return Err(CoreError::Config(format!(
                "unknown {scope} token: {token}"
            )));
        }
    };
    Ok(parsed)
}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self, CoreError> {
        let config: Config =
            toml::from_str(content).map_err(|e| CoreError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CoreError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    fn validate(&self) -> Result<(), CoreError> {
        if self.project_name.trim().is_empty() {
            return Err(CoreError::Config("project_name must not be empty".into()));
        }
        if self.analyses.is_empty() {
            return Err(CoreError::Config("analyses list is empty".into()));
        }
        for analysis in &self.analyses {
            if analysis.analysis_name.trim().is_empty() {
                return Err(CoreError::Config("analysis_name must not be empty".into()));
            }
            if analysis.source_directory.trim().is_empty() {
                return Err(CoreError::Config(format!(
                    "source_directory must not be empty in analysis {}",
                    analysis.analysis_name
                )));
            }
        }
        Ok(())
    }

    /// Materialize the configured analyses. Scan tokens are validated here;
    /// an unknown token is a configuration error and the pipeline never
    /// starts.
    pub fn build_analyses(&self) -> Result<Vec<Analysis>, CoreError> {
        self.analyses
            .iter()
            .map(|config| self.build_analysis(config))
            .collect()
    }

    fn build_analysis(&self, config: &AnalysisConfig) -> Result<Analysis, CoreError> {
        let mut analysis = Analysis::new(
            &config.analysis_name,
            &self.project_name,
            PathBuf::from(&config.source_directory),
        );

        for key in &config.only_permit_languages {
            let language = Language::from_key(key).ok_or_else(|| {
                CoreError::Config(format!("unknown language in only_permit_languages: {key}"))
            })?;
            analysis.only_permit_languages.push(language);
        }

        analysis.only_permit_file_extensions = config.only_permit_file_extensions.clone();
        analysis.only_permit_files_matching_absolute_path =
            config.only_permit_files_matching_absolute_path.clone();
        analysis.ignore_directories_containing = config.ignore_directories_containing.clone();
        analysis.ignore_files_containing = config.ignore_files_containing.clone();
        analysis.ignore_dependencies_containing = config.ignore_dependencies_containing.clone();
        analysis.ignore_entities_containing = config.ignore_entities_containing.clone();
        analysis.import_aliases = config.import_aliases.clone();

        for token in &config.file_scan {
            match parse_scan_token(token, false)? {
                ScanToken::Metric(id) => {
                    analysis.metrics_for_file_results.insert(id);
                }
                ScanToken::Graph(graph_type) => {
                    analysis.requested_graphs.insert(graph_type);
                }
            }
        }
        for token in &config.entity_scan {
            match parse_scan_token(token, true)? {
                ScanToken::Metric(id) => {
                    analysis.metrics_for_entity_results.insert(id);
                }
                ScanToken::Graph(graph_type) => {
                    analysis.requested_graphs.insert(graph_type);
                }
            }
        }
        analysis.file_scan_requested = !config.file_scan.is_empty();
        analysis.entity_scan_requested = !config.entity_scan.is_empty();

        analysis.export_directory = config.export.directory.as_ref().map(PathBuf::from);
        analysis.export_graphml = config.export.graphml;
        analysis.export_dot = config.export.dot;
        analysis.export_json = config.export.json;
        analysis.export_tabular_file = config.export.tabular_file;
        analysis.export_tabular_console = config.export.tabular_console;
        analysis.export_tabular_console_overall = config.export.tabular_console_overall;

        Ok(analysis)
    }

    /// Template configuration written by `tangle init`.
    pub fn default_toml() -> String {
        r#"# tangle - source analysis configuration

project_name = "my-project"
loglevel = "info"            # debug | info | error

[[analyses]]
analysis_name = "full scan"
source_directory = "src"
only_permit_languages = ["javascript"]
only_permit_file_extensions = [".js"]
ignore_directories_containing = ["node_modules", "dist"]
ignore_dependencies_containing = []
file_scan = [
  "number_of_methods",
  "source_lines_of_code",
  "dependency_graph",
  "fan_in_out",
  "louvain_modularity",
  "tfidf",
]

[analyses.import_aliases]
# "@app" = "src"

[analyses.export]
directory = "tangle-output"
graphml = true
json = true
tabular_file = true
tabular_console_overall = true
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_toml_is_valid() {
        let config = Config::from_toml_str(&Config::default_toml()).unwrap();
        assert_eq!(config.project_name, "my-project");
        assert_eq!(config.analyses.len(), 1);
        assert_eq!(config.loglevel, LogLevel::Info);
    }

    #[test]
    fn test_empty_analyses_rejected() {
        let toml_str = r#"project_name = "p""#;
        assert!(Config::from_toml_str(toml_str).is_err());
    }

    #[test]
    fn test_unknown_scan_token_rejected() {
        let toml_str = r#"
project_name = "p"
[[analyses]]
analysis_name = "a"
source_directory = "src"
file_scan = ["cyclomatic_complexity"]
"#;
        let config = Config::from_toml_str(toml_str).unwrap();
        let err = config.build_analyses().unwrap_err();
        assert!(err.to_string().contains("cyclomatic_complexity"));
    }

    #[test]
    fn test_inheritance_graph_is_entity_only() {
        let toml_str = r#"
project_name = "p"
[[analyses]]
analysis_name = "a"
source_directory = "src"
file_scan = ["inheritance_graph"]
"#;
        let config = Config::from_toml_str(toml_str).unwrap();
        assert!(config.build_analyses().is_err());
    }

    #[test]
    fn test_scan_tokens_register_metrics_and_graphs() {
        let toml_str = r#"
project_name = "p"
[[analyses]]
analysis_name = "a"
source_directory = "src"
file_scan = ["source_lines_of_code", "dependency_graph", "louvain_modularity"]
entity_scan = ["dependency_graph", "inheritance_graph", "complete_graph", "fan_in_out"]
"#;
        let config = Config::from_toml_str(toml_str).unwrap();
        let analyses = config.build_analyses().unwrap();
        let analysis = &analyses[0];

        assert!(analysis
            .metrics_for_file_results
            .contains(&MetricId::SourceLinesOfCode));
        assert!(analysis
            .metrics_for_file_results
            .contains(&MetricId::LouvainModularity));
        assert!(analysis
            .metrics_for_entity_results
            .contains(&MetricId::FanInOut));
        assert!(analysis
            .requested_graphs
            .contains(&GraphType::FileResultDependencyGraph));
        assert!(analysis
            .requested_graphs
            .contains(&GraphType::EntityResultCompleteGraph));
        assert!(analysis.file_scan_requested);
        assert!(analysis.entity_scan_requested);
    }

    #[test]
    fn test_unknown_language_rejected() {
        let toml_str = r#"
project_name = "p"
[[analyses]]
analysis_name = "a"
source_directory = "src"
only_permit_languages = ["fortran"]
"#;
        let config = Config::from_toml_str(toml_str).unwrap();
        assert!(config.build_analyses().is_err());
    }

    #[test]
    fn test_import_aliases_parsed() {
        let toml_str = r#"
project_name = "p"
[[analyses]]
analysis_name = "a"
source_directory = "src"
[analyses.import_aliases]
"@app" = "src"
"#;
        let config = Config::from_toml_str(toml_str).unwrap();
        let analyses = config.build_analyses().unwrap();
        assert_eq!(analyses[0].import_aliases["@app"], "src");
    }
}
