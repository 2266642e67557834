use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{debug, warn};

use tangle_core::analysis::Analysis;
use tangle_core::language::Language;
use tangle_core::parser::LanguageParser;
use tangle_core::result::{FileResult, ResultStore, ScanResult};
use tangle_core::stats::StatKey;
use tangle_core::tokenizer::{filter_without_comments, tokenize};

use crate::support;

/// Python frontend. Imports are parsed line by line: `import x`,
/// `from x.y import z`, and the relative forms `from . import a, b` /
/// `from .. import a, b`, where the dots translate to directory traversal
/// from the owning file.
pub struct PythonParser {
    results: ResultStore,
    from_current_dir: Regex,
    from_parent_dir: Regex,
    general_import: Regex,
}

impl PythonParser {
    pub fn new() -> Self {
        Self {
            results: ResultStore::new(),
            from_current_dir: Regex::new(r"^from\s+\.\s+import\s+(.+)$")
                .expect("relative import expression must compile"),
            from_parent_dir: Regex::new(r"^from\s+\.\.\s+import\s+(.+)$")
                .expect("parent import expression must compile"),
            general_import: Regex::new(r"^(import|from)\s+([A-Za-z0-9_./\-]+)")
                .expect("import expression must compile"),
        }
    }

    /// Rebuild source lines from the comment-filtered token stream and keep
    /// the unique ones that mention an import (doctest `>` lines excluded).
    fn import_lines(tokens: &[String]) -> Vec<String> {
        let mut lines = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        for token in tokens {
            if token == "\n" {
                let line = current.join(" ");
                if !line.is_empty()
                    && line.contains("import")
                    && !line.contains('>')
                    && !lines.contains(&line)
                {
                    lines.push(line);
                }
                current.clear();
            } else {
                current.push(token);
            }
        }
        let line = current.join(" ");
        if !line.is_empty() && line.contains("import") && !line.contains('>') {
            lines.push(line);
        }
        lines
    }

    fn add_imports_to_result(&self, result: &mut FileResult, analysis: &mut Analysis) {
        let source_no_comments =
            filter_without_comments(&result.scanned_tokens, "#", "\"\"\"", "\"\"\"");
        let filtered_tokens = tokenize(&source_no_comments);

        for line in Self::import_lines(&filtered_tokens) {
            if let Some(captures) = self.from_current_dir.captures(&line) {
                analysis.statistics.increment(StatKey::ParsingHits);
                for dep in captures[1].split(',') {
                    let dependency = format!("{}/{}", result.relative_analysis_path(), dep.trim());
                    self.record(result, analysis, ensure_py_suffix(dependency));
                }
            } else if let Some(captures) = self.from_parent_dir.captures(&line) {
                analysis.statistics.increment(StatKey::ParsingHits);
                for dep in captures[1].split(',') {
                    let joined = format!("{}/../{}", result.relative_analysis_path(), dep.trim());
                    let normalized =
                        support::to_slash_string(&support::normalize_lexically(&PathBuf::from(
                            joined,
                        )));
                    self.record(result, analysis, ensure_py_suffix(normalized));
                }
            } else if let Some(captures) = self.general_import.captures(&line) {
                analysis.statistics.increment(StatKey::ParsingHits);
                let global_import = &captures[1] == "import";
                let dependency = captures[2].to_string();
                self.resolve_general_import(result, analysis, dependency, global_import);
            } else {
                analysis.statistics.increment(StatKey::ParsingMisses);
                warn!(
                    "could not parse import line in {}: {line}",
                    result.scanned_file_name
                );
            }
        }
    }

    fn resolve_general_import(
        &self,
        result: &mut FileResult,
        analysis: &mut Analysis,
        mut dependency: String,
        global_import: bool,
    ) {
        let mut relative_import = false;

        if dependency.contains("..") {
            relative_import = true;
            dependency = dependency.replace("..", "../");
        }
        if dependency.len() > 1
            && dependency.starts_with('.')
            && !dependency.starts_with("..")
            && !dependency.starts_with("./")
        {
            relative_import = true;
            dependency.remove(0);
        }

        if !global_import && relative_import && !dependency.contains("../") {
            dependency = format!("{}/{dependency}", result.relative_analysis_path());
        } else if !global_import && !dependency.contains("../") {
            // from x.y import z: a module path under the source directory
            let posix = dependency.replace('.', "/");
            let relative_path = format!("{}/{posix}", support::source_directory_name(analysis));
            let with_suffix = format!("{relative_path}.py");
            let dependency = if support::exists_relative_to_analysis(analysis, &with_suffix) {
                with_suffix
            } else {
                relative_path
            };
            self.record(result, analysis, dependency);
            return;
        }

        if dependency.contains("../") {
            dependency = support::resolve_relative_dependency_path(
                &dependency,
                &result.absolute_dir_path,
                &analysis.source_directory,
            );
        }
        if !global_import {
            dependency = dependency.replace('.', "/");
        }
        if !global_import && !dependency.contains(".py") {
            dependency = format!("{dependency}.py");
        }
        self.record(result, analysis, dependency);
    }

    fn record(&self, result: &mut FileResult, analysis: &mut Analysis, dependency: String) {
        if analysis.is_dependency_in_ignore_list(&dependency) {
            debug!("ignoring dependency from {} to {dependency}", result.unique_name);
        } else {
            result.add_import(dependency);
        }
    }
}

fn ensure_py_suffix(dependency: String) -> String {
    if dependency.contains(".py") {
        dependency
    } else {
        format!("{dependency}.py")
    }
}

impl Default for PythonParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageParser for PythonParser {
    fn parser_name(&self) -> &'static str {
        "PYTHON_PARSER"
    }

    fn language(&self) -> Language {
        Language::Python
    }

    fn handles_extension(&self, extension: &str, _only_permit_languages: &[Language]) -> bool {
        extension == ".py"
    }

    fn generate_file_result(
        &mut self,
        analysis: &mut Analysis,
        file_name: &str,
        full_path: &Path,
        content: &str,
    ) {
        let scanned_tokens = tokenize(content);
        let relative_path = support::relative_analysis_file_path(analysis, full_path);

        let mut file_result = FileResult::new(
            file_name,
            &relative_path,
            &full_path.to_string_lossy(),
            file_name,
            "",
            self.parser_name(),
            Language::Python,
            scanned_tokens,
            content.to_string(),
            String::new(),
        );

        self.add_imports_to_result(&mut file_result, analysis);
        self.results.insert(ScanResult::File(file_result));
    }

    fn results(&self) -> &ResultStore {
        &self.results
    }

    fn take_results(&mut self) -> ResultStore {
        std::mem::take(&mut self.results)
    }
}
