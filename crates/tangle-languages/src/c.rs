use std::path::Path;

use regex::Regex;
use tracing::{debug, warn};

use tangle_core::analysis::Analysis;
use tangle_core::language::Language;
use tangle_core::parser::LanguageParser;
use tangle_core::result::{FileResult, ResultStore, ScanResult};
use tangle_core::stats::StatKey;
use tangle_core::tokenizer::{filter_without_comments, tokenize};

use crate::support;

/// C frontend: `#include` directives in angle-bracket or double-quote form.
/// Relative includes that point at a file on disk are rewritten to the
/// analysis-relative form; everything else is kept verbatim.
pub struct CParser {
    results: ResultStore,
    include_expression: Regex,
}

impl CParser {
    pub fn new() -> Self {
        Self {
            results: ResultStore::new(),
            include_expression: Regex::new(r#"^#include\s+(?:["<]\s+)?([A-Za-z0-9._/\-]+)"#)
                .expect("include expression must compile"),
        }
    }

    fn add_imports_to_result(&self, result: &mut FileResult, analysis: &mut Analysis) {
        let source_no_comments =
            filter_without_comments(&result.scanned_tokens, "//", "/*", "*/");
        let filtered_tokens = tokenize(&source_no_comments);

        for (index, token) in filtered_tokens.iter().enumerate() {
            if token != "#include" {
                continue;
            }
            let read_ahead = support::read_ahead(&filtered_tokens, index);
            let Some(captures) = self.include_expression.captures(&read_ahead) else {
                analysis.statistics.increment(StatKey::ParsingMisses);
                warn!(
                    "could not parse include in {}: {read_ahead}",
                    result.scanned_file_name
                );
                continue;
            };
            analysis.statistics.increment(StatKey::ParsingHits);

            let dependency =
                try_resolve_dependency(&captures[1], &result.absolute_dir_path, analysis);
            if analysis.is_dependency_in_ignore_list(&dependency) {
                debug!("ignoring dependency from {} to {dependency}", result.unique_name);
            } else {
                result.add_import(dependency);
            }
        }
    }
}

/// Rewrite the include to its analysis-relative path when the referenced
/// file actually exists; system headers stay as written.
pub(crate) fn try_resolve_dependency(
    dependency: &str,
    absolute_dir: &Path,
    analysis: &Analysis,
) -> String {
    let resolved = support::resolve_relative_dependency_path(
        dependency,
        absolute_dir,
        &analysis.source_directory,
    );
    if support::exists_relative_to_analysis(analysis, &resolved) {
        resolved
    } else {
        dependency.to_string()
    }
}

impl Default for CParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageParser for CParser {
    fn parser_name(&self) -> &'static str {
        "C_PARSER"
    }

    fn language(&self) -> Language {
        Language::C
    }

    fn handles_extension(&self, extension: &str, only_permit_languages: &[Language]) -> bool {
        match extension {
            ".c" => true,
            ".h" => only_permit_languages.contains(&Language::C),
            _ => false,
        }
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
            Language::C,
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
