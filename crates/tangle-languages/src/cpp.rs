use std::path::Path;

use regex::Regex;
use tracing::{debug, warn};

use tangle_core::analysis::Analysis;
use tangle_core::language::Language;
use tangle_core::parser::LanguageParser;
use tangle_core::result::{FileResult, ResultStore, ScanResult};
use tangle_core::stats::StatKey;
use tangle_core::tokenizer::{filter_without_comments, tokenize};

use crate::c::try_resolve_dependency;
use crate::support;

/// C++ frontend: identical include handling to the C frontend, claiming
/// `.cpp` and (when permitted) `.h`.
pub struct CppParser {
    results: ResultStore,
    include_expression: Regex,
}

impl CppParser {
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

impl Default for CppParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageParser for CppParser {
    fn parser_name(&self) -> &'static str {
        "CPP_PARSER"
    }

    fn language(&self) -> Language {
        Language::Cpp
    }

    fn handles_extension(&self, extension: &str, only_permit_languages: &[Language]) -> bool {
        match extension {
            ".cpp" => true,
            ".h" => only_permit_languages.contains(&Language::Cpp),
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
            Language::Cpp,
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_cpp_includes() {
        let mut parser = CppParser::new();
        let mut analysis = Analysis::new("test", "proj", PathBuf::from("/tmp/proj"));
        parser.generate_file_result(
            &mut analysis,
            "main.cpp",
            Path::new("/tmp/proj/main.cpp"),
            "#include <vector>\n#include \"types.h\"\nint main() { }\n",
        );
        let file = parser.results.file_results().next().unwrap();
        assert_eq!(file.scanned_import_dependencies, vec!["vector", "types.h"]);
        assert_eq!(analysis.statistics.count(StatKey::ParsingHits), 2);
    }
}
