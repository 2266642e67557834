use std::path::Path;

use regex::Regex;
use tracing::{debug, warn};

use tangle_core::analysis::Analysis;
use tangle_core::language::Language;
use tangle_core::parser::LanguageParser;
use tangle_core::result::{FileResult, ResultStore, ScanResult};
use tangle_core::stats::StatKey;
use tangle_core::tokenizer::{filter_without_comments, tokenize_with};

use crate::support;

/// Ruby frontend: `require` and `require_relative`. A required path is
/// probed in three shapes (as written, with the first `../` treated as
/// `./`, and under `lib/`) and adopted only when the probe finds the file
/// on disk.
pub struct RubyParser {
    results: ResultStore,
    require_expression: Regex,
}

impl RubyParser {
    pub fn new() -> Self {
        Self {
            results: ResultStore::new(),
            require_expression: Regex::new(
                r"^require(?:_relative)?\s+(?:\(\s*)?['\x22]\s*([A-Za-z0-9_/.\-]+)",
            )
            .expect("require expression must compile"),
        }
    }

    fn add_imports_to_result(&self, result: &mut FileResult, analysis: &mut Analysis) {
        let source_no_comments =
            filter_without_comments(&result.scanned_tokens, "#", "=begin", "=end");
        let filtered_tokens = tokenize_with(&source_no_comments, &["'"]);

        for (index, token) in filtered_tokens.iter().enumerate() {
            if token != "require" && token != "require_relative" {
                continue;
            }
            let read_ahead = support::read_ahead(&filtered_tokens, index);
            let Some(captures) = self.require_expression.captures(&read_ahead) else {
                analysis.statistics.increment(StatKey::ParsingMisses);
                warn!(
                    "could not parse require in {}: {read_ahead}",
                    result.scanned_file_name
                );
                continue;
            };
            analysis.statistics.increment(StatKey::ParsingHits);

            let dependency = resolve_require(&captures[1], result, analysis);
            if analysis.is_dependency_in_ignore_list(&dependency) {
                debug!("ignoring dependency from {} to {dependency}", result.unique_name);
            } else {
                result.add_import(dependency);
            }
        }
    }
}

fn resolve_require(raw: &str, result: &FileResult, analysis: &Analysis) -> String {
    let mut candidates: Vec<String> = Vec::new();

    candidates.push(support::resolve_relative_dependency_path(
        raw,
        &result.absolute_dir_path,
        &analysis.source_directory,
    ));

    if raw.starts_with("../") {
        let flattened = raw.replacen("../", "./", 1);
        candidates.push(support::resolve_relative_dependency_path(
            &flattened,
            &result.absolute_dir_path,
            &analysis.source_directory,
        ));
    }

    let source_name = support::source_directory_name(analysis);
    candidates.push(format!("{source_name}/lib/{raw}"));

    for candidate in candidates {
        let with_extension = if candidate.ends_with(".rb") {
            candidate.clone()
        } else {
            format!("{candidate}.rb")
        };
        if support::exists_relative_to_analysis(analysis, &with_extension) {
            return with_extension;
        }
    }
    raw.to_string()
}

impl Default for RubyParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageParser for RubyParser {
    fn parser_name(&self) -> &'static str {
        "RUBY_PARSER"
    }

    fn language(&self) -> Language {
        Language::Ruby
    }

    fn handles_extension(&self, extension: &str, _only_permit_languages: &[Language]) -> bool {
        extension == ".rb"
    }

    fn generate_file_result(
        &mut self,
        analysis: &mut Analysis,
        file_name: &str,
        full_path: &Path,
        content: &str,
    ) {
        let scanned_tokens = tokenize_with(content, &["'"]);
        let relative_path = support::relative_analysis_file_path(analysis, full_path);

        let mut file_result = FileResult::new(
            file_name,
            &relative_path,
            &full_path.to_string_lossy(),
            file_name,
            "",
            self.parser_name(),
            Language::Ruby,
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
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_unresolvable_require_kept_verbatim() {
        let mut parser = RubyParser::new();
        let mut analysis = Analysis::new("test", "proj", PathBuf::from("/tmp/proj"));
        parser.generate_file_result(
            &mut analysis,
            "app.rb",
            Path::new("/tmp/proj/app.rb"),
            "require 'json'\nputs 'hi'\n",
        );
        let file = parser.results.file_results().next().unwrap();
        assert_eq!(file.scanned_import_dependencies, vec!["json"]);
    }

    #[test]
    fn test_require_relative_resolved_on_disk() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("proj");
        fs::create_dir_all(root.join("app")).unwrap();
        fs::write(root.join("app/helper.rb"), "def help; end\n").unwrap();

        let mut parser = RubyParser::new();
        let mut analysis = Analysis::new("test", "proj", root.clone());
        parser.generate_file_result(
            &mut analysis,
            "main.rb",
            &root.join("app/main.rb"),
            "require_relative 'helper'\n",
        );
        let file = parser.results.file_results().next().unwrap();
        assert_eq!(file.scanned_import_dependencies, vec!["proj/app/helper.rb"]);
    }

    #[test]
    fn test_lib_fallback() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("proj");
        fs::create_dir_all(root.join("lib")).unwrap();
        fs::write(root.join("lib/config.rb"), "CONFIG = {}\n").unwrap();

        let mut parser = RubyParser::new();
        let mut analysis = Analysis::new("test", "proj", root.clone());
        parser.generate_file_result(
            &mut analysis,
            "main.rb",
            &root.join("main.rb"),
            "require 'config'\n",
        );
        let file = parser.results.file_results().next().unwrap();
        assert_eq!(file.scanned_import_dependencies, vec!["proj/lib/config.rb"]);
    }
}
