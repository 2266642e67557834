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

/// Objective-C frontend: `#import` directives. Shares the `.h` extension
/// with the C family; the permitted-language list decides who claims it.
pub struct ObjCParser {
    results: ResultStore,
    import_expression: Regex,
}

impl ObjCParser {
    pub fn new() -> Self {
        Self {
            results: ResultStore::new(),
            import_expression: Regex::new(r#"^#import\s+["<]\s+([A-Za-z0-9._/]+)"#)
                .expect("import expression must compile"),
        }
    }

    fn add_imports_to_result(&self, result: &mut FileResult, analysis: &mut Analysis) {
        let source_no_comments =
            filter_without_comments(&result.scanned_tokens, "//", "/*", "*/");
        let filtered_tokens = tokenize(&source_no_comments);

        for (index, token) in filtered_tokens.iter().enumerate() {
            if token != "#import" {
                continue;
            }
            let read_ahead = support::read_ahead(&filtered_tokens, index);
            let Some(captures) = self.import_expression.captures(&read_ahead) else {
                analysis.statistics.increment(StatKey::ParsingMisses);
                warn!(
                    "could not parse import in {}: {read_ahead}",
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

impl Default for ObjCParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageParser for ObjCParser {
    fn parser_name(&self) -> &'static str {
        "OBJC_PARSER"
    }

    fn language(&self) -> Language {
        Language::ObjC
    }

    fn handles_extension(&self, extension: &str, only_permit_languages: &[Language]) -> bool {
        match extension {
            ".m" => true,
            ".h" => only_permit_languages.contains(&Language::ObjC),
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
            Language::ObjC,
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
