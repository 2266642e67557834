use std::path::Path;

use regex::Regex;
use tracing::{debug, warn};

use tangle_core::analysis::Analysis;
use tangle_core::language::Language;
use tangle_core::parser::LanguageParser;
use tangle_core::result::{FileResult, ResultStore, ScanResult};
use tangle_core::stats::StatKey;
use tangle_core::tokenizer::{filter_without_comments, tokenize, tokenize_with};

use crate::javascript::resolve_script_dependency;
use crate::support;

/// TypeScript frontend: the JavaScript grammar probing `.ts`/`index.ts`
/// instead of their `.js` counterparts.
pub struct TypeScriptParser {
    results: ResultStore,
    import_expression: Regex,
    require_expression: Regex,
}

impl TypeScriptParser {
    pub fn new() -> Self {
        Self {
            results: ResultStore::new(),
            import_expression: Regex::new(
                r"^import\s[^\n]*?\bfrom\s+['\x22]\s*([A-Za-z0-9@_./*\-]+)",
            )
            .expect("import expression must compile"),
            require_expression: Regex::new(r"^require\s*\(\s*['\x22]\s*([A-Za-z0-9@_./*\-]+)")
                .expect("require expression must compile"),
        }
    }

    fn add_imports_to_result(&self, result: &mut FileResult, analysis: &mut Analysis) {
        let source_no_comments =
            filter_without_comments(&result.scanned_tokens, "//", "/*", "*/");
        let filtered_tokens = tokenize_with(&source_no_comments, &["'"]);

        for (index, token) in filtered_tokens.iter().enumerate() {
            if token != "import" && token != "require" {
                continue;
            }
            let read_ahead = support::read_ahead(&filtered_tokens, index);
            let expression = if token == "import" {
                &self.import_expression
            } else {
                &self.require_expression
            };

            let Some(captures) = expression.captures(&read_ahead) else {
                analysis.statistics.increment(StatKey::ParsingMisses);
                warn!(
                    "could not parse {token} in {}: {read_ahead}",
                    result.scanned_file_name
                );
                continue;
            };
            analysis.statistics.increment(StatKey::ParsingHits);

            let dependency = resolve_script_dependency(&captures[1], result, analysis, "ts");
            if analysis.is_dependency_in_ignore_list(&dependency) {
                debug!("ignoring dependency from {} to {dependency}", result.unique_name);
            } else {
                result.add_import(dependency);
            }
        }
    }
}

impl Default for TypeScriptParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageParser for TypeScriptParser {
    fn parser_name(&self) -> &'static str {
        "TYPESCRIPT_PARSER"
    }

    fn language(&self) -> Language {
        Language::TypeScript
    }

    fn handles_extension(&self, extension: &str, _only_permit_languages: &[Language]) -> bool {
        extension == ".ts" || extension == ".tsx"
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
            Language::TypeScript,
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
