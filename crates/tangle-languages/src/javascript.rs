use std::path::Path;

use regex::Regex;
use tracing::{debug, warn};

use tangle_core::analysis::Analysis;
use tangle_core::language::Language;
use tangle_core::parser::LanguageParser;
use tangle_core::result::{FileResult, ResultStore, ScanResult};
use tangle_core::stats::StatKey;
use tangle_core::tokenizer::{filter_without_comments, tokenize, tokenize_with};

use crate::support;

/// JavaScript frontend: `import … from '…'` and `require('…')`.
///
/// Dependency strings are normalized into analysis-relative paths where
/// possible: alias substitution first, `@scope` and aliased paths join under
/// the source directory, `./`/`../` resolve against the owning file, and a
/// final on-disk probe appends `.js` or `/index.js`.
pub struct JavaScriptParser {
    results: ResultStore,
    import_expression: Regex,
    require_expression: Regex,
}

impl JavaScriptParser {
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

            let dependency = resolve_script_dependency(&captures[1], result, analysis, "js");
            if analysis.is_dependency_in_ignore_list(&dependency) {
                debug!("ignoring dependency from {} to {dependency}", result.unique_name);
            } else {
                result.add_import(dependency);
            }
        }
    }
}

/// Shared JavaScript/TypeScript dependency normalization; `extension` is the
/// suffix probed on disk (`js` or `ts`).
pub(crate) fn resolve_script_dependency(
    raw: &str,
    result: &FileResult,
    analysis: &Analysis,
    extension: &str,
) -> String {
    let (aliased_value, aliased) = support::apply_import_aliases(raw, &analysis.import_aliases);
    let mut dependency = aliased_value;

    if aliased || dependency.starts_with('@') {
        // scoped and alias-mapped imports are paths under the source directory
        let source_name = support::source_directory_name(analysis);
        dependency = format!("{source_name}/{}", dependency.trim_start_matches("./"));
    } else if dependency == "." {
        let index_import = format!("./index.{extension}");
        let resolved = support::resolve_relative_dependency_path(
            &index_import,
            &result.absolute_dir_path,
            &analysis.source_directory,
        );
        if support::exists_relative_to_analysis(analysis, &resolved) {
            dependency = resolved;
        }
    } else if dependency.starts_with("./") && !dependency.contains("../") {
        let rest = dependency.trim_start_matches("./");
        dependency = format!("{}/{rest}", result.relative_analysis_path());
    } else if dependency.contains("../") {
        dependency = support::resolve_relative_dependency_path(
            &dependency,
            &result.absolute_dir_path,
            &analysis.source_directory,
        );
    }

    let dotted = format!(".{extension}");
    if !dependency.ends_with(&dotted) {
        let with_extension = format!("{dependency}{dotted}");
        let with_index = format!("{dependency}/index{dotted}");
        if support::exists_relative_to_analysis(analysis, &with_extension) {
            dependency = with_extension;
        } else if support::exists_relative_to_analysis(analysis, &with_index) {
            dependency = with_index;
        }
    }
    dependency
}

impl Default for JavaScriptParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageParser for JavaScriptParser {
    fn parser_name(&self) -> &'static str {
        "JAVASCRIPT_PARSER"
    }

    fn language(&self) -> Language {
        Language::JavaScript
    }

    fn handles_extension(&self, extension: &str, _only_permit_languages: &[Language]) -> bool {
        extension == ".js" || extension == ".jsx"
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
            &relative_path,
            "",
            self.parser_name(),
            Language::JavaScript,
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

    fn parse_at(root: &Path, relative: &str, source: &str, analysis: &mut Analysis) -> JavaScriptParser {
        let mut parser = JavaScriptParser::new();
        let full = root.join(relative);
        let file_name = full.file_name().unwrap().to_string_lossy().to_string();
        parser.generate_file_result(analysis, &file_name, &full, source);
        parser
    }

    #[test]
    fn test_bare_module_import_kept() {
        let mut analysis = Analysis::new("test", "proj", PathBuf::from("/tmp/proj"));
        let parser = parse_at(
            Path::new("/tmp/proj"),
            "x.js",
            "import React from 'react';\n",
            &mut analysis,
        );
        let file = parser.results.file_results().next().unwrap();
        assert_eq!(file.scanned_import_dependencies, vec!["react"]);
    }

    #[test]
    fn test_relative_import_joined_to_analysis_path() {
        let mut analysis = Analysis::new("test", "proj", PathBuf::from("/tmp/proj"));
        let parser = parse_at(
            Path::new("/tmp/proj"),
            "src/x.js",
            "import helper from './helper';\n",
            &mut analysis,
        );
        let file = parser.results.file_results().next().unwrap();
        assert_eq!(file.scanned_import_dependencies, vec!["proj/src/helper"]);
    }

    #[test]
    fn test_require_form() {
        let mut analysis = Analysis::new("test", "proj", PathBuf::from("/tmp/proj"));
        let parser = parse_at(
            Path::new("/tmp/proj"),
            "x.js",
            "const lib = require('lodash');\n",
            &mut analysis,
        );
        let file = parser.results.file_results().next().unwrap();
        assert_eq!(file.scanned_import_dependencies, vec!["lodash"]);
    }

    #[test]
    fn test_alias_and_index_resolution() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("proj");
        fs::create_dir_all(root.join("src/y")).unwrap();
        fs::write(root.join("src/y/index.js"), "export default 1;\n").unwrap();

        let mut analysis = Analysis::new("test", "proj", root.clone());
        analysis
            .import_aliases
            .insert("@app".to_string(), "src".to_string());

        let parser = parse_at(&root, "src/x.js", "import y from '@app/y';\n", &mut analysis);
        let file = parser.results.file_results().next().unwrap();
        assert_eq!(file.scanned_import_dependencies, vec!["proj/src/y/index.js"]);
    }

    #[test]
    fn test_parent_relative_import_resolved() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("proj");
        fs::create_dir_all(root.join("src/deep")).unwrap();
        fs::write(root.join("src/util.js"), "export const u = 1;\n").unwrap();

        let mut analysis = Analysis::new("test", "proj", root.clone());
        let parser = parse_at(
            &root,
            "src/deep/x.js",
            "import util from '../util';\n",
            &mut analysis,
        );
        let file = parser.results.file_results().next().unwrap();
        assert_eq!(file.scanned_import_dependencies, vec!["proj/src/util.js"]);
    }

    #[test]
    fn test_commented_import_not_extracted() {
        let mut analysis = Analysis::new("test", "proj", PathBuf::from("/tmp/proj"));
        let parser = parse_at(
            Path::new("/tmp/proj"),
            "x.js",
            "// import gone from './gone';\nimport real from 'real';\n",
            &mut analysis,
        );
        let file = parser.results.file_results().next().unwrap();
        assert_eq!(file.scanned_import_dependencies, vec!["real"]);
    }
}
