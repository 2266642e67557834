use std::collections::BTreeMap;
use std::path::Path;

use regex::Regex;
use tracing::debug;

use tangle_core::analysis::Analysis;
use tangle_core::language::Language;
use tangle_core::parser::LanguageParser;
use tangle_core::result::{FileResult, ResultStore, ScanResult};
use tangle_core::stats::StatKey;
use tangle_core::tokenizer::{filter_without_comments, tokenize_with};

use crate::support;

const GO_TOKEN_EXTRAS: [&str; 2] = ["&", "..."];

/// Go frontend. Files are tokenized up front; imports are resolved in a
/// second pass once every file result exists, because a package import
/// names a directory, not a file. The directory is matched against the
/// filesystem graph and a dependency edge goes to each member source file
/// whose `func`/`struct` names actually occur in the importing file.
pub struct GoParser {
    results: ResultStore,
    func_expression: Regex,
    struct_expression: Regex,
}

impl GoParser {
    pub fn new() -> Self {
        Self {
            results: ResultStore::new(),
            func_expression: Regex::new(r"func\s(?:\(\s*\w*\s*\**\w*\s*\)\s*)?(\w*)?")
                .expect("func expression must compile"),
            struct_expression: Regex::new(r"type\s(\w*)?\s*struct")
                .expect("struct expression must compile"),
        }
    }

    fn preprocess_go_source(tokens: &[String]) -> String {
        let source_no_comments = filter_without_comments(tokens, "//", "/*", "*/");
        tokenize_with(&source_no_comments, &GO_TOKEN_EXTRAS).join(" ")
    }

    /// Import paths from `import "…"` and parenthesized import groups,
    /// read off the preprocessed token stream.
    fn extract_import_paths(preprocessed_source: &str) -> Vec<String> {
        let tokens: Vec<&str> = preprocessed_source.split(' ').collect();
        let mut imports = Vec::new();
        let mut index = 0;

        while index < tokens.len() {
            if tokens[index] != "import" {
                index += 1;
                continue;
            }
            let mut cursor = index + 1;
            while cursor < tokens.len() && tokens[cursor] == "\n" {
                cursor += 1;
            }
            if cursor < tokens.len() && tokens[cursor] == "(" {
                // import ( [alias] "path" ... )
                cursor += 1;
                while cursor < tokens.len() && tokens[cursor] != ")" {
                    if tokens[cursor] == "\"" {
                        if cursor + 2 < tokens.len() && tokens[cursor + 2] == "\"" {
                            imports.push(tokens[cursor + 1].to_string());
                            cursor += 3;
                            continue;
                        }
                    }
                    cursor += 1;
                }
            } else if cursor < tokens.len() && tokens[cursor] == "\"" {
                if cursor + 2 < tokens.len() && tokens[cursor + 2] == "\"" {
                    imports.push(tokens[cursor + 1].to_string());
                    cursor += 2;
                }
            }
            index = cursor + 1;
        }
        imports
    }

    /// Candidate symbol names (funcs and structs) defined in one file.
    fn symbol_candidates(&self, preprocessed_source: &str) -> Vec<String> {
        let mut candidates: Vec<String> = self
            .struct_expression
            .captures_iter(preprocessed_source)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        candidates.extend(
            self.func_expression
                .captures_iter(preprocessed_source)
                .filter_map(|c| c.get(1))
                .map(|m| m.as_str().to_string())
                .filter(|s| !s.is_empty()),
        );
        candidates
    }

    fn add_imports_to_result(
        &self,
        result: &mut FileResult,
        analysis: &mut Analysis,
        directory_nodes: &[String],
        files_in_directories: &BTreeMap<String, Vec<String>>,
        package_sources: &BTreeMap<String, String>,
    ) {
        let extracted = Self::extract_import_paths(&result.preprocessed_source);

        for dependency in extracted {
            analysis.statistics.increment(StatKey::ParsingHits);

            if analysis.is_dependency_in_ignore_list(&dependency) {
                debug!("ignoring dependency from {} to {dependency}", result.unique_name);
                continue;
            }
            if !dependency.contains('/') {
                result.add_import(dependency);
                continue;
            }

            // a previously scanned file may match the import path directly
            let mut resolved = false;
            let mut dependency = dependency;
            for scanned in &analysis.absolute_scanned_file_names {
                let stem = scanned.trim_end_matches(".go");
                if dependency.ends_with(stem) {
                    dependency = format!("{stem}.go");
                    resolved = true;
                }
            }
            if resolved {
                result.add_import(dependency);
                continue;
            }

            // otherwise match the import path against scanned directories and
            // wire up the member files whose symbols the importer uses
            for node_name in directory_nodes {
                if !dependency.ends_with(node_name.as_str()) {
                    continue;
                }
                let Some(member_files) = files_in_directories.get(node_name) else {
                    continue;
                };
                for member in member_files {
                    let Some(member_source) = package_sources.get(member) else {
                        continue;
                    };
                    let candidates = self.symbol_candidates(member_source);
                    let uses_symbol = candidates
                        .iter()
                        .any(|name| result.preprocessed_source.contains(name.as_str()));
                    if uses_symbol {
                        result.add_import(member.clone());
                        debug!("adding import: {member}");
                        resolved = true;
                    }
                }
            }

            if !resolved {
                result.add_import(dependency);
            }
        }
    }
}

impl Default for GoParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageParser for GoParser {
    fn parser_name(&self) -> &'static str {
        "GO_PARSER"
    }

    fn language(&self) -> Language {
        Language::Go
    }

    fn handles_extension(&self, extension: &str, _only_permit_languages: &[Language]) -> bool {
        extension == ".go"
    }

    fn generate_file_result(
        &mut self,
        analysis: &mut Analysis,
        file_name: &str,
        full_path: &Path,
        content: &str,
    ) {
        let scanned_tokens = tokenize_with(content, &GO_TOKEN_EXTRAS);
        let relative_path = support::relative_analysis_file_path(analysis, full_path);
        let preprocessed_source = Self::preprocess_go_source(&scanned_tokens);

        let file_result = FileResult::new(
            file_name,
            &relative_path,
            &full_path.to_string_lossy(),
            file_name,
            "",
            self.parser_name(),
            Language::Go,
            scanned_tokens,
            content.to_string(),
            preprocessed_source,
        );

        self.results.insert(ScanResult::File(file_result));
    }

    /// Package imports resolve against the filesystem graph, which only
    /// exists once the scan is done; all import wiring happens here.
    fn after_generated_file_results(&mut self, analysis: &mut Analysis) {
        let directory_nodes = analysis.filesystem_directory_nodes();
        let files_in_directories = analysis.scanned_files_nodes_in_directories.clone();

        let package_sources: BTreeMap<String, String> = self
            .results
            .file_results()
            .map(|f| (f.unique_name.clone(), f.preprocessed_source.clone()))
            .collect();

        let names: Vec<String> = self
            .results
            .file_results()
            .map(|f| f.unique_name.clone())
            .collect();

        for name in names {
            let Some(ScanResult::File(mut file)) = self.results.get(&name).cloned() else {
                continue;
            };
            self.add_imports_to_result(
                &mut file,
                analysis,
                &directory_nodes,
                &files_in_directories,
                &package_sources,
            );
            self.results.insert(ScanResult::File(file));
        }
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

    #[test]
    fn test_extract_single_line_import() {
        let source = GoParser::preprocess_go_source(&tokenize_with(
            "package main\nimport \"fmt\"\nfunc main() { }\n",
            &GO_TOKEN_EXTRAS,
        ));
        assert_eq!(GoParser::extract_import_paths(&source), vec!["fmt"]);
    }

    #[test]
    fn test_extract_grouped_imports() {
        let source = GoParser::preprocess_go_source(&tokenize_with(
            "package main\nimport (\n\t\"fmt\"\n\tlog \"my/log\"\n)\nfunc main() { }\n",
            &GO_TOKEN_EXTRAS,
        ));
        assert_eq!(
            GoParser::extract_import_paths(&source),
            vec!["fmt", "my/log"]
        );
    }

    #[test]
    fn test_symbol_candidates() {
        let parser = GoParser::new();
        let source = "func Foo ( ) { } func ( r *Recv ) Bar ( ) { } type Widget struct {";
        let candidates = parser.symbol_candidates(source);
        assert!(candidates.contains(&"Foo".to_string()));
        assert!(candidates.contains(&"Bar".to_string()));
        assert!(candidates.contains(&"Widget".to_string()));
    }
}
