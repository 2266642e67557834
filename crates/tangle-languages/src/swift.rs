use std::collections::BTreeMap;
use std::path::Path;

use regex::Regex;
use tracing::debug;

use tangle_core::analysis::Analysis;
use tangle_core::language::Language;
use tangle_core::parser::{EntityOutcome, LanguageParser};
use tangle_core::result::{EntityResult, FileResult, MetricMap, ResultStore, ScanResult};
use tangle_core::stats::StatKey;
use tangle_core::tokenizer::tokenize;

use crate::support;

/// Names that only show up as entity names through parsing errors.
const IGNORED_ENTITY_NAMES: [&str; 11] = [
    "class",
    "struct",
    "protocol",
    "enum",
    "var",
    "let",
    "func",
    "extension",
    "import",
    "fileprivate",
    "value",
];

/// Swift frontend. Entities are `class|struct|enum|protocol` scopes;
/// `extension` blocks are merged into their entity in a second pass. Swift
/// has no file-level include directive, so imports between files are
/// inferred from token co-occurrence: a file that mentions some entity's
/// name imports the file that declares it.
pub struct SwiftParser {
    results: ResultStore,
    entity_expression: Regex,
    extension_expression: Regex,
}

impl SwiftParser {
    pub fn new() -> Self {
        Self {
            results: ResultStore::new(),
            entity_expression: Regex::new(
                r"^(?:class|struct|enum|protocol)\s+([A-Za-z0-9_.]+)(?:\s*:\s*([A-Za-z0-9_.]+))?",
            )
            .expect("entity expression must compile"),
            extension_expression: Regex::new(r"^extension\s+([A-Za-z0-9]+)")
                .expect("extension expression must compile"),
        }
    }

    /// Declared entity scopes of one file, with false positives (keyword
    /// followed by `let`/`var`/`func`, or a keyword captured as the name)
    /// filtered out.
    fn entity_scopes(&self, file: &FileResult) -> Vec<tangle_core::result::EntityScope> {
        let expression = &self.entity_expression;
        let matcher = |header: &str| {
            expression.captures(header).and_then(|captures| {
                let name = captures[1].to_string();
                if IGNORED_ENTITY_NAMES.contains(&name.as_str()) {
                    return None;
                }
                Some((name, captures.get(2).map(|m| m.as_str().to_string())))
            })
        };
        file.generate_entity_results_from_scopes(
            &["class", "struct", "enum", "protocol"],
            &matcher,
            Language::Swift.comment_style(),
        )
    }

    /// Map of every declared entity name to the unique name of its file.
    fn entity_owners(&self) -> BTreeMap<String, String> {
        let mut owners = BTreeMap::new();
        for file in self.results.file_results() {
            for scope in self.entity_scopes(file) {
                owners.insert(scope.entity_name, file.unique_name.clone());
            }
        }
        owners
    }

    fn merge_extensions_into_entities(&mut self) {
        let files: Vec<FileResult> = self.results.file_results().cloned().collect();
        for file in &files {
            let expression = &self.extension_expression;
            let matcher = |header: &str| {
                expression
                    .captures(header)
                    .map(|captures| (captures[1].to_string(), None::<String>))
            };
            let extensions = file.generate_entity_results_from_scopes(
                &["extension"],
                &matcher,
                Language::Swift.comment_style(),
            );

            for extension in extensions {
                let Some(ScanResult::Entity(mut entity)) =
                    self.results.get(&extension.entity_name).cloned()
                else {
                    continue;
                };
                entity.scanned_tokens.extend(extension.tokens);
                debug!(
                    "added extension from {} to entity {}",
                    file.unique_name, entity.entity_name
                );
                self.results.insert(ScanResult::Entity(entity));
            }
        }
    }

    /// Token co-occurrence import inference between entities: an entity that
    /// mentions another entity's name imports it, unless the name is its
    /// own or already an inheritance edge.
    fn add_imports_to_entity_results(&mut self, analysis: &mut Analysis) {
        let entity_names: Vec<String> = self
            .results
            .entity_results()
            .map(|e| e.entity_name.clone())
            .collect();

        let names: Vec<String> = self
            .results
            .entity_results()
            .map(|e| e.unique_name.clone())
            .collect();
        for name in names {
            let Some(ScanResult::Entity(mut entity)) = self.results.get(&name).cloned() else {
                continue;
            };
            let mentioned: Vec<String> = entity
                .scanned_tokens
                .iter()
                .filter(|token| entity_names.contains(token))
                .filter(|token| token.to_lowercase() != entity.entity_name.to_lowercase())
                .filter(|token| !entity.scanned_inheritance_dependencies.contains(token))
                .cloned()
                .collect();
            for dependency in mentioned {
                if analysis.is_dependency_in_ignore_list(&dependency) {
                    debug!(
                        "ignoring dependency from {} to {dependency}",
                        entity.entity_name
                    );
                } else {
                    entity.add_import(dependency);
                }
            }
            self.results.insert(ScanResult::Entity(entity));
        }
    }
}

impl Default for SwiftParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageParser for SwiftParser {
    fn parser_name(&self) -> &'static str {
        "SWIFT_PARSER"
    }

    fn language(&self) -> Language {
        Language::Swift
    }

    fn handles_extension(&self, extension: &str, _only_permit_languages: &[Language]) -> bool {
        extension == ".swift"
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

        let file_result = FileResult::new(
            &relative_path,
            &relative_path,
            &full_path.to_string_lossy(),
            file_name,
            &relative_path,
            self.parser_name(),
            Language::Swift,
            scanned_tokens,
            content.to_string(),
            String::new(),
        );

        self.results.insert(ScanResult::File(file_result));
    }

    /// File-to-file imports by co-occurrence: a file whose tokens mention a
    /// declared entity name imports the declaring file.
    fn after_generated_file_results(&mut self, analysis: &mut Analysis) {
        let owners = self.entity_owners();

        let file_names: Vec<String> = self
            .results
            .file_results()
            .map(|f| f.unique_name.clone())
            .collect();

        for file_name in file_names {
            let Some(ScanResult::File(mut file)) = self.results.get(&file_name).cloned() else {
                continue;
            };
            for (entity_name, owner) in &owners {
                if *owner == file.unique_name {
                    continue;
                }
                if !file.scanned_tokens.contains(entity_name) {
                    continue;
                }
                if analysis.is_dependency_in_ignore_list(owner) {
                    debug!("ignoring dependency from {} to {owner}", file.unique_name);
                } else {
                    file.add_import(owner.clone());
                }
            }
            self.results.insert(ScanResult::File(file));
        }
    }

    fn generate_entity_results(&mut self, analysis: &mut Analysis) -> EntityOutcome {
        let files: Vec<FileResult> = self.results.file_results().cloned().collect();

        for file in &files {
            for scope in self.entity_scopes(file) {
                if analysis.is_entity_in_ignore_list(&scope.entity_name) {
                    continue;
                }
                let mut entity = EntityResult {
                    unique_name: scope.entity_name.clone(),
                    entity_name: scope.entity_name,
                    module_name: file.module_name.clone(),
                    scanned_file_name: file.scanned_file_name.clone(),
                    scanned_by: self.parser_name().to_string(),
                    scanned_language: Language::Swift,
                    scanned_tokens: scope.tokens,
                    scanned_import_dependencies: Vec::new(),
                    scanned_inheritance_dependencies: Vec::new(),
                    parent_file_unique_name: file.unique_name.clone(),
                    metrics: MetricMap::new(),
                };
                if let Some(inherited) = scope.inherited_entity {
                    analysis.statistics.increment(StatKey::ParsingHits);
                    entity.add_inheritance(inherited);
                }
                self.results.insert(ScanResult::Entity(entity));
            }
        }

        self.merge_extensions_into_entities();
        self.add_imports_to_entity_results(analysis);
        EntityOutcome::Supported
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

    fn scan(sources: &[(&str, &str)]) -> (SwiftParser, Analysis) {
        let mut parser = SwiftParser::new();
        let mut analysis = Analysis::new("test", "proj", PathBuf::from("/tmp/proj"));
        for (relative, source) in sources {
            let full = PathBuf::from("/tmp").join(relative);
            let file_name = full.file_name().unwrap().to_string_lossy().to_string();
            parser.generate_file_result(&mut analysis, &file_name, &full, source);
        }
        (parser, analysis)
    }

    #[test]
    fn test_entity_extraction_filters_false_positives() {
        let (mut parser, mut analysis) = scan(&[(
            "proj/Model.swift",
            "struct Point {\n var x = 0\n}\nenum Shape {\n case circle\n}\nlet class_name = 1\n",
        )]);
        parser.generate_entity_results(&mut analysis);

        let names: Vec<&str> = parser
            .results
            .entity_results()
            .map(|e| e.entity_name.as_str())
            .collect();
        assert_eq!(names, vec!["Point", "Shape"]);
    }

    #[test]
    fn test_inheritance_from_colon() {
        let (mut parser, mut analysis) = scan(&[(
            "proj/View.swift",
            "class DetailView : UIView {\n func draw() { }\n}\n",
        )]);
        parser.generate_entity_results(&mut analysis);

        let entity = parser.results.entity_results().next().unwrap();
        assert_eq!(entity.entity_name, "DetailView");
        assert_eq!(entity.scanned_inheritance_dependencies, vec!["UIView"]);
    }

    #[test]
    fn test_file_import_inference_by_co_occurrence() {
        let (mut parser, mut analysis) = scan(&[
            (
                "proj/Model.swift",
                "struct Point {\n var x = 0\n}\n",
            ),
            (
                "proj/Render.swift",
                "class Renderer {\n func draw() { let p = Point ( ) }\n}\n",
            ),
        ]);
        parser.after_generated_file_results(&mut analysis);

        let renderer = parser
            .results
            .file_results()
            .find(|f| f.unique_name == "proj/Render.swift")
            .unwrap();
        assert_eq!(renderer.scanned_import_dependencies, vec!["proj/Model.swift"]);

        // the declaring file never imports itself
        let model = parser
            .results
            .file_results()
            .find(|f| f.unique_name == "proj/Model.swift")
            .unwrap();
        assert!(model.scanned_import_dependencies.is_empty());
    }

    #[test]
    fn test_extension_tokens_merged() {
        let (mut parser, mut analysis) = scan(&[(
            "proj/Point.swift",
            "struct Point {\n var x = 0\n}\nextension Point {\n func flipped() { }\n}\n",
        )]);
        parser.generate_entity_results(&mut analysis);

        let entity = parser.results.entity_results().next().unwrap();
        assert!(entity.scanned_tokens.contains(&"flipped".to_string()));
    }

    #[test]
    fn test_entity_import_inference() {
        let (mut parser, mut analysis) = scan(&[(
            "proj/All.swift",
            "struct Point {\n var x = 0\n}\nclass Renderer {\n func draw() { let p = Point ( ) }\n}\n",
        )]);
        parser.generate_entity_results(&mut analysis);

        let renderer = parser
            .results
            .entity_results()
            .find(|e| e.entity_name == "Renderer")
            .unwrap();
        assert_eq!(renderer.scanned_import_dependencies, vec!["Point"]);
    }

    #[test]
    fn test_inherited_entity_not_reimported() {
        let (mut parser, mut analysis) = scan(&[(
            "proj/All.swift",
            "class Base {\n func a() { }\n}\nclass Derived : Base {\n func b() { }\n}\n",
        )]);
        parser.generate_entity_results(&mut analysis);

        let derived = parser
            .results
            .entity_results()
            .find(|e| e.entity_name == "Derived")
            .unwrap();
        assert!(derived.scanned_import_dependencies.is_empty());
    }
}
