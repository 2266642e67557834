use std::path::Path;

use regex::Regex;
use tracing::{debug, warn};

use tangle_core::analysis::Analysis;
use tangle_core::language::Language;
use tangle_core::parser::{EntityOutcome, LanguageParser};
use tangle_core::result::{EntityResult, FileResult, MetricMap, ResultStore, ScanResult};
use tangle_core::stats::StatKey;
use tangle_core::tokenizer::{filter_without_comments, tokenize};

use crate::support;

/// Java frontend: `package`/`import` statements for file dependencies,
/// `class X extends Y` declarations for entities and inheritance.
pub struct JavaParser {
    results: ResultStore,
    import_expression: Regex,
    package_expression: Regex,
    entity_expression: Regex,
}

impl JavaParser {
    pub fn new() -> Self {
        Self {
            results: ResultStore::new(),
            import_expression: Regex::new(r"^import\s+([A-Za-z0-9.*]+)\s+;")
                .expect("import expression must compile"),
            package_expression: Regex::new(r"^package\s+([A-Za-z0-9.]+)\s+;")
                .expect("package expression must compile"),
            entity_expression: Regex::new(r"^class\s+([A-Za-z0-9]+)(?:\s+extends\s+([A-Za-z0-9]+))?")
                .expect("entity expression must compile"),
        }
    }

    fn add_package_name_to_result(&self, result: &mut FileResult, analysis: &mut Analysis) {
        for (index, token) in result.scanned_tokens.iter().enumerate() {
            if token != "package" {
                continue;
            }
            let read_ahead = support::read_ahead(&result.scanned_tokens, index);
            match self.package_expression.captures(&read_ahead) {
                Some(captures) => {
                    result.module_name = captures[1].to_string();
                    analysis.statistics.increment(StatKey::ParsingHits);
                    debug!("package found: {} and added to result", result.module_name);
                }
                None => {
                    analysis.statistics.increment(StatKey::ParsingMisses);
                    warn!(
                        "could not parse package in {}: {read_ahead}",
                        result.scanned_file_name
                    );
                }
            }
        }
    }

    fn add_imports_to_result(&self, result: &mut FileResult, analysis: &mut Analysis) {
        let source_no_comments =
            filter_without_comments(&result.scanned_tokens, "//", "/*", "*/");
        let filtered_tokens = tokenize(&source_no_comments);

        for (index, token) in filtered_tokens.iter().enumerate() {
            if token != "import" {
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

            let dependency = captures[1].to_string();
            if analysis.is_dependency_in_ignore_list(&dependency) {
                debug!("ignoring dependency from {} to {dependency}", result.unique_name);
            } else {
                result.add_import(dependency);
            }
        }
    }

    /// Copy a parent-file import onto the entity when the import's last
    /// dotted component shows up in the entity's token stream.
    fn add_imports_to_entity_result(entity: &mut EntityResult, parent: &FileResult) {
        for scanned_import in &parent.scanned_import_dependencies {
            let last_component = scanned_import.rsplit('.').next().unwrap_or(scanned_import);
            if entity
                .scanned_tokens
                .iter()
                .any(|token| token.contains(last_component))
            {
                entity.add_import(scanned_import.clone());
            }
        }
    }

    fn unique_entity_name(entity: &EntityResult) -> String {
        if entity.module_name.is_empty() {
            entity.entity_name.clone()
        } else {
            format!("{}.{}", entity.module_name, entity.entity_name)
        }
    }
}

impl Default for JavaParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageParser for JavaParser {
    fn parser_name(&self) -> &'static str {
        "JAVA_PARSER"
    }

    fn language(&self) -> Language {
        Language::Java
    }

    fn handles_extension(&self, extension: &str, _only_permit_languages: &[Language]) -> bool {
        extension == ".java"
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
            Language::Java,
            scanned_tokens,
            content.to_string(),
            String::new(),
        );

        self.add_package_name_to_result(&mut file_result, analysis);
        self.add_imports_to_result(&mut file_result, analysis);
        self.results.insert(ScanResult::File(file_result));
    }

    fn generate_entity_results(&mut self, analysis: &mut Analysis) -> EntityOutcome {
        let files: Vec<FileResult> = self.results.file_results().cloned().collect();

        for file in &files {
            let expression = &self.entity_expression;
            let matcher = |header: &str| {
                expression.captures(header).map(|captures| {
                    (
                        captures[1].to_string(),
                        captures.get(2).map(|m| m.as_str().to_string()),
                    )
                })
            };
            let scopes = file.generate_entity_results_from_scopes(
                &["class"],
                &matcher,
                Language::Java.comment_style(),
            );

            for scope in scopes {
                let mut entity = EntityResult {
                    unique_name: String::new(),
                    entity_name: scope.entity_name,
                    module_name: file.module_name.clone(),
                    scanned_file_name: file.scanned_file_name.clone(),
                    scanned_by: self.parser_name().to_string(),
                    scanned_language: Language::Java,
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

                Self::add_imports_to_entity_result(&mut entity, file);
                entity.unique_name = Self::unique_entity_name(&entity);
                self.results.insert(ScanResult::Entity(entity));
            }
        }
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

    fn analysis() -> Analysis {
        Analysis::new("test", "proj", PathBuf::from("/tmp/proj"))
    }

    fn parse(source: &str) -> (JavaParser, Analysis) {
        let mut parser = JavaParser::new();
        let mut analysis = analysis();
        parser.generate_file_result(
            &mut analysis,
            "Widget.java",
            Path::new("/tmp/proj/src/Widget.java"),
            source,
        );
        (parser, analysis)
    }

    #[test]
    fn test_package_and_imports() {
        let source = "package a.b;\nimport c.d.Helper;\nimport e.*;\nclass Widget { }\n";
        let (parser, analysis) = parse(source);

        let file = parser.results.file_results().next().unwrap();
        assert_eq!(file.unique_name, "proj/src/Widget.java");
        assert_eq!(file.module_name, "a.b");
        assert_eq!(
            file.scanned_import_dependencies,
            vec!["c.d.Helper", "e.*"]
        );
        assert_eq!(analysis.statistics.count(StatKey::ParsingHits), 3);
    }

    #[test]
    fn test_commented_imports_are_skipped() {
        let source = "package a;\n// import hidden.Thing;\nimport real.Thing;\nclass W { }\n";
        let (parser, _) = parse(source);
        let file = parser.results.file_results().next().unwrap();
        assert_eq!(file.scanned_import_dependencies, vec!["real.Thing"]);
    }

    #[test]
    fn test_ignore_list_filters_dependencies() {
        let mut parser = JavaParser::new();
        let mut analysis = analysis();
        analysis.ignore_dependencies_containing = vec!["vendor".to_string()];
        parser.generate_file_result(
            &mut analysis,
            "W.java",
            Path::new("/tmp/proj/W.java"),
            "import com.vendor.Lib;\nimport com.real.Lib;\nclass W { }\n",
        );
        let file = parser.results.file_results().next().unwrap();
        assert_eq!(file.scanned_import_dependencies, vec!["com.real.Lib"]);
    }

    #[test]
    fn test_entity_with_package_qualified_unique_name() {
        let source = "package a.b;\nclass C extends D {\n int f() { return 1; }\n}\n";
        let (mut parser, mut analysis) = parse(source);
        let outcome = parser.generate_entity_results(&mut analysis);
        assert_eq!(outcome, EntityOutcome::Supported);

        let entity = parser.results.entity_results().next().unwrap();
        assert_eq!(entity.unique_name, "a.b.C");
        assert_eq!(entity.entity_name, "C");
        assert_eq!(entity.scanned_inheritance_dependencies, vec!["D"]);
        assert_eq!(entity.parent_file_unique_name, "proj/src/Widget.java");
    }

    #[test]
    fn test_entity_inherits_matching_file_imports() {
        let source = "package a;\nimport x.y.Helper;\nimport x.y.Unused;\nclass C {\n Helper h;\n}\n";
        let (mut parser, mut analysis) = parse(source);
        parser.generate_entity_results(&mut analysis);

        let entity = parser.results.entity_results().next().unwrap();
        assert_eq!(entity.scanned_import_dependencies, vec!["x.y.Helper"]);
    }
}
