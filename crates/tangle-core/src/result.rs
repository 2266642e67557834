use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::language::{CommentStyle, Language};
use crate::tokenizer;

/// Metric values are heterogeneous (counts, averages, names, distribution
/// maps), so results carry them as JSON values keyed by metric key.
pub type MetricMap = BTreeMap<String, serde_json::Value>;

/// Extracted record for one scanned source file.
///
/// `unique_name` is the file path relative to the parent of the analysis
/// source directory (e.g. `proj/src/foo.js`) and doubles as the graph-node
/// key. Everything except `metrics` is immutable after the parse phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileResult {
    pub unique_name: String,
    pub absolute_name: String,
    pub display_name: String,
    pub scanned_file_name: String,
    pub module_name: String,
    pub relative_file_path_to_analysis: String,
    pub absolute_dir_path: PathBuf,
    pub scanned_by: String,
    pub scanned_language: Language,
    pub scanned_tokens: Vec<String>,
    /// Raw file content; indentation-sensitive metrics read this.
    pub source: String,
    pub preprocessed_source: String,
    pub scanned_import_dependencies: Vec<String>,
    pub metrics: MetricMap,
}

/// One entity scope cut out of a file's token stream: the declared name, an
/// optional inherited name from the declaration header, and every token of
/// the brace-delimited body (newlines included).
#[derive(Debug, Clone)]
pub struct EntityScope {
    pub entity_name: String,
    pub inherited_entity: Option<String>,
    pub tokens: Vec<String>,
}

impl FileResult {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        scanned_file_name: &str,
        relative_file_path_to_analysis: &str,
        absolute_name: &str,
        display_name: &str,
        module_name: &str,
        scanned_by: &str,
        scanned_language: Language,
        scanned_tokens: Vec<String>,
        source: String,
        preprocessed_source: String,
    ) -> Self {
        let absolute_dir_path = PathBuf::from(absolute_name)
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_default();
        Self {
            unique_name: relative_file_path_to_analysis.to_string(),
            absolute_name: absolute_name.to_string(),
            display_name: display_name.to_string(),
            scanned_file_name: scanned_file_name.to_string(),
            module_name: module_name.to_string(),
            relative_file_path_to_analysis: relative_file_path_to_analysis.to_string(),
            absolute_dir_path,
            scanned_by: scanned_by.to_string(),
            scanned_language,
            scanned_tokens,
            source,
            preprocessed_source,
            scanned_import_dependencies: Vec::new(),
            metrics: MetricMap::new(),
        }
    }

    /// Directory portion of the analysis-relative path.
    pub fn relative_analysis_path(&self) -> &str {
        match self.relative_file_path_to_analysis.rsplit_once('/') {
            Some((dir, _)) => dir,
            None => "",
        }
    }

    /// Record an import dependency, keeping the list an ordered set.
    pub fn add_import(&mut self, dependency: String) {
        if !self.scanned_import_dependencies.contains(&dependency) {
            self.scanned_import_dependencies.push(dependency);
        }
    }

    /// Cut brace-delimited entity scopes out of the comment-filtered token
    /// stream. `matcher` receives the declaration header (keyword up to the
    /// opening brace, single-space joined) and decides whether it is a real
    /// declaration, returning the entity name and an optional inherited name.
    pub fn generate_entity_results_from_scopes(
        &self,
        keywords: &[&str],
        matcher: &dyn Fn(&str) -> Option<(String, Option<String>)>,
        comment_style: CommentStyle,
    ) -> Vec<EntityScope> {
        let filtered = tokenizer::filter_without_comments(
            &self.scanned_tokens,
            comment_style.line,
            comment_style.block_open,
            comment_style.block_close,
        );
        let tokens = tokenizer::tokenize(&filtered);

        let mut scopes = Vec::new();
        let mut index = 0;
        while index < tokens.len() {
            if !keywords.contains(&tokens[index].as_str()) {
                index += 1;
                continue;
            }

            // Declaration header runs from the keyword to the opening brace.
            let Some(brace) = find_opening_brace(&tokens, index) else {
                index += 1;
                continue;
            };
            let header: Vec<&str> = tokens[index..brace]
                .iter()
                .filter(|t| *t != "\n")
                .map(|t| t.as_str())
                .collect();

            let Some((entity_name, inherited_entity)) = matcher(&header.join(" ")) else {
                index += 1;
                continue;
            };

            let Some(end) = find_matching_brace(&tokens, brace) else {
                index += 1;
                continue;
            };

            scopes.push(EntityScope {
                entity_name,
                inherited_entity,
                tokens: tokens[index..=end].to_vec(),
            });
            index = end + 1;
        }
        scopes
    }
}

const MAX_HEADER_TOKENS: usize = 64;

fn find_opening_brace(tokens: &[String], start: usize) -> Option<usize> {
    tokens
        .iter()
        .enumerate()
        .skip(start)
        .take(MAX_HEADER_TOKENS)
        .find(|(_, t)| *t == "{")
        .map(|(i, _)| i)
}

fn find_matching_brace(tokens: &[String], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(open) {
        match token.as_str() {
            "{" => depth += 1,
            "}" => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Extracted record for one top-level type declaration.
///
/// The parent file is referenced by unique name and resolved through the
/// result store, never held as an owning reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityResult {
    pub unique_name: String,
    pub entity_name: String,
    pub module_name: String,
    pub scanned_file_name: String,
    pub scanned_by: String,
    pub scanned_language: Language,
    pub scanned_tokens: Vec<String>,
    pub scanned_import_dependencies: Vec<String>,
    pub scanned_inheritance_dependencies: Vec<String>,
    pub parent_file_unique_name: String,
    pub metrics: MetricMap,
}

impl EntityResult {
    pub fn add_import(&mut self, dependency: String) {
        if !self.scanned_import_dependencies.contains(&dependency) {
            self.scanned_import_dependencies.push(dependency);
        }
    }

    pub fn add_inheritance(&mut self, dependency: String) {
        if !self.scanned_inheritance_dependencies.contains(&dependency) {
            self.scanned_inheritance_dependencies.push(dependency);
        }
    }
}

/// Tagged union over the two result kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ScanResult {
    File(FileResult),
    Entity(EntityResult),
}

impl ScanResult {
    pub fn unique_name(&self) -> &str {
        match self {
            ScanResult::File(f) => &f.unique_name,
            ScanResult::Entity(e) => &e.unique_name,
        }
    }

    pub fn scanned_language(&self) -> Language {
        match self {
            ScanResult::File(f) => f.scanned_language,
            ScanResult::Entity(e) => e.scanned_language,
        }
    }

    pub fn scanned_tokens(&self) -> &[String] {
        match self {
            ScanResult::File(f) => &f.scanned_tokens,
            ScanResult::Entity(e) => &e.scanned_tokens,
        }
    }

    pub fn metrics(&self) -> &MetricMap {
        match self {
            ScanResult::File(f) => &f.metrics,
            ScanResult::Entity(e) => &e.metrics,
        }
    }

    pub fn metrics_mut(&mut self) -> &mut MetricMap {
        match self {
            ScanResult::File(f) => &mut f.metrics,
            ScanResult::Entity(e) => &mut e.metrics,
        }
    }

    pub fn as_file(&self) -> Option<&FileResult> {
        match self {
            ScanResult::File(f) => Some(f),
            ScanResult::Entity(_) => None,
        }
    }

    pub fn as_entity(&self) -> Option<&EntityResult> {
        match self {
            ScanResult::File(_) => None,
            ScanResult::Entity(e) => Some(e),
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, ScanResult::File(_))
    }

    pub fn is_entity(&self) -> bool {
        matches!(self, ScanResult::Entity(_))
    }
}

/// Keyed repository of every result of one analysis. A `BTreeMap` keeps
/// iteration deterministic, which the statistics and metric outputs rely on.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultStore {
    results: BTreeMap<String, ScanResult>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, result: ScanResult) {
        self.results.insert(result.unique_name().to_string(), result);
    }

    pub fn merge(&mut self, other: ResultStore) {
        self.results.extend(other.results);
    }

    pub fn get(&self, unique_name: &str) -> Option<&ScanResult> {
        self.results.get(unique_name)
    }

    pub fn get_mut(&mut self, unique_name: &str) -> Option<&mut ScanResult> {
        self.results.get_mut(unique_name)
    }

    pub fn contains(&self, unique_name: &str) -> bool {
        self.results.contains_key(unique_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ScanResult)> {
        self.results.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut ScanResult)> {
        self.results.iter_mut()
    }

    pub fn file_results(&self) -> impl Iterator<Item = &FileResult> {
        self.results.values().filter_map(ScanResult::as_file)
    }

    pub fn entity_results(&self) -> impl Iterator<Item = &EntityResult> {
        self.results.values().filter_map(ScanResult::as_entity)
    }

    pub fn number_of_file_results(&self) -> usize {
        self.file_results().count()
    }

    pub fn number_of_entity_results(&self) -> usize {
        self.entity_results().count()
    }

    /// First result carrying the given entity name, if any.
    pub fn result_by_entity_name(&self, entity_name: &str) -> Option<&EntityResult> {
        self.entity_results().find(|e| e.entity_name == entity_name)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn clear(&mut self) {
        self.results.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;

    fn java_file(source: &str) -> FileResult {
        FileResult::new(
            "Widget.java",
            "proj/src/Widget.java",
            "/tmp/proj/src/Widget.java",
            "Widget.java",
            "com.example",
            "JAVA_PARSER",
            Language::Java,
            tokenize(source),
            source.to_string(),
            String::new(),
        )
    }

    #[test]
    fn test_unique_name_is_relative_path() {
        let result = java_file("class Widget {}");
        assert_eq!(result.unique_name, "proj/src/Widget.java");
        assert_eq!(result.relative_analysis_path(), "proj/src");
    }

    #[test]
    fn test_add_import_is_ordered_set() {
        let mut result = java_file("");
        result.add_import("a.B".to_string());
        result.add_import("c.D".to_string());
        result.add_import("a.B".to_string());
        assert_eq!(result.scanned_import_dependencies, vec!["a.B", "c.D"]);
    }

    #[test]
    fn test_entity_scope_extraction() {
        let source = "package com.example;\nclass Widget extends Base {\n int f() { return 1; }\n}\nclass Other {\n}\n";
        let result = java_file(source);
        let matcher = |header: &str| {
            let re = regex::Regex::new(r"^class\s+(\w+)(?:\s+extends\s+(\w+))?").unwrap();
            re.captures(header).map(|c| {
                (
                    c.get(1).unwrap().as_str().to_string(),
                    c.get(2).map(|m| m.as_str().to_string()),
                )
            })
        };
        let scopes = result.generate_entity_results_from_scopes(
            &["class"],
            &matcher,
            Language::Java.comment_style(),
        );
        assert_eq!(scopes.len(), 2);
        assert_eq!(scopes[0].entity_name, "Widget");
        assert_eq!(scopes[0].inherited_entity.as_deref(), Some("Base"));
        assert!(scopes[0].tokens.contains(&"return".to_string()));
        assert_eq!(scopes[1].entity_name, "Other");
        assert_eq!(scopes[1].inherited_entity, None);
    }

    #[test]
    fn test_entity_scope_skips_commented_declarations() {
        let source = "// class Hidden {\nclass Visible {\n}\n";
        let result = java_file(source);
        let matcher = |header: &str| {
            let re = regex::Regex::new(r"^class\s+(\w+)").unwrap();
            re.captures(header)
                .map(|c| (c.get(1).unwrap().as_str().to_string(), None::<String>))
        };
        let scopes = result.generate_entity_results_from_scopes(
            &["class"],
            &matcher,
            Language::Java.comment_style(),
        );
        assert_eq!(scopes.len(), 1);
        assert_eq!(scopes[0].entity_name, "Visible");
    }

    #[test]
    fn test_store_filters_by_kind() {
        let mut store = ResultStore::new();
        store.insert(ScanResult::File(java_file("class A {}")));
        store.insert(ScanResult::Entity(EntityResult {
            unique_name: "com.example.A".to_string(),
            entity_name: "A".to_string(),
            module_name: "com.example".to_string(),
            scanned_file_name: "A.java".to_string(),
            scanned_by: "JAVA_PARSER".to_string(),
            scanned_language: Language::Java,
            scanned_tokens: vec![],
            scanned_import_dependencies: vec![],
            scanned_inheritance_dependencies: vec![],
            parent_file_unique_name: "proj/src/Widget.java".to_string(),
            metrics: MetricMap::new(),
        }));

        assert_eq!(store.number_of_file_results(), 1);
        assert_eq!(store.number_of_entity_results(), 1);
        assert!(store.result_by_entity_name("A").is_some());
        assert!(store.result_by_entity_name("B").is_none());
    }
}
