use std::collections::{BTreeMap, HashSet};

use serde_json::json;
use tracing::error;

use crate::language::Language;
use crate::metrics::{
    GraphSet, LocalMetricData, Metric, MetricId, OverallMetricData, ResultFilter,
};
use crate::result::ResultStore;

const MIN_SCORE: f64 = 0.2;
const MAX_TOKENS: usize = 7;

/// Extracts semantic keywords per result via TF-IDF over the alphabetic
/// token bags, after removing natural-language and per-language stopwords.
/// The top-scoring terms are stored as `tag_<word>` local values.
pub struct TfidfMetric {
    local_data: LocalMetricData,
    overall_data: OverallMetricData,
}

/// Natural-language noise excluded from every bag.
const STOPWORDS: &[&str] = &[
    "switch", "props", "id", "and", "the", "to", "of", "or", "then", "any", "use", "see", "do",
    "this", "def", "end", "with", "without", "if", "a", "else", "in", "where", "is", "it", "by",
    "you", "for", "license", "all", "from", "that", "an", "get", "set", "as", "when", "up", "ok",
    "may", "foo", "bar", "baz", "at", "too", "only", "but", "just",
];

/// Per-language keywords that would otherwise dominate every document.
fn language_stopwords(language: Language) -> &'static [&'static str] {
    match language {
        Language::Java => &[
            "true", "false", "null", "throw", "return", "static", "public", "private",
            "protected", "super", "final", "char", "string", "synchronized", "fi", "throws",
            "long", "int", "import", "new", "void",
        ],
        Language::Kotlin => &[
            "onitemclicklistener", "otherwise", "null", "val", "var", "lateinit", "fun", "throw",
            "private", "override", "import", "sealed", "const", "object", "set", "return",
            "string", "map", "int", "boolean", "true", "false", "abstract",
        ],
        Language::ObjC => &[
            "cgfloat", "float", "cgsize", "include", "struct", "const", "new", "self", "bool",
            "object", "return", "nonatomic", "atomic", "readonly", "readwrite", "case", "null",
            "long", "nsobject", "nullable", "nonnull", "void", "yes", "no", "id", "int", "strong",
            "assign",
        ],
        Language::Swift => &[
            "didset", "cgfloat", "float", "cgsize", "func", "let", "var", "weak", "return",
            "true", "false", "line", "file", "try", "override", "self", "keypath", "case",
            "guard", "some", "void", "nil", "throws", "private", "struct", "class", "protocol",
            "bool", "static", "inout", "int", "string",
        ],
        Language::Ruby => &[
            "true", "false", "require", "module", "class", "fi", "unless", "begin", "break",
            "self", "nil", "void", "super", "int", "bytes", "array", "string",
        ],
        Language::Groovy => &[
            "true", "false", "null", "throw", "return", "static", "public", "private",
            "protected", "super", "final", "char", "string", "synchronized", "fi", "throws",
            "long", "int", "import", "new", "void",
        ],
        Language::JavaScript => &[
            "case", "break", "this", "static", "throw", "var", "let", "obj", "const", "string",
            "export", "true", "false", "return", "require", "function", "exports", "null",
            "void", "undefined",
        ],
        Language::TypeScript => &[
            "break", "var", "case", "this", "import", "let", "const", "return", "public",
            "private", "function", "null", "true", "false", "string", "export", "new", "void",
            "readonly", "abstract", "static", "require", "exports", "boolean", "obj", "index",
            "undefined", "number",
        ],
        Language::C => &[
            "return", "int", "static", "void", "case", "break", "const", "struct", "printf",
            "fprintf", "unsigned", "extern", "char", "float", "sizeof", "unsinged", "undef",
            "define",
        ],
        Language::Cpp => &[
            "return", "int", "static", "void", "case", "break", "const", "struct", "printf",
            "fprintf", "unsigned", "extern", "char", "float", "sizeof", "string", "bool",
            "virtual", "override", "nullptr", "final", "inline", "template",
        ],
        Language::Python => &[
            "return", "self", "import", "enum", "true", "false", "none", "class", "cls", "super",
            "not",
        ],
        Language::Go => &["return", "nil", "defer", "func", "default"],
    }
}

impl TfidfMetric {
    pub fn new() -> Self {
        Self {
            local_data: LocalMetricData::new(),
            overall_data: OverallMetricData::new(),
        }
    }
}

impl Default for TfidfMetric {
    fn default() -> Self {
        Self::new()
    }
}

fn build_bag(tokens: &[String], language: Language) -> Vec<String> {
    let stopwords: HashSet<&str> = STOPWORDS.iter().copied().collect();
    let language_specific: HashSet<&str> = language_stopwords(language).iter().copied().collect();
    tokens
        .iter()
        .filter(|t| t.len() >= 2 && t.chars().all(char::is_alphabetic))
        .map(|t| t.to_lowercase())
        .filter(|t| !stopwords.contains(t.as_str()) && !language_specific.contains(t.as_str()))
        .collect()
}

impl Metric for TfidfMetric {
    fn id(&self) -> MetricId {
        MetricId::Tfidf
    }

    fn metric_name(&self) -> &'static str {
        "tfidf-metric"
    }

    fn pretty_metric_name(&self) -> &'static str {
        "tfidf metric"
    }

    fn calculate(&mut self, filter: ResultFilter, results: &mut ResultStore, _graphs: &GraphSet) {
        let documents: Vec<(String, Vec<String>)> = results
            .iter()
            .filter(|(_, r)| match filter {
                ResultFilter::FileResults => r.is_file(),
                ResultFilter::EntityResults => r.is_entity(),
            })
            .map(|(name, r)| {
                (
                    name.clone(),
                    build_bag(r.scanned_tokens(), r.scanned_language()),
                )
            })
            .collect();

        if documents.iter().all(|(_, bag)| bag.is_empty()) {
            error!("empty vocabulary, skipping tfidf metric");
            return;
        }

        // smoothed document frequencies over the whole corpus
        let document_count = documents.len() as f64;
        let mut document_frequency: BTreeMap<&str, usize> = BTreeMap::new();
        for (_, bag) in &documents {
            let unique: HashSet<&str> = bag.iter().map(String::as_str).collect();
            for term in unique {
                *document_frequency.entry(term).or_default() += 1;
            }
        }
        let idf: BTreeMap<&str, f64> = document_frequency
            .iter()
            .map(|(term, df)| {
                let value = ((1.0 + document_count) / (1.0 + *df as f64)).ln() + 1.0;
                (*term, value)
            })
            .collect();

        for (name, bag) in &documents {
            let mut term_frequency: BTreeMap<&str, f64> = BTreeMap::new();
            for term in bag {
                *term_frequency.entry(term).or_default() += 1.0;
            }

            let mut scored: Vec<(&str, f64)> = term_frequency
                .iter()
                .map(|(term, tf)| (*term, tf * idf[term]))
                .collect();
            let norm = scored.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
            if norm == 0.0 {
                continue;
            }
            for (_, value) in scored.iter_mut() {
                *value /= norm;
            }
            scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap().then(a.0.cmp(b.0)));

            let tags = self.local_data.entry(name.clone()).or_default();
            for (term, score) in scored.iter().take(MAX_TOKENS) {
                if *score > MIN_SCORE {
                    tags.insert(format!("tag_{term}"), json!(score));
                }
            }
        }
    }

    fn take_local_data(&mut self) -> LocalMetricData {
        std::mem::take(&mut self.local_data)
    }

    fn take_overall_data(&mut self) -> OverallMetricData {
        std::mem::take(&mut self.overall_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::{FileResult, ScanResult};
    use crate::tokenizer::tokenize;

    fn store_of(files: &[(&str, &str)]) -> ResultStore {
        let mut store = ResultStore::new();
        for (name, source) in files {
            store.insert(ScanResult::File(FileResult::new(
                name,
                &format!("proj/{name}"),
                &format!("/tmp/proj/{name}"),
                name,
                "",
                "TEST",
                Language::Go,
                tokenize(source),
                source.to_string(),
                String::new(),
            )));
        }
        store
    }

    #[test]
    fn test_distinctive_terms_become_tags() {
        let mut store = store_of(&[
            ("a.go", "parser parser parser shared shared"),
            ("b.go", "renderer renderer renderer shared shared"),
        ]);
        let mut metric = TfidfMetric::new();
        metric.calculate(ResultFilter::FileResults, &mut store, &GraphSet::new());
        let local = metric.take_local_data();

        assert!(local["proj/a.go"].contains_key("tag_parser"));
        assert!(!local["proj/a.go"].contains_key("tag_renderer"));
        assert!(local["proj/b.go"].contains_key("tag_renderer"));
    }

    #[test]
    fn test_stopwords_never_tagged() {
        let mut store = store_of(&[("a.go", "return nil func widget widget widget")]);
        let mut metric = TfidfMetric::new();
        metric.calculate(ResultFilter::FileResults, &mut store, &GraphSet::new());
        let local = metric.take_local_data();
        let tags = &local["proj/a.go"];
        assert!(tags.contains_key("tag_widget"));
        assert!(!tags.contains_key("tag_return"));
        assert!(!tags.contains_key("tag_nil"));
    }

    #[test]
    fn test_at_most_seven_tags() {
        let source = "alpha beta gamma delta epsilon zeta eta theta iota kappa";
        let mut store = store_of(&[("a.go", source)]);
        let mut metric = TfidfMetric::new();
        metric.calculate(ResultFilter::FileResults, &mut store, &GraphSet::new());
        let local = metric.take_local_data();
        assert!(local["proj/a.go"].len() <= MAX_TOKENS);
    }

    #[test]
    fn test_empty_corpus_is_skipped() {
        let mut store = store_of(&[("a.go", "1 2 3")]);
        let mut metric = TfidfMetric::new();
        metric.calculate(ResultFilter::FileResults, &mut store, &GraphSet::new());
        assert!(metric.take_local_data().is_empty());
    }
}
