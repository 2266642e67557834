use std::collections::BTreeMap;

use fancy_regex::Regex;
use rayon::prelude::*;
use serde_json::json;

use crate::language::Language;
use crate::metrics::{
    record_local, GraphSet, LocalMetricData, Metric, MetricId, OverallMetricData, ResultFilter,
};
use crate::result::{ResultStore, ScanResult};

pub const NUMBER_OF_METHODS_IN_FILE: &str = "number-of-methods-in-file";
pub const NUMBER_OF_METHODS_IN_ENTITY: &str = "number-of-methods-in-entity";
pub const AVG_NUMBER_OF_METHODS_IN_FILE: &str = "avg-number-of-methods-in-file";
pub const AVG_NUMBER_OF_METHODS_IN_ENTITY: &str = "avg-number-of-methods-in-entity";

/// Counts method signatures with one precompiled pattern per language,
/// applied to the whitespace-joined token stream. The patterns trade
/// accuracy for speed; changing one changes method counts, so they are part
/// of the contract.
pub struct NumberOfMethodsMetric {
    patterns: BTreeMap<Language, Regex>,
    local_data: LocalMetricData,
    overall_data: OverallMetricData,
}

fn pattern_for(language: Language) -> &'static str {
    match language {
        Language::Java => {
            r"\b(?!if|for|while|switch|catch)\b[a-zA-Z\d_]+?\s*?\([a-zA-Z\d\s_,\>\<\?\*\.\[\]]*?\)\s*?\{"
        }
        Language::Kotlin => {
            r"fun\s[a-zA-Z\d_\.]+?\s*?\([a-zA-Z\d\s_,\?\@\>\<\?\*\.\[\]\:]*?\)\s*?.*?(\{|\=)"
        }
        Language::ObjC => r"[\-\+]\s*?[a-zA-Z\d_\(\)\:\*\s]+?\s*?\{",
        Language::Swift => r"func\s*?[a-zA-Z\d_\(\)\:\*\s\-\<\>\?\,\[\]\.]+?\s*?\{",
        Language::Ruby => r"(def)\s(.+)",
        Language::Groovy => {
            r"\b(?!if|for|while|switch|catch)\b[a-zA-Z\d_]+?\s*?\([a-zA-Z\d\s_,\>\<\?\*\.\[\]\=\@\']*?\)\s*?\{"
        }
        Language::JavaScript => {
            r"(function\s+?)([a-zA-Z\d_\:\*\-\<\>\?\,\[\]\.\s\|\=\$]+?)\(([a-zA-Z\d_\(\)\:\*\s\-\<\>\?\,\[\]\.\|\=\$\/]*?)\)*?[\:]*?\s*?\{"
        }
        Language::TypeScript => {
            r"(function\s+?)([a-zA-Z\d_\:\*\-\<\>\?\,\[\]\.\s\|\=\$]+?)\(([a-zA-Z\d_\(\)\:\*\s\-\<\>\?\,\[\]\.\|\=\$\/]*?)\)*?[\:]*?\s*?\{"
        }
        Language::C => r"\b(?!if|for|while|switch)\b[a-zA-Z\d_]+?\s*?\([a-zA-Z\d\s_,\*]*?\)\s*?\{",
        Language::Cpp => {
            r"\b(?!if|for|while|switch)\b[a-zA-Z\d\_\:\<\>\*\&]+?\s*?\([\(a-zA-Z\d\s_,\*&:]*?\)\s*?\w+\s*?\{"
        }
        Language::Python => r"(def)\s.+(.+):",
        Language::Go => r"func\s*?[a-zA-Z\d_\(\)\:\*\s\-\<\>\?\,\[\]\.]+?\s*?\{",
    }
}

impl NumberOfMethodsMetric {
    pub fn new() -> Self {
        let patterns = Language::ALL
            .iter()
            .map(|&language| {
                let regex = Regex::new(pattern_for(language))
                    .expect("method pattern must compile");
                (language, regex)
            })
            .collect();
        Self {
            patterns,
            local_data: LocalMetricData::new(),
            overall_data: OverallMetricData::new(),
        }
    }

    fn count_methods(&self, language: Language, joined_tokens: &str) -> u64 {
        let Some(regex) = self.patterns.get(&language) else {
            return 0;
        };
        regex.find_iter(joined_tokens).filter(|m| m.is_ok()).count() as u64
    }
}

impl Default for NumberOfMethodsMetric {
    fn default() -> Self {
        Self::new()
    }
}

impl Metric for NumberOfMethodsMetric {
    fn id(&self) -> MetricId {
        MetricId::NumberOfMethods
    }

    fn metric_name(&self) -> &'static str {
        "number-of-methods-metric"
    }

    fn pretty_metric_name(&self) -> &'static str {
        "number of methods metric"
    }

    fn calculate(&mut self, filter: ResultFilter, results: &mut ResultStore, _graphs: &GraphSet) {
        let selected: Vec<(String, Language, String)> = results
            .iter()
            .filter(|(_, r)| match filter {
                ResultFilter::FileResults => r.is_file(),
                ResultFilter::EntityResults => r.is_entity(),
            })
            .map(|(name, r)| {
                (
                    name.clone(),
                    r.scanned_language(),
                    r.scanned_tokens().join(" "),
                )
            })
            .collect();

        let counts: Vec<(String, u64)> = selected
            .par_iter()
            .map(|(name, language, joined)| (name.clone(), self.count_methods(*language, joined)))
            .collect();

        let key = match filter {
            ResultFilter::FileResults => NUMBER_OF_METHODS_IN_FILE,
            ResultFilter::EntityResults => NUMBER_OF_METHODS_IN_ENTITY,
        };

        let mut total = 0u64;
        for (name, count) in &counts {
            if let Some(result) = results.get_mut(name) {
                result.metrics_mut().insert(key.to_string(), json!(count));
            }
            record_local(&mut self.local_data, name, key, json!(count));
            total += count;
        }

        if !counts.is_empty() {
            let average = total as f64 / counts.len() as f64;
            let avg_key = match filter {
                ResultFilter::FileResults => AVG_NUMBER_OF_METHODS_IN_FILE,
                ResultFilter::EntityResults => AVG_NUMBER_OF_METHODS_IN_ENTITY,
            };
            self.overall_data.insert(avg_key.to_string(), json!(average));
        }
    }

    fn take_local_data(&mut self) -> LocalMetricData {
        std::mem::take(&mut self.local_data)
    }

    fn take_overall_data(&mut self) -> OverallMetricData {
        std::mem::take(&mut self.overall_data)
    }
}
