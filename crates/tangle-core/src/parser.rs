use std::path::Path;

use crate::analysis::Analysis;
use crate::language::Language;
use crate::result::ResultStore;

/// Whether a parser supports entity extraction. Unsupported is a normal
/// outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityOutcome {
    Supported,
    Unsupported,
}

/// Capability interface of one language frontend.
///
/// A parser accumulates its results in a local store; the analyzer collects
/// them into the analysis after the scan phases so that the second-pass
/// hooks (`after_generated_file_results`, entity extraction) can still see
/// and amend the parser's own results.
pub trait LanguageParser {
    /// Stable parser identifier, recorded on every result it produces.
    fn parser_name(&self) -> &'static str;

    fn language(&self) -> Language;

    /// True when this parser wants files with the given dotted extension.
    /// The permitted-language list disambiguates shared extensions (`.h`).
    fn handles_extension(&self, extension: &str, only_permit_languages: &[Language]) -> bool;

    /// Create one file result from raw content and store it locally.
    fn generate_file_result(
        &mut self,
        analysis: &mut Analysis,
        file_name: &str,
        full_path: &Path,
        content: &str,
    );

    /// Optional second pass once every file result exists; used by frontends
    /// whose import resolution needs the full result set.
    fn after_generated_file_results(&mut self, _analysis: &mut Analysis) {}

    /// Extract entity results from the stored file results.
    fn generate_entity_results(&mut self, _analysis: &mut Analysis) -> EntityOutcome {
        EntityOutcome::Unsupported
    }

    fn results(&self) -> &ResultStore;

    fn take_results(&mut self) -> ResultStore;
}
