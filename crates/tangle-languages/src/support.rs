//! Helpers shared by every language frontend: analysis-relative path
//! construction, lexical `..` resolution, alias substitution, and read-ahead
//! windows over token streams.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use tangle_core::analysis::Analysis;

/// How many tokens a grammar may look ahead when matching one statement.
pub const READ_AHEAD_TOKENS: usize = 40;

/// Path of `full_path` relative to the parent of the analysis source
/// directory, slash-separated. This is the unique-name base for every
/// result.
pub fn relative_analysis_file_path(analysis: &Analysis, full_path: &Path) -> String {
    let base = analysis
        .source_directory
        .parent()
        .unwrap_or(Path::new(""));
    let relative = full_path.strip_prefix(base).unwrap_or(full_path);
    to_slash_string(relative)
}

pub fn to_slash_string(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Lexically normalize a path: resolve `.` and `..` components without
/// touching the filesystem.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut parts: Vec<Component> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(parts.last(), Some(Component::Normal(_))) {
                    parts.pop();
                } else {
                    parts.push(component);
                }
            }
            other => parts.push(other),
        }
    }
    parts.iter().map(|c| c.as_os_str()).collect()
}

/// Resolve a dependency path containing relative elements against the
/// owning file's directory. When the resolved path still lies inside the
/// analysis source tree, it is rewritten into the parent-relative form every
/// unique name uses; otherwise the dependency is returned untouched.
pub fn resolve_relative_dependency_path(
    dependency: &str,
    result_absolute_dir: &Path,
    source_directory: &Path,
) -> String {
    let resolved = normalize_lexically(&result_absolute_dir.join(dependency));

    let mut scanning_prefix = to_slash_string(source_directory);
    if !scanning_prefix.ends_with('/') {
        scanning_prefix.push('/');
    }

    let resolved_str = to_slash_string(&resolved);
    if resolved_str.starts_with(&scanning_prefix) {
        let parent_prefix = format!(
            "{}/",
            to_slash_string(source_directory.parent().unwrap_or(Path::new("")))
        );
        if let Some(stripped) = resolved_str.strip_prefix(&parent_prefix) {
            return stripped.to_string();
        }
    }
    dependency.to_string()
}

/// True when `relative` names an existing file under the parent of the
/// analysis source directory (the namespace unique names live in).
pub fn exists_relative_to_analysis(analysis: &Analysis, relative: &str) -> bool {
    analysis
        .source_directory
        .parent()
        .unwrap_or(Path::new(""))
        .join(relative)
        .is_file()
}

/// Substring-replace the first matching alias key. Applying the map twice
/// yields the same result as applying it once as long as no value
/// reintroduces a key.
pub fn apply_import_aliases(dependency: &str, aliases: &BTreeMap<String, String>) -> (String, bool) {
    for (key, value) in aliases {
        if dependency.contains(key.as_str()) {
            return (dependency.replacen(key.as_str(), value, 1), true);
        }
    }
    (dependency.to_string(), false)
}

/// Single-space-joined window of up to `READ_AHEAD_TOKENS` tokens starting
/// at `start`, the string grammars match against.
pub fn read_ahead(tokens: &[String], start: usize) -> String {
    let end = (start + READ_AHEAD_TOKENS).min(tokens.len());
    tokens[start..end].join(" ")
}

/// Name of the source directory itself (the first component of every
/// unique name).
pub fn source_directory_name(analysis: &Analysis) -> String {
    analysis
        .source_directory
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}
