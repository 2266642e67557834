//! Filesystem traversal: builds the filesystem graph with embedded file
//! contents, which every later phase reads instead of touching the disk
//! again.

use std::fs;
use std::path::Path;
use std::time::Instant;

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::analysis::Analysis;
use crate::error::CoreError;
use crate::graph::{FilesystemNode, FilesystemNodeKind, GraphRepresentation, GraphType};
use crate::language::extension_known;
use crate::stats::StatKey;

/// Build the filesystem graph for the analysis source directory.
///
/// Directories on the ignore list are pruned, files are filtered by the
/// allow-list, the extension permit list and the closed extension set, and
/// every surviving file node carries its full text content.
pub fn create_filesystem_graph(analysis: &mut Analysis) -> Result<(), CoreError> {
    let source_directory = analysis.source_directory.clone();
    if !source_directory.is_dir() {
        return Err(CoreError::SourceDirectoryMissing(source_directory));
    }

    info!(
        "starting to create filesystem graph in {}",
        analysis.analysis_name
    );
    let scanning_starts = Instant::now();

    let mut graph = GraphRepresentation::new(GraphType::FilesystemGraph);
    let mut scanned_files = 0u64;
    let mut skipped_files = 0u64;

    // node keys are relative to the parent of the source directory, so they
    // line up with result unique names in the other graphs
    let relative_base = source_directory
        .parent()
        .unwrap_or(Path::new(""))
        .to_path_buf();

    let root_name = relative_key(&source_directory, &relative_base);
    graph.add_directory_node(&root_name);
    graph.filesystem_nodes.insert(
        root_name.clone(),
        FilesystemNode {
            kind: FilesystemNodeKind::Directory,
            absolute_name: root_name.clone(),
            absolute_path: source_directory.clone(),
            content: None,
        },
    );

    let ignored_directories = analysis.ignore_directories_containing.clone();
    let walker = WalkDir::new(&source_directory)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(move |entry| {
            entry.depth() == 0
                || !(entry.file_type().is_dir()
                    && ignored_directories
                        .iter()
                        .any(|d| entry.file_name().to_string_lossy() == d.as_str()))
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("skipping unreadable directory entry: {e}");
                continue;
            }
        };
        if entry.depth() == 0 {
            continue;
        }

        let path = entry.path();
        let name = relative_key(path, &relative_base);
        let parent_name = relative_key(path.parent().unwrap_or(&source_directory), &relative_base);

        if entry.file_type().is_dir() {
            graph.add_directory_node(&name);
            graph.add_edge(&parent_name, &name);
            graph.filesystem_nodes.insert(
                name.clone(),
                FilesystemNode {
                    kind: FilesystemNodeKind::Directory,
                    absolute_name: name.clone(),
                    absolute_path: path.to_path_buf(),
                    content: None,
                },
            );
            continue;
        }

        let file_name = entry.file_name().to_string_lossy().to_string();
        if analysis
            .ignore_files_containing
            .iter()
            .any(|f| *f == file_name)
        {
            debug!("ignoring file {name} due to ignore_files_containing");
            continue;
        }

        let absolute = path.to_string_lossy().to_string();
        if !analysis.only_permit_files_matching_absolute_path.is_empty()
            && !analysis
                .only_permit_files_matching_absolute_path
                .iter()
                .any(|p| *p == absolute)
        {
            debug!("ignoring file {absolute} due to only_scan_files restriction");
            skipped_files += 1;
            continue;
        }

        // resolve symlinked files to read their real content
        let mut read_path = path.to_path_buf();
        if entry.path_is_symlink() {
            match fs::canonicalize(path) {
                Ok(resolved) => {
                    debug!("resolved symlink {absolute} to {}", resolved.display());
                    read_path = resolved;
                }
                Err(_) => {
                    warn!("ignoring unresolvable symlink {absolute}");
                    continue;
                }
            }
        }

        let extension = dotted_extension(path);
        if !analysis.file_extension_allowed(&extension) {
            if extension.is_empty() {
                debug!("ignoring {absolute}");
            } else {
                debug!("{extension} is not allowed in the scan, ignoring {absolute}");
            }
            skipped_files += 1;
            continue;
        }
        if !extension_known(&extension) {
            debug!("{extension} is an unknown extension, ignoring {absolute}");
            skipped_files += 1;
            continue;
        }

        let content = match read_latin1(&read_path) {
            Ok(content) => content,
            Err(e) => {
                warn!("could not read {absolute}: {e}");
                skipped_files += 1;
                continue;
            }
        };

        analysis.absolute_scanned_file_names.insert(name.clone());
        analysis
            .scanned_files_nodes_in_directories
            .entry(parent_name.clone())
            .or_default()
            .push(name.clone());

        graph.add_file_node(&name, &file_name);
        graph.add_edge(&parent_name, &name);
        graph.filesystem_nodes.insert(
            name.clone(),
            FilesystemNode {
                kind: FilesystemNodeKind::File,
                absolute_name: name.clone(),
                absolute_path: path.to_path_buf(),
                content: Some(content),
            },
        );
        scanned_files += 1;
    }

    analysis
        .graph_representations
        .insert(GraphType::FilesystemGraph, graph);

    analysis
        .statistics
        .add_duration(StatKey::ScanningRuntime, scanning_starts.elapsed());
    analysis
        .statistics
        .add_count(StatKey::ScannedFiles, scanned_files);
    analysis
        .statistics
        .add_count(StatKey::SkippedFiles, skipped_files);

    Ok(())
}

/// Path relative to the parent of the source directory, slash-separated.
fn relative_key(path: &Path, relative_base: &Path) -> String {
    let relative = path.strip_prefix(relative_base).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// File extension with its leading dot, or empty.
pub fn dotted_extension(path: &Path) -> String {
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default()
}

/// Read file content 8-bit-clean: every byte maps to the code point of the
/// same value, so binary-ish bytes pass through instead of failing to
/// decode.
pub fn read_latin1(path: &Path) -> std::io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(bytes.iter().map(|&b| b as char).collect())
}
