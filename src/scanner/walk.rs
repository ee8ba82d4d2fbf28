use crate::checkpoint::is_checkpoint_artifact;
use crate::error::{Error, Result};
use glob::Pattern;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error};
use walkdir::{DirEntry, WalkDir};

const JUNK_FILE_NAMES: &[&str] = &[".DS_Store"];
const JUNK_DIR_NAMES: &[&str] = &["__MACOSX"];

/// Walk `source_root` and return every data file, sorted by file name (full
/// path breaks ties). Checkpoint files, OS junk and anything matching an
/// ignore glob are left out.
pub fn scan_candidates(source_root: &Path, ignore_globs: &[String]) -> Result<Vec<PathBuf>> {
    let ignore_patterns: Vec<Pattern> = ignore_globs
        .iter()
        .filter_map(|glob| match Pattern::new(glob) {
            Ok(p) => Some(p),
            Err(e) => {
                error!("Invalid glob pattern '{}': {}", glob, e);
                None
            }
        })
        .collect();

    let root = if source_root.is_absolute() {
        source_root.to_path_buf()
    } else {
        std::env::current_dir()?.join(source_root)
    };

    let mut candidates = Vec::new();
    let walker = WalkDir::new(&root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| !is_junk_dir(entry) && !is_ignored(entry.path(), &ignore_patterns));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone());
                match err.into_io_error() {
                    Some(io_err) if io_err.kind() == io::ErrorKind::PermissionDenied => {
                        error!("Access denied reading {}: {}", path.display(), io_err);
                        continue;
                    }
                    Some(io_err) => return Err(Error::io_at(path, io_err)),
                    None => {
                        return Err(Error::io_at(
                            path,
                            io::Error::new(io::ErrorKind::Other, "filesystem loop detected"),
                        ))
                    }
                }
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        if JUNK_FILE_NAMES.contains(&name.as_ref()) || is_checkpoint_artifact(&name) {
            debug!("Skipping {}", entry.path().display());
            continue;
        }

        candidates.push(entry.into_path());
    }

    sort_candidates(&mut candidates);
    Ok(candidates)
}

/// Order by file name, then by full path.
pub fn sort_candidates(candidates: &mut [PathBuf]) {
    candidates.sort_by(|a, b| {
        a.file_name()
            .cmp(&b.file_name())
            .then_with(|| a.cmp(b))
    });
}

fn is_junk_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && JUNK_DIR_NAMES
            .iter()
            .any(|junk| entry.file_name() == *junk)
}

fn is_ignored(path: &Path, patterns: &[Pattern]) -> bool {
    patterns.iter().any(|pattern| pattern.matches_path(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_by_file_name_then_path() {
        let mut paths = vec![
            PathBuf::from("/z/b.txt"),
            PathBuf::from("/a/c.txt"),
            PathBuf::from("/y/a.txt"),
            PathBuf::from("/x/b.txt"),
        ];
        sort_candidates(&mut paths);
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/y/a.txt"),
                PathBuf::from("/x/b.txt"),
                PathBuf::from("/z/b.txt"),
                PathBuf::from("/a/c.txt"),
            ]
        );
    }
}
