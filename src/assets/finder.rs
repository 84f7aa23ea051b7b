use std::path::{Path, PathBuf};

use crate::foundation::error::{MergeError, MergeResult};

/// Lists candidate photos in a directory: regular files, no dotfiles,
/// sorted by file name so page grouping is stable across runs.
#[derive(Clone, Debug)]
pub struct ImageFinder {
    root: PathBuf,
    paths: Vec<PathBuf>,
}

impl ImageFinder {
    pub fn new(root: impl Into<PathBuf>) -> MergeResult<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(MergeError::validation(format!(
                "'{}' must be a directory",
                root.display()
            )));
        }

        let entries = std::fs::read_dir(&root).map_err(|e| {
            MergeError::validation(format!("read directory '{}': {e}", root.display()))
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                MergeError::validation(format!("read directory '{}': {e}", root.display()))
            })?;
            let path = entry.path();
            if is_hidden(&path) || !path.is_file() {
                continue;
            }
            paths.push(path);
        }
        paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        Ok(Self { root, paths })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn image_count(&self) -> usize {
        self.paths.len()
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}
