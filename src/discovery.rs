//! Blueprint discovery
//!
//! Expands CLI path arguments into blueprint files: files are taken as given,
//! directories are walked for files with a configured extension.

use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::config::DiscoveryConfig;

/// Files to validate for one path argument, sorted
pub fn discover(root: &Path, config: &DiscoveryConfig) -> Vec<PathBuf> {
    if root.is_file() {
        return vec![root.to_path_buf()];
    }

    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_entry(|entry| {
            // The root itself is never skipped
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || !entry
                    .file_name()
                    .to_str()
                    .map(|name| config.skips(name))
                    .unwrap_or(false)
        })
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && config.matches(e.path()))
        .map(|e| e.into_path())
        .collect();
    files.sort();

    debug!(root = %root.display(), found = files.len(), "discovered blueprint files");
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_discover_walks_and_skips() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("a/nested")).unwrap();
        fs::create_dir_all(root.join("target")).unwrap();
        fs::write(root.join("plutus.json"), "{}").unwrap();
        fs::write(root.join("a/nested/other.json"), "{}").unwrap();
        fs::write(root.join("a/readme.md"), "").unwrap();
        fs::write(root.join("target/build.json"), "{}").unwrap();

        let found = discover(root, &DiscoveryConfig::default());
        let relative: Vec<PathBuf> = found
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            relative,
            vec![PathBuf::from("a/nested/other.json"), PathBuf::from("plutus.json")]
        );
    }

    #[test]
    fn test_discover_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("blueprint.txt");
        fs::write(&file, "{}").unwrap();
        assert_eq!(discover(&file, &DiscoveryConfig::default()), vec![file]);
    }
}
