use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::syntax::SourceKind;
use crate::{err_msg, RecastError};

/// Directories never scanned: build output, VCS metadata and tool caches.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    ".git", ".hg", ".svn", ".idea", ".gradle", ".mvn", "target", "build", "out", "node_modules",
];

/// Finds the files the engine can parse.
///
/// The returned list is sorted so runs visit files in a deterministic order.
#[derive(Debug, Clone)]
pub struct SourceDiscoverer {
    excludes: Vec<String>,
}

impl Default for SourceDiscoverer {
    fn default() -> Self {
        SourceDiscoverer {
            excludes: DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl SourceDiscoverer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also skips directories with any of these names.
    pub fn exclude<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excludes.extend(names.into_iter().map(Into::into));
        self
    }

    /// Scans every root. A root that is a file is taken as given, whatever
    /// its extension, so an unsupported file surfaces as a parse error.
    pub fn discover<P: AsRef<Path>>(&self, roots: &[P]) -> Result<Vec<PathBuf>, RecastError> {
        let mut files = Vec::new();
        for root in roots {
            let root = root.as_ref();
            if root.is_file() {
                files.push(root.to_path_buf());
                continue;
            }
            if !root.exists() {
                return Err(err_msg!(Config, "path does not exist: {}", root.display()));
            }
            for entry in WalkDir::new(root).into_iter().filter_entry(|e| !self.is_excluded(e)) {
                let entry = entry.map_err(|e| err_msg!(Internal, "failed to walk {}: {}", root.display(), e))?;
                if !entry.file_type().is_file() {
                    continue;
                }
                if SourceKind::from_path(entry.path()).is_none() {
                    continue;
                }
                files.push(entry.into_path());
            }
        }
        files.sort();
        files.dedup();
        tracing::debug!(files = files.len(), "discovered sources");
        Ok(files)
    }

    fn is_excluded(&self, entry: &DirEntry) -> bool {
        entry.depth() > 0
            && entry.file_type().is_dir()
            && entry
                .file_name()
                .to_str()
                .is_some_and(|name| self.excludes.iter().any(|e| e == name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_supported_files_in_sorted_order_and_skips_build_dirs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        for file in [
            "src/main/java/b/B.java",
            "src/main/java/a/A.java",
            "src/main/resources/application.properties",
            "src/main/resources/logback.xml",
            "target/classes/a/A.java",
            "generated/G.java",
        ] {
            let path = root.join(file);
            std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
            std::fs::write(&path, "").expect("write");
        }

        let found = SourceDiscoverer::new().exclude(["generated"]).discover(&[root]).expect("walks");
        let relative: Vec<_> = found
            .iter()
            .map(|p| p.strip_prefix(root).expect("under root").to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(
            relative,
            vec![
                "src/main/java/a/A.java",
                "src/main/java/b/B.java",
                "src/main/resources/application.properties",
            ]
        );
    }

    #[test]
    fn missing_roots_are_errors() {
        let err = SourceDiscoverer::new().discover(&["/no/such/dir"]).unwrap_err();
        assert!(err.message().contains("does not exist"));
    }
}
