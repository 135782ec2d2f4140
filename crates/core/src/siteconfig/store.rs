use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Index of rule files on disk.
///
/// Scans the configured directories once at construction and maps each
/// filename (e.g. `example.com.txt`) to its absolute path. When the same
/// filename appears in several directories, the first-listed directory
/// wins. Lookup is by exact filename only; file presence is the only
/// registry.
#[derive(Debug, Clone, Default)]
pub struct ConfigFileStore {
    files: HashMap<String, PathBuf>,
}

impl ConfigFileStore {
    /// Build the index over the given directories, in priority order.
    ///
    /// Missing or unreadable directories are skipped.
    pub fn new<P: AsRef<Path>>(directories: &[P]) -> Self {
        let mut files = HashMap::new();

        for dir in directories {
            let dir = dir.as_ref();
            let entries = match fs::read_dir(dir) {
                Ok(entries) => entries,
                Err(err) => {
                    debug!(dir = %dir.display(), %err, "skipping unreadable rule directory");
                    continue;
                }
            };

            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("txt") {
                    continue;
                }
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    files.entry(name.to_string()).or_insert(path.clone());
                }
            }
        }

        Self { files }
    }

    /// Look up a rule file by exact filename
    pub fn lookup(&self, filename: &str) -> Option<&Path> {
        self.files.get(filename).map(PathBuf::as_path)
    }

    /// Number of indexed rule files
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_scan_and_lookup() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("example.com.txt"), "title: //h1\n").unwrap();
        fs::write(dir.path().join(".example.org.txt"), "body: //article\n").unwrap();
        fs::write(dir.path().join("notes.md"), "not a rule file").unwrap();

        let store = ConfigFileStore::new(&[dir.path()]);

        assert_eq!(store.len(), 2);
        assert!(store.lookup("example.com.txt").is_some());
        assert!(store.lookup(".example.org.txt").is_some());
        assert!(store.lookup("notes.md").is_none());
        assert!(store.lookup("missing.com.txt").is_none());
    }

    #[test]
    fn test_first_directory_wins() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        fs::write(first.path().join("example.com.txt"), "title: //h1\n").unwrap();
        fs::write(second.path().join("example.com.txt"), "title: //h2\n").unwrap();

        let store = ConfigFileStore::new(&[first.path(), second.path()]);

        let path = store.lookup("example.com.txt").unwrap();
        assert!(path.starts_with(first.path()));
    }

    #[test]
    fn test_missing_directory_skipped() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.com.txt"), "title: //h1\n").unwrap();
        let missing = dir.path().join("does-not-exist");

        let store = ConfigFileStore::new(&[missing.as_path(), dir.path()]);
        assert_eq!(store.len(), 1);
    }
}
