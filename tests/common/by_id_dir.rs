//! Throwaway `/dev/disk/by-id` stand-ins for integration tests.

use std::fs::File;
use std::sync::Arc;

use camino::Utf8PathBuf;
use tempfile::TempDir;

/// Temporary directory populated with by-id entries.
#[derive(Clone, Debug)]
pub struct ByIdDir {
    pub root: Utf8PathBuf,
    _tmp: Arc<TempDir>,
}

impl ByIdDir {
    pub fn new() -> Self {
        let tmp = TempDir::new().unwrap_or_else(|err| panic!("create by-id temp dir: {err}"));
        let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf())
            .unwrap_or_else(|err| panic!("by-id path should be UTF-8: {}", err.display()));
        Self {
            root,
            _tmp: Arc::new(tmp),
        }
    }

    pub fn with_entries(names: &[&str]) -> Self {
        let dir = Self::new();
        for name in names {
            dir.attach(name);
        }
        dir
    }

    pub fn attach(&self, name: &str) {
        let path = self.root.join(name);
        File::create(&path).unwrap_or_else(|err| panic!("create by-id entry {path}: {err}"));
    }
}
