//! Path utilities for locating optional sensor sample files.

use std::path::PathBuf;

/// Returns the workspace root directory.
pub fn workspace_root() -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    PathBuf::from(manifest_dir)
        .parent() // crates/
        .and_then(|p| p.parent()) // workspace root
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from(manifest_dir))
}

/// Searches for a sample file in `TEST_DATA_DIR` and `crates/sensor-parser/testdata/`.
///
/// Real L1B files are hundreds of megabytes and are not checked in, so tests
/// that need one skip themselves when this returns `None`.
pub fn find_test_file(name: &str) -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(test_data_dir) = std::env::var("TEST_DATA_DIR") {
        candidates.push(PathBuf::from(test_data_dir).join(name));
    }
    candidates.push(
        workspace_root()
            .join("crates")
            .join("sensor-parser")
            .join("testdata")
            .join(name),
    );

    candidates.into_iter().find(|p| p.exists())
}

/// Create a scratch directory that is removed when the guard drops.
pub fn scratch_dir() -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix("tcc-test-")
        .tempdir()
        .unwrap_or_else(|e| panic!("failed to create scratch dir: {}", e))
}

/// Write `len` placeholder bytes to `dir/name` and return the path.
///
/// Job tests only need a file that exists with a known size; its content is
/// decoded by a stub loader.
pub fn placeholder_file(dir: &std::path::Path, name: &str, len: usize) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, vec![0u8; len])
        .unwrap_or_else(|e| panic!("failed to write {}: {}", path.display(), e));
    path
}
