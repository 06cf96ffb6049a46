pub use tempfile::TempDir;

/// Temporary directory that is removed when the returned guard drops.
pub fn temp_dir(prefix: &str) -> TempDir {
    tempfile::Builder::new()
        .prefix(prefix)
        .tempdir()
        .expect("failed to create temp dir")
}
