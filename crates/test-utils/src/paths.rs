//! Lookup of optional NetCDF sample files.
//!
//! CHESS-SCAPE files are large and not checked in. Tests that need one call
//! [`require_test_file!`](crate::require_test_file), which skips the test
//! when none of the search locations holds the file.

use std::path::PathBuf;

/// Workspace root, two levels above this crate's manifest.
pub fn workspace_root() -> PathBuf {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .ancestors()
        .nth(2)
        .map(PathBuf::from)
        .unwrap_or(manifest_dir)
}

/// `crates/{crate_name}/testdata` under the workspace root.
pub fn crate_testdata_dir(crate_name: &str) -> PathBuf {
    workspace_root().join("crates").join(crate_name).join("testdata")
}

/// First existing `name` in, in order: `$TEST_DATA_DIR`, the
/// netcdf-parser and ingestion testdata dirs, then `testdata/`.
pub fn find_test_file(name: &str) -> Option<PathBuf> {
    let env_dir = std::env::var("TEST_DATA_DIR").ok().map(PathBuf::from);

    env_dir
        .into_iter()
        .chain([
            crate_testdata_dir("netcdf-parser"),
            crate_testdata_dir("ingestion"),
            workspace_root().join("testdata"),
        ])
        .map(|dir| dir.join(name))
        .find(|path| path.exists())
}
