//! Test helpers shared by the chess-grid crates.
//!
//! - [`generators`]: synthetic land/sea masks and 1km axes
//! - [`fixtures`]: boundary regions aligned to the 1km cells
//! - [`paths`]: lookup of optional CHESS-SCAPE sample files
//! - `require_test_file!` / `require_test_files!`: skip when data is absent
//! - `assert_approx_eq!`: float comparison with a tolerance

pub mod fixtures;
pub mod generators;
pub mod paths;

pub use fixtures::*;
pub use generators::*;
pub use paths::*;

/// Path of a sample file, or return from the test with a `SKIPPED` note.
///
/// ```ignore
/// let path = test_utils::require_test_file!("tas_bias_corrected.nc");
/// ```
#[macro_export]
macro_rules! require_test_file {
    ($name:expr) => {{
        match $crate::find_test_file($name) {
            Some(path) => path,
            None => {
                eprintln!("SKIPPED: {} not found (set TEST_DATA_DIR)", $name);
                return;
            }
        }
    }};
}

/// Like `require_test_file!` for several files; yields a `Vec<PathBuf>`.
#[macro_export]
macro_rules! require_test_files {
    ($($name:expr),+ $(,)?) => {
        vec![$($crate::require_test_file!($name)),+]
    };
}

/// Assert `|left - right| <= epsilon`, comparing as `f64`.
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let (left, right, epsilon) = ($left as f64, $right as f64, $epsilon as f64);
        if (left - right).abs() > epsilon {
            panic!(
                "assertion failed: {} ≈ {} (left {}, right {}, tolerance {})",
                stringify!($left),
                stringify!($right),
                left,
                right,
                epsilon
            );
        }
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_assert_approx_eq_within_tolerance() {
        assert_approx_eq!(1000.4, 1000.0, 0.5);
        assert_approx_eq!(1.5f32, 1.5, 0.0);
    }

    #[test]
    fn test_require_test_files_skips_when_absent() {
        let _paths: Vec<std::path::PathBuf> = require_test_files!("no-such-file.nc");
        unreachable!("missing file should return early");
    }

    #[test]
    #[should_panic(expected = "assertion failed")]
    fn test_assert_approx_eq_fails() {
        assert_approx_eq!(1.1, 1.0, 0.001);
    }
}
