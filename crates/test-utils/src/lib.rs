//! Test support for the cloud cluster detection workspace.
//!
//! - [`generators`]: synthetic BT/geolocation scenes and block masks
//! - [`fixtures`]: pixel-area boundaries of the radius filter in both modes
//! - [`paths`]: optional L1B sample lookup, scratch dirs, placeholder files
//!
//! Pulled in as a dev-dependency:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```

pub mod fixtures;
pub mod generators;
pub mod paths;

pub use fixtures::*;
pub use generators::*;
pub use paths::*;

/// Resolve an optional L1B sample, or skip the calling test.
///
/// Real products are hundreds of megabytes and are not checked in; point
/// `TEST_DATA_DIR` at a directory holding them to run these tests.
///
/// ```ignore
/// let path = test_utils::require_test_file!("3RIMG_sample_L1B_STD.h5");
/// ```
#[macro_export]
macro_rules! require_test_file {
    ($name:expr) => {{
        match $crate::find_test_file($name) {
            Some(path) => path,
            None => {
                eprintln!("SKIPPED: sample '{}' not found (set TEST_DATA_DIR)", $name);
                return;
            }
        }
    }};
}

/// Assert two numbers are within `epsilon` of each other, compared as `f64`.
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_assert_approx_eq_passes() {
        assert_approx_eq!(218.0001_f32, 218.0_f64, 0.001);
        assert_approx_eq!(0.0, 0.0, 0.0001);
    }

    #[test]
    #[should_panic(expected = "assertion failed")]
    fn test_assert_approx_eq_fails() {
        assert_approx_eq!(221.5, 221.0, 0.1);
    }
}
