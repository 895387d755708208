//! Sensor file loading for INSAT-3DR imager data.
//!
//! Decodes an L1B file into a brightness-temperature grid and two
//! pixel-aligned geolocation grids, applying scale factors and mapping fill
//! values to `NaN`.
//!
//! # Native reader
//!
//! The HDF5 reader needs libhdf5/libnetcdf at build time and is compiled only
//! with the `netcdf` feature. Whether it is present is reported by
//! [`native_loader_available`], which services check once at startup.

pub mod decode;
pub mod error;
pub mod loader;
#[cfg(feature = "netcdf")]
mod native;

pub use decode::{mask_fill_value, scale_with_fill, BT_FILL_VALUE};
pub use error::{SensorError, SensorResult};
pub use loader::{ensure_readable, GridLoader, SensorGrids};
#[cfg(feature = "netcdf")]
pub use native::InsatL1bLoader;

use std::sync::Arc;

/// True when the native HDF5 reader was compiled in.
pub fn native_loader_available() -> bool {
    cfg!(feature = "netcdf")
}

/// The native loader, if available in this build.
pub fn default_loader() -> Option<Arc<dyn GridLoader>> {
    #[cfg(feature = "netcdf")]
    {
        Some(Arc::new(InsatL1bLoader))
    }
    #[cfg(not(feature = "netcdf"))]
    {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_loader_matches_capability() {
        assert_eq!(default_loader().is_some(), native_loader_available());
    }
}
