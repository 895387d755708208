//! Native INSAT-3DR L1B reading using the netcdf library.
//!
//! L1B products are HDF5 files laid out compatibly with netCDF-4, so the
//! netcdf library (which wraps libnetcdf/HDF5) opens them directly by path.
//!
//! Datasets read:
//! - `TIR1_BT` `[time, y, x]`: brightness temperature in Kelvin, `-999` fill.
//!   Only the first time slice is used.
//! - `Latitude`, `Longitude` `[y, x]`: scaled integers with `scale_factor`
//!   and `_FillValue` attributes.

use std::path::Path;

use cloud_common::Grid;
use tracing::{debug, info};

use crate::decode::{mask_fill_value, scale_with_fill, BT_FILL_VALUE};
use crate::error::{SensorError, SensorResult};
use crate::loader::{ensure_readable, GridLoader, SensorGrids};

const BT_VARIABLE: &str = "TIR1_BT";
const LAT_VARIABLE: &str = "Latitude";
const LON_VARIABLE: &str = "Longitude";

/// Loader for INSAT-3DR imager L1B files.
#[derive(Debug, Default, Clone, Copy)]
pub struct InsatL1bLoader;

impl GridLoader for InsatL1bLoader {
    fn name(&self) -> &str {
        "insat-l1b-native"
    }

    fn load(&self, path: &Path) -> SensorResult<SensorGrids> {
        let file_size = ensure_readable(path)?;

        let nc_file = netcdf::open(path)
            .map_err(|e| SensorError::InvalidFormat(format!("Cannot read HDF5 file: {}", e)))?;

        let variables: Vec<String> = nc_file.variables().map(|v| v.name()).collect();
        debug!(path = %path.display(), variables = ?variables, "Opened sensor file");

        let bt_var = nc_file
            .variable(BT_VARIABLE)
            .ok_or_else(|| SensorError::MissingData(format!("{} variable", BT_VARIABLE)))?;
        let (height, width) = trailing_dims(&bt_var)?;

        let mut raw_bt: Vec<f32> = bt_var
            .get_values(..)
            .map_err(|e| SensorError::InvalidFormat(format!("Failed to read {}: {}", BT_VARIABLE, e)))?;
        // First time slice only
        raw_bt.truncate(height * width);
        let bt = Grid::from_vec(height, width, mask_fill_value(raw_bt, BT_FILL_VALUE))?;

        let lat = read_geolocation(&nc_file, LAT_VARIABLE, height, width)?;
        let lon = read_geolocation(&nc_file, LON_VARIABLE, height, width)?;

        info!(
            path = %path.display(),
            file_size = file_size,
            height = height,
            width = width,
            "Decoded brightness temperature and geolocation grids"
        );

        SensorGrids::new(bt, lat, lon)
    }
}

/// Read a scaled geolocation dataset into degrees.
fn read_geolocation(
    nc_file: &netcdf::File,
    name: &str,
    height: usize,
    width: usize,
) -> SensorResult<Grid<f32>> {
    let var = nc_file
        .variable(name)
        .ok_or_else(|| SensorError::MissingData(format!("{} variable", name)))?;

    let (var_height, var_width) = trailing_dims(&var)?;
    if (var_height, var_width) != (height, width) {
        return Err(SensorError::ShapeMismatch(format!(
            "{} is {}x{}, brightness temperature is {}x{}",
            name, var_height, var_width, height, width
        )));
    }

    let scale_factor = get_f32_attr(&var, "scale_factor")
        .ok_or_else(|| SensorError::MissingData(format!("{} scale_factor attribute", name)))?;
    let fill_value = get_f32_attr(&var, "_FillValue")
        .ok_or_else(|| SensorError::MissingData(format!("{} _FillValue attribute", name)))?;

    let raw: Vec<f32> = var
        .get_values(..)
        .map_err(|e| SensorError::InvalidFormat(format!("Failed to read {}: {}", name, e)))?;

    Ok(Grid::from_vec(
        height,
        width,
        scale_with_fill(raw, scale_factor, fill_value),
    )?)
}

/// The last two dimensions of a variable as `(height, width)`.
fn trailing_dims(var: &netcdf::Variable) -> SensorResult<(usize, usize)> {
    let dims: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
    match dims.as_slice() {
        [.., h, w] => Ok((*h, *w)),
        _ => Err(SensorError::InvalidFormat(format!(
            "{} has {} dimensions, expected at least 2",
            var.name(),
            dims.len()
        ))),
    }
}

/// Check if a variable has an attribute with the given name.
/// This avoids HDF5 error spam when checking for optional attributes.
fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

/// Helper to get f32 attribute.
fn get_f32_attr(var: &netcdf::Variable, name: &str) -> Option<f32> {
    if !has_attr(var, name) {
        return None;
    }
    let attr_value = var.attribute_value(name)?.ok()?;
    f32::try_from(attr_value).ok()
}
