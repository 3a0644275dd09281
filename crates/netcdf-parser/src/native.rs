//! Native NetCDF reading using the netcdf library.
//!
//! CHESS-SCAPE files are NetCDF-4 (HDF5) with a `(time, y, x)` layout on the
//! British National Grid. Only one time slice is read: cell presence does not
//! change over time, so slice 0 is enough to derive the grid.

use std::path::Path;
use std::sync::Once;

use chrono::NaiveDate;
use tracing::{debug, info};

use chess_common::{GridAxes, PresenceRaster, RasterKind};

use crate::error::{NetCdfError, NetCdfResult};

/// Silence HDF5's automatic error printing to stderr.
///
/// The HDF5 C library prints verbose error messages to stderr even when errors
/// are handled gracefully by the Rust code (e.g., when checking for optional
/// attributes that don't exist). This function disables that output by calling
/// H5Eset_auto2 with null handlers. It only needs to be called once per process,
/// but is safe to call multiple times.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is thread-safe and we're passing null pointers
        // to disable error output, which is a documented valid use.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

/// Options for reading a presence raster.
#[derive(Debug, Clone)]
pub struct ReadOptions {
    /// Climate variable to test for data, e.g. `tas`.
    pub variable: String,
    /// Time slice used as the reference for presence.
    pub time_index: usize,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            variable: "tas".to_string(),
            time_index: 0,
        }
    }
}

/// Read a presence raster from a CHESS-SCAPE NetCDF file.
///
/// A cell is present when the variable at `time_index` is neither NaN nor
/// the variable's `_FillValue`. The file handle is released when this
/// function returns, on success and on every error path.
pub fn read_presence_raster(
    path: &Path,
    kind: RasterKind,
    options: &ReadOptions,
) -> NetCdfResult<PresenceRaster> {
    silence_hdf5_errors();

    if !path.exists() {
        return Err(NetCdfError::MissingData(format!(
            "{} raster file {}",
            kind.as_str(),
            path.display()
        )));
    }

    let nc_file = netcdf::open(path)
        .map_err(|e| NetCdfError::InvalidFormat(format!("Failed to open {}: {}", path.display(), e)))?;

    let x = read_axis(&nc_file, "x")?;
    let y = read_axis(&nc_file, "y")?;
    let (width, height) = (x.len(), y.len());

    let var = nc_file
        .variable(&options.variable)
        .ok_or_else(|| NetCdfError::MissingData(format!("{} variable", options.variable)))?;

    let dims: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
    if dims != ["time", "y", "x"] {
        return Err(NetCdfError::InvalidFormat(format!(
            "{} has dimensions {:?}, expected [time, y, x]",
            options.variable, dims
        )));
    }

    let time_len = var.dimensions()[0].len();
    if options.time_index >= time_len {
        return Err(NetCdfError::InvalidFormat(format!(
            "time index {} out of range for {} time steps",
            options.time_index, time_len
        )));
    }

    let t = options.time_index;
    let values: Vec<f32> = var
        .get_values([t..t + 1, 0..height, 0..width])
        .map_err(|e| NetCdfError::InvalidFormat(format!("Failed to read {}: {}", options.variable, e)))?;

    let fill_value = get_f32_attr(&var, "_FillValue");
    let present = presence_flags(&values, fill_value);

    if let Some(date) = reference_date(&nc_file, t) {
        debug!(kind = kind.as_str(), date = %date, "Reference time slice");
    }

    let axes = GridAxes::new(x, y)?;
    let raster = PresenceRaster::new(kind, axes, present)?;

    info!(
        kind = kind.as_str(),
        path = %path.display(),
        width,
        height,
        time_steps = time_len,
        present = raster.present_count(),
        "Loaded presence raster"
    );

    Ok(raster)
}

/// Presence per value: not NaN and not equal to the fill value.
pub fn presence_flags(values: &[f32], fill_value: Option<f32>) -> Vec<bool> {
    values
        .iter()
        .map(|&v| !v.is_nan() && fill_value.map_or(true, |fill| v != fill))
        .collect()
}

/// Parse a CF `units` string such as `days since 1970-01-01 00:00:00`.
pub fn parse_time_origin(units: &str) -> Option<(String, NaiveDate)> {
    let (unit, origin) = units.split_once(" since ")?;
    let date_part = origin.trim().get(..10)?;
    let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()?;
    Some((unit.trim().to_string(), date))
}

// =============================================================================
// Internal helpers
// =============================================================================

fn read_axis(nc_file: &netcdf::File, name: &str) -> NetCdfResult<Vec<f64>> {
    let var = nc_file
        .variable(name)
        .ok_or_else(|| NetCdfError::MissingData(format!("{} variable", name)))?;

    var.get_values::<f64, _>(..)
        .map_err(|e| NetCdfError::InvalidFormat(format!("Failed to read {}: {}", name, e)))
}

/// Calendar date of a time slice, for logging only.
fn reference_date(nc_file: &netcdf::File, index: usize) -> Option<NaiveDate> {
    let var = nc_file.variable("time")?;
    let units = match var.attribute_value("units")?.ok()? {
        netcdf::AttributeValue::Str(s) => s,
        _ => return None,
    };
    let (unit, origin) = parse_time_origin(&units)?;
    let offset: f64 = var.get_value([index]).ok()?;

    let days = match unit.as_str() {
        "days" => offset,
        "hours" => offset / 24.0,
        "seconds" => offset / 86_400.0,
        _ => return None,
    };
    origin.checked_add_signed(chrono::Duration::days(days.floor() as i64))
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presence_flags() {
        let values = [1.0, f32::NAN, 1e20, 280.5];
        assert_eq!(presence_flags(&values, Some(1e20)), vec![true, false, false, true]);
        assert_eq!(presence_flags(&values, None), vec![true, false, true, true]);
    }

    #[test]
    fn test_parse_time_origin() {
        let (unit, date) = parse_time_origin("days since 1970-01-01 00:00:00").unwrap();
        assert_eq!(unit, "days");
        assert_eq!(date, NaiveDate::from_ymd_opt(1970, 1, 1).unwrap());

        assert!(parse_time_origin("degrees_north").is_none());
        assert!(parse_time_origin("days since soon").is_none());
    }

    #[test]
    fn test_missing_file_is_reported() {
        let err = read_presence_raster(
            Path::new("/nonexistent/chess-scape.nc"),
            RasterKind::BiasCorrected,
            &ReadOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, NetCdfError::MissingData(_)));
    }
}
