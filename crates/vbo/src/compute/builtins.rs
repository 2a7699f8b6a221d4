//! Built-in compute functions for derived telemetry channels.
//!
//! Each builtin reads its source columns as numbers, builds the new column's
//! formatted values, and goes through [`ComputeEngine`] so the contract
//! checks and all-or-nothing commit apply to builtins and user functions
//! alike. Any cell that cannot be read as a number fails the whole operation
//! with [`VboError::ValueParse`] naming the column and row.

use crate::error::{Result, VboError};
use crate::table::DataTable;

use super::engine::ComputeEngine;
use super::format::{format_heading, hhmmsscc_to_milliseconds, zero_pad};

/// Options for [`add_gps_heading_column`].
#[derive(Debug, Clone)]
pub struct GpsHeadingOptions {
    /// Name of the heading column to create.
    pub heading_column: String,
    pub lat_column: String,
    pub long_column: String,
    /// Moving-average window size (odd recommended).
    pub smoothing_window: usize,
}

impl Default for GpsHeadingOptions {
    fn default() -> Self {
        Self {
            heading_column: "heading_gps".to_string(),
            lat_column: "lat".to_string(),
            long_column: "long".to_string(),
            smoothing_window: 5,
        }
    }
}

/// Options for [`add_rotation_speed_column`].
#[derive(Debug, Clone)]
pub struct RotationSpeedOptions {
    /// Name of the rotation speed column to create (deg/s).
    pub rotation_speed_column: String,
    /// Heading source column, in degrees.
    pub heading_column: String,
    /// Time source column, in HHMMSS.CC format.
    pub time_column: String,
    /// Moving-average window size (odd recommended).
    pub smoothing_window: usize,
}

impl Default for RotationSpeedOptions {
    fn default() -> Self {
        Self {
            rotation_speed_column: "rotation_speed_deg_per_s".to_string(),
            heading_column: "heading_gps".to_string(),
            time_column: "time".to_string(),
            smoothing_window: 9,
        }
    }
}

/// Options for [`add_oversteer_column`].
#[derive(Debug, Clone)]
pub struct OversteerOptions {
    /// Name of the oversteer column to create (deg/s; positive oversteer,
    /// negative understeer).
    pub oversteer_column: String,
    pub rotation_speed_column: String,
    pub gyro_z_column: String,
}

impl Default for OversteerOptions {
    fn default() -> Self {
        Self {
            oversteer_column: "oversteer".to_string(),
            rotation_speed_column: "rotation_speed_deg_per_s".to_string(),
            gyro_z_column: "z_rate_of_rotation-gyro".to_string(),
        }
    }
}

/// Options for [`add_avitime_column`].
#[derive(Debug, Clone)]
pub struct AviTimeOptions {
    /// Name of the video-sync clock column to create.
    pub avitime_column: String,
    pub time_column: String,
    /// Clock value for the first row, in milliseconds (may be negative to
    /// sync footage that starts before logging).
    pub start_sync_time_ms: i64,
}

impl Default for AviTimeOptions {
    fn default() -> Self {
        Self {
            avitime_column: "avitime".to_string(),
            time_column: "time".to_string(),
            start_sync_time_ms: 0,
        }
    }
}

/// Options for [`add_fuel_consumption_column`].
#[derive(Debug, Clone)]
pub struct FuelConsumptionOptions {
    /// Name of the average fuel consumption column to create (L/min).
    pub fuel_consumption_column: String,
    pub rpm_column: String,
    /// Throttle position source column (0-100).
    pub throttle_column: String,
    /// Intake air temperature source column (degrees C).
    pub intake_temp_column: String,
    pub time_column: String,
    pub engine_displacement_cc: u32,
    /// Volumetric efficiency (0.7-0.95 typical).
    pub volumetric_efficiency: f64,
    /// Air-fuel ratio relative to stoichiometric (1.0 = stoichiometric).
    pub lambda: f64,
    /// Trailing window over which consumption is averaged, in seconds.
    pub time_window_sec: u32,
}

impl Default for FuelConsumptionOptions {
    fn default() -> Self {
        Self {
            fuel_consumption_column: "fuel_consumption_lpm".to_string(),
            rpm_column: "rpm".to_string(),
            throttle_column: "throttle".to_string(),
            intake_temp_column: "intake-air-temp".to_string(),
            time_column: "time".to_string(),
            engine_displacement_cc: 1998,
            volumetric_efficiency: 0.85,
            lambda: 1.0,
            time_window_sec: 10,
        }
    }
}

/// Add a heading column derived from consecutive GPS fixes: great-circle
/// bearing between each pair of points (row 0 is 0.0), smoothed with a
/// circular moving average so the 0/360 seam does not bias the result.
pub fn add_gps_heading_column(table: &mut DataTable, options: &GpsHeadingOptions) -> Result<()> {
    let name = options.heading_column.clone();
    ComputeEngine::new().add_computed_column(table, &name, |mut t| {
        let values = gps_heading_values(&t, options)?;
        t.add_column(name.clone(), values)?;
        Ok(t)
    })
}

/// Add a rotation speed (yaw rate) column finite-differenced from a heading
/// column: per row, the shortest-angle heading delta divided by the clock
/// delta in seconds (row 0 is 0.0), smoothed with a moving average.
pub fn add_rotation_speed_column(table: &mut DataTable, options: &RotationSpeedOptions) -> Result<()> {
    let name = options.rotation_speed_column.clone();
    ComputeEngine::new().add_computed_column(table, &name, |mut t| {
        let values = rotation_speed_values(&t, options)?;
        t.add_column(name.clone(), values)?;
        Ok(t)
    })
}

/// Add an oversteer column: GPS-derived rotation speed plus the gyro Z rate
/// (gyro Z is negative for clockwise rotation, so agreement cancels out).
/// Row 0 is 0.0.
pub fn add_oversteer_column(table: &mut DataTable, options: &OversteerOptions) -> Result<()> {
    let name = options.oversteer_column.clone();
    ComputeEngine::new().add_computed_column(table, &name, |mut t| {
        let values = oversteer_values(&t, options)?;
        t.add_column(name.clone(), values)?;
        Ok(t)
    })
}

/// Add a column holding the same literal value on every row.
pub fn add_constant_column(table: &mut DataTable, name: &str, value: &str) -> Result<()> {
    ComputeEngine::new().add_computed_column(table, name, |mut t| {
        let values = vec![value.to_string(); t.row_count()];
        t.add_column(name.to_string(), values)?;
        Ok(t)
    })
}

/// Add a video-sync clock column: the caller's start offset on row 0, then
/// the accumulated HHMMSS.CC clock deltas, zero-padded to nine digits.
pub fn add_avitime_column(table: &mut DataTable, options: &AviTimeOptions) -> Result<()> {
    let name = options.avitime_column.clone();
    ComputeEngine::new().add_computed_column(table, &name, |mut t| {
        let values = avitime_values(&t, options)?;
        t.add_column(name.clone(), values)?;
        Ok(t)
    })
}

/// Add an average fuel consumption column in liters per minute, estimated
/// from RPM, throttle and intake temperature, averaged over a trailing time
/// window.
pub fn add_fuel_consumption_column(
    table: &mut DataTable,
    options: &FuelConsumptionOptions,
) -> Result<()> {
    let name = options.fuel_consumption_column.clone();
    ComputeEngine::new().add_computed_column(table, &name, |mut t| {
        let values = fuel_consumption_values(&t, options)?;
        t.add_column(name.clone(), values)?;
        Ok(t)
    })
}

fn gps_heading_values(table: &DataTable, options: &GpsHeadingOptions) -> Result<Vec<String>> {
    let lat = source_column(table, &options.lat_column)?;
    let long = source_column(table, &options.long_column)?;
    let n = table.row_count();

    let mut raw = Vec::with_capacity(n);
    for i in 0..n {
        if i == 0 {
            raw.push(0.0);
            continue;
        }
        let lat1 = numeric(lat, &options.lat_column, i - 1)?;
        let long1 = numeric(long, &options.long_column, i - 1)?;
        let lat2 = numeric(lat, &options.lat_column, i)?;
        let long2 = numeric(long, &options.long_column, i)?;
        raw.push(bearing(lat1, long1, lat2, long2));
    }

    let smoothed = circular_moving_average(&raw, options.smoothing_window.max(1));
    Ok(smoothed.into_iter().map(format_heading).collect())
}

fn rotation_speed_values(table: &DataTable, options: &RotationSpeedOptions) -> Result<Vec<String>> {
    let heading = source_column(table, &options.heading_column)?;
    let time = source_column(table, &options.time_column)?;
    let n = table.row_count();

    let mut raw = Vec::with_capacity(n);
    for i in 0..n {
        if i == 0 {
            raw.push(0.0);
            continue;
        }
        let prev_heading = numeric(heading, &options.heading_column, i - 1)?;
        let curr_heading = numeric(heading, &options.heading_column, i)?;
        // Shortest angle difference in degrees, in (-180, +180].
        let delta = (curr_heading - prev_heading + 540.0).rem_euclid(360.0) - 180.0;

        let prev_time = clock_ms(time, &options.time_column, i - 1)? as f64 / 1000.0;
        let curr_time = clock_ms(time, &options.time_column, i)? as f64 / 1000.0;
        let dt = if curr_time == prev_time { 1e-6 } else { curr_time - prev_time };
        raw.push(delta / dt);
    }

    let smoothed = moving_average(&raw, options.smoothing_window.max(1));
    Ok(smoothed.into_iter().map(|v| format!("{v:.2}")).collect())
}

fn oversteer_values(table: &DataTable, options: &OversteerOptions) -> Result<Vec<String>> {
    let rotation = source_column(table, &options.rotation_speed_column)?;
    let gyro_z = source_column(table, &options.gyro_z_column)?;
    let n = table.row_count();

    let mut values = Vec::with_capacity(n);
    for i in 0..n {
        let oversteer = if i == 0 {
            0.0
        } else {
            numeric(rotation, &options.rotation_speed_column, i)?
                + numeric(gyro_z, &options.gyro_z_column, i)?
        };
        values.push(format_heading(oversteer));
    }
    Ok(values)
}

fn avitime_values(table: &DataTable, options: &AviTimeOptions) -> Result<Vec<String>> {
    let time = source_column(table, &options.time_column)?;
    let n = table.row_count();

    let mut values = Vec::with_capacity(n);
    let mut avitime = options.start_sync_time_ms;
    for i in 0..n {
        if i > 0 {
            let prev = clock_ms(time, &options.time_column, i - 1)?;
            let curr = clock_ms(time, &options.time_column, i)?;
            avitime += curr - prev;
        }
        values.push(zero_pad(avitime, 9));
    }
    Ok(values)
}

fn fuel_consumption_values(
    table: &DataTable,
    options: &FuelConsumptionOptions,
) -> Result<Vec<String>> {
    let rpm = source_column(table, &options.rpm_column)?;
    let throttle = source_column(table, &options.throttle_column)?;
    let intake = source_column(table, &options.intake_temp_column)?;
    let time = source_column(table, &options.time_column)?;
    let n = table.row_count();

    let mut instant = Vec::with_capacity(n);
    let mut times = Vec::with_capacity(n);
    let mut values = Vec::with_capacity(n);
    for i in 0..n {
        let consumption = instant_fuel_consumption(
            numeric(rpm, &options.rpm_column, i)?,
            numeric(throttle, &options.throttle_column, i)?,
            numeric(intake, &options.intake_temp_column, i)?,
            options.engine_displacement_cc,
            options.volumetric_efficiency,
            options.lambda,
        );
        instant.push(consumption);
        times.push(clock_ms(time, &options.time_column, i)? as f64 / 1000.0);

        let average = if i == 0 {
            consumption
        } else {
            let window_start = times[i] - options.time_window_sec as f64;
            let mut sum = 0.0;
            let mut count = 0;
            for j in (0..=i).rev() {
                if times[j] < window_start {
                    break;
                }
                sum += instant[j];
                count += 1;
            }
            if count == 0 { 0.0 } else { sum / count as f64 }
        };
        values.push(format!("{average:.4}"));
    }
    Ok(values)
}

fn source_column<'a>(table: &'a DataTable, name: &str) -> Result<&'a [String]> {
    table
        .column(name)
        .ok_or_else(|| VboError::ColumnNotFound(name.to_string()))
}

fn numeric(values: &[String], column: &str, row: usize) -> Result<f64> {
    let value = &values[row];
    value.trim().parse().map_err(|_| VboError::ValueParse {
        column: column.to_string(),
        row,
        value: value.clone(),
    })
}

fn clock_ms(values: &[String], column: &str, row: usize) -> Result<i64> {
    let value = &values[row];
    hhmmsscc_to_milliseconds(value).ok_or_else(|| VboError::ValueParse {
        column: column.to_string(),
        row,
        value: value.clone(),
    })
}

/// Great-circle bearing between two lat/long points, in degrees clockwise
/// from North, in [0, 360).
fn bearing(lat1: f64, long1: f64, lat2: f64, long2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let dlong_rad = (long2 - long1).to_radians();

    let x = dlong_rad.sin() * lat2_rad.cos();
    let y = lat1_rad.cos() * lat2_rad.sin() - lat1_rad.sin() * lat2_rad.cos() * dlong_rad.cos();

    x.atan2(y).to_degrees().rem_euclid(360.0)
}

/// Centered moving average with edge clipping.
fn moving_average(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    let half = window / 2;
    (0..n)
        .map(|i| {
            let start = i.saturating_sub(half);
            let end = (i + half + 1).min(n);
            values[start..end].iter().sum::<f64>() / (end - start) as f64
        })
        .collect()
}

/// Centered moving average on angles: values are averaged as unit vectors so
/// 359 and 1 average near 0 instead of 180. Result in [0, 360).
fn circular_moving_average(degrees: &[f64], window: usize) -> Vec<f64> {
    let n = degrees.len();
    let half = window / 2;
    (0..n)
        .map(|i| {
            let start = i.saturating_sub(half);
            let end = (i + half + 1).min(n);
            let (mut sin_sum, mut cos_sum) = (0.0, 0.0);
            for &d in &degrees[start..end] {
                let rad = d.to_radians();
                sin_sum += rad.sin();
                cos_sum += rad.cos();
            }
            sin_sum.atan2(cos_sum).to_degrees().rem_euclid(360.0)
        })
        .collect()
}

/// Instantaneous fuel consumption estimate in liters per minute from engine
/// speed, throttle position and intake air temperature.
fn instant_fuel_consumption(
    rpm: f64,
    throttle: f64,
    intake_temp: f64,
    engine_displacement_cc: u32,
    volumetric_efficiency: f64,
    lambda: f64,
) -> f64 {
    if rpm == 0.0 {
        return 0.0;
    }

    const STANDARD_AIR_DENSITY: f64 = 1.225; // kg/m3 at 15 C, sea level
    const KELVIN_OFFSET: f64 = 273.15;
    const REFERENCE_TEMP_C: f64 = 15.0;
    const RPM_TO_FIRINGS: f64 = 120.0; // 4-stroke: 2 revolutions per power stroke
    const GASOLINE_DENSITY_G_PER_L: f64 = 745.0;
    const STOICHIOMETRIC_AFR: f64 = 14.7;

    // Ideal-gas density correction for intake temperature (g/L).
    let air_density = STANDARD_AIR_DENSITY * ((REFERENCE_TEMP_C + KELVIN_OFFSET) / (KELVIN_OFFSET + intake_temp));

    let displacement_liters = engine_displacement_cc as f64 / 1000.0;
    let throttle_ratio = throttle / 100.0;
    let intake_volume = volumetric_efficiency * displacement_liters * throttle_ratio;

    let air_mass_per_rev = intake_volume * air_density;
    let fuel_mass_per_rev = air_mass_per_rev / (STOICHIOMETRIC_AFR * lambda);
    let fuel_g_per_sec = fuel_mass_per_rev * (rpm / RPM_TO_FIRINGS);

    fuel_g_per_sec / GASOLINE_DENSITY_G_PER_L * 60.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn table_with(columns: &[(&str, &[&str])]) -> DataTable {
        let mut map = IndexMap::new();
        for (name, values) in columns {
            map.insert(
                name.to_string(),
                values.iter().map(|v| v.to_string()).collect(),
            );
        }
        DataTable::from_columns(map, b' ').unwrap()
    }

    #[test]
    fn test_rotation_speed_finite_difference() {
        let mut table = table_with(&[("time", &["0", "1"]), ("heading", &["10.0", "20.0"])]);
        let options = RotationSpeedOptions {
            heading_column: "heading".to_string(),
            smoothing_window: 1,
            ..Default::default()
        };
        add_rotation_speed_column(&mut table, &options).unwrap();

        assert_eq!(table.column_count(), 3);
        assert_eq!(table.row_count(), 2);
        // 10 degrees over 1 second, no smoothing.
        assert_eq!(
            table.column("rotation_speed_deg_per_s").unwrap(),
            ["0.00", "10.00"]
        );
    }

    #[test]
    fn test_rotation_speed_smoothing_window() {
        let mut table = table_with(&[("time", &["0", "1"]), ("heading", &["10.0", "20.0"])]);
        let options = RotationSpeedOptions {
            heading_column: "heading".to_string(),
            smoothing_window: 9,
            ..Default::default()
        };
        add_rotation_speed_column(&mut table, &options).unwrap();

        // Window covers both samples: mean of [0, 10] everywhere.
        assert_eq!(
            table.column("rotation_speed_deg_per_s").unwrap(),
            ["5.00", "5.00"]
        );
    }

    #[test]
    fn test_rotation_speed_wraps_north_crossing() {
        let mut table = table_with(&[("time", &["0", "1"]), ("heading", &["359.0", "1.0"])]);
        let options = RotationSpeedOptions {
            heading_column: "heading".to_string(),
            smoothing_window: 1,
            ..Default::default()
        };
        add_rotation_speed_column(&mut table, &options).unwrap();

        // +2 deg/s across the 0/360 seam, not -358.
        assert_eq!(
            table.column("rotation_speed_deg_per_s").unwrap(),
            ["0.00", "2.00"]
        );
    }

    #[test]
    fn test_rotation_speed_bad_heading_fails_whole_operation() {
        let mut table = table_with(&[("time", &["0", "1"]), ("heading", &["10.0", "garbage"])]);
        let options = RotationSpeedOptions {
            heading_column: "heading".to_string(),
            smoothing_window: 1,
            ..Default::default()
        };
        let err = add_rotation_speed_column(&mut table, &options).unwrap_err();

        match err {
            VboError::ValueParse { column, row, value } => {
                assert_eq!(column, "heading");
                assert_eq!(row, 1);
                assert_eq!(value, "garbage");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(table.column_count(), 2);
    }

    #[test]
    fn test_rotation_speed_missing_time_column() {
        let mut table = table_with(&[("heading", &["10.0", "20.0"])]);
        let options = RotationSpeedOptions {
            heading_column: "heading".to_string(),
            ..Default::default()
        };
        let err = add_rotation_speed_column(&mut table, &options).unwrap_err();
        assert!(matches!(err, VboError::ColumnNotFound(name) if name == "time"));
    }

    #[test]
    fn test_oversteer() {
        let mut table = table_with(&[
            ("rotation_speed_deg_per_s", &["0.00", "10.00"]),
            ("z_rate_of_rotation-gyro", &["0.0", "-8.5"]),
        ]);
        add_oversteer_column(&mut table, &OversteerOptions::default()).unwrap();

        assert_eq!(table.column("oversteer").unwrap(), ["00.00", "01.50"]);
    }

    #[test]
    fn test_gps_heading_due_east() {
        let mut table = table_with(&[
            ("lat", &["50.0000", "50.0000"]),
            ("long", &["8.0000", "8.0010"]),
        ]);
        let options = GpsHeadingOptions {
            heading_column: "heading_gps".to_string(),
            smoothing_window: 1,
            ..Default::default()
        };
        add_gps_heading_column(&mut table, &options).unwrap();

        let values = table.column("heading_gps").unwrap();
        assert_eq!(values[0], "00.00");
        let east: f64 = values[1].parse().unwrap();
        assert!((east - 90.0).abs() < 0.1, "expected ~90, got {east}");
    }

    #[test]
    fn test_gps_heading_duplicate_column() {
        let mut table = table_with(&[
            ("lat", &["50.0"]),
            ("long", &["8.0"]),
            ("heading_gps", &["0.0"]),
        ]);
        let err = add_gps_heading_column(&mut table, &GpsHeadingOptions::default()).unwrap_err();
        assert!(matches!(err, VboError::DuplicateColumn(_)));
    }

    #[test]
    fn test_constant_column() {
        let mut table = table_with(&[("time", &["0", "1", "2"])]);
        add_constant_column(&mut table, "avifileindex", "0003").unwrap();
        assert_eq!(table.column("avifileindex").unwrap(), ["0003", "0003", "0003"]);
    }

    #[test]
    fn test_avitime_accumulates_clock_deltas() {
        let mut table = table_with(&[("time", &["124530.00", "124530.05", "124530.10"])]);
        let options = AviTimeOptions {
            start_sync_time_ms: -300_000,
            ..Default::default()
        };
        add_avitime_column(&mut table, &options).unwrap();

        assert_eq!(
            table.column("avitime").unwrap(),
            ["-00300000", "-00299950", "-00299900"]
        );
    }

    #[test]
    fn test_fuel_consumption_zero_rpm() {
        let mut table = table_with(&[
            ("rpm", &["0", "0"]),
            ("throttle", &["0", "0"]),
            ("intake-air-temp", &["20", "20"]),
            ("time", &["0", "1"]),
        ]);
        add_fuel_consumption_column(&mut table, &FuelConsumptionOptions::default()).unwrap();
        assert_eq!(
            table.column("fuel_consumption_lpm").unwrap(),
            ["0.0000", "0.0000"]
        );
    }

    #[test]
    fn test_fuel_consumption_positive_at_load() {
        let mut table = table_with(&[
            ("rpm", &["3000", "3000"]),
            ("throttle", &["50", "50"]),
            ("intake-air-temp", &["20", "20"]),
            ("time", &["0", "1"]),
        ]);
        add_fuel_consumption_column(&mut table, &FuelConsumptionOptions::default()).unwrap();

        let values = table.column("fuel_consumption_lpm").unwrap();
        let first: f64 = values[0].parse().unwrap();
        assert!(first > 0.0);
        // Steady state: the trailing average equals the instantaneous value.
        assert_eq!(values[0], values[1]);
    }

    #[test]
    fn test_circular_moving_average_crosses_north() {
        let smoothed = circular_moving_average(&[359.0, 1.0], 3);
        for v in smoothed {
            assert!(v < 2.0 || v > 358.0, "expected near north, got {v}");
        }
    }

    #[test]
    fn test_bearing_cardinal_directions() {
        assert!((bearing(50.0, 8.0, 51.0, 8.0) - 0.0).abs() < 1e-9);
        let east = bearing(0.0, 0.0, 0.0, 1.0);
        assert!((east - 90.0).abs() < 1e-9);
        let south = bearing(51.0, 8.0, 50.0, 8.0);
        assert!((south - 180.0).abs() < 1e-9);
    }
}
