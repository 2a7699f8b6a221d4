//! Main VboFile struct and public API.

use std::path::Path;

use crate::compute::builtins::{
    self, AviTimeOptions, FuelConsumptionOptions, GpsHeadingOptions, OversteerOptions,
    RotationSpeedOptions,
};
use crate::compute::{ComputeEngine, zero_pad};
use crate::error::{Result, VboError};
use crate::input::{Parser, SourceMetadata};
use crate::output::Writer;
use crate::section::{DATA_SECTION, SectionStore};
use crate::table::DataTable;

/// Name of the section holding the channel list kept in sync with data
/// columns.
const HEADER_SECTION: &str = "header";

/// Options for [`VboFile::add_avi_section`].
#[derive(Debug, Clone)]
pub struct AviOptions {
    /// Base name of the video file written into the `[avi]` section.
    pub video_file_name: String,
    /// Video container format written into the `[avi]` section.
    pub video_format: String,
    /// Index stored in the `avifileindex` column, zero-padded to 4 digits.
    pub file_index: u32,
    /// First-frame sync offset in milliseconds (may be negative).
    pub start_sync_time_ms: i64,
    /// Name of the time column used to accumulate the sync clock.
    pub time_column: String,
}

impl Default for AviOptions {
    fn default() -> Self {
        Self {
            video_file_name: "video_".to_string(),
            video_format: "avi".to_string(),
            file_index: 1,
            start_sync_time_ms: 0,
            time_column: "time".to_string(),
        }
    }
}

/// A loaded VBO file: the parsed section store plus, when loaded from disk,
/// metadata about the source.
///
/// Parsing a well-formed file and writing it back without mutation
/// reproduces the original bytes; column add/remove operations change only
/// the data section (and the `[header]` channel list, when present).
#[derive(Debug)]
pub struct VboFile {
    store: SectionStore,
    source: Option<SourceMetadata>,
}

impl VboFile {
    /// Load and parse a file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let (store, source) = Parser::new().parse_file(path)?;
        Ok(Self {
            store,
            source: Some(source),
        })
    }

    /// Parse raw text.
    pub fn parse_str(text: &str) -> Result<Self> {
        Ok(Self {
            store: Parser::new().parse_str(text)?,
            source: None,
        })
    }

    /// The parsed section store.
    pub fn sections(&self) -> &SectionStore {
        &self.store
    }

    pub fn sections_mut(&mut self) -> &mut SectionStore {
        &mut self.store
    }

    /// The `[data]` table, when the file has one.
    pub fn data(&self) -> Option<&DataTable> {
        self.store.data()
    }

    pub fn data_mut(&mut self) -> Option<&mut DataTable> {
        self.store.data_mut()
    }

    /// Source metadata; `None` when parsed from a string.
    pub fn source(&self) -> Option<&SourceMetadata> {
        self.source.as_ref()
    }

    /// Number of data rows; 0 without a data section.
    pub fn row_count(&self) -> usize {
        self.store.data().map(DataTable::row_count).unwrap_or(0)
    }

    /// Derive and append a column through the compute engine, then record it
    /// in the `[header]` channel list when one exists.
    pub fn add_computed_column<F>(&mut self, name: &str, compute_fn: F) -> Result<()>
    where
        F: FnOnce(DataTable) -> Result<DataTable>,
    {
        let table = self.require_data_mut()?;
        ComputeEngine::new().add_computed_column(table, name, compute_fn)?;
        self.sync_channel_added(name);
        Ok(())
    }

    /// Append a column holding the same value on every row.
    pub fn add_constant_column(&mut self, name: &str, value: &str) -> Result<()> {
        builtins::add_constant_column(self.require_data_mut()?, name, value)?;
        self.sync_channel_added(name);
        Ok(())
    }

    /// Append a GPS-derived heading column.
    pub fn add_gps_heading_column(&mut self, options: &GpsHeadingOptions) -> Result<()> {
        builtins::add_gps_heading_column(self.require_data_mut()?, options)?;
        self.sync_channel_added(&options.heading_column);
        Ok(())
    }

    /// Append a rotation speed (yaw rate) column derived from a heading
    /// column. When the heading column is absent it is derived from GPS for
    /// the computation and removed again afterwards.
    pub fn add_rotation_speed_column(&mut self, options: &RotationSpeedOptions) -> Result<()> {
        let data = self.require_data()?;
        if !data.has_column(&options.time_column) {
            return Err(VboError::ColumnNotFound(options.time_column.clone()));
        }

        let temporary_heading = !data.has_column(&options.heading_column);
        if temporary_heading {
            let gps = GpsHeadingOptions {
                heading_column: options.heading_column.clone(),
                ..GpsHeadingOptions::default()
            };
            self.add_gps_heading_column(&gps)?;
        }

        let result = builtins::add_rotation_speed_column(self.require_data_mut()?, options);
        if result.is_ok() {
            self.sync_channel_added(&options.rotation_speed_column);
        }
        if temporary_heading {
            self.remove_column(&options.heading_column)?;
        }
        result
    }

    /// Append an oversteer column from rotation speed and gyro Z. When the
    /// rotation speed column is absent it is derived for the computation and
    /// removed again afterwards.
    pub fn add_oversteer_column(&mut self, options: &OversteerOptions) -> Result<()> {
        let data = self.require_data()?;
        if !data.has_column(&options.gyro_z_column) {
            return Err(VboError::ColumnNotFound(options.gyro_z_column.clone()));
        }

        let temporary_rotation = !data.has_column(&options.rotation_speed_column);
        if temporary_rotation {
            let rotation = RotationSpeedOptions {
                rotation_speed_column: options.rotation_speed_column.clone(),
                ..RotationSpeedOptions::default()
            };
            self.add_rotation_speed_column(&rotation)?;
        }

        let result = builtins::add_oversteer_column(self.require_data_mut()?, options);
        if result.is_ok() {
            self.sync_channel_added(&options.oversteer_column);
        }
        if temporary_rotation {
            self.remove_column(&options.rotation_speed_column)?;
        }
        result
    }

    /// Append a windowed average fuel consumption column.
    pub fn add_fuel_consumption_column(&mut self, options: &FuelConsumptionOptions) -> Result<()> {
        builtins::add_fuel_consumption_column(self.require_data_mut()?, options)?;
        self.sync_channel_added(&options.fuel_consumption_column);
        Ok(())
    }

    /// Remove a data column, dropping it from the `[header]` channel list as
    /// well when one exists.
    pub fn remove_column(&mut self, name: &str) -> Result<()> {
        self.require_data_mut()?.remove_column(name)?;
        self.sync_channel_removed(name);
        Ok(())
    }

    /// Add an `[avi]` video section plus the `avifileindex` and `avitime`
    /// columns video players use to sync footage, then move the section
    /// after `[laptiming]` when that section exists.
    pub fn add_avi_section(&mut self, options: &AviOptions) -> Result<()> {
        if !self.store.contains("avi") {
            self.store.insert_raw(
                "avi",
                vec![
                    options.video_file_name.clone(),
                    options.video_format.clone(),
                ],
            )?;
        }

        if !self.require_data()?.has_column("avifileindex") {
            let index = zero_pad(i64::from(options.file_index), 4);
            self.add_constant_column("avifileindex", &index)?;
        }

        if !self.require_data()?.has_column("avitime") {
            let avitime = AviTimeOptions {
                time_column: options.time_column.clone(),
                start_sync_time_ms: options.start_sync_time_ms,
                ..AviTimeOptions::default()
            };
            builtins::add_avitime_column(self.require_data_mut()?, &avitime)?;
            self.sync_channel_added("avitime");
        }

        self.store.move_after("avi", "laptiming");
        Ok(())
    }

    /// Render the document to a string.
    pub fn render(&self) -> Result<String> {
        Writer::new().render(&self.store)
    }

    /// Write the document to `path` atomically. The source path used for
    /// loading is never touched unless explicitly given here.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        Writer::new().write(&self.store, path)
    }

    fn require_data(&self) -> Result<&DataTable> {
        self.store
            .data()
            .ok_or_else(|| VboError::MissingSection(DATA_SECTION.to_string()))
    }

    fn require_data_mut(&mut self) -> Result<&mut DataTable> {
        self.store
            .data_mut()
            .ok_or_else(|| VboError::MissingSection(DATA_SECTION.to_string()))
    }

    /// Record a new channel in the `[header]` list, before its trailing
    /// blank lines.
    fn sync_channel_added(&mut self, name: &str) {
        let Some(lines) = self
            .store
            .get_mut(HEADER_SECTION)
            .and_then(|s| s.lines_mut())
        else {
            return;
        };
        if lines.iter().any(|l| l.trim() == name) {
            return;
        }
        let insert_at = lines
            .iter()
            .rposition(|l| !l.trim().is_empty())
            .map(|p| p + 1)
            .unwrap_or(0);
        lines.insert(insert_at, name.to_string());
    }

    fn sync_channel_removed(&mut self, name: &str) {
        if let Some(lines) = self
            .store
            .get_mut(HEADER_SECTION)
            .and_then(|s| s.lines_mut())
        {
            lines.retain(|l| l.trim() != name);
        }
    }
}
