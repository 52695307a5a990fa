//! The archive writer and its lifecycle.

use std::fmt;
use std::path::Path;

use array_store::ArrayStore;
use grid_common::GridArray;
use grid_source::{CoordinateAxis, GridOpener, GridSource};
use projection::{Crs, GeodesyError, GeodesyService};
use tracing::{debug, info, warn};

use crate::append::{AppendReport, SliceAppender};
use crate::config::ArchiveConfig;
use crate::coordinates::CoordinateProjector;
use crate::error::{ArchiveError, NotDefinedReason, Result};
use crate::schema::{ArchiveSchema, SchemaBuilder, LAT_VARIABLE, LON_VARIABLE};

/// Lifecycle state of an [`ArchiveWriter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveState {
    /// Store handle open, nothing defined.
    Created,
    /// Schema persisted; lat/lon not yet populated.
    Defined,
    /// Appends permitted.
    Ready,
    /// Unlimited dimension fixed and handle closed.
    Finalized,
    Closed,
}

impl fmt::Display for ArchiveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArchiveState::Created => "Created",
            ArchiveState::Defined => "Defined",
            ArchiveState::Ready => "Ready",
            ArchiveState::Finalized => "Finalized",
            ArchiveState::Closed => "Closed",
        };
        f.write_str(name)
    }
}

/// X/Y axes and CRS of the prototype's spatial grid.
#[derive(Debug, Clone)]
struct PrototypeGrid {
    x: CoordinateAxis,
    y: CoordinateAxis,
    crs: Crs,
}

/// Builds and grows a rolling archive.
///
/// The writer owns the store handle, the geodesy service, the schema and
/// the cursor along the unlimited dimension. A schema is derived once from
/// a prototype source with [`define`](Self::define); after
/// [`populate_coordinates`](Self::populate_coordinates) the archive is
/// ready for [`append`](Self::append) calls, each adding every time step of
/// a new source. [`finalize`](Self::finalize) fixes the unlimited dimension
/// and closes the store.
///
/// One writer per archive; the writer performs no locking.
pub struct ArchiveWriter<S: ArrayStore, G: GeodesyService> {
    store: S,
    geodesy: G,
    config: ArchiveConfig,
    state: ArchiveState,
    schema: Option<ArchiveSchema>,
    prototype: Option<PrototypeGrid>,
    cursor: usize,
}

impl<S: ArrayStore, G: GeodesyService> ArchiveWriter<S, G> {
    /// Create a writer over a fresh store in define mode.
    pub fn new(store: S, geodesy: G, config: ArchiveConfig) -> Result<Self> {
        config.validate().map_err(ArchiveError::Config)?;
        Ok(Self {
            store,
            geodesy,
            config,
            state: ArchiveState::Created,
            schema: None,
            prototype: None,
            cursor: 0,
        })
    }

    /// Resume an archive that was created earlier.
    ///
    /// The schema is read back from the store and the cursor set to the
    /// current length of the unlimited dimension. Prototype geometry is not
    /// persisted, so [`crs`](Self::crs) and the coordinate accessors report
    /// [`NotDefinedReason::PrototypeUnavailable`].
    pub fn open_existing(store: S, geodesy: G, config: ArchiveConfig) -> Result<Self> {
        config.validate().map_err(ArchiveError::Config)?;
        if store.mode() == array_store::StoreMode::Define {
            return Err(ArchiveError::wrong_state(
                "open_existing",
                ArchiveState::Created,
            ));
        }

        let schema = ArchiveSchema::from_store(store.schema()?, &config);
        let cursor = schema
            .unlimited_dimension
            .as_deref()
            .and_then(|name| schema.dimension(name))
            .map(|d| d.length)
            .unwrap_or(0);

        info!(
            variables = schema.variables.len(),
            cursor,
            unlimited = ?schema.unlimited_dimension,
            "Opened existing archive"
        );

        Ok(Self {
            store,
            geodesy,
            config,
            state: ArchiveState::Ready,
            schema: Some(schema),
            prototype: None,
            cursor,
        })
    }

    /// Derive the schema from `prototype` and persist it.
    ///
    /// `Created → Defined`. A second call fails with
    /// [`NotDefinedReason::AlreadyDefined`] and leaves the schema as it was.
    /// If persisting the schema fails the store may hold part of it, so the
    /// writer closes and only reports the persist error.
    pub fn define(&mut self, prototype: &dyn GridSource) -> Result<&ArchiveSchema> {
        match self.state {
            ArchiveState::Created => {}
            ArchiveState::Closed => {
                return Err(ArchiveError::wrong_state("define", self.state));
            }
            _ => return Err(ArchiveError::NotDefined(NotDefinedReason::AlreadyDefined)),
        }

        if prototype.grid_names().is_empty() {
            return Err(ArchiveError::UnsupportedDataset {
                location: prototype.location().to_string(),
                reason: "dataset contains no grids".to_string(),
            });
        }

        let schema = SchemaBuilder::new(&self.config).build(prototype)?;
        let geometry = self.resolve_geometry(prototype);
        let geometry = match geometry {
            Ok(grid) => Some(grid),
            Err(e) if self.config.exclusions.replace_xy_with_lat_lon() => return Err(e),
            Err(e) => {
                debug!(
                    source = %prototype.location(),
                    error = %e,
                    "Prototype geometry unavailable"
                );
                None
            }
        };

        if let Err(e) = self.persist(&schema) {
            self.state = ArchiveState::Closed;
            if let Err(close_err) = self.store.close() {
                debug!(error = %close_err, "Close after failed define also failed");
            }
            warn!(error = %e, "Define failed while persisting schema; writer closed");
            return Err(e);
        }

        info!(
            source = %prototype.location(),
            dimensions = schema.dimensions.len(),
            variables = schema.variables.len(),
            crs = geometry.as_ref().map(|g| g.crs.mapping_name()),
            "Archive defined"
        );

        self.prototype = geometry;
        self.state = ArchiveState::Defined;
        Ok(self.schema.insert(schema))
    }

    /// Open `path` and [`define`](Self::define) from it. The source is
    /// released before this returns, on success or failure.
    pub fn define_from_path(
        &mut self,
        opener: &dyn GridOpener,
        path: impl AsRef<Path>,
    ) -> Result<&ArchiveSchema> {
        if self.state != ArchiveState::Created {
            return self.define_guard_error();
        }
        let source = opener.open(path.as_ref())?;
        self.define(source.as_ref())
    }

    fn define_guard_error(&self) -> Result<&ArchiveSchema> {
        match self.state {
            ArchiveState::Closed => Err(ArchiveError::wrong_state("define", self.state)),
            _ => Err(ArchiveError::NotDefined(NotDefinedReason::AlreadyDefined)),
        }
    }

    fn resolve_geometry(&self, prototype: &dyn GridSource) -> Result<PrototypeGrid> {
        let cs = prototype.coordinate_system().ok_or_else(|| {
            GeodesyError::resolution("<none>", "source declares no coordinate system")
        })?;
        let crs = self.geodesy.resolve_crs(cs)?;
        let x = CoordinateAxis::try_from_raw(prototype.x_axis()?)?;
        let y = CoordinateAxis::try_from_raw(prototype.y_axis()?)?;
        Ok(PrototypeGrid { x, y, crs })
    }

    fn persist(&mut self, schema: &ArchiveSchema) -> Result<()> {
        for dim in &schema.dimensions {
            if dim.unlimited {
                self.store.add_unlimited_dimension(&dim.name)?;
            } else {
                self.store.add_dimension(&dim.name, dim.length)?;
            }
        }
        for var in &schema.variables {
            self.store
                .add_variable(&var.name, var.data_type, &var.dimensions)?;
            for (name, value) in var.attributes.iter() {
                self.store
                    .set_variable_attribute(&var.name, name, value.clone())?;
            }
        }
        for (name, value) in schema.global_attributes.iter() {
            self.store.set_global_attribute(name, value.clone())?;
        }
        self.store.create()?;
        Ok(())
    }

    /// Write `lat`/`lon` if the schema has them. `Defined → Ready`.
    pub fn populate_coordinates(&mut self) -> Result<()> {
        if self.state != ArchiveState::Defined {
            return Err(ArchiveError::wrong_state("populate_coordinates", self.state));
        }
        let has_lat_lon = self.schema.as_ref().map(ArchiveSchema::has_lat_lon).unwrap_or(false);

        if has_lat_lon {
            let grid = self
                .prototype
                .as_ref()
                .ok_or(ArchiveError::NotDefined(NotDefinedReason::PrototypeUnavailable))?;
            let latlon =
                CoordinateProjector::new(&self.geodesy).project(&grid.x, &grid.y, &grid.crs)?;
            if latlon.lat.iter().any(|v| v.is_nan()) {
                warn!(
                    mapping = grid.crs.mapping_name(),
                    "Some grid cells have no geographic position and were written as NaN"
                );
            }
            self.store.write(LAT_VARIABLE, &[0, 0], &latlon.lat_array()?)?;
            self.store.write(LON_VARIABLE, &[0, 0], &latlon.lon_array()?)?;
            info!(ny = latlon.ny, nx = latlon.nx, "Wrote lat/lon coordinates");
        }

        self.state = ArchiveState::Ready;
        Ok(())
    }

    /// Append every time step of the configured grid variables in `source`.
    ///
    /// Not transactional: if a step fails, the steps before it stay written
    /// and counted in the cursor.
    pub fn append(&mut self, source: &dyn GridSource) -> Result<AppendReport> {
        if self.state != ArchiveState::Ready {
            return Err(ArchiveError::wrong_state("append", self.state));
        }
        let schema = self
            .schema
            .as_ref()
            .ok_or_else(|| ArchiveError::wrong_state("append", self.state))?;

        let report = SliceAppender::new(&self.config, schema).append(
            &mut self.store,
            source,
            &mut self.cursor,
        )?;

        info!(
            source = %report.source,
            steps = report.steps_written,
            first_offset = report.first_offset,
            cursor = self.cursor,
            "Appended source"
        );
        Ok(report)
    }

    /// Open `path` and [`append`](Self::append) it. The source is released
    /// before this returns, on success or failure.
    pub fn add_file(
        &mut self,
        opener: &dyn GridOpener,
        path: impl AsRef<Path>,
    ) -> Result<AppendReport> {
        if self.state != ArchiveState::Ready {
            return Err(ArchiveError::wrong_state("add_file", self.state));
        }
        let source = opener.open(path.as_ref())?;
        self.append(source.as_ref())
    }

    pub fn flush(&mut self) -> Result<()> {
        if self.state != ArchiveState::Ready {
            return Err(ArchiveError::wrong_state("flush", self.state));
        }
        self.store.flush()?;
        Ok(())
    }

    /// Fix the unlimited dimension at the cursor and close the store.
    /// Records past the cursor, left by a failed append, are dropped.
    /// `Ready → Finalized`; no appends afterwards.
    pub fn finalize(&mut self) -> Result<()> {
        if self.state != ArchiveState::Ready {
            return Err(ArchiveError::wrong_state("finalize", self.state));
        }
        self.store.fix_unlimited_dimension(self.cursor)?;
        if let Some(schema) = self.schema.as_mut() {
            if let Some(name) = schema.unlimited_dimension.take() {
                if let Some(dim) = schema.dimensions.iter_mut().find(|d| d.name == name) {
                    dim.unlimited = false;
                    dim.length = self.cursor;
                }
            }
        }

        let closed = self.store.close();
        self.state = ArchiveState::Finalized;
        closed?;
        info!(length = self.cursor, "Archive finalized");
        Ok(())
    }

    /// Release the store handle. A second close fails with the store's
    /// error.
    pub fn close(&mut self) -> Result<()> {
        let previous = self.state;
        self.state = ArchiveState::Closed;
        self.store.close()?;
        info!(previous = %previous, cursor = self.cursor, "Archive closed");
        Ok(())
    }

    pub fn state(&self) -> ArchiveState {
        self.state
    }

    /// Next write offset along the unlimited dimension.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    pub fn schema(&self) -> Result<&ArchiveSchema> {
        self.schema
            .as_ref()
            .ok_or_else(|| ArchiveError::wrong_state("schema", self.state))
    }

    fn prototype(&self, operation: &'static str) -> Result<&PrototypeGrid> {
        if self.schema.is_none() {
            return Err(ArchiveError::wrong_state(operation, self.state));
        }
        self.prototype
            .as_ref()
            .ok_or(ArchiveError::NotDefined(NotDefinedReason::PrototypeUnavailable))
    }

    /// CRS of the prototype grid.
    pub fn crs(&self) -> Result<&Crs> {
        Ok(&self.prototype("crs")?.crs)
    }

    /// Prototype X axis values, as stored in the source.
    pub fn x_coords(&self) -> Result<&[f64]> {
        Ok(&self.prototype("x_coords")?.x.values)
    }

    /// Prototype Y axis values, as stored in the source.
    pub fn y_coords(&self) -> Result<&[f64]> {
        Ok(&self.prototype("y_coords")?.y.values)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Read a block of an archive variable.
    pub fn read_variable(&self, name: &str, origin: &[usize], shape: &[usize]) -> Result<GridArray> {
        match self.state {
            ArchiveState::Defined | ArchiveState::Ready => {}
            state => return Err(ArchiveError::wrong_state("read_variable", state)),
        }
        Ok(self.store.read(name, origin, shape)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use array_store::MemoryArrayStore;
    use projection::CfGeodesy;

    fn writer() -> ArchiveWriter<MemoryArrayStore, CfGeodesy> {
        ArchiveWriter::new(
            MemoryArrayStore::new(),
            CfGeodesy::default(),
            ArchiveConfig::new(["temp"]),
        )
        .unwrap()
    }

    #[test]
    fn test_new_validates_config() {
        let err = ArchiveWriter::new(
            MemoryArrayStore::new(),
            CfGeodesy::default(),
            ArchiveConfig::new(["temp", "temp"]),
        )
        .err()
        .unwrap();
        assert!(matches!(err, ArchiveError::Config(_)));
    }

    #[test]
    fn test_accessors_before_define() {
        let w = writer();
        assert_eq!(w.state(), ArchiveState::Created);
        assert_eq!(w.cursor(), 0);
        for err in [
            w.schema().err(),
            w.crs().err(),
            w.x_coords().err(),
            w.read_variable("temp", &[0], &[1]).err(),
        ] {
            assert!(matches!(
                err,
                Some(ArchiveError::NotDefined(NotDefinedReason::WrongState {
                    state: ArchiveState::Created,
                    ..
                }))
            ));
        }
    }

    #[test]
    fn test_operations_out_of_order() {
        let mut w = writer();
        assert!(matches!(
            w.populate_coordinates(),
            Err(ArchiveError::NotDefined(NotDefinedReason::WrongState { operation: "populate_coordinates", .. }))
        ));
        assert!(w.flush().is_err());
        assert!(w.finalize().is_err());
        assert_eq!(w.state(), ArchiveState::Created);
    }

    #[test]
    fn test_open_existing_requires_created_store() {
        let err = ArchiveWriter::open_existing(
            MemoryArrayStore::new(),
            CfGeodesy::default(),
            ArchiveConfig::default(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, ArchiveError::NotDefined(_)));
    }

    #[test]
    fn test_close_from_created() {
        let mut w = writer();
        w.close().unwrap();
        assert_eq!(w.state(), ArchiveState::Closed);
        assert!(matches!(w.close(), Err(ArchiveError::Io(_))));
    }
}
