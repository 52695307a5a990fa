//! Appending time slices from a new source.

use array_store::ArrayStore;
use chrono::{DateTime, Utc};
use grid_common::{CfTimeUnits, CommonError, DataType, GridArray, Variable};
use grid_source::{AxisError, GridSource, TimeAxis};
use tracing::{debug, warn};

use crate::config::ArchiveConfig;
use crate::error::{ArchiveError, Result, SchemaError};
use crate::schema::ArchiveSchema;

/// Outcome of one append call.
#[derive(Debug, Clone, PartialEq)]
pub struct AppendReport {
    /// Location of the source the slices came from.
    pub source: String,
    /// Grid variables written, in configured order.
    pub variables: Vec<String>,
    /// Cursor position before the call.
    pub first_offset: usize,
    pub steps_written: usize,
    /// Calendar time of each written step.
    pub timestamps: Vec<DateTime<Utc>>,
}

struct GridPlan<'s> {
    name: &'s str,
    target: &'s Variable,
    slice_shape: Vec<usize>,
    time: TimeAxis,
}

/// How timestamps are encoded into the archive's time variable.
struct TimeTarget<'s> {
    name: &'s str,
    data_type: DataType,
    units: Option<CfTimeUnits>,
}

/// Writes every time step of the configured grid variables at the archive
/// cursor.
///
/// All grids of one call share the cursor: step `i` of every grid lands at
/// `first_offset + i`, and the cursor advances once per step after all
/// grids (and the optional time coordinate) for that step are written. A
/// failure leaves earlier steps written and counted; a step whose slices
/// cannot all be read is not written at all.
pub struct SliceAppender<'a> {
    config: &'a ArchiveConfig,
    schema: &'a ArchiveSchema,
}

impl<'a> SliceAppender<'a> {
    pub fn new(config: &'a ArchiveConfig, schema: &'a ArchiveSchema) -> Self {
        Self { config, schema }
    }

    /// Append all time steps of `source`, advancing `cursor` per step.
    pub fn append<S: ArrayStore + ?Sized>(
        &self,
        store: &mut S,
        source: &dyn GridSource,
        cursor: &mut usize,
    ) -> Result<AppendReport> {
        let plans = self.plan(source)?;
        let time_target = self.time_target()?;
        let steps = plans.first().map(|p| p.time.len()).unwrap_or(0);

        let first_offset = *cursor;
        let mut timestamps = Vec::with_capacity(steps);
        for index in 0..steps {
            match self.write_step(store, source, &plans, time_target.as_ref(), index, *cursor) {
                Ok(timestamp) => {
                    timestamps.push(timestamp);
                    *cursor += 1;
                }
                Err(e) => {
                    if index > 0 {
                        warn!(
                            source = %source.location(),
                            steps_written = index,
                            cursor = *cursor,
                            error = %e,
                            "Append failed after partial write; completed steps remain in the archive"
                        );
                    }
                    return Err(e);
                }
            }
        }

        Ok(AppendReport {
            source: source.location().to_string(),
            variables: plans.iter().map(|p| p.name.to_string()).collect(),
            first_offset,
            steps_written: steps,
            timestamps,
        })
    }

    /// Resolve every configured grid in the source and the archive before
    /// anything is written.
    fn plan(&self, source: &dyn GridSource) -> Result<Vec<GridPlan<'a>>> {
        if self.config.grid_variables.is_empty() {
            return Err(ArchiveError::Config(
                "no grid variables configured for append".to_string(),
            ));
        }

        let config: &'a ArchiveConfig = self.config;
        let schema: &'a ArchiveSchema = self.schema;
        let mut plans: Vec<GridPlan<'a>> = Vec::with_capacity(config.grid_variables.len());
        for name in &config.grid_variables {
            if !source.has_grid(name) {
                return Err(ArchiveError::VariableNotFound {
                    name: name.clone(),
                    location: source.location().to_string(),
                });
            }
            let target = schema
                .variable(name)
                .ok_or_else(|| ArchiveError::VariableNotFound {
                    name: name.clone(),
                    location: "archive".to_string(),
                })?;
            if !schema.is_record_variable(target) {
                return Err(SchemaError::NotRecordVariable(name.clone()).into());
            }

            let time = TimeAxis::try_from_raw(source.time_axis(name)?)?;
            if let Some(first) = plans.first() {
                if first.time.len() != time.len() {
                    return Err(AxisError::Mismatch(format!(
                        "grid '{}' has {} time steps but '{}' has {} in {}",
                        name,
                        time.len(),
                        first.name,
                        first.time.len(),
                        source.location()
                    ))
                    .into());
                }
            }

            plans.push(GridPlan {
                name: name.as_str(),
                target,
                slice_shape: schema.slice_shape(target),
                time,
            });
        }
        Ok(plans)
    }

    fn time_target(&self) -> Result<Option<TimeTarget<'a>>> {
        if !self.config.write_time_coordinate {
            return Ok(None);
        }
        let schema: &'a ArchiveSchema = self.schema;
        let name = self.config.unlimited_dimension.as_str();
        let var = schema
            .variable(name)
            .filter(|v| v.rank() == 1 && schema.is_record_variable(v))
            .ok_or_else(|| SchemaError::MissingTimeVariable(name.to_string()))?;
        Ok(Some(TimeTarget {
            name: var.name.as_str(),
            data_type: var.data_type,
            units: var
                .attributes
                .get_str("units")
                .and_then(|u| CfTimeUnits::parse(u).ok()),
        }))
    }

    /// Write step `index` of every grid at `offset`. All slices are read,
    /// checked and converted before the first write, so a source failure
    /// leaves no partial record behind.
    fn write_step<S: ArrayStore + ?Sized>(
        &self,
        store: &mut S,
        source: &dyn GridSource,
        plans: &[GridPlan<'_>],
        time_target: Option<&TimeTarget<'_>>,
        index: usize,
        offset: usize,
    ) -> Result<DateTime<Utc>> {
        let mut blocks = Vec::with_capacity(plans.len());
        for plan in plans {
            let slice = source.read_slice(plan.name, index)?;
            if slice.shape() != plan.slice_shape.as_slice() {
                return Err(SchemaError::SliceShape {
                    variable: plan.name.to_string(),
                    expected: plan.slice_shape.clone(),
                    actual: slice.shape().to_vec(),
                }
                .into());
            }
            blocks.push(to_record_block(plan.name, slice, plan.target.data_type)?);
        }

        // Steps are aligned across grids, so the first grid's axis dates them.
        let axis = &plans[0].time;
        let raw_offset = axis.values[index];
        let timestamp = axis.units.to_datetime(raw_offset);

        let time_block = match time_target {
            Some(target) => {
                let value = match &target.units {
                    Some(units) => units.to_offset(timestamp),
                    None => raw_offset,
                };
                let block = convert(target.name, target.data_type, vec![1], &[value])?;
                Some((target.name, block))
            }
            None => None,
        };

        for (plan, block) in plans.iter().zip(&blocks) {
            let mut origin = vec![0; block.rank()];
            origin[0] = offset;
            store.write(plan.name, &origin, block)?;
            debug!(variable = %plan.name, time_index = index, offset, "Wrote slice");
        }
        if let Some((name, block)) = time_block {
            store.write(name, &[offset], &block)?;
        }

        Ok(timestamp)
    }
}

/// Build a `data_type` array from `f64` values, naming `variable` when a
/// value does not fit.
fn convert(
    variable: &str,
    data_type: DataType,
    shape: Vec<usize>,
    values: &[f64],
) -> Result<GridArray> {
    GridArray::from_f64(data_type, shape, values).map_err(|e| match e {
        CommonError::Unrepresentable { value, data_type } => SchemaError::ValueOutOfRange {
            variable: variable.to_string(),
            data_type,
            value,
        }
        .into(),
        other => other.into(),
    })
}

/// Convert a slice to the archive type and add a leading record axis.
fn to_record_block(variable: &str, slice: GridArray, data_type: DataType) -> Result<GridArray> {
    let slice = if slice.data_type() == data_type {
        slice
    } else {
        convert(variable, data_type, slice.shape().to_vec(), &slice.to_f64_vec())?
    };
    let mut shape = Vec::with_capacity(slice.rank() + 1);
    shape.push(1);
    shape.extend_from_slice(slice.shape());
    Ok(slice.reshape(shape)?)
}
