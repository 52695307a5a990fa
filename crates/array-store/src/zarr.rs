//! Zarr V3 array store on the local filesystem.
//!
//! Every variable is stored as its own Zarr array at `/<name>`; scalars are
//! stored as one-element arrays. The archive manifest (dimensions, variable
//! order, types and attributes) lives in the root group attributes so the
//! store can be reopened. Record variables are chunked one record at a time
//! so an append only touches new chunks, and their array metadata is
//! rewritten whenever the unlimited dimension changes length.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use grid_common::{ArrayValues, AttributeValue, DataType, Dimension, GridArray, Variable};
use tracing::{debug, info};
use zarrs::array::codec::bytes_to_bytes::blosc::{
    BloscCodec, BloscCompressionLevel, BloscCompressor, BloscShuffleMode,
};
use zarrs::array::{Array, ArrayBuilder, DataType as ZarrDataType, FillValue};
use zarrs::array_subset::ArraySubset;
use zarrs::group::{Group, GroupBuilder};
use zarrs_filesystem::FilesystemStore;

use crate::config::{ZarrCompression, ZarrStoreConfig};
use crate::error::{StoreError, StoreResult};
use crate::schema::StoreSchema;
use crate::store::{ArrayStore, StoreMode};

/// Root group attribute holding the serialized [`StoreSchema`].
pub const MANIFEST_KEY: &str = "rolling_archive";

/// Filesystem-backed Zarr V3 store.
pub struct ZarrArrayStore {
    root: PathBuf,
    store: Arc<FilesystemStore>,
    config: ZarrStoreConfig,
    schema: StoreSchema,
    arrays: HashMap<String, Array<FilesystemStore>>,
    mode: StoreMode,
}

fn array_path(name: &str) -> String {
    format!("/{}", name)
}

fn zarr_type(data_type: DataType) -> (ZarrDataType, FillValue) {
    match data_type {
        DataType::Byte => (ZarrDataType::Int8, FillValue::from(-127i8)),
        DataType::Short => (ZarrDataType::Int16, FillValue::from(-32767i16)),
        DataType::Int => (ZarrDataType::Int32, FillValue::from(-2147483647i32)),
        DataType::Long => (ZarrDataType::Int64, FillValue::from(-9223372036854775806i64)),
        DataType::Float => (ZarrDataType::Float32, FillValue::from(f32::NAN)),
        DataType::Double => (ZarrDataType::Float64, FillValue::from(f64::NAN)),
    }
}

fn to_json(value: &AttributeValue) -> StoreResult<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| StoreError::Manifest(e.to_string()))
}

/// Start and shape of a block as a Zarr subset. Scalars occupy `[0..1]`.
fn subset(origin: &[usize], shape: &[usize]) -> StoreResult<ArraySubset> {
    let (start, shape) = if shape.is_empty() {
        (vec![0], vec![1])
    } else {
        (
            origin.iter().map(|o| *o as u64).collect(),
            shape.iter().map(|n| *n as u64).collect(),
        )
    };
    ArraySubset::new_with_start_shape(start, shape).map_err(StoreError::zarr)
}

impl ZarrArrayStore {
    /// Start a new store at `root` in define mode.
    pub fn new(root: impl AsRef<Path>, config: ZarrStoreConfig) -> StoreResult<Self> {
        config.validate().map_err(StoreError::Config)?;
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        let store = Arc::new(FilesystemStore::new(&root).map_err(StoreError::zarr)?);

        Ok(Self {
            root,
            store,
            config,
            schema: StoreSchema::default(),
            arrays: HashMap::new(),
            mode: StoreMode::Define,
        })
    }

    /// Reopen an existing store in data mode.
    pub fn open(root: impl AsRef<Path>, config: ZarrStoreConfig) -> StoreResult<Self> {
        config.validate().map_err(StoreError::Config)?;
        let root = root.as_ref().to_path_buf();
        let store = Arc::new(FilesystemStore::new(&root).map_err(StoreError::zarr)?);

        let group = Group::open(store.clone(), "/").map_err(StoreError::zarr)?;
        let manifest = group.attributes().get(MANIFEST_KEY).cloned().ok_or_else(|| {
            StoreError::Manifest(format!("{} has no '{}' attribute", root.display(), MANIFEST_KEY))
        })?;
        let mut schema: StoreSchema =
            serde_json::from_value(manifest).map_err(|e| StoreError::Manifest(e.to_string()))?;

        let mut arrays = HashMap::new();
        for var in &schema.variables {
            let array =
                Array::open(store.clone(), &array_path(&var.name)).map_err(StoreError::zarr)?;
            arrays.insert(var.name.clone(), array);
        }

        // Records written after the last manifest update still count.
        if let Some(unlimited) = schema.unlimited_dimension().cloned() {
            let stored = schema
                .variables
                .iter()
                .filter(|v| schema.is_record_variable(v))
                .filter_map(|v| arrays.get(&v.name))
                .filter_map(|a| a.shape().first().map(|n| *n as usize))
                .max()
                .unwrap_or(0);
            schema.set_unlimited_length(stored.max(unlimited.length));
        }

        info!(
            root = %root.display(),
            variables = schema.variables.len(),
            "Opened Zarr archive store"
        );

        Ok(Self {
            root,
            store,
            config,
            schema,
            arrays,
            mode: StoreMode::Data,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Build (but do not store) the array for `var` at its current shape.
    fn build_array(&self, var: &Variable) -> StoreResult<Array<FilesystemStore>> {
        let record = self.schema.is_record_variable(var);
        let (array_shape, chunk_shape): (Vec<u64>, Vec<u64>) = if var.is_scalar() {
            (vec![1], vec![1])
        } else {
            self.schema
                .shape_of(var)
                .into_iter()
                .enumerate()
                .map(|(d, len)| {
                    let chunk = if d == 0 && record {
                        1
                    } else {
                        len.min(self.config.chunk_size).max(1)
                    };
                    (len as u64, chunk as u64)
                })
                .unzip()
        };

        let chunk_grid: zarrs::array::ChunkGrid = chunk_shape
            .try_into()
            .map_err(|e| StoreError::Zarr(format!("{:?}", e)))?;

        let mut attrs = serde_json::Map::new();
        attrs.insert(
            "_ARRAY_DIMENSIONS".to_string(),
            serde_json::json!(var.dimensions),
        );
        for (name, value) in var.attributes.iter() {
            attrs.insert(name.to_string(), to_json(value)?);
        }

        let (data_type, fill_value) = zarr_type(var.data_type);
        let mut binding = ArrayBuilder::new(array_shape, data_type, chunk_grid, fill_value);
        let mut builder = binding.attributes(attrs);

        if self.config.compression != ZarrCompression::None {
            let codec = self.create_compression_codec(var.data_type)?;
            builder = builder.bytes_to_bytes_codecs(vec![codec]);
        }

        builder
            .build(self.store.clone(), &array_path(&var.name))
            .map_err(StoreError::zarr)
    }

    /// Create the compression codec based on configuration.
    fn create_compression_codec(
        &self,
        data_type: DataType,
    ) -> StoreResult<Arc<dyn zarrs::array::codec::BytesToBytesCodecTraits>> {
        let level = BloscCompressionLevel::try_from(self.config.compression_level)
            .map_err(|_| StoreError::Config("Invalid compression level".to_string()))?;

        let shuffle = if self.config.shuffle {
            BloscShuffleMode::Shuffle
        } else {
            BloscShuffleMode::NoShuffle
        };

        // typesize is required when shuffle is enabled
        let typesize = if self.config.shuffle {
            Some(data_type.size_bytes())
        } else {
            None
        };

        let compressor = match self.config.compression {
            ZarrCompression::None => {
                return Err(StoreError::Config("No compression configured".to_string()))
            }
            ZarrCompression::BloscLz4 => BloscCompressor::LZ4,
            ZarrCompression::BloscZstd => BloscCompressor::Zstd,
        };

        let codec = BloscCodec::new(compressor, level, None, shuffle, typesize)
            .map_err(|e| StoreError::Config(e.to_string()))?;

        Ok(Arc::new(codec))
    }

    fn store_array(&mut self, var: &Variable) -> StoreResult<()> {
        let array = self.build_array(var)?;
        array.store_metadata().map_err(StoreError::zarr)?;
        self.arrays.insert(var.name.clone(), array);
        Ok(())
    }

    fn write_manifest(&self) -> StoreResult<()> {
        let mut attrs = serde_json::Map::new();
        for (name, value) in self.schema.global_attributes.iter() {
            attrs.insert(name.to_string(), to_json(value)?);
        }
        attrs.insert(
            MANIFEST_KEY.to_string(),
            serde_json::to_value(&self.schema).map_err(|e| StoreError::Manifest(e.to_string()))?,
        );

        let group = GroupBuilder::new()
            .attributes(attrs)
            .build(self.store.clone(), "/")
            .map_err(StoreError::zarr)?;
        group.store_metadata().map_err(StoreError::zarr)
    }

    /// Set the unlimited length and rewrite record array metadata to match.
    fn resize_records(&mut self, length: usize) -> StoreResult<()> {
        self.schema.set_unlimited_length(length);
        let records: Vec<Variable> = self
            .schema
            .variables
            .iter()
            .filter(|v| self.schema.is_record_variable(v))
            .cloned()
            .collect();
        for var in &records {
            self.store_array(var)?;
        }
        debug!(length, arrays = records.len(), "Resized unlimited dimension");
        Ok(())
    }

    fn array(&self, variable: &str) -> StoreResult<&Array<FilesystemStore>> {
        self.arrays
            .get(variable)
            .ok_or_else(|| StoreError::UnknownVariable(variable.to_string()))
    }
}

impl ArrayStore for ZarrArrayStore {
    fn mode(&self) -> StoreMode {
        self.mode
    }

    fn add_dimension(&mut self, name: &str, length: usize) -> StoreResult<()> {
        self.mode.require_define("add_dimension")?;
        self.schema.add_dimension(Dimension::fixed(name, length))
    }

    fn add_unlimited_dimension(&mut self, name: &str) -> StoreResult<()> {
        self.mode.require_define("add_unlimited_dimension")?;
        self.schema.add_dimension(Dimension::unlimited(name, 0))
    }

    fn add_variable(
        &mut self,
        name: &str,
        data_type: DataType,
        dimensions: &[String],
    ) -> StoreResult<()> {
        self.mode.require_define("add_variable")?;
        self.schema.add_variable(name, data_type, dimensions)
    }

    fn set_variable_attribute(
        &mut self,
        variable: &str,
        name: &str,
        value: AttributeValue,
    ) -> StoreResult<()> {
        self.mode.require_define("set_variable_attribute")?;
        self.schema.set_variable_attribute(variable, name, value)
    }

    fn set_global_attribute(&mut self, name: &str, value: AttributeValue) -> StoreResult<()> {
        self.mode.require_define("set_global_attribute")?;
        self.schema.global_attributes.set(name, value);
        Ok(())
    }

    fn create(&mut self) -> StoreResult<()> {
        self.mode.require_define("create")?;
        let variables = self.schema.variables.clone();
        for var in &variables {
            self.store_array(var)?;
        }
        self.write_manifest()?;
        self.mode = StoreMode::Data;

        info!(
            root = %self.root.display(),
            variables = variables.len(),
            compression = %self.config.compression,
            "Created Zarr archive store"
        );
        Ok(())
    }

    fn write(&mut self, variable: &str, origin: &[usize], data: &GridArray) -> StoreResult<()> {
        self.mode.require_data("write")?;
        if let Some(length) = self.schema.plan_write(variable, origin, data)? {
            self.resize_records(length)?;
        }
        if data.is_empty() {
            return Ok(());
        }

        let array = self.array(variable)?;
        let subset = subset(origin, data.shape())?;
        match data.values() {
            ArrayValues::Byte(v) => array.store_array_subset_elements(&subset, v.as_slice()),
            ArrayValues::Short(v) => array.store_array_subset_elements(&subset, v.as_slice()),
            ArrayValues::Int(v) => array.store_array_subset_elements(&subset, v.as_slice()),
            ArrayValues::Long(v) => array.store_array_subset_elements(&subset, v.as_slice()),
            ArrayValues::Float(v) => array.store_array_subset_elements(&subset, v.as_slice()),
            ArrayValues::Double(v) => array.store_array_subset_elements(&subset, v.as_slice()),
        }
        .map_err(StoreError::zarr)
    }

    fn read(&self, variable: &str, origin: &[usize], shape: &[usize]) -> StoreResult<GridArray> {
        self.mode.require_data("read")?;
        let var = self.schema.check_read(variable, origin, shape)?;
        if shape.iter().product::<usize>() == 0 {
            return Ok(GridArray::filled(var.data_type, shape.to_vec()));
        }

        let array = self.array(variable)?;
        let subset = subset(origin, shape)?;
        let values = match var.data_type {
            DataType::Byte => ArrayValues::Byte(
                array
                    .retrieve_array_subset_elements::<i8>(&subset)
                    .map_err(StoreError::zarr)?,
            ),
            DataType::Short => ArrayValues::Short(
                array
                    .retrieve_array_subset_elements::<i16>(&subset)
                    .map_err(StoreError::zarr)?,
            ),
            DataType::Int => ArrayValues::Int(
                array
                    .retrieve_array_subset_elements::<i32>(&subset)
                    .map_err(StoreError::zarr)?,
            ),
            DataType::Long => ArrayValues::Long(
                array
                    .retrieve_array_subset_elements::<i64>(&subset)
                    .map_err(StoreError::zarr)?,
            ),
            DataType::Float => ArrayValues::Float(
                array
                    .retrieve_array_subset_elements::<f32>(&subset)
                    .map_err(StoreError::zarr)?,
            ),
            DataType::Double => ArrayValues::Double(
                array
                    .retrieve_array_subset_elements::<f64>(&subset)
                    .map_err(StoreError::zarr)?,
            ),
        };
        Ok(GridArray::new(shape.to_vec(), values)?)
    }

    fn flush(&mut self) -> StoreResult<()> {
        self.mode.require_data("flush")?;
        self.write_manifest()
    }

    fn fix_unlimited_dimension(&mut self, length: usize) -> StoreResult<()> {
        self.mode.require_data("fix_unlimited_dimension")?;
        self.schema.check_fix(length)?;
        let current = self.schema.unlimited_dimension().map(|d| d.length);
        if current.is_some_and(|c| c != length) {
            self.resize_records(length)?;
        }
        if let Some(dim) = self.schema.fix_unlimited() {
            debug!(dimension = %dim.name, length = dim.length, "Fixed unlimited dimension");
        }
        self.write_manifest()
    }

    fn close(&mut self) -> StoreResult<()> {
        match self.mode {
            StoreMode::Closed => return Err(StoreError::Closed),
            StoreMode::Data => self.write_manifest()?,
            StoreMode::Define => {}
        }
        self.mode = StoreMode::Closed;
        self.arrays.clear();
        debug!(root = %self.root.display(), "Closed Zarr archive store");
        Ok(())
    }

    fn schema(&self) -> StoreResult<StoreSchema> {
        if self.mode == StoreMode::Closed {
            return Err(StoreError::Closed);
        }
        Ok(self.schema.clone())
    }
}
