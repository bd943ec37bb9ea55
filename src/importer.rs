use std::fs::File;
use std::path::Path;

use arrow::array::{
    Array, ArrayRef, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array,
    LargeListArray, ListArray,
};
use arrow::datatypes::DataType;
use log::debug;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ProjectionMask;

use crate::data::model::{Column, EventCollection};
use crate::data::schema::{FieldKind, FieldSchema, ShapeClass};
use crate::error::{Error, Result};
use crate::reader::{FileHandle, TreePath};

// ---------------------------------------------------------------------------
// FieldRequest – which fields to pull out of the tree
// ---------------------------------------------------------------------------

/// Selection of fields to import: a flat ordered list, a grouped mapping
/// (logical group name → field names), or every importable field.
#[derive(Debug, Clone)]
pub enum FieldRequest {
    Flat(Vec<String>),
    Grouped(Vec<(String, Vec<String>)>),
    All,
}

impl FieldRequest {
    pub fn flat<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldRequest::Flat(names.into_iter().map(Into::into).collect())
    }

    pub fn grouped<G, I, S>(groups: impl IntoIterator<Item = (G, I)>) -> Self
    where
        G: Into<String>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldRequest::Grouped(
            groups
                .into_iter()
                .map(|(g, fields)| (g.into(), fields.into_iter().map(Into::into).collect()))
                .collect(),
        )
    }
}

// ---------------------------------------------------------------------------
// Importer
// ---------------------------------------------------------------------------

/// Extracts named fields from an open file handle into an [`EventCollection`].
///
/// The importer never closes the handle and never concatenates across files;
/// both belong to the caller (normally the `Processor`).
#[derive(Debug, Clone, Default)]
pub struct Importer {
    tree: TreePath,
}

impl Importer {
    /// Importer addressing the default `EventNtuple/ntuple` path.
    pub fn new() -> Self {
        Importer::default()
    }

    /// Importer addressing a specific directory/tree path.
    pub fn with_tree(tree: TreePath) -> Self {
        Importer { tree }
    }

    /// Import the requested fields from the handle's file.
    pub fn import(&self, handle: &FileHandle, request: &FieldRequest) -> Result<EventCollection> {
        // The tree address must match what the file declares, before any
        // row is decoded.
        match handle.tree_path() {
            Some(declared) if *declared == self.tree => {}
            Some(declared) => {
                return Err(Error::structure(
                    handle.path(),
                    format!("tree '{}' requested, file declares '{declared}'", self.tree),
                ))
            }
            None => {
                return Err(Error::structure(
                    handle.path(),
                    format!("tree '{}' requested, file declares no ntuple path", self.tree),
                ))
            }
        }

        let (names, groups): (Vec<String>, Option<Vec<(String, Vec<String>)>>) = match request {
            FieldRequest::Flat(names) => (names.clone(), None),
            FieldRequest::Grouped(groups) => (
                groups.iter().flat_map(|(_, f)| f.iter().cloned()).collect(),
                Some(groups.clone()),
            ),
            FieldRequest::All => (
                handle.registry().importable_names().map(String::from).collect(),
                None,
            ),
        };

        // Validate every requested field against the typed registry.
        let schemas: Vec<(String, FieldSchema)> = names
            .iter()
            .map(|n| handle.registry().resolve(n).map(|s| (n.clone(), s)))
            .collect::<Result<_>>()?;

        let columns = self.read_columns(handle.path(), &schemas)?;
        let mut collection = EventCollection::from_columns(columns)?;
        if let Some(groups) = groups {
            for (group, fields) in groups {
                collection.set_group(group, fields);
            }
        }

        debug!(
            "imported {} field(s), {} events from {}",
            names.len(),
            collection.len(),
            handle.path().display()
        );
        Ok(collection)
    }

    /// Read the projected columns from disk. The handle keeps no descriptor
    /// open, so the file is reacquired for the duration of the read.
    fn read_columns(
        &self,
        path: &Path,
        schemas: &[(String, FieldSchema)],
    ) -> Result<Vec<(String, Column)>> {
        let file = File::open(path).map_err(|e| Error::unavailable(path, e))?;
        let builder =
            ParquetRecordBatchReaderBuilder::try_new(file).map_err(|e| Error::unavailable(path, e))?;

        let arrow_schema = builder.schema().clone();
        let root_indices: Vec<usize> = schemas
            .iter()
            .map(|(name, _)| {
                arrow_schema
                    .index_of(name)
                    .map_err(|_| Error::FieldNotFound(name.clone()))
            })
            .collect::<Result<_>>()?;
        let projection = ProjectionMask::roots(builder.parquet_schema(), root_indices);

        let reader = builder
            .with_projection(projection)
            .build()
            .map_err(|e| Error::unavailable(path, e))?;

        let mut columns: Vec<(String, Column)> = schemas
            .iter()
            .map(|(name, schema)| (name.clone(), empty_column(*schema)))
            .collect();

        for batch in reader {
            let batch = batch.map_err(|e| Error::unavailable(path, e))?;
            for (name, column) in &mut columns {
                let array = batch
                    .column_by_name(name)
                    .ok_or_else(|| Error::FieldNotFound(name.clone()))?;
                extend_column(column, array, path, name)?;
            }
        }
        Ok(columns)
    }
}

fn empty_column(schema: FieldSchema) -> Column {
    match (schema.shape, schema.kind) {
        (ShapeClass::Scalar, FieldKind::F64) => Column::F64(Vec::new()),
        (ShapeClass::Scalar, FieldKind::I64) => Column::I64(Vec::new()),
        (ShapeClass::Scalar, FieldKind::Bool) => Column::Bool(Vec::new()),
        (ShapeClass::Jagged, _) => match schema.kind {
            FieldKind::F64 => Column::JaggedF64(Vec::new()),
            _ => Column::JaggedI64(Vec::new()),
        },
    }
}

// -- Arrow extraction helpers --

/// Append one record batch's worth of values onto an accumulating column.
fn extend_column(column: &mut Column, array: &ArrayRef, path: &Path, name: &str) -> Result<()> {
    let type_err = |expected: &str| {
        Error::structure(
            path,
            format!(
                "field '{}': expected {} column, got {:?}",
                name,
                expected,
                array.data_type()
            ),
        )
    };
    match column {
        Column::F64(out) => {
            if let Some(arr) = array.as_any().downcast_ref::<Float64Array>() {
                out.extend(arr.iter().map(|v| v.unwrap_or(f64::NAN)));
            } else if let Some(arr) = array.as_any().downcast_ref::<Float32Array>() {
                out.extend(arr.iter().map(|v| v.map(f64::from).unwrap_or(f64::NAN)));
            } else {
                return Err(type_err("float"));
            }
        }
        Column::I64(out) => {
            if let Some(arr) = array.as_any().downcast_ref::<Int64Array>() {
                for v in arr {
                    out.push(v.ok_or_else(|| type_err("non-null integer"))?);
                }
            } else if let Some(arr) = array.as_any().downcast_ref::<Int32Array>() {
                for v in arr {
                    out.push(i64::from(v.ok_or_else(|| type_err("non-null integer"))?));
                }
            } else {
                return Err(type_err("integer"));
            }
        }
        Column::Bool(out) => {
            let arr = array
                .as_any()
                .downcast_ref::<BooleanArray>()
                .ok_or_else(|| type_err("boolean"))?;
            for v in arr {
                out.push(v.ok_or_else(|| type_err("non-null boolean"))?);
            }
        }
        Column::JaggedF64(out) => {
            for row in 0..array.len() {
                out.push(jagged_values(array, row, path, name)?.into_f64(path, name)?);
            }
        }
        Column::JaggedI64(out) => {
            for row in 0..array.len() {
                out.push(jagged_values(array, row, path, name)?.into_i64(path, name)?);
            }
        }
    }
    Ok(())
}

/// Inner values of a List/LargeList entry at the given row.
fn jagged_values(array: &ArrayRef, row: usize, path: &Path, name: &str) -> Result<ArrayRef> {
    if array.is_null(row) {
        return Err(Error::structure(
            path,
            format!("field '{name}': null list entry at event {row}"),
        ));
    }
    match array.data_type() {
        DataType::List(_) => {
            let list = array
                .as_any()
                .downcast_ref::<ListArray>()
                .ok_or_else(|| Error::structure(path, format!("field '{name}': not a list")))?;
            Ok(list.value(row))
        }
        DataType::LargeList(_) => {
            let list = array
                .as_any()
                .downcast_ref::<LargeListArray>()
                .ok_or_else(|| Error::structure(path, format!("field '{name}': not a list")))?;
            Ok(list.value(row))
        }
        other => Err(Error::structure(
            path,
            format!("field '{name}': expected list column, got {other:?}"),
        )),
    }
}

trait IntoJagged {
    fn into_f64(self, path: &Path, name: &str) -> Result<Vec<f64>>;
    fn into_i64(self, path: &Path, name: &str) -> Result<Vec<i64>>;
}

impl IntoJagged for ArrayRef {
    fn into_f64(self, path: &Path, name: &str) -> Result<Vec<f64>> {
        if let Some(arr) = self.as_any().downcast_ref::<Float64Array>() {
            Ok(arr.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
        } else if let Some(arr) = self.as_any().downcast_ref::<Float32Array>() {
            Ok(arr.iter().map(|v| v.map(f64::from).unwrap_or(f64::NAN)).collect())
        } else {
            Err(Error::structure(
                path,
                format!(
                    "field '{}': list holds {:?}, expected floats",
                    name,
                    self.data_type()
                ),
            ))
        }
    }

    fn into_i64(self, path: &Path, name: &str) -> Result<Vec<i64>> {
        let null_err =
            || Error::structure(path, format!("field '{name}': null value in integer list"));
        if let Some(arr) = self.as_any().downcast_ref::<Int64Array>() {
            arr.iter().map(|v| v.ok_or_else(null_err)).collect()
        } else if let Some(arr) = self.as_any().downcast_ref::<Int32Array>() {
            arr.iter()
                .map(|v| v.map(i64::from).ok_or_else(null_err))
                .collect()
        } else {
            Err(Error::structure(
                path,
                format!(
                    "field '{}': list holds {:?}, expected integers",
                    name,
                    self.data_type()
                ),
            ))
        }
    }
}
