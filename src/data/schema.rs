use std::collections::BTreeMap;

use arrow::datatypes::{DataType, Schema as ArrowSchema};

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Field classification: semantic kind + shape class
// ---------------------------------------------------------------------------

/// Semantic value kind of a field after import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    F64,
    I64,
    Bool,
}

/// Shape class of a field: one value per event, or a variable-length list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeClass {
    Scalar,
    Jagged,
}

/// Declared type of one importable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSchema {
    pub kind: FieldKind,
    pub shape: ShapeClass,
}

/// Map an Arrow column type onto our field classification. `None` means the
/// column cannot be imported as event data.
fn classify(data_type: &DataType) -> Option<FieldSchema> {
    let scalar = |kind| FieldSchema {
        kind,
        shape: ShapeClass::Scalar,
    };
    let jagged = |kind| FieldSchema {
        kind,
        shape: ShapeClass::Jagged,
    };
    match data_type {
        DataType::Float64 | DataType::Float32 => Some(scalar(FieldKind::F64)),
        DataType::Int64 | DataType::Int32 => Some(scalar(FieldKind::I64)),
        DataType::Boolean => Some(scalar(FieldKind::Bool)),
        DataType::List(inner) | DataType::LargeList(inner) => match inner.data_type() {
            DataType::Float64 | DataType::Float32 => Some(jagged(FieldKind::F64)),
            DataType::Int64 | DataType::Int32 => Some(jagged(FieldKind::I64)),
            _ => None,
        },
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// SchemaRegistry – field name → declared type, validated at import time
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct SchemaEntry {
    schema: Option<FieldSchema>,
    /// Textual Arrow type, kept for error messages about unimportable columns.
    type_desc: String,
}

/// Typed registry of the fields a file declares, built from its Arrow schema.
///
/// Field access goes through this registry instead of failing at first use:
/// an absent field is `FieldNotFound`, a column whose Arrow type cannot carry
/// event data is `StructureMismatch`, both raised before any row is decoded.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    source: String,
    fields: BTreeMap<String, SchemaEntry>,
}

impl SchemaRegistry {
    /// Build the registry for a file's Arrow schema. `source` names the file
    /// in error messages.
    pub fn from_arrow(source: impl Into<String>, schema: &ArrowSchema) -> Self {
        let fields = schema
            .fields()
            .iter()
            .map(|f| {
                (
                    f.name().clone(),
                    SchemaEntry {
                        schema: classify(f.data_type()),
                        type_desc: format!("{:?}", f.data_type()),
                    },
                )
            })
            .collect();
        SchemaRegistry {
            source: source.into(),
            fields,
        }
    }

    /// Whether the file declares a field with this name at all.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// All declared field names, importable or not.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Importable field names only.
    pub fn importable_names(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|(_, e)| e.schema.is_some())
            .map(|(n, _)| n.as_str())
    }

    /// Resolve a requested field, validating both presence and importability.
    pub fn resolve(&self, name: &str) -> Result<FieldSchema> {
        let entry = self
            .fields
            .get(name)
            .ok_or_else(|| Error::FieldNotFound(name.to_string()))?;
        entry.schema.ok_or_else(|| {
            Error::structure(
                &self.source,
                format!(
                    "field '{}' has unsupported column type {}",
                    name, entry.type_desc
                ),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::datatypes::Field;
    use std::sync::Arc;

    fn schema() -> ArrowSchema {
        ArrowSchema::new(vec![
            Field::new("trk.nactive", DataType::Int64, false),
            Field::new("trkqual.result", DataType::Float64, false),
            Field::new(
                "trksegs.time",
                DataType::List(Arc::new(Field::new("item", DataType::Float64, true))),
                false,
            ),
            Field::new("run.note", DataType::Utf8, false),
        ])
    }

    #[test]
    fn scalar_and_jagged_fields_classify() {
        let reg = SchemaRegistry::from_arrow("test.parquet", &schema());
        assert_eq!(
            reg.resolve("trk.nactive").unwrap(),
            FieldSchema {
                kind: FieldKind::I64,
                shape: ShapeClass::Scalar
            }
        );
        assert_eq!(
            reg.resolve("trksegs.time").unwrap().shape,
            ShapeClass::Jagged
        );
    }

    #[test]
    fn absent_field_is_field_not_found() {
        let reg = SchemaRegistry::from_arrow("test.parquet", &schema());
        assert!(matches!(
            reg.resolve("trk.status"),
            Err(Error::FieldNotFound(_))
        ));
    }

    #[test]
    fn unimportable_column_is_structure_mismatch() {
        let reg = SchemaRegistry::from_arrow("test.parquet", &schema());
        assert!(matches!(
            reg.resolve("run.note"),
            Err(Error::StructureMismatch { .. })
        ));
    }
}
