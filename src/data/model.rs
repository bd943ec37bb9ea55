use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Column – one named field across all events
// ---------------------------------------------------------------------------

/// A single column of per-event values.
///
/// Scalar variants hold exactly one value per event; jagged variants hold a
/// variable-length list per event (e.g. one entry per track segment). The
/// outer length of every variant equals the event count of the collection
/// the column belongs to.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    F64(Vec<f64>),
    I64(Vec<i64>),
    Bool(Vec<bool>),
    JaggedF64(Vec<Vec<f64>>),
    JaggedI64(Vec<Vec<i64>>),
}

impl Column {
    /// Number of events spanned by this column.
    pub fn len(&self) -> usize {
        match self {
            Column::F64(v) => v.len(),
            Column::I64(v) => v.len(),
            Column::Bool(v) => v.len(),
            Column::JaggedF64(v) => v.len(),
            Column::JaggedI64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the per-event value is a variable-length list.
    pub fn is_jagged(&self) -> bool {
        matches!(self, Column::JaggedF64(_) | Column::JaggedI64(_))
    }

    /// Short type tag used in error messages and printouts.
    pub fn type_name(&self) -> &'static str {
        match self {
            Column::F64(_) => "f64",
            Column::I64(_) => "i64",
            Column::Bool(_) => "bool",
            Column::JaggedF64(_) => "jagged f64",
            Column::JaggedI64(_) => "jagged i64",
        }
    }

    /// Per-event element counts: 1 for scalar columns, list length for jagged.
    pub fn counts(&self) -> Vec<usize> {
        match self {
            Column::JaggedF64(v) => v.iter().map(Vec::len).collect(),
            Column::JaggedI64(v) => v.iter().map(Vec::len).collect(),
            other => vec![1; other.len()],
        }
    }

    /// Append `other` after `self`, preserving order. Both columns must hold
    /// the same variant.
    pub fn extend(&mut self, other: Column) -> Result<()> {
        match (self, other) {
            (Column::F64(a), Column::F64(b)) => a.extend(b),
            (Column::I64(a), Column::I64(b)) => a.extend(b),
            (Column::Bool(a), Column::Bool(b)) => a.extend(b),
            (Column::JaggedF64(a), Column::JaggedF64(b)) => a.extend(b),
            (Column::JaggedI64(a), Column::JaggedI64(b)) => a.extend(b),
            (a, b) => {
                return Err(Error::ShapeMismatch(format!(
                    "cannot concatenate {} column onto {}",
                    b.type_name(),
                    a.type_name()
                )))
            }
        }
        Ok(())
    }

    /// New column keeping only the events where `keep` is true.
    fn take(&self, keep: &[bool]) -> Column {
        fn pick<T: Clone>(v: &[T], keep: &[bool]) -> Vec<T> {
            v.iter()
                .zip(keep)
                .filter(|(_, &k)| k)
                .map(|(x, _)| x.clone())
                .collect()
        }
        match self {
            Column::F64(v) => Column::F64(pick(v, keep)),
            Column::I64(v) => Column::I64(pick(v, keep)),
            Column::Bool(v) => Column::Bool(pick(v, keep)),
            Column::JaggedF64(v) => Column::JaggedF64(pick(v, keep)),
            Column::JaggedI64(v) => Column::JaggedI64(pick(v, keep)),
        }
    }
}

// ---------------------------------------------------------------------------
// Mask – event-aligned boolean column
// ---------------------------------------------------------------------------

/// A boolean column aligned 1:1 with the event dimension of the collection it
/// was derived from.
///
/// Masks compose by logical AND, and only with masks carrying the same event
/// count: a mask built from one collection must never be applied to a
/// differently-shaped one.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    bits: Vec<bool>,
}

impl Mask {
    pub fn new(bits: Vec<bool>) -> Self {
        Mask { bits }
    }

    /// Event count the mask is aligned with.
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Number of events passing the mask.
    pub fn count_passing(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    /// Elementwise conjunction with another mask of the same event count.
    pub fn and(&self, other: &Mask) -> Result<Mask> {
        if self.len() != other.len() {
            return Err(Error::ShapeMismatch(format!(
                "mask lengths differ: {} vs {}",
                self.len(),
                other.len()
            )));
        }
        Ok(Mask::new(
            self.bits
                .iter()
                .zip(&other.bits)
                .map(|(&a, &b)| a && b)
                .collect(),
        ))
    }
}

impl fmt::Display for Mask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} events pass", self.count_passing(), self.len())
    }
}

// ---------------------------------------------------------------------------
// EventCollection – the imported columnar data
// ---------------------------------------------------------------------------

/// An ordered columnar structure with one top-level entry per recorded event.
///
/// Columns are addressed by field name; a grouped import additionally records
/// which fields belong to which logical group, so results stay addressable
/// both by group and by individual field. Collections are never mutated in
/// place: masks and derived vectors are new values referencing them.
#[derive(Debug, Clone, Default)]
pub struct EventCollection {
    n_events: usize,
    columns: BTreeMap<String, Column>,
    groups: BTreeMap<String, Vec<String>>,
}

impl EventCollection {
    /// Build a collection from named columns, checking that every column
    /// spans the same number of events.
    pub fn from_columns(columns: Vec<(String, Column)>) -> Result<Self> {
        let mut n_events = None;
        let mut map = BTreeMap::new();
        for (name, col) in columns {
            match n_events {
                None => n_events = Some(col.len()),
                Some(n) if n != col.len() => {
                    return Err(Error::ShapeMismatch(format!(
                        "column '{}' has {} events, expected {}",
                        name,
                        col.len(),
                        n
                    )))
                }
                Some(_) => {}
            }
            map.insert(name, col);
        }
        Ok(EventCollection {
            n_events: n_events.unwrap_or(0),
            columns: map,
            groups: BTreeMap::new(),
        })
    }

    /// Record a logical group of field names (grouped import).
    pub fn set_group(&mut self, group: impl Into<String>, fields: Vec<String>) {
        self.groups.insert(group.into(), fields);
    }

    /// Number of events.
    pub fn len(&self) -> usize {
        self.n_events
    }

    pub fn is_empty(&self) -> bool {
        self.n_events == 0
    }

    /// Ordered field names.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Group names recorded by a grouped import.
    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Look up a column by field name.
    pub fn column(&self, name: &str) -> Result<&Column> {
        self.columns
            .get(name)
            .ok_or_else(|| Error::FieldNotFound(name.to_string()))
    }

    /// Look up the columns of a logical group, in group order.
    pub fn group(&self, name: &str) -> Result<Vec<(&str, &Column)>> {
        let fields = self
            .groups
            .get(name)
            .ok_or_else(|| Error::FieldNotFound(format!("group '{name}'")))?;
        fields
            .iter()
            .map(|f| self.column(f).map(|c| (f.as_str(), c)))
            .collect()
    }

    /// New collection keeping only the events passing `mask`.
    pub fn select(&self, mask: &Mask) -> Result<EventCollection> {
        if mask.len() != self.n_events {
            return Err(Error::ShapeMismatch(format!(
                "mask spans {} events, collection has {}",
                mask.len(),
                self.n_events
            )));
        }
        let columns = self
            .columns
            .iter()
            .map(|(name, col)| (name.clone(), col.take(mask.bits())))
            .collect();
        Ok(EventCollection {
            n_events: mask.count_passing(),
            columns,
            groups: self.groups.clone(),
        })
    }

    /// Concatenate per-file collections into one aggregate, preserving the
    /// order of `parts`. All parts must carry the same fields.
    pub fn concatenate(parts: Vec<EventCollection>) -> Result<EventCollection> {
        let mut parts = parts.into_iter();
        let mut merged = match parts.next() {
            Some(first) => first,
            None => return Ok(EventCollection::default()),
        };
        for part in parts {
            if part.columns.len() != merged.columns.len()
                || !part.columns.keys().eq(merged.columns.keys())
            {
                return Err(Error::ShapeMismatch(
                    "collections carry different field sets".to_string(),
                ));
            }
            for (name, col) in part.columns {
                // Key sets match, so the lookup cannot miss.
                merged
                    .columns
                    .get_mut(&name)
                    .ok_or_else(|| Error::FieldNotFound(name.clone()))?
                    .extend(col)?;
            }
            merged.n_events += part.n_events;
        }
        Ok(merged)
    }
}
