use crate::data::model::{Column, EventCollection};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// VectorField – an elementwise XYZ triplet under one name
// ---------------------------------------------------------------------------

/// Three elementwise component columns (`{name}_x`, `{name}_y`, `{name}_z`)
/// sharing an identical shape, grouped under one logical name.
///
/// Derived quantities preserve that shape exactly: same nesting, same
/// per-event counts, NaN components yielding NaN results rather than errors.
#[derive(Debug, Clone)]
pub struct VectorField {
    name: String,
    x: Column,
    y: Column,
    z: Column,
}

/// Gather the `{name}_x/_y/_z` triplet of float columns from a collection.
///
/// Fails with `FieldNotFound` if any component is missing and with
/// `ShapeMismatch` if the components are not float columns of identical
/// shape.
pub fn vector(c: &EventCollection, name: &str) -> Result<VectorField> {
    let x = c.column(&format!("{name}_x"))?.clone();
    let y = c.column(&format!("{name}_y"))?.clone();
    let z = c.column(&format!("{name}_z"))?.clone();

    for (axis, col) in [("x", &x), ("y", &y), ("z", &z)] {
        if !matches!(col, Column::F64(_) | Column::JaggedF64(_)) {
            return Err(Error::ShapeMismatch(format!(
                "component '{}_{}' is {}, expected a float column",
                name,
                axis,
                col.type_name()
            )));
        }
    }
    if x.is_jagged() != y.is_jagged()
        || x.is_jagged() != z.is_jagged()
        || x.counts() != y.counts()
        || x.counts() != z.counts()
    {
        return Err(Error::ShapeMismatch(format!(
            "components of '{name}' disagree on shape"
        )));
    }

    Ok(VectorField {
        name: name.to_string(),
        x,
        y,
        z,
    })
}

impl VectorField {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Elementwise magnitude `sqrt(x² + y² + z²)`, shape-preserving.
    pub fn magnitude(&self) -> Column {
        self.map(|x, y, z| (x * x + y * y + z * z).sqrt())
    }

    /// Elementwise transverse component `sqrt(x² + y²)`, shape-preserving.
    pub fn rho(&self) -> Column {
        self.map(|x, y, _| (x * x + y * y).sqrt())
    }

    /// Apply an elementwise function over the component triplet.
    fn map<F: Fn(f64, f64, f64) -> f64>(&self, f: F) -> Column {
        match (&self.x, &self.y, &self.z) {
            (Column::F64(xs), Column::F64(ys), Column::F64(zs)) => Column::F64(
                xs.iter()
                    .zip(ys)
                    .zip(zs)
                    .map(|((&x, &y), &z)| f(x, y, z))
                    .collect(),
            ),
            (Column::JaggedF64(xs), Column::JaggedF64(ys), Column::JaggedF64(zs)) => {
                Column::JaggedF64(
                    xs.iter()
                        .zip(ys)
                        .zip(zs)
                        .map(|((ex, ey), ez)| {
                            ex.iter()
                                .zip(ey)
                                .zip(ez)
                                .map(|((&x, &y), &z)| f(x, y, z))
                                .collect()
                        })
                        .collect(),
                )
            }
            // vector() only admits matching float variants.
            _ => unreachable!("vector components validated at construction"),
        }
    }
}
