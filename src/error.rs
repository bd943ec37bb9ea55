use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while resolving, reading, importing, or selecting event data.
///
/// Every variant is raised at the point of detection and propagates unchanged
/// up to the processing boundary; nothing in this crate retries or swallows a
/// failure. A batch run wraps the per-file error in [`Error::Batch`] so the
/// caller can tell which file broke the sample.
#[derive(Debug, Error)]
pub enum Error {
    /// The file or URI could not be opened or read.
    #[error("cannot open '{path}': {reason}")]
    ResourceUnavailable { path: String, reason: String },

    /// Invalid or unsupported remote location/schema configuration.
    /// Raised before any I/O is attempted.
    #[error("schema error: {0}")]
    Schema(String),

    /// A requested field is absent from the resolved tree.
    #[error("field '{0}' not found in tree")]
    FieldNotFound(String),

    /// The resolved object is not the tabular structure we expected.
    #[error("'{path}' is not the expected tabular structure: {reason}")]
    StructureMismatch { path: String, reason: String },

    /// Masks or columns of incompatible length/nesting were combined.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// A single file in a multi-file batch failed; the whole batch fails.
    #[error("processing '{locator}' failed")]
    Batch {
        locator: String,
        #[source]
        source: Box<Error>,
    },

    /// A cut-flow table could not be serialized.
    #[error("export error: {0}")]
    Export(String),
}

impl Error {
    pub(crate) fn unavailable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::ResourceUnavailable {
            path: path.into().display().to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn structure(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::StructureMismatch {
            path: path.into().display().to_string(),
            reason: reason.to_string(),
        }
    }

    /// Attach the offending locator to a per-file error.
    pub(crate) fn in_batch(self, locator: impl ToString) -> Self {
        Error::Batch {
            locator: locator.to_string(),
            source: Box::new(self),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
