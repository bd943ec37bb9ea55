use std::fs::File;
use std::path::{Path, PathBuf};

use arrow::datatypes::SchemaRef;
use log::debug;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::{Deserialize, Serialize};

use crate::data::schema::SchemaRegistry;
use crate::error::{Error, Result};
use crate::locator::{FileLocator, RemoteConfig};

// ---------------------------------------------------------------------------
// TreePath – where the ntuple lives inside a file
// ---------------------------------------------------------------------------

/// Directory/tree address of the ntuple inside a data file.
///
/// Files declare their own path in the parquet key-value metadata (`dir`,
/// `tree`); imports check the requested path against the declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreePath {
    pub dir: String,
    pub tree: String,
}

impl Default for TreePath {
    fn default() -> Self {
        TreePath {
            dir: "EventNtuple".to_string(),
            tree: "ntuple".to_string(),
        }
    }
}

impl std::fmt::Display for TreePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.dir, self.tree)
    }
}

// ---------------------------------------------------------------------------
// FileHandle – an opened resource
// ---------------------------------------------------------------------------

/// Handle to an opened event file: footer parsed, schema and declared tree
/// path retained. The handle owns no open descriptor; imports re-open the
/// file for the duration of the read, so the handle's lifetime belongs to
/// the caller.
#[derive(Debug, Clone)]
pub struct FileHandle {
    path: PathBuf,
    schema: SchemaRef,
    registry: SchemaRegistry,
    tree_path: Option<TreePath>,
    n_rows: i64,
}

impl FileHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    /// Typed registry of the fields this file declares.
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// The ntuple path the file declares in its metadata, if any.
    pub fn tree_path(&self) -> Option<&TreePath> {
        self.tree_path.as_ref()
    }

    /// Number of events recorded in the file footer.
    pub fn n_rows(&self) -> i64 {
        self.n_rows
    }
}

// ---------------------------------------------------------------------------
// Reader – unified interface for opening local or remote files
// ---------------------------------------------------------------------------

/// Opens a single named resource and returns a handle to its contents.
/// No retries, no caching: a failure propagates to the caller, which decides
/// what to do with it.
#[derive(Debug, Clone, Default)]
pub struct Reader {
    remote: Option<RemoteConfig>,
}

impl Reader {
    /// Reader for local files.
    pub fn new() -> Self {
        Reader { remote: None }
    }

    /// Reader that resolves bare file names through remote locator assembly.
    pub fn with_remote(config: RemoteConfig) -> Self {
        Reader {
            remote: Some(config),
        }
    }

    /// Resolve a file name into a locator. With a remote configuration this
    /// assembles (and validates) the remote URL; otherwise the name is taken
    /// as a local path. Fails fast on invalid configuration, before any I/O.
    pub fn locate(&self, file_name: &str) -> Result<FileLocator> {
        match &self.remote {
            Some(config) => FileLocator::remote(file_name, config),
            None => Ok(FileLocator::local(file_name)),
        }
    }

    /// Open a resolved locator and parse the file footer.
    pub fn open(&self, locator: &FileLocator) -> Result<FileHandle> {
        let path = locator.filesystem_path().ok_or_else(|| {
            Error::ResourceUnavailable {
                path: locator.to_string(),
                reason: "no transport available for this scheme; mount the \
                         location or use the 'path' schema"
                    .to_string(),
            }
        })?;

        let file = File::open(path).map_err(|e| Error::unavailable(path, e))?;
        let builder =
            ParquetRecordBatchReaderBuilder::try_new(file).map_err(|e| Error::unavailable(path, e))?;

        let schema = builder.schema().clone();
        let metadata = schema.metadata();
        let tree_path = match (metadata.get("dir"), metadata.get("tree")) {
            (Some(dir), Some(tree)) => Some(TreePath {
                dir: dir.clone(),
                tree: tree.clone(),
            }),
            _ => None,
        };
        let n_rows = builder.metadata().file_metadata().num_rows();

        debug!("opened {} ({} events)", path.display(), n_rows);

        Ok(FileHandle {
            path: path.to_path_buf(),
            registry: SchemaRegistry::from_arrow(path.display().to_string(), &schema),
            schema,
            tree_path,
            n_rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_resource_unavailable() {
        let reader = Reader::new();
        let locator = reader.locate("/no/such/events.parquet").unwrap();
        assert!(matches!(
            reader.open(&locator),
            Err(Error::ResourceUnavailable { .. })
        ));
    }

    #[test]
    fn network_scheme_without_transport_is_resource_unavailable() {
        let reader = Reader::with_remote(RemoteConfig::default());
        let locator = reader
            .locate("nts.mu2e.CeEndpoint.MDC2020az_v1.001210_00000699.root")
            .unwrap();
        assert!(locator.filesystem_path().is_none());
        assert!(matches!(
            reader.open(&locator),
            Err(Error::ResourceUnavailable { .. })
        ));
    }
}
