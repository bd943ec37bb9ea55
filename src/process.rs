use std::fs;
use std::path::PathBuf;

use log::{info, warn};
use rayon::prelude::*;

use crate::data::model::EventCollection;
use crate::error::{Error, Result};
use crate::importer::{FieldRequest, Importer};
use crate::locator::FileLocator;
use crate::reader::{Reader, TreePath};

// ---------------------------------------------------------------------------
// Work sources and the dataset catalog collaborator
// ---------------------------------------------------------------------------

/// One unit of work to resolve: a single file, a plain-text file list, or a
/// symbolic dataset definition.
#[derive(Debug, Clone)]
pub enum WorkSource {
    SingleFile(String),
    FileList(PathBuf),
    Dataset(String),
}

/// External catalog mapping a dataset definition name to an ordered list of
/// file names. Implementations live outside this crate (site services); the
/// processor only consumes the returned order.
pub trait DatasetCatalog: Send + Sync {
    fn list_files(&self, defname: &str) -> Result<Vec<String>>;
}

/// Execution strategy for the per-file dispatch. Aggregation and ordering
/// are backend-agnostic: results always come back in submission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecBackend {
    /// In-line execution on the calling thread; deterministic, useful for
    /// debugging a misbehaving batch.
    Sequential,
    /// Bounded worker pool; `max_workers = None` picks a default from the
    /// available parallelism, capped at the file count.
    Threaded { max_workers: Option<usize> },
}

impl Default for ExecBackend {
    fn default() -> Self {
        ExecBackend::Threaded { max_workers: None }
    }
}

// ---------------------------------------------------------------------------
// Processor
// ---------------------------------------------------------------------------

/// Resolves a work source into file locators and dispatches per-file work
/// across the configured backend.
///
/// Failure semantics are fail-fast: any per-file error aborts the batch and
/// surfaces as [`Error::Batch`] naming the offending locator. A silently
/// dropped file would silently bias the sample, so there is no
/// skip-and-continue mode; a failed batch is re-submitted from scratch.
pub struct Processor {
    reader: Reader,
    importer: Importer,
    backend: ExecBackend,
    catalog: Option<Box<dyn DatasetCatalog>>,
}

impl Default for Processor {
    fn default() -> Self {
        Processor {
            reader: Reader::new(),
            importer: Importer::new(),
            backend: ExecBackend::default(),
            catalog: None,
        }
    }
}

impl Processor {
    pub fn new() -> Self {
        Processor::default()
    }

    /// Use a specific reader (e.g. one configured for remote access).
    pub fn with_reader(mut self, reader: Reader) -> Self {
        self.reader = reader;
        self
    }

    /// Address a non-default directory/tree path.
    pub fn with_tree(mut self, tree: TreePath) -> Self {
        self.importer = Importer::with_tree(tree);
        self
    }

    /// Select the execution backend.
    pub fn with_backend(mut self, backend: ExecBackend) -> Self {
        self.backend = backend;
        self
    }

    /// Attach a dataset catalog for resolving `WorkSource::Dataset`.
    pub fn with_catalog(mut self, catalog: Box<dyn DatasetCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Resolve a work source into an ordered locator list. Deterministic for
    /// a given input: file-list order is line order (trimmed, blank lines
    /// skipped); dataset order is whatever the catalog returns.
    pub fn resolve_files(&self, source: &WorkSource) -> Result<Vec<FileLocator>> {
        match source {
            WorkSource::SingleFile(name) => Ok(vec![self.reader.locate(name)?]),
            WorkSource::FileList(path) => {
                let text =
                    fs::read_to_string(path).map_err(|e| Error::unavailable(path.clone(), e))?;
                let locators: Vec<FileLocator> = text
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(|line| self.reader.locate(line))
                    .collect::<Result<_>>()?;
                if locators.is_empty() {
                    warn!("file list {} has no entries", path.display());
                } else {
                    info!(
                        "loaded file list {} ({} files)",
                        path.display(),
                        locators.len()
                    );
                }
                Ok(locators)
            }
            WorkSource::Dataset(defname) => {
                let catalog = self.catalog.as_deref().ok_or_else(|| {
                    Error::Schema("no dataset catalog configured for dataset resolution".to_string())
                })?;
                let names = catalog.list_files(defname)?;
                info!("dataset '{defname}' resolved to {} files", names.len());
                names
                    .iter()
                    .map(|name| self.reader.locate(name))
                    .collect()
            }
        }
    }

    /// Read and import every file of the source, concatenating the per-file
    /// collections into one aggregate in submission order, regardless of the
    /// completion order of the underlying reads.
    pub fn process(&self, source: &WorkSource, request: &FieldRequest) -> Result<EventCollection> {
        let parts = self.process_with(source, |locator| {
            let handle = self.reader.open(locator)?;
            self.importer.import(&handle, request)
        })?;
        let merged = EventCollection::concatenate(parts)?;
        info!("aggregate holds {} events", merged.len());
        Ok(merged)
    }

    /// Run a caller-supplied function per file and return the per-file
    /// results in submission order, without attempting to combine them.
    pub fn process_with<T, F>(&self, source: &WorkSource, work: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(&FileLocator) -> Result<T> + Sync,
    {
        let locators = self.resolve_files(source)?;
        self.run(&locators, work)
    }

    /// Dispatch one work unit per locator on the configured backend.
    fn run<T, F>(&self, locators: &[FileLocator], work: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(&FileLocator) -> Result<T> + Sync,
    {
        let wrapped = |locator: &FileLocator| {
            work(locator).map_err(|e| e.in_batch(locator))
        };
        match self.backend {
            ExecBackend::Sequential => locators.iter().map(wrapped).collect(),
            ExecBackend::Threaded { max_workers } => {
                let workers = max_workers
                    .unwrap_or_else(|| {
                        std::thread::available_parallelism()
                            .map(usize::from)
                            .unwrap_or(4)
                    })
                    .min(locators.len())
                    .max(1);
                info!(
                    "processing {} files with {} worker threads",
                    locators.len(),
                    workers
                );
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(workers)
                    .build()
                    .map_err(|e| Error::ResourceUnavailable {
                        path: "<worker pool>".to_string(),
                        reason: e.to_string(),
                    })?;
                // par_iter + collect keeps submission order and short-circuits
                // remaining work once a unit has failed.
                pool.install(|| locators.par_iter().map(wrapped).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    struct FixedCatalog(Vec<&'static str>);

    impl DatasetCatalog for FixedCatalog {
        fn list_files(&self, _defname: &str) -> Result<Vec<String>> {
            Ok(self.0.iter().map(|s| s.to_string()).collect())
        }
    }

    fn write_file_list(lines: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(lines.as_bytes()).unwrap();
        f
    }

    #[test]
    fn file_list_resolution_trims_and_skips_blanks() {
        let list = write_file_list("  /data/a.parquet \n\n/data/b.parquet\n   \n/data/c.parquet\n");
        let processor = Processor::new();
        let locators = processor
            .resolve_files(&WorkSource::FileList(list.path().to_path_buf()))
            .unwrap();
        assert_eq!(locators.len(), 3);
        assert_eq!(locators[0].as_str(), "/data/a.parquet");
        assert_eq!(locators[1].as_str(), "/data/b.parquet");
        assert_eq!(locators[2].as_str(), "/data/c.parquet");
    }

    #[test]
    fn missing_file_list_is_resource_unavailable() {
        let processor = Processor::new();
        let err = processor
            .resolve_files(&WorkSource::FileList(PathBuf::from("/no/such/list.txt")))
            .unwrap_err();
        assert!(matches!(err, Error::ResourceUnavailable { .. }));
    }

    #[test]
    fn dataset_without_catalog_is_a_configuration_error() {
        let processor = Processor::new();
        assert!(matches!(
            processor.resolve_files(&WorkSource::Dataset("def".to_string())),
            Err(Error::Schema(_))
        ));
    }

    #[test]
    fn dataset_resolution_preserves_catalog_order() {
        let processor = Processor::new().with_catalog(Box::new(FixedCatalog(vec![
            "/data/z.parquet",
            "/data/a.parquet",
        ])));
        let locators = processor
            .resolve_files(&WorkSource::Dataset("def".to_string()))
            .unwrap();
        assert_eq!(locators[0].as_str(), "/data/z.parquet");
        assert_eq!(locators[1].as_str(), "/data/a.parquet");
    }

    #[test]
    fn results_keep_submission_order_under_threads() {
        let list = write_file_list("f0\nf1\nf2\nf3\nf4\nf5\nf6\nf7\n");
        let processor = Processor::new().with_backend(ExecBackend::Threaded {
            max_workers: Some(4),
        });
        let results = processor
            .process_with(&WorkSource::FileList(list.path().to_path_buf()), |loc| {
                // Later submissions finish first.
                let idx: u64 = loc.as_str()[1..].parse().unwrap();
                std::thread::sleep(std::time::Duration::from_millis(5 * (8 - idx)));
                Ok(idx)
            })
            .unwrap();
        assert_eq!(results, vec![0, 1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn one_failure_fails_the_whole_batch_with_its_locator() {
        let list = write_file_list("good0\nbad\ngood1\n");
        let processor = Processor::new().with_backend(ExecBackend::Sequential);
        let err = processor
            .process_with(&WorkSource::FileList(list.path().to_path_buf()), |loc| {
                if loc.as_str() == "bad" {
                    Err(Error::unavailable(loc.as_str(), "cannot open"))
                } else {
                    Ok(())
                }
            })
            .unwrap_err();
        match err {
            Error::Batch { locator, source } => {
                assert_eq!(locator, "bad");
                assert!(matches!(*source, Error::ResourceUnavailable { .. }));
            }
            other => panic!("expected batch error, got {other:?}"),
        }
    }
}
