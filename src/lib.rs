//! Convenience layer for reading columnar detector event data (ntuples)
//! into in-memory arrays, applying selection cuts, computing derived vector
//! quantities, and summarising results for plotting.
//!
//! Columnar file parsing is delegated to the `arrow`/`parquet` crates and
//! rendering to external charting consumers; this crate supplies the glue:
//! locator resolution, per-file import, multi-file dispatch over a bounded
//! worker pool, event-aligned selection masks, and elementwise vector math.
//!
//! ```no_run
//! use ntuple_utils::{FieldRequest, Processor, WorkSource};
//!
//! fn main() -> ntuple_utils::Result<()> {
//!     let processor = Processor::new();
//!     let data = processor.process(
//!         &WorkSource::SingleFile("events.parquet".to_string()),
//!         &FieldRequest::flat(["trk.pdg", "trk.nactive"]),
//!     )?;
//!     let mask = ntuple_utils::select::has_n_hits(&data, 20)?;
//!     println!("{} of {} events pass", mask.count_passing(), data.len());
//!     Ok(())
//! }
//! ```

pub mod cut;
pub mod data;
pub mod error;
pub mod hist;
pub mod importer;
pub mod locator;
pub mod mc;
pub mod print;
pub mod process;
pub mod reader;
pub mod select;
pub mod vector;

pub use crate::data::model::{Column, EventCollection, Mask};
pub use crate::error::{Error, Result};
pub use crate::importer::{FieldRequest, Importer};
pub use crate::locator::{FileLocator, Location, RemoteConfig, UrlSchema};
pub use crate::process::{DatasetCatalog, ExecBackend, Processor, WorkSource};
pub use crate::reader::{FileHandle, Reader, TreePath};
pub use crate::select::{ParticleType, Surface};
pub use crate::vector::{vector, VectorField};
