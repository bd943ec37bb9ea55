//! End-to-end pipeline tests over real parquet fixtures: resolve → read →
//! import → select → vector, including the multi-file batch semantics.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use arrow::array::{Float64Builder, Int64Array, Int64Builder, ListArray, ListBuilder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use ntuple_utils::{
    select, vector, Column, Error, ExecBackend, FieldRequest, Importer, Processor, Reader,
    TreePath, WorkSource,
};

// ---------------------------------------------------------------------------
// Fixture writer (same arrow/parquet stack the crate reads)
// ---------------------------------------------------------------------------

fn f64_list(rows: &[Vec<f64>]) -> ListArray {
    let mut builder = ListBuilder::new(Float64Builder::new());
    for row in rows {
        for &v in row {
            builder.values().append_value(v);
        }
        builder.append(true);
    }
    builder.finish()
}

fn i64_list(rows: &[Vec<i64>]) -> ListArray {
    let mut builder = ListBuilder::new(Int64Builder::new());
    for row in rows {
        for &v in row {
            builder.values().append_value(v);
        }
        builder.append(true);
    }
    builder.finish()
}

fn list_field(name: &str, item: DataType) -> Field {
    Field::new(
        name,
        DataType::List(Arc::new(Field::new("item", item, true))),
        false,
    )
}

/// Write `n_events` events starting at `first_id` under the given tree path.
/// Content is a deterministic function of the event id:
/// * one track per event, `nactive = id % 40`, `status = 1`,
///   `pdg` alternating 11 / -11,
/// * one tracker-entrance segment with momentum `(3, 4, ±12)`,
///   downstream except every 5th event.
fn write_events(path: &Path, first_id: i64, n_events: usize, tree: &TreePath) -> Result<()> {
    let ids: Vec<i64> = (0..n_events as i64).map(|i| first_id + i).collect();
    let nactive: Vec<Vec<i64>> = ids.iter().map(|id| vec![id % 40]).collect();
    let status: Vec<Vec<i64>> = ids.iter().map(|_| vec![1]).collect();
    let pdg: Vec<Vec<i64>> = ids
        .iter()
        .map(|id| vec![if id % 2 == 0 { 11 } else { -11 }])
        .collect();
    let sid: Vec<Vec<i64>> = ids.iter().map(|_| vec![0]).collect();
    let sindex: Vec<Vec<i64>> = ids.iter().map(|_| vec![0]).collect();
    let mom_x: Vec<Vec<f64>> = ids.iter().map(|_| vec![3.0]).collect();
    let mom_y: Vec<Vec<f64>> = ids.iter().map(|_| vec![4.0]).collect();
    let mom_z: Vec<Vec<f64>> = ids
        .iter()
        .map(|id| vec![if id % 5 == 0 { -12.0 } else { 12.0 }])
        .collect();

    let metadata = HashMap::from([
        ("dir".to_string(), tree.dir.clone()),
        ("tree".to_string(), tree.tree.clone()),
    ]);
    let schema = Arc::new(Schema::new_with_metadata(
        vec![
            Field::new("event", DataType::Int64, false),
            list_field("trk.pdg", DataType::Int64),
            list_field("trk.nactive", DataType::Int64),
            list_field("trk.status", DataType::Int64),
            list_field("trksegs.sid", DataType::Int64),
            list_field("trksegs.sindex", DataType::Int64),
            list_field("trksegs.mom_x", DataType::Float64),
            list_field("trksegs.mom_y", DataType::Float64),
            list_field("trksegs.mom_z", DataType::Float64),
        ],
        metadata,
    ));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int64Array::from(ids)),
            Arc::new(i64_list(&pdg)),
            Arc::new(i64_list(&nactive)),
            Arc::new(i64_list(&status)),
            Arc::new(i64_list(&sid)),
            Arc::new(i64_list(&sindex)),
            Arc::new(f64_list(&mom_x)),
            Arc::new(f64_list(&mom_y)),
            Arc::new(f64_list(&mom_z)),
        ],
    )?;

    let file = std::fs::File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn write_file_list(dir: &Path, paths: &[PathBuf]) -> Result<PathBuf> {
    let list_path = dir.join("files.txt");
    let mut f = std::fs::File::create(&list_path)?;
    for p in paths {
        writeln!(f, "{}", p.display())?;
    }
    Ok(list_path)
}

// ---------------------------------------------------------------------------
// Single-file import
// ---------------------------------------------------------------------------

#[test]
fn import_and_count_hits_on_a_hundred_event_file() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("events.parquet");
    write_events(&path, 0, 100, &TreePath::default())?;

    let processor = Processor::new();
    let data = processor.process(
        &WorkSource::SingleFile(path.display().to_string()),
        &FieldRequest::flat(["trk.status", "trk.nactive"]),
    )?;
    assert_eq!(data.len(), 100);

    let mask = select::has_n_hits(&data, 20)?;
    assert_eq!(mask.len(), 100);
    for (id, &passes) in mask.bits().iter().enumerate() {
        assert_eq!(passes, (id as i64 % 40) > 20, "event {id}");
    }
    Ok(())
}

#[test]
fn grouped_import_is_addressable_by_group_and_field() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("events.parquet");
    write_events(&path, 0, 10, &TreePath::default())?;

    let reader = Reader::new();
    let handle = reader.open(&reader.locate(&path.display().to_string())?)?;
    let data = Importer::new().import(
        &handle,
        &FieldRequest::grouped([
            ("evt", vec!["event"]),
            ("trk", vec!["trk.pdg", "trk.nactive"]),
        ]),
    )?;

    let trk = data.group("trk")?;
    assert_eq!(trk.len(), 2);
    assert_eq!(trk[0].0, "trk.pdg");
    // Also addressable by individual field.
    assert!(data.column("trk.nactive").is_ok());
    assert!(data.column("event").is_ok());
    assert!(matches!(data.group("crv"), Err(Error::FieldNotFound(_))));
    Ok(())
}

#[test]
fn missing_field_and_wrong_tree_fail_cleanly() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("events.parquet");
    write_events(&path, 0, 5, &TreePath::default())?;

    let reader = Reader::new();
    let handle = reader.open(&reader.locate(&path.display().to_string())?)?;

    let missing = Importer::new().import(&handle, &FieldRequest::flat(["crvcoincs.PEs"]));
    assert!(matches!(missing, Err(Error::FieldNotFound(_))));

    let wrong_tree = Importer::with_tree(TreePath {
        dir: "EventNtuple".to_string(),
        tree: "other".to_string(),
    })
    .import(&handle, &FieldRequest::flat(["event"]));
    assert!(matches!(wrong_tree, Err(Error::StructureMismatch { .. })));
    Ok(())
}

#[test]
fn wildcard_import_covers_every_column() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("events.parquet");
    write_events(&path, 0, 5, &TreePath::default())?;

    let reader = Reader::new();
    let handle = reader.open(&reader.locate(&path.display().to_string())?)?;
    let data = Importer::new().import(&handle, &FieldRequest::All)?;
    assert_eq!(data.field_names().count(), 9);
    assert_eq!(data.len(), 5);
    Ok(())
}

// ---------------------------------------------------------------------------
// Multi-file batches
// ---------------------------------------------------------------------------

#[test]
fn concatenation_preserves_file_list_order_under_threads() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let paths: Vec<PathBuf> = [(0i64, 10usize), (1000, 5), (2000, 7)]
        .iter()
        .enumerate()
        .map(|(i, &(first_id, n))| {
            let path = dir.path().join(format!("part{i}.parquet"));
            write_events(&path, first_id, n, &TreePath::default()).map(|_| path)
        })
        .collect::<Result<_>>()?;
    let list_path = write_file_list(dir.path(), &paths)?;

    let request = FieldRequest::flat(["event", "trk.nactive"]);
    let processor = Processor::new().with_backend(ExecBackend::Threaded {
        max_workers: Some(3),
    });
    let aggregate = processor.process(&WorkSource::FileList(list_path), &request)?;
    assert_eq!(aggregate.len(), 22);

    // The aggregate must equal the per-file imports laid end to end, in
    // file-list order, whatever order the reads completed in.
    let reader = Reader::new();
    let importer = Importer::new();
    let mut expected_events: Vec<i64> = Vec::new();
    for path in &paths {
        let handle = reader.open(&reader.locate(&path.display().to_string())?)?;
        let part = importer.import(&handle, &request)?;
        match part.column("event")? {
            Column::I64(ids) => expected_events.extend(ids),
            other => panic!("unexpected column type {}", other.type_name()),
        }
    }
    assert_eq!(aggregate.column("event")?, &Column::I64(expected_events));
    Ok(())
}

#[test]
fn failing_file_fails_the_batch_with_its_locator() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let good1 = dir.path().join("good1.parquet");
    let missing = dir.path().join("missing.parquet");
    let good2 = dir.path().join("good2.parquet");
    write_events(&good1, 0, 4, &TreePath::default())?;
    write_events(&good2, 100, 4, &TreePath::default())?;
    let list_path = write_file_list(dir.path(), &[good1, missing.clone(), good2])?;

    let processor = Processor::new();
    let err = processor
        .process(
            &WorkSource::FileList(list_path),
            &FieldRequest::flat(["event"]),
        )
        .unwrap_err();
    match err {
        Error::Batch { locator, source } => {
            assert_eq!(locator, missing.display().to_string());
            assert!(matches!(*source, Error::ResourceUnavailable { .. }));
        }
        other => panic!("expected a batch error, got {other:?}"),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Derived quantities on imported data
// ---------------------------------------------------------------------------

#[test]
fn momentum_magnitude_and_direction_from_imported_segments() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("events.parquet");
    write_events(&path, 0, 20, &TreePath::default())?;

    let processor = Processor::new();
    let data = processor.process(
        &WorkSource::SingleFile(path.display().to_string()),
        &FieldRequest::flat([
            "trksegs.sid",
            "trksegs.sindex",
            "trksegs.mom_x",
            "trksegs.mom_y",
            "trksegs.mom_z",
        ]),
    )?;

    let mom = vector(&data, "trksegs.mom")?;
    match mom.magnitude() {
        Column::JaggedF64(mags) => {
            assert_eq!(mags.len(), 20);
            for event in &mags {
                for &m in event {
                    assert_eq!(m, 13.0); // |(3, 4, ±12)|
                }
            }
        }
        other => panic!("unexpected column type {}", other.type_name()),
    }

    let down = select::is_downstream(&data)?;
    let up = select::is_upstream(&data)?;
    for id in 0..20 {
        assert_eq!(down.bits()[id], id % 5 != 0, "event {id}");
        assert_eq!(up.bits()[id], id % 5 == 0, "event {id}");
    }
    // Every event has its entrance segment, none is reflected.
    let entrance = ntuple_utils::Surface::by_name("TT_Front")?;
    assert_eq!(select::at_surface(&data, entrance)?.count_passing(), 20);
    assert_eq!(
        select::is_reflected(&data, entrance)?.count_passing(),
        0
    );
    Ok(())
}
