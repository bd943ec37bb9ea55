use std::collections::HashMap;
use std::sync::Arc;

use arrow::array::{Float64Builder, Int64Array, Int64Builder, ListArray, ListBuilder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn pick<T: Copy>(&mut self, options: &[T]) -> T {
        options[(self.next_u64() % options.len() as u64) as usize]
    }

    fn range_i64(&mut self, lo: i64, hi: i64) -> i64 {
        lo + (self.next_u64() % (hi - lo) as u64) as i64
    }
}

fn f64_list(rows: &[Vec<f64>]) -> ListArray {
    let mut builder = ListBuilder::new(Float64Builder::new());
    for row in rows {
        let values = builder.values();
        for &v in row {
            values.append_value(v);
        }
        builder.append(true);
    }
    builder.finish()
}

fn i64_list(rows: &[Vec<i64>]) -> ListArray {
    let mut builder = ListBuilder::new(Int64Builder::new());
    for row in rows {
        let values = builder.values();
        for &v in row {
            values.append_value(v);
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

fn main() {
    env_logger::init();

    let output_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "sample_events.parquet".to_string());
    let n_events: usize = std::env::args()
        .nth(2)
        .and_then(|s| s.parse().ok())
        .unwrap_or(100);

    let mut rng = SimpleRng::new(42);

    let mut event_ids: Vec<i64> = Vec::with_capacity(n_events);
    let mut trk_pdg: Vec<Vec<i64>> = Vec::with_capacity(n_events);
    let mut trk_nactive: Vec<Vec<i64>> = Vec::with_capacity(n_events);
    let mut trkqual: Vec<Vec<f64>> = Vec::with_capacity(n_events);
    let mut seg_sid: Vec<Vec<i64>> = Vec::with_capacity(n_events);
    let mut seg_sindex: Vec<Vec<i64>> = Vec::with_capacity(n_events);
    let mut seg_time: Vec<Vec<f64>> = Vec::with_capacity(n_events);
    let mut seg_mom_x: Vec<Vec<f64>> = Vec::with_capacity(n_events);
    let mut seg_mom_y: Vec<Vec<f64>> = Vec::with_capacity(n_events);
    let mut seg_mom_z: Vec<Vec<f64>> = Vec::with_capacity(n_events);
    let mut sim_start: Vec<Vec<i64>> = Vec::with_capacity(n_events);
    let mut sim_gen: Vec<Vec<i64>> = Vec::with_capacity(n_events);

    for i in 0..n_events {
        event_ids.push(1000 + i as i64);

        let n_trk = rng.range_i64(0, 3) as usize;
        let mut pdg = Vec::with_capacity(n_trk);
        let mut nactive = Vec::with_capacity(n_trk);
        let mut qual = Vec::with_capacity(n_trk);
        let mut start = Vec::with_capacity(n_trk);
        let mut gen = Vec::with_capacity(n_trk);
        for _ in 0..n_trk {
            pdg.push(rng.pick(&[11, 11, -11, 13, -13]));
            nactive.push(rng.range_i64(8, 45));
            qual.push(rng.next_f64());
            start.push(rng.pick(&[166, 168, 178, 179, 0]));
            gen.push(rng.pick(&[0, 0, 38, 44]));
        }
        trk_pdg.push(pdg);
        trk_nactive.push(nactive);
        trkqual.push(qual);
        sim_start.push(start);
        sim_gen.push(gen);

        // Segments for the leading track: one per tracker surface, with a
        // few upstream-going fits mixed in.
        let mut sid = Vec::new();
        let mut sindex = Vec::new();
        let mut time = Vec::new();
        let mut mx = Vec::new();
        let mut my = Vec::new();
        let mut mz = Vec::new();
        if n_trk > 0 {
            let direction = if rng.next_f64() < 0.8 { 1.0 } else { -1.0 };
            for surface in 0..3i64 {
                sid.push(surface);
                sindex.push(0);
                time.push(450.0 + rng.next_f64() * 1250.0);
                let pt = 60.0 + rng.next_f64() * 30.0;
                let phi = rng.next_f64() * std::f64::consts::TAU;
                mx.push(pt * phi.cos());
                my.push(pt * phi.sin());
                mz.push(direction * (70.0 + rng.next_f64() * 40.0));
            }
        }
        seg_sid.push(sid);
        seg_sindex.push(sindex);
        seg_time.push(time);
        seg_mom_x.push(mx);
        seg_mom_y.push(my);
        seg_mom_z.push(mz);
    }

    let metadata = HashMap::from([
        ("dir".to_string(), "EventNtuple".to_string()),
        ("tree".to_string(), "ntuple".to_string()),
    ]);
    let schema = Arc::new(Schema::new_with_metadata(
        vec![
            Field::new("event", DataType::Int64, false),
            list_field("trk.pdg", DataType::Int64),
            list_field("trk.nactive", DataType::Int64),
            list_field("trkqual.result", DataType::Float64),
            list_field("trksegs.sid", DataType::Int64),
            list_field("trksegs.sindex", DataType::Int64),
            list_field("trksegs.time", DataType::Float64),
            list_field("trksegs.mom_x", DataType::Float64),
            list_field("trksegs.mom_y", DataType::Float64),
            list_field("trksegs.mom_z", DataType::Float64),
            list_field("trkmcsim.startCode", DataType::Int64),
            list_field("trkmcsim.gen", DataType::Int64),
        ],
        metadata,
    ));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int64Array::from(event_ids)),
            Arc::new(i64_list(&trk_pdg)),
            Arc::new(i64_list(&trk_nactive)),
            Arc::new(f64_list(&trkqual)),
            Arc::new(i64_list(&seg_sid)),
            Arc::new(i64_list(&seg_sindex)),
            Arc::new(f64_list(&seg_time)),
            Arc::new(f64_list(&seg_mom_x)),
            Arc::new(f64_list(&seg_mom_y)),
            Arc::new(f64_list(&seg_mom_z)),
            Arc::new(i64_list(&sim_start)),
            Arc::new(i64_list(&sim_gen)),
        ],
    )
    .expect("Failed to create RecordBatch");

    let file = std::fs::File::create(&output_path).expect("Failed to create output file");
    let mut writer = ArrowWriter::try_new(file, schema, None).expect("Failed to create writer");
    writer.write(&batch).expect("Failed to write batch");
    writer.close().expect("Failed to close writer");

    println!("Wrote {n_events} events to {output_path}");
}
