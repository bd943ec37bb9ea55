use log::info;
use serde::Serialize;

use crate::data::model::{Column, EventCollection};
use crate::error::{Error, Result};

// Fields read from the simulated-truth branch.
const SIM_START_CODE: &str = "trkmcsim.startCode";
const SIM_GEN_CODE: &str = "trkmcsim.gen";

// ---------------------------------------------------------------------------
// MC origin classification
// ---------------------------------------------------------------------------

/// Physics origin of a simulated track, decoded from its creation process
/// and generator codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum McOrigin {
    /// Decay-in-orbit (process code 166).
    Dio,
    /// Conversion electron (process code 168).
    Ce,
    /// External radiative pion capture (process code 178).
    ExternalRpc,
    /// Internal radiative pion capture (process code 179).
    InternalRpc,
    /// Cosmic-ray generators (generator code 38 or 44).
    Cosmic,
    Other,
}

impl McOrigin {
    fn classify(start_code: i64, gen_code: i64) -> McOrigin {
        match start_code {
            166 => McOrigin::Dio,
            168 => McOrigin::Ce,
            178 => McOrigin::ExternalRpc,
            179 => McOrigin::InternalRpc,
            _ if gen_code == 38 || gen_code == 44 => McOrigin::Cosmic,
            _ => McOrigin::Other,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            McOrigin::Dio => "DIO",
            McOrigin::Ce => "CE",
            McOrigin::ExternalRpc => "eRPC",
            McOrigin::InternalRpc => "iRPC",
            McOrigin::Cosmic => "cosmic",
            McOrigin::Other => "other",
        }
    }
}

/// Per-origin event yields for a sample.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OriginYields {
    pub dio: usize,
    pub ce: usize,
    pub external_rpc: usize,
    pub internal_rpc: usize,
    pub cosmic: usize,
    pub other: usize,
}

fn jagged<'a>(c: &'a EventCollection, field: &str) -> Result<&'a Vec<Vec<i64>>> {
    match c.column(field)? {
        Column::JaggedI64(v) => Ok(v),
        other => Err(Error::ShapeMismatch(format!(
            "field '{}' is {}, expected jagged i64",
            field,
            other.type_name()
        ))),
    }
}

fn sim_columns<'a>(c: &'a EventCollection) -> Result<(&'a Vec<Vec<i64>>, &'a Vec<Vec<i64>>)> {
    Ok((jagged(c, SIM_START_CODE)?, jagged(c, SIM_GEN_CODE)?))
}

/// Classify each event by the origin of its first (primary) simulated track.
/// Events without simulated tracks yield `None`.
///
/// Reads `trkmcsim.startCode` and `trkmcsim.gen`.
pub fn classify_origins(c: &EventCollection) -> Result<Vec<Option<McOrigin>>> {
    let (start_codes, gen_codes) = sim_columns(c)?;
    Ok(start_codes
        .iter()
        .zip(gen_codes)
        .map(|(starts, gens)| match (starts.first(), gens.first()) {
            (Some(&start), Some(&gen)) => Some(McOrigin::classify(start, gen)),
            _ => None,
        })
        .collect())
}

/// Tally per-origin event yields over a sample and log the summary.
pub fn count_origins(c: &EventCollection) -> Result<OriginYields> {
    let mut yields = OriginYields::default();
    for origin in classify_origins(c)?.into_iter().flatten() {
        match origin {
            McOrigin::Dio => yields.dio += 1,
            McOrigin::Ce => yields.ce += 1,
            McOrigin::ExternalRpc => yields.external_rpc += 1,
            McOrigin::InternalRpc => yields.internal_rpc += 1,
            McOrigin::Cosmic => yields.cosmic += 1,
            McOrigin::Other => yields.other += 1,
        }
    }
    info!(
        "MC truth yields: DIO={} CE={} eRPC={} iRPC={} cosmic={} other={}",
        yields.dio, yields.ce, yields.external_rpc, yields.internal_rpc, yields.cosmic,
        yields.other
    );
    Ok(yields)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EventCollection {
        EventCollection::from_columns(vec![
            (
                SIM_START_CODE.to_string(),
                Column::JaggedI64(vec![
                    vec![166, 168], // primary is DIO; later tracks ignored
                    vec![168],
                    vec![0],
                    vec![],
                    vec![5],
                ]),
            ),
            (
                SIM_GEN_CODE.to_string(),
                Column::JaggedI64(vec![vec![0, 0], vec![0], vec![44], vec![], vec![7]]),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn primary_track_decides_the_origin() {
        let origins = classify_origins(&sample()).unwrap();
        assert_eq!(
            origins,
            vec![
                Some(McOrigin::Dio),
                Some(McOrigin::Ce),
                Some(McOrigin::Cosmic),
                None,
                Some(McOrigin::Other),
            ]
        );
    }

    #[test]
    fn yields_skip_events_without_sim_tracks() {
        let yields = count_origins(&sample()).unwrap();
        assert_eq!(
            yields,
            OriginYields {
                dio: 1,
                ce: 1,
                cosmic: 1,
                other: 1,
                ..OriginYields::default()
            }
        );
    }

    #[test]
    fn process_code_wins_over_cosmic_generator() {
        assert_eq!(McOrigin::classify(168, 44), McOrigin::Ce);
        assert_eq!(McOrigin::classify(0, 38), McOrigin::Cosmic);
    }
}
