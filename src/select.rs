use std::str::FromStr;

use crate::data::model::{Column, EventCollection, Mask};
use crate::error::{Error, Result};

// Fields the predicates read.
const TRK_PDG: &str = "trk.pdg";
const TRK_NACTIVE: &str = "trk.nactive";
const TRKQUAL_RESULT: &str = "trkqual.result";
const SEG_SID: &str = "trksegs.sid";
const SEG_SINDEX: &str = "trksegs.sindex";
const SEG_MOM_Z: &str = "trksegs.mom_z";

// ---------------------------------------------------------------------------
// Particle types and detector surfaces
// ---------------------------------------------------------------------------

/// Track hypothesis particle type, identified by PDG code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticleType {
    EMinus,
    EPlus,
    MuMinus,
    MuPlus,
}

impl ParticleType {
    pub fn pdg_code(self) -> i64 {
        match self {
            ParticleType::EMinus => 11,
            ParticleType::EPlus => -11,
            ParticleType::MuMinus => 13,
            ParticleType::MuPlus => -13,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ParticleType::EMinus => "e-",
            ParticleType::EPlus => "e+",
            ParticleType::MuMinus => "mu-",
            ParticleType::MuPlus => "mu+",
        }
    }
}

impl FromStr for ParticleType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "e-" => Ok(ParticleType::EMinus),
            "e+" => Ok(ParticleType::EPlus),
            "mu-" => Ok(ParticleType::MuMinus),
            "mu+" => Ok(ParticleType::MuPlus),
            other => Err(Error::Schema(format!(
                "unknown particle type '{other}', expected one of e-, e+, mu-, mu+"
            ))),
        }
    }
}

/// A detector surface a track segment can be evaluated at: surface id plus
/// sub-index (for segmented surfaces such as stopping-target foils).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Surface {
    pub sid: i64,
    pub sindex: i64,
}

impl Surface {
    pub const TT_FRONT: Surface = Surface { sid: 0, sindex: 0 };
    pub const TT_MID: Surface = Surface { sid: 1, sindex: 0 };
    pub const TT_BACK: Surface = Surface { sid: 2, sindex: 0 };
    pub const ST_FOILS: Surface = Surface { sid: 3, sindex: 0 };
    pub const OPA: Surface = Surface { sid: 4, sindex: 0 };

    pub const fn new(sid: i64, sindex: i64) -> Self {
        Surface { sid, sindex }
    }

    /// Look up a surface by its catalog name.
    pub fn by_name(name: &str) -> Result<Surface> {
        match name {
            "TT_Front" => Ok(Surface::TT_FRONT),
            "TT_Mid" => Ok(Surface::TT_MID),
            "TT_Back" => Ok(Surface::TT_BACK),
            "ST_Foils" => Ok(Surface::ST_FOILS),
            "OPA" => Ok(Surface::OPA),
            other => Err(Error::Schema(format!("unknown surface '{other}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Elementwise mask helpers
// ---------------------------------------------------------------------------

/// Event mask from a per-value predicate over an integer column. A jagged
/// column marks the event as passing when any in-event entry passes.
fn int_mask<P: Fn(i64) -> bool>(c: &EventCollection, field: &str, pred: P) -> Result<Mask> {
    match c.column(field)? {
        Column::I64(v) => Ok(Mask::new(v.iter().map(|&x| pred(x)).collect())),
        Column::JaggedI64(v) => Ok(Mask::new(
            v.iter().map(|xs| xs.iter().any(|&x| pred(x))).collect(),
        )),
        other => Err(Error::ShapeMismatch(format!(
            "field '{}' is {}, expected an integer column",
            field,
            other.type_name()
        ))),
    }
}

/// Event mask from a per-value predicate over a float column, with the same
/// any-entry semantics for jagged columns. NaN never passes a comparison.
fn float_mask<P: Fn(f64) -> bool>(c: &EventCollection, field: &str, pred: P) -> Result<Mask> {
    match c.column(field)? {
        Column::F64(v) => Ok(Mask::new(v.iter().map(|&x| pred(x)).collect())),
        Column::JaggedF64(v) => Ok(Mask::new(
            v.iter().map(|xs| xs.iter().any(|&x| pred(x))).collect(),
        )),
        other => Err(Error::ShapeMismatch(format!(
            "field '{}' is {}, expected a float column",
            field,
            other.type_name()
        ))),
    }
}

fn jagged_i64<'a>(c: &'a EventCollection, field: &str) -> Result<&'a Vec<Vec<i64>>> {
    match c.column(field)? {
        Column::JaggedI64(v) => Ok(v),
        other => Err(Error::ShapeMismatch(format!(
            "field '{}' is {}, expected jagged i64",
            field,
            other.type_name()
        ))),
    }
}

fn jagged_f64<'a>(c: &'a EventCollection, field: &str) -> Result<&'a Vec<Vec<f64>>> {
    match c.column(field)? {
        Column::JaggedF64(v) => Ok(v),
        other => Err(Error::ShapeMismatch(format!(
            "field '{}' is {}, expected jagged f64",
            field,
            other.type_name()
        ))),
    }
}

/// Per-event segment view over the sid/sindex/mom_z triplet, validating that
/// the three jagged columns agree on per-event segment counts.
fn for_each_event_segments<F>(c: &EventCollection, mut visit: F) -> Result<Mask>
where
    F: FnMut(&[i64], &[i64], &[f64]) -> bool,
{
    let sid = jagged_i64(c, SEG_SID)?;
    let sindex = jagged_i64(c, SEG_SINDEX)?;
    let mom_z = jagged_f64(c, SEG_MOM_Z)?;
    let mut bits = Vec::with_capacity(sid.len());
    for (event, ((s, i), z)) in sid.iter().zip(sindex).zip(mom_z).enumerate() {
        if s.len() != i.len() || s.len() != z.len() {
            return Err(Error::ShapeMismatch(format!(
                "event {}: segment columns disagree on length ({}, {}, {})",
                event,
                s.len(),
                i.len(),
                z.len()
            )));
        }
        bits.push(visit(s, i, z));
    }
    Ok(Mask::new(bits))
}

fn seg_at(surface: Surface, sid: &[i64], sindex: &[i64]) -> Vec<usize> {
    sid.iter()
        .zip(sindex)
        .enumerate()
        .filter(|(_, (&s, &i))| s == surface.sid && i == surface.sindex)
        .map(|(idx, _)| idx)
        .collect()
}

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

/// Reads `trk.pdg`; passes where the PDG code equals the requested particle.
pub fn is_particle(c: &EventCollection, particle: ParticleType) -> Result<Mask> {
    let code = particle.pdg_code();
    int_mask(c, TRK_PDG, |pdg| pdg == code)
}

/// Reads `trk.pdg`; passes for downstream e- candidates (PDG 11).
pub fn is_electron(c: &EventCollection) -> Result<Mask> {
    is_particle(c, ParticleType::EMinus)
}

/// Reads `trk.pdg`; passes for e+ candidates (PDG -11).
pub fn is_positron(c: &EventCollection) -> Result<Mask> {
    is_particle(c, ParticleType::EPlus)
}

/// Reads `trk.pdg`; passes for mu- candidates (PDG 13).
pub fn is_mu_minus(c: &EventCollection) -> Result<Mask> {
    is_particle(c, ParticleType::MuMinus)
}

/// Reads `trk.pdg`; passes for mu+ candidates (PDG -13).
pub fn is_mu_plus(c: &EventCollection) -> Result<Mask> {
    is_particle(c, ParticleType::MuPlus)
}

/// Reads `trkqual.result`; passes where the track quality score is strictly
/// above `quality`. NaN scores never pass.
pub fn select_trkqual(c: &EventCollection, quality: f64) -> Result<Mask> {
    float_mask(c, TRKQUAL_RESULT, |q| q > quality)
}

/// Reads `trk.nactive`; passes where the active-hit count is strictly above
/// `n_hits`.
pub fn has_n_hits(c: &EventCollection, n_hits: i64) -> Result<Mask> {
    int_mask(c, TRK_NACTIVE, |n| n > n_hits)
}

/// Reads `trksegs.sid` and `trksegs.sindex`; passes where any track segment
/// sits on the given surface.
pub fn at_surface(c: &EventCollection, surface: Surface) -> Result<Mask> {
    let sid = jagged_i64(c, SEG_SID)?;
    let sindex = jagged_i64(c, SEG_SINDEX)?;
    let mut bits = Vec::with_capacity(sid.len());
    for (event, (s, i)) in sid.iter().zip(sindex).enumerate() {
        if s.len() != i.len() {
            return Err(Error::ShapeMismatch(format!(
                "event {}: sid has {} segments, sindex has {}",
                event,
                s.len(),
                i.len()
            )));
        }
        bits.push(!seg_at(surface, s, i).is_empty());
    }
    Ok(Mask::new(bits))
}

/// Reads `trksegs.sid`/`sindex`/`mom_z`; passes where a segment at the
/// tracker entrance moves downstream (positive longitudinal momentum).
pub fn is_downstream(c: &EventCollection) -> Result<Mask> {
    direction(c, Surface::TT_FRONT, |z| z > 0.0)
}

/// Reads `trksegs.sid`/`sindex`/`mom_z`; passes where a segment at the
/// tracker entrance moves upstream (negative longitudinal momentum).
pub fn is_upstream(c: &EventCollection) -> Result<Mask> {
    direction(c, Surface::TT_FRONT, |z| z < 0.0)
}

fn direction<P: Fn(f64) -> bool + Copy>(
    c: &EventCollection,
    surface: Surface,
    pass: P,
) -> Result<Mask> {
    for_each_event_segments(c, |sid, sindex, mom_z| {
        seg_at(surface, sid, sindex).iter().any(|&i| pass(mom_z[i]))
    })
}

/// Reads `trksegs.sid`/`sindex`/`mom_z`; passes where the track is reflected
/// at the given surface, i.e. both an inbound (upstream-going) and an
/// outbound (downstream-going) segment are present there.
pub fn is_reflected(c: &EventCollection, surface: Surface) -> Result<Mask> {
    for_each_event_segments(c, |sid, sindex, mom_z| {
        let at = seg_at(surface, sid, sindex);
        at.iter().any(|&i| mom_z[i] < 0.0) && at.iter().any(|&i| mom_z[i] > 0.0)
    })
}

/// Conjunction of a list of event-aligned masks. All masks must share the
/// same event count; the result is independent of list order.
pub fn combine(masks: &[Mask]) -> Result<Mask> {
    let mut iter = masks.iter();
    let first = iter
        .next()
        .ok_or_else(|| Error::ShapeMismatch("cannot combine an empty mask list".to_string()))?;
    iter.try_fold(first.clone(), |acc, mask| acc.and(mask))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracks() -> EventCollection {
        EventCollection::from_columns(vec![
            (
                TRK_PDG.to_string(),
                Column::JaggedI64(vec![vec![11], vec![-11, 13], vec![], vec![11, 11]]),
            ),
            (
                TRK_NACTIVE.to_string(),
                Column::JaggedI64(vec![vec![25], vec![12, 30], vec![], vec![18, 19]]),
            ),
            (
                TRKQUAL_RESULT.to_string(),
                Column::JaggedF64(vec![vec![0.9], vec![0.3, 0.6], vec![], vec![f64::NAN, 0.2]]),
            ),
        ])
        .unwrap()
    }

    fn segments() -> EventCollection {
        // Event 0: downstream at entrance. Event 1: reflected (both signs).
        // Event 2: upstream only. Event 3: no entrance segment.
        EventCollection::from_columns(vec![
            (
                SEG_SID.to_string(),
                Column::JaggedI64(vec![vec![0, 1], vec![0, 0, 2], vec![0], vec![1, 2]]),
            ),
            (
                SEG_SINDEX.to_string(),
                Column::JaggedI64(vec![vec![0, 0], vec![0, 0, 0], vec![0], vec![0, 0]]),
            ),
            (
                SEG_MOM_Z.to_string(),
                Column::JaggedF64(vec![
                    vec![87.0, 85.5],
                    vec![-40.2, 41.0, 39.8],
                    vec![-103.0],
                    vec![55.0, 54.0],
                ]),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn particle_masks_are_event_aligned() {
        let c = tracks();
        let electrons = is_electron(&c).unwrap();
        assert_eq!(electrons.len(), c.len());
        assert_eq!(electrons.bits(), &[true, false, false, true]);
        assert_eq!(is_positron(&c).unwrap().bits(), &[false, true, false, false]);
        assert_eq!(is_mu_minus(&c).unwrap().bits(), &[false, true, false, false]);
        assert_eq!(is_mu_plus(&c).unwrap().count_passing(), 0);
    }

    #[test]
    fn particle_labels_round_trip() {
        for label in ["e-", "e+", "mu-", "mu+"] {
            assert_eq!(label.parse::<ParticleType>().unwrap().label(), label);
        }
        assert!("pi-".parse::<ParticleType>().is_err());
    }

    #[test]
    fn has_n_hits_is_a_strict_threshold() {
        let c = tracks();
        let mask = has_n_hits(&c, 19).unwrap();
        // 25 and 30 pass; 19 does not (strictly greater).
        assert_eq!(mask.bits(), &[true, true, false, false]);
    }

    #[test]
    fn trkqual_ignores_nan_scores() {
        let c = tracks();
        let mask = select_trkqual(&c, 0.5).unwrap();
        assert_eq!(mask.bits(), &[true, true, false, false]);
    }

    #[test]
    fn surface_and_direction_classification() {
        let c = segments();
        assert_eq!(
            at_surface(&c, Surface::TT_FRONT).unwrap().bits(),
            &[true, true, true, false]
        );
        assert_eq!(
            is_downstream(&c).unwrap().bits(),
            &[true, true, false, false]
        );
        assert_eq!(is_upstream(&c).unwrap().bits(), &[false, true, true, false]);
        assert_eq!(
            is_reflected(&c, Surface::TT_FRONT).unwrap().bits(),
            &[false, true, false, false]
        );
    }

    #[test]
    fn combine_is_order_independent() {
        let c = tracks();
        let a = is_electron(&c).unwrap();
        let b = has_n_hits(&c, 19).unwrap();
        let ab = combine(&[a.clone(), b.clone()]).unwrap();
        let ba = combine(&[b, a]).unwrap();
        assert_eq!(ab, ba);
        assert_eq!(ab.bits(), &[true, false, false, false]);
    }

    #[test]
    fn mismatched_segment_columns_are_rejected() {
        let c = EventCollection::from_columns(vec![
            (SEG_SID.to_string(), Column::JaggedI64(vec![vec![0, 1]])),
            (SEG_SINDEX.to_string(), Column::JaggedI64(vec![vec![0]])),
            (SEG_MOM_Z.to_string(), Column::JaggedF64(vec![vec![1.0, 2.0]])),
        ])
        .unwrap();
        assert!(matches!(
            is_downstream(&c),
            Err(Error::ShapeMismatch(_))
        ));
    }
}
