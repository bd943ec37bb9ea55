use log::{debug, info};
use serde::Serialize;

use crate::data::model::Mask;
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Cut bookkeeping
// ---------------------------------------------------------------------------

/// A named selection cut: an event-aligned mask plus bookkeeping for
/// toggling and reporting.
#[derive(Debug, Clone)]
struct Cut {
    name: String,
    description: String,
    mask: Mask,
    active: bool,
    group: Option<String>,
}

/// One row of a cut-flow table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CutFlowRow {
    pub name: String,
    pub group: Option<String>,
    pub events_passing: usize,
    /// Percentage of all events surviving up to and including this cut.
    pub absolute_frac: f64,
    /// Percentage relative to the previous row.
    pub relative_frac: f64,
    pub description: String,
}

/// Registry of named cuts over one event collection.
///
/// Cuts are combined by logical AND in insertion order; inactive cuts are
/// skipped. All masks must carry the event count of the collection they were
/// derived from, so mixing cuts from differently-shaped collections fails
/// with `ShapeMismatch` at combination time.
#[derive(Debug, Clone, Default)]
pub struct CutManager {
    cuts: Vec<Cut>,
}

impl CutManager {
    pub fn new() -> Self {
        CutManager::default()
    }

    /// Register a cut. Names must be unique.
    pub fn add_cut(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        mask: Mask,
        active: bool,
        group: Option<&str>,
    ) -> Result<()> {
        let name = name.into();
        if self.cuts.iter().any(|c| c.name == name) {
            return Err(Error::Schema(format!("cut '{name}' already defined")));
        }
        debug!("added cut '{name}' ({mask})");
        self.cuts.push(Cut {
            name,
            description: description.into(),
            mask,
            active,
            group: group.map(String::from),
        });
        Ok(())
    }

    /// Activate or deactivate a single cut.
    pub fn set_active(&mut self, name: &str, active: bool) -> Result<()> {
        let cut = self
            .cuts
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| Error::Schema(format!("no cut named '{name}'")))?;
        cut.active = active;
        Ok(())
    }

    /// Activate or deactivate every cut of a group; returns how many cuts
    /// were toggled.
    pub fn set_group_active(&mut self, group: &str, active: bool) -> Result<usize> {
        let mut toggled = 0;
        for cut in self.cuts.iter_mut().filter(|c| c.group.as_deref() == Some(group)) {
            cut.active = active;
            toggled += 1;
        }
        if toggled == 0 {
            return Err(Error::Schema(format!("no cuts in group '{group}'")));
        }
        info!("set {toggled} cut(s) in group '{group}' to active={active}");
        Ok(toggled)
    }

    /// Names of the currently active cuts, in insertion order.
    pub fn active_names(&self) -> Vec<&str> {
        self.cuts
            .iter()
            .filter(|c| c.active)
            .map(|c| c.name.as_str())
            .collect()
    }

    /// AND-combination of the active cuts, in insertion order.
    pub fn combine(&self) -> Result<Mask> {
        let mut combined: Option<Mask> = None;
        for cut in self.cuts.iter().filter(|c| c.active) {
            combined = Some(match combined {
                None => cut.mask.clone(),
                Some(acc) => acc.and(&cut.mask)?,
            });
        }
        combined.ok_or_else(|| Error::ShapeMismatch("no active cuts to combine".to_string()))
    }

    /// Cumulative cut flow over the active cuts for a collection of
    /// `n_events` events. The first row reports the uncut sample.
    pub fn cut_flow(&self, n_events: usize) -> Result<Vec<CutFlowRow>> {
        let mut rows = vec![CutFlowRow {
            name: "No cuts".to_string(),
            group: None,
            events_passing: n_events,
            absolute_frac: 100.0,
            relative_frac: 100.0,
            description: "No selection applied".to_string(),
        }];

        let mut cumulative: Option<Mask> = None;
        for cut in self.cuts.iter().filter(|c| c.active) {
            if cut.mask.len() != n_events {
                return Err(Error::ShapeMismatch(format!(
                    "cut '{}' spans {} events, collection has {}",
                    cut.name,
                    cut.mask.len(),
                    n_events
                )));
            }
            let current = match cumulative {
                None => cut.mask.clone(),
                Some(acc) => acc.and(&cut.mask)?,
            };
            let passing = current.count_passing();
            let previous = rows.last().map(|r| r.events_passing).unwrap_or(0);
            rows.push(CutFlowRow {
                name: cut.name.clone(),
                group: cut.group.clone(),
                events_passing: passing,
                absolute_frac: frac(passing, n_events),
                relative_frac: frac(passing, previous),
                description: cut.description.clone(),
            });
            cumulative = Some(current);
        }
        Ok(rows)
    }
}

fn frac(passing: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        passing as f64 / total as f64 * 100.0
    }
}

// ---------------------------------------------------------------------------
// Cut-flow combination and export
// ---------------------------------------------------------------------------

/// Merge per-file cut flows produced by the same cut set: event counts are
/// summed row by row and the fractions recomputed.
pub fn merge_cut_flows(flows: &[Vec<CutFlowRow>]) -> Result<Vec<CutFlowRow>> {
    let template = flows
        .first()
        .ok_or_else(|| Error::ShapeMismatch("no cut flows to merge".to_string()))?;
    let mut merged: Vec<CutFlowRow> = template
        .iter()
        .map(|row| CutFlowRow {
            events_passing: 0,
            ..row.clone()
        })
        .collect();

    for flow in flows {
        if flow.len() != merged.len()
            || flow.iter().zip(&merged).any(|(a, b)| a.name != b.name)
        {
            return Err(Error::ShapeMismatch(
                "cut flows carry different cut sequences".to_string(),
            ));
        }
        for (out, row) in merged.iter_mut().zip(flow) {
            out.events_passing += row.events_passing;
        }
    }

    let total = merged.first().map(|r| r.events_passing).unwrap_or(0);
    let mut previous = total;
    for (i, row) in merged.iter_mut().enumerate() {
        row.absolute_frac = frac(row.events_passing, total);
        row.relative_frac = if i == 0 {
            100.0
        } else {
            frac(row.events_passing, previous)
        };
        previous = row.events_passing;
    }
    Ok(merged)
}

/// Render a cut flow as CSV text.
pub fn cut_flow_to_csv(rows: &[CutFlowRow]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| Error::Export(e.to_string()))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| Error::Export(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| Error::Export(e.to_string()))
}

/// Render a cut flow as pretty-printed JSON.
pub fn cut_flow_to_json(rows: &[CutFlowRow]) -> Result<String> {
    serde_json::to_string_pretty(rows).map_err(|e| Error::Export(e.to_string()))
}
