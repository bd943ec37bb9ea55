use serde::{Deserialize, Serialize};

use crate::data::model::Column;
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// HistStyle – explicit per-call presentation configuration
// ---------------------------------------------------------------------------

/// Axis scale for an external charting consumer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisScale {
    #[default]
    Linear,
    Log,
}

/// Presentation options for one histogram, passed explicitly to whatever
/// renders it. Defaults: untitled, linear axes, "# events per bin" y label.
///
/// There is deliberately no process-wide style state: every plot call gets
/// its own `HistStyle`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistStyle {
    pub title: Option<String>,
    pub x_label: Option<String>,
    pub y_label: String,
    pub x_scale: AxisScale,
    pub y_scale: AxisScale,
    /// Whether the summary-statistics box should be shown.
    pub show_stats: bool,
}

impl Default for HistStyle {
    fn default() -> Self {
        HistStyle {
            title: None,
            x_label: None,
            y_label: "# events per bin".to_string(),
            x_scale: AxisScale::Linear,
            y_scale: AxisScale::Linear,
            show_stats: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Histogram – fixed-range 1-D binning with under/overflow
// ---------------------------------------------------------------------------

/// Summary statistics over everything filled into a histogram, computed from
/// the raw values (not the binned counts).
#[derive(Debug, Clone, Serialize)]
pub struct HistStats {
    pub entries: usize,
    pub mean: f64,
    /// Standard error on the mean.
    pub mean_err: f64,
    pub std_dev: f64,
    /// Error on the standard deviation assuming normally distributed input.
    pub std_dev_err: f64,
    pub underflow: usize,
    pub overflow: usize,
}

/// A fixed-range 1-D histogram: bin contents, squared-weight sums for bin
/// errors, and under/overflow bookkeeping. Rendering belongs to external
/// charting consumers; this type only carries the numbers they need.
#[derive(Debug, Clone)]
pub struct Histogram {
    lo: f64,
    hi: f64,
    counts: Vec<f64>,
    sumw2: Vec<f64>,
    underflow: usize,
    overflow: usize,
    // Raw-value accumulators for stats. NaN fills poison the moments, as
    // they would in the host numeric layer.
    entries: usize,
    sum: f64,
    sum_sq: f64,
}

impl Histogram {
    /// A histogram with `nbins` equal bins over `[lo, hi]`.
    pub fn new(nbins: usize, lo: f64, hi: f64) -> Result<Self> {
        if nbins == 0 || !(hi > lo) {
            return Err(Error::Schema(format!(
                "invalid histogram range: {nbins} bins over [{lo}, {hi}]"
            )));
        }
        Ok(Histogram {
            lo,
            hi,
            counts: vec![0.0; nbins],
            sumw2: vec![0.0; nbins],
            underflow: 0,
            overflow: 0,
            entries: 0,
            sum: 0.0,
            sum_sq: 0.0,
        })
    }

    /// Fill one value with unit weight.
    pub fn fill(&mut self, value: f64) {
        self.fill_weighted(value, 1.0);
    }

    /// Fill one value with the given weight. NaN values land in no bin but
    /// still count as entries and poison the moments.
    pub fn fill_weighted(&mut self, value: f64, weight: f64) {
        self.entries += 1;
        self.sum += value;
        self.sum_sq += value * value;
        if value < self.lo {
            self.underflow += 1;
        } else if value > self.hi {
            self.overflow += 1;
        } else if !value.is_nan() {
            let nbins = self.counts.len();
            let idx = (((value - self.lo) / (self.hi - self.lo)) * nbins as f64) as usize;
            let idx = idx.min(nbins - 1); // value == hi lands in the last bin
            self.counts[idx] += weight;
            self.sumw2[idx] += weight * weight;
        }
    }

    /// Fill every numeric element of a column, flattening jagged columns.
    pub fn fill_column(&mut self, column: &Column) {
        match column {
            Column::F64(v) => v.iter().for_each(|&x| self.fill(x)),
            Column::I64(v) => v.iter().for_each(|&x| self.fill(x as f64)),
            Column::Bool(v) => v.iter().for_each(|&b| self.fill(b as u8 as f64)),
            Column::JaggedF64(v) => v.iter().flatten().for_each(|&x| self.fill(x)),
            Column::JaggedI64(v) => v.iter().flatten().for_each(|&x| self.fill(x as f64)),
        }
    }

    pub fn n_bins(&self) -> usize {
        self.counts.len()
    }

    /// Bin edges, `n_bins + 1` values from `lo` to `hi`.
    pub fn edges(&self) -> Vec<f64> {
        let nbins = self.counts.len();
        let width = (self.hi - self.lo) / nbins as f64;
        (0..=nbins).map(|i| self.lo + width * i as f64).collect()
    }

    pub fn bin_centers(&self) -> Vec<f64> {
        let edges = self.edges();
        edges.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect()
    }

    pub fn counts(&self) -> &[f64] {
        &self.counts
    }

    /// Per-bin errors: `sqrt(sum of squared weights)`, which reduces to the
    /// Poisson `sqrt(n)` for unit weights.
    pub fn bin_errors(&self) -> Vec<f64> {
        self.sumw2.iter().map(|&w2| w2.sqrt()).collect()
    }

    /// Statistics over the raw filled values.
    pub fn stats(&self) -> HistStats {
        let n = self.entries;
        let (mean, std_dev) = if n == 0 {
            (0.0, 0.0)
        } else {
            let mean = self.sum / n as f64;
            // Population variance, clamped against rounding noise.
            let var = (self.sum_sq / n as f64 - mean * mean).max(0.0);
            (mean, var.sqrt())
        };
        let mean_err = if n == 0 { 0.0 } else { std_dev / (n as f64).sqrt() };
        let std_dev_err = if n == 0 {
            0.0
        } else {
            (std_dev * std_dev / (2.0 * n as f64)).sqrt()
        };
        HistStats {
            entries: n,
            mean,
            mean_err,
            std_dev,
            std_dev_err,
            underflow: self.underflow,
            overflow: self.overflow,
        }
    }
}

/// Round a value to the given number of significant figures.
pub fn round_to_sig_figs(value: f64, sig_figs: u32) -> f64 {
    if value == 0.0 || !value.is_finite() {
        return value;
    }
    let magnitude = value.abs().log10().floor();
    let scale = 10f64.powf(sig_figs as f64 - magnitude - 1.0);
    (value * scale).round() / scale
}
