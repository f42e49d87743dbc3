use std::fmt;

/// Step size substituted when a CV is given a non-positive (or non-finite) step.
pub const DEFAULT_STEP: f64 = 0.1;

/// Number of significant digits every interior boundary is rounded to.
pub const SIGNIFICANT_DIGITS: usize = 6;

/// Upper bound on finite edges per CV. WESTPA bin mappers with more edges than
/// this are not usable in practice.
pub const MAX_BIN_EDGES: usize = 1_000_000;

/// One edge of a rectilinear bin mapper.
///
/// The open ends are kept symbolic: WESTPA's configuration loader expects the
/// literal tokens `'-inf'` and `'inf'`, not numeric infinities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Boundary {
    NegInf,
    Value(f64),
    PosInf,
}

impl Boundary {
    pub fn value(&self) -> Option<f64> {
        match self {
            Boundary::Value(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        !matches!(self, Boundary::Value(_))
    }
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Boundary::NegInf => f.write_str("'-inf'"),
            Boundary::PosInf => f.write_str("'inf'"),
            Boundary::Value(v) => f.write_str(&format_float(*v)),
        }
    }
}

/// Ordered bin edges for a single progress-coordinate dimension.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BinBoundaries {
    edges: Vec<Boundary>,
}

impl BinBoundaries {
    pub fn edges(&self) -> &[Boundary] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Finite interior edges, sentinels excluded.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.edges.iter().filter_map(Boundary::value)
    }

    /// Renders the edges as a YAML flow sequence, e.g. `['-inf', 0.0, 0.5, 'inf']`.
    pub fn to_flow_list(&self) -> String {
        let items: Vec<String> = self.edges.iter().map(ToString::to_string).collect();
        format!("[{}]", items.join(", "))
    }
}

/// Returns the step to use for discretization and whether it had to be replaced.
pub fn normalize_step(step: f64) -> (f64, bool) {
    if step.is_finite() && step > 0.0 {
        (step, false)
    } else {
        (DEFAULT_STEP, true)
    }
}

/// Number of finite edges `generate_bin_boundaries` produces for a range, or
/// `None` when the range is not finite or would exceed [`MAX_BIN_EDGES`].
/// A reversed range has zero edges.
pub fn edge_count(min: f64, max: f64, step: f64) -> Option<usize> {
    if !min.is_finite() || !max.is_finite() {
        return None;
    }
    let (step, _) = normalize_step(step);
    let intervals = ((max - min) / step).round_ties_even();
    if !intervals.is_finite() {
        return None;
    }
    if intervals < 0.0 {
        return Some(0);
    }
    if intervals >= MAX_BIN_EDGES as f64 {
        return None;
    }
    usize::try_from(intervals as u64).ok()?.checked_add(1)
}

/// Discretizes `[min, max]` into evenly spaced edges `min + i * step`.
///
/// The number of intervals is `round((max - min) / step)` with ties rounded to
/// even, so `max` is reached even when the range is not an exact multiple of the
/// step in binary floating point. Each edge is rounded to
/// [`SIGNIFICANT_DIGITS`] significant digits to strip accumulated error
/// (`0.6000000000000001` becomes `0.6`). A reversed range yields no interior
/// edges, and so does a non-finite range. Ranges beyond [`MAX_BIN_EDGES`] are
/// truncated to that many edges; records are validated against the cap before
/// they get here.
pub fn generate_bin_boundaries(
    min: f64,
    max: f64,
    step: f64,
    include_infinite_bounds: bool,
) -> BinBoundaries {
    let (step, _) = normalize_step(step);
    let count = match edge_count(min, max, step) {
        Some(count) => count,
        None if min.is_finite() && max.is_finite() && max > min => MAX_BIN_EDGES,
        None => 0,
    };

    let mut edges = Vec::with_capacity(count.saturating_add(2));
    if include_infinite_bounds {
        edges.push(Boundary::NegInf);
    }
    edges.extend((0..count).map(|i| {
        Boundary::Value(round_significant(min + i as f64 * step, SIGNIFICANT_DIGITS))
    }));
    if include_infinite_bounds {
        edges.push(Boundary::PosInf);
    }

    BinBoundaries { edges }
}

/// Number of progress-coordinate points WESTPA stores per iteration: the parent
/// frame plus one point every `ntpr` steps of an `nstlim`-step segment.
pub fn pcoord_len(nstlim: u64, ntpr: u64) -> u64 {
    nstlim / ntpr.max(1) + 1
}

fn round_significant(value: f64, digits: usize) -> f64 {
    if value == 0.0 || !value.is_finite() {
        return value;
    }
    format!("{:.*e}", digits.saturating_sub(1), value)
        .parse()
        .unwrap_or(value)
}

/// Formats a float so YAML 1.1 loaders resolve it as a float: integral values
/// keep a trailing `.0`, everything else uses the shortest round-trip form.
pub(crate) fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}
