//! Capability ranges for tunable parameters (gain stages)

use serde::{Deserialize, Serialize};

/// One linear range `start..=stop` in increments of `step`.
///
/// `step == 0` means continuous, or a single fixed value when
/// `start == stop`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub start: f64,
    pub stop: f64,
    pub step: f64,
}

impl Range {
    pub fn new(start: f64, stop: f64, step: f64) -> Self {
        Self { start, stop, step }
    }

    /// A single fixed value
    pub fn fixed(value: f64) -> Self {
        Self {
            start: value,
            stop: value,
            step: 0.0,
        }
    }
}

/// An ordered list of ranges describing one capability.
///
/// `min`, `max` and `step` return `None` for an empty meta-range; an empty
/// capability has no meaningful bounds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetaRange {
    ranges: Vec<Range>,
}

impl MetaRange {
    pub fn new() -> Self {
        Self::default()
    }

    /// Meta-range holding a single range
    pub fn single(start: f64, stop: f64, step: f64) -> Self {
        Self {
            ranges: vec![Range::new(start, stop, step)],
        }
    }

    pub fn push(&mut self, range: Range) {
        self.ranges.push(range);
    }

    pub fn ranges(&self) -> &[Range] {
        &self.ranges
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Minimum of all range starts
    pub fn min(&self) -> Option<f64> {
        self.ranges.iter().map(|r| r.start).reduce(f64::min)
    }

    /// Maximum of all range stops
    pub fn max(&self) -> Option<f64> {
        self.ranges.iter().map(|r| r.stop).reduce(f64::max)
    }

    /// Smallest increment across the meta-range.
    ///
    /// Candidates are every non-zero per-range step and every positive gap
    /// between one range's stop and the next range's start. Returns
    /// `Some(0.0)` when there is no candidate (continuous or fixed).
    pub fn step(&self) -> Option<f64> {
        let first = self.ranges.first()?;

        let mut last_stop = first.stop;
        let mut smallest: Option<f64> = None;
        for r in &self.ranges {
            let gap = r.start - last_stop;
            for candidate in [r.step, gap] {
                if candidate > 0.0 {
                    smallest = Some(smallest.map_or(candidate, |s| s.min(candidate)));
                }
            }
            last_stop = r.stop;
        }

        Some(smallest.unwrap_or(0.0))
    }

    /// Whether `value` lies within `min()..=max()`
    pub fn contains(&self, value: f64) -> bool {
        match (self.min(), self.max()) {
            (Some(min), Some(max)) => value >= min && value <= max,
            _ => false,
        }
    }

    /// Every discrete value of every range, in order.
    ///
    /// A range with `step == 0` yields its start only.
    pub fn values(&self) -> Vec<f64> {
        let mut values = Vec::new();
        for r in &self.ranges {
            if r.step > 0.0 {
                let mut v = r.start;
                while v <= r.stop {
                    values.push(v);
                    v += r.step;
                }
            } else {
                values.push(r.start);
            }
        }
        values
    }
}

impl From<Range> for MetaRange {
    fn from(range: Range) -> Self {
        Self {
            ranges: vec![range],
        }
    }
}

impl FromIterator<Range> for MetaRange {
    fn from_iter<I: IntoIterator<Item = Range>>(iter: I) -> Self {
        Self {
            ranges: iter.into_iter().collect(),
        }
    }
}

/// One named, independently controllable gain control
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gain {
    pub stage: String,
    pub range: MetaRange,
}

impl Gain {
    pub fn new<S: Into<String>>(stage: S, range: MetaRange) -> Self {
        Self {
            stage: stage.into(),
            range,
        }
    }
}
