//! E4000 IF gain distribution
//!
//! The E4000 has six cascaded IF stages with fixed discrete ranges. A
//! requested total is spread across them greedily, deciding the last stage
//! first. The search is local and order-dependent, not a global optimum.

use crate::range::Range;

/// E4000 IF stages 1..=6 as (start, stop, step) in dB
pub const E4000_IF_STAGES: [Range; 6] = [
    Range { start: -3.0, stop: 6.0, step: 9.0 },
    Range { start: 0.0, stop: 9.0, step: 3.0 },
    Range { start: 0.0, stop: 9.0, step: 3.0 },
    Range { start: 0.0, stop: 2.0, step: 1.0 },
    Range { start: 3.0, stop: 15.0, step: 3.0 },
    Range { start: 3.0, stop: 15.0, step: 3.0 },
];

/// Per-stage gains (in stage order) approximating `requested` dB.
///
/// Every stage starts at its minimum. Stages are then decided from last to
/// first: each candidate value is tried with the other stages at their
/// current assignment, and a candidate replaces the incumbent only when its
/// absolute error against `requested` is strictly smaller. The incumbent
/// error starts at `requested` itself.
pub fn distribute(stages: &[Range], requested: f64) -> Vec<f64> {
    let mut gains: Vec<f64> = stages.iter().map(|r| r.start).collect();

    for i in (0..stages.len()).rev() {
        let stage = &stages[i];
        let mut error = requested;
        let mut best = stage.start;

        let mut candidate = stage.start;
        while candidate <= stage.stop {
            gains[i] = candidate;

            let sum: f64 = gains.iter().sum();
            let err = (requested - sum).abs();
            if err < error {
                error = err;
                best = candidate;
            }

            if stage.step <= 0.0 {
                break;
            }
            candidate += stage.step;
        }

        gains[i] = best;
    }

    gains
}
