//! Partition quality scoring.
//!
//! Every algorithm is judged by the same score so that their results are
//! directly comparable.
//!
//! # Sub-scores (per group of size `s`, each in `0..=10`)
//!
//! | Dimension | Definition |
//! |-----------|-----------|
//! | Size | `max(0, 10 - 2·|s - preferred|)` |
//! | Gender | `10 · (members in even-count gender buckets) / s` |
//! | Age | `10 · (largest same-age count) / s` |
//! | Equipment (grouping) | `10 · (largest same-class count) / s` |
//! | Equipment (distribution) | `10 · (distinct classes) / min(s, 3)` |
//!
//! The partition score averages each sub-score over groups, multiplies the
//! gender, age and equipment averages by their weights, and sums the four.

mod breakdown;

pub use breakdown::{GroupScore, ScoreBreakdown};
