//! Constructive greedy packing.
//!
//! Builds groups directly, one at a time, without a clustering step.
//!
//! # Algorithm
//!
//! 1. Open the next of up to `max_groups` slots.
//! 2. While some unplaced family fits (`size + family ≤ max_size`), add the
//!    one whose addition gives the highest group score. Ties go to the
//!    family that comes first in input order.
//! 3. Close the slot when nothing else fits and move to the next.
//! 4. Place leftovers in the group that best balances closeness to the
//!    preferred size against remaining space. Open a free slot when nothing
//!    fits, or force into the smallest group at the ceiling.
//!
//! # Complexity
//! O(n² · s) where n = families and s = group size.

mod packer;

pub use packer::GreedyPacker;
