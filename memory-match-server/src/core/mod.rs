//! Core deterministic primitives.
//!
//! The board shuffle is the only randomized step in a game; everything
//! it needs lives here.

pub mod rng;

pub use rng::{derive_board_seed, DeterministicRng};
