//! Game Logic Module
//!
//! Pure rules with no I/O.
//!
//! ## Module Structure
//!
//! - `board`: card layout, reveal/match/hide, snapshots
//! - `state`: player seats, turn phase, scores, result
//! - `turn`: authoritative move processing

pub mod board;
pub mod state;
pub mod turn;

// Re-export key types
pub use board::{Board, BoardError, BoardSize, CardId, CellView, Coord, Snapshot};
pub use state::{GameResult, GameState, Phase, PlayerSlot, Scores};
pub use turn::{MismatchResolved, MoveOutcome, MoveRejection};
