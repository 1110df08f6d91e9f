//! Game State Definitions
//!
//! Turn ownership, pick phase, scores and the final result. Owned by the
//! coordinator; only `game::turn` mutates it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::game::board::{Board, Coord};

// =============================================================================
// PLAYER SLOT
// =============================================================================

/// One of the two seats, assigned in connection order.
///
/// Internally 0-based; displayed 1-based as on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PlayerSlot {
    /// First player to connect. Moves first.
    One,
    /// Second player to connect.
    Two,
}

impl PlayerSlot {
    /// Seat for a 0-based index.
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(PlayerSlot::One),
            1 => Some(PlayerSlot::Two),
            _ => None,
        }
    }

    /// Seat for the 1-based number shown to players.
    pub fn from_number(number: u8) -> Option<Self> {
        Self::from_index(usize::from(number).checked_sub(1)?)
    }

    /// 0-based index.
    pub fn index(self) -> usize {
        match self {
            PlayerSlot::One => 0,
            PlayerSlot::Two => 1,
        }
    }

    /// 1-based number.
    pub fn number(self) -> u8 {
        self.index() as u8 + 1
    }

    /// The other seat.
    pub fn other(self) -> Self {
        match self {
            PlayerSlot::One => PlayerSlot::Two,
            PlayerSlot::Two => PlayerSlot::One,
        }
    }
}

impl fmt::Display for PlayerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Player {}", self.number())
    }
}

// =============================================================================
// SCORES AND RESULT
// =============================================================================

/// Pairs found by each player.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scores {
    /// Player 1's pairs.
    pub player_one: u32,
    /// Player 2's pairs.
    pub player_two: u32,
}

impl Scores {
    /// Score for a seat.
    pub fn get(&self, player: PlayerSlot) -> u32 {
        match player {
            PlayerSlot::One => self.player_one,
            PlayerSlot::Two => self.player_two,
        }
    }

    /// Credit one pair to `player`.
    pub fn award(&mut self, player: PlayerSlot) {
        match player {
            PlayerSlot::One => self.player_one += 1,
            PlayerSlot::Two => self.player_two += 1,
        }
    }

    /// Higher score wins; equal scores tie.
    pub fn result(&self) -> GameResult {
        use std::cmp::Ordering;

        match self.player_one.cmp(&self.player_two) {
            Ordering::Greater => GameResult::Winner(PlayerSlot::One),
            Ordering::Less => GameResult::Winner(PlayerSlot::Two),
            Ordering::Equal => GameResult::Tie,
        }
    }
}

/// How a finished game ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameResult {
    /// One player found more pairs.
    Winner(PlayerSlot),
    /// Both players found the same number of pairs.
    Tie,
}

// =============================================================================
// PHASE
// =============================================================================

/// Sub-state within the current player's turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// No card picked yet this turn.
    AwaitingFirstPick,
    /// One card face up, waiting for the second.
    AwaitingSecondPick {
        /// The card picked first.
        first: Coord,
    },
    /// A mismatched pair is held face up before being hidden again.
    Resolving {
        /// The card picked first.
        first: Coord,
        /// The card picked second.
        second: Coord,
    },
}

impl Phase {
    /// First pick of the turn in progress, if any.
    pub fn first_pick(&self) -> Option<Coord> {
        match self {
            Phase::AwaitingFirstPick => None,
            Phase::AwaitingSecondPick { first } | Phase::Resolving { first, .. } => Some(*first),
        }
    }
}

// =============================================================================
// GAME STATE
// =============================================================================

/// Authoritative state of one game.
#[derive(Clone, Debug)]
pub struct GameState {
    /// The board.
    pub board: Board,
    /// Whose moves are accepted.
    pub current: PlayerSlot,
    /// Progress within the current turn.
    pub phase: Phase,
    /// Pairs found so far.
    pub scores: Scores,
    /// Set once the board is complete; never cleared.
    pub result: Option<GameResult>,
}

impl GameState {
    /// Fresh game with Player 1 to move.
    pub fn new(board: Board) -> Self {
        Self {
            board,
            current: PlayerSlot::One,
            phase: Phase::AwaitingFirstPick,
            scores: Scores::default(),
            result: None,
        }
    }

    /// Whether the game has finished.
    pub fn is_over(&self) -> bool {
        self.result.is_some()
    }
}
