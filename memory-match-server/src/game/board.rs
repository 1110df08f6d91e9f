//! Board and Match Engine
//!
//! The grid of card identities and the parallel grid of revealed flags.
//! Pure data plus the four rules operations; no I/O happens here.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::rng::DeterministicRng;

/// First identity token; identities count upward through printable ASCII.
const FIRST_TOKEN: u8 = b'!';

/// Last printable ASCII character usable as a token.
const LAST_TOKEN: u8 = b'~';

/// Largest number of pairs the token alphabet can label.
pub const MAX_PAIRS: usize = (LAST_TOKEN - FIRST_TOKEN + 1) as usize;

/// Text shown in place of a face-down card.
pub const HIDDEN_PLACEHOLDER: &str = "???";

// =============================================================================
// COORDINATES AND CARDS
// =============================================================================

/// A `(row, col)` cell position, 0-indexed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coord {
    /// Row index.
    pub row: usize,
    /// Column index.
    pub col: usize,
}

impl Coord {
    /// Create a coordinate.
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Card identity shared by exactly two cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CardId(u8);

impl CardId {
    /// Identity for the `index`-th pair, if the alphabet can label it.
    pub fn from_index(index: usize) -> Option<Self> {
        if index < MAX_PAIRS {
            Some(Self(index as u8))
        } else {
            None
        }
    }

    /// Identity displayed as `token`.
    pub fn from_token(token: char) -> Option<Self> {
        let byte = u8::try_from(token).ok()?;
        if (FIRST_TOKEN..=LAST_TOKEN).contains(&byte) {
            Some(Self(byte - FIRST_TOKEN))
        } else {
            None
        }
    }

    /// Printable token for this identity.
    pub fn token(self) -> char {
        char::from(FIRST_TOKEN + self.0)
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

// =============================================================================
// BOARD SIZE
// =============================================================================

/// Board dimensions with a whole number of pairs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSize {
    rows: usize,
    cols: usize,
}

impl BoardSize {
    /// Sizes offered to players when creating a game.
    pub const PRESETS: [BoardSize; 4] = [
        BoardSize { rows: 4, cols: 8 },
        BoardSize { rows: 5, cols: 6 },
        BoardSize { rows: 4, cols: 5 },
        BoardSize { rows: 3, cols: 4 },
    ];

    /// Validate dimensions.
    pub fn new(rows: usize, cols: usize) -> Result<Self, BoardError> {
        if rows == 0 || cols == 0 {
            return Err(BoardError::ZeroDimension { rows, cols });
        }
        let cells = rows
            .checked_mul(cols)
            .ok_or(BoardError::TooLarge { pairs: usize::MAX, max: MAX_PAIRS })?;
        if cells % 2 != 0 {
            return Err(BoardError::OddCellCount { rows, cols });
        }
        if cells / 2 > MAX_PAIRS {
            return Err(BoardError::TooLarge { pairs: cells / 2, max: MAX_PAIRS });
        }
        Ok(Self { rows, cols })
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Total cells.
    pub fn cell_count(&self) -> usize {
        self.rows * self.cols
    }

    /// Distinct identities on the board.
    pub fn pair_count(&self) -> usize {
        self.cell_count() / 2
    }

    /// Row-major index of `coord`, or `None` when out of bounds.
    pub fn index_of(&self, coord: Coord) -> Option<usize> {
        if coord.row < self.rows && coord.col < self.cols {
            Some(coord.row * self.cols + coord.col)
        } else {
            None
        }
    }
}

impl Default for BoardSize {
    fn default() -> Self {
        Self::PRESETS[0]
    }
}

impl fmt::Display for BoardSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

impl FromStr for BoardSize {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || BoardError::InvalidSize(s.to_string());
        let (rows, cols) = s.trim().split_once(['x', 'X']).ok_or_else(invalid)?;
        let rows = rows.trim().parse().map_err(|_| invalid())?;
        let cols = cols.trim().parse().map_err(|_| invalid())?;
        Self::new(rows, cols)
    }
}

/// Board construction errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    /// A dimension is zero.
    #[error("board dimensions must be positive, got {rows}x{cols}")]
    ZeroDimension {
        /// Requested rows.
        rows: usize,
        /// Requested columns.
        cols: usize,
    },

    /// The board cannot be tiled with pairs.
    #[error("board must have an even number of cells, got {rows}x{cols}")]
    OddCellCount {
        /// Requested rows.
        rows: usize,
        /// Requested columns.
        cols: usize,
    },

    /// More pairs than identity tokens.
    #[error("board needs {pairs} pairs, at most {max} supported")]
    TooLarge {
        /// Requested pairs.
        pairs: usize,
        /// Supported pairs.
        max: usize,
    },

    /// Size string is not `<rows>x<cols>`.
    #[error("invalid board size '{0}', expected <rows>x<cols>")]
    InvalidSize(String),

    /// Explicit layout has the wrong number of cells.
    #[error("layout has {found} cells, board needs {expected}")]
    LayoutSize {
        /// Cells the board needs.
        expected: usize,
        /// Cells supplied.
        found: usize,
    },

    /// An identity does not appear exactly twice.
    #[error("card '{card}' appears {count} times, expected 2")]
    UnpairedCard {
        /// Offending identity.
        card: CardId,
        /// Occurrences in the layout.
        count: usize,
    },
}

// =============================================================================
// BOARD
// =============================================================================

/// The authoritative board: card identities plus face-up flags, row-major.
#[derive(Clone, Debug)]
pub struct Board {
    size: BoardSize,
    cells: Vec<CardId>,
    revealed: Vec<bool>,
}

impl Board {
    /// Build a face-down board with a uniformly shuffled layout.
    pub fn shuffled(size: BoardSize, rng: &mut DeterministicRng) -> Self {
        let mut cells: Vec<CardId> = (0..size.pair_count())
            .filter_map(CardId::from_index)
            .flat_map(|card| [card, card])
            .collect();
        rng.shuffle(&mut cells);

        Self {
            size,
            revealed: vec![false; cells.len()],
            cells,
        }
    }

    /// Build a face-down board from an explicit row-major layout.
    pub fn from_layout(size: BoardSize, cells: Vec<CardId>) -> Result<Self, BoardError> {
        if cells.len() != size.cell_count() {
            return Err(BoardError::LayoutSize {
                expected: size.cell_count(),
                found: cells.len(),
            });
        }

        let mut counts: BTreeMap<CardId, usize> = BTreeMap::new();
        for card in &cells {
            *counts.entry(*card).or_default() += 1;
        }
        if let Some((card, count)) = counts.into_iter().find(|(_, count)| *count != 2) {
            return Err(BoardError::UnpairedCard { card, count });
        }

        Ok(Self {
            size,
            revealed: vec![false; cells.len()],
            cells,
        })
    }

    /// Board dimensions.
    pub fn size(&self) -> BoardSize {
        self.size
    }

    /// Identity at `coord`, regardless of whether it is face up.
    pub fn card_at(&self, coord: Coord) -> Option<CardId> {
        self.size.index_of(coord).map(|i| self.cells[i])
    }

    /// Whether `coord` is face up. Out-of-bounds cells are never revealed.
    pub fn is_revealed(&self, coord: Coord) -> bool {
        self.size
            .index_of(coord)
            .is_some_and(|i| self.revealed[i])
    }

    /// Turn a card face up.
    ///
    /// Fails without mutating when `coord` is out of bounds or already
    /// face up.
    pub fn reveal(&mut self, coord: Coord) -> bool {
        match self.size.index_of(coord) {
            Some(i) if !self.revealed[i] => {
                self.revealed[i] = true;
                true
            }
            _ => false,
        }
    }

    /// Whether two face-up cells carry the same identity.
    pub fn matches(&self, a: Coord, b: Coord) -> bool {
        if !self.is_revealed(a) || !self.is_revealed(b) {
            return false;
        }
        self.card_at(a) == self.card_at(b)
    }

    /// Turn both cells face down. Out-of-bounds coordinates are skipped.
    pub fn hide(&mut self, a: Coord, b: Coord) {
        for coord in [a, b] {
            if let Some(i) = self.size.index_of(coord) {
                self.revealed[i] = false;
            }
        }
    }

    /// Whether every card is face up.
    pub fn is_complete(&self) -> bool {
        self.revealed.iter().all(|r| *r)
    }

    /// Number of face-up cards.
    pub fn revealed_count(&self) -> usize {
        self.revealed.iter().filter(|r| **r).count()
    }

    /// What a player is allowed to see.
    pub fn snapshot(&self) -> Snapshot {
        let cells = self
            .cells
            .iter()
            .zip(&self.revealed)
            .map(|(card, revealed)| {
                if *revealed {
                    CellView::Revealed(*card)
                } else {
                    CellView::Hidden
                }
            })
            .collect();

        Snapshot { size: self.size, cells }
    }
}

// =============================================================================
// SNAPSHOT
// =============================================================================

/// One cell as seen by a player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellView {
    /// Face down.
    Hidden,
    /// Face up, showing its identity.
    Revealed(CardId),
}

impl fmt::Display for CellView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellView::Hidden => f.write_str(HIDDEN_PLACEHOLDER),
            CellView::Revealed(card) => write!(f, "{card}"),
        }
    }
}

/// Full board view with face-down identities withheld.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    size: BoardSize,
    cells: Vec<CellView>,
}

impl Snapshot {
    /// Assemble a snapshot; `cells` must be row-major and fill the board.
    pub fn new(size: BoardSize, cells: Vec<CellView>) -> Option<Self> {
        if cells.len() == size.cell_count() {
            Some(Self { size, cells })
        } else {
            None
        }
    }

    /// Board dimensions.
    pub fn size(&self) -> BoardSize {
        self.size
    }

    /// View of a single cell.
    pub fn cell(&self, coord: Coord) -> Option<CellView> {
        self.size.index_of(coord).map(|i| self.cells[i])
    }

    /// All cells, row-major.
    pub fn cells(&self) -> &[CellView] {
        &self.cells
    }

    /// Cells grouped by row.
    pub fn rows(&self) -> impl Iterator<Item = &[CellView]> {
        self.cells.chunks(self.size.cols)
    }
}

/// Rows joined by newlines, cells separated by a single space.
impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (r, row) in self.rows().enumerate() {
            if r > 0 {
                writeln!(f)?;
            }
            for (c, cell) in row.iter().enumerate() {
                if c > 0 {
                    f.write_str(" ")?;
                }
                write!(f, "{cell}")?;
            }
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
