//! Protocol Messages
//!
//! Wire format for client-server communication: one UTF-8 text line per
//! message. Notices use fixed prefixes so a presentation layer can match
//! on them; board snapshots carry their own dimensions so no cell token
//! is ever mistaken for framing.

use std::fmt;

use thiserror::Error;

use crate::game::board::{BoardSize, CardId, CellView, Coord, Snapshot, HIDDEN_PLACEHOLDER};
use crate::game::state::{GameResult, PlayerSlot, Scores};
use crate::game::turn::MoveRejection;

const MOVE_COMMAND: &str = "MOVE";
const BOARD_COMMAND: &str = "BOARD";

const WELCOME_PREFIX: &str = "Welcome, you are ";
const WAITING_FOR_OPPONENT: &str = "Waiting for an opponent...";
const GAME_STARTED: &str = "Game started!";
const TURN_PREFIX: &str = "Turn: ";
const SECOND_PICK: &str = "Waiting for your second pick.";
const PAIR_FOUND_SUFFIX: &str = " found a pair!";
const SCORE_PREFIX: &str = "SCORE: ";
const GAME_OVER: &str = "Game over!";
const WINNER_PREFIX: &str = "Winner: ";
const TIE: &str = "Tie";

/// Line parsing errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Blank line.
    #[error("empty line")]
    Empty,

    /// First token is not a known command.
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    /// Command has the wrong number of arguments.
    #[error("{command} expects {expected} tokens, got {found}")]
    WrongArity {
        /// Command literal.
        command: &'static str,
        /// Tokens expected, including the command.
        expected: usize,
        /// Tokens received.
        found: usize,
    },

    /// Argument is not a non-negative integer.
    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    /// Player reference is not `Player 1` or `Player 2`.
    #[error("invalid player '{0}'")]
    InvalidPlayer(String),

    /// Snapshot line does not describe a valid board.
    #[error("malformed board: {0}")]
    MalformedBoard(String),

    /// Server line matches no known message.
    #[error("unrecognized message '{0}'")]
    UnknownMessage(String),
}

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientMessage {
    /// Pick the card at a position: `MOVE <row> <col>`.
    Move(Coord),
}

impl ClientMessage {
    /// Encode as a wire line (without the trailing newline).
    pub fn to_line(&self) -> String {
        self.to_string()
    }

    /// Decode a wire line.
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        match tokens.first() {
            None => Err(ProtocolError::Empty),
            Some(&MOVE_COMMAND) => {
                if tokens.len() != 3 {
                    return Err(ProtocolError::WrongArity {
                        command: MOVE_COMMAND,
                        expected: 3,
                        found: tokens.len(),
                    });
                }
                let row = parse_number(tokens[1])?;
                let col = parse_number(tokens[2])?;
                Ok(ClientMessage::Move(Coord::new(row, col)))
            }
            Some(other) => Err(ProtocolError::UnknownCommand((*other).to_string())),
        }
    }
}

impl fmt::Display for ClientMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientMessage::Move(coord) => write!(f, "{MOVE_COMMAND} {} {}", coord.row, coord.col),
        }
    }
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Seat assignment, sent once on connect.
    Welcome(PlayerSlot),
    /// Sent to the first player while the second has not joined.
    WaitingForOpponent,
    /// Both players connected.
    GameStarted,
    /// Full board as visible to players.
    Board(Snapshot),
    /// New owner of the turn.
    Turn(PlayerSlot),
    /// Move refused.
    Rejected(MoveRejection),
    /// Sent to the mover after a successful first pick.
    SecondPick,
    /// A pair was matched.
    PairFound(PlayerSlot),
    /// Current scores.
    Score(Scores),
    /// The board is complete.
    GameOver,
    /// Final result, sent after `GameOver`.
    Result(GameResult),
}

impl ServerMessage {
    /// Encode as a wire line (without the trailing newline).
    pub fn to_line(&self) -> String {
        self.to_string()
    }

    /// Decode a wire line.
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(ProtocolError::Empty);
        }

        if let Some(rest) = line.strip_prefix(WELCOME_PREFIX) {
            return parse_player(rest).map(ServerMessage::Welcome);
        }
        if let Some(rest) = line.strip_prefix(TURN_PREFIX) {
            return parse_player(rest).map(ServerMessage::Turn);
        }
        if let Some(rest) = line.strip_prefix(WINNER_PREFIX) {
            return parse_player(rest).map(|p| ServerMessage::Result(GameResult::Winner(p)));
        }
        if let Some(rest) = line.strip_suffix(PAIR_FOUND_SUFFIX) {
            return parse_player(rest).map(ServerMessage::PairFound);
        }
        if let Some(rest) = line.strip_prefix(SCORE_PREFIX) {
            return parse_scores(rest).map(ServerMessage::Score);
        }
        if line.split_whitespace().next() == Some(BOARD_COMMAND) {
            return parse_snapshot(line).map(ServerMessage::Board);
        }

        let rejection = [MoveRejection::NotYourTurn, MoveRejection::IllegalMove]
            .into_iter()
            .find(|r| r.to_string() == line);
        if let Some(rejection) = rejection {
            return Ok(ServerMessage::Rejected(rejection));
        }

        match line {
            WAITING_FOR_OPPONENT => Ok(ServerMessage::WaitingForOpponent),
            GAME_STARTED => Ok(ServerMessage::GameStarted),
            SECOND_PICK => Ok(ServerMessage::SecondPick),
            GAME_OVER => Ok(ServerMessage::GameOver),
            TIE => Ok(ServerMessage::Result(GameResult::Tie)),
            other => Err(ProtocolError::UnknownMessage(other.to_string())),
        }
    }
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerMessage::Welcome(player) => write!(f, "{WELCOME_PREFIX}{player}"),
            ServerMessage::WaitingForOpponent => f.write_str(WAITING_FOR_OPPONENT),
            ServerMessage::GameStarted => f.write_str(GAME_STARTED),
            ServerMessage::Board(snapshot) => write_snapshot(f, snapshot),
            ServerMessage::Turn(player) => write!(f, "{TURN_PREFIX}{player}"),
            ServerMessage::Rejected(rejection) => write!(f, "{rejection}"),
            ServerMessage::SecondPick => f.write_str(SECOND_PICK),
            ServerMessage::PairFound(player) => write!(f, "{player}{PAIR_FOUND_SUFFIX}"),
            ServerMessage::Score(scores) => write!(
                f,
                "{SCORE_PREFIX}{}: {} | {}: {}",
                PlayerSlot::One,
                scores.player_one,
                PlayerSlot::Two,
                scores.player_two
            ),
            ServerMessage::GameOver => f.write_str(GAME_OVER),
            ServerMessage::Result(GameResult::Winner(player)) => {
                write!(f, "{WINNER_PREFIX}{player}")
            }
            ServerMessage::Result(GameResult::Tie) => f.write_str(TIE),
        }
    }
}

// =============================================================================
// FIELD CODECS
// =============================================================================

fn parse_number(token: &str) -> Result<usize, ProtocolError> {
    token
        .parse()
        .map_err(|_| ProtocolError::InvalidNumber(token.to_string()))
}

/// `Player <n>` with n in 1..=2.
fn parse_player(text: &str) -> Result<PlayerSlot, ProtocolError> {
    text.trim()
        .strip_prefix("Player ")
        .and_then(|n| n.trim().parse::<u8>().ok())
        .and_then(PlayerSlot::from_number)
        .ok_or_else(|| ProtocolError::InvalidPlayer(text.to_string()))
}

/// `Player 1: <x> | Player 2: <y>`.
fn parse_scores(text: &str) -> Result<Scores, ProtocolError> {
    let mut scores = Scores::default();
    let mut seen = 0;

    for part in text.split('|') {
        let (player, points) = part
            .split_once(':')
            .ok_or_else(|| ProtocolError::UnknownMessage(text.to_string()))?;
        let player = parse_player(player)?;
        let points: u32 = points
            .trim()
            .parse()
            .map_err(|_| ProtocolError::InvalidNumber(points.trim().to_string()))?;
        match player {
            PlayerSlot::One => scores.player_one = points,
            PlayerSlot::Two => scores.player_two = points,
        }
        seen += 1;
    }

    if seen != 2 {
        return Err(ProtocolError::UnknownMessage(text.to_string()));
    }
    Ok(scores)
}

/// `BOARD <rows> <cols> <cell>...`, cells row-major.
fn write_snapshot(f: &mut fmt::Formatter<'_>, snapshot: &Snapshot) -> fmt::Result {
    let size = snapshot.size();
    write!(f, "{BOARD_COMMAND} {} {}", size.rows(), size.cols())?;
    for cell in snapshot.cells() {
        write!(f, " {cell}")?;
    }
    Ok(())
}

fn parse_snapshot(line: &str) -> Result<Snapshot, ProtocolError> {
    let malformed = |why: String| ProtocolError::MalformedBoard(why);
    let mut tokens = line.split_whitespace().skip(1);

    let rows = parse_number(tokens.next().unwrap_or_default())?;
    let cols = parse_number(tokens.next().unwrap_or_default())?;
    let size = BoardSize::new(rows, cols).map_err(|e| malformed(e.to_string()))?;

    let cells = tokens
        .map(|token| {
            if token == HIDDEN_PLACEHOLDER {
                return Ok(CellView::Hidden);
            }
            let mut chars = token.chars();
            match (chars.next().and_then(CardId::from_token), chars.next()) {
                (Some(card), None) => Ok(CellView::Revealed(card)),
                _ => Err(malformed(format!("bad cell '{token}'"))),
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    let found = cells.len();
    Snapshot::new(size, cells)
        .ok_or_else(|| malformed(format!("{size} board needs {} cells, got {found}", size.cell_count())))
}
