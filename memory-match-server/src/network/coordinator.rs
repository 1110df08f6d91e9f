//! Game Coordination
//!
//! Owns the two player channels and the authoritative `GameState`. Every
//! board mutation and the broadcasts it produces happen inside one lock,
//! so both players observe the same messages in the same order.
//!
//! Broadcasts wait for room in each player's bounded outgoing channel while
//! the lock is held. A player who stays connected but stops reading will
//! eventually fill that channel and stall moves for both players.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, info, warn};

use crate::game::board::{Board, BoardSize, Coord};
use crate::game::state::{GameResult, GameState, PlayerSlot, Scores};
use crate::game::turn::{self, MoveOutcome, MoveRejection};
use crate::network::protocol::ServerMessage;

/// Unique game identifier.
pub type GameId = [u8; 16];

/// Coordinator errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoordinatorError {
    /// Both seats are taken.
    #[error("Game is full")]
    GameFull,

    /// Start requested before both players joined.
    #[error("Need 2 players to start, have {0}")]
    NotEnoughPlayers(usize),

    /// Start requested twice.
    #[error("Game already started")]
    AlreadyStarted,
}

/// A seated player.
#[derive(Debug)]
struct SeatedPlayer {
    slot: PlayerSlot,
    connected: bool,
    sender: mpsc::Sender<ServerMessage>,
}

/// Everything guarded by the coordinator lock.
struct Table {
    game: GameState,
    players: Vec<SeatedPlayer>,
    started: bool,
}

impl Table {
    /// Send to every connected player, in seat order.
    async fn broadcast(&self, message: ServerMessage) {
        for player in self.players.iter().filter(|p| p.connected) {
            let _ = player.sender.send(message.clone()).await;
        }
    }

    /// Send to one player.
    async fn send_to(&self, slot: PlayerSlot, message: ServerMessage) {
        if let Some(player) = self.players.iter().find(|p| p.slot == slot && p.connected) {
            let _ = player.sender.send(message).await;
        }
    }

    async fn broadcast_board(&self) {
        self.broadcast(ServerMessage::Board(self.game.board.snapshot())).await;
    }
}

/// Final report for a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameSummary {
    /// Game identifier as a UUID string.
    pub game_id: String,
    /// Board dimensions.
    pub board: BoardSize,
    /// Scores when the game ended or was abandoned.
    pub scores: Scores,
    /// `None` if the game never finished.
    pub result: Option<GameResult>,
}

impl GameSummary {
    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Serializes moves from both sessions against one board.
pub struct GameCoordinator {
    id: GameId,
    mismatch_delay: Duration,
    table: Mutex<Table>,
    finished: watch::Sender<bool>,
}

impl GameCoordinator {
    /// Create a coordinator for a fresh board.
    pub fn new(id: GameId, board: Board, mismatch_delay: Duration) -> Self {
        let (finished, _) = watch::channel(false);

        Self {
            id,
            mismatch_delay,
            table: Mutex::new(Table {
                game: GameState::new(board),
                players: Vec::with_capacity(2),
                started: false,
            }),
            finished,
        }
    }

    /// Short hex tag for logs.
    pub fn tag(&self) -> String {
        hex::encode(&self.id[..4])
    }

    /// Seat a new player and send the welcome.
    pub async fn join(
        &self,
        sender: mpsc::Sender<ServerMessage>,
    ) -> Result<PlayerSlot, CoordinatorError> {
        let mut table = self.table.lock().await;
        let slot = PlayerSlot::from_index(table.players.len()).ok_or(CoordinatorError::GameFull)?;

        table.players.push(SeatedPlayer {
            slot,
            connected: true,
            sender,
        });
        table.send_to(slot, ServerMessage::Welcome(slot)).await;
        if table.players.len() < 2 {
            table.send_to(slot, ServerMessage::WaitingForOpponent).await;
        }

        info!("Game {}: {} joined", self.tag(), slot);
        Ok(slot)
    }

    /// Begin play once both seats are filled.
    pub async fn start(&self) -> Result<(), CoordinatorError> {
        let mut table = self.table.lock().await;
        if table.started {
            return Err(CoordinatorError::AlreadyStarted);
        }
        if table.players.len() < 2 {
            return Err(CoordinatorError::NotEnoughPlayers(table.players.len()));
        }
        table.started = true;

        table.broadcast(ServerMessage::GameStarted).await;
        table.broadcast_board().await;
        table.broadcast(ServerMessage::Turn(table.game.current)).await;

        info!("Game {} started on a {} board", self.tag(), table.game.board.size());
        Ok(())
    }

    /// Process a move from `player`.
    ///
    /// A mismatched pair stays face up for the configured delay. The lock
    /// is released while waiting; the turn stays with the mover until the
    /// pair is hidden, so nobody else can move in the meantime.
    pub async fn submit_move(&self, player: PlayerSlot, coord: Coord) {
        let mismatch_pending = {
            let mut table = self.table.lock().await;
            if !table.started {
                debug!("Game {}: {} moved before start", self.tag(), player);
                table
                    .send_to(player, ServerMessage::Rejected(MoveRejection::NotYourTurn))
                    .await;
                return;
            }

            match turn::submit_move(&mut table.game, player, coord) {
                MoveOutcome::Ignored => {
                    debug!("Game {}: ignoring {} after game over", self.tag(), player);
                    false
                }
                MoveOutcome::Rejected(rejection) => {
                    debug!("Game {}: {} at {} rejected: {}", self.tag(), player, coord, rejection);
                    table.send_to(player, ServerMessage::Rejected(rejection)).await;
                    false
                }
                MoveOutcome::FirstPick { coord } => {
                    debug!("Game {}: {} picked {}", self.tag(), player, coord);
                    table.broadcast_board().await;
                    table.send_to(player, ServerMessage::SecondPick).await;
                    false
                }
                MoveOutcome::Matched { first, second, scorer, result } => {
                    info!(
                        "Game {}: {} matched {} and {} ({}/{} cards up)",
                        self.tag(),
                        scorer,
                        first,
                        second,
                        table.game.board.revealed_count(),
                        table.game.board.size().cell_count()
                    );
                    table.broadcast_board().await;
                    table.broadcast(ServerMessage::PairFound(scorer)).await;
                    table.broadcast(ServerMessage::Score(table.game.scores)).await;
                    if let Some(result) = result {
                        self.finish(&table, result).await;
                    }
                    false
                }
                MoveOutcome::Mismatched { first, second } => {
                    debug!("Game {}: {} missed with {} and {}", self.tag(), player, first, second);
                    table.broadcast_board().await;
                    true
                }
            }
        };

        if mismatch_pending {
            tokio::time::sleep(self.mismatch_delay).await;
            self.resolve_mismatch().await;
        }
    }

    /// Hide a held pair and pass the turn.
    async fn resolve_mismatch(&self) {
        let mut table = self.table.lock().await;
        let Some(resolved) = turn::resolve_mismatch(&mut table.game) else {
            return;
        };

        table.broadcast_board().await;
        table.broadcast(ServerMessage::Turn(resolved.next)).await;
        info!("Game {}: turn passes to {}", self.tag(), resolved.next);

        if let Some(result) = resolved.result {
            self.finish(&table, result).await;
        }
    }

    /// Announce the result and wake anyone waiting on completion.
    async fn finish(&self, table: &Table, result: GameResult) {
        table.broadcast(ServerMessage::GameOver).await;
        table.broadcast(ServerMessage::Result(result)).await;
        table.broadcast(ServerMessage::Score(table.game.scores)).await;

        let summary = self.summarize(table);
        match summary.to_json() {
            Ok(json) => info!("Game {} over: {}", self.tag(), json),
            Err(e) => warn!("Game {} over, summary unavailable: {}", self.tag(), e),
        }

        self.finished.send_replace(true);
    }

    /// Stop sending to a player whose connection ended.
    ///
    /// The game is not repaired; the remaining player just stops seeing
    /// progress if it was the absent player's turn.
    pub async fn mark_disconnected(&self, player: PlayerSlot) {
        let mut table = self.table.lock().await;
        if let Some(seat) = table.players.iter_mut().find(|p| p.slot == player) {
            seat.connected = false;
        }
        if !table.game.is_over() {
            warn!("Game {}: {} disconnected mid-game", self.tag(), player);
        }
    }

    /// Resolves to `true` once the board is complete.
    pub fn subscribe_finished(&self) -> watch::Receiver<bool> {
        self.finished.subscribe()
    }

    /// Current scores.
    pub async fn scores(&self) -> Scores {
        self.table.lock().await.game.scores
    }

    /// Player whose moves are accepted.
    pub async fn current_player(&self) -> PlayerSlot {
        self.table.lock().await.game.current
    }

    /// Number of seated players.
    pub async fn player_count(&self) -> usize {
        self.table.lock().await.players.len()
    }

    /// Report on the game so far.
    pub async fn summary(&self) -> GameSummary {
        let table = self.table.lock().await;
        self.summarize(&table)
    }

    fn summarize(&self, table: &Table) -> GameSummary {
        GameSummary {
            game_id: uuid::Uuid::from_bytes(self.id).to_string(),
            board: table.game.board.size(),
            scores: table.game.scores,
            result: table.game.result,
        }
    }
}
