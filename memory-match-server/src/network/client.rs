//! Game Client
//!
//! Connects to a game server, decodes server lines into `ServerMessage`s
//! and sends moves. `ClientView` folds the message stream into what a
//! player would see on screen.

use std::net::SocketAddr;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::game::board::{Coord, Snapshot};
use crate::game::state::{GameResult, PlayerSlot, Scores};
use crate::network::protocol::{ClientMessage, ServerMessage};

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Could not reach the server.
    #[error("Connect failed: {0}")]
    Connect(#[from] std::io::Error),

    /// The connection is gone.
    #[error("Disconnected from server")]
    Disconnected,
}

/// Connection to a game server.
pub struct GameClient {
    outgoing: mpsc::Sender<String>,
    reader_task: JoinHandle<()>,
    writer_task: JoinHandle<()>,
}

impl GameClient {
    /// Connect to `addr`. Server messages arrive on the returned receiver,
    /// which closes when the server hangs up.
    pub async fn connect(
        addr: SocketAddr,
    ) -> Result<(Self, mpsc::Receiver<ServerMessage>), ClientError> {
        let stream = TcpStream::connect(addr).await?;
        let (reader, mut writer) = stream.into_split();

        let (incoming_tx, incoming_rx) = mpsc::channel(64);
        let reader_task = tokio::spawn(async move {
            let mut lines = BufReader::new(reader).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => match ServerMessage::parse(&line) {
                        Ok(msg) => {
                            if incoming_tx.send(msg).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!("Unrecognized server line {:?}: {}", line, e),
                    },
                    Ok(None) => {
                        debug!("Server closed the connection");
                        break;
                    }
                    Err(e) => {
                        warn!("Read failed: {}", e);
                        break;
                    }
                }
            }
        });

        let (outgoing, mut outgoing_rx) = mpsc::channel::<String>(16);
        let writer_task = tokio::spawn(async move {
            while let Some(mut line) = outgoing_rx.recv().await {
                line.push('\n');
                if let Err(e) = writer.write_all(line.as_bytes()).await {
                    warn!("Write failed: {}", e);
                    break;
                }
            }
        });

        Ok((
            Self {
                outgoing,
                reader_task,
                writer_task,
            },
            incoming_rx,
        ))
    }

    /// Pick the card at (`row`, `col`).
    pub async fn send_move(&self, row: usize, col: usize) -> Result<(), ClientError> {
        self.send_line(ClientMessage::Move(Coord::new(row, col)).to_line())
            .await
    }

    /// Send a raw line, as typed by a user.
    pub async fn send_line(&self, line: impl Into<String>) -> Result<(), ClientError> {
        self.outgoing
            .send(line.into())
            .await
            .map_err(|_| ClientError::Disconnected)
    }
}

impl Drop for GameClient {
    fn drop(&mut self) {
        self.reader_task.abort();
        self.writer_task.abort();
    }
}

/// A player's local picture of the game.
#[derive(Debug, Clone, Default)]
pub struct ClientView {
    /// Seat assigned by the welcome message.
    pub identity: Option<PlayerSlot>,
    /// Last board received.
    pub board: Option<Snapshot>,
    /// Most recent status line.
    pub header: String,
    /// Player whose turn it is.
    pub turn: Option<PlayerSlot>,
    /// Last announced scores.
    pub scores: Scores,
    /// Final result once announced.
    pub result: Option<GameResult>,
    /// Set by the game over announcement.
    pub game_over: bool,
}

impl ClientView {
    /// Fold one server message into the view.
    pub fn apply(&mut self, msg: &ServerMessage) {
        match msg {
            ServerMessage::Welcome(slot) => self.identity = Some(*slot),
            ServerMessage::Board(snapshot) => {
                self.board = Some(snapshot.clone());
                return;
            }
            ServerMessage::Turn(slot) => self.turn = Some(*slot),
            ServerMessage::Score(scores) => self.scores = *scores,
            ServerMessage::GameOver => self.game_over = true,
            ServerMessage::Result(result) => self.result = Some(*result),
            _ => {}
        }
        self.header = msg.to_line();
    }

    /// Whether moves from this player would currently be accepted.
    pub fn is_my_turn(&self) -> bool {
        !self.game_over && self.identity.is_some() && self.identity == self.turn
    }
}
