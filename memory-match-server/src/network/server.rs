//! Game Server
//!
//! TCP listener for a single game: accepts exactly two players, starts the
//! game, then stops accepting and serves both sessions until they end.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, instrument, warn};

use crate::core::rng::{derive_board_seed, DeterministicRng};
use crate::game::board::{Board, BoardError, BoardSize};
use crate::network::coordinator::{CoordinatorError, GameCoordinator, GameSummary};
use crate::network::session::PlayerSession;

/// Port used when none is configured.
pub const DEFAULT_PORT: u16 = 12345;

/// Smallest per-player buffer. A joining player is sent its welcome and the
/// waiting notice before its session starts draining the channel.
pub const MIN_CHANNEL_CAPACITY: usize = 2;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Board dimensions.
    pub board: BoardSize,
    /// How long a mismatched pair stays face up.
    pub mismatch_delay: Duration,
    /// Outgoing message buffer per player, raised to `MIN_CHANNEL_CAPACITY`
    /// if smaller.
    pub channel_capacity: usize,
    /// Fixed shuffle seed; random per game when `None`.
    pub seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            board: BoardSize::default(),
            mismatch_delay: Duration::from_secs(1),
            channel_capacity: 64,
            seed: None,
        }
    }
}

impl ServerConfig {
    /// Create config from environment variables.
    ///
    /// Reads `MEMORY_BIND_ADDR`, `MEMORY_BOARD`, `MEMORY_MISMATCH_DELAY_MS`
    /// and `MEMORY_SEED`. Unparseable values keep their defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(addr) = env_parsed("MEMORY_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(board) = env_parsed("MEMORY_BOARD") {
            config.board = board;
        }
        if let Some(ms) = env_parsed("MEMORY_MISMATCH_DELAY_MS") {
            config.mismatch_delay = Duration::from_millis(ms);
        }
        config.seed = env_parsed("MEMORY_SEED");

        config
    }
}

fn env_parsed<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = std::env::var(key).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Ignoring {}={:?}: {}", key, raw, e);
            None
        }
    }
}

/// Game server errors.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// Socket error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Board could not be built.
    #[error("Board error: {0}")]
    Board(#[from] BoardError),

    /// Coordinator refused a join or start.
    #[error("Coordinator error: {0}")]
    Coordinator(#[from] CoordinatorError),
}

/// Stops a running server from another task.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    shutdown_tx: broadcast::Sender<()>,
}

impl ShutdownHandle {
    /// Signal the server and its sessions to stop.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

/// Server for one two-player game.
pub struct GameServer {
    config: ServerConfig,
    listener: TcpListener,
    coordinator: Arc<GameCoordinator>,
    shutdown_tx: broadcast::Sender<()>,
    shutdown_rx: broadcast::Receiver<()>,
}

impl GameServer {
    /// Bind and deal a freshly shuffled board.
    pub async fn bind(config: ServerConfig) -> Result<Self, GameServerError> {
        let game_id = uuid::Uuid::new_v4().into_bytes();
        let seed = config.seed.unwrap_or_else(|| {
            let nanos = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos();
            derive_board_seed(&game_id, nanos)
        });
        let board = Board::shuffled(config.board, &mut DeterministicRng::new(seed));

        info!("Game {} dealt {} board with seed {}", hex::encode(&game_id[..4]), config.board, seed);
        Self::bind_game(config, game_id, board).await
    }

    /// Bind with a pre-arranged board.
    pub async fn bind_with_board(config: ServerConfig, board: Board) -> Result<Self, GameServerError> {
        let game_id = uuid::Uuid::new_v4().into_bytes();
        Self::bind_game(config, game_id, board).await
    }

    async fn bind_game(
        config: ServerConfig,
        game_id: [u8; 16],
        board: Board,
    ) -> Result<Self, GameServerError> {
        let listener = TcpListener::bind(config.bind_addr).await?;
        let coordinator = Arc::new(GameCoordinator::new(game_id, board, config.mismatch_delay));
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        Ok(Self {
            config,
            listener,
            coordinator,
            shutdown_tx,
            shutdown_rx,
        })
    }

    /// Address actually bound.
    pub fn local_addr(&self) -> Result<SocketAddr, GameServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// The game this server hosts.
    pub fn coordinator(&self) -> Arc<GameCoordinator> {
        self.coordinator.clone()
    }

    /// Handle for stopping the server once `run` owns it.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            shutdown_tx: self.shutdown_tx.clone(),
        }
    }

    /// Seat two players, play the game, and return its summary once both
    /// sessions have ended.
    #[instrument(skip(self), fields(game = %self.coordinator.tag()))]
    pub async fn run(self) -> Result<GameSummary, GameServerError> {
        let Self {
            config,
            listener,
            coordinator,
            shutdown_tx,
            mut shutdown_rx,
        } = self;
        info!("Game server listening on {}", listener.local_addr()?);

        let mut sessions = Vec::with_capacity(2);

        while sessions.len() < 2 {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            info!("New connection from {}", addr);
                            let capacity = config.channel_capacity.max(MIN_CHANNEL_CAPACITY);
                            let (msg_tx, msg_rx) = mpsc::channel(capacity);
                            let player = coordinator.join(msg_tx).await?;
                            let session = PlayerSession::new(player, addr);
                            sessions.push(tokio::spawn(session.run(
                                stream,
                                msg_rx,
                                coordinator.clone(),
                                shutdown_tx.subscribe(),
                            )));
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown before both players joined");
                    return Ok(coordinator.summary().await);
                }
            }
        }

        // Exactly two players per game
        drop(listener);
        coordinator.start().await?;

        let mut finished = coordinator.subscribe_finished();
        let tag = coordinator.tag();
        let completion_log = tokio::spawn(async move {
            while finished.changed().await.is_ok() {
                if *finished.borrow() {
                    info!("Game {} complete, waiting for players to leave", tag);
                    break;
                }
            }
        });

        for session in sessions {
            if let Err(e) = session.await {
                error!("Session task failed: {}", e);
            }
        }
        completion_log.abort();

        Ok(coordinator.summary().await)
    }
}
