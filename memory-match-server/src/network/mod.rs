//! Network Layer
//!
//! Line-oriented TCP server and client for the two-player game.
//! All rule decisions go through `game/`; this layer only moves text.

pub mod client;
pub mod coordinator;
pub mod protocol;
pub mod server;
pub mod session;

pub use client::{ClientError, ClientView, GameClient};
pub use coordinator::{CoordinatorError, GameCoordinator, GameId, GameSummary};
pub use protocol::{ClientMessage, ProtocolError, ServerMessage};
pub use server::{GameServer, GameServerError, ServerConfig, ShutdownHandle};
pub use session::PlayerSession;
