//! # Memory Match Server
//!
//! Authoritative server for a two-player, turn-based card matching game
//! played over line-oriented TCP.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    MEMORY MATCH SERVER                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/              - Deterministic primitives               │
//! │  └── rng.rs         - Xorshift128+ PRNG and board seeds      │
//! │                                                              │
//! │  game/              - Game rules (no I/O)                    │
//! │  ├── board.rs       - Card layout, reveal/hide, snapshots    │
//! │  ├── state.rs       - Seats, turn phase, scores              │
//! │  └── turn.rs        - Move validation and resolution         │
//! │                                                              │
//! │  network/           - Networking                             │
//! │  ├── protocol.rs    - Line format                            │
//! │  ├── coordinator.rs - Serialized moves and broadcasts        │
//! │  ├── session.rs     - Per-connection reader/writer           │
//! │  ├── server.rs      - Listener and game lifecycle            │
//! │  └── client.rs      - Client connection and local view       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Consistency
//!
//! Both players' moves funnel through one `GameCoordinator`. A move, the
//! board change it causes and every message it triggers are handled under
//! a single lock, so the two players always see the same sequence.
//!
//! Given the same seed, `Board::shuffled` deals the same layout.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use crate::core::rng::DeterministicRng;
pub use game::board::{Board, BoardSize, Coord};
pub use game::state::{GameResult, PlayerSlot, Scores};
pub use network::{GameClient, GameServer, ServerConfig};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
