//! Player Session
//!
//! One task pair per connection: a writer draining the player's outgoing
//! channel onto the stream, and a reader turning incoming lines into
//! coordinator calls. Sessions never touch the board themselves.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, instrument, warn};

use crate::game::state::PlayerSlot;
use crate::network::coordinator::GameCoordinator;
use crate::network::protocol::{ClientMessage, ServerMessage};

/// A connected player.
#[derive(Debug, Clone, Copy)]
pub struct PlayerSession {
    player: PlayerSlot,
    addr: SocketAddr,
}

impl PlayerSession {
    /// Session for `player` connected from `addr`.
    pub fn new(player: PlayerSlot, addr: SocketAddr) -> Self {
        Self { player, addr }
    }

    /// Serve the connection until the peer hangs up, the stream fails, or
    /// shutdown is signalled.
    #[instrument(skip_all, fields(player = %self.player, addr = %self.addr))]
    pub async fn run<S>(
        self,
        stream: S,
        mut outgoing: mpsc::Receiver<ServerMessage>,
        coordinator: Arc<GameCoordinator>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, mut writer) = tokio::io::split(stream);

        let writer_task = tokio::spawn(async move {
            while let Some(msg) = outgoing.recv().await {
                let mut line = msg.to_line();
                line.push('\n');
                if let Err(e) = writer.write_all(line.as_bytes()).await {
                    warn!("Write failed: {}", e);
                    break;
                }
                if let Err(e) = writer.flush().await {
                    warn!("Flush failed: {}", e);
                    break;
                }
            }
        });

        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            tokio::select! {
                read = reader.read_until(b'\n', &mut buf) => {
                    match read {
                        Ok(0) => {
                            info!("Client disconnected");
                            break;
                        }
                        Ok(_) => self.handle_line(&buf, &coordinator).await,
                        Err(e) => {
                            warn!("Connection fault: {}", e);
                            break;
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    debug!("Shutdown signalled");
                    break;
                }
            }
        }

        writer_task.abort();
        coordinator.mark_disconnected(self.player).await;
    }

    /// Act on one raw line. Undecodable or unparseable lines are dropped.
    async fn handle_line(&self, raw: &[u8], coordinator: &GameCoordinator) {
        let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);

        let line = match std::str::from_utf8(raw) {
            Ok(line) => line,
            Err(e) => {
                debug!("Ignoring non-UTF-8 line: {}", e);
                return;
            }
        };

        match ClientMessage::parse(line) {
            Ok(ClientMessage::Move(coord)) => {
                coordinator.submit_move(self.player, coord).await;
            }
            Err(e) => {
                debug!("Ignoring line {:?}: {}", line, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};
    use tokio::task::JoinHandle;

    use super::*;
    use crate::game::board::{Board, BoardSize, CardId};

    fn card(token: char) -> CardId {
        CardId::from_token(token).unwrap()
    }

    fn abba() -> Board {
        let size = BoardSize::new(2, 2).unwrap();
        Board::from_layout(size, vec![card('A'), card('B'), card('B'), card('A')]).unwrap()
    }

    /// Seat a player on an in-memory stream and run its session.
    async fn attach(
        coordinator: &Arc<GameCoordinator>,
        shutdown: &broadcast::Sender<()>,
    ) -> (DuplexStream, JoinHandle<()>) {
        let (client, server) = tokio::io::duplex(4096);
        let (tx, rx) = mpsc::channel(64);
        let player = coordinator.join(tx).await.unwrap();
        let session = PlayerSession::new(player, "127.0.0.1:9".parse().unwrap());
        let handle = tokio::spawn(session.run(server, rx, coordinator.clone(), shutdown.subscribe()));
        (client, handle)
    }

    async fn read_line(reader: &mut BufReader<tokio::io::ReadHalf<DuplexStream>>) -> String {
        let mut line = String::new();
        tokio::time::timeout(Duration::from_secs(2), reader.read_line(&mut line))
            .await
            .unwrap()
            .unwrap();
        line.trim_end().to_string()
    }

    #[tokio::test]
    async fn test_session_forwards_moves_and_ignores_garbage() {
        let coordinator = Arc::new(GameCoordinator::new([3; 16], abba(), Duration::from_millis(10)));
        let (shutdown_tx, _) = broadcast::channel(1);

        let (one, _h1) = attach(&coordinator, &shutdown_tx).await;
        let (_two, _h2) = attach(&coordinator, &shutdown_tx).await;
        coordinator.start().await.unwrap();

        let (read_half, mut write_half) = tokio::io::split(one);
        let mut reader = BufReader::new(read_half);

        assert_eq!(read_line(&mut reader).await, "Welcome, you are Player 1");
        assert_eq!(read_line(&mut reader).await, "Waiting for an opponent...");
        assert_eq!(read_line(&mut reader).await, "Game started!");
        assert_eq!(read_line(&mut reader).await, "BOARD 2 2 ??? ??? ??? ???");
        assert_eq!(read_line(&mut reader).await, "Turn: Player 1");

        write_half.write_all(b"MOVE abc\nhello\nMOVE 0 0\n").await.unwrap();
        assert_eq!(read_line(&mut reader).await, "BOARD 2 2 A ??? ??? ???");
        assert_eq!(read_line(&mut reader).await, "Waiting for your second pick.");
    }

    /// Player 1's side of a started in-memory game.
    struct StartedGame {
        reader: BufReader<tokio::io::ReadHalf<DuplexStream>>,
        writer: tokio::io::WriteHalf<DuplexStream>,
        handle: JoinHandle<()>,
        _two: DuplexStream,
        _shutdown: broadcast::Sender<()>,
    }

    /// Start a game and read Player 1's opening messages.
    async fn started_game() -> StartedGame {
        let coordinator = Arc::new(GameCoordinator::new([6; 16], abba(), Duration::from_millis(10)));
        let (shutdown_tx, _) = broadcast::channel(1);

        let (one, handle) = attach(&coordinator, &shutdown_tx).await;
        let (two, _) = attach(&coordinator, &shutdown_tx).await;
        coordinator.start().await.unwrap();

        let (read_half, writer) = tokio::io::split(one);
        let mut reader = BufReader::new(read_half);
        for _ in 0..5 {
            read_line(&mut reader).await;
        }

        StartedGame {
            reader,
            writer,
            handle,
            _two: two,
            _shutdown: shutdown_tx,
        }
    }

    #[tokio::test]
    async fn test_non_utf8_line_keeps_session() {
        let mut game = started_game().await;

        game.writer.write_all(b"MOVE \xff 0\nMOVE 0 0\n").await.unwrap();
        assert_eq!(read_line(&mut game.reader).await, "BOARD 2 2 A ??? ??? ???");
        assert!(!game.handle.is_finished());
    }

    #[tokio::test]
    async fn test_wrong_arity_line_keeps_session() {
        let mut game = started_game().await;

        game.writer
            .write_all(b"MOVE 1 2 3\r\nMOVE\n\nMOVE 0 1\r\n")
            .await
            .unwrap();
        assert_eq!(read_line(&mut game.reader).await, "BOARD 2 2 ??? B ??? ???");
        assert_eq!(read_line(&mut game.reader).await, "Waiting for your second pick.");
        assert!(!game.handle.is_finished());
    }

    #[tokio::test]
    async fn test_session_ends_on_hangup() {
        let coordinator = Arc::new(GameCoordinator::new([4; 16], abba(), Duration::from_millis(10)));
        let (shutdown_tx, _) = broadcast::channel(1);

        let (one, handle) = attach(&coordinator, &shutdown_tx).await;
        drop(one);

        tokio::time::timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_session_ends_on_shutdown() {
        let coordinator = Arc::new(GameCoordinator::new([5; 16], abba(), Duration::from_millis(10)));
        let (shutdown_tx, _) = broadcast::channel(1);

        let (_one, handle) = attach(&coordinator, &shutdown_tx).await;
        shutdown_tx.send(()).unwrap();

        tokio::time::timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();
    }
}
