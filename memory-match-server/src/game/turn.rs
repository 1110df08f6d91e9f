//! Authoritative Turn Processing
//!
//! The turn state machine as pure transitions over `GameState`. The
//! coordinator decides what to broadcast from the returned outcome; nothing
//! in here touches the network or the clock.

use thiserror::Error;

use crate::game::board::Coord;
use crate::game::state::{GameResult, GameState, Phase, PlayerSlot};

/// Why a move was refused. `Display` is the notice sent to the mover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MoveRejection {
    /// The move came from the player who does not own the turn.
    #[error("Not your turn.")]
    NotYourTurn,

    /// Out of bounds, already face up, or sent while a pair is resolving.
    #[error("Invalid move or card already revealed. Try again.")]
    IllegalMove,
}

/// Result of applying one move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The game is over; nothing changed.
    Ignored,
    /// Refused; nothing changed.
    Rejected(MoveRejection),
    /// First card of the turn is now face up.
    FirstPick {
        /// The revealed card.
        coord: Coord,
    },
    /// Second card matched the first; the scorer keeps the turn.
    Matched {
        /// The card picked first.
        first: Coord,
        /// The card picked second.
        second: Coord,
        /// Player credited with the pair.
        scorer: PlayerSlot,
        /// Set when this pair completed the board.
        result: Option<GameResult>,
    },
    /// Second card differs; both stay face up until `resolve_mismatch`.
    Mismatched {
        /// The card picked first.
        first: Coord,
        /// The card picked second.
        second: Coord,
    },
}

/// Outcome of hiding a mismatched pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MismatchResolved {
    /// The cards turned back face down.
    pub hidden: (Coord, Coord),
    /// Player who now owns the turn.
    pub next: PlayerSlot,
    /// Set if the board is complete after hiding.
    pub result: Option<GameResult>,
}

/// Apply a move from `player` at `coord`.
pub fn submit_move(state: &mut GameState, player: PlayerSlot, coord: Coord) -> MoveOutcome {
    if state.is_over() {
        return MoveOutcome::Ignored;
    }

    if player != state.current {
        return MoveOutcome::Rejected(MoveRejection::NotYourTurn);
    }

    match state.phase {
        Phase::AwaitingFirstPick => {
            if !state.board.reveal(coord) {
                return MoveOutcome::Rejected(MoveRejection::IllegalMove);
            }
            state.phase = Phase::AwaitingSecondPick { first: coord };
            MoveOutcome::FirstPick { coord }
        }
        Phase::AwaitingSecondPick { first } => {
            // The first card is already face up, so re-picking it fails here
            if !state.board.reveal(coord) {
                return MoveOutcome::Rejected(MoveRejection::IllegalMove);
            }

            if state.board.matches(first, coord) {
                state.scores.award(player);
                state.phase = Phase::AwaitingFirstPick;
                let result = check_complete(state);
                MoveOutcome::Matched {
                    first,
                    second: coord,
                    scorer: player,
                    result,
                }
            } else {
                state.phase = Phase::Resolving { first, second: coord };
                MoveOutcome::Mismatched { first, second: coord }
            }
        }
        Phase::Resolving { .. } => MoveOutcome::Rejected(MoveRejection::IllegalMove),
    }
}

/// Hide a held mismatched pair and pass the turn.
///
/// Returns `None` when no mismatch is pending.
pub fn resolve_mismatch(state: &mut GameState) -> Option<MismatchResolved> {
    let Phase::Resolving { first, second } = state.phase else {
        return None;
    };

    state.board.hide(first, second);
    state.current = state.current.other();
    state.phase = Phase::AwaitingFirstPick;
    let result = check_complete(state);

    Some(MismatchResolved {
        hidden: (first, second),
        next: state.current,
        result,
    })
}

/// Record the final result once every card is face up.
fn check_complete(state: &mut GameState) -> Option<GameResult> {
    if state.board.is_complete() {
        let result = state.scores.result();
        state.result = Some(result);
        Some(result)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::board::{Board, BoardSize, CardId, CellView};

    fn card(token: char) -> CardId {
        CardId::from_token(token).unwrap()
    }

    /// 2x2 game laid out as `A B / B A`.
    fn abba_game() -> GameState {
        let size = BoardSize::new(2, 2).unwrap();
        let board =
            Board::from_layout(size, vec![card('A'), card('B'), card('B'), card('A')]).unwrap();
        GameState::new(board)
    }

    #[test]
    fn test_first_pick_advances_phase() {
        let mut state = abba_game();
        let c = Coord::new(0, 0);

        assert_eq!(submit_move(&mut state, PlayerSlot::One, c), MoveOutcome::FirstPick { coord: c });
        assert_eq!(state.phase, Phase::AwaitingSecondPick { first: c });
        assert_eq!(state.board.snapshot().to_string(), "A ???\n??? ???");
    }

    #[test]
    fn test_wrong_player_rejected() {
        let mut state = abba_game();

        let outcome = submit_move(&mut state, PlayerSlot::Two, Coord::new(0, 0));
        assert_eq!(outcome, MoveOutcome::Rejected(MoveRejection::NotYourTurn));
        assert_eq!(state.board.revealed_count(), 0);
        assert_eq!(state.current, PlayerSlot::One);
        assert_eq!(state.phase, Phase::AwaitingFirstPick);
    }

    #[test]
    fn test_out_of_bounds_keeps_phase() {
        let mut state = abba_game();

        let outcome = submit_move(&mut state, PlayerSlot::One, Coord::new(5, 0));
        assert_eq!(outcome, MoveOutcome::Rejected(MoveRejection::IllegalMove));
        assert_eq!(state.phase, Phase::AwaitingFirstPick);

        submit_move(&mut state, PlayerSlot::One, Coord::new(0, 0));
        let outcome = submit_move(&mut state, PlayerSlot::One, Coord::new(0, 9));
        assert_eq!(outcome, MoveOutcome::Rejected(MoveRejection::IllegalMove));
        assert_eq!(state.phase, Phase::AwaitingSecondPick { first: Coord::new(0, 0) });
    }

    #[test]
    fn test_same_cell_twice_rejected() {
        let mut state = abba_game();
        let c = Coord::new(1, 0);

        submit_move(&mut state, PlayerSlot::One, c);
        let outcome = submit_move(&mut state, PlayerSlot::One, c);
        assert_eq!(outcome, MoveOutcome::Rejected(MoveRejection::IllegalMove));
        assert_eq!(state.scores.get(PlayerSlot::One), 0);
    }

    #[test]
    fn test_mismatch_flips_turn_after_resolve() {
        let mut state = abba_game();
        let (a, b) = (Coord::new(0, 0), Coord::new(0, 1));

        submit_move(&mut state, PlayerSlot::One, a);
        let outcome = submit_move(&mut state, PlayerSlot::One, b);
        assert_eq!(outcome, MoveOutcome::Mismatched { first: a, second: b });

        // Pair held face up, turn not yet passed
        assert_eq!(state.board.snapshot().to_string(), "A B\n??? ???");
        assert_eq!(state.current, PlayerSlot::One);
        assert_eq!(
            submit_move(&mut state, PlayerSlot::Two, Coord::new(1, 0)),
            MoveOutcome::Rejected(MoveRejection::NotYourTurn)
        );
        assert_eq!(
            submit_move(&mut state, PlayerSlot::One, Coord::new(1, 0)),
            MoveOutcome::Rejected(MoveRejection::IllegalMove)
        );

        let resolved = resolve_mismatch(&mut state).unwrap();
        assert_eq!(resolved.next, PlayerSlot::Two);
        assert_eq!(resolved.hidden, (a, b));
        assert_eq!(resolved.result, None);
        assert_eq!(state.board.revealed_count(), 0);
        assert_eq!(state.phase, Phase::AwaitingFirstPick);

        assert!(resolve_mismatch(&mut state).is_none());
    }

    #[test]
    fn test_match_keeps_turn() {
        let mut state = abba_game();
        let (a1, a2) = (Coord::new(0, 0), Coord::new(1, 1));

        submit_move(&mut state, PlayerSlot::One, a1);
        let outcome = submit_move(&mut state, PlayerSlot::One, a2);
        assert_eq!(
            outcome,
            MoveOutcome::Matched { first: a1, second: a2, scorer: PlayerSlot::One, result: None }
        );
        assert_eq!(state.current, PlayerSlot::One);
        assert_eq!(state.phase, Phase::AwaitingFirstPick);
        assert_eq!(state.scores.get(PlayerSlot::One), 1);

        // Matched cards stay face up
        let snapshot = state.board.snapshot();
        assert_eq!(snapshot.cell(a1), Some(CellView::Revealed(card('A'))));
        assert_eq!(snapshot.cell(a2), Some(CellView::Revealed(card('A'))));
    }

    #[test]
    fn test_full_game_scenario() {
        let mut state = abba_game();

        // Player 1 misses
        submit_move(&mut state, PlayerSlot::One, Coord::new(0, 0));
        submit_move(&mut state, PlayerSlot::One, Coord::new(0, 1));
        resolve_mismatch(&mut state);
        assert_eq!(state.current, PlayerSlot::Two);

        // Player 2 clears the board
        submit_move(&mut state, PlayerSlot::Two, Coord::new(0, 0));
        submit_move(&mut state, PlayerSlot::Two, Coord::new(1, 1));
        assert_eq!(state.board.snapshot().to_string(), "A ???\n??? A");
        assert_eq!(state.current, PlayerSlot::Two);

        submit_move(&mut state, PlayerSlot::Two, Coord::new(0, 1));
        let outcome = submit_move(&mut state, PlayerSlot::Two, Coord::new(1, 0));
        assert_eq!(
            outcome,
            MoveOutcome::Matched {
                first: Coord::new(0, 1),
                second: Coord::new(1, 0),
                scorer: PlayerSlot::Two,
                result: Some(GameResult::Winner(PlayerSlot::Two)),
            }
        );
        assert!(state.board.is_complete());
        assert_eq!(state.scores.get(PlayerSlot::Two), 2);

        // Finished games ignore further moves
        assert_eq!(
            submit_move(&mut state, PlayerSlot::Two, Coord::new(0, 0)),
            MoveOutcome::Ignored
        );
        assert_eq!(
            submit_move(&mut state, PlayerSlot::One, Coord::new(0, 0)),
            MoveOutcome::Ignored
        );
    }

    #[test]
    fn test_tie_result() {
        let mut state = abba_game();

        submit_move(&mut state, PlayerSlot::One, Coord::new(0, 0));
        submit_move(&mut state, PlayerSlot::One, Coord::new(1, 1));
        submit_move(&mut state, PlayerSlot::One, Coord::new(0, 1));
        submit_move(&mut state, PlayerSlot::One, Coord::new(0, 0));
        // (0, 0) is already face up: still awaiting the second pick
        assert_eq!(state.phase, Phase::AwaitingSecondPick { first: Coord::new(0, 1) });

        // Two pairs already credited to Player 2 by an earlier turn
        state.scores.award(PlayerSlot::Two);
        state.scores.award(PlayerSlot::Two);
        let outcome = submit_move(&mut state, PlayerSlot::One, Coord::new(1, 0));
        assert!(matches!(outcome, MoveOutcome::Matched { result: Some(GameResult::Tie), .. }));
    }

    #[test]
    fn test_rejection_notice_text() {
        assert_eq!(MoveRejection::NotYourTurn.to_string(), "Not your turn.");
        assert!(MoveRejection::IllegalMove.to_string().starts_with("Invalid move"));
    }
}
