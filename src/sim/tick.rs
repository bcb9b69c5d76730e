//! Session driving loop
//!
//! One call per frame: apply the frame's one-shot commands, then advance the
//! simulated clock so due slide and flow timers fire.

use super::state::PuzzleState;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Replace the level with this string (ignored if it fails to parse)
    pub load: Option<String>,
    /// Restore the starting arrangement
    pub reset: bool,
    /// Deal a freshly generated board
    pub new_board: bool,
    /// Flip no-spill mode (deals a new board)
    pub toggle_no_spill: bool,
    /// Clicked cell `(x, y)`
    pub slide: Option<(usize, usize)>,
    /// Faucet clicked
    pub open_faucet: bool,
}

/// Advance the session by `dt_ms` of simulated time.
///
/// Board-replacing commands run first so a click in the same frame lands on
/// the new board.
pub fn tick(state: &mut PuzzleState, input: &TickInput, dt_ms: u64) {
    if let Some(text) = &input.load {
        // rejection is reported through the event queue
        let _ = state.load_level(text);
    }
    if input.reset {
        state.reset();
    }
    if input.toggle_no_spill {
        state.toggle_no_spill();
    } else if input.new_board {
        state.new_board();
    }

    if let Some((x, y)) = input.slide {
        state.slide(x, y);
    }
    if input.open_faucet {
        state.open_faucet();
    }

    state.advance(dt_ms);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::FLOW_TICK_MS;
    use crate::settings::Settings;
    use crate::sim::{GameEvent, Phase};

    fn session() -> PuzzleState {
        let settings = Settings {
            scramble_moves: 0,
            ..Settings::default()
        };
        PuzzleState::new("2 2 0 0 1 0 C C 3 0".parse().unwrap(), &settings, 9)
    }

    #[test]
    fn test_idle_tick_changes_nothing() {
        let mut state = session();
        let before = state.snapshot();
        tick(&mut state, &TickInput::default(), FLOW_TICK_MS);
        assert_eq!(state.snapshot(), before);
        assert!(state.drain_events().is_empty());
    }

    #[test]
    fn test_open_faucet_then_run() {
        let mut state = session();
        let open = TickInput {
            open_faucet: true,
            ..Default::default()
        };
        tick(&mut state, &open, 0);
        assert_eq!(state.phase, Phase::Flowing);

        for _ in 0..4 {
            tick(&mut state, &TickInput::default(), FLOW_TICK_MS);
        }
        assert_eq!(state.phase, Phase::Won);
    }

    #[test]
    fn test_load_then_click_same_frame() {
        let mut state = session();
        let input = TickInput {
            load: Some("2 2 0 0 1 0 C 0 3 C".into()),
            slide: Some((0, 0)),
            ..Default::default()
        };
        tick(&mut state, &input, 0);
        // piece 1 slid right into the gap of the new board
        assert_eq!(state.board.cells(), &[0, 1, 3, 4]);
        let events = state.drain_events();
        assert!(matches!(events[0], GameEvent::LevelLoaded { width: 2, height: 2 }));
        assert!(matches!(events[1], GameEvent::Slid(_)));
    }

    #[test]
    fn test_rejected_load_keeps_board() {
        let mut state = session();
        let before = state.board.clone();
        let input = TickInput {
            load: Some("8".into()),
            ..Default::default()
        };
        tick(&mut state, &input, 0);
        assert_eq!(state.board, before);
    }

    #[test]
    fn test_determinism() {
        let mut a = session();
        let mut b = session();
        let inputs = [
            TickInput {
                new_board: true,
                ..Default::default()
            },
            TickInput {
                slide: Some((1, 1)),
                ..Default::default()
            },
            TickInput {
                open_faucet: true,
                ..Default::default()
            },
            TickInput::default(),
        ];
        for input in &inputs {
            tick(&mut a, input, FLOW_TICK_MS);
            tick(&mut b, input, FLOW_TICK_MS);
        }
        assert_eq!(a.snapshot(), b.snapshot());
        assert_eq!(a.drain_events(), b.drain_events());
    }
}
