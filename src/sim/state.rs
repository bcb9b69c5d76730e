//! Puzzle session state
//!
//! Owns the loaded level, the live board, the flow snapshot and the two
//! scheduled timers (slide settle and flow tick). Time is simulated: callers
//! feed elapsed milliseconds through [`PuzzleState::advance`] or fire timers
//! by handle, so the whole session is deterministic and testable without a
//! real clock.

use std::collections::BTreeMap;

use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::direction::{Direction, Exits};
use super::flow::{self, FaucetStatus, FlowContext, FlowOutcome, FlowRules, FlowState, Spill};
use super::grid::{Board, EMPTY, Endpoint, SlideMove, TileId};
use crate::error::LevelError;
use crate::level::{self, Difficulty, Level};
use crate::settings::Settings;

/// Current phase of play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Pieces can slide, faucet closed or blocked
    #[default]
    Arranging,
    /// Water is propagating; movement locked
    Flowing,
    Won,
    Lost,
}

/// Identifies one scheduled timer. Handles are never reused within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerHandle(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct Timer {
    handle: TimerHandle,
    due_ms: u64,
}

/// Something the renderer may want to animate or announce
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    LevelLoaded { width: usize, height: usize },
    LevelRejected { reason: String },
    BoardReset,
    Slid(SlideMove),
    SlideRejected { x: usize, y: usize },
    FaucetOpened,
    FlowAdvanced { tiles: Vec<TileId> },
    Spilled(Spill),
    GoalReached,
    Won,
    Lost,
}

/// One piece as the renderer sees it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileView {
    pub id: TileId,
    pub x: usize,
    pub y: usize,
    pub exits: Exits,
    pub flowing: bool,
    pub incoming: Direction,
}

/// Read-only view of the session after a move or tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub width: usize,
    pub height: usize,
    /// Row-major tile IDs, 0 = empty slot
    pub cells: Vec<TileId>,
    /// Every piece in row-major order
    pub tiles: Vec<TileView>,
    pub faucet: Endpoint,
    pub goal: Endpoint,
    pub faucet_status: FaucetStatus,
    pub phase: Phase,
    pub goal_reached: bool,
    pub lost: bool,
    pub spills: Vec<Spill>,
    pub locked: bool,
    pub no_spill: bool,
}

/// Complete session state (deterministic, serializable)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PuzzleState {
    /// Level as loaded or picked
    pub level: Level,
    /// Arrangement restored by [`PuzzleState::reset`]
    initial: Board,
    /// Live board
    pub board: Board,
    pub flow: FlowState,
    pub rules: FlowRules,
    pub phase: Phase,
    pub faucet_status: FaucetStatus,
    pub goal_reached: bool,
    pub lost: bool,
    /// Tier used by [`PuzzleState::new_board`]
    pub difficulty: Difficulty,
    /// Seed for the next generated board
    pub seed: u32,
    pub batch_size: usize,
    pub scramble_moves: usize,
    pub flow_tick_ms: u64,
    pub slide_settle_ms: u64,
    /// Simulated clock
    pub time_ms: u64,
    flow_timer: Option<Timer>,
    settle_timer: Option<Timer>,
    next_handle: u64,
    #[serde(skip)]
    events: Vec<GameEvent>,
}

impl PuzzleState {
    /// Session on `level` with the given preferences; `seed` drives later
    /// generated boards.
    pub fn new(level: Level, settings: &Settings, seed: u32) -> Self {
        let mut state = Self {
            initial: level.board.clone(),
            board: level.board.clone(),
            level,
            flow: FlowState::default(),
            rules: FlowRules {
                no_spill: settings.no_spill,
            },
            phase: Phase::Arranging,
            faucet_status: FaucetStatus::Closed,
            goal_reached: false,
            lost: false,
            difficulty: settings.difficulty,
            seed,
            batch_size: settings.batch_size,
            scramble_moves: settings.scramble_moves,
            flow_tick_ms: settings.flow_tick_ms,
            slide_settle_ms: settings.slide_settle_ms,
            time_ms: 0,
            flow_timer: None,
            settle_timer: None,
            next_handle: 1,
            events: Vec::new(),
        };
        state.refresh_faucet();
        state
    }

    /// Session on a freshly generated (and scrambled) board
    pub fn generated(settings: &Settings, seed: u32) -> Result<Self, LevelError> {
        let level = level::pick_level(settings.difficulty, seed, settings.no_spill, settings.batch_size)?;
        let mut state = Self::new(level, settings, seed.wrapping_add(1));
        state.scramble_initial(seed);
        Ok(state)
    }

    /// Sliding is refused while a slide settles or once the faucet is open
    pub fn is_locked(&self) -> bool {
        self.settle_timer.is_some() || self.faucet_status == FaucetStatus::Open
    }

    /// Handle of the flow tick currently scheduled, if any
    pub fn pending_flow_timer(&self) -> Option<TimerHandle> {
        self.flow_timer.map(|t| t.handle)
    }

    /// Simulated time at which the pending flow tick fires
    pub fn flow_due_ms(&self) -> Option<u64> {
        self.flow_timer.map(|t| t.due_ms)
    }

    /// Take all events raised since the last drain
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    fn flow_context(&self) -> FlowContext<'_> {
        FlowContext {
            board: &self.board,
            faucet: self.level.faucet,
            goal: self.level.goal,
            rules: self.rules,
        }
    }

    fn schedule(&mut self, delay_ms: u64) -> Timer {
        let handle = TimerHandle(self.next_handle);
        self.next_handle += 1;
        Timer {
            handle,
            due_ms: self.time_ms + delay_ms,
        }
    }

    fn refresh_faucet(&mut self) {
        if self.faucet_status != FaucetStatus::Open {
            self.faucet_status = FaucetStatus::evaluate(&self.board, &self.level.faucet);
        }
    }

    /// Drop timers, flow and outcome flags; handles issued so far go stale
    fn clear_run(&mut self) {
        self.flow_timer = None;
        self.settle_timer = None;
        self.flow = FlowState::default();
        self.phase = Phase::Arranging;
        self.goal_reached = false;
        self.lost = false;
        self.faucet_status = FaucetStatus::Closed;
        self.refresh_faucet();
    }

    fn scramble_initial(&mut self, seed: u32) {
        if self.scramble_moves == 0 {
            return;
        }
        let mut rng = Pcg32::seed_from_u64(seed as u64);
        let done = self.initial.scramble(self.scramble_moves, &mut rng);
        log::debug!("scrambled board with {done} slides");
        self.board = self.initial.clone();
        self.refresh_faucet();
    }

    fn install(&mut self, level: Level) {
        self.initial = level.board.clone();
        self.board = level.board.clone();
        self.level = level;
        self.clear_run();
    }

    /// Parse and install a level string. On error the current level stays.
    pub fn load_level(&mut self, input: &str) -> Result<(), LevelError> {
        match level::decode(input) {
            Ok(level) => {
                let (width, height) = (level.board.width(), level.board.height());
                log::info!("loaded {width}x{height} level");
                self.install(level);
                self.events.push(GameEvent::LevelLoaded { width, height });
                Ok(())
            }
            Err(e) => {
                log::warn!("rejected level string: {e}");
                self.events.push(GameEvent::LevelRejected {
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Back to the starting arrangement of the current level
    pub fn reset(&mut self) {
        self.board = self.initial.clone();
        self.clear_run();
        log::info!("board reset");
        self.events.push(GameEvent::BoardReset);
    }

    /// Generate, scramble and install the next board for the current tier
    pub fn new_board(&mut self) {
        let seed = self.seed;
        self.seed = self.seed.wrapping_add(1);
        match level::pick_level(self.difficulty, seed, self.rules.no_spill, self.batch_size) {
            Ok(level) => {
                let (width, height) = (level.board.width(), level.board.height());
                self.install(level);
                self.scramble_initial(seed);
                log::info!("new {} board from seed {seed}", self.difficulty);
                self.events.push(GameEvent::LevelLoaded { width, height });
            }
            Err(e) => log::warn!("could not build a new board: {e}"),
        }
    }

    /// Flip no-spill mode; a new board is dealt under the new rules
    pub fn toggle_no_spill(&mut self) {
        self.rules.no_spill = !self.rules.no_spill;
        log::info!("no-spill mode {}", if self.rules.no_spill { "on" } else { "off" });
        self.new_board();
    }

    /// Slide the piece at `(x, y)` into the neighboring empty slot
    pub fn slide(&mut self, x: usize, y: usize) -> Option<SlideMove> {
        let moved = if self.is_locked() {
            log::debug!("movement locked, ignoring ({x}, {y})");
            None
        } else {
            self.board.slide(x, y)
        };
        let Some(mv) = moved else {
            self.events.push(GameEvent::SlideRejected { x, y });
            return None;
        };

        log::debug!("tile {} slid {:?} -> {:?}", mv.tile, mv.from, mv.to);
        self.settle_timer = Some(self.schedule(self.slide_settle_ms));
        self.refresh_faucet();
        self.events.push(GameEvent::Slid(mv));
        Some(mv)
    }

    /// Open the faucet. Only a closed faucet opens; returns whether flow began.
    pub fn open_faucet(&mut self) -> bool {
        if self.faucet_status != FaucetStatus::Closed || self.phase != Phase::Arranging {
            log::debug!("faucet is {:?}, cannot open", self.faucet_status);
            return false;
        }
        let Some(started) = flow::start(&self.flow_context()) else {
            self.faucet_status = FaucetStatus::Blocked;
            return false;
        };

        self.flow = started;
        self.faucet_status = FaucetStatus::Open;
        self.phase = Phase::Flowing;
        self.flow_timer = Some(self.schedule(self.flow_tick_ms));
        log::info!("faucet opened");
        self.events.push(GameEvent::FaucetOpened);
        true
    }

    /// Fire a flow tick. Stale handles (cancelled by reset or load) are refused.
    pub fn on_flow_timer(&mut self, handle: TimerHandle) -> bool {
        if self.pending_flow_timer() != Some(handle) {
            log::debug!("ignoring stale flow timer {handle:?}");
            return false;
        }
        self.flow_timer = None;
        self.step_flow();
        true
    }

    fn step_flow(&mut self) {
        let outcome = flow::tick(&self.flow_context(), &self.flow);

        for spill in &outcome.new_spills {
            log::debug!("water spilled at ({}, {})", spill.x, spill.y);
            self.lost = true;
            self.events.push(GameEvent::Spilled(*spill));
        }
        if !self.goal_reached && outcome.state.goal_reached() {
            self.goal_reached = true;
            self.events.push(GameEvent::GoalReached);
        }
        self.flow = outcome.state;

        if outcome.advanced {
            self.events.push(GameEvent::FlowAdvanced {
                tiles: outcome.new_tiles,
            });
            self.flow_timer = Some(self.schedule(self.flow_tick_ms));
        } else {
            self.finish_flow();
        }
    }

    fn finish_flow(&mut self) {
        let ctx = self.flow_context();
        let reached = flow::is_goal_reached(&ctx, &self.flow);
        let verdict = flow::conclude(&ctx, &self.flow);
        if reached && !self.goal_reached {
            self.goal_reached = true;
            self.events.push(GameEvent::GoalReached);
        }
        match verdict {
            FlowOutcome::Won => {
                log::info!("goal reached after {} ticks", self.flow.ticks());
                self.phase = Phase::Won;
                self.events.push(GameEvent::Won);
            }
            FlowOutcome::Lost => {
                log::info!("flow ended without a clean route to the goal");
                self.phase = Phase::Lost;
                self.lost = true;
                self.events.push(GameEvent::Lost);
            }
        }
    }

    /// Move the simulated clock forward, firing every timer that falls due
    ///
    /// The clock stops at each due time before that tick runs, so a long
    /// `dt_ms` fires every tick that falls inside it.
    pub fn advance(&mut self, dt_ms: u64) {
        let target = self.time_ms + dt_ms;
        if self.settle_timer.is_some_and(|t| t.due_ms <= target) {
            self.settle_timer = None;
        }
        while let Some(timer) = self.flow_timer.filter(|t| t.due_ms <= target) {
            self.time_ms = self.time_ms.max(timer.due_ms);
            self.on_flow_timer(timer.handle);
        }
        self.time_ms = target;
    }

    /// Renderer view of the current state
    pub fn snapshot(&self) -> Snapshot {
        let width = self.board.width();
        let tiles = self
            .board
            .cells()
            .iter()
            .enumerate()
            .filter(|&(_, &id)| id != EMPTY)
            .map(|(idx, &id)| TileView {
                id,
                x: idx % width,
                y: idx / width,
                exits: self.board.exits_of(id),
                flowing: self.flow.is_flowing(id),
                incoming: self.flow.incoming(id),
            })
            .collect();

        Snapshot {
            width,
            height: self.board.height(),
            cells: self.board.cells().to_vec(),
            tiles,
            faucet: self.level.faucet,
            goal: self.level.goal,
            faucet_status: self.faucet_status,
            phase: self.phase,
            goal_reached: self.goal_reached,
            lost: self.lost,
            spills: self.flow.spills().to_vec(),
            locked: self.is_locked(),
            no_spill: self.rules.no_spill,
        }
    }

    /// Exits per tile ID, as a renderer would register them once per level
    pub fn tile_exits(&self) -> &BTreeMap<TileId, Exits> {
        self.board.exits()
    }
}
