//! Pipe Slide command line
//!
//! Generates, checks and plays levels headlessly. `RUST_LOG` controls logging.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rand::Rng;

use pipe_slide::consts::{PIPE_SEGMENTS, TURN_CURVATURE};
use pipe_slide::geometry::pipe_points;
use pipe_slide::level::{self, Difficulty, Level};
use pipe_slide::settings::Settings;
use pipe_slide::sim::{Phase, PuzzleState, TickInput, tick};

#[derive(Parser)]
#[command(name = "pipe-slide", version, about = "Sliding-tile pipe puzzle tools")]
struct Cli {
    /// Settings file (JSON); defaults are used when missing
    #[arg(long, global = true)]
    settings: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print generated level strings
    Generate {
        #[arg(long)]
        difficulty: Option<Difficulty>,
        #[arg(long, default_value_t = 1)]
        count: usize,
        #[arg(long)]
        seed: Option<u32>,
        /// Only emit levels that win unscrambled under no-spill rules
        #[arg(long)]
        no_spill: bool,
        /// Print the built-in pack for the tier instead
        #[arg(long)]
        pack: bool,
    },
    /// Validate a level string and report whether it can be solved
    Check { level: String },
    /// Slide pieces, open the faucet and report the outcome
    Play {
        /// Level string; a generated board is used when omitted
        #[arg(long)]
        level: Option<String>,
        #[arg(long)]
        seed: Option<u32>,
        /// Cell to click, as `x,y` (repeatable)
        #[arg(long = "slide", value_parser = parse_cell)]
        slides: Vec<(usize, usize)>,
        #[arg(long)]
        no_spill: bool,
    },
    /// Print the renderer snapshot of a level as JSON
    Snapshot {
        level: String,
        /// Include sampled pipe polylines per piece
        #[arg(long)]
        pipes: bool,
    },
}

fn parse_cell(raw: &str) -> Result<(usize, usize), String> {
    let (x, y) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected x,y but got {raw:?}"))?;
    let parse = |s: &str| s.trim().parse::<usize>().map_err(|e| format!("{s:?}: {e}"));
    Ok((parse(x)?, parse(y)?))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let mut settings = match &cli.settings {
        Some(path) if path.exists() => Settings::load(path),
        Some(path) => {
            // leave an editable file behind
            let defaults = Settings::default();
            defaults.save(path)?;
            defaults
        }
        None => Settings::default(),
    };

    match cli.command {
        Commands::Generate {
            difficulty,
            count,
            seed,
            no_spill,
            pack,
        } => {
            let difficulty = difficulty.unwrap_or(settings.difficulty);
            let levels = if pack {
                level::builtin_pack(difficulty)
            } else {
                let seed = seed.unwrap_or_else(|| rand::rng().random());
                log::info!("generating {count} {difficulty} levels from seed {seed}");
                level::generate_batch(count, difficulty, seed, no_spill || settings.no_spill)
            };
            for text in levels {
                println!("{text}");
            }
        }
        Commands::Check { level: text } => {
            let parsed: Level = text.parse()?;
            println!(
                "{}x{} faucet ({}, {}) {} goal ({}, {}) {}",
                parsed.board.width(),
                parsed.board.height(),
                parsed.faucet.x,
                parsed.faucet.y,
                parsed.faucet.side.as_str(),
                parsed.goal.x,
                parsed.goal.y,
                parsed.goal.side.as_str(),
            );
            println!("solvable: {}", parsed.is_solvable());
        }
        Commands::Play {
            level: text,
            seed,
            slides,
            no_spill,
        } => {
            settings.no_spill |= no_spill;
            let seed = seed.unwrap_or_else(|| rand::rng().random());
            let mut state = match text {
                Some(text) => PuzzleState::new(text.parse()?, &settings, seed),
                None => PuzzleState::generated(&settings, seed)?,
            };
            let start = Level {
                board: state.board.clone(),
                ..state.level.clone()
            };
            println!("level: {start}");

            let (settle_ms, tick_ms) = (state.slide_settle_ms, state.flow_tick_ms);
            for (x, y) in slides {
                let input = TickInput {
                    slide: Some((x, y)),
                    ..Default::default()
                };
                tick(&mut state, &input, settle_ms);
            }
            let open = TickInput {
                open_faucet: true,
                ..Default::default()
            };
            tick(&mut state, &open, 0);
            while state.phase == Phase::Flowing {
                tick(&mut state, &TickInput::default(), tick_ms);
            }

            for event in state.drain_events() {
                println!("{event:?}");
            }
            let verdict = match state.phase {
                Phase::Won => "won",
                Phase::Lost => "lost",
                _ => "faucet blocked",
            };
            println!("result: {verdict}");
        }
        Commands::Snapshot { level: text, pipes } => {
            let state = PuzzleState::new(text.parse()?, &settings, 0);
            let snapshot = state.snapshot();
            if pipes {
                let mut value = serde_json::to_value(&snapshot)?;
                let polylines: Vec<_> = snapshot
                    .tiles
                    .iter()
                    .map(|t| {
                        pipe_points(PIPE_SEGMENTS, t.exits, TURN_CURVATURE)
                            .into_iter()
                            .map(|p| [p.x, p.y])
                            .collect::<Vec<_>>()
                    })
                    .collect();
                value["pipes"] = serde_json::to_value(polylines)?;
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            }
        }
    }

    Ok(())
}
