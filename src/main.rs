//! Wallrace command-line front-end.
//!
//! ## Usage
//!
//! - `wallrace` - Show a demo
//! - `wallrace play` - Start the text protocol on stdin/stdout
//! - `wallrace demo` - Let random players race until someone wins

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use wallrace::ai::{RandomAgent, playout};
use wallrace::config::{MatchConfig, TimingMode};
use wallrace::console::ConsoleEngine;
use wallrace::constants::{DEFAULT_TOTAL_LIMIT_MS, DEFAULT_TURN_LIMIT_MS, DEMO_MAX_TURNS};
use wallrace::game::MatchManager;

/// Wallrace: a wall-blocking race game engine
#[derive(Parser)]
#[command(name = "wallrace")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// JSON match configuration; flags below override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    width: Option<usize>,

    #[arg(long, global = true)]
    height: Option<usize>,

    #[arg(long, global = true)]
    players: Option<usize>,

    /// Seed for special cells and the random players
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Scatter Teleport, Return and DoubleTurn cells
    #[arg(long, global = true)]
    special_cells: bool,

    /// Per-turn time limit in milliseconds (0 = default)
    #[arg(long, global = true, conflicts_with = "match_time")]
    turn_time: Option<u64>,

    /// Whole-match time budget per player in milliseconds (0 = default)
    #[arg(long, global = true)]
    match_time: Option<u64>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Drive a match with text commands on stdin
    Play,
    /// Play a random game and print the final board
    Demo,
}

impl Cli {
    fn match_config(&self) -> Result<MatchConfig> {
        let mut config = match &self.config {
            Some(path) => MatchConfig::from_json_file(path)?,
            None => MatchConfig::default(),
        };
        if let Some(w) = self.width {
            config.board_width = w;
        }
        if let Some(h) = self.height {
            config.board_height = h;
        }
        if let Some(n) = self.players {
            config.player_count = n;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        config.special_cells |= self.special_cells;
        if let Some(ms) = self.turn_time {
            let turn_limit_ms = if ms == 0 { DEFAULT_TURN_LIMIT_MS } else { ms };
            config.timing = TimingMode::AgainstTheClock { turn_limit_ms };
        }
        if let Some(ms) = self.match_time {
            let total_limit_ms = if ms == 0 { DEFAULT_TOTAL_LIMIT_MS } else { ms };
            config.timing = TimingMode::Timed { total_limit_ms };
        }
        config.validate()?;
        Ok(config)
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = cli.match_config().context("invalid match configuration")?;

    match cli.command {
        Some(Commands::Play) => {
            let mut engine = ConsoleEngine::new(config)?;
            let stdin = std::io::stdin();
            engine
                .run(stdin.lock(), std::io::stdout())
                .context("console i/o failed")?;
        }
        Some(Commands::Demo) | None => run_demo(config)?,
    }
    Ok(())
}

fn run_demo(config: MatchConfig) -> Result<()> {
    println!("Wallrace: random players race across the board\n");

    let seed = config.seed;
    let mut game = MatchManager::create_match(config)?;
    println!("{game}");

    let mut agent = RandomAgent::with_seed(seed);
    let winner = playout(&mut game, &mut agent, DEMO_MAX_TURNS)?;

    println!("{game}");
    match winner {
        Some(id) => println!(
            "{} wins after {} turns",
            game.players()[id].name,
            game.turn_count()
        ),
        None => println!("No winner after {} turns", game.turn_count()),
    }
    Ok(())
}
