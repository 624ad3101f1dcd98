//! Line-oriented text protocol for driving a match from a terminal or a
//! front-end process.
//!
//! Each request is an optional numeric id, a command and its arguments.
//! Replies start with `=` on success or `?` on failure, followed by the id
//! (if any) and the response text, then a blank line.
//!
//! ## Supported Commands
//!
//! - `name`, `version`, `list_commands`, `known_command <cmd>`, `quit`
//! - `new [width height players]` - Start a new match
//! - `board` - Render the board
//! - `status` - Phase, turn counter, player in turn and winner
//! - `moves <player>` - Legal destinations as `x,y` pairs
//! - `move <player> <x> <y>` - Move a pawn
//! - `wall <player> <sx> <sy> <type> [quarter_turns]` - Place a wall
//! - `ai [player]` - Random move for the player in turn
//! - `clock start|stop` - Background chronometer
//! - `save <path>`, `load <path>` - Persist the match as JSON
//!
//! ## Example
//!
//! ```ignore
//! use wallrace::config::MatchConfig;
//! use wallrace::console::ConsoleEngine;
//! let mut engine = ConsoleEngine::new(MatchConfig::default())?;
//! engine.run(std::io::stdin().lock(), std::io::stdout())?;
//! ```

use std::io::{self, BufRead, Write};

use anyhow::{Context, anyhow, bail};

use crate::ai::RandomAgent;
use crate::board::{Coord, Slot};
use crate::config::MatchConfig;
use crate::game::Outcome;
use crate::player::PlayerId;
use crate::session::MatchSession;
use crate::walls::WallType;

/// The list of known commands.
const KNOWN_COMMANDS: &[&str] = &[
    "ai",
    "board",
    "clock",
    "known_command",
    "list_commands",
    "load",
    "move",
    "moves",
    "name",
    "new",
    "quit",
    "save",
    "status",
    "version",
    "wall",
];

pub struct ConsoleEngine {
    session: MatchSession,
    /// Settings reused by `new`.
    base: MatchConfig,
    agent: RandomAgent,
}

impl ConsoleEngine {
    pub fn new(config: MatchConfig) -> crate::error::Result<Self> {
        let agent = RandomAgent::with_seed(config.seed);
        Ok(Self {
            session: MatchSession::create(config.clone())?,
            base: config,
            agent,
        })
    }

    pub fn session(&self) -> &MatchSession {
        &self.session
    }

    /// Run the command loop until `quit` or end of input.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> io::Result<()> {
        for line in input.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (id, command_line) = Self::parse_id(line);
            let parts: Vec<&str> = command_line.split_whitespace().collect();
            let Some((command, args)) = parts.split_first() else {
                continue;
            };
            let command = command.to_lowercase();

            let (success, message) = self.execute(&command, args);
            let prefix = if success { '=' } else { '?' };
            let id_str = id.map(|i| i.to_string()).unwrap_or_default();
            writeln!(output, "{prefix}{id_str} {message}\n")?;
            output.flush()?;

            if command == "quit" {
                break;
            }
        }
        self.session.stop_clock();
        Ok(())
    }

    /// Parse an optional numeric command ID from the beginning of the line.
    fn parse_id(line: &str) -> (Option<u32>, &str) {
        let trimmed = line.trim();
        let end = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        match trimmed[..end].parse::<u32>() {
            Ok(id) => (Some(id), trimmed[end..].trim()),
            Err(_) => (None, trimmed),
        }
    }

    /// Execute a command and return (success, response).
    pub fn execute(&mut self, command: &str, args: &[&str]) -> (bool, String) {
        match self.dispatch(command, args) {
            Ok(message) => (true, message),
            Err(e) => (false, format!("{e:#}")),
        }
    }

    fn dispatch(&mut self, command: &str, args: &[&str]) -> anyhow::Result<String> {
        match command {
            "name" => Ok(env!("CARGO_PKG_NAME").to_string()),
            "version" => Ok(env!("CARGO_PKG_VERSION").to_string()),
            "list_commands" => Ok(KNOWN_COMMANDS.join("\n")),
            "known_command" => {
                let cmd = arg(args, 0, "command")?;
                Ok(KNOWN_COMMANDS.contains(&cmd.to_lowercase().as_str()).to_string())
            }
            "quit" => Ok(String::new()),

            "new" => {
                let mut config = self.base.clone();
                if !args.is_empty() {
                    config.board_width = parse(args, 0, "width")?;
                    config.board_height = parse(args, 1, "height")?;
                    config.player_count = parse(args, 2, "players")?;
                    config.player_names.truncate(config.player_count);
                }
                self.session.stop_clock();
                self.session = MatchSession::create(config)?;
                Ok(String::new())
            }

            "board" => Ok(self.session.with_match(|game| format!("\n{game}"))),

            "status" => {
                let snap = self.session.snapshot();
                let in_turn = snap
                    .in_turn()
                    .map(|p| p.id.to_string())
                    .unwrap_or_else(|| "-".into());
                let winner = snap
                    .winner
                    .map(|w| w.to_string())
                    .unwrap_or_else(|| "-".into());
                Ok(format!(
                    "{:?} turn {} in_turn {in_turn} winner {winner}",
                    snap.phase, snap.turn_count
                ))
            }

            "moves" => {
                let player: PlayerId = parse(args, 0, "player")?;
                let snap = self.session.snapshot();
                let view = snap
                    .players
                    .get(player)
                    .ok_or_else(|| anyhow!("unknown player {player}"))?;
                Ok(view
                    .legal_moves
                    .iter()
                    .map(|c| format!("{},{}", c.x, c.y))
                    .collect::<Vec<_>>()
                    .join(" "))
            }

            "move" => {
                let player = parse(args, 0, "player")?;
                let dest = Coord::new(parse(args, 1, "x")?, parse(args, 2, "y")?);
                Ok(describe(self.session.execute_move(player, dest)?))
            }

            "wall" => {
                let player = parse(args, 0, "player")?;
                let anchor = Slot::new(parse(args, 1, "slot x")?, parse(args, 2, "slot y")?);
                let wall_type: WallType = arg(args, 3, "wall type")?.parse()?;
                let turns = if args.len() > 4 {
                    parse(args, 4, "quarter turns")?
                } else {
                    0
                };
                Ok(describe(
                    self.session.place_wall(player, anchor, wall_type, turns)?,
                ))
            }

            "ai" => {
                let player = match args.first() {
                    Some(_) => parse(args, 0, "player")?,
                    None => self.session.with_match(|game| game.current_player()),
                };
                let dest = self.session.ai_move(player, &mut self.agent)?;
                Ok(format!("{},{}", dest.x, dest.y))
            }

            "clock" => match arg(args, 0, "start|stop")? {
                "start" => {
                    self.session.start_clock().context("cannot start clock")?;
                    Ok(String::new())
                }
                "stop" => {
                    self.session.stop_clock();
                    Ok(String::new())
                }
                other => bail!("unknown clock action '{other}'"),
            },

            "save" => {
                let path = arg(args, 0, "path")?;
                let text = self.session.save_json()?;
                std::fs::write(path, text).with_context(|| format!("cannot write {path}"))?;
                Ok(String::new())
            }

            "load" => {
                let path = arg(args, 0, "path")?;
                let text =
                    std::fs::read_to_string(path).with_context(|| format!("cannot read {path}"))?;
                self.session.load_json(&text)?;
                Ok(String::new())
            }

            _ => bail!("unknown command: {command}"),
        }
    }
}

fn arg<'a>(args: &[&'a str], i: usize, what: &str) -> anyhow::Result<&'a str> {
    args.get(i)
        .copied()
        .ok_or_else(|| anyhow!("missing argument: {what}"))
}

fn parse<T: std::str::FromStr>(args: &[&str], i: usize, what: &str) -> anyhow::Result<T> {
    let raw = arg(args, i, what)?;
    raw.parse()
        .map_err(|_| anyhow!("invalid {what} '{raw}'"))
}

fn describe(outcome: Outcome) -> String {
    match outcome {
        Outcome::Continue { next } => format!("next {next}"),
        Outcome::Won(player) => format!("winner {player}"),
    }
}
