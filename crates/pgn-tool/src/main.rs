//! Reads a PGN file game by game and writes it back out.
//!
//! Usage: pgn-tool <file.pgn> [--json]
//!
//! Every game is replayed onto a game tree and re-exported as PGN. With
//! `--json` the raw parse trees are printed instead, one per line.

mod config;

use anyhow::{bail, Context, Result};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::Config;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let json = args.iter().any(|a| a == "--json");
    let Some(path) = args.iter().find(|a| !a.starts_with("--")) else {
        bail!("usage: pgn-tool <file.pgn> [--json]");
    };

    let config = Config::from_env();
    info!(path = %path, ?config, "Reading games");

    let games = pgn_core::games_in_file_with(path, config.parser_config())
        .with_context(|| format!("failed to open {path}"))?;
    let options = config.export_options();

    let mut written = 0u32;
    let mut failed = 0u32;

    for (index, parsed) in games.enumerate() {
        let parsed = parsed.with_context(|| format!("parse error in game {}", index + 1))?;

        if json {
            println!("{}", serde_json::to_string(&parsed)?);
            written += 1;
            continue;
        }

        match pgn_core::build_game(&parsed) {
            Ok(game) => {
                println!("{}", game.to_pgn(&options));
                written += 1;
            }
            Err(e) => {
                error!(game = index + 1, error = %e, "Failed to replay game");
                failed += 1;
            }
        }
    }

    info!(written, failed, "Done");
    Ok(())
}
