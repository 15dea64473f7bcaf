//! Tool configuration from environment variables.

use std::env;

use pgn_core::{ExportOptions, ParserConfig, Recovery};

#[derive(Clone, Debug)]
pub struct Config {
    /// Write `{...}` comments, pre-comments and NAGs
    pub include_comments: bool,

    /// Write side variations, not just the mainline
    pub include_variations: bool,

    /// What to do with a game whose tag section is malformed
    pub recovery: Recovery,
}

fn flag(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Some(true),
            "0" | "false" | "no" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        let recovery = match env::var("PGN_RECOVERY").as_deref() {
            Ok("skip") => Recovery::SkipToNextGame,
            _ => Recovery::Abort,
        };

        Self {
            include_comments: flag("PGN_INCLUDE_COMMENTS", true),
            include_variations: flag("PGN_INCLUDE_VARIATIONS", true),
            recovery,
        }
    }

    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            include_comments: self.include_comments,
            include_variations: self.include_variations,
        }
    }

    pub fn parser_config(&self) -> ParserConfig {
        ParserConfig {
            recovery: self.recovery,
        }
    }
}
