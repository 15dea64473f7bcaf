//! Game metadata: the seven-tag roster.

use serde::{Deserialize, Serialize};

/// The seven-tag roster carried by every game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameTags {
    pub event: String,
    pub site: String,
    pub date: String,
    pub round: String,
    pub white: String,
    pub black: String,
    pub result: String, // "1-0", "0-1", "1/2-1/2", "*"
}

impl Default for GameTags {
    fn default() -> Self {
        Self {
            event: "?".to_string(),
            site: "?".to_string(),
            date: "?".to_string(),
            round: "?".to_string(),
            white: "?".to_string(),
            black: "?".to_string(),
            result: "*".to_string(),
        }
    }
}

impl GameTags {
    /// Tag names and values in export order.
    pub fn roster(&self) -> [(&'static str, &str); 7] {
        [
            ("Event", &self.event),
            ("Site", &self.site),
            ("Date", &self.date),
            ("Round", &self.round),
            ("White", &self.white),
            ("Black", &self.black),
            ("Result", &self.result),
        ]
    }

    /// Set a roster tag by name. Returns false for names outside the roster.
    pub fn set(&mut self, name: &str, value: &str) -> bool {
        let slot = match name {
            "Event" => &mut self.event,
            "Site" => &mut self.site,
            "Date" => &mut self.date,
            "Round" => &mut self.round,
            "White" => &mut self.white,
            "Black" => &mut self.black,
            "Result" => &mut self.result,
            _ => return false,
        };
        *slot = value.to_string();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let tags = GameTags::default();
        assert_eq!(tags.white, "?");
        assert_eq!(tags.result, "*");
    }

    #[test]
    fn test_set_known_and_unknown() {
        let mut tags = GameTags::default();
        assert!(tags.set("White", "Carlsen"));
        assert!(!tags.set("WhiteElo", "2850"));
        assert_eq!(tags.roster()[4], ("White", "Carlsen"));
    }
}
