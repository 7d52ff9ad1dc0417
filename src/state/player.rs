//! Player records.
//!
//! Players are plain values. Every roster slot holds its own copy, so no two
//! slots ever share a player through a reference.

use serde::{Deserialize, Serialize};

/// Maximum length of a sanitized display name.
pub const MAX_NAME_LEN: usize = 30;

/// Skill assigned when none is given.
pub const DEFAULT_SKILL: u32 = 5;

pub type PlayerId = String;

/// A player in the pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Unique player ID
    pub id: PlayerId,

    /// Display name
    pub name: String,

    /// Shirt number, unique across every roster slot
    #[serde(default)]
    pub number: Option<String>,

    /// Skill rating used for balancing
    pub skill: u32,

    /// Pinned players are never moved by balancing or stealing
    #[serde(default)]
    pub fixed: bool,

    /// Insertion index, used as the ordering key when restoring order
    pub original_index: u32,

    /// Position within the list that currently holds the player
    #[serde(default)]
    pub display_order: u32,

    /// Link to a persistent profile
    #[serde(default)]
    pub profile_id: Option<String>,
}

impl Player {
    pub fn new(id: impl Into<PlayerId>, name: &str, original_index: u32) -> Self {
        Self {
            id: id.into(),
            name: sanitize_name(name),
            number: None,
            skill: DEFAULT_SKILL,
            fixed: false,
            original_index,
            display_order: original_index,
            profile_id: None,
        }
    }

    pub fn with_skill(mut self, skill: u32) -> Self {
        self.skill = skill;
        self
    }

    pub fn with_number(mut self, number: &str) -> Self {
        self.number = normalize_number(number);
        self
    }

    pub fn with_profile(mut self, profile_id: impl Into<String>) -> Self {
        self.profile_id = Some(profile_id.into());
        self
    }

    pub fn pinned(mut self) -> Self {
        self.fixed = true;
        self
    }

    /// Sanitize the name and trim the shirt number of a player that did not
    /// come through the builder.
    pub fn normalize(&mut self) {
        self.name = sanitize_name(&self.name);
        self.number = self.number.as_deref().and_then(normalize_number);
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "name": self.name,
            "number": self.number,
            "skill": self.skill,
            "fixed": self.fixed
        })
    }
}

/// Partial edit of a player.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerUpdate {
    pub name: Option<String>,
    /// `Some("")` clears the number.
    pub number: Option<String>,
    pub skill: Option<u32>,
}

/// Trim a name, strip markup characters and cap its length.
pub fn sanitize_name(input: &str) -> String {
    input
        .trim()
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | '/' | '"' | '\'' | '`' | '\\'))
        .take(MAX_NAME_LEN)
        .collect::<String>()
        .trim_end()
        .to_string()
}

/// Trimmed shirt number, or `None` when blank.
pub fn normalize_number(number: &str) -> Option<String> {
    let trimmed = number.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn total_skill(players: &[Player]) -> u32 {
    players.iter().map(|p| p.skill).sum()
}

/// Mean skill, `0.0` for an empty list.
pub fn average_skill(players: &[Player]) -> f64 {
    if players.is_empty() {
        return 0.0;
    }
    f64::from(total_skill(players)) / players.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("  Ana  "), "Ana");
        assert_eq!(sanitize_name("<b>Bo</b>"), "bBob");
        assert_eq!(sanitize_name(&"x".repeat(40)).len(), MAX_NAME_LEN);
    }

    #[test]
    fn test_number_normalization() {
        let p = Player::new("p1", "Ana", 0).with_number(" 7 ");
        assert_eq!(p.number.as_deref(), Some("7"));

        let blank = Player::new("p2", "Bo", 1).with_number("   ");
        assert_eq!(blank.number, None);
    }

    #[test]
    fn test_skill_helpers() {
        let players = vec![
            Player::new("a", "A", 0).with_skill(4),
            Player::new("b", "B", 1).with_skill(8),
        ];
        assert_eq!(total_skill(&players), 12);
        assert_eq!(average_skill(&players), 6.0);
        assert_eq!(average_skill(&[]), 0.0);
    }
}
