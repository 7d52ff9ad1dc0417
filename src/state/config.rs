//! Match format configuration.
//!
//! A [`MatchConfig`] is a plain value handed to every transition. Nothing in
//! the crate reads configuration from global state.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Points required to win a set once sudden death has started.
pub const SUDDEN_DEATH_TARGET: u16 = 3;

/// Lead required to win a set under the standard deuce policy.
pub const MIN_LEAD_TO_WIN: u16 = 2;

/// Total points between side switches in a regular beach set.
pub const SIDE_SWITCH_INTERVAL: u16 = 7;

/// Total points between side switches in the deciding beach set.
pub const DECIDING_SET_SIDE_SWITCH_INTERVAL: u16 = 5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse match config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error for field `{field}`: {message}")]
    Validation { field: String, message: String },
}

impl ConfigError {
    fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Indoor or beach rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourtMode {
    Indoor,
    Beach,
}

impl CourtMode {
    /// Timeouts each side may call per set.
    pub fn max_timeouts(&self) -> u8 {
        match self {
            Self::Indoor => 2,
            Self::Beach => 1,
        }
    }
}

/// Court format presets, from 2-a-side to 6-a-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CourtPreset {
    #[default]
    #[serde(rename = "indoor-6v6")]
    Indoor6v6,
    #[serde(rename = "quads-5v5")]
    Quads5v5,
    #[serde(rename = "beach-4v4")]
    Beach4v4,
    #[serde(rename = "triples-3v3")]
    Triples3v3,
    #[serde(rename = "beach-2v2")]
    Beach2v2,
}

impl CourtPreset {
    pub const ALL: [CourtPreset; 5] = [
        Self::Indoor6v6,
        Self::Quads5v5,
        Self::Beach4v4,
        Self::Triples3v3,
        Self::Beach2v2,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Indoor6v6 => "indoor-6v6",
            Self::Quads5v5 => "quads-5v5",
            Self::Beach4v4 => "beach-4v4",
            Self::Triples3v3 => "triples-3v3",
            Self::Beach2v2 => "beach-2v2",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Indoor6v6 => "Indoor 6v6",
            Self::Quads5v5 => "Quads 5v5",
            Self::Beach4v4 => "Beach 4v4",
            Self::Triples3v3 => "Triples 3v3",
            Self::Beach2v2 => "Beach Doubles 2v2",
        }
    }

    pub fn mode(&self) -> CourtMode {
        match self {
            Self::Indoor6v6 | Self::Quads5v5 => CourtMode::Indoor,
            Self::Beach4v4 | Self::Triples3v3 | Self::Beach2v2 => CourtMode::Beach,
        }
    }

    /// Players per side on court.
    pub fn court_limit(&self) -> usize {
        match self {
            Self::Indoor6v6 => 6,
            Self::Quads5v5 => 5,
            Self::Beach4v4 => 4,
            Self::Triples3v3 => 3,
            Self::Beach2v2 => 2,
        }
    }

    /// Players a team may keep on its bench.
    pub fn bench_limit(&self) -> usize {
        match self {
            Self::Indoor6v6 => 6,
            Self::Quads5v5 => 4,
            Self::Beach4v4 => 3,
            Self::Triples3v3 => 2,
            Self::Beach2v2 => 1,
        }
    }

    /// Find the preset with the given court capacity.
    pub fn from_court_limit(limit: usize) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.court_limit() == limit)
    }
}

/// How a set is resolved once both sides reach `target - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeuceType {
    /// Win by two, no cap.
    #[default]
    Standard,
    /// Reset to 0-0 and play first to three.
    #[serde(rename = "sudden_death_3pt")]
    SuddenDeath3pt,
}

/// Strategy used to restock the incoming team after a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationStrategy {
    #[default]
    Standard,
    Balanced,
}

impl RotationStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Balanced => "balanced",
        }
    }
}

/// Court and bench capacity for one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RosterLimits {
    pub court: usize,
    pub bench: usize,
}

/// Format descriptor for a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub preset: CourtPreset,
    pub max_sets: u8,
    pub points_per_set: u16,
    pub has_tie_break: bool,
    pub tie_break_points: u16,
    pub deuce: DeuceType,
    pub rotation: RotationStrategy,
    /// Beach only: flag a side switch every 7 points (5 in the deciding set).
    pub auto_side_switch: bool,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            preset: CourtPreset::Indoor6v6,
            max_sets: 5,
            points_per_set: 25,
            has_tie_break: true,
            tie_break_points: 15,
            deuce: DeuceType::Standard,
            rotation: RotationStrategy::Standard,
            auto_side_switch: true,
        }
    }
}

impl MatchConfig {
    /// Best-of-three beach doubles to 21, tie-break to 15.
    pub fn beach() -> Self {
        Self {
            preset: CourtPreset::Beach2v2,
            max_sets: 3,
            points_per_set: 21,
            ..Self::default()
        }
    }

    /// Parse and validate a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: MatchConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.max_sets, 1 | 3 | 5) {
            return Err(ConfigError::invalid(
                "max_sets",
                format!("must be 1, 3 or 5, got {}", self.max_sets),
            ));
        }
        if !matches!(self.points_per_set, 15 | 21 | 25) {
            return Err(ConfigError::invalid(
                "points_per_set",
                format!("must be 15, 21 or 25, got {}", self.points_per_set),
            ));
        }
        if !matches!(self.tie_break_points, 15 | 25) {
            return Err(ConfigError::invalid(
                "tie_break_points",
                format!("must be 15 or 25, got {}", self.tie_break_points),
            ));
        }
        Ok(())
    }

    pub fn mode(&self) -> CourtMode {
        self.preset.mode()
    }

    pub fn court_limit(&self) -> usize {
        self.preset.court_limit()
    }

    pub fn bench_limit(&self) -> usize {
        self.preset.bench_limit()
    }

    pub fn limits(&self) -> RosterLimits {
        RosterLimits {
            court: self.court_limit(),
            bench: self.bench_limit(),
        }
    }

    pub fn max_timeouts(&self) -> u8 {
        self.mode().max_timeouts()
    }

    /// Sets needed to take the match.
    pub fn sets_to_win(&self) -> u8 {
        self.max_sets.div_ceil(2)
    }

    pub fn is_deciding_set(&self, set: u8) -> bool {
        self.has_tie_break && set == self.max_sets
    }

    /// Point target for the given set number.
    pub fn target_for_set(&self, set: u8) -> u16 {
        if self.is_deciding_set(set) {
            self.tie_break_points
        } else {
            self.points_per_set
        }
    }

    /// Total-points interval between side switches, if switching applies.
    pub fn side_switch_interval(&self, set: u8) -> Option<u16> {
        if self.mode() != CourtMode::Beach || !self.auto_side_switch {
            return None;
        }
        Some(if self.is_deciding_set(set) {
            DECIDING_SET_SIDE_SWITCH_INTERVAL
        } else {
            SIDE_SWITCH_INTERVAL
        })
    }
}
