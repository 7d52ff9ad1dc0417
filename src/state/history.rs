//! Action log entries and checkpoints.
//!
//! Simple transitions log the fields they overwrite and are reverted field by
//! field. Transitions that touch many fields at once (set completion, team
//! rotation) log a [`Checkpoint`] holding the whole prior state instead.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::roster::Roster;
use super::score::MatchState;
use super::team::{RotationDirection, Side};

/// How a point was won.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillType {
    Attack,
    Block,
    Ace,
    OpponentError,
    #[default]
    Generic,
}

/// Optional scouting detail attached to a point.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointMeta {
    pub player_id: Option<String>,
    pub skill: SkillType,
    pub at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointRecord {
    pub team: Side,
    pub prev_score_a: u16,
    pub prev_score_b: u16,
    pub prev_serving: Option<Side>,
    pub prev_in_sudden_death: bool,
    pub prev_swapped_sides: bool,
    pub prev_pending_side_switch: bool,
    /// The scoring team's lineup was rotated on regaining serve
    pub auto_rotated: bool,
    pub player_id: Option<String>,
    pub skill: SkillType,
    pub at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutRecord {
    pub team: Side,
    pub prev_timeouts_a: u8,
    pub prev_timeouts_b: u8,
    pub at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineupRotationRecord {
    pub team: Side,
    pub direction: RotationDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointKind {
    SetEnd,
    Rotation,
}

/// Full prior state for a many-field transition.
///
/// A set-end snapshot carries no match log of its own: the live match log
/// still holds those entries, so undo truncates it back to `match_log_len`.
/// A rotation snapshot keeps the finished match's log, which the next match
/// starts without.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub kind: CheckpointKind,
    pub state: MatchState,
    /// Rosters before a team rotation. Set-end checkpoints leave it empty.
    pub roster: Option<Roster>,
    #[serde(default)]
    pub match_log_len: usize,
}

impl Checkpoint {
    pub fn set_end(state: &MatchState) -> Self {
        let mut snapshot = state.clone();
        snapshot.match_log = Vec::new();
        Self {
            kind: CheckpointKind::SetEnd,
            state: snapshot,
            roster: None,
            match_log_len: state.match_log.len(),
        }
    }

    /// Undo reaches back into the finished match but not past its start, so
    /// the previous rotation checkpoint is left out of the snapshot.
    pub fn rotation(state: &MatchState, roster: &Roster) -> Self {
        let mut snapshot = state.clone();
        drop_rotations(&mut snapshot.action_log);
        Self {
            kind: CheckpointKind::Rotation,
            state: snapshot,
            roster: Some(roster.clone()),
            match_log_len: state.match_log.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LogEntry {
    Point(PointRecord),
    Timeout(TimeoutRecord),
    LineupRotation(LineupRotationRecord),
    Checkpoint(Box<Checkpoint>),
}

/// Remove rotation checkpoints from a set log and the set logs nested in its
/// set-end checkpoints.
fn drop_rotations(log: &mut Vec<LogEntry>) {
    log.retain(|entry| {
        !matches!(entry, LogEntry::Checkpoint(c) if c.kind == CheckpointKind::Rotation)
    });
    for entry in log.iter_mut() {
        if let LogEntry::Checkpoint(checkpoint) = entry {
            drop_rotations(&mut checkpoint.state.action_log);
        }
    }
}

impl LogEntry {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Point(_) => "point",
            Self::Timeout(_) => "timeout",
            Self::LineupRotation(_) => "lineup_rotation",
            Self::Checkpoint(_) => "checkpoint",
        }
    }
}

/// Whether `team` has held serve when winning a rally in this log.
pub fn has_served_in_set(log: &[LogEntry], team: Side) -> bool {
    log.iter().any(|entry| match entry {
        LogEntry::Point(record) => record.prev_serving == Some(team),
        _ => false,
    })
}

/// Side that won the most recent point in this log.
pub fn last_scorer(log: &[LogEntry]) -> Option<Side> {
    log.iter().rev().find_map(|entry| match entry {
        LogEntry::Point(record) => Some(record.team),
        _ => None,
    })
}
