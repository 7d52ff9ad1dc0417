//! Match and roster state.
//!
//! - `config` - match format, court presets, TOML loading
//! - `player` / `team` - value records and slot addressing
//! - `allocation` - standard distribution and snake draft
//! - `rotation` - post-match rotation with player stealing
//! - `roster` - single-player and team mutations
//! - `history` - action log entries and checkpoints
//! - `score` - the scoring state machine
//! - `action` - the action vocabulary
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        MatchSession                           │
//! │                                                               │
//! │   Action ──▶ apply_mut ──┬──▶ MatchState (score, logs)        │
//! │                          │        │ serve rotation            │
//! │                          │        ▼                           │
//! │                          └──▶ Roster (courts, benches, queue) │
//! │                                   │                           │
//! │                    allocation ◀───┤───▶ rotation              │
//! │                                                               │
//! │   rotation_preview: computed after every action once the      │
//! │   match is over and a team is waiting                         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use volley_state::state::{Action, MatchConfig, MatchSession, Player, Side, Slot};
//!
//! let mut session = MatchSession::new(MatchConfig::beach());
//! session.apply_mut(Action::AddPlayer {
//!     player: Player::new("p1", "Ana", 0),
//!     target: Slot::Court(Side::A.into()),
//! });
//! session.apply_mut(Action::Point { team: Side::A, metadata: None });
//! ```

pub mod action;
pub mod allocation;
pub mod config;
pub mod history;
pub mod player;
pub mod roster;
pub mod rotation;
pub mod score;
pub mod team;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub use action::Action;
pub use allocation::{balance_snake_draft, distribute_standard, Buckets};
pub use config::{
    ConfigError, CourtMode, CourtPreset, DeuceType, MatchConfig, RosterLimits, RotationStrategy,
};
pub use history::{Checkpoint, CheckpointKind, LogEntry, PointMeta, SkillType};
pub use player::{Player, PlayerId, PlayerUpdate};
pub use roster::{
    DeletedPlayerRecord, DisbandedTeam, MoveOutcome, Placement, Roster, RosterError,
};
pub use rotation::{rotate, RotationReport, StolenPlayer};
pub use score::{set_winner, MatchState, PointOutcome, SetResult, Undone};
pub use team::{RotationDirection, Side, Slot, Team, TeamRef};

/// Result of applying one action.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    /// Illegal in the current state; nothing changed
    Ignored,
    Applied,
    Point(PointOutcome),
    Undone(Undone),
    Placed(Placement),
    Moved(MoveOutcome),
    Deleted(DeletedPlayerRecord),
    Disbanded(DisbandedTeam),
    Fixed(bool),
    /// Teams rotated; `None` when nobody was waiting
    Rotated(Option<RotationReport>),
    Rejected(RosterError),
    InvalidConfig(String),
}

impl ActionOutcome {
    pub fn is_applied(&self) -> bool {
        !matches!(
            self,
            Self::Ignored
                | Self::Rejected(_)
                | Self::InvalidConfig(_)
                | Self::Point(PointOutcome::Ignored)
                | Self::Moved(MoveOutcome::NeedsBenchActivation { .. })
        )
    }
}

impl From<Result<(), RosterError>> for ActionOutcome {
    fn from(result: Result<(), RosterError>) -> Self {
        match result {
            Ok(()) => Self::Applied,
            Err(err) => Self::Rejected(err),
        }
    }
}

/// Complete persisted state: configuration, score and rosters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSession {
    pub config: MatchConfig,
    #[serde(default)]
    pub state: MatchState,
    #[serde(default)]
    pub roster: Roster,
    #[serde(default)]
    pub rotation_preview: Option<RotationReport>,
}

impl Default for MatchSession {
    fn default() -> Self {
        Self::new(MatchConfig::default())
    }
}

impl MatchSession {
    pub fn new(config: MatchConfig) -> Self {
        Self {
            config,
            state: MatchState::new(),
            roster: Roster::new(),
            rotation_preview: None,
        }
    }

    pub fn with_roster(mut self, roster: Roster) -> Self {
        self.roster = roster;
        self.refresh_preview();
        self
    }

    /// Apply an action, returning the new session.
    pub fn apply(&self, action: Action) -> (Self, ActionOutcome) {
        let mut next = self.clone();
        let outcome = next.apply_mut(action);
        (next, outcome)
    }

    /// Apply an action in place.
    pub fn apply_mut(&mut self, action: Action) -> ActionOutcome {
        let name = action.name();
        let outcome = self.dispatch(action);
        self.refresh_preview();

        match &outcome {
            ActionOutcome::Rejected(err) => warn!(action = name, error = %err, "action rejected"),
            ActionOutcome::InvalidConfig(err) => warn!(action = name, error = %err, "settings rejected"),
            other => debug!(action = name, applied = other.is_applied(), "action"),
        }
        outcome
    }

    fn dispatch(&mut self, action: Action) -> ActionOutcome {
        let limits = self.config.limits();
        let config = &self.config;
        let state = &mut self.state;
        let roster = &mut self.roster;

        match action {
            Action::Point { team, metadata } => {
                ActionOutcome::Point(state.point(team, metadata.as_ref(), config, roster))
            }
            Action::SubtractPoint { team } => applied(state.subtract_point(team)),
            Action::Timeout { team, at } => applied(state.timeout(team, at, config)),
            Action::Undo => state
                .undo(roster)
                .map_or(ActionOutcome::Ignored, ActionOutcome::Undone),
            Action::ResetMatch => {
                state.reset();
                ActionOutcome::Applied
            }
            Action::ApplySettings {
                config,
                should_reset,
            } => self.apply_settings(config, should_reset),
            Action::ToggleSides => {
                state.toggle_sides();
                ActionOutcome::Applied
            }
            Action::SetServer { team } => {
                state.set_server(team);
                ActionOutcome::Applied
            }
            Action::RotateLineup { team, direction } => {
                state.rotate_lineup(team, direction, roster);
                ActionOutcome::Applied
            }

            Action::AddPlayer { player, target } => {
                outcome(roster.add_player(player, &target, limits), ActionOutcome::Placed)
            }
            Action::RemovePlayer { player_id } => {
                outcome(roster.remove_player(&player_id, limits), ActionOutcome::Placed)
            }
            Action::DeletePlayer { player_id, at } => {
                outcome(roster.delete_player(&player_id, at), ActionOutcome::Deleted)
            }
            Action::RestorePlayer { record } => {
                outcome(roster.restore_player(&record, limits), ActionOutcome::Placed)
            }
            Action::MovePlayer {
                player_id,
                from,
                to,
                index,
            } => outcome(
                roster.move_player(&player_id, &from, &to, index, limits),
                ActionOutcome::Moved,
            ),
            Action::UpdatePlayer { player_id, update } => {
                roster.update_player(&player_id, &update).into()
            }
            Action::ToggleFixed { player_id } => {
                outcome(roster.toggle_fixed(&player_id), ActionOutcome::Fixed)
            }
            Action::ToggleBench { team } => roster.toggle_bench(&team).map(|_| ()).into(),
            Action::UpdateTeamName { team, name } => roster.rename_team(&team, &name).into(),
            Action::UpdateTeamColor { team, color } => roster.recolor_team(&team, &color).into(),
            Action::UpdateTeamLogo { team, logo } => roster.set_team_logo(&team, logo).into(),
            Action::Substitute {
                team,
                player_out,
                player_in,
            } => roster.substitute(&team, &player_out, &player_in).into(),
            Action::SwapPositions { team, a, b } => roster.swap_positions(&team, a, b).into(),
            Action::Generate { players } => roster
                .generate(players, config.rotation, limits.court)
                .into(),
            Action::Balance => {
                roster.redistribute(limits.court, RotationStrategy::Balanced, false);
                ActionOutcome::Applied
            }
            Action::SetRotationMode { mode } => {
                self.config.rotation = mode;
                ActionOutcome::Applied
            }

            Action::DisbandTeam { team_id } => {
                outcome(roster.disband_team(&team_id), ActionOutcome::Disbanded)
            }
            Action::RestoreTeam { record } => roster.restore_team(&record).into(),
            Action::ReorderQueue { from, to } => roster.reorder_queue(from, to).into(),
            Action::ExpireDeleted { before } => {
                roster.expire_deleted(before);
                ActionOutcome::Applied
            }
            Action::ClearRoster => {
                roster.clear();
                ActionOutcome::Applied
            }
            Action::RotateTeams => self.rotate_teams(),
        }
    }

    fn apply_settings(&mut self, config: MatchConfig, should_reset: bool) -> ActionOutcome {
        if let Err(err) = config.validate() {
            return ActionOutcome::InvalidConfig(err.to_string());
        }
        let capacity_changed = config.court_limit() != self.config.court_limit();
        self.config = config;

        if should_reset {
            self.state.reset();
        }
        if capacity_changed {
            self.roster
                .redistribute(self.config.court_limit(), RotationStrategy::Standard, true);
        }
        info!(
            preset = self.config.preset.as_str(),
            reset = should_reset,
            redistributed = capacity_changed,
            "applied settings"
        );
        ActionOutcome::Applied
    }

    /// Swap the losing court for the next team in the queue and start a new
    /// match. Undo restores the finished match and the old rosters.
    fn rotate_teams(&mut self) -> ActionOutcome {
        let Some(winner) = self.state.match_winner.filter(|_| self.state.is_match_over) else {
            return ActionOutcome::Ignored;
        };

        let checkpoint = self.state.rotation_checkpoint(&self.roster);
        let report = self.roster.preview_rotation(
            winner,
            self.config.court_limit(),
            self.config.rotation,
        );
        if let Some(report) = &report {
            self.roster.apply_rotation(winner, report);
        }

        self.state = MatchState {
            action_log: vec![checkpoint],
            ..MatchState::new()
        };
        info!(
            winner = %winner,
            rotated = report.is_some(),
            "started next match"
        );
        ActionOutcome::Rotated(report)
    }

    /// Recompute the rotation preview. Present only once the match is over
    /// and a team is waiting.
    fn refresh_preview(&mut self) {
        self.rotation_preview = match self.state.match_winner {
            Some(winner) if self.state.is_match_over => self.roster.preview_rotation(
                winner,
                self.config.court_limit(),
                self.config.rotation,
            ),
            _ => None,
        };
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Compact summary for display.
    pub fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "config": {
                "preset": self.config.preset.as_str(),
                "rotation": self.config.rotation.as_str(),
            },
            "state": self.state.to_json(),
            "court_a": self.roster.court_a.to_json(),
            "court_b": self.roster.court_b.to_json(),
            "queue": self.roster.queue.iter().map(|t| t.to_json()).collect::<Vec<_>>(),
            "rotation_preview": self.rotation_preview.as_ref().map(|r| r.to_json()),
        })
    }
}

fn applied(changed: bool) -> ActionOutcome {
    if changed {
        ActionOutcome::Applied
    } else {
        ActionOutcome::Ignored
    }
}

fn outcome<T>(result: Result<T, RosterError>, wrap: impl FnOnce(T) -> ActionOutcome) -> ActionOutcome {
    match result {
        Ok(value) => wrap(value),
        Err(err) => ActionOutcome::Rejected(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn session() -> MatchSession {
        let config = MatchConfig {
            preset: CourtPreset::Beach2v2,
            max_sets: 1,
            points_per_set: 15,
            has_tie_break: false,
            ..MatchConfig::default()
        };
        let mut session = MatchSession::new(config);
        for i in 0..6u32 {
            let target = match i {
                0 | 1 => Slot::Court(Side::A.into()),
                2 | 3 => Slot::Court(Side::B.into()),
                _ => Slot::Queue,
            };
            let outcome = session.apply_mut(Action::AddPlayer {
                player: Player::new(format!("p{}", i), &format!("P{}", i), i),
                target,
            });
            assert!(outcome.is_applied());
        }
        session
    }

    fn win_match(session: &mut MatchSession, side: Side) {
        for _ in 0..15 {
            session.apply_mut(Action::Point {
                team: side,
                metadata: None,
            });
        }
    }

    #[test]
    fn test_preview_appears_when_match_ends() {
        let mut s = session();
        assert!(s.rotation_preview.is_none());

        win_match(&mut s, Side::A);
        assert!(s.state.is_match_over);
        let preview = s.rotation_preview.as_ref().unwrap();
        assert_eq!(preview.outgoing.id, s.roster.court_b.id);
        assert_eq!(s.summary()["state"]["match_winner"], "A");
    }

    #[test]
    fn test_rotate_teams_and_undo() {
        let mut s = session();
        win_match(&mut s, Side::A);
        let before = s.clone();

        let outcome = s.apply_mut(Action::RotateTeams);
        assert!(matches!(outcome, ActionOutcome::Rotated(Some(_))));
        let court_b: Vec<&str> = s.roster.court_b.players.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(court_b, vec!["p4", "p5"]);
        assert!(!s.state.is_match_over);
        assert_eq!(s.state.score_a, 0);
        assert!(s.rotation_preview.is_none());

        assert_eq!(s.apply_mut(Action::Undo), ActionOutcome::Undone(Undone::Rotation));
        assert_eq!(s, before);
    }

    #[test]
    fn test_rotate_teams_before_match_end_is_ignored() {
        let mut s = session();
        assert_eq!(s.apply_mut(Action::RotateTeams), ActionOutcome::Ignored);
    }

    #[test]
    fn test_apply_settings_rejects_invalid_config() {
        let mut s = session();
        let config = MatchConfig {
            points_per_set: 30,
            ..MatchConfig::default()
        };
        let outcome = s.apply_mut(Action::ApplySettings {
            config,
            should_reset: false,
        });
        assert!(matches!(outcome, ActionOutcome::InvalidConfig(_)));
        assert_eq!(s.config.points_per_set, 15);
    }

    #[test]
    fn test_rejected_roster_action_leaves_session_unchanged() {
        let s = session();
        let (next, outcome) = s.apply(Action::AddPlayer {
            player: Player::new("p0", "Again", 9),
            target: Slot::Queue,
        });
        assert_eq!(
            outcome,
            ActionOutcome::Rejected(RosterError::DuplicatePlayerId {
                player_id: "p0".into()
            })
        );
        assert_eq!(next, s);
    }

    #[test]
    fn test_json_round_trip() {
        let mut s = session();
        s.apply_mut(Action::Point {
            team: Side::B,
            metadata: Some(PointMeta {
                player_id: Some("p2".into()),
                skill: SkillType::Ace,
                at: None,
            }),
        });
        let json = s.to_json().unwrap();
        assert_eq!(MatchSession::from_json(&json).unwrap(), s);
    }
}
