//! Score state machine.
//!
//! Tracks points, sets, serve, timeouts and deuce handling for one match.
//! Illegal transitions (anything after the match is decided, a timeout past
//! the limit, subtracting from zero) leave the state untouched and report
//! that nothing happened.
//!
//! # Serve rotation
//!
//! When a side wins a rally on the other side's serve and it has already
//! served earlier in the set, its on-court lineup rotates one position
//! clockwise. Whether a side has served is read from the set's action log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::config::{DeuceType, MatchConfig, MIN_LEAD_TO_WIN, SUDDEN_DEATH_TARGET};
use super::history::{
    has_served_in_set, last_scorer, Checkpoint, CheckpointKind, LineupRotationRecord, LogEntry,
    PointMeta, PointRecord, TimeoutRecord,
};
use super::roster::Roster;
use super::team::{RotationDirection, Side};

/// A completed set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetResult {
    pub set_number: u8,
    pub score_a: u16,
    pub score_b: u16,
    pub winner: Side,
}

/// Result of a point transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointOutcome {
    /// Match already decided
    Ignored,
    Scored {
        team: Side,
        score_a: u16,
        score_b: u16,
        auto_rotated: bool,
        side_switch: bool,
        sudden_death_started: bool,
    },
    SetWon {
        result: SetResult,
        match_winner: Option<Side>,
    },
}

/// What an undo reverted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Undone {
    Point,
    Timeout,
    LineupRotation,
    SetEnd,
    Rotation,
}

/// Live match state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchState {
    pub score_a: u16,
    pub score_b: u16,
    pub sets_a: u8,
    pub sets_b: u8,
    pub current_set: u8,
    pub serving: Option<Side>,
    pub timeouts_a: u8,
    pub timeouts_b: u8,
    pub in_sudden_death: bool,
    /// Advisory: sides should switch now
    pub pending_side_switch: bool,
    pub swapped_sides: bool,
    pub is_match_over: bool,
    pub match_winner: Option<Side>,
    pub history: Vec<SetResult>,
    /// Entries of the current set, popped by undo
    pub action_log: Vec<LogEntry>,
    /// Every entry of the match, append-only apart from undo
    pub match_log: Vec<LogEntry>,
}

impl Default for MatchState {
    fn default() -> Self {
        Self {
            score_a: 0,
            score_b: 0,
            sets_a: 0,
            sets_b: 0,
            current_set: 1,
            serving: None,
            timeouts_a: 0,
            timeouts_b: 0,
            in_sudden_death: false,
            pending_side_switch: false,
            swapped_sides: false,
            is_match_over: false,
            match_winner: None,
            history: Vec::new(),
            action_log: Vec::new(),
            match_log: Vec::new(),
        }
    }
}

/// Winner of a set at the given score, if any.
pub fn set_winner(score_a: u16, score_b: u16, target: u16, sudden_death: bool) -> Option<Side> {
    let (needed, lead) = if sudden_death {
        (SUDDEN_DEATH_TARGET, 1)
    } else {
        (target, MIN_LEAD_TO_WIN)
    };
    if score_a >= needed && score_a >= score_b + lead {
        Some(Side::A)
    } else if score_b >= needed && score_b >= score_a + lead {
        Some(Side::B)
    } else {
        None
    }
}

impl MatchState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn score(&self, side: Side) -> u16 {
        match side {
            Side::A => self.score_a,
            Side::B => self.score_b,
        }
    }

    pub fn sets(&self, side: Side) -> u8 {
        match side {
            Side::A => self.sets_a,
            Side::B => self.sets_b,
        }
    }

    pub fn timeouts(&self, side: Side) -> u8 {
        match side {
            Side::A => self.timeouts_a,
            Side::B => self.timeouts_b,
        }
    }

    /// Side that won the most recent point of the match.
    pub fn last_scorer(&self) -> Option<Side> {
        last_scorer(&self.match_log)
    }

    pub fn point(
        &mut self,
        team: Side,
        meta: Option<&PointMeta>,
        config: &MatchConfig,
        roster: &mut Roster,
    ) -> PointOutcome {
        if self.is_match_over {
            debug!(team = %team, "point ignored, match is over");
            return PointOutcome::Ignored;
        }

        let (mut score_a, mut score_b) = match team {
            Side::A => (self.score_a + 1, self.score_b),
            Side::B => (self.score_a, self.score_b + 1),
        };
        let total = score_a + score_b;
        let side_switch = config
            .side_switch_interval(self.current_set)
            .is_some_and(|interval| total > 0 && total % interval == 0);

        let target = config.target_for_set(self.current_set);
        let sudden_death_started = config.deuce == DeuceType::SuddenDeath3pt
            && !self.in_sudden_death
            && score_a == target - 1
            && score_b == target - 1;
        if sudden_death_started {
            score_a = 0;
            score_b = 0;
        }
        let sudden_death = self.in_sudden_death || sudden_death_started;
        let winner = set_winner(score_a, score_b, target, sudden_death);

        let auto_rotated = winner.is_none()
            && self.serving.is_some_and(|server| server != team)
            && has_served_in_set(&self.action_log, team);
        if auto_rotated {
            roster.rotate_lineup(team, RotationDirection::Clockwise);
            debug!(team = %team, "side-out, rotated lineup");
        }

        let meta = meta.cloned().unwrap_or_default();
        let record = LogEntry::Point(PointRecord {
            team,
            prev_score_a: self.score_a,
            prev_score_b: self.score_b,
            prev_serving: self.serving,
            prev_in_sudden_death: self.in_sudden_death,
            prev_swapped_sides: self.swapped_sides,
            prev_pending_side_switch: self.pending_side_switch,
            auto_rotated,
            player_id: meta.player_id,
            skill: meta.skill,
            at: meta.at,
        });

        if let Some(winner) = winner {
            return self.finish_set(winner, score_a, score_b, record, config);
        }

        self.score_a = score_a;
        self.score_b = score_b;
        self.serving = Some(team);
        self.in_sudden_death = sudden_death;
        self.pending_side_switch = side_switch;
        if side_switch {
            self.swapped_sides = !self.swapped_sides;
        }
        self.action_log.push(record.clone());
        self.match_log.push(record);

        if sudden_death_started {
            info!(set = self.current_set, "sudden death, score reset to 0-0");
        }
        debug!(team = %team, score_a, score_b, "point");

        PointOutcome::Scored {
            team,
            score_a,
            score_b,
            auto_rotated,
            side_switch,
            sudden_death_started,
        }
    }

    fn finish_set(
        &mut self,
        winner: Side,
        score_a: u16,
        score_b: u16,
        record: LogEntry,
        config: &MatchConfig,
    ) -> PointOutcome {
        let checkpoint = Checkpoint::set_end(self);

        let result = SetResult {
            set_number: self.current_set,
            score_a,
            score_b,
            winner,
        };
        match winner {
            Side::A => self.sets_a += 1,
            Side::B => self.sets_b += 1,
        }
        self.history.push(result.clone());
        self.match_log.push(record);
        self.action_log = vec![LogEntry::Checkpoint(Box::new(checkpoint))];

        let match_winner = (self.sets(winner) >= config.sets_to_win()).then_some(winner);
        if match_winner.is_some() {
            self.score_a = score_a;
            self.score_b = score_b;
            self.is_match_over = true;
            self.match_winner = match_winner;
            info!(winner = %winner, sets_a = self.sets_a, sets_b = self.sets_b, "match over");
        } else {
            self.score_a = 0;
            self.score_b = 0;
            self.current_set += 1;
            info!(
                set = result.set_number,
                winner = %winner,
                score_a,
                score_b,
                "set complete"
            );
        }
        self.serving = None;
        self.timeouts_a = 0;
        self.timeouts_b = 0;
        self.in_sudden_death = false;
        self.pending_side_switch = false;

        PointOutcome::SetWon {
            result,
            match_winner,
        }
    }

    /// Take a point back. Not logged.
    pub fn subtract_point(&mut self, team: Side) -> bool {
        if self.is_match_over || self.score(team) == 0 {
            return false;
        }
        match team {
            Side::A => self.score_a -= 1,
            Side::B => self.score_b -= 1,
        }
        self.pending_side_switch = false;
        true
    }

    pub fn timeout(&mut self, team: Side, at: Option<DateTime<Utc>>, config: &MatchConfig) -> bool {
        if self.is_match_over || self.timeouts(team) >= config.max_timeouts() {
            debug!(team = %team, "timeout refused");
            return false;
        }
        let record = LogEntry::Timeout(TimeoutRecord {
            team,
            prev_timeouts_a: self.timeouts_a,
            prev_timeouts_b: self.timeouts_b,
            at,
        });
        match team {
            Side::A => self.timeouts_a += 1,
            Side::B => self.timeouts_b += 1,
        }
        self.action_log.push(record.clone());
        self.match_log.push(record);
        debug!(team = %team, "timeout");
        true
    }

    pub fn toggle_sides(&mut self) {
        self.swapped_sides = !self.swapped_sides;
        self.pending_side_switch = false;
    }

    pub fn set_server(&mut self, team: Option<Side>) {
        self.serving = team;
    }

    /// Manual lineup rotation, logged for undo.
    pub fn rotate_lineup(&mut self, team: Side, direction: RotationDirection, roster: &mut Roster) {
        roster.rotate_lineup(team, direction);
        let record = LogEntry::LineupRotation(LineupRotationRecord { team, direction });
        self.action_log.push(record.clone());
        self.match_log.push(record);
    }

    /// Checkpoint taken before a team rotation. The rotated match starts a
    /// fresh state whose set log holds only this entry.
    pub fn rotation_checkpoint(&self, roster: &Roster) -> LogEntry {
        LogEntry::Checkpoint(Box::new(Checkpoint::rotation(self, roster)))
    }

    /// Revert the latest entry of the set log. An empty log is a no-op.
    pub fn undo(&mut self, roster: &mut Roster) -> Option<Undone> {
        let entry = self.action_log.pop()?;
        if self.match_log.last() == Some(&entry) {
            self.match_log.pop();
        }

        let undone = match entry {
            LogEntry::Point(record) => {
                self.score_a = record.prev_score_a;
                self.score_b = record.prev_score_b;
                self.serving = record.prev_serving;
                self.in_sudden_death = record.prev_in_sudden_death;
                self.swapped_sides = record.prev_swapped_sides;
                self.pending_side_switch = record.prev_pending_side_switch;
                if record.auto_rotated {
                    roster.rotate_lineup(record.team, RotationDirection::CounterClockwise);
                }
                Undone::Point
            }
            LogEntry::Timeout(record) => {
                self.timeouts_a = record.prev_timeouts_a;
                self.timeouts_b = record.prev_timeouts_b;
                Undone::Timeout
            }
            LogEntry::LineupRotation(record) => {
                roster.rotate_lineup(record.team, record.direction.reversed());
                Undone::LineupRotation
            }
            LogEntry::Checkpoint(checkpoint) => {
                let Checkpoint {
                    kind,
                    state,
                    roster: saved,
                    match_log_len,
                } = *checkpoint;
                let mut match_log = std::mem::take(&mut self.match_log);
                *self = state;
                if kind == CheckpointKind::SetEnd {
                    match_log.truncate(match_log_len);
                    self.match_log = match_log;
                }
                if let Some(saved) = saved {
                    *roster = saved;
                }
                match kind {
                    CheckpointKind::SetEnd => Undone::SetEnd,
                    CheckpointKind::Rotation => Undone::Rotation,
                }
            }
        };

        debug!(undone = ?undone, "undo");
        Some(undone)
    }

    /// Back to 0-0 in set one with empty logs.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "score": [self.score_a, self.score_b],
            "sets": [self.sets_a, self.sets_b],
            "current_set": self.current_set,
            "serving": self.serving.map(|s| s.as_str()),
            "timeouts": [self.timeouts_a, self.timeouts_b],
            "in_sudden_death": self.in_sudden_death,
            "pending_side_switch": self.pending_side_switch,
            "swapped_sides": self.swapped_sides,
            "is_match_over": self.is_match_over,
            "match_winner": self.match_winner.map(|s| s.as_str()),
            "last_scorer": self.last_scorer().map(|s| s.as_str()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::player::Player;
    use crate::state::team::Team;
    use pretty_assertions::assert_eq;

    fn roster() -> Roster {
        let lineup = |prefix: &str| {
            (0..3)
                .map(|i| Player::new(format!("{}{}", prefix, i + 1), prefix, i))
                .collect::<Vec<_>>()
        };
        Roster::new().with_courts(
            Team::new("a", "A").with_players(lineup("a")),
            Team::new("b", "B").with_players(lineup("b")),
        )
    }

    fn ids(team: &Team) -> Vec<&str> {
        team.players.iter().map(|p| p.id.as_str()).collect()
    }

    fn play(state: &mut MatchState, config: &MatchConfig, roster: &mut Roster, rallies: &str) {
        for c in rallies.chars() {
            let side = if c == 'A' { Side::A } else { Side::B };
            state.point(side, None, config, roster);
        }
    }

    #[test]
    fn test_set_winner() {
        assert_eq!(set_winner(25, 23, 25, false), Some(Side::A));
        assert_eq!(set_winner(25, 24, 25, false), None);
        assert_eq!(set_winner(24, 26, 25, false), Some(Side::B));
        assert_eq!(set_winner(3, 2, 15, true), Some(Side::A));
        assert_eq!(set_winner(2, 2, 15, true), None);
    }

    #[test]
    fn test_deuce_continues_until_two_point_lead() {
        let config = MatchConfig::default();
        let mut roster = roster();
        let mut state = MatchState {
            score_a: 24,
            score_b: 24,
            ..MatchState::new()
        };

        let outcome = state.point(Side::A, None, &config, &mut roster);
        assert!(matches!(outcome, PointOutcome::Scored { score_a: 25, score_b: 24, .. }));

        let outcome = state.point(Side::A, None, &config, &mut roster);
        match outcome {
            PointOutcome::SetWon { result, match_winner } => {
                assert_eq!((result.score_a, result.score_b), (26, 24));
                assert_eq!(match_winner, None);
            }
            other => panic!("expected set win, got {:?}", other),
        }
        assert_eq!(state.current_set, 2);
        assert_eq!((state.score_a, state.score_b), (0, 0));
        assert_eq!(state.sets_a, 1);
        assert_eq!(state.serving, None);
    }

    #[test]
    fn test_sudden_death_resets_and_plays_to_three() {
        let config = MatchConfig {
            points_per_set: 15,
            deuce: DeuceType::SuddenDeath3pt,
            ..MatchConfig::default()
        };
        let mut roster = roster();
        let mut state = MatchState {
            score_a: 14,
            score_b: 13,
            ..MatchState::new()
        };

        let outcome = state.point(Side::B, None, &config, &mut roster);
        assert!(matches!(outcome, PointOutcome::Scored { sudden_death_started: true, .. }));
        assert_eq!((state.score_a, state.score_b), (0, 0));
        assert!(state.in_sudden_death);

        play(&mut state, &config, &mut roster, "ABAB");
        assert_eq!((state.score_a, state.score_b), (2, 2));
        assert!(state.in_sudden_death);

        let outcome = state.point(Side::A, None, &config, &mut roster);
        assert!(matches!(outcome, PointOutcome::SetWon { ref result, .. } if result.winner == Side::A));
        assert!(!state.in_sudden_death);
    }

    #[test]
    fn test_sideout_rotates_team_that_served_before() {
        let config = MatchConfig::default();
        let mut roster = roster();
        let mut state = MatchState::new();

        play(&mut state, &config, &mut roster, "AAB");
        assert_eq!(ids(&roster.court_a), vec!["a1", "a2", "a3"]);
        assert_eq!(ids(&roster.court_b), vec!["b1", "b2", "b3"]);

        let outcome = state.point(Side::A, None, &config, &mut roster);
        assert!(matches!(outcome, PointOutcome::Scored { auto_rotated: true, .. }));
        assert_eq!(ids(&roster.court_a), vec!["a3", "a1", "a2"]);

        assert_eq!(state.undo(&mut roster), Some(Undone::Point));
        assert_eq!(ids(&roster.court_a), vec!["a1", "a2", "a3"]);
        assert_eq!(state.serving, Some(Side::B));
    }

    #[test]
    fn test_every_later_sideout_rotates_again() {
        let config = MatchConfig::default();
        let mut roster = roster();
        let mut state = MatchState::new();

        play(&mut state, &config, &mut roster, "AABA");
        assert_eq!(ids(&roster.court_a), vec!["a3", "a1", "a2"]);

        let outcome = state.point(Side::B, None, &config, &mut roster);
        assert!(matches!(outcome, PointOutcome::Scored { auto_rotated: true, .. }));
        assert_eq!(ids(&roster.court_b), vec!["b3", "b1", "b2"]);

        let outcome = state.point(Side::A, None, &config, &mut roster);
        assert!(matches!(outcome, PointOutcome::Scored { auto_rotated: true, .. }));
        assert_eq!(ids(&roster.court_a), vec!["a2", "a3", "a1"]);

        let outcome = state.point(Side::A, None, &config, &mut roster);
        assert!(matches!(outcome, PointOutcome::Scored { auto_rotated: false, .. }));
        assert_eq!(ids(&roster.court_a), vec!["a2", "a3", "a1"]);
    }

    #[test]
    fn test_beach_side_switch_every_seven() {
        let config = MatchConfig::beach();
        let mut roster = roster();
        let mut state = MatchState::new();

        play(&mut state, &config, &mut roster, "AAAABBB");
        assert!(state.pending_side_switch);
        assert!(state.swapped_sides);

        play(&mut state, &config, &mut roster, "A");
        assert!(!state.pending_side_switch);
        assert!(state.swapped_sides);
    }

    #[test]
    fn test_timeout_limit_and_undo() {
        let config = MatchConfig::default();
        let mut roster = roster();
        let mut state = MatchState::new();

        assert!(state.timeout(Side::A, None, &config));
        assert!(state.timeout(Side::A, None, &config));
        assert!(!state.timeout(Side::A, None, &config));
        assert_eq!(state.timeouts_a, 2);

        assert_eq!(state.undo(&mut roster), Some(Undone::Timeout));
        assert_eq!(state.timeouts_a, 1);
        assert_eq!(state.match_log.len(), 1);
    }

    #[test]
    fn test_subtract_point_floors_at_zero() {
        let mut state = MatchState::new();
        assert!(!state.subtract_point(Side::B));
        state.score_b = 1;
        state.pending_side_switch = true;
        assert!(state.subtract_point(Side::B));
        assert_eq!(state.score_b, 0);
        assert!(!state.pending_side_switch);
    }

    #[test]
    fn test_subtract_point_ignored_after_match_over() {
        let config = MatchConfig {
            max_sets: 1,
            points_per_set: 15,
            has_tie_break: false,
            ..MatchConfig::default()
        };
        let mut roster = roster();
        let mut state = MatchState {
            score_a: 14,
            score_b: 3,
            ..MatchState::new()
        };
        state.point(Side::A, None, &config, &mut roster);
        assert!(state.is_match_over);

        let before = state.clone();
        assert!(!state.subtract_point(Side::A));
        assert!(!state.subtract_point(Side::B));
        assert_eq!(state, before);
    }

    #[test]
    fn test_match_over_freezes_scoring_and_undo_reopens() {
        let config = MatchConfig {
            max_sets: 1,
            points_per_set: 15,
            has_tie_break: false,
            ..MatchConfig::default()
        };
        let mut roster = roster();
        let mut state = MatchState {
            score_a: 14,
            ..MatchState::new()
        };

        let outcome = state.point(Side::A, None, &config, &mut roster);
        assert!(matches!(outcome, PointOutcome::SetWon { match_winner: Some(Side::A), .. }));
        assert!(state.is_match_over);
        assert_eq!(state.score_a, 15);

        assert_eq!(state.point(Side::B, None, &config, &mut roster), PointOutcome::Ignored);
        assert!(!state.timeout(Side::B, None, &config));

        assert_eq!(state.undo(&mut roster), Some(Undone::SetEnd));
        assert!(!state.is_match_over);
        assert_eq!(state.score_a, 14);
        assert!(state.history.is_empty());
    }

    #[test]
    fn test_undo_after_set_end_undoes_later_points_first() {
        let config = MatchConfig::default();
        let mut roster = roster();
        let mut state = MatchState {
            score_a: 24,
            score_b: 10,
            ..MatchState::new()
        };

        play(&mut state, &config, &mut roster, "B");
        let before_set_point = state.clone();

        play(&mut state, &config, &mut roster, "AB");
        assert_eq!(state.current_set, 2);
        assert_eq!(state.score_b, 1);
        assert_eq!(state.match_log.len(), 3);

        assert_eq!(state.undo(&mut roster), Some(Undone::Point));
        assert_eq!(state.current_set, 2);
        assert_eq!(state.undo(&mut roster), Some(Undone::SetEnd));
        assert_eq!((state.current_set, state.score_a, state.score_b), (1, 24, 11));
        assert_eq!(state, before_set_point);
    }

    #[test]
    fn test_set_end_checkpoint_holds_no_match_log() {
        let config = MatchConfig::default();
        let mut roster = roster();
        let mut state = MatchState {
            score_a: 24,
            ..MatchState::new()
        };
        play(&mut state, &config, &mut roster, "BA");

        match state.action_log.first() {
            Some(LogEntry::Checkpoint(checkpoint)) => {
                assert_eq!(checkpoint.kind, CheckpointKind::SetEnd);
                assert!(checkpoint.state.match_log.is_empty());
                assert_eq!(checkpoint.match_log_len, 1);
                assert_eq!(checkpoint.state.action_log.len(), 1);
            }
            other => panic!("expected set-end checkpoint, got {:?}", other),
        }
    }

    #[test]
    fn test_undo_on_empty_log_is_noop() {
        let mut roster = roster();
        let mut state = MatchState::new();
        let before = state.clone();
        assert_eq!(state.undo(&mut roster), None);
        assert_eq!(state, before);
    }

    #[test]
    fn test_manual_rotation_undo() {
        let mut roster = roster();
        let mut state = MatchState::new();
        state.rotate_lineup(Side::B, RotationDirection::CounterClockwise, &mut roster);
        assert_eq!(ids(&roster.court_b), vec!["b2", "b3", "b1"]);

        state.undo(&mut roster);
        assert_eq!(ids(&roster.court_b), vec!["b1", "b2", "b3"]);
    }

    #[test]
    fn test_last_scorer() {
        let config = MatchConfig::default();
        let mut roster = roster();
        let mut state = MatchState::new();
        assert_eq!(state.last_scorer(), None);
        play(&mut state, &config, &mut roster, "AB");
        assert_eq!(state.last_scorer(), Some(Side::B));
    }
}
