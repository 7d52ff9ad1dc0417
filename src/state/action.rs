//! Action vocabulary.
//!
//! Every external change to a session is one of these messages. They are
//! self-contained and serializable so an identical stream can be replayed on
//! another copy of the session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::config::{MatchConfig, RotationStrategy};
use super::history::PointMeta;
use super::player::{Player, PlayerUpdate};
use super::roster::{DeletedPlayerRecord, DisbandedTeam};
use super::team::{RotationDirection, Side, Slot, TeamRef};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    // Scoring
    Point {
        team: Side,
        #[serde(default)]
        metadata: Option<PointMeta>,
    },
    SubtractPoint {
        team: Side,
    },
    Timeout {
        team: Side,
        #[serde(default)]
        at: Option<DateTime<Utc>>,
    },
    Undo,
    ResetMatch,
    ApplySettings {
        config: MatchConfig,
        should_reset: bool,
    },
    ToggleSides,
    SetServer {
        team: Option<Side>,
    },
    RotateLineup {
        team: Side,
        direction: RotationDirection,
    },

    // Roster
    AddPlayer {
        player: Player,
        target: Slot,
    },
    RemovePlayer {
        player_id: String,
    },
    DeletePlayer {
        player_id: String,
        at: DateTime<Utc>,
    },
    RestorePlayer {
        record: DeletedPlayerRecord,
    },
    MovePlayer {
        player_id: String,
        from: Slot,
        to: Slot,
        #[serde(default)]
        index: Option<usize>,
    },
    UpdatePlayer {
        player_id: String,
        update: PlayerUpdate,
    },
    ToggleFixed {
        player_id: String,
    },
    ToggleBench {
        team: TeamRef,
    },
    UpdateTeamName {
        team: TeamRef,
        name: String,
    },
    UpdateTeamColor {
        team: TeamRef,
        color: String,
    },
    UpdateTeamLogo {
        team: TeamRef,
        logo: Option<String>,
    },
    Substitute {
        team: TeamRef,
        player_out: String,
        player_in: String,
    },
    SwapPositions {
        team: TeamRef,
        a: usize,
        b: usize,
    },
    Generate {
        players: Vec<Player>,
    },
    Balance,
    SetRotationMode {
        mode: RotationStrategy,
    },

    // Queue and rotation
    DisbandTeam {
        team_id: String,
    },
    RestoreTeam {
        record: DisbandedTeam,
    },
    ReorderQueue {
        from: usize,
        to: usize,
    },
    ExpireDeleted {
        before: DateTime<Utc>,
    },
    ClearRoster,
    RotateTeams,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Point { .. } => "point",
            Self::SubtractPoint { .. } => "subtract_point",
            Self::Timeout { .. } => "timeout",
            Self::Undo => "undo",
            Self::ResetMatch => "reset_match",
            Self::ApplySettings { .. } => "apply_settings",
            Self::ToggleSides => "toggle_sides",
            Self::SetServer { .. } => "set_server",
            Self::RotateLineup { .. } => "rotate_lineup",
            Self::AddPlayer { .. } => "add_player",
            Self::RemovePlayer { .. } => "remove_player",
            Self::DeletePlayer { .. } => "delete_player",
            Self::RestorePlayer { .. } => "restore_player",
            Self::MovePlayer { .. } => "move_player",
            Self::UpdatePlayer { .. } => "update_player",
            Self::ToggleFixed { .. } => "toggle_fixed",
            Self::ToggleBench { .. } => "toggle_bench",
            Self::UpdateTeamName { .. } => "update_team_name",
            Self::UpdateTeamColor { .. } => "update_team_color",
            Self::UpdateTeamLogo { .. } => "update_team_logo",
            Self::Substitute { .. } => "substitute",
            Self::SwapPositions { .. } => "swap_positions",
            Self::Generate { .. } => "generate",
            Self::Balance => "balance",
            Self::SetRotationMode { .. } => "set_rotation_mode",
            Self::DisbandTeam { .. } => "disband_team",
            Self::RestoreTeam { .. } => "restore_team",
            Self::ReorderQueue { .. } => "reorder_queue",
            Self::ExpireDeleted { .. } => "expire_deleted",
            Self::ClearRoster => "clear_roster",
            Self::RotateTeams => "rotate_teams",
        }
    }
}
