//! Roster mutation engine.
//!
//! The [`Roster`] owns both court teams and the waiting queue. Every
//! operation keeps each player ID in exactly one list: a court lineup, a
//! bench, or one queue team. Queue teams left with no players on court or
//! bench are dissolved.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::allocation::{balance_snake_draft, distribute_standard, Buckets};
use super::config::{RosterLimits, RotationStrategy};
use super::player::{normalize_number, sanitize_name, Player, PlayerUpdate};
use super::rotation::{rotate, RotationReport};
use super::team::{renumber, RotationDirection, Side, Slot, Team, TeamIdentity, TeamRef};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RosterError {
    #[error("team `{team_id}` has no room on its {slot}")]
    CapacityExceeded { team_id: String, slot: String },

    #[error("number {number} belongs to {conflict_name}")]
    DuplicateNumber {
        number: String,
        conflict_id: String,
        conflict_name: String,
    },

    #[error("player `{player_id}` is already on the roster")]
    DuplicatePlayerId { player_id: String },

    #[error("team `{team_id}` already exists")]
    DuplicateTeamId { team_id: String },

    #[error("player `{player_id}` not found")]
    PlayerNotFound { player_id: String },

    #[error("team `{team}` not found")]
    TeamNotFound { team: String },

    #[error("index {index} out of range for {len} entries")]
    InvalidIndex { index: usize, len: usize },
}

/// Restore record emitted by a hard delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedPlayerRecord {
    pub player: Player,
    /// Where the player sat, addressed by team ID
    pub origin: Slot,
    pub index: usize,
    pub deleted_at: DateTime<Utc>,
}

/// Restore record emitted when a queue team is disbanded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisbandedTeam {
    pub team: Team,
    pub index: usize,
}

/// Where an added or restored player landed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "slot", rename_all = "snake_case")]
pub enum Placement {
    OnCourt { team_id: String },
    Benched { team_id: String },
    Queued { team_id: String },
}

impl Placement {
    pub fn team_id(&self) -> &str {
        match self {
            Self::OnCourt { team_id } | Self::Benched { team_id } | Self::Queued { team_id } => {
                team_id
            }
        }
    }
}

/// Result of a move into a possibly full destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum MoveOutcome {
    Placed(Placement),
    /// The destination court was full; its last player went to the bench.
    AutoBenched { team_id: String, player_id: String },
    /// The destination court is full and its bench is off. Nothing changed.
    NeedsBenchActivation { team_id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TeamPos {
    Court(Side),
    Queue(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Location {
    team: TeamPos,
    bench: bool,
    index: usize,
}

/// Both court teams, the waiting queue and pending delete records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Roster {
    pub court_a: Team,
    pub court_b: Team,
    #[serde(default)]
    pub queue: Vec<Team>,
    #[serde(default)]
    pub deleted: Vec<DeletedPlayerRecord>,
    #[serde(default = "first_team_seq")]
    next_team_seq: u32,
}

fn first_team_seq() -> u32 {
    1
}

impl Default for Roster {
    fn default() -> Self {
        Self {
            court_a: Team::new("court-a", "Team A"),
            court_b: Team::new("court-b", "Team B"),
            queue: Vec::new(),
            deleted: Vec::new(),
            next_team_seq: first_team_seq(),
        }
    }
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_courts(mut self, court_a: Team, court_b: Team) -> Self {
        self.court_a = court_a;
        self.court_b = court_b;
        self
    }

    pub fn with_queue(mut self, queue: Vec<Team>) -> Self {
        self.queue = queue;
        self
    }

    pub fn court(&self, side: Side) -> &Team {
        match side {
            Side::A => &self.court_a,
            Side::B => &self.court_b,
        }
    }

    pub fn court_mut(&mut self, side: Side) -> &mut Team {
        match side {
            Side::A => &mut self.court_a,
            Side::B => &mut self.court_b,
        }
    }

    /// Court A, court B, then the queue front to back.
    pub fn teams(&self) -> impl Iterator<Item = &Team> {
        [&self.court_a, &self.court_b]
            .into_iter()
            .chain(self.queue.iter())
    }

    pub fn all_players(&self) -> impl Iterator<Item = &Player> {
        self.teams().flat_map(|t| t.all_players())
    }

    pub fn player_count(&self) -> usize {
        self.teams().map(|t| t.size()).sum()
    }

    pub fn find_player(&self, player_id: &str) -> Option<&Player> {
        self.all_players().find(|p| p.id == player_id)
    }

    pub fn find_team(&self, team: &TeamRef) -> Option<&Team> {
        self.resolve(team).ok().map(|pos| self.team(pos))
    }

    /// Player holding `number`, other than `exclude`.
    pub fn number_conflict(&self, number: &str, exclude: Option<&str>) -> Option<&Player> {
        let number = number.trim();
        self.all_players()
            .find(|p| {
                p.number.as_deref().map(str::trim) == Some(number)
                    && Some(p.id.as_str()) != exclude
            })
    }

    // ------------------------------------------------------------------
    // Single-player operations
    // ------------------------------------------------------------------

    pub fn add_player(
        &mut self,
        mut player: Player,
        target: &Slot,
        limits: RosterLimits,
    ) -> Result<Placement, RosterError> {
        player.normalize();
        self.ensure_unique(&player).inspect_err(|err| {
            warn!(player = %player.id, error = %err, "rejected player add");
        })?;

        let placement = match target {
            Slot::Court(team) => {
                let pos = self.resolve(team)?;
                self.place_on_court(pos, player, None, limits)?
            }
            Slot::Bench(team) => {
                let pos = self.resolve(team)?;
                let t = self.team(pos);
                if t.bench.len() >= limits.bench {
                    return Err(self.capacity_error(pos, "bench"));
                }
                self.insert(pos, true, player, None);
                self.team_mut(pos).bench_active = true;
                Placement::Benched {
                    team_id: self.team(pos).id.clone(),
                }
            }
            Slot::Queue => Placement::Queued {
                team_id: self.push_to_queue_tail(player, limits.court),
            },
        };

        debug!(slot = %target, team = %placement.team_id(), "added player");
        Ok(placement)
    }

    /// Soft removal: the player goes to the back of the queue.
    pub fn remove_player(
        &mut self,
        player_id: &str,
        limits: RosterLimits,
    ) -> Result<Placement, RosterError> {
        let (player, _) = self.extract(player_id).ok_or_else(|| not_found(player_id))?;
        let team_id = self.push_to_queue_tail(player, limits.court);
        self.dissolve_empty_queue_teams();
        debug!(player = player_id, team = %team_id, "moved player to the back of the queue");
        Ok(Placement::Queued { team_id })
    }

    /// Hard removal. The returned record is also kept in `deleted` until it is
    /// restored or expired.
    pub fn delete_player(
        &mut self,
        player_id: &str,
        at: DateTime<Utc>,
    ) -> Result<DeletedPlayerRecord, RosterError> {
        let (player, location) = self.extract(player_id).ok_or_else(|| not_found(player_id))?;
        let team = TeamRef::Id(self.team(location.team).id.clone());
        let origin = if location.bench {
            Slot::Bench(team)
        } else {
            Slot::Court(team)
        };

        let record = DeletedPlayerRecord {
            player,
            origin,
            index: location.index,
            deleted_at: at,
        };
        self.deleted.push(record.clone());
        self.dissolve_empty_queue_teams();

        debug!(player = player_id, origin = %record.origin, "deleted player");
        Ok(record)
    }

    /// Put a deleted player back where they were, or as close as capacity allows.
    pub fn restore_player(
        &mut self,
        record: &DeletedPlayerRecord,
        limits: RosterLimits,
    ) -> Result<Placement, RosterError> {
        let mut player = record.player.clone();
        player.normalize();
        self.ensure_unique(&player)?;

        let placement = match &record.origin {
            Slot::Court(team) => match self.resolve(team) {
                Ok(pos) => match self.place_on_court(pos, player.clone(), Some(record.index), limits) {
                    Ok(placement) => placement,
                    Err(_) => self.queue_fallback(player, limits),
                },
                Err(_) => self.queue_fallback(player, limits),
            },
            Slot::Bench(team) => match self.resolve(team) {
                Ok(pos) if self.team(pos).bench.len() < limits.bench => {
                    self.insert(pos, true, player, Some(record.index));
                    Placement::Benched {
                        team_id: self.team(pos).id.clone(),
                    }
                }
                _ => self.queue_fallback(player, limits),
            },
            Slot::Queue => self.queue_fallback(player, limits),
        };

        self.deleted
            .retain(|r| !(r.player.id == record.player.id && r.deleted_at == record.deleted_at));
        debug!(player = %record.player.id, team = %placement.team_id(), "restored player");
        Ok(placement)
    }

    /// Move a player between slots.
    ///
    /// A full destination court either pushes its last player to an active
    /// bench with room, or reports that the bench needs activating and leaves
    /// the roster untouched.
    pub fn move_player(
        &mut self,
        player_id: &str,
        from: &Slot,
        to: &Slot,
        index: Option<usize>,
        limits: RosterLimits,
    ) -> Result<MoveOutcome, RosterError> {
        let location = self.locate(player_id).ok_or_else(|| not_found(player_id))?;
        if !self.slot_matches(from, location)? {
            return Err(not_found(player_id));
        }

        let outcome = match to {
            Slot::Court(team) => {
                let pos = self.resolve(team)?;
                let same_list = location.team == pos && !location.bench;
                let same_bench = location.team == pos && location.bench;
                let dest = self.team(pos);
                let court_len = dest.players.len() - usize::from(same_list);
                let bench_len = dest.bench.len() - usize::from(same_bench);

                if court_len < limits.court {
                    let (player, _) = self.extract_at(location);
                    self.insert(pos, false, player, index);
                    MoveOutcome::Placed(Placement::OnCourt {
                        team_id: self.team(pos).id.clone(),
                    })
                } else if dest.bench_active && bench_len < limits.bench {
                    let (player, _) = self.extract_at(location);
                    self.insert(pos, false, player, index);
                    let dest = self.team_mut(pos);
                    let bumped_at = dest
                        .players
                        .iter()
                        .rposition(|p| p.id != player_id)
                        .unwrap_or(dest.players.len() - 1);
                    let bumped = dest.players.remove(bumped_at);
                    let bumped_id = bumped.id.clone();
                    dest.bench.push(bumped);
                    renumber(&mut dest.players);
                    renumber(&mut dest.bench);
                    info!(team = %dest.id, player = %bumped_id, "court full, moved last player to bench");
                    MoveOutcome::AutoBenched {
                        team_id: dest.id.clone(),
                        player_id: bumped_id,
                    }
                } else if !dest.bench_active && bench_len < limits.bench {
                    return Ok(MoveOutcome::NeedsBenchActivation {
                        team_id: dest.id.clone(),
                    });
                } else {
                    let err = self.capacity_error(pos, "court");
                    warn!(player = player_id, error = %err, "rejected player move");
                    return Err(err);
                }
            }
            Slot::Bench(team) => {
                let pos = self.resolve(team)?;
                let same_bench = location.team == pos && location.bench;
                let bench_len = self.team(pos).bench.len() - usize::from(same_bench);
                if bench_len >= limits.bench {
                    let err = self.capacity_error(pos, "bench");
                    warn!(player = player_id, error = %err, "rejected player move");
                    return Err(err);
                }
                let (player, _) = self.extract_at(location);
                self.insert(pos, true, player, index);
                self.team_mut(pos).bench_active = true;
                MoveOutcome::Placed(Placement::Benched {
                    team_id: self.team(pos).id.clone(),
                })
            }
            Slot::Queue => {
                let (player, _) = self.extract_at(location);
                MoveOutcome::Placed(Placement::Queued {
                    team_id: self.push_to_queue_tail(player, limits.court),
                })
            }
        };

        self.dissolve_empty_queue_teams();
        debug!(player = player_id, from = %from, to = %to, "moved player");
        Ok(outcome)
    }

    /// Flip a player's pin flag, returning the new value.
    pub fn toggle_fixed(&mut self, player_id: &str) -> Result<bool, RosterError> {
        let player = self
            .player_mut(player_id)
            .ok_or_else(|| not_found(player_id))?;
        player.fixed = !player.fixed;
        Ok(player.fixed)
    }

    pub fn update_player(
        &mut self,
        player_id: &str,
        update: &PlayerUpdate,
    ) -> Result<(), RosterError> {
        if self.find_player(player_id).is_none() {
            return Err(not_found(player_id));
        }
        let number = update.number.as_deref().map(normalize_number);
        if let Some(Some(number)) = &number {
            if let Some(conflict) = self.number_conflict(number, Some(player_id)) {
                return Err(duplicate_number(number, conflict));
            }
        }

        let Some(player) = self.player_mut(player_id) else {
            return Err(not_found(player_id));
        };
        if let Some(name) = &update.name {
            player.name = sanitize_name(name);
        }
        if let Some(number) = number {
            player.number = number;
        }
        if let Some(skill) = update.skill {
            player.skill = skill;
        }
        Ok(())
    }

    /// Swap an on-court player with a bench player of the same team.
    pub fn substitute(
        &mut self,
        team: &TeamRef,
        player_out: &str,
        player_in: &str,
    ) -> Result<(), RosterError> {
        let pos = self.resolve(team)?;
        let t = self.team_mut(pos);
        let out_index = t
            .players
            .iter()
            .position(|p| p.id == player_out)
            .ok_or_else(|| not_found(player_out))?;
        let in_index = t
            .bench
            .iter()
            .position(|p| p.id == player_in)
            .ok_or_else(|| not_found(player_in))?;

        std::mem::swap(&mut t.players[out_index], &mut t.bench[in_index]);
        renumber(&mut t.players);
        renumber(&mut t.bench);
        debug!(team = %t.id, outgoing = player_out, incoming = player_in, "substituted player");
        Ok(())
    }

    /// Swap two on-court positions.
    pub fn swap_positions(&mut self, team: &TeamRef, a: usize, b: usize) -> Result<(), RosterError> {
        let pos = self.resolve(team)?;
        let players = &mut self.team_mut(pos).players;
        let len = players.len();
        for index in [a, b] {
            if index >= len {
                return Err(RosterError::InvalidIndex { index, len });
            }
        }
        players.swap(a, b);
        renumber(players);
        Ok(())
    }

    pub fn rotate_lineup(&mut self, side: Side, direction: RotationDirection) {
        self.court_mut(side).rotate_lineup(direction);
    }

    // ------------------------------------------------------------------
    // Team operations
    // ------------------------------------------------------------------

    pub fn toggle_bench(&mut self, team: &TeamRef) -> Result<bool, RosterError> {
        let pos = self.resolve(team)?;
        let t = self.team_mut(pos);
        t.bench_active = !t.bench_active;
        Ok(t.bench_active)
    }

    pub fn rename_team(&mut self, team: &TeamRef, name: &str) -> Result<(), RosterError> {
        let pos = self.resolve(team)?;
        let name = sanitize_name(name);
        if !name.is_empty() {
            self.team_mut(pos).name = name;
        }
        Ok(())
    }

    pub fn recolor_team(&mut self, team: &TeamRef, color: &str) -> Result<(), RosterError> {
        let pos = self.resolve(team)?;
        self.team_mut(pos).color = color.trim().to_string();
        Ok(())
    }

    pub fn set_team_logo(&mut self, team: &TeamRef, logo: Option<String>) -> Result<(), RosterError> {
        let pos = self.resolve(team)?;
        self.team_mut(pos).logo = logo;
        Ok(())
    }

    /// Move the queue team at `from` to position `to`.
    pub fn reorder_queue(&mut self, from: usize, to: usize) -> Result<(), RosterError> {
        let len = self.queue.len();
        for index in [from, to] {
            if index >= len {
                return Err(RosterError::InvalidIndex { index, len });
            }
        }
        let team = self.queue.remove(from);
        self.queue.insert(to, team);
        Ok(())
    }

    /// Remove a waiting team with all its players.
    pub fn disband_team(&mut self, team_id: &str) -> Result<DisbandedTeam, RosterError> {
        let index = self
            .queue
            .iter()
            .position(|t| t.id == team_id)
            .ok_or_else(|| RosterError::TeamNotFound {
                team: team_id.to_string(),
            })?;
        let team = self.queue.remove(index);
        info!(team = team_id, players = team.size(), "disbanded team");
        Ok(DisbandedTeam { team, index })
    }

    pub fn restore_team(&mut self, record: &DisbandedTeam) -> Result<(), RosterError> {
        if self.teams().any(|t| t.id == record.team.id) {
            return Err(RosterError::DuplicateTeamId {
                team_id: record.team.id.clone(),
            });
        }
        let mut team = record.team.clone();
        for player in team.players.iter_mut().chain(team.bench.iter_mut()) {
            player.normalize();
            self.ensure_unique(player)?;
        }
        let index = record.index.min(self.queue.len());
        self.queue.insert(index, team);
        Ok(())
    }

    /// Drop delete records older than `before`, returning how many went.
    pub fn expire_deleted(&mut self, before: DateTime<Utc>) -> usize {
        let count = self.deleted.len();
        self.deleted.retain(|r| r.deleted_at >= before);
        count - self.deleted.len()
    }

    /// Empty both courts and the queue. Team identities on court survive.
    pub fn clear(&mut self) {
        for side in [Side::A, Side::B] {
            let team = self.court_mut(side);
            team.players.clear();
            team.bench.clear();
        }
        self.queue.clear();
    }

    // ------------------------------------------------------------------
    // Allocation and rotation
    // ------------------------------------------------------------------

    /// Reallocate every on-court and queue player, plus benches when
    /// `include_bench` is set (those benches are emptied into the pool).
    pub fn redistribute(&mut self, capacity: usize, strategy: RotationStrategy, include_bench: bool) {
        let structure: Vec<&Team> = self.teams().collect();
        let mut players = Vec::new();
        for team in &structure {
            players.extend(team.players.iter().cloned());
            if include_bench {
                players.extend(team.bench.iter().cloned());
            }
        }

        let buckets = allocate(strategy, &players, &structure, capacity);
        let identities: BTreeMap<usize, TeamIdentity> = structure
            .iter()
            .enumerate()
            .map(|(index, team)| {
                let mut identity = team.identity();
                if include_bench {
                    identity.bench.clear();
                }
                (index, identity)
            })
            .collect();

        self.rebuild(buckets, identities);
        info!(
            capacity,
            strategy = strategy.as_str(),
            include_bench,
            players = self.player_count(),
            queue = self.queue.len(),
            "redistributed roster"
        );
    }

    /// Replace the whole pool with `players`.
    pub fn generate(
        &mut self,
        players: Vec<Player>,
        strategy: RotationStrategy,
        capacity: usize,
    ) -> Result<(), RosterError> {
        let players: Vec<Player> = players
            .into_iter()
            .map(|mut player| {
                player.normalize();
                player
            })
            .collect();
        let mut ids = HashSet::new();
        let mut numbers: BTreeMap<&str, &Player> = BTreeMap::new();
        for player in &players {
            if !ids.insert(player.id.as_str()) {
                return Err(RosterError::DuplicatePlayerId {
                    player_id: player.id.clone(),
                });
            }
            if let Some(number) = player.number.as_deref() {
                if let Some(conflict) = numbers.insert(number, player) {
                    return Err(duplicate_number(number, conflict));
                }
            }
        }

        self.clear();
        let buckets = allocate(strategy, &players, &[], capacity);
        let identities = BTreeMap::from([
            (0, self.court_a.identity()),
            (1, self.court_b.identity()),
        ]);
        self.rebuild(buckets, identities);
        info!(players = players.len(), strategy = strategy.as_str(), "generated teams");
        Ok(())
    }

    /// Rotation that would follow a win by `winner`, if anyone is waiting.
    pub fn preview_rotation(
        &self,
        winner: Side,
        capacity: usize,
        strategy: RotationStrategy,
    ) -> Option<RotationReport> {
        if self.queue.is_empty() {
            return None;
        }
        Some(rotate(
            self.court(winner),
            self.court(winner.other()),
            &self.queue,
            capacity,
            strategy,
        ))
    }

    /// Install a computed rotation: the loser's court gets the incoming team.
    pub fn apply_rotation(&mut self, winner: Side, report: &RotationReport) {
        *self.court_mut(winner.other()) = report.incoming.clone();
        self.queue = report.queue_after.clone();
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn rebuild(&mut self, buckets: Buckets, mut identities: BTreeMap<usize, TeamIdentity>) {
        let mut name_seq = self.highest_team_number();
        let mut teams = Vec::with_capacity(buckets.len());
        for (index, bucket) in buckets.into_iter().enumerate() {
            let identity = match identities.remove(&index) {
                Some(identity) => identity,
                None => {
                    name_seq += 1;
                    TeamIdentity::fresh(self.allocate_team_id(), format!("Team {}", name_seq))
                }
            };
            teams.push(identity.into_team(bucket));
        }

        let mut teams = teams.into_iter();
        if let Some(team) = teams.next() {
            self.court_a = team;
        }
        if let Some(team) = teams.next() {
            self.court_b = team;
        }
        self.queue = teams.filter(|t| !t.is_empty()).collect();
    }

    fn resolve(&self, team: &TeamRef) -> Result<TeamPos, RosterError> {
        match team {
            TeamRef::Side(side) => Ok(TeamPos::Court(*side)),
            TeamRef::Id(id) if *id == self.court_a.id => Ok(TeamPos::Court(Side::A)),
            TeamRef::Id(id) if *id == self.court_b.id => Ok(TeamPos::Court(Side::B)),
            TeamRef::Id(id) => self
                .queue
                .iter()
                .position(|t| t.id == *id)
                .map(TeamPos::Queue)
                .ok_or_else(|| RosterError::TeamNotFound { team: id.clone() }),
        }
    }

    fn team(&self, pos: TeamPos) -> &Team {
        match pos {
            TeamPos::Court(side) => self.court(side),
            TeamPos::Queue(index) => &self.queue[index],
        }
    }

    fn team_mut(&mut self, pos: TeamPos) -> &mut Team {
        match pos {
            TeamPos::Court(side) => self.court_mut(side),
            TeamPos::Queue(index) => &mut self.queue[index],
        }
    }

    fn positions(&self) -> impl Iterator<Item = TeamPos> {
        [TeamPos::Court(Side::A), TeamPos::Court(Side::B)]
            .into_iter()
            .chain((0..self.queue.len()).map(TeamPos::Queue))
    }

    fn locate(&self, player_id: &str) -> Option<Location> {
        self.positions().find_map(|pos| {
            let team = self.team(pos);
            if let Some(index) = team.players.iter().position(|p| p.id == player_id) {
                return Some(Location { team: pos, bench: false, index });
            }
            team.bench
                .iter()
                .position(|p| p.id == player_id)
                .map(|index| Location { team: pos, bench: true, index })
        })
    }

    fn slot_matches(&self, slot: &Slot, location: Location) -> Result<bool, RosterError> {
        Ok(match slot {
            Slot::Court(team) => self.resolve(team)? == location.team && !location.bench,
            Slot::Bench(team) => self.resolve(team)? == location.team && location.bench,
            Slot::Queue => matches!(location.team, TeamPos::Queue(_)),
        })
    }

    fn player_mut(&mut self, player_id: &str) -> Option<&mut Player> {
        let location = self.locate(player_id)?;
        let team = self.team_mut(location.team);
        let list = if location.bench {
            &mut team.bench
        } else {
            &mut team.players
        };
        list.get_mut(location.index)
    }

    fn extract(&mut self, player_id: &str) -> Option<(Player, Location)> {
        let location = self.locate(player_id)?;
        Some(self.extract_at(location))
    }

    fn extract_at(&mut self, location: Location) -> (Player, Location) {
        let team = self.team_mut(location.team);
        let list = if location.bench {
            &mut team.bench
        } else {
            &mut team.players
        };
        let player = list.remove(location.index);
        renumber(list);
        (player, location)
    }

    fn insert(&mut self, pos: TeamPos, bench: bool, player: Player, index: Option<usize>) {
        let team = self.team_mut(pos);
        let list = if bench {
            &mut team.bench
        } else {
            &mut team.players
        };
        let at = index.map_or(list.len(), |i| i.min(list.len()));
        list.insert(at, player);
        renumber(list);
    }

    /// Court lineup if it has room, else an active bench with room.
    fn place_on_court(
        &mut self,
        pos: TeamPos,
        player: Player,
        index: Option<usize>,
        limits: RosterLimits,
    ) -> Result<Placement, RosterError> {
        let team = self.team(pos);
        let team_id = team.id.clone();
        if team.players.len() < limits.court {
            self.insert(pos, false, player, index);
            Ok(Placement::OnCourt { team_id })
        } else if team.bench_active && team.bench.len() < limits.bench {
            self.insert(pos, true, player, None);
            Ok(Placement::Benched { team_id })
        } else {
            Err(self.capacity_error(pos, "court"))
        }
    }

    fn queue_fallback(&mut self, player: Player, limits: RosterLimits) -> Placement {
        Placement::Queued {
            team_id: self.push_to_queue_tail(player, limits.court),
        }
    }

    /// Append to the last queue team, opening a new team when it is full.
    fn push_to_queue_tail(&mut self, player: Player, court_limit: usize) -> String {
        if let Some(last) = self.queue.last_mut() {
            if last.players.len() < court_limit {
                last.players.push(player);
                renumber(&mut last.players);
                return last.id.clone();
            }
        }
        let name = format!("Team {}", self.highest_team_number() + 1);
        let team = Team::new(self.allocate_team_id(), &name).with_players(vec![player]);
        let id = team.id.clone();
        debug!(team = %id, "opened queue team");
        self.queue.push(team);
        id
    }

    fn dissolve_empty_queue_teams(&mut self) -> usize {
        let before = self.queue.len();
        self.queue.retain(|t| !t.is_empty());
        let dissolved = before - self.queue.len();
        if dissolved > 0 {
            debug!(dissolved, "dissolved empty queue teams");
        }
        dissolved
    }

    fn ensure_unique(&self, player: &Player) -> Result<(), RosterError> {
        if self.find_player(&player.id).is_some() {
            return Err(RosterError::DuplicatePlayerId {
                player_id: player.id.clone(),
            });
        }
        if let Some(number) = player.number.as_deref() {
            if let Some(conflict) = self.number_conflict(number, Some(&player.id)) {
                return Err(duplicate_number(number, conflict));
            }
        }
        Ok(())
    }

    fn capacity_error(&self, pos: TeamPos, slot: &str) -> RosterError {
        RosterError::CapacityExceeded {
            team_id: self.team(pos).id.clone(),
            slot: slot.to_string(),
        }
    }

    /// Highest `N` among team names of the form `Team N`.
    fn highest_team_number(&self) -> u32 {
        self.teams()
            .filter_map(|t| {
                let mut words = t.name.split_whitespace();
                match (words.next(), words.next()) {
                    (Some(word), Some(n)) if word.eq_ignore_ascii_case("team") => n.parse().ok(),
                    _ => None,
                }
            })
            .max()
            .unwrap_or(0)
    }

    fn allocate_team_id(&mut self) -> String {
        loop {
            let id = format!("team-{}", self.next_team_seq);
            self.next_team_seq += 1;
            if !self.teams().any(|t| t.id == id) {
                return id;
            }
        }
    }
}

fn allocate(
    strategy: RotationStrategy,
    players: &[Player],
    previous: &[&Team],
    capacity: usize,
) -> Buckets {
    match strategy {
        RotationStrategy::Standard => distribute_standard(players, previous, capacity),
        RotationStrategy::Balanced => balance_snake_draft(players, previous, capacity),
    }
}

fn not_found(player_id: &str) -> RosterError {
    RosterError::PlayerNotFound {
        player_id: player_id.to_string(),
    }
}

fn duplicate_number(number: &str, conflict: &Player) -> RosterError {
    RosterError::DuplicateNumber {
        number: number.to_string(),
        conflict_id: conflict.id.clone(),
        conflict_name: conflict.name.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    const LIMITS: RosterLimits = RosterLimits { court: 2, bench: 1 };

    fn p(id: &str, index: u32) -> Player {
        Player::new(id, &id.to_uppercase(), index)
    }

    fn roster() -> Roster {
        Roster::new()
            .with_courts(
                Team::new("a", "Alpha").with_players(vec![p("a1", 0), p("a2", 1)]),
                Team::new("b", "Bravo").with_players(vec![p("b1", 2), p("b2", 3)]),
            )
            .with_queue(vec![Team::new("q", "Team 1").with_players(vec![p("q1", 4)])])
    }

    fn ids(players: &[Player]) -> Vec<&str> {
        players.iter().map(|p| p.id.as_str()).collect()
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_add_to_full_court_without_bench_is_rejected() {
        let mut r = roster();
        let before = r.clone();
        let err = r
            .add_player(p("x", 9), &Slot::Court(Side::A.into()), LIMITS)
            .unwrap_err();

        assert!(matches!(err, RosterError::CapacityExceeded { ref team_id, .. } if team_id == "a"));
        assert_eq!(r, before);
    }

    #[test]
    fn test_add_falls_back_to_active_bench() {
        let mut r = roster();
        r.toggle_bench(&Side::A.into()).unwrap();
        let placement = r
            .add_player(p("x", 9), &Slot::Court(Side::A.into()), LIMITS)
            .unwrap();

        assert_eq!(placement, Placement::Benched { team_id: "a".into() });
        assert_eq!(ids(&r.court_a.bench), vec!["x"]);
    }

    #[test]
    fn test_add_rejects_duplicate_number_anywhere() {
        let mut r = roster();
        r.queue[0].players[0].number = Some("7".into());
        let before = r.clone();

        let err = r
            .add_player(p("x", 9).with_number("7"), &Slot::Queue, LIMITS)
            .unwrap_err();

        assert_eq!(
            err,
            RosterError::DuplicateNumber {
                number: "7".into(),
                conflict_id: "q1".into(),
                conflict_name: "Q1".into(),
            }
        );
        assert_eq!(r, before);
    }

    #[test]
    fn test_add_to_queue_opens_new_team_when_tail_is_full() {
        let mut r = roster();
        r.add_player(p("x", 9), &Slot::Queue, LIMITS).unwrap();
        assert_eq!(r.queue.len(), 1);

        let placement = r.add_player(p("y", 10), &Slot::Queue, LIMITS).unwrap();
        assert_eq!(r.queue.len(), 2);
        assert_eq!(r.queue[1].name, "Team 2");
        assert_eq!(placement.team_id(), r.queue[1].id);
    }

    #[test]
    fn test_remove_moves_player_to_queue_tail() {
        let mut r = roster();
        r.remove_player("a1", LIMITS).unwrap();

        assert_eq!(ids(&r.court_a.players), vec!["a2"]);
        assert_eq!(ids(&r.queue[0].players), vec!["q1", "a1"]);
        assert_eq!(r.player_count(), 5);
    }

    #[test]
    fn test_delete_and_restore() {
        let mut r = roster();
        let record = r.delete_player("a1", at(100)).unwrap();

        assert_eq!(record.origin, Slot::Court(TeamRef::Id("a".into())));
        assert_eq!(record.index, 0);
        assert_eq!(r.deleted.len(), 1);
        assert_eq!(r.player_count(), 4);

        let placement = r.restore_player(&record, LIMITS).unwrap();
        assert_eq!(placement, Placement::OnCourt { team_id: "a".into() });
        assert_eq!(ids(&r.court_a.players), vec!["a1", "a2"]);
        assert!(r.deleted.is_empty());
    }

    #[test]
    fn test_restore_falls_back_to_queue_when_court_refilled() {
        let mut r = roster();
        let record = r.delete_player("a1", at(100)).unwrap();
        r.move_player("q1", &Slot::Queue, &Slot::Court(Side::A.into()), None, LIMITS)
            .unwrap();

        let placement = r.restore_player(&record, LIMITS).unwrap();
        assert!(matches!(placement, Placement::Queued { .. }));
        assert_eq!(r.player_count(), 5);
    }

    #[test]
    fn test_deleting_last_queue_player_dissolves_team() {
        let mut r = roster();
        r.delete_player("q1", at(1)).unwrap();
        assert!(r.queue.is_empty());
    }

    #[test]
    fn test_expire_deleted() {
        let mut r = roster();
        r.delete_player("a1", at(10)).unwrap();
        r.delete_player("b1", at(50)).unwrap();

        assert_eq!(r.expire_deleted(at(20)), 1);
        assert_eq!(r.deleted[0].player.id, "b1");
    }

    #[test]
    fn test_move_into_full_court_needs_bench_activation() {
        let mut r = roster();
        let before = r.clone();
        let outcome = r
            .move_player("q1", &Slot::Queue, &Slot::Court(Side::B.into()), Some(0), LIMITS)
            .unwrap();

        assert_eq!(outcome, MoveOutcome::NeedsBenchActivation { team_id: "b".into() });
        assert_eq!(r, before);
    }

    #[test]
    fn test_move_into_full_court_auto_benches_last_player() {
        let mut r = roster();
        r.toggle_bench(&TeamRef::Id("b".into())).unwrap();
        let outcome = r
            .move_player("q1", &Slot::Queue, &Slot::Court(Side::B.into()), Some(0), LIMITS)
            .unwrap();

        assert_eq!(
            outcome,
            MoveOutcome::AutoBenched {
                team_id: "b".into(),
                player_id: "b2".into()
            }
        );
        assert_eq!(ids(&r.court_b.players), vec!["q1", "b1"]);
        assert_eq!(ids(&r.court_b.bench), vec!["b2"]);
        assert!(r.queue.is_empty());
        assert_eq!(r.player_count(), 5);
    }

    #[test]
    fn test_move_within_same_court_reorders() {
        let mut r = roster();
        r.move_player("a2", &Slot::Court(Side::A.into()), &Slot::Court(Side::A.into()), Some(0), LIMITS)
            .unwrap();

        assert_eq!(ids(&r.court_a.players), vec!["a2", "a1"]);
        assert_eq!(r.court_a.players[0].display_order, 0);
    }

    #[test]
    fn test_move_from_wrong_slot_is_rejected() {
        let mut r = roster();
        let err = r
            .move_player("a1", &Slot::Court(Side::B.into()), &Slot::Queue, None, LIMITS)
            .unwrap_err();
        assert_eq!(err, RosterError::PlayerNotFound { player_id: "a1".into() });
    }

    #[test]
    fn test_substitute_swaps_by_id() {
        let mut r = roster();
        r.court_a.bench = vec![p("s1", 8)];
        r.substitute(&Side::A.into(), "a2", "s1").unwrap();

        assert_eq!(ids(&r.court_a.players), vec!["a1", "s1"]);
        assert_eq!(ids(&r.court_a.bench), vec!["a2"]);
    }

    #[test]
    fn test_update_player_number_conflict() {
        let mut r = roster();
        r.update_player("a1", &PlayerUpdate { number: Some("4".into()), ..Default::default() })
            .unwrap();
        let err = r
            .update_player("b1", &PlayerUpdate { number: Some(" 4 ".into()), ..Default::default() })
            .unwrap_err();
        assert!(matches!(err, RosterError::DuplicateNumber { ref conflict_id, .. } if conflict_id == "a1"));

        r.update_player("a1", &PlayerUpdate { number: Some(String::new()), ..Default::default() })
            .unwrap();
        assert_eq!(r.find_player("a1").unwrap().number, None);
    }

    #[test]
    fn test_disband_and_restore_team() {
        let mut r = roster();
        let record = r.disband_team("q").unwrap();
        assert!(r.queue.is_empty());

        r.restore_team(&record).unwrap();
        assert_eq!(r.queue[0].id, "q");

        let err = r.restore_team(&record).unwrap_err();
        assert_eq!(err, RosterError::DuplicateTeamId { team_id: "q".into() });
    }

    #[test]
    fn test_reorder_queue_bounds() {
        let mut r = roster();
        assert_eq!(
            r.reorder_queue(0, 3),
            Err(RosterError::InvalidIndex { index: 3, len: 1 })
        );
    }

    #[test]
    fn test_redistribute_keeps_identities() {
        let mut r = roster();
        r.court_a.color = "red".into();
        r.redistribute(3, RotationStrategy::Standard, true);

        assert_eq!(r.court_a.color, "red");
        assert_eq!(ids(&r.court_a.players), vec!["a1", "a2", "b1"]);
        assert_eq!(ids(&r.court_b.players), vec!["b2", "q1"]);
        assert!(r.queue.is_empty());
    }

    #[test]
    fn test_generate_rejects_duplicate_ids() {
        let mut r = roster();
        let err = r
            .generate(vec![p("x", 0), p("x", 1)], RotationStrategy::Standard, 2)
            .unwrap_err();
        assert_eq!(err, RosterError::DuplicatePlayerId { player_id: "x".into() });
    }

    #[test]
    fn test_add_normalizes_unbuilt_player() {
        let mut r = roster();
        let mut x1 = p("x1", 9);
        x1.name = "  Ana<> ".into();
        x1.number = Some(" 7".into());
        r.add_player(x1, &Slot::Queue, LIMITS).unwrap();

        let stored = r.find_player("x1").unwrap();
        assert_eq!(stored.name, "Ana");
        assert_eq!(stored.number.as_deref(), Some("7"));

        let mut x2 = p("x2", 10);
        x2.number = Some("7 ".into());
        let err = r.add_player(x2, &Slot::Queue, LIMITS).unwrap_err();
        assert!(matches!(err, RosterError::DuplicateNumber { ref conflict_id, .. } if conflict_id == "x1"));
    }

    #[test]
    fn test_generate_compares_trimmed_numbers() {
        let mut r = roster();
        let mut g0 = p("g0", 0);
        g0.number = Some(" 7".into());
        let mut g1 = p("g1", 1);
        g1.number = Some("7".into());

        let err = r
            .generate(vec![g0, g1], RotationStrategy::Standard, 2)
            .unwrap_err();
        assert!(matches!(err, RosterError::DuplicateNumber { ref number, .. } if number == "7"));
    }

    #[test]
    fn test_generate_builds_queue() {
        let mut r = roster();
        let players = (0..5).map(|i| p(&format!("g{}", i), i)).collect();
        r.generate(players, RotationStrategy::Standard, 2).unwrap();

        assert_eq!(r.court_a.id, "a");
        assert_eq!(ids(&r.court_a.players), vec!["g0", "g1"]);
        assert_eq!(r.queue.len(), 1);
        assert_eq!(ids(&r.queue[0].players), vec!["g4"]);
        assert_eq!(r.player_count(), 5);
    }
}
