//! Post-match rotation.
//!
//! The losing team joins the back of the queue and the front team comes on
//! court, topped up to capacity with players taken from the teams behind it.
//! Pinned players are never taken. When the queue runs dry the incoming team
//! plays short-handed and the report says so.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::config::RotationStrategy;
use super::player::{average_skill, total_skill, Player};
use super::team::{renumber, Team};

/// A player taken from a waiting team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StolenPlayer {
    pub player: Player,
    pub from_team_id: String,
    pub from_team_name: String,
}

/// What a rotation changes, for "what changed" messaging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotationReport {
    pub strategy: RotationStrategy,
    /// Losing team as it left the court
    pub outgoing: Team,
    /// New on-court team
    pub incoming: Team,
    /// Pinned players the incoming team already had
    pub retained: Vec<Player>,
    pub stolen: Vec<StolenPlayer>,
    pub queue_after: Vec<Team>,
    /// Open on-court places left after stealing
    pub short_by: usize,
    pub notes: Vec<String>,
}

impl RotationReport {
    pub fn is_short_handed(&self) -> bool {
        self.short_by > 0
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "strategy": self.strategy.as_str(),
            "outgoing": self.outgoing.id,
            "incoming": self.incoming.to_json(),
            "retained": self.retained.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(),
            "stolen": self.stolen.iter().map(|s| serde_json::json!({
                "player": s.player.id,
                "from": s.from_team_id,
            })).collect::<Vec<_>>(),
            "queue_after": self.queue_after.iter().map(|t| t.id.as_str()).collect::<Vec<_>>(),
            "short_by": self.short_by,
            "notes": self.notes,
        })
    }
}

/// Compute the next on-court team and queue. Pure: inputs are not touched.
pub fn rotate(
    winner: &Team,
    loser: &Team,
    queue: &[Team],
    capacity: usize,
    strategy: RotationStrategy,
) -> RotationReport {
    let mut notes = vec![format!(
        "{} rotation, {} per side",
        strategy.as_str(),
        capacity
    )];

    let mut queue: Vec<Team> = queue.to_vec();
    queue.push(loser.clone());
    let mut incoming = queue.remove(0);
    let retained: Vec<Player> = incoming.players.iter().filter(|p| p.fixed).cloned().collect();

    let needed = capacity.saturating_sub(incoming.players.len());
    let stolen = if needed == 0 {
        Vec::new()
    } else {
        match strategy {
            RotationStrategy::Standard => steal_bottom_up(&mut incoming, &mut queue, needed),
            RotationStrategy::Balanced => {
                steal_balanced(&mut incoming, &mut queue, needed, average_skill(&winner.players))
            }
        }
    };

    for s in &stolen {
        notes.push(format!("took {} from {}", s.player.name, s.from_team_name));
    }

    let before = queue.len();
    queue.retain(|team| !team.is_empty());
    if queue.len() < before {
        notes.push(format!("dissolved {} empty team(s)", before - queue.len()));
    }
    renumber(&mut incoming.players);

    let short_by = capacity.saturating_sub(incoming.players.len());
    if short_by > 0 {
        warn!(
            team = %incoming.id,
            short_by,
            "incoming team plays short-handed"
        );
        notes.push(format!("{} plays {} short", incoming.name, short_by));
    }

    info!(
        outgoing = %loser.id,
        incoming = %incoming.id,
        stolen = stolen.len(),
        queue = queue.len(),
        "computed rotation"
    );

    RotationReport {
        strategy,
        outgoing: loser.clone(),
        incoming,
        retained,
        stolen,
        queue_after: queue,
        short_by,
        notes,
    }
}

/// Walk donors front to back, taking each donor's last non-pinned player.
fn steal_bottom_up(incoming: &mut Team, queue: &mut [Team], mut needed: usize) -> Vec<StolenPlayer> {
    let mut stolen = Vec::new();
    for donor in queue.iter_mut() {
        while needed > 0 {
            let Some(index) = donor.players.iter().rposition(|p| !p.fixed) else {
                break;
            };
            let player = donor.players.remove(index);
            debug!(player = %player.id, donor = %donor.id, "stole player bottom-up");
            incoming.players.push(player.clone());
            stolen.push(StolenPlayer {
                player,
                from_team_id: donor.id.clone(),
                from_team_name: donor.name.clone(),
            });
            needed -= 1;
        }
        renumber(&mut donor.players);
        if needed == 0 {
            break;
        }
    }
    stolen
}

/// Take the non-pinned queue players whose addition lands the incoming
/// average closest to the winner's average. Deviation is measured against
/// the incoming team as it arrived; ties keep queue order.
fn steal_balanced(
    incoming: &mut Team,
    queue: &mut [Team],
    needed: usize,
    target: f64,
) -> Vec<StolenPlayer> {
    let base_total = f64::from(total_skill(&incoming.players));
    let base_len = incoming.players.len() as f64;

    let mut candidates: Vec<(usize, String, f64)> = queue
        .iter()
        .enumerate()
        .flat_map(|(team_index, team)| {
            team.players
                .iter()
                .filter(|p| !p.fixed)
                .map(move |p| {
                    let projected = (base_total + f64::from(p.skill)) / (base_len + 1.0);
                    (team_index, p.id.clone(), (projected - target).abs())
                })
        })
        .collect();
    candidates.sort_by(|a, b| a.2.total_cmp(&b.2));

    let mut stolen = Vec::new();
    for (team_index, player_id, deviation) in candidates.into_iter().take(needed) {
        let donor = &mut queue[team_index];
        let Some(index) = donor.players.iter().position(|p| p.id == player_id) else {
            continue;
        };
        let player = donor.players.remove(index);
        renumber(&mut donor.players);
        debug!(player = %player.id, donor = %donor.id, deviation, "stole player for balance");
        incoming.players.push(player.clone());
        stolen.push(StolenPlayer {
            player,
            from_team_id: donor.id.clone(),
            from_team_name: donor.name.clone(),
        });
    }
    stolen
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn team(id: &str, players: &[(&str, u32)]) -> Team {
        Team::new(id, id).with_players(
            players
                .iter()
                .enumerate()
                .map(|(i, (pid, skill))| Player::new(*pid, pid, i as u32).with_skill(*skill))
                .collect(),
        )
    }

    fn ids(players: &[Player]) -> Vec<&str> {
        players.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn test_full_incoming_team_is_unchanged() {
        let winner = team("w", &[("w1", 5), ("w2", 5)]);
        let loser = team("l", &[("l1", 5), ("l2", 5)]);
        let queue = vec![team("q", &[("q1", 5), ("q2", 5)])];

        let report = rotate(&winner, &loser, &queue, 2, RotationStrategy::Standard);

        assert_eq!(report.incoming.id, "q");
        assert!(report.stolen.is_empty());
        assert_eq!(report.queue_after.len(), 1);
        assert_eq!(report.queue_after[0].id, "l");
        assert!(!report.is_short_handed());
    }

    #[test]
    fn test_standard_steals_from_bottom() {
        let winner = team("w", &[("w1", 5), ("w2", 5), ("w3", 5)]);
        let loser = team("l", &[("l1", 5), ("l2", 5), ("l3", 5)]);
        let queue = vec![
            team("q1", &[("a1", 5)]),
            team("q2", &[("b1", 5), ("b2", 5), ("b3", 5)]),
        ];

        let report = rotate(&winner, &loser, &queue, 3, RotationStrategy::Standard);

        assert_eq!(ids(&report.incoming.players), vec!["a1", "b3", "b2"]);
        assert_eq!(report.stolen[0].from_team_id, "q2");
        let queue_ids: Vec<&str> = report.queue_after.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(queue_ids, vec!["q2", "l"]);
        assert_eq!(ids(&report.queue_after[0].players), vec!["b1"]);
    }

    #[test]
    fn test_pinned_players_are_not_stolen() {
        let winner = team("w", &[("w1", 5), ("w2", 5)]);
        let loser = team("l", &[("l1", 5), ("l2", 5)]);
        let mut donor = team("q2", &[("b1", 5), ("b2", 5)]);
        donor.players[1].fixed = true;
        let queue = vec![team("q1", &[("a1", 5)]), donor];

        let report = rotate(&winner, &loser, &queue, 2, RotationStrategy::Standard);

        assert_eq!(ids(&report.incoming.players), vec!["a1", "b1"]);
        assert_eq!(ids(&report.queue_after[0].players), vec!["b2"]);
    }

    #[test]
    fn test_donor_emptied_is_dissolved() {
        let winner = team("w", &[("w1", 5), ("w2", 5)]);
        let loser = team("l", &[("l1", 5), ("l2", 5)]);
        let queue = vec![team("q1", &[("a1", 5)]), team("q2", &[("b1", 5)])];

        let report = rotate(&winner, &loser, &queue, 2, RotationStrategy::Standard);

        let queue_ids: Vec<&str> = report.queue_after.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(queue_ids, vec!["l"]);
    }

    #[test]
    fn test_short_handed_when_queue_is_exhausted() {
        let winner = team("w", &[("w1", 5), ("w2", 5), ("w3", 5)]);
        let mut loser = team("l", &[("l1", 5), ("l2", 5), ("l3", 5)]);
        for p in &mut loser.players {
            p.fixed = true;
        }
        let queue = vec![team("q1", &[("a1", 5)])];

        let report = rotate(&winner, &loser, &queue, 3, RotationStrategy::Standard);

        assert_eq!(report.short_by, 2);
        assert!(report.is_short_handed());
        assert_eq!(report.queue_after[0].players.len(), 3);
    }

    #[test]
    fn test_balanced_picks_closest_to_winner_average() {
        let winner = team("w", &[("w1", 6), ("w2", 6)]);
        let loser = team("l", &[("l1", 1), ("l2", 9)]);
        let queue = vec![
            team("q1", &[("a1", 6)]),
            team("q2", &[("b1", 2), ("b2", 7), ("b3", 10)]),
        ];

        let report = rotate(&winner, &loser, &queue, 2, RotationStrategy::Balanced);

        assert_eq!(ids(&report.incoming.players), vec!["a1", "b2"]);
        assert_eq!(report.stolen.len(), 1);
        assert_eq!(report.retained.len(), 0);
    }

    #[test]
    fn test_balanced_ties_keep_queue_order() {
        let winner = team("w", &[("w1", 5), ("w2", 5)]);
        let loser = team("l", &[("l1", 5), ("l2", 5)]);
        let queue = vec![team("q1", &[]), team("q2", &[("b1", 5), ("b2", 5)])];

        let report = rotate(&winner, &loser, &queue, 1, RotationStrategy::Balanced);

        assert_eq!(ids(&report.incoming.players), vec!["b1"]);
    }
}
