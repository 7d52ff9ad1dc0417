//! Roster allocation: partition a flat player pool into team buckets.
//!
//! Both algorithms anchor pinned players to the bucket of the team they sat
//! in before (by position in `previous`: court A, court B, then the queue)
//! and never drop a player. Bucket `i` of the result is meant to be rebuilt
//! into the team at position `i` of `previous` when one exists.

use std::collections::HashSet;

use tracing::debug;

use super::player::Player;
use super::team::Team;

/// Team buckets, index 0 and 1 are the two courts.
pub type Buckets = Vec<Vec<Player>>;

/// Number of buckets an allocation starts with.
///
/// Never fewer than the two courts, never fewer than the previous structure,
/// so existing team identities can be mapped by position.
pub fn bucket_count(players: usize, capacity: usize, previous: usize) -> usize {
    2.max(players.div_ceil(capacity.max(1))).max(previous)
}

/// Order-preserving distribution.
///
/// Non-pinned players are sorted by insertion index and poured into the
/// first bucket that still has room.
pub fn distribute_standard(players: &[Player], previous: &[&Team], capacity: usize) -> Buckets {
    let capacity = capacity.max(1);
    let players = unique_players(players);
    let count = bucket_count(players.len(), capacity, previous.len());
    let (mut buckets, mut pool) = anchor_pinned(&players, previous, count);

    pool.sort_by(|a, b| {
        a.original_index
            .cmp(&b.original_index)
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut cursor = 0;
    for player in pool {
        while cursor < buckets.len() && buckets[cursor].len() >= capacity {
            cursor += 1;
        }
        if cursor == buckets.len() {
            buckets.push(Vec::new());
        }
        buckets[cursor].push(player);
    }

    debug!(
        players = players.len(),
        capacity,
        buckets = buckets.len(),
        "distributed players in standard order"
    );
    buckets
}

/// Skill-balancing snake draft.
///
/// The pool is sorted by descending skill and each player joins the eligible
/// bucket with the lowest skill sum. Full teams (the first `n / capacity`
/// buckets) are eligible until they are full; after that the leftover
/// buckets up to `ceil(n / capacity)` take the remainder.
pub fn balance_snake_draft(players: &[Player], previous: &[&Team], capacity: usize) -> Buckets {
    let capacity = capacity.max(1);
    let players = unique_players(players);
    let total = players.len();
    let full_teams = total / capacity;
    let teams_needed = total.div_ceil(capacity);
    let count = bucket_count(total, capacity, previous.len());
    let (mut buckets, mut pool) = anchor_pinned(&players, previous, count);

    pool.sort_by(|a, b| {
        b.skill
            .cmp(&a.skill)
            .then_with(|| a.original_index.cmp(&b.original_index))
            .then_with(|| a.id.cmp(&b.id))
    });

    for player in pool {
        let has_room = |buckets: &Buckets, i: usize| buckets[i].len() < capacity;

        let primary: Vec<usize> = (0..full_teams.min(buckets.len()))
            .filter(|&i| has_room(&buckets, i))
            .collect();

        let candidates = if !primary.is_empty() {
            primary
        } else {
            let overflow_end = teams_needed.max(full_teams + 1).min(buckets.len());
            let overflow: Vec<usize> = (full_teams..overflow_end)
                .filter(|&i| has_room(&buckets, i))
                .collect();
            if overflow.is_empty() {
                (0..buckets.len()).filter(|&i| has_room(&buckets, i)).collect()
            } else {
                overflow
            }
        };

        let target = match lowest_sum(&buckets, &candidates) {
            Some(i) => i,
            None => {
                buckets.push(Vec::new());
                buckets.len() - 1
            }
        };
        buckets[target].push(player);
    }

    debug!(
        players = total,
        capacity,
        full_teams,
        buckets = buckets.len(),
        "balanced players with snake draft"
    );
    buckets
}

/// Index of the candidate bucket with the lowest skill sum. Ties go to the
/// lowest index.
fn lowest_sum(buckets: &Buckets, candidates: &[usize]) -> Option<usize> {
    candidates
        .iter()
        .copied()
        .min_by_key(|&i| (buckets[i].iter().map(|p| p.skill).sum::<u32>(), i))
}

/// Split the pool into pinned anchors (placed in their previous bucket) and
/// the free pool. Pinned players not found in `previous` join the free pool.
fn anchor_pinned(players: &[Player], previous: &[&Team], count: usize) -> (Buckets, Vec<Player>) {
    let mut buckets: Buckets = vec![Vec::new(); count];
    let mut pool = Vec::with_capacity(players.len());

    for player in players {
        let home = if player.fixed {
            previous.iter().position(|team| team.contains(&player.id))
        } else {
            None
        };
        match home {
            Some(index) => buckets[index].push(player.clone()),
            None => pool.push(player.clone()),
        }
    }

    (buckets, pool)
}

/// First occurrence of each player ID.
fn unique_players(players: &[Player]) -> Vec<Player> {
    let mut seen = HashSet::new();
    players
        .iter()
        .filter(|p| seen.insert(p.id.as_str()))
        .cloned()
        .collect()
}
