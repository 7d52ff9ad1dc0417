//! Teams, court sides and roster slot addressing.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::player::{average_skill, sanitize_name, total_skill, Player};

/// Color tag given to teams created without one.
pub const DEFAULT_TEAM_COLOR: &str = "slate";

/// One of the two sides of the court.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    A,
    B,
}

impl Side {
    pub fn other(&self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a lineup rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationDirection {
    /// Last position moves to the front (serve rotation).
    Clockwise,
    CounterClockwise,
}

impl RotationDirection {
    pub fn reversed(&self) -> Self {
        match self {
            Self::Clockwise => Self::CounterClockwise,
            Self::CounterClockwise => Self::Clockwise,
        }
    }
}

/// Reference to a team, either by court side or by ID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamRef {
    Side(Side),
    Id(String),
}

impl From<Side> for TeamRef {
    fn from(side: Side) -> Self {
        Self::Side(side)
    }
}

impl fmt::Display for TeamRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Side(side) => write!(f, "court {}", side),
            Self::Id(id) => f.write_str(id),
        }
    }
}

/// A roster slot a player can occupy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    /// A team's on-court list.
    Court(TeamRef),
    /// A team's bench.
    Bench(TeamRef),
    /// The back of the waiting queue.
    Queue,
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Court(team) => write!(f, "{} court", team),
            Self::Bench(team) => write!(f, "{} bench", team),
            Self::Queue => f.write_str("queue"),
        }
    }
}

/// A team: on-court lineup plus bench.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub logo: Option<String>,
    /// On-court lineup, index 0 serves
    pub players: Vec<Player>,
    #[serde(default)]
    pub bench: Vec<Player>,
    /// Whether overflow additions may land on the bench
    #[serde(default)]
    pub bench_active: bool,
}

impl Team {
    pub fn new(id: impl Into<String>, name: &str) -> Self {
        Self {
            id: id.into(),
            name: sanitize_name(name),
            color: DEFAULT_TEAM_COLOR.to_string(),
            logo: None,
            players: Vec::new(),
            bench: Vec::new(),
            bench_active: false,
        }
    }

    pub fn with_players(mut self, players: Vec<Player>) -> Self {
        self.players = players;
        renumber(&mut self.players);
        self
    }

    pub fn with_bench(mut self, bench: Vec<Player>) -> Self {
        self.bench = bench;
        self.bench_active = true;
        renumber(&mut self.bench);
        self
    }

    pub fn with_color(mut self, color: &str) -> Self {
        self.color = color.to_string();
        self
    }

    /// On-court plus bench count.
    pub fn size(&self) -> usize {
        self.players.len() + self.bench.len()
    }

    /// No players on court or bench.
    pub fn is_empty(&self) -> bool {
        self.players.is_empty() && self.bench.is_empty()
    }

    pub fn contains(&self, player_id: &str) -> bool {
        self.all_players().any(|p| p.id == player_id)
    }

    /// On-court players followed by the bench.
    pub fn all_players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().chain(self.bench.iter())
    }

    pub fn total_skill(&self) -> u32 {
        total_skill(&self.players)
    }

    pub fn average_skill(&self) -> f64 {
        average_skill(&self.players)
    }

    /// Rotate the on-court lineup one position.
    pub fn rotate_lineup(&mut self, direction: RotationDirection) {
        if self.players.len() < 2 {
            return;
        }
        match direction {
            RotationDirection::Clockwise => self.players.rotate_right(1),
            RotationDirection::CounterClockwise => self.players.rotate_left(1),
        }
        renumber(&mut self.players);
    }

    /// Identity carried over when the team is rebuilt from an allocation.
    pub fn identity(&self) -> TeamIdentity {
        TeamIdentity {
            id: self.id.clone(),
            name: self.name.clone(),
            color: self.color.clone(),
            logo: self.logo.clone(),
            bench: self.bench.clone(),
            bench_active: self.bench_active,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "name": self.name,
            "color": self.color,
            "logo": self.logo,
            "players": self.players.iter().map(|p| p.to_json()).collect::<Vec<_>>(),
            "bench": self.bench.iter().map(|p| p.to_json()).collect::<Vec<_>>(),
            "bench_active": self.bench_active
        })
    }
}

/// Everything about a team except its on-court lineup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamIdentity {
    pub id: String,
    pub name: String,
    pub color: String,
    pub logo: Option<String>,
    pub bench: Vec<Player>,
    pub bench_active: bool,
}

impl TeamIdentity {
    pub fn fresh(id: String, name: String) -> Self {
        Self {
            id,
            name,
            color: DEFAULT_TEAM_COLOR.to_string(),
            logo: None,
            bench: Vec::new(),
            bench_active: false,
        }
    }

    pub fn into_team(self, players: Vec<Player>) -> Team {
        let mut team = Team {
            id: self.id,
            name: self.name,
            color: self.color,
            logo: self.logo,
            players,
            bench: self.bench,
            bench_active: self.bench_active,
        };
        renumber(&mut team.players);
        team
    }
}

/// Recompute `display_order` from list position.
pub fn renumber(list: &mut [Player]) {
    for (index, player) in list.iter_mut().enumerate() {
        player.display_order = index as u32;
    }
}
