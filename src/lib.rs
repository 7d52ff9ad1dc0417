//! Volley State Library
//!
//! This crate provides match scoring and court rotation state for pickup
//! volleyball.
//!
//! # Overview
//!
//! The state module provides:
//!
//! - **Score State Machine** - Points, sets, serve, timeouts, deuce and sudden
//!   death, with serve rotation on side-out and two-tier undo.
//!
//! - **Roster Mutation Engine** - Add, remove, delete/restore and move players
//!   between courts, benches and the waiting queue.
//!
//! - **Allocation** - Order-preserving distribution and a skill-balancing snake
//!   draft, both respecting pinned players.
//!
//! - **Rotation** - After a match the loser queues up and the next team comes
//!   on, topped up with players taken from the teams behind it.
//!
//! # Design Principles
//!
//! 1. **Pure transitions** - A session changes only through [`Action`]s. No
//!    clock, no randomness, so replaying a stream gives identical state.
//!
//! 2. **Diagnostics are values** - Illegal transitions are no-ops and roster
//!    conflicts come back as [`RosterError`] inside an [`ActionOutcome`].
//!
//! 3. **One slot per player** - Every player ID lives in exactly one court
//!    lineup, bench or queue team.
//!
//! 4. **Serialization-ready** - A [`MatchSession`] round-trips through JSON.
//!
//! # Example
//!
//! ```rust
//! use volley_state::{Action, ActionOutcome, MatchConfig, MatchSession, Player, Side, Slot};
//!
//! let mut session = MatchSession::new(MatchConfig::beach());
//!
//! for (i, side) in [Side::A, Side::A, Side::B, Side::B].into_iter().enumerate() {
//!     let outcome = session.apply_mut(Action::AddPlayer {
//!         player: Player::new(format!("p{}", i), "Player", i as u32),
//!         target: Slot::Court(side.into()),
//!     });
//!     assert!(outcome.is_applied());
//! }
//!
//! session.apply_mut(Action::Point { team: Side::A, metadata: None });
//! assert_eq!(session.state.score_a, 1);
//!
//! assert!(matches!(session.apply_mut(Action::Undo), ActionOutcome::Undone(_)));
//! assert_eq!(session.state.score_a, 0);
//! ```

pub mod state;

// Re-export everything from state module at crate root
pub use state::*;
