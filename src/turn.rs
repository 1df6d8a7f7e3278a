//! Player rotation: nobody goes twice until everyone has had a turn.

use crate::types::{Player, PlayerName};
use rand::seq::IndexedRandom;
use rand::Rng;
use std::collections::HashSet;

/// Names already picked in the current rotation cycle
#[derive(Debug, Clone, Default)]
pub struct Rotation {
    used: HashSet<PlayerName>,
}

impl Rotation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn used(&self) -> &HashSet<PlayerName> {
        &self.used
    }

    /// Pick the next player uniformly among those not yet used this cycle.
    ///
    /// When every roster name has already been used the cycle is reset first.
    /// Returns `None` only for an empty roster.
    pub fn select_next<R: Rng + ?Sized>(
        &mut self,
        roster: &[Player],
        rng: &mut R,
    ) -> Option<Player> {
        if roster.is_empty() {
            return None;
        }

        if roster.iter().all(|p| self.used.contains(&p.name)) {
            tracing::debug!("Rotation complete after {} players, resetting", self.used.len());
            self.used.clear();
        }

        let candidates: Vec<&Player> = roster
            .iter()
            .filter(|p| !self.used.contains(&p.name))
            .collect();

        let chosen = (*candidates.choose(rng)?).clone();
        self.used.insert(chosen.name.clone());
        Some(chosen)
    }

    /// Drop used names that no longer appear in the roster
    pub fn retain_roster(&mut self, roster: &[Player]) {
        self.used.retain(|name| roster.iter().any(|p| &p.name == name));
    }

    pub fn reset(&mut self) {
        self.used.clear();
    }
}

/// Names flashed by a spinner before the real pick is revealed.
///
/// Drawn from the whole roster and independent of the rotation, so it has no
/// bearing on who is actually selected.
pub fn spin_sequence<R: Rng + ?Sized>(
    roster: &[Player],
    ticks: usize,
    rng: &mut R,
) -> Vec<PlayerName> {
    (0..ticks)
        .filter_map(|_| roster.choose(rng).map(|p| p.name.clone()))
        .collect()
}
