//! Resolves the intensity preference into the level used for a round.

use crate::types::{IntensityLevel, IntensityPreference};
use rand::Rng;

/// Cumulative thresholds for the `random` preference:
/// mild 25%, medium 30%, spicy 30%, intimate 15%
const RANDOM_THRESHOLDS: [(f64, IntensityLevel); 3] = [
    (0.25, IntensityLevel::Mild),
    (0.55, IntensityLevel::Medium),
    (0.85, IntensityLevel::Spicy),
];

/// Resolve a preference to a concrete level.
///
/// Fixed preferences are returned unchanged and never touch `rng`. The caller
/// is responsible for calling this once per round.
pub fn resolve<R: Rng + ?Sized>(preference: IntensityPreference, rng: &mut R) -> IntensityLevel {
    match preference.fixed_level() {
        Some(level) => level,
        None => level_for_draw(rng.random::<f64>()),
    }
}

/// Map a uniform draw in [0, 1) onto the weighted distribution
fn level_for_draw(draw: f64) -> IntensityLevel {
    RANDOM_THRESHOLDS
        .iter()
        .find(|(threshold, _)| draw < *threshold)
        .map(|(_, level)| *level)
        .unwrap_or(IntensityLevel::Intimate)
}
