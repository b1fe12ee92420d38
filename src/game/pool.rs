//! Pill Pool Generation
//!
//! Builds the pill pool of each round: size grows with the round number,
//! the type mix drifts from safe to dangerous over the distribution horizon,
//! and every pool carries a minimum number of distinct shapes.
//!
//! ## Type allocation
//!
//! A pool of `size` pills with target shares `p_i` receives, per type, either
//! `floor(size * p_i)` or `ceil(size * p_i)` pills. The leftover pills are
//! assigned by systematic sampling over the fractional parts with a single
//! random offset, so each type's expected count equals `size * p_i` exactly.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::GameConfig;
use crate::core::hash::StateHasher;
use crate::core::rng::SeededRng;
use crate::game::pill::{Pill, PillId, PillType, ShapeId};

// =============================================================================
// POOL STATE
// =============================================================================

/// The drawable pills of a round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    /// Round this pool belongs to
    pub round_number: u32,

    /// Initial pill count (kept after consumption)
    pub size: usize,

    /// Pills in position order, consumed ones included
    pub pills: Vec<Pill>,

    /// AVAILABLE pills per type
    pub counters: BTreeMap<PillType, usize>,

    /// Ids of revealed pills, in reveal order
    pub revealed: Vec<PillId>,

    /// Shapes that could appear this round
    pub unlocked_shapes: Vec<ShapeId>,
}

impl Pool {
    /// Look up a pill.
    pub fn pill(&self, id: &PillId) -> Option<&Pill> {
        self.pills.iter().find(|p| &p.id == id)
    }

    /// Look up a pill mutably.
    pub fn pill_mut(&mut self, id: &PillId) -> Option<&mut Pill> {
        self.pills.iter_mut().find(|p| &p.id == id)
    }

    /// Pills still drawable.
    pub fn available_pills(&self) -> impl Iterator<Item = &Pill> {
        self.pills.iter().filter(|p| p.is_available())
    }

    /// Number of drawable pills.
    pub fn available_count(&self) -> usize {
        self.available_pills().count()
    }

    /// No pill left to draw.
    pub fn is_exhausted(&self) -> bool {
        self.available_count() == 0
    }

    /// Distinct shapes among all pills of the pool.
    pub fn distinct_shapes(&self) -> BTreeSet<&ShapeId> {
        self.pills.iter().map(|p| &p.shape).collect()
    }

    /// Recompute `counters` from the AVAILABLE pills.
    pub fn recount(&mut self) {
        self.counters = tally_available(&self.pills);
    }

    /// Mark a pill revealed, recording it once.
    pub fn reveal(&mut self, id: &PillId) -> bool {
        let Some(pill) = self.pill_mut(id) else {
            return false;
        };
        if !pill.is_revealed {
            pill.is_revealed = true;
            self.revealed.push(id.clone());
        }
        true
    }

    /// Add pool data to hasher.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_u32(self.round_number);
        hasher.update_usize(self.size);
        hasher.update_usize(self.pills.len());
        for pill in &self.pills {
            pill.hash_into(hasher);
        }
        for (pill_type, count) in &self.counters {
            hasher.update_u8(*pill_type as u8);
            hasher.update_usize(*count);
        }
        hasher.update_usize(self.revealed.len());
        for id in &self.revealed {
            hasher.update_str(id.as_str());
        }
        hasher.update_usize(self.unlocked_shapes.len());
        for shape in &self.unlocked_shapes {
            hasher.update_str(shape.as_str());
        }
    }
}

fn tally_available(pills: &[Pill]) -> BTreeMap<PillType, usize> {
    let mut counters: BTreeMap<PillType, usize> = PillType::ALL.iter().map(|t| (*t, 0)).collect();
    for pill in pills.iter().filter(|p| p.is_available()) {
        *counters.entry(pill.pill_type).or_insert(0) += 1;
    }
    counters
}

// =============================================================================
// SIZE & DISTRIBUTION
// =============================================================================

/// Pool size for a round: `base + (round - 1) / increment`, clamped to
/// `[base, max]`.
pub fn calculate_pool_size(round: u32, config: &GameConfig) -> usize {
    let pool = &config.pool;
    let every = pool.increment_every_n_rounds.max(1);
    let growth = (round.max(1) - 1) / every;
    (pool.base_size + growth as usize).clamp(pool.base_size, pool.max_size.max(pool.base_size))
}

/// Unnormalized per-type weights for a round. Locked types weigh 0.
pub fn raw_distribution(round: u32, config: &GameConfig) -> BTreeMap<PillType, f64> {
    let horizon = config.pool.distribution_horizon;
    let t = if horizon <= 1 {
        1.0
    } else {
        (f64::from(round.max(1) - 1) / f64::from(horizon - 1)).min(1.0)
    };

    PillType::ALL
        .iter()
        .map(|pill_type| {
            let weight = match config.pool.distribution.get(pill_type) {
                Some(dist) if round >= dist.unlock_round => {
                    (dist.initial_pct + t * (dist.final_pct - dist.initial_pct)).max(0.0)
                }
                _ => 0.0,
            };
            (*pill_type, weight)
        })
        .collect()
}

/// Normalized target shares for a round. Sums to 1.0 under a valid config.
pub fn calculate_distribution(round: u32, config: &GameConfig) -> BTreeMap<PillType, f64> {
    let mut weights = raw_distribution(round, config);
    let total: f64 = weights.values().sum();
    if total > 0.0 {
        for weight in weights.values_mut() {
            *weight /= total;
        }
    }
    weights
}

/// Shapes that may appear in a round.
pub fn get_unlocked_shapes(round: u32, config: &GameConfig) -> Vec<ShapeId> {
    config.unlocked_shapes(round)
}

/// Split `size` pills across types by randomized systematic rounding.
fn allocate_type_counts(
    size: usize,
    distribution: &BTreeMap<PillType, f64>,
    rng: &mut SeededRng,
) -> BTreeMap<PillType, usize> {
    let mut counts = BTreeMap::new();
    let mut fractions = Vec::new();
    let mut assigned = 0usize;

    for (pill_type, share) in distribution {
        let expected = size as f64 * share;
        let whole = expected.floor() as usize;
        counts.insert(*pill_type, whole);
        fractions.push((*pill_type, expected - whole as f64));
        assigned += whole;
    }

    let remainder = size.saturating_sub(assigned);
    if remainder == 0 {
        return counts;
    }

    // One offset in [0, 1), then every unit step. An interval shorter than
    // 1 holds at most one sample point, so no type gets more than its ceil.
    let mut extra: BTreeSet<PillType> = BTreeSet::new();
    let mut next_point = rng.random();
    let mut cumulative = 0.0;
    for (pill_type, fraction) in &fractions {
        cumulative += fraction;
        if extra.len() < remainder && next_point < cumulative {
            extra.insert(*pill_type);
            next_point += 1.0;
        }
    }

    // Float drift can leave a unit unplaced. Hand it to the largest
    // fractional part not yet rounded up.
    if extra.len() < remainder {
        let mut leftovers: Vec<(PillType, f64)> = fractions
            .iter()
            .filter(|(t, f)| *f > 0.0 && !extra.contains(t))
            .copied()
            .collect();
        leftovers.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        for (pill_type, _) in leftovers.into_iter().take(remainder - extra.len()) {
            extra.insert(pill_type);
        }
    }

    for pill_type in extra {
        if let Some(count) = counts.get_mut(&pill_type) {
            *count += 1;
        }
    }
    counts
}

fn distinct_count(shapes: &[ShapeId]) -> usize {
    shapes.iter().collect::<BTreeSet<_>>().len()
}

/// Assign shapes to `count` pills with at least `target` distinct shapes.
fn assign_shapes(
    count: usize,
    unlocked: &[ShapeId],
    target: usize,
    attempts: u32,
    rng: &mut SeededRng,
) -> Vec<ShapeId> {
    let draw = |rng: &mut SeededRng| -> Vec<ShapeId> {
        (0..count)
            .filter_map(|_| rng.choice(unlocked).cloned())
            .collect()
    };

    let mut shapes = draw(rng);
    let mut attempt = 1;
    while distinct_count(&shapes) < target && attempt < attempts.max(1) {
        shapes = draw(rng);
        attempt += 1;
    }

    if distinct_count(&shapes) < target {
        debug!(
            distinct = distinct_count(&shapes),
            target, "shape redraws exhausted, injecting missing shapes"
        );
        inject_missing_shapes(&mut shapes, unlocked, target);
    }

    shapes
}

/// Replace duplicated shapes, from the back, with unlocked shapes that are
/// not present yet until `target` distinct shapes are reached.
fn inject_missing_shapes(shapes: &mut [ShapeId], unlocked: &[ShapeId], target: usize) {
    let mut missing = unlocked
        .iter()
        .filter(|s| !shapes.contains(s))
        .cloned()
        .collect::<Vec<_>>()
        .into_iter();

    while distinct_count(shapes) < target {
        let Some(replacement) = missing.next() else {
            break;
        };

        let mut seen: BTreeMap<&ShapeId, usize> = BTreeMap::new();
        for shape in shapes.iter() {
            *seen.entry(shape).or_insert(0) += 1;
        }
        let duplicate_pos = (0..shapes.len())
            .rev()
            .find(|&i| seen.get(&shapes[i]).copied().unwrap_or(0) > 1);

        match duplicate_pos {
            Some(pos) => shapes[pos] = replacement,
            None => break,
        }
    }
}

// =============================================================================
// GENERATION
// =============================================================================

/// Generate the pool of a round.
///
/// Never fails under a validated config.
pub fn generate_pool(round: u32, config: &GameConfig, rng: &mut SeededRng) -> Pool {
    let size = calculate_pool_size(round, config);
    let distribution = calculate_distribution(round, config);
    let counts = allocate_type_counts(size, &distribution, rng);

    let mut types: Vec<PillType> = counts
        .iter()
        .flat_map(|(pill_type, count)| std::iter::repeat(*pill_type).take(*count))
        .collect();
    rng.shuffle(&mut types);

    let unlocked = get_unlocked_shapes(round, config);
    let target = config
        .pool
        .min_shape_diversity
        .min(distinct_count(&unlocked))
        .min(size);
    let shapes = assign_shapes(size, &unlocked, target, config.pool.shape_redraw_attempts, rng);

    let pills: Vec<Pill> = types
        .into_iter()
        .zip(shapes)
        .enumerate()
        .map(|(position, (pill_type, shape))| Pill::new(round, position, pill_type, shape))
        .collect();

    let counters = tally_available(&pills);

    debug!(round, size, ?counters, "generated pool");

    Pool {
        round_number: round,
        size,
        pills,
        counters,
        revealed: Vec::new(),
        unlocked_shapes: unlocked,
    }
}

/// Structural check of a pool. See `validation::validate_pool_invariants`
/// for the individual rules.
pub fn validate_pool(pool: &Pool, config: &GameConfig) -> bool {
    crate::game::validation::validate_pool_invariants(pool, config).is_empty()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GameConfig {
        GameConfig::default()
    }

    #[test]
    fn test_pool_size_growth() {
        let config = config();
        assert_eq!(calculate_pool_size(1, &config), 6);
        assert_eq!(calculate_pool_size(3, &config), 6);
        assert_eq!(calculate_pool_size(4, &config), 7);
        assert_eq!(calculate_pool_size(7, &config), 8);
        assert_eq!(calculate_pool_size(100, &config), 12);
    }

    #[test]
    fn test_distribution_round_one() {
        let dist = calculate_distribution(1, &config());
        let total: f64 = dist.values().sum();
        assert!((total - 1.0).abs() < 1e-9);

        // Only SAFE and DMG_LOW are unlocked at round 1
        assert_eq!(dist[&PillType::DmgHigh], 0.0);
        assert_eq!(dist[&PillType::Heal], 0.0);
        assert_eq!(dist[&PillType::Fatal], 0.0);
        assert_eq!(dist[&PillType::Life], 0.0);
        assert!((dist[&PillType::Safe] - 0.45 / 0.85).abs() < 1e-9);
    }

    #[test]
    fn test_distribution_reaches_final_shares() {
        let config = config();
        let at_horizon = calculate_distribution(10, &config);
        let beyond = calculate_distribution(25, &config);
        assert_eq!(at_horizon, beyond);

        let total: f64 = at_horizon.values().sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(at_horizon[&PillType::Fatal] > 0.0);
    }

    #[test]
    fn test_seed_12345_round_one() {
        let config = config();
        let mut rng = SeededRng::new(12345);
        let pool = generate_pool(1, &config, &mut rng);

        assert_eq!(pool.size, 6);
        assert_eq!(pool.pills.len(), 6);
        assert!(pool.distinct_shapes().len() >= 3);
        assert!(validate_pool(&pool, &config));
    }

    #[test]
    fn test_generated_pills_are_fresh_and_dense() {
        let config = config();
        let mut rng = SeededRng::new(99);
        let pool = generate_pool(5, &config, &mut rng);

        for (i, pill) in pool.pills.iter().enumerate() {
            assert_eq!(pill.position, i);
            assert_eq!(pill.id, PillId::for_position(5, i));
            assert!(pill.is_available());
            assert!(!pill.is_revealed);
            assert!(pill.modifiers.is_empty());
        }
        assert_eq!(pool.counters.values().sum::<usize>(), pool.size);
        assert!(pool.revealed.is_empty());
    }

    #[test]
    fn test_type_counts_are_floor_or_ceil() {
        let config = config();
        for seed in 0..50 {
            let mut rng = SeededRng::new(seed);
            let round = 1 + seed % 12;
            let pool = generate_pool(round, &config, &mut rng);
            let dist = calculate_distribution(round, &config);

            for (pill_type, share) in dist {
                let expected = pool.size as f64 * share;
                let got = pool.counters[&pill_type] as f64;
                assert!(got >= expected.floor() && got <= expected.ceil());
            }
        }
    }

    #[test]
    fn test_locked_types_never_appear() {
        let config = config();
        for seed in 0..30 {
            let mut rng = SeededRng::new(seed);
            let pool = generate_pool(2, &config, &mut rng);
            assert_eq!(pool.counters[&PillType::Fatal], 0);
            assert_eq!(pool.counters[&PillType::DmgHigh], 0);
        }
    }

    #[test]
    fn test_same_seed_same_pool() {
        let config = config();
        let a = generate_pool(4, &config, &mut SeededRng::new(777));
        let b = generate_pool(4, &config, &mut SeededRng::new(777));
        assert_eq!(a, b);
    }

    #[test]
    fn test_injection_fixes_low_diversity() {
        let unlocked: Vec<ShapeId> = ["a", "b", "c"].into_iter().map(ShapeId::from).collect();
        let mut shapes: Vec<ShapeId> = ["a", "a", "a", "a"].into_iter().map(ShapeId::from).collect();
        inject_missing_shapes(&mut shapes, &unlocked, 3);
        assert_eq!(distinct_count(&shapes), 3);
        assert_eq!(shapes.len(), 4);
    }

    #[test]
    fn test_zero_redraws_still_meets_diversity() {
        let mut config = config();
        config.pool.shape_redraw_attempts = 0;
        config.pool.min_shape_diversity = 6;
        for seed in 0..20 {
            let pool = generate_pool(1, &config, &mut SeededRng::new(seed));
            assert_eq!(pool.distinct_shapes().len(), 6);
        }
    }

    #[test]
    fn test_reveal_records_once() {
        let config = config();
        let mut pool = generate_pool(1, &config, &mut SeededRng::new(1));
        let id = pool.pills[2].id.clone();

        assert!(pool.reveal(&id));
        assert!(pool.reveal(&id));
        assert_eq!(pool.revealed, vec![id]);
        assert!(!pool.reveal(&PillId("r9-p9".to_string())));
    }
}
