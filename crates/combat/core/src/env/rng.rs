//! Deterministic random rolls.
//!
//! Every roll in the combat core is derived from the world seed, a per-roll
//! nonce, the rolling unit and a context tag. Replaying the same inputs
//! replays the same fight.

/// RNG oracle for deterministic random number generation.
pub trait RngOracle {
    /// Generate a random u32 value from a seed.
    fn next_u32(&self, seed: u64) -> u32;

    /// Roll in basis points: `0..=9999`.
    fn roll_basis_points(&self, seed: u64) -> u32 {
        self.next_u32(seed) % 10_000
    }

    /// Percent roll: true with probability `chance_pct / 100`.
    fn roll_chance(&self, seed: u64, chance_pct: f32) -> bool {
        if chance_pct <= 0.0 {
            return false;
        }
        if chance_pct >= 100.0 {
            return true;
        }
        let threshold = (chance_pct * 100.0) as u32;
        self.roll_basis_points(seed) < threshold
    }

    /// Generate a random value in range [min, max] inclusive.
    fn range(&self, seed: u64, min: u32, max: u32) -> u32 {
        if min >= max {
            return min;
        }
        let range = max - min + 1;
        min + (self.next_u32(seed) % range)
    }
}

/// Stateless PCG-XSH-RR generator: one LCG step from the seed, then the
/// xorshift/rotate output permutation.
#[derive(Clone, Copy, Debug, Default)]
pub struct PcgRng;

impl PcgRng {
    const MULTIPLIER: u64 = 6364136223846793005;
    const INCREMENT: u64 = 1442695040888963407;

    #[inline]
    fn step(state: u64) -> u64 {
        state
            .wrapping_mul(Self::MULTIPLIER)
            .wrapping_add(Self::INCREMENT)
    }

    #[inline]
    fn output(state: u64) -> u32 {
        let xorshifted = (((state >> 18) ^ state) >> 27) as u32;
        let rot = (state >> 59) as u32;
        xorshifted.rotate_right(rot)
    }
}

impl RngOracle for PcgRng {
    fn next_u32(&self, seed: u64) -> u32 {
        Self::output(Self::step(seed))
    }
}

/// Context tags separating independent rolls made for the same event.
pub mod roll_context {
    pub const HIT: u32 = 0;
    pub const CRIT: u32 = 1;
    pub const RESIST: u32 = 2;
    pub const PROC: u32 = 3;
    pub const DURABILITY: u32 = 4;
    pub const DAMAGE_VARIANCE: u32 = 5;
    pub const MELEE_TABLE: u32 = 6;
}

/// Compute a deterministic seed for one roll.
///
/// * `world_seed` - seed fixed when the world is created
/// * `nonce` - monotonically increasing roll counter
/// * `unit` - unit making the roll
/// * `context` - one of [`roll_context`]
pub fn compute_seed(world_seed: u64, nonce: u64, unit: u32, context: u32) -> u64 {
    let mut hash = world_seed;
    hash ^= nonce.wrapping_mul(0x9e3779b97f4a7c15);
    hash ^= (unit as u64).wrapping_mul(0x517cc1b727220a95);
    hash ^= (context as u64).wrapping_mul(0x85ebca6b);

    hash ^= hash >> 33;
    hash = hash.wrapping_mul(0xff51afd7ed558ccd);
    hash ^= hash >> 33;
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_roll() {
        let rng = PcgRng;
        let seed = compute_seed(42, 7, 1, roll_context::HIT);
        assert_eq!(rng.next_u32(seed), rng.next_u32(seed));
    }

    #[test]
    fn context_changes_seed() {
        assert_ne!(
            compute_seed(42, 7, 1, roll_context::HIT),
            compute_seed(42, 7, 1, roll_context::CRIT)
        );
    }

    #[test]
    fn basis_point_roll_stays_in_range() {
        let rng = PcgRng;
        for nonce in 0..1_000 {
            assert!(rng.roll_basis_points(compute_seed(1, nonce, 0, 0)) <= 9_999);
        }
    }

    #[test]
    fn roll_chance_extremes() {
        let rng = PcgRng;
        assert!(!rng.roll_chance(5, 0.0));
        assert!(rng.roll_chance(5, 100.0));
        assert!(rng.roll_chance(5, 250.0));
    }
}
