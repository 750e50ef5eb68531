/// Combat configuration constants and tunable parameters.
///
/// Compile-time limits are associated constants; everything else is a field so
/// it can be loaded from `config.toml` by the content crate.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CombatConfig {
    /// Time after a diminishing-returns stack reaches zero before the level resets.
    pub dr_reset_ms: u64,
    /// Duration cap for diminished crowd control between player-controlled units.
    pub dr_pvp_duration_limit_ms: i32,
    /// Maximum nesting of proc dispatch before further procs are dropped.
    pub max_proc_chain_depth: u32,
    /// How long the `Defense` aura state stays up after a dodge, parry or block.
    pub defense_state_duration_ms: u64,
    /// Time added to a generic cast when the caster is hit.
    pub cast_pushback_ms: i32,
    /// Number of pushbacks a single cast accepts.
    pub max_cast_pushbacks: u8,
    /// Fraction of a channel's full duration removed per delaying hit.
    pub channel_delay_pct: f32,
    /// Threat generated per point of healing or energize.
    pub assist_threat_factor: f32,
    /// Chance (percent) that a hit rolls equipment durability loss.
    pub durability_loss_chance_pct: f32,
    /// Percent durability lost when the roll succeeds.
    pub durability_loss_pct: f32,
    /// Health percentage below which `Health20Pct` is set.
    pub health_low_pct: u32,
    /// Health percentage below which `Health35Pct` is set.
    pub health_mid_pct: u32,
    /// Health percentage above which `Health75Pct` is set.
    pub health_high_pct: u32,
}

impl CombatConfig {
    // ===== compile-time constants used as type parameters =====
    /// Number of effect slots on a spell descriptor.
    pub const MAX_SPELL_EFFECTS: usize = 3;
    /// Upper bound on owned auras per unit before new ones are refused.
    pub const MAX_AURAS_PER_UNIT: usize = 255;
    /// Highest value of the hit-resolution roll (rolls are `0..=ROLL_MAX`).
    pub const ROLL_MAX: u32 = 9_999;

    // ===== runtime-tunable defaults =====
    pub const DEFAULT_DR_RESET_MS: u64 = 18_000;
    pub const DEFAULT_DR_PVP_DURATION_LIMIT_MS: i32 = 8_000;
    pub const DEFAULT_MAX_PROC_CHAIN_DEPTH: u32 = 8;
    pub const DEFAULT_DEFENSE_STATE_DURATION_MS: u64 = 4_000;
    pub const DEFAULT_CAST_PUSHBACK_MS: i32 = 500;
    pub const DEFAULT_MAX_CAST_PUSHBACKS: u8 = 2;
    pub const DEFAULT_CHANNEL_DELAY_PCT: f32 = 25.0;
    pub const DEFAULT_ASSIST_THREAT_FACTOR: f32 = 0.5;
    pub const DEFAULT_DURABILITY_LOSS_CHANCE_PCT: f32 = 0.5;
    pub const DEFAULT_DURABILITY_LOSS_PCT: f32 = 1.0;

    pub fn new() -> Self {
        Self {
            dr_reset_ms: Self::DEFAULT_DR_RESET_MS,
            dr_pvp_duration_limit_ms: Self::DEFAULT_DR_PVP_DURATION_LIMIT_MS,
            max_proc_chain_depth: Self::DEFAULT_MAX_PROC_CHAIN_DEPTH,
            defense_state_duration_ms: Self::DEFAULT_DEFENSE_STATE_DURATION_MS,
            cast_pushback_ms: Self::DEFAULT_CAST_PUSHBACK_MS,
            max_cast_pushbacks: Self::DEFAULT_MAX_CAST_PUSHBACKS,
            channel_delay_pct: Self::DEFAULT_CHANNEL_DELAY_PCT,
            assist_threat_factor: Self::DEFAULT_ASSIST_THREAT_FACTOR,
            durability_loss_chance_pct: Self::DEFAULT_DURABILITY_LOSS_CHANCE_PCT,
            durability_loss_pct: Self::DEFAULT_DURABILITY_LOSS_PCT,
            health_low_pct: 20,
            health_mid_pct: 35,
            health_high_pct: 75,
        }
    }

    #[must_use]
    pub fn with_max_proc_chain_depth(mut self, depth: u32) -> Self {
        self.max_proc_chain_depth = depth;
        self
    }

    #[must_use]
    pub fn with_durability_loss_chance(mut self, chance_pct: f32) -> Self {
        self.durability_loss_chance_pct = chance_pct;
        self
    }
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self::new()
    }
}
