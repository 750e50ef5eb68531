use bitflags::bitflags;

bitflags! {
    /// Behavioural switches on a spell descriptor.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct SpellAttributes: u64 {
        /// Always harmful regardless of effects.
        const NEGATIVE                       = 1 << 0;
        const PASSIVE                        = 1 << 1;
        const CHANNELED                      = 1 << 2;
        /// Each cast creates a new aura instead of refreshing.
        const MULTI_INSTANCE                 = 1 << 3;
        /// One aura per target regardless of caster.
        const CASTER_AGNOSTIC                = 1 << 4;
        const DEATH_PERSISTENT               = 1 << 5;
        /// Cooldown starts when the aura fades instead of on cast.
        const COOLDOWN_ON_AURA_REMOVE        = 1 << 6;
        const IGNORE_DAMAGE_TAKEN_MODIFIERS  = 1 << 7;
        const IGNORE_CASTER_MODIFIERS        = 1 << 8;
        const IGNORE_RESISTANCES             = 1 << 9;
        /// Either fully resisted or not at all.
        const BINARY                         = 1 << 10;
        const IMPOSSIBLE_DODGE_PARRY_BLOCK   = 1 << 11;
        const BLOCKABLE                      = 1 << 12;
        const DAMAGE_DOESNT_BREAK_AURAS      = 1 << 13;
        const PERIODIC_CAN_CRIT              = 1 << 14;
        const CANT_CRIT                      = 1 << 15;
        /// Nothing procs while this spell's effects are resolving.
        const DISABLE_PROC                   = 1 << 16;
        /// The spell cannot trigger procs on anyone.
        const CANT_TRIGGER_PROC              = 1 << 17;
        /// Skip hit resolution entirely.
        const IGNORE_HIT_RESULT              = 1 << 18;
        const REQ_CASTER_BEHIND              = 1 << 19;
        const UNAFFECTED_BY_INVULNERABILITY  = 1 << 20;
        /// Only one instance per caster across all targets.
        const SINGLE_TARGET                  = 1 << 21;
        const NO_THREAT                      = 1 << 22;
        /// Bypasses immunities granted by other spells.
        const UNAFFECTED_BY_SCHOOL_IMMUNE    = 1 << 23;
    }
}

bitflags! {
    /// Events that remove an aura from its target.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct AuraInterruptFlags: u32 {
        const HOSTILE_ACTION = 1 << 0;
        /// Any damage, including periodic.
        const TAKE_DAMAGE    = 1 << 1;
        /// Non-periodic damage only.
        const DIRECT_DAMAGE  = 1 << 2;
        const CAST           = 1 << 3;
        const MELEE_ATTACK   = 1 << 4;
        const MOVE           = 1 << 5;
        const LEAVE_COMBAT   = 1 << 6;
        const STUN           = 1 << 7;
    }
}

bitflags! {
    /// How an in-progress cast reacts to outside events.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct CastInterruptFlags: u32 {
        const MOVEMENT         = 1 << 0;
        /// Damage adds time to a generic cast (or shortens a channel).
        const PUSHBACK         = 1 << 1;
        const STUN             = 1 << 2;
        /// Damage aborts the cast outright.
        const ABORT_ON_DAMAGE  = 1 << 3;
    }
}

/// Family mask selecting spells of one class family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct SpellFamilyFlags(pub u64);

impl SpellFamilyFlags {
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn intersects(self, other: SpellFamilyFlags) -> bool {
        self.0 & other.0 != 0
    }
}
