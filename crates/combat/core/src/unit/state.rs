use bitflags::bitflags;

bitflags! {
    /// Control and combat state of a unit, derived from its auras.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct UnitStateFlags: u32 {
        const STUNNED   = 1 << 0;
        const ROOTED    = 1 << 1;
        const FLEEING   = 1 << 2;
        const CONFUSED  = 1 << 3;
        const PACIFIED  = 1 << 4;
        const SILENCED  = 1 << 5;
        const IN_COMBAT = 1 << 6;
        const EVADING   = 1 << 7;

        /// States recomputed from applied auras.
        const AURA_DRIVEN = Self::STUNNED.bits()
            | Self::ROOTED.bits()
            | Self::FLEEING.bits()
            | Self::CONFUSED.bits()
            | Self::PACIFIED.bits()
            | Self::SILENCED.bits();
        /// Victim cannot dodge, parry or block.
        const CONTROLLED = Self::STUNNED.bits() | Self::FLEEING.bits() | Self::CONFUSED.bits();
    }
}

/// Conditions other spells can key on (execute ranges, reactive abilities).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum AuraState {
    /// Dodged, parried or blocked recently.
    Defense = 1,
    Health20Pct = 2,
    Health35Pct = 3,
    Health75Pct = 4,
    Frozen = 5,
    Bleeding = 6,
    Enraged = 7,
    Marked = 8,
}

impl AuraState {
    pub const fn from_index(index: i32) -> Option<AuraState> {
        match index {
            1 => Some(AuraState::Defense),
            2 => Some(AuraState::Health20Pct),
            3 => Some(AuraState::Health35Pct),
            4 => Some(AuraState::Health75Pct),
            5 => Some(AuraState::Frozen),
            6 => Some(AuraState::Bleeding),
            7 => Some(AuraState::Enraged),
            8 => Some(AuraState::Marked),
            _ => None,
        }
    }

    #[inline]
    const fn bit(self) -> u32 {
        1 << (self as u8 - 1)
    }
}

/// Bit set of [`AuraState`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AuraStateMask(u32);

impl AuraStateMask {
    #[inline]
    pub const fn has(self, state: AuraState) -> bool {
        self.0 & state.bit() != 0
    }

    #[inline]
    pub fn set(&mut self, state: AuraState, on: bool) {
        if on {
            self.0 |= state.bit();
        } else {
            self.0 &= !state.bit();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aura_state_mask_toggles() {
        let mut mask = AuraStateMask::default();
        mask.set(AuraState::Health20Pct, true);
        assert!(mask.has(AuraState::Health20Pct));
        assert!(!mask.has(AuraState::Defense));
        mask.set(AuraState::Health20Pct, false);
        assert_eq!(mask, AuraStateMask::default());
    }

    #[test]
    fn aura_state_index_roundtrip() {
        assert_eq!(AuraState::from_index(1), Some(AuraState::Defense));
        assert_eq!(AuraState::from_index(0), None);
    }
}
