//! The player's derived stats as accumulated from `stats` commands.

use crate::constants::{RESIST_TYPES, SKILL_COUNT};

#[derive(Debug, Clone, Default)]
pub struct Stats {
    pub hp: i16,
    pub max_hp: i16,
    pub sp: i16,
    pub max_sp: i16,
    pub grace: i16,
    pub max_grace: i16,
    pub str_: i16,
    pub int_: i16,
    pub wis: i16,
    pub dex: i16,
    pub con: i16,
    pub cha: i16,
    pub pow: i16,
    pub level: i16,
    pub wc: i16,
    pub ac: i16,
    pub dam: i16,
    pub armour: i16,
    pub food: i16,
    pub flags: i16,
    pub exp: u64,
    pub speed: u32,
    pub weapon_speed: u32,
    pub weight_limit: u32,
    pub spell_attune: u32,
    pub spell_repel: u32,
    pub spell_deny: u32,
    pub range: String,
    pub title: String,
    pub resists: [i16; RESIST_TYPES],
}

/// One learned skill slot: level plus accumulated experience.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkillValue {
    pub level: u8,
    pub experience: u64,
}

/// Skill table indexed by wire skill id minus `CS_STAT_SKILL_START`.
///
/// Names arrive once via the `skill_info` reply; values trickle in through
/// `stats` commands.
#[derive(Debug, Clone)]
pub struct SkillSet {
    names: [Option<String>; SKILL_COUNT],
    values: [SkillValue; SKILL_COUNT],
}

impl Default for SkillSet {
    fn default() -> Self {
        Self {
            names: [const { None }; SKILL_COUNT],
            values: [SkillValue::default(); SKILL_COUNT],
        }
    }
}

impl SkillSet {
    /// Registers the name of a skill slot. Returns false when the slot
    /// index is out of range.
    pub fn register(&mut self, slot: usize, name: String) -> bool {
        match self.names.get_mut(slot) {
            Some(entry) => {
                *entry = Some(name);
                true
            }
            None => false,
        }
    }

    pub fn set_value(&mut self, slot: usize, value: SkillValue) -> bool {
        match self.values.get_mut(slot) {
            Some(entry) => {
                *entry = value;
                true
            }
            None => false,
        }
    }

    pub fn name(&self, slot: usize) -> Option<&str> {
        self.names.get(slot)?.as_deref()
    }

    pub fn value(&self, slot: usize) -> Option<SkillValue> {
        self.values.get(slot).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_rejects_out_of_range_slots() {
        let mut skills = SkillSet::default();
        assert!(skills.register(0, "lockpicking".to_string()));
        assert!(skills.register(SKILL_COUNT - 1, "praying".to_string()));
        assert!(!skills.register(SKILL_COUNT, "bogus".to_string()));
        assert_eq!(skills.name(0), Some("lockpicking"));
        assert_eq!(skills.name(1), None);
    }

    #[test]
    fn values_are_stored_per_slot() {
        let mut skills = SkillSet::default();
        assert!(skills.set_value(
            3,
            SkillValue {
                level: 7,
                experience: 12_345,
            }
        ));
        let v = skills.value(3).unwrap();
        assert_eq!(v.level, 7);
        assert_eq!(v.experience, 12_345);
    }
}
