//! Tag-indexed game object as carried by `item2` / `upditem`.

use crate::constants::ItemFlags;

/// One game object. Identity is the tag; the registry enforces uniqueness.
#[derive(Debug, Clone)]
pub struct Item {
    pub tag: u32,
    /// Tag of the container holding this item (0 = the floor/ground view).
    pub location: u32,
    pub flags: ItemFlags,
    pub weight: u32,
    pub face: u32,
    pub name: String,
    pub name_pl: String,
    pub anim: u16,
    pub anim_speed: u8,
    pub nrof: u32,
    pub item_type: u16,
}

impl Item {
    /// Singular or plural name depending on the stack count.
    pub fn display_name(&self) -> &str {
        if self.nrof > 1 {
            &self.name_pl
        } else {
            &self.name
        }
    }

    pub fn is_applied(&self) -> bool {
        !(self.flags & ItemFlags::APPLIED).is_empty()
    }

    pub fn is_locked(&self) -> bool {
        self.flags.contains(ItemFlags::LOCKED)
    }

    pub fn is_cursed(&self) -> bool {
        self.flags.contains(ItemFlags::CURSED) || self.flags.contains(ItemFlags::DAMNED)
    }
}
