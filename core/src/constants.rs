//! Protocol and map constants shared by the client crates.

use bitflags::bitflags;

// =============================================================================
// Map geometry
// =============================================================================

/// Stacked visual planes per map square. Lower index = higher display
/// priority; the wire delivers face ids highest-index-first.
pub const MAP_LAYERS: usize = 4;

/// Preferred viewport width in squares, negotiated via `setup mapsize`.
pub const DEFAULT_MAP_WIDTH: usize = 17;
/// Preferred viewport height in squares.
pub const DEFAULT_MAP_HEIGHT: usize = 13;

/// Raw wire coordinates are 5-bit, so neither axis can exceed this.
pub const MAX_MAP_SIZE: usize = 31;

/// Scroll-lookahead border kept on every edge of the visible window. The
/// grid is `(view + 2*MAP_MARGIN)` squares in each axis so small scrolls
/// shift storage instead of reallocating.
pub const MAP_MARGIN: usize = 10;

/// Darkness of a square nothing has been received for. 0 = fully dark,
/// 255 = fully lit; 255 is also the cleared baseline.
pub const DEFAULT_DARKNESS: u8 = 255;

/// Pixel edge of one tile at original resolution. The derived second
/// resolution is exactly double this.
pub const SQUARE_SIZE: u32 = 32;

/// Face id 0 is reserved: a map-update carrying it clears the layer.
pub const EMPTY_FACE: u16 = 0;

// =============================================================================
// Face fetching
// =============================================================================

/// Cap on simultaneously in-flight `askface` requests.
pub const CONCURRENT_FETCH_LIMIT: usize = 8;

// =============================================================================
// Item flags (`item2` / `upditem` flags word)
// =============================================================================

bitflags! {
    /// Flags word carried by `item2` and `upditem`.
    ///
    /// The low byte holds two 4-bit subfields rather than independent bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ItemFlags: u32 {
        /// 4-bit "applied" subfield.
        const APPLIED  = 0x000F;
        /// 4-bit animation/location subfield.
        const LOCATION = 0x00F0;
        const UNPAID   = 0x0200;
        const MAGIC    = 0x0400;
        const CURSED   = 0x0800;
        const DAMNED   = 0x1000;
        const OPEN     = 0x2000;
        const NOPICK   = 0x4000;
        const LOCKED   = 0x8000;
    }
}

bitflags! {
    /// Field selectors of the `upditem` command, in wire order.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct UpdItem: u8 {
        const LOCATION  = 0x01;
        const FLAGS     = 0x02;
        const WEIGHT    = 0x04;
        const FACE      = 0x08;
        const NAME      = 0x10;
        const ANIM      = 0x20;
        const ANIMSPEED = 0x40;
        const NROF      = 0x80;
    }
}

bitflags! {
    /// Field selectors of the `updspell` command.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct UpdSpell: u8 {
        const MANA   = 0x01;
        const GRACE  = 0x02;
        const DAMAGE = 0x04;
    }
}

// =============================================================================
// Stat numbers (`stats` command)
// =============================================================================

pub const CS_STAT_HP: u8 = 1;
pub const CS_STAT_MAXHP: u8 = 2;
pub const CS_STAT_SP: u8 = 3;
pub const CS_STAT_MAXSP: u8 = 4;
pub const CS_STAT_STR: u8 = 5;
pub const CS_STAT_INT: u8 = 6;
pub const CS_STAT_WIS: u8 = 7;
pub const CS_STAT_DEX: u8 = 8;
pub const CS_STAT_CON: u8 = 9;
pub const CS_STAT_CHA: u8 = 10;
pub const CS_STAT_EXP: u8 = 11;
pub const CS_STAT_LEVEL: u8 = 12;
pub const CS_STAT_WC: u8 = 13;
pub const CS_STAT_AC: u8 = 14;
pub const CS_STAT_DAM: u8 = 15;
pub const CS_STAT_ARMOUR: u8 = 16;
pub const CS_STAT_SPEED: u8 = 17;
pub const CS_STAT_FOOD: u8 = 18;
pub const CS_STAT_WEAP_SP: u8 = 19;
pub const CS_STAT_RANGE: u8 = 20;
pub const CS_STAT_TITLE: u8 = 21;
pub const CS_STAT_POW: u8 = 22;
pub const CS_STAT_GRACE: u8 = 23;
pub const CS_STAT_MAXGRACE: u8 = 24;
pub const CS_STAT_FLAGS: u8 = 25;
pub const CS_STAT_WEIGHT_LIM: u8 = 26;
pub const CS_STAT_EXP64: u8 = 28;
pub const CS_STAT_SPELL_ATTUNE: u8 = 29;
pub const CS_STAT_SPELL_REPEL: u8 = 30;
pub const CS_STAT_SPELL_DENY: u8 = 31;

/// First resistance slot; `RESIST_TYPES` slots follow.
pub const CS_STAT_RESIST_START: u8 = 100;
pub const RESIST_TYPES: usize = 18;

/// First skill slot; `SKILL_COUNT` slots follow. Skill ids from
/// `skill_info` replies live in the same range.
pub const CS_STAT_SKILL_START: u8 = 140;
pub const SKILL_COUNT: usize = 50;
