//! Map square model.

use crate::constants::{DEFAULT_DARKNESS, MAP_LAYERS};

/// Grid-space position of a square.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SquarePos {
    pub x: usize,
    pub y: usize,
}

impl SquarePos {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

/// Snapshot of the face occupying a layer, taken at set time.
///
/// The tile-unit footprint is frozen here so multi-tile linkage can be torn
/// down later even if the face's pixels are replaced in the meantime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SquareFace {
    pub id: u16,
    /// Footprint width in tile units.
    pub tile_w: usize,
    /// Footprint height in tile units.
    pub tile_h: usize,
}

/// What kind of update last touched a square.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SquareChange {
    #[default]
    Clear,
    Darkness,
    Face,
}

/// One grid cell. Owned exclusively by the map grid; coordinates are
/// absolute grid-space, not screen-space.
#[derive(Debug, Clone)]
pub struct MapSquare {
    /// Slot coordinates this square currently lives at.
    pub x: usize,
    pub y: usize,
    /// 0 = fully dark, 255 = fully lit.
    pub darkness: u8,
    /// Per-layer face snapshot; `None` = layer unoccupied.
    pub faces: [Option<SquareFace>; MAP_LAYERS],
    /// Per-layer position of the square holding the authoritative head part
    /// of a multi-tile object. Equal to own position when this square is
    /// itself the head.
    pub heads: [Option<SquarePos>; MAP_LAYERS],
    pub dirty: bool,
    /// Values are stale but retained for display until overwritten.
    pub fog_of_war: bool,
    pub last_modified: SquareChange,
}

impl MapSquare {
    pub fn new(x: usize, y: usize) -> Self {
        Self {
            x,
            y,
            darkness: DEFAULT_DARKNESS,
            faces: [None; MAP_LAYERS],
            heads: [None; MAP_LAYERS],
            dirty: false,
            fog_of_war: false,
            last_modified: SquareChange::Clear,
        }
    }

    pub fn pos(&self) -> SquarePos {
        SquarePos::new(self.x, self.y)
    }

    /// Whether the square matches the "already cleared" baseline: default
    /// darkness, no faces and no head references. A tail square of a
    /// multi-tile object has no face of its own but still carries content.
    pub fn is_cleared(&self) -> bool {
        self.darkness == DEFAULT_DARKNESS
            && self.faces.iter().all(Option::is_none)
            && self.heads.iter().all(Option::is_none)
    }
}
