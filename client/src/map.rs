//! Map grid engine: the sliding window of squares the server paints into.
//!
//! The grid is a fixed arena sized to the negotiated viewport plus a margin
//! on every edge. Scrolls shift content between slots in place; a `newmap`
//! replaces the whole grid. Fog of war keeps stale values displayable until
//! the server overwrites them.

use ew_core::constants::{MAP_LAYERS, MAP_MARGIN};
use ew_core::error::ProtocolError;
use ew_core::types::map::{MapSquare, SquareChange, SquareFace, SquarePos};

pub struct MapGrid {
    /// Total grid width: `view_w + 2 * MAP_MARGIN`.
    width: usize,
    height: usize,
    view_w: usize,
    view_h: usize,
    squares: Vec<MapSquare>,
    /// Slots changed since the last `take_dirty`, in first-touched order.
    dirty_list: Vec<SquarePos>,
}

impl MapGrid {
    /// Creates a fresh grid for a viewport. The visible window starts out
    /// dirty so the renderer repaints it after a map change.
    pub fn new(view_w: usize, view_h: usize) -> Self {
        let width = view_w + 2 * MAP_MARGIN;
        let height = view_h + 2 * MAP_MARGIN;
        let mut squares = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                squares.push(MapSquare::new(x, y));
            }
        }
        let mut grid = Self {
            width,
            height,
            view_w,
            view_h,
            squares,
            dirty_list: Vec::new(),
        };
        for y in MAP_MARGIN..MAP_MARGIN + view_h {
            for x in MAP_MARGIN..MAP_MARGIN + view_w {
                grid.dirty(x, y);
            }
        }
        grid
    }

    pub fn view_size(&self) -> (usize, usize) {
        (self.view_w, self.view_h)
    }

    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    pub fn contains(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height
    }

    /// Whether a slot lies inside the visible window.
    pub fn in_window(&self, x: usize, y: usize) -> bool {
        (MAP_MARGIN..MAP_MARGIN + self.view_w).contains(&x)
            && (MAP_MARGIN..MAP_MARGIN + self.view_h).contains(&y)
    }

    pub fn square(&self, x: usize, y: usize) -> Option<&MapSquare> {
        if !self.contains(x, y) {
            return None;
        }
        Some(&self.squares[self.index(x, y)])
    }

    fn square_mut(&mut self, x: usize, y: usize) -> &mut MapSquare {
        let idx = self.index(x, y);
        &mut self.squares[idx]
    }

    /// Marks a slot changed. Idempotent: a square already on the changed
    /// list is not enqueued twice.
    pub fn dirty(&mut self, x: usize, y: usize) {
        if !self.contains(x, y) {
            return;
        }
        let idx = self.index(x, y);
        if self.squares[idx].dirty {
            return;
        }
        self.squares[idx].dirty = true;
        self.dirty_list.push(SquarePos::new(x, y));
    }

    /// Hands the changed-square list to the renderer and resets the flags.
    pub fn take_dirty(&mut self) -> Vec<SquarePos> {
        let list = std::mem::take(&mut self.dirty_list);
        for pos in &list {
            let idx = self.index(pos.x, pos.y);
            self.squares[idx].dirty = false;
        }
        list
    }

    /// Sets the darkness of one square. 0 and 255 are both valid and
    /// distinct from "unset"; anything above 255 is rejected.
    pub fn set_darkness(&mut self, x: usize, y: usize, value: u16) -> Result<(), ProtocolError> {
        if value > 255 {
            return Err(ProtocolError::InvalidDarkness(value));
        }
        if !self.contains(x, y) {
            return Ok(());
        }
        let sq = self.square_mut(x, y);
        let changed = sq.darkness != value as u8 || sq.fog_of_war;
        sq.darkness = value as u8;
        sq.fog_of_war = false;
        sq.last_modified = SquareChange::Darkness;
        if changed {
            self.dirty(x, y);
        }
        Ok(())
    }

    /// Sets or clears the face on one layer, maintaining multi-tile head
    /// linkage over both the old and the new footprint.
    pub fn set_face(
        &mut self,
        x: usize,
        y: usize,
        layer: usize,
        face: Option<SquareFace>,
    ) -> Result<(), ProtocolError> {
        if layer >= MAP_LAYERS {
            return Err(ProtocolError::InvalidLayer(layer));
        }
        if !self.contains(x, y) {
            return Ok(());
        }

        let sq = self.square_mut(x, y);
        let old = sq.faces[layer];
        if !sq.fog_of_war && old.map(|f| f.id) == face.map(|f| f.id) {
            return Ok(());
        }

        if let Some(old_face) = old {
            self.unlink_footprint(x, y, layer, old_face);
        }

        let origin = SquarePos::new(x, y);
        let sq = self.square_mut(x, y);
        sq.faces[layer] = face;
        sq.heads[layer] = face.map(|_| origin);
        sq.fog_of_war = false;
        sq.last_modified = SquareChange::Face;

        if let Some(new_face) = face {
            self.link_footprint(x, y, layer, new_face);
        }
        self.dirty(x, y);
        Ok(())
    }

    /// Walks an old face's footprint and detaches every tail square's head
    /// reference for the layer.
    fn unlink_footprint(&mut self, x: usize, y: usize, layer: usize, face: SquareFace) {
        let origin = SquarePos::new(x, y);
        for dy in 0..face.tile_h {
            for dx in 0..face.tile_w {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let (Some(tx), Some(ty)) = (x.checked_sub(dx), y.checked_sub(dy)) else {
                    continue;
                };
                if !self.contains(tx, ty) {
                    continue;
                }
                let tail = self.square_mut(tx, ty);
                if tail.heads[layer] == Some(origin) {
                    tail.heads[layer] = None;
                    self.dirty(tx, ty);
                }
            }
        }
    }

    /// Walks a new face's footprint and points every covered square's head
    /// reference for the layer at the origin.
    fn link_footprint(&mut self, x: usize, y: usize, layer: usize, face: SquareFace) {
        let origin = SquarePos::new(x, y);
        for dy in 0..face.tile_h {
            for dx in 0..face.tile_w {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let (Some(tx), Some(ty)) = (x.checked_sub(dx), y.checked_sub(dy)) else {
                    continue;
                };
                if !self.contains(tx, ty) {
                    continue;
                }
                self.square_mut(tx, ty).heads[layer] = Some(origin);
                self.dirty(tx, ty);
            }
        }
    }

    /// Marks one square's content as stale. Values are retained for display.
    /// Re-sent clears for squares already fogged or already at the cleared
    /// baseline do nothing, so no redundant redraws happen.
    pub fn clear_square(&mut self, x: usize, y: usize) {
        if !self.contains(x, y) {
            return;
        }
        let sq = self.square_mut(x, y);
        if sq.fog_of_war || sq.is_cleared() {
            return;
        }
        sq.fog_of_war = true;
        sq.last_modified = SquareChange::Clear;
        self.dirty(x, y);
    }

    /// Resolves the head square of a multi-tile object on one layer.
    ///
    /// Returns `None` for a stale tail: a head that is fogged while the
    /// querying square is not has scrolled out of the last-known-good view.
    pub fn head_of(&self, x: usize, y: usize, layer: usize) -> Option<SquarePos> {
        if layer >= MAP_LAYERS {
            return None;
        }
        let sq = self.square(x, y)?;
        let head = sq.heads[layer]?;
        if head == sq.pos() {
            return Some(head);
        }
        let head_sq = self.square(head.x, head.y)?;
        if head_sq.fog_of_war && !sq.fog_of_war {
            return None;
        }
        Some(head)
    }

    /// Dirties every square currently displaying a face, for repaint after
    /// its image arrives.
    pub fn dirty_face(&mut self, face_id: u16) {
        let mut touched = Vec::new();
        for sq in &self.squares {
            if sq.faces.iter().flatten().any(|f| f.id == face_id) {
                touched.push((sq.x, sq.y));
            }
        }
        for (x, y) in touched {
            self.dirty(x, y);
        }
    }

    /// Applies a `map_scroll`. Deltas at or beyond the viewport extent turn
    /// into a full fog-and-redraw; smaller deltas shift storage in place.
    pub fn scroll(&mut self, dx: i32, dy: i32) {
        if dx == 0 && dy == 0 {
            return;
        }
        if dx.unsigned_abs() as usize >= self.view_w || dy.unsigned_abs() as usize >= self.view_h {
            for y in MAP_MARGIN..MAP_MARGIN + self.view_h {
                for x in MAP_MARGIN..MAP_MARGIN + self.view_w {
                    self.clear_square(x, y);
                    self.dirty(x, y);
                }
            }
            return;
        }

        self.shift(dx, dy);

        // Visible squares that rotated out of the window turn stale.
        for y in 0..self.height {
            for x in 0..self.width {
                let old_x = x as i32 + dx;
                let old_y = y as i32 + dy;
                let was_visible = old_x >= 0
                    && old_y >= 0
                    && self.in_window(old_x as usize, old_y as usize);
                if was_visible && !self.in_window(x, y) {
                    self.clear_square(x, y);
                }
            }
        }

        // The strip of the window exposed on the entered edge needs a
        // repaint even before the server re-sends it.
        let (win_x0, win_x1) = (MAP_MARGIN, MAP_MARGIN + self.view_w);
        let (win_y0, win_y1) = (MAP_MARGIN, MAP_MARGIN + self.view_h);
        if dx != 0 {
            let cols = dx.unsigned_abs() as usize;
            let range = if dx > 0 {
                win_x1 - cols..win_x1
            } else {
                win_x0..win_x0 + cols
            };
            for x in range {
                for y in win_y0..win_y1 {
                    self.dirty(x, y);
                }
            }
        }
        if dy != 0 {
            let rows = dy.unsigned_abs() as usize;
            let range = if dy > 0 {
                win_y1 - rows..win_y1
            } else {
                win_y0..win_y0 + rows
            };
            for y in range {
                for x in win_x0..win_x1 {
                    self.dirty(x, y);
                }
            }
        }
    }

    /// Moves every slot's content by `(-dx, -dy)` without reading a slot
    /// after it has been overwritten: iteration ascends on an axis whose
    /// delta is positive and descends otherwise.
    fn shift(&mut self, dx: i32, dy: i32) {
        let xs: Vec<usize> = if dx >= 0 {
            (0..self.width).collect()
        } else {
            (0..self.width).rev().collect()
        };
        let ys: Vec<usize> = if dy >= 0 {
            (0..self.height).collect()
        } else {
            (0..self.height).rev().collect()
        };

        for &y in &ys {
            for &x in &xs {
                let src_x = x as i32 + dx;
                let src_y = y as i32 + dy;
                let dest = self.index(x, y);
                if src_x >= 0
                    && src_y >= 0
                    && self.contains(src_x as usize, src_y as usize)
                {
                    let src = self.index(src_x as usize, src_y as usize);
                    let mut sq = self.squares[src].clone();
                    sq.x = x;
                    sq.y = y;
                    // Head references move with the content.
                    for head in sq.heads.iter_mut() {
                        *head = head.and_then(|p| {
                            let hx = p.x as i32 - dx;
                            let hy = p.y as i32 - dy;
                            if hx >= 0
                                && hy >= 0
                                && (hx as usize) < self.width
                                && (hy as usize) < self.height
                            {
                                Some(SquarePos::new(hx as usize, hy as usize))
                            } else {
                                None
                            }
                        });
                    }
                    self.squares[dest] = sq;
                } else {
                    self.squares[dest] = MapSquare::new(x, y);
                }
            }
        }

        // Slot positions in the changed list went stale with the move;
        // rebuild it from the flags, then dirty freshly exposed slots.
        self.dirty_list = self
            .squares
            .iter()
            .filter(|sq| sq.dirty)
            .map(MapSquare::pos)
            .collect();
        for y in 0..self.height {
            for x in 0..self.width {
                let src_x = x as i32 + dx;
                let src_y = y as i32 + dy;
                let out = src_x < 0
                    || src_y < 0
                    || !self.contains(src_x as usize, src_y as usize);
                if out {
                    self.dirty(x, y);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ew_core::constants::DEFAULT_DARKNESS;
    use rand::Rng;

    fn face(id: u16) -> Option<SquareFace> {
        Some(SquareFace {
            id,
            tile_w: 1,
            tile_h: 1,
        })
    }

    fn big_face(id: u16, w: usize, h: usize) -> Option<SquareFace> {
        Some(SquareFace {
            id,
            tile_w: w,
            tile_h: h,
        })
    }

    #[test]
    fn new_grid_dirties_the_visible_window() {
        let mut grid = MapGrid::new(3, 3);
        let dirty = grid.take_dirty();
        assert_eq!(dirty.len(), 9);
        assert!(dirty.iter().all(|p| grid.in_window(p.x, p.y)));
    }

    #[test]
    fn set_darkness_validates_range() {
        let mut grid = MapGrid::new(3, 3);
        assert!(matches!(
            grid.set_darkness(MAP_MARGIN, MAP_MARGIN, 256),
            Err(ProtocolError::InvalidDarkness(256))
        ));
        grid.set_darkness(MAP_MARGIN, MAP_MARGIN, 0).unwrap();
        assert_eq!(grid.square(MAP_MARGIN, MAP_MARGIN).unwrap().darkness, 0);
        grid.set_darkness(MAP_MARGIN, MAP_MARGIN, 255).unwrap();
        assert_eq!(grid.square(MAP_MARGIN, MAP_MARGIN).unwrap().darkness, 255);
    }

    #[test]
    fn set_darkness_dirties_only_on_change() {
        let mut grid = MapGrid::new(3, 3);
        grid.take_dirty();
        grid.set_darkness(MAP_MARGIN, MAP_MARGIN, 17).unwrap();
        assert_eq!(grid.take_dirty().len(), 1);
        grid.set_darkness(MAP_MARGIN, MAP_MARGIN, 17).unwrap();
        assert!(grid.take_dirty().is_empty());
    }

    #[test]
    fn set_face_rejects_bad_layer() {
        let mut grid = MapGrid::new(3, 3);
        assert!(matches!(
            grid.set_face(MAP_MARGIN, MAP_MARGIN, MAP_LAYERS, face(1)),
            Err(ProtocolError::InvalidLayer(_))
        ));
    }

    #[test]
    fn dirty_is_idempotent() {
        let mut grid = MapGrid::new(3, 3);
        grid.take_dirty();
        grid.dirty(0, 0);
        grid.dirty(0, 0);
        assert_eq!(grid.take_dirty().len(), 1);
    }

    #[test]
    fn multi_tile_face_links_tails_to_head() {
        let mut grid = MapGrid::new(5, 5);
        let hx = MAP_MARGIN + 2;
        let hy = MAP_MARGIN + 2;
        grid.set_face(hx, hy, 1, big_face(7, 2, 2)).unwrap();

        let head = SquarePos::new(hx, hy);
        assert_eq!(grid.head_of(hx, hy, 1), Some(head));
        assert_eq!(grid.head_of(hx - 1, hy, 1), Some(head));
        assert_eq!(grid.head_of(hx, hy - 1, 1), Some(head));
        assert_eq!(grid.head_of(hx - 1, hy - 1, 1), Some(head));
        // Tail squares carry no face of their own.
        assert!(grid.square(hx - 1, hy).unwrap().faces[1].is_none());
    }

    #[test]
    fn replacing_a_face_unlinks_the_old_footprint() {
        let mut grid = MapGrid::new(5, 5);
        let hx = MAP_MARGIN + 2;
        let hy = MAP_MARGIN + 2;
        grid.set_face(hx, hy, 0, big_face(9, 2, 1)).unwrap();
        grid.set_face(hx, hy, 0, face(3)).unwrap();
        assert_eq!(grid.head_of(hx - 1, hy, 0), None);
        assert_eq!(
            grid.head_of(hx, hy, 0),
            Some(SquarePos::new(hx, hy))
        );
    }

    #[test]
    fn fogged_head_suppresses_live_tail() {
        let mut grid = MapGrid::new(5, 5);
        let hx = MAP_MARGIN + 2;
        let hy = MAP_MARGIN + 2;
        grid.set_face(hx, hy, 1, big_face(7, 2, 1)).unwrap();
        grid.clear_square(hx, hy);

        // Live tail, fogged head: stale, suppressed.
        assert_eq!(grid.head_of(hx - 1, hy, 1), None);

        // Fogged tail keeps resolving against the fogged head.
        grid.clear_square(hx - 1, hy);
        assert_eq!(grid.head_of(hx - 1, hy, 1), Some(SquarePos::new(hx, hy)));
    }

    #[test]
    fn clear_square_fogs_a_face_free_tail() {
        let mut grid = MapGrid::new(5, 5);
        let hx = MAP_MARGIN + 2;
        let hy = MAP_MARGIN + 2;
        grid.set_face(hx, hy, 1, big_face(7, 2, 1)).unwrap();
        grid.take_dirty();

        grid.clear_square(hx - 1, hy);
        let tail = grid.square(hx - 1, hy).unwrap();
        assert!(tail.fog_of_war);
        assert_eq!(grid.take_dirty(), vec![SquarePos::new(hx - 1, hy)]);
    }

    #[test]
    fn clear_square_at_baseline_is_a_noop() {
        let mut grid = MapGrid::new(3, 3);
        grid.take_dirty();
        grid.clear_square(MAP_MARGIN, MAP_MARGIN);
        assert!(grid.take_dirty().is_empty());
        assert!(!grid.square(MAP_MARGIN, MAP_MARGIN).unwrap().fog_of_war);
    }

    #[test]
    fn clear_square_retains_values_under_fog() {
        let mut grid = MapGrid::new(3, 3);
        grid.set_face(MAP_MARGIN, MAP_MARGIN, 0, face(4)).unwrap();
        grid.set_darkness(MAP_MARGIN, MAP_MARGIN, 100).unwrap();
        grid.clear_square(MAP_MARGIN, MAP_MARGIN);
        let sq = grid.square(MAP_MARGIN, MAP_MARGIN).unwrap();
        assert!(sq.fog_of_war);
        assert_eq!(sq.darkness, 100);
        assert_eq!(sq.faces[0].unwrap().id, 4);
    }

    #[test]
    fn scroll_right_dirties_the_entered_column() {
        let mut grid = MapGrid::new(3, 3);
        grid.take_dirty();
        grid.scroll(1, 0);
        let dirty = grid.take_dirty();
        let rightmost = MAP_MARGIN + 2;
        for y in MAP_MARGIN..MAP_MARGIN + 3 {
            assert!(
                dirty.contains(&SquarePos::new(rightmost, y)),
                "column {rightmost} row {y} not dirtied"
            );
        }
    }

    #[test]
    fn scroll_moves_content_between_slots() {
        let mut grid = MapGrid::new(3, 3);
        let x = MAP_MARGIN + 1;
        let y = MAP_MARGIN + 1;
        grid.set_face(x, y, 0, face(42)).unwrap();
        grid.set_darkness(x, y, 11).unwrap();

        grid.scroll(1, 0);

        // Content moved one slot left; the square re-homed itself.
        let moved = grid.square(x - 1, y).unwrap();
        assert_eq!(moved.faces[0].unwrap().id, 42);
        assert_eq!(moved.darkness, 11);
        assert_eq!(moved.pos(), SquarePos::new(x - 1, y));
        assert!(grid.square(x, y).unwrap().faces[0].is_none());
    }

    #[test]
    fn scroll_at_viewport_extent_fogs_the_window() {
        let mut grid = MapGrid::new(3, 3);
        grid.set_face(MAP_MARGIN, MAP_MARGIN, 0, face(5)).unwrap();
        grid.take_dirty();
        grid.scroll(3, 0);
        assert!(grid.square(MAP_MARGIN, MAP_MARGIN).unwrap().fog_of_war);
        let dirty = grid.take_dirty();
        assert_eq!(dirty.len(), 9);
    }

    #[test]
    fn scroll_then_unscroll_restores_the_overlap() {
        let mut rng = rand::thread_rng();
        for _ in 0..20 {
            let mut grid = MapGrid::new(5, 5);
            // Paint a recognizable pattern over the visible window.
            for y in MAP_MARGIN..MAP_MARGIN + 5 {
                for x in MAP_MARGIN..MAP_MARGIN + 5 {
                    let id = (y * 100 + x) as u16;
                    grid.set_face(x, y, 0, face(id)).unwrap();
                    grid.set_darkness(x, y, (id % 256) as u16).unwrap();
                }
            }

            let dx = rng.gen_range(-4..=4);
            let dy = rng.gen_range(-4..=4);
            grid.scroll(dx, dy);
            grid.scroll(-dx, -dy);

            // Squares whose round trip stayed within the grid keep their
            // content (possibly fogged, but retained).
            for y in MAP_MARGIN..MAP_MARGIN + 5 {
                for x in MAP_MARGIN..MAP_MARGIN + 5 {
                    let mid_x = x as i32 - dx;
                    let mid_y = y as i32 - dy;
                    if mid_x < 0
                        || mid_y < 0
                        || mid_x as usize >= grid.size().0
                        || mid_y as usize >= grid.size().1
                    {
                        continue;
                    }
                    let id = (y * 100 + x) as u16;
                    let sq = grid.square(x, y).unwrap();
                    assert_eq!(
                        sq.faces[0].map(|f| f.id),
                        Some(id),
                        "square ({x},{y}) lost its face after ({dx},{dy}) round trip"
                    );
                    assert_eq!(sq.darkness, (id % 256) as u8);
                }
            }
        }
    }

    #[test]
    fn exposed_slots_are_freshly_cleared() {
        let mut grid = MapGrid::new(3, 3);
        let (w, _) = grid.size();
        grid.set_face(w - 1, MAP_MARGIN, 0, face(8)).unwrap();
        grid.scroll(1, 0);
        // The rightmost slot's source fell off the grid; the old content
        // shifted one slot left.
        let sq = grid.square(w - 1, MAP_MARGIN).unwrap();
        assert!(sq.faces[0].is_none());
        assert_eq!(sq.darkness, DEFAULT_DARKNESS);
        assert_eq!(
            grid.square(w - 2, MAP_MARGIN).unwrap().faces[0].map(|f| f.id),
            Some(8)
        );
    }
}
