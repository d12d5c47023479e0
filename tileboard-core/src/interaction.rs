//! Pointer and wheel handling: selection, snapped drag, wheel resize,
//! size reset, locked-mode activation and overlay hover.

use std::time::Instant;

use tracing::{debug, warn};

use crate::bookmarks::BookmarkSnapshot;
use crate::canvas::Canvas;
use crate::capability::FaviconResolver;
use crate::geometry::{snap_axis, step_size, Length, Point};
use crate::store::KeyValueStore;
use crate::tile::TileId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

/// Modifier keys held during a wheel event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WheelModifiers {
    /// Required for any resize.
    pub shift: bool,
    /// Resize height only.
    pub ctrl: bool,
}

/// An in-progress tile drag.
#[derive(Debug, Clone, PartialEq)]
pub struct DragState {
    pub tile: TileId,
    /// Pointer offset inside the tile at press time.
    pub grab: Point,
    /// Position before the drag, restored if the final save fails.
    pub origin: (Length, Length),
}

impl<S: KeyValueStore> Canvas<S> {
    /// Pointer pressed at `pos`. Selects the tile under the pointer (or
    /// clears the selection) and starts a drag for an unlocked primary
    /// press.
    pub fn press(&mut self, pos: Point, button: PointerButton) -> Option<TileId> {
        let hit = self
            .tile_at(pos)
            .map(|t| (t.id().clone(), t.rect(self.size()), t.left, t.top));
        let Some((id, rect, left, top)) = hit else {
            self.select(None);
            return None;
        };
        self.select(Some(id.clone()));

        if button == PointerButton::Primary && !self.is_locked() {
            self.drag = Some(DragState {
                tile: id.clone(),
                grab: Point::new(pos.x - rect.left, pos.y - rect.top),
                origin: (left, top),
            });
            debug!("Drag started on {id}");
        }
        Some(id)
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn dragging_tile(&self) -> Option<&TileId> {
        self.drag.as_ref().map(|d| &d.tile)
    }

    /// Move the dragged tile so its corner follows the pointer, snapped to
    /// the grid. Returns whether the tile moved.
    pub fn drag_to(&mut self, pos: Point) -> bool {
        let Some(drag) = self.drag.clone() else {
            return false;
        };
        if self.is_locked() {
            self.drag = None;
            return false;
        }
        let size = self.size();
        let left = Length::Px(snap_axis(pos.x, drag.grab.x, size.width));
        let top = Length::Px(snap_axis(pos.y, drag.grab.y, size.height));
        let Some(tile) = self.tile_mut(&drag.tile) else {
            self.drag = None;
            return false;
        };
        let moved = tile.rect(size).left != left.resolve(size.width, 0.0)
            || tile.rect(size).top != top.resolve(size.height, 0.0);
        tile.left = left;
        tile.top = top;
        moved
    }

    /// End the drag and persist the final position. The drag state is
    /// cleared even when saving fails; the tile then returns to where it
    /// started.
    pub fn release(&mut self) -> crate::Result<()> {
        let Some(drag) = self.drag.take() else {
            return Ok(());
        };
        let Some(tile) = self.tile(&drag.tile) else {
            return Ok(());
        };
        if (tile.left, tile.top) == drag.origin {
            return Ok(());
        }
        let candidate = tile.clone();
        if let Err(e) = self.commit_tile(candidate) {
            warn!("Reverting drag of {}", drag.tile);
            if let Some(tile) = self.tile_mut(&drag.tile) {
                (tile.left, tile.top) = drag.origin;
            }
            return Err(e);
        }
        debug!("Drag of {} saved", drag.tile);
        Ok(())
    }

    /// Shift+wheel over a tile grows (`delta_y < 0`) or shrinks it by one
    /// grid step. Ctrl restricts the change to the height. Returns whether
    /// a tile was resized.
    pub fn wheel(
        &mut self,
        pos: Point,
        delta_y: f64,
        modifiers: WheelModifiers,
    ) -> crate::Result<bool> {
        if !modifiers.shift || self.is_locked() || delta_y == 0.0 {
            return Ok(false);
        }
        let Some(tile) = self.tile_at(pos) else {
            return Ok(false);
        };
        let grow = delta_y < 0.0;
        let rect = tile.rect(self.size());
        let mut candidate = tile.clone();
        if !modifiers.ctrl {
            candidate.width = Length::Px(step_size(rect.width, grow));
        }
        candidate.height = Length::Px(step_size(rect.height, grow));
        debug!("Resizing {} to {}x{}", candidate.id(), candidate.width, candidate.height);
        self.commit_tile(candidate)?;
        Ok(true)
    }

    /// Middle click on a tile restores its default size.
    pub fn middle_click(&mut self, pos: Point) -> crate::Result<bool> {
        if self.is_locked() {
            return Ok(false);
        }
        let Some(tile) = self.tile_at(pos) else {
            return Ok(false);
        };
        let mut candidate = tile.clone();
        candidate.width = Length::Auto;
        candidate.height = Length::Auto;
        self.commit_tile(candidate)?;
        Ok(true)
    }

    /// Double click on empty canvas toggles the lock. Returns the new lock
    /// state, or `None` when a tile was hit.
    pub fn double_click(&mut self, pos: Point) -> Option<bool> {
        if self.tile_at(pos).is_some() {
            return None;
        }
        Some(self.toggle_lock())
    }

    /// Link to open for a click at `pos` in locked mode.
    pub fn activate(&self, pos: Point) -> Option<String> {
        if !self.is_locked() {
            return None;
        }
        self.tile_at(pos)?.href().map(str::to_string)
    }

    /// `"WxH"` badge for the hovered tile; edit mode only.
    pub fn size_badge(&self, id: &TileId) -> Option<String> {
        if self.is_locked() {
            return None;
        }
        Some(self.tile(id)?.size_label(self.size()))
    }

    /// Track which tile (or its overlay) the pointer is over. Returns
    /// whether an overlay is showing or pending.
    pub fn hover(
        &mut self,
        over: Option<&TileId>,
        bookmarks: &BookmarkSnapshot,
        favicons: &dyn FaviconResolver,
        now: Instant,
    ) -> bool {
        if let Some(active) = self.overlays.active_tile().cloned() {
            if over != Some(&active) {
                self.overlays.leave(&active);
            }
        }
        let Some(id) = over else {
            return false;
        };
        let locked = self.is_locked();
        let Some(tile) = self.tiles().iter().find(|t| t.id() == id) else {
            return false;
        };
        let tile = tile.clone();
        self.overlays.enter(&tile, locked, bookmarks, favicons, now)
    }
}
