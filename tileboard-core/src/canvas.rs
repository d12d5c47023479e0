//! The board controller: owns the live tiles, the canvas background, the
//! lock flag, the undo stack and every mutation that reaches storage.
//!
//! Every mutation persists first and only then commits to the in-memory
//! state, so a failed write leaves the board exactly as it was.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::geometry::{Point, Size};
use crate::interaction::DragState;
use crate::options::OptionsPanel;
use crate::overlay::OverlayCache;
use crate::store::{CanvasData, ImportOutcome, KeyValueStore, Persistence};
use crate::tile::{Tile, TileData, TileId};
use crate::toast::{ToastAction, TOAST_DURATION, UNDO_TOAST_DURATION};

/// A notification raised by the controller, shown by the front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub duration: Duration,
    pub action: Option<ToastAction>,
}

impl Notice {
    fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            duration: TOAST_DURATION,
            action: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Context menus
// ---------------------------------------------------------------------------

/// Entries of the canvas and tile context menus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    NewTile,
    ClearAllTiles,
    SetCanvasBackground,
    ClearCanvasBackground,
    Import,
    Export,
    TileOptions,
    DeleteTile,
    SetTileBackgroundFromFile,
    SetTileBackgroundFromUrl,
    ClearTileBackground,
}

impl MenuAction {
    pub fn label(self) -> &'static str {
        match self {
            Self::NewTile => "New tile",
            Self::ClearAllTiles => "Clear all tiles",
            Self::SetCanvasBackground => "Set background from file",
            Self::ClearCanvasBackground => "Clear background",
            Self::Import => "Import",
            Self::Export => "Export",
            Self::TileOptions => "Options",
            Self::DeleteTile => "Delete",
            Self::SetTileBackgroundFromFile => "Set background from file",
            Self::SetTileBackgroundFromUrl => "Set background from URL",
            Self::ClearTileBackground => "Clear background",
        }
    }
}

/// Menu for a right-click on empty canvas.
pub fn canvas_menu_items(has_background: bool) -> Vec<MenuAction> {
    let background = if has_background {
        MenuAction::ClearCanvasBackground
    } else {
        MenuAction::SetCanvasBackground
    };
    vec![
        MenuAction::NewTile,
        MenuAction::ClearAllTiles,
        background,
        MenuAction::Import,
        MenuAction::Export,
    ]
}

/// Menu for a right-click on a tile.
pub fn tile_menu_items(has_background: bool) -> Vec<MenuAction> {
    let mut items = vec![
        MenuAction::TileOptions,
        MenuAction::DeleteTile,
        MenuAction::SetTileBackgroundFromFile,
        MenuAction::SetTileBackgroundFromUrl,
    ];
    if has_background {
        items.push(MenuAction::ClearTileBackground);
    }
    items
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

pub struct Canvas<S: KeyValueStore> {
    persistence: Persistence<S>,
    /// Live tiles in paint order; later entries are drawn on top.
    tiles: Vec<Tile>,
    size: Size,
    background: Option<String>,
    background_generation: u64,
    locked: bool,
    selected: Option<TileId>,
    undo_stack: Vec<TileData>,
    notices: Vec<Notice>,
    pub(crate) drag: Option<DragState>,
    pub(crate) options_panel: Option<OptionsPanel>,
    pub(crate) overlays: OverlayCache,
}

impl<S: KeyValueStore> Canvas<S> {
    /// An empty, unlocked board. Call [`Canvas::load`] to materialize the store.
    pub fn new(persistence: Persistence<S>, size: Size) -> Self {
        Self {
            persistence,
            tiles: Vec::new(),
            size,
            background: None,
            background_generation: 0,
            locked: false,
            selected: None,
            undo_stack: Vec::new(),
            notices: Vec::new(),
            drag: None,
            options_panel: None,
            overlays: OverlayCache::new(),
        }
    }

    /// Materialize every stored tile and the canvas background.
    pub fn load(&mut self) -> crate::Result<()> {
        let state = self.persistence.load_all()?;
        self.tiles = state.tiles.into_values().map(Tile::from_data).collect();
        self.background = state.canvas.background_image;
        self.background_generation = self.background_generation.wrapping_add(1);
        info!("Loaded {} tiles", self.tiles.len());
        Ok(())
    }

    /// Drop all runtime state and load again from the store.
    pub fn reload(&mut self) -> crate::Result<()> {
        self.tiles.clear();
        self.background = None;
        self.selected = None;
        self.undo_stack.clear();
        self.drag = None;
        self.options_panel = None;
        self.overlays.clear();
        self.load()
    }

    pub fn persistence(&self) -> &Persistence<S> {
        &self.persistence
    }

    pub fn persistence_mut(&mut self) -> &mut Persistence<S> {
        &mut self.persistence
    }

    // -- queries ----------------------------------------------------------

    pub fn size(&self) -> Size {
        self.size
    }

    /// The viewport changed. Percent-based tiles follow automatically.
    pub fn set_size(&mut self, size: Size) {
        if size != self.size {
            debug!("Canvas resized to {}x{}", size.width, size.height);
            self.size = size;
        }
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn tile(&self, id: &TileId) -> Option<&Tile> {
        self.tiles.iter().find(|t| t.id() == id)
    }

    pub(crate) fn tile_mut(&mut self, id: &TileId) -> Option<&mut Tile> {
        self.tiles.iter_mut().find(|t| t.id() == id)
    }

    /// Topmost tile under `pos`.
    pub fn tile_at(&self, pos: Point) -> Option<&Tile> {
        self.tiles.iter().rev().find(|t| t.rect(self.size).contains(pos))
    }

    pub fn background(&self) -> Option<&str> {
        self.background.as_deref()
    }

    /// Changes whenever the canvas background changes or a background job
    /// starts.
    pub fn background_generation(&self) -> u64 {
        self.background_generation
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn selected_id(&self) -> Option<&TileId> {
        self.selected.as_ref()
    }

    pub fn selected(&self) -> Option<&Tile> {
        self.selected.as_ref().and_then(|id| self.tile(id))
    }

    pub fn select(&mut self, id: Option<TileId>) {
        self.selected = id.filter(|id| self.tile(id).is_some());
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn overlays(&self) -> &OverlayCache {
        &self.overlays
    }

    /// Drain notifications raised since the last call.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Menu for a right-click at `pos`, or `None` while locked.
    pub fn context_menu(&self, pos: Point) -> Option<Vec<MenuAction>> {
        if self.locked {
            return None;
        }
        Some(match self.tile_at(pos) {
            Some(tile) => tile_menu_items(tile.background.is_some()),
            None => canvas_menu_items(self.background.is_some()),
        })
    }

    // -- persistence helper ------------------------------------------------

    /// Save `candidate` and, once stored, make it the live version of its
    /// tile. New ids are appended on top.
    pub(crate) fn commit_tile(&mut self, mut candidate: Tile) -> crate::Result<()> {
        let data = candidate.to_data(self.size);
        if let Err(e) = self.persistence.save_tile(&data) {
            warn!("Failed to save tile {}: {e}", candidate.id());
            return Err(e);
        }
        candidate.adopt_geometry(&data);
        match self.tiles.iter_mut().find(|t| t.id() == candidate.id()) {
            Some(slot) => *slot = candidate,
            None => self.tiles.push(candidate),
        }
        Ok(())
    }

    // -- lock ------------------------------------------------------------

    /// Flip between edit mode and locked mode. Locking closes the options
    /// panel and ends any drag; unlocking hides overlays.
    pub fn toggle_lock(&mut self) -> bool {
        self.locked = !self.locked;
        if self.locked {
            self.options_panel = None;
            self.drag = None;
        } else {
            self.overlays.hide();
        }
        info!("Board {}", if self.locked { "locked" } else { "unlocked" });
        self.locked
    }

    // -- tiles -----------------------------------------------------------

    /// Create a default-sized tile at `pos` and persist it.
    pub fn new_tile_at(&mut self, pos: Point) -> crate::Result<TileId> {
        let tile = Tile::new_at(pos);
        let id = tile.id().clone();
        self.commit_tile(tile)?;
        info!("Created tile {id}");
        Ok(id)
    }

    /// Delete the selected tile, remembering it for undo. No selection is
    /// a no-op.
    pub fn delete_selected(&mut self) -> crate::Result<Option<TileId>> {
        let Some(id) = self.selected.clone() else {
            return Ok(None);
        };
        self.delete_tile(&id)
    }

    pub fn delete_tile(&mut self, id: &TileId) -> crate::Result<Option<TileId>> {
        let Some(index) = self.tiles.iter().position(|t| t.id() == id) else {
            return Ok(None);
        };
        let snapshot = self.tiles[index].to_data(self.size);
        if let Err(e) = self.persistence.delete_tile(id) {
            warn!("Failed to delete tile {id}: {e}");
            return Err(e);
        }

        let tile = self.tiles.remove(index);
        self.undo_stack.push(snapshot);
        if self.selected.as_ref() == Some(id) {
            self.selected = None;
        }
        if self.drag.as_ref().is_some_and(|d| &d.tile == id) {
            self.drag = None;
        }
        if self.options_panel.as_ref().is_some_and(|p| p.tile() == id) {
            self.options_panel = None;
        }
        self.overlays.forget(id);

        self.notices.push(Notice {
            message: format!("{} removed. ", tile.display_name()),
            duration: UNDO_TOAST_DURATION,
            action: Some(ToastAction::UndoDelete),
        });
        info!("Deleted tile {id}");
        Ok(Some(id.clone()))
    }

    /// Restore the most recently deleted tile with its options, geometry
    /// and background. The id is reused unless another tile took it.
    pub fn undo_delete(&mut self) -> crate::Result<Option<TileId>> {
        let Some(mut snapshot) = self.undo_stack.pop() else {
            self.notices.push(Notice::info("Nothing to undelete"));
            return Ok(None);
        };
        let original = snapshot.clone();
        if self.tile(&snapshot.id).is_some() {
            snapshot.id = TileId::generate();
            debug!("Undo id {} taken, restoring as {}", original.id, snapshot.id);
        }
        let tile = Tile::from_data(snapshot);
        let id = tile.id().clone();
        let name = tile.display_name();
        if let Err(e) = self.commit_tile(tile) {
            self.undo_stack.push(original);
            return Err(e);
        }
        self.notices.push(Notice::info(format!("Restored {name}")));
        info!("Restored tile {id}");
        Ok(Some(id))
    }

    /// Remove every tile. Without confirmation nothing happens. Canvas
    /// settings survive the wipe.
    pub fn clear_all_tiles(&mut self, confirmed: bool) -> crate::Result<bool> {
        if !confirmed {
            return Ok(false);
        }
        let canvas = CanvasData {
            background_image: self.background.clone(),
        };
        self.persistence.reset(&canvas)?;

        for tile in &mut self.tiles {
            tile.bump_generation();
        }
        self.tiles.clear();
        self.selected = None;
        self.drag = None;
        self.options_panel = None;
        self.overlays.clear();
        self.notices.push(Notice::info("All tiles removed"));
        Ok(true)
    }

    // -- backgrounds -----------------------------------------------------

    /// Start a canvas background job. Returns the token the result must
    /// carry; any earlier job becomes stale.
    pub fn begin_background_job(&mut self) -> u64 {
        self.background_generation = self.background_generation.wrapping_add(1);
        self.background_generation
    }

    /// Apply a finished canvas background job. Stale results are dropped
    /// and reported as `Ok(false)`.
    pub fn set_background(&mut self, generation: u64, uri: String) -> crate::Result<bool> {
        if generation != self.background_generation {
            debug!("Dropping stale canvas background (generation {generation})");
            return Ok(false);
        }
        self.persistence.save_canvas(&CanvasData {
            background_image: Some(uri.clone()),
        })?;
        self.background = Some(uri);
        self.background_generation = self.background_generation.wrapping_add(1);
        info!("Canvas background set");
        Ok(true)
    }

    pub fn clear_background(&mut self) -> crate::Result<()> {
        self.persistence.save_canvas(&CanvasData::default())?;
        self.background = None;
        self.background_generation = self.background_generation.wrapping_add(1);
        info!("Canvas background cleared");
        Ok(())
    }

    /// Start a background job for tile `id`. Returns the token the result
    /// must carry, or `None` when the tile does not exist.
    pub fn begin_tile_job(&mut self, id: &TileId) -> Option<u64> {
        let tile = self.tile_mut(id)?;
        tile.bump_generation();
        Some(tile.generation())
    }

    /// Apply a finished tile background job. Results for deleted tiles or
    /// superseded jobs are dropped and reported as `Ok(false)`.
    pub fn set_tile_background(
        &mut self,
        id: &TileId,
        generation: u64,
        uri: String,
    ) -> crate::Result<bool> {
        let Some(tile) = self.tile(id) else {
            debug!("Dropping background for deleted tile {id}");
            return Ok(false);
        };
        if tile.generation() != generation {
            debug!("Dropping stale background for tile {id}");
            return Ok(false);
        }
        let mut candidate = tile.clone();
        candidate.background = Some(uri);
        candidate.bump_generation();
        self.commit_tile(candidate)?;
        info!("Background set for tile {id}");
        Ok(true)
    }

    pub fn clear_tile_background(&mut self, id: &TileId) -> crate::Result<()> {
        let Some(tile) = self.tile(id) else {
            return Ok(());
        };
        let mut candidate = tile.clone();
        candidate.background = None;
        candidate.bump_generation();
        self.commit_tile(candidate)?;
        info!("Background cleared for tile {id}");
        Ok(())
    }

    // -- import / export -------------------------------------------------

    pub fn export(&self) -> crate::Result<String> {
        self.persistence.export_all()
    }

    /// Replace the store from an export document and reload the board.
    pub fn import(&mut self, json: &str) -> crate::Result<ImportOutcome> {
        let outcome = self.persistence.import_all(json)?;
        if let ImportOutcome::Replaced { tiles } = outcome {
            self.reload()?;
            info!("Board reloaded after importing {tiles} tiles");
        }
        Ok(outcome)
    }
}
