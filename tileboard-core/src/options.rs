//! Per-tile options editor model.
//!
//! The panel is bound to a tile id, never a reference, so a tile deleted
//! while its panel is open simply makes the next save a no-op.

use tracing::{debug, info};

use crate::canvas::Canvas;
use crate::geometry::{Point, Rect, Size};
use crate::store::KeyValueStore;
use crate::tile::{clamp_opacity, ChildrenDirection, ChildrenMode, TileId, TileOptions};
use crate::CoreError;

/// Distance between a tile and its options panel.
pub const OPTIONS_PANEL_MARGIN: f64 = 10.0;

/// Editable copy of a tile's options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionsForm {
    pub title: String,
    pub show_title: bool,
    pub url: String,
    pub opacity: u8,
    pub parent_tile: bool,
    pub children_direction: ChildrenDirection,
    pub children_mode: ChildrenMode,
    pub children_list: String,
    pub children_bookmark_folder_id: String,
}

impl OptionsForm {
    pub fn from_options(options: &TileOptions) -> Self {
        Self {
            title: options.title.clone(),
            show_title: options.show_title,
            url: options.url.clone(),
            opacity: options.opacity.min(100),
            parent_tile: options.parent_tile,
            children_direction: options.children_direction,
            children_mode: options.children_mode,
            children_list: options.children_list.clone(),
            children_bookmark_folder_id: options.children_bookmark_folder_id.clone(),
        }
    }

    /// Full options record built from every field. `last_update` is left at
    /// zero; applying the record stamps it.
    pub fn to_options(&self) -> TileOptions {
        TileOptions {
            title: self.title.trim().to_string(),
            show_title: self.show_title,
            url: self.url.trim().to_string(),
            opacity: self.opacity.min(100),
            parent_tile: self.parent_tile,
            children_direction: self.children_direction,
            children_mode: self.children_mode,
            children_list: self.children_list.trim().to_string(),
            children_bookmark_folder_id: self.children_bookmark_folder_id.clone(),
            last_update: 0,
        }
    }

    /// Set the opacity from free text, clamping numbers to `0..=100`.
    pub fn set_opacity_text(&mut self, raw: &str) -> crate::Result<()> {
        let value: f64 = raw
            .trim()
            .parse()
            .map_err(|_| CoreError::InvalidOpacity(raw.to_string()))?;
        if value.is_nan() {
            return Err(CoreError::InvalidOpacity(raw.to_string()));
        }
        self.opacity = clamp_opacity(value);
        Ok(())
    }

    pub fn parent_section_visible(&self) -> bool {
        self.parent_tile
    }

    pub fn list_section_visible(&self) -> bool {
        self.parent_tile && self.children_mode == ChildrenMode::List
    }

    pub fn bookmarks_section_visible(&self) -> bool {
        self.parent_tile && self.children_mode == ChildrenMode::Bookmarks
    }
}

/// Top-left corner of an options panel of `panel` size next to `tile`.
///
/// Prefers the right side and top alignment; each axis flips
/// independently when the panel would leave the canvas.
pub fn place_panel(tile: Rect, panel: Size, canvas: Size) -> Point {
    let right = tile.right() + OPTIONS_PANEL_MARGIN;
    let x = if right + panel.width <= canvas.width {
        right
    } else {
        tile.left - panel.width - OPTIONS_PANEL_MARGIN
    };
    let y = if tile.top + panel.height <= canvas.height {
        tile.top
    } else {
        tile.bottom() - panel.height
    };
    Point::new(x, y)
}

/// An open options panel.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionsPanel {
    tile: TileId,
    pub form: OptionsForm,
    pub position: Point,
}

impl OptionsPanel {
    pub fn tile(&self) -> &TileId {
        &self.tile
    }
}

impl<S: KeyValueStore> Canvas<S> {
    /// Open the options panel for `id`, or the selected tile when `None`.
    /// Returns whether a panel is now open.
    pub fn open_options(&mut self, id: Option<&TileId>, panel_size: Size) -> bool {
        if self.is_locked() {
            return false;
        }
        let Some(tile) = id.or(self.selected_id()).and_then(|id| self.tile(id)) else {
            return false;
        };
        let panel = OptionsPanel {
            tile: tile.id().clone(),
            form: OptionsForm::from_options(&tile.options),
            position: place_panel(tile.rect(self.size()), panel_size, self.size()),
        };
        debug!("Options opened for {}", panel.tile);
        self.options_panel = Some(panel);
        true
    }

    pub fn options_panel(&self) -> Option<&OptionsPanel> {
        self.options_panel.as_ref()
    }

    pub fn options_panel_mut(&mut self) -> Option<&mut OptionsPanel> {
        self.options_panel.as_mut()
    }

    /// Re-place the open panel once its real size is known.
    pub fn place_options(&mut self, panel_size: Size) {
        let size = self.size();
        let Some(tile_id) = self.options_panel.as_ref().map(|p| p.tile.clone()) else {
            return;
        };
        let Some(rect) = self.tile(&tile_id).map(|t| t.rect(size)) else {
            return;
        };
        if let Some(panel) = self.options_panel.as_mut() {
            panel.position = place_panel(rect, panel_size, size);
        }
    }

    /// Apply and persist the form, then close the panel. The panel stays
    /// open when saving fails. A vanished tile closes it with `Ok(false)`.
    pub fn save_options(&mut self) -> crate::Result<bool> {
        let Some(panel) = self.options_panel.clone() else {
            return Ok(false);
        };
        let Some(tile) = self.tile(&panel.tile) else {
            debug!("Options target {} is gone", panel.tile);
            self.options_panel = None;
            return Ok(false);
        };
        let mut candidate = tile.clone();
        candidate.apply_options(panel.form.to_options());
        self.commit_tile(candidate)?;
        self.options_panel = None;
        info!("Options saved for {}", panel.tile);
        Ok(true)
    }

    /// Discard the edits and close the panel.
    pub fn close_options(&mut self) {
        self.options_panel = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::tests::{board, FlakyStore, CANVAS};
    use crate::store::Persistence;

    const PANEL: Size = Size::new(300.0, 400.0);

    #[test]
    fn panel_prefers_right_and_top() {
        let tile = Rect::new(100.0, 100.0, 100.0, 100.0);
        assert_eq!(place_panel(tile, PANEL, CANVAS), Point::new(210.0, 100.0));
    }

    #[test]
    fn panel_flips_each_axis_independently() {
        let near_right = Rect::new(800.0, 100.0, 100.0, 100.0);
        assert_eq!(place_panel(near_right, PANEL, CANVAS), Point::new(490.0, 100.0));

        let near_bottom = Rect::new(100.0, 600.0, 100.0, 100.0);
        assert_eq!(place_panel(near_bottom, PANEL, CANVAS), Point::new(210.0, 300.0));

        let corner = Rect::new(800.0, 600.0, 100.0, 100.0);
        assert_eq!(place_panel(corner, PANEL, CANVAS), Point::new(490.0, 300.0));
    }

    #[test]
    fn sections_follow_checkbox_and_mode() {
        let mut form = OptionsForm::from_options(&TileOptions::default());
        assert!(!form.parent_section_visible());
        assert!(!form.list_section_visible());

        form.parent_tile = true;
        assert!(form.list_section_visible());
        assert!(!form.bookmarks_section_visible());

        form.children_mode = ChildrenMode::Bookmarks;
        assert!(!form.list_section_visible());
        assert!(form.bookmarks_section_visible());
    }

    #[test]
    fn form_trims_and_clamps() {
        let mut form = OptionsForm::from_options(&TileOptions::default());
        form.title = "  News  ".into();
        form.url = " https://news.example.com ".into();
        form.children_list = "\nA|http://a\n\n".into();
        form.set_opacity_text("150").unwrap();
        assert_eq!(form.opacity, 100);
        form.set_opacity_text("-3").unwrap();
        assert_eq!(form.opacity, 0);
        assert!(form.set_opacity_text("lots").is_err());

        let options = form.to_options();
        assert_eq!(options.title, "News");
        assert_eq!(options.url, "https://news.example.com");
        assert_eq!(options.children_list, "A|http://a");
    }

    #[test]
    fn save_applies_and_closes() {
        let mut b = board();
        let id = b.new_tile_at(Point::default()).unwrap();
        assert!(b.open_options(Some(&id), PANEL));

        let panel = b.options_panel_mut().unwrap();
        panel.form.title = "Mail".into();
        panel.form.opacity = 40;
        assert!(b.save_options().unwrap());
        assert!(b.options_panel().is_none());

        let tile = b.tile(&id).unwrap();
        assert_eq!(tile.options.title, "Mail");
        assert_eq!(tile.options.opacity, 40);
        assert!(tile.options.last_update > 0);
    }

    #[test]
    fn open_uses_selection_and_needs_unlocked_board() {
        let mut b = board();
        assert!(!b.open_options(None, PANEL));
        let id = b.new_tile_at(Point::default()).unwrap();
        b.select(Some(id.clone()));
        assert!(b.open_options(None, PANEL));
        assert_eq!(b.options_panel().unwrap().tile(), &id);

        b.toggle_lock();
        assert!(b.options_panel().is_none());
        assert!(!b.open_options(None, PANEL));
    }

    #[test]
    fn cancel_discards_edits() {
        let mut b = board();
        let id = b.new_tile_at(Point::default()).unwrap();
        b.open_options(Some(&id), PANEL);
        b.options_panel_mut().unwrap().form.title = "Draft".into();
        b.close_options();
        assert_eq!(b.tile(&id).unwrap().options.title, "");
    }

    #[test]
    fn save_for_deleted_tile_is_noop() {
        let mut b = board();
        let id = b.new_tile_at(Point::default()).unwrap();
        b.open_options(Some(&id), PANEL);
        b.delete_tile(&id).unwrap();
        assert!(b.options_panel().is_none());
        assert!(!b.save_options().unwrap());
    }

    #[test]
    fn failed_save_keeps_panel_open() {
        let mut b = Canvas::new(Persistence::new(FlakyStore::default()), CANVAS);
        let id = b.new_tile_at(Point::default()).unwrap();
        b.open_options(Some(&id), PANEL);
        b.options_panel_mut().unwrap().form.title = "Mail".into();
        b.persistence_mut().store_mut().fail = true;

        assert!(b.save_options().is_err());
        assert!(b.options_panel().is_some());
        assert_eq!(b.tile(&id).unwrap().options.title, "");
    }
}
