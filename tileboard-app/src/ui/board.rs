use eframe::egui;
use tracing::warn;

use crate::app::{CachedTexture, TileboardApp, TILE_CORNER_RADIUS};

const FULL_UV: egui::Rect = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
const TILE_FILL: egui::Color32 = egui::Color32::from_rgb(70, 74, 82);
const TILE_TEXT: egui::Color32 = egui::Color32::from_rgb(235, 235, 235);
const SELECTED_STROKE: egui::Color32 = egui::Color32::from_rgb(90, 160, 255);
const EDIT_STROKE: egui::Color32 = egui::Color32::from_rgb(120, 120, 120);

impl TileboardApp {
    /// Paint the canvas background, every tile and the size badge.
    pub(crate) fn draw_board(&mut self, ui: &mut egui::Ui, rect: egui::Rect) {
        let ctx = ui.ctx().clone();
        self.sync_textures(&ctx);

        let painter = ui.painter_at(rect);
        if let Some(tex) = self
            .background_texture
            .as_ref()
            .and_then(|c| c.texture.as_ref())
        {
            painter.image(tex.id(), rect, FULL_UV, egui::Color32::WHITE);
        }

        let locked = self.canvas.is_locked();
        let size = self.canvas.size();
        let selected = self.canvas.selected_id();

        for tile in self.canvas.tiles() {
            let screen = self.to_screen(tile.rect(size));
            let alpha = f32::from(tile.options.opacity) / 100.0;

            let texture = self
                .tile_textures
                .get(tile.id())
                .and_then(|c| c.texture.as_ref());
            match texture {
                Some(tex) => painter.image(
                    tex.id(),
                    screen,
                    FULL_UV,
                    egui::Color32::WHITE.gamma_multiply(alpha),
                ),
                None => painter.rect_filled(
                    screen,
                    TILE_CORNER_RADIUS,
                    TILE_FILL.gamma_multiply(alpha),
                ),
            };

            if tile.options.show_title && !tile.options.title.is_empty() {
                painter.text(
                    screen.center_bottom() - egui::vec2(0.0, 4.0),
                    egui::Align2::CENTER_BOTTOM,
                    &tile.options.title,
                    egui::FontId::proportional(14.0),
                    TILE_TEXT.gamma_multiply(alpha),
                );
            }

            if !locked {
                let (width, color) = if selected == Some(tile.id()) {
                    (2.0, SELECTED_STROKE)
                } else {
                    (1.0, EDIT_STROKE)
                };
                painter.rect_stroke(
                    screen,
                    TILE_CORNER_RADIUS,
                    egui::Stroke::new(width, color),
                    egui::StrokeKind::Inside,
                );
            }
        }

        if let Some(id) = &self.hovered_tile {
            if let (Some(label), Some(tile)) = (self.canvas.size_badge(id), self.canvas.tile(id)) {
                let screen = self.to_screen(tile.rect(size));
                let galley = painter.layout_no_wrap(
                    label,
                    egui::FontId::monospace(11.0),
                    egui::Color32::WHITE,
                );
                let badge = egui::Rect::from_min_size(
                    screen.right_top() - egui::vec2(galley.size().x + 8.0, 0.0),
                    galley.size() + egui::vec2(8.0, 4.0),
                );
                painter.rect_filled(badge, 2.0, egui::Color32::from_black_alpha(180));
                painter.galley(badge.min + egui::vec2(4.0, 2.0), galley, egui::Color32::WHITE);
            }
        }
    }

    /// Decode backgrounds that changed since the last frame and drop the
    /// textures of tiles that are gone.
    fn sync_textures(&mut self, ctx: &egui::Context) {
        match self.canvas.background() {
            Some(uri) => {
                let key = (self.canvas.background_generation(), uri.len());
                if self.background_texture.as_ref().map(|c| c.key) != Some(key) {
                    self.background_texture = Some(CachedTexture {
                        key,
                        texture: decode_texture(ctx, "canvas-background", uri),
                    });
                }
            }
            None => self.background_texture = None,
        }

        let tiles = self.canvas.tiles();
        self.tile_textures
            .retain(|id, _| tiles.iter().any(|t| t.id() == id && t.background.is_some()));
        for tile in tiles {
            let Some(uri) = tile.background.as_deref() else {
                continue;
            };
            let key = (tile.generation(), uri.len());
            if self.tile_textures.get(tile.id()).map(|c| c.key) == Some(key) {
                continue;
            }
            let texture = decode_texture(ctx, &format!("tile-{}", tile.id()), uri);
            self.tile_textures
                .insert(tile.id().clone(), CachedTexture { key, texture });
        }
    }
}

fn decode_texture(ctx: &egui::Context, name: &str, uri: &str) -> Option<egui::TextureHandle> {
    match tileboard_image::decode_rgba(uri) {
        Ok((pixels, w, h)) => {
            let image = egui::ColorImage::from_rgba_unmultiplied([w as usize, h as usize], &pixels);
            Some(ctx.load_texture(name, image, egui::TextureOptions::LINEAR))
        }
        Err(e) => {
            warn!("Cannot display background {name}: {e}");
            None
        }
    }
}
