use std::time::Instant;

use eframe::egui;

use tileboard_core::overlay::{place, FAVICON_SIZE};
use tileboard_core::{OverlayLink, Size};

use crate::app::{TileboardApp, TILE_CORNER_RADIUS};

const OVERLAY_FILL: egui::Color32 = egui::Color32::from_rgb(44, 47, 53);
/// Size guess for an overlay that has not been laid out yet.
const ESTIMATED_ROW: egui::Vec2 = egui::vec2(200.0, 22.0);

impl TileboardApp {
    /// Children overlay of the hovered parent tile.
    pub(crate) fn draw_overlay(&mut self, ctx: &egui::Context, now: Instant) {
        let Some((id, content)) = self.canvas.overlays().visible(now) else {
            self.overlay_hover = None;
            return;
        };
        let Some(tile) = self.canvas.tile(id) else {
            self.overlay_hover = None;
            return;
        };
        let id = id.clone();
        let direction = content.direction;
        let icon_trailing = content.icon_trailing;
        let links = content.links.clone();
        let tile_rect = tile.rect(self.canvas.size());

        let size = self.overlay_sizes.get(&id).copied().unwrap_or_else(|| {
            egui::vec2(ESTIMATED_ROW.x, ESTIMATED_ROW.y * links.len().max(1) as f32)
        });
        let placement = place(
            direction,
            tile_rect,
            Size::new(size.x as f64, size.y as f64),
        );
        let content_rect = self.to_screen(placement.content);

        let shown = egui::Area::new(egui::Id::new(("children_overlay", id.as_str())))
            .order(egui::Order::Foreground)
            .fixed_pos(content_rect.min)
            .show(ctx, |ui| {
                egui::Frame::NONE
                    .fill(OVERLAY_FILL)
                    .corner_radius(TILE_CORNER_RADIUS)
                    .inner_margin(6.0)
                    .show(ui, |ui| {
                        if links.is_empty() {
                            ui.weak("No links");
                        }
                        for link in &links {
                            ui.horizontal(|ui| draw_link(ui, link, icon_trailing));
                        }
                    });
            });

        let measured = shown.response.rect.size();
        if self.overlay_sizes.get(&id) != Some(&measured) {
            self.overlay_sizes.insert(id.clone(), measured);
            ctx.request_repaint();
        }
        self.overlay_hover = Some((id, self.to_screen(placement.outer)));
    }
}

fn draw_link(ui: &mut egui::Ui, link: &OverlayLink, icon_trailing: bool) {
    let icon = |ui: &mut egui::Ui| {
        if let Some(url) = &link.icon {
            let side = FAVICON_SIZE as f32;
            ui.add(egui::Image::new(url.as_str()).fit_to_exact_size(egui::vec2(side, side)));
        }
    };
    if !icon_trailing {
        icon(ui);
    }
    match &link.href {
        Some(href) => {
            ui.hyperlink_to(&link.text, href);
        }
        None => {
            ui.label(&link.text);
        }
    }
    if icon_trailing {
        icon(ui);
    }
}
