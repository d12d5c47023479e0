use std::time::Instant;

use eframe::egui;
use tracing::debug;

use tileboard_core::{PointerButton, WheelModifiers};

use crate::app::{ContextMenu, TileboardApp};

impl TileboardApp {
    pub(crate) fn handle_canvas_input(
        &mut self,
        ctx: &egui::Context,
        response: &egui::Response,
        now: Instant,
    ) {
        // Overlays sit on a higher layer, so track the raw pointer rather
        // than the board's own hover state.
        self.update_hover(ctx.input(|i| i.pointer.hover_pos()), now);
        let hover = response.hover_pos();

        // Press: selection and drag start.
        if let Some(pos) = hover {
            let point = self.to_canvas(pos);
            let pressed = ctx.input(|i| {
                [
                    (egui::PointerButton::Primary, PointerButton::Primary),
                    (egui::PointerButton::Secondary, PointerButton::Secondary),
                    (egui::PointerButton::Middle, PointerButton::Middle),
                ]
                .into_iter()
                .find(|(button, _)| i.pointer.button_pressed(*button))
                .map(|(_, button)| button)
            });
            if let Some(button) = pressed {
                self.canvas.press(point, button);
            }
        }

        // Drag follows the pointer anywhere, even outside the board.
        if self.canvas.is_dragging() {
            if let Some(pos) = ctx.input(|i| i.pointer.latest_pos()) {
                let point = self.to_canvas(pos);
                self.canvas.drag_to(point);
            }
            if ctx.input(|i| i.pointer.button_released(egui::PointerButton::Primary)) {
                if let Err(e) = self.canvas.release() {
                    self.report(e);
                }
            }
        }

        let Some(pos) = hover else {
            return;
        };
        let point = self.to_canvas(pos);

        if response.double_clicked() {
            if let Some(locked) = self.canvas.double_click(point) {
                debug!("Double click toggled lock: {locked}");
                self.context_menu = None;
            }
        } else if response.clicked() {
            if let Some(url) = self.canvas.activate(point) {
                ctx.open_url(egui::OpenUrl::same_tab(url));
            }
        }

        if response.secondary_clicked() {
            self.context_menu = self.canvas.context_menu(point).map(|items| ContextMenu {
                screen_pos: pos,
                canvas_pos: point,
                target: self.canvas.tile_at(point).map(|t| t.id().clone()),
                items,
            });
        }

        if response.clicked_by(egui::PointerButton::Middle) {
            if let Err(e) = self.canvas.middle_click(point) {
                self.report(e);
            }
        }

        self.handle_wheel(ctx, point);
    }

    /// Shift+wheel resizes the tile under the pointer; ctrl limits it to
    /// the height.
    fn handle_wheel(&mut self, ctx: &egui::Context, point: tileboard_core::Point) {
        let wheel: Vec<(f32, egui::Modifiers)> = ctx.input(|i| {
            i.events
                .iter()
                .filter_map(|event| match event {
                    egui::Event::MouseWheel {
                        delta, modifiers, ..
                    } => {
                        // Some platforms turn shift+wheel into horizontal scrolling.
                        let dy = if delta.y != 0.0 { delta.y } else { delta.x };
                        Some((dy, *modifiers))
                    }
                    _ => None,
                })
                .collect()
        });
        for (dy, modifiers) in wheel {
            let modifiers = WheelModifiers {
                shift: modifiers.shift,
                ctrl: modifiers.ctrl || modifiers.command,
            };
            // egui reports wheel-up as positive; the board grows on negative.
            if let Err(e) = self.canvas.wheel(point, -(dy as f64), modifiers) {
                self.report(e);
                break;
            }
        }
    }

    /// Work out which tile (or open overlay) the pointer is over.
    fn update_hover(&mut self, hover: Option<egui::Pos2>, now: Instant) {
        let over = hover.and_then(|pos| {
            if let Some((id, rect)) = &self.overlay_hover {
                if rect.contains(pos) {
                    return Some(id.clone());
                }
            }
            self.canvas
                .tile_at(self.to_canvas(pos))
                .map(|t| t.id().clone())
        });
        self.canvas
            .hover(over.as_ref(), &self.bookmarks, &self.favicons, now);
        self.hovered_tile = over;
    }

    pub(crate) fn handle_keyboard(&mut self, ctx: &egui::Context) {
        if !ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            return;
        }
        if self.context_menu.is_some() {
            self.context_menu = None;
        } else if self.dialog != crate::app::ActiveDialog::None {
            self.dialog = crate::app::ActiveDialog::None;
        } else if self.canvas.options_panel().is_some() {
            self.canvas.close_options();
        }
    }
}
