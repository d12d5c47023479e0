use std::time::Instant;

use eframe::egui;

use tileboard_core::ToastAction;

use crate::app::TileboardApp;

impl TileboardApp {
    pub(crate) fn draw_toast(&mut self, ctx: &egui::Context, now: Instant) {
        let Some(toast) = self.toasts.current(now) else {
            return;
        };
        let message = toast.message.clone();
        let action = toast.action;

        let mut triggered = false;
        egui::Area::new(egui::Id::new("toast"))
            .order(egui::Order::Tooltip)
            .anchor(egui::Align2::CENTER_BOTTOM, egui::vec2(0.0, -24.0))
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.horizontal(|ui| {
                        ui.label(&message);
                        if let Some(action) = action {
                            if ui.link(action.label()).clicked() {
                                triggered = true;
                            }
                        }
                    });
                });
            });

        if !triggered {
            return;
        }
        self.toasts.dismiss();
        match action {
            Some(ToastAction::UndoDelete) => {
                if let Err(e) = self.canvas.undo_delete() {
                    self.report(e);
                }
            }
            None => {}
        }
    }
}
