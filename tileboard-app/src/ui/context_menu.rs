use eframe::egui;

use crate::app::TileboardApp;

impl TileboardApp {
    pub(crate) fn draw_context_menu(&mut self, ctx: &egui::Context) {
        let Some(menu) = self.context_menu.clone() else {
            return;
        };

        let mut chosen = None;
        let area = egui::Area::new(egui::Id::new("context_menu"))
            .order(egui::Order::Foreground)
            .fixed_pos(menu.screen_pos)
            .show(ctx, |ui| {
                egui::Frame::menu(ui.style()).show(ui, |ui| {
                    ui.set_min_width(180.0);
                    for action in &menu.items {
                        if ui.button(action.label()).clicked() {
                            chosen = Some(*action);
                        }
                    }
                });
            });

        if let Some(action) = chosen {
            self.context_menu = None;
            self.run_menu_action(&menu, action);
        } else if area.response.clicked_elsewhere()
            // The right click that opened this menu, or a new one.
            && !ctx.input(|i| i.pointer.button_released(egui::PointerButton::Secondary))
        {
            self.context_menu = None;
        }
    }
}
