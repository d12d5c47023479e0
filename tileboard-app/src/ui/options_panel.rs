use eframe::egui;

use tileboard_core::{ChildrenDirection, ChildrenMode};

use crate::app::TileboardApp;

enum PanelOutcome {
    Save,
    Cancel,
}

impl TileboardApp {
    /// The per-tile options window, docked next to its tile.
    pub(crate) fn draw_options_panel(&mut self, ctx: &egui::Context) {
        let Some(panel) = self.canvas.options_panel() else {
            return;
        };
        let mut form = panel.form.clone();
        let tile = panel.tile().clone();
        let pos = self.origin + egui::vec2(panel.position.x as f32, panel.position.y as f32);

        let mut outcome = None;
        let shown = egui::Window::new("Tile options")
            .id(egui::Id::new("tile_options"))
            .fixed_pos(pos)
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                egui::Grid::new("tile_options_grid")
                    .num_columns(2)
                    .spacing([8.0, 6.0])
                    .show(ui, |ui| {
                        ui.label("Title");
                        ui.text_edit_singleline(&mut form.title);
                        ui.end_row();

                        ui.label("");
                        ui.checkbox(&mut form.show_title, "Show title");
                        ui.end_row();

                        ui.label("URL");
                        ui.text_edit_singleline(&mut form.url);
                        ui.end_row();

                        ui.label("Opacity");
                        ui.add(egui::Slider::new(&mut form.opacity, 0..=100).suffix("%"));
                        ui.end_row();

                        ui.label("");
                        ui.checkbox(&mut form.parent_tile, "Parent tile");
                        ui.end_row();
                    });

                if form.parent_section_visible() {
                    ui.separator();
                    ui.horizontal(|ui| {
                        ui.label("Children");
                        egui::ComboBox::from_id_salt("children_direction")
                            .selected_text(form.children_direction.label())
                            .show_ui(ui, |ui| {
                                for direction in ChildrenDirection::ALL {
                                    ui.selectable_value(
                                        &mut form.children_direction,
                                        direction,
                                        direction.label(),
                                    );
                                }
                            });
                    });
                    ui.horizontal(|ui| {
                        ui.radio_value(&mut form.children_mode, ChildrenMode::List, "List");
                        ui.radio_value(
                            &mut form.children_mode,
                            ChildrenMode::Bookmarks,
                            "Bookmarks",
                        );
                    });
                }

                if form.list_section_visible() {
                    ui.label("One link per line: text|url");
                    ui.add(
                        egui::TextEdit::multiline(&mut form.children_list)
                            .desired_rows(5)
                            .desired_width(f32::INFINITY),
                    );
                }

                if form.bookmarks_section_visible() {
                    let selected = self
                        .folder_choices
                        .iter()
                        .find(|c| c.id == form.children_bookmark_folder_id)
                        .map(|c| c.label.clone())
                        .unwrap_or_else(|| "(none)".to_string());
                    egui::ComboBox::from_id_salt("children_folder")
                        .selected_text(selected)
                        .width(240.0)
                        .show_ui(ui, |ui| {
                            for choice in &self.folder_choices {
                                ui.selectable_value(
                                    &mut form.children_bookmark_folder_id,
                                    choice.id.clone(),
                                    &choice.label,
                                );
                            }
                        });
                    if self.folder_choices.is_empty() {
                        ui.weak("No bookmark folders available");
                    }
                }

                ui.separator();
                ui.horizontal(|ui| {
                    if ui.button("Save").clicked() {
                        outcome = Some(PanelOutcome::Save);
                    }
                    if ui.button("Cancel").clicked() {
                        outcome = Some(PanelOutcome::Cancel);
                    }
                });
            });

        // The panel may have been closed or rebound while drawing.
        match self.canvas.options_panel_mut() {
            Some(panel) if panel.tile() == &tile => panel.form = form,
            _ => return,
        }

        match outcome {
            Some(PanelOutcome::Save) => {
                if let Err(e) = self.canvas.save_options() {
                    self.report(e);
                }
            }
            Some(PanelOutcome::Cancel) => self.canvas.close_options(),
            None => {
                if let Some(shown) = shown {
                    let size = shown.response.rect.size();
                    if (size - self.options_panel_size).length() > 0.5 {
                        self.options_panel_size = size;
                        let panel_size = self.panel_size();
                        self.canvas.place_options(panel_size);
                    }
                }
            }
        }
    }
}
