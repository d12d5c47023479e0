use eframe::egui;

use crate::app::{ActiveDialog, TileboardApp};

const BACKGROUND_URL_PROMPT: &str = "Image URL (http or https)";

impl TileboardApp {
    pub(crate) fn draw_dialog(&mut self, ctx: &egui::Context) {
        match self.dialog.clone() {
            ActiveDialog::None => {}
            ActiveDialog::ConfirmClear => self.draw_confirm_clear(ctx),
            ActiveDialog::BackgroundUrl { tile, url } => self.draw_background_url(ctx, tile, url),
            ActiveDialog::Alert(message) => self.draw_alert(ctx, &message),
        }
    }

    fn draw_confirm_clear(&mut self, ctx: &egui::Context) {
        let mut answer = None;
        centered_window("Clear board").show(ctx, |ui| {
            ui.label("Remove all tiles?");
            ui.add_space(8.0);
            ui.horizontal(|ui| {
                if ui.button("Yes").clicked() {
                    answer = Some(true);
                }
                if ui.button("Cancel").clicked() {
                    answer = Some(false);
                }
            });
        });
        if let Some(confirmed) = answer {
            self.dialog = ActiveDialog::None;
            if confirmed {
                self.confirm_clear();
            }
        }
    }

    fn draw_background_url(
        &mut self,
        ctx: &egui::Context,
        tile: tileboard_core::TileId,
        mut url: String,
    ) {
        let mut submit = false;
        let mut cancel = false;
        centered_window("Tile background").show(ctx, |ui| {
            ui.label(BACKGROUND_URL_PROMPT);
            let edit = ui.add(egui::TextEdit::singleline(&mut url).desired_width(360.0));
            if edit.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                submit = true;
            }
            edit.request_focus();
            ui.add_space(8.0);
            ui.horizontal(|ui| {
                if ui.button("OK").clicked() {
                    submit = true;
                }
                if ui.button("Cancel").clicked() {
                    cancel = true;
                }
            });
        });

        if cancel {
            self.dialog = ActiveDialog::None;
        } else if submit {
            self.dialog = ActiveDialog::None;
            self.submit_background_url(tile, &url);
        } else {
            self.dialog = ActiveDialog::BackgroundUrl { tile, url };
        }
    }

    fn draw_alert(&mut self, ctx: &egui::Context, message: &str) {
        let mut dismissed = false;
        centered_window("Tileboard").show(ctx, |ui| {
            ui.label(message);
            ui.add_space(8.0);
            if ui.button("OK").clicked() {
                dismissed = true;
            }
        });
        if dismissed {
            self.dialog = ActiveDialog::None;
        }
    }
}

fn centered_window(title: &str) -> egui::Window<'static> {
    egui::Window::new(title)
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_matches_accepted_urls() {
        assert!(!BACKGROUND_URL_PROMPT.contains("data:"));
        assert!(tileboard_core::validate_image_url("http://a.com/x.png").is_ok());
        assert!(tileboard_core::validate_image_url("https://a.com/x.jpg").is_ok());
        assert!(tileboard_core::validate_image_url("data:image/png;base64,AAAA").is_err());
    }
}
