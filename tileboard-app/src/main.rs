mod app;
mod app_dir;
mod input;
mod io_worker;
mod preferences;
mod ui;

fn main() -> eframe::Result {
    app::run()
}
