use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Instant;

use eframe::egui;
use tracing::{debug, error, info, warn};

use tileboard_core::toast::TOAST_DURATION;
use tileboard_core::{
    BookmarkSnapshot, Canvas, CoreError, DomainFavicon, FolderChoice, ImportOutcome, JsonFileStore,
    KeyValueStore, MemoryStore, MenuAction, Persistence, Point, Rect, Size, TileId, Toasts,
};
use tileboard_image::Budget;

use crate::io_worker::{spawn_io_worker, BackgroundTarget, IoRequest, IoResponse};
use crate::preferences::AppPreferences;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub(crate) const BOARD_COLOR: egui::Color32 = egui::Color32::from_rgb(32, 34, 38);
pub(crate) const TILE_CORNER_RADIUS: f32 = 4.0;
/// Options window size assumed before it has been laid out once.
const DEFAULT_OPTIONS_PANEL_SIZE: egui::Vec2 = egui::vec2(320.0, 420.0);
const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

// ---------------------------------------------------------------------------
// Transient UI state
// ---------------------------------------------------------------------------

/// An open right-click menu.
#[derive(Debug, Clone)]
pub(crate) struct ContextMenu {
    pub(crate) screen_pos: egui::Pos2,
    pub(crate) canvas_pos: Point,
    /// Tile the menu was opened on; `None` for the canvas menu.
    pub(crate) target: Option<TileId>,
    pub(crate) items: Vec<MenuAction>,
}

/// Modal dialogs that block the board while open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ActiveDialog {
    None,
    ConfirmClear,
    BackgroundUrl { tile: TileId, url: String },
    Alert(String),
}

/// A decoded background; `None` when the image could not be decoded.
pub(crate) struct CachedTexture {
    pub(crate) key: (u64, usize),
    pub(crate) texture: Option<egui::TextureHandle>,
}

// ---------------------------------------------------------------------------
// Application struct
// ---------------------------------------------------------------------------

pub(crate) struct TileboardApp {
    pub(crate) canvas: Canvas<Box<dyn KeyValueStore>>,
    pub(crate) bookmarks: BookmarkSnapshot,
    pub(crate) folder_choices: Vec<FolderChoice>,
    pub(crate) favicons: DomainFavicon,
    pub(crate) toasts: Toasts,
    pub(crate) preferences: AppPreferences,

    // I/O worker
    pub(crate) io_tx: mpsc::Sender<IoRequest>,
    pub(crate) io_rx: mpsc::Receiver<IoResponse>,

    // Layout
    /// Top-left corner of the board in screen coordinates.
    pub(crate) origin: egui::Pos2,
    pub(crate) hovered_tile: Option<TileId>,
    pub(crate) context_menu: Option<ContextMenu>,
    pub(crate) dialog: ActiveDialog,
    pub(crate) options_panel_size: egui::Vec2,
    pub(crate) overlay_sizes: HashMap<TileId, egui::Vec2>,
    /// Hover area of the overlay drawn last frame.
    pub(crate) overlay_hover: Option<(TileId, egui::Rect)>,

    // Textures
    pub(crate) background_texture: Option<CachedTexture>,
    pub(crate) tile_textures: HashMap<TileId, CachedTexture>,
}

impl TileboardApp {
    pub(crate) fn new(ctx: &egui::Context, preferences: AppPreferences) -> Self {
        let mut toasts = Toasts::new();
        let now = Instant::now();

        let storage_path = preferences.storage_path();
        let store: Box<dyn KeyValueStore> = match JsonFileStore::open(&storage_path) {
            Ok(store) => {
                info!("Using board store {}", storage_path.display());
                Box::new(store)
            }
            Err(e) => {
                error!("Cannot open {}: {e}", storage_path.display());
                toasts.show(
                    format!("Storage unavailable, changes will not be saved ({e})"),
                    preferences.toast_duration(),
                    None,
                    now,
                );
                Box::new(MemoryStore::new())
            }
        };

        let size = Size::new(
            preferences.window_width as f64,
            preferences.window_height as f64,
        );
        let mut canvas = Canvas::new(Persistence::new(store), size);
        if let Err(e) = canvas.load() {
            error!("Failed to load board: {e}");
            toasts.show(
                format!("Could not load tiles: {e}"),
                preferences.toast_duration(),
                None,
                now,
            );
        }

        let bookmarks = load_bookmarks(&preferences.bookmarks_path());
        let folder_choices = bookmarks.folder_choices();
        let favicons = DomainFavicon {
            template: preferences.favicon_service.clone(),
        };

        let repaint_ctx = ctx.clone();
        let (io_tx, io_rx) = spawn_io_worker(move || repaint_ctx.request_repaint());

        Self {
            canvas,
            bookmarks,
            folder_choices,
            favicons,
            toasts,
            preferences,
            io_tx,
            io_rx,
            origin: egui::Pos2::ZERO,
            hovered_tile: None,
            context_menu: None,
            dialog: ActiveDialog::None,
            options_panel_size: DEFAULT_OPTIONS_PANEL_SIZE,
            overlay_sizes: HashMap::new(),
            overlay_hover: None,
            background_texture: None,
            tile_textures: HashMap::new(),
        }
    }

    // -- coordinates -----------------------------------------------------

    pub(crate) fn to_canvas(&self, pos: egui::Pos2) -> Point {
        Point::new((pos.x - self.origin.x) as f64, (pos.y - self.origin.y) as f64)
    }

    pub(crate) fn to_screen(&self, rect: Rect) -> egui::Rect {
        egui::Rect::from_min_size(
            self.origin + egui::vec2(rect.left as f32, rect.top as f32),
            egui::vec2(rect.width as f32, rect.height as f32),
        )
    }

    pub(crate) fn panel_size(&self) -> Size {
        Size::new(
            self.options_panel_size.x as f64,
            self.options_panel_size.y as f64,
        )
    }

    // -- feedback --------------------------------------------------------

    /// Show a failed operation: validation problems as a blocking alert,
    /// everything else as a toast.
    pub(crate) fn report(&mut self, err: CoreError) {
        if err.is_validation() {
            self.dialog = ActiveDialog::Alert(err.to_string());
        } else {
            error!("{err}");
            self.notify(err.to_string());
        }
    }

    pub(crate) fn notify(&mut self, message: impl Into<String>) {
        self.toasts.show(
            message,
            self.preferences.toast_duration(),
            None,
            Instant::now(),
        );
    }

    /// Move notifications raised by the board into the toast slot.
    fn flush_notices(&mut self, now: Instant) {
        for notice in self.canvas.take_notices() {
            let duration = if notice.duration == TOAST_DURATION {
                self.preferences.toast_duration()
            } else {
                notice.duration
            };
            self.toasts.show(notice.message, duration, notice.action, now);
        }
    }

    // -- menu actions ----------------------------------------------------

    pub(crate) fn run_menu_action(&mut self, menu: &ContextMenu, action: MenuAction) {
        debug!("Menu action {action:?}");
        let tile = menu.target.clone();
        let result = match (action, tile) {
            (MenuAction::NewTile, _) => self.canvas.new_tile_at(menu.canvas_pos).map(|_| ()),
            (MenuAction::ClearAllTiles, _) => {
                self.dialog = ActiveDialog::ConfirmClear;
                Ok(())
            }
            (MenuAction::SetCanvasBackground, _) => {
                if let Some(path) = pick_image_file() {
                    let generation = self.canvas.begin_background_job();
                    let size = self.canvas.size();
                    self.send_io(IoRequest::LoadImageFile {
                        target: BackgroundTarget::Canvas { generation },
                        path,
                        budget: Budget::canvas(size.width as u32, size.height as u32),
                    });
                }
                Ok(())
            }
            (MenuAction::ClearCanvasBackground, _) => self.canvas.clear_background(),
            (MenuAction::Import, _) => {
                self.import_file();
                Ok(())
            }
            (MenuAction::Export, _) => {
                self.export_file();
                Ok(())
            }
            (MenuAction::TileOptions, Some(id)) => {
                let size = self.panel_size();
                self.canvas.open_options(Some(&id), size);
                Ok(())
            }
            (MenuAction::DeleteTile, Some(id)) => self.canvas.delete_tile(&id).map(|_| ()),
            (MenuAction::SetTileBackgroundFromFile, Some(id)) => {
                if let Some(path) = pick_image_file() {
                    if let Some(generation) = self.canvas.begin_tile_job(&id) {
                        self.send_io(IoRequest::LoadImageFile {
                            target: BackgroundTarget::Tile { id, generation },
                            path,
                            budget: Budget::TILE,
                        });
                    }
                }
                Ok(())
            }
            (MenuAction::SetTileBackgroundFromUrl, Some(id)) => {
                self.dialog = ActiveDialog::BackgroundUrl {
                    tile: id,
                    url: String::new(),
                };
                Ok(())
            }
            (MenuAction::ClearTileBackground, Some(id)) => self.canvas.clear_tile_background(&id),
            (_, None) => Ok(()),
        };
        if let Err(e) = result {
            self.report(e);
        }
    }

    /// Validate a URL typed into the background prompt and start the fetch.
    pub(crate) fn submit_background_url(&mut self, tile: TileId, url: &str) {
        let url = url.trim();
        if url.is_empty() {
            return;
        }
        if let Err(e) = tileboard_core::validate_image_url(url) {
            self.report(e);
            return;
        }
        if let Some(generation) = self.canvas.begin_tile_job(&tile) {
            self.send_io(IoRequest::FetchImageUrl {
                target: BackgroundTarget::Tile { id: tile, generation },
                url: url.to_string(),
                budget: Budget::TILE,
            });
        }
    }

    pub(crate) fn confirm_clear(&mut self) {
        if let Err(e) = self.canvas.clear_all_tiles(true) {
            self.report(e);
        }
    }

    fn import_file(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Tileboard export", &["json"])
            .pick_file()
        else {
            return;
        };
        let json = match std::fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to read {}: {e}", path.display());
                self.notify(format!("Could not read {}", path.display()));
                return;
            }
        };
        match self.canvas.import(&json) {
            Ok(ImportOutcome::Replaced { tiles }) => {
                self.tile_textures.clear();
                self.background_texture = None;
                self.overlay_sizes.clear();
                info!("Imported {tiles} tiles from {}", path.display());
            }
            Ok(ImportOutcome::Ignored) => debug!("Nothing to import in {}", path.display()),
            Err(e) => self.report(e),
        }
    }

    fn export_file(&mut self) {
        let json = match self.canvas.export() {
            Ok(json) => json,
            Err(e) => {
                self.report(e);
                return;
            }
        };
        let mut dialog = rfd::FileDialog::new()
            .add_filter("Tileboard export", &["json"])
            .set_file_name(tileboard_core::store::EXPORT_FILE_NAME);
        if let Some(dir) = crate::app_dir::downloads_directory() {
            dialog = dialog.set_directory(dir);
        }
        if let Some(path) = dialog.save_file() {
            self.send_io(IoRequest::WriteFile {
                path,
                content: json,
            });
        }
    }

    fn send_io(&mut self, request: IoRequest) {
        if self.io_tx.send(request).is_err() {
            error!("IO worker is gone");
            self.notify("Background work is unavailable");
        }
    }
}

// ---------------------------------------------------------------------------
// IO worker polling
// ---------------------------------------------------------------------------

impl TileboardApp {
    /// Drain finished background jobs and exports.
    fn poll_io_responses(&mut self) {
        while let Ok(resp) = self.io_rx.try_recv() {
            match resp {
                IoResponse::BackgroundReady { target, result } => {
                    self.apply_background(target, result);
                }
                IoResponse::FileWritten { path, result } => match result {
                    Ok(()) => {
                        info!("Exported board to {}", path.display());
                        self.notify(format!("Exported to {}", path.display()));
                    }
                    Err(e) => self.notify(format!("Export failed: {e}")),
                },
            }
        }
    }

    fn apply_background(&mut self, target: BackgroundTarget, result: Result<String, String>) {
        let uri = match result {
            Ok(uri) => uri,
            Err(e) => {
                warn!("Background job for {target:?} failed: {e}");
                self.notify(format!("Could not load image: {e}"));
                return;
            }
        };
        let applied = match target {
            BackgroundTarget::Canvas { generation } => self.canvas.set_background(generation, uri),
            BackgroundTarget::Tile { id, generation } => {
                self.canvas.set_tile_background(&id, generation, uri)
            }
        };
        match applied {
            Ok(true) => {}
            Ok(false) => debug!("Discarded stale background result"),
            Err(e) => self.report(e),
        }
    }

    /// Ask for another frame when a pending overlay or the toast needs one.
    fn schedule_repaint(&mut self, ctx: &egui::Context, now: Instant) {
        if let Some(delay) = self.canvas.overlays().pending_delay(now) {
            ctx.request_repaint_after(delay);
        }
        if let Some(toast) = self.toasts.current(now) {
            ctx.request_repaint_after(toast.remaining(now));
        }
    }
}

// ---------------------------------------------------------------------------
// eframe::App
// ---------------------------------------------------------------------------

impl eframe::App for TileboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();
        self.poll_io_responses();

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE.fill(BOARD_COLOR))
            .show(ctx, |ui| {
                let (rect, response) =
                    ui.allocate_exact_size(ui.available_size(), egui::Sense::click_and_drag());
                self.origin = rect.min;
                self.canvas
                    .set_size(Size::new(rect.width() as f64, rect.height() as f64));
                self.draw_board(ui, rect);
                if self.dialog == ActiveDialog::None {
                    self.handle_canvas_input(ctx, &response, now);
                }
            });

        self.draw_overlay(ctx, now);
        self.draw_context_menu(ctx);
        self.draw_options_panel(ctx);
        self.draw_dialog(ctx);
        self.handle_keyboard(ctx);

        self.flush_notices(now);
        self.draw_toast(ctx, now);
        self.schedule_repaint(ctx, now);

        if let Some(inner) = ctx.input(|i| i.viewport().inner_rect) {
            self.preferences.window_width = inner.width();
            self.preferences.window_height = inner.height();
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.preferences.save();
        info!("Saved preferences on exit");
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn pick_image_file() -> Option<PathBuf> {
    rfd::FileDialog::new()
        .add_filter("Images", &IMAGE_EXTENSIONS)
        .pick_file()
}

/// Read the bookmark tree export. A missing or unreadable file gives an
/// empty snapshot.
fn load_bookmarks(path: &std::path::Path) -> BookmarkSnapshot {
    if !path.exists() {
        debug!("No bookmark tree at {}", path.display());
        return BookmarkSnapshot::empty();
    }
    match std::fs::read_to_string(path) {
        Ok(json) => BookmarkSnapshot::from_json(&json).unwrap_or_else(|e| {
            warn!("Ignoring malformed bookmark tree {}: {e}", path.display());
            BookmarkSnapshot::empty()
        }),
        Err(e) => {
            warn!("Failed to read bookmark tree {}: {e}", path.display());
            BookmarkSnapshot::empty()
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub(crate) fn run() -> eframe::Result {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting Tileboard");

    let prefs = AppPreferences::load();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Tileboard")
            .with_inner_size([prefs.window_width, prefs.window_height]),
        ..Default::default()
    };

    eframe::run_native(
        "Tileboard",
        options,
        Box::new(move |cc| {
            egui_extras::install_image_loaders(&cc.egui_ctx);
            Ok(Box::new(TileboardApp::new(&cc.egui_ctx, prefs)))
        }),
    )
}
