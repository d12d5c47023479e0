pub mod bookmarks;
pub mod canvas;
pub mod capability;
pub mod error;
pub mod geometry;
pub mod interaction;
pub mod options;
pub mod overlay;
pub mod store;
pub mod tile;
pub mod toast;

// Re-export primary types for convenience.
pub use bookmarks::{BookmarkNode, BookmarkSnapshot, FolderChoice};
pub use canvas::{canvas_menu_items, tile_menu_items, Canvas, MenuAction, Notice};
pub use capability::{validate_image_url, DomainFavicon, FaviconResolver};
pub use error::{CoreError, StorageError};
pub use geometry::{Length, Point, Rect, Size, SNAP};
pub use interaction::{PointerButton, WheelModifiers};
pub use options::{OptionsForm, OptionsPanel};
pub use overlay::{OverlayCache, OverlayContent, OverlayLink};
pub use store::{ImportOutcome, JsonFileStore, KeyValueStore, MemoryStore, Persistence};
pub use tile::{ChildrenDirection, ChildrenMode, Tile, TileData, TileId, TileOptions};
pub use toast::{Toast, ToastAction, Toasts};

/// Convenience result type for the core crate.
pub type Result<T> = std::result::Result<T, CoreError>;
