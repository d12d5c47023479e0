//! Hover-revealed child links of parent tiles.
//!
//! While the board is locked, hovering a tile configured as a parent shows a
//! small panel of links next to it: either hand-written `text|url` lines or
//! the links of a bookmark folder. Built panels are cached per tile and
//! reused while the tile's `last_update` token is unchanged.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::bookmarks::BookmarkSnapshot;
use crate::capability::FaviconResolver;
use crate::geometry::{Rect, Size};
use crate::tile::{ChildrenDirection, ChildrenMode, Tile, TileId, TileOptions};

/// Overlap between the overlay's padding strip and the tile edge.
pub const OVERLAY_GAP: f64 = 10.0;

/// Delay before a freshly built overlay appears, so a pointer crossing the
/// board does not flash every overlay on its way.
pub const OVERLAY_SHOW_DELAY: Duration = Duration::from_millis(100);

/// Bookmark titles longer than this many characters are cut.
pub const MAX_BOOKMARK_TITLE: usize = 50;

/// Side length of bookmark favicons.
pub const FAVICON_SIZE: f64 = 16.0;

/// One entry of an overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayLink {
    pub text: String,
    pub href: Option<String>,
    pub icon: Option<String>,
}

/// Built contents of a tile's overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayContent {
    /// `last_update` of the options this was built from.
    pub token: u64,
    pub direction: ChildrenDirection,
    /// Icons follow the text instead of leading it.
    pub icon_trailing: bool,
    pub links: Vec<OverlayLink>,
}

impl OverlayContent {
    pub fn build(
        options: &TileOptions,
        bookmarks: &BookmarkSnapshot,
        favicons: &dyn FaviconResolver,
    ) -> Self {
        let links = match options.children_mode {
            ChildrenMode::List => parse_children_list(&options.children_list),
            ChildrenMode::Bookmarks => {
                bookmark_links(bookmarks, &options.children_bookmark_folder_id, favicons)
            }
        };
        Self {
            token: options.last_update,
            direction: options.children_direction,
            icon_trailing: options.children_direction == ChildrenDirection::Left,
            links,
        }
    }
}

/// Parse newline-separated `text|url` entries. Everything after the first
/// `|` is the link target; a line without one is plain text.
pub fn parse_children_list(list: &str) -> Vec<OverlayLink> {
    list.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let (text, href) = match line.split_once('|') {
                Some((text, href)) => (text, Some(href.trim())),
                None => (line, None),
            };
            OverlayLink {
                text: text.trim().to_string(),
                href: href.filter(|h| !h.is_empty()).map(str::to_string),
                icon: None,
            }
        })
        .collect()
}

/// Links of the bookmark folder `folder_id`. Sub-folders and separators are
/// skipped.
pub fn bookmark_links(
    bookmarks: &BookmarkSnapshot,
    folder_id: &str,
    favicons: &dyn FaviconResolver,
) -> Vec<OverlayLink> {
    let Some(folder) = bookmarks.folder(folder_id) else {
        warn!("Bookmark folder {folder_id:?} not found");
        return Vec::new();
    };
    folder
        .children()
        .iter()
        .filter(|node| node.id != folder_id && !node.is_folder())
        .filter_map(|node| {
            let url = node.url.as_ref()?;
            Some(OverlayLink {
                text: truncate_title(&node.title),
                href: Some(url.clone()),
                icon: favicons.favicon_url(url),
            })
        })
        .collect()
}

/// Cut titles over [`MAX_BOOKMARK_TITLE`] characters and mark the cut.
pub fn truncate_title(title: &str) -> String {
    if title.chars().count() > MAX_BOOKMARK_TITLE {
        let head: String = title.chars().take(MAX_BOOKMARK_TITLE).collect();
        format!("{head}...")
    } else {
        title.to_string()
    }
}

/// Where an overlay sits relative to its tile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayPlacement {
    /// Full hover area, including the padding strip overlapping the tile.
    pub outer: Rect,
    /// Where the links are drawn; flush against the tile edge.
    pub content: Rect,
}

/// Anchor an overlay of `content` size against the `direction` edge of `tile`.
pub fn place(direction: ChildrenDirection, tile: Rect, content: Size) -> OverlayPlacement {
    let (w, h) = (content.width, content.height);
    match direction {
        ChildrenDirection::Down => OverlayPlacement {
            outer: Rect::new(tile.left, tile.bottom() - OVERLAY_GAP, w, h + OVERLAY_GAP),
            content: Rect::new(tile.left, tile.bottom(), w, h),
        },
        ChildrenDirection::Up => OverlayPlacement {
            outer: Rect::new(tile.left, tile.top - h, w, h + OVERLAY_GAP),
            content: Rect::new(tile.left, tile.top - h, w, h),
        },
        ChildrenDirection::Right => OverlayPlacement {
            outer: Rect::new(tile.right() - OVERLAY_GAP, tile.top, w + OVERLAY_GAP, h),
            content: Rect::new(tile.right(), tile.top, w, h),
        },
        ChildrenDirection::Left => OverlayPlacement {
            outer: Rect::new(tile.left - w, tile.top, w + OVERLAY_GAP, h),
            content: Rect::new(tile.left - w, tile.top, w, h),
        },
    }
}

// ---------------------------------------------------------------------------
// Cache + visibility
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct ActiveOverlay {
    tile: TileId,
    visible_at: Instant,
}

/// Built overlays per tile plus the one currently shown.
#[derive(Debug, Default)]
pub struct OverlayCache {
    built: HashMap<TileId, OverlayContent>,
    active: Option<ActiveOverlay>,
    rebuilds: u64,
}

impl OverlayCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pointer entered `tile`. Returns whether an overlay is now showing or
    /// about to show.
    pub fn enter(
        &mut self,
        tile: &Tile,
        locked: bool,
        bookmarks: &BookmarkSnapshot,
        favicons: &dyn FaviconResolver,
        now: Instant,
    ) -> bool {
        if !locked || !tile.options.parent_tile {
            return false;
        }
        if self.active.as_ref().is_some_and(|a| &a.tile == tile.id()) {
            return true;
        }

        let cached = self
            .built
            .get(tile.id())
            .is_some_and(|c| c.token == tile.options.last_update);
        let visible_at = if cached {
            now
        } else {
            let content = OverlayContent::build(&tile.options, bookmarks, favicons);
            debug!("Built overlay for {} ({} links)", tile.id(), content.links.len());
            self.built.insert(tile.id().clone(), content);
            self.rebuilds += 1;
            now + OVERLAY_SHOW_DELAY
        };
        self.active = Some(ActiveOverlay {
            tile: tile.id().clone(),
            visible_at,
        });
        true
    }

    /// Pointer left `tile` (and its overlay). Hides immediately.
    pub fn leave(&mut self, tile: &TileId) {
        if self.active.as_ref().is_some_and(|a| &a.tile == tile) {
            self.active = None;
        }
    }

    pub fn hide(&mut self) {
        self.active = None;
    }

    /// The overlay currently shown, if its delay has elapsed.
    pub fn visible(&self, now: Instant) -> Option<(&TileId, &OverlayContent)> {
        let active = self.active.as_ref()?;
        if now < active.visible_at {
            return None;
        }
        let content = self.built.get(&active.tile)?;
        Some((&active.tile, content))
    }

    /// Tile whose overlay is shown or pending.
    pub fn active_tile(&self) -> Option<&TileId> {
        self.active.as_ref().map(|a| &a.tile)
    }

    /// Time until a pending overlay appears.
    pub fn pending_delay(&self, now: Instant) -> Option<Duration> {
        let active = self.active.as_ref()?;
        (active.visible_at > now).then(|| active.visible_at - now)
    }

    /// Drop everything cached for a removed tile.
    pub fn forget(&mut self, tile: &TileId) {
        self.built.remove(tile);
        self.leave(tile);
    }

    pub fn clear(&mut self) {
        self.built.clear();
        self.active = None;
    }

    /// Number of overlays built so far (cache misses).
    pub fn rebuilds(&self) -> u64 {
        self.rebuilds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::DomainFavicon;
    use crate::geometry::Point;

    fn parent_tile(list: &str) -> Tile {
        let mut tile = Tile::new_at(Point::new(0.0, 0.0));
        tile.apply_options(TileOptions {
            parent_tile: true,
            children_list: list.into(),
            ..TileOptions::default()
        });
        tile
    }

    #[test]
    fn list_parses_text_and_optional_href() {
        let links = parse_children_list("Home|http://a.com\nDocs");
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].text, "Home");
        assert_eq!(links[0].href.as_deref(), Some("http://a.com"));
        assert_eq!(links[1].text, "Docs");
        assert_eq!(links[1].href, None);
    }

    #[test]
    fn list_keeps_pipes_after_the_first() {
        let links = parse_children_list("Search|https://a.com/?q=a|b\r\n\nEmpty|");
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].href.as_deref(), Some("https://a.com/?q=a|b"));
        assert_eq!(links[1].href, None);
    }

    #[test]
    fn titles_are_truncated() {
        let long = "x".repeat(51);
        assert_eq!(truncate_title(&long), format!("{}...", "x".repeat(50)));
        assert_eq!(truncate_title(&"y".repeat(50)), "y".repeat(50));
        let wide = "é".repeat(60);
        assert_eq!(truncate_title(&wide).chars().count(), 53);
    }

    #[test]
    fn bookmark_links_skip_folders_and_separators() {
        let snap = BookmarkSnapshot::from_json(
            r#"[{"id":"0","title":"","children":[
                {"id":"7","title":"Dev","children":[
                    {"id":"8","title":"Rust","url":"https://www.rust-lang.org/"},
                    {"id":"9","title":"Nested","children":[]},
                    {"id":"10","title":"","type":"separator"}
                ]}
            ]}]"#,
        )
        .unwrap();
        let links = bookmark_links(&snap, "7", &DomainFavicon::default());
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].text, "Rust");
        assert_eq!(
            links[0].icon.as_deref(),
            Some("http://www.google.com/s2/favicons?domain=www.rust-lang.org")
        );
        assert!(bookmark_links(&snap, "missing", &DomainFavicon::default()).is_empty());
    }

    #[test]
    fn placement_is_flush_with_tile_edge() {
        let tile = Rect::new(100.0, 100.0, 50.0, 40.0);
        let size = Size::new(80.0, 60.0);

        let down = place(ChildrenDirection::Down, tile, size);
        assert_eq!(down.content.top, tile.bottom());
        assert_eq!(down.outer.top, tile.bottom() - OVERLAY_GAP);

        let up = place(ChildrenDirection::Up, tile, size);
        assert_eq!(up.content.bottom(), tile.top);
        assert_eq!(up.outer.bottom(), tile.top + OVERLAY_GAP);

        let right = place(ChildrenDirection::Right, tile, size);
        assert_eq!(right.content.left, tile.right());
        assert_eq!(right.outer.left, tile.right() - OVERLAY_GAP);

        let left = place(ChildrenDirection::Left, tile, size);
        assert_eq!(left.content.right(), tile.left);
        assert_eq!(left.outer.right(), tile.left + OVERLAY_GAP);
    }

    #[test]
    fn overlay_only_in_locked_mode_for_parents() {
        let snap = BookmarkSnapshot::empty();
        let fav = DomainFavicon::default();
        let now = Instant::now();
        let mut cache = OverlayCache::new();

        let tile = parent_tile("A|http://a");
        assert!(!cache.enter(&tile, false, &snap, &fav, now));

        let plain = Tile::new_at(Point::default());
        assert!(!cache.enter(&plain, true, &snap, &fav, now));
        assert!(cache.enter(&tile, true, &snap, &fav, now));
    }

    #[test]
    fn overlay_appears_after_delay_and_hides_on_leave() {
        let snap = BookmarkSnapshot::empty();
        let fav = DomainFavicon::default();
        let now = Instant::now();
        let mut cache = OverlayCache::new();
        let tile = parent_tile("A|http://a");

        cache.enter(&tile, true, &snap, &fav, now);
        assert!(cache.visible(now).is_none());
        assert_eq!(cache.pending_delay(now), Some(OVERLAY_SHOW_DELAY));
        assert!(cache.visible(now + OVERLAY_SHOW_DELAY).is_some());

        cache.leave(tile.id());
        assert!(cache.visible(now + OVERLAY_SHOW_DELAY).is_none());
    }

    #[test]
    fn cache_reused_until_options_change() {
        let snap = BookmarkSnapshot::empty();
        let fav = DomainFavicon::default();
        let now = Instant::now();
        let mut cache = OverlayCache::new();
        let mut tile = parent_tile("A|http://a");

        cache.enter(&tile, true, &snap, &fav, now);
        cache.leave(tile.id());
        cache.enter(&tile, true, &snap, &fav, now);
        assert_eq!(cache.rebuilds(), 1);
        // Cache hits show straight away.
        assert!(cache.visible(now).is_some());

        let mut opts = tile.options.clone();
        opts.children_list = "B|http://b".into();
        tile.apply_options(opts);
        cache.leave(tile.id());
        cache.enter(&tile, true, &snap, &fav, now);
        assert_eq!(cache.rebuilds(), 2);
        let (_, content) = cache.visible(now + OVERLAY_SHOW_DELAY).unwrap();
        assert_eq!(content.links[0].text, "B");
    }

    #[test]
    fn entering_another_tile_hides_the_first() {
        let snap = BookmarkSnapshot::empty();
        let fav = DomainFavicon::default();
        let now = Instant::now();
        let mut cache = OverlayCache::new();
        let a = parent_tile("A");
        let b = parent_tile("B");

        cache.enter(&a, true, &snap, &fav, now);
        cache.enter(&b, true, &snap, &fav, now);
        assert_eq!(cache.active_tile(), Some(b.id()));
    }

    #[test]
    fn left_direction_puts_icons_after_text() {
        let opts = TileOptions {
            children_direction: ChildrenDirection::Left,
            ..TileOptions::default()
        };
        let content =
            OverlayContent::build(&opts, &BookmarkSnapshot::empty(), &DomainFavicon::default());
        assert!(content.icon_trailing);
    }
}
