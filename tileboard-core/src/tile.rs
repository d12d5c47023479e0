use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::geometry::{Length, Point, Rect, Size, DEFAULT_TILE_HEIGHT, DEFAULT_TILE_WIDTH};

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Opaque tile identifier, stable for the lifetime of a tile.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TileId(String);

impl TileId {
    /// Mint a fresh random id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Which side of the tile the children overlay opens towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChildrenDirection {
    #[default]
    Down,
    Up,
    Left,
    Right,
}

impl ChildrenDirection {
    pub const ALL: [Self; 4] = [Self::Down, Self::Up, Self::Left, Self::Right];

    /// Parse a stored name; anything unrecognised opens downwards.
    pub fn from_name(name: &str) -> Self {
        match name.trim() {
            "up" => Self::Up,
            "left" => Self::Left,
            "right" => Self::Right,
            _ => Self::Down,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Down => "Down",
            Self::Up => "Up",
            Self::Left => "Left",
            Self::Right => "Right",
        }
    }
}

impl<'de> Deserialize<'de> for ChildrenDirection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        Ok(Self::from_name(&name))
    }
}

/// Where the children overlay takes its links from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChildrenMode {
    /// Hand-written `text|url` lines.
    #[default]
    List,
    /// Links of a bookmark folder.
    Bookmarks,
}

impl ChildrenMode {
    pub fn from_name(name: &str) -> Self {
        match name.trim() {
            "bookmarks" => Self::Bookmarks,
            _ => Self::List,
        }
    }
}

impl<'de> Deserialize<'de> for ChildrenMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        Ok(Self::from_name(&name))
    }
}

/// User-editable settings of a tile. Always rewritten as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TileOptions {
    #[serde(deserialize_with = "lenient_string")]
    pub title: String,
    pub show_title: bool,
    #[serde(deserialize_with = "lenient_string")]
    pub url: String,
    /// 0..=100.
    #[serde(deserialize_with = "lenient_opacity")]
    pub opacity: u8,
    pub parent_tile: bool,
    #[serde(alias = "parentChildrenDirection")]
    pub children_direction: ChildrenDirection,
    #[serde(alias = "parentChildren")]
    pub children_mode: ChildrenMode,
    /// Newline-separated `text|url` entries.
    #[serde(deserialize_with = "lenient_children_list")]
    pub children_list: String,
    #[serde(alias = "childrenBookmarkList", deserialize_with = "lenient_string")]
    pub children_bookmark_folder_id: String,
    /// Bumped on every options save; the overlay cache compares against it.
    #[serde(deserialize_with = "lenient_u64")]
    pub last_update: u64,
}

impl Default for TileOptions {
    fn default() -> Self {
        Self {
            title: String::new(),
            show_title: false,
            url: String::new(),
            opacity: 100,
            parent_tile: false,
            children_direction: ChildrenDirection::Down,
            children_mode: ChildrenMode::List,
            children_list: String::new(),
            children_bookmark_folder_id: String::new(),
            last_update: 0,
        }
    }
}

/// Clamp any numeric opacity into `0..=100`.
pub fn clamp_opacity(value: f64) -> u8 {
    if value.is_nan() {
        return 100;
    }
    value.round().clamp(0.0, 100.0) as u8
}

/// Next cache token: wall-clock milliseconds, but always past `previous`.
pub fn next_update_token(previous: u64) -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64;
    now.max(previous.saturating_add(1))
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

fn lenient_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(n) => n.as_u64().unwrap_or(0),
        serde_json::Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

fn lenient_opacity<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let raw = match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(raw.map(clamp_opacity).unwrap_or(100))
}

/// Older boards stored an empty array before any list was written.
fn lenient_children_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => s,
        serde_json::Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str())
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    })
}

// ---------------------------------------------------------------------------
// Persisted record
// ---------------------------------------------------------------------------

/// A tile as written to the store and to export files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileData {
    pub id: TileId,
    #[serde(default)]
    pub left: Length,
    #[serde(default)]
    pub top: Length,
    #[serde(default)]
    pub width: Length,
    #[serde(default)]
    pub height: Length,
    #[serde(default, deserialize_with = "background_uri")]
    pub background_image: Option<String>,
    #[serde(default)]
    pub options: TileOptions,
}

/// Accept both a bare data URI and a CSS `url("...")` wrapper.
pub(crate) fn background_uri<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|s| strip_css_url(&s)))
}

pub(crate) fn strip_css_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let inner = trimmed
        .strip_prefix("url(")
        .and_then(|s| s.strip_suffix(')'))
        .map(|s| s.trim().trim_matches(|c| c == '"' || c == '\''))
        .unwrap_or(trimmed);
    if inner.is_empty() || inner == "none" {
        None
    } else {
        Some(inner.to_string())
    }
}

// ---------------------------------------------------------------------------
// Live tile
// ---------------------------------------------------------------------------

/// A tile on the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    id: TileId,
    pub left: Length,
    pub top: Length,
    pub width: Length,
    pub height: Length,
    /// Data URI of the background image.
    pub background: Option<String>,
    pub options: TileOptions,
    generation: u64,
}

impl Tile {
    /// A fresh tile with its top-left corner at `pos` and default size.
    pub fn new_at(pos: Point) -> Self {
        Self {
            id: TileId::generate(),
            left: Length::Px(pos.x),
            top: Length::Px(pos.y),
            width: Length::Auto,
            height: Length::Auto,
            background: None,
            options: TileOptions::default(),
            generation: 0,
        }
    }

    pub fn from_data(data: TileData) -> Self {
        Self {
            id: data.id,
            left: data.left,
            top: data.top,
            width: data.width,
            height: data.height,
            background: data.background_image,
            options: data.options,
            generation: 0,
        }
    }

    pub fn id(&self) -> &TileId {
        &self.id
    }

    /// Token carried by background jobs; a job whose token no longer
    /// matches finished after the tile changed or was deleted.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn bump_generation(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    /// Pixel rectangle inside a canvas of the given size.
    pub fn rect(&self, canvas: Size) -> Rect {
        Rect::new(
            self.left.resolve(canvas.width, 0.0),
            self.top.resolve(canvas.height, 0.0),
            self.width.resolve(canvas.width, DEFAULT_TILE_WIDTH),
            self.height.resolve(canvas.height, DEFAULT_TILE_HEIGHT),
        )
    }

    /// Snapshot with all geometry expressed relative to `canvas`.
    ///
    /// Lengths already stored as percentages are kept verbatim so repeated
    /// saves do not accumulate the size epsilon.
    pub fn to_data(&self, canvas: Size) -> TileData {
        let rect = self.rect(canvas);
        let position = |len: Length, px: f64, container: f64| match len {
            Length::Percent(_) => len,
            _ => Length::position_percent(px, container),
        };
        let size = |len: Length, px: f64, container: f64| match len {
            Length::Percent(_) => len,
            _ => Length::size_percent(px, container),
        };
        TileData {
            id: self.id.clone(),
            left: position(self.left, rect.left, canvas.width),
            top: position(self.top, rect.top, canvas.height),
            width: size(self.width, rect.width, canvas.width),
            height: size(self.height, rect.height, canvas.height),
            background_image: self.background.clone(),
            options: self.options.clone(),
        }
    }

    /// Adopt the geometry of a persisted snapshot of this tile.
    pub(crate) fn adopt_geometry(&mut self, data: &TileData) {
        self.left = data.left;
        self.top = data.top;
        self.width = data.width;
        self.height = data.height;
    }

    /// Replace the whole options record and stamp a new cache token.
    pub fn apply_options(&mut self, mut options: TileOptions) {
        options.opacity = options.opacity.min(100);
        options.last_update = next_update_token(self.options.last_update);
        self.options = options;
    }

    /// Link target, when one is set.
    pub fn href(&self) -> Option<&str> {
        let url = self.options.url.trim();
        (!url.is_empty()).then_some(url)
    }

    /// Title if set, else the id. Used in notifications.
    pub fn display_name(&self) -> String {
        display_name(&self.options.title, &self.id)
    }

    /// `"WxH"` badge shown while editing.
    pub fn size_label(&self, canvas: Size) -> String {
        let rect = self.rect(canvas);
        format!("{}x{}", rect.width.round() as i64, rect.height.round() as i64)
    }
}

pub(crate) fn display_name(title: &str, id: &TileId) -> String {
    if title.is_empty() {
        id.to_string()
    } else {
        title.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique() {
        let a = TileId::generate();
        let b = TileId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn to_data_converts_to_percent() {
        let mut tile = Tile::new_at(Point::new(100.0, 100.0));
        tile.width = Length::Px(200.0);
        tile.height = Length::Px(150.0);
        let data = tile.to_data(Size::new(1000.0, 800.0));

        assert_eq!(data.left, Length::Percent(10.0));
        assert_eq!(data.top, Length::Percent(12.5));
        let Length::Percent(w) = data.width else {
            panic!("width should be a percentage")
        };
        let Length::Percent(h) = data.height else {
            panic!("height should be a percentage")
        };
        assert!((w - 20.00001).abs() < 1e-9);
        assert!((h - 18.75001).abs() < 1e-9);
    }

    #[test]
    fn to_data_is_stable_across_saves() {
        let canvas = Size::new(1000.0, 800.0);
        let mut tile = Tile::new_at(Point::new(100.0, 100.0));
        tile.width = Length::Px(200.0);
        let first = tile.to_data(canvas);
        let again = Tile::from_data(first.clone()).to_data(canvas);
        assert_eq!(first, again);
    }

    #[test]
    fn auto_size_persists_as_default_size() {
        let canvas = Size::new(1000.0, 500.0);
        let tile = Tile::new_at(Point::default());
        let data = tile.to_data(canvas);
        let back = Tile::from_data(data).rect(canvas);
        assert!((back.width - DEFAULT_TILE_WIDTH).abs() < 0.01);
        assert!((back.height - DEFAULT_TILE_HEIGHT).abs() < 0.01);
    }

    #[test]
    fn from_data_places_tile() {
        let data = TileData {
            id: TileId::new("t1"),
            left: Length::Percent(50.0),
            top: Length::Percent(25.0),
            width: Length::Percent(10.0),
            height: Length::Auto,
            background_image: None,
            options: TileOptions::default(),
        };
        let tile = Tile::from_data(data);
        let rect = tile.rect(Size::new(1200.0, 800.0));
        assert_eq!(rect, Rect::new(600.0, 200.0, 120.0, DEFAULT_TILE_HEIGHT));
    }

    #[test]
    fn apply_options_bumps_token() {
        let mut tile = Tile::new_at(Point::default());
        tile.options.last_update = u64::MAX / 2;
        let before = tile.options.last_update;
        tile.apply_options(TileOptions {
            title: "News".into(),
            ..TileOptions::default()
        });
        assert!(tile.options.last_update > before);
        assert_eq!(tile.options.title, "News");
    }

    #[test]
    fn legacy_options_are_accepted() {
        let json = r#"{
            "title": "Dev",
            "showTitle": true,
            "url": "https://example.com",
            "opacity": "80",
            "parentTile": true,
            "parentChildrenDirection": "left",
            "parentChildren": "bookmarks",
            "childrenBookmarkList": "toolbar_____",
            "childrenList": [],
            "lastUpdate": 412
        }"#;
        let opts: TileOptions = serde_json::from_str(json).unwrap();
        assert_eq!(opts.opacity, 80);
        assert_eq!(opts.children_direction, ChildrenDirection::Left);
        assert_eq!(opts.children_mode, ChildrenMode::Bookmarks);
        assert_eq!(opts.children_bookmark_folder_id, "toolbar_____");
        assert_eq!(opts.children_list, "");
        assert_eq!(opts.last_update, 412);
    }

    #[test]
    fn opacity_is_clamped_on_read() {
        let high: TileOptions = serde_json::from_str(r#"{"opacity": 250}"#).unwrap();
        assert_eq!(high.opacity, 100);
        let low: TileOptions = serde_json::from_str(r#"{"opacity": -4}"#).unwrap();
        assert_eq!(low.opacity, 0);
        let junk: TileOptions = serde_json::from_str(r#"{"opacity": "lots"}"#).unwrap();
        assert_eq!(junk.opacity, 100);
    }

    #[test]
    fn options_serialize_camel_case() {
        let value = serde_json::to_value(TileOptions::default()).unwrap();
        assert_eq!(value["childrenDirection"], "down");
        assert_eq!(value["childrenMode"], "list");
        assert_eq!(value["opacity"], 100);
        assert!(value.get("showTitle").is_some());
    }

    #[test]
    fn css_url_backgrounds_are_unwrapped() {
        let json = r#"{"id":"a","left":"1%","top":"2%","width":"3%","height":"4%",
            "backgroundImage":"url(\"data:image/png;base64,AAAA\")","options":{}}"#;
        let data: TileData = serde_json::from_str(json).unwrap();
        assert_eq!(
            data.background_image.as_deref(),
            Some("data:image/png;base64,AAAA")
        );
        assert_eq!(strip_css_url("none"), None);
        assert_eq!(strip_css_url(""), None);
    }

    #[test]
    fn href_ignores_blank_url() {
        let mut tile = Tile::new_at(Point::default());
        tile.options.url = "   ".into();
        assert_eq!(tile.href(), None);
        tile.options.url = " https://a.com ".into();
        assert_eq!(tile.href(), Some("https://a.com"));
    }
}
