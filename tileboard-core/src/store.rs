//! Persistence adapter over a flat key-value store.
//!
//! The store holds two top-level keys: `tiles` (tile id → [`TileData`]) and
//! `canvas` ([`CanvasData`]). Tile writes are read-modify-write merges into
//! the `tiles` map with last-writer-wins semantics.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::StorageError;
use crate::tile::{TileData, TileId};

pub const TILES_KEY: &str = "tiles";
pub const CANVAS_KEY: &str = "canvas";

/// File name offered when exporting a board.
pub const EXPORT_FILE_NAME: &str = "tiles.json";

// ---------------------------------------------------------------------------
// Key-value backends
// ---------------------------------------------------------------------------

/// Minimal key-value capability the board persists through.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;

    fn set(&mut self, key: &str, value: Value) -> Result<(), StorageError>;

    /// Write several keys. Backends that can should apply them atomically.
    fn set_many(&mut self, entries: Vec<(String, Value)>) -> Result<(), StorageError> {
        for (key, value) in entries {
            self.set(&key, value)?;
        }
        Ok(())
    }

    /// Remove every key.
    fn clear(&mut self) -> Result<(), StorageError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Box<T> {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn set_many(&mut self, entries: Vec<(String, Value)>) -> Result<(), StorageError> {
        (**self).set_many(entries)
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        (**self).clear()
    }
}

/// Volatile store, used for tests and when no storage file is writable.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        self.entries.clear();
        Ok(())
    }
}

/// Store backed by a single JSON object on disk.
///
/// Every write goes to a sibling temp file which is then renamed over the
/// original, so a failed write leaves the previous contents intact. The
/// in-memory copy only changes once the rename succeeded.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: Map<String, Value>,
}

impl JsonFileStore {
    /// Open (or lazily create) the store at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let entries = if path.exists() {
            let text = fs::read_to_string(&path)?;
            if text.trim().is_empty() {
                Map::new()
            } else {
                match serde_json::from_str::<Value>(&text) {
                    Ok(Value::Object(map)) => map,
                    Ok(_) => {
                        return Err(StorageError::Corrupt {
                            reason: format!("{} is not a JSON object", path.display()),
                        })
                    }
                    Err(e) => {
                        return Err(StorageError::Corrupt {
                            reason: format!("{}: {e}", path.display()),
                        })
                    }
                }
            }
        } else {
            debug!("No storage file at {}, starting empty", path.display());
            Map::new()
        };
        info!("Opened storage {} ({} keys)", path.display(), entries.len());
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&mut self, next: Map<String, Value>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let text = serde_json::to_string(&next).map_err(|e| StorageError::Corrupt {
            reason: e.to_string(),
        })?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &self.path)?;
        self.entries = next;
        debug!("Wrote storage file {}", self.path.display());
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), StorageError> {
        let mut next = self.entries.clone();
        next.insert(key.to_string(), value);
        self.write(next)
    }

    fn set_many(&mut self, entries: Vec<(String, Value)>) -> Result<(), StorageError> {
        let mut next = self.entries.clone();
        next.extend(entries);
        self.write(next)
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        self.write(Map::new())
    }
}

// ---------------------------------------------------------------------------
// Typed records
// ---------------------------------------------------------------------------

/// Board-wide settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasData {
    #[serde(default, deserialize_with = "crate::tile::background_uri")]
    pub background_image: Option<String>,
}

/// Everything the store holds, decoded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredState {
    pub tiles: BTreeMap<TileId, TileData>,
    pub canvas: CanvasData,
}

/// The single element of an export document.
#[derive(Serialize)]
struct ExportEntry<'a> {
    tiles: BTreeMap<&'a str, &'a TileData>,
    canvas: &'a CanvasData,
}

/// What an import did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    /// The store was replaced; the view must reload.
    Replaced { tiles: usize },
    /// The document was empty or not an export; nothing changed.
    Ignored,
}

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

/// Typed load/save of tiles and canvas settings on top of a [`KeyValueStore`].
pub struct Persistence<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> Persistence<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Decode the whole store. Entries that fail to decode are skipped.
    pub fn load_all(&self) -> crate::Result<StoredState> {
        let tiles = decode_tiles(self.store.get(TILES_KEY)?.unwrap_or(Value::Null));
        let canvas = match self.store.get(CANVAS_KEY)? {
            Some(value) => serde_json::from_value(value).unwrap_or_else(|e| {
                warn!("Ignoring malformed canvas settings: {e}");
                CanvasData::default()
            }),
            None => CanvasData::default(),
        };
        debug!("Loaded {} tiles from storage", tiles.len());
        Ok(StoredState { tiles, canvas })
    }

    /// Merge one tile into the stored map.
    pub fn save_tile(&mut self, tile: &TileData) -> crate::Result<()> {
        let mut tiles = self.raw_tiles()?;
        tiles.insert(tile.id.to_string(), serde_json::to_value(tile)?);
        self.store.set(TILES_KEY, Value::Object(tiles))?;
        debug!("Saved tile {}", tile.id);
        Ok(())
    }

    pub fn delete_tile(&mut self, id: &TileId) -> crate::Result<()> {
        let mut tiles = self.raw_tiles()?;
        if tiles.remove(id.as_str()).is_some() {
            self.store.set(TILES_KEY, Value::Object(tiles))?;
            debug!("Deleted tile {id}");
        }
        Ok(())
    }

    pub fn save_canvas(&mut self, canvas: &CanvasData) -> crate::Result<()> {
        self.store.set(CANVAS_KEY, serde_json::to_value(canvas)?)?;
        debug!("Saved canvas settings");
        Ok(())
    }

    /// Wipe the entire store.
    pub fn clear_all(&mut self) -> crate::Result<()> {
        self.store.clear()?;
        info!("Cleared storage");
        Ok(())
    }

    /// Drop every tile and rewrite the canvas settings in one store write.
    pub fn reset(&mut self, canvas: &CanvasData) -> crate::Result<()> {
        self.store.set_many(vec![
            (TILES_KEY.to_string(), Value::Object(Map::new())),
            (CANVAS_KEY.to_string(), serde_json::to_value(canvas)?),
        ])?;
        info!("Removed all tiles from storage");
        Ok(())
    }

    /// Serialize the store as a downloadable export document.
    pub fn export_all(&self) -> crate::Result<String> {
        let state = self.load_all()?;
        let entry = ExportEntry {
            tiles: state.tiles.iter().map(|(id, t)| (id.as_str(), t)).collect(),
            canvas: &state.canvas,
        };
        info!("Exported {} tiles", state.tiles.len());
        Ok(serde_json::to_string(&[entry])?)
    }

    /// Replace the store from an export document.
    ///
    /// Accepts `[{"tiles": {...}, "canvas": {...}}]`, where a missing
    /// `canvas` means no background. Anything else (including `[]` and
    /// entries without a `tiles` object) leaves the store untouched.
    pub fn import_all(&mut self, json: &str) -> crate::Result<ImportOutcome> {
        let doc: Value = serde_json::from_str(json)?;
        let Some(first) = doc.as_array().and_then(|items| items.first()) else {
            debug!("Import document empty or not an array, ignoring");
            return Ok(ImportOutcome::Ignored);
        };
        let Some(first) = first.as_object() else {
            debug!("Import entry is not an object, ignoring");
            return Ok(ImportOutcome::Ignored);
        };
        let Some(raw_tiles) = first.get(TILES_KEY).filter(|t| t.is_object()) else {
            debug!("Import entry has no tiles map, ignoring");
            return Ok(ImportOutcome::Ignored);
        };

        let tiles = decode_tiles(raw_tiles.clone());
        let canvas: CanvasData = first
            .get(CANVAS_KEY)
            .cloned()
            .map(serde_json::from_value)
            .transpose()
            .unwrap_or_else(|e| {
                warn!("Ignoring malformed imported canvas settings: {e}");
                None
            })
            .unwrap_or_default();

        let mut tile_map = Map::new();
        for (id, tile) in &tiles {
            tile_map.insert(id.to_string(), serde_json::to_value(tile)?);
        }
        self.store.set_many(vec![
            (TILES_KEY.to_string(), Value::Object(tile_map)),
            (CANVAS_KEY.to_string(), serde_json::to_value(&canvas)?),
        ])?;
        info!("Imported {} tiles", tiles.len());
        Ok(ImportOutcome::Replaced { tiles: tiles.len() })
    }

    fn raw_tiles(&self) -> crate::Result<Map<String, Value>> {
        Ok(match self.store.get(TILES_KEY)? {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        })
    }
}

/// Decode a stored `tiles` value, keyed by tile id. Bad entries are dropped.
fn decode_tiles(value: Value) -> BTreeMap<TileId, TileData> {
    let Value::Object(map) = value else {
        return BTreeMap::new();
    };
    let mut tiles = BTreeMap::new();
    for (key, entry) in map {
        match serde_json::from_value::<TileData>(entry) {
            Ok(mut tile) => {
                if tile.id.as_str().is_empty() {
                    tile.id = TileId::new(key);
                }
                tiles.insert(tile.id.clone(), tile);
            }
            Err(e) => warn!("Skipping malformed tile {key}: {e}"),
        }
    }
    tiles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Length;
    use serde_json::json;
    use crate::tile::TileOptions;

    fn tile(id: &str, title: &str) -> TileData {
        TileData {
            id: TileId::new(id),
            left: Length::Percent(10.0),
            top: Length::Percent(20.0),
            width: Length::Percent(5.0),
            height: Length::Percent(5.0),
            background_image: None,
            options: TileOptions {
                title: title.into(),
                ..TileOptions::default()
            },
        }
    }

    #[test]
    fn save_tile_merges() {
        let mut p = Persistence::new(MemoryStore::new());
        p.save_tile(&tile("a", "A")).unwrap();
        p.save_tile(&tile("b", "B")).unwrap();
        p.save_tile(&tile("a", "A2")).unwrap();

        let state = p.load_all().unwrap();
        assert_eq!(state.tiles.len(), 2);
        assert_eq!(state.tiles[&TileId::new("a")].options.title, "A2");
    }

    #[test]
    fn delete_tile_removes_one_entry() {
        let mut p = Persistence::new(MemoryStore::new());
        p.save_tile(&tile("a", "A")).unwrap();
        p.save_tile(&tile("b", "B")).unwrap();
        p.delete_tile(&TileId::new("a")).unwrap();
        p.delete_tile(&TileId::new("missing")).unwrap();

        let state = p.load_all().unwrap();
        assert_eq!(state.tiles.keys().cloned().collect::<Vec<_>>(), vec![TileId::new("b")]);
    }

    #[test]
    fn canvas_round_trip_and_clear() {
        let mut p = Persistence::new(MemoryStore::new());
        let canvas = CanvasData {
            background_image: Some("data:image/jpeg;base64,AA==".into()),
        };
        p.save_canvas(&canvas).unwrap();
        p.save_tile(&tile("a", "A")).unwrap();
        assert_eq!(p.load_all().unwrap().canvas, canvas);

        p.clear_all().unwrap();
        assert_eq!(p.load_all().unwrap(), StoredState::default());
        assert!(p.store().is_empty());
    }

    #[test]
    fn reset_keeps_only_canvas() {
        let mut p = Persistence::new(MemoryStore::new());
        p.save_tile(&tile("a", "A")).unwrap();
        let canvas = CanvasData {
            background_image: Some("data:image/png;base64,AA==".into()),
        };
        p.reset(&canvas).unwrap();

        let state = p.load_all().unwrap();
        assert!(state.tiles.is_empty());
        assert_eq!(state.canvas, canvas);
    }

    #[test]
    fn import_without_canvas_clears_background() {
        let mut p = Persistence::new(MemoryStore::new());
        p.save_canvas(&CanvasData {
            background_image: Some("data:image/png;base64,AA==".into()),
        })
        .unwrap();
        let outcome = p.import_all(r#"[{"tiles": {}}]"#).unwrap();
        assert_eq!(outcome, ImportOutcome::Replaced { tiles: 0 });
        assert_eq!(p.load_all().unwrap().canvas, CanvasData::default());
    }

    #[test]
    fn export_shape() {
        let mut p = Persistence::new(MemoryStore::new());
        p.save_tile(&tile("a", "A")).unwrap();
        let doc: Value = serde_json::from_str(&p.export_all().unwrap()).unwrap();
        let items = doc.as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["tiles"]["a"]["options"]["title"], "A");
        assert_eq!(items[0]["tiles"]["a"]["left"], "10%");
        assert!(items[0]["canvas"]["backgroundImage"].is_null());
    }

    #[test]
    fn import_replaces_store() {
        let mut source = Persistence::new(MemoryStore::new());
        source.save_tile(&tile("x", "X")).unwrap();
        let exported = source.export_all().unwrap();

        let mut target = Persistence::new(MemoryStore::new());
        target.save_tile(&tile("old", "Old")).unwrap();
        let outcome = target.import_all(&exported).unwrap();

        assert_eq!(outcome, ImportOutcome::Replaced { tiles: 1 });
        let state = target.load_all().unwrap();
        assert!(state.tiles.contains_key(&TileId::new("x")));
        assert!(!state.tiles.contains_key(&TileId::new("old")));
    }

    #[test]
    fn import_of_other_shapes_is_a_no_op() {
        let mut p = Persistence::new(MemoryStore::new());
        p.save_tile(&tile("keep", "Keep")).unwrap();
        for doc in [
            "[]",
            "{}",
            "[1]",
            "\"tiles\"",
            "null",
            "[{}]",
            r#"[{"foo": 1}]"#,
            r#"[{"tiles": []}]"#,
            r#"[{"tiles": [1, 2], "canvas": {}}]"#,
        ] {
            assert_eq!(p.import_all(doc).unwrap(), ImportOutcome::Ignored, "{doc}");
        }
        assert!(p.load_all().unwrap().tiles.contains_key(&TileId::new("keep")));
        assert!(p.import_all("not json").is_err());
    }

    #[test]
    fn malformed_tiles_are_skipped() {
        let mut store = MemoryStore::new();
        store
            .set(
                TILES_KEY,
                json!({
                    "good": { "id": "good", "left": "1%", "top": "1%", "width": "", "height": "" },
                    "bad": { "id": "bad", "left": "sideways" },
                }),
            )
            .unwrap();
        let p = Persistence::new(store);
        let state = p.load_all().unwrap();
        assert_eq!(state.tiles.len(), 1);
        assert!(state.tiles.contains_key(&TileId::new("good")));
    }

    #[test]
    fn file_store_persists_across_reopen() {
        let dir = std::env::temp_dir().join("tileboard_test_file_store");
        let _ = fs::remove_dir_all(&dir);
        let path = dir.join("storage.json");

        {
            let mut p = Persistence::new(JsonFileStore::open(&path).unwrap());
            p.save_tile(&tile("a", "A")).unwrap();
        }
        let p = Persistence::new(JsonFileStore::open(&path).unwrap());
        assert_eq!(p.load_all().unwrap().tiles.len(), 1);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn file_store_rejects_corrupt_file() {
        let dir = std::env::temp_dir().join("tileboard_test_corrupt_store");
        let _ = fs::create_dir_all(&dir);
        let path = dir.join("storage.json");
        fs::write(&path, "[1, 2").unwrap();
        assert!(matches!(
            JsonFileStore::open(&path),
            Err(StorageError::Corrupt { .. })
        ));
        let _ = fs::remove_dir_all(&dir);
    }
}
