use tileboard_core::{
    Canvas, ImportOutcome, JsonFileStore, Length, MemoryStore, Persistence, Point, PointerButton,
    Size, WheelModifiers,
};

const CANVAS: Size = Size::new(1000.0, 800.0);
const PANEL: Size = Size::new(300.0, 400.0);

fn board() -> Canvas<MemoryStore> {
    Canvas::new(Persistence::new(MemoryStore::new()), CANVAS)
}

fn percent(len: Length) -> f64 {
    match len {
        Length::Percent(p) => p,
        other => panic!("expected a percentage, got {other:?}"),
    }
}

#[test]
fn resized_tile_is_persisted_relative_to_canvas() {
    let mut b = board();
    let id = b.new_tile_at(Point::new(100.0, 100.0)).unwrap();
    let over = Point::new(105.0, 105.0);
    let grow = WheelModifiers { shift: true, ctrl: false };
    let height_only = WheelModifiers { shift: true, ctrl: true };

    // 100x100 -> 200x200 -> 200x150
    for _ in 0..10 {
        assert!(b.wheel(over, -1.0, grow).unwrap());
    }
    for _ in 0..5 {
        assert!(b.wheel(over, 1.0, height_only).unwrap());
    }

    let stored = b.persistence().load_all().unwrap();
    let data = &stored.tiles[&id];
    assert_eq!(percent(data.left), 10.0);
    assert_eq!(percent(data.top), 12.5);
    assert!((percent(data.width) - 20.00001).abs() < 1e-9);
    assert!((percent(data.height) - 18.75001).abs() < 1e-9);
    assert_eq!(b.size_badge(&id).as_deref(), Some("200x150"));
}

#[test]
fn delete_then_undo_restores_tile() {
    let mut b = board();
    let id = b.new_tile_at(Point::new(240.0, 310.0)).unwrap();
    assert!(b.open_options(Some(&id), PANEL));
    {
        let form = &mut b.options_panel_mut().unwrap().form;
        form.title = "Calendar".into();
        form.url = "https://calendar.example.com".into();
        form.opacity = 65;
        form.parent_tile = true;
        form.children_list = "Week|https://calendar.example.com/week".into();
    }
    b.save_options().unwrap();
    let before = b.tile(&id).unwrap().to_data(CANVAS);

    b.press(Point::new(250.0, 320.0), PointerButton::Secondary);
    assert_eq!(b.delete_selected().unwrap(), Some(id.clone()));
    assert!(b.tile(&id).is_none());
    assert!(b.persistence().load_all().unwrap().tiles.is_empty());

    assert_eq!(b.undo_delete().unwrap(), Some(id.clone()));
    let after = b.tile(&id).unwrap().to_data(CANVAS);
    assert_eq!(before, after);
    assert_eq!(b.persistence().load_all().unwrap().tiles[&id], after);
    let notices = b.take_notices();
    assert_eq!(notices.last().unwrap().message, "Restored Calendar");
}

#[test]
fn options_save_is_visible_on_reopen() {
    let mut b = board();
    let id = b.new_tile_at(Point::default()).unwrap();
    b.open_options(Some(&id), PANEL);
    b.options_panel_mut().unwrap().form.title = "Inbox".into();
    b.options_panel_mut().unwrap().form.show_title = true;
    b.save_options().unwrap();

    b.open_options(Some(&id), PANEL);
    let form = &b.options_panel().unwrap().form;
    assert_eq!(form.title, "Inbox");
    assert!(form.show_title);
}

#[test]
fn dragged_tile_lands_on_grid() {
    let mut b = board();
    let id = b.new_tile_at(Point::new(100.0, 100.0)).unwrap();
    b.press(Point::new(130.0, 140.0), PointerButton::Primary);
    b.drag_to(Point::new(377.0, 263.0));
    b.release().unwrap();

    // (377 - 30) / 10 rounds to 35; (263 - 40) / 10 rounds to 22.
    let rect = b.tile(&id).unwrap().rect(CANVAS);
    assert!((rect.left - 350.0).abs() < 1e-9);
    assert!((rect.top - 220.0).abs() < 1e-9);
}

#[test]
fn import_replaces_board() {
    let mut source = board();
    let id = source.new_tile_at(Point::new(500.0, 400.0)).unwrap();
    let json = source.export().unwrap();

    let mut target = board();
    target.new_tile_at(Point::default()).unwrap();
    let outcome = target.import(&json).unwrap();
    assert_eq!(outcome, ImportOutcome::Replaced { tiles: 1 });
    assert_eq!(target.tiles().len(), 1);
    assert!(target.tile(&id).is_some());
}

#[test]
fn empty_array_import_changes_nothing() {
    let mut b = board();
    b.new_tile_at(Point::default()).unwrap();
    assert_eq!(b.import("[]").unwrap(), ImportOutcome::Ignored);
    assert_eq!(b.tiles().len(), 1);
}

#[test]
fn non_export_objects_do_not_wipe_the_board() {
    let mut b = board();
    let id = b.new_tile_at(Point::default()).unwrap();
    for doc in ["[{}]", r#"[{"foo": 1}]"#, r#"[{"tiles": [1, 2]}]"#] {
        assert_eq!(b.import(doc).unwrap(), ImportOutcome::Ignored, "{doc}");
        assert!(b.tile(&id).is_some());
    }
    assert_eq!(b.persistence().load_all().unwrap().tiles.len(), 1);
}

#[test]
fn export_import_of_empty_board_stays_empty() {
    let mut b = board();
    let json = b.export().unwrap();
    b.import(&json).unwrap();
    assert!(b.tiles().is_empty());
    assert!(b.background().is_none());
}

#[test]
fn legacy_export_is_accepted_and_clamped() {
    let legacy = r#"[{
        "tiles": {
            "t1": {
                "id": "t1", "left": "10%", "top": "20%", "width": "5%", "height": "",
                "backgroundImage": "url(\"data:image/png;base64,AAAA\")",
                "options": {
                    "title": "Old", "opacity": "250",
                    "parentTile": true, "parentChildrenDirection": "right",
                    "parentChildren": "bookmarks", "childrenList": [],
                    "childrenBookmarkList": "42"
                }
            }
        },
        "canvas": { "backgroundImage": null }
    }]"#;
    let mut b = board();
    b.import(legacy).unwrap();
    let tile = &b.tiles()[0];
    assert_eq!(tile.options.opacity, 100);
    assert_eq!(tile.options.children_bookmark_folder_id, "42");
    assert_eq!(tile.background.as_deref(), Some("data:image/png;base64,AAAA"));
    assert_eq!(tile.rect(CANVAS).height, 100.0);
}

#[test]
fn board_survives_reopening_the_file_store() {
    let dir = std::env::temp_dir().join(format!("tileboard-it-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("storage.json");
    let _ = std::fs::remove_file(&path);

    let id = {
        let store = JsonFileStore::open(&path).unwrap();
        let mut b = Canvas::new(Persistence::new(store), CANVAS);
        b.load().unwrap();
        b.new_tile_at(Point::new(200.0, 200.0)).unwrap()
    };

    // A different window size keeps the tile at the same relative spot.
    let store = JsonFileStore::open(&path).unwrap();
    let mut b = Canvas::new(Persistence::new(store), Size::new(500.0, 400.0));
    b.load().unwrap();
    let rect = b.tile(&id).unwrap().rect(b.size());
    assert_eq!((rect.left, rect.top), (100.0, 100.0));

    std::fs::remove_dir_all(&dir).ok();
}
