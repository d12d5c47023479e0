//! Read-only snapshot of the user's bookmark folders.
//!
//! The tree uses the WebExtension `BookmarkTreeNode` JSON shape
//! (`id`, `title`, `url`, `type`, `children`). Folders are indexed by id once
//! at startup; the root folder is always reachable as [`ROOT_FOLDER_ID`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Id under which the root of the tree is registered.
pub const ROOT_FOLDER_ID: &str = "0";

/// Id Firefox gives its root node.
const FIREFOX_ROOT_ID: &str = "root________";

const FOLDER_TYPE: &str = "folder";

/// One node of the bookmark tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookmarkNode {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// `"folder"`, `"bookmark"` or `"separator"`. Chromium omits it.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<BookmarkNode>>,
}

impl BookmarkNode {
    pub fn is_folder(&self) -> bool {
        match self.kind.as_deref() {
            Some(kind) => kind == FOLDER_TYPE,
            None => self.children.is_some(),
        }
    }

    pub fn children(&self) -> &[BookmarkNode] {
        self.children.as_deref().unwrap_or_default()
    }

    /// Fill in a missing `type` so later lookups need not guess.
    fn normalize(&mut self) {
        if self.kind.is_none() && self.children.is_some() {
            self.kind = Some(FOLDER_TYPE.to_string());
        }
        if let Some(children) = self.children.as_mut() {
            for child in children {
                child.normalize();
            }
        }
    }
}

/// An entry of the folder picker in the options panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderChoice {
    pub id: String,
    /// Title prefixed with its depth, e.g. `"~> Work"`.
    pub label: String,
}

/// Folder id → folder node, built once from the whole tree.
#[derive(Debug, Clone, Default)]
pub struct BookmarkSnapshot {
    folders: HashMap<String, BookmarkNode>,
}

impl BookmarkSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Index every folder of `tree`.
    pub fn from_tree(tree: Vec<BookmarkNode>) -> Self {
        let mut folders = HashMap::new();
        for mut node in tree {
            node.normalize();
            collect_folders(&node, &mut folders);
        }
        info!("Indexed {} bookmark folders", folders.len());
        Self { folders }
    }

    /// Parse a bookmark tree export: either an array of roots or one root.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let tree = if value.is_array() {
            serde_json::from_value::<Vec<BookmarkNode>>(value)?
        } else {
            vec![serde_json::from_value::<BookmarkNode>(value)?]
        };
        Ok(Self::from_tree(tree))
    }

    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }

    pub fn folder(&self, id: &str) -> Option<&BookmarkNode> {
        self.folders.get(id)
    }

    /// All folders below the root, depth first, for the folder picker.
    pub fn folder_choices(&self) -> Vec<FolderChoice> {
        let mut out = Vec::new();
        if let Some(root) = self.folder(ROOT_FOLDER_ID) {
            push_choices(root, 0, &mut out);
        }
        debug!("Built {} folder choices", out.len());
        out
    }
}

fn collect_folders(node: &BookmarkNode, folders: &mut HashMap<String, BookmarkNode>) {
    if node.is_folder() {
        let id = if node.id == FIREFOX_ROOT_ID {
            ROOT_FOLDER_ID.to_string()
        } else {
            node.id.clone()
        };
        folders.insert(id, node.clone());
    }
    for child in node.children() {
        collect_folders(child, folders);
    }
}

fn push_choices(folder: &BookmarkNode, depth: usize, out: &mut Vec<FolderChoice>) {
    if depth > 0 {
        out.push(FolderChoice {
            id: folder.id.clone(),
            label: format!("{}> {}", "~".repeat(depth - 1), folder.title),
        });
    }
    for child in folder.children().iter().filter(|c| c.is_folder()) {
        push_choices(child, depth + 1, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIREFOX_TREE: &str = r#"[{
        "id": "root________", "title": "", "type": "folder",
        "children": [
            { "id": "toolbar_____", "title": "Bookmarks Toolbar", "type": "folder",
              "children": [
                { "id": "b1", "title": "Rust", "type": "bookmark", "url": "https://www.rust-lang.org/" },
                { "id": "f1", "title": "Work", "type": "folder", "children": [
                    { "id": "b2", "title": "CI", "type": "bookmark", "url": "https://ci.example.com/" }
                ]},
                { "id": "s1", "title": "", "type": "separator" }
              ]},
            { "id": "menu________", "title": "Bookmarks Menu", "type": "folder", "children": [] }
        ]
    }]"#;

    const CHROME_TREE: &str = r#"[{
        "id": "0", "title": "",
        "children": [
            { "id": "1", "title": "Bookmarks bar", "children": [
                { "id": "5", "title": "Docs", "url": "https://docs.rs/" }
            ]}
        ]
    }]"#;

    #[test]
    fn firefox_root_is_aliased() {
        let snap = BookmarkSnapshot::from_json(FIREFOX_TREE).unwrap();
        assert!(snap.folder(ROOT_FOLDER_ID).is_some());
        assert!(snap.folder(FIREFOX_ROOT_ID).is_none());
        assert!(snap.folder("f1").is_some());
        assert!(snap.folder("b1").is_none());
    }

    #[test]
    fn chromium_nodes_without_type_are_classified() {
        let snap = BookmarkSnapshot::from_json(CHROME_TREE).unwrap();
        let bar = snap.folder("1").unwrap();
        assert!(bar.is_folder());
        assert!(!bar.children()[0].is_folder());
    }

    #[test]
    fn folder_choices_are_depth_prefixed() {
        let snap = BookmarkSnapshot::from_json(FIREFOX_TREE).unwrap();
        let labels: Vec<String> = snap.folder_choices().into_iter().map(|c| c.label).collect();
        assert_eq!(
            labels,
            vec!["> Bookmarks Toolbar", "~> Work", "> Bookmarks Menu"]
        );
    }

    #[test]
    fn single_root_object_is_accepted() {
        let snap = BookmarkSnapshot::from_json(r#"{"id":"0","title":"","children":[]}"#).unwrap();
        assert!(!snap.is_empty());
        assert!(snap.folder_choices().is_empty());
    }
}
