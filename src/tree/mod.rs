//! Folder/note tree model behind the sidebar.
//!
//! Nodes are addressed by their slash-delimited path; the root is `""`.
//! The model owns no DOM and performs no I/O: [`Navigator`] drives loads
//! and the sidebar renders [`FolderTree::visible_rows`].

mod navigator;

pub(crate) use navigator::{ChildrenSource, Navigator};

use crate::api::{encode_path, ApiResult};
use crate::models::ChildDescriptor;
use std::collections::{HashMap, HashSet};

pub(crate) const ROOT_PATH: &str = "";

/// Trim whitespace and stray slashes; collapse empty segments.
pub(crate) fn normalize_path(path: &str) -> String {
    path.trim()
        .split('/')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// `"a/b/c"` -> `["a", "a/b", "a/b/c"]`. The root has no prefixes.
pub(crate) fn ancestor_prefixes(path: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        if !current.is_empty() {
            current.push('/');
        }
        current.push_str(segment);
        out.push(current.clone());
    }
    out
}

pub(crate) fn parent_path(path: &str) -> &str {
    path.rsplit_once('/').map(|(head, _)| head).unwrap_or(ROOT_PATH)
}

pub(crate) fn name_from_path(path: &str) -> &str {
    path.rsplit_once('/').map(|(_, tail)| tail).unwrap_or(path)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum NodeKind {
    Folder,
    Note,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum LoadState {
    NotLoaded,
    Loading,
    Loaded,
    /// Last fetch failed; the message is shown in place of the children.
    Failed(String),
}

#[derive(Clone, Debug)]
pub(crate) struct TreeNode {
    pub path: String,
    pub name: String,
    pub kind: NodeKind,
    pub has_children: bool,
    pub load_state: LoadState,
    pub expanded: bool,
    /// Child paths in server order. Only populated once `Loaded`.
    pub children: Vec<String>,
}

impl TreeNode {
    fn root() -> Self {
        Self {
            path: ROOT_PATH.to_string(),
            name: String::new(),
            kind: NodeKind::Folder,
            has_children: true,
            load_state: LoadState::NotLoaded,
            expanded: false,
            children: Vec::new(),
        }
    }

    fn from_descriptor(path: String, d: &ChildDescriptor) -> Self {
        let kind = if d.is_note {
            NodeKind::Note
        } else {
            NodeKind::Folder
        };
        let name = if d.name.trim().is_empty() {
            name_from_path(&path).to_string()
        } else {
            d.name.clone()
        };

        Self {
            has_children: kind == NodeKind::Folder && d.has_children,
            path,
            name,
            kind,
            load_state: LoadState::NotLoaded,
            expanded: false,
            children: Vec::new(),
        }
    }

    pub fn is_folder(&self) -> bool {
        self.kind == NodeKind::Folder
    }

    /// Link target: folders open their category page, notes their view page.
    pub fn href(&self) -> String {
        match self.kind {
            NodeKind::Folder => format!("/category/{}", encode_path(&self.path)),
            NodeKind::Note => {
                let title = urlencoding::encode(self.name.trim()).into_owned();
                let folder = parent_path(&self.path);
                if folder.is_empty() {
                    format!("/view/{title}")
                } else {
                    format!("/view/{title}?folder={}", urlencoding::encode(folder))
                }
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum TreeError {
    NotFound(String),
    NotAFolder(String),
    LoadFailed { path: String, message: String },
}

impl std::fmt::Display for TreeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TreeError::NotFound(p) => write!(f, "no tree node at {p:?}"),
            TreeError::NotAFolder(p) => write!(f, "{p:?} is not a folder"),
            TreeError::LoadFailed { path, message } => {
                write!(f, "loading children of {path:?} failed: {message}")
            }
        }
    }
}

impl std::error::Error for TreeError {}

/// What a load request should do, decided under a single borrow of the tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum LoadStart {
    /// Issue the fetch; the node is now `Loading`.
    Fetch,
    /// Another fetch for this node is outstanding.
    InFlight,
    /// Children are already loaded.
    Ready,
}

/// Outcome of a toggle request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TogglePlan {
    Missing,
    /// Notes, childless folders and the root have no expand control.
    Inert,
    /// A fetch is in flight; the request is ignored.
    Busy,
    Collapsed,
    Expanded,
    /// Children must be fetched before the node can open.
    Load,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Placeholder {
    Loading,
    Empty,
    Error(String),
}

impl Placeholder {
    pub fn label(&self) -> &str {
        match self {
            Placeholder::Loading => "Loading...",
            Placeholder::Empty => "No subfolders",
            Placeholder::Error(_) => "Error loading folders",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct NodeRow {
    pub path: String,
    pub name: String,
    pub kind: NodeKind,
    pub depth: usize,
    /// Draw an expand control.
    pub expandable: bool,
    pub expanded: bool,
    pub loading: bool,
    pub active: bool,
    pub href: String,
}

/// One visible line of the sidebar.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum TreeRow {
    Node(NodeRow),
    Placeholder { depth: usize, placeholder: Placeholder },
}

#[derive(Clone, Debug)]
pub(crate) struct FolderTree {
    nodes: HashMap<String, TreeNode>,
    active: Option<String>,
}

impl Default for FolderTree {
    fn default() -> Self {
        Self::new()
    }
}

impl FolderTree {
    pub fn new() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(ROOT_PATH.to_string(), TreeNode::root());
        Self {
            nodes,
            active: None,
        }
    }

    pub fn get(&self, path: &str) -> Option<&TreeNode> {
        self.nodes.get(path)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Mark `path` active, replacing any previous active node.
    ///
    /// Returns false (and clears the marker) when `path` is the root or unknown.
    pub fn set_active(&mut self, path: &str) -> bool {
        if path.is_empty() || !self.nodes.contains_key(path) {
            self.active = None;
            return false;
        }
        self.active = Some(path.to_string());
        true
    }

    pub fn children_of(&self, path: &str) -> Vec<&TreeNode> {
        self.nodes
            .get(path)
            .map(|n| {
                n.children
                    .iter()
                    .filter_map(|c| self.nodes.get(c))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn begin_load(&mut self, path: &str) -> Result<LoadStart, TreeError> {
        let node = self
            .nodes
            .get_mut(path)
            .ok_or_else(|| TreeError::NotFound(path.to_string()))?;

        if !node.is_folder() {
            return Err(TreeError::NotAFolder(path.to_string()));
        }

        match node.load_state {
            LoadState::Loaded => Ok(LoadStart::Ready),
            LoadState::Loading => Ok(LoadStart::InFlight),
            LoadState::NotLoaded | LoadState::Failed(_) => {
                node.load_state = LoadState::Loading;
                Ok(LoadStart::Fetch)
            }
        }
    }

    /// Attach fetched children (or the failure) to the folder at `path`.
    pub fn finish_load(&mut self, path: &str, result: ApiResult<Vec<ChildDescriptor>>) {
        let descriptors = match result {
            Ok(d) => d,
            Err(e) => {
                if let Some(node) = self.nodes.get_mut(path) {
                    node.load_state = LoadState::Failed(e.to_string());
                }
                return;
            }
        };

        // A folder and a note may share a name; two of the same kind may not.
        let mut names: HashSet<(NodeKind, String)> = HashSet::new();
        let mut attached: Vec<String> = Vec::with_capacity(descriptors.len());

        for d in descriptors.iter() {
            let child_path = normalize_path(&d.path);
            if child_path.is_empty() {
                log::warn!("skipping child of {path:?} with an empty path");
                continue;
            }
            if parent_path(&child_path) != path {
                log::warn!("skipping {child_path:?}: not a direct child of {path:?}");
                continue;
            }
            if self.nodes.contains_key(&child_path) {
                log::warn!("skipping duplicate tree node {child_path:?}");
                continue;
            }

            let node = TreeNode::from_descriptor(child_path.clone(), d);
            if !names.insert((node.kind, node.name.trim().to_string())) {
                log::warn!("skipping {child_path:?}: sibling name {:?} is taken", node.name);
                continue;
            }

            self.nodes.insert(child_path.clone(), node);
            attached.push(child_path);
        }

        if let Some(node) = self.nodes.get_mut(path) {
            node.children = attached;
            node.load_state = LoadState::Loaded;
        }
    }

    /// Settle a fetch that was dropped before it finished.
    pub fn abandon_load(&mut self, path: &str) {
        if let Some(node) = self.nodes.get_mut(path) {
            if node.load_state == LoadState::Loading {
                node.load_state = LoadState::Failed("load was cancelled".to_string());
            }
        }
    }

    /// Children of a folder whose load has settled.
    pub fn loaded_children(&self, path: &str) -> Result<Vec<TreeNode>, TreeError> {
        let node = self
            .nodes
            .get(path)
            .ok_or_else(|| TreeError::NotFound(path.to_string()))?;

        match &node.load_state {
            LoadState::Failed(message) => Err(TreeError::LoadFailed {
                path: path.to_string(),
                message: message.clone(),
            }),
            _ => Ok(self.children_of(path).into_iter().cloned().collect()),
        }
    }

    pub fn set_expanded(&mut self, path: &str, expanded: bool) {
        if let Some(node) = self.nodes.get_mut(path) {
            // Never show content that was not fetched.
            if expanded && node.load_state == LoadState::NotLoaded {
                return;
            }
            node.expanded = expanded;
        }
    }

    pub fn toggle(&mut self, path: &str) -> TogglePlan {
        if path.is_empty() {
            return TogglePlan::Inert;
        }
        let Some(node) = self.nodes.get_mut(path) else {
            return TogglePlan::Missing;
        };
        if !node.is_folder() || !node.has_children {
            return TogglePlan::Inert;
        }
        if node.load_state == LoadState::Loading {
            return TogglePlan::Busy;
        }
        if node.expanded {
            node.expanded = false;
            return TogglePlan::Collapsed;
        }
        if node.load_state == LoadState::Loaded {
            node.expanded = true;
            return TogglePlan::Expanded;
        }
        TogglePlan::Load
    }

    /// Flatten the expanded part of the tree into render rows, root children first.
    pub fn visible_rows(&self) -> Vec<TreeRow> {
        let mut out = Vec::new();
        if let Some(root) = self.nodes.get(ROOT_PATH) {
            self.push_subtree(root, 0, &mut out);
        }
        out
    }

    fn push_subtree(&self, folder: &TreeNode, depth: usize, out: &mut Vec<TreeRow>) {
        let placeholder = match &folder.load_state {
            LoadState::NotLoaded => return,
            LoadState::Loading => Some(Placeholder::Loading),
            LoadState::Failed(message) => Some(Placeholder::Error(message.clone())),
            LoadState::Loaded if folder.children.is_empty() => Some(Placeholder::Empty),
            LoadState::Loaded => None,
        };

        if let Some(placeholder) = placeholder {
            out.push(TreeRow::Placeholder { depth, placeholder });
            return;
        }

        for child in self.children_of(&folder.path) {
            out.push(TreeRow::Node(NodeRow {
                path: child.path.clone(),
                name: child.name.clone(),
                kind: child.kind,
                depth,
                expandable: child.is_folder() && child.has_children,
                expanded: child.expanded,
                loading: child.load_state == LoadState::Loading,
                active: self.active.as_deref() == Some(child.path.as_str()),
                href: child.href(),
            }));

            if child.is_folder() && child.expanded {
                self.push_subtree(child, depth + 1, out);
            }
        }
    }
}
