use super::{
    ancestor_prefixes, normalize_path, FolderTree, LoadStart, LoadState, NodeKind, TogglePlan,
    TreeError, TreeNode, TreeRow, ROOT_PATH,
};
use crate::api::ApiResult;
use crate::models::ChildDescriptor;
use futures::channel::oneshot;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Lists the direct children of a folder (root = `""`).
pub(crate) trait ChildrenSource {
    async fn list_children(&self, path: &str) -> ApiResult<Vec<ChildDescriptor>>;
}

type Listener = Arc<dyn Fn() + Send + Sync>;

/// Lazily loads the folder tree and tracks the active node.
///
/// Everything runs on the UI thread. The tree lock is never held across an
/// await point; a node in `Loading` is the only guard against duplicate
/// fetches. Callers that need children of a node already in flight wait on
/// a oneshot instead of fetching again.
pub(crate) struct Navigator<S> {
    source: Arc<S>,
    tree: Arc<Mutex<FolderTree>>,
    waiters: Arc<Mutex<HashMap<String, Vec<oneshot::Sender<()>>>>>,

    /// Called after every visible change (the sidebar bumps a signal).
    listener: Option<Listener>,
}

impl<S> Clone for Navigator<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            tree: Arc::clone(&self.tree),
            waiters: Arc::clone(&self.waiters),
            listener: self.listener.clone(),
        }
    }
}

impl<S> Navigator<S> {
    fn with_tree<R>(&self, f: impl FnOnce(&mut FolderTree) -> R) -> R {
        let mut guard = self.tree.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    fn notify(&self) {
        if let Some(listener) = &self.listener {
            listener();
        }
    }

    fn wait_for(&self, path: &str) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        let mut waiters = self.waiters.lock().unwrap_or_else(PoisonError::into_inner);
        waiters.entry(path.to_string()).or_default().push(tx);
        rx
    }

    fn wake_waiters(&self, path: &str) {
        let pending = {
            let mut waiters = self.waiters.lock().unwrap_or_else(PoisonError::into_inner);
            waiters.remove(path).unwrap_or_default()
        };
        for tx in pending {
            let _ = tx.send(());
        }
    }
}

/// Settles an in-flight fetch if its future is dropped before the response lands.
struct LoadGuard<'a, S> {
    navigator: &'a Navigator<S>,
    path: &'a str,
    settled: bool,
}

impl<S> Drop for LoadGuard<'_, S> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        log::debug!("load of {:?} dropped before it finished", self.path);
        self.navigator.with_tree(|t| t.abandon_load(self.path));
        self.navigator.wake_waiters(self.path);
        self.navigator.notify();
    }
}

impl<S: ChildrenSource> Navigator<S> {
    pub fn new(source: S) -> Self {
        Self {
            source: Arc::new(source),
            tree: Arc::new(Mutex::new(FolderTree::new())),
            waiters: Arc::new(Mutex::new(HashMap::new())),
            listener: None,
        }
    }

    pub fn with_listener(mut self, listener: impl Fn() + Send + Sync + 'static) -> Self {
        self.listener = Some(Arc::new(listener));
        self
    }

    pub fn rows(&self) -> Vec<TreeRow> {
        self.with_tree(|t| t.visible_rows())
    }

    #[cfg(test)]
    pub fn node(&self, path: &str) -> Option<TreeNode> {
        let path = normalize_path(path);
        self.with_tree(|t| t.get(&path).cloned())
    }

    pub fn active(&self) -> Option<String> {
        self.with_tree(|t| t.active().map(str::to_string))
    }

    /// Fetch the children of a folder unless they are loaded or already in flight.
    ///
    /// A failed folder is fetched again. The returned nodes are in server order.
    pub async fn load_children(&self, path: &str) -> Result<Vec<TreeNode>, TreeError> {
        let path = normalize_path(path);

        match self.with_tree(|t| t.begin_load(&path))? {
            LoadStart::Ready => {}
            LoadStart::InFlight => {
                let rx = self.wait_for(&path);
                let _ = rx.await;
            }
            LoadStart::Fetch => {
                let mut guard = LoadGuard {
                    navigator: self,
                    path: &path,
                    settled: false,
                };
                self.notify();
                log::debug!("loading children of {path:?}");

                let result = self.source.list_children(&path).await;
                match &result {
                    Ok(children) => {
                        log::debug!("{path:?}: {} children", children.len())
                    }
                    Err(e) => {
                        log::warn!("loading children of {path:?} failed ({:?}): {e}", e.kind)
                    }
                }

                self.with_tree(|t| t.finish_load(&path, result));
                guard.settled = true;
                self.wake_waiters(&path);
                self.notify();
            }
        }

        self.with_tree(|t| t.loaded_children(&path))
    }

    /// Like `load_children`, but a failed folder stays failed until the user retries.
    async fn settled_children(&self, path: &str) -> Result<Vec<TreeNode>, TreeError> {
        let failed = self.with_tree(|t| {
            t.get(path)
                .is_some_and(|n| matches!(n.load_state, LoadState::Failed(_)))
        });
        if failed {
            return self.with_tree(|t| t.loaded_children(path));
        }
        self.load_children(path).await
    }

    /// Open or close a folder. Opening fetches children first when needed;
    /// a folder whose fetch is still in flight ignores the request.
    pub async fn toggle_expand(&self, path: &str) {
        let path = normalize_path(path);

        match self.with_tree(|t| t.toggle(&path)) {
            TogglePlan::Missing => log::info!("toggle: no tree node at {path:?}"),
            TogglePlan::Inert => {}
            TogglePlan::Busy => log::debug!("toggle: {path:?} is still loading"),
            TogglePlan::Collapsed | TogglePlan::Expanded => self.notify(),
            TogglePlan::Load => {
                let result = self.load_children(&path).await;
                // Open even on failure so the error placeholder is visible.
                self.with_tree(|t| t.set_expanded(&path, true));
                self.notify();
                if let Err(e) = result {
                    log::warn!("toggle: {e}");
                }
            }
        }
    }

    async fn ensure_expanded(&self, path: &str) -> Result<(), TreeError> {
        let node = self.with_tree(|t| t.get(path).map(|n| (n.kind, n.has_children)));
        match node {
            None => return Err(TreeError::NotFound(path.to_string())),
            Some((NodeKind::Note, _)) => return Err(TreeError::NotAFolder(path.to_string())),
            Some((NodeKind::Folder, false)) => return Ok(()),
            Some((NodeKind::Folder, true)) => {}
        }

        let result = self.settled_children(path).await;
        self.with_tree(|t| t.set_expanded(path, true));
        self.notify();
        result.map(|_| ())
    }

    /// Fetch the root's children.
    pub async fn load_root(&self) -> Result<(), TreeError> {
        self.ensure_expanded(ROOT_PATH).await
    }

    /// Open every strict ancestor of `target`, shallowest first, one at a time.
    async fn expand_ancestors(&self, target: &str) {
        if let Err(e) = self.ensure_expanded(ROOT_PATH).await {
            log::warn!("expand: root unavailable: {e}");
            return;
        }

        let prefixes = ancestor_prefixes(target);
        let Some((_, ancestors)) = prefixes.split_last() else {
            return;
        };

        for prefix in ancestors {
            match self.ensure_expanded(prefix).await {
                Ok(()) => {}
                Err(e @ TreeError::NotFound(_)) => {
                    log::info!("expand {target:?}: {e}");
                    return;
                }
                Err(e) => {
                    log::warn!("expand {target:?}: {e}");
                    return;
                }
            }
        }
    }

    /// Expand the ancestor chain of `target`, then make it the active node.
    ///
    /// Returns whether `target` was found. An empty target clears the marker.
    pub async fn expand_path(&self, target: &str) -> bool {
        let target = normalize_path(target);
        self.expand_ancestors(&target).await;

        let found = self.with_tree(|t| t.set_active(&target));
        self.notify();

        if !found && !target.is_empty() {
            log::info!("expand: {target:?} is not in the tree");
        }
        found
    }

    /// Mark the note titled `title` inside `folder` active.
    ///
    /// Loads the folder's children first if needed. A miss is logged, not reported.
    pub async fn highlight_note(&self, title: &str, folder: &str) -> bool {
        let folder = normalize_path(folder);
        let title = title.trim();
        if title.is_empty() {
            return false;
        }

        let children = match self.settled_children(&folder).await {
            Ok(children) => children,
            Err(e @ TreeError::NotFound(_)) => {
                log::info!("highlight {title:?}: {e}");
                return false;
            }
            Err(e) => {
                log::warn!("highlight {title:?}: {e}");
                return false;
            }
        };

        let Some(note) = children
            .iter()
            .find(|n| n.kind == NodeKind::Note && n.name.trim() == title)
        else {
            log::info!("highlight: note {title:?} not found in {folder:?}");
            return false;
        };

        let found = self.with_tree(|t| t.set_active(&note.path));
        self.notify();
        found
    }

    /// Open the folder chain down to `folder` (inclusive) and highlight the note.
    pub async fn reveal_note(&self, title: &str, folder: &str) -> bool {
        let folder = normalize_path(folder);
        self.expand_ancestors(&folder).await;

        if !folder.is_empty() {
            if let Err(e) = self.ensure_expanded(&folder).await {
                log::info!("reveal {title:?}: {e}");
            }
        }

        self.highlight_note(title, &folder).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::tree::{name_from_path, Placeholder};
    use futures::executor::block_on;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::task::{Context, Poll};

    /// Suspends once, like a network round trip.
    struct YieldNow(bool);

    impl Future for YieldNow {
        type Output = ();

        fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
            if self.0 {
                Poll::Ready(())
            } else {
                self.0 = true;
                cx.waker().wake_by_ref();
                Poll::Pending
            }
        }
    }

    #[derive(Default)]
    struct MockSource {
        responses: HashMap<String, ApiResult<Vec<ChildDescriptor>>>,
        calls: Mutex<Vec<String>>,
    }

    impl MockSource {
        fn with(mut self, path: &str, children: Vec<ChildDescriptor>) -> Self {
            self.responses.insert(path.to_string(), Ok(children));
            self
        }

        fn failing(mut self, path: &str) -> Self {
            self.responses.insert(
                path.to_string(),
                Err(ApiError::http(500, r#"{"error": "boom"}"#, "Request failed")),
            );
            self
        }
    }

    impl ChildrenSource for MockSource {
        async fn list_children(&self, path: &str) -> ApiResult<Vec<ChildDescriptor>> {
            self.calls.lock().unwrap().push(path.to_string());
            YieldNow(false).await;
            self.responses
                .get(path)
                .cloned()
                .unwrap_or_else(|| Err(ApiError::http(404, "", "Request failed")))
        }
    }

    fn folder(path: &str, has_children: bool) -> ChildDescriptor {
        ChildDescriptor {
            path: path.to_string(),
            name: name_from_path(path).to_string(),
            is_note: false,
            has_children,
        }
    }

    fn note(path: &str, name: &str) -> ChildDescriptor {
        ChildDescriptor {
            path: path.to_string(),
            name: name.to_string(),
            is_note: true,
            has_children: false,
        }
    }

    fn sample_source() -> MockSource {
        MockSource::default()
            .with(
                "",
                vec![folder("docs", true), folder("missing", true), folder("misc", true)],
            )
            .with("docs", vec![folder("docs/a", true)])
            .with("docs/a", vec![note("docs/a/note1", "note1")])
            .with("misc", vec![note("misc/Note1", "Note1 ")])
            .failing("missing")
    }

    fn calls(nav: &Navigator<MockSource>) -> Vec<String> {
        nav.source.calls.lock().unwrap().clone()
    }

    fn clear_calls(nav: &Navigator<MockSource>) {
        nav.source.calls.lock().unwrap().clear();
    }

    #[test]
    fn test_expand_docs_renders_child_without_expand_control() {
        let nav = Navigator::new(
            MockSource::default()
                .with("", vec![folder("docs", true)])
                .with("docs", vec![folder("docs/a", false)]),
        );
        block_on(nav.load_root()).expect("root loads");
        clear_calls(&nav);

        block_on(nav.toggle_expand("docs"));

        assert_eq!(calls(&nav), vec!["docs".to_string()]);
        let rows = nav.rows();
        assert_eq!(rows.len(), 2);
        let TreeRow::Node(child) = &rows[1] else {
            panic!("expected a node row for docs/a");
        };
        assert_eq!(child.path, "docs/a");
        assert_eq!(child.depth, 1);
        assert!(!child.expandable);
    }

    #[test]
    fn test_double_toggle_issues_one_fetch() {
        let nav = Navigator::new(sample_source());
        block_on(nav.load_root()).expect("root loads");
        clear_calls(&nav);

        block_on(async {
            futures::join!(nav.toggle_expand("docs"), nav.toggle_expand("docs"));
        });

        assert_eq!(calls(&nav), vec!["docs".to_string()]);
        let docs = nav.node("docs").expect("docs exists");
        assert!(docs.expanded);
        assert_eq!(docs.load_state, LoadState::Loaded);
    }

    #[test]
    fn test_reexpand_loaded_folder_does_not_fetch() {
        let nav = Navigator::new(sample_source());
        block_on(nav.load_root()).expect("root loads");
        block_on(nav.toggle_expand("docs"));
        block_on(nav.toggle_expand("docs"));
        assert!(!nav.node("docs").expect("docs exists").expanded);

        clear_calls(&nav);
        block_on(nav.toggle_expand("docs"));

        assert!(calls(&nav).is_empty());
        assert!(nav.node("docs").expect("docs exists").expanded);
    }

    #[test]
    fn test_expand_path_fetches_ancestors_in_order() {
        let nav = Navigator::new(sample_source());
        block_on(nav.load_root()).expect("root loads");
        clear_calls(&nav);

        let found = block_on(nav.expand_path("docs/a/note1"));

        assert!(found);
        assert_eq!(calls(&nav), vec!["docs".to_string(), "docs/a".to_string()]);
        assert_eq!(nav.active().as_deref(), Some("docs/a/note1"));
        assert!(nav.node("docs").expect("docs").expanded);
        assert!(nav.node("docs/a").expect("docs/a").expanded);
    }

    #[test]
    fn test_expand_path_loads_root_first() {
        let nav = Navigator::new(sample_source());
        block_on(nav.expand_path("docs/a"));
        assert_eq!(calls(&nav), vec!["".to_string(), "docs".to_string()]);
        assert_eq!(nav.active().as_deref(), Some("docs/a"));
        // The target itself is only marked, not opened.
        assert!(!nav.node("docs/a").expect("docs/a").expanded);
    }

    #[test]
    fn test_expand_path_waits_for_in_flight_load() {
        let nav = Navigator::new(sample_source());
        block_on(nav.load_root()).expect("root loads");
        clear_calls(&nav);

        block_on(async {
            futures::join!(nav.toggle_expand("docs"), nav.expand_path("docs/a/note1"));
        });

        assert_eq!(calls(&nav), vec!["docs".to_string(), "docs/a".to_string()]);
        assert_eq!(nav.active().as_deref(), Some("docs/a/note1"));
    }

    #[test]
    fn test_expand_path_missing_ancestor_is_not_fatal() {
        let nav = Navigator::new(sample_source());
        block_on(nav.load_root()).expect("root loads");
        block_on(nav.expand_path("docs"));
        assert_eq!(nav.active().as_deref(), Some("docs"));
        clear_calls(&nav);

        let found = block_on(nav.expand_path("nowhere/deeper/leaf"));

        assert!(!found);
        assert!(calls(&nav).is_empty());
        assert_eq!(nav.active(), None);
    }

    #[test]
    fn test_failed_fetch_shows_error_and_siblings_still_expand() {
        let nav = Navigator::new(sample_source());
        block_on(nav.load_root()).expect("root loads");

        block_on(nav.toggle_expand("missing"));

        let missing = nav.node("missing").expect("missing exists");
        assert!(missing.expanded);
        assert!(matches!(missing.load_state, LoadState::Failed(_)));
        assert!(nav.rows().iter().any(|r| matches!(
            r,
            TreeRow::Placeholder {
                depth: 1,
                placeholder: Placeholder::Error(_)
            }
        )));

        block_on(nav.toggle_expand("docs"));
        assert_eq!(
            nav.node("docs").expect("docs").load_state,
            LoadState::Loaded
        );
    }

    #[test]
    fn test_failed_folder_retries_only_on_user_expand() {
        let nav = Navigator::new(sample_source());
        block_on(nav.load_root()).expect("root loads");
        block_on(nav.toggle_expand("missing"));
        clear_calls(&nav);

        // Programmatic paths do not retry.
        assert!(!block_on(nav.highlight_note("x", "missing")));
        block_on(nav.expand_path("missing/x"));
        assert!(calls(&nav).is_empty());

        // Collapse, then expand again: one retry.
        block_on(nav.toggle_expand("missing"));
        block_on(nav.toggle_expand("missing"));
        assert_eq!(calls(&nav), vec!["missing".to_string()]);
    }

    #[test]
    fn test_highlight_note_trims_loaded_names() {
        let nav = Navigator::new(sample_source());
        block_on(nav.load_root()).expect("root loads");
        block_on(nav.toggle_expand("misc"));
        clear_calls(&nav);

        assert!(block_on(nav.highlight_note("Note1", "misc")));
        assert!(calls(&nav).is_empty());
        assert_eq!(nav.active().as_deref(), Some("misc/Note1"));
    }

    #[test]
    fn test_highlight_note_loads_folder_first() {
        let nav = Navigator::new(sample_source());
        block_on(nav.load_root()).expect("root loads");
        clear_calls(&nav);

        assert!(!block_on(nav.highlight_note("note1", "docs/a")));

        block_on(nav.expand_path("docs/a"));
        clear_calls(&nav);
        assert!(block_on(nav.highlight_note("note1", "docs/a")));
        assert_eq!(calls(&nav), vec!["docs/a".to_string()]);
    }

    #[test]
    fn test_highlight_note_miss_keeps_active() {
        let nav = Navigator::new(sample_source());
        block_on(nav.expand_path("docs"));

        assert!(!block_on(nav.highlight_note("renamed", "docs")));
        assert_eq!(nav.active().as_deref(), Some("docs"));
    }

    #[test]
    fn test_reveal_note_opens_folder_chain() {
        let nav = Navigator::new(sample_source());

        assert!(block_on(nav.reveal_note("note1", "docs/a")));

        assert_eq!(
            calls(&nav),
            vec!["".to_string(), "docs".to_string(), "docs/a".to_string()]
        );
        assert!(nav.node("docs/a").expect("docs/a").expanded);
        assert_eq!(nav.active().as_deref(), Some("docs/a/note1"));
    }

    #[test]
    fn test_at_most_one_active_across_operations() {
        let nav = Navigator::new(sample_source());
        block_on(nav.reveal_note("note1", "docs/a"));
        block_on(nav.reveal_note("Note1", "misc"));
        block_on(nav.expand_path("docs"));

        let active_rows = nav
            .rows()
            .into_iter()
            .filter(|r| matches!(r, TreeRow::Node(n) if n.active))
            .count();
        assert_eq!(active_rows, 1);
        assert_eq!(nav.active().as_deref(), Some("docs"));
    }

    #[test]
    fn test_highlight_note_beside_folder_of_same_name() {
        let source = MockSource::default().with("", vec![folder("x", true), note("x.txt", "x")]);
        let nav = Navigator::new(source);

        assert!(block_on(nav.highlight_note("x", "")));
        assert_eq!(nav.active().as_deref(), Some("x.txt"));
    }

    #[test]
    fn test_dropped_load_releases_folder_and_waiters() {
        let nav = Navigator::new(sample_source());
        block_on(nav.load_root()).expect("root loads");
        clear_calls(&nav);

        let waited = block_on(async {
            let mut first = Box::pin(nav.load_children("docs"));
            assert!(futures::poll!(first.as_mut()).is_pending());
            let mut second = Box::pin(nav.load_children("docs"));
            assert!(futures::poll!(second.as_mut()).is_pending());

            drop(first);
            second.await
        });

        assert!(matches!(waited, Err(TreeError::LoadFailed { .. })));
        assert!(matches!(
            nav.node("docs").map(|n| n.load_state),
            Some(LoadState::Failed(_))
        ));
        assert!(nav.waiters.lock().unwrap().is_empty());

        // A user toggle fetches again instead of seeing "loading" forever.
        block_on(nav.toggle_expand("docs"));
        assert_eq!(calls(&nav), vec!["docs".to_string(), "docs".to_string()]);
        assert_eq!(nav.node("docs").map(|n| n.load_state), Some(LoadState::Loaded));
        assert!(nav.node("docs").is_some_and(|n| n.expanded));
    }

    #[test]
    fn test_listener_fires_on_changes() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let nav = Navigator::new(sample_source()).with_listener(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        block_on(nav.load_root()).expect("root loads");
        let after_root = count.load(Ordering::SeqCst);
        assert!(after_root >= 2);

        block_on(nav.toggle_expand("docs"));
        assert!(count.load(Ordering::SeqCst) > after_root);
    }
}
