//! Sidebar renderer for the folder tree, plus the remote sync button.

use crate::api::ApiClient;
use crate::components::ui::{Button, ButtonSize, ButtonVariant, Spinner};
use crate::config::SidebarTarget;
use crate::state::AppContext;
use crate::tree::{Navigator, NodeKind, NodeRow, Placeholder, TreeRow};
use icons::{ChevronDown, ChevronRight, FileText, Folder, FolderOpen, RefreshCw};
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_dom::helpers::set_timeout;
use std::time::Duration;

const SYNC_RESET_DELAY: Duration = Duration::from_secs(2);

fn indent_style(depth: usize) -> String {
    format!("padding-left: {:.2}rem", 0.5 + depth as f32 * 0.75)
}

#[component]
pub fn Sidebar() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let revision = app_state.0.tree_revision;
    let navigator = app_state.0.navigator.clone();

    // Bootstrap: root first, then walk down to whatever the page shows.
    let target = app_state.0.page.sidebar_target();
    let nav = navigator.clone();
    spawn_local(async move {
        if let Err(e) = nav.load_root().await {
            log::warn!("sidebar: {e}");
        }
        match target {
            SidebarTarget::Note { title, folder } => {
                nav.reveal_note(&title, &folder).await;
            }
            SidebarTarget::Path(path) => {
                nav.expand_path(&path).await;
            }
            SidebarTarget::None => {}
        }
        log::debug!("sidebar ready, active node: {:?}", nav.active());
    });

    view! {
        <nav data-name="WikiSidebar" class="flex min-h-0 flex-1 flex-col gap-0.5 overflow-y-auto py-2 text-sm">
            {move || {
                revision.track();
                navigator
                    .rows()
                    .into_iter()
                    .map(|row| tree_row_view(row, navigator.clone()))
                    .collect_view()
            }}
        </nav>
    }
}

fn tree_row_view(row: TreeRow, navigator: Navigator<ApiClient>) -> AnyView {
    match row {
        TreeRow::Placeholder { depth, placeholder } => {
            let (class, title) = match &placeholder {
                Placeholder::Error(message) => ("px-2 py-1 text-xs text-destructive", message.clone()),
                _ => ("px-2 py-1 text-xs italic text-muted-foreground", String::new()),
            };
            view! {
                <div class=class style=indent_style(depth + 1) title=title>
                    {placeholder.label().to_string()}
                </div>
            }
            .into_any()
        }
        TreeRow::Node(node) => node_row_view(node, navigator),
    }
}

pub(crate) fn node_row_view(node: NodeRow, navigator: Navigator<ApiClient>) -> AnyView {
    let row_class = if node.active {
        "group flex items-center gap-1 rounded-md pr-2 py-1 bg-accent text-accent-foreground font-medium"
    } else {
        "group flex items-center gap-1 rounded-md pr-2 py-1 hover:bg-accent/50"
    };

    let toggle = if node.expandable {
        let path = node.path.clone();
        let on_toggle = move |ev: web_sys::MouseEvent| {
            ev.prevent_default();
            ev.stop_propagation();
            let nav = navigator.clone();
            let path = path.clone();
            spawn_local(async move {
                nav.toggle_expand(&path).await;
            });
        };

        let chevron = if node.loading {
            view! { <Spinner class="size-3.5" /> }.into_any()
        } else if node.expanded {
            view! { <ChevronDown class="size-3.5" /> }.into_any()
        } else {
            view! { <ChevronRight class="size-3.5" /> }.into_any()
        };

        view! {
            <button
                type="button"
                class="inline-flex size-4 shrink-0 items-center justify-center rounded text-muted-foreground hover:text-foreground"
                aria-label=if node.expanded { "Collapse folder" } else { "Expand folder" }
                aria-expanded=if node.expanded { "true" } else { "false" }
                on:click=on_toggle
            >
                {chevron}
            </button>
        }
        .into_any()
    } else {
        view! { <span class="inline-block size-4 shrink-0" /> }.into_any()
    };

    let icon = match (node.kind, node.expanded) {
        (NodeKind::Note, _) => view! { <FileText class="size-4 shrink-0 text-muted-foreground" /> }.into_any(),
        (NodeKind::Folder, true) => view! { <FolderOpen class="size-4 shrink-0 text-muted-foreground" /> }.into_any(),
        (NodeKind::Folder, false) => view! { <Folder class="size-4 shrink-0 text-muted-foreground" /> }.into_any(),
    };

    let name = node.name;
    let title = name.clone();

    view! {
        <div class=row_class style=indent_style(node.depth) data-path=node.path>
            {toggle}
            {icon}
            <a
                href=node.href
                class="min-w-0 flex-1 truncate"
                class:active=node.active
                aria-current=if node.active { Some("page") } else { None }
                title=title
            >
                {name}
            </a>
        </div>
    }
    .into_any()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SyncStatus {
    Idle,
    Syncing,
    Complete,
    Failed,
}

impl SyncStatus {
    fn label(self) -> &'static str {
        match self {
            SyncStatus::Idle => "Sync",
            SyncStatus::Syncing => "Syncing...",
            SyncStatus::Complete => "Sync Complete",
            SyncStatus::Failed => "Sync Failed",
        }
    }
}

#[component]
pub fn SyncButton() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let status: RwSignal<SyncStatus> = RwSignal::new(SyncStatus::Idle);
    let error: RwSignal<Option<String>> = RwSignal::new(None);

    let on_sync = move |_| {
        if status.get_untracked() != SyncStatus::Idle {
            return;
        }
        status.set(SyncStatus::Syncing);
        error.set(None);

        let api_client = app_state.0.api_client.get_untracked();
        spawn_local(async move {
            let synced = match api_client.sync().await {
                Ok(message) => {
                    log::info!("sync: {message}");
                    true
                }
                Err(e) => {
                    log::warn!("sync failed: {e}");
                    error.set(Some(e.to_string()));
                    false
                }
            };
            status.set(if synced {
                SyncStatus::Complete
            } else {
                SyncStatus::Failed
            });

            set_timeout(
                move || {
                    status.set(SyncStatus::Idle);
                    if synced {
                        let _ = window().location().reload();
                    }
                },
                SYNC_RESET_DELAY,
            );
        });
    };

    view! {
        <Button
            variant=ButtonVariant::Outline
            size=ButtonSize::Sm
            class="w-full"
            attr:disabled=move || status.get() != SyncStatus::Idle
            attr:title=move || error.get().unwrap_or_default()
            on:click=on_sync
        >
            <span class="inline-flex items-center gap-2">
                <Show when=move || status.get() == SyncStatus::Syncing fallback=|| view! { <RefreshCw class="size-4" /> }>
                    <Spinner />
                </Show>
                {move || status.get().label()}
            </span>
        </Button>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indent_grows_with_depth() {
        assert_eq!(indent_style(0), "padding-left: 0.50rem");
        assert_eq!(indent_style(2), "padding-left: 2.00rem");
    }

    #[test]
    fn test_sync_labels() {
        assert_eq!(SyncStatus::Syncing.label(), "Syncing...");
        assert_eq!(SyncStatus::Complete.label(), "Sync Complete");
        assert_eq!(SyncStatus::Failed.label(), "Sync Failed");
    }
}
