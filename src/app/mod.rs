use crate::pages::{CategoryActions, EditorPanel, NoteActions};
use crate::sidebar::{Sidebar, SyncButton};
use crate::state::{AppContext, AppState};
use crate::theme::{apply_theme, ThemeToggle};
use leptos::prelude::*;
use wasm_bindgen::JsCast;

// Host elements the server-rendered templates provide. Any of them may be absent.
const SIDEBAR_HOST: &str = "wiki-sidebar";
const SYNC_HOST: &str = "wiki-sync";
const THEME_TOGGLE_HOST: &str = "wiki-theme-toggle";
const CATEGORY_ACTIONS_HOST: &str = "wiki-category-actions";
const NOTE_ACTIONS_HOST: &str = "wiki-note-actions";
const EDITOR_HOST: &str = "wiki-editor";

fn host_element(id: &str) -> Option<web_sys::HtmlElement> {
    document()
        .get_element_by_id(id)?
        .dyn_into::<web_sys::HtmlElement>()
        .ok()
}

fn mount_island<F, N>(id: &str, ctx: &AppContext, view: F)
where
    F: FnOnce() -> N + 'static,
    N: IntoView,
{
    let Some(parent) = host_element(id) else {
        return;
    };

    let ctx = ctx.clone();
    leptos::mount::mount_to(parent, move || {
        provide_context(ctx);
        view()
    })
    .forget();

    log::debug!("mounted #{id}");
}

/// Build the shared context once, then attach every island the page hosts.
pub fn start() {
    // Root owner for signals shared across islands; it lives as long as the page.
    let owner = Owner::new();
    owner.set();

    let state = AppState::new();
    apply_theme(state.theme.get_untracked());
    log::info!(
        "wiki client starting (api: {}, page: {:?})",
        state.api_client.with_untracked(|c| c.base_url.clone()),
        state.page.sidebar_target()
    );

    let ctx = AppContext(state);

    mount_island(SIDEBAR_HOST, &ctx, Sidebar);
    mount_island(SYNC_HOST, &ctx, SyncButton);
    mount_island(THEME_TOGGLE_HOST, &ctx, ThemeToggle);
    mount_island(CATEGORY_ACTIONS_HOST, &ctx, CategoryActions);
    mount_island(NOTE_ACTIONS_HOST, &ctx, NoteActions);
    mount_island(EDITOR_HOST, &ctx, EditorPanel);
}
