use crate::api::ApiClient;
use crate::config::PageContext;
use crate::theme::{initial_theme, Theme};
use crate::tree::Navigator;
use leptos::prelude::*;

#[derive(Clone)]
pub(crate) struct AppState {
    pub api_client: RwSignal<ApiClient>,

    /// Read once from the server-rendered page.
    pub page: PageContext,

    pub theme: RwSignal<Theme>,

    /// Bumped by the navigator after every tree change; the sidebar re-renders on it.
    pub tree_revision: RwSignal<u64>,
    pub navigator: Navigator<ApiClient>,
}

impl AppState {
    pub fn new() -> Self {
        let api_client = ApiClient::from_env();
        let tree_revision = RwSignal::new(0_u64);

        let navigator = Navigator::new(api_client.clone())
            .with_listener(move || {
                let _ = tree_revision.try_update(|r| *r = r.wrapping_add(1));
            });

        Self {
            api_client: RwSignal::new(api_client),
            page: PageContext::from_window(),
            theme: RwSignal::new(initial_theme()),
            tree_revision,
            navigator,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub(crate) struct AppContext(pub AppState);
