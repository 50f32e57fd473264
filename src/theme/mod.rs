//! Light/dark theme preference.

use crate::components::ui::{Button, ButtonSize, ButtonVariant};
use crate::state::AppContext;
use crate::storage::{load_string_from_storage, save_string_to_storage, THEME_KEY};
use icons::{Moon, Sun};
use leptos::prelude::*;
use std::str::FromStr;
use strum::{AsRefStr, Display, EnumString};

const DARK_BODY_CLASS: &str = "dark-theme";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Display, AsRefStr, EnumString)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    /// A stored preference wins; otherwise follow the OS setting.
    pub fn resolve(saved: Option<&str>, prefers_dark: bool) -> Self {
        saved
            .and_then(|s| Theme::from_str(s.trim()).ok())
            .unwrap_or(if prefers_dark { Theme::Dark } else { Theme::Light })
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn is_dark(self) -> bool {
        self == Theme::Dark
    }
}

fn prefers_dark() -> bool {
    web_sys::window()
        .and_then(|w| w.match_media("(prefers-color-scheme: dark)").ok().flatten())
        .is_some_and(|m| m.matches())
}

pub(crate) fn initial_theme() -> Theme {
    Theme::resolve(load_string_from_storage(THEME_KEY).as_deref(), prefers_dark())
}

pub(crate) fn save_theme(theme: Theme) {
    save_string_to_storage(THEME_KEY, theme.as_ref());
}

/// Reflect `theme` on `<body>` (class) and `<html>` (`data-theme`).
pub(crate) fn apply_theme(theme: Theme) {
    let Some(document) = web_sys::window().and_then(|w| w.document()) else {
        return;
    };

    if let Some(body) = document.body() {
        let classes = body.class_list();
        let _ = if theme.is_dark() {
            classes.add_1(DARK_BODY_CLASS)
        } else {
            classes.remove_1(DARK_BODY_CLASS)
        };
    }

    if let Some(html) = document.document_element() {
        let _ = html.set_attribute("data-theme", theme.as_ref());
    }
}

#[component]
pub fn ThemeToggle() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let theme = app_state.0.theme;

    let on_toggle = move |_| {
        let next = theme.get_untracked().toggled();
        theme.set(next);
        apply_theme(next);
        save_theme(next);
        log::debug!("theme -> {next}");
    };

    view! {
        <Button
            variant=ButtonVariant::Ghost
            size=ButtonSize::Icon
            attr:title=move || if theme.get().is_dark() { "Switch to light theme" } else { "Switch to dark theme" }
            on:click=on_toggle
        >
            <Show when=move || theme.get().is_dark() fallback=|| view! { <Moon /> }>
                <Sun />
            </Show>
        </Button>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_prefers_saved_value() {
        assert_eq!(Theme::resolve(Some("dark"), false), Theme::Dark);
        assert_eq!(Theme::resolve(Some("light"), true), Theme::Light);
    }

    #[test]
    fn test_resolve_falls_back_to_os_setting() {
        assert_eq!(Theme::resolve(None, true), Theme::Dark);
        assert_eq!(Theme::resolve(None, false), Theme::Light);
        assert_eq!(Theme::resolve(Some("sepia"), true), Theme::Dark);
    }

    #[test]
    fn test_toggled_and_serialized_names() {
        assert_eq!(Theme::Light.toggled(), Theme::Dark);
        assert_eq!(Theme::Dark.toggled().to_string(), "light");
        assert_eq!(Theme::Dark.as_ref(), "dark");
    }
}
