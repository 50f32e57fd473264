use serde::{Deserialize, Serialize};
use wasm_bindgen::{JsCast, JsValue};

const FALLBACK_API_URL: &str = "http://localhost:8080";

#[derive(Serialize, Deserialize, Clone, Debug)]
pub(crate) struct EnvConfig {
    pub api_url: String,
}

impl EnvConfig {
    pub fn new() -> Self {
        // We support BOTH `window.ENV.API_URL` and `window.ENV.api_url`.
        if let Some(env) = web_sys::window().and_then(|w| w.get("ENV")) {
            let env: JsValue = env.into();
            for key in ["API_URL", "api_url"] {
                if let Some(url) = js_string(&env, key).filter(|s| !s.trim().is_empty()) {
                    return Self { api_url: url };
                }
            }
        }

        // The wiki backend serves both pages and API, so same-origin is the default.
        // reqwest needs an absolute URL even in the browser.
        let origin = web_sys::window()
            .and_then(|w| w.location().origin().ok())
            .filter(|o| o.starts_with("http"));

        Self {
            api_url: origin.unwrap_or_else(|| FALLBACK_API_URL.to_string()),
        }
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn js_string(obj: &JsValue, key: &str) -> Option<String> {
    if obj.is_undefined() || obj.is_null() || !obj.is_object() {
        return None;
    }
    js_sys::Reflect::get(obj, &key.into())
        .ok()
        .and_then(|v| v.as_string())
}

fn js_bool(obj: &JsValue, key: &str) -> Option<bool> {
    if obj.is_undefined() || obj.is_null() || !obj.is_object() {
        return None;
    }
    js_sys::Reflect::get(obj, &key.into())
        .ok()
        .and_then(|v| v.as_bool())
}

fn meta_content(name: &str) -> Option<String> {
    let document = web_sys::window()?.document()?;
    document
        .query_selector(&format!("meta[name=\"{name}\"]"))
        .ok()
        .flatten()?
        .get_attribute("content")
}

fn textarea_value(id: &str) -> Option<String> {
    let document = web_sys::window()?.document()?;
    let el = document.get_element_by_id(id)?;
    el.dyn_into::<web_sys::HtmlTextAreaElement>()
        .ok()
        .map(|t| t.value())
}

/// Where the sidebar should land after bootstrap.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum SidebarTarget {
    /// Reveal a note inside its folder (view/edit pages).
    Note { title: String, folder: String },
    /// Expand ancestors of a folder and mark it active (category pages).
    Path(String),
    None,
}

/// Server-rendered page state, read once when the bundle starts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct PageContext {
    /// Folder shown by a category page, or the note path on note pages.
    pub current_path: String,
    /// Folder that contains the current note (or the current category).
    pub folder_path: String,
    pub note_title: String,
    pub is_new_page: bool,
    /// Initial editor content on edit pages.
    pub content: String,
}

impl PageContext {
    pub fn from_window() -> Self {
        let data: JsValue = web_sys::window()
            .and_then(|w| w.get("sidebarData"))
            .map(Into::into)
            .unwrap_or(JsValue::UNDEFINED);

        let current_path = js_string(&data, "currentPath")
            .filter(|s| !s.is_empty())
            .or_else(|| meta_content("current-path"))
            .unwrap_or_default();

        let folder_path = js_string(&data, "folderPath")
            .filter(|s| !s.is_empty())
            .or_else(|| meta_content("folder-path"))
            .unwrap_or_default();

        let content = js_string(&data, "content")
            .or_else(|| textarea_value("content"))
            .unwrap_or_default();

        Self {
            current_path,
            folder_path,
            note_title: js_string(&data, "noteTitle").unwrap_or_default(),
            is_new_page: js_bool(&data, "isNewPage").unwrap_or(false),
            content,
        }
    }

    pub fn sidebar_target(&self) -> SidebarTarget {
        let title = self.note_title.trim();
        if !self.is_new_page && !title.is_empty() {
            return SidebarTarget::Note {
                title: title.to_string(),
                folder: self.folder_path.trim().to_string(),
            };
        }

        let path = if self.current_path.trim().is_empty() {
            self.folder_path.trim()
        } else {
            self.current_path.trim()
        };

        if path.is_empty() {
            SidebarTarget::None
        } else {
            SidebarTarget::Path(path.to_string())
        }
    }
}
