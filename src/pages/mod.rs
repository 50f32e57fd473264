//! Page islands: category actions, note actions and the editor panel.

use crate::components::ui::{
    Alert, AlertDescription, Button, ButtonSize, ButtonVariant, Input, Label, Spinner, Textarea,
};
use crate::config::PageContext;
use crate::models::SaveNoteRequest;
use crate::state::AppContext;
use leptos::ev;
use leptos::html;
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_dom::helpers::{set_timeout, window_event_listener};
use std::time::Duration;
use wasm_bindgen::{JsCast, JsValue};

const AUTOSAVE_INTERVAL_MS: i32 = 30_000;
const NOTICE_DURATION: Duration = Duration::from_secs(3);

/// Trimmed category name, or the message shown when it is blank.
pub(crate) fn validate_category_name(raw: &str) -> Result<String, &'static str> {
    let name = raw.trim();
    if name.is_empty() {
        return Err("Please enter a category name");
    }
    Ok(name.to_string())
}

/// Folder a category page acts on.
pub(crate) fn category_folder(page: &PageContext) -> String {
    let current = page.current_path.trim().trim_matches('/');
    if current.is_empty() {
        page.folder_path.trim().trim_matches('/').to_string()
    } else {
        current.to_string()
    }
}

fn navigate_to(url: &str) {
    let _ = window().location().set_href(url);
}

fn reload_page() {
    let _ = window().location().reload();
}

#[component]
pub fn CategoryActions() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let api = app_state.0.api_client;
    let folder = StoredValue::new(category_folder(&app_state.0.page));
    let is_root = folder.with_value(|f| f.is_empty());

    let create_open: RwSignal<bool> = RwSignal::new(false);
    let create_name: RwSignal<String> = RwSignal::new(String::new());
    let create_error: RwSignal<Option<String>> = RwSignal::new(None);
    let create_loading: RwSignal<bool> = RwSignal::new(false);
    let create_name_ref: NodeRef<html::Input> = NodeRef::new();

    let delete_open: RwSignal<bool> = RwSignal::new(false);
    let delete_error: RwSignal<Option<String>> = RwSignal::new(None);
    let delete_loading: RwSignal<bool> = RwSignal::new(false);

    let open_create_dialog = move |_| {
        create_name.set(String::new());
        create_error.set(None);
        create_open.set(true);
    };

    // Focus the name input once the dialog is mounted.
    Effect::new(move |_| {
        if !create_open.get() {
            return;
        }
        let _ = window().set_timeout_with_callback_and_timeout_and_arguments_0(
            wasm_bindgen::closure::Closure::once_into_js(move || {
                if let Some(el) = create_name_ref.get_untracked() {
                    let _ = el.focus();
                }
            })
            .as_ref()
            .unchecked_ref(),
            0,
        );
    });

    let submit_create = move || {
        if create_loading.get_untracked() {
            return;
        }
        let name = match validate_category_name(&create_name.get_untracked()) {
            Ok(name) => name,
            Err(msg) => {
                create_error.set(Some(msg.to_string()));
                return;
            }
        };

        create_loading.set(true);
        create_error.set(None);

        let api_client = api.get_untracked();
        let parent = folder.get_value();
        spawn_local(async move {
            match api_client.create_category(&name, &parent).await {
                Ok(message) => {
                    log::info!("created category {name:?} under {parent:?}: {message}");
                    reload_page();
                }
                Err(e) => {
                    log::warn!("create category {name:?}: {e}");
                    create_error.set(Some(e.to_string()));
                    create_loading.set(false);
                }
            }
        });
    };

    let submit_delete = move |_: ()| {
        if delete_loading.get_untracked() {
            return;
        }
        delete_loading.set(true);
        delete_error.set(None);

        let api_client = api.get_untracked();
        let path = folder.get_value();
        spawn_local(async move {
            match api_client.delete_folder(&path).await {
                Ok(redirect) => navigate_to(&redirect),
                Err(e) => {
                    log::warn!("delete folder {path:?}: {e}");
                    delete_error.set(Some(e.to_string()));
                    delete_loading.set(false);
                }
            }
        });
    };

    view! {
        <div data-name="CategoryActions" class="flex items-center gap-2">
            <Button size=ButtonSize::Sm on:click=open_create_dialog>
                {if is_root { "New Category" } else { "New Subcategory" }}
            </Button>

            <Show when=move || !is_root fallback=|| ().into_view()>
                <Button
                    variant=ButtonVariant::Outline
                    size=ButtonSize::Sm
                    class="border-destructive/40 text-destructive"
                    on:click=move |_| {
                        delete_error.set(None);
                        delete_open.set(true);
                    }
                >
                    "Delete Folder"
                </Button>
            </Show>

            <Show when=move || create_open.get() fallback=|| ().into_view()>
                <div class="fixed inset-0 z-50 flex items-center justify-center bg-black/30 px-4">
                    <div class="w-full max-w-sm rounded-md border border-border bg-background p-4 shadow-lg">
                        <div class="mb-3 space-y-1">
                            <div class="text-sm font-medium">
                                {if is_root { "New category" } else { "New subcategory" }}
                            </div>
                            <Show when=move || !is_root fallback=|| ().into_view()>
                                <div class="text-xs text-muted-foreground">
                                    {move || format!("Inside {}", folder.get_value())}
                                </div>
                            </Show>
                        </div>

                        <div class="space-y-2">
                            <div
                                class="space-y-1"
                                on:keydown=move |ev: web_sys::KeyboardEvent| {
                                    if ev.key() == "Enter" {
                                        ev.prevent_default();
                                        submit_create();
                                    }
                                }
                            >
                                <Label class="text-xs" html_for="category-name">"Name"</Label>
                                <Input
                                    id="category-name"
                                    node_ref=create_name_ref
                                    bind_value=create_name
                                    class="h-8 text-sm border-border bg-background"
                                />
                            </div>

                            <Show when=move || create_error.get().is_some() fallback=|| ().into_view()>
                                {move || create_error.get().map(|e| view! {
                                    <Alert class="border-destructive/30">
                                        <AlertDescription class="text-destructive text-xs">{e}</AlertDescription>
                                    </Alert>
                                })}
                            </Show>

                            <div class="flex items-center justify-end gap-2 pt-2">
                                <Button
                                    variant=ButtonVariant::Outline
                                    size=ButtonSize::Sm
                                    attr:disabled=move || create_loading.get()
                                    on:click=move |_| create_open.set(false)
                                >
                                    "Cancel"
                                </Button>
                                <Button
                                    size=ButtonSize::Sm
                                    attr:disabled=move || create_loading.get()
                                    on:click=move |_| submit_create()
                                >
                                    <span class="inline-flex items-center gap-2">
                                        <Show when=move || create_loading.get() fallback=|| ().into_view()>
                                            <Spinner />
                                        </Show>
                                        {move || if create_loading.get() { "Creating..." } else { "Create" }}
                                    </span>
                                </Button>
                            </div>
                        </div>
                    </div>
                </div>
            </Show>

            <Show when=move || delete_open.get() fallback=|| ().into_view()>
                <ConfirmDelete
                    title="Delete folder"
                    message=Signal::derive(move || {
                        format!("Delete \"{}\" and everything inside it?", folder.get_value())
                    })
                    error=delete_error
                    loading=delete_loading
                    on_cancel=Callback::new(move |_| delete_open.set(false))
                    on_confirm=Callback::new(submit_delete)
                />
            </Show>
        </div>
    }
}

#[component]
pub fn NoteActions() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let api = app_state.0.api_client;
    let title = StoredValue::new(app_state.0.page.note_title.trim().to_string());
    let folder = StoredValue::new(app_state.0.page.folder_path.trim().to_string());

    let delete_open: RwSignal<bool> = RwSignal::new(false);
    let delete_error: RwSignal<Option<String>> = RwSignal::new(None);
    let delete_loading: RwSignal<bool> = RwSignal::new(false);

    let submit_delete = move |_: ()| {
        if delete_loading.get_untracked() {
            return;
        }
        delete_loading.set(true);
        delete_error.set(None);

        let api_client = api.get_untracked();
        let (title, folder) = (title.get_value(), folder.get_value());
        spawn_local(async move {
            match api_client.delete_note(&title, &folder).await {
                Ok(redirect) => navigate_to(&redirect),
                Err(e) => {
                    log::warn!("delete note {title:?} in {folder:?}: {e}");
                    delete_error.set(Some(e.to_string()));
                    delete_loading.set(false);
                }
            }
        });
    };

    view! {
        <div data-name="NoteActions" class="flex items-center gap-2">
            <Button
                variant=ButtonVariant::Outline
                size=ButtonSize::Sm
                class="border-destructive/40 text-destructive"
                on:click=move |_| {
                    delete_error.set(None);
                    delete_open.set(true);
                }
            >
                "Delete"
            </Button>

            <Show when=move || delete_open.get() fallback=|| ().into_view()>
                <ConfirmDelete
                    title="Delete note"
                    message=Signal::derive(move || "Are you sure you want to delete this note?".to_string())
                    error=delete_error
                    loading=delete_loading
                    on_cancel=Callback::new(move |_| delete_open.set(false))
                    on_confirm=Callback::new(submit_delete)
                />
            </Show>
        </div>
    }
}

#[component]
fn ConfirmDelete(
    title: &'static str,
    #[prop(into)] message: Signal<String>,
    error: RwSignal<Option<String>>,
    loading: RwSignal<bool>,
    on_cancel: Callback<()>,
    on_confirm: Callback<()>,
) -> impl IntoView {
    view! {
        <div class="fixed inset-0 z-50 flex items-center justify-center bg-black/30 px-4">
            <div class="w-full max-w-sm rounded-md border border-border bg-background p-4 shadow-lg">
                <div class="mb-3 space-y-1">
                    <div class="text-sm font-medium text-destructive">{title}</div>
                    <div class="text-xs text-muted-foreground">{move || message.get()}</div>
                </div>

                <Show when=move || error.get().is_some() fallback=|| ().into_view()>
                    {move || error.get().map(|e| view! {
                        <Alert class="border-destructive/30">
                            <AlertDescription class="text-destructive text-xs">{e}</AlertDescription>
                        </Alert>
                    })}
                </Show>

                <div class="flex items-center justify-end gap-2 pt-2">
                    <Button
                        variant=ButtonVariant::Outline
                        size=ButtonSize::Sm
                        attr:disabled=move || loading.get()
                        on:click=move |_| on_cancel.run(())
                    >
                        "Cancel"
                    </Button>
                    <Button
                        variant=ButtonVariant::Outline
                        size=ButtonSize::Sm
                        class="border-destructive/40 text-destructive"
                        attr:disabled=move || loading.get()
                        on:click=move |_| on_confirm.run(())
                    >
                        <span class="inline-flex items-center gap-2">
                            <Show when=move || loading.get() fallback=|| ().into_view()>
                                <Spinner />
                            </Show>
                            {move || if loading.get() { "Deleting..." } else { "Delete" }}
                        </span>
                    </Button>
                </div>
            </div>
        </div>
    }
}

/// Last state the backend acknowledged.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct SavedNote {
    pub title: String,
    pub content: String,
}

impl SavedNote {
    pub fn differs(&self, title: &str, content: &str) -> bool {
        self.title != title || self.content != content
    }
}

/// Build the save payload; a blank title is rejected before any request.
///
/// `old_title` is the title the backend currently stores (empty for a new note).
pub(crate) fn build_save_request(
    title: &str,
    content: &str,
    folder: &str,
    old_title: &str,
) -> Result<SaveNoteRequest, &'static str> {
    let title = title.trim();
    if title.is_empty() {
        return Err("Please enter a title");
    }
    Ok(SaveNoteRequest {
        title: title.to_string(),
        content: content.to_string(),
        folder: folder.trim().trim_matches('/').to_string(),
        old_title: old_title.trim().to_string(),
    })
}

pub(crate) fn save_button_label(saving: bool, dirty: bool) -> &'static str {
    if saving {
        "Saving..."
    } else if dirty {
        "Save Changes"
    } else {
        "Saved"
    }
}

pub(crate) fn is_save_shortcut(ctrl: bool, meta: bool, key: &str) -> bool {
    (ctrl || meta) && key.eq_ignore_ascii_case("s")
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum NoticeKind {
    Success,
    Error,
}

#[component]
pub fn EditorPanel() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let api = app_state.0.api_client;
    let page = app_state.0.page.clone();

    let opened_title = if page.is_new_page {
        String::new()
    } else {
        page.note_title.trim().to_string()
    };

    let title: RwSignal<String> = RwSignal::new(page.note_title.trim().to_string());
    let content: RwSignal<String> = RwSignal::new(page.content.clone());
    let saved: RwSignal<SavedNote> = RwSignal::new(SavedNote {
        title: opened_title,
        content: page.content.clone(),
    });
    let folder = StoredValue::new(page.folder_path.clone());
    let saving: RwSignal<bool> = RwSignal::new(false);
    let notice: RwSignal<Option<(NoticeKind, String)>> = RwSignal::new(None);
    let notice_seq: RwSignal<u64> = RwSignal::new(0);

    let is_dirty = Memo::new(move |_| saved.with(|s| s.differs(&title.get(), &content.get())));

    let show_notice = move |kind: NoticeKind, message: String| {
        notice_seq.update(|n| *n += 1);
        let seq = notice_seq.get_untracked();
        notice.set(Some((kind, message)));
        set_timeout(
            move || {
                if notice_seq.get_untracked() == seq {
                    notice.set(None);
                }
            },
            NOTICE_DURATION,
        );
    };

    let save = move || {
        if saving.get_untracked() {
            return;
        }
        let req = match build_save_request(
            &title.get_untracked(),
            &content.get_untracked(),
            &folder.get_value(),
            &saved.with_untracked(|s| s.title.clone()),
        ) {
            Ok(req) => req,
            Err(msg) => {
                show_notice(NoticeKind::Error, msg.to_string());
                return;
            }
        };

        saving.set(true);
        let api_client = api.get_untracked();
        spawn_local(async move {
            match api_client.save_note(&req).await {
                Ok(redirect) => {
                    saved.set(SavedNote {
                        title: req.title.clone(),
                        content: req.content.clone(),
                    });
                    if let Some(url) = redirect.filter(|u| !u.is_empty()) {
                        if let Ok(history) = window().history() {
                            let _ = history.push_state_with_url(&JsValue::NULL, "", Some(&url));
                        }
                    }
                    log::info!("saved note {:?}", req.title);
                    show_notice(NoticeKind::Success, "Note saved successfully".to_string());
                }
                Err(e) => {
                    log::warn!("save note {:?}: {e}", req.title);
                    show_notice(NoticeKind::Error, format!("Error saving note: {e}"));
                }
            }
            saving.set(false);
        });
    };

    let _key_handle = window_event_listener(ev::keydown, move |ev: web_sys::KeyboardEvent| {
        if is_save_shortcut(ev.ctrl_key(), ev.meta_key(), &ev.key()) {
            ev.prevent_default();
            save();
        }
    });

    let _unload_handle =
        window_event_listener(ev::beforeunload, move |ev: web_sys::BeforeUnloadEvent| {
            if is_dirty.get_untracked() {
                ev.prevent_default();
                ev.set_return_value("");
            }
        });

    // The panel lives as long as the page; the interval is never cleared.
    let autosave = wasm_bindgen::closure::Closure::wrap(Box::new(move || {
        if is_dirty.get_untracked() {
            save();
        }
    }) as Box<dyn FnMut()>);
    let _ = window().set_interval_with_callback_and_timeout_and_arguments_0(
        autosave.as_ref().unchecked_ref(),
        AUTOSAVE_INTERVAL_MS,
    );
    autosave.forget();

    view! {
        <form
            data-name="EditorPanel"
            class="flex min-h-0 flex-1 flex-col gap-3"
            on:submit=move |ev: web_sys::SubmitEvent| {
                ev.prevent_default();
                save();
            }
        >
            <div class="flex items-center gap-2">
                <Input
                    id="note-title"
                    bind_value=title
                    placeholder="Note title"
                    class="h-9 flex-1 text-base font-medium"
                />
                <Button
                    size=ButtonSize::Sm
                    variant=ButtonVariant::Default
                    attr:data-dirty=move || is_dirty.get().to_string()
                    attr:disabled=move || saving.get()
                >
                    <span class="inline-flex items-center gap-2">
                        <Show when=move || saving.get() fallback=|| ().into_view()>
                            <Spinner />
                        </Show>
                        {move || save_button_label(saving.get(), is_dirty.get())}
                    </span>
                </Button>
            </div>

            <Textarea
                id="note-content"
                bind_value=content
                placeholder="Write your note..."
                class="min-h-[60vh] flex-1 resize-none font-mono"
            />

            {move || notice.get().map(|(kind, message)| {
                let class = match kind {
                    NoticeKind::Success => "fixed bottom-4 right-4 z-50 w-auto border-success/30 bg-background shadow-lg",
                    NoticeKind::Error => "fixed bottom-4 right-4 z-50 w-auto border-destructive/30 bg-background shadow-lg",
                };
                let text_class = match kind {
                    NoticeKind::Success => "text-xs",
                    NoticeKind::Error => "text-destructive text-xs",
                };
                view! {
                    <Alert class=class>
                        <AlertDescription class=text_class>{message}</AlertDescription>
                    </Alert>
                }
            })}
        </form>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_category_name() {
        assert_eq!(validate_category_name("  guides "), Ok("guides".to_string()));
        assert_eq!(
            validate_category_name("   "),
            Err("Please enter a category name")
        );
    }

    #[test]
    fn test_category_folder_prefers_current_path() {
        let page = PageContext {
            current_path: "/docs/a/".to_string(),
            folder_path: "docs".to_string(),
            ..Default::default()
        };
        assert_eq!(category_folder(&page), "docs/a");

        let page = PageContext {
            folder_path: "docs".to_string(),
            ..Default::default()
        };
        assert_eq!(category_folder(&page), "docs");
        assert_eq!(category_folder(&PageContext::default()), "");
    }

    #[test]
    fn test_build_save_request_rejects_blank_title() {
        assert_eq!(
            build_save_request("  ", "body", "docs", "Old").map(|r| r.title),
            Err("Please enter a title")
        );
    }

    #[test]
    fn test_build_save_request_carries_old_title() {
        let req = build_save_request(" Renamed ", "body", "/docs/", "Original")
            .expect("title is present");
        assert_eq!(req.title, "Renamed");
        assert_eq!(req.folder, "docs");
        assert_eq!(req.old_title, "Original");
        assert_eq!(req.content, "body");
    }

    #[test]
    fn test_saved_note_dirty_tracking() {
        let saved = SavedNote {
            title: "Note".to_string(),
            content: "body".to_string(),
        };
        assert!(!saved.differs("Note", "body"));
        assert!(saved.differs("Note", "body!"));
        assert!(saved.differs("Renamed", "body"));
    }

    #[test]
    fn test_save_button_label() {
        assert_eq!(save_button_label(false, true), "Save Changes");
        assert_eq!(save_button_label(false, false), "Saved");
        assert_eq!(save_button_label(true, true), "Saving...");
    }

    #[test]
    fn test_save_shortcut() {
        assert!(is_save_shortcut(true, false, "s"));
        assert!(is_save_shortcut(false, true, "S"));
        assert!(!is_save_shortcut(false, false, "s"));
        assert!(!is_save_shortcut(true, false, "p"));
    }
}
