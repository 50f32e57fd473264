use serde::{Deserialize, Serialize};

/// One entry returned by the folder children endpoint.
///
/// The wiki backend serializes its tree items with Go-style field names
/// (`Path`, `Name`, `IsNote`, `HasChildren`). camelCase aliases are accepted too.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct ChildDescriptor {
    #[serde(rename = "Path", alias = "path", default)]
    pub path: String,

    #[serde(rename = "Name", alias = "name", default)]
    pub name: String,

    #[serde(rename = "IsNote", alias = "isNote", default)]
    pub is_note: bool,

    #[serde(rename = "HasChildren", alias = "hasChildren", default)]
    pub has_children: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub(crate) struct ChildrenResponse {
    // The backend emits `null` instead of `[]` for an empty folder.
    #[serde(default)]
    pub children: Option<Vec<ChildDescriptor>>,
}

impl ChildrenResponse {
    pub fn into_children(self) -> Vec<ChildDescriptor> {
        self.children.unwrap_or_default()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub(crate) struct CreateCategoryRequest {
    pub name: String,

    /// Empty for a top-level category.
    #[serde(rename = "parentPath")]
    pub parent_path: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub(crate) struct SaveNoteRequest {
    pub title: String,
    pub content: String,
    pub folder: String,

    /// Title the note was opened with; the backend uses it to detect renames.
    #[serde(rename = "oldTitle")]
    pub old_title: String,
}

/// Response shape shared by the create/delete endpoints.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub(crate) struct ActionResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub redirect: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub(crate) struct SaveNoteResponse {
    #[serde(default)]
    pub redirect: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub(crate) struct SyncResponse {
    #[serde(default)]
    pub message: Option<String>,
}

/// Body the backend sends with non-success statuses.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_children_response_go_field_names() {
        let json = r#"{
            "children": [
                {"Name": "a", "Path": "docs/a", "HasChildren": true, "IsExpanded": false, "Children": [], "IsNote": false},
                {"Name": "Note1", "Path": "docs/Note1", "HasChildren": false, "IsExpanded": false, "Children": [], "IsNote": true}
            ]
        }"#;
        let parsed: ChildrenResponse = serde_json::from_str(json).expect("should parse");
        let children = parsed.into_children();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].path, "docs/a");
        assert!(children[0].has_children);
        assert!(!children[0].is_note);
        assert!(children[1].is_note);
    }

    #[test]
    fn test_children_response_camel_case_aliases() {
        let json = r#"{"children": [{"path": "docs/a", "name": "a", "isNote": false, "hasChildren": false}]}"#;
        let parsed: ChildrenResponse = serde_json::from_str(json).expect("should parse");
        assert_eq!(
            parsed.into_children(),
            vec![ChildDescriptor {
                path: "docs/a".to_string(),
                name: "a".to_string(),
                is_note: false,
                has_children: false,
            }]
        );
    }

    #[test]
    fn test_children_response_null_children_is_empty() {
        let parsed: ChildrenResponse =
            serde_json::from_str(r#"{"children": null}"#).expect("should parse");
        assert!(parsed.into_children().is_empty());
    }

    #[test]
    fn test_create_category_request_uses_parent_path_key() {
        let req = CreateCategoryRequest {
            name: "guides".to_string(),
            parent_path: "docs".to_string(),
        };
        let v = serde_json::to_value(req).expect("should serialize");
        assert_eq!(v["name"], "guides");
        assert_eq!(v["parentPath"], "docs");
        assert!(v.get("sha").is_none());
    }

    #[test]
    fn test_save_note_request_includes_old_title() {
        let req = SaveNoteRequest {
            title: "New".to_string(),
            content: "body".to_string(),
            folder: "docs".to_string(),
            old_title: "Old".to_string(),
        };
        let v = serde_json::to_value(req).expect("should serialize");
        assert_eq!(v["oldTitle"], "Old");
        assert_eq!(v["folder"], "docs");
    }

    #[test]
    fn test_action_response_defaults() {
        let parsed: ActionResponse =
            serde_json::from_str(r#"{"success": true, "redirect": "/"}"#).expect("should parse");
        assert!(parsed.success);
        assert_eq!(parsed.redirect.as_deref(), Some("/"));
        assert!(parsed.error.is_none());

        let parsed: ActionResponse =
            serde_json::from_str(r#"{"error": "Category name is required"}"#)
                .expect("should parse");
        assert!(!parsed.success);
    }
}
