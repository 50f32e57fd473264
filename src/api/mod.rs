use crate::config::EnvConfig;
use crate::models::{
    ActionResponse, ChildDescriptor, ChildrenResponse, CreateCategoryRequest, ErrorBody,
    SaveNoteRequest, SaveNoteResponse, SyncResponse,
};
use crate::tree::ChildrenSource;
use reqwest::Method;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ApiErrorKind {
    Network,
    Http,
    Parse,
    /// The backend answered 2xx but reported `success: false`.
    Rejected,
}

#[derive(Clone, Debug)]
pub(crate) struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    fn network(e: reqwest::Error) -> Self {
        Self {
            kind: ApiErrorKind::Network,
            message: e.to_string(),
        }
    }

    pub(crate) fn parse(e: impl std::fmt::Display) -> Self {
        Self {
            kind: ApiErrorKind::Parse,
            message: e.to_string(),
        }
    }

    pub(crate) fn http(status: u16, body: &str, ctx: &str) -> Self {
        Self {
            kind: ApiErrorKind::Http,
            message: format!("{ctx} ({status}): {}", error_message(body)),
        }
    }

    pub(crate) fn rejected(message: Option<String>, fallback: &str) -> Self {
        Self {
            kind: ApiErrorKind::Rejected,
            message: message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| fallback.to_string()),
        }
    }
}

pub(crate) type ApiResult<T> = Result<T, ApiError>;

/// Pull the `error` field out of a backend error body, falling back to the raw text.
pub(crate) fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .filter(|e| !e.trim().is_empty())
        .unwrap_or_else(|| body.trim().to_string())
}

/// Percent-encode each segment of a slash-delimited path, keeping the slashes.
pub(crate) fn encode_path(path: &str) -> String {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(|s| urlencoding::encode(s).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

pub(crate) fn children_endpoint(path: &str) -> String {
    // The route is `/api/folders/children/*path`; the root is the bare trailing slash.
    format!("/api/folders/children/{}", encode_path(path))
}

pub(crate) fn delete_note_endpoint(title: &str, folder: &str) -> String {
    let mut url = format!("/delete/{}", urlencoding::encode(title.trim()));
    if !folder.trim().is_empty() {
        url.push_str(&format!("?folder={}", urlencoding::encode(folder.trim())));
    }
    url
}

pub(crate) fn delete_folder_endpoint(path: &str) -> String {
    format!("/api/folder/delete?path={}", urlencoding::encode(path))
}

#[derive(Clone, Debug)]
pub(crate) struct ApiClient {
    pub(crate) base_url: String,
}

impl ApiClient {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_env() -> Self {
        Self::new(EnvConfig::new().api_url)
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn request_api<T: serde::de::DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&impl serde::Serialize>,
    ) -> ApiResult<T> {
        let client = reqwest::Client::new();
        let mut req = client
            .request(method, self.url(path))
            .header("Accept", "application/json");

        if let Some(b) = body {
            req = req.json(b);
        }

        let res = req.send().await.map_err(ApiError::network)?;

        if res.status().is_success() {
            res.json().await.map_err(ApiError::parse)
        } else {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            Err(ApiError::http(status, &body, "Request failed"))
        }
    }

    pub async fn get_folder_children(&self, path: &str) -> ApiResult<Vec<ChildDescriptor>> {
        let data: ChildrenResponse = self
            .request_api(Method::GET, &children_endpoint(path), None::<&()>)
            .await?;
        Ok(data.into_children())
    }

    pub async fn create_category(&self, name: &str, parent_path: &str) -> ApiResult<String> {
        let data: ActionResponse = self
            .request_api(
                Method::POST,
                "/category/create",
                Some(&CreateCategoryRequest {
                    name: name.trim().to_string(),
                    parent_path: parent_path.trim_matches('/').to_string(),
                }),
            )
            .await?;

        if !data.success {
            return Err(ApiError::rejected(data.error, "Failed to create category"));
        }
        Ok(data.message.unwrap_or_default())
    }

    /// Returns the page the browser should go to next.
    pub async fn delete_folder(&self, path: &str) -> ApiResult<String> {
        let data: ActionResponse = self
            .request_api(Method::DELETE, &delete_folder_endpoint(path), None::<&()>)
            .await?;

        if !data.success {
            return Err(ApiError::rejected(data.error, "Failed to delete folder"));
        }
        Ok(data.redirect.unwrap_or_else(|| "/".to_string()))
    }

    /// Returns the page the browser should go to next.
    pub async fn delete_note(&self, title: &str, folder: &str) -> ApiResult<String> {
        let data: ActionResponse = self
            .request_api(
                Method::POST,
                &delete_note_endpoint(title, folder),
                None::<&()>,
            )
            .await?;

        if !data.success {
            return Err(ApiError::rejected(data.error, "Failed to delete note"));
        }
        Ok(data.redirect.unwrap_or_else(|| "/".to_string()))
    }

    pub async fn save_note(&self, req: &SaveNoteRequest) -> ApiResult<Option<String>> {
        let data: SaveNoteResponse = self.request_api(Method::POST, "/save", Some(req)).await?;
        Ok(data.redirect)
    }

    pub async fn sync(&self) -> ApiResult<String> {
        let data: SyncResponse = self
            .request_api(Method::POST, "/api/sync", None::<&()>)
            .await?;
        Ok(data.message.unwrap_or_default())
    }
}

impl ChildrenSource for ApiClient {
    async fn list_children(&self, path: &str) -> ApiResult<Vec<ChildDescriptor>> {
        self.get_folder_children(path).await
    }
}
