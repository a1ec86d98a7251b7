// API client module: a thin async HTTP client for the CMS content API
// (`<base>/api/...`) and the admin API (`<base>/...`). Every method issues
// exactly one request; nothing is retried or cached.

use std::fmt::Display;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::multipart;
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{ConfigError, RemoteRequestError};
use crate::scheduler::SchedulerPlugin;

/// Async client holding the CMS root URL, the content token and the
/// optional admin credentials. Cloning is cheap; the underlying reqwest
/// client shares its connection pool.
#[derive(Clone)]
pub struct CmsClient {
    client: Client,
    base_url: String,
    api_token: String,
    admin_token: Option<String>,
    scheduler: Option<SchedulerPlugin>,
}

/// Response to entry creation and update. The CMS reports failures inside
/// the body, so callers must look at `error` even on a successful send.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct JsonResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default)]
    pub data: Option<EntryData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RemoteError>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EntryData {
    pub id: i64,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RemoteError {
    pub status: u16,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Option<Value>,
}

impl JsonResponse {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Id of the created or updated entry, if the call succeeded.
    pub fn entry_id(&self) -> Option<i64> {
        self.data.as_ref().map(|d| d.id)
    }
}

/// One rendition of an uploaded asset. Dimensions are absent for
/// non-image files.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FileUploadFormat {
    pub hash: String,
    pub ext: String,
    pub mime: String,
    pub size: f64,
    pub url: String,
    pub name: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

/// Renditions generated by the CMS. Small images skip the larger ones.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct FileFormats {
    #[serde(default)]
    pub thumbnail: Option<FileUploadFormat>,
    #[serde(default)]
    pub small: Option<FileUploadFormat>,
    #[serde(default)]
    pub medium: Option<FileUploadFormat>,
    #[serde(default)]
    pub large: Option<FileUploadFormat>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileUploadResponse {
    pub id: i64,
    #[serde(flatten)]
    pub file: FileUploadFormat,
    #[serde(default)]
    pub alternative_text: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub formats: Option<FileFormats>,
    #[serde(default)]
    pub preview_url: Option<String>,
    pub provider: String,
    #[serde(default, rename = "provider_metadata")]
    pub provider_metadata: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MediaFolderCreation {
    pub data: FolderRef,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FolderRef {
    pub id: i64,
}

/// Unparsed reply from admin endpoints whose body shape is not fixed
/// (bulk move, scheduler plugins).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body).context("Parsing response body as json")
    }
}

#[derive(Serialize)]
struct DataEnvelope<'a, T: ?Sized> {
    data: &'a T,
}

/// Metadata sent alongside an upload. Unset fields are left out of the
/// JSON entirely.
#[derive(Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
struct FileInfo<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    alternative_text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    caption: Option<&'a str>,
}

#[derive(Serialize)]
struct FolderRequest<'a> {
    name: &'a str,
    parent: Option<i64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BulkMoveRequest<'a> {
    destination_folder_id: i64,
    file_ids: &'a [i64],
}

/// An asset ready to be sent as the `files` part of an upload.
struct AssetPayload {
    bytes: Vec<u8>,
    file_name: String,
    mime: String,
}

/// Whether an upload source should be downloaded rather than read from disk.
pub fn is_remote_asset(path_or_url: &str) -> bool {
    path_or_url.starts_with("http://") || path_or_url.starts_with("https://")
}

impl CmsClient {
    /// Build a client for the CMS at `base_url`. Trailing slashes are
    /// dropped so `/api` and admin paths join cleanly. An empty admin token
    /// is treated as no admin token.
    pub fn new(
        base_url: impl Into<String>,
        api_token: impl Into<String>,
        admin_token: Option<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to build HTTP client")?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(CmsClient {
            client,
            base_url,
            api_token: api_token.into(),
            admin_token: admin_token.filter(|t| !t.is_empty()),
            scheduler: None,
        })
    }

    pub fn from_config(config: ClientConfig) -> Result<Self> {
        let mut client = Self::new(config.base_url, config.api_token, config.admin_token)?;
        client.scheduler = config.scheduler_plugin;
        Ok(client)
    }

    /// Create a client from the `CMS_*` environment variables. See
    /// [`ClientConfig::from_env`].
    pub fn from_env() -> Result<Self> {
        Self::from_config(ClientConfig::from_env()?)
    }

    /// Record which scheduler plugin the CMS has installed. Must happen
    /// before [`CmsClient::add_publish_date`] or
    /// [`CmsClient::add_unpublish_date`].
    pub fn configure_scheduler(&mut self, plugin: SchedulerPlugin) {
        self.scheduler = Some(plugin);
    }

    pub fn scheduler(&self) -> Option<SchedulerPlugin> {
        self.scheduler
    }

    pub fn has_admin_token(&self) -> bool {
        self.admin_token.is_some()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }

    fn admin_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn auth_headers(token: &str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let val = HeaderValue::from_str(&format!("Bearer {}", token))
            .context("Token contains characters not allowed in a header")?;
        headers.insert(AUTHORIZATION, val);
        Ok(headers)
    }

    fn require_admin_token(&self, operation: &'static str) -> Result<&str, ConfigError> {
        self.admin_token
            .as_deref()
            .ok_or(ConfigError::MissingAdminToken(operation))
    }

    fn require_scheduler(&self) -> Result<SchedulerPlugin, ConfigError> {
        self.scheduler.ok_or(ConfigError::MissingSchedulerPlugin)
    }

    /// Create an entry of collection `api_id`. The payload is wrapped as
    /// `{ "data": ... }` and nothing else is added.
    pub async fn create_entry<T>(&self, api_id: &str, data: &T) -> Result<JsonResponse>
    where
        T: Serialize + ?Sized,
    {
        let url = self.api_url(api_id);
        debug!(method = "POST", %url, "creating entry");
        let res = self
            .client
            .post(&url)
            .headers(Self::auth_headers(&self.api_token)?)
            .json(&DataEnvelope { data })
            .send()
            .await
            .context("Failed to send create entry request")?;
        Self::parse_entry_response(res).await
    }

    /// Update entry `id` of collection `api_id` with only the given fields.
    /// `id` may be a numeric id or a document id string.
    pub async fn update_entry<T>(
        &self,
        api_id: &str,
        id: impl Display,
        data: &T,
    ) -> Result<JsonResponse>
    where
        T: Serialize + ?Sized,
    {
        let url = self.api_url(&format!("{}/{}", api_id, id));
        debug!(method = "PUT", %url, "updating entry");
        let res = self
            .client
            .put(&url)
            .headers(Self::auth_headers(&self.api_token)?)
            .json(&DataEnvelope { data })
            .send()
            .await
            .context("Failed to send update entry request")?;
        Self::parse_entry_response(res).await
    }

    async fn parse_entry_response(res: Response) -> Result<JsonResponse> {
        let http_status = res.status();
        let resp: JsonResponse = res.json().await.context("Parsing entry response json")?;
        if let Some(err) = &resp.error {
            warn!(%http_status, status = err.status, message = ?err.message, "CMS reported an error");
        }
        Ok(resp)
    }

    /// Upload a media asset from a local path or an `http(s)://` URL.
    /// Remote assets are downloaded first; local files get their MIME type
    /// from the extension. `alt` and `caption` become the asset's
    /// `fileInfo`.
    ///
    /// A remote source answering with a non-2xx status is an error and
    /// nothing is uploaded. A rejected upload returns a [`RemoteRequestError`].
    pub async fn add_media_asset(
        &self,
        path_or_url: &str,
        alt: Option<&str>,
        caption: Option<&str>,
    ) -> Result<Vec<FileUploadResponse>> {
        let asset = if is_remote_asset(path_or_url) {
            self.fetch_remote_asset(path_or_url).await?
        } else {
            read_local_asset(Path::new(path_or_url)).await?
        };

        let part = multipart::Part::bytes(asset.bytes)
            .file_name(asset.file_name)
            .mime_str(&asset.mime)
            .context("Invalid MIME type for asset")?;
        let file_info = serde_json::to_string(&FileInfo {
            alternative_text: alt,
            caption,
        })?;
        let form = multipart::Form::new()
            .part("files", part)
            .text("fileInfo", file_info);

        let url = self.api_url("upload");
        debug!(method = "POST", %url, source = path_or_url, "uploading media asset");
        let res = self
            .client
            .post(&url)
            .headers(Self::auth_headers(&self.api_token)?)
            .multipart(form)
            .send()
            .await
            .context("Failed to send upload request")?;
        parse_typed(res, "upload").await
    }

    async fn fetch_remote_asset(&self, url: &str) -> Result<AssetPayload> {
        debug!(method = "GET", %url, "fetching remote asset");
        let res = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch remote asset {}", url))?
            .error_for_status()
            .with_context(|| format!("Remote asset {} could not be downloaded", url))?;

        let file_name = remote_file_name(url);
        let mime = res
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| {
                mime_guess::from_path(&file_name)
                    .first_or_octet_stream()
                    .to_string()
            });
        let bytes = res
            .bytes()
            .await
            .context("Failed to read remote asset body")?
            .to_vec();
        Ok(AssetPayload {
            bytes,
            file_name,
            mime,
        })
    }

    /// Create a media library folder, optionally nested under `parent_id`.
    /// Requires an admin token.
    pub async fn create_media_folder(
        &self,
        folder_name: &str,
        parent_id: Option<i64>,
    ) -> Result<MediaFolderCreation> {
        let token = self.require_admin_token("media folder creation")?;
        let url = self.admin_url("upload/folders/");
        debug!(method = "POST", %url, folder = folder_name, "creating media folder");
        let res = self
            .client
            .post(&url)
            .headers(Self::auth_headers(token)?)
            .json(&FolderRequest {
                name: folder_name,
                parent: parent_id,
            })
            .send()
            .await
            .context("Failed to send create folder request")?;
        parse_typed(res, "folder").await
    }

    /// Move uploaded files into `folder_id`. The CMS reply is returned as-is;
    /// a partial move is only visible in its body.
    pub async fn move_media(&self, folder_id: i64, media_ids: &[i64]) -> Result<RawResponse> {
        let token = self.require_admin_token("moving media")?;
        let url = self.admin_url("upload/actions/bulk-move");
        debug!(method = "POST", %url, folder_id, count = media_ids.len(), "moving media");
        let res = self
            .client
            .post(&url)
            .headers(Self::auth_headers(token)?)
            .json(&BulkMoveRequest {
                destination_folder_id: folder_id,
                file_ids: media_ids,
            })
            .send()
            .await
            .context("Failed to send bulk move request")?;
        into_raw(res).await
    }

    pub async fn add_publish_date(
        &self,
        content_type: &str,
        id: i64,
        date: DateTime<Utc>,
    ) -> Result<RawResponse> {
        self.schedule(content_type, id, date, true).await
    }

    pub async fn add_unpublish_date(
        &self,
        content_type: &str,
        id: i64,
        date: DateTime<Utc>,
    ) -> Result<RawResponse> {
        self.schedule(content_type, id, date, false).await
    }

    async fn schedule(
        &self,
        content_type: &str,
        id: i64,
        date: DateTime<Utc>,
        publish: bool,
    ) -> Result<RawResponse> {
        let plugin = self.require_scheduler()?;
        let token = self.require_admin_token("scheduling")?;

        let url = self.admin_url(plugin.path());
        debug!(method = "POST", %url, %plugin, content_type, id, publish, "scheduling entry");
        let res = self
            .client
            .post(&url)
            .headers(Self::auth_headers(token)?)
            .json(&plugin.request(content_type, id, date, publish))
            .send()
            .await
            .context("Failed to send schedule request")?;
        into_raw(res).await
    }
}

async fn read_local_asset(path: &Path) -> Result<AssetPayload> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read asset file {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("file")
        .to_string();
    let mime = mime_guess::from_path(path).first_or_octet_stream().to_string();
    Ok(AssetPayload {
        bytes,
        file_name,
        mime,
    })
}

/// Last non-empty path segment of a URL, ignoring query and fragment.
/// A URL with no path falls back to `file` rather than the host name.
fn remote_file_name(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|segs| segs.filter(|s| !s.is_empty()).last().map(str::to_string))
        })
        .unwrap_or_else(|| "file".to_string())
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: Option<RemoteError>,
}

/// Parse a typed reply, or fail with the CMS's own error when the status is
/// not 2xx or the body carries an `error` object.
async fn parse_typed<T: DeserializeOwned>(res: Response, what: &str) -> Result<T> {
    let status = res.status();
    let body = res
        .text()
        .await
        .with_context(|| format!("Failed to read {} response body", what))?;
    let error = serde_json::from_str::<ErrorEnvelope>(&body)
        .ok()
        .and_then(|e| e.error);
    if !status.is_success() || error.is_some() {
        warn!(%status, what, "CMS rejected the request");
        return Err(RemoteRequestError {
            status: status.as_u16(),
            error,
            body,
        }
        .into());
    }
    serde_json::from_str(&body).with_context(|| format!("Parsing {} response json", what))
}

async fn into_raw(res: Response) -> Result<RawResponse> {
    let status = res.status().as_u16();
    let body = res.text().await.context("Failed to read response body")?;
    Ok(RawResponse { status, body })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn detects_remote_sources() {
        assert!(is_remote_asset("http://example.com/a.png"));
        assert!(is_remote_asset("https://example.com/a.png"));
        assert!(!is_remote_asset("ftp://example.com/a.png"));
        assert!(!is_remote_asset("./images/http-logo.png"));
        assert!(!is_remote_asset("HTTPS://example.com/a.png"));
    }

    #[test]
    fn remote_file_name_uses_last_segment() {
        assert_eq!(remote_file_name("https://x.io/img/cat.jpg?w=200"), "cat.jpg");
        assert_eq!(remote_file_name("https://x.io/img/dir/"), "dir");
        assert_eq!(remote_file_name("https://x.io"), "file");
    }

    #[test]
    fn file_info_omits_missing_fields() {
        let info = FileInfo {
            alternative_text: Some("a cat"),
            caption: None,
        };
        assert_eq!(serde_json::to_value(&info).unwrap(), json!({"alternativeText": "a cat"}));
    }

    #[test]
    fn trims_trailing_slash_from_base_url() {
        let client = CmsClient::new("http://cms.local/", "tok", None).unwrap();
        assert_eq!(client.api_url("articles"), "http://cms.local/api/articles");
        assert_eq!(client.admin_url("upload/folders/"), "http://cms.local/upload/folders/");
    }

    #[test]
    fn json_response_exposes_remote_error() {
        let resp: JsonResponse = serde_json::from_value(json!({
            "data": null,
            "error": {"status": 400, "name": "ValidationError", "message": "title is required"}
        }))
        .unwrap();
        assert!(resp.is_error());
        assert_eq!(resp.entry_id(), None);
        assert_eq!(resp.error.unwrap().status, 400);
    }

    #[test]
    fn json_response_keeps_entry_attributes() {
        let resp: JsonResponse = serde_json::from_value(json!({
            "data": {"id": 5, "title": "Hello"}
        }))
        .unwrap();
        assert_eq!(resp.entry_id(), Some(5));
        assert_eq!(resp.data.unwrap().attributes["title"], "Hello");
    }

    #[test]
    fn raw_response_success_range() {
        let ok = RawResponse { status: 204, body: String::new() };
        let bad = RawResponse { status: 403, body: "{}".into() };
        assert!(ok.is_success());
        assert!(!bad.is_success());
        let v: Value = bad.json().unwrap();
        assert_eq!(v, json!({}));
    }
}
