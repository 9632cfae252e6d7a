//! HTTP client for the SharePoint REST API.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use shift_core::{
    CopyJobHandle, CopyJobProgress, CopyJobRequest, FolderRef, ItemId, RemoteItem, ShiftError,
    ShiftResult, Site,
};
use shift_ops::{BoxFuture, CopyJobService, DirectoryService, ItemService};
use tracing::debug;

use crate::path::quoted_parameter;
use crate::wire::{odata_error, ItemRow, ODataList, ProgressQuery};

const ODATA_JSON: &str = "application/json;odata=nometadata";
const ITEM_FIELDS: &str = "ServerRelativeUrl,Name,UniqueId";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Authenticated SharePoint REST client.
///
/// One client serves any number of sites; the site is given per call.
#[derive(Clone)]
pub struct SharePointClient {
    http: Client,
    token: String,
}

impl std::fmt::Debug for SharePointClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharePointClient")
            .field("token", &"<redacted>")
            .finish()
    }
}

impl SharePointClient {
    /// Create a client that authenticates with a bearer `token`.
    pub fn new(token: impl Into<String>) -> ShiftResult<Self> {
        Self::with_timeout(token, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(token: impl Into<String>, timeout: Duration) -> ShiftResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ODATA_JSON));

        let http = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ShiftError::invalid_config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            token: token.into(),
        })
    }

    fn post(&self, url: &str) -> RequestBuilder {
        self.http
            .post(url)
            .bearer_auth(&self.token)
            .header(CONTENT_TYPE, ODATA_JSON)
    }

    async fn send(&self, request: RequestBuilder) -> ShiftResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| ShiftError::network(e.to_string()))?;

        let status = response.status();
        debug!(url = %response.url(), status = status.as_u16(), "platform response");
        if status.is_success() {
            return Ok(response);
        }

        let body = response.bytes().await.unwrap_or_default();
        let message = odata_error(&body).unwrap_or_else(|| {
            let text = String::from_utf8_lossy(&body).trim().to_string();
            if text.is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                text
            }
        });
        Err(ShiftError::http(status.as_u16(), message))
    }

    async fn json<T: DeserializeOwned>(&self, request: RequestBuilder) -> ShiftResult<T> {
        let body = self
            .send(request)
            .await?
            .bytes()
            .await
            .map_err(|e| ShiftError::network(e.to_string()))?;
        serde_json::from_slice(&body).map_err(|e| ShiftError::Decode {
            message: format!("unexpected response: {e}"),
        })
    }

    async fn list(
        &self,
        site: &Site,
        folder: &FolderRef,
        collection: &str,
    ) -> ShiftResult<Vec<ItemRow>> {
        let url = match folder {
            FolderRef::Id(id) => site.api_url(&format!(
                "web/GetFolderById('{id}')/{collection}?$select={ITEM_FIELDS}"
            )),
            FolderRef::Path(path) => site.api_url(&format!(
                "web/GetFolderByServerRelativeUrl(@p1)/{collection}?@p1={}&$select={ITEM_FIELDS}",
                quoted_parameter(path)
            )),
        };
        let request = self.http.get(url).bearer_auth(&self.token);
        let list: ODataList<ItemRow> = self.json(request).await?;
        Ok(list.value)
    }
}

impl DirectoryService for SharePointClient {
    fn list_folders<'a>(
        &'a self,
        site: &'a Site,
        folder: &'a FolderRef,
    ) -> BoxFuture<'a, ShiftResult<Vec<RemoteItem>>> {
        Box::pin(async move {
            let rows = self.list(site, folder, "Folders").await?;
            Ok(rows.into_iter().map(ItemRow::into_folder).collect())
        })
    }

    fn list_files<'a>(
        &'a self,
        site: &'a Site,
        folder: &'a FolderRef,
    ) -> BoxFuture<'a, ShiftResult<Vec<RemoteItem>>> {
        Box::pin(async move {
            let rows = self.list(site, folder, "Files").await?;
            Ok(rows.into_iter().map(ItemRow::into_file).collect())
        })
    }
}

impl ItemService for SharePointClient {
    fn create_folder<'a>(
        &'a self,
        site: &'a Site,
        path: &'a str,
    ) -> BoxFuture<'a, ShiftResult<RemoteItem>> {
        Box::pin(async move {
            let url = site.api_url(&format!(
                "web/folders/add(@p1)?@p1={}",
                quoted_parameter(path)
            ));
            let row: ItemRow = self.json(self.post(&url)).await?;
            Ok(row.into_folder())
        })
    }

    fn move_file<'a>(
        &'a self,
        site: &'a Site,
        id: &'a ItemId,
        destination_path: &'a str,
    ) -> BoxFuture<'a, ShiftResult<()>> {
        Box::pin(async move {
            // flags=1 overwrites an existing file at the destination.
            let url = site.api_url(&format!(
                "web/GetFileById('{id}')/moveTo(newurl=@p1,flags=1)?@p1={}",
                quoted_parameter(destination_path)
            ));
            self.send(self.post(&url)).await?;
            Ok(())
        })
    }

    fn delete_folder<'a>(
        &'a self,
        site: &'a Site,
        id: &'a ItemId,
    ) -> BoxFuture<'a, ShiftResult<()>> {
        Box::pin(async move {
            let url = site.api_url(&format!("web/GetFolderById('{id}')"));
            let request = self
                .post(&url)
                .header("X-HTTP-Method", "DELETE")
                .header("IF-MATCH", "*");
            self.send(request).await?;
            Ok(())
        })
    }
}

impl CopyJobService for SharePointClient {
    fn create_copy_job<'a>(
        &'a self,
        site: &'a Site,
        request: &'a CopyJobRequest,
    ) -> BoxFuture<'a, ShiftResult<CopyJobHandle>> {
        Box::pin(async move {
            let url = site.api_url("site/CreateCopyJobs");
            let response = self
                .post(&url)
                .json(request)
                .send()
                .await
                .map_err(|e| ShiftError::network(e.to_string()))?;
            let status = response.status();
            let body = response
                .bytes()
                .await
                .map_err(|e| ShiftError::network(e.to_string()))?;

            // A refused job comes back as an error payload, with or without a
            // failure status.
            if let Some(message) = odata_error(&body) {
                let refused = status.is_success()
                    || (status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS);
                if refused {
                    return Err(ShiftError::JobRejected { message });
                }
            }
            if !status.is_success() {
                return Err(ShiftError::http(
                    status.as_u16(),
                    String::from_utf8_lossy(&body).trim().to_string(),
                ));
            }

            let list: ODataList<CopyJobHandle> =
                serde_json::from_slice(&body).map_err(|e| ShiftError::Decode {
                    message: format!("unexpected CreateCopyJobs response: {e}"),
                })?;
            list.value.into_iter().next().ok_or_else(|| ShiftError::Decode {
                message: "CreateCopyJobs returned no job".to_string(),
            })
        })
    }

    fn copy_job_progress<'a>(
        &'a self,
        site: &'a Site,
        handle: &'a CopyJobHandle,
    ) -> BoxFuture<'a, ShiftResult<CopyJobProgress>> {
        Box::pin(async move {
            let url = site.api_url("site/GetCopyJobProgress");
            let body = ProgressQuery {
                copy_job_info: handle,
            };
            self.json(self.post(&url).json(&body)).await
        })
    }
}
