//! REST response shapes (`odata=nometadata`).

use serde::{Deserialize, Serialize};
use shift_core::{CopyJobHandle, RemoteItem};

/// A collection response: `{ "value": [...] }`.
#[derive(Debug, Deserialize)]
pub(crate) struct ODataList<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
}

/// A folder or file row selected with `ServerRelativeUrl,Name,UniqueId`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ItemRow {
    pub server_relative_url: String,
    pub name: String,
    pub unique_id: String,
}

impl ItemRow {
    pub fn into_folder(self) -> RemoteItem {
        RemoteItem::folder(self.unique_id, self.name, self.server_relative_url)
    }

    pub fn into_file(self) -> RemoteItem {
        RemoteItem::file(self.unique_id, self.name, self.server_relative_url)
    }
}

/// Body of a `GetCopyJobProgress` call.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProgressQuery<'a> {
    pub copy_job_info: &'a CopyJobHandle,
}

/// Error payload, keyed `odata.error` or `error` depending on the format.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(rename = "odata.error", alias = "error")]
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<ErrorMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorMessage {
    Text(String),
    Localized { value: String },
}

/// The message of an OData error payload, if `body` is one.
pub(crate) fn odata_error(body: &[u8]) -> Option<String> {
    let envelope: ErrorEnvelope = serde_json::from_slice(body).ok()?;
    let message = match envelope.error.message {
        Some(ErrorMessage::Text(text)) => text,
        Some(ErrorMessage::Localized { value }) => value,
        None => String::new(),
    };
    match (envelope.error.code, message.is_empty()) {
        (Some(code), true) => Some(code),
        (_, true) => Some("unknown error".to_string()),
        (_, false) => Some(message),
    }
}
