//! Purpose: File-service calls routed through a specific registry instance.
//! Exports: `FileServiceClient`, `FileType`, `FileMeta`, `TextFile`, `SaveFileResponse`,
//! `BooleanResponse`.
//! Role: Thin plumbing over the dispatcher, registry resolver and host routes.
//! Invariants: Query values are form-urlencoded; paths are never interpolated raw.
#![allow(clippy::result_large_err)]

use super::dispatch::{Body, Dispatcher, Method, MultipartForm};
use super::gateway::host_route;
use super::registry::{RegistryResolver, ServiceDescriptor};
use crate::core::error::ApiResult;
use serde::{Deserialize, Serialize};
use url::form_urlencoded;

pub const FILE_SERVICE_CLASS: &str = "fileservice";

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FileType {
    Regular,
    Dir,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMeta {
    pub full_name: String,
    #[serde(rename = "type")]
    pub file_type: FileType,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub last_update_on: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextFile {
    pub meta: FileMeta,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveFileResponse {
    pub meta: FileMeta,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BooleanResponse {
    pub result: bool,
}

#[derive(Clone, Debug)]
pub struct FileServiceClient {
    resolver: RegistryResolver,
}

impl FileServiceClient {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            resolver: RegistryResolver::new(dispatcher),
        }
    }

    fn dispatcher(&self) -> &Dispatcher {
        self.resolver.dispatcher()
    }

    /// Lists live file-service instances; any gateway instance can answer this.
    pub fn instances(&self) -> ApiResult<Vec<ServiceDescriptor>> {
        self.resolver.resolve_services(FILE_SERVICE_CLASS)
    }

    pub fn get_text_file(&self, instance: &ServiceDescriptor, path: &str) -> ApiResult<TextFile> {
        let url = format!(
            "{}/api/file/text?{}",
            host_route(instance),
            query(&[("path", path)])
        );
        self.dispatcher().get_json(&url)?.json()
    }

    pub fn save_text_file(
        &self,
        instance: &ServiceDescriptor,
        path: &str,
        last_update_on: i64,
        text: &str,
    ) -> ApiResult<SaveFileResponse> {
        let last_update_on = last_update_on.to_string();
        let url = format!(
            "{}/api/file/text?{}",
            host_route(instance),
            query(&[("lastUpdateOn", &last_update_on), ("path", path)])
        );
        self.dispatcher()
            .dispatch(
                Method::Post,
                &url,
                Some("text/plain"),
                Some(Body::Text(text.to_string())),
            )?
            .json()
    }

    /// Uploads a multipart form into `dir`; the transport supplies the boundary header.
    pub fn upload(
        &self,
        instance: &ServiceDescriptor,
        dir: &str,
        form: MultipartForm,
    ) -> ApiResult<BooleanResponse> {
        let url = format!(
            "{}/api/file/upload?{}",
            host_route(instance),
            query(&[("path", dir)])
        );
        self.dispatcher()
            .dispatch(Method::Post, &url, None, Some(Body::Multipart(form)))?
            .json()
    }
}

fn query(pairs: &[(&str, &str)]) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

#[cfg(test)]
mod tests {
    use super::{FileType, SaveFileResponse, TextFile, query};
    use serde_json::json;

    #[test]
    fn query_encodes_reserved_characters() {
        assert_eq!(
            query(&[("lastUpdateOn", "12"), ("path", "/data/a b&c.txt")]),
            "lastUpdateOn=12&path=%2Fdata%2Fa+b%26c.txt"
        );
    }

    #[test]
    fn text_file_decodes_wire_shape() {
        let file: TextFile = serde_json::from_value(json!({
            "meta": {"fullName": "/data/a.txt", "type": "REGULAR", "size": 5, "lastUpdateOn": 1700000000000i64},
            "text": "hello"
        }))
        .expect("decode");
        assert_eq!(file.meta.file_type, FileType::Regular);
        assert_eq!(file.meta.size, Some(5));
        assert_eq!(file.text, "hello");
    }

    #[test]
    fn save_response_allows_missing_optionals() {
        let response: SaveFileResponse = serde_json::from_value(json!({
            "meta": {"fullName": "/data", "type": "DIR"}
        }))
        .expect("decode");
        assert_eq!(response.meta.file_type, FileType::Dir);
        assert_eq!(response.meta.last_update_on, None);
        assert_eq!(response.message, None);
    }
}
