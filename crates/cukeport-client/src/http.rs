// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! HTTP gateway for a ReportPortal-compatible backend
//!
//! Each create call is issued on a spawned task and keyed by a temporary
//! [`Handle`]. Later calls that reference the handle wait for the remote id
//! before sending their own request, so callers never block on the network.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, Url};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use crate::error::GatewayError;
use crate::gateway::{Completion, Gateway, Handle, Submitted, completion, rejected};
use crate::model::{
    FinishItemRequest, FinishLaunchRequest, LogFile, LogRequest, StartItemRequest,
    StartLaunchRequest,
};

/// Remote id of a created launch or item, once the backend answered
type RemoteId = Shared<BoxFuture<'static, Result<String, GatewayError>>>;

struct Entry {
    remote: RemoteId,
    /// Owning launch for items, `None` for launches
    launch: Option<Handle>,
}

struct Inner {
    client: Client,
    base_url: Url,
    token: String,
    entries: Mutex<HashMap<Handle, Entry>>,
}

/// Body of a create response
#[derive(Debug, Deserialize)]
struct CreatedResponse {
    id: String,
}

/// Gateway talking to the backend over HTTP
#[derive(Clone)]
pub struct HttpGateway {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for HttpGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpGateway")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl HttpGateway {
    /// Create a gateway for `project` on the backend at `endpoint`
    ///
    /// `endpoint` is the API root, e.g. `https://rp.example.com/api/v1`.
    pub fn new(endpoint: &str, project: &str, token: &str) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .user_agent(concat!("cukeport/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Self::with_client(client, endpoint, project, token)
    }

    /// Create a gateway around an existing client
    pub fn with_client(
        client: Client,
        endpoint: &str,
        project: &str,
        token: &str,
    ) -> Result<Self, GatewayError> {
        let base_url = project_url(endpoint, project)?;
        debug!(base_url = %base_url, "Created HTTP gateway");
        Ok(Self {
            inner: Arc::new(Inner {
                client,
                base_url,
                token: token.to_string(),
                entries: Mutex::new(HashMap::new()),
            }),
        })
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<Handle, Entry>> {
        self.inner.entries()
    }

    /// Number of launches and items the gateway still tracks
    ///
    /// An item is forgotten once it is finished, and a launch together with
    /// anything left under it once the launch is finished.
    #[must_use]
    pub fn tracked_handles(&self) -> usize {
        self.entries().len()
    }

    fn remote(&self, handle: &Handle) -> Result<(RemoteId, Option<Handle>), GatewayError> {
        self.entries()
            .get(handle)
            .map(|entry| (entry.remote.clone(), entry.launch))
            .ok_or(GatewayError::UnknownHandle(*handle))
    }

    /// Register a create call and return its temporary handle
    fn register<F>(&self, launch: Option<Handle>, create: F) -> Submitted
    where
        F: std::future::Future<Output = Result<String, GatewayError>> + Send + 'static,
    {
        let handle = Handle::new();
        let task = tokio::spawn(create);
        let remote: RemoteId = async move {
            task.await
                .map_err(|e| GatewayError::Transport(format!("request task failed: {e}")))?
        }
        .boxed()
        .shared();

        self.entries().insert(
            handle,
            Entry {
                remote: remote.clone(),
                launch,
            },
        );

        let done = completion(remote.map(|result| result.map(|_| ())));
        Submitted {
            handle,
            completion: done,
        }
    }

    /// Spawn a call that returns nothing and wrap it as a completion
    fn spawn_call<F>(future: F) -> Completion
    where
        F: std::future::Future<Output = Result<(), GatewayError>> + Send + 'static,
    {
        let task = tokio::spawn(future);
        completion(async move {
            task.await
                .map_err(|e| GatewayError::Transport(format!("request task failed: {e}")))?
        })
    }
}

impl Inner {
    fn entries(&self) -> MutexGuard<'_, HashMap<Handle, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn forget_item(&self, item: &Handle) {
        self.entries().remove(item);
    }

    fn forget_launch(&self, launch: &Handle) {
        self.entries()
            .retain(|handle, entry| handle != launch && entry.launch != Some(*launch));
    }

    fn url(&self, path: &str) -> Result<Url, GatewayError> {
        self.base_url
            .join(path)
            .map_err(|e| GatewayError::InvalidEndpoint(e.to_string()))
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Response, GatewayError> {
        let url = self.url(path)?;
        debug!(%url, "POST");
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;
        ensure_success(response).await
    }

    async fn put_json(&self, path: &str, body: &Value) -> Result<Response, GatewayError> {
        let url = self.url(path)?;
        debug!(%url, "PUT");
        let response = self
            .client
            .put(url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;
        ensure_success(response).await
    }

    async fn post_multipart(&self, path: &str, form: Form) -> Result<Response, GatewayError> {
        let url = self.url(path)?;
        debug!(%url, "POST multipart");
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .multipart(form)
            .send()
            .await?;
        ensure_success(response).await
    }
}

/// Await a dependency's remote id, turning its failure into a dependency error
async fn resolve(handle: Handle, remote: RemoteId) -> Result<String, GatewayError> {
    remote.await.map_err(|e| GatewayError::Dependency {
        handle,
        reason: e.to_string(),
    })
}

async fn ensure_success(response: Response) -> Result<Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(GatewayError::Http {
        status: status.as_u16(),
        body,
    })
}

async fn read_id(response: Response) -> Result<String, GatewayError> {
    let bytes = response.bytes().await?;
    let created: CreatedResponse = serde_json::from_slice(&bytes)?;
    Ok(created.id)
}

/// Build the project-scoped base URL, always ending in `/`
fn project_url(endpoint: &str, project: &str) -> Result<Url, GatewayError> {
    let project = project.trim_matches('/');
    if project.is_empty() {
        return Err(GatewayError::InvalidEndpoint("project is empty".to_string()));
    }
    let raw = format!("{}/{}/", endpoint.trim_end_matches('/'), project);
    let url = Url::parse(&raw).map_err(|e| GatewayError::InvalidEndpoint(format!("{raw}: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(GatewayError::InvalidEndpoint(raw));
    }
    Ok(url)
}

/// Serialize a request and merge extra top-level fields into it
fn body_with<T: Serialize>(request: &T, extra: &[(&str, Value)]) -> Result<Value, GatewayError> {
    let mut value = serde_json::to_value(request)?;
    let object: &mut Map<String, Value> = value
        .as_object_mut()
        .ok_or_else(|| GatewayError::Decode("request is not a JSON object".to_string()))?;
    for (key, field) in extra {
        object.insert((*key).to_string(), field.clone());
    }
    Ok(value)
}

/// Decode base64 file content, falling back to the raw bytes
fn file_bytes(file: &LogFile) -> Vec<u8> {
    match STANDARD.decode(file.content.as_bytes()) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(name = %file.name, error = %e, "Attachment content is not base64, sending raw");
            file.content.as_bytes().to_vec()
        }
    }
}

fn file_part(file: &LogFile) -> Part {
    let bytes = file_bytes(file);
    match Part::bytes(bytes.clone())
        .file_name(file.name.clone())
        .mime_str(&file.media_type)
    {
        Ok(part) => part,
        Err(_) => Part::bytes(bytes).file_name(file.name.clone()),
    }
}

impl Gateway for HttpGateway {
    fn start_launch(&self, request: StartLaunchRequest) -> Submitted {
        let inner = Arc::clone(&self.inner);
        self.register(None, async move {
            let body = body_with(&request, &[])?;
            let response = inner.post_json("launch", &body).await?;
            let id = read_id(response).await?;
            debug!(%id, name = %request.name, "Launch started");
            Ok(id)
        })
    }

    fn finish_launch(&self, launch: &Handle, request: FinishLaunchRequest) -> Completion {
        let (remote, _) = match self.remote(launch) {
            Ok(found) => found,
            Err(e) => return rejected(e),
        };
        let inner = Arc::clone(&self.inner);
        let launch = *launch;
        Self::spawn_call(async move {
            let launch_id = resolve(launch, remote).await?;
            let body = body_with(&request, &[])?;
            inner
                .put_json(&format!("launch/{launch_id}/finish"), &body)
                .await?;
            inner.forget_launch(&launch);
            debug!(%launch_id, "Launch finished");
            Ok(())
        })
    }

    fn start_item(
        &self,
        request: StartItemRequest,
        launch: &Handle,
        parent: Option<&Handle>,
    ) -> Submitted {
        let launch_remote = self.remote(launch).map(|(remote, _)| remote);
        let parent_remote = parent
            .map(|p| self.remote(p).map(|(remote, _)| (*p, remote)))
            .transpose();
        let inner = Arc::clone(&self.inner);
        let launch_handle = *launch;

        self.register(Some(*launch), async move {
            let launch_id = resolve(launch_handle, launch_remote?).await?;
            let path = match parent_remote? {
                Some((handle, remote)) => format!("item/{}", resolve(handle, remote).await?),
                None => "item".to_string(),
            };
            let body = body_with(&request, &[("launchUuid", json!(launch_id))])?;
            let response = inner.post_json(&path, &body).await?;
            read_id(response).await
        })
    }

    fn finish_item(&self, item: &Handle, request: FinishItemRequest) -> Completion {
        let (item_remote, launch) = match self.remote(item) {
            Ok(found) => found,
            Err(e) => return rejected(e),
        };
        let Some(launch) = launch else {
            return rejected(GatewayError::UnknownHandle(*item));
        };
        let launch_remote = match self.remote(&launch) {
            Ok((remote, _)) => remote,
            Err(e) => return rejected(e),
        };
        let inner = Arc::clone(&self.inner);
        let item = *item;

        Self::spawn_call(async move {
            let item_id = resolve(item, item_remote).await?;
            let launch_id = resolve(launch, launch_remote).await?;
            let body = body_with(&request, &[("launchUuid", json!(launch_id))])?;
            inner.put_json(&format!("item/{item_id}"), &body).await?;
            inner.forget_item(&item);
            Ok(())
        })
    }

    fn send_log(&self, item: &Handle, request: LogRequest, file: Option<LogFile>) -> Completion {
        let (item_remote, launch) = match self.remote(item) {
            Ok(found) => found,
            Err(e) => return rejected(e),
        };
        let Some(launch) = launch else {
            return rejected(GatewayError::UnknownHandle(*item));
        };
        let launch_remote = match self.remote(&launch) {
            Ok((remote, _)) => remote,
            Err(e) => return rejected(e),
        };
        let inner = Arc::clone(&self.inner);
        let item = *item;

        Self::spawn_call(async move {
            let item_id = resolve(item, item_remote).await?;
            let launch_id = resolve(launch, launch_remote).await?;
            let mut extra = vec![
                ("itemUuid", json!(item_id)),
                ("launchUuid", json!(launch_id)),
            ];
            match file {
                None => {
                    let body = body_with(&request, &extra)?;
                    inner.post_json("log", &body).await?;
                }
                Some(file) => {
                    extra.push(("file", json!({ "name": file.name })));
                    let body = Value::Array(vec![body_with(&request, &extra)?]);
                    let json_part = Part::text(body.to_string()).mime_str("application/json")?;
                    let form = Form::new()
                        .part("json_request_part", json_part)
                        .part("file", file_part(&file));
                    inner.post_multipart("log", form).await?;
                }
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ItemStatus, ItemType, LaunchMode, LogLevel};
    use chrono::Utc;
    use similar_asserts::assert_eq;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    /// Answer every request with 200 and a fixed created id
    async fn serve_created(listener: TcpListener) {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(answer(stream));
        }
    }

    async fn answer(mut stream: TcpStream) {
        let mut request = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let Ok(read) = stream.read(&mut chunk).await else {
                return;
            };
            if read == 0 {
                return;
            }
            request.extend_from_slice(&chunk[..read]);
            let Some(end) = request.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let head = String::from_utf8_lossy(&request[..end]).to_ascii_lowercase();
            let length: usize = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|value| value.trim().parse().ok())
                .unwrap_or(0);
            if request.len() >= end + 4 + length {
                break;
            }
        }
        let body = r#"{"id":"remote-1"}"#;
        let response = format!(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        let _ = stream.write_all(response.as_bytes()).await;
        let _ = stream.shutdown().await;
    }

    fn launch_request() -> StartLaunchRequest {
        StartLaunchRequest {
            name: "nightly".to_string(),
            start_time: Utc::now(),
            description: String::new(),
            attributes: Vec::new(),
            mode: LaunchMode::Default,
        }
    }

    #[test]
    fn test_project_url_joins_paths() {
        let url = project_url("https://rp.example.com/api/v1/", "shop").expect("valid");
        assert_eq!(url.as_str(), "https://rp.example.com/api/v1/shop/");
        assert_eq!(
            url.join("launch").expect("join").as_str(),
            "https://rp.example.com/api/v1/shop/launch"
        );
        assert_eq!(
            url.join("item/abc").expect("join").as_str(),
            "https://rp.example.com/api/v1/shop/item/abc"
        );
    }

    #[test]
    fn test_project_url_rejects_bad_input() {
        assert!(matches!(
            project_url("not a url", "shop"),
            Err(GatewayError::InvalidEndpoint(_))
        ));
        assert!(matches!(
            project_url("https://rp.example.com/api/v1", "/"),
            Err(GatewayError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn test_body_with_merges_fields() {
        let request = FinishItemRequest {
            status: ItemStatus::Failed,
            end_time: Utc::now(),
        };
        let body = body_with(&request, &[("launchUuid", json!("L-1"))]).expect("body");
        assert_eq!(body["status"], json!("failed"));
        assert_eq!(body["launchUuid"], json!("L-1"));
        assert!(body.get("endTime").is_some());
    }

    #[test]
    fn test_file_bytes_decodes_base64() {
        let file = LogFile {
            name: "note.txt".to_string(),
            media_type: "text/plain".to_string(),
            content: "aGVsbG8=".to_string(),
        };
        assert_eq!(file_bytes(&file), b"hello".to_vec());
    }

    #[test]
    fn test_file_bytes_falls_back_to_raw() {
        let file = LogFile {
            name: "page.html".to_string(),
            media_type: "text/html".to_string(),
            content: "<p>hi</p>".to_string(),
        };
        assert_eq!(file_bytes(&file), b"<p>hi</p>".to_vec());
    }

    #[tokio::test]
    async fn test_unknown_handle_is_rejected() {
        let gateway =
            HttpGateway::new("http://127.0.0.1:1/api/v1", "shop", "token").expect("gateway");
        let stray = Handle::new();
        let result = gateway
            .finish_item(
                &stray,
                FinishItemRequest {
                    status: ItemStatus::Passed,
                    end_time: Utc::now(),
                },
            )
            .await;
        assert_eq!(result, Err(GatewayError::UnknownHandle(stray)));
    }

    #[tokio::test]
    async fn test_failed_launch_fails_dependants() {
        let gateway =
            HttpGateway::new("http://127.0.0.1:1/api/v1", "shop", "token").expect("gateway");
        let launch = gateway.start_launch(StartLaunchRequest {
            name: "nightly".to_string(),
            start_time: Utc::now(),
            description: String::new(),
            attributes: Vec::new(),
            mode: LaunchMode::Default,
        });
        let item = gateway.start_item(
            StartItemRequest::new("Checkout", ItemType::Suite, Utc::now()),
            &launch.handle,
            None,
        );
        let log = gateway.send_log(
            &item.handle,
            LogRequest {
                level: LogLevel::Info,
                message: "hello".to_string(),
                time: Utc::now(),
            },
            None,
        );

        assert!(matches!(
            launch.completion.await,
            Err(GatewayError::Transport(_))
        ));
        assert!(matches!(
            item.completion.await,
            Err(GatewayError::Dependency { handle, .. }) if handle == launch.handle
        ));
        assert!(matches!(log.await, Err(GatewayError::Dependency { .. })));
    }

    #[tokio::test]
    async fn test_finished_handles_are_forgotten() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let address = listener.local_addr().expect("address");
        tokio::spawn(serve_created(listener));
        let client = Client::builder().no_proxy().build().expect("client");
        let gateway =
            HttpGateway::with_client(client, &format!("http://{address}/api/v1"), "shop", "token")
                .expect("gateway");

        let launch = gateway.start_launch(launch_request());
        let suite = gateway.start_item(
            StartItemRequest::new("Checkout", ItemType::Suite, Utc::now()),
            &launch.handle,
            None,
        );
        let step = gateway.start_item(
            StartItemRequest::new("Pay by card", ItemType::Step, Utc::now()),
            &launch.handle,
            Some(&suite.handle),
        );
        assert_eq!(gateway.tracked_handles(), 3);

        let finish = FinishItemRequest {
            status: ItemStatus::Passed,
            end_time: Utc::now(),
        };
        assert_eq!(gateway.finish_item(&step.handle, finish).await, Ok(()));
        assert_eq!(gateway.tracked_handles(), 2);
        assert!(matches!(
            gateway.send_log(
                &step.handle,
                LogRequest {
                    level: LogLevel::Info,
                    message: "late".to_string(),
                    time: Utc::now(),
                },
                None,
            )
            .await,
            Err(GatewayError::UnknownHandle(_))
        ));

        let done = gateway.finish_launch(
            &launch.handle,
            FinishLaunchRequest {
                end_time: Utc::now(),
            },
        );
        assert_eq!(done.await, Ok(()));
        assert_eq!(gateway.tracked_handles(), 0);
    }

    #[tokio::test]
    async fn test_failed_finish_keeps_the_handle() {
        let gateway =
            HttpGateway::new("http://127.0.0.1:1/api/v1", "shop", "token").expect("gateway");
        let launch = gateway.start_launch(launch_request());
        let done = gateway.finish_launch(
            &launch.handle,
            FinishLaunchRequest {
                end_time: Utc::now(),
            },
        );
        assert!(done.await.is_err());
        assert_eq!(gateway.tracked_handles(), 1);
    }
}
