// Job submission to a ComfyUI backend.
//
// The flow is: open the websocket (so no events are missed), POST the serialized graph to
// /prompt, follow the websocket until the backend reports our prompt as finished, then read
// the outputs from /history and fetch them from /view.

use std::{collections::HashSet, time::Duration};

use anyhow::{anyhow, bail, Context, Result};
use async_stream::try_stream;
use futures::{Stream, StreamExt};
use log::{debug, info, trace, warn};
use reqwest::{Method, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::time::{timeout, Instant};
use tokio_retry::{strategy::ExponentialBackoff, RetryIf};
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::{
    config::{BackendConfig, ServerConfig},
    workflow::Graph,
};

/// generate() returns a stream of these.
#[derive(Debug)]
pub enum GenerationEvent {
    /// The backend accepted the prompt, as job number N.
    Queued { prompt_id: String, number: u32 },
    /// A node started executing.
    NodeStarted(String),
    /// A node finished, or was served from cache.
    NodeCompleted { node: String, completed: usize, total: usize },
    /// Sampler progress within the current node.
    Progress { value: u32, max: u32 },
    /// Generation has completed.
    Completed(Vec<OutputImage>),
    /// Something broke.
    /// The stream ends after this.
    Error(anyhow::Error),
}

/// A file produced by an output node, as listed in /history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputImage {
    pub filename: String,
    #[serde(default)]
    pub subfolder: String,
    #[serde(rename = "type", default = "default_output_type")]
    pub kind: String,
}

fn default_output_type() -> String {
    "output".to_string()
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QueuedPrompt {
    pub prompt_id: String,
    #[serde(default)]
    pub number: u32,
}

/// One entry of /queue, which the backend sends as
/// [number, prompt_id, prompt, extra_data, outputs_to_execute].
#[derive(Debug, Clone, PartialEq)]
pub struct QueueEntry {
    pub number: i64,
    pub prompt_id: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueueState {
    pub running: Vec<QueueEntry>,
    pub pending: Vec<QueueEntry>,
}

/// A workflow file saved on the server, as listed by the workflow extension.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServerWorkflowFile {
    pub filename: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub modified: f64,
}

// Implementation-only
#[derive(Debug, Serialize)]
struct PromptRequest<'a> {
    prompt: &'a Graph,
    client_id: &'a str,
}

/// The websocket messages we act on.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendMessage {
    Progress { value: u32, max: u32, prompt_id: Option<String> },
    /// node is None once the whole prompt is done.
    Executing { node: Option<String>, prompt_id: Option<String> },
    ExecutionCached { nodes: Vec<String>, prompt_id: Option<String> },
    ExecutionError { message: String, node_type: Option<String>, prompt_id: Option<String> },
    /// Status updates, monitor plugins, previews and anything newer than us.
    Other,
}

/// "[NodeType] message", or just the message when the backend didn't say which node failed.
pub fn execution_error_detail(message: &str, node_type: Option<&str>) -> String {
    match node_type {
        Some(node_type) => format!("[{}] {}", node_type, message.trim()),
        None => message.trim().to_owned(),
    }
}

impl BackendMessage {
    fn prompt_id(&self) -> Option<&str> {
        match self {
            BackendMessage::Progress { prompt_id, .. }
            | BackendMessage::Executing { prompt_id, .. }
            | BackendMessage::ExecutionCached { prompt_id, .. }
            | BackendMessage::ExecutionError { prompt_id, .. } => prompt_id.as_deref(),
            BackendMessage::Other => None,
        }
    }

    /// Messages without a prompt id are assumed to be ours; older backends don't send one.
    fn is_for(&self, prompt_id: &str) -> bool {
        self.prompt_id().map_or(true, |id| id == prompt_id)
    }
}

pub fn decode_message(text: &str) -> BackendMessage {
    let Ok(message) = serde_json::from_str::<Value>(text) else {
        return BackendMessage::Other;
    };
    let data = &message["data"];
    let prompt_id = data["prompt_id"].as_str().map(str::to_owned);
    let as_u32 = |v: &Value| v.as_u64().and_then(|n| u32::try_from(n).ok()).unwrap_or_default();
    match message["type"].as_str() {
        Some("progress") => BackendMessage::Progress {
            value: as_u32(&data["value"]),
            max: as_u32(&data["max"]),
            prompt_id,
        },
        Some("executing") => BackendMessage::Executing {
            node: data["node"].as_str().map(str::to_owned),
            prompt_id,
        },
        Some("execution_cached") => BackendMessage::ExecutionCached {
            nodes: data["nodes"]
                .as_array()
                .map(|nodes| nodes.iter().filter_map(Value::as_str).map(str::to_owned).collect())
                .unwrap_or_default(),
            prompt_id,
        },
        Some("execution_error") => BackendMessage::ExecutionError {
            message: data["exception_message"]
                .as_str()
                .or_else(|| data["error"].as_str())
                .unwrap_or("Unknown error")
                .to_owned(),
            node_type: data["node_type"].as_str().map(str::to_owned),
            prompt_id,
        },
        _ => BackendMessage::Other,
    }
}

/// Pulls the output files for `prompt_id` out of a /history response.
/// Returns None while the backend has no history entry for the prompt yet.
pub fn extract_output_images(history: &Value, prompt_id: &str) -> Result<Option<Vec<OutputImage>>> {
    let Some(entry) = history.get(prompt_id) else {
        return Ok(None);
    };
    if entry["status"]["status_str"].as_str() == Some("error") {
        bail!("backend reported an error for prompt {}", prompt_id);
    }
    let outputs = entry
        .get("outputs")
        .and_then(Value::as_object)
        .context("history entry has no outputs")?;
    let mut images = Vec::new();
    // Keyed by output node id; each node may list several images.
    for (node, output) in outputs {
        let Some(list) = output.get("images").and_then(Value::as_array) else {
            trace!("Output node {} has no images", node);
            continue;
        };
        for image in list {
            let image: OutputImage = serde_json::from_value(image.clone())
                .with_context(|| format!("malformed image entry on node {}", node))?;
            images.push(image);
        }
    }
    Ok(Some(images))
}

pub fn decode_queue(queue: &Value) -> Result<QueueState> {
    let entries = |field: &str| -> Result<Vec<QueueEntry>> {
        let Some(items) = queue.get(field) else {
            return Ok(vec![]);
        };
        items
            .as_array()
            .with_context(|| format!("{} is not a list", field))?
            .iter()
            .map(|item| {
                let number = item[0].as_i64().context("queue entry has no number")?;
                let prompt_id = item[1].as_str().context("queue entry has no prompt id")?;
                Ok(QueueEntry {
                    number,
                    prompt_id: prompt_id.to_owned(),
                })
            })
            .collect()
    };
    Ok(QueueState {
        running: entries("queue_running")?,
        pending: entries("queue_pending")?,
    })
}

pub fn decode_workflow_list(response: &Value) -> Result<Vec<ServerWorkflowFile>> {
    if response["status"].as_str() != Some("success") {
        bail!("Failed to list workflows: server reported an error");
    }
    serde_json::from_value(response["workflows"].clone()).context("malformed workflow list")
}

/// Unwraps /cpe/workflow/get-and-convert. The converted workflow sits under data.workflow.
pub fn decode_converted_workflow(response: &Value) -> Result<Value> {
    if response["status"].as_str() != Some("success") {
        let message = response["message"].as_str().unwrap_or("unknown error");
        match response["details"].as_str() {
            Some(details) => bail!("Failed to convert workflow: {} (Details: {})", message, details),
            None => bail!("Failed to convert workflow: {}", message),
        }
    }
    match response["data"].get("workflow") {
        Some(workflow) => Ok(workflow.clone()),
        None => bail!("Converted workflow data is missing in the response"),
    }
}

/// Model file names from /experiment/models/<folder>. Entries without a name or path index are
/// skipped, as are checkpoints in subdirectories.
pub fn decode_models(folder: &str, response: &Value) -> Result<Vec<String>> {
    let entries = response.as_array().context("model list is not a list")?;
    let mut models = Vec::new();
    for entry in entries {
        let (Some(name), Some(_)) = (entry["name"].as_str(), entry["pathIndex"].as_u64()) else {
            warn!("Invalid model entry in {}: {}", folder, entry);
            continue;
        };
        if folder == "checkpoints" && (name.contains('/') || name.contains('\\')) {
            continue;
        }
        models.push(name.to_owned());
    }
    Ok(models)
}

pub struct ComfyClient {
    server: ServerConfig,
    client_id: String,
    http: reqwest::Client,
    timeout: Duration,
    max_wait: Duration,
}

impl ComfyClient {
    pub fn new(server: ServerConfig, backend: &BackendConfig, client_id: &str) -> Result<Self> {
        let timeout = Duration::from_secs(backend.request_timeout_secs);
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            server,
            client_id: client_id.to_owned(),
            http,
            timeout,
            max_wait: Duration::from_secs(backend.max_wait_secs),
        })
    }

    pub fn server_id(&self) -> &str {
        &self.server.id
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self.http.request(method, self.server.url(path));
        match &self.server.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// The exact JSON body sent to /prompt.
    pub fn prompt_body(&self, graph: &Graph) -> Result<Value> {
        serde_json::to_value(PromptRequest {
            prompt: graph,
            client_id: &self.client_id,
        })
        .context("failed to serialize prompt")
    }

    async fn try_queue_prompt(&self, body: &Value) -> Result<QueuedPrompt> {
        let response = self
            .request(Method::POST, "/prompt")
            .json(body)
            .send()
            .await
            .context("failed to send prompt")?;
        let status = response.status();
        let text = response.text().await.context("failed to read response")?;
        trace!("Response: {}", text);
        if !status.is_success() {
            bail!("Failed to queue prompt: {} {}", status, text);
        }
        serde_json::from_str(&text).context("failed to parse response")
    }

    /// Queues the graph for execution. Connection failures are retried; rejections are not.
    pub async fn queue_prompt(&self, graph: &Graph) -> Result<QueuedPrompt> {
        let body = self.prompt_body(graph)?;
        let retry_strategy = ExponentialBackoff::from_millis(50)
            .max_delay(Duration::from_secs(2))
            .take(5);
        let queued = RetryIf::spawn(
            retry_strategy,
            || self.try_queue_prompt(&body),
            |e: &anyhow::Error| {
                let retry = e.downcast_ref::<reqwest::Error>().map_or(false, reqwest::Error::is_connect);
                if retry {
                    warn!("Retrying prompt submission: {:?}", e);
                }
                retry
            },
        )
        .await?;
        info!("Queued prompt {} as #{}", queued.prompt_id, queued.number);
        Ok(queued)
    }

    pub async fn history(&self, prompt_id: &str) -> Result<Value> {
        self.request(Method::GET, &format!("/history/{}", prompt_id))
            .send()
            .await
            .context("failed to poll history")?
            .error_for_status()
            .context("failed to poll history")?
            .json()
            .await
            .context("failed to parse history")
    }

    pub async fn download(&self, image: &OutputImage) -> Result<Vec<u8>> {
        let bytes = self
            .request(Method::GET, "/view")
            .query(&[
                ("filename", image.filename.as_str()),
                ("subfolder", image.subfolder.as_str()),
                ("type", image.kind.as_str()),
            ])
            .send()
            .await
            .context("failed to download image")?
            .error_for_status()
            .context("failed to download image")?
            .bytes()
            .await
            .context("failed to read image")?;
        Ok(bytes.to_vec())
    }

    async fn get_json(&self, path: &str) -> Result<Value> {
        let response = self
            .request(Method::GET, path)
            .send()
            .await
            .with_context(|| format!("failed to request {}", path))?;
        let status = response.status();
        let text = response.text().await.context("failed to read response")?;
        trace!("Response: {}", text);
        if !status.is_success() {
            bail!("{} failed: {} {}", path, status, text);
        }
        serde_json::from_str(&text).with_context(|| format!("failed to parse {}", path))
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<()> {
        self.request(Method::POST, path)
            .json(body)
            .send()
            .await
            .with_context(|| format!("failed to request {}", path))?
            .error_for_status()
            .with_context(|| format!("{} failed", path))?;
        Ok(())
    }

    /// Stops the running job. With a prompt id, only if that prompt is the one running.
    pub async fn interrupt(&self, prompt_id: Option<&str>) -> Result<()> {
        let body = match prompt_id {
            Some(prompt_id) => json!({ "prompt_id": prompt_id }),
            None => json!({}),
        };
        self.post_json("/interrupt", &body).await?;
        info!("Interrupted {}", prompt_id.unwrap_or("current prompt"));
        Ok(())
    }

    pub async fn queue(&self) -> Result<QueueState> {
        decode_queue(&self.get_json("/queue").await?)
    }

    pub async fn delete_queue_items(&self, prompt_ids: &[String]) -> Result<()> {
        self.post_json("/queue", &json!({ "delete": prompt_ids })).await
    }

    pub async fn clear_queue(&self) -> Result<()> {
        self.post_json("/queue", &json!({ "clear": true })).await
    }

    /// Workflow files saved on the server. Needs the ComfyUI-Portal-Endpoint extension.
    pub async fn list_workflows(&self) -> Result<Vec<ServerWorkflowFile>> {
        decode_workflow_list(&self.get_json("/api/cpe/workflow/list").await?)
    }

    /// Fetches a saved workflow, converted by the server to API format.
    pub async fn fetch_workflow(&self, filename: &str) -> Result<Value> {
        let response = self
            .request(Method::GET, "/cpe/workflow/get-and-convert")
            .query(&[("filename", filename)])
            .send()
            .await
            .context("failed to fetch workflow")?;
        let text = response.text().await.context("failed to read response")?;
        trace!("Response: {}", text);
        // Errors come back as JSON too, so the status code adds nothing.
        let response: Value = serde_json::from_str(&text)
            .with_context(|| format!("failed to fetch {}: {}", filename, text))?;
        decode_converted_workflow(&response)
    }

    pub async fn models(&self, folder: &str) -> Result<Vec<String>> {
        let response = self.get_json(&format!("/experiment/models/{}", folder)).await?;
        decode_models(folder, &response)
    }

    /// Runs the graph on the backend, reporting progress as it goes.
    pub fn generate<'a>(&'a self, graph: &'a Graph) -> impl Stream<Item = GenerationEvent> + 'a {
        try_stream! {
            let ws_url = self.server.ws_url(&self.client_id);
            debug!("Connecting to {}", ws_url);
            let (mut ws, _) = timeout(self.timeout, connect_async(ws_url))
                .await
                .map_err(|_| anyhow!("timed out connecting to websocket"))?
                .context("failed to connect to websocket")?;

            let QueuedPrompt { prompt_id, number } = self.queue_prompt(graph).await?;
            yield GenerationEvent::Queued { prompt_id: prompt_id.clone(), number };

            let total = graph.len();
            let mut finished = HashSet::new();
            let deadline = Instant::now() + self.max_wait;
            loop {
                let waited = timeout(deadline.saturating_duration_since(Instant::now()), ws.next()).await;
                if waited.is_err() {
                    // Don't leave the job running on the backend.
                    if let Err(e) = self.interrupt(Some(prompt_id.as_str())).await {
                        warn!("Failed to interrupt prompt {}: {:?}", prompt_id, e);
                    }
                }
                let message = waited
                    .map_err(|_| anyhow!("timed out waiting for prompt {}", prompt_id))?
                    .ok_or_else(|| anyhow!("websocket closed"))?
                    .context("websocket error")?;
                let Message::Text(text) = message else {
                    // Binary frames are live previews.
                    continue;
                };
                let message = decode_message(&text);
                if !message.is_for(&prompt_id) {
                    continue;
                }
                match message {
                    BackendMessage::Progress { value, max, .. } => {
                        yield GenerationEvent::Progress { value, max };
                    }
                    BackendMessage::ExecutionCached { nodes, .. } => {
                        for node in nodes {
                            if finished.insert(node.clone()) {
                                yield GenerationEvent::NodeCompleted { node, completed: finished.len(), total };
                            }
                        }
                    }
                    BackendMessage::Executing { node: Some(node), .. } => {
                        yield GenerationEvent::NodeStarted(node.clone());
                        if finished.insert(node.clone()) {
                            yield GenerationEvent::NodeCompleted { node, completed: finished.len(), total };
                        }
                    }
                    BackendMessage::Executing { node: None, prompt_id: Some(_) } => break,
                    BackendMessage::ExecutionError { message, node_type, .. } => {
                        let detail = execution_error_detail(&message, node_type.as_deref());
                        Err::<(), anyhow::Error>(anyhow!("execution failed: {}", detail))?;
                    }
                    _ => {}
                }
            }

            let history = self.history(&prompt_id).await?;
            let images = extract_output_images(&history, &prompt_id)?
                .ok_or_else(|| anyhow!("no history for prompt {}", prompt_id))?;
            info!("Prompt {} produced {} images", prompt_id, images.len());
            yield GenerationEvent::Completed(images);
        }
        .map(|r: Result<GenerationEvent>| r.unwrap_or_else(GenerationEvent::Error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::{config::testconfig, workflow::{parse, UuidGenerator}};

    fn client() -> ComfyClient {
        let config = testconfig();
        ComfyClient::new(config.servers[0].clone(), &config.backend, config.client_id()).unwrap()
    }

    #[test]
    fn test_decode_progress() {
        let message = decode_message(r#"{"type": "progress", "data": {"value": 3, "max": 20, "prompt_id": "p1", "node": "2"}}"#);
        assert_eq!(
            message,
            BackendMessage::Progress { value: 3, max: 20, prompt_id: Some("p1".to_string()) }
        );
        assert!(message.is_for("p1"));
        assert!(!message.is_for("p2"));
    }

    #[test]
    fn test_decode_executing() {
        assert_eq!(
            decode_message(r#"{"type": "executing", "data": {"node": "7", "prompt_id": "p1"}}"#),
            BackendMessage::Executing { node: Some("7".to_string()), prompt_id: Some("p1".to_string()) }
        );
        assert_eq!(
            decode_message(r#"{"type": "executing", "data": {"node": null, "prompt_id": "p1"}}"#),
            BackendMessage::Executing { node: None, prompt_id: Some("p1".to_string()) }
        );
    }

    #[test]
    fn test_decode_cached_and_error() {
        assert_eq!(
            decode_message(r#"{"type": "execution_cached", "data": {"nodes": ["1", "3"], "prompt_id": "p1"}}"#),
            BackendMessage::ExecutionCached { nodes: vec!["1".to_string(), "3".to_string()], prompt_id: Some("p1".to_string()) }
        );
        assert_eq!(
            decode_message(r#"{"type": "execution_error", "data": {"exception_message": "CUDA out of memory"}}"#),
            BackendMessage::ExecutionError { message: "CUDA out of memory".to_string(), node_type: None, prompt_id: None }
        );
    }

    #[test]
    fn test_execution_error_names_node_type() {
        let message = decode_message(
            r#"{"type": "execution_error", "data": {"exception_message": "Value not in list ", "node_type": "CheckpointLoaderSimple", "prompt_id": "p1"}}"#,
        );
        let BackendMessage::ExecutionError { message, node_type, .. } = message else {
            panic!("expected an execution error, got {:?}", message);
        };
        assert_eq!(node_type.as_deref(), Some("CheckpointLoaderSimple"));
        assert_eq!(
            execution_error_detail(&message, node_type.as_deref()),
            "[CheckpointLoaderSimple] Value not in list"
        );
        assert_eq!(execution_error_detail("boom", None), "boom");
    }

    #[test]
    fn test_decode_queue() {
        let queue = json!({
            "queue_running": [[7, "p7", {}, {}, ["9"]]],
            "queue_pending": [[8, "p8", {}, {}, ["9"]], [9, "p9", {}, {}, ["9"]]]
        });
        let state = decode_queue(&queue).unwrap();
        assert_eq!(state.running, vec![QueueEntry { number: 7, prompt_id: "p7".to_string() }]);
        assert_eq!(state.pending.len(), 2);
        assert_eq!(state.pending[1].prompt_id, "p9");
        assert_eq!(decode_queue(&json!({})).unwrap(), QueueState::default());
        assert!(decode_queue(&json!({"queue_pending": [["x"]]})).is_err());
    }

    #[test]
    fn test_decode_workflow_list() {
        let response = json!({
            "status": "success",
            "workflows": [
                {"filename": "portrait.json", "size": 1200, "modified": 1718000000.5},
                {"filename": "upscale.json", "size": 800, "modified": 1718000001.0, "raw_content": "{}"}
            ]
        });
        let files = decode_workflow_list(&response).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].filename, "portrait.json");
        assert_eq!(files[1].size, 800);
        assert!(decode_workflow_list(&json!({"status": "error", "workflows": []})).is_err());
    }

    #[test]
    fn test_decode_converted_workflow() {
        let response = json!({
            "status": "success",
            "message": "ok",
            "filename": "portrait.json",
            "data": {"workflow": {"1": {"class_type": "X", "inputs": {}}}}
        });
        assert_eq!(
            decode_converted_workflow(&response).unwrap(),
            json!({"1": {"class_type": "X", "inputs": {}}})
        );
        let err = decode_converted_workflow(&json!({"status": "error", "message": "not found", "details": "portrait.json"}))
            .unwrap_err();
        assert_eq!(err.to_string(), "Failed to convert workflow: not found (Details: portrait.json)");
        assert!(decode_converted_workflow(&json!({"status": "success", "data": {}})).is_err());
    }

    #[test_log::test]
    fn test_decode_models() {
        let response = json!([
            {"name": "sdxl.safetensors", "pathIndex": 0},
            {"name": "sub/old.ckpt", "pathIndex": 0},
            {"name": "broken"},
            {"name": "v1-5.safetensors", "pathIndex": 1}
        ]);
        assert_eq!(
            decode_models("checkpoints", &response).unwrap(),
            vec!["sdxl.safetensors".to_string(), "v1-5.safetensors".to_string()]
        );
        // Subdirectories are fine outside checkpoints.
        assert_eq!(decode_models("loras", &response).unwrap().len(), 3);
        assert!(decode_models("loras", &json!({})).is_err());
    }

    #[test]
    fn test_decode_ignores_noise() {
        assert_eq!(decode_message(r#"{"type": "status", "data": {"status": {}}}"#), BackendMessage::Other);
        assert_eq!(decode_message(r#"{"type": "crystools.monitor", "data": {}}"#), BackendMessage::Other);
        assert_eq!(decode_message("primus::ping"), BackendMessage::Other);
        assert_eq!(decode_message("[]"), BackendMessage::Other);
    }

    #[test]
    fn test_extract_output_images() {
        let history = json!({
            "p1": {
                "outputs": {
                    "8": {"images": [
                        {"filename": "a.png", "subfolder": "", "type": "temp"},
                        {"filename": "b.png", "subfolder": "x", "type": "temp"}
                    ]},
                    "9": {"text": ["not an image"]}
                },
                "status": {"status_str": "success", "completed": true}
            }
        });
        let images = extract_output_images(&history, "p1").unwrap().unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(images[1], OutputImage { filename: "b.png".to_string(), subfolder: "x".to_string(), kind: "temp".to_string() });
        assert!(extract_output_images(&json!({}), "p1").unwrap().is_none());
    }

    #[test]
    fn test_extract_output_images_error() {
        let history = json!({"p1": {"outputs": {}, "status": {"status_str": "error"}}});
        assert!(extract_output_images(&history, "p1").is_err());
        let history = json!({"p1": {"status": {"status_str": "success"}}});
        assert!(extract_output_images(&history, "p1").is_err());
    }

    #[test]
    fn test_prompt_body() {
        let graph = parse(
            r#"{"1": {"class_type": "VAEDecode", "inputs": {"samples": ["2", 0]}, "_meta": {"title": "Decode"}}}"#,
            &mut UuidGenerator,
        )
        .unwrap()
        .graph;
        let client = client();
        assert_eq!(client.server_id(), "local");
        let body = client.prompt_body(&graph).unwrap();
        assert_eq!(
            body,
            json!({
                "prompt": {"1": {"inputs": {"samples": ["2", 0]}, "class_type": "VAEDecode", "_meta": {"title": "Decode"}}},
                "client_id": "portal-test"
            })
        );
    }
}
