//! Docker Engine API client.
//!
//! Speaks plain HTTP to an engine listening on TCP (`dockerd -H tcp://...`).
//! Requests are versioned (`/v1.41/containers/json`) and error bodies are
//! decoded from the engine's `{"message": "..."}` envelope.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{RuntimeError, RuntimeResult};
use crate::runtime::ContainerRuntime;
use crate::types::*;

/// Buffered engine events before the reader applies backpressure.
const EVENT_BUFFER: usize = 64;

/// Only container events are forwarded to subscribers.
const CONTAINER_EVENTS_FILTER: &str = r#"{"type":["container"]}"#;

/// Connection settings for a Docker Engine.
#[derive(Debug, Clone)]
pub struct DockerConfig {
    /// Base URL, e.g. `http://127.0.0.1:2375`.
    pub endpoint: String,
    /// API version prefix, e.g. `v1.41`.
    pub api_version: String,
    /// Per-request timeout for non-streaming calls.
    pub timeout: Duration,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:2375".to_string(),
            api_version: "v1.41".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// HTTP client for the Docker Engine API.
#[derive(Debug, Clone)]
pub struct DockerClient {
    /// Client with a total request timeout.
    http: reqwest::Client,
    /// Client for pulls and event streams, bounded only on connect.
    streaming: reqwest::Client,
    base_url: String,
    /// Host configuration sent with each create, until the container starts.
    pending: Arc<Mutex<HashMap<ReplicaId, HostConfig>>>,
}

#[derive(Deserialize)]
struct EngineMessage {
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreateResponse {
    id: String,
    #[serde(default, deserialize_with = "null_default")]
    warnings: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectResponse {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default, deserialize_with = "null_default")]
    args: Vec<String>,
    config: ContainerConfig,
    #[serde(default)]
    host_config: HostConfig,
    #[serde(default)]
    state: InspectState,
    #[serde(default)]
    network_settings: InspectNetworks,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
struct InspectState {
    #[serde(default)]
    running: bool,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
struct InspectNetworks {
    #[serde(default, deserialize_with = "null_default")]
    networks: BTreeMap<String, EndpointSettings>,
}

impl InspectResponse {
    fn into_descriptor(self) -> ReplicaDescriptor {
        let mut config = self.config;
        config.networking_config = endpoint_for_mode(
            self.network_settings.networks,
            &self.host_config.network_mode,
            &self.id,
        );
        config.host_config = self.host_config;
        ReplicaDescriptor {
            id: self.id,
            name: self.name.trim_start_matches('/').to_string(),
            image: config.image.clone(),
            args: self.args,
            running: self.state.running,
            config,
        }
    }
}

/// Endpoint settings of the network named by the network mode.
///
/// Create takes a single endpoint. The alias the engine derived from the
/// old container ID is dropped.
fn endpoint_for_mode(
    mut networks: BTreeMap<String, EndpointSettings>,
    mode: &str,
    id: &str,
) -> Option<NetworkingConfig> {
    let mut endpoint = networks.remove(mode)?;
    endpoint.aliases.retain(|alias| alias != short_id(id));
    Some(NetworkingConfig {
        endpoints_config: BTreeMap::from([(mode.to_string(), endpoint)]),
    })
}

/// One line of the progress stream returned by an image pull.
#[derive(Deserialize)]
struct PullProgress {
    #[serde(default)]
    error: Option<String>,
}

impl DockerClient {
    /// Build a client for the configured engine.
    pub fn new(config: &DockerConfig) -> RuntimeResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RuntimeError::Config(e.to_string()))?;
        let streaming = reqwest::Client::builder()
            .connect_timeout(config.timeout)
            .build()
            .map_err(|e| RuntimeError::Config(e.to_string()))?;

        Ok(Self {
            http,
            streaming,
            base_url: format!(
                "{}/{}",
                config.endpoint.trim_end_matches('/'),
                config.api_version.trim_matches('/')
            ),
            pending: Arc::default(),
        })
    }

    fn pending(&self) -> MutexGuard<'_, HashMap<ReplicaId, HostConfig>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        subject: &str,
    ) -> RuntimeResult<reqwest::Response> {
        let response = request.send().await.map_err(transport_error)?;
        check(response, subject).await
    }
}

/// Map a reqwest failure onto the runtime taxonomy.
fn transport_error(err: reqwest::Error) -> RuntimeError {
    if err.is_decode() {
        RuntimeError::Decode(err.to_string())
    } else {
        RuntimeError::Unavailable(err.to_string())
    }
}

/// Turn non-success statuses into errors. 304 (already started/stopped)
/// counts as success.
async fn check(response: reqwest::Response, subject: &str) -> RuntimeResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() || status == StatusCode::NOT_MODIFIED {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<EngineMessage>(&body)
        .map(|m| m.message)
        .unwrap_or(body);

    if status == StatusCode::NOT_FOUND {
        return Err(RuntimeError::NotFound(subject.to_string()));
    }
    Err(RuntimeError::Engine {
        status: status.as_u16(),
        message,
    })
}

/// Split an image reference into the `fromImage` / `tag` pull parameters.
///
/// A colon only separates a tag when it comes after the last slash, so
/// registry ports survive. Digest references are passed through whole
/// with an empty tag.
pub fn split_image_reference(image: &str) -> (&str, &str) {
    if image.contains('@') {
        return (image, "");
    }
    match image.rfind(':') {
        Some(idx) if !image[idx + 1..].contains('/') => (&image[..idx], &image[idx + 1..]),
        _ => (image, "latest"),
    }
}

/// Parse newline-delimited JSON events, leaving any partial line buffered.
fn drain_events(buffer: &mut Vec<u8>, flush: bool) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    loop {
        let line: Vec<u8> = match buffer.iter().position(|b| *b == b'\n') {
            Some(pos) => buffer.drain(..=pos).collect(),
            None if flush && !buffer.is_empty() => std::mem::take(buffer),
            None => break,
        };
        let line = line.trim_ascii();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_slice::<EngineEvent>(line) {
            Ok(event) => events.push(event),
            Err(e) => debug!(error = %e, "skipping undecodable engine event"),
        }
    }
    events
}

#[async_trait]
impl ContainerRuntime for DockerClient {
    async fn list(&self, all: bool) -> RuntimeResult<Vec<ContainerSummary>> {
        let request = self
            .http
            .get(self.url("/containers/json"))
            .query(&[("all", if all { "true" } else { "false" })]);
        let response = self.send(request, "containers").await?;
        response.json().await.map_err(transport_error)
    }

    async fn inspect(&self, id: &str) -> RuntimeResult<ReplicaDescriptor> {
        let request = self.http.get(self.url(&format!("/containers/{id}/json")));
        let response = self.send(request, id).await?;
        let inspected: InspectResponse = response.json().await.map_err(transport_error)?;
        Ok(inspected.into_descriptor())
    }

    async fn pull(&self, image: &str) -> RuntimeResult<()> {
        let (repository, tag) = split_image_reference(image);
        let mut query = vec![("fromImage", repository)];
        if !tag.is_empty() {
            query.push(("tag", tag));
        }
        debug!(%image, "pulling image");

        let request = self.streaming.post(self.url("/images/create")).query(&query);
        let pull_error = |message: String| RuntimeError::Pull {
            image: image.to_string(),
            message,
        };
        let response = match self.send(request, image).await {
            Ok(response) => response,
            Err(RuntimeError::Engine { message, .. }) => return Err(pull_error(message)),
            Err(RuntimeError::NotFound(_)) => {
                return Err(pull_error("image not found".to_string()));
            }
            Err(e) => return Err(e),
        };

        // The engine reports pull failures inside a 200 progress stream.
        let body = response.text().await.map_err(transport_error)?;
        for line in body.lines() {
            if let Ok(progress) = serde_json::from_str::<PullProgress>(line)
                && let Some(message) = progress.error
            {
                return Err(pull_error(message));
            }
        }
        Ok(())
    }

    async fn create(&self, config: &ContainerConfig) -> RuntimeResult<ReplicaId> {
        let request = self.http.post(self.url("/containers/create")).json(config);
        let response = match self.send(request, &config.image).await {
            Err(RuntimeError::NotFound(_)) => {
                return Err(RuntimeError::Engine {
                    status: 404,
                    message: format!("image not present: {}", config.image),
                });
            }
            other => other?,
        };
        let created: CreateResponse = response.json().await.map_err(transport_error)?;
        for warning in &created.warnings {
            warn!(container = %short_id(&created.id), %warning, "engine warning on create");
        }
        self.pending().insert(created.id.clone(), config.host_config.clone());
        Ok(created.id)
    }

    async fn start(&self, id: &str, host_config: &HostConfig) -> RuntimeResult<()> {
        // Engines since API 1.24 take host configuration at create time only.
        if *host_config != HostConfig::default() {
            let known = self.pending().get(id).cloned();
            let applied = match known {
                Some(applied) => applied,
                None => self.inspect(id).await?.config.host_config,
            };
            if applied != *host_config {
                return Err(RuntimeError::HostConfigMismatch(id.to_string()));
            }
        }
        debug!(container = %short_id(id), memory = host_config.memory, "starting container");
        let request = self.http.post(self.url(&format!("/containers/{id}/start")));
        self.send(request, id).await?;
        self.pending().remove(id);
        Ok(())
    }

    async fn kill(&self, id: &str, signal: &str) -> RuntimeResult<()> {
        let request = self
            .http
            .post(self.url(&format!("/containers/{id}/kill")))
            .query(&[("signal", signal)]);
        match self.send(request, id).await {
            Ok(_) => Ok(()),
            Err(RuntimeError::Engine { status: 409, .. }) => {
                Err(RuntimeError::NotRunning(id.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    async fn remove(&self, id: &str, force: bool) -> RuntimeResult<()> {
        let request = self
            .http
            .delete(self.url(&format!("/containers/{id}")))
            .query(&[("force", if force { "true" } else { "false" })]);
        self.send(request, id).await?;
        self.pending().remove(id);
        Ok(())
    }

    async fn stop(&self, id: &str, timeout_secs: u32) -> RuntimeResult<()> {
        let request = self
            .http
            .post(self.url(&format!("/containers/{id}/stop")))
            .query(&[("t", timeout_secs)]);
        self.send(request, id).await?;
        Ok(())
    }

    async fn restart(&self, id: &str, timeout_secs: u32) -> RuntimeResult<()> {
        let request = self
            .http
            .post(self.url(&format!("/containers/{id}/restart")))
            .query(&[("t", timeout_secs)]);
        self.send(request, id).await?;
        Ok(())
    }

    async fn info(&self) -> RuntimeResult<EngineInfo> {
        let response = self.send(self.http.get(self.url("/info")), "info").await?;
        response.json().await.map_err(transport_error)
    }

    async fn events(&self) -> RuntimeResult<mpsc::Receiver<EngineEvent>> {
        let request = self
            .streaming
            .get(self.url("/events"))
            .query(&[("filters", CONTAINER_EVENTS_FILTER)]);
        let mut response = self.send(request, "events").await?;
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);

        tokio::spawn(async move {
            let mut buffer = Vec::new();
            loop {
                let chunk = match response.chunk().await {
                    Ok(Some(chunk)) => chunk,
                    Ok(None) => break,
                    Err(e) => {
                        warn!(error = %e, "engine event stream broken");
                        break;
                    }
                };
                buffer.extend_from_slice(&chunk);
                for event in drain_events(&mut buffer, false) {
                    if tx.send(event).await.is_err() {
                        return;
                    }
                }
            }
            for event in drain_events(&mut buffer, true) {
                if tx.send(event).await.is_err() {
                    return;
                }
            }
            debug!("engine event stream ended");
        });

        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use axum::extract::{Path, Query, State};
    use axum::http::StatusCode as AxumStatus;
    use axum::routing::{delete, get, post};
    use axum::{Json, Router};
    use serde_json::{Value, json};

    type Params = Query<HashMap<String, String>>;

    #[derive(Clone, Default)]
    struct Engine {
        requests: Arc<Mutex<Vec<String>>>,
        created: Arc<Mutex<Vec<Value>>>,
    }

    impl Engine {
        fn log(&self, line: String) {
            self.requests.lock().unwrap().push(line);
        }
    }

    async fn list(State(engine): State<Engine>, Query(q): Params) -> Json<Value> {
        engine.log(format!("list all={}", q.get("all").cloned().unwrap_or_default()));
        Json(json!([
            {"Id": "aaa111", "Image": "myapp:v1", "Names": ["/web-1"], "State": "running", "Status": "Up 2 minutes"},
            {"Id": "bbb222", "Image": "redis:7", "Names": null, "State": "exited", "Status": "Exited (0)"}
        ]))
    }

    async fn inspect(Path(id): Path<String>) -> (AxumStatus, Json<Value>) {
        if id != "aaa111" {
            return (
                AxumStatus::NOT_FOUND,
                Json(json!({"message": format!("No such container: {id}")})),
            );
        }
        (
            AxumStatus::OK,
            Json(json!({
                "Id": "aaa111",
                "Name": "/web-1",
                "Image": "sha256:deadbeef",
                "Args": ["--port", "80"],
                "State": {"Running": true},
                "Config": {
                    "Hostname": "aaa111",
                    "Image": "myapp:v1",
                    "Cmd": ["server", "--port", "80"],
                    "Env": ["A=1"],
                    "Labels": null,
                    "Tty": true,
                    "StopSignal": "SIGQUIT",
                    "Volumes": {"/data": {}}
                },
                "HostConfig": {
                    "Memory": 268435456,
                    "Binds": null,
                    "PortBindings": {"80/tcp": [{"HostIp": "", "HostPort": "8080"}]},
                    "NetworkMode": "backend",
                    "CapAdd": ["NET_ADMIN"],
                    "VolumesFrom": ["data-1"],
                    "CpuShares": 512,
                    "ExtraHosts": ["db:10.0.0.2"]
                },
                "NetworkSettings": {
                    "Networks": {
                        "backend": {
                            "IPAMConfig": null,
                            "Links": null,
                            "Aliases": ["web", "aaa111"],
                            "NetworkID": "f00d",
                            "IPAddress": "172.18.0.4"
                        },
                        "monitoring": {"Aliases": null}
                    }
                }
            })),
        )
    }

    async fn pull(State(engine): State<Engine>, Query(q): Params) -> String {
        let image = q.get("fromImage").cloned().unwrap_or_default();
        let tag = q.get("tag").cloned().unwrap_or_default();
        engine.log(format!("pull {image} {tag}"));
        if image == "broken" {
            return "{\"status\":\"Pulling\"}\n{\"error\":\"manifest unknown\"}\n".to_string();
        }
        "{\"status\":\"Pulling\"}\n{\"status\":\"Downloaded newer image\"}\n".to_string()
    }

    async fn create(
        State(engine): State<Engine>,
        Json(body): Json<Value>,
    ) -> (AxumStatus, Json<Value>) {
        engine.created.lock().unwrap().push(body);
        (AxumStatus::CREATED, Json(json!({"Id": "ccc333", "Warnings": null})))
    }

    async fn start(State(engine): State<Engine>, Path(id): Path<String>) -> AxumStatus {
        engine.log(format!("start {id}"));
        AxumStatus::NO_CONTENT
    }

    async fn kill(
        Path(id): Path<String>,
        Query(q): Params,
    ) -> Result<AxumStatus, (AxumStatus, Json<Value>)> {
        if id == "stopped" {
            return Err((
                AxumStatus::CONFLICT,
                Json(json!({"message": "Container stopped is not running"})),
            ));
        }
        assert_eq!(q.get("signal").map(String::as_str), Some("KILL"));
        Ok(AxumStatus::NO_CONTENT)
    }

    async fn remove(
        State(engine): State<Engine>,
        Path(id): Path<String>,
        Query(q): Params,
    ) -> AxumStatus {
        let force = q.get("force").cloned().unwrap_or_default();
        engine.log(format!("remove {id} force={force}"));
        AxumStatus::NO_CONTENT
    }

    async fn stop(Path(_id): Path<String>) -> AxumStatus {
        AxumStatus::NOT_MODIFIED
    }

    async fn info() -> Json<Value> {
        Json(json!({"NCPU": 4, "MemTotal": 8589934592i64, "Containers": 2, "Images": 7}))
    }

    async fn events() -> String {
        concat!(
            "{\"status\":\"start\",\"id\":\"aaa111\",\"from\":\"myapp:v1\",\"time\":1700000000}\n",
            "not json\n",
            "{\"status\":\"die\",\"id\":\"bbb222\",\"from\":\"redis:7\",\"time\":1700000005}"
        )
        .to_string()
    }

    async fn spawn_engine() -> (DockerClient, Engine) {
        let engine = Engine::default();
        let app = Router::new()
            .route("/v1.41/containers/json", get(list))
            .route("/v1.41/containers/{id}/json", get(inspect))
            .route("/v1.41/images/create", post(pull))
            .route("/v1.41/containers/create", post(create))
            .route("/v1.41/containers/{id}/start", post(start))
            .route("/v1.41/containers/{id}/kill", post(kill))
            .route("/v1.41/containers/{id}/stop", post(stop))
            .route("/v1.41/containers/{id}", delete(remove))
            .route("/v1.41/info", get(info))
            .route("/v1.41/events", get(events))
            .with_state(engine.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = DockerClient::new(&DockerConfig {
            endpoint: format!("http://{addr}/"),
            ..DockerConfig::default()
        })
        .unwrap();
        (client, engine)
    }

    #[test]
    fn split_image_reference_cases() {
        assert_eq!(split_image_reference("myapp:v1"), ("myapp", "v1"));
        assert_eq!(split_image_reference("myapp"), ("myapp", "latest"));
        assert_eq!(
            split_image_reference("localhost:5000/team/app"),
            ("localhost:5000/team/app", "latest")
        );
        assert_eq!(
            split_image_reference("localhost:5000/team/app:2.1"),
            ("localhost:5000/team/app", "2.1")
        );
        assert_eq!(split_image_reference("app@sha256:abcd"), ("app@sha256:abcd", ""));
    }

    #[test]
    fn drain_events_keeps_partial_line() {
        let mut buffer = b"{\"status\":\"start\",\"id\":\"a\"}\n{\"status\":\"di".to_vec();
        let events = drain_events(&mut buffer, false);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].status, "start");
        assert_eq!(buffer, b"{\"status\":\"di".to_vec());
    }

    #[tokio::test]
    async fn list_decodes_summaries() {
        let (client, engine) = spawn_engine().await;

        let containers = client.list(true).await.unwrap();
        assert_eq!(containers.len(), 2);
        assert_eq!(containers[0].image, "myapp:v1");
        assert!(containers[0].is_running());
        assert!(containers[1].names.is_empty());
        assert_eq!(engine.requests.lock().unwrap()[0], "list all=true");
    }

    #[tokio::test]
    async fn inspect_merges_host_config_into_descriptor() {
        let (client, _) = spawn_engine().await;

        let replica = client.inspect("aaa111").await.unwrap();
        assert_eq!(replica.name, "web-1");
        assert_eq!(replica.image, "myapp:v1");
        assert_eq!(replica.args, vec!["--port", "80"]);
        assert_eq!(replica.memory_limit(), 256 * 1024 * 1024);
        assert_eq!(replica.host_config().port_bindings["80/tcp"][0].host_port, "8080");
        assert!(replica.running);
    }

    #[tokio::test]
    async fn inspected_config_replays_into_create() {
        let (client, engine) = spawn_engine().await;

        let replica = client.inspect("aaa111").await.unwrap();
        client.create(&replica.config).await.unwrap();

        let body = engine.created.lock().unwrap()[0].clone();
        assert_eq!(body["Tty"], true);
        assert_eq!(body["StopSignal"], "SIGQUIT");
        assert!(body["Volumes"].get("/data").is_some());
        assert_eq!(body["HostConfig"]["CapAdd"][0], "NET_ADMIN");
        assert_eq!(body["HostConfig"]["VolumesFrom"][0], "data-1");
        assert_eq!(body["HostConfig"]["CpuShares"], 512);
        assert_eq!(body["HostConfig"]["ExtraHosts"][0], "db:10.0.0.2");
        assert_eq!(body["HostConfig"]["Memory"], 268435456);

        let endpoints = body["NetworkingConfig"]["EndpointsConfig"].as_object().unwrap();
        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints["backend"]["Aliases"], json!(["web"]));
        assert!(endpoints["backend"].get("IPAddress").is_none());
    }

    #[tokio::test]
    async fn start_rejects_a_different_host_config() {
        let (client, engine) = spawn_engine().await;

        let mut config = ContainerConfig::for_image("myapp:v1");
        config.host_config.memory = 1024;
        let id = client.create(&config).await.unwrap();

        let mut other = config.host_config.clone();
        other.memory = 2048;
        let err = client.start(&id, &other).await.unwrap_err();
        assert!(matches!(err, RuntimeError::HostConfigMismatch(ref c) if c == "ccc333"));
        assert!(!engine.requests.lock().unwrap().contains(&"start ccc333".to_string()));

        client.start(&id, &config.host_config).await.unwrap();
        assert!(engine.requests.lock().unwrap().contains(&"start ccc333".to_string()));
    }

    #[tokio::test]
    async fn start_checks_foreign_containers_against_inspect() {
        let (client, _) = spawn_engine().await;

        let replica = client.inspect("aaa111").await.unwrap();
        client.start("aaa111", replica.host_config()).await.unwrap();
        client.start("aaa111", &HostConfig::default()).await.unwrap();

        let mut other = replica.host_config().clone();
        other.binds.push("/tmp:/tmp".to_string());
        let err = client.start("aaa111", &other).await.unwrap_err();
        assert!(matches!(err, RuntimeError::HostConfigMismatch(_)));
    }

    #[tokio::test]
    async fn inspect_unknown_is_not_found() {
        let (client, _) = spawn_engine().await;
        let err = client.inspect("nope").await.unwrap_err();
        assert!(matches!(err, RuntimeError::NotFound(id) if id == "nope"));
    }

    #[tokio::test]
    async fn pull_splits_tag_and_reports_stream_errors() {
        let (client, engine) = spawn_engine().await;

        client.pull("myapp:v1").await.unwrap();
        assert_eq!(engine.requests.lock().unwrap()[0], "pull myapp v1");

        let err = client.pull("broken").await.unwrap_err();
        assert!(matches!(err, RuntimeError::Pull { ref message, .. } if message == "manifest unknown"));
    }

    #[tokio::test]
    async fn create_sends_config_and_start_posts() {
        let (client, engine) = spawn_engine().await;

        let mut config = ContainerConfig::for_image("myapp:v1");
        config.host_config.memory = 1024;
        let id = client.create(&config).await.unwrap();
        assert_eq!(id, "ccc333");

        let body = engine.created.lock().unwrap()[0].clone();
        assert_eq!(body["Image"], "myapp:v1");
        assert_eq!(body["Hostname"], "");
        assert_eq!(body["HostConfig"]["Memory"], 1024);

        client.start(&id, &config.host_config).await.unwrap();
        assert!(engine.requests.lock().unwrap().contains(&"start ccc333".to_string()));
    }

    #[tokio::test]
    async fn kill_conflict_maps_to_not_running() {
        let (client, _) = spawn_engine().await;

        client.kill("aaa111", "KILL").await.unwrap();
        let err = client.kill("stopped", "KILL").await.unwrap_err();
        assert!(matches!(err, RuntimeError::NotRunning(_)));
    }

    #[tokio::test]
    async fn remove_forces_and_stop_accepts_not_modified() {
        let (client, engine) = spawn_engine().await;

        client.remove("aaa111", true).await.unwrap();
        client.stop("aaa111", 10).await.unwrap();
        assert_eq!(engine.requests.lock().unwrap()[0], "remove aaa111 force=true");
    }

    #[tokio::test]
    async fn info_reads_engine_counters() {
        let (client, _) = spawn_engine().await;
        let info = client.info().await.unwrap();
        assert_eq!(info.cpus, 4);
        assert_eq!(info.images, 7);
    }

    #[tokio::test]
    async fn events_stream_skips_garbage_and_flushes_tail() {
        let (client, _) = spawn_engine().await;

        let mut rx = client.events().await.unwrap();
        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.status, "start");
        assert_eq!(second.id, "bbb222");
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn unreachable_engine_is_unavailable() {
        let client = DockerClient::new(&DockerConfig {
            endpoint: "http://127.0.0.1:1".to_string(),
            timeout: Duration::from_secs(2),
            ..DockerConfig::default()
        })
        .unwrap();

        let err = client.list(false).await.unwrap_err();
        assert!(err.is_unavailable());
    }
}
