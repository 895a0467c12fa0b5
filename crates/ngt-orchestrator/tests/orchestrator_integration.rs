//! Orchestration pass tests against a mocked control API
//!
//! The daemon is replaced by a wiremock server for its HTTP side and by a
//! fake launcher that only counts spawns.

use std::collections::BTreeMap;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ngt_core::daemon::{DaemonController, DaemonHandle, LaunchSpec, ProcessLauncher};
use ngt_core::error::EXECUTABLE_NOT_FOUND_MESSAGE;
use ngt_core::EndpointConfig;
use ngt_orchestrator::orchestrator::NO_PROJECTS_MESSAGE;
use ngt_orchestrator::{
    ControlApiClient, ErrorReporter, OrchestratorSettings, TracingReporter, TunnelOrchestrator,
};

#[derive(Default)]
struct FakeLauncher {
    not_found: bool,
    spawned: Mutex<Vec<LaunchSpec>>,
}

impl FakeLauncher {
    fn spawn_count(&self) -> usize {
        self.spawned.lock().unwrap().len()
    }
}

impl ProcessLauncher for FakeLauncher {
    fn spawn_detached(&self, spec: &LaunchSpec) -> io::Result<DaemonHandle> {
        if self.not_found {
            return Err(io::Error::new(io::ErrorKind::NotFound, "no such file"));
        }
        let mut spawned = self.spawned.lock().unwrap();
        spawned.push(spec.clone());
        Ok(DaemonHandle::detached(4000 + spawned.len() as u32))
    }

    fn run_captured(&self, _program: &Path, _args: &[&str]) -> io::Result<String> {
        Ok("ngrok version 2.3.35".to_string())
    }
}

#[derive(Default)]
struct RecordingReporter {
    messages: Mutex<Vec<String>>,
}

impl RecordingReporter {
    fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl ErrorReporter for RecordingReporter {
    async fn report_error(&self, message: String) {
        self.messages.lock().unwrap().push(message);
    }
}

struct Harness {
    server: MockServer,
    launcher: Arc<FakeLauncher>,
    reporter: Arc<RecordingReporter>,
    orchestrator: TunnelOrchestrator,
}

async fn harness_with(launcher: FakeLauncher) -> Harness {
    let server = MockServer::start().await;
    let launcher = Arc::new(launcher);
    let reporter = Arc::new(RecordingReporter::default());

    let api = ControlApiClient::new(&server.uri()).unwrap();
    let controller = DaemonController::with_launcher("", launcher.clone());
    let settings = OrchestratorSettings {
        startup_grace: Duration::from_millis(10),
        create_retry_delay: Duration::from_millis(10),
        show_window: false,
    };

    let orchestrator = TunnelOrchestrator::new(api, controller, reporter.clone(), settings);
    Harness {
        server,
        launcher,
        reporter,
        orchestrator,
    }
}

async fn harness() -> Harness {
    harness_with(FakeLauncher::default()).await
}

fn tunnel_list(tunnels: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "tunnels": tunnels, "uri": "/api/tunnels" }))
}

fn tunnel(name: &str, addr: &str, public_url: &str) -> serde_json::Value {
    json!({
        "name": name,
        "uri": format!("/api/tunnels/{name}"),
        "public_url": public_url,
        "proto": "https",
        "config": { "addr": addr, "inspect": true },
        "metrics": {}
    })
}

async fn mount_list(server: &MockServer, tunnels: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/tunnels"))
        .respond_with(tunnel_list(tunnels))
        .mount(server)
        .await;
}

fn single(name: &str, config: EndpointConfig) -> BTreeMap<String, EndpointConfig> {
    let mut configs = BTreeMap::new();
    configs.insert(name.to_string(), config);
    configs
}

#[tokio::test]
async fn test_creates_missing_tunnel() {
    let mut h = harness().await;
    mount_list(&h.server, json!([])).await;

    Mock::given(method("POST"))
        .and(path("/api/tunnels"))
        .and(header("accept", "application/json"))
        .and(body_json(json!({
            "name": "fakeApp",
            "addr": "localhost:1234",
            "proto": "http",
            "subdomain": "fake-app",
            "host_header": "localhost:1234"
        })))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(tunnel("fakeApp", "localhost:1234", "https://fake-app.ngrok.io")),
        )
        .expect(1)
        .mount(&h.server)
        .await;

    let mut configs = single(
        "fakeApp",
        EndpointConfig::from_setting("http://localhost:1234/").with_subdomain(Some("fake-app")),
    );
    let summary = h.orchestrator.start_tunnels(&mut configs).await;

    assert_eq!(summary.created, vec!["fakeApp".to_string()]);
    assert!(summary.is_clean());
    assert_eq!(
        configs["fakeApp"].public_url.as_deref(),
        Some("https://fake-app.ngrok.io")
    );
    assert_eq!(h.launcher.spawn_count(), 0);
    assert!(h.reporter.messages().is_empty());
}

#[tokio::test]
async fn test_launches_daemon_when_not_running() {
    let mut h = harness().await;

    Mock::given(method("GET"))
        .and(path("/api/tunnels"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .mount(&h.server)
        .await;
    mount_list(&h.server, json!([])).await;

    Mock::given(method("POST"))
        .and(path("/api/tunnels"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(tunnel("web", "localhost:5000", "https://web.ngrok.io")),
        )
        .expect(1)
        .mount(&h.server)
        .await;

    let mut configs = single("web", EndpointConfig::from_setting("5000"));
    let summary = h.orchestrator.start_tunnels(&mut configs).await;

    assert_eq!(summary.created, vec!["web".to_string()]);
    assert_eq!(h.launcher.spawn_count(), 1);
    assert!(h.orchestrator.daemon().is_some());

    let spawned = h.launcher.spawned.lock().unwrap();
    assert_eq!(spawned[0].args, vec!["start", "--none"]);
}

#[tokio::test]
async fn test_daemon_unreachable_after_launch() {
    let mut h = harness().await;

    Mock::given(method("GET"))
        .and(path("/api/tunnels"))
        .respond_with(ResponseTemplate::new(502))
        .expect(2)
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/tunnels"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&h.server)
        .await;

    let mut configs = single("web", EndpointConfig::from_setting("5000"));
    let summary = h.orchestrator.start_tunnels(&mut configs).await;

    assert!(summary.aborted);
    assert!(summary.created.is_empty());
    assert_eq!(h.launcher.spawn_count(), 1);

    let messages = h.reporter.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].starts_with("Cannot start ngrok. Is it installed and in your PATH?"));
}

#[tokio::test]
async fn test_executable_not_found() {
    let mut h = harness_with(FakeLauncher {
        not_found: true,
        ..FakeLauncher::default()
    })
    .await;

    Mock::given(method("GET"))
        .and(path("/api/tunnels"))
        .respond_with(ResponseTemplate::new(502))
        .expect(1)
        .mount(&h.server)
        .await;

    let mut configs = single("web", EndpointConfig::from_setting("5000"));
    let summary = h.orchestrator.start_tunnels(&mut configs).await;

    assert!(summary.aborted);
    assert_eq!(h.reporter.messages(), vec![EXECUTABLE_NOT_FOUND_MESSAGE.to_string()]);
}

#[tokio::test]
async fn test_existing_tunnel_is_skipped() {
    let mut h = harness().await;
    mount_list(
        &h.server,
        json!([tunnel("web", "localhost:1234", "https://web.ngrok.io")]),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/api/tunnels"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&h.server)
        .await;

    let mut configs = single("web", EndpointConfig::from_setting("http://localhost:1234/"));
    let summary = h.orchestrator.start_tunnels(&mut configs).await;

    assert_eq!(summary.existing, vec!["web".to_string()]);
    assert!(summary.created.is_empty());
    assert_eq!(configs["web"].public_url.as_deref(), Some("https://web.ngrok.io"));
}

#[tokio::test]
async fn test_second_pass_creates_nothing() {
    let mut h = harness().await;

    // First pass sees no tunnels, second sees the one created by the first
    Mock::given(method("GET"))
        .and(path("/api/tunnels"))
        .respond_with(tunnel_list(json!([])))
        .up_to_n_times(1)
        .mount(&h.server)
        .await;
    mount_list(
        &h.server,
        json!([tunnel("web", "localhost:1234", "https://web.ngrok.io")]),
    )
    .await;

    Mock::given(method("POST"))
        .and(path("/api/tunnels"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(tunnel("web", "localhost:1234", "https://web.ngrok.io")),
        )
        .expect(1)
        .mount(&h.server)
        .await;

    let mut configs = single("web", EndpointConfig::from_setting("1234"));
    let first = h.orchestrator.start_tunnels(&mut configs).await;
    let second = h.orchestrator.start_tunnels(&mut configs).await;

    assert_eq!(first.created.len(), 1);
    assert!(second.created.is_empty());
    assert_eq!(second.existing, vec!["web".to_string()]);
}

#[tokio::test]
async fn test_unreadable_rejection_retried_once() {
    let mut h = harness().await;
    mount_list(&h.server, json!([])).await;

    // hostname wins over subdomain on both attempts
    let expected = json!({
        "name": "web",
        "addr": "localhost:1234",
        "proto": "http",
        "hostname": "web.example.com",
        "host_header": "localhost:1234"
    });
    Mock::given(method("POST"))
        .and(path("/api/tunnels"))
        .and(body_json(expected.clone()))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
        .expect(2)
        .mount(&h.server)
        .await;

    let mut configs = single(
        "web",
        EndpointConfig::from_setting("1234")
            .with_subdomain(Some("web-sub"))
            .with_hostname(Some("web.example.com")),
    );
    let summary = h.orchestrator.start_tunnels(&mut configs).await;

    assert_eq!(summary.failed, vec!["web".to_string()]);
    let messages = h.reporter.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(
        messages[0],
        "Could not create tunnel for web (localhost:1234): <html>Bad Gateway</html>"
    );

    let posts: Vec<serde_json::Value> = h
        .server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.method.as_str() == "POST")
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect();
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0], posts[1]);
    assert_eq!(posts[0], expected);
}

#[tokio::test]
async fn test_unreadable_rejection_then_success() {
    let mut h = harness().await;
    mount_list(&h.server, json!([])).await;

    Mock::given(method("POST"))
        .and(path("/api/tunnels"))
        .respond_with(ResponseTemplate::new(502).set_body_string("not json"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/tunnels"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(tunnel("web", "localhost:1234", "https://web.ngrok.io")),
        )
        .expect(1)
        .mount(&h.server)
        .await;

    let mut configs = single("web", EndpointConfig::from_setting("1234"));
    let summary = h.orchestrator.start_tunnels(&mut configs).await;

    assert_eq!(summary.created, vec!["web".to_string()]);
    assert!(h.reporter.messages().is_empty());
}

#[tokio::test]
async fn test_structured_rejection_not_retried() {
    let mut h = harness().await;
    mount_list(&h.server, json!([])).await;

    Mock::given(method("POST"))
        .and(path("/api/tunnels"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error_code": 103,
            "status_code": 400,
            "msg": "failed to start tunnel",
            "details": { "err": "Subdomain is reserved\\nTry another one" }
        })))
        .expect(1)
        .mount(&h.server)
        .await;

    let mut configs = single(
        "web",
        EndpointConfig::from_setting("1234").with_subdomain(Some("taken")),
    );
    let summary = h.orchestrator.start_tunnels(&mut configs).await;

    assert_eq!(summary.failed, vec!["web".to_string()]);
    assert_eq!(configs["web"].public_url, None);
    assert_eq!(
        h.reporter.messages(),
        vec![
            "Could not create tunnel for web (localhost:1234): \n[103] failed to start tunnel\nDetails: Subdomain is reserved\nTry another one"
                .to_string()
        ]
    );
}

#[tokio::test]
async fn test_rejection_without_details_is_opaque() {
    let mut h = harness().await;
    mount_list(&h.server, json!([])).await;

    let body = r#"{"error_code":102,"status_code":400,"msg":"invalid tunnel configuration","details":null}"#;
    Mock::given(method("POST"))
        .and(path("/api/tunnels"))
        .respond_with(ResponseTemplate::new(400).set_body_string(body))
        .expect(1)
        .mount(&h.server)
        .await;

    let mut configs = single("web", EndpointConfig::from_setting("1234"));
    h.orchestrator.start_tunnels(&mut configs).await;

    assert_eq!(
        h.reporter.messages(),
        vec![format!("Could not create tunnel for web (localhost:1234): {body}")]
    );
}

#[tokio::test]
async fn test_https_address_strips_host_header() {
    let mut h = harness().await;
    mount_list(&h.server, json!([])).await;

    Mock::given(method("POST"))
        .and(path("/api/tunnels"))
        .and(body_partial_json(json!({
            "addr": "https://localhost:44300",
            "host_header": "localhost:44300"
        })))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(tunnel("secure", "https://localhost:44300", "https://s.ngrok.io")),
        )
        .expect(1)
        .mount(&h.server)
        .await;

    let mut configs = single(
        "secure",
        EndpointConfig::from_setting("https://localhost:44300/index"),
    );
    let summary = h.orchestrator.start_tunnels(&mut configs).await;
    assert_eq!(summary.created, vec!["secure".to_string()]);
}

#[tokio::test]
async fn test_failed_tunnel_does_not_abort_batch() {
    let mut h = harness().await;
    mount_list(&h.server, json!([])).await;

    Mock::given(method("POST"))
        .and(path("/api/tunnels"))
        .and(body_partial_json(json!({ "name": "api" })))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error_code": 103,
            "status_code": 400,
            "msg": "failed to start tunnel",
            "details": { "err": "bad subdomain" }
        })))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/tunnels"))
        .and(body_partial_json(json!({ "name": "web" })))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(tunnel("web", "localhost:5000", "https://web.ngrok.io")),
        )
        .expect(1)
        .mount(&h.server)
        .await;

    let mut configs = BTreeMap::new();
    configs.insert("api".to_string(), EndpointConfig::from_setting("4000"));
    configs.insert("web".to_string(), EndpointConfig::from_setting("5000"));
    let summary = h.orchestrator.start_tunnels(&mut configs).await;

    assert_eq!(summary.failed, vec!["api".to_string()]);
    assert_eq!(summary.created, vec!["web".to_string()]);
    assert_eq!(h.reporter.messages().len(), 1);
}

#[tokio::test]
async fn test_invalid_config_skipped() {
    let mut h = harness().await;
    mount_list(&h.server, json!([])).await;

    Mock::given(method("POST"))
        .and(path("/api/tunnels"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(tunnel("good", "localhost:5000", "https://good.ngrok.io")),
        )
        .expect(1)
        .mount(&h.server)
        .await;

    let mut configs = BTreeMap::new();
    configs.insert("bad".to_string(), EndpointConfig::from_setting("no port here"));
    configs.insert("good".to_string(), EndpointConfig::from_setting("5000"));
    let summary = h.orchestrator.start_tunnels(&mut configs).await;

    assert_eq!(summary.invalid, vec!["bad".to_string()]);
    assert_eq!(summary.created, vec!["good".to_string()]);
    assert!(h.reporter.messages().is_empty());
}

#[tokio::test]
async fn test_launch_uses_first_region() {
    let mut h = harness().await;

    Mock::given(method("GET"))
        .and(path("/api/tunnels"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .mount(&h.server)
        .await;
    mount_list(&h.server, json!([])).await;
    Mock::given(method("POST"))
        .and(path("/api/tunnels"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(tunnel("x", "localhost:1", "https://x.ngrok.io")),
        )
        .mount(&h.server)
        .await;

    let mut configs = BTreeMap::new();
    configs.insert("alpha".to_string(), EndpointConfig::from_setting("4000"));
    configs.insert(
        "beta".to_string(),
        EndpointConfig::from_setting("5000").with_region(Some("eu")),
    );
    configs.insert(
        "gamma".to_string(),
        EndpointConfig::from_setting("6000").with_region(Some("us")),
    );
    h.orchestrator.start_tunnels(&mut configs).await;

    let spawned = h.launcher.spawned.lock().unwrap();
    assert_eq!(spawned.len(), 1);
    assert_eq!(spawned[0].args, vec!["start", "--none", "--region", "eu"]);
}

#[tokio::test]
async fn test_launched_daemon_reused_across_passes() {
    let mut h = harness().await;

    Mock::given(method("GET"))
        .and(path("/api/tunnels"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&h.server)
        .await;

    let mut configs = single("web", EndpointConfig::from_setting("5000"));
    h.orchestrator.start_tunnels(&mut configs).await;
    h.orchestrator.start_tunnels(&mut configs).await;

    assert_eq!(h.launcher.spawn_count(), 1);
    assert_eq!(h.reporter.messages().len(), 2);
}

#[tokio::test]
async fn test_empty_project_map() {
    let mut h = harness().await;

    let mut configs = BTreeMap::new();
    let summary = h.orchestrator.start_tunnels(&mut configs).await;

    let received = h.server.received_requests().await.unwrap_or_default();
    assert!(received.is_empty());
    assert_eq!(summary, Default::default());
    assert_eq!(h.reporter.messages(), vec![NO_PROJECTS_MESSAGE.to_string()]);
    assert_eq!(h.launcher.spawn_count(), 0);
}

#[tokio::test]
async fn test_pass_with_tracing_reporter() {
    let server = MockServer::start().await;
    mount_list(
        &server,
        json!([tunnel("web", "localhost:5000", "https://web.ngrok.io")]),
    )
    .await;

    let launcher = Arc::new(FakeLauncher::default());
    let mut orchestrator = TunnelOrchestrator::new(
        ControlApiClient::new(&server.uri()).unwrap(),
        DaemonController::with_launcher("", launcher.clone()),
        Arc::new(TracingReporter),
        OrchestratorSettings::default(),
    );

    let mut configs = single("web", EndpointConfig::from_setting("5000"));
    let summary = orchestrator.start_tunnels(&mut configs).await;

    assert_eq!(summary.existing, vec!["web".to_string()]);
    assert_eq!(launcher.spawn_count(), 0);
}
