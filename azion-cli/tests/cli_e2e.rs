use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::path::Path;
use std::process::Command;
use std::sync::{Arc, Mutex};
use std::thread;

use assert_cmd::prelude::*;
use predicates::str::contains;
use serde_json::{json, Value};
use tempfile::TempDir;

#[derive(Debug, Clone)]
struct RecordedRequest {
    method: String,
    path: String,
    auth_header: String,
    body: String,
}

struct MockApiServer {
    base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl MockApiServer {
    fn start<F>(expected_requests: usize, responder: F) -> Self
    where
        F: Fn(&str, &str, &str) -> (u16, String) + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
        let addr = listener.local_addr().expect("local addr");
        let base_url = format!("http://{addr}");
        let base_for_thread = base_url.clone();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let requests_for_thread = Arc::clone(&requests);

        let handle = thread::spawn(move || {
            for _ in 0..expected_requests {
                let (mut stream, _) = listener.accept().expect("accept");
                let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));

                let mut request_line = String::new();
                reader
                    .read_line(&mut request_line)
                    .expect("read request line");
                let mut parts = request_line.split_whitespace();
                let method = parts.next().unwrap_or_default().to_string();
                let path = parts.next().unwrap_or("/").to_string();

                let mut auth_header = String::new();
                let mut content_length = 0usize;
                loop {
                    let mut line = String::new();
                    reader.read_line(&mut line).expect("read header");
                    if line == "\r\n" || line.is_empty() {
                        break;
                    }
                    let Some((name, value)) = line.split_once(':') else {
                        continue;
                    };
                    match name.to_ascii_lowercase().as_str() {
                        "authorization" => auth_header = value.trim().to_string(),
                        "content-length" => content_length = value.trim().parse().unwrap_or(0),
                        _ => {}
                    }
                }

                let mut body = vec![0_u8; content_length];
                if content_length > 0 {
                    reader.read_exact(&mut body).expect("read body");
                }
                let body = String::from_utf8_lossy(&body).to_string();

                let (status, response_body) = responder(&base_for_thread, &method, &path);
                requests_for_thread
                    .lock()
                    .expect("lock requests")
                    .push(RecordedRequest {
                        method,
                        path,
                        auth_header,
                        body,
                    });

                let response = format!(
                    "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    response_body.len(),
                    response_body
                );
                stream
                    .write_all(response.as_bytes())
                    .expect("write response");
            }
        });

        Self {
            base_url,
            requests,
            handle: Some(handle),
        }
    }

    fn api_url(&self) -> String {
        format!("{}/edge_functions", self.base_url)
    }

    fn finish(mut self) -> Vec<RecordedRequest> {
        if let Some(handle) = self.handle.take() {
            handle.join().expect("join mock server");
        }
        self.requests.lock().expect("lock requests").clone()
    }
}

fn azion_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("azion"));
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env_remove("AZION_TOKEN")
        .env_remove("AZION_API_URL")
        .env_remove("AZION_WORKSPACE_DIR");
    cmd
}

fn two_page_listing(base: &str, path: &str) -> (u16, String) {
    let body = if path.contains("page=2") {
        json!({
            "results": [{"id": 2, "name": "team/bar", "language": "lua", "code": "return 2",
                         "json_args": {"debug": true}}],
            "links": {"next": null}
        })
    } else {
        json!({
            "results": [{"id": 1, "name": "foo", "language": "javascript", "code": "old"}],
            "links": {"next": format!("{base}/edge_functions?page=2")}
        })
    };
    (200, body.to_string())
}

fn init_workspace(home: &TempDir, workspace: &Path) {
    let server = MockApiServer::start(2, |base, _, path| two_page_listing(base, path));
    azion_cmd(home.path())
        .env("AZION_TOKEN", "env-token")
        .env("AZION_API_URL", server.api_url())
        .env("AZION_WORKSPACE_DIR", workspace)
        .arg("init")
        .assert()
        .success()
        .stdout(contains("2 edge function(s) listed"));
    let requests = server.finish();
    assert!(requests
        .iter()
        .all(|r| r.method == "GET" && r.auth_header == "Token env-token"));
}

#[test]
fn init_materializes_every_page_and_stores_token() {
    let home = TempDir::new().expect("home");
    let workspace = home.path().join("functions");
    init_workspace(&home, &workspace);

    assert_eq!(
        fs::read_to_string(workspace.join("foo").join("code.js")).expect("code"),
        "old"
    );
    let bar = workspace.join("team\u{2215}bar");
    assert_eq!(
        fs::read_to_string(bar.join("code.lua")).expect("lua"),
        "return 2"
    );
    let args: Value =
        serde_json::from_str(&fs::read_to_string(bar.join("args.json")).expect("args"))
            .expect("args json");
    assert_eq!(args, json!({"debug": true}));

    let stored = fs::read_to_string(home.path().join(".azion").join("credentials"))
        .expect("credentials");
    assert_eq!(stored, "env-token");
    assert!(home
        .path()
        .join(".azion")
        .join("cache")
        .join("functions.json")
        .is_file());
}

#[test]
fn push_sends_patch_for_edited_code() {
    let home = TempDir::new().expect("home");
    let workspace = home.path().join("functions");
    init_workspace(&home, &workspace);

    let code = workspace.join("foo").join("code.js");
    fs::write(&code, "new").expect("edit");

    let server = MockApiServer::start(1, |_, _, _| {
        (200, json!({"results": {"id": 1, "code": "new"}}).to_string())
    });
    azion_cmd(home.path())
        .env("AZION_API_URL", server.api_url())
        .env("AZION_WORKSPACE_DIR", &workspace)
        .args(["push"])
        .arg(&code)
        .assert()
        .success()
        .stdout(contains("'foo' (1) updated: code"));

    let requests = server.finish();
    assert_eq!(requests[0].method, "PATCH");
    assert_eq!(requests[0].path, "/edge_functions/1");
    assert_eq!(requests[0].auth_header, "Token env-token");
    let body: Value = serde_json::from_str(&requests[0].body).expect("body");
    assert_eq!(body, json!({"code": "new"}));

    azion_cmd(home.path())
        .env("AZION_WORKSPACE_DIR", &workspace)
        .args(["push"])
        .arg(&code)
        .assert()
        .success()
        .stdout(contains("No changes to push"));
}

#[test]
fn rejected_token_is_deleted_on_push() {
    let home = TempDir::new().expect("home");
    let workspace = home.path().join("functions");
    init_workspace(&home, &workspace);

    let code = workspace.join("foo").join("code.js");
    fs::write(&code, "new").expect("edit");

    let server = MockApiServer::start(1, |_, _, _| {
        (401, json!({"detail": "Invalid token"}).to_string())
    });
    azion_cmd(home.path())
        .env("AZION_API_URL", server.api_url())
        .env("AZION_WORKSPACE_DIR", &workspace)
        .args(["push"])
        .arg(&code)
        .assert()
        .failure()
        .stderr(contains("token was rejected"));
    server.finish();

    assert!(!home.path().join(".azion").join("credentials").exists());

    azion_cmd(home.path())
        .env("AZION_WORKSPACE_DIR", &workspace)
        .args(["status", "--json"])
        .assert()
        .success()
        .stdout(contains("\"state\": \"modified\""));
}

#[test]
fn status_json_reports_every_function() {
    let home = TempDir::new().expect("home");
    let workspace = home.path().join("functions");
    init_workspace(&home, &workspace);

    let output = azion_cmd(home.path())
        .env("AZION_WORKSPACE_DIR", &workspace)
        .args(["status", "--json"])
        .output()
        .expect("run status");
    assert!(output.status.success());
    let payload: Value = serde_json::from_slice(&output.stdout).expect("status json");
    let functions = payload["functions"].as_array().expect("functions");
    assert_eq!(functions.len(), 2);
    assert!(functions.iter().all(|f| f["state"] == "current"));
    assert!(payload["synced_at"].is_string());
}

#[test]
fn init_without_token_fails_non_interactively() {
    let home = TempDir::new().expect("home");
    azion_cmd(home.path())
        .env("AZION_API_URL", "http://127.0.0.1:9/edge_functions")
        .env("AZION_WORKSPACE_DIR", home.path().join("functions"))
        .arg("init")
        .assert()
        .failure()
        .stderr(contains("AZION_TOKEN"));
}

#[test]
fn push_without_token_fails_before_any_request() {
    let home = TempDir::new().expect("home");
    let workspace = home.path().join("functions");
    init_workspace(&home, &workspace);
    fs::remove_file(home.path().join(".azion").join("credentials")).expect("drop token");

    let code = workspace.join("foo").join("code.js");
    fs::write(&code, "new").expect("edit");
    azion_cmd(home.path())
        .env("AZION_API_URL", "http://127.0.0.1:9/edge_functions")
        .env("AZION_WORKSPACE_DIR", &workspace)
        .args(["push"])
        .arg(&code)
        .assert()
        .failure()
        .stderr(contains("AZION_TOKEN"));
}

#[test]
fn push_outside_workspace_is_refused() {
    let home = TempDir::new().expect("home");
    let workspace = home.path().join("functions");
    init_workspace(&home, &workspace);

    let stray = home.path().join("elsewhere").join("foo");
    fs::create_dir_all(&stray).expect("stray dir");
    let code = stray.join("code.js");
    fs::write(&code, "unrelated").expect("write");
    azion_cmd(home.path())
        .env("AZION_API_URL", "http://127.0.0.1:9/edge_functions")
        .env("AZION_WORKSPACE_DIR", &workspace)
        .args(["push"])
        .arg(&code)
        .assert()
        .failure()
        .stderr(contains("is not inside an edge function directory"));
}

#[test]
fn config_set_then_show() {
    let home = TempDir::new().expect("home");
    azion_cmd(home.path())
        .args(["config", "set", "max_pages", "25"])
        .assert()
        .success();
    azion_cmd(home.path())
        .args(["config", "set", "workspace_dir", "/srv/functions"])
        .assert()
        .success();

    azion_cmd(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(contains("max_pages: 25"))
        .stdout(contains("workspace_dir: /srv/functions"))
        .stdout(contains("api_url: https://api.azionapi.net/edge_functions"));

    azion_cmd(home.path())
        .args(["config", "set", "max_pages", "zero"])
        .assert()
        .failure();
    azion_cmd(home.path())
        .args(["config", "set", "colour", "blue"])
        .assert()
        .failure()
        .stderr(contains("colour"));
}
