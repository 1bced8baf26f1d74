use once_cell::sync::Lazy;
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use std::net::TcpListener;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

struct TestServer {
    base_url: String,
    child: Child,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

static TEST_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
static SERVER: Lazy<Mutex<Option<Arc<TestServer>>>> = Lazy::new(|| Mutex::new(None));

#[cfg(unix)]
mod cleanup {
    use std::sync::Once;
    use std::sync::atomic::{AtomicI32, Ordering};

    static REGISTER: Once = Once::new();
    static PID: AtomicI32 = AtomicI32::new(0);

    pub fn register(pid: u32) {
        REGISTER.call_once(|| {
            PID.store(pid as i32, Ordering::SeqCst);
            unsafe {
                libc::atexit(on_exit);
            }
        });
    }

    extern "C" fn on_exit() {
        let pid = PID.load(Ordering::SeqCst);
        if pid > 0 {
            unsafe {
                libc::kill(pid, libc::SIGTERM);
            }
        }
    }
}

fn pick_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn unique_dir() -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("mood_journal_http_{}_{}", std::process::id(), nanos));
    path
}

async fn wait_until_ready(base_url: &str) {
    let client = Client::new();
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        if let Ok(resp) = client.get(format!("{base_url}/api/draft")).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        if Instant::now() > deadline {
            panic!("server did not become ready");
        }
        sleep(Duration::from_millis(100)).await;
    }
}

async fn spawn_server() -> TestServer {
    let port = pick_free_port();
    let dir = unique_dir();
    let child = Command::new(env!("CARGO_BIN_EXE_mood_journal"))
        .env("PORT", port.to_string())
        .env("APP_DATA_PATH", dir.join("entries.json"))
        .env("APP_DRAFT_DIR", dir.join("drafts"))
        .env("DRAFT_DEBOUNCE_MS", "30")
        .env("RUST_LOG", "info")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn server");

    #[cfg(unix)]
    cleanup::register(child.id());

    let base_url = format!("http://127.0.0.1:{port}");
    wait_until_ready(&base_url).await;

    TestServer { base_url, child }
}

async fn shared_server() -> Arc<TestServer> {
    let mut guard = SERVER.lock().await;
    if let Some(server) = guard.as_ref() {
        return Arc::clone(server);
    }
    let server = Arc::new(spawn_server().await);
    *guard = Some(Arc::clone(&server));
    server
}

async fn fresh_draft(client: &Client, server: &TestServer) -> Value {
    client
        .delete(format!("{}/api/draft", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

async fn post_field(client: &Client, server: &TestServer, field: &str, value: Value) -> Value {
    let response = client
        .post(format!("{}/api/draft/field", server.base_url))
        .json(&json!({ "field": field, "value": value }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    response.json().await.unwrap()
}

async fn get_draft(client: &Client, server: &TestServer) -> Value {
    client
        .get(format!("{}/api/draft", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn http_update_field_marks_draft_dirty() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    fresh_draft(&client, &server).await;

    let draft = post_field(&client, &server, "moodScore", json!(7)).await;

    assert_eq!(draft["formData"]["moodScore"], 7);
    assert_eq!(draft["isDraftDirty"], true);
    assert_eq!(draft["modifiedFields"], json!(["moodScore"]));
    assert!(draft["offlineChanges"]["lastModified"].is_string());
}

#[tokio::test]
async fn http_rejects_invalid_updates() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    fresh_draft(&client, &server).await;

    let response = client
        .post(format!("{}/api/draft/field", server.base_url))
        .json(&json!({ "field": "moodScore", "value": 0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    client
        .post(format!("{}/api/draft/items/skills", server.base_url))
        .json(&json!({ "id": "s1", "name": "Check the facts" }))
        .send()
        .await
        .unwrap();
    client
        .post(format!("{}/api/draft/items/skills/s1/toggle", server.base_url))
        .send()
        .await
        .unwrap();
    let response = client
        .put(format!("{}/api/draft/items/skills/s1/rating", server.base_url))
        .json(&json!({ "kind": "severity", "value": "mild" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let draft = get_draft(&client, &server).await;
    assert_eq!(draft["formData"]["moodScore"], 5);
    assert!(draft["formData"]["skills"][0].get("severity").is_none());
}

#[tokio::test]
async fn http_unchecking_item_clears_rating() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    fresh_draft(&client, &server).await;

    let base = format!("{}/api/draft/items/behaviors", server.base_url);
    let response = client
        .post(&base)
        .json(&json!({ "id": "b1", "name": "Skip meal" }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    client.post(format!("{base}/b1/toggle")).send().await.unwrap();
    let draft: Value = client
        .put(format!("{base}/b1/rating"))
        .json(&json!({ "kind": "severity", "value": "moderate" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(draft["formData"]["behaviors"][0]["severity"], "moderate");

    let draft: Value = client
        .post(format!("{base}/b1/toggle"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let item = &draft["formData"]["behaviors"][0];
    assert_eq!(item["completed"], false);
    assert!(item.get("severity").is_none());
}

#[tokio::test]
async fn http_reset_keeps_bipolar_mode() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    fresh_draft(&client, &server).await;

    post_field(&client, &server, "isBipolarMode", json!(true)).await;
    post_field(&client, &server, "moodScore", json!(9)).await;

    let draft: Value = client
        .post(format!("{}/api/draft/reset", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(draft["formData"]["isBipolarMode"], true);
    assert_eq!(draft["formData"]["moodScore"], 5);
    assert_eq!(draft["modifiedFields"], json!([]));
    assert_eq!(draft["isDraftDirty"], false);
}

#[tokio::test]
async fn http_debounced_update_lands_after_delay() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    fresh_draft(&client, &server).await;

    for text in ["s", "sl", "slept badly"] {
        let response = client
            .post(format!("{}/api/draft/field?debounce=true", server.base_url))
            .json(&json!({ "field": "sleepNotes", "value": text }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    sleep(Duration::from_millis(300)).await;
    let draft = get_draft(&client, &server).await;
    assert_eq!(draft["formData"]["sleepNotes"], "slept badly");

    let response = client
        .post(format!("{}/api/draft/field?debounce=true", server.base_url))
        .json(&json!({ "field": "moodNotes", "value": "stale" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    fresh_draft(&client, &server).await;

    sleep(Duration::from_millis(300)).await;
    let draft = get_draft(&client, &server).await;
    assert_eq!(draft["formData"]["moodNotes"], "");
    assert_eq!(draft["isDraftDirty"], false);
}

#[tokio::test]
async fn http_submit_records_entry_and_clears_draft() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    fresh_draft(&client, &server).await;

    post_field(&client, &server, "moodScore", json!(8)).await;
    post_field(&client, &server, "sleepHours", json!(6.5)).await;

    let response = client
        .post(format!("{}/api/entries", server.base_url))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let entry: Value = response.json().await.unwrap();
    assert_eq!(entry["form"]["moodScore"], 8);
    let date = entry["date"].as_str().unwrap().to_string();

    let draft = get_draft(&client, &server).await;
    assert_eq!(draft["isDraftDirty"], false);
    assert_eq!(draft["formData"]["moodScore"], 5);
    assert_eq!(draft["lastEntryDate"], date.as_str());

    let stored: Value = client
        .get(format!("{}/api/entries/{date}", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stored["form"]["sleepHours"], 6.5);

    let stats: Value = client
        .get(format!("{}/api/stats", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["last_7_days"].as_array().unwrap().len(), 7);

    let missing = client
        .get(format!("{}/api/entries/1999-01-01", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn http_put_draft_round_trips_and_rejects_bad_payloads() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    fresh_draft(&client, &server).await;

    let payload = json!({
        "draftDate": "2026-02-03",
        "isDraftDirty": true,
        "formData": {
            "moodScore": 8,
            "behaviors": [
                { "id": "b1", "name": "Skip meal", "completed": true, "severity": "mild" }
            ]
        },
        "modifiedFields": ["moodScore", "behaviors"]
    });
    let response = client
        .put(format!("{}/api/draft", server.base_url))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let draft = get_draft(&client, &server).await;
    assert_eq!(draft["draftDate"], "2026-02-03");
    assert_eq!(draft["formData"]["moodScore"], 8);
    assert_eq!(draft["formData"]["behaviors"][0]["severity"], "mild");
    assert_eq!(draft["modifiedFields"], json!(["moodScore", "behaviors"]));

    let response = client
        .put(format!("{}/api/draft", server.base_url))
        .json(&json!({ "formData": { "moodScore": 0 } }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(get_draft(&client, &server).await, draft);
}
