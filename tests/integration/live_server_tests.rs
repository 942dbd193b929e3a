//! End-to-end tests over a real TCP socket.
//!
//! The router is served on an ephemeral port on 127.0.0.1 and driven with
//! reqwest, so multipart encoding, streaming download bodies and graceful
//! shutdown go through hyper rather than `oneshot`.

use std::net::SocketAddr;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use penguinblur::RouterConfig;

use super::test_utils::{sample_payload, TestContext};

struct LiveServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl LiveServer {
    async fn start(ctx: &TestContext) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().unwrap();
        let router = ctx.router_with(RouterConfig::new(addr.port()));
        let (tx, rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = rx.await;
                })
                .await
                .expect("Server error");
        });

        Self {
            addr,
            shutdown: Some(tx),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("Server did not shut down")
            .unwrap();
    }
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .expect("Failed to create HTTP client")
}

fn video_form(filename: &str, data: Vec<u8>) -> Form {
    let part = Part::bytes(data)
        .file_name(filename.to_string())
        .mime_str("video/mp4")
        .unwrap();
    Form::new().part("file", part)
}

#[tokio::test]
async fn test_live_end_to_end() {
    let ctx = TestContext::new().await;
    let server = LiveServer::start(&ctx).await;
    let http = client();
    let payload = sample_payload(1024);

    let health: serde_json::Value = http
        .get(server.url("/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["port"], server.addr.port());

    let response = http
        .post(server.url("/api/upload"))
        .multipart(video_form("clip.mp4", payload.clone()))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let json: serde_json::Value = response.json().await.unwrap();
    assert_eq!(json["filename"], "clip.mp4");
    assert_eq!(json["size"], 1024);

    let response = http
        .post(server.url("/api/video/process"))
        .query(&[("filename", "clip.mp4"), ("blur_intensity", "2")])
        .send()
        .await
        .unwrap();
    let json: serde_json::Value = response.json().await.unwrap();
    assert_eq!(json["output_filename"], "blurred_2_clip.mp4");

    let json: serde_json::Value = http
        .get(server.url("/api/video/list"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(json["files"].as_array().unwrap().len(), 1);
    assert_eq!(json["files"][0]["size"], 1024);

    let response = http
        .get(server.url("/api/video/download/blurred_2_clip.mp4"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(response.content_length(), Some(1024));
    assert_eq!(
        response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .unwrap(),
        "video/mp4"
    );
    let body = response.bytes().await.unwrap();
    assert_eq!(body.as_ref(), payload.as_slice());

    let json: serde_json::Value = http
        .delete(server.url("/api/cleanup"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(json["deleted_files"], 0);

    server.stop().await;
}

#[tokio::test]
async fn test_live_large_streamed_upload_and_download() {
    let ctx = TestContext::new().await;
    let server = LiveServer::start(&ctx).await;
    let http = client();
    let payload = sample_payload(8 * 1024 * 1024 + 17);

    let response = http
        .post(server.url("/api/upload"))
        .multipart(video_form("long.mp4", payload.clone()))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let response = http
        .post(server.url("/api/video/process"))
        .query(&[("filename", "long.mp4")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let body = http
        .get(server.url("/api/video/download/blurred_2_long.mp4"))
        .send()
        .await
        .unwrap()
        .bytes()
        .await
        .unwrap();
    assert_eq!(body.len(), payload.len());
    assert!(body.as_ref() == payload.as_slice());

    server.stop().await;
}

#[tokio::test]
async fn test_live_rejects_non_video() {
    let ctx = TestContext::new().await;
    let server = LiveServer::start(&ctx).await;

    let part = Part::bytes(b"hello".to_vec())
        .file_name("notes.txt")
        .mime_str("text/plain")
        .unwrap();
    let response = client()
        .post(server.url("/api/upload"))
        .multipart(Form::new().part("file", part))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    let json: serde_json::Value = response.json().await.unwrap();
    assert_eq!(json["message"], "File must be a video");

    server.stop().await;
}
