//! Lifecycle integration tests: upload → process → list → download → cleanup.
//!
//! Tests verify:
//! - The full round trip through the router
//! - Processed names are a pure function of (filename, intensity)
//! - Listing grows by one per distinct processed name
//! - Concurrent writers to one name never leave a torn file

use std::collections::HashSet;

use axum::http::StatusCode;
use tower::ServiceExt;

use penguinblur::storage::parse_processed_name;

use super::test_utils::{
    body_bytes, body_json, cleanup_request, get, process_request, sample_payload, upload_request,
    TestContext,
};

#[tokio::test]
async fn test_full_lifecycle_through_router() {
    let ctx = TestContext::new().await;
    let router = ctx.router();
    let payload = sample_payload(1024);

    // Upload
    let response = router
        .clone()
        .oneshot(upload_request("clip.mp4", "video/mp4", &payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["size"], 1024);

    // Process
    let response = router
        .clone()
        .oneshot(process_request("clip.mp4", Some("2")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["output_filename"], "blurred_2_clip.mp4");

    // List
    let response = router
        .clone()
        .oneshot(get("/api/video/list"))
        .await
        .unwrap();
    let json = body_json(response).await;
    let files = json["files"].as_array().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["filename"], "blurred_2_clip.mp4");
    assert_eq!(files[0]["size"], 1024);

    // Download
    let response = router
        .clone()
        .oneshot(get("/api/video/download/blurred_2_clip.mp4"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await.as_ref(), payload.as_slice());

    // Cleanup: nothing is old enough yet
    let response = router.oneshot(cleanup_request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json, serde_json::json!({"success": true, "deleted_files": 0}));

    assert!(ctx.temp_dir().join("blurred_2_clip.mp4").exists());
    assert!(ctx.upload_dir().join("clip.mp4").exists());
}

#[tokio::test]
async fn test_listing_counts_distinct_outputs() {
    let ctx = TestContext::new().await;
    ctx.service
        .upload_bytes("a.mp4", "video/mp4", sample_payload(8))
        .await
        .unwrap();
    ctx.service
        .upload_bytes("b.mp4", "video/mp4", sample_payload(16))
        .await
        .unwrap();

    assert!(ctx.service.list_processed().await.unwrap().is_empty());

    let calls = [("a.mp4", 1), ("a.mp4", 2), ("b.mp4", 1), ("a.mp4", 1)];
    let mut expected = HashSet::new();
    for (name, intensity) in calls {
        let outcome = ctx.service.process(name, intensity).await.unwrap();
        expected.insert(outcome.output_filename);
    }

    let listed: HashSet<_> = ctx
        .service
        .list_processed()
        .await
        .unwrap()
        .into_iter()
        .map(|f| f.filename)
        .collect();
    assert_eq!(listed, expected);
    assert_eq!(listed.len(), 3);

    for name in &listed {
        let (intensity, source) = parse_processed_name(name).unwrap();
        assert!(["a.mp4", "b.mp4"].contains(&source));
        assert!(intensity == 1 || intensity == 2);
    }
}

#[tokio::test]
async fn test_processed_name_keeps_underscores_in_source() {
    let ctx = TestContext::new().await;
    ctx.service
        .upload_bytes("my_holiday_2024.mp4", "video/mp4", sample_payload(4))
        .await
        .unwrap();

    let outcome = ctx.service.process("my_holiday_2024.mp4", 12).await.unwrap();

    assert_eq!(outcome.output_filename, "blurred_12_my_holiday_2024.mp4");
    assert_eq!(
        parse_processed_name(&outcome.output_filename),
        Some((12, "my_holiday_2024.mp4"))
    );
}

#[tokio::test]
async fn test_concurrent_uploads_same_name_never_tear() {
    let ctx = TestContext::new().await;

    let mut handles = Vec::new();
    for i in 0..16u8 {
        let service = ctx.service.clone();
        handles.push(tokio::spawn(async move {
            let payload = vec![i; 4096 + i as usize * 512];
            service.upload_bytes("clip.mp4", "video/mp4", payload).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let stored = std::fs::read(ctx.upload_dir().join("clip.mp4")).unwrap();
    let first = stored[0];
    assert_eq!(stored.len(), 4096 + first as usize * 512);
    assert!(stored.iter().all(|&b| b == first));

    // No partial files left behind
    let leftovers: Vec<_> = std::fs::read_dir(ctx.upload_dir())
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .filter(|n| n.starts_with('.'))
        .collect();
    assert!(leftovers.is_empty(), "partial files left: {leftovers:?}");
}

#[tokio::test]
async fn test_concurrent_process_and_download() {
    let ctx = TestContext::new().await;
    let payload = sample_payload(64 * 1024);
    ctx.service
        .upload_bytes("clip.mp4", "video/mp4", payload.clone())
        .await
        .unwrap();
    ctx.service.process("clip.mp4", 2).await.unwrap();

    let router = ctx.router();
    let mut handles = Vec::new();
    for i in 0..8 {
        let service = ctx.service.clone();
        let router = router.clone();
        handles.push(tokio::spawn(async move {
            if i % 2 == 0 {
                service.process("clip.mp4", 2).await.unwrap();
                None
            } else {
                let response = router
                    .oneshot(get("/api/video/download/blurred_2_clip.mp4"))
                    .await
                    .unwrap();
                assert_eq!(response.status(), StatusCode::OK);
                Some(body_bytes(response).await)
            }
        }));
    }

    for handle in handles {
        if let Some(body) = handle.await.unwrap() {
            assert_eq!(body.as_ref(), payload.as_slice());
        }
    }
}

#[tokio::test]
async fn test_reupload_then_reprocess_overwrites_output() {
    let ctx = TestContext::new().await;
    ctx.service
        .upload_bytes("clip.mp4", "video/mp4", vec![1u8; 10])
        .await
        .unwrap();
    ctx.service.process("clip.mp4", 2).await.unwrap();

    ctx.service
        .upload_bytes("clip.mp4", "video/mp4", vec![2u8; 20])
        .await
        .unwrap();
    ctx.service.process("clip.mp4", 2).await.unwrap();

    let files = ctx.service.list_processed().await.unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].size, 20);
    let output = std::fs::read(ctx.temp_dir().join("blurred_2_clip.mp4")).unwrap();
    assert_eq!(output, vec![2u8; 20]);
}
