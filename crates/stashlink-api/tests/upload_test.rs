mod helpers;

use helpers::*;
use serde_json::json;

const MB: usize = 1024 * 1024;

#[tokio::test]
async fn test_chunked_upload_randomized_end_to_end() {
    let app = setup_test_app();
    let nonce = app.token("upload_chunk").await;

    let sizes = [2 * MB, 2 * MB, 500 * 1024];
    let mut expected = Vec::new();
    for (index, size) in sizes.iter().enumerate() {
        let chunk = vec![b'a' + index as u8; *size];
        expected.extend_from_slice(&chunk);
        let response = app
            .send_chunk("upload_1700000000_video", index as u32, chunk, &nonce)
            .await;
        assert_eq!(response.status_code(), 200);
        let body: serde_json::Value = response.json();
        assert_eq!(body["status"], "success");
        assert_eq!(body["data"]["bytes"], *size as u64);
    }

    let response = app
        .finish(json!({
            "upload_id": "upload_1700000000_video",
            "file_name": "video.mp4",
            "convert_filename": "randomized",
            "total_chunks": 3,
            "nonce": nonce,
        }))
        .await;
    assert_eq!(response.status_code(), 200);

    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "success");
    let data = &body["data"];
    let file_name = data["file_name"].as_str().unwrap();
    let (base, extension) = file_name.split_at(12);
    assert_eq!(extension, ".mp4");
    assert!(base.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(data["size_bytes"], (4 * MB + 500 * 1024) as u64);
    assert_eq!(data["backend"], "local");

    let published = std::fs::read(app.share_path().join(file_name)).unwrap();
    assert_eq!(published.len(), 4 * MB + 500 * 1024);
    assert!(published == expected);

    let url = data["url"].as_str().unwrap();
    assert_eq!(url, format!("{}{}", SHARE_URL, file_name));
    let calls = app.shortlinks.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].url, url);
    assert_eq!(calls[0].title, "randomized: video.mp4");
    assert_eq!(data["short_url"], "https://sho.rt/1");

    let message = body["message"].as_str().unwrap();
    assert!(message.contains(url));
    assert!(message.contains("https://sho.rt/1"));

    // Chunks and artifact are gone from scratch
    assert_eq!(app.scratch_entries(), 0);
}

#[tokio::test]
async fn test_out_of_order_chunks_publish_in_index_order() {
    let app = setup_test_app();
    let nonce = app.token("upload_chunk").await;

    for (index, data) in [(2u32, "CC"), (0, "AA"), (1, "BB")] {
        let response = app
            .send_chunk("ordering", index, data.as_bytes().to_vec(), &nonce)
            .await;
        assert_eq!(response.status_code(), 200);
    }

    let response = app
        .finish(json!({
            "upload_id": "ordering",
            "file_name": "letters.txt",
            "nonce": nonce,
        }))
        .await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(
        std::fs::read_to_string(app.share_path().join("letters.txt")).unwrap(),
        "AABBCC"
    );
}

#[tokio::test]
async fn test_name_collisions_get_numbered() {
    let app = setup_test_app();
    let nonce = app.token("upload_chunk").await;
    std::fs::write(app.share_path().join("report.txt"), b"first").unwrap();

    let mut names = Vec::new();
    for (upload_id, content) in [("second", "two"), ("third", "three")] {
        app.send_chunk(upload_id, 0, content.as_bytes().to_vec(), &nonce)
            .await;
        let response = app
            .finish(json!({
                "upload_id": upload_id,
                "file_name": "report.txt",
                "custom_shortname": upload_id,
                "nonce": nonce,
            }))
            .await;
        assert_eq!(response.status_code(), 200);
        let body: serde_json::Value = response.json();
        names.push(body["data"]["file_name"].as_str().unwrap().to_string());
        assert_eq!(
            body["data"]["short_url"],
            format!("https://sho.rt/{}", upload_id)
        );
    }

    assert_eq!(names, vec!["report.2.txt", "report.3.txt"]);
    assert_eq!(
        std::fs::read_to_string(app.share_path().join("report.txt")).unwrap(),
        "first"
    );
    assert_eq!(
        std::fs::read_to_string(app.share_path().join("report.3.txt")).unwrap(),
        "three"
    );
}

#[tokio::test]
async fn test_browser_safe_name_and_custom_title() {
    let app = setup_test_app();
    let nonce = app.token("upload_chunk").await;
    app.send_chunk("safe", 0, b"x".to_vec(), &nonce).await;

    let response = app
        .finish(json!({
            "upload_id": "safe",
            "file_name": "my not safe&clean filename #1.txt",
            "convert_filename": "browser-safe",
            "custom_title": "Quarterly notes",
            "nonce": nonce,
        }))
        .await;
    assert_eq!(response.status_code(), 200);
    let body: serde_json::Value = response.json();
    assert_eq!(body["data"]["file_name"], "my_not_safe_clean_filename_1.txt");
    assert_eq!(app.shortlinks.calls.lock().unwrap()[0].title, "Quarterly notes");
}

#[tokio::test]
async fn test_missing_chunk_index_is_integrity_failure() {
    let app = setup_test_app();
    let nonce = app.token("upload_chunk").await;
    app.send_chunk("gappy", 0, b"a".to_vec(), &nonce).await;
    app.send_chunk("gappy", 2, b"c".to_vec(), &nonce).await;

    let response = app
        .finish(json!({
            "upload_id": "gappy",
            "file_name": "gappy.bin",
            "total_chunks": 3,
            "nonce": nonce,
        }))
        .await;
    assert_eq!(response.status_code(), 422);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "INTEGRITY_FAILURE");
    assert_eq!(body["recoverable"], true);

    // Resending the missing chunk lets the same session finish
    app.send_chunk("gappy", 1, b"b".to_vec(), &nonce).await;
    let response = app
        .finish(json!({
            "upload_id": "gappy",
            "file_name": "gappy.bin",
            "total_chunks": 3,
            "nonce": nonce,
        }))
        .await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(
        std::fs::read(app.share_path().join("gappy.bin")).unwrap(),
        b"abc"
    );
}

#[tokio::test]
async fn test_finish_without_chunks_is_integrity_failure() {
    let app = setup_test_app();
    let nonce = app.token("upload_chunk").await;

    let response = app
        .finish(json!({
            "upload_id": "never_sent",
            "file_name": "ghost.txt",
            "nonce": nonce,
        }))
        .await;
    assert_eq!(response.status_code(), 422);
}

#[tokio::test]
async fn test_chunk_without_data_is_rejected() {
    let app = setup_test_app();
    let nonce = app.token("upload_chunk").await;

    let response = app.send_chunk("empty", 0, Vec::new(), &nonce).await;
    assert_eq!(response.status_code(), 422);
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "error");
    assert_eq!(body["code"], "INTEGRITY_FAILURE");
    assert_eq!(app.scratch_entries(), 0);
}

#[tokio::test]
async fn test_unconfigured_backend_fails_before_touching_chunks() {
    let app = setup_unconfigured_app();
    let nonce = app.token("upload_chunk").await;
    app.send_chunk("waiting", 0, b"data".to_vec(), &nonce).await;

    let response = app
        .finish(json!({
            "upload_id": "waiting",
            "file_name": "data.bin",
            "nonce": nonce,
        }))
        .await;
    assert_eq!(response.status_code(), 503);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "CONFIG_FAILURE");
    assert!(app
        .scratch_path()
        .join("stashlink_tmp_waiting")
        .join("part_0")
        .exists());
}

#[tokio::test]
async fn test_shortlink_failure_still_reports_url() {
    let app = setup_test_app_with_failing_shortlinks("keyword already exists");
    let nonce = app.token("upload_chunk").await;
    app.send_chunk("dup_alias", 0, b"x".to_vec(), &nonce).await;

    let response = app
        .finish(json!({
            "upload_id": "dup_alias",
            "file_name": "x.txt",
            "custom_shortname": "taken",
            "nonce": nonce,
        }))
        .await;
    assert_eq!(response.status_code(), 502);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "SHORTLINK_FAILURE");
    assert_eq!(body["url"], format!("{}x.txt", SHARE_URL));
    assert!(app.share_path().join("x.txt").exists());
}
