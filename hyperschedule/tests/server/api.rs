use hyperschedule_client::Error;
use pretty_assertions::assert_eq;
use reqwest::StatusCode;

use crate::{TestServer, course};

#[test_log::test(tokio::test)]
async fn unavailable_before_first_refresh() {
    let server = TestServer::spawn().await;
    let client = server.client();

    assert_eq!(client.health().await.unwrap(), "OK");

    let err = client.api_v2_all_courses().await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::SERVICE_UNAVAILABLE));
    let err = client.api_v2_courses_since(0).await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::SERVICE_UNAVAILABLE));
    let err = client.api_v2_malformed_courses().await.unwrap_err();
    assert!(matches!(err, Error::ApiError { .. }), "{err}");
}

#[test_log::test(tokio::test)]
async fn incremental_updates() {
    let server = TestServer::spawn().await;
    let client = server.client();

    let intro = course("CS", 5, 1, 10);
    let algorithms = course("CS", 140, 1, 20);
    client
        .debug_set_courses(&[intro.clone(), algorithms.clone()], Some(100))
        .await
        .unwrap();

    let all = client.api_v2_all_courses().await.unwrap();
    assert_eq!(all.timestamp, 100);
    assert_eq!(all.courses.len(), 2);
    assert_eq!(all.malformed_course_count, 0);

    // nothing happened since the first refresh
    let since = client.api_v2_courses_since(100).await.unwrap();
    assert!(since.incremental);
    assert!(since.diff.unwrap().is_empty());

    // one seat taken, one course dropped, one course added
    let systems = course("CS", 105, 1, 30);
    let fuller_intro = course("CS", 5, 1, 9);
    client
        .debug_set_courses(&[fuller_intro.clone(), systems.clone()], Some(200))
        .await
        .unwrap();

    let since = client.api_v2_courses_since(100).await.unwrap();
    assert!(since.incremental);
    assert_eq!(since.timestamp, 200);
    assert_eq!(since.courses, None);
    let diff = since.diff.unwrap();
    assert_eq!(diff.added, vec![systems]);
    assert_eq!(diff.removed.len(), 1);
    assert_eq!(diff.removed[0].key(), algorithms.key());
    assert_eq!(diff.modified.len(), 1);
    assert_eq!(diff.modified[0].key(), intro.key());
    assert_eq!(diff.modified[0].open_seats, Some(9));
    assert_eq!(diff.modified[0].course_name, None);

    // up to date
    let since = client.api_v2_courses_since(200).await.unwrap();
    assert!(since.incremental);
    assert!(since.diff.unwrap().is_empty());

    // older than anything the server knows about
    let since = client.api_v2_courses_since(50).await.unwrap();
    assert!(!since.incremental);
    assert_eq!(since.diff, None);
    assert_eq!(since.courses.unwrap().len(), 2);
}

#[test_log::test(tokio::test)]
async fn raw_routes() {
    let server = TestServer::spawn().await;
    server
        .client()
        .debug_set_courses(&[course("MATH", 55, 1, 5)], Some(7))
        .await
        .unwrap();
    let http = reqwest::Client::new();
    let base = server.client_addr();

    // trailing slashes are accepted and CORS is open
    let resp = http
        .get(format!("{base}/api/v2/all-courses/"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );

    let resp = http
        .get(format!("{base}/api/v2/courses-since/yesterday"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(resp.text().await.unwrap(), "Malformed timestamp \"yesterday\"");

    let resp = http.get(format!("{base}/nope")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = http
        .get(format!("{base}/experimental/course-data"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let dump: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(dump["timestamp"], 7);
}
