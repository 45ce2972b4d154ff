use pretty_assertions::assert_eq;

use crate::{TestServer, course};

#[test_log::test(tokio::test)]
async fn restores_from_cache_after_restart() {
    let dir = tempfile::tempdir().unwrap();

    let before = {
        let mut server = TestServer::configure()
            .with_cache_dir(dir.path())
            .spawn()
            .await;
        let client = server.client();
        client
            .debug_set_courses(&[course("CS", 5, 1, 10)], Some(100))
            .await
            .unwrap();
        client
            .debug_set_courses(&[course("CS", 5, 1, 9), course("CS", 70, 1, 3)], Some(200))
            .await
            .unwrap();
        let all = client.api_v2_all_courses().await.unwrap();
        server.kill();
        all
    };
    assert!(dir.path().join("course-data.json").exists());
    assert!(dir.path().join("course-data-pretty.json").exists());

    let server = TestServer::configure()
        .with_cache_dir(dir.path())
        .spawn()
        .await;
    let client = server.client();
    assert_eq!(client.api_v2_all_courses().await.unwrap(), before);

    // history survives the restart
    let since = client.api_v2_courses_since(100).await.unwrap();
    assert!(since.incremental);
    let diff = since.diff.unwrap();
    assert_eq!(diff.added.len(), 1);
    assert_eq!(diff.modified.len(), 1);
    assert_eq!(diff.modified[0].open_seats, Some(9));
}

#[test_log::test(tokio::test)]
async fn corrupt_cache_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("course-data.json"), "[not json").unwrap();

    let server = TestServer::configure()
        .with_cache_dir(dir.path())
        .spawn()
        .await;
    let err = server.client().api_v2_all_courses().await.unwrap_err();
    assert_eq!(err.status(), Some(reqwest::StatusCode::SERVICE_UNAVAILABLE));
}
