use reqwest::StatusCode;

use crate::{TestServer, course};

#[test_log::test(tokio::test)]
async fn reset_forgets_everything() {
    let server = TestServer::spawn().await;
    let client = server.client();

    client
        .debug_set_courses(&[course("CS", 5, 1, 10)], None)
        .await
        .unwrap();
    assert_eq!(client.api_v2_all_courses().await.unwrap().courses.len(), 1);

    client.debug_reset().await.unwrap();
    let err = client.api_v2_all_courses().await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::SERVICE_UNAVAILABLE));
}

#[test_log::test(tokio::test)]
async fn scrape_without_scraper_is_unavailable() {
    let server = TestServer::spawn().await;
    let err = server.client().debug_scrape().await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::SERVICE_UNAVAILABLE));
}

#[test_log::test(tokio::test)]
async fn duplicate_courses_are_rejected() {
    let server = TestServer::spawn().await;
    let client = server.client();

    let mut suffixed = course("CS", 5, 1, 10);
    suffixed.course_code_suffix = "A".to_string();
    let err = client
        .debug_set_courses(&[suffixed.clone(), suffixed], Some(10))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));

    // nothing was committed
    let err = client.api_v2_all_courses().await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::SERVICE_UNAVAILABLE));
}

#[test_log::test(tokio::test)]
async fn debug_routes_disabled_in_production() {
    let server = TestServer::configure().with_production().spawn().await;
    let client = server.client();

    let err = client
        .debug_set_courses(&[course("CS", 5, 1, 10)], Some(1))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::METHOD_NOT_ALLOWED));
    let err = client.debug_reset().await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::METHOD_NOT_ALLOWED));
    let err = client.debug_scrape().await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::METHOD_NOT_ALLOWED));

    assert_eq!(client.health().await.unwrap(), "OK");
}

#[cfg(unix)]
#[test_log::test(tokio::test)]
async fn stops_on_sigterm() {
    let mut server = TestServer::spawn().await;
    let status = server.terminate();
    assert!(status.success(), "{status}");
}
