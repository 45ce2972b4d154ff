//! Dead-man's-switch notifications.
//!
//! An external monitor expects a periodic check-in and alerts when it stops arriving. We check
//! in after successful refreshes, but no more often than [`DEFAULT_MIN_INTERVAL`].

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use reqwest::{Client, Url};
use tracing::{info, warn};

pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Upper bound on a single check-in, from connecting to reading the response
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug)]
pub struct Snitch {
    client: Client,
    url: Url,
    min_interval: Duration,
    timeout: Duration,
    last_ping: Mutex<Option<Instant>>,
}

impl Snitch {
    pub fn new(url: Url) -> Self {
        Self {
            client: Client::new(),
            url,
            min_interval: DEFAULT_MIN_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
            last_ping: Mutex::new(None),
        }
    }

    pub fn with_min_interval(mut self, min_interval: Duration) -> Self {
        self.min_interval = min_interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn due(&self) -> bool {
        self.last_ping
            .lock()
            .is_none_or(|last| last.elapsed() > self.min_interval)
    }

    /// Check in if enough time has passed since the last successful check-in.
    ///
    /// Returns whether a check-in was delivered. Failures are logged and otherwise ignored.
    pub async fn notify(&self) -> bool {
        if !self.due() {
            return false;
        }
        let result = self
            .client
            .get(self.url.clone())
            .timeout(self.timeout)
            .send()
            .await
            .and_then(|response| response.error_for_status());
        match result {
            Ok(response) => {
                *self.last_ping.lock() = Some(Instant::now());
                info!(status = %response.status(), "updated dead man's snitch");
                true
            }
            Err(error) => {
                warn!(%error, timed_out = error.is_timeout(), "failed to update dead man's snitch");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test_log::test(tokio::test)]
    async fn pings_at_most_once_per_interval() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/f08b6b7be5")
            .with_status(202)
            .expect(1)
            .create_async()
            .await;

        let url = Url::parse(&format!("{}/f08b6b7be5", server.url())).unwrap();
        let snitch = Snitch::new(url);
        assert!(snitch.notify().await);
        assert!(!snitch.notify().await);

        mock.assert_async().await;
    }

    #[test_log::test(tokio::test)]
    async fn pings_again_once_the_interval_elapsed() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/snitch")
            .expect(2)
            .create_async()
            .await;

        let url = Url::parse(&format!("{}/snitch", server.url())).unwrap();
        let snitch = Snitch::new(url).with_min_interval(Duration::from_millis(10));
        assert!(snitch.notify().await);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(snitch.notify().await);

        mock.assert_async().await;
    }

    #[test_log::test(tokio::test)]
    async fn failed_ping_is_retried_next_time() {
        let mut server = mockito::Server::new_async().await;
        let failing = server
            .mock("GET", "/snitch")
            .with_status(500)
            .expect(1)
            .create_async()
            .await;

        let url = Url::parse(&format!("{}/snitch", server.url())).unwrap();
        let snitch = Snitch::new(url);
        assert!(!snitch.notify().await);
        failing.assert_async().await;
        failing.remove_async().await;

        let ok = server
            .mock("GET", "/snitch")
            .expect(1)
            .create_async()
            .await;
        assert!(snitch.notify().await);
        ok.assert_async().await;
    }

    #[test_log::test(tokio::test)]
    async fn unresponsive_snitch_times_out() {
        // accepts connections and never answers
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hold = tokio::spawn(async move {
            let mut open = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                open.push(stream);
            }
        });

        let url = Url::parse(&format!("http://{addr}/snitch")).unwrap();
        let snitch = Snitch::new(url).with_timeout(Duration::from_millis(100));
        let delivered = tokio::time::timeout(Duration::from_secs(5), snitch.notify())
            .await
            .expect("check-in is bounded by its timeout");
        assert!(!delivered);

        hold.abort();
    }
}
