//! The background refresh loop.

use std::sync::Arc;
use std::time::Duration;

use hyperschedule_catalog::cache::CacheFile;
use hyperschedule_catalog::store::RefreshSummary;
use hyperschedule_catalog::CourseStore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::fetcher::{CourseFetcher, FetchedCourses};
use crate::snitch::Snitch;
use crate::{FetchError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshOptions {
    /// Pause between the end of one attempt and the start of the next
    pub delay: Duration,
    /// Upper bound on a single fetch
    pub fetch_timeout: Duration,
}

impl Default for RefreshOptions {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(5),
            fetch_timeout: Duration::from_secs(60),
        }
    }
}

/// Fetches course listings and commits them to the store
///
/// Refresh attempts never overlap: a one-off refresh requested through
/// [`trigger`][Self::trigger] waits for any attempt already in flight.
#[derive(Debug)]
pub struct RefreshDriver {
    store: Arc<CourseStore>,
    fetcher: Arc<dyn CourseFetcher>,
    options: RefreshOptions,
    cache: Option<CacheFile>,
    snitch: Option<Snitch>,
    in_flight: tokio::sync::Mutex<()>,
}

impl RefreshDriver {
    pub fn new(
        store: Arc<CourseStore>,
        fetcher: Arc<dyn CourseFetcher>,
        options: RefreshOptions,
    ) -> Self {
        Self {
            store,
            fetcher,
            options,
            cache: None,
            snitch: None,
            in_flight: tokio::sync::Mutex::new(()),
        }
    }

    /// Save the store to `cache` after every successful refresh
    pub fn with_cache(mut self, cache: CacheFile) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_snitch(mut self, snitch: Snitch) -> Self {
        self.snitch = Some(snitch);
        self
    }

    /// Perform one refresh attempt.
    ///
    /// The timestamp recorded for the new snapshot is the time the fetch started. On error the
    /// store is left as it was.
    pub async fn run_once(&self) -> Result<RefreshSummary> {
        let _guard = self.in_flight.lock().await;

        let timestamp = chrono::Utc::now().timestamp();
        let fetched = self.fetch().await?;
        let summary = self
            .store
            .apply_refresh(timestamp, fetched.courses, fetched.malformed)?;

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.save_store(&self.store).await {
                error!(error = %e, "failed to write course data cache");
            }
        }
        if let Some(snitch) = &self.snitch {
            snitch.notify().await;
        }

        Ok(summary)
    }

    async fn fetch(&self) -> Result<FetchedCourses, FetchError> {
        let timeout = self.options.fetch_timeout;
        tokio::time::timeout(timeout, self.fetcher.fetch())
            .await
            .map_err(|_| FetchError::TimedOut(timeout))?
    }

    /// Run one attempt and log its outcome
    async fn refresh_and_log(&self) {
        info!("starting course data update");
        match self.run_once().await {
            Ok(summary) => match summary.changes {
                Some(changes) => info!(
                    timestamp = summary.timestamp,
                    courses = summary.courses,
                    malformed = summary.malformed,
                    added = changes.added,
                    removed = changes.removed,
                    modified = changes.modified,
                    "finished course data update"
                ),
                None => info!(
                    timestamp = summary.timestamp,
                    courses = summary.courses,
                    malformed = summary.malformed,
                    "loaded initial course data"
                ),
            },
            Err(e) => warn!(error = %e, "failed to update course data"),
        }
    }

    /// Refresh forever, pausing for the configured delay after every attempt, until `shutdown`
    /// is cancelled. An attempt in progress at cancellation is abandoned.
    pub fn spawn(self: Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = self.refresh_and_log() => {}
                }
                info!(
                    delay = %humantime::format_duration(self.options.delay),
                    "waiting for next course data update"
                );
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(self.options.delay) => {}
                }
            }
            info!("course refresh loop stopped");
        })
    }

    /// Start a single refresh in the background
    pub fn trigger(self: &Arc<Self>) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.refresh_and_log().await })
    }
}
