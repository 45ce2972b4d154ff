//! The versioned course store.
//!
//! [`CourseStore`] holds the current catalog snapshot together with a bounded history of the
//! updates that led to it. All state sits behind one mutex; every critical section is in-memory
//! work only.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::course::Course;
use crate::diff::{ConsistencyFault, CourseDiff, Update, compute_update, replay};
use crate::index::CourseIndex;
use crate::{CatalogError, Result};

/// Number of per-refresh updates retained for incremental queries
pub const MAX_UPDATES_SAVED: usize = 100;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("the course data is not yet available")]
    Unavailable,

    #[error("update history is inconsistent: {0}")]
    Inconsistent(#[from] ConsistencyFault),
}

/// One fully indexed catalog state
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogSnapshot {
    index: CourseIndex,
    timestamp: i64,
    malformed: Vec<String>,
}

impl CatalogSnapshot {
    pub fn courses(&self) -> &[Course] {
        self.index.courses()
    }

    pub fn index(&self) -> &CourseIndex {
        &self.index
    }

    /// When this snapshot was fetched, in seconds since the epoch
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Names of the records that were rejected before indexing
    pub fn malformed(&self) -> &[String] {
        &self.malformed
    }

    pub fn malformed_count(&self) -> usize {
        self.malformed.len()
    }
}

/// Answer to [`CourseStore::courses_since`]
#[derive(Debug, Clone, PartialEq)]
pub enum CoursesSince {
    /// Changes since the requested timestamp
    Incremental {
        diff: CourseDiff,
        timestamp: i64,
        malformed_count: usize,
    },
    /// The requested timestamp predates the retained history; the client has to resync
    Full(Arc<CatalogSnapshot>),
}

/// What a successful refresh changed, for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshSummary {
    pub timestamp: i64,
    pub courses: usize,
    pub malformed: usize,
    /// `None` for the refresh that initialized the store
    pub changes: Option<ChangeCounts>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeCounts {
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
}

impl From<&Update> for ChangeCounts {
    fn from(update: &Update) -> Self {
        Self {
            added: update.added.len(),
            removed: update.removed.len(),
            modified: update.modified.len(),
        }
    }
}

/// The store state once at least one refresh has succeeded
#[derive(Debug)]
struct Versioned {
    snapshot: Arc<CatalogSnapshot>,
    initial_timestamp: i64,
    /// Oldest timestamp a client may hold and still be answered incrementally. Starts out as
    /// the initial timestamp and moves forward as old updates are dropped from the history.
    window_start: i64,
    updates: VecDeque<(i64, Update)>,
}

impl Versioned {
    fn initial(snapshot: CatalogSnapshot) -> Self {
        let timestamp = snapshot.timestamp;
        Self {
            snapshot: Arc::new(snapshot),
            initial_timestamp: timestamp,
            window_start: timestamp,
            updates: VecDeque::new(),
        }
    }

    fn advance(&mut self, snapshot: CatalogSnapshot) -> ChangeCounts {
        if snapshot.timestamp < self.snapshot.timestamp {
            warn!(
                previous = self.snapshot.timestamp,
                timestamp = snapshot.timestamp,
                "refresh timestamp went backwards"
            );
        }
        let update = compute_update(&self.snapshot.index, &snapshot.index);
        let counts = ChangeCounts::from(&update);
        self.updates.push_back((snapshot.timestamp, update));
        self.truncate();
        self.snapshot = Arc::new(snapshot);
        counts
    }

    fn truncate(&mut self) {
        while self.updates.len() > MAX_UPDATES_SAVED {
            if let Some((dropped, _)) = self.updates.pop_front() {
                self.window_start = dropped;
            }
        }
    }

    fn courses_since(&self, since: i64) -> Result<CoursesSince, StoreError> {
        if since < self.window_start {
            return Ok(CoursesSince::Full(Arc::clone(&self.snapshot)));
        }
        let update = replay(&self.updates, since)?;
        let diff = update.materialize(&self.snapshot.index)?;
        Ok(CoursesSince::Incremental {
            diff,
            timestamp: self.snapshot.timestamp,
            malformed_count: self.snapshot.malformed_count(),
        })
    }
}

/// The versioned course store
///
/// Shared between the refresh driver, which is the only writer, and any number of request
/// handlers. Readers only ever observe snapshots committed by a completed
/// [`apply_refresh`][CourseStore::apply_refresh].
#[derive(Debug, Default)]
pub struct CourseStore {
    inner: Mutex<Option<Versioned>>,
}

impl CourseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deduplicate, index and commit a freshly fetched course list.
    ///
    /// On error the store is left exactly as it was.
    pub fn apply_refresh(
        &self,
        timestamp: i64,
        courses: Vec<Course>,
        malformed: Vec<String>,
    ) -> Result<RefreshSummary> {
        let index = CourseIndex::build(courses)?;
        let snapshot = CatalogSnapshot {
            index,
            timestamp,
            malformed,
        };
        let courses = snapshot.index.len();
        let malformed = snapshot.malformed_count();

        let mut inner = self.inner.lock();
        let changes = match inner.as_mut() {
            Some(versioned) => Some(versioned.advance(snapshot)),
            None => {
                *inner = Some(Versioned::initial(snapshot));
                None
            }
        };
        debug!(timestamp, courses, ?changes, "committed course snapshot");

        Ok(RefreshSummary {
            timestamp,
            courses,
            malformed,
            changes,
        })
    }

    /// The current snapshot
    pub fn snapshot(&self) -> Result<Arc<CatalogSnapshot>, StoreError> {
        self.inner
            .lock()
            .as_ref()
            .map(|versioned| Arc::clone(&versioned.snapshot))
            .ok_or(StoreError::Unavailable)
    }

    /// Everything that changed after `since`, or the full snapshot if `since` is older than the
    /// retained history.
    pub fn courses_since(&self, since: i64) -> Result<CoursesSince, StoreError> {
        self.inner
            .lock()
            .as_ref()
            .ok_or(StoreError::Unavailable)?
            .courses_since(since)
    }

    pub fn malformed_courses(&self) -> Result<Vec<String>, StoreError> {
        self.snapshot().map(|snapshot| snapshot.malformed.clone())
    }

    /// Timestamp of the first refresh recorded by this store
    pub fn initial_timestamp(&self) -> Option<i64> {
        self.inner
            .lock()
            .as_ref()
            .map(|versioned| versioned.initial_timestamp)
    }

    /// Return the store to its uninitialized state
    pub fn reset(&self) {
        *self.inner.lock() = None;
    }

    /// A copy of the entire store state, e.g. for writing to the cache file
    pub fn persisted_state(&self) -> PersistedState {
        let inner = self.inner.lock();
        let Some(versioned) = inner.as_ref() else {
            return PersistedState::default();
        };
        PersistedState {
            current: Some(versioned.snapshot.courses().to_vec()),
            initial_timestamp: Some(versioned.initial_timestamp),
            window_start: Some(versioned.window_start),
            timestamp: Some(versioned.snapshot.timestamp),
            updates: versioned.updates.iter().cloned().collect(),
            malformed: versioned.snapshot.malformed.clone(),
        }
    }

    /// Rebuild a store from state previously produced by [`persisted_state`][Self::persisted_state]
    pub fn from_persisted(state: PersistedState) -> Result<Self> {
        let Some(courses) = state.current else {
            return Ok(Self::default());
        };
        let (Some(timestamp), Some(initial_timestamp)) = (state.timestamp, state.initial_timestamp)
        else {
            return Err(CatalogError::IncompleteState);
        };
        let snapshot = CatalogSnapshot {
            index: CourseIndex::build(courses)?,
            timestamp,
            malformed: state.malformed,
        };
        // Without a recorded cutoff, a full history may already have lost older updates; only
        // the retained ones can be trusted then.
        let window_start = match (state.window_start, state.updates.first()) {
            (Some(window_start), _) => window_start,
            (None, Some((oldest, _))) if state.updates.len() >= MAX_UPDATES_SAVED => *oldest,
            (None, _) => initial_timestamp,
        };
        let mut versioned = Versioned {
            snapshot: Arc::new(snapshot),
            initial_timestamp,
            window_start,
            updates: state.updates.into(),
        };
        versioned.truncate();
        Ok(Self {
            inner: Mutex::new(Some(versioned)),
        })
    }
}

/// Serializable form of the whole store state
///
/// The field names follow the on-disk cache format so that an existing cache file keeps
/// loading.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    pub current: Option<Vec<Course>>,
    pub initial_timestamp: Option<i64>,
    #[serde(default)]
    pub window_start: Option<i64>,
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub updates: Vec<(i64, Update)>,
    #[serde(default)]
    pub malformed: Vec<String>,
}
