//! Read operations over the course store, independent of any transport.

use std::sync::Arc;

use hyperschedule_catalog::diff::ConsistencyFault;
use hyperschedule_catalog::store::PersistedState;
use hyperschedule_catalog::{CourseStore, StoreError};
use hyperschedule_types::{AllCoursesResponse, CoursesSinceResponse, MalformedCoursesResponse};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("The course data is not yet available. Please wait")]
    Unavailable,

    #[error("Malformed timestamp {0:?}")]
    MalformedTimestamp(String),

    #[error("internal error: {0}")]
    Inconsistent(#[from] ConsistencyFault),
}

impl From<StoreError> for QueryError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Unavailable => Self::Unavailable,
            StoreError::Inconsistent(fault) => Self::Inconsistent(fault),
        }
    }
}

pub type Result<T, E = QueryError> = std::result::Result<T, E>;

/// Parse a client supplied timestamp in whole seconds since the epoch
pub fn parse_timestamp(raw: &str) -> Result<i64> {
    raw.parse()
        .map_err(|_| QueryError::MalformedTimestamp(raw.to_string()))
}

#[derive(Debug, Clone)]
pub struct QuerySurface {
    store: Arc<CourseStore>,
}

impl QuerySurface {
    pub fn new(store: Arc<CourseStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<CourseStore> {
        &self.store
    }

    pub fn all_courses(&self) -> Result<AllCoursesResponse> {
        let snapshot = self.store.snapshot()?;
        Ok(AllCoursesResponse::from(snapshot.as_ref()))
    }

    /// Changes since the timestamp in `since`, which is taken verbatim from the request
    pub fn courses_since(&self, since: &str) -> Result<CoursesSinceResponse> {
        let since = parse_timestamp(since)?;
        let answer = self.store.courses_since(since)?;
        Ok(CoursesSinceResponse::from(answer))
    }

    pub fn malformed_courses(&self) -> Result<MalformedCoursesResponse> {
        Ok(self.store.malformed_courses()?)
    }

    /// The entire store state, available even before the first refresh
    pub fn course_data(&self) -> PersistedState {
        self.store.persisted_state()
    }
}
