//! The course catalog: course records, snapshot indexing, the incremental diff engine and the
//! versioned store that serves it.

pub mod cache;
pub mod course;
pub mod dedup;
pub mod diff;
pub mod index;
pub mod store;

use thiserror::Error;

pub use course::{Course, CourseAttr, CourseKey, PartialCourse};
pub use diff::{CourseDiff, Update};
pub use store::{CatalogSnapshot, CourseStore, CoursesSince, StoreError};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("duplicate course with suffix: {course_code:?}")]
    DuplicateWithSuffix { course_code: String },

    #[error("{count} courses share the code {course_code:?}, too many to tell apart by suffix")]
    SuffixesExhausted { course_code: String, count: usize },

    #[error("more than one course matching {course_code:?}")]
    DuplicateAfterDedup { course_code: String },

    #[error("course {course_code:?} has an identity attribute containing the key separator")]
    InvalidIdentity { course_code: String },

    #[error("persisted state has courses but no timestamps")]
    IncompleteState,
}

pub type Result<T, E = CatalogError> = std::result::Result<T, E>;
