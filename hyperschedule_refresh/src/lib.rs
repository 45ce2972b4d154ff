//! Keeping the course store up to date.
//!
//! A [`RefreshDriver`] repeatedly asks a [`CourseFetcher`] for a fresh course listing, commits it
//! to the [`CourseStore`][hyperschedule_catalog::CourseStore], writes the cache file and pings
//! the dead-man's switch. Failures of any single attempt are logged and retried after the
//! configured delay, forever.

pub mod driver;
pub mod fetcher;
pub mod snitch;

use std::process::ExitStatus;
use std::time::Duration;

use hyperschedule_catalog::CatalogError;
use thiserror::Error;

pub use driver::{RefreshDriver, RefreshOptions};
pub use fetcher::{CourseFetcher, FetchedCourses, ScrapeOptions, ScraperCommand};
pub use snitch::Snitch;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("scraper command is empty")]
    EmptyCommand,

    #[error("failed to run scraper {program:?}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("error in portal scraper: {status}")]
    ExitStatus { status: ExitStatus },

    #[error("scraper output is not valid course data: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("timed out after {}s", .0.as_secs_f64())]
    TimedOut(Duration),
}

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

pub type Result<T, E = RefreshError> = std::result::Result<T, E>;
