//! CLI config for the on-disk course data cache.

use std::path::PathBuf;

/// CLI config for the course data cache
#[derive(Debug, Clone, clap::Parser)]
pub struct CacheConfig {
    /// Load course data from the cache at startup and write it back after every change.
    ///
    /// Defaults to on, except in production.
    #[clap(long = "cache", overrides_with = "no_cache", action = clap::ArgAction::SetTrue)]
    cache: bool,

    /// Never read or write the course data cache.
    #[clap(long = "no-cache", overrides_with = "cache", action = clap::ArgAction::SetTrue)]
    no_cache: bool,

    /// Directory holding `course-data.json` and `course-data-pretty.json`.
    #[clap(
        long = "cache-dir",
        env = "HYPERSCHEDULE_CACHE_DIR",
        default_value = "out",
        action
    )]
    pub cache_dir: PathBuf,
}

impl CacheConfig {
    /// Whether the cache is in use, given whether the server runs in production
    pub fn enabled(&self, production: bool) -> bool {
        if self.cache {
            true
        } else if self.no_cache {
            false
        } else {
            !production
        }
    }
}
