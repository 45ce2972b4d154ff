//! Config for the tokio runtime.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Tokio runtime type.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum TokioRuntimeType {
    /// Current-thread runtime.
    CurrentThread,

    /// Multi-thread runtime.
    #[default]
    MultiThread,
}

/// CLI config for the tokio IO runtime.
#[derive(Debug, Clone, clap::Parser)]
#[allow(missing_copy_implementations)]
pub struct TokioIoConfig {
    /// Set the maximum number of IO runtime threads to use.
    ///
    /// Defaults to the number of logical cores on the system.
    #[clap(long = "num-io-threads", env = "HYPERSCHEDULE_NUM_IO_THREADS", action)]
    pub num_threads: Option<NonZeroUsize>,

    /// IO tokio runtime type.
    #[clap(
        long = "io-runtime-type",
        env = "HYPERSCHEDULE_IO_RUNTIME_TYPE",
        default_value_t = TokioRuntimeType::default(),
        value_enum,
        action
    )]
    pub runtime_type: TokioRuntimeType,

    /// Specifies the limit for additional threads spawned by the IO runtime.
    #[clap(
        long = "io-runtime-max-blocking-threads",
        env = "HYPERSCHEDULE_IO_RUNTIME_MAX_BLOCKING_THREADS",
        action
    )]
    pub max_blocking_threads: Option<NonZeroUsize>,

    /// Sets a custom timeout for a thread in the blocking pool of the IO runtime.
    #[clap(
        long = "io-runtime-thread-keep-alive",
        env = "HYPERSCHEDULE_IO_RUNTIME_THREAD_KEEP_ALIVE",
        value_parser = humantime::parse_duration
    )]
    pub thread_keep_alive: Option<Duration>,
}

impl TokioIoConfig {
    /// Creates the tokio runtime builder.
    pub fn builder(&self) -> Result<tokio::runtime::Builder, std::io::Error> {
        // No log macros here: the subscriber is installed on the runtime this builds.
        let mut builder = match self.runtime_type {
            TokioRuntimeType::CurrentThread => tokio::runtime::Builder::new_current_thread(),
            TokioRuntimeType::MultiThread => tokio::runtime::Builder::new_multi_thread(),
        };
        builder.enable_time();
        builder.enable_io();

        let thread_counter = Arc::new(AtomicUsize::new(1));
        builder.thread_name_fn(move || {
            format!(
                "hyperschedule IO {}",
                thread_counter.fetch_add(1, Ordering::SeqCst)
            )
        });

        let num_threads = match self.num_threads {
            None => std::thread::available_parallelism()?,
            Some(n) => n,
        };
        builder.worker_threads(num_threads.get());

        if let Some(x) = self.max_blocking_threads {
            builder.max_blocking_threads(x.get());
        }
        if let Some(x) = self.thread_keep_alive {
            builder.thread_keep_alive(x);
        }

        Ok(builder)
    }
}
