//! Entrypoint for the hyperschedule server

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use anyhow::Context;
use hyper::server::conn::AddrIncoming;
use hyperschedule_catalog::CourseStore;
use hyperschedule_catalog::cache::CacheFile;
use hyperschedule_clap_blocks::cache::CacheConfig;
use hyperschedule_clap_blocks::logging::LoggingConfig;
use hyperschedule_clap_blocks::refresh::RefreshConfig;
use hyperschedule_refresh::{RefreshDriver, RefreshOptions, ScrapeOptions, ScraperCommand, Snitch};
use hyperschedule_server::{HttpApi, serve};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// The default port for the HTTP API, on all interfaces.
pub(crate) const DEFAULT_HTTP_PORT: u16 = 3000;

#[derive(Debug, clap::Parser)]
pub(crate) struct Config {
    /// logging options
    #[clap(flatten)]
    pub(crate) logging_config: LoggingConfig,

    /// course refresh options
    #[clap(flatten)]
    pub(crate) refresh_config: RefreshConfig,

    /// course data cache options
    #[clap(flatten)]
    pub(crate) cache_config: CacheConfig,

    /// The address on which hyperschedule will serve HTTP API requests.
    ///
    /// Defaults to all interfaces on `PORT` when that is set, otherwise to 0.0.0.0:3000.
    #[clap(long = "http-bind", env = "HYPERSCHEDULE_HTTP_BIND_ADDR", action)]
    pub(crate) http_bind_address: Option<SocketAddr>,

    /// Port to listen on all interfaces; ignored when `--http-bind` is given.
    #[clap(long = "port", env = "PORT", action)]
    pub(crate) port: Option<u16>,

    /// Production mode: disables the debug routes and, unless `--cache` is given, the cache.
    #[clap(
        long = "production",
        env = "HYPERSCHEDULE_PRODUCTION",
        action = clap::ArgAction::SetTrue
    )]
    pub(crate) production: bool,
}

impl Config {
    fn bind_address(&self) -> SocketAddr {
        match (self.http_bind_address, self.port) {
            (Some(addr), _) => addr,
            (None, port) => {
                SocketAddr::from((Ipv4Addr::UNSPECIFIED, port.unwrap_or(DEFAULT_HTTP_PORT)))
            }
        }
    }

    fn cache(&self) -> Option<CacheFile> {
        self.cache_config
            .enabled(self.production)
            .then(|| CacheFile::new(&self.cache_config.cache_dir))
    }
}

pub(crate) async fn command(config: Config) -> anyhow::Result<()> {
    let bind_address = config.bind_address();
    let cache = config.cache();
    info!(
        production = config.production,
        cache = ?cache.as_ref().map(|c| c.path()),
        scrape = !config.refresh_config.no_scrape,
        "hyperschedule server starting"
    );

    let store = Arc::new(load_store(cache.as_ref()).await);
    let shutdown = CancellationToken::new();

    let mut http = HttpApi::new(Arc::clone(&store)).with_production(config.production);
    if let Some(cache) = &cache {
        http = http.with_cache(cache.clone());
    }

    let refresh_task = if config.refresh_config.no_scrape {
        None
    } else {
        let driver = Arc::new(refresh_driver(
            Arc::clone(&store),
            config.refresh_config,
            cache,
        )?);
        http = http.with_refresher(Arc::clone(&driver));
        Some(driver.spawn(shutdown.clone()))
    };

    let incoming = AddrIncoming::bind(&bind_address)
        .with_context(|| format!("failed to bind address {bind_address}"))?;
    info!(address = %incoming.local_addr(), "listening for HTTP requests");

    let signal_task = shutdown_on_signal(shutdown.clone())
        .context("failed to register signal handler")?;

    let served = serve(incoming, Arc::new(http), shutdown.clone()).await;
    shutdown.cancel();
    if let Some(task) = refresh_task {
        if let Err(e) = task.await {
            error!(error = %e, "course refresh task failed");
        }
    }
    signal_task.abort();
    served.context("HTTP server failed")?;

    info!("hyperschedule server stopped");
    Ok(())
}

/// Restore the store from `cache`; any problem with the cache leaves the store empty
async fn load_store(cache: Option<&CacheFile>) -> CourseStore {
    let Some(cache) = cache else {
        return CourseStore::new();
    };
    let path = cache.path();
    match cache.load().await {
        Ok(Some(state)) => match CourseStore::from_persisted(state) {
            Ok(store) => {
                info!(
                    path = %path.display(),
                    timestamp = ?store.snapshot().ok().map(|s| s.timestamp()),
                    "restored course data from cache"
                );
                store
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring unusable course data cache");
                CourseStore::new()
            }
        },
        Ok(None) => {
            info!(path = %path.display(), "no course data cache found");
            CourseStore::new()
        }
        Err(e) => {
            warn!(error = %e, "failed to read course data cache");
            CourseStore::new()
        }
    }
}

fn refresh_driver(
    store: Arc<CourseStore>,
    config: RefreshConfig,
    cache: Option<CacheFile>,
) -> anyhow::Result<RefreshDriver> {
    let scrape_options = ScrapeOptions {
        headless: config.headless(),
        kill_stale_browser: config.kill_stale_browser,
        username: config.portal_username,
        password: config.portal_password,
    };
    let fetcher = ScraperCommand::new(&config.scraper_command, scrape_options)
        .context("invalid scraper command")?;
    let options = RefreshOptions {
        delay: config.refresh_delay,
        fetch_timeout: config.fetch_timeout,
    };

    let mut driver = RefreshDriver::new(store, Arc::new(fetcher), options);
    if let Some(cache) = cache {
        driver = driver.with_cache(cache);
    }
    if let Some(url) = config.snitch_url {
        info!(url = %url, "dead man's snitch enabled");
        driver = driver.with_snitch(Snitch::new(url));
    }
    Ok(driver)
}

/// Cancel `token` on `SIGTERM` or `SIGINT`
#[cfg(unix)]
fn shutdown_on_signal(token: CancellationToken) -> std::io::Result<JoinHandle<()>> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut term = signal(SignalKind::terminate())?;
    let mut int = signal(SignalKind::interrupt())?;

    Ok(tokio::spawn(async move {
        tokio::select! {
            _ = term.recv() => info!("Received SIGTERM"),
            _ = int.recv() => info!("Received SIGINT"),
        }
        token.cancel();
    }))
}

/// Cancel `token` on `ctrl+c`
#[cfg(windows)]
fn shutdown_on_signal(token: CancellationToken) -> std::io::Result<JoinHandle<()>> {
    Ok(tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received SIGINT");
            token.cancel();
        }
    }))
}
