//! Acquiring course listings from the upstream portal.

use std::fmt::Debug;
use std::process::Stdio;

use async_trait::async_trait;
use hyperschedule_catalog::Course;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tokio::process::Command;
use tracing::debug;

use crate::FetchError;

/// Environment variables the scraper reads its portal credentials from
pub const USERNAME_ENV: &str = "HYPERSCHEDULE_PORTAL_USERNAME";
pub const PASSWORD_ENV: &str = "HYPERSCHEDULE_PORTAL_PASSWORD";

/// One complete listing as returned by the upstream
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchedCourses {
    pub courses: Vec<Course>,
    /// Names of the records the scraper could not parse
    pub malformed: Vec<String>,
}

/// The external source of course listings
///
/// A fetch may take a long time; callers bound it with their own timeout and drop the future
/// when it expires, so implementations must clean up on drop.
#[async_trait]
pub trait CourseFetcher: Debug + Send + Sync + 'static {
    async fn fetch(&self) -> Result<FetchedCourses, FetchError>;
}

/// Options passed through to the scraper process
#[derive(Debug, Clone)]
pub struct ScrapeOptions {
    pub headless: bool,
    pub kill_stale_browser: bool,
    pub username: Option<SecretString>,
    pub password: Option<SecretString>,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self {
            headless: true,
            kill_stale_browser: false,
            username: None,
            password: None,
        }
    }
}

/// Fetch courses by running a scraper subprocess
///
/// The scraper prints a JSON array `[courses, malformed]` on stdout and exits with status 0.
/// Its stderr is passed through to ours.
#[derive(Debug)]
pub struct ScraperCommand {
    program: String,
    args: Vec<String>,
    options: ScrapeOptions,
}

impl ScraperCommand {
    /// Create a fetcher from a whitespace-separated command line
    pub fn new(command_line: &str, options: ScrapeOptions) -> Result<Self, FetchError> {
        let mut words = command_line.split_whitespace().map(str::to_string);
        let program = words.next().ok_or(FetchError::EmptyCommand)?;
        Ok(Self {
            program,
            args: words.collect(),
            options,
        })
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(if self.options.headless {
                "--headless"
            } else {
                "--no-headless"
            })
            .arg(if self.options.kill_stale_browser {
                "--kill-chrome"
            } else {
                "--no-kill-chrome"
            })
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if let Some(username) = &self.options.username {
            command.env(USERNAME_ENV, username.expose_secret());
        }
        if let Some(password) = &self.options.password {
            command.env(PASSWORD_ENV, password.expose_secret());
        }
        command
    }
}

#[async_trait]
impl CourseFetcher for ScraperCommand {
    async fn fetch(&self) -> Result<FetchedCourses, FetchError> {
        debug!(program = %self.program, args = ?self.args, "running scraper");
        let output = self
            .command()
            .output()
            .await
            .map_err(|source| FetchError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        if !output.status.success() {
            return Err(FetchError::ExitStatus {
                status: output.status,
            });
        }
        parse_scraper_output(&output.stdout)
    }
}

/// Parse the `[courses, malformed]` document printed by the scraper
///
/// Malformed entries are kept as their text when they are strings and as compact JSON
/// otherwise.
pub fn parse_scraper_output(stdout: &[u8]) -> Result<FetchedCourses, FetchError> {
    let (courses, malformed): (Vec<Course>, Vec<Value>) = serde_json::from_slice(stdout)?;
    let malformed = malformed
        .into_iter()
        .map(|entry| match entry {
            Value::String(name) => name,
            other => other.to_string(),
        })
        .collect();
    Ok(FetchedCourses { courses, malformed })
}
