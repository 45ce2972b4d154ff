//! CLI config for the course refresh loop.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

/// Default scraper invocation
pub const DEFAULT_SCRAPER_COMMAND: &str = "python -m hyperschedule.run_portal_scrape";

fn parse_secret(s: &str) -> Result<SecretString, std::convert::Infallible> {
    Ok(SecretString::new(s.to_string()))
}

/// CLI config for fetching course data
#[derive(Debug, Clone, clap::Parser)]
pub struct RefreshConfig {
    /// Do not fetch course data at all; the server only serves cached or debug-loaded data.
    #[clap(
        long = "no-scrape",
        env = "HYPERSCHEDULE_NO_SCRAPE",
        action = clap::ArgAction::SetTrue
    )]
    pub no_scrape: bool,

    /// Pause between the end of one fetch attempt and the start of the next.
    #[clap(
        long = "refresh-delay",
        env = "HYPERSCHEDULE_REFRESH_DELAY",
        default_value = "5s",
        value_parser = humantime::parse_duration
    )]
    pub refresh_delay: Duration,

    /// Upper bound on a single fetch. A fetch running longer is killed and counts as failed.
    #[clap(
        long = "fetch-timeout",
        env = "HYPERSCHEDULE_FETCH_TIMEOUT",
        default_value = "60s",
        value_parser = humantime::parse_duration
    )]
    pub fetch_timeout: Duration,

    /// Command line of the portal scraper. It must print `[courses, malformed]` as JSON.
    #[clap(
        long = "scraper-command",
        env = "HYPERSCHEDULE_SCRAPER_COMMAND",
        default_value = DEFAULT_SCRAPER_COMMAND,
        action
    )]
    pub scraper_command: String,

    /// Run the scraper's browser without a window (the default).
    #[clap(long = "headless", overrides_with = "no_headless", action = clap::ArgAction::SetTrue)]
    headless: bool,

    /// Run the scraper's browser with a visible window.
    #[clap(long = "no-headless", overrides_with = "headless", action = clap::ArgAction::SetTrue)]
    no_headless: bool,

    /// Kill browser processes left over from previous scrapes before starting.
    #[clap(
        long = "kill-stale-browser",
        alias = "kill-chrome",
        env = "HYPERSCHEDULE_KILL_STALE_BROWSER",
        action = clap::ArgAction::SetTrue
    )]
    pub kill_stale_browser: bool,

    /// Username for the course portal, passed to the scraper.
    #[clap(
        long = "portal-username",
        env = "HYPERSCHEDULE_PORTAL_USERNAME",
        value_parser = parse_secret,
        hide_env_values = true
    )]
    pub portal_username: Option<SecretString>,

    /// Password for the course portal, passed to the scraper.
    #[clap(
        long = "portal-password",
        env = "HYPERSCHEDULE_PORTAL_PASSWORD",
        value_parser = parse_secret,
        hide_env_values = true
    )]
    pub portal_password: Option<SecretString>,

    /// Dead man's snitch URL to ping after successful refreshes, at most every five minutes.
    #[clap(long = "snitch-url", env = "HYPERSCHEDULE_SNITCH_URL", action)]
    pub snitch_url: Option<Url>,
}

impl RefreshConfig {
    pub fn headless(&self) -> bool {
        !self.no_headless
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use secrecy::ExposeSecret;

    fn parse(args: &[&str]) -> RefreshConfig {
        RefreshConfig::parse_from(std::iter::once("prog").chain(args.iter().copied()))
    }

    #[test]
    fn defaults() {
        let config = parse(&[]);
        assert!(!config.no_scrape);
        assert!(config.headless());
        assert!(!config.kill_stale_browser);
        assert_eq!(config.refresh_delay, Duration::from_secs(5));
        assert_eq!(config.fetch_timeout, Duration::from_secs(60));
        assert_eq!(config.scraper_command, DEFAULT_SCRAPER_COMMAND);
        assert!(config.portal_username.is_none());
        assert!(config.snitch_url.is_none());
    }

    #[test]
    fn headless_last_flag_wins() {
        assert!(!parse(&["--no-headless"]).headless());
        assert!(parse(&["--no-headless", "--headless"]).headless());
        assert!(!parse(&["--headless", "--no-headless"]).headless());
    }

    #[test]
    fn parses_everything_else() {
        let config = parse(&[
            "--no-scrape",
            "--kill-chrome",
            "--refresh-delay",
            "1m",
            "--fetch-timeout",
            "90s",
            "--portal-username",
            "student",
            "--snitch-url",
            "https://nosnch.in/f08b6b7be5",
        ]);
        assert!(config.no_scrape);
        assert!(config.kill_stale_browser);
        assert_eq!(config.refresh_delay, Duration::from_secs(60));
        assert_eq!(config.fetch_timeout, Duration::from_secs(90));
        assert_eq!(
            config.portal_username.as_ref().map(|s| s.expose_secret().as_str()),
            Some("student")
        );
        assert_eq!(
            config.snitch_url.as_ref().map(Url::as_str),
            Some("https://nosnch.in/f08b6b7be5")
        );
    }

    #[test]
    fn invalid_snitch_url_is_rejected() {
        let result = RefreshConfig::try_parse_from(["prog", "--snitch-url", "not a url"]);
        assert!(result.is_err());
    }
}
