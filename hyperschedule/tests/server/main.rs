//! End-to-end tests against a running `hyperschedule serve` process

use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use assert_cmd::cargo::CommandCargoExt;
use hyperschedule_catalog::Course;
use hyperschedule_client::Client;
use serde_json::json;

mod api;
mod cache;
mod debug;

/// Configuration for a [`TestServer`]
#[derive(Debug, Default)]
pub struct TestConfig {
    production: bool,
    cache_dir: Option<String>,
}

impl TestConfig {
    /// Run the server in production mode
    pub fn with_production(mut self) -> Self {
        self.production = true;
        self
    }

    /// Read and write the course data cache in `dir`
    pub fn with_cache_dir(mut self, dir: &Path) -> Self {
        self.cache_dir = Some(dir.display().to_string());
        self
    }

    fn as_args(&self) -> Vec<String> {
        let mut args = vec![];
        if self.production {
            args.push("--production".to_string());
        }
        match &self.cache_dir {
            Some(dir) => args.extend(["--cache".to_string(), "--cache-dir".to_string(), dir.clone()]),
            None => args.push("--no-cache".to_string()),
        }
        args
    }

    pub async fn spawn(&self) -> TestServer {
        TestServer::spawn_inner(self).await
    }
}

/// A running instance of the `hyperschedule serve` process
///
/// Set the TEST_LOG environment variable to see the server's log output, e.g.,
/// ```text
/// TEST_LOG= cargo nextest run -p hyperschedule --nocapture
/// ```
#[derive(Debug)]
pub struct TestServer {
    bind_addr: String,
    server_process: Child,
    client: Client,
}

impl TestServer {
    /// Spawn a [`TestServer`] with the default configuration
    pub async fn spawn() -> Self {
        Self::spawn_inner(&TestConfig::default()).await
    }

    pub fn configure() -> TestConfig {
        TestConfig::default()
    }

    async fn spawn_inner(config: &TestConfig) -> Self {
        let mut command =
            Command::cargo_bin("hyperschedule").expect("create the hyperschedule command");
        let command = command
            .arg("serve")
            // bind to port 0 to get a random port assigned:
            .args(["--http-bind", "127.0.0.1:0"])
            .arg("--no-scrape")
            .args(config.as_args())
            .env_remove("PORT")
            .env("LOG_FILTER", "info")
            .stdout(Stdio::piped());

        let emit_logs = std::env::var("TEST_LOG").is_ok();

        let mut server_process = command
            .spawn()
            .expect("spawn the hyperschedule server process");

        // pipe stdout so we can get the randomly assigned port from the log output:
        let process_stdout = server_process
            .stdout
            .take()
            .expect("should acquire stdout from process");

        let mut lines = BufReader::new(process_stdout).lines();
        let bind_addr = loop {
            let Some(Ok(line)) = lines.next() else {
                panic!("stdout closed unexpectedly");
            };
            if emit_logs {
                println!("{line}");
            }
            if line.contains("listening for HTTP requests") {
                if let Some(address) = line.split("address=").last() {
                    break address.trim().to_string();
                }
            }
        };

        tokio::task::spawn_blocking(move || {
            for line in lines {
                let line = line.expect("io error while getting line from stdout");
                if emit_logs {
                    println!("{line}");
                }
            }
        });

        let client =
            Client::new(format!("http://{bind_addr}")).expect("create the hyperschedule client");
        let server = Self {
            bind_addr,
            server_process,
            client,
        };
        server.wait_until_ready().await;
        server
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn client_addr(&self) -> String {
        format!("http://{}", self.bind_addr)
    }

    pub fn kill(&mut self) {
        self.server_process.kill().expect("kill the server process");
    }

    /// Ask the server to stop and wait for it to exit
    #[cfg(unix)]
    pub fn terminate(&mut self) -> std::process::ExitStatus {
        let status = Command::new("kill")
            .args(["-TERM", &self.server_process.id().to_string()])
            .status()
            .expect("send SIGTERM");
        assert!(status.success());
        self.server_process.wait().expect("wait for the server to exit")
    }

    async fn wait_until_ready(&self) {
        let mut count = 0;
        while self.client.health().await.is_err() {
            if count > 500 {
                panic!("server failed to start");
            }
            count += 1;
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        // the process may already have exited after `terminate`
        let _ = self.server_process.kill();
    }
}

pub fn course(department: &str, number: u32, section: u32, open_seats: u32) -> Course {
    serde_json::from_value(json!({
        "department": department,
        "courseNumber": number,
        "school": "HM",
        "section": section,
        "courseName": format!("{department} {number}"),
        "courseStatus": "open",
        "faculty": ["Staff"],
        "openSeats": open_seats,
        "totalSeats": 30,
        "quarterCredits": 12,
        "schedule": [],
        "firstHalfSemester": true,
        "secondHalfSemester": true,
        "startDate": "2026-09-01",
        "endDate": "2026-12-15",
    }))
    .expect("valid course")
}
