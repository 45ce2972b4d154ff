//! A typed client for the hyperschedule HTTP API.

use hyperschedule_catalog::Course;
use hyperschedule_catalog::store::PersistedState;
use hyperschedule_types::{AllCoursesResponse, CoursesSinceResponse, MalformedCoursesResponse};
use reqwest::{IntoUrl, Method, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

/// Primary error type for the [`Client`]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("base URL error: {0}")]
    BaseUrl(#[source] reqwest::Error),

    #[error("request URL error: {0}")]
    RequestUrl(#[from] url::ParseError),

    #[error("failed to parse JSON response: {0}")]
    Json(#[source] reqwest::Error),

    #[error("failed to parse plaintext response: {0}")]
    Text(#[source] reqwest::Error),

    #[error("server responded with error [{code}]: {message}")]
    ApiError { code: StatusCode, message: String },

    #[error("failed to send {method} {url} request: {source}")]
    RequestSend {
        method: Method,
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl Error {
    fn request_send(method: Method, url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::RequestSend {
            method,
            url: url.into(),
            source,
        }
    }

    /// The HTTP status the server answered with, if it answered with an error
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::ApiError { code, .. } => Some(*code),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Client for a running `hyperschedule` server
#[derive(Debug, Clone)]
pub struct Client {
    base_url: Url,
    http_client: reqwest::Client,
}

impl Client {
    pub fn new<U: IntoUrl>(base_url: U) -> Result<Self> {
        Ok(Self {
            base_url: base_url.into_url().map_err(Error::BaseUrl)?,
            http_client: reqwest::Client::new(),
        })
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        courses: Option<&[Course]>,
    ) -> Result<reqwest::Response> {
        let url = self.base_url.join(path)?;
        let mut req = self.http_client.request(method.clone(), url);
        if let Some(courses) = courses {
            req = req.json(courses);
        }
        let resp = req
            .send()
            .await
            .map_err(|src| Error::request_send(method, path, src))?;
        if resp.status().is_success() {
            Ok(resp)
        } else {
            Err(Error::ApiError {
                code: resp.status(),
                message: resp.text().await.map_err(Error::Text)?,
            })
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(Method::GET, path, None)
            .await?
            .json()
            .await
            .map_err(Error::Json)
    }

    /// `GET /api/v2/all-courses`
    pub async fn api_v2_all_courses(&self) -> Result<AllCoursesResponse> {
        self.get_json("/api/v2/all-courses").await
    }

    /// `GET /api/v2/courses-since/{since}`
    pub async fn api_v2_courses_since(&self, since: i64) -> Result<CoursesSinceResponse> {
        self.get_json(&format!("/api/v2/courses-since/{since}"))
            .await
    }

    /// `GET /api/v2/malformed-courses`
    pub async fn api_v2_malformed_courses(&self) -> Result<MalformedCoursesResponse> {
        self.get_json("/api/v2/malformed-courses").await
    }

    /// `GET /experimental/course-data`
    pub async fn experimental_course_data(&self) -> Result<PersistedState> {
        self.get_json("/experimental/course-data").await
    }

    /// `GET /health`
    pub async fn health(&self) -> Result<String> {
        self.send(Method::GET, "/health", None)
            .await?
            .text()
            .await
            .map_err(Error::Text)
    }

    /// `PUT /debug/set-courses[/{timestamp}]`; the server uses the current time when
    /// `timestamp` is `None`
    pub async fn debug_set_courses(
        &self,
        courses: &[Course],
        timestamp: Option<i64>,
    ) -> Result<()> {
        let path = match timestamp {
            Some(t) => format!("/debug/set-courses/{t}"),
            None => "/debug/set-courses".to_string(),
        };
        self.send(Method::PUT, &path, Some(courses)).await?;
        Ok(())
    }

    /// `PUT /debug/scrape`
    pub async fn debug_scrape(&self) -> Result<()> {
        self.send(Method::PUT, "/debug/scrape", None).await?;
        Ok(())
    }

    /// `PUT /debug/reset`
    pub async fn debug_reset(&self) -> Result<()> {
        self.send(Method::PUT, "/debug/reset", None).await?;
        Ok(())
    }
}
