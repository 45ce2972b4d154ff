//! HTTP API service

use std::convert::Infallible;
use std::sync::Arc;

use hyper::header::{ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE, HeaderValue};
use hyper::{Body, Method, Request, Response, StatusCode};
use hyperschedule_catalog::cache::CacheFile;
use hyperschedule_catalog::{CatalogError, Course, CourseStore};
use hyperschedule_refresh::RefreshDriver;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::query::{QueryError, QuerySurface, parse_timestamp};

#[derive(Debug, Error)]
pub enum Error {
    #[error("no handler for this route")]
    NoHandler,

    #[error("debug routes are disabled in production")]
    DebugDisabled,

    #[error("course scraping is disabled")]
    ScrapeDisabled,

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("failed to read request body: {0}")]
    Body(#[from] hyper::Error),

    #[error("request body is not a list of courses: {0}")]
    InvalidCourses(#[source] serde_json::Error),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("failed to serialize response: {0}")]
    Serialize(#[source] serde_json::Error),
}

impl Error {
    fn status(&self) -> StatusCode {
        match self {
            Self::NoHandler => StatusCode::NOT_FOUND,
            Self::DebugDisabled => StatusCode::METHOD_NOT_ALLOWED,
            Self::ScrapeDisabled | Self::Query(QueryError::Unavailable) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::Query(QueryError::MalformedTimestamp(_))
            | Self::Body(_)
            | Self::InvalidCourses(_)
            | Self::Catalog(_) => StatusCode::BAD_REQUEST,
            Self::Query(QueryError::Inconsistent(_)) | Self::Serialize(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn into_response(self) -> Response<Body> {
        let mut response = Response::new(Body::from(self.to_string()));
        *response.status_mut() = self.status();
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
        response
    }
}

type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything a request handler may touch
#[derive(Debug)]
pub struct HttpApi {
    query: QuerySurface,
    production: bool,
    cache: Option<CacheFile>,
    refresher: Option<Arc<RefreshDriver>>,
}

impl HttpApi {
    pub fn new(store: Arc<CourseStore>) -> Self {
        Self {
            query: QuerySurface::new(store),
            production: false,
            cache: None,
            refresher: None,
        }
    }

    /// Disable the `/debug` routes
    pub fn with_production(mut self, production: bool) -> Self {
        self.production = production;
        self
    }

    /// Save the store after every debug mutation
    pub fn with_cache(mut self, cache: CacheFile) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Driver used by `PUT /debug/scrape`
    pub fn with_refresher(mut self, refresher: Arc<RefreshDriver>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    fn store(&self) -> &Arc<CourseStore> {
        self.query.store()
    }

    async fn save_cache(&self) {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.save_store(self.store()).await {
                error!(error = %e, "failed to write course data cache");
            }
        }
    }

    fn all_courses(&self) -> Result<Response<Body>> {
        json_response(&self.query.all_courses()?)
    }

    fn courses_since(&self, since: &str) -> Result<Response<Body>> {
        json_response(&self.query.courses_since(since)?)
    }

    fn malformed_courses(&self) -> Result<Response<Body>> {
        json_response(&self.query.malformed_courses()?)
    }

    fn course_data(&self) -> Result<Response<Body>> {
        json_response(&self.query.course_data())
    }

    async fn set_courses(
        &self,
        timestamp: Option<&str>,
        req: Request<Body>,
    ) -> Result<Response<Body>> {
        let timestamp = match timestamp {
            Some(raw) => parse_timestamp(raw)?,
            None => chrono::Utc::now().timestamp(),
        };
        let body = hyper::body::to_bytes(req.into_body()).await?;
        let courses: Vec<Course> = serde_json::from_slice(&body).map_err(Error::InvalidCourses)?;

        let summary = self.store().apply_refresh(timestamp, courses, vec![])?;
        info!(
            timestamp = summary.timestamp,
            courses = summary.courses,
            "replaced course data through debug route"
        );
        self.save_cache().await;
        Ok(no_content())
    }

    fn scrape(&self) -> Result<Response<Body>> {
        let refresher = self.refresher.as_ref().ok_or(Error::ScrapeDisabled)?;
        refresher.trigger();
        Ok(no_content())
    }

    async fn reset(&self) -> Result<Response<Body>> {
        self.store().reset();
        info!("reset course data through debug route");
        self.save_cache().await;
        Ok(no_content())
    }
}

fn json_response<T: Serialize>(value: &T) -> Result<Response<Body>> {
    let body = serde_json::to_vec(value).map_err(Error::Serialize)?;
    let mut response = Response::new(Body::from(body));
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(response)
}

fn no_content() -> Response<Body> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::NO_CONTENT;
    response
}

fn health() -> Result<Response<Body>> {
    Ok(Response::new(Body::from("OK")))
}

pub(crate) async fn route_request(
    http: Arc<HttpApi>,
    req: Request<Body>,
) -> Result<Response<Body>, Infallible> {
    let method = req.method().clone();
    let uri = req.uri().clone();

    let response = perform_routing(&http, req).await;

    let mut response = match response {
        Ok(response) => {
            debug!(%method, %uri, status = %response.status(), "successfully processed request");
            response
        }
        Err(error) => {
            if error.status().is_server_error() {
                error!(%error, %method, %uri, "error while handling request");
            } else {
                debug!(%error, %method, %uri, "error while handling request");
            }
            error.into_response()
        }
    };
    response
        .headers_mut()
        .insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    Ok(response)
}

async fn perform_routing(http: &HttpApi, req: Request<Body>) -> Result<Response<Body>> {
    let path = req.uri().path().to_string();
    let path = match path.strip_suffix('/') {
        Some(stripped) if !stripped.is_empty() => stripped,
        _ => path.as_str(),
    };
    let segments: Vec<&str> = path.split('/').skip(1).collect();

    let method = req.method().clone();
    match (&method, segments.as_slice()) {
        (&Method::GET, ["health"]) => health(),
        (&Method::GET, ["api", "v2", "all-courses"]) => http.all_courses(),
        (&Method::GET, ["api", "v2", "courses-since", since]) => http.courses_since(since),
        (&Method::GET, ["api", "v2", "malformed-courses"]) => http.malformed_courses(),
        (&Method::GET, ["experimental", "course-data"]) => http.course_data(),
        (&Method::PUT, ["debug", ..]) if http.production => Err(Error::DebugDisabled),
        (&Method::PUT, ["debug", "set-courses"]) => http.set_courses(None, req).await,
        (&Method::PUT, ["debug", "set-courses", timestamp]) => {
            http.set_courses(Some(timestamp), req).await
        }
        (&Method::PUT, ["debug", "scrape"]) => http.scrape(),
        (&Method::PUT, ["debug", "reset"]) => http.reset().await,
        _ => Err(Error::NoHandler),
    }
}
