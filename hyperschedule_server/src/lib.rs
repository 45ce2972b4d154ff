//! The read-only course API and its HTTP transport.

pub mod http;
pub mod query;

use std::convert::Infallible;
use std::sync::Arc;

use hyper::server::conn::{AddrIncoming, AddrStream};
use tokio_util::sync::CancellationToken;

pub use http::HttpApi;
pub use query::{QueryError, QuerySurface};

/// Serve `http` on `addr` until `shutdown` is cancelled, then drain in-flight requests
pub async fn serve(
    addr: AddrIncoming,
    http: Arc<HttpApi>,
    shutdown: CancellationToken,
) -> Result<(), hyper::Error> {
    hyper::Server::builder(addr)
        .serve(hyper::service::make_service_fn(|_conn: &AddrStream| {
            let http = Arc::clone(&http);
            let service = hyper::service::service_fn(move |request| {
                http::route_request(Arc::clone(&http), request)
            });
            futures::future::ready(Ok::<_, Infallible>(service))
        }))
        .with_graceful_shutdown(shutdown.cancelled())
        .await
}
