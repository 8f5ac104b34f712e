//! `hyper` adapter: resolves `http::Request<Bytes>` against a router.

use super::{PassThroughDispatcher, Transport};
use crate::error::{Error, MockedError, Result, TransportErrorKind};
use crate::request::{Request, RequestUrl};
use crate::response::MockResponse;
use crate::router::Router;
use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::CONTENT_LENGTH;
use hyper::http::HeaderValue;
use hyper::{StatusCode, Version};
use tracing::debug;

pub type HttpRequest = hyper::Request<Bytes>;
pub type HttpResponse = hyper::Response<Full<Bytes>>;

/// Error returned to the client by [`MockTransport`].
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// A simulated or dispatched transport failure, as the client would see it.
    #[error("{kind}: {message}")]
    Transport {
        kind: TransportErrorKind,
        message: String,
    },

    #[error(transparent)]
    Router(Error),
}

impl HttpError {
    pub fn kind(&self) -> Option<TransportErrorKind> {
        match self {
            HttpError::Transport { kind, .. } => Some(*kind),
            HttpError::Router(_) => None,
        }
    }
}

impl From<Error> for HttpError {
    fn from(error: Error) -> Self {
        match error {
            Error::Mocked {
                source: MockedError::Transport { kind, message },
                ..
            }
            | Error::Dispatch(MockedError::Transport { kind, message }) => {
                HttpError::Transport { kind, message }
            }
            other => HttpError::Router(other),
        }
    }
}

/// Dispatcher for transports that never reach the network.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPassThrough;

#[async_trait]
impl PassThroughDispatcher<HttpRequest, HttpResponse> for NoPassThrough {
    async fn dispatch(&self, request: HttpRequest) -> std::result::Result<HttpResponse, MockedError> {
        Err(MockedError::transport(
            TransportErrorKind::Connect,
            format!("pass-through disabled for {}", request.uri()),
        ))
    }
}

fn parse_version(version: &str) -> Result<Version> {
    match version.to_ascii_uppercase().as_str() {
        "HTTP/0.9" => Ok(Version::HTTP_09),
        "HTTP/1.0" => Ok(Version::HTTP_10),
        "HTTP/1.1" => Ok(Version::HTTP_11),
        "HTTP/2" | "HTTP/2.0" => Ok(Version::HTTP_2),
        "HTTP/3" | "HTTP/3.0" => Ok(Version::HTTP_3),
        _ => Err(Error::InvalidResponse(format!("unknown HTTP version '{version}'"))),
    }
}

/// Mock transport for `hyper` requests with buffered bodies.
///
/// Requests are resolved against the router; pass-through requests are sent
/// with the dispatcher.
#[derive(Debug, Clone)]
pub struct MockTransport<D = NoPassThrough> {
    router: Router,
    dispatcher: D,
}

impl MockTransport<NoPassThrough> {
    pub fn new(router: Router) -> Self {
        Self::with_dispatcher(router, NoPassThrough)
    }
}

impl<D> MockTransport<D>
where
    D: PassThroughDispatcher<HttpRequest, HttpResponse>,
{
    pub fn with_dispatcher(router: Router, dispatcher: D) -> Self {
        MockTransport { router, dispatcher }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub async fn send(&self, request: HttpRequest) -> std::result::Result<HttpResponse, HttpError> {
        let descriptor = self.to_request_descriptor(&request)?;
        match self.router.resolve_async(&descriptor).await {
            Ok(resolved) => Ok(self.from_mock_response(&resolved.response)?),
            Err(Error::PassThrough { route }) => {
                debug!("Dispatching {} for {}", descriptor, route);
                self.dispatcher
                    .dispatch(request)
                    .await
                    .map_err(|e| HttpError::from(Error::Dispatch(e)))
            }
            Err(error) => Err(error.into()),
        }
    }
}

impl<D> Transport for MockTransport<D> {
    type Request = HttpRequest;
    type Response = HttpResponse;

    fn to_request_descriptor(&self, request: &HttpRequest) -> Result<Request> {
        let url = RequestUrl::from_uri(request.uri())?;
        Ok(Request::from_parts(
            request.method().as_str(),
            url,
            request.headers().clone(),
            request.body().clone(),
        ))
    }

    fn from_mock_response(&self, response: &MockResponse) -> Result<HttpResponse> {
        let status = StatusCode::from_u16(response.status())
            .map_err(|e| Error::InvalidResponse(format!("{}: {e}", response.status())))?;

        let mut builder = hyper::Response::builder().status(status);
        if let Some(version) = response.version() {
            builder = builder.version(parse_version(version)?);
        }
        if let Some(headers) = builder.headers_mut() {
            headers.extend(response.headers().clone());
            if !headers.contains_key(CONTENT_LENGTH) {
                headers.insert(CONTENT_LENGTH, HeaderValue::from(response.body().len()));
            }
        }

        builder
            .body(Full::new(response.body().clone()))
            .map_err(|e| Error::InvalidResponse(e.to_string()))
    }
}
