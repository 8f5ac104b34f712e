//! Transport adapter boundary.
//!
//! An adapter sits between an HTTP client and the [`Router`](crate::Router): it
//! describes each outgoing request as a [`Request`], lets the router resolve it,
//! and turns the resulting [`MockResponse`] back into the client's native response.
//! Requests the router passes through are handed to a [`PassThroughDispatcher`].

mod http;

pub use self::http::{HttpError, HttpRequest, HttpResponse, MockTransport, NoPassThrough};

use crate::error::{MockedError, Result};
use crate::request::Request;
use crate::response::MockResponse;
use async_trait::async_trait;

/// Conversion between a client's native types and the router's descriptors.
pub trait Transport {
    type Request;
    type Response;

    fn to_request_descriptor(&self, request: &Self::Request) -> Result<Request>;

    fn from_mock_response(&self, response: &MockResponse) -> Result<Self::Response>;
}

/// Performs the real call for a request the router passed through.
#[async_trait]
pub trait PassThroughDispatcher<Req, Resp>: Send + Sync
where
    Req: Send + 'static,
{
    async fn dispatch(&self, request: Req) -> std::result::Result<Resp, MockedError>;
}
