//! Request resolution: first matching route wins, every completed resolution is recorded.

use super::Router;
use crate::error::{Error, Result};
use crate::pattern::Context;
use crate::request::Request;
use crate::response::MockResponse;
use crate::route::{Route, RouteOutcome};
use tracing::{debug, info, warn};

/// A mocked response and the route that produced it.
#[derive(Debug, Clone)]
pub struct Resolved {
    /// `None` when no route matched and a default response was synthesized.
    pub route: Option<Route>,
    pub response: MockResponse,
    /// Named captures of the matching pattern.
    pub context: Context,
}

impl Router {
    /// Resolve a request against the registered routes.
    ///
    /// Pass-through and raised errors are returned as [`Error::PassThrough`] and
    /// [`Error::Mocked`] after the call is recorded. Routes with an async side
    /// effect fail with [`Error::AsyncSideEffect`]; use [`Router::resolve_async`].
    pub fn resolve(&self, request: &Request) -> Result<Resolved> {
        for route in self.routes_snapshot() {
            let Some((prepared, context)) = route.prepare(request) else {
                continue;
            };
            if let Some(outcome) = route.run(prepared, request, &context)? {
                return self.complete(request, route, outcome, context);
            }
        }
        self.unmatched(request)
    }

    /// Resolve a request, awaiting async side effects.
    ///
    /// Nothing is recorded if the returned future is dropped before completion.
    pub async fn resolve_async(&self, request: &Request) -> Result<Resolved> {
        for route in self.routes_snapshot() {
            let Some((prepared, context)) = route.prepare(request) else {
                continue;
            };
            if let Some(outcome) = route.run_async(prepared, request, &context).await {
                return self.complete(request, route, outcome, context);
            }
        }
        self.unmatched(request)
    }

    fn complete(
        &self,
        request: &Request,
        route: Route,
        outcome: RouteOutcome,
        context: Context,
    ) -> Result<Resolved> {
        match outcome {
            RouteOutcome::Respond(response) => {
                debug!("{} matched {} -> {}", request, route, response);
                self.shadow(&route);
                self.record(request, Some(response.clone()), Some(&route));
                Ok(Resolved {
                    route: Some(route),
                    response,
                    context,
                })
            }
            RouteOutcome::PassThrough => {
                info!("{} passed through by {}", request, route);
                self.shadow(&route);
                self.record(request, None, Some(&route));
                Err(Error::PassThrough { route })
            }
            RouteOutcome::Raise(source) => {
                debug!("{} matched {} which raised: {}", request, route, source);
                self.shadow(&route);
                self.record(request, None, Some(&route));
                Err(Error::Mocked { route, source })
            }
            RouteOutcome::Exhausted => {
                warn!("{} matched {} but its side effects are exhausted", request, route);
                Err(Error::SideEffectExhausted { route })
            }
        }
    }

    fn unmatched(&self, request: &Request) -> Result<Resolved> {
        if self.config().assert_all_mocked {
            warn!("{} not mocked", request);
            return Err(Error::Unmocked {
                method: request.method().to_string(),
                url: request.url().to_string(),
            });
        }

        let response = MockResponse::default();
        debug!("{} not mocked, auto-responding {}", request, response);
        self.record(request, Some(response.clone()), None);
        Ok(Resolved {
            route: None,
            response,
            context: Context::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouterConfig;
    use crate::error::{MockedError, TransportErrorKind};
    use crate::m;
    use crate::pattern::Pattern;
    use crate::route::Outcome;
    use tracing_test::traced_test;

    fn get(url: &str) -> Request {
        Request::get(url).unwrap()
    }

    fn lenient() -> Router {
        Router::with_config(RouterConfig {
            assert_all_mocked: false,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_first_match_wins() {
        let router = Router::new();
        let first = router.route(m!(host = "foo.bar").unwrap()).respond(201);
        let second = router.route(m!(method = "GET").unwrap()).respond(202);

        let resolved = router.resolve(&get("https://foo.bar/")).unwrap();
        assert_eq!(resolved.response.status(), 201);
        assert_eq!(resolved.route, Some(first.clone()));
        assert_eq!(first.call_count(), 1);
        assert!(!second.called());

        let resolved = router.resolve(&get("https://ham.spam/")).unwrap();
        assert_eq!(resolved.response.status(), 202);
        assert_eq!(router.calls().call_count(), 2);
    }

    #[test]
    fn test_context_captured() {
        let router = Router::new();
        router.route(m!(path__regex = r"^/(?P<slug>\w+)/$").unwrap());

        let resolved = router.resolve(&get("https://foo.bar/baz/")).unwrap();
        assert_eq!(resolved.context.get("slug").map(String::as_str), Some("baz"));
        assert_eq!(resolved.response.status(), 200);
    }

    #[test]
    #[traced_test]
    fn test_unmocked_request_rejected() {
        let router = Router::new();
        router.get("https://foo.bar/").unwrap();

        let err = router.resolve(&get("https://ham.spam/")).unwrap_err();
        assert!(matches!(err, Error::Unmocked { ref url, .. } if url == "https://ham.spam/"));
        assert!(!router.calls().called());
        assert!(logs_contain("not mocked"));
    }

    #[test]
    fn test_unmocked_request_auto_responds() {
        let router = lenient();
        let resolved = router.resolve(&get("https://ham.spam/")).unwrap();

        assert_eq!(resolved.response.status(), 200);
        assert!(resolved.route.is_none());
        let calls = router.calls();
        let call = calls.last().unwrap();
        assert_eq!(call.response.as_ref().map(|r| r.status()), Some(200));
    }

    #[test]
    #[traced_test]
    fn test_pass_through_recorded() {
        let router = Router::new();
        let route = router.get("https://foo.bar/").unwrap().pass_through(true);

        let err = router.resolve(&get("https://foo.bar/")).unwrap_err();
        assert!(err.is_pass_through());
        assert_eq!(err.route(), Some(&route));
        assert_eq!(route.call_count(), 1);
        assert!(!route.calls()[0].has_response());
        assert!(logs_contain("passed through"));
    }

    #[test]
    fn test_raised_error_recorded() {
        let router = Router::new();
        let route = router
            .get("https://foo.bar/")
            .unwrap()
            .raises(TransportErrorKind::ConnectTimeout);

        let err = router.resolve(&get("https://foo.bar/")).unwrap_err();
        assert_eq!(
            err.mocked(),
            Some(&MockedError::mock(TransportErrorKind::ConnectTimeout))
        );
        assert_eq!(route.call_count(), 1);
        assert!(route.calls().last().unwrap().response.is_none());
        assert_eq!(router.calls().call_count(), 1);
    }

    #[test]
    fn test_sequence_then_exhausted() {
        let router = Router::new();
        let route = router
            .get("https://foo.bar/")
            .unwrap()
            .side_effects([201u16, 202u16]);

        let statuses: Vec<u16> = (0..2)
            .map(|_| router.resolve(&get("https://foo.bar/")).unwrap().response.status())
            .collect();
        assert_eq!(statuses, vec![201, 202]);

        let err = router.resolve(&get("https://foo.bar/")).unwrap_err();
        assert!(matches!(err, Error::SideEffectExhausted { .. }));
        assert_eq!(route.call_count(), 2);
    }

    #[test]
    fn test_side_effect_declines() {
        let router = Router::new();
        let declining = router
            .route(m!(host = "foo.bar").unwrap())
            .side_effect(|request: &Request, _: &Context| {
                if request.url().path == "/skip/" {
                    Ok(None)
                } else {
                    Ok(Some(Outcome::from(204u16)))
                }
            });
        let fallback = router.route(Pattern::method("GET")).respond(418);

        let resolved = router.resolve(&get("https://foo.bar/skip/")).unwrap();
        assert_eq!(resolved.response.status(), 418);
        assert!(!declining.called());
        assert!(fallback.called());

        let resolved = router.resolve(&get("https://foo.bar/take/")).unwrap();
        assert_eq!(resolved.response.status(), 204);
        assert!(declining.called());
    }

    #[test]
    fn test_async_side_effect_needs_async_resolution() {
        let router = Router::new();
        router
            .get("https://foo.bar/")
            .unwrap()
            .side_effect_async(|_request: Request, _context: Context| async move {
                Ok::<_, MockedError>(Some(Outcome::from(201u16)))
            });

        let err = router.resolve(&get("https://foo.bar/")).unwrap_err();
        assert!(matches!(err, Error::AsyncSideEffect { .. }));
        assert!(!router.calls().called());
    }

    #[tokio::test]
    async fn test_resolve_async() {
        let router = Router::new();
        let route = router
            .get("https://foo.bar/")
            .unwrap()
            .side_effect_async(|request: Request, _context: Context| async move {
                tokio::task::yield_now().await;
                let status: u16 = if request.url().query.is_empty() { 201 } else { 202 };
                Ok::<_, MockedError>(Some(Outcome::from(status)))
            });

        let resolved = router.resolve_async(&get("https://foo.bar/")).await.unwrap();
        assert_eq!(resolved.response.status(), 201);
        assert_eq!(route.call_count(), 1);

        // sync side effects resolve asynchronously too
        route.respond(203);
        let resolved = router.resolve_async(&get("https://foo.bar/")).await.unwrap();
        assert_eq!(resolved.response.status(), 203);
    }

    #[test]
    fn test_queued_routes_fire_in_order() {
        let router = Router::new();
        let first = router.queue(Route::new(Pattern::method("POST")).respond(201));
        let second = router.queue(Route::new(Pattern::method("POST")).respond(409));

        let statuses: Vec<u16> = (0..3)
            .map(|_| {
                let request = Request::post("https://foo.bar/").unwrap();
                router.resolve(&request).unwrap().response.status()
            })
            .collect();
        assert_eq!(statuses, vec![201, 409, 409]);
        assert_eq!(first.call_count(), 1);
        assert_eq!(second.call_count(), 2);
        assert_eq!(router.routes().len(), 1);
    }
}
