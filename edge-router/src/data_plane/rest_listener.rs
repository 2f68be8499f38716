/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! REST ingress: one HTTP listener shared by every REST-sourced rule.
//!
//! Registrations live in an immutable snapshot swapped atomically on add and
//! remove, so request handling never waits on a writer.

use crate::data_plane::dispatcher::CLIENT_CLOSED_REQUEST;
use crate::error::RouterError;
use crate::observability::events;
use crate::providers::TargetResponse;
use crate::routing::path_matcher::{self, PathTemplate};
use arc_swap::ArcSwap;
use async_trait::async_trait;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::response::Response;
use axum::Router;
use bytes::Bytes;
use http::{header, HeaderMap, Method, StatusCode, Uri};
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

const COMPONENT: &str = "rest_listener";

pub const MAX_MESSAGE_BYTES: usize = 12 * 1024 * 1024;
pub const REQUEST_ERROR: &str = "Request error";
pub const NO_RULE_MATCH: &str = "No rule match";
pub const BODY_ERROR: &str = "Request error,body is null";

/// Parameter bag handed to a registered handler.
#[derive(Debug)]
pub struct RestRequest {
    pub message_id: String,
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    /// First path segment, treated as the edge node name.
    pub node_name: String,
    /// Placeholder values of the matched template, in order.
    pub captures: Vec<String>,
    pub timeout: Duration,
    pub data: Bytes,
    /// Cancelled when the client disconnects.
    pub context: CancellationToken,
}

#[async_trait]
pub trait RestHandler: Send + Sync {
    async fn handle(&self, request: RestRequest) -> TargetResponse;
}

struct Registration {
    template: PathTemplate,
    handler: Arc<dyn RestHandler>,
}

type Registrations = BTreeMap<String, Arc<Registration>>;

pub struct RestRoutes {
    registrations: ArcSwap<Registrations>,
    timeout: Duration,
}

impl RestRoutes {
    pub fn new(timeout: Duration) -> Self {
        Self {
            registrations: ArcSwap::from_pointee(BTreeMap::new()),
            timeout,
        }
    }

    /// Registers `handler` for `template`, replacing an earlier registration.
    pub fn add(&self, template: &str, handler: Arc<dyn RestHandler>) -> Result<(), RouterError> {
        let registration = Arc::new(Registration {
            template: PathTemplate::compile(template)?,
            handler,
        });
        self.registrations.rcu(|current| {
            let mut next = Registrations::clone(current);
            next.insert(template.to_string(), Arc::clone(&registration));
            next
        });
        debug!(
            event = events::REST_ROUTE_ADD,
            component = COMPONENT,
            template,
            "registered rest route"
        );
        Ok(())
    }

    /// Removes the registration for `template`. Returns `true` when it existed.
    pub fn remove(&self, template: &str) -> bool {
        let previous = self.registrations.rcu(|current| {
            let mut next = Registrations::clone(current);
            next.remove(template);
            next
        });
        let removed = previous.contains_key(template);
        debug!(
            event = events::REST_ROUTE_REMOVE,
            component = COMPONENT,
            template,
            removed,
            "removed rest route"
        );
        removed
    }

    pub fn contains(&self, template: &str) -> bool {
        self.registrations.load().contains_key(template)
    }

    pub fn len(&self) -> usize {
        self.registrations.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.load().is_empty()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn matched(&self, path: &str) -> Option<Arc<Registration>> {
        let snapshot = self.registrations.load();
        let chosen = path_matcher::select(
            snapshot.values().map(|registration| &registration.template),
            path,
        )?;
        snapshot.get(chosen.as_str()).cloned()
    }

    /// HTTP application serving every path through the registration table.
    pub fn router(self: &Arc<Self>) -> Router {
        Router::new()
            .fallback(serve_request)
            .with_state(Arc::clone(self))
    }
}

fn node_hint(path: &str) -> Option<&str> {
    path.split('/').nth(1).filter(|segment| !segment.is_empty())
}

async fn serve_request(State(routes): State<Arc<RestRoutes>>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let path = parts.uri.path().to_string();

    let Some(node_name) = node_hint(&path).map(str::to_string) else {
        warn!(
            event = events::REST_REQUEST_MALFORMED,
            component = COMPONENT,
            path = path.as_str(),
            "url format incorrect"
        );
        return chunked(TargetResponse::text(StatusCode::NOT_FOUND, REQUEST_ERROR));
    };

    let Some(registration) = routes.matched(&path) else {
        info!(
            event = events::REST_REQUEST_NO_MATCH,
            component = COMPONENT,
            path = path.as_str(),
            "no rule matches request path"
        );
        return chunked(TargetResponse::text(StatusCode::NOT_FOUND, NO_RULE_MATCH));
    };

    let data = match axum::body::to_bytes(body, MAX_MESSAGE_BYTES).await {
        Ok(data) => data,
        Err(err) => {
            warn!(
                event = events::REST_REQUEST_BODY_FAILED,
                component = COMPONENT,
                path = path.as_str(),
                err = %err,
                "unable to read request body"
            );
            return chunked(TargetResponse::text(StatusCode::BAD_REQUEST, BODY_ERROR));
        }
    };

    let context = CancellationToken::new();
    // Cancels the context if this future is dropped on client disconnect.
    let _disconnect = context.clone().drop_guard();

    let message_id = Uuid::new_v4().to_string();
    let rest_request = RestRequest {
        message_id: message_id.clone(),
        method: parts.method,
        captures: registration.template.captures(&path).unwrap_or_default(),
        uri: parts.uri,
        headers: parts.headers,
        node_name,
        timeout: routes.timeout,
        data,
        context,
    };

    let response = registration.handler.handle(rest_request).await;
    if response.status.as_u16() != CLIENT_CLOSED_REQUEST {
        debug!(
            event = events::REST_RESPONSE,
            component = COMPONENT,
            msg_id = message_id.as_str(),
            status = response.status.as_u16(),
            "responding to client"
        );
    }
    chunked(response)
}

/// Writes `response` with its headers and a streamed body of unknown length.
fn chunked(response: TargetResponse) -> Response {
    let mut builder = Response::builder().status(response.status);
    if let Some(headers) = builder.headers_mut() {
        for (name, value) in response.headers.iter() {
            if name == header::CONTENT_LENGTH || name == header::TRANSFER_ENCODING {
                continue;
            }
            headers.append(name.clone(), value.clone());
        }
    }

    let payload = response.body;
    let stream = futures::stream::once(async move { Ok::<Bytes, Infallible>(payload) });
    builder.body(Body::from_stream(stream)).unwrap_or_else(|err| {
        error!(
            component = COMPONENT,
            err = %err,
            "unable to build rest response"
        );
        let mut fallback = Response::new(Body::empty());
        *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        fallback
    })
}

/// Bound HTTP server over a [`RestRoutes`] table.
pub struct RestListener {
    routes: Arc<RestRoutes>,
    local_addr: SocketAddr,
    server: Mutex<Option<JoinHandle<()>>>,
}

impl RestListener {
    /// Binds `address:port` and serves until `shutdown` fires.
    pub async fn bind(
        address: &str,
        port: u16,
        routes: Arc<RestRoutes>,
        shutdown: CancellationToken,
    ) -> Result<Self, RouterError> {
        let bind_error = |reason: String| RouterError::Bind {
            addr: format!("{address}:{port}"),
            reason,
        };

        let listener = match TcpListener::bind((address, port)).await {
            Ok(listener) => listener,
            Err(err) => {
                error!(
                    event = events::REST_LISTENER_BIND_FAILED,
                    component = COMPONENT,
                    address,
                    port,
                    err = %err,
                    "start rest endpoint failed"
                );
                return Err(bind_error(err.to_string()));
            }
        };
        let local_addr = listener
            .local_addr()
            .map_err(|err| bind_error(err.to_string()))?;

        info!(
            event = events::REST_LISTENER_BIND_OK,
            component = COMPONENT,
            local_addr = %local_addr,
            "router server listening"
        );

        let app = routes.router();
        let server = tokio::spawn(async move {
            let serving = axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await });
            if let Err(err) = serving.await {
                error!(
                    event = events::REST_LISTENER_STOPPED,
                    component = COMPONENT,
                    err = %err,
                    "rest listener stopped with error"
                );
                return;
            }
            info!(
                event = events::REST_LISTENER_STOPPED,
                component = COMPONENT,
                "rest listener stopped"
            );
        });

        Ok(Self {
            routes,
            local_addr,
            server: Mutex::new(Some(server)),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn routes(&self) -> &Arc<RestRoutes> {
        &self.routes
    }

    /// Waits for the server task after its shutdown token fired.
    pub async fn join(&self) {
        if let Some(server) = self.server.lock().await.take() {
            let _ = server.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower::ServiceExt;

    struct Echo(&'static str);

    #[async_trait]
    impl RestHandler for Echo {
        async fn handle(&self, request: RestRequest) -> TargetResponse {
            let mut response = TargetResponse::text(
                StatusCode::OK,
                format!("{}:{}:{}", self.0, request.node_name, request.captures.join(",")),
            );
            response
                .headers
                .insert("x-handler", http::HeaderValue::from_static("echo"));
            response
                .headers
                .insert(header::CONTENT_LENGTH, http::HeaderValue::from_static("999"));
            response
        }
    }

    async fn call(routes: &Arc<RestRoutes>, method: Method, uri: &str, body: Body) -> Response {
        let request = http::Request::builder()
            .method(method)
            .uri(uri)
            .body(body)
            .unwrap();
        routes.router().oneshot(request).await.unwrap()
    }

    async fn text(response: Response) -> String {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(body.to_vec()).unwrap()
    }

    fn routes() -> Arc<RestRoutes> {
        Arc::new(RestRoutes::new(Duration::from_secs(60)))
    }

    #[tokio::test]
    async fn root_path_is_a_request_error() {
        let routes = routes();
        routes.add("/{ns}", Arc::new(Echo("ns"))).unwrap();

        let response = call(&routes, Method::GET, "/", Body::empty()).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(text(response).await, REQUEST_ERROR);
    }

    #[tokio::test]
    async fn unmatched_path_is_no_rule_match() {
        let routes = routes();
        routes.add("/{ns}/sub", Arc::new(Echo("sub"))).unwrap();

        let response = call(&routes, Method::GET, "/default/other", Body::empty()).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(text(response).await, NO_RULE_MATCH);
    }

    #[tokio::test]
    async fn handler_response_is_streamed_without_length() {
        let routes = routes();
        routes.add("/{node}/default/q", Arc::new(Echo("q"))).unwrap();

        let response = call(&routes, Method::POST, "/n1/default/q", Body::from("{}")).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-handler"], "echo");
        assert!(response.headers().get(header::CONTENT_LENGTH).is_none());
        assert_eq!(text(response).await, "q:n1:n1");
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let routes = routes();
        routes.add("/{node}/big", Arc::new(Echo("big"))).unwrap();

        let oversized = vec![b'x'; MAX_MESSAGE_BYTES + 1];
        let response = call(&routes, Method::POST, "/n1/big", Body::from(oversized)).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(text(response).await, BODY_ERROR);
    }

    #[tokio::test]
    async fn remove_takes_effect_for_the_next_request() {
        let routes = routes();
        routes.add("/{ns}", Arc::new(Echo("ns"))).unwrap();
        assert!(routes.remove("/{ns}"));
        assert!(!routes.remove("/{ns}"));

        let response = call(&routes, Method::GET, "/default", Body::empty()).await;
        assert_eq!(text(response).await, NO_RULE_MATCH);
    }

    #[tokio::test]
    async fn invalid_template_is_rejected_at_registration() {
        let routes = routes();

        assert!(matches!(
            routes.add("/{broken", Arc::new(Echo("x"))),
            Err(RouterError::InvalidPathTemplate { .. })
        ));
        assert!(routes.is_empty());
    }

    #[tokio::test]
    async fn bound_listener_serves_and_stops() {
        let routes = routes();
        routes.add("/{ns}", Arc::new(Echo("ns"))).unwrap();
        let shutdown = CancellationToken::new();
        let listener = RestListener::bind("127.0.0.1", 0, routes, shutdown.clone())
            .await
            .unwrap();

        let url = format!("http://{}/default", listener.local_addr());
        let body = reqwest::get(url).await.unwrap().text().await.unwrap();
        assert_eq!(body, "ns:default:default");

        shutdown.cancel();
        listener.join().await;
    }
}
