//! Development HTTP server.
//!
//! Serves the in-memory outputs of the latest successful build and pushes
//! [`DevEvent`]s to browsers over Server-Sent Events.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderValue, StatusCode, Uri, header};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use tokio::net::TcpListener;
use tokio::sync::broadcast::error::RecvError;
use tokio_stream::Stream;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info, warn};

use super::state::SharedState;
use super::{CLIENT_PATH, DevEvent, overlay};
use crate::error::{CliError, Result};

/// Ports tried after the configured one when it is taken.
const PORT_ATTEMPTS: u16 = 10;

const CLIENT_SCRIPT: &str = include_str!("../../assets/dev/client.js");

pub struct DevServer {
    listener: TcpListener,
    addr: SocketAddr,
    state: SharedState,
}

impl DevServer {
    /// Bind `host:port`, moving up to the next free port if needed.
    pub async fn bind(host: &str, port: u16, state: SharedState) -> Result<Self> {
        let mut last_error = None;
        for offset in 0..=PORT_ATTEMPTS {
            let Some(candidate) = port.checked_add(offset) else {
                break;
            };
            match TcpListener::bind((host, candidate)).await {
                Ok(listener) => {
                    let addr = listener.local_addr()?;
                    if offset > 0 {
                        warn!(
                            requested = port,
                            port = addr.port(),
                            "port in use, using the next free one"
                        );
                    }
                    return Ok(Self { listener, addr, state });
                }
                Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
                    debug!(port = candidate, "port in use");
                    last_error = Some(err);
                }
                Err(err) => {
                    return Err(CliError::Server(format!(
                        "failed to bind {host}:{candidate}: {err}"
                    )));
                }
            }
        }
        Err(CliError::Server(match last_error {
            Some(err) => format!(
                "no free port in {port}..={}: {err}",
                port.saturating_add(PORT_ATTEMPTS)
            ),
            None => format!("no free port from {port}"),
        }))
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Serve until `shutdown` resolves.
    pub async fn serve(self, shutdown: impl Future<Output = ()> + Send + 'static) -> Result<()> {
        info!(url = %self.url(), "dev server listening");
        axum::serve(self.listener, router(self.state))
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|err| CliError::Server(err.to_string()))
    }
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/__sitepack/events", get(events))
        .route(CLIENT_PATH, get(client_script))
        .route("/__sitepack/status", get(status))
        .fallback(serve_output)
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .with_state(state)
}

/// Decrements the client count when an SSE stream is dropped.
struct ClientGuard(SharedState);

impl Drop for ClientGuard {
    fn drop(&mut self) {
        self.0.client_disconnected();
    }
}

async fn events(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut receiver = state.subscribe();
    let clients = state.client_connected();
    debug!(clients, "client connected");
    let guard = ClientGuard(state);

    let stream = async_stream::stream! {
        let _guard = guard;
        loop {
            match receiver.recv().await {
                Ok(event) => yield Ok(to_sse(&event)),
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "client lagged, forcing reload");
                    yield Ok(to_sse(&DevEvent::BuildCompleted { build: 0 }));
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)).text("ping"))
}

fn to_sse(event: &DevEvent) -> Event {
    Event::default()
        .event(event.name())
        .json_data(event)
        .unwrap_or_else(|_| Event::default().event(event.name()))
}

async fn client_script() -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/javascript; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        CLIENT_SCRIPT,
    )
        .into_response()
}

async fn status(State(state): State<SharedState>) -> Response {
    Json(serde_json::json!({
        "build": state.status(),
        "files": state.file_count(),
        "clients": state.client_count(),
    }))
    .into_response()
}

async fn serve_output(State(state): State<SharedState>, uri: Uri) -> Response {
    let path = uri.path();

    if !state.has_built() {
        let body = match state.status().error() {
            Some(error) => overlay::error_page(error),
            None => overlay::error_page("The first build has not finished yet."),
        };
        return html(StatusCode::SERVICE_UNAVAILABLE, body.into_bytes());
    }

    let Some(file) = state.file(path) else {
        return (
            StatusCode::NOT_FOUND,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            format!("Not found: {path}"),
        )
            .into_response();
    };

    if file.content_type.starts_with("text/html") {
        return html(StatusCode::OK, inject_client(&file.bytes));
    }
    (
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(file.content_type)),
            (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
        ],
        file.bytes.to_vec(),
    )
        .into_response()
}

fn html(status: StatusCode, body: Vec<u8>) -> Response {
    (
        status,
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        body,
    )
        .into_response()
}

/// Insert the reload client before `</body>`, or append it.
fn inject_client(content: &[u8]) -> Vec<u8> {
    let html = String::from_utf8_lossy(content);
    let tag = format!(r#"<script type="module" src="{CLIENT_PATH}"></script>"#);
    match html.rfind("</body>") {
        Some(pos) => {
            let mut out = String::with_capacity(html.len() + tag.len() + 1);
            out.push_str(&html[..pos]);
            out.push_str(&tag);
            out.push('\n');
            out.push_str(&html[pos..]);
            out.into_bytes()
        }
        None => format!("{html}\n{tag}\n").into_bytes(),
    }
}
