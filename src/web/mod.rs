//! HTTP front end: control page, MJPEG stream and zoom endpoint

pub mod mjpeg;
mod page;

pub use page::CONTROL_PAGE;

use axum::{
    body::Body,
    extract::{rejection::FormRejection, ConnectInfo, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use crate::streaming::{FrameBuffer, StreamStats};
use crate::zoom::ZoomController;
use mjpeg::ClientSession;

/// Handles shared by every request.
///
/// Owned by the process for the camera's lifetime and cloned into each
/// handler; there is no other global state.
#[derive(Clone)]
pub struct AppState {
    pub frames: Arc<FrameBuffer>,
    pub zoom: Arc<ZoomController>,
    pub stats: Arc<StreamStats>,
}

impl AppState {
    pub fn new(frames: Arc<FrameBuffer>, zoom: Arc<ZoomController>, stats: Arc<StreamStats>) -> Self {
        Self {
            frames,
            zoom,
            stats,
        }
    }
}

/// Route table. Requires `ConnectInfo<SocketAddr>` on each request, which
/// [`run_server`] provides.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(redirect_to_index))
        .route("/index.html", get(index_handler))
        .route("/stream.mjpg", get(stream_handler))
        .route("/handle_button_click", post(zoom_handler))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until the listener fails. Each connection runs on its own task.
pub async fn run_server(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    info!("Web server listening on http://{}", addr);

    let app = router(state).into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, app).await
}

async fn redirect_to_index() -> Response {
    // axum's Redirect::permanent is a 308; browsers expect the classic 301 here
    (
        StatusCode::MOVED_PERMANENTLY,
        [(header::LOCATION, "/index.html")],
    )
        .into_response()
}

async fn index_handler() -> Html<&'static str> {
    Html(CONTROL_PAGE)
}

async fn stream_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Response {
    let session = ClientSession::new(addr, state.frames.clone(), state.stats.clone());

    (
        StatusCode::OK,
        [
            (header::AGE, "0"),
            (header::CACHE_CONTROL, "no-cache, private"),
            (header::PRAGMA, "no-cache"),
            (header::CONTENT_TYPE, mjpeg::CONTENT_TYPE),
        ],
        Body::from_stream(session.into_stream()),
    )
        .into_response()
}

/// First `button_value` in the form; repeats after it are ignored
fn button_value(fields: &[(String, String)]) -> Option<&str> {
    fields
        .iter()
        .find(|(name, _)| name == "button_value")
        .map(|(_, value)| value.as_str())
}

async fn zoom_handler(
    State(state): State<AppState>,
    form: Result<Form<Vec<(String, String)>>, FormRejection>,
) -> Html<&'static str> {
    match form {
        Ok(Form(fields)) => {
            let requested = button_value(&fields).unwrap_or_default().to_string();
            let zoom = state.zoom.clone();
            // crop updates touch the camera pipeline synchronously
            if let Err(e) =
                tokio::task::spawn_blocking(move || zoom.apply_requested(&requested)).await
            {
                error!(error = %e, "spawn_blocking failed");
            }
        }
        Err(e) => {
            debug!(error = %e, "Ignoring malformed zoom request");
        }
    }

    Html(CONTROL_PAGE)
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_button_value_takes_first() {
        let form = fields(&[("button_value", "2"), ("button_value", "3")]);
        assert_eq!(button_value(&form), Some("2"));
    }

    #[test]
    fn test_button_value_missing() {
        assert_eq!(button_value(&fields(&[("other", "1")])), None);
        assert_eq!(button_value(&[]), None);
    }
}
