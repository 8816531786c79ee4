//! The WebSocket bridge (C7): resolves a kernel and hands the upgraded
//! socket off to an upstream ZMQ/WebSocket connector.
//!
//! Framing, heartbeat, and kernel-message lifecycle belong to that
//! connector, an external collaborator this core doesn't implement
//! (spec.md §1, §4.7) — `UpstreamChannelConnector` is the seam tests
//! substitute a fake at.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::ws::WebSocket;
use axum::extract::{Path, Query, State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures::SinkExt;
use kernel_k8s::K8sClientError;
use kernel_manager::ManagerError;
use kernel_schema::ConnectionInfo;
use tracing::{info, warn};

use crate::routes::AppState;

/// The upstream ZMQ channel connector contract (spec.md §4.7 steps 2-4):
/// build the connection using the kernel's [`ConnectionInfo`] as parent and
/// the WebSocket as peer, propagate `session_id` when present, run
/// `prepare` if the connector has one, then enter its default channels
/// loop. This core never interprets kernel messages itself.
#[async_trait]
pub trait UpstreamChannelConnector: Send + Sync {
    async fn run(&self, socket: WebSocket, connection_info: ConnectionInfo, session_id: Option<String>);
}

/// A connector with no real ZMQ transport behind it. Logs the handoff and
/// closes the socket; a production deployment replaces this with the real
/// bridge to the kernel pod's ZMQ channels.
#[derive(Debug, Default)]
pub struct NoopChannelConnector;

#[async_trait]
impl UpstreamChannelConnector for NoopChannelConnector {
    async fn run(&self, mut socket: WebSocket, connection_info: ConnectionInfo, session_id: Option<String>) {
        info!(
            kernel_id = %connection_info.kernel_id,
            session_id = ?session_id,
            "handing WebSocket off to upstream channel connector"
        );
        if let Err(e) = socket.close().await {
            warn!(error = %e, "error closing channels WebSocket");
        }
    }
}

/// Error pages for this endpoint render as plain text, not JSON, because
/// the upgraded protocol may already have handed framing to the peer
/// (spec.md §4.7).
fn plain_text_error(status: StatusCode, message: String) -> Response {
    (status, message).into_response()
}

/// `GET /api/kernels/{id}/channels`: upgrade to WebSocket and bridge to
/// the kernel's ZMQ channels.
pub async fn channels_handler(
    State(state): State<AppState>,
    Path(kernel_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    ws: WebSocketUpgrade,
) -> Response {
    if !crate::handlers::kernel_id_is_well_formed(&kernel_id) {
        return plain_text_error(StatusCode::NOT_FOUND, format!("Kernel not found: {kernel_id}"));
    }

    match state.manager.get(&kernel_id, None).await {
        Ok(Some(view)) => {
            let session_id = params.get("session_id").cloned();
            let connector = Arc::clone(&state.connector);
            ws.on_upgrade(move |socket| async move {
                connector
                    .run(socket, view.payload.kernel_connection_info, session_id)
                    .await;
            })
        }
        Ok(None) => plain_text_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Kernel not ready: {kernel_id}"),
        ),
        Err(ManagerError::K8sClient(K8sClientError::KernelNotFoundError(msg))) => {
            plain_text_error(StatusCode::NOT_FOUND, msg)
        }
        Err(e) => plain_text_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}
