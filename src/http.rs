//! HTTP surface: the buffered and streaming dashboard routes.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

use crate::aggregate::DashboardAggregator;
use crate::client::CatalogApi;
use crate::error::{AggregateError, SinkError};
use crate::model::MinistryTotal;
use crate::sink::{element_bytes, TotalsSink};

pub struct AppState<C> {
    aggregator: Arc<DashboardAggregator<C>>,
}

impl<C> Clone for AppState<C> {
    fn clone(&self) -> Self {
        AppState {
            aggregator: self.aggregator.clone(),
        }
    }
}

/// Build the dashboard router. Kept separate from [`serve`] so tests can
/// mount it on an ephemeral listener.
pub fn router<C: CatalogApi + 'static>(aggregator: Arc<DashboardAggregator<C>>) -> Router {
    let state = AppState { aggregator };
    Router::new()
        .route("/api/dashboard", get(dashboard::<C>))
        .route("/api/dashboard/stream", get(dashboard_stream::<C>))
        .with_state(state)
}

/// Bind and serve until ctrl-c.
pub async fn serve<C: CatalogApi + 'static>(
    bind_addr: SocketAddr,
    aggregator: Arc<DashboardAggregator<C>>,
) -> anyhow::Result<()> {
    let router = router(aggregator);
    let listener = TcpListener::bind(bind_addr).await?;
    let actual_addr = listener.local_addr()?;
    info!(bind = %actual_addr, "[HTTP] Dashboard service listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("[HTTP] Dashboard service stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("[HTTP] Shutdown signal received"),
        Err(e) => {
            error!(error = %e, "[HTTP] Could not listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}

/// Buffered dashboard: the whole ranked array in one envelope.
async fn dashboard<C: CatalogApi + 'static>(State(state): State<AppState<C>>) -> Response {
    match state.aggregator.aggregate().await {
        Ok(totals) if totals.is_empty() => (
            StatusCode::OK,
            Json(json!({ "message": "No dashboard data available" })),
        )
            .into_response(),
        Ok(totals) => (
            StatusCode::OK,
            Json(json!({ "success": true, "data": totals })),
        )
            .into_response(),
        Err(fault) => {
            let (status_code, message) = fault_parts(&fault);
            error_response(status_code, message)
        }
    }
}

/// Streaming dashboard: status decided by the first sink event, then the
/// JSON array chunks flow through a channel into the response body.
async fn dashboard_stream<C: CatalogApi + 'static>(State(state): State<AppState<C>>) -> Response {
    let (ready_tx, ready_rx) = oneshot::channel();
    let (chunk_tx, chunk_rx) = mpsc::channel::<Result<Bytes, Infallible>>(16);
    let mut sink = BodySink {
        chunks: chunk_tx,
        ready: Some(ready_tx),
        elements: 0,
    };

    let aggregator = state.aggregator.clone();
    tokio::spawn(async move {
        // Faults are signalled through the sink; nothing more to report here.
        let _ = aggregator.aggregate_streaming(&mut sink).await;
    });

    match ready_rx.await {
        Ok(Ok(())) => {
            let chunks = futures::stream::unfold(chunk_rx, |mut rx| async move {
                rx.recv().await.map(|chunk| (chunk, rx))
            });
            (
                [(header::CONTENT_TYPE, "application/json")],
                Body::from_stream(chunks),
            )
                .into_response()
        }
        Ok(Err((status_code, message))) => error_response(status_code, message),
        Err(_) => error_response(500, "Internal Server Error while fetching dashboard data"),
    }
}

/// Sink writing the array framing into the streaming response body.
///
/// `ready` carries the go/no-go decision for the response head: consumed with
/// `Ok` when the array opens, or with the fault's status and message if
/// aggregation failed before any bytes were written.
struct BodySink {
    chunks: mpsc::Sender<Result<Bytes, Infallible>>,
    ready: Option<oneshot::Sender<Result<(), (u16, &'static str)>>>,
    elements: usize,
}

#[async_trait]
impl TotalsSink for BodySink {
    async fn begin(&mut self) -> Result<(), SinkError> {
        self.chunks
            .send(Ok(Bytes::from_static(b"[")))
            .await
            .map_err(|_| client_gone())?;
        if let Some(ready) = self.ready.take() {
            let _ = ready.send(Ok(()));
        }
        Ok(())
    }

    async fn element(&mut self, total: &MinistryTotal) -> Result<(), SinkError> {
        let bytes = element_bytes(total, self.elements == 0)?;
        self.chunks
            .send(Ok(Bytes::from(bytes)))
            .await
            .map_err(|_| client_gone())?;
        self.elements += 1;
        Ok(())
    }

    async fn end(&mut self) -> Result<(), SinkError> {
        self.chunks
            .send(Ok(Bytes::from_static(b"]")))
            .await
            .map_err(|_| client_gone())?;
        Ok(())
    }

    async fn fail(&mut self, fault: &AggregateError, bytes_sent: bool) {
        if let Some(ready) = self.ready.take() {
            let _ = ready.send(Err(fault_parts(fault)));
        }
        if bytes_sent {
            warn!(
                error = %fault,
                "[STREAM] Response body closed mid-array, output left truncated"
            );
        }
    }
}

fn client_gone() -> SinkError {
    "response body closed by the client".into()
}

fn fault_parts(fault: &AggregateError) -> (u16, &'static str) {
    let message = match fault {
        AggregateError::UpstreamRejected { .. } => "Upstream catalog rejected the request",
        AggregateError::UpstreamUnavailable { .. } => "GovData service unavailable",
        AggregateError::MalformedResponse { .. }
        | AggregateError::SinkWrite { .. }
        | AggregateError::Unexpected { .. } => {
            "Internal Server Error while fetching dashboard data"
        }
    };
    (fault.status_code(), message)
}

/// The error envelope: status and a generic message, never internal detail.
fn error_response(status_code: u16, message: &str) -> Response {
    let status =
        StatusCode::from_u16(status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(json!({ "statusCode": status_code, "message": message })),
    )
        .into_response()
}
