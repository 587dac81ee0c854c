// HTTP/JSON transport over the front-end API.

use crate::api::{Api, Status};
use crate::{ClientId, Result};
use axum::{extract::State, response::Json, routing::post, Router};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectRequest {
    pub client_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisconnectRequest {
    pub client_id: String,
    /// Hang up for every client, not just this one.
    #[serde(default)]
    pub all: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRequest {
    pub client_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

async fn connect(State(api): State<Arc<Api>>, Json(req): Json<ConnectRequest>) -> Json<OkResponse> {
    let ok = api.connect(ClientId::from(req.client_id));
    Json(OkResponse { ok })
}

async fn disconnect(
    State(api): State<Arc<Api>>,
    Json(req): Json<DisconnectRequest>,
) -> Json<OkResponse> {
    let ok = api.disconnect(&ClientId::from(req.client_id), req.all);
    Json(OkResponse { ok })
}

async fn status(State(api): State<Arc<Api>>, Json(req): Json<StatusRequest>) -> Json<Status> {
    Json(api.get_status(&ClientId::from(req.client_id)))
}

pub fn router(api: Arc<Api>) -> Router {
    Router::new()
        .route("/connect", post(connect))
        .route("/disconnect", post(disconnect))
        .route("/status", post(status))
        .with_state(api)
}

/// Serve the API until `shutdown` resolves.
pub async fn serve(
    api: Arc<Api>,
    port: u16,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "listening");

    axum::serve(listener, router(api))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
