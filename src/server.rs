use std::net::{Ipv4Addr, SocketAddr};

use anyhow::Result;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use tokio::net::TcpListener;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::{
    config::ServerConfig,
    dispatcher::{Dispatcher, Job, JobQueue},
    error::DispatcherClosed,
    store::ResultStore,
    types::{QueryRequest, QueryResponse, ScanRequest, ScanResponse},
};

/// What every request handler shares: the result store and the intake queue.
#[derive(Clone, Debug)]
pub struct AppState {
    store: ResultStore,
    queue: JobQueue,
}

impl AppState {
    pub fn new(store: ResultStore, queue: JobQueue) -> Self {
        Self { store, queue }
    }
}

/// `POST /submit` and `POST /query`. Any other path falls through to 404.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/submit", post(submit_scan))
        .route("/query", post(query_scan))
        .with_state(state)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

/// Bind on all interfaces at the configured port and serve until SIGINT/SIGTERM.
pub async fn run(config: ServerConfig) -> Result<()> {
    let shutdown = CancellationToken::new();
    let on_signal = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        on_signal.cancel();
    });

    let bind = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.listen_port));
    let listener = TcpListener::bind(bind).await?;
    serve(listener, config, shutdown).await
}

/// Serve on `listener` until `shutdown` fires, then wind down in order:
/// stop accepting, give open requests `grace_period`, close the intake queue.
///
/// Probes still running for already dequeued jobs are abandoned.
pub async fn serve(
    listener: TcpListener,
    config: ServerConfig,
    shutdown: CancellationToken,
) -> Result<()> {
    let store = ResultStore::new();
    let dispatcher = Dispatcher::start(store.clone(), config.dispatcher.clone());
    let app = router(AppState::new(store, dispatcher.queue()));

    info!(addr = %listener.local_addr()?, "listening");

    let stop = shutdown.clone();
    let mut http = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { stop.cancelled().await })
            .await
    });

    tokio::select! {
        res = &mut http => {
            // Listener died on its own; nothing left to drain.
            dispatcher.shutdown().await;
            return match res {
                Ok(served) => served.map_err(Into::into),
                Err(e) => Err(e.into()),
            };
        }
        _ = shutdown.cancelled() => {}
    }

    info!("shutting down");
    match time::timeout(config.grace_period, &mut http).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => warn!(error = %e, "http server failed while draining"),
        Ok(Err(e)) => warn!(error = %e, "http server task failed"),
        Err(_) => {
            warn!(grace = ?config.grace_period, "grace period elapsed, dropping open connections");
            http.abort();
        }
    }

    dispatcher.shutdown().await;
    info!("goodbye");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Register a new scan: draw an unused id, store the pending result, then enqueue.
///
/// The pending entry is written before the job becomes visible to the dispatcher,
/// so a query right after the returned id sees `ready: false` rather than 404.
/// If the queue closes between that write and the enqueue, the pending entry is
/// left behind under an id no caller was given.
pub async fn accept_scan(
    store: &ResultStore,
    queue: &JobQueue,
    port: u16,
    targets: Vec<String>,
) -> Result<u64, DispatcherClosed> {
    if queue.is_closed() {
        return Err(DispatcherClosed);
    }
    let id = loop {
        let id = rand::random::<u64>();
        if store.insert_new(id, QueryResponse::pending(port)).await {
            break id;
        }
        debug!(id, "scan id already taken, drawing again");
    };

    queue.submit(Job { id, port, targets }).await?;
    info!(id, "submitted for work");
    Ok(id)
}

async fn submit_scan(State(app): State<AppState>, body: Bytes) -> Response {
    let req: ScanRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            warn!(body = %String::from_utf8_lossy(&body), error = %e, "bad submit request body");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    info!(?req, "got request to scan");

    if let Err(e) = req.validate() {
        info!(?req, "request not valid");
        return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
    }
    let Ok(port) = u16::try_from(req.port) else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    match accept_scan(&app.store, &app.queue, port, req.ips.unwrap_or_default()).await {
        Ok(id) => (StatusCode::OK, Json(ScanResponse { id })).into_response(),
        Err(e) => {
            warn!(error = %e, "refusing scan during shutdown");
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}

async fn query_scan(State(app): State<AppState>, body: Bytes) -> Response {
    let req: QueryRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            warn!(body = %String::from_utf8_lossy(&body), error = %e, "bad query request body");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match app.store.get(req.id).await {
        Some(result) => (StatusCode::OK, Json(result)).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
