// SPDX-License-Identifier: MIT

//! The HTTP API (§6): `axum` router, bearer-token auth, and the SSE change
//! stream, wired the way `satwikambashta-rusty-automation-tool`'s `api`
//! crate lays out its router (nested routes, `CorsLayer`, `TraceLayer`).

mod auth;
mod handlers;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use wf_core::SystemClock;
use wf_storage::{ChangeBatch, Store};
use wf_wire::TokenTable;

/// Shared state every handler reads from. Cheap to clone — everything
/// behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub changes: broadcast::Sender<ChangeBatch>,
    pub tokens: Arc<TokenTable>,
    pub read_only: bool,
    pub clock: SystemClock,
    /// Notified after a successful `add-nodes`/`kill` so the engine loop's
    /// idle backoff doesn't sit on a stale node for up to `max_blocking_time`.
    pub wake: Arc<tokio::sync::Notify>,
}

/// Relay coalesced batches from the engine's [`wf_storage::ChangeBus`] onto
/// a `broadcast` channel so any number of SSE clients can subscribe (the
/// bus itself only supports a single `next_change()` consumer), the way
/// `vanyastaff-nebula`'s `telemetry::EventBus` fans execution events out to
/// many subscribers.
pub fn spawn_change_relay(
    bus: Arc<wf_storage::ChangeBus>,
    capacity: usize,
) -> (broadcast::Sender<ChangeBatch>, tokio::task::JoinHandle<()>) {
    let (tx, _rx) = broadcast::channel(capacity);
    let relay_tx = tx.clone();
    let handle = tokio::spawn(async move {
        while let Some(batch) = bus.next_change().await {
            // No active subscribers is not an error; the batch is simply dropped.
            let _ = relay_tx.send(batch);
        }
    });
    (tx, handle)
}

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/add-nodes", post(handlers::add_nodes))
        .route("/kill", post(handlers::kill))
        .route("/target/{id}", get(handlers::target))
        .route("/changes", get(handlers::changes))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_bearer_token));

    Router::new()
        .merge(protected)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
