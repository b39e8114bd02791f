// SPDX-License-Identifier: MIT

//! Request handlers for the four external interfaces (§6): `POST
//! /add-nodes`, `POST /kill`, `GET /target/{id}`, `GET /changes`.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::stream::Stream;
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use wf_core::{Clock, NodeId};
use wf_storage::StoreError;
use wf_wire::{
    AddNodesRequest, AddNodesResponse, ChangeStreamEvent, KillRequest, KillResponse,
    TargetResponse,
};

use super::AppState;

fn map_store_error(err: StoreError) -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
}

/// `POST /add-nodes` (§6): only `StoredNode::Inline` submissions make sense
/// here — pointers are the engine's own doing during equivalence folding
/// (§4.1), never something a client submits directly.
pub async fn add_nodes(
    State(state): State<AppState>,
    Json(body): Json<AddNodesRequest>,
) -> Result<Json<AddNodesResponse>, Response> {
    if state.read_only {
        return Err((StatusCode::FORBIDDEN, "daemon is in read_only_mode").into_response());
    }
    let mut nodes = Vec::with_capacity(body.0.len());
    for stored in body.0 {
        match stored {
            wf_core::StoredNode::Inline(node) => nodes.push(node),
            wf_core::StoredNode::Pointer { id, .. } => {
                return Err((
                    StatusCode::BAD_REQUEST,
                    format!("node {id} submitted as a pointer; only inline nodes are accepted"),
                )
                    .into_response());
            }
        }
    }
    let ids = nodes.iter().map(|n| n.id).collect();
    state.store.queue_adds(nodes);
    state.wake.notify_one();
    Ok(Json(AddNodesResponse { ids }))
}

/// `POST /kill` (§6): ack-only, the actual kill happens on the next tick's
/// drain-kills step.
pub async fn kill(
    State(state): State<AppState>,
    Json(body): Json<KillRequest>,
) -> Result<Json<KillResponse>, Response> {
    if state.read_only {
        return Err((StatusCode::FORBIDDEN, "daemon is in read_only_mode").into_response());
    }
    state.store.queue_kills(body.0);
    state.wake.notify_one();
    Ok(Json(KillResponse::ack()))
}

/// `GET /target/{id}` (§6): the full node plus its full history.
pub async fn target(
    State(state): State<AppState>,
    Path(id): Path<NodeId>,
) -> Result<Json<TargetResponse>, Response> {
    match state.store.get(id) {
        Ok(Some(node)) => Ok(Json(TargetResponse { node })),
        Ok(None) => Err((StatusCode::NOT_FOUND, format!("no such node: {id}")).into_response()),
        Err(e) => Err(map_store_error(e)),
    }
}

/// `GET /changes` (§6): a server-sent-events stream of rate-limited change
/// batches (§4.4), fanned out to every connected client.
pub async fn changes(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.changes.subscribe();
    let clock = state.clock.clone();
    let stream = BroadcastStream::new(rx).filter_map(move |batch| match batch {
        Ok(batch) => {
            let event = ChangeStreamEvent {
                new_ids: batch.new_nodes,
                changed_ids: batch.nodes_changed,
                emitted_at_epoch_ms: clock.epoch_ms(),
            };
            serde_json::to_string(&event).ok().map(|json| Ok(Event::default().data(json)))
        }
        // A slow subscriber dropped some batches; the client just misses
        // them and keeps consuming from where the channel resumes.
        Err(_lagged) => None,
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}
