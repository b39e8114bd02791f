// SPDX-License-Identifier: MIT

//! A thin `reqwest` wrapper around the daemon's four external interfaces
//! (§6): `add-nodes`, `kill`, `target/{id}`, `changes`.

use crate::exit_error::ExitError;
use futures::StreamExt;
use wf_core::{Node, NodeId, StoredNode};
use wf_wire::{
    AddNodesRequest, AddNodesResponse, ChangeStreamEvent, KillRequest, KillResponse,
    TargetResponse,
};

pub struct Client {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl Client {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self { http: reqwest::Client::new(), base_url: base_url.into(), token: token.into() }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ExitError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ExitError::new(1, format!("daemon returned {status}: {body}")))
        }
    }

    pub async fn add_nodes(&self, nodes: Vec<Node>) -> Result<AddNodesResponse, ExitError> {
        let request = AddNodesRequest(nodes.into_iter().map(StoredNode::Inline).collect());
        let response = self
            .http
            .post(self.url("add-nodes"))
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await?;
        let response = Self::check_status(response).await?;
        Ok(response.json().await?)
    }

    pub async fn kill(&self, ids: Vec<NodeId>) -> Result<KillResponse, ExitError> {
        let response = self
            .http
            .post(self.url("kill"))
            .bearer_auth(&self.token)
            .json(&KillRequest(ids))
            .send()
            .await?;
        let response = Self::check_status(response).await?;
        Ok(response.json().await?)
    }

    pub async fn target(&self, id: NodeId) -> Result<TargetResponse, ExitError> {
        let response = self
            .http
            .get(self.url(&format!("target/{id}")))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let response = Self::check_status(response).await?;
        Ok(response.json().await?)
    }

    /// Tail `GET /changes` (§6), invoking `on_event` for every batch until
    /// the connection ends or `on_event` asks to stop.
    pub async fn watch_changes(
        &self,
        mut on_event: impl FnMut(ChangeStreamEvent) -> bool,
    ) -> Result<(), ExitError> {
        let response =
            self.http.get(self.url("changes")).bearer_auth(&self.token).send().await?;
        let response = Self::check_status(response).await?;
        let mut stream = response.bytes_stream();
        let mut buffer = String::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            buffer.push_str(&String::from_utf8_lossy(&chunk));
            while let Some(newline) = buffer.find('\n') {
                let line = buffer[..newline].trim_end_matches('\r').to_string();
                buffer.drain(..=newline);
                let Some(data) = line.strip_prefix("data:") else { continue };
                let Ok(event) = serde_json::from_str::<ChangeStreamEvent>(data.trim()) else {
                    continue;
                };
                if !on_event(event) {
                    return Ok(());
                }
            }
        }
        Ok(())
    }
}
