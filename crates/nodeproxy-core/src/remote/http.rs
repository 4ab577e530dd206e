//! HTTP client for the remote node store.

use std::time::Duration;

use reqwest::{Client, Response};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::{ProxyError, ProxyResult};
use crate::mutation::planner::UpdateBody;
use crate::node::{self, Node};
use crate::notes::NoteRequest;

use super::{JobHandle, NodeStore, RemoteReply};

pub const DEFAULT_BASE_URL: &str = "https://dcs.katapultpro.com/api/v3";

/// [`NodeStore`] backed by the upstream REST API.
#[derive(Debug, Clone)]
pub struct HttpNodeStore {
    client: Client,
    base_url: Url,
}

impl HttpNodeStore {
    pub fn new(base_url: &str, timeout: Duration) -> ProxyResult<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(ProxyError::invalid(
                "base_url",
                format!("{} cannot be used as a base URL", base_url),
            ));
        }

        let client = Client::builder()
            .user_agent(concat!("nodeproxy/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `{base}/{segments...}?api_key=...`
    pub fn endpoint(&self, job: &JobHandle, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url.query_pairs_mut().append_pair("api_key", job.api_key());
        url
    }

    async fn into_reply(response: Response) -> ProxyResult<RemoteReply> {
        let status = response.status().as_u16();
        let text = response.text().await?;
        Ok(RemoteReply::from_text(status, text))
    }
}

impl NodeStore for HttpNodeStore {
    async fn list_nodes(&self, job: &JobHandle) -> ProxyResult<Vec<Node>> {
        let url = self.endpoint(job, &["jobs", job.job_id(), "nodes"]);
        debug!(job_id = job.job_id(), "Fetching node collection");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            debug!(job_id = job.job_id(), status = status.as_u16(), "Node listing rejected");
            return Err(ProxyError::Upstream {
                status: status.as_u16(),
                body: text,
            });
        }

        let body: Value = serde_json::from_str(&text)
            .map_err(|e| ProxyError::Decode(format!("node listing is not valid JSON: {}", e)))?;
        node::parse_collection(body)
            .map_err(|e| ProxyError::Decode(format!("malformed node in listing: {}", e)))
    }

    async fn update_node(
        &self,
        job: &JobHandle,
        node_id: &str,
        body: &UpdateBody,
    ) -> ProxyResult<RemoteReply> {
        let url = self.endpoint(job, &["jobs", job.job_id(), "nodes", node_id]);
        debug!(job_id = job.job_id(), node_id, "Posting node update");

        let response = self.client.post(url).json(body).send().await?;
        Self::into_reply(response).await
    }

    async fn delete_node(&self, job: &JobHandle, node_id: &str) -> ProxyResult<RemoteReply> {
        let url = self.endpoint(job, &["jobs", job.job_id(), "nodes", node_id]);
        debug!(job_id = job.job_id(), node_id, "Deleting node");

        let response = self.client.delete(url).send().await?;
        Self::into_reply(response).await
    }

    async fn create_note(&self, job: &JobHandle, note: &NoteRequest) -> ProxyResult<RemoteReply> {
        let url = self.endpoint(job, &["jobs", job.job_id(), "notes"]);
        debug!(job_id = job.job_id(), title = %note.title, "Posting note");

        let response = self.client.post(url).json(note).send().await?;
        Self::into_reply(response).await
    }
}
