//! Engine-facing request surface.
//!
//! Every route takes a flat parameter map (as it would arrive in a query
//! string) and produces a status plus a JSON or text body. Validation runs
//! before any upstream call.

pub mod params;

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::config::NodeproxyConfig;
use crate::error::{ProxyError, ProxyResult};
use crate::filter::{AttributeMatcher, FilterSet};
use crate::mutation::MutationRequest;
use crate::mutation::executor::{BulkExecutor, Cancellation};
use crate::mutation::summary::MutationSummary;
use crate::node::Node;
use crate::notes::NoteRequest;
use crate::query::NodeQueryService;
use crate::remote::http::HttpNodeStore;
use crate::remote::{JobHandle, NodeStore};

use params::{API_KEY, ATTRIBUTE_FILTERS, JOB_ID, NEW_ATTRIBUTES, NOTE_TYPE, Params, TITLE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Health,
    FilterNodes,
    UpdateNodeAttributes,
    DeleteNodesByAttribute,
    AddFilterNote,
}

impl Route {
    pub const ALL: [Route; 5] = [
        Route::Health,
        Route::FilterNodes,
        Route::UpdateNodeAttributes,
        Route::DeleteNodesByAttribute,
        Route::AddFilterNote,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Route::Health => "/",
            Route::FilterNodes => "/filter_nodes",
            Route::UpdateNodeAttributes => "/update_node_attributes",
            Route::DeleteNodesByAttribute => "/delete_nodes_by_attribute",
            Route::AddFilterNote => "/add_filter_note",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl FromStr for Route {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Route::ALL
            .into_iter()
            .find(|route| route.path() == s || route.path().trim_start_matches('/') == s)
            .ok_or_else(|| format!("Unknown route: {}", s))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
}

/// Status and body handed back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyResponse {
    pub status: u16,
    pub body: ResponseBody,
}

impl ProxyResponse {
    pub fn json(body: impl Serialize) -> Self {
        match serde_json::to_value(body) {
            Ok(value) => Self {
                status: 200,
                body: ResponseBody::Json(value),
            },
            Err(e) => Self::from_error(&ProxyError::Decode(e.to_string())),
        }
    }

    pub fn from_error(err: &ProxyError) -> Self {
        Self {
            status: err.status_code(),
            body: ResponseBody::Text(err.body()),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn as_json(&self) -> Option<&Value> {
        match &self.body {
            ResponseBody::Json(value) => Some(value),
            ResponseBody::Text(_) => None,
        }
    }

    /// Pretty JSON, or the text body as-is.
    pub fn render(&self) -> String {
        match &self.body {
            ResponseBody::Json(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
            ResponseBody::Text(text) => text.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub endpoints: Vec<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FilterResponse {
    pub data: Vec<Node>,
    pub total: usize,
    pub filters_applied: FilterSet,
    pub job_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MutationResponse {
    #[serde(flatten)]
    pub summary: MutationSummary,
    pub filters_applied: FilterSet,
}

#[derive(Debug, Clone, Serialize)]
pub struct NoteResponse {
    pub note: Value,
    pub matched: usize,
    pub filters_applied: FilterSet,
    pub job_id: String,
}

/// Routes requests through query, mutation and note workflows.
#[derive(Debug)]
pub struct ProxyService<S> {
    store: Arc<S>,
    query: NodeQueryService<S>,
    executor: BulkExecutor<S>,
    config: NodeproxyConfig,
}

impl ProxyService<HttpNodeStore> {
    /// Service talking to the upstream named in `config`.
    pub fn from_config(config: NodeproxyConfig) -> ProxyResult<Self> {
        let store = HttpNodeStore::new(&config.base_url, config.timeout())?;
        Ok(Self::new(Arc::new(store), config))
    }
}

impl<S> ProxyService<S>
where
    S: NodeStore + 'static,
{
    pub fn new(store: Arc<S>, config: NodeproxyConfig) -> Self {
        let matcher = AttributeMatcher::new(config.instance_resolution);
        Self {
            query: NodeQueryService::new(Arc::clone(&store), matcher),
            executor: BulkExecutor::new(Arc::clone(&store), config.concurrency),
            store,
            config,
        }
    }

    pub fn config(&self) -> &NodeproxyConfig {
        &self.config
    }

    pub async fn handle(
        &self,
        route: Route,
        params: &Params,
        cancellation: &Cancellation,
    ) -> ProxyResponse {
        let result = match route {
            Route::Health => Ok(ProxyResponse::json(self.health())),
            Route::FilterNodes => self
                .filter_nodes(params, cancellation)
                .await
                .map(ProxyResponse::json),
            Route::UpdateNodeAttributes => self
                .update_node_attributes(params, cancellation)
                .await
                .map(ProxyResponse::json),
            Route::DeleteNodesByAttribute => self
                .delete_nodes_by_attribute(params, cancellation)
                .await
                .map(ProxyResponse::json),
            Route::AddFilterNote => self
                .add_filter_note(params, cancellation)
                .await
                .map(ProxyResponse::json),
        };

        result.unwrap_or_else(|err| {
            if err.status_code() >= 500 {
                error!(route = %route, error = %err, "Request failed");
            } else {
                warn!(route = %route, status = err.status_code(), error = %err, "Request rejected");
            }
            ProxyResponse::from_error(&err)
        })
    }

    pub fn health(&self) -> HealthResponse {
        HealthResponse {
            status: "ok",
            message: "nodeproxy is running",
            endpoints: Route::ALL
                .into_iter()
                .filter(|route| *route != Route::Health)
                .map(|route| route.path())
                .collect(),
        }
    }

    /// Matching nodes of a job. `job_id` falls back to the configured
    /// default.
    pub async fn filter_nodes(
        &self,
        params: &Params,
        cancellation: &Cancellation,
    ) -> ProxyResult<FilterResponse> {
        let job = self.read_job(params)?;
        let filters = params::filters(params)?;

        let data = until_cancelled(cancellation, self.query.fetch_matching(&job, &filters)).await?;
        info!(job_id = job.job_id(), total = data.len(), "Filter request served");

        Ok(FilterResponse {
            total: data.len(),
            data,
            filters_applied: filters,
            job_id: job.job_id().to_string(),
        })
    }

    pub async fn update_node_attributes(
        &self,
        params: &Params,
        cancellation: &Cancellation,
    ) -> ProxyResult<MutationResponse> {
        params::require_all(params, &[API_KEY, JOB_ID, ATTRIBUTE_FILTERS, NEW_ATTRIBUTES])?;
        let job = self.write_job(params)?;
        let filters = params::required_filters(params)?;
        let request = params::mutation(params)?;

        self.mutate(&job, filters, request, cancellation).await
    }

    pub async fn delete_nodes_by_attribute(
        &self,
        params: &Params,
        cancellation: &Cancellation,
    ) -> ProxyResult<MutationResponse> {
        params::require_all(params, &[API_KEY, JOB_ID, ATTRIBUTE_FILTERS])?;
        let job = self.write_job(params)?;
        let filters = params::required_filters(params)?;

        self.mutate(&job, filters, MutationRequest::delete(), cancellation)
            .await
    }

    /// Post a note to the job listing the nodes that match the filters.
    pub async fn add_filter_note(
        &self,
        params: &Params,
        cancellation: &Cancellation,
    ) -> ProxyResult<NoteResponse> {
        let job = self.read_job(params)?;
        let filters = params::filters(params)?;

        let matched =
            until_cancelled(cancellation, self.query.fetch_matching(&job, &filters)).await?;
        let note = NoteRequest::for_matches(
            params::optional(params, TITLE).unwrap_or(self.config.note.title.as_str()),
            params::optional(params, NOTE_TYPE).unwrap_or(self.config.note.note_type.as_str()),
            &matched,
            &filters,
            Utc::now(),
        );

        let reply = until_cancelled(cancellation, self.store.create_note(&job, &note)).await?;
        if !reply.is_success() {
            return Err(ProxyError::Upstream {
                status: reply.status,
                body: match reply.body {
                    Value::String(text) => text,
                    other => other.to_string(),
                },
            });
        }
        info!(job_id = job.job_id(), matched = matched.len(), "Posted filter note");

        Ok(NoteResponse {
            note: reply.body,
            matched: matched.len(),
            filters_applied: filters,
            job_id: job.job_id().to_string(),
        })
    }

    /// Fetch, filter, mutate, summarise.
    ///
    /// Cancelling during the fetch fails the request; cancelling during the
    /// mutation phase keeps the outcomes collected so far.
    pub async fn mutate(
        &self,
        job: &JobHandle,
        filters: FilterSet,
        request: MutationRequest,
        cancellation: &Cancellation,
    ) -> ProxyResult<MutationResponse> {
        let nodes = until_cancelled(cancellation, self.query.fetch_matching(job, &filters)).await?;
        let execution = self
            .executor
            .execute_until(nodes, job, &request, cancellation)
            .await;

        let summary = MutationSummary::summarize(
            execution.outcomes,
            request.operation().clone(),
            job.job_id(),
        )
        .with_cancelled(execution.cancelled);

        info!(
            job_id = job.job_id(),
            operation = %summary.operation,
            total = summary.total,
            succeeded = summary.success_count,
            failed = summary.failure_count,
            cancelled = summary.cancelled,
            "Bulk mutation finished"
        );

        Ok(MutationResponse {
            summary,
            filters_applied: filters,
        })
    }

    fn read_job(&self, params: &Params) -> ProxyResult<JobHandle> {
        let api_key = params::required(params, API_KEY)?;
        let job_id = params::optional(params, JOB_ID)
            .or(self.config.default_job_id.as_deref())
            .ok_or_else(|| ProxyError::MissingParameter(JOB_ID.to_string()))?;
        Ok(JobHandle::new(job_id, api_key))
    }

    fn write_job(&self, params: &Params) -> ProxyResult<JobHandle> {
        Ok(JobHandle::new(
            params::required(params, JOB_ID)?,
            params::required(params, API_KEY)?,
        ))
    }
}

/// Run `call` unless the request is cancelled first.
async fn until_cancelled<T>(
    cancellation: &Cancellation,
    call: impl Future<Output = ProxyResult<T>>,
) -> ProxyResult<T> {
    tokio::select! {
        biased;
        _ = cancellation.cancelled() => Err(ProxyError::Cancelled),
        result = call => result,
    }
}
