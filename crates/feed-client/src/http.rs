use feed_core::config::ApiConfig;
use feed_core::entity::CatalogEntity;
use feed_core::entity_link::EntityLink;
use feed_core::feed::Thread;
use feed_core::filter::ListQuery;
use feed_core::incident::{IncidentPage, ResolutionStatus};
use feed_core::patch::PatchOp;
use feed_core::permission::Denial;
use feed_core::suggestion::SuggestedValue;
use feed_core::task::TaskCount;
use feed_core::wire::{
    CloseTask, CreateThread, ErrorBody, FeedQuery, PostBody, ResolveTask, ResolvedTask,
    SearchIndex, SearchResults, ThreadList, API_PREFIX, PRINCIPAL_HEADER,
};
use feed_core::{FeedError, Result};
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;
use uuid::Uuid;

/// Typed wrapper over the catalog REST API. Cheap to clone.
#[derive(Debug, Clone)]
pub struct FeedApi {
    client: Client,
    base_url: String,
    user: String,
}

/// Map a failed response to a domain error.
///
/// 403 bodies carrying a structured denial become `Permission`; other client
/// errors become `Policy` with the server's message; server errors, including
/// unstructured backend exceptions, become `Internal`.
pub fn error_for(status: u16, body: &str) -> FeedError {
    let message = match serde_json::from_str::<ErrorBody>(body) {
        Ok(b) => b.message,
        Err(_) => body.trim().to_string(),
    };
    let message = if message.is_empty() {
        format!("HTTP {status}")
    } else {
        message
    };
    match status {
        403 => match Denial::parse(&message) {
            Some(denial) => FeedError::Permission(denial),
            None => FeedError::Internal(message),
        },
        404 => FeedError::NotFound(message),
        400..=499 => FeedError::Policy(message),
        _ => FeedError::Internal(message),
    }
}

fn network(err: reqwest::Error) -> FeedError {
    FeedError::Network(err.to_string())
}

impl FeedApi {
    /// A zero timeout disables the request timeout.
    pub fn new(base_url: &str, user: &str, timeout: Duration) -> Result<Self> {
        let mut builder = Client::builder();
        if !timeout.is_zero() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| FeedError::Internal(format!("cannot build http client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            user: user.to_string(),
        })
    }

    pub fn from_config(api: &ApiConfig) -> Result<Self> {
        Self::new(&api.base_url, &api.user, Duration::from_secs(api.timeout_secs))
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{API_PREFIX}{path}", self.base_url);
        self.client
            .request(method, url)
            .header(PRINCIPAL_HEADER, &self.user)
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T> {
        let resp = req.send().await.map_err(network)?;
        let status = resp.status();
        if status.is_success() {
            return resp.json::<T>().await.map_err(|e| {
                if e.is_decode() {
                    FeedError::Internal(format!("malformed response: {e}"))
                } else {
                    network(e)
                }
            });
        }
        let body = resp.text().await.unwrap_or_default();
        let err = error_for(status.as_u16(), &body);
        tracing::debug!(status = status.as_u16(), error = %err, "request failed");
        Err(err)
    }

    // -----------------------------------------------------------------------
    // Feed
    // -----------------------------------------------------------------------

    pub async fn list_threads(&self, query: &FeedQuery) -> Result<ThreadList> {
        self.send(self.request(Method::GET, "/feed").query(query)).await
    }

    pub async fn count(&self, link: Option<&EntityLink>) -> Result<TaskCount> {
        let mut req = self.request(Method::GET, "/feed/count");
        if let Some(link) = link {
            req = req.query(&[("entityLink", link.to_string())]);
        }
        self.send(req).await
    }

    pub async fn create_thread(&self, body: &CreateThread) -> Result<Thread> {
        self.send(self.request(Method::POST, "/feed").json(body)).await
    }

    pub async fn get_thread(&self, id: Uuid) -> Result<Thread> {
        self.send(self.request(Method::GET, &format!("/feed/{id}"))).await
    }

    pub async fn patch_thread(&self, id: Uuid, ops: &[PatchOp]) -> Result<Thread> {
        self.send(self.request(Method::PATCH, &format!("/feed/{id}")).json(ops))
            .await
    }

    pub async fn add_post(&self, id: Uuid, message: &str) -> Result<Thread> {
        let body = PostBody {
            message: message.to_string(),
        };
        self.send(self.request(Method::POST, &format!("/feed/{id}/posts")).json(&body))
            .await
    }

    pub async fn delete_post(&self, id: Uuid, post_id: Uuid) -> Result<Thread> {
        self.send(self.request(Method::DELETE, &format!("/feed/{id}/posts/{post_id}")))
            .await
    }

    // -----------------------------------------------------------------------
    // Tasks
    // -----------------------------------------------------------------------

    pub async fn get_task(&self, task_id: u64) -> Result<Thread> {
        self.send(self.request(Method::GET, &format!("/feed/tasks/{task_id}")))
            .await
    }

    pub async fn resolve_task(
        &self,
        task_id: u64,
        new_value: Option<SuggestedValue>,
    ) -> Result<ResolvedTask> {
        let body = ResolveTask { new_value };
        self.send(
            self.request(Method::PUT, &format!("/feed/tasks/{task_id}/resolve"))
                .json(&body),
        )
        .await
    }

    pub async fn close_task(&self, task_id: u64, comment: &str) -> Result<Thread> {
        let body = CloseTask {
            comment: comment.to_string(),
        };
        self.send(
            self.request(Method::PUT, &format!("/feed/tasks/{task_id}/close"))
                .json(&body),
        )
        .await
    }

    // -----------------------------------------------------------------------
    // Entities, incidents, search
    // -----------------------------------------------------------------------

    pub async fn get_table(&self, fqn: &str) -> Result<CatalogEntity> {
        self.send(self.request(Method::GET, &format!("/tables/name/{fqn}")))
            .await
    }

    pub async fn list_incidents(&self, query: &ListQuery) -> Result<IncidentPage> {
        self.send(
            self.request(Method::GET, "/dataQuality/testCases/testCaseIncidentStatus")
                .query(&query.to_pairs()),
        )
        .await
    }

    pub async fn patch_incident(&self, id: Uuid, ops: &[PatchOp]) -> Result<ResolutionStatus> {
        self.send(
            self.request(
                Method::PATCH,
                &format!("/dataQuality/testCases/testCaseIncidentStatus/{id}"),
            )
            .json(ops),
        )
        .await
    }

    pub async fn search(&self, q: &str, index: SearchIndex) -> Result<SearchResults> {
        self.send(
            self.request(Method::GET, "/search/query")
                .query(&[("q", q), ("index", index.as_str())]),
        )
        .await
    }
}
