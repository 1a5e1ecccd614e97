//! Search Dispatcher — maps a completed parameter set onto the Apify job
//! scraping actor's run input and materializes a bounded result list.
//!
//! The actor streams dataset items; the run-sync endpoint with a `limit`
//! consumes that stream server-side, so callers here only ever see a finite
//! `Vec`. Backend failures are surfaced as `SearchError` — an empty result
//! list is a valid success and must stay distinguishable from a failure.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::extraction::ExtractedParams;

const APIFY_API_BASE: &str = "https://api.apify.com/v2";
/// The job scraping actor this service is built against.
pub const ACTOR_ID: &str = "JkfTWxtpgfvcRQn3p";
/// Scraper runs are slow; the run-sync endpoint holds the connection open
/// until the run finishes or this client-side deadline hits.
const REQUEST_TIMEOUT_SECS: u64 = 180;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search backend HTTP error: {0}")]
    Http(reqwest::Error),

    #[error("search backend rejected credentials")]
    Auth,

    #[error("search backend quota exhausted")]
    Quota,

    #[error("search backend timed out")]
    Timeout,

    #[error("search backend error (status {status}): {message}")]
    Upstream { status: u16, message: String },
}

impl From<reqwest::Error> for SearchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SearchError::Timeout
        } else {
            SearchError::Http(e)
        }
    }
}

/// One job posting as returned by the scraper. Treated as opaque beyond the
/// fields the UI contract needs; anything else the actor emits rides along
/// in `metadata`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JobResult {
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub link: String,
    #[serde(flatten)]
    pub metadata: serde_json::Map<String, Value>,
}

/// Actor run input. Field names follow the actor's contract; absent optional
/// fields are omitted entirely.
#[derive(Debug, Serialize)]
struct ActorRunInput<'a> {
    job_title: &'a str,
    location: &'a str,
    jobs_entries: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    company_names: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    experience_level: Option<&'a str>,
}

impl<'a> ActorRunInput<'a> {
    fn from_params(params: &'a ExtractedParams, cap: usize) -> Self {
        Self {
            job_title: &params.job_title,
            location: &params.location,
            jobs_entries: cap,
            company_names: params.company_names.as_deref(),
            experience_level: params.experience_level.as_deref(),
        }
    }
}

/// Capability contract for the job search collaborator. Any backend that
/// takes the parameter set and yields a bounded list of postings satisfies
/// it; tests substitute a deterministic stub.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(
        &self,
        params: &ExtractedParams,
        cap: usize,
    ) -> Result<Vec<JobResult>, SearchError>;
}

/// Production backend: invokes the Apify actor synchronously and reads the
/// default dataset items from the response body.
#[derive(Clone)]
pub struct ApifyClient {
    client: Client,
    token: String,
}

impl ApifyClient {
    pub fn new(token: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .expect("Failed to build HTTP client"),
            token,
        }
    }
}

#[async_trait]
impl SearchBackend for ApifyClient {
    async fn search(
        &self,
        params: &ExtractedParams,
        cap: usize,
    ) -> Result<Vec<JobResult>, SearchError> {
        let url = format!("{APIFY_API_BASE}/acts/{ACTOR_ID}/run-sync-get-dataset-items");
        let run_input = ActorRunInput::from_params(params, cap);

        let response = self
            .client
            .post(&url)
            .query(&[("token", self.token.as_str())])
            .query(&[("limit", cap)])
            .json(&run_input)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!("Apify actor run failed with {status}: {message}");
            return Err(error_for_status(status.as_u16(), message));
        }

        let mut jobs: Vec<JobResult> = response.json().await?;
        // The limit query param already bounds the dataset read; truncate
        // anyway so the cap holds even if the backend ignores it.
        jobs.truncate(cap);

        debug!("actor run returned {} postings", jobs.len());
        Ok(jobs)
    }
}

fn error_for_status(status: u16, message: String) -> SearchError {
    match status {
        401 | 403 => SearchError::Auth,
        402 | 429 => SearchError::Quota,
        408 | 504 => SearchError::Timeout,
        _ => SearchError::Upstream { status, message },
    }
}
