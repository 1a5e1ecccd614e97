//! Inbound request and outbound response shapes for the conversational API.

use serde::{Deserialize, Serialize};

use crate::search::JobResult;

/// The single inbound request type: one user message for one session.
#[derive(Debug, Deserialize)]
pub struct UserRequest {
    pub session_id: String,
    pub message: String,
}

/// Terminal outcome of a conversation turn. Error turns are produced by
/// `AppError`'s response mapping and carry `status: "error"`, so the three
/// statuses a client can observe are exactly continuation / success / error.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TurnResponse {
    /// More information is needed; `message` is the clarifying question.
    Continuation { message: String },
    /// Search ran. `jobs` may legitimately be empty ("no postings matched"),
    /// which is distinct from any error response.
    Success {
        jobs: Vec<JobResult>,
        message: String,
    },
}
