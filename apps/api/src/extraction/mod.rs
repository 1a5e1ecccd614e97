//! Parameter Extractor — turns the accumulated conversation into either a
//! complete search parameter set or a clarifying question.
//!
//! The policy (what counts as "enough information", latest-mention-wins
//! conflict resolution, expansion of vague company categories) lives in the
//! prompt contract; this module enforces the structural half of it: a record
//! is either complete and eligible for dispatch, or incomplete and carries a
//! clarifying question. Never both, never neither.

pub mod prompts;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::extraction::prompts::{EXTRACTION_PROMPT_TEMPLATE, EXTRACTION_SYSTEM};
use crate::llm_client::{strip_json_fences, LlmBackend, LlmError};
use crate::session::Session;

/// Completed search parameters. `job_title` and `location` are the hard
/// requirements; the optional fields are omitted from the wire when absent,
/// never serialized as null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedParams {
    pub job_title: String,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_names: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experience_level: Option<String>,
}

/// Outcome of one extraction pass over the session history.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionOutcome {
    /// Both required fields present; eligible for dispatch.
    Complete {
        params: ExtractedParams,
        followup: String,
    },
    /// Required information missing; `question` goes back to the user and
    /// the dispatcher is not touched this turn.
    Incomplete { question: String },
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("malformed extraction output: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("extractor claimed completeness without required field: {0}")]
    Validation(&'static str),
}

/// Raw model output. The model signals incompleteness with a `continuation`
/// key; otherwise it emits the extracted fields plus an optional `message`.
#[derive(Debug, Deserialize)]
struct ExtractionWire {
    continuation: Option<String>,
    job_title: Option<String>,
    location: Option<String>,
    company_names: Option<Vec<String>>,
    experience_level: Option<String>,
    message: Option<String>,
}

/// Runs the extraction prompt over the full session history.
pub async fn extract(
    llm: &dyn LlmBackend,
    session: &Session,
) -> Result<ExtractionOutcome, ExtractionError> {
    let prompt =
        EXTRACTION_PROMPT_TEMPLATE.replace("{user_messages}", &session.render_user_history());
    let text = llm.generate(&prompt, EXTRACTION_SYSTEM).await?;
    parse_outcome(&text)
}

/// Parses and validates raw model output into an `ExtractionOutcome`.
///
/// Validation here is defensive: the prompt contract already forbids a
/// "complete" answer without both required fields, but dispatch must never
/// run on a half-filled record, so the invariant is re-checked locally.
fn parse_outcome(text: &str) -> Result<ExtractionOutcome, ExtractionError> {
    let wire: ExtractionWire =
        serde_json::from_str(strip_json_fences(text)).map_err(ExtractionError::Malformed)?;

    if let Some(question) = wire.continuation {
        return Ok(ExtractionOutcome::Incomplete { question });
    }

    let job_title = match wire.job_title.filter(|s| !s.trim().is_empty()) {
        Some(t) => t,
        None => return Err(ExtractionError::Validation("job_title")),
    };
    let location = match wire.location.filter(|s| !s.trim().is_empty()) {
        Some(l) => l,
        None => return Err(ExtractionError::Validation("location")),
    };

    let company_names = wire.company_names.filter(|names| !names.is_empty());

    // Absent stays absent (no experience filter); out-of-range values are
    // dropped rather than forwarded to the search backend.
    let experience_level = wire.experience_level.filter(|level| {
        let valid = matches!(level.as_str(), "1" | "2" | "3" | "4" | "5" | "6");
        if !valid {
            warn!(%level, "dropping out-of-range experience_level");
        }
        valid
    });

    let followup = match wire.message.filter(|m| !m.trim().is_empty()) {
        Some(m) => m,
        None => format!("Searching for {job_title} roles in {location}."),
    };

    Ok(ExtractionOutcome::Complete {
        params: ExtractedParams {
            job_title,
            location,
            company_names,
            experience_level,
        },
        followup,
    })
}
