//! Conversation Controller — drives one turn of the slot-filling dialogue.
//!
//! Per-turn state machine:
//! `AWAIT_INPUT -> EXTRACTING -> {DISPATCHING | CLARIFYING} -> RESPONDING`.
//! The user message is appended to the session before any external call, so
//! a retried or abandoned turn always sees the full context and nothing
//! needs rolling back.

pub mod handlers;
mod prompts;

use tracing::{info, warn};

use crate::chat::prompts::{SUMMARY_PROMPT_TEMPLATE, SUMMARY_SYSTEM};
use crate::errors::AppError;
use crate::extraction::{extract, ExtractedParams, ExtractionOutcome};
use crate::llm_client::LlmBackend;
use crate::models::TurnResponse;
use crate::search::JobResult;
use crate::state::AppState;

/// How many postings the summary prompt sees. Anything past this adds
/// tokens without changing the one-line summary.
const SUMMARY_POSTINGS: usize = 5;

/// Runs one conversation turn. Holding the session lock for the whole turn
/// serializes turns per session id; independent sessions proceed in parallel.
pub async fn run_turn(
    state: &AppState,
    session_id: &str,
    message: &str,
) -> Result<TurnResponse, AppError> {
    let handle = state.sessions.get_or_create(session_id).await;
    let mut session = handle.lock().await;

    session.push_user(message);
    flush(state, session_id, &session).await;

    let outcome = extract(state.llm.as_ref(), &session).await?;

    match outcome {
        ExtractionOutcome::Incomplete { question } => {
            info!(session_id, "turn needs clarification");
            session.push_assistant(&question);
            flush(state, session_id, &session).await;
            Ok(TurnResponse::Continuation { message: question })
        }
        ExtractionOutcome::Complete { params, followup } => {
            info!(
                session_id,
                job_title = %params.job_title,
                location = %params.location,
                "dispatching search"
            );
            let jobs = state
                .search
                .search(&params, state.config.jobs_entries_cap)
                .await?;

            let message = match summarize(state.llm.as_ref(), &params, &jobs).await {
                Some(summary) => summary,
                None => followup,
            };

            session.push_assistant(&message);
            flush(state, session_id, &session).await;
            Ok(TurnResponse::Success { jobs, message })
        }
    }
}

/// Best-effort relevance summary via a second LLM call. Returns `None` on
/// any failure; the caller falls back to the extractor's follow-up message.
async fn summarize(
    llm: &dyn LlmBackend,
    params: &ExtractedParams,
    jobs: &[JobResult],
) -> Option<String> {
    if jobs.is_empty() {
        return Some(format!(
            "No postings matched \"{}\" in {} right now. Try broadening the title or location.",
            params.job_title, params.location
        ));
    }

    let postings = jobs
        .iter()
        .take(SUMMARY_POSTINGS)
        .map(|j| format!("- {} at {} ({})", j.title, j.company, j.location))
        .collect::<Vec<_>>()
        .join("\n");

    let prompt = SUMMARY_PROMPT_TEMPLATE
        .replace("{job_title}", &params.job_title)
        .replace("{location}", &params.location)
        .replace("{postings}", &postings);

    match llm.generate(&prompt, SUMMARY_SYSTEM).await {
        Ok(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Ok(_) => None,
        Err(e) => {
            warn!("summary call failed, falling back to follow-up message: {e}");
            None
        }
    }
}

/// History durability is best-effort; a failed write never fails the turn.
async fn flush(state: &AppState, session_id: &str, session: &crate::session::Session) {
    if let Err(e) = state.sessions.persist(session_id, session).await {
        warn!(session_id, "failed to persist session history: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use crate::config::Config;
    use crate::extraction::ExtractionError;
    use crate::llm_client::LlmError;
    use crate::search::{SearchBackend, SearchError};
    use crate::session::store::SessionStore;
    use crate::session::Role;

    /// Replays scripted responses, one per LLM call.
    struct StubLlm {
        responses: Mutex<Vec<String>>,
    }

    impl StubLlm {
        fn new(responses: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.iter().rev().map(|s| s.to_string()).collect()),
            })
        }
    }

    #[async_trait]
    impl LlmBackend for StubLlm {
        async fn generate(&self, _prompt: &str, _system: &str) -> Result<String, LlmError> {
            self.responses
                .lock()
                .unwrap()
                .pop()
                .ok_or(LlmError::EmptyContent)
        }
    }

    struct StubSearch {
        jobs: Vec<JobResult>,
        fail_with: Option<fn() -> SearchError>,
        calls: AtomicUsize,
    }

    impl StubSearch {
        fn returning(jobs: Vec<JobResult>) -> Arc<Self> {
            Arc::new(Self {
                jobs,
                fail_with: None,
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(err: fn() -> SearchError) -> Arc<Self> {
            Arc::new(Self {
                jobs: vec![],
                fail_with: Some(err),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl SearchBackend for StubSearch {
        async fn search(
            &self,
            _params: &ExtractedParams,
            cap: usize,
        ) -> Result<Vec<JobResult>, SearchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(err) = self.fail_with {
                return Err(err());
            }
            let mut jobs = self.jobs.clone();
            jobs.truncate(cap);
            Ok(jobs)
        }
    }

    fn test_config() -> Config {
        Config {
            gemini_api_key: "test".to_string(),
            apify_token: "test".to_string(),
            port: 0,
            rust_log: "info".to_string(),
            jobs_entries_cap: 10,
            max_sessions: 16,
            sessions_dir: None,
        }
    }

    fn test_state(llm: Arc<StubLlm>, search: Arc<StubSearch>) -> AppState {
        AppState {
            llm,
            search,
            sessions: Arc::new(SessionStore::new(16, None)),
            config: test_config(),
        }
    }

    fn job(title: &str) -> JobResult {
        JobResult {
            title: title.to_string(),
            company: "Acme".to_string(),
            location: "Seattle, WA".to_string(),
            description: "Build things.".to_string(),
            link: "https://example.com/jobs/1".to_string(),
            metadata: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_missing_location_yields_continuation_and_no_dispatch() {
        let llm = StubLlm::new(&[r#"{"continuation": "Which location are you interested in?"}"#]);
        let search = StubSearch::returning(vec![job("Software Engineer")]);
        let state = test_state(llm, Arc::clone(&search));

        let response = run_turn(&state, "alice", "I want a software engineer job")
            .await
            .unwrap();

        let TurnResponse::Continuation { message } = response else {
            panic!("expected continuation");
        };
        assert!(message.contains("location"));
        assert_eq!(search.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_complete_params_dispatch_and_succeed() {
        let llm = StubLlm::new(&[
            r#"{"job_title": "Software Engineer", "location": "Seattle", "message": "Searching now."}"#,
            "Strong matches: several Seattle engineering roles.",
        ]);
        let search = StubSearch::returning(vec![job("Software Engineer"), job("Backend Engineer")]);
        let state = test_state(llm, Arc::clone(&search));

        let response = run_turn(&state, "alice", "software engineer in Seattle")
            .await
            .unwrap();

        let TurnResponse::Success { jobs, message } = response else {
            panic!("expected success");
        };
        assert_eq!(search.calls.load(Ordering::SeqCst), 1);
        assert_eq!(jobs.len(), 2);
        assert!(jobs.len() <= state.config.jobs_entries_cap);
        assert!(!message.is_empty());
    }

    #[tokio::test]
    async fn test_result_count_never_exceeds_cap() {
        let many: Vec<JobResult> = (0..30).map(|i| job(&format!("Role {i}"))).collect();
        let llm = StubLlm::new(&[
            r#"{"job_title": "Software Engineer", "location": "Seattle"}"#,
            "Summary.",
        ]);
        let search = StubSearch::returning(many);
        let state = test_state(llm, search);

        let TurnResponse::Success { jobs, .. } =
            run_turn(&state, "alice", "software engineer in Seattle")
                .await
                .unwrap()
        else {
            panic!("expected success");
        };
        assert_eq!(jobs.len(), state.config.jobs_entries_cap);
    }

    #[tokio::test]
    async fn test_summary_failure_falls_back_to_followup() {
        // Only one scripted response: the summary call hits EmptyContent.
        let llm = StubLlm::new(&[
            r#"{"job_title": "Software Engineer", "location": "Seattle", "message": "Searching for Software Engineer roles in Seattle."}"#,
        ]);
        let search = StubSearch::returning(vec![job("Software Engineer")]);
        let state = test_state(llm, search);

        let TurnResponse::Success { message, .. } =
            run_turn(&state, "alice", "software engineer in Seattle")
                .await
                .unwrap()
        else {
            panic!("expected success");
        };
        assert_eq!(message, "Searching for Software Engineer roles in Seattle.");
    }

    #[tokio::test]
    async fn test_empty_results_are_success_not_error() {
        let llm = StubLlm::new(&[r#"{"job_title": "Falconer", "location": "Reykjavik"}"#]);
        let search = StubSearch::returning(vec![]);
        let state = test_state(llm, search);

        let response = run_turn(&state, "alice", "falconer jobs in Reykjavik")
            .await
            .unwrap();

        let TurnResponse::Success { jobs, message } = response else {
            panic!("expected success");
        };
        assert!(jobs.is_empty());
        assert!(message.contains("No postings matched"));
    }

    #[tokio::test]
    async fn test_search_timeout_surfaces_as_search_error() {
        let llm = StubLlm::new(&[r#"{"job_title": "Software Engineer", "location": "Seattle"}"#]);
        let search = StubSearch::failing(|| SearchError::Timeout);
        let state = test_state(llm, search);

        let result = run_turn(&state, "alice", "software engineer in Seattle").await;
        assert!(matches!(
            result,
            Err(AppError::Search(SearchError::Timeout))
        ));
    }

    #[tokio::test]
    async fn test_malformed_llm_output_is_extraction_error() {
        let llm = StubLlm::new(&["Sure, here are some thoughts about your search..."]);
        let search = StubSearch::returning(vec![]);
        let state = test_state(llm, Arc::clone(&search));

        let result = run_turn(&state, "alice", "software engineer in Seattle").await;
        assert!(matches!(
            result,
            Err(AppError::Extraction(ExtractionError::Malformed(_)))
        ));
        assert_eq!(search.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_history_accumulates_across_turns() {
        let llm = StubLlm::new(&[
            r#"{"continuation": "Which location?"}"#,
            r#"{"job_title": "Software Engineer", "location": "San Francisco"}"#,
            "Found several roles in San Francisco.",
        ]);
        let search = StubSearch::returning(vec![job("Software Engineer")]);
        let state = test_state(llm, search);

        run_turn(&state, "alice", "I want a software engineer job")
            .await
            .unwrap();
        run_turn(&state, "alice", "San Francisco").await.unwrap();

        let handle = state.sessions.get_or_create("alice").await;
        let session = handle.lock().await;
        let roles: Vec<Role> = session.messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::User, Role::Assistant, Role::User, Role::Assistant]
        );
        assert_eq!(session.messages[2].content, "San Francisco");
    }

    #[tokio::test]
    async fn test_message_is_appended_before_failed_dispatch() {
        let llm = StubLlm::new(&[r#"{"job_title": "Software Engineer", "location": "Seattle"}"#]);
        let search = StubSearch::failing(|| SearchError::Quota);
        let state = test_state(llm, search);

        let _ = run_turn(&state, "alice", "software engineer in Seattle").await;

        // A retried turn must see the message that triggered the failure.
        let handle = state.sessions.get_or_create("alice").await;
        assert_eq!(handle.lock().await.messages.len(), 1);
    }
}
