// LLM prompt constants for the result summary call.

/// System prompt for the relevance summary — plain prose, not JSON.
pub const SUMMARY_SYSTEM: &str =
    "You are a concise job-search assistant. Respond with one or two plain \
    sentences. No markdown, no lists, no preamble.";

/// Summary prompt template.
/// Replace `{job_title}`, `{location}`, and `{postings}` before sending.
pub const SUMMARY_PROMPT_TEMPLATE: &str = r#"The user searched for "{job_title}" roles in {location}. These postings came back:

{postings}

Summarize in one or two sentences how well these postings match the search, so the user knows what to look at first."#;
