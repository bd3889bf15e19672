//! Prompt construction and completion parsing.
//!
//! Every prompt opens with a task header line followed by a `Topic:` line so
//! that providers (and the mock) can tell the stages apart.

use crate::core::{KnowledgeBase, OutlineSection};
use regex::Regex;
use std::fmt::Write;
use std::sync::OnceLock;

/// Header of the query-generation prompt.
pub const TASK_GENERATE_QUERIES: &str = "TASK: generate-queries";
/// Header of the outline prompt.
pub const TASK_OUTLINE: &str = "TASK: outline";
/// Header of the section-drafting prompt.
pub const TASK_DRAFT_SECTION: &str = "TASK: draft-section";
/// Header of the polishing prompt.
pub const TASK_POLISH: &str = "TASK: polish";

/// Upper bound on the source digest embedded in a prompt, in bytes.
pub const MAX_SOURCES_CHARS: usize = 6000;

/// Prompt asking for up to `max_queries` search queries for one curation turn.
#[must_use]
pub fn generate_queries(
    topic: &str,
    turn: usize,
    max_queries: usize,
    asked: &[String],
    known_sources: usize,
) -> String {
    let mut prompt = format!("{TASK_GENERATE_QUERIES}\nTopic: {topic}\nTurn: {turn}\n");
    if !asked.is_empty() {
        prompt.push_str("Already searched:\n");
        for query in asked {
            let _ = writeln!(prompt, "- {query}");
        }
    }
    let _ = write!(
        prompt,
        "Known sources: {known_sources}\n\n\
         You are researching the topic above for an encyclopedic article. \
         Write up to {max_queries} new web search queries that would uncover \
         facts not yet covered. Reply with one query per line and nothing else."
    );
    prompt
}

/// Prompt asking for a hierarchical markdown outline.
#[must_use]
pub fn outline(topic: &str, knowledge: &KnowledgeBase) -> String {
    format!(
        "{TASK_OUTLINE}\nTopic: {topic}\n\nSources:\n{}\n\n\
         Write an outline for a Wikipedia-style article on the topic using the \
         sources. Use \"#\" for sections and \"##\" for subsections. Do not \
         include the topic itself as a heading. Output only the outline.",
        knowledge.summary(MAX_SOURCES_CHARS)
    )
}

/// Prompt asking for the prose of one top-level section.
#[must_use]
pub fn draft_section(
    topic: &str,
    section: &OutlineSection,
    subsections: &[&OutlineSection],
    knowledge: &KnowledgeBase,
) -> String {
    let mut prompt = format!(
        "{TASK_DRAFT_SECTION}\nTopic: {topic}\nSection: {}\n",
        section.title
    );
    if !subsections.is_empty() {
        prompt.push_str("Subsections:\n");
        for sub in subsections {
            let indent = "  ".repeat(usize::from(sub.level.saturating_sub(section.level + 1)));
            let _ = writeln!(prompt, "{indent}- {}", sub.title);
        }
    }
    let _ = write!(
        prompt,
        "\nSources:\n{}\n\n\
         Write the body of this section in neutral encyclopedic prose, covering \
         the subsections in order. Do not repeat the section heading.",
        knowledge.summary(MAX_SOURCES_CHARS)
    );
    prompt
}

/// Prompt asking for the final article from a rendered draft.
#[must_use]
pub fn polish(topic: &str, draft: &str) -> String {
    format!(
        "{TASK_POLISH}\nTopic: {topic}\n\nDraft:\n{draft}\n\n\
         Polish the draft above into the final article. Add a short lead \
         summary, remove repetition, and keep the section structure. Output \
         only the article."
    )
}

/// Returns the value of the first `<name>: value` line of a prompt.
#[must_use]
pub fn field<'a>(prompt: &'a str, name: &str) -> Option<&'a str> {
    prompt.lines().find_map(|line| {
        line.strip_prefix(name)
            .and_then(|rest| rest.strip_prefix(':'))
            .map(str::trim)
    })
}

/// Returns the text following the `Draft:` line of a polishing prompt.
#[must_use]
pub fn draft_body(prompt: &str) -> Option<&str> {
    let start = prompt.find("\nDraft:\n")? + "\nDraft:\n".len();
    let rest = &prompt[start..];
    let end = rest.rfind("\n\nPolish the draft").unwrap_or(rest.len());
    Some(rest[..end].trim())
}

fn list_marker() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| {
        Regex::new(r"^\s*(?:[-*+•]|\d+[.)]|[qQ]uery\s*\d*\s*:)\s*").expect("static pattern")
    })
}

/// Extracts search queries from a completion, one per line.
///
/// List markers and surrounding quotes are stripped; blank lines and
/// case-insensitive duplicates are dropped. At most `max` queries are returned.
#[must_use]
pub fn parse_queries(raw: &str, max: usize) -> Vec<String> {
    let mut queries: Vec<String> = Vec::new();
    for line in raw.lines() {
        if queries.len() >= max {
            break;
        }
        let query = list_marker()
            .replace(line, "")
            .trim()
            .trim_matches(|c: char| c == '"' || c == '\'' || c == '`')
            .trim()
            .to_string();
        if query.is_empty() || queries.iter().any(|q| q.eq_ignore_ascii_case(&query)) {
            continue;
        }
        queries.push(query);
    }
    queries
}
