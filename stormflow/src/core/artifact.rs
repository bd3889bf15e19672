//! Artifacts produced by the outlining, drafting and polishing stages.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One heading of an outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineSection {
    /// Nesting depth, 1 being the shallowest.
    pub level: u8,
    /// Heading text.
    pub title: String,
}

impl OutlineSection {
    /// Creates a new section.
    #[must_use]
    pub fn new(level: u8, title: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
        }
    }
}

/// Ordered, possibly nested section plan for the article.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outline {
    /// Sections in document order.
    pub sections: Vec<OutlineSection>,
}

impl Outline {
    /// Creates an outline from sections.
    #[must_use]
    pub fn new(sections: Vec<OutlineSection>) -> Self {
        Self { sections }
    }

    /// Parses markdown headings and bullet lines into an outline.
    ///
    /// Bullets nest one level below the most recent heading (plus two spaces
    /// of indentation per extra level). A leading level-1 heading that merely
    /// restates the topic is dropped. Lines that are neither are ignored.
    #[must_use]
    pub fn parse(raw: &str, topic: &str) -> Self {
        let mut sections = Vec::new();
        let mut heading_level: u8 = 0;

        for line in raw.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let (level, title) = if trimmed.starts_with('#') {
                let hashes = trimmed.chars().take_while(|c| *c == '#').count();
                if hashes > 6 {
                    continue;
                }
                let level = u8::try_from(hashes).unwrap_or(6);
                heading_level = level;
                (level, trimmed[hashes..].trim().trim_end_matches('#'))
            } else if let Some(rest) = strip_bullet(trimmed) {
                let indent = line.len() - line.trim_start().len();
                let depth = u8::try_from(indent / 2).unwrap_or(4).min(4);
                (heading_level.saturating_add(1).saturating_add(depth), rest)
            } else {
                continue;
            };

            let title = clean_title(title);
            if !title.is_empty() {
                sections.push(OutlineSection::new(level, title));
            }
        }

        if sections
            .first()
            .is_some_and(|s| s.level == 1 && s.title.eq_ignore_ascii_case(topic.trim()))
        {
            sections.remove(0);
        }

        Self { sections }
    }

    /// Returns true if there are no sections.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Number of sections at every depth.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// Groups the outline under its shallowest sections.
    ///
    /// Each entry is a top-level section together with the deeper sections
    /// that follow it.
    #[must_use]
    pub fn top_level(&self) -> Vec<(&OutlineSection, Vec<&OutlineSection>)> {
        let Some(min_level) = self.sections.iter().map(|s| s.level).min() else {
            return Vec::new();
        };

        let mut groups: Vec<(&OutlineSection, Vec<&OutlineSection>)> = Vec::new();
        for section in &self.sections {
            if section.level == min_level {
                groups.push((section, Vec::new()));
            } else if let Some((_, children)) = groups.last_mut() {
                children.push(section);
            }
        }
        groups
    }

    /// Renders the outline back to markdown headings.
    #[must_use]
    pub fn render(&self) -> String {
        self.sections
            .iter()
            .map(|s| format!("{} {}", "#".repeat(usize::from(s.level.max(1))), s.title))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn strip_bullet(line: &str) -> Option<&str> {
    for marker in ["- ", "* ", "+ "] {
        if let Some(rest) = line.strip_prefix(marker) {
            return Some(rest);
        }
    }
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(rest) = rest.strip_prefix(". ").or_else(|| rest.strip_prefix(") ")) {
            return Some(rest);
        }
    }
    None
}

fn clean_title(title: &str) -> String {
    title
        .trim()
        .trim_end_matches(':')
        .trim_matches('*')
        .trim_end_matches(':')
        .trim()
        .to_string()
}

/// One drafted section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftSection {
    /// Top-level outline heading this section was written for.
    pub heading: String,
    /// Section prose.
    pub body: String,
}

impl DraftSection {
    /// Creates a new draft section.
    #[must_use]
    pub fn new(heading: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            heading: heading.into(),
            body: body.into(),
        }
    }
}

/// Unpolished article whose sections follow the outline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    /// Sections in outline order.
    pub sections: Vec<DraftSection>,
}

impl Draft {
    /// Creates a draft from sections.
    #[must_use]
    pub fn new(sections: Vec<DraftSection>) -> Self {
        Self { sections }
    }

    /// Returns true if no section has any prose.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.iter().all(|s| s.body.trim().is_empty())
    }

    /// Total word count of all section bodies.
    #[must_use]
    pub fn word_count(&self) -> usize {
        self.sections
            .iter()
            .map(|s| s.body.split_whitespace().count())
            .sum()
    }

    /// Renders the draft as markdown.
    #[must_use]
    pub fn render(&self) -> String {
        self.sections
            .iter()
            .map(|s| format!("## {}\n\n{}", s.heading, s.body.trim()))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// The final polished article. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Article {
    text: String,
}

impl Article {
    /// Wraps the text, returning `None` if it is blank.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self {
                text: trimmed.to_string(),
            })
        }
    }

    /// Returns the article text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Consumes the article, returning its text.
    #[must_use]
    pub fn into_string(self) -> String {
        self.text
    }

    /// Number of whitespace-separated words.
    #[must_use]
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }

    /// Splits the article into chunks of at most `words_per_chunk` words.
    ///
    /// Joining the chunks with single spaces yields the article's words
    /// separated by single spaces.
    #[must_use]
    pub fn chunks(&self, words_per_chunk: usize) -> Vec<String> {
        let words: Vec<&str> = self.text.split_whitespace().collect();
        words
            .chunks(words_per_chunk.max(1))
            .map(|chunk| chunk.join(" "))
            .collect()
    }
}

impl fmt::Display for Article {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_markdown_outline() {
        let raw = "# Photosynthesis\n## Overview\n## Light reactions\n### Photosystem II\n## Calvin cycle\n";
        let outline = Outline::parse(raw, "photosynthesis");

        assert_eq!(
            outline.sections,
            vec![
                OutlineSection::new(2, "Overview"),
                OutlineSection::new(2, "Light reactions"),
                OutlineSection::new(3, "Photosystem II"),
                OutlineSection::new(2, "Calvin cycle"),
            ]
        );
    }

    #[test]
    fn test_parse_keeps_h1_that_is_not_topic() {
        let outline = Outline::parse("# Background\n# Impact", "Rust");
        assert_eq!(outline.len(), 2);
        assert_eq!(outline.sections[0].title, "Background");
    }

    #[test]
    fn test_parse_bullets_nest_under_heading() {
        let raw = "## History\n- Early work\n  - Pioneers\n1. Modern era\nRandom prose line";
        let outline = Outline::parse(raw, "x");

        assert_eq!(
            outline.sections,
            vec![
                OutlineSection::new(2, "History"),
                OutlineSection::new(3, "Early work"),
                OutlineSection::new(4, "Pioneers"),
                OutlineSection::new(3, "Modern era"),
            ]
        );
    }

    #[test]
    fn test_parse_cleans_titles() {
        let outline = Outline::parse("## **Overview**:\n## ###\n#######  too deep", "x");
        assert_eq!(outline.sections, vec![OutlineSection::new(2, "Overview")]);
    }

    #[test]
    fn test_parse_nothing_usable() {
        assert!(Outline::parse("Sorry, I cannot help with that.", "x").is_empty());
        assert!(Outline::parse("", "x").is_empty());
    }

    #[test]
    fn test_top_level_groups() {
        let outline = Outline::new(vec![
            OutlineSection::new(2, "A"),
            OutlineSection::new(3, "A.1"),
            OutlineSection::new(3, "A.2"),
            OutlineSection::new(2, "B"),
        ]);
        let groups = outline.top_level();

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0.title, "A");
        assert_eq!(groups[0].1.len(), 2);
        assert!(groups[1].1.is_empty());
    }

    #[test]
    fn test_outline_render() {
        let outline = Outline::new(vec![OutlineSection::new(1, "A"), OutlineSection::new(2, "B")]);
        assert_eq!(outline.render(), "# A\n## B");
    }

    #[test]
    fn test_draft_render_and_counts() {
        let draft = Draft::new(vec![
            DraftSection::new("Intro", "one two three"),
            DraftSection::new("Body", "four five"),
        ]);
        assert_eq!(draft.word_count(), 5);
        assert!(!draft.is_empty());
        assert_eq!(draft.render(), "## Intro\n\none two three\n\n## Body\n\nfour five");
        assert!(Draft::new(vec![DraftSection::new("x", "  ")]).is_empty());
    }

    #[test]
    fn test_article_rejects_blank() {
        assert!(Article::new("  \n ").is_none());
        assert_eq!(Article::new("  text ").unwrap().as_str(), "text");
    }

    #[test]
    fn test_article_chunks_rejoin() {
        let article = Article::new("The quick  brown\nfox jumps over the lazy dog").unwrap();
        let chunks = article.chunks(4);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], "The quick brown fox");
        assert_eq!(
            chunks.join(" "),
            "The quick brown fox jumps over the lazy dog"
        );
        assert_eq!(article.chunks(0).len(), article.word_count());
    }
}
