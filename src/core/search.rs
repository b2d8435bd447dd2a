//! Fuzzy text matching over prompt metadata.

use super::models::Prompt;
use nucleo_matcher::pattern::{AtomKind, CaseMatching, Normalization, Pattern};
use nucleo_matcher::{Config, Matcher, Utf32Str};

/// Scores prompts against a free-text query.
///
/// Each prompt is matched through a single haystack built from its title,
/// description, identifier and tags; results come back sorted by
/// descending score.
pub struct FuzzySearcher {
    matcher: Matcher,
}

impl Default for FuzzySearcher {
    fn default() -> Self {
        Self::new()
    }
}

impl FuzzySearcher {
    pub fn new() -> Self {
        FuzzySearcher {
            matcher: Matcher::new(Config::DEFAULT),
        }
    }

    /// Score a single haystack; `None` when the query does not match.
    pub fn score(&mut self, query: &str, haystack: &str) -> Option<u32> {
        if query.is_empty() {
            return Some(0);
        }
        if haystack.is_empty() {
            return None;
        }
        let pattern = Pattern::new(
            query,
            CaseMatching::Smart,
            Normalization::Smart,
            AtomKind::Fuzzy,
        );
        let mut buf = Vec::new();
        pattern.score(Utf32Str::new(haystack, &mut buf), &mut self.matcher)
    }

    /// Filter and rank prompts by match quality.
    ///
    /// An empty query returns the input unchanged, in enumeration order.
    pub fn search(&mut self, query: &str, prompts: Vec<Prompt>) -> Vec<Prompt> {
        if query.is_empty() {
            return prompts;
        }
        let mut scored: Vec<(u32, Prompt)> = prompts
            .into_iter()
            .filter_map(|p| self.score(query, &p.search_text()).map(|s| (s, p)))
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.into_iter().map(|(_, p)| p).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::path::PathBuf;

    fn prompt(id: &str, title: &str, tags: &[&str]) -> Prompt {
        let now = Utc::now();
        Prompt {
            id: id.to_string(),
            version: "1.0.0".to_string(),
            title: title.to_string(),
            description: String::new(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            variables: vec![],
            template_ref: None,
            created_at: now,
            updated_at: now,
            content: String::new(),
            file_path: PathBuf::from(format!("prompts/{}.md", id)),
            content_hash: String::new(),
        }
    }

    #[test]
    fn empty_query_returns_all_in_order() {
        let mut searcher = FuzzySearcher::new();
        let prompts = vec![prompt("b", "Beta", &[]), prompt("a", "Alpha", &[])];
        let results = searcher.search("", prompts.clone());
        assert_eq!(results, prompts);
    }

    #[test]
    fn matches_subsequences_and_drops_non_matches() {
        let mut searcher = FuzzySearcher::new();
        let prompts = vec![
            prompt("hello", "hello world", &[]),
            prompt("zzz", "zzz", &[]),
        ];
        let results = searcher.search("hel", prompts);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "hello");
    }

    #[test]
    fn matches_against_tags() {
        let mut searcher = FuzzySearcher::new();
        let prompts = vec![
            prompt("a", "untitled", &["machine-learning"]),
            prompt("b", "untitled", &["cooking"]),
        ];
        let results = searcher.search("machine", prompts);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "a");
    }

    #[test]
    fn exact_title_outranks_scattered_match() {
        let mut searcher = FuzzySearcher::new();
        let prompts = vec![
            prompt("scattered", "r-e-v-i-e-w notes", &[]),
            prompt("exact", "review", &[]),
        ];
        let results = searcher.search("review", prompts);
        assert_eq!(results[0].id, "exact");
    }
}
