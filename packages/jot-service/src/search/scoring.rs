//! Relevance scoring and snippet extraction for upstream search hits.
//!
//! The signal weights are empirical and kept stable so rankings stay comparable across releases.

use regex::Regex;

use jot_domain::ItemId;

pub const MAX_QUERY_CHARS: usize = 200;
pub const MAX_SNIPPET_CHARS: usize = 200;
pub const MIN_SCORE: f32 = 0.1;

const SNIPPET_LEAD_CHARS: usize = 50;
const ELLIPSIS: &str = "...";

const TITLE_MATCH: f64 = 1.0;
const TITLE_EXACT_BONUS: f64 = 0.5;
const TITLE_PREFIX_BONUS: f64 = 0.3;
const BODY_OCCURRENCE: f64 = 0.1;
const BODY_CAP: f64 = 0.5;
const TITLE_WORD_BONUS: f64 = 0.2;
const BODY_WORD_BONUS: f64 = 0.1;
const TAG_MATCH: f64 = 0.1;
const TAG_CAP: f64 = 0.3;
const NORMALIZER: f64 = 2.0;

/// Collapses whitespace runs and caps the query at [`MAX_QUERY_CHARS`] characters.
pub fn sanitize_query(raw: &str) -> String {
	let collapsed = collapse_whitespace(raw);

	if collapsed.chars().count() <= MAX_QUERY_CHARS {
		return collapsed;
	}

	collapsed.chars().take(MAX_QUERY_CHARS).collect::<String>().trim_end().to_string()
}

pub fn cache_key(query: &str, limit: usize, container_id: Option<&ItemId>) -> String {
	let container = container_id.map_or("all", ItemId::as_str);

	format!("{}:{limit}:{container}", query.trim().to_lowercase())
}

/// Scores and summarizes hits for one normalized query.
pub struct QueryMatcher {
	query: String,
	word: Option<Regex>,
}
impl QueryMatcher {
	pub fn new(query: &str) -> Self {
		let query = query.trim().to_lowercase();
		let word = if query.is_empty() {
			None
		} else {
			Regex::new(&format!(r"\b{}\b", regex::escape(&query))).ok()
		};

		Self { query, word }
	}

	pub fn query(&self) -> &str {
		&self.query
	}

	/// Relevance in `[MIN_SCORE, 1.0]`.
	///
	/// `tags` only contributes when the upstream client returns them. The HTTP client does not
	/// request tags from the search endpoint, so there the tag signal is always zero.
	pub fn relevance(&self, title: &str, body: &str, tags: &[String]) -> f32 {
		let query = self.query.as_str();

		if query.is_empty() {
			return MIN_SCORE;
		}

		let title = title.to_lowercase();
		let body = body.to_lowercase();
		let mut score = 0.0;

		if title.contains(query) {
			score += TITLE_MATCH;

			if title == query {
				score += TITLE_EXACT_BONUS;
			} else if title.starts_with(query) {
				score += TITLE_PREFIX_BONUS;
			}
		}

		let occurrences = body.matches(query).count();

		score += (occurrences as f64 * BODY_OCCURRENCE).min(BODY_CAP);

		if let Some(word) = &self.word {
			if word.is_match(&title) {
				score += TITLE_WORD_BONUS;
			}
			if word.is_match(&body) {
				score += BODY_WORD_BONUS;
			}
		}

		let tag_matches = tags.iter().filter(|tag| tag.to_lowercase().contains(query)).count();

		score += (tag_matches as f64 * TAG_MATCH).min(TAG_CAP);

		((score / NORMALIZER).min(1.0) as f32).max(MIN_SCORE)
	}

	pub fn snippet(&self, title: &str, body: &str) -> String {
		let query = self.query.as_str();

		if title.to_lowercase().contains(query) || body.is_empty() {
			return truncate_chars(title, MAX_SNIPPET_CHARS);
		}

		let Some(match_pos) = find_char_position(body, query) else {
			let longer = if body.chars().count() > title.chars().count() { body } else { title };

			return truncate_chars(longer, MAX_SNIPPET_CHARS);
		};
		let chars: Vec<char> = body.chars().collect();
		let mut start = match_pos.saturating_sub(SNIPPET_LEAD_CHARS);
		let end = (start + MAX_SNIPPET_CHARS).min(chars.len());

		// Pull the window back so matches near the end still get a full snippet.
		if end - start < MAX_SNIPPET_CHARS {
			start = end.saturating_sub(MAX_SNIPPET_CHARS);
		}

		let mut window: String = chars[start..end].iter().collect();

		if start > 0 {
			window.insert_str(0, ELLIPSIS);
		}
		if end < chars.len() {
			window.push_str(ELLIPSIS);
		}

		collapse_whitespace(&window)
	}
}

fn collapse_whitespace(text: &str) -> String {
	text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_chars(text: &str, max: usize) -> String {
	text.chars().take(max).collect()
}

/// Character index in `haystack` of the first case-insensitive occurrence of `needle_lower`.
fn find_char_position(haystack: &str, needle_lower: &str) -> Option<usize> {
	let mut lowered = String::with_capacity(haystack.len());
	// Byte offset in `lowered` where each lowered char starts, with its source char index.
	let mut origins = Vec::with_capacity(haystack.len());

	for (index, ch) in haystack.chars().enumerate() {
		for lower in ch.to_lowercase() {
			origins.push((lowered.len(), index));
			lowered.push(lower);
		}
	}

	let byte = lowered.find(needle_lower)?;
	let slot = origins.binary_search_by_key(&byte, |(offset, _)| *offset).ok()?;

	Some(origins[slot].1)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn tags(values: &[&str]) -> Vec<String> {
		values.iter().map(|value| value.to_string()).collect()
	}

	#[test]
	fn title_match_outranks_body_match() {
		let matcher = QueryMatcher::new("project");
		let title_hit = matcher.relevance("Project Plan", "", &[]);
		let body_hit = matcher.relevance("Notes", "about project work", &[]);

		assert!((title_hit - 0.75).abs() < 1e-6);
		assert!((body_hit - MIN_SCORE).abs() < 1e-6);
		assert!(title_hit > body_hit);
	}

	#[test]
	fn exact_title_and_all_signals_cap_at_one() {
		let matcher = QueryMatcher::new("rust");
		let body = "rust rust rust rust rust rust";
		let score = matcher.relevance("Rust", body, &tags(&["rust", "rustlang", "trust"]));

		assert!((score - 1.0).abs() < 1e-6);
	}

	#[test]
	fn body_occurrences_have_diminishing_returns() {
		let matcher = QueryMatcher::new("ab");
		let three = matcher.relevance("zz", "ab-ab-ab", &[]);
		let ten = matcher.relevance("zz", &"ab ".repeat(10), &[]);

		// 3 * 0.1 + 0.1 word bonus, halved.
		assert!((three - 0.2).abs() < 1e-6);
		// Capped at 0.5 + 0.1 word bonus, halved.
		assert!((ten - 0.3).abs() < 1e-6);
	}

	#[test]
	fn partial_words_miss_the_word_bonus() {
		let matcher = QueryMatcher::new("plan");
		let whole = matcher.relevance("The plan", "", &[]);
		let partial = matcher.relevance("Planning", "", &[]);

		// Contains + word bonus vs contains + prefix bonus.
		assert!((whole - 0.6).abs() < 1e-6);
		assert!((partial - 0.65).abs() < 1e-6);
	}

	#[test]
	fn tags_only_score_when_supplied() {
		let matcher = QueryMatcher::new("plan");
		let untagged = matcher.relevance("Project Plan", "", &[]);
		let tagged = matcher.relevance("Project Plan", "", &tags(&["planning", "plan", "misc"]));

		// Contains + word bonus, plus two tag hits when the client returns tags.
		assert!((untagged - 0.6).abs() < 1e-6);
		assert!((tagged - 0.7).abs() < 1e-6);
	}

	#[test]
	fn regex_metacharacters_are_literal() {
		let matcher = QueryMatcher::new("c++");
		let score = matcher.relevance("Learning C++ today", "", &[]);

		assert!(score >= 0.5);
	}

	#[test]
	fn snippet_prefers_title_on_title_match() {
		let matcher = QueryMatcher::new("plan");

		assert_eq!(matcher.snippet("Project Plan", "body text"), "Project Plan");
	}

	#[test]
	fn snippet_windows_around_body_match() {
		let matcher = QueryMatcher::new("needle");
		let body = format!("{}needle{}", "a".repeat(300), "b".repeat(300));
		let snippet = matcher.snippet("Haystack", &body);

		assert!(snippet.starts_with("..."));
		assert!(snippet.ends_with("..."));
		assert!(snippet.contains("needle"));
		assert_eq!(snippet.chars().count(), MAX_SNIPPET_CHARS + 6);
	}

	#[test]
	fn snippet_near_end_keeps_full_window() {
		let matcher = QueryMatcher::new("tail");
		let body = format!("{}tail", "x".repeat(400));
		let snippet = matcher.snippet("Doc", &body);

		assert!(snippet.starts_with("..."));
		assert!(!snippet.ends_with("..."));
		assert_eq!(snippet.chars().count(), MAX_SNIPPET_CHARS + 3);
	}

	#[test]
	fn snippet_collapses_whitespace() {
		let matcher = QueryMatcher::new("word");

		assert_eq!(matcher.snippet("Doc", "a  word\n\n here"), "a word here");
	}

	#[test]
	fn snippet_without_match_uses_longer_text() {
		let matcher = QueryMatcher::new("absent");

		assert_eq!(matcher.snippet("T", "Longer body"), "Longer body");
		assert_eq!(matcher.snippet("Longer title", "b"), "Longer title");
	}

	#[test]
	fn snippet_handles_multibyte_text() {
		let matcher = QueryMatcher::new("café");
		let body = format!("{}CAFÉ au lait", "é".repeat(260));
		let snippet = matcher.snippet("Menu", &body);

		assert!(snippet.contains("CAFÉ"));
		assert!(snippet.chars().count() <= MAX_SNIPPET_CHARS + 6);
	}

	#[test]
	fn sanitize_collapses_and_caps() {
		assert_eq!(sanitize_query("  two   words \n"), "two words");
		assert_eq!(sanitize_query(&"q".repeat(250)).chars().count(), MAX_QUERY_CHARS);
	}

	#[test]
	fn cache_key_normalizes_query_and_container() {
		let container =
			ItemId::parse("notebook_id", "0123456789ABCDEF0123456789ABCDEF").expect("valid id");

		assert_eq!(cache_key(" Rust ", 5, None), "rust:5:all");
		assert_eq!(
			cache_key("rust", 5, Some(&container)),
			"rust:5:0123456789abcdef0123456789abcdef"
		);
	}
}
