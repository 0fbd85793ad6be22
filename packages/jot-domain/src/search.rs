use serde::Serialize;

use crate::{Error, ItemId, Result};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResultItem {
	pub note_id: ItemId,
	pub title: String,
	pub snippet: String,
	pub relevance_score: f32,
}
impl SearchResultItem {
	pub fn new(note_id: &str, title: String, snippet: String, relevance_score: f32) -> Result<Self> {
		let note_id = ItemId::parse("note_id", note_id)?;

		if !relevance_score.is_finite() || !(0.0..=1.0).contains(&relevance_score) {
			return Err(Error::validation("relevance_score", "must be between 0.0 and 1.0."));
		}

		Ok(Self { note_id, title, snippet, relevance_score })
	}
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
	pub query: String,
	pub items: Vec<SearchResultItem>,
	pub total_count: usize,
	pub has_more: bool,
	/// Zero when served from cache.
	pub execution_time_ms: u64,
}
