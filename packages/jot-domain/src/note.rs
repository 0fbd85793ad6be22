use serde::Serialize;

use crate::{Error, ItemId, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkupLanguage {
	#[default]
	Markdown,
	Html,
}
impl MarkupLanguage {
	/// Joplin encodes markdown as 1 and HTML as 2; anything else falls back to markdown.
	pub fn from_code(code: Option<i64>) -> Self {
		match code {
			Some(2) => Self::Html,
			_ => Self::Markdown,
		}
	}
}

/// Unvalidated note fields as they arrive from the upstream service.
#[derive(Debug, Clone, Default)]
pub struct NoteDraft {
	pub id: String,
	pub title: String,
	pub body: Option<String>,
	pub parent_id: String,
	pub created_time: i64,
	pub updated_time: i64,
	pub is_conflict: bool,
	pub markup_language: Option<i64>,
	pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Note {
	pub id: ItemId,
	pub title: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub body: Option<String>,
	pub parent_id: ItemId,
	pub created_time: i64,
	pub updated_time: i64,
	pub is_conflict: bool,
	pub markup_language: MarkupLanguage,
	pub tags: Vec<String>,
}
impl Note {
	pub fn new(draft: NoteDraft) -> Result<Self> {
		let id = ItemId::parse("id", &draft.id)?;
		let parent_id = ItemId::parse("parent_id", &draft.parent_id)?;

		check_timestamp("created_time", draft.created_time)?;
		check_timestamp("updated_time", draft.updated_time)?;

		let tags = draft
			.tags
			.into_iter()
			.map(|tag| tag.trim().to_string())
			.filter(|tag| !tag.is_empty())
			.collect();

		Ok(Self {
			id,
			title: draft.title,
			body: draft.body,
			parent_id,
			created_time: draft.created_time,
			updated_time: draft.updated_time,
			is_conflict: draft.is_conflict,
			markup_language: MarkupLanguage::from_code(draft.markup_language),
			tags,
		})
	}

	pub fn summary(&self) -> NoteSummary {
		NoteSummary {
			id: self.id.clone(),
			title: self.title.clone(),
			parent_id: self.parent_id.clone(),
			created_time: self.created_time,
			updated_time: self.updated_time,
		}
	}
}

/// Listing view of a note, without body or tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteSummary {
	pub id: ItemId,
	pub title: String,
	pub parent_id: ItemId,
	pub created_time: i64,
	pub updated_time: i64,
}
impl NoteSummary {
	pub fn new(
		id: &str,
		title: String,
		parent_id: &str,
		created_time: i64,
		updated_time: i64,
	) -> Result<Self> {
		let id = ItemId::parse("id", id)?;
		let parent_id = ItemId::parse("parent_id", parent_id)?;

		check_timestamp("created_time", created_time)?;
		check_timestamp("updated_time", updated_time)?;

		Ok(Self { id, title, parent_id, created_time, updated_time })
	}
}

/// Splits a comma-separated tag string into trimmed, non-empty tags.
pub fn parse_tags(raw: &str) -> Vec<String> {
	raw.split(',').map(str::trim).filter(|tag| !tag.is_empty()).map(str::to_string).collect()
}

pub(crate) fn check_timestamp(field: &'static str, value: i64) -> Result<()> {
	if value <= 0 {
		return Err(Error::validation(field, "must be a positive Unix timestamp in milliseconds."));
	}

	Ok(())
}
