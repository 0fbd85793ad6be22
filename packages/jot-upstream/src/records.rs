//! Wire records returned by the Joplin Web Clipper API.

use serde::{Deserialize, Deserializer};

use jot_domain::{NoteDraft, NotebookDraft};

/// One page of a paginated Joplin listing.
#[derive(Debug, Deserialize)]
pub struct Page<T> {
	#[serde(default = "Vec::new")]
	pub items: Vec<T>,
	#[serde(default)]
	pub has_more: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawItem {
	pub id: String,
	#[serde(default)]
	pub title: String,
	#[serde(default)]
	pub body: Option<String>,
	#[serde(default)]
	pub parent_id: Option<String>,
	#[serde(default)]
	pub created_time: i64,
	#[serde(default)]
	pub updated_time: i64,
	#[serde(default, deserialize_with = "deserialize_flag")]
	pub is_conflict: bool,
	#[serde(default)]
	pub markup_language: Option<i64>,
	#[serde(default, deserialize_with = "deserialize_tags")]
	pub tags: Vec<String>,
}
impl RawItem {
	pub fn into_note_draft(self) -> NoteDraft {
		NoteDraft {
			id: self.id,
			title: self.title,
			body: self.body,
			parent_id: self.parent_id.unwrap_or_default(),
			created_time: self.created_time,
			updated_time: self.updated_time,
			is_conflict: self.is_conflict,
			markup_language: self.markup_language,
			tags: self.tags,
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawContainer {
	pub id: String,
	#[serde(default)]
	pub title: String,
	#[serde(default)]
	pub parent_id: Option<String>,
	#[serde(default)]
	pub created_time: i64,
	#[serde(default)]
	pub updated_time: i64,
}
impl RawContainer {
	pub fn into_notebook_draft(self) -> NotebookDraft {
		NotebookDraft {
			id: self.id,
			title: self.title,
			parent_id: self.parent_id,
			created_time: self.created_time,
			updated_time: self.updated_time,
		}
	}

	/// Joplin reports root folders with an empty parent id.
	pub fn is_child_of(&self, parent_id: Option<&str>) -> bool {
		let own = self.parent_id.as_deref().filter(|value| !value.is_empty());

		match (own, parent_id) {
			(None, None) => true,
			(Some(own), Some(parent)) => own.eq_ignore_ascii_case(parent),
			_ => false,
		}
	}
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TagsField {
	Text(String),
	List(Vec<serde_json::Value>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FlagField {
	Bool(bool),
	Number(i64),
}

fn deserialize_tags<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
	D: Deserializer<'de>,
{
	let raw = Option::<TagsField>::deserialize(deserializer)?;
	let tags = match raw {
		None => Vec::new(),
		Some(TagsField::Text(text)) => jot_domain::parse_tags(&text),
		Some(TagsField::List(values)) => values
			.into_iter()
			.map(|value| match value {
				serde_json::Value::String(text) => text.trim().to_string(),
				other => other.to_string(),
			})
			.filter(|tag| !tag.is_empty())
			.collect(),
	};

	Ok(tags)
}

fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
	D: Deserializer<'de>,
{
	let raw = Option::<FlagField>::deserialize(deserializer)?;

	Ok(match raw {
		None => false,
		Some(FlagField::Bool(value)) => value,
		Some(FlagField::Number(value)) => value != 0,
	})
}
