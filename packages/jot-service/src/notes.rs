use serde::Serialize;

use crate::{Error, JotService, Result};
use jot_domain::{ItemId, Note, NoteSummary};

pub const DEFAULT_PAGE_LIMIT: usize = 20;
pub const MAX_PAGE_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteFetchRequest {
	pub note_id: ItemId,
	pub include_body: bool,
}
impl NoteFetchRequest {
	pub fn new(note_id: &str, include_body: Option<bool>) -> Result<Self> {
		Ok(Self {
			note_id: ItemId::parse("note_id", note_id)?,
			include_body: include_body.unwrap_or(true),
		})
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotebookNotesRequest {
	pub notebook_id: ItemId,
	pub limit: usize,
	pub offset: usize,
}
impl NotebookNotesRequest {
	pub fn new(notebook_id: &str, limit: Option<i64>, offset: Option<i64>) -> Result<Self> {
		let notebook_id = ItemId::parse("notebook_id", notebook_id)?;
		let limit = match limit {
			None => DEFAULT_PAGE_LIMIT,
			Some(value) if (1..=MAX_PAGE_LIMIT as i64).contains(&value) => value as usize,
			Some(_) =>
				return Err(Error::Validation {
					message: format!("limit must be between 1 and {MAX_PAGE_LIMIT}."),
				}),
		};
		let offset = match offset {
			None => 0,
			Some(value) => usize::try_from(value).map_err(|_| Error::Validation {
				message: "offset must be zero or greater.".to_string(),
			})?,
		};

		Ok(Self { notebook_id, limit, offset })
	}
}

#[derive(Debug, Clone, Serialize)]
pub struct NotebookPage {
	pub notes: Vec<NoteSummary>,
	/// Lower bound: notes seen so far, counting the skipped offset.
	pub total_count: usize,
	pub has_more: bool,
}

impl JotService {
	pub async fn get_note(&self, req: NoteFetchRequest) -> Result<Note> {
		self.guard("get_note").await?;

		let raw = self
			.upstream
			.fetch_item(req.note_id.as_str(), req.include_body)
			.await
			.map_err(|err| Error::from_upstream("get_note", err))?;
		let mut note =
			Note::new(raw.into_note_draft()).map_err(|err| Error::malformed("get_note", err))?;

		if !req.include_body {
			note.body = None;
		}

		tracing::info!(note_id = %note.id, include_body = req.include_body, "Note retrieved.");

		Ok(note)
	}

	pub async fn notes_in_notebook(&self, req: NotebookNotesRequest) -> Result<NotebookPage> {
		self.guard("get_notes_in_notebook").await?;

		let raw = self
			.upstream
			.list_items_in_container(req.notebook_id.as_str(), req.limit, req.offset)
			.await
			.map_err(|err| Error::from_upstream("get_notes_in_notebook", err))?;
		let notes = raw
			.into_iter()
			.map(|item| {
				let parent = item.parent_id.as_deref().unwrap_or(req.notebook_id.as_str());

				NoteSummary::new(
					&item.id,
					item.title.clone(),
					parent,
					item.created_time,
					item.updated_time,
				)
			})
			.collect::<jot_domain::Result<Vec<_>>>()
			.map_err(|err| Error::malformed("get_notes_in_notebook", err))?;
		let has_more = notes.len() == req.limit;

		tracing::info!(
			notebook_id = %req.notebook_id,
			notes = notes.len(),
			offset = req.offset,
			"Notebook notes listed."
		);

		Ok(NotebookPage { total_count: req.offset + notes.len(), has_more, notes })
	}
}
