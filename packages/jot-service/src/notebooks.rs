use crate::{Error, JotService, Result};
use jot_domain::{ItemId, Notebook};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListNotebooksRequest {
	pub parent_id: Option<ItemId>,
	pub recursive: bool,
}
impl ListNotebooksRequest {
	pub fn new(parent_id: Option<&str>, recursive: Option<bool>) -> Result<Self> {
		Ok(Self {
			parent_id: ItemId::parse_optional("parent_id", parent_id)?,
			recursive: recursive.unwrap_or(true),
		})
	}
}

impl JotService {
	/// Notebooks under `parent_id` (top level when absent): a nested tree when recursive, direct
	/// children otherwise.
	pub async fn list_notebooks(&self, req: ListNotebooksRequest) -> Result<Vec<Notebook>> {
		self.guard("list_notebooks").await?;

		let parent = req.parent_id.as_ref().map(ItemId::as_str);
		let scope = if req.recursive { None } else { parent };
		let mut raw = self
			.upstream
			.list_containers(scope)
			.await
			.map_err(|err| Error::from_upstream("list_notebooks", err))?;

		if !req.recursive {
			raw.retain(|container| container.is_child_of(parent));
		}

		let flat = raw
			.into_iter()
			.map(|container| Notebook::new(container.into_notebook_draft()))
			.collect::<jot_domain::Result<Vec<_>>>()
			.map_err(|err| Error::malformed("list_notebooks", err))?;
		let notebooks = if req.recursive {
			Notebook::build_tree(flat, req.parent_id.as_ref())
		} else {
			flat
		};

		tracing::info!(
			parent_id = parent.unwrap_or("root"),
			recursive = req.recursive,
			notebooks = notebooks.iter().map(Notebook::total_count).sum::<usize>(),
			"Notebooks listed."
		);

		Ok(notebooks)
	}
}
