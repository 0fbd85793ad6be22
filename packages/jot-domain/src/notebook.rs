use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::{Error, ItemId, Result, note};

#[derive(Debug, Clone, Default)]
pub struct NotebookDraft {
	pub id: String,
	pub title: String,
	pub parent_id: Option<String>,
	pub created_time: i64,
	pub updated_time: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notebook {
	pub id: ItemId,
	pub title: String,
	pub parent_id: Option<ItemId>,
	pub created_time: i64,
	pub updated_time: i64,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub children: Vec<Notebook>,
}
impl Notebook {
	pub fn new(draft: NotebookDraft) -> Result<Self> {
		let id = ItemId::parse("id", &draft.id)?;
		let title = draft.title.trim();

		if title.is_empty() {
			return Err(Error::validation("title", "must be non-empty."));
		}

		let parent_id = ItemId::parse_optional("parent_id", draft.parent_id.as_deref())?;

		note::check_timestamp("created_time", draft.created_time)?;
		note::check_timestamp("updated_time", draft.updated_time)?;

		Ok(Self {
			id,
			title: title.to_string(),
			parent_id,
			created_time: draft.created_time,
			updated_time: draft.updated_time,
			children: Vec::new(),
		})
	}

	/// Nests a flat notebook list under `root` (`None` for the top level).
	///
	/// Sibling order follows the input order. Each notebook is placed at most once, so
	/// self-parented entries and parent cycles never recurse; entries not reachable from `root`
	/// are dropped.
	pub fn build_tree(flat: Vec<Notebook>, root: Option<&ItemId>) -> Vec<Notebook> {
		let mut by_parent: HashMap<Option<ItemId>, Vec<Notebook>> = HashMap::new();

		for mut notebook in flat {
			notebook.children.clear();
			by_parent.entry(notebook.parent_id.clone()).or_default().push(notebook);
		}

		let mut placed = HashSet::new();

		if let Some(root) = root {
			placed.insert(root.clone());
		}

		attach_children(&mut by_parent, root.cloned(), &mut placed)
	}

	/// Depth-first count of this notebook and all of its descendants.
	pub fn total_count(&self) -> usize {
		1 + self.children.iter().map(Notebook::total_count).sum::<usize>()
	}
}

fn attach_children(
	by_parent: &mut HashMap<Option<ItemId>, Vec<Notebook>>,
	parent: Option<ItemId>,
	placed: &mut HashSet<ItemId>,
) -> Vec<Notebook> {
	let Some(children) = by_parent.remove(&parent) else { return Vec::new() };
	let mut out = Vec::with_capacity(children.len());

	for mut child in children {
		if !placed.insert(child.id.clone()) {
			continue;
		}

		child.children = attach_children(by_parent, Some(child.id.clone()), placed);

		out.push(child);
	}

	out
}
