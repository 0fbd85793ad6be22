use std::sync::{
	Mutex, PoisonError,
	atomic::{AtomicBool, Ordering},
};

use crate::{BoxFuture, Error, RawContainer, RawItem, Result, UpstreamClient};

const WORK_ID: &str = "6a1c0f3e2b4d4e5f8a9b0c1d2e3f4a5b";
const PROJECTS_ID: &str = "7b2d1e4f3c5e4f60a1b2c3d4e5f60718";
const PERSONAL_ID: &str = "8c3e2f5a4d6f4071b2c3d4e5f6071829";
const SAMPLE_TIME: i64 = 1_700_000_000_000;

/// In-memory upstream for local runs and tests.
pub struct StubUpstreamClient {
	notes: Mutex<Vec<RawItem>>,
	containers: Mutex<Vec<RawContainer>>,
	reachable: AtomicBool,
}
impl StubUpstreamClient {
	pub fn new(notes: Vec<RawItem>, containers: Vec<RawContainer>) -> Self {
		Self {
			notes: Mutex::new(notes),
			containers: Mutex::new(containers),
			reachable: AtomicBool::new(true),
		}
	}

	pub fn with_sample_data() -> Self {
		let container = |id: &str, title: &str, parent: Option<&str>| RawContainer {
			id: id.to_string(),
			title: title.to_string(),
			parent_id: parent.map(str::to_string),
			created_time: SAMPLE_TIME,
			updated_time: SAMPLE_TIME,
		};
		let note = |id: &str, title: &str, body: &str, parent: &str, tags: &[&str]| RawItem {
			id: id.to_string(),
			title: title.to_string(),
			body: Some(body.to_string()),
			parent_id: Some(parent.to_string()),
			created_time: SAMPLE_TIME,
			updated_time: SAMPLE_TIME,
			is_conflict: false,
			markup_language: Some(1),
			tags: tags.iter().map(|tag| tag.to_string()).collect(),
		};

		Self::new(
			vec![
				note(
					"0a1b2c3d4e5f40718293a4b5c6d7e8f9",
					"Project Plan",
					"Milestones for the project and the review schedule.",
					PROJECTS_ID,
					&["work", "planning"],
				),
				note(
					"1b2c3d4e5f60718293a4b5c6d7e8f90a",
					"Meeting Notes",
					"Discussed project work, hiring, and the offsite.",
					WORK_ID,
					&["work"],
				),
				note(
					"2c3d4e5f6071829304b5c6d7e8f90a1b",
					"Groceries",
					"Eggs, coffee, and bread.",
					PERSONAL_ID,
					&[],
				),
			],
			vec![
				container(WORK_ID, "Work", None),
				container(PROJECTS_ID, "Projects", Some(WORK_ID)),
				container(PERSONAL_ID, "Personal", None),
			],
		)
	}

	/// Simulates the upstream going offline (`false`) or coming back.
	pub fn set_reachable(&self, reachable: bool) {
		self.reachable.store(reachable, Ordering::SeqCst);
	}

	pub fn insert_note(&self, item: RawItem) {
		self.notes.lock().unwrap_or_else(PoisonError::into_inner).push(item);
	}

	fn check_reachable(&self, operation: &'static str) -> Result<()> {
		if self.reachable.load(Ordering::SeqCst) {
			Ok(())
		} else {
			Err(Error::Connectivity { operation, message: "Stub upstream is offline.".to_string() })
		}
	}

	fn search_sync(
		&self,
		query: &str,
		limit: usize,
		container_id: Option<&str>,
	) -> Result<Vec<RawItem>> {
		self.check_reachable("search")?;

		let needle = query.to_lowercase();
		let notes = self.notes.lock().unwrap_or_else(PoisonError::into_inner);

		Ok(notes
			.iter()
			.filter(|item| in_container(item, container_id))
			.filter(|item| {
				item.title.to_lowercase().contains(&needle)
					|| item.body.as_deref().is_some_and(|body| body.to_lowercase().contains(&needle))
					|| item.tags.iter().any(|tag| tag.to_lowercase().contains(&needle))
			})
			.take(limit)
			.cloned()
			.collect())
	}

	fn fetch_sync(&self, id: &str, include_body: bool) -> Result<RawItem> {
		self.check_reachable("fetch_item")?;

		let notes = self.notes.lock().unwrap_or_else(PoisonError::into_inner);
		let mut item = notes
			.iter()
			.find(|item| item.id.eq_ignore_ascii_case(id))
			.cloned()
			.ok_or_else(|| Error::NotFound { resource: format!("notes/{id}") })?;

		if !include_body {
			item.body = None;
		}

		Ok(item)
	}

	fn list_containers_sync(&self, parent_id: Option<&str>) -> Result<Vec<RawContainer>> {
		self.check_reachable("list_containers")?;

		let containers = self.containers.lock().unwrap_or_else(PoisonError::into_inner);

		Ok(containers
			.iter()
			.filter(|container| parent_id.is_none() || container.is_child_of(parent_id))
			.cloned()
			.collect())
	}

	fn list_items_sync(
		&self,
		container_id: &str,
		limit: usize,
		offset: usize,
	) -> Result<Vec<RawItem>> {
		self.check_reachable("list_items_in_container")?;

		let containers = self.containers.lock().unwrap_or_else(PoisonError::into_inner);

		if !containers.iter().any(|container| container.id.eq_ignore_ascii_case(container_id)) {
			return Err(Error::NotFound { resource: format!("folders/{container_id}") });
		}

		drop(containers);

		let notes = self.notes.lock().unwrap_or_else(PoisonError::into_inner);

		Ok(notes
			.iter()
			.filter(|item| in_container(item, Some(container_id)))
			.skip(offset)
			.take(limit)
			.map(|item| RawItem { body: None, ..item.clone() })
			.collect())
	}
}

impl UpstreamClient for StubUpstreamClient {
	fn ping(&self) -> BoxFuture<'_, Result<bool>> {
		Box::pin(async move { Ok(self.reachable.load(Ordering::SeqCst)) })
	}

	fn search<'a>(
		&'a self,
		query: &'a str,
		limit: usize,
		container_id: Option<&'a str>,
	) -> BoxFuture<'a, Result<Vec<RawItem>>> {
		Box::pin(async move { self.search_sync(query, limit, container_id) })
	}

	fn fetch_item<'a>(
		&'a self,
		id: &'a str,
		include_body: bool,
	) -> BoxFuture<'a, Result<RawItem>> {
		Box::pin(async move { self.fetch_sync(id, include_body) })
	}

	fn list_containers<'a>(
		&'a self,
		parent_id: Option<&'a str>,
	) -> BoxFuture<'a, Result<Vec<RawContainer>>> {
		Box::pin(async move { self.list_containers_sync(parent_id) })
	}

	fn list_items_in_container<'a>(
		&'a self,
		container_id: &'a str,
		limit: usize,
		offset: usize,
	) -> BoxFuture<'a, Result<Vec<RawItem>>> {
		Box::pin(async move { self.list_items_sync(container_id, limit, offset) })
	}

	fn close(&self) -> BoxFuture<'_, ()> {
		Box::pin(async {})
	}
}

fn in_container(item: &RawItem, container_id: Option<&str>) -> bool {
	match container_id {
		Some(container) =>
			item.parent_id.as_deref().is_some_and(|parent| parent.eq_ignore_ascii_case(container)),
		None => true,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn sample_search_is_case_insensitive() {
		let stub = StubUpstreamClient::with_sample_data();
		let items = stub.search("PROJECT", 10, None).await.expect("search failed");

		assert_eq!(items.len(), 2);
		assert_eq!(items[0].title, "Project Plan");
	}

	#[tokio::test]
	async fn offline_stub_fails_calls_and_pings_false() {
		let stub = StubUpstreamClient::with_sample_data();

		stub.set_reachable(false);

		assert!(!stub.ping().await.expect("ping never errors"));
		assert!(matches!(
			stub.search("project", 10, None).await,
			Err(Error::Connectivity { operation: "search", .. })
		));
	}

	#[tokio::test]
	async fn missing_folder_is_not_found() {
		let stub = StubUpstreamClient::with_sample_data();
		let err = stub
			.list_items_in_container("ffffffffffffffffffffffffffffffff", 10, 0)
			.await
			.expect_err("expected not found");

		assert!(matches!(err, Error::NotFound { .. }));
	}

	#[tokio::test]
	async fn listing_children_filters_by_parent() {
		let stub = StubUpstreamClient::with_sample_data();
		let roots = stub.list_containers(None).await.expect("list failed");
		let children = stub.list_containers(Some(WORK_ID)).await.expect("list failed");

		assert_eq!(roots.len(), 3);
		assert_eq!(children.len(), 1);
		assert_eq!(children[0].title, "Projects");
	}
}
