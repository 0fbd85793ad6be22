use std::{
	sync::{Mutex, PoisonError},
	time::Duration,
};

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

use crate::{
	BoxFuture, Error, RawContainer, RawItem, Result, UpstreamClient, records::Page,
};
use jot_config::Upstream;

const PING_MARKER: &str = "JoplinClipperServer";
const NOTE_FIELDS: &str = "id,title,parent_id,created_time,updated_time,is_conflict,markup_language";
const SEARCH_FIELDS: &str = "id,title,body,parent_id,created_time,updated_time";
const FOLDER_FIELDS: &str = "id,title,parent_id,created_time,updated_time";
const MAX_PAGE_SIZE: usize = 100;
const MAX_SEARCH_PAGES: usize = 10;
const MAX_FOLDER_PAGES: usize = 100;

/// Joplin Web Clipper client over reqwest.
pub struct HttpUpstreamClient {
	base_url: String,
	api_token: String,
	timeout: Duration,
	client: Mutex<Option<Client>>,
}
impl HttpUpstreamClient {
	pub fn new(cfg: &Upstream) -> Result<Self> {
		if cfg.base_url.trim().is_empty() {
			return Err(Error::InvalidConfig {
				message: "upstream.base_url must be non-empty.".to_string(),
			});
		}

		let this = Self {
			base_url: cfg.base_url.trim().trim_end_matches('/').to_string(),
			api_token: cfg.api_token.clone(),
			timeout: Duration::from_millis(cfg.timeout_ms),
			client: Mutex::new(None),
		};

		this.client()?;

		Ok(this)
	}

	fn client(&self) -> Result<Client> {
		let mut slot = self.client.lock().unwrap_or_else(PoisonError::into_inner);

		if let Some(client) = slot.as_ref() {
			return Ok(client.clone());
		}

		let client = Client::builder()
			.timeout(self.timeout)
			.pool_idle_timeout(Duration::from_secs(30))
			.build()
			.map_err(|err| Error::InvalidConfig {
				message: format!("Failed to build the upstream HTTP client: {err}"),
			})?;

		*slot = Some(client.clone());

		Ok(client)
	}

	async fn get_json<T>(
		&self,
		operation: &'static str,
		path: &str,
		query: &[(&str, String)],
	) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let client = self.client()?;
		let url = format!("{}{}", self.base_url, path);
		let response = client
			.get(url)
			.query(&[("token", self.api_token.as_str())])
			.query(query)
			.send()
			.await
			.map_err(|err| Error::from_reqwest(operation, err))?;
		let status = response.status();

		match status {
			StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN =>
				return Err(Error::Authentication { operation }),
			StatusCode::NOT_FOUND =>
				return Err(Error::NotFound { resource: path.trim_start_matches('/').to_string() }),
			status if !status.is_success() =>
				return Err(Error::Status { operation, status: status.as_u16() }),
			_ => {},
		}

		let bytes = response.bytes().await.map_err(|err| Error::from_reqwest(operation, err))?;

		serde_json::from_slice(&bytes)
			.map_err(|err| Error::MalformedResponse { operation, message: err.to_string() })
	}

	async fn ping_inner(&self) -> Result<bool> {
		let client = self.client()?;
		let response = client
			.get(format!("{}/ping", self.base_url))
			.query(&[("token", self.api_token.as_str())])
			.send()
			.await
			.map_err(|err| Error::from_reqwest("ping", err))?;
		let status = response.status();
		let text = response.text().await.map_err(|err| Error::from_reqwest("ping", err))?;
		let healthy = status == StatusCode::OK && text.contains(PING_MARKER);

		if !healthy {
			tracing::warn!(status = status.as_u16(), "Upstream ping returned an unexpected response.");
		}

		Ok(healthy)
	}

	async fn search_inner(
		&self,
		query: &str,
		limit: usize,
		container_id: Option<&str>,
	) -> Result<Vec<RawItem>> {
		let page_size = limit.clamp(1, MAX_PAGE_SIZE);
		let mut out = Vec::new();

		// Joplin search cannot filter by folder id, so container filters page until filled.
		for page in 1..=MAX_SEARCH_PAGES {
			let batch: Page<RawItem> = self
				.get_json(
					"search",
					"/search",
					&[
						("query", query.to_string()),
						("type", "note".to_string()),
						("limit", page_size.to_string()),
						("page", page.to_string()),
						("fields", SEARCH_FIELDS.to_string()),
					],
				)
				.await?;

			out.extend(batch.items.into_iter().filter(|item| match container_id {
				Some(container) => item
					.parent_id
					.as_deref()
					.is_some_and(|parent| parent.eq_ignore_ascii_case(container)),
				None => true,
			}));

			if out.len() >= limit || !batch.has_more || container_id.is_none() {
				break;
			}
		}

		out.truncate(limit);

		Ok(out)
	}

	async fn fetch_item_inner(&self, id: &str, include_body: bool) -> Result<RawItem> {
		let fields =
			if include_body { format!("{NOTE_FIELDS},body") } else { NOTE_FIELDS.to_string() };

		self.get_json("fetch_item", &format!("/notes/{id}"), &[("fields", fields)]).await
	}

	async fn list_containers_inner(&self, parent_id: Option<&str>) -> Result<Vec<RawContainer>> {
		let mut out = Vec::new();

		for page in 1..=MAX_FOLDER_PAGES {
			let batch: Page<RawContainer> = self
				.get_json(
					"list_containers",
					"/folders",
					&[
						("page", page.to_string()),
						("limit", MAX_PAGE_SIZE.to_string()),
						("fields", FOLDER_FIELDS.to_string()),
					],
				)
				.await?;

			out.extend(batch.items);

			if !batch.has_more {
				break;
			}
		}

		if let Some(parent_id) = parent_id {
			out.retain(|container| container.is_child_of(Some(parent_id)));
		}

		Ok(out)
	}

	async fn list_items_inner(
		&self,
		container_id: &str,
		limit: usize,
		offset: usize,
	) -> Result<Vec<RawItem>> {
		let page_size = limit.clamp(1, MAX_PAGE_SIZE);
		let first_page = offset / page_size + 1;
		let skip = offset % page_size;
		let path = format!("/folders/{container_id}/notes");
		let mut out = Vec::new();

		// An unaligned offset spans at most two Joplin pages.
		for page in first_page..=first_page + 1 {
			let batch: Page<RawItem> = self
				.get_json(
					"list_items_in_container",
					&path,
					&[
						("page", page.to_string()),
						("limit", page_size.to_string()),
						("fields", NOTE_FIELDS.to_string()),
					],
				)
				.await?;

			out.extend(batch.items);

			if skip == 0 || !batch.has_more {
				break;
			}
		}

		Ok(out.into_iter().skip(skip).take(limit).collect())
	}
}

impl UpstreamClient for HttpUpstreamClient {
	fn ping(&self) -> BoxFuture<'_, Result<bool>> {
		Box::pin(self.ping_inner())
	}

	fn search<'a>(
		&'a self,
		query: &'a str,
		limit: usize,
		container_id: Option<&'a str>,
	) -> BoxFuture<'a, Result<Vec<RawItem>>> {
		Box::pin(self.search_inner(query, limit, container_id))
	}

	fn fetch_item<'a>(
		&'a self,
		id: &'a str,
		include_body: bool,
	) -> BoxFuture<'a, Result<RawItem>> {
		Box::pin(self.fetch_item_inner(id, include_body))
	}

	fn list_containers<'a>(
		&'a self,
		parent_id: Option<&'a str>,
	) -> BoxFuture<'a, Result<Vec<RawContainer>>> {
		Box::pin(self.list_containers_inner(parent_id))
	}

	fn list_items_in_container<'a>(
		&'a self,
		container_id: &'a str,
		limit: usize,
		offset: usize,
	) -> BoxFuture<'a, Result<Vec<RawItem>>> {
		Box::pin(self.list_items_inner(container_id, limit, offset))
	}

	fn close(&self) -> BoxFuture<'_, ()> {
		Box::pin(async move {
			let dropped = self.client.lock().unwrap_or_else(PoisonError::into_inner).take();

			if dropped.is_some() {
				tracing::info!("Upstream HTTP client closed.");
			}
		})
	}
}
