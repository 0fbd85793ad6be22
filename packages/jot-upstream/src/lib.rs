pub mod http;
pub mod records;
pub mod stub;

mod error;

pub use error::{Error, Result};
pub use http::HttpUpstreamClient;
pub use records::{RawContainer, RawItem};
pub use stub::StubUpstreamClient;

use std::{future::Future, pin::Pin, sync::Arc};

use jot_config::{Upstream, UpstreamMode};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The subset of the Joplin API the access layer consumes.
pub trait UpstreamClient
where
	Self: Send + Sync,
{
	/// Liveness check. `Ok(false)` means the server answered but is not a healthy Joplin instance.
	fn ping(&self) -> BoxFuture<'_, Result<bool>>;

	fn search<'a>(
		&'a self,
		query: &'a str,
		limit: usize,
		container_id: Option<&'a str>,
	) -> BoxFuture<'a, Result<Vec<RawItem>>>;

	fn fetch_item<'a>(&'a self, id: &'a str, include_body: bool)
	-> BoxFuture<'a, Result<RawItem>>;

	/// All containers when `parent_id` is `None`, otherwise the direct children of `parent_id`.
	fn list_containers<'a>(
		&'a self,
		parent_id: Option<&'a str>,
	) -> BoxFuture<'a, Result<Vec<RawContainer>>>;

	fn list_items_in_container<'a>(
		&'a self,
		container_id: &'a str,
		limit: usize,
		offset: usize,
	) -> BoxFuture<'a, Result<Vec<RawItem>>>;

	/// Releases pooled connections. Later calls may reopen them.
	fn close(&self) -> BoxFuture<'_, ()>;
}

/// Builds the client variant selected by `upstream.mode`.
pub fn connect(cfg: &Upstream) -> Result<Arc<dyn UpstreamClient>> {
	let client: Arc<dyn UpstreamClient> = match cfg.mode {
		UpstreamMode::Http => Arc::new(HttpUpstreamClient::new(cfg)?),
		UpstreamMode::Stub => Arc::new(StubUpstreamClient::with_sample_data()),
	};

	tracing::info!(mode = ?cfg.mode, base_url = %cfg.base_url, "Upstream client configured.");

	Ok(client)
}
