pub mod connection;
pub mod health;
pub mod notebooks;
pub mod notes;
pub mod rate_limit;
pub mod search;

mod error;

pub use connection::{
	ConnectionHealth, ConnectionInfo, ConnectionManager, ConnectionState, ConnectionTracker,
};
pub use error::{Error, Result};
pub use health::{HealthCheck, HealthReport, HealthStatus};
pub use notebooks::ListNotebooksRequest;
pub use notes::{NoteFetchRequest, NotebookNotesRequest, NotebookPage};
pub use rate_limit::{RateLimiter, RateLimiterStatus};
pub use search::{SearchRequest, SearchService};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::time::Instant;

use jot_config::Config;
use jot_domain::SearchResult;
use jot_upstream::UpstreamClient;

/// Shared handle over one upstream, built once at startup and passed to every request handler.
pub struct JotService {
	pub upstream: Arc<dyn UpstreamClient>,
	pub connection: ConnectionManager,
	pub rate_limiter: RateLimiter,
	pub search: SearchService,
	health_cache: Mutex<Option<(Instant, HealthReport)>>,
}
impl JotService {
	pub fn new(cfg: &Config, upstream: Arc<dyn UpstreamClient>) -> Self {
		Self::from_parts(
			upstream.clone(),
			ConnectionManager::from_config(upstream.clone(), &cfg.upstream),
			RateLimiter::from_config(&cfg.rate_limit),
			SearchService::from_config(upstream, &cfg.search),
		)
	}

	pub fn from_parts(
		upstream: Arc<dyn UpstreamClient>,
		connection: ConnectionManager,
		rate_limiter: RateLimiter,
		search: SearchService,
	) -> Self {
		Self { upstream, connection, rate_limiter, search, health_cache: Mutex::new(None) }
	}

	pub async fn search_notes(&self, req: SearchRequest) -> Result<SearchResult> {
		self.guard("search_notes").await?;

		self.search.search(&req).await
	}

	pub async fn shutdown(&self) -> Result<()> {
		self.connection.disconnect().await
	}

	/// Admission for one upstream-bound operation: a rate-limit token, then a live connection.
	pub(crate) async fn guard(&self, operation: &'static str) -> Result<()> {
		if !self.rate_limiter.acquire(1) {
			let limit = self.rate_limiter.status().requests_per_minute_limit;

			tracing::warn!(operation, limit, "Request rejected by the rate limiter.");

			return Err(Error::RateLimited {
				message: format!("{operation} exceeded {limit} requests per minute."),
			});
		}
		if !self.connection.ensure_connected().await? {
			let message = self
				.connection
				.info()
				.last_error
				.unwrap_or_else(|| "Connection attempts exhausted.".to_string());

			return Err(Error::Connectivity { operation, message });
		}

		Ok(())
	}

	fn health_cache(&self) -> MutexGuard<'_, Option<(Instant, HealthReport)>> {
		self.health_cache.lock().unwrap_or_else(PoisonError::into_inner)
	}
}
