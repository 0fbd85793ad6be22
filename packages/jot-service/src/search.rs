pub mod cache;
pub mod scoring;

use std::{
	sync::{Arc, Mutex, PoisonError},
	time::Duration,
};

use tokio::time::Instant;

use crate::{Error, Result};
use cache::{CachedResults, SearchCache};
use jot_domain::{ItemId, SearchResult, SearchResultItem};
use jot_upstream::UpstreamClient;
use scoring::QueryMatcher;

pub const DEFAULT_LIMIT: usize = 10;
pub const MAX_LIMIT: usize = 50;
/// Candidates fetched per requested result, leaving room for re-ranking.
const OVERFETCH_FACTOR: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
	pub query: String,
	pub limit: usize,
	pub notebook_id: Option<ItemId>,
}
impl SearchRequest {
	pub fn new(query: &str, limit: Option<i64>, notebook_id: Option<&str>) -> Result<Self> {
		let query = scoring::sanitize_query(query);

		if query.is_empty() {
			return Err(Error::Validation { message: "query must be non-empty.".to_string() });
		}

		let limit = match limit {
			None => DEFAULT_LIMIT,
			Some(value) if (1..=MAX_LIMIT as i64).contains(&value) => value as usize,
			Some(_) =>
				return Err(Error::Validation {
					message: format!("limit must be between 1 and {MAX_LIMIT}."),
				}),
		};
		let notebook_id = notebook_id.map(|id| ItemId::parse("notebook_id", id)).transpose()?;

		Ok(Self { query, limit, notebook_id })
	}
}

pub struct SearchService {
	upstream: Arc<dyn UpstreamClient>,
	cache: SearchCache,
	sweep_interval: Duration,
	last_sweep: Mutex<Instant>,
}
impl SearchService {
	pub fn new(upstream: Arc<dyn UpstreamClient>, ttl: Duration, sweep_interval: Duration) -> Self {
		Self {
			upstream,
			cache: SearchCache::new(ttl),
			sweep_interval,
			last_sweep: Mutex::new(Instant::now()),
		}
	}

	pub fn from_config(upstream: Arc<dyn UpstreamClient>, cfg: &jot_config::Search) -> Self {
		Self::new(
			upstream,
			Duration::from_secs(cfg.cache_ttl_secs),
			Duration::from_secs(cfg.sweep_interval_secs),
		)
	}

	pub fn cache(&self) -> &SearchCache {
		&self.cache
	}

	/// Ranked results for `req`, served from cache while fresh.
	///
	/// Concurrent misses on one key each fetch and the last write wins; results are the same for
	/// a given upstream state.
	pub async fn search(&self, req: &SearchRequest) -> Result<SearchResult> {
		self.maybe_sweep();

		let key = scoring::cache_key(&req.query, req.limit, req.notebook_id.as_ref());

		if let Some(hit) = self.cache.get(&key) {
			tracing::info!(cache_key = %key, results = hit.items.len(), "Search cache hit.");

			return Ok(SearchResult {
				query: req.query.clone(),
				total_count: hit.items.len(),
				items: hit.items,
				has_more: hit.has_more,
				execution_time_ms: 0,
			});
		}

		tracing::debug!(cache_key = %key, "Search cache miss.");

		let started = Instant::now();
		let candidates = self
			.upstream
			.search(
				&req.query,
				req.limit * OVERFETCH_FACTOR,
				req.notebook_id.as_ref().map(ItemId::as_str),
			)
			.await
			.map_err(|err| Error::from_upstream("search", err))?;

		if candidates.is_empty() {
			tracing::info!(query = %req.query, "Search returned no results.");

			return Ok(SearchResult {
				query: req.query.clone(),
				items: Vec::new(),
				total_count: 0,
				has_more: false,
				execution_time_ms: started.elapsed().as_millis() as u64,
			});
		}

		let matcher = QueryMatcher::new(&req.query);
		let mut scored = Vec::with_capacity(candidates.len());

		for candidate in &candidates {
			let body = candidate.body.as_deref().unwrap_or_default();
			let score = matcher.relevance(&candidate.title, body, &candidate.tags);
			let snippet = matcher.snippet(&candidate.title, body);
			let item = SearchResultItem::new(&candidate.id, candidate.title.clone(), snippet, score)
				.map_err(|err| Error::malformed("search", err))?;

			scored.push(item);
		}

		// Stable, so equal scores keep upstream order.
		scored.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));

		let has_more = candidates.len() > req.limit;

		scored.truncate(req.limit);

		self.cache.insert(key, CachedResults { items: scored.clone(), has_more });

		let execution_time_ms = started.elapsed().as_millis() as u64;

		tracing::info!(
			query = %req.query,
			results = scored.len(),
			top_score = scored.first().map_or(0.0, |item| item.relevance_score),
			execution_time_ms,
			"Search completed."
		);

		Ok(SearchResult {
			query: req.query.clone(),
			total_count: scored.len(),
			items: scored,
			has_more,
			execution_time_ms,
		})
	}

	fn maybe_sweep(&self) {
		let now = Instant::now();
		let mut last_sweep = self.last_sweep.lock().unwrap_or_else(PoisonError::into_inner);

		if now.saturating_duration_since(*last_sweep) <= self.sweep_interval {
			return;
		}

		let evicted = self.cache.evict_expired();

		*last_sweep = now;

		tracing::debug!(evicted, remaining = self.cache.len(), "Search cache swept.");
	}
}
