use std::{
	collections::HashMap,
	sync::{Mutex, MutexGuard, PoisonError},
	time::Duration,
};

use tokio::time::Instant;

use jot_domain::SearchResultItem;

#[derive(Debug, Clone, PartialEq)]
pub struct CachedResults {
	pub items: Vec<SearchResultItem>,
	pub has_more: bool,
}

struct CacheEntry {
	stored_at: Instant,
	results: CachedResults,
}

/// TTL map of scored result sets. Expired entries are removed lazily, on lookup or sweep.
pub struct SearchCache {
	ttl: Duration,
	entries: Mutex<HashMap<String, CacheEntry>>,
}
impl SearchCache {
	pub fn new(ttl: Duration) -> Self {
		Self { ttl, entries: Mutex::new(HashMap::new()) }
	}

	pub fn ttl(&self) -> Duration {
		self.ttl
	}

	pub fn get(&self, key: &str) -> Option<CachedResults> {
		let now = Instant::now();
		let mut entries = self.entries();
		let entry = entries.get(key)?;

		if now.saturating_duration_since(entry.stored_at) > self.ttl {
			entries.remove(key);

			return None;
		}

		Some(entry.results.clone())
	}

	/// Last writer wins when two misses for the same key race.
	pub fn insert(&self, key: String, results: CachedResults) {
		self.entries().insert(key, CacheEntry { stored_at: Instant::now(), results });
	}

	/// Drops every expired entry and returns how many were removed.
	pub fn evict_expired(&self) -> usize {
		let now = Instant::now();
		let mut entries = self.entries();
		let before = entries.len();

		entries.retain(|_, entry| now.saturating_duration_since(entry.stored_at) <= self.ttl);

		before - entries.len()
	}

	pub fn clear(&self) {
		self.entries().clear();
	}

	pub fn len(&self) -> usize {
		self.entries().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	fn entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
		self.entries.lock().unwrap_or_else(PoisonError::into_inner)
	}
}
