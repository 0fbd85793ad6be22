//! Token-bucket pacing for outbound upstream calls.

use std::{
	collections::VecDeque,
	sync::{Mutex, MutexGuard, PoisonError},
	time::Duration,
};

use serde::Serialize;
use tokio::time::Instant;

const WINDOW: Duration = Duration::from_secs(60);
const MAX_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Serialize)]
pub struct RateLimiterStatus {
	pub tokens_available: f64,
	pub max_tokens: u32,
	pub requests_per_minute_limit: u32,
	pub requests_in_last_minute: usize,
	pub refill_rate_per_second: f64,
	pub utilization_percent: f64,
}

#[derive(Debug)]
struct Bucket {
	tokens: f64,
	burst_size: u32,
	requests_per_minute: u32,
	last_refill: Instant,
	request_times: VecDeque<Instant>,
}
impl Bucket {
	fn capacity(&self) -> f64 {
		f64::from(self.burst_size)
	}

	fn refill_rate(&self) -> f64 {
		f64::from(self.requests_per_minute) / 60.0
	}

	fn refill(&mut self, now: Instant) {
		let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();

		self.tokens = (self.tokens + elapsed * self.refill_rate()).min(self.capacity());
		self.last_refill = now;

		while let Some(oldest) = self.request_times.front() {
			if now.saturating_duration_since(*oldest) < WINDOW {
				break;
			}

			self.request_times.pop_front();
		}
	}
}

pub struct RateLimiter {
	bucket: Mutex<Bucket>,
}
impl RateLimiter {
	/// Starts with a full bucket of `burst_size` tokens.
	pub fn new(requests_per_minute: u32, burst_size: u32) -> Self {
		Self {
			bucket: Mutex::new(Bucket {
				tokens: f64::from(burst_size),
				burst_size,
				requests_per_minute,
				last_refill: Instant::now(),
				request_times: VecDeque::new(),
			}),
		}
	}

	pub fn from_config(cfg: &jot_config::RateLimit) -> Self {
		Self::new(cfg.requests_per_minute, cfg.burst_size)
	}

	/// Takes `tokens` from the bucket if that many are available. Never blocks.
	pub fn acquire(&self, tokens: u32) -> bool {
		let now = Instant::now();
		let mut bucket = self.bucket();

		bucket.refill(now);

		let requested = f64::from(tokens);

		if bucket.tokens < requested {
			tracing::debug!(
				requested = tokens,
				available = bucket.tokens,
				"Rate limiter denied the request."
			);

			return false;
		}

		bucket.tokens -= requested;
		bucket.request_times.push_back(now);

		true
	}

	/// Polls [`Self::acquire`] until it succeeds or `timeout` has elapsed.
	pub async fn wait_for_tokens(&self, tokens: u32, timeout: Duration) -> bool {
		let started = Instant::now();

		loop {
			if self.acquire(tokens) {
				return true;
			}
			if started.elapsed() >= timeout {
				tracing::warn!(
					requested = tokens,
					timeout_ms = timeout.as_millis() as u64,
					"Timed out waiting for rate limiter tokens."
				);

				return false;
			}

			tokio::time::sleep(self.poll_interval()).await;
		}
	}

	pub fn status(&self) -> RateLimiterStatus {
		let mut bucket = self.bucket();

		bucket.refill(Instant::now());

		let recent = bucket.request_times.len();
		let utilization = if bucket.requests_per_minute == 0 {
			0.0
		} else {
			recent as f64 / f64::from(bucket.requests_per_minute) * 100.0
		};

		RateLimiterStatus {
			tokens_available: (bucket.tokens * 100.0).round() / 100.0,
			max_tokens: bucket.burst_size,
			requests_per_minute_limit: bucket.requests_per_minute,
			requests_in_last_minute: recent,
			refill_rate_per_second: bucket.refill_rate(),
			utilization_percent: (utilization * 100.0).round() / 100.0,
		}
	}

	/// Exact token count after a refill pass.
	pub fn available_tokens(&self) -> f64 {
		let mut bucket = self.bucket();

		bucket.refill(Instant::now());

		bucket.tokens
	}

	pub fn reset(&self) {
		let mut bucket = self.bucket();

		bucket.tokens = bucket.capacity();
		bucket.last_refill = Instant::now();
		bucket.request_times.clear();
	}

	/// Live reconfiguration. Time elapsed so far is credited at the old rate, and a smaller burst
	/// clamps the current token count.
	pub fn configure(&self, requests_per_minute: Option<u32>, burst_size: Option<u32>) {
		let mut bucket = self.bucket();

		bucket.refill(Instant::now());

		if let Some(rpm) = requests_per_minute {
			bucket.requests_per_minute = rpm;
		}
		if let Some(burst) = burst_size {
			bucket.burst_size = burst;
			bucket.tokens = bucket.tokens.min(bucket.capacity());
		}

		tracing::info!(
			requests_per_minute = bucket.requests_per_minute,
			burst_size = bucket.burst_size,
			"Rate limiter reconfigured."
		);
	}

	fn poll_interval(&self) -> Duration {
		let rate = self.bucket().refill_rate();

		if rate <= 0.0 {
			return MAX_POLL_INTERVAL;
		}

		Duration::from_secs_f64(1.0 / rate).min(MAX_POLL_INTERVAL)
	}

	fn bucket(&self) -> MutexGuard<'_, Bucket> {
		self.bucket.lock().unwrap_or_else(PoisonError::into_inner)
	}
}
