//! Upstream connection lifecycle.
//!
//! [`ConnectionManager`] owns the only [`ConnectionTracker`] for an upstream and serializes every
//! connect attempt behind one async gate. Callers that queue behind an in-flight attempt observe
//! its outcome instead of probing again.

use std::{
	fmt,
	sync::{
		Arc, Mutex, MutexGuard, PoisonError,
		atomic::{AtomicU64, Ordering},
	},
	time::Duration,
};

use serde::Serialize;
use tokio::time::Instant;

use crate::{Error, Result};
use jot_upstream::UpstreamClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
	Disconnected,
	Connecting,
	Connected,
	Error,
}
impl ConnectionState {
	pub fn can_transition_to(self, next: Self) -> bool {
		use ConnectionState::*;

		matches!(
			(self, next),
			(Disconnected, Connecting)
				| (Connecting, Connected | Error | Disconnected)
				| (Connected, Disconnected | Error)
				| (Error, Connecting | Disconnected)
		)
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Disconnected => "disconnected",
			Self::Connecting => "connecting",
			Self::Connected => "connected",
			Self::Error => "error",
		}
	}
}

impl fmt::Display for ConnectionState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Connection state plus retry bookkeeping. `retry_count` never exceeds `max_retries`.
#[derive(Debug, Clone)]
pub struct ConnectionTracker {
	state: ConnectionState,
	last_error: Option<String>,
	retry_count: u32,
	max_retries: u32,
}
impl ConnectionTracker {
	pub fn new(max_retries: u32) -> Self {
		Self { state: ConnectionState::Disconnected, last_error: None, retry_count: 0, max_retries }
	}

	pub fn state(&self) -> ConnectionState {
		self.state
	}

	pub fn retry_count(&self) -> u32 {
		self.retry_count
	}

	pub fn last_error(&self) -> Option<&str> {
		self.last_error.as_deref()
	}

	/// Fails without touching the state when `next` is not reachable from the current state.
	pub fn transition(&mut self, next: ConnectionState) -> Result<()> {
		if !self.state.can_transition_to(next) {
			return Err(Error::InvalidTransition { from: self.state, to: next });
		}

		tracing::debug!(from = %self.state, to = %next, "Connection state changed.");

		self.state = next;

		Ok(())
	}

	pub fn mark_connected(&mut self) -> Result<()> {
		self.transition(ConnectionState::Connected)?;

		self.last_error = None;
		self.retry_count = 0;

		Ok(())
	}

	pub fn mark_failed(&mut self, message: String) -> Result<()> {
		self.transition(ConnectionState::Error)?;

		self.last_error = Some(message);

		Ok(())
	}

	/// Keeps the state and remembers why the last ping failed.
	pub fn record_error(&mut self, message: String) {
		self.last_error = Some(message);
	}

	/// Consumes one retry if any remain.
	pub fn try_consume_retry(&mut self) -> bool {
		if self.retry_count >= self.max_retries {
			return false;
		}

		self.retry_count += 1;

		true
	}

	/// Moves to `Disconnected` from any other state and clears the retry counter.
	pub fn force_disconnected(&mut self) -> Result<()> {
		if self.state != ConnectionState::Disconnected {
			self.transition(ConnectionState::Disconnected)?;
		}

		self.retry_count = 0;

		Ok(())
	}

	pub fn info(&self) -> ConnectionInfo {
		ConnectionInfo {
			state: self.state,
			last_error: self.last_error.clone(),
			retry_count: self.retry_count,
			max_retries: self.max_retries,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionInfo {
	pub state: ConnectionState,
	pub last_error: Option<String>,
	pub retry_count: u32,
	pub max_retries: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectionHealth {
	pub connected: bool,
	pub response_time_ms: u64,
	pub error: Option<String>,
	pub connection_info: ConnectionInfo,
}

pub struct ConnectionManager {
	upstream: Arc<dyn UpstreamClient>,
	tracker: Mutex<ConnectionTracker>,
	// Outcome of the most recent completed attempt cycle.
	attempt_gate: tokio::sync::Mutex<bool>,
	// Bumped only when an attempt cycle completes.
	attempt_generation: AtomicU64,
	retry_delay: Duration,
}
impl ConnectionManager {
	pub fn new(upstream: Arc<dyn UpstreamClient>, max_retries: u32, retry_delay: Duration) -> Self {
		Self {
			upstream,
			tracker: Mutex::new(ConnectionTracker::new(max_retries)),
			attempt_gate: tokio::sync::Mutex::new(false),
			attempt_generation: AtomicU64::new(0),
			retry_delay,
		}
	}

	pub fn from_config(upstream: Arc<dyn UpstreamClient>, cfg: &jot_config::Upstream) -> Self {
		Self::new(upstream, cfg.max_retries, Duration::from_millis(cfg.retry_delay_ms))
	}

	pub fn state(&self) -> ConnectionState {
		self.tracker().state()
	}

	pub fn info(&self) -> ConnectionInfo {
		self.tracker().info()
	}

	/// Returns whether the upstream is usable, connecting first if needed.
	///
	/// `Err` only signals an illegal state transition, which is a bug rather than an outage.
	pub async fn ensure_connected(&self) -> Result<bool> {
		// Read before the liveness ping so a cycle finishing meanwhile is shared, not repeated.
		let observed = self.attempt_generation.load(Ordering::SeqCst);

		if self.state() == ConnectionState::Connected {
			match self.ping_upstream().await {
				Ok(()) => return Ok(true),
				Err(message) => {
					tracing::warn!(error = %message, "Liveness ping failed. Reconnecting.");

					self.tracker().record_error(message);
				},
			}
		}

		let mut last_outcome = self.attempt_gate.lock().await;

		if self.attempt_generation.load(Ordering::SeqCst) != observed
			&& self.outcome_still_holds(*last_outcome)
		{
			return Ok(*last_outcome);
		}

		let outcome = self.run_attempts().await?;

		*last_outcome = outcome;

		self.attempt_generation.fetch_add(1, Ordering::SeqCst);

		Ok(outcome)
	}

	/// Drops the current connection and runs a fresh attempt cycle.
	pub async fn reconnect(&self) -> Result<bool> {
		let mut last_outcome = self.attempt_gate.lock().await;

		self.tracker().force_disconnected()?;

		let outcome = self.run_attempts().await?;

		*last_outcome = outcome;

		self.attempt_generation.fetch_add(1, Ordering::SeqCst);

		Ok(outcome)
	}

	/// Callers queued behind a disconnect run their own attempt cycle afterwards.
	pub async fn disconnect(&self) -> Result<()> {
		let _gate = self.attempt_gate.lock().await;

		self.upstream.close().await;
		self.tracker().force_disconnected()?;

		tracing::info!("Upstream connection closed.");

		Ok(())
	}

	/// Pings the upstream regardless of the tracked state. A failure only updates `last_error`.
	pub async fn health_check(&self) -> ConnectionHealth {
		let started = Instant::now();
		let ping = self.ping_upstream().await;
		let response_time_ms = started.elapsed().as_millis() as u64;
		let error = ping.err();

		if let Some(message) = &error {
			self.tracker().record_error(message.clone());
		}

		ConnectionHealth {
			connected: error.is_none(),
			response_time_ms,
			error,
			connection_info: self.info(),
		}
	}

	async fn run_attempts(&self) -> Result<bool> {
		{
			let mut tracker = self.tracker();

			tracker.retry_count = 0;

			if tracker.state == ConnectionState::Connected {
				tracker.transition(ConnectionState::Disconnected)?;
			}
		}

		loop {
			{
				let mut tracker = self.tracker();

				if tracker.state != ConnectionState::Connecting {
					tracker.transition(ConnectionState::Connecting)?;
				}
			}

			let failure = match self.ping_upstream().await {
				Ok(()) => {
					self.tracker().mark_connected()?;

					tracing::info!("Connected to the upstream note service.");

					return Ok(true);
				},
				Err(message) => message,
			};
			let retry = {
				let mut tracker = self.tracker();

				tracker.mark_failed(failure.clone())?;

				if tracker.try_consume_retry() {
					tracker.transition(ConnectionState::Disconnected)?;

					Some((tracker.retry_count, tracker.max_retries))
				} else {
					None
				}
			};
			let Some((retry_count, max_retries)) = retry else {
				tracing::error!(
					error = %failure,
					max_retries = self.tracker().max_retries,
					"Connection attempts exhausted."
				);

				return Ok(false);
			};

			tracing::warn!(
				error = %failure,
				retry_count,
				max_retries,
				retry_delay_ms = self.retry_delay.as_millis() as u64,
				"Connection attempt failed. Retrying."
			);

			tokio::time::sleep(self.retry_delay).await;
		}
	}

	/// A shared outcome is only reused while the tracked state still agrees with it.
	fn outcome_still_holds(&self, outcome: bool) -> bool {
		let expected = if outcome { ConnectionState::Connected } else { ConnectionState::Error };

		self.state() == expected
	}

	async fn ping_upstream(&self) -> std::result::Result<(), String> {
		match self.upstream.ping().await {
			Ok(true) => Ok(()),
			Ok(false) => Err("The upstream ping returned an unexpected response.".to_string()),
			Err(err) => Err(err.to_string()),
		}
	}

	fn tracker(&self) -> MutexGuard<'_, ConnectionTracker> {
		self.tracker.lock().unwrap_or_else(PoisonError::into_inner)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const ALL: [ConnectionState; 4] = [
		ConnectionState::Disconnected,
		ConnectionState::Connecting,
		ConnectionState::Connected,
		ConnectionState::Error,
	];

	#[test]
	fn transition_table_matches_lifecycle() {
		let allowed: Vec<(ConnectionState, ConnectionState)> = ALL
			.iter()
			.flat_map(|from| ALL.iter().map(move |to| (*from, *to)))
			.filter(|(from, to)| from.can_transition_to(*to))
			.collect();

		assert_eq!(allowed.len(), 7);
		assert!(!ConnectionState::Disconnected.can_transition_to(ConnectionState::Connected));
		assert!(!ConnectionState::Connected.can_transition_to(ConnectionState::Connecting));
		assert!(!ConnectionState::Error.can_transition_to(ConnectionState::Connected));
	}

	#[test]
	fn illegal_transition_leaves_state_unchanged() {
		let mut tracker = ConnectionTracker::new(3);
		let err = tracker
			.transition(ConnectionState::Connected)
			.expect_err("Disconnected to Connected must be rejected.");

		assert!(matches!(
			err,
			Error::InvalidTransition {
				from: ConnectionState::Disconnected,
				to: ConnectionState::Connected
			}
		));
		assert_eq!(tracker.state(), ConnectionState::Disconnected);
	}

	#[test]
	fn retries_are_bounded() {
		let mut tracker = ConnectionTracker::new(2);

		assert!(tracker.try_consume_retry());
		assert!(tracker.try_consume_retry());
		assert!(!tracker.try_consume_retry());
		assert_eq!(tracker.retry_count(), 2);
	}

	#[test]
	fn success_clears_error_and_retries() {
		let mut tracker = ConnectionTracker::new(3);

		tracker.transition(ConnectionState::Connecting).expect("legal");
		tracker.mark_failed("refused".to_string()).expect("legal");
		tracker.try_consume_retry();
		tracker.transition(ConnectionState::Connecting).expect("legal");
		tracker.mark_connected().expect("legal");

		assert_eq!(tracker.state(), ConnectionState::Connected);
		assert_eq!(tracker.retry_count(), 0);
		assert_eq!(tracker.last_error(), None);
	}

	#[test]
	fn recorded_error_keeps_state() {
		let mut tracker = ConnectionTracker::new(3);

		tracker.transition(ConnectionState::Connecting).expect("legal");
		tracker.mark_connected().expect("legal");
		tracker.record_error("ping timed out".to_string());

		assert_eq!(tracker.state(), ConnectionState::Connected);
		assert_eq!(tracker.last_error(), Some("ping timed out"));
	}

	#[test]
	fn force_disconnect_is_idempotent() {
		let mut tracker = ConnectionTracker::new(3);

		tracker.force_disconnected().expect("already disconnected");
		tracker.transition(ConnectionState::Connecting).expect("legal");
		tracker.force_disconnected().expect("legal");

		assert_eq!(tracker.state(), ConnectionState::Disconnected);
	}
}
