use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::time::Instant;

use crate::JotService;

/// Reports younger than this are served from memory.
pub const HEALTH_CACHE_TTL: Duration = Duration::from_secs(30);
const UTILIZATION_DEGRADED_PERCENT: f64 = 70.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
	Healthy,
	Degraded,
	Unhealthy,
	Unknown,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthCheck {
	pub name: &'static str,
	pub status: HealthStatus,
	pub message: String,
	pub response_time_ms: u64,
	pub details: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
	pub status: HealthStatus,
	pub checks: Vec<HealthCheck>,
	pub total_response_time_ms: u64,
}

/// Worst status wins: unhealthy, then degraded, then unknown.
pub fn overall_status(checks: &[HealthCheck]) -> HealthStatus {
	let any = |status| checks.iter().any(|check| check.status == status);

	if any(HealthStatus::Unhealthy) {
		HealthStatus::Unhealthy
	} else if any(HealthStatus::Degraded) {
		HealthStatus::Degraded
	} else if any(HealthStatus::Unknown) || checks.is_empty() {
		HealthStatus::Unknown
	} else {
		HealthStatus::Healthy
	}
}

impl JotService {
	pub async fn health(&self) -> HealthReport {
		{
			let cached = self.health_cache();

			if let Some((at, report)) = cached.as_ref()
				&& at.elapsed() < HEALTH_CACHE_TTL
			{
				tracing::debug!("Returning cached health report.");

				return report.clone();
			}
		}

		let started = Instant::now();
		let checks = vec![self.check_upstream().await, self.check_rate_limiter()];
		let report = HealthReport {
			status: overall_status(&checks),
			checks,
			total_response_time_ms: started.elapsed().as_millis() as u64,
		};

		tracing::info!(status = ?report.status, "Health check completed.");

		*self.health_cache() = Some((Instant::now(), report.clone()));

		report
	}

	async fn check_upstream(&self) -> HealthCheck {
		let health = self.connection.health_check().await;
		let (status, message) = match &health.error {
			None => (HealthStatus::Healthy, "Upstream note service is reachable.".to_string()),
			Some(error) => (HealthStatus::Unhealthy, format!("Upstream ping failed: {error}")),
		};

		HealthCheck {
			name: "upstream_connection",
			status,
			message,
			response_time_ms: health.response_time_ms,
			details: serde_json::to_value(&health.connection_info).unwrap_or(Value::Null),
		}
	}

	fn check_rate_limiter(&self) -> HealthCheck {
		let status = self.rate_limiter.status();
		let degraded = status.utilization_percent > UTILIZATION_DEGRADED_PERCENT
			|| status.tokens_available < 1.0;
		let (health, message) = if degraded {
			(
				HealthStatus::Degraded,
				format!(
					"Rate limiter is under pressure at {:.1}% utilization.",
					status.utilization_percent
				),
			)
		} else {
			(HealthStatus::Healthy, "Rate limiter has capacity.".to_string())
		};

		HealthCheck {
			name: "rate_limiter",
			status: health,
			message,
			response_time_ms: 0,
			details: serde_json::to_value(&status).unwrap_or(Value::Null),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn check(status: HealthStatus) -> HealthCheck {
		HealthCheck {
			name: "c",
			status,
			message: String::new(),
			response_time_ms: 0,
			details: Value::Null,
		}
	}

	#[test]
	fn worst_status_wins() {
		use HealthStatus::*;

		assert_eq!(overall_status(&[check(Healthy), check(Healthy)]), Healthy);
		assert_eq!(overall_status(&[check(Healthy), check(Unknown)]), Unknown);
		assert_eq!(overall_status(&[check(Unknown), check(Degraded)]), Degraded);
		assert_eq!(overall_status(&[check(Degraded), check(Unhealthy)]), Unhealthy);
		assert_eq!(overall_status(&[]), Unknown);
	}
}
