use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
	pub service: Service,
	pub upstream: Upstream,
	pub rate_limit: RateLimit,
	pub search: Search,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Service {
	pub mcp_bind: String,
	pub log_level: String,
}
impl Default for Service {
	fn default() -> Self {
		Self { mcp_bind: "127.0.0.1:8765".to_string(), log_level: "info".to_string() }
	}
}

/// Which upstream client variant the process wires up at startup.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpstreamMode {
	#[default]
	Http,
	/// In-memory sample notebook, for local runs without a Joplin instance.
	Stub,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Upstream {
	pub mode: UpstreamMode,
	pub base_url: String,
	pub api_token: String,
	pub timeout_ms: u64,
	/// Retries after the first failed ping, so a full cycle makes `max_retries + 1` attempts.
	pub max_retries: u32,
	pub retry_delay_ms: u64,
}
impl Default for Upstream {
	fn default() -> Self {
		Self {
			mode: UpstreamMode::Http,
			base_url: "http://localhost:41184".to_string(),
			api_token: String::new(),
			timeout_ms: 30_000,
			max_retries: 3,
			retry_delay_ms: 1_000,
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RateLimit {
	pub requests_per_minute: u32,
	/// Bucket capacity and the initial token count.
	pub burst_size: u32,
}
impl Default for RateLimit {
	fn default() -> Self {
		Self { requests_per_minute: 60, burst_size: 10 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Search {
	pub cache_ttl_secs: u64,
	pub sweep_interval_secs: u64,
}
impl Default for Search {
	fn default() -> Self {
		Self { cache_ttl_secs: 300, sweep_interval_secs: 300 }
	}
}
