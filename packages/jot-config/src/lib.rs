mod error;
mod types;

pub use error::{Error, Result};
pub use types::{Config, RateLimit, Search, Service, Upstream, UpstreamMode};

use std::{env, fs, path::Path, str::FromStr};

pub fn load(path: &Path) -> Result<Config> {
	load_with_env(path, |key| env::var(key).ok())
}

/// Same as [`load`], with the environment lookup supplied by the caller.
pub fn load_with_env<F>(path: &Path, lookup: F) -> Result<Config>
where
	F: Fn(&str) -> Option<String>,
{
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	apply_env_overrides(&mut cfg, lookup)?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn apply_env_overrides<F>(cfg: &mut Config, lookup: F) -> Result<()>
where
	F: Fn(&str) -> Option<String>,
{
	let read = |key: &'static str| lookup(key).filter(|value| !value.trim().is_empty());

	if let Some(value) = read("JOPLIN_API_URL") {
		cfg.upstream.base_url = value;
	}
	if let Some(value) = read("JOPLIN_API_TOKEN") {
		cfg.upstream.api_token = value;
	}
	if let Some(value) = read("JOPLIN_TIMEOUT") {
		let secs: f64 = parse_override("JOPLIN_TIMEOUT", &value)?;

		if !secs.is_finite() || secs < 0.0 {
			return Err(Error::EnvOverride { key: "JOPLIN_TIMEOUT", value });
		}

		cfg.upstream.timeout_ms = (secs * 1_000.0).round() as u64;
	}
	if let Some(value) = read("JOPLIN_RATE_LIMIT") {
		cfg.rate_limit.requests_per_minute = parse_override("JOPLIN_RATE_LIMIT", &value)?;
	}
	if let Some(value) = read("JOPLIN_MAX_RETRIES") {
		cfg.upstream.max_retries = parse_override("JOPLIN_MAX_RETRIES", &value)?;
	}
	// The limiter-specific key wins over JOPLIN_RATE_LIMIT when both are set.
	if let Some(value) = read("RATE_LIMIT_RPM") {
		cfg.rate_limit.requests_per_minute = parse_override("RATE_LIMIT_RPM", &value)?;
	}
	if let Some(value) = read("RATE_LIMIT_BURST") {
		cfg.rate_limit.burst_size = parse_override("RATE_LIMIT_BURST", &value)?;
	}
	if let Some(value) = read("LOG_LEVEL") {
		cfg.service.log_level = value;
	}

	Ok(())
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.mcp_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.mcp_bind must be non-empty.".to_string(),
		});
	}
	if cfg.upstream.base_url.is_empty() {
		return Err(Error::Validation {
			message: "upstream.base_url must be non-empty.".to_string(),
		});
	}
	if cfg.upstream.mode == UpstreamMode::Http && cfg.upstream.api_token.trim().is_empty() {
		return Err(Error::Validation {
			message: "upstream.api_token is required when upstream.mode is http.".to_string(),
		});
	}
	if cfg.upstream.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "upstream.timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.rate_limit.requests_per_minute == 0 {
		return Err(Error::Validation {
			message: "rate_limit.requests_per_minute must be greater than zero.".to_string(),
		});
	}
	if cfg.rate_limit.burst_size == 0 {
		return Err(Error::Validation {
			message: "rate_limit.burst_size must be greater than zero.".to_string(),
		});
	}
	if cfg.search.cache_ttl_secs == 0 {
		return Err(Error::Validation {
			message: "search.cache_ttl_secs must be greater than zero.".to_string(),
		});
	}
	if cfg.search.sweep_interval_secs == 0 {
		return Err(Error::Validation {
			message: "search.sweep_interval_secs must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

/// Adds a missing scheme and drops trailing slashes from a base URL.
pub fn normalize_base_url(raw: &str) -> String {
	let trimmed = raw.trim().trim_end_matches('/');

	if trimmed.is_empty() {
		return String::new();
	}
	if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
		trimmed.to_string()
	} else {
		format!("http://{trimmed}")
	}
}

fn normalize(cfg: &mut Config) {
	cfg.upstream.base_url = normalize_base_url(&cfg.upstream.base_url);
	cfg.upstream.api_token = cfg.upstream.api_token.trim().to_string();

	if cfg.service.log_level.trim().is_empty() {
		cfg.service.log_level = "info".to_string();
	}
}

fn parse_override<T>(key: &'static str, value: &str) -> Result<T>
where
	T: FromStr,
{
	value.trim().parse().map_err(|_| Error::EnvOverride { key, value: value.to_string() })
}

#[cfg(test)]
mod tests {
	use crate::normalize_base_url;

	#[test]
	fn base_url_gains_scheme_and_loses_trailing_slash() {
		assert_eq!(normalize_base_url("localhost:41184/"), "http://localhost:41184");
		assert_eq!(normalize_base_url(" https://notes.lan:41184// "), "https://notes.lan:41184");
		assert_eq!(normalize_base_url("   "), "");
	}
}
