use crate::connection::ConnectionState;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Cannot reach the note service during {operation}: {message}")]
	Connectivity { operation: &'static str, message: String },
	#[error("The note service rejected the API token during {operation}.")]
	Authentication { operation: &'static str },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Rate limit exceeded: {message}")]
	RateLimited { message: String },
	#[error("Malformed response during {operation}: {message}")]
	MalformedResponse { operation: &'static str, message: String },
	#[error("Invalid request: {message}")]
	Validation { message: String },
	#[error("Upstream failure during {operation}: {message}")]
	Upstream { operation: &'static str, message: String },
	#[error("Illegal connection state transition from {from} to {to}.")]
	InvalidTransition { from: ConnectionState, to: ConnectionState },
}
impl Error {
	/// Maps an upstream failure onto the service taxonomy, keeping the operation name.
	pub fn from_upstream(operation: &'static str, err: jot_upstream::Error) -> Self {
		use jot_upstream::Error as Upstream;

		match err {
			Upstream::Connectivity { message, .. } => Self::Connectivity { operation, message },
			Upstream::Timeout { .. } =>
				Self::Connectivity { operation, message: "The request timed out.".to_string() },
			Upstream::Authentication { .. } => Self::Authentication { operation },
			Upstream::NotFound { resource } =>
				Self::NotFound { message: format!("{resource} does not exist.") },
			Upstream::MalformedResponse { message, .. } =>
				Self::MalformedResponse { operation, message },
			Upstream::Status { status, .. } =>
				Self::Upstream { operation, message: format!("HTTP {status}.") },
			Upstream::InvalidConfig { message } => Self::Upstream { operation, message },
		}
	}

	/// Upstream payload that failed domain validation.
	pub(crate) fn malformed(operation: &'static str, err: jot_domain::Error) -> Self {
		Self::MalformedResponse { operation, message: err.to_string() }
	}

	/// Stable snake_case label for logs and tool error payloads.
	pub fn category(&self) -> &'static str {
		match self {
			Self::Connectivity { .. } => "connectivity",
			Self::Authentication { .. } => "authentication",
			Self::NotFound { .. } => "not_found",
			Self::RateLimited { .. } => "rate_limited",
			Self::MalformedResponse { .. } => "malformed_response",
			Self::Validation { .. } => "validation",
			Self::Upstream { .. } => "upstream",
			Self::InvalidTransition { .. } => "internal",
		}
	}
}

impl From<jot_domain::Error> for Error {
	fn from(err: jot_domain::Error) -> Self {
		Self::Validation { message: err.to_string() }
	}
}
