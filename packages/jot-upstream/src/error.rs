pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Failed to reach the upstream service during {operation}: {message}")]
	Connectivity { operation: &'static str, message: String },
	#[error("Upstream request timed out during {operation}.")]
	Timeout { operation: &'static str },
	#[error("Upstream rejected the API token during {operation}.")]
	Authentication { operation: &'static str },
	#[error("Upstream resource {resource} was not found.")]
	NotFound { resource: String },
	#[error("Upstream returned HTTP {status} during {operation}.")]
	Status { operation: &'static str, status: u16 },
	#[error("Upstream returned a malformed response during {operation}: {message}")]
	MalformedResponse { operation: &'static str, message: String },
	#[error("{message}")]
	InvalidConfig { message: String },
}
impl Error {
	pub(crate) fn from_reqwest(operation: &'static str, err: reqwest::Error) -> Self {
		if err.is_timeout() {
			Self::Timeout { operation }
		} else if err.is_decode() {
			Self::MalformedResponse { operation, message: err.to_string() }
		} else {
			Self::Connectivity { operation, message: err.to_string() }
		}
	}
}
