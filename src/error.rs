//! Error types shared by the client services.

use thiserror::Error;

/// Failures talking to the JSON endpoints (tag search, session export).
#[derive(Debug, Error)]
pub enum ApiError {
	/// The request never produced a response.
	#[error("network error: {0}")]
	Network(String),
	/// The server answered with a non-success status.
	#[error("{detail} (status {status})")]
	Status { status: u16, detail: String },
	/// The response body was not what we expected.
	#[error("could not decode response: {0}")]
	Decode(String),
	/// A browser API refused the operation.
	#[error("browser error: {0}")]
	Browser(String),
	#[error("Export failed: no session id given")]
	MissingSession,
}

impl From<reqwest::Error> for ApiError {
	fn from(err: reqwest::Error) -> Self {
		if err.is_decode() {
			ApiError::Decode(err.to_string())
		} else {
			ApiError::Network(err.to_string())
		}
	}
}

/// Failures of [`crate::services::upload::FileUploader::upload`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UploadError {
	#[error("File exceeds the size limit (max {limit_mb}MB)")]
	TooLarge { limit_mb: String },
	#[error("Unsupported file type: \"{name}\". Accepted types: {accepted}")]
	UnsupportedType { name: String, accepted: String },
	#[error("Upload succeeded, but the response could not be parsed.")]
	MalformedResponse,
	#[error("{message} (status {status})")]
	Rejected { status: u16, message: String },
	#[error("Network error, the upload could not be completed.")]
	Network,
	#[error("{0}")]
	Client(String),
}

impl UploadError {
	/// Validation failures are raised before any request is made.
	pub fn is_validation(&self) -> bool {
		matches!(self, UploadError::TooLarge { .. } | UploadError::UnsupportedType { .. })
	}
}

/// Persistent storage failures. These never reach callers of
/// [`crate::services::storage::StorageManager`]; they are only logged.
#[derive(Debug, Error)]
pub enum StorageError {
	#[error("storage is unavailable")]
	Unavailable,
	#[error("serialization failed: {0}")]
	Serialize(#[from] serde_json::Error),
	#[error("storage backend rejected the operation: {0}")]
	Backend(String),
}

/// A chord string that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShortcutError {
	#[error("empty chord")]
	Empty,
	#[error("chord `{0}` has no key")]
	MissingKey(String),
	#[error("unknown modifier `{modifier}` in chord `{chord}`")]
	UnknownModifier { chord: String, modifier: String },
}
