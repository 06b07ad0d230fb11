//! Runtime settings for the client. Everything has a sensible default; the
//! only value read from the environment is the API origin.

use std::time::Duration;

use log::warn;

/// Settings consumed by the services and components.
#[derive(Clone, Debug)]
pub struct ClientConfig {
	/// Origin the REST endpoints live under, without a trailing slash.
	pub api_base: String,
	pub search_debounce: Duration,
	pub draft_debounce: Duration,
	pub upload: UploadConfig,
	pub history_cap: usize,
	/// Prefix applied to every persisted key.
	pub storage_namespace: String,
	pub toast_timeout: Duration,
	pub max_toasts: usize,
	pub graph: GraphConfig,
}

/// Limits applied by the file uploader before anything is sent.
#[derive(Clone, Debug)]
pub struct UploadConfig {
	pub max_size: u64,
	pub accepted_types: Vec<String>,
}

/// Interaction settings for the relationship graph.
#[derive(Clone, Debug)]
pub struct GraphConfig {
	pub min_scale: f64,
	pub max_scale: f64,
	pub highlight_window: Duration,
	pub transition: Duration,
}

pub const DEFAULT_MAX_UPLOAD: u64 = 100 * 1024 * 1024;

impl Default for UploadConfig {
	fn default() -> Self {
		Self {
			max_size: DEFAULT_MAX_UPLOAD,
			accepted_types: ["image/*", "video/*", ".pdf", ".doc", ".docx"]
				.into_iter()
				.map(String::from)
				.collect(),
		}
	}
}

impl Default for GraphConfig {
	fn default() -> Self {
		Self {
			min_scale: 0.1,
			max_scale: 4.0,
			highlight_window: Duration::from_secs(3),
			transition: Duration::from_millis(750),
		}
	}
}

impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			api_base: String::new(),
			search_debounce: Duration::from_millis(300),
			draft_debounce: Duration::from_millis(1000),
			upload: UploadConfig::default(),
			history_cap: 20,
			storage_namespace: "kms_".into(),
			toast_timeout: Duration::from_secs(5),
			max_toasts: 5,
			graph: GraphConfig::default(),
		}
	}
}

impl ClientConfig {
	/// Defaults, with the API base taken from `window.location.origin`.
	pub fn from_window() -> Self {
		let api_base = web_sys::window()
			.and_then(|w| w.location().origin().ok())
			.unwrap_or_else(|| {
				warn!("window origin unavailable, using relative API paths");
				String::new()
			});
		Self::default().with_api_base(api_base)
	}

	pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
		self.api_base = base.into().trim_end_matches('/').to_string();
		self
	}
}
