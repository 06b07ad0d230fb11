use log::{debug, info};
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::components::tag_autocomplete::Tag;
use crate::error::ApiError;
use crate::util::download::{sanitize_file_component, save_bytes};

/// Parameters of `GET /api/tags/search`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TagQuery {
	pub text: String,
	/// Relation context such as `symptom_to_cause`.
	pub context: Option<String>,
	pub category: Option<String>,
}

impl TagQuery {
	pub fn new(text: impl Into<String>) -> Self {
		Self {
			text: text.into(),
			..Default::default()
		}
	}
}

/// A downloaded session export.
#[derive(Clone, Debug)]
pub struct ExportedFile {
	pub file_name: String,
	pub content_type: String,
	pub bytes: Vec<u8>,
}

#[derive(Deserialize)]
struct ErrorBody {
	error: Option<String>,
}

/// Client for the JSON endpoints of the knowledge server.
#[derive(Clone)]
pub struct ApiClient {
	http: Client,
	base: String,
}

impl ApiClient {
	pub fn new(base: impl Into<String>) -> Self {
		Self {
			http: Client::new(),
			base: base.into(),
		}
	}

	fn url(&self, path: &str, params: &[(&str, &str)]) -> Result<Url, ApiError> {
		Url::parse_with_params(&format!("{}{}", self.base, path), params)
			.map_err(|err| ApiError::Browser(format!("invalid url for {path}: {err}")))
	}

	pub fn search_url(&self, query: &TagQuery) -> Result<Url, ApiError> {
		let mut params = vec![("q", query.text.as_str())];
		if let Some(context) = query.context.as_deref().filter(|c| !c.is_empty()) {
			params.push(("context", context));
		}
		if let Some(category) = query.category.as_deref().filter(|c| !c.is_empty()) {
			params.push(("category", category));
		}
		self.url("/api/tags/search", &params)
	}

	pub async fn search_tags(&self, query: &TagQuery) -> Result<Vec<Tag>, ApiError> {
		let url = self.search_url(query)?;
		debug!("searching tags: {url}");
		let response = self.http.get(url).send().await?;
		let status = response.status();
		if !status.is_success() {
			return Err(ApiError::Status {
				status: status.as_u16(),
				detail: "tag search failed".into(),
			});
		}
		Ok(response.json().await?)
	}

	/// Fetches `/api/session/{id}/export` without saving it.
	pub async fn fetch_export(&self, session_id: &str, format: &str) -> Result<ExportedFile, ApiError> {
		if session_id.trim().is_empty() {
			return Err(ApiError::MissingSession);
		}
		let path = format!("/api/session/{session_id}/export");
		let response = self.http.get(self.url(&path, &[("format", format)])?).send().await?;
		let status = response.status();
		if !status.is_success() {
			let fallback = status.canonical_reason().unwrap_or("error").to_string();
			let body = response.text().await.unwrap_or_default();
			return Err(ApiError::Status {
				status: status.as_u16(),
				detail: format!("Export failed: {}", error_detail(&body, fallback)),
			});
		}
		let content_type = response
			.headers()
			.get(reqwest::header::CONTENT_TYPE)
			.and_then(|v| v.to_str().ok())
			.unwrap_or("application/octet-stream")
			.to_string();
		let bytes = response.bytes().await?.to_vec();
		Ok(ExportedFile {
			file_name: export_file_name(session_id, format),
			content_type,
			bytes,
		})
	}

	/// Fetches the export and hands it to the browser as a download.
	pub async fn export_session(&self, session_id: &str, format: &str) -> Result<String, ApiError> {
		let file = self.fetch_export(session_id, format).await?;
		save_bytes(&file.bytes, &file.content_type, &file.file_name).map_err(ApiError::Browser)?;
		info!("exported session {session_id} as {}", file.file_name);
		Ok(file.file_name)
	}
}

/// `error` from a JSON error body, or `fallback`.
pub fn error_detail(body: &str, fallback: String) -> String {
	serde_json::from_str::<ErrorBody>(body)
		.ok()
		.and_then(|b| b.error)
		.unwrap_or(fallback)
}

pub fn export_file_name(session_id: &str, format: &str) -> String {
	format!(
		"session_{}.{}",
		sanitize_file_component(session_id),
		sanitize_file_component(format)
	)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn client() -> ApiClient {
		ApiClient::new("http://localhost:5000")
	}

	#[test]
	fn search_url_encodes_query() {
		let url = client().search_url(&TagQuery::new("頸 痛&x")).unwrap();
		assert_eq!(url.path(), "/api/tags/search");
		let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
		assert_eq!(pairs, vec![("q".into(), "頸 痛&x".into())]);
	}

	#[test]
	fn search_url_appends_context_and_category() {
		let query = TagQuery {
			text: "neck".into(),
			context: Some("symptom_to_cause".into()),
			category: Some(String::new()),
		};
		let url = client().search_url(&query).unwrap();
		assert_eq!(url.query(), Some("q=neck&context=symptom_to_cause"));
	}

	#[test]
	fn error_detail_prefers_server_message() {
		assert_eq!(
			error_detail(r#"{"error":"session not found"}"#, "Not Found".into()),
			"session not found"
		);
		assert_eq!(error_detail("<html>", "Not Found".into()), "Not Found");
		assert_eq!(error_detail("{}", "Bad Request".into()), "Bad Request");
	}

	#[test]
	fn export_names_are_sanitized() {
		assert_eq!(export_file_name("42", "json"), "session_42.json");
		assert_eq!(export_file_name("../1", "md"), "session_.._1.md");
	}

	#[test]
	fn export_without_session_fails_before_request() {
		let err = futures::executor::block_on(client().fetch_export("  ", "json")).unwrap_err();
		assert!(matches!(err, ApiError::MissingSession));
	}
}
