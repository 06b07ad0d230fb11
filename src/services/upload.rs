//! Attachment uploads with client-side validation and progress reporting.
//!
//! Uploads go through `XMLHttpRequest` rather than fetch because only XHR
//! exposes upload progress events.

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;

use futures::channel::oneshot;
use log::{debug, error, info};
use serde_json::Value;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{File, FormData, ProgressEvent, XmlHttpRequest, XmlHttpRequestUpload};

use crate::config::UploadConfig;
use crate::error::UploadError;

const MAX_ERROR_BODY: usize = 150;

/// One entry of the accepted-types list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AcceptPattern {
	/// `.pdf`, matched against the end of the file name.
	Extension(String),
	/// `image/*`, stored as `image/`.
	MimePrefix(String),
	Mime(String),
}

impl AcceptPattern {
	pub fn parse(raw: &str) -> Self {
		let raw = raw.trim();
		if raw.starts_with('.') {
			AcceptPattern::Extension(raw.to_lowercase())
		} else if let Some(major) = raw.strip_suffix("/*") {
			AcceptPattern::MimePrefix(format!("{}/", major.to_lowercase()))
		} else {
			AcceptPattern::Mime(raw.to_lowercase())
		}
	}

	pub fn matches(&self, file_name: &str, mime: &str) -> bool {
		match self {
			AcceptPattern::Extension(ext) => file_name.to_lowercase().ends_with(ext.as_str()),
			AcceptPattern::MimePrefix(prefix) => mime.to_lowercase().starts_with(prefix.as_str()),
			AcceptPattern::Mime(exact) => mime.eq_ignore_ascii_case(exact),
		}
	}
}

/// Callbacks for one upload.
#[derive(Clone, Default)]
pub struct UploadOptions {
	pub description: Option<String>,
	/// Percentage in `0.0..=100.0`.
	pub on_progress: Option<Rc<dyn Fn(f64)>>,
	pub on_complete: Option<Rc<dyn Fn(&Value)>>,
	/// Called before [`FileUploader::upload`] returns any error.
	pub on_error: Option<Rc<dyn Fn(&UploadError)>>,
}

impl UploadOptions {
	fn report(&self, err: &UploadError) {
		match &self.on_error {
			Some(on_error) => on_error(err),
			None => error!("file upload error: {err}"),
		}
	}
}

/// Outcome of the transfer, before interpretation.
#[derive(Clone, Debug)]
struct RawResponse {
	status: u16,
	body: String,
}

pub struct FileUploader {
	endpoint: String,
	max_size: u64,
	accepted: Vec<AcceptPattern>,
	accepted_display: String,
}

fn client_err(err: JsValue) -> UploadError {
	UploadError::Client(
		err.as_string()
			.unwrap_or_else(|| format!("unexpected client error: {err:?}")),
	)
}

impl FileUploader {
	pub fn new(api_base: &str, config: &UploadConfig) -> Self {
		Self {
			endpoint: format!("{api_base}/upload"),
			max_size: config.max_size,
			accepted: config.accepted_types.iter().map(|t| AcceptPattern::parse(t)).collect(),
			accepted_display: config.accepted_types.join(", "),
		}
	}

	/// Size first, then type; nothing is sent when this fails.
	pub fn validate(&self, file_name: &str, mime: &str, size: u64) -> Result<(), UploadError> {
		if size > self.max_size {
			return Err(UploadError::TooLarge {
				limit_mb: format_megabytes(self.max_size),
			});
		}
		if !self.accepted.iter().any(|p| p.matches(file_name, mime)) {
			return Err(UploadError::UnsupportedType {
				name: file_name.into(),
				accepted: self.accepted_display.clone(),
			});
		}
		Ok(())
	}

	/// Uploads `file` as multipart form data, optionally tied to a segment.
	pub async fn upload(
		&self,
		file: &File,
		segment_id: Option<&str>,
		options: UploadOptions,
	) -> Result<Value, UploadError> {
		let (name, mime) = (file.name(), file.type_());
		self.upload_checked(&name, &mime, file.size() as u64, &options, || {
			self.transfer(file, segment_id, &options)
		})
		.await
	}

	/// Validates, runs `send` only for a valid file, then reports the
	/// outcome through `options` before returning it.
	async fn upload_checked<F, Fut>(
		&self,
		name: &str,
		mime: &str,
		size: u64,
		options: &UploadOptions,
		send: F,
	) -> Result<Value, UploadError>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<Value, UploadError>>,
	{
		let result = match self.validate(name, mime, size) {
			Ok(()) => send().await,
			Err(err) => Err(err),
		};
		match &result {
			Ok(body) => {
				info!("uploaded {name}");
				if let Some(on_complete) = &options.on_complete {
					on_complete(body);
				}
			}
			Err(err) => options.report(err),
		}
		result
	}

	async fn transfer(
		&self,
		file: &File,
		segment_id: Option<&str>,
		options: &UploadOptions,
	) -> Result<Value, UploadError> {
		let form = FormData::new().map_err(client_err)?;
		form.append_with_blob("file", file).map_err(client_err)?;
		if let Some(id) = segment_id.filter(|id| !id.is_empty()) {
			form.append_with_str("segment_id", id).map_err(client_err)?;
		}
		if let Some(description) = options.description.as_deref() {
			form.append_with_str("description", description).map_err(client_err)?;
		}

		let xhr = XmlHttpRequest::new().map_err(client_err)?;
		let (tx, rx) = oneshot::channel::<Option<RawResponse>>();
		let tx = Rc::new(RefCell::new(Some(tx)));

		let on_progress = options.on_progress.clone();
		let progress = Closure::<dyn FnMut(ProgressEvent)>::new(move |ev: ProgressEvent| {
			if ev.length_computable() && ev.total() > 0.0 {
				if let Some(cb) = &on_progress {
					cb(ev.loaded() / ev.total() * 100.0);
				}
			}
		});

		let load = {
			let (xhr, tx) = (xhr.clone(), tx.clone());
			Closure::<dyn FnMut()>::new(move || {
				let response = RawResponse {
					status: xhr.status().unwrap_or(0),
					body: xhr.response_text().ok().flatten().unwrap_or_default(),
				};
				if let Some(tx) = tx.borrow_mut().take() {
					let _ = tx.send(Some(response));
				}
			})
		};
		let fail = {
			let tx = tx.clone();
			Closure::<dyn FnMut()>::new(move || {
				if let Some(tx) = tx.borrow_mut().take() {
					let _ = tx.send(None);
				}
			})
		};

		let mut guard = XhrGuard {
			upload: xhr.upload().map_err(client_err)?,
			xhr,
			finished: false,
			_closures: (progress, load, fail),
		};
		guard.attach();
		guard.xhr.open("POST", &self.endpoint).map_err(client_err)?;
		guard
			.xhr
			.send_with_opt_form_data(Some(&form))
			.map_err(client_err)?;
		debug!("upload of {} started", file.name());

		let response = rx.await.ok().flatten();
		guard.finished = true;
		let response = response.ok_or(UploadError::Network)?;
		interpret_response(response.status, &response.body)
	}
}

/// Owns the XHR callbacks. On drop the handlers are detached before the
/// closures are freed, and an unfinished request is aborted.
struct XhrGuard {
	xhr: XmlHttpRequest,
	upload: XmlHttpRequestUpload,
	finished: bool,
	_closures: (
		Closure<dyn FnMut(ProgressEvent)>,
		Closure<dyn FnMut()>,
		Closure<dyn FnMut()>,
	),
}

impl XhrGuard {
	fn attach(&self) {
		let (progress, load, fail) = &self._closures;
		self.upload
			.set_onprogress(Some(progress.as_ref().unchecked_ref()));
		self.xhr.set_onload(Some(load.as_ref().unchecked_ref()));
		// Abort and timeout settle the transfer like a network error.
		let fail = Some(fail.as_ref().unchecked_ref());
		self.xhr.set_onerror(fail);
		self.xhr.set_onabort(fail);
		self.xhr.set_ontimeout(fail);
	}
}

impl Drop for XhrGuard {
	fn drop(&mut self) {
		self.upload.set_onprogress(None);
		self.xhr.set_onload(None);
		self.xhr.set_onerror(None);
		self.xhr.set_onabort(None);
		self.xhr.set_ontimeout(None);
		if !self.finished {
			debug!("upload dropped before completion, aborting");
			let _ = self.xhr.abort();
		}
	}
}

/// `104857600` bytes → `"100"`, `1572864` → `"1.5"`.
pub fn format_megabytes(bytes: u64) -> String {
	let mb = bytes as f64 / 1024.0 / 1024.0;
	if mb.fract() == 0.0 {
		format!("{mb:.0}")
	} else {
		format!("{}", (mb * 100.0).round() / 100.0)
	}
}

fn truncate(text: &str) -> String {
	if text.chars().count() > MAX_ERROR_BODY {
		let head: String = text.chars().take(MAX_ERROR_BODY).collect();
		format!("{head}...")
	} else {
		text.to_string()
	}
}

/// Maps a finished transfer onto the upload result.
pub fn interpret_response(status: u16, body: &str) -> Result<Value, UploadError> {
	if status == 200 {
		return serde_json::from_str(body).map_err(|_| UploadError::MalformedResponse);
	}
	let message = match serde_json::from_str::<Value>(body) {
		Ok(json) => match json.get("error").and_then(Value::as_str) {
			Some(err) => format!("Upload failed: {err}"),
			None if !body.is_empty() => format!("Upload failed: {}", truncate(body)),
			None => "Upload failed".to_string(),
		},
		Err(_) if body.is_empty() => "Upload failed".to_string(),
		Err(_) if body.chars().count() < MAX_ERROR_BODY => format!("Upload failed: {body}"),
		Err(_) => "Upload failed, the server response could not be parsed.".to_string(),
	};
	Err(UploadError::Rejected { status, message })
}
