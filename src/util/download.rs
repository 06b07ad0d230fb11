use wasm_bindgen::JsCast;
use web_sys::{Blob, BlobPropertyBag, HtmlAnchorElement, Url};

fn browser_err(err: wasm_bindgen::JsValue) -> String {
	format!("{err:?}")
}

/// Clicks a hidden anchor pointing at `href` so the browser saves it.
pub fn trigger_download(href: &str, file_name: &str) -> Result<(), String> {
	let document = web_sys::window()
		.and_then(|w| w.document())
		.ok_or("document unavailable")?;
	let body = document.body().ok_or("document has no body")?;
	let anchor: HtmlAnchorElement = document
		.create_element("a")
		.map_err(browser_err)?
		.dyn_into()
		.map_err(|_| "anchor element has unexpected type".to_string())?;
	anchor.set_href(href);
	anchor.set_download(file_name);
	let _ = anchor.style().set_property("display", "none");
	body.append_child(&anchor).map_err(browser_err)?;
	anchor.click();
	body.remove_child(&anchor).map_err(browser_err)?;
	Ok(())
}

/// Saves raw bytes through a temporary object URL.
pub fn save_bytes(bytes: &[u8], content_type: &str, file_name: &str) -> Result<(), String> {
	let array = js_sys::Uint8Array::from(bytes);
	let parts = js_sys::Array::of1(&array);
	let options = BlobPropertyBag::new();
	options.set_type(content_type);
	let blob =
		Blob::new_with_u8_array_sequence_and_options(&parts, &options).map_err(browser_err)?;
	let url = Url::create_object_url_with_blob(&blob).map_err(browser_err)?;
	let result = trigger_download(&url, file_name);
	let _ = Url::revoke_object_url(&url);
	result
}

/// Keeps `[A-Za-z0-9_.-]`, replacing everything else with `_`.
pub fn sanitize_file_component(raw: &str) -> String {
	raw.chars()
		.map(|c| {
			if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
				c
			} else {
				'_'
			}
		})
		.collect()
}
