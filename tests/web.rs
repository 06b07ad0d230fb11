//! Browser-only checks, run with `wasm-pack test --headless --firefox`.

#![cfg(target_arch = "wasm32")]

use std::cell::Cell;
use std::rc::Rc;

use segment_desk::config::UploadConfig;
use segment_desk::error::UploadError;
use segment_desk::services::history::SearchHistory;
use segment_desk::services::print::{expand_for_print, restore_after_print};
use segment_desk::services::storage::{BrowserStorage, StorageBackend, StorageManager};
use segment_desk::services::upload::{FileUploader, UploadOptions};
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn local(namespace: &str) -> StorageManager {
	let backend: Rc<dyn StorageBackend> = Rc::new(BrowserStorage::open().expect("localStorage"));
	StorageManager::new(backend, namespace)
}

#[wasm_bindgen_test]
fn values_survive_in_local_storage() {
	let storage = local("test_web_");
	storage.clear();
	assert!(storage.set("answer", &42));
	assert_eq!(storage.get::<i32>("answer"), Some(42));

	let raw = web_sys::window()
		.and_then(|w| w.local_storage().ok().flatten())
		.and_then(|s| s.get_item("test_web_answer").ok().flatten());
	assert_eq!(raw.as_deref(), Some("42"));

	storage.clear();
	assert_eq!(storage.get::<i32>("answer"), None);
}

#[wasm_bindgen_test]
fn clear_leaves_other_namespaces_alone() {
	let ours = local("test_ours_");
	let theirs = local("test_theirs_");
	theirs.set("keep", "yes");
	ours.set("drop", "no");
	ours.clear();
	assert_eq!(theirs.get::<String>("keep").as_deref(), Some("yes"));
	assert!(!ours.contains("drop"));
	theirs.clear();
}

#[wasm_bindgen_test]
fn history_persists_across_instances() {
	let storage = local("test_history_");
	storage.clear();
	SearchHistory::new(storage.clone(), 20).add("頸痛");
	let reloaded = SearchHistory::new(local("test_history_"), 20);
	assert_eq!(reloaded.entries()[0].query, "頸痛");
	storage.clear();
}

#[wasm_bindgen_test]
fn print_opens_only_closed_sections_and_restores_them() {
	let doc = web_sys::window().and_then(|w| w.document()).expect("document");
	let body = doc.body().expect("body");
	let closed = doc.create_element("div").expect("div");
	closed.set_class_name("collapse");
	let open = doc.create_element("div").expect("div");
	open.set_class_name("collapse show");
	body.append_child(&closed).expect("append");
	body.append_child(&open).expect("append");

	assert_eq!(expand_for_print(&doc), 1);
	assert!(closed.class_list().contains("show"));
	assert_eq!(closed.get_attribute("data-print-expanded").as_deref(), Some("true"));

	assert_eq!(restore_after_print(&doc), 1);
	assert!(!closed.class_list().contains("show"));
	assert!(!closed.has_attribute("data-print-expanded"));
	assert!(open.class_list().contains("show"));

	closed.remove();
	open.remove();
}

#[wasm_bindgen_test]
async fn unreachable_upload_settles_as_network_error() {
	let bits = js_sys::Array::of1(&"intake notes".into());
	let file = web_sys::File::new_with_str_sequence(&bits, "intake.pdf").expect("file");
	let errors = Rc::new(Cell::new(0));
	let counter = errors.clone();
	let options = UploadOptions {
		on_error: Some(Rc::new(move |_: &UploadError| counter.set(counter.get() + 1))),
		..Default::default()
	};

	let uploader = FileUploader::new("http://127.0.0.1:9", &UploadConfig::default());
	let result = uploader.upload(&file, Some("seg-1"), options).await;
	assert!(matches!(result, Err(UploadError::Network)), "{result:?}");
	assert_eq!(errors.get(), 1);
}
