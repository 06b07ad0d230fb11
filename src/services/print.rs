//! Print layout: collapsed sections are opened for printing and closed
//! again afterwards.

use leptos_dom::helpers::{WindowListenerHandle, window_event_listener_untyped};
use log::{debug, info};
use wasm_bindgen::JsCast;
use web_sys::{Document, Element};

const MARK: &str = "data-print-expanded";

fn elements(doc: &Document, selector: &str) -> Vec<Element> {
	let Ok(nodes) = doc.query_selector_all(selector) else {
		return Vec::new();
	};
	(0..nodes.length())
		.filter_map(|i| nodes.item(i))
		.filter_map(|node| node.dyn_into::<Element>().ok())
		.collect()
}

/// Shows every closed `.collapse` section and marks it. Returns how many
/// were opened.
pub fn expand_for_print(doc: &Document) -> usize {
	let closed = elements(doc, ".collapse:not(.show)");
	for el in &closed {
		let _ = el.class_list().add_1("show");
		let _ = el.set_attribute(MARK, "true");
	}
	debug!("expanded {} sections for printing", closed.len());
	closed.len()
}

/// Closes only the sections [`expand_for_print`] opened.
pub fn restore_after_print(doc: &Document) -> usize {
	let marked = elements(doc, &format!(".collapse[{MARK}=\"true\"]"));
	for el in &marked {
		let _ = el.class_list().remove_1("show");
		let _ = el.remove_attribute(MARK);
	}
	marked.len()
}

fn with_document(f: impl Fn(&Document) -> usize) -> impl Fn(web_sys::Event) {
	move |_| {
		if let Some(doc) = web_sys::window().and_then(|w| w.document()) {
			f(&doc);
		}
	}
}

/// Wires the window's print events. Remove both handles on unmount.
pub fn install() -> [WindowListenerHandle; 2] {
	let before = window_event_listener_untyped("beforeprint", with_document(|doc| {
		info!("preparing page for print");
		expand_for_print(doc)
	}));
	let after = window_event_listener_untyped("afterprint", with_document(|doc| {
		info!("print finished");
		restore_after_print(doc)
	}));
	[before, after]
}
