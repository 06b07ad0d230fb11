//! Form draft auto-save.
//!
//! A draft is one JSON object per form: checkbox fields map to booleans, a
//! radio group to the value of its checked option, everything else to the
//! field's string value. Drafts live until [`DraftStore::clear`] is called.

use std::rc::Rc;
use std::time::Duration;

use log::{debug, info};
use serde_json::{Map, Value};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
	Element, Event, HtmlFormElement, HtmlInputElement, HtmlSelectElement, HtmlTextAreaElement,
};

use super::storage::StorageManager;
use crate::util::{BrowserScheduler, Debounced, Scheduler, debounce};

pub type Draft = Map<String, Value>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
	Text,
	TextArea,
	Select,
	Checkbox,
	Radio,
}

impl FieldKind {
	/// Toggles and selects save on `change`, without debounce.
	pub fn saves_immediately(self) -> bool {
		matches!(self, FieldKind::Checkbox | FieldKind::Radio | FieldKind::Select)
	}
}

/// Snapshot of one named form control.
#[derive(Clone, Debug, PartialEq)]
pub struct FormField {
	pub name: String,
	pub kind: FieldKind,
	pub value: String,
	pub checked: bool,
}

impl FormField {
	pub fn text(name: &str, value: &str) -> Self {
		Self::new(name, FieldKind::Text, value, false)
	}

	pub fn checkbox(name: &str, checked: bool) -> Self {
		Self::new(name, FieldKind::Checkbox, "on", checked)
	}

	pub fn radio(name: &str, value: &str, checked: bool) -> Self {
		Self::new(name, FieldKind::Radio, value, checked)
	}

	pub fn new(name: &str, kind: FieldKind, value: &str, checked: bool) -> Self {
		Self {
			name: name.into(),
			kind,
			value: value.into(),
			checked,
		}
	}
}

/// Serializes every named field.
pub fn capture(fields: &[FormField]) -> Draft {
	let mut draft = Draft::new();
	for field in fields.iter().filter(|f| !f.name.is_empty()) {
		match field.kind {
			FieldKind::Checkbox => {
				draft.insert(field.name.clone(), Value::Bool(field.checked));
			}
			FieldKind::Radio => {
				if field.checked {
					draft.insert(field.name.clone(), Value::String(field.value.clone()));
				}
			}
			_ => {
				draft.insert(field.name.clone(), Value::String(field.value.clone()));
			}
		}
	}
	draft
}

/// Applies `draft` to fields with matching names, respecting their kind.
pub fn restore(draft: &Draft, fields: &mut [FormField]) {
	for field in fields.iter_mut() {
		let Some(saved) = draft.get(&field.name) else {
			continue;
		};
		match field.kind {
			FieldKind::Checkbox => field.checked = saved.as_bool().unwrap_or(false),
			FieldKind::Radio => field.checked = saved.as_str() == Some(field.value.as_str()),
			_ => {
				field.value = match saved {
					Value::String(s) => s.clone(),
					Value::Null => String::new(),
					other => other.to_string(),
				}
			}
		}
	}
}

/// Drafts persisted under `draft_{form_id}`.
#[derive(Clone)]
pub struct DraftStore {
	storage: StorageManager,
}

impl DraftStore {
	pub fn new(storage: StorageManager) -> Self {
		Self { storage }
	}

	fn key(form_id: &str) -> String {
		format!("draft_{form_id}")
	}

	pub fn save(&self, form_id: &str, draft: &Draft) {
		if self.storage.set(&Self::key(form_id), draft) {
			debug!("draft saved for {form_id}");
		}
	}

	pub fn load(&self, form_id: &str) -> Option<Draft> {
		let draft = self.storage.get(&Self::key(form_id));
		if draft.is_some() {
			info!("draft loaded for {form_id}");
		}
		draft
	}

	pub fn clear(&self, form_id: &str) {
		self.storage.remove(&Self::key(form_id));
		info!("draft cleared for {form_id}");
	}
}

enum Control {
	Input(HtmlInputElement),
	TextArea(HtmlTextAreaElement),
	Select(HtmlSelectElement),
}

impl Control {
	fn from_element(el: Element) -> Option<Self> {
		let el = match el.dyn_into::<HtmlInputElement>() {
			Ok(input) => return Some(Control::Input(input)),
			Err(el) => el,
		};
		let el = match el.dyn_into::<HtmlTextAreaElement>() {
			Ok(area) => return Some(Control::TextArea(area)),
			Err(el) => el,
		};
		el.dyn_into::<HtmlSelectElement>().ok().map(Control::Select)
	}

	fn element(&self) -> &Element {
		match self {
			Control::Input(i) => i,
			Control::TextArea(t) => t,
			Control::Select(s) => s,
		}
	}

	fn snapshot(&self) -> FormField {
		match self {
			Control::Input(i) => {
				let kind = match i.type_().as_str() {
					"checkbox" => FieldKind::Checkbox,
					"radio" => FieldKind::Radio,
					_ => FieldKind::Text,
				};
				FormField::new(&i.name(), kind, &i.value(), i.checked())
			}
			Control::TextArea(t) => FormField::new(&t.name(), FieldKind::TextArea, &t.value(), false),
			Control::Select(s) => FormField::new(&s.name(), FieldKind::Select, &s.value(), false),
		}
	}

	fn apply(&self, field: &FormField) {
		match self {
			Control::Input(i) => match field.kind {
				FieldKind::Checkbox | FieldKind::Radio => i.set_checked(field.checked),
				_ => i.set_value(&field.value),
			},
			Control::TextArea(t) => t.set_value(&field.value),
			Control::Select(s) => s.set_value(&field.value),
		}
	}
}

fn controls(form: &HtmlFormElement) -> Vec<Control> {
	let Ok(nodes) = form.query_selector_all("input, textarea, select") else {
		return Vec::new();
	};
	(0..nodes.length())
		.filter_map(|i| nodes.item(i))
		.filter_map(|node| node.dyn_into::<Element>().ok())
		.filter_map(Control::from_element)
		.collect()
}

/// Reads every named control of `form`.
pub fn read_form(form: &HtmlFormElement) -> Vec<FormField> {
	controls(form).iter().map(Control::snapshot).collect()
}

/// Writes `draft` back into `form`.
pub fn fill_form(form: &HtmlFormElement, draft: &Draft) {
	for control in controls(form) {
		let mut field = [control.snapshot()];
		restore(draft, &mut field);
		control.apply(&field[0]);
	}
}

/// Writes one form's draft, either now or after the debounce window.
pub struct DraftWriter<S: Scheduler> {
	store: DraftStore,
	form_id: Rc<str>,
	snapshot: Rc<dyn Fn() -> Draft>,
	pending: Debounced<(), S>,
}

impl<S: Scheduler> Clone for DraftWriter<S> {
	fn clone(&self) -> Self {
		Self {
			store: self.store.clone(),
			form_id: self.form_id.clone(),
			snapshot: self.snapshot.clone(),
			pending: self.pending.clone(),
		}
	}
}

impl<S: Scheduler + 'static> DraftWriter<S> {
	pub fn new(
		store: DraftStore,
		form_id: &str,
		scheduler: S,
		wait: Duration,
		snapshot: impl Fn() -> Draft + 'static,
	) -> Self {
		let form_id: Rc<str> = Rc::from(form_id);
		let snapshot: Rc<dyn Fn() -> Draft> = Rc::new(snapshot);
		let pending = {
			let (store, form_id, snapshot) = (store.clone(), form_id.clone(), snapshot.clone());
			debounce(scheduler, wait, move |()| store.save(&form_id, &snapshot()))
		};
		Self {
			store,
			form_id,
			snapshot,
			pending,
		}
	}

	pub fn save_now(&self) {
		self.pending.cancel();
		self.store.save(&self.form_id, &(self.snapshot)());
	}

	pub fn save_later(&self) {
		self.pending.call(());
	}

	pub fn cancel(&self) {
		self.pending.cancel();
	}

	/// Drops any pending write and removes the stored draft.
	pub fn discard(&self) {
		self.pending.cancel();
		self.store.clear(&self.form_id);
	}
}

/// Keeps the listeners alive; dropping it without [`Autosave::detach`]
/// leaves them attached for the page's lifetime.
pub struct Autosave {
	listeners: Vec<(Element, &'static str, Closure<dyn FnMut(Event)>)>,
	writer: DraftWriter<BrowserScheduler>,
}

impl Autosave {
	/// Restores any saved draft into `form`, then saves on every change.
	pub fn attach(form: HtmlFormElement, form_id: &str, store: DraftStore, wait: Duration) -> Self {
		if let Some(draft) = store.load(form_id) {
			fill_form(&form, &draft);
		}

		let writer = {
			let form = form.clone();
			DraftWriter::new(store, form_id, BrowserScheduler, wait, move || {
				capture(&read_form(&form))
			})
		};

		let mut listeners = Vec::new();
		for control in controls(&form) {
			let immediate = control.snapshot().kind.saves_immediately();
			let event = if immediate { "change" } else { "input" };
			let writer = writer.clone();
			let callback: Closure<dyn FnMut(Event)> = if immediate {
				Closure::new(move |_: Event| writer.save_now())
			} else {
				Closure::new(move |_: Event| writer.save_later())
			};
			let el = control.element().clone();
			if el
				.add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())
				.is_ok()
			{
				listeners.push((el, event, callback));
			}
		}
		Self { listeners, writer }
	}

	/// Called once the form is submitted: no draft survives, pending or stored.
	pub fn discard(&self) {
		self.writer.discard();
	}

	pub fn detach(self) {
		self.writer.cancel();
		for (el, event, callback) in &self.listeners {
			let _ = el.remove_event_listener_with_callback(event, callback.as_ref().unchecked_ref());
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::services::storage::MemoryStorage;
	use crate::util::timer::ManualScheduler;

	fn session_form() -> Vec<FormField> {
		vec![
			FormField::text("title", ""),
			FormField::new("notes", FieldKind::TextArea, "", false),
			FormField::checkbox("follow_up", false),
			FormField::radio("visit", "first", false),
			FormField::radio("visit", "return", false),
			FormField::new("therapist", FieldKind::Select, "", false),
		]
	}

	#[test]
	fn round_trip_reproduces_values() {
		let mut form = session_form();
		form[0].value = "Neck session".into();
		form[1].value = "C5 tension\nleft side".into();
		form[2].checked = true;
		form[4].checked = true;
		form[5].value = "lin".into();

		let store = DraftStore::new(StorageManager::new(Rc::new(MemoryStorage::new()), "kms_"));
		store.save("sessionForm", &capture(&form));

		let mut fresh = session_form();
		let draft = store.load("sessionForm").unwrap();
		restore(&draft, &mut fresh);
		assert_eq!(fresh, form);
	}

	#[test]
	fn capture_uses_booleans_and_checked_radio_only() {
		let mut form = session_form();
		form[3].checked = true;
		let draft = capture(&form);
		assert_eq!(draft["follow_up"], Value::Bool(false));
		assert_eq!(draft["visit"], Value::String("first".into()));
		assert_eq!(draft.len(), 5);
	}

	#[test]
	fn unnamed_fields_are_skipped() {
		let draft = capture(&[FormField::text("", "x")]);
		assert!(draft.is_empty());
	}

	#[test]
	fn clear_removes_draft() {
		let store = DraftStore::new(StorageManager::new(Rc::new(MemoryStorage::new()), "kms_"));
		store.save("f", &capture(&[FormField::text("a", "b")]));
		store.clear("f");
		assert!(store.load("f").is_none());
	}

	#[test]
	fn immediate_kinds() {
		assert!(FieldKind::Checkbox.saves_immediately());
		assert!(FieldKind::Select.saves_immediately());
		assert!(!FieldKind::TextArea.saves_immediately());
	}

	fn writer(clock: &ManualScheduler, store: &DraftStore) -> DraftWriter<ManualScheduler> {
		DraftWriter::new(store.clone(), "sessionForm", clock.clone(), Duration::from_secs(1), || {
			capture(&[FormField::text("title", "half typed")])
		})
	}

	#[test]
	fn typing_saves_after_the_wait() {
		let clock = ManualScheduler::new();
		let store = DraftStore::new(StorageManager::new(Rc::new(MemoryStorage::new()), "kms_"));
		let writer = writer(&clock, &store);

		writer.save_later();
		clock.advance(Duration::from_millis(999));
		assert!(store.load("sessionForm").is_none());
		clock.advance(Duration::from_millis(1));
		assert_eq!(store.load("sessionForm").unwrap()["title"], "half typed");
	}

	#[test]
	fn discard_beats_pending_save() {
		let clock = ManualScheduler::new();
		let store = DraftStore::new(StorageManager::new(Rc::new(MemoryStorage::new()), "kms_"));
		let writer = writer(&clock, &store);

		writer.save_now();
		writer.save_later();
		writer.discard();
		clock.advance(Duration::from_secs(2));
		assert!(store.load("sessionForm").is_none());
		assert_eq!(clock.pending(), 0);
	}
}
