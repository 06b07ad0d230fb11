//! Global keyboard chords.
//!
//! A chord string like `Ctrl+Shift+N` is parsed into a [`Chord`]; `Ctrl`
//! and `Cmd` both name the primary modifier so bindings work on every
//! platform. Dispatch is pure: the window listener translates the browser
//! event into a [`KeyPress`] and the focused element into a [`FocusInfo`],
//! then executes whatever [`Action`] comes back.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use leptos::ev;
use leptos_dom::helpers::{WindowListenerHandle, window_event_listener};
use log::{debug, info};
use wasm_bindgen::JsCast;
use web_sys::{Element, HtmlElement, HtmlFormElement, HtmlInputElement, KeyboardEvent};

use crate::error::ShortcutError;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Chord {
	pub primary: bool,
	pub shift: bool,
	pub alt: bool,
	pub key: String,
}

impl FromStr for Chord {
	type Err = ShortcutError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let parts: Vec<&str> = s.split('+').map(str::trim).collect();
		let Some((key, modifiers)) = parts.split_last() else {
			return Err(ShortcutError::Empty);
		};
		if parts.iter().all(|p| p.is_empty()) {
			return Err(ShortcutError::Empty);
		}
		if key.is_empty() {
			return Err(ShortcutError::MissingKey(s.into()));
		}
		let mut chord = Chord {
			primary: false,
			shift: false,
			alt: false,
			key: normalize_key(key),
		};
		for modifier in modifiers {
			match modifier.to_ascii_lowercase().as_str() {
				"ctrl" | "control" | "cmd" | "meta" | "mod" => chord.primary = true,
				"shift" => chord.shift = true,
				"alt" | "option" => chord.alt = true,
				_ => {
					return Err(ShortcutError::UnknownModifier {
						chord: s.into(),
						modifier: (*modifier).into(),
					});
				}
			}
		}
		Ok(chord)
	}
}

impl fmt::Display for Chord {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.primary {
			f.write_str("Ctrl+")?;
		}
		if self.shift {
			f.write_str("Shift+")?;
		}
		if self.alt {
			f.write_str("Alt+")?;
		}
		f.write_str(&self.key)
	}
}

fn normalize_key(key: &str) -> String {
	match key.to_ascii_lowercase().as_str() {
		"return" => "enter".into(),
		"esc" => "escape".into(),
		other => other.into(),
	}
}

/// The parts of a keydown event that matter for matching.
#[derive(Clone, Debug, Default)]
pub struct KeyPress {
	pub key: String,
	pub ctrl: bool,
	pub meta: bool,
	pub shift: bool,
	pub alt: bool,
}

impl KeyPress {
	pub fn chord(&self) -> Chord {
		Chord {
			primary: self.ctrl || self.meta,
			shift: self.shift,
			alt: self.alt,
			key: normalize_key(&self.key),
		}
	}
}

impl From<&KeyboardEvent> for KeyPress {
	fn from(ev: &KeyboardEvent) -> Self {
		Self {
			key: ev.key(),
			ctrl: ev.ctrl_key(),
			meta: ev.meta_key(),
			shift: ev.shift_key(),
			alt: ev.alt_key(),
		}
	}
}

/// What had focus when the chord was pressed.
#[derive(Clone, Debug, Default)]
pub struct FocusInfo {
	/// Lowercase tag name.
	pub tag: String,
	pub input_type: Option<String>,
	pub editable: bool,
}

impl FocusInfo {
	fn is_editable(&self) -> bool {
		self.tag == "input" || self.tag == "textarea" || self.editable
	}

	fn is_text_entry(&self) -> bool {
		self.tag == "textarea" || (self.tag == "input" && self.input_type.as_deref() == Some("text"))
	}
}

/// When a binding is allowed to fire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FocusGuard {
	Anywhere,
	/// Input, textarea or contenteditable.
	Editable,
	/// Textarea or `<input type="text">`.
	TextEntry,
}

impl FocusGuard {
	fn admits(self, focus: &FocusInfo) -> bool {
		match self {
			FocusGuard::Anywhere => true,
			FocusGuard::Editable => focus.is_editable(),
			FocusGuard::TextEntry => focus.is_text_entry(),
		}
	}
}

#[derive(Clone)]
pub enum Action {
	SubmitFocusedForm,
	Run(Rc<dyn Fn()>),
}

impl fmt::Debug for Action {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Action::SubmitFocusedForm => f.write_str("SubmitFocusedForm"),
			Action::Run(_) => f.write_str("Run(..)"),
		}
	}
}

#[derive(Clone, Debug)]
pub struct Binding {
	pub description: String,
	pub guard: FocusGuard,
	pub action: Action,
}

/// Chord to action table.
#[derive(Clone, Debug, Default)]
pub struct ShortcutRegistry {
	bindings: HashMap<Chord, Binding>,
}

impl ShortcutRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Ctrl/Cmd+S and Ctrl/Cmd+Enter submit the form owning the focus.
	pub fn with_form_submission() -> Self {
		let mut registry = Self::new();
		registry.bindings.insert(
			Chord {
				primary: true,
				shift: false,
				alt: false,
				key: "s".into(),
			},
			Binding {
				description: "Save the current form".into(),
				guard: FocusGuard::Editable,
				action: Action::SubmitFocusedForm,
			},
		);
		registry.bindings.insert(
			Chord {
				primary: true,
				shift: false,
				alt: false,
				key: "enter".into(),
			},
			Binding {
				description: "Submit from a text field".into(),
				guard: FocusGuard::TextEntry,
				action: Action::SubmitFocusedForm,
			},
		);
		registry
	}

	/// Binds `chord`, replacing any earlier binding for it.
	pub fn register(
		&mut self,
		chord: &str,
		description: impl Into<String>,
		handler: impl Fn() + 'static,
	) -> Result<(), ShortcutError> {
		let chord: Chord = chord.parse()?;
		debug!("binding shortcut {chord}");
		self.bindings.insert(
			chord,
			Binding {
				description: description.into(),
				guard: FocusGuard::Anywhere,
				action: Action::Run(Rc::new(handler)),
			},
		);
		Ok(())
	}

	pub fn unregister(&mut self, chord: &str) -> Result<bool, ShortcutError> {
		let chord: Chord = chord.parse()?;
		Ok(self.bindings.remove(&chord).is_some())
	}

	/// The action to run for `press`, if a binding matches and its guard
	/// admits the current focus.
	pub fn dispatch(&self, press: &KeyPress, focus: &FocusInfo) -> Option<Action> {
		let binding = self.bindings.get(&press.chord())?;
		binding
			.guard
			.admits(focus)
			.then(|| binding.action.clone())
	}

	/// Chord and description pairs, sorted for display.
	pub fn describe(&self) -> Vec<(String, String)> {
		let mut list: Vec<_> = self
			.bindings
			.iter()
			.map(|(chord, b)| (chord.to_string(), b.description.clone()))
			.collect();
		list.sort();
		list
	}
}

fn focus_of(active: Option<&Element>) -> FocusInfo {
	let Some(el) = active else {
		return FocusInfo::default();
	};
	FocusInfo {
		tag: el.tag_name().to_ascii_lowercase(),
		input_type: el.dyn_ref::<HtmlInputElement>().map(|i| i.type_()),
		editable: el
			.dyn_ref::<HtmlElement>()
			.map(|h| h.is_content_editable())
			.unwrap_or(false),
	}
}

/// Returns false when `active` is not inside a form.
fn submit_form_of(active: Option<&Element>) -> bool {
	let form = active
		.and_then(|el| el.closest("form").ok().flatten())
		.and_then(|f| f.dyn_into::<HtmlFormElement>().ok());
	match form {
		Some(form) => {
			info!("shortcut: submitting form");
			if let Err(err) = form.request_submit() {
				log::error!("form submission failed: {err:?}");
			}
			true
		}
		None => {
			debug!("shortcut: focused element is not inside a form");
			false
		}
	}
}

/// Runs `action` and reports whether the key press was consumed.
pub fn execute(action: Action, active: Option<&Element>) -> bool {
	match action {
		Action::SubmitFocusedForm => submit_form_of(active),
		Action::Run(handler) => {
			handler();
			true
		}
	}
}

/// Listens for keydown on the window until the handle is removed.
pub fn install(registry: Rc<ShortcutRegistry>) -> WindowListenerHandle {
	window_event_listener(ev::keydown, move |ev: KeyboardEvent| {
		let active = web_sys::window()
			.and_then(|w| w.document())
			.and_then(|d| d.active_element());
		let press = KeyPress::from(&ev);
		let Some(action) = registry.dispatch(&press, &focus_of(active.as_ref())) else {
			return;
		};
		if execute(action, active.as_ref()) {
			ev.prevent_default();
		}
	})
}
