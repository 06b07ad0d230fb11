//! Browser-side services. They are constructed once by [`AppServices::new`]
//! and handed to components through context.

use std::rc::Rc;

use leptos::prelude::*;
use log::{error, info};

use crate::config::ClientConfig;

pub mod api;
pub mod drafts;
pub mod history;
pub mod notify;
pub mod print;
pub mod shortcuts;
pub mod storage;
pub mod upload;

use api::ApiClient;
use drafts::DraftStore;
use history::SearchHistory;
use notify::Notifier;
use shortcuts::ShortcutRegistry;
use storage::StorageManager;
use upload::FileUploader;

const WELCOME_KEY: &str = "has_seen_welcome";

/// Server pages reachable through `Ctrl+Shift+<key>`.
const NAVIGATION: [(&str, &str, &str); 4] = [
	("Ctrl+Shift+N", "/session/new", "New session"),
	("Ctrl+Shift+S", "/search", "Search"),
	("Ctrl+Shift+T", "/tags/manage", "Manage tags"),
	("Ctrl+Shift+B", "/batch-operations", "Batch operations"),
];

fn navigate(path: &str) {
	let Some(window) = web_sys::window() else {
		return;
	};
	if let Err(err) = window.location().set_href(path) {
		error!("navigation to {path} failed: {err:?}");
	}
}

/// Form submission chords plus the navigation table.
pub fn default_shortcuts() -> ShortcutRegistry {
	let mut registry = ShortcutRegistry::with_form_submission();
	for (chord, path, description) in NAVIGATION {
		if let Err(err) = registry.register(chord, description, move || navigate(path)) {
			error!("invalid shortcut {chord}: {err}");
		}
	}
	registry
}

/// Every service the pages use, wired from one [`ClientConfig`].
#[derive(Clone)]
pub struct AppServices {
	pub config: ClientConfig,
	pub storage: StorageManager,
	pub history: SearchHistory,
	pub drafts: DraftStore,
	pub api: ApiClient,
	pub uploader: Rc<FileUploader>,
	pub notifier: Notifier,
	pub shortcuts: Rc<ShortcutRegistry>,
}

impl AppServices {
	pub fn new(config: ClientConfig) -> Self {
		let storage = StorageManager::browser(config.storage_namespace.clone());
		info!("services ready (api base: `{}`)", config.api_base);
		Self {
			history: SearchHistory::new(storage.clone(), config.history_cap),
			drafts: DraftStore::new(storage.clone()),
			api: ApiClient::new(config.api_base.clone()),
			uploader: Rc::new(FileUploader::new(&config.api_base, &config.upload)),
			notifier: Notifier::new(config.max_toasts, config.toast_timeout),
			shortcuts: Rc::new(default_shortcuts()),
			storage,
			config,
		}
	}

	/// Shows the welcome toast on the first visit only.
	pub fn greet_once(&self) {
		if self.storage.get::<bool>(WELCOME_KEY).unwrap_or(false) {
			return;
		}
		self.notifier
			.info("Welcome! Press Ctrl+S inside a form to save it, Ctrl+Shift+N for a new session.");
		self.storage.set(WELCOME_KEY, &true);
	}
}

/// Context handle; the services hold `Rc`s so they live in local storage.
pub type ServicesContext = StoredValue<AppServices, LocalStorage>;

pub fn provide_services(services: AppServices) {
	provide_context::<ServicesContext>(StoredValue::new_local(services));
}

/// The services provided by the root component.
pub fn use_services() -> AppServices {
	expect_context::<ServicesContext>().get_value()
}
