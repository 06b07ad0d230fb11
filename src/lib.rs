//! Leptos client for the segment knowledge desk: app wiring and routes.

use leptos::prelude::*;
use leptos_meta::*;
use leptos_router::components::*;
use leptos_router::path;
use log::{Level, info};

// Modules
pub mod components;
pub mod config;
pub mod error;
mod pages;
pub mod services;
pub mod util;

// Top-Level pages
use crate::components::NotificationStack;
use crate::config::ClientConfig;
use crate::pages::home::Home;
use crate::pages::not_found::NotFound;
use crate::services::{AppServices, print, provide_services, shortcuts};

/// Initialize logging and panic hooks for the WASM target.
pub fn init_logging() {
	let _ = console_log::init_with_level(Level::Debug);
	console_error_panic_hook::set_once();
	info!("Logging initialized");
}

/// Root component: builds the services, installs global shortcuts and
/// renders the toast stack above the routed pages.
#[component]
pub fn App() -> impl IntoView {
	// Provides context that manages stylesheets, titles, meta tags, etc.
	provide_meta_context();

	let services = AppServices::new(ClientConfig::from_window());
	let notifier = services.notifier;
	let keys = shortcuts::install(services.shortcuts.clone());
	on_cleanup(move || keys.remove());
	let print_listeners = print::install();
	on_cleanup(move || print_listeners.into_iter().for_each(|h| h.remove()));
	services.greet_once();
	provide_services(services);

	view! {
		<Html attr:lang="zh-Hant" attr:dir="ltr" attr:data-theme="light" />

		// sets the document title
		<Title text="Segment Desk" />

		// injects metadata in the <head> of the page
		<Meta charset="UTF-8" />
		<Meta name="viewport" content="width=device-width, initial-scale=1.0" />

		<NotificationStack notifier=notifier />

		<Router>
			<Routes fallback=|| view! { <NotFound /> }>
				<Route path=path!("/") view=Home />
			</Routes>
		</Router>
	}
}
