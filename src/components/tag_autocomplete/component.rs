use std::time::Duration;

use leptos::ev;
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_dom::helpers::window_event_listener;
use log::{debug, error};
use wasm_bindgen::JsCast;
use web_sys::{Event, KeyboardEvent, MouseEvent, Node};

use super::categories::manual_tag;
use super::state::{AutocompleteState, KeyOutcome, NavKey, Phase};
use super::types::Tag;
use crate::services::api::{ApiClient, TagQuery};
use crate::util::{BrowserScheduler, debounce};

/// Text input with a server-backed tag suggestion dropdown.
///
/// With `allow_manual`, pressing Enter while no suggestion is highlighted
/// turns the typed text into a tag (see [`manual_tag`]).
#[component]
pub fn TagAutocomplete(
	api: ApiClient,
	#[prop(into)] on_select: Callback<Tag>,
	#[prop(optional, into)] context: Option<String>,
	#[prop(optional, into)] placeholder: Option<String>,
	#[prop(default = Duration::from_millis(300))] debounce_wait: Duration,
	#[prop(default = false)] allow_manual: bool,
	#[prop(optional, into)] manual_category: Option<Signal<String>>,
) -> impl IntoView {
	let state = RwSignal::new(AutocompleteState::default());
	let text = RwSignal::new(String::new());
	let wrapper = NodeRef::<leptos::html::Div>::new();

	let search = debounce(BrowserScheduler, debounce_wait, move |raw: String| {
		let mut ticket = None;
		state.update(|s| ticket = s.begin_search(&raw));
		let Some(ticket) = ticket else {
			return;
		};
		let query = TagQuery {
			text: ticket.query,
			context: context.clone(),
			category: None,
		};
		let api = api.clone();
		spawn_local(async move {
			match api.search_tags(&query).await {
				Ok(tags) => state.update(|s| {
					if !s.apply_results(ticket.generation, tags) {
						debug!("dropped stale tag results for `{}`", query.text);
					}
				}),
				Err(err) => {
					error!("tag search failed: {err}");
					state.update(|s| {
						s.apply_failure(ticket.generation);
					});
				}
			}
		});
	});

	let commit = move |index: usize| {
		let mut input = text.get_untracked();
		let mut picked = None;
		state.update(|s| {
			s.commit(index, &mut input, |tag| picked = Some(tag));
		});
		if let Some(tag) = picked {
			text.set(input);
			on_select.run(tag);
		}
	};

	let search_input = search.clone();
	let search_outside = search.clone();
	let on_input = move |ev: Event| {
		let value = event_target_value(&ev);
		text.set(value.clone());
		search_input.call(value);
	};

	let on_keydown = move |ev: KeyboardEvent| {
		let Some(key) = NavKey::from_key(&ev.key()) else {
			return;
		};
		let highlighted = state.with_untracked(|s| s.is_open() && s.cursor.is_some());
		if allow_manual && key == NavKey::Enter && !highlighted {
			let category = manual_category.map(|c| c.get_untracked());
			if let Some(tag) = manual_tag(&text.get_untracked(), category.as_deref()) {
				ev.prevent_default();
				search.cancel();
				state.update(|s| s.hide());
				text.set(String::new());
				on_select.run(tag);
				return;
			}
		}

		let mut outcome = KeyOutcome::PassThrough;
		state.update(|s| outcome = s.on_key(key));
		match outcome {
			KeyOutcome::PassThrough => {}
			KeyOutcome::Handled => ev.prevent_default(),
			KeyOutcome::Commit(tag) => {
				ev.prevent_default();
				search.cancel();
				text.set(String::new());
				state.update(|s| s.hide());
				on_select.run(tag);
			}
		}
	};

	let outside_click = window_event_listener(ev::click, move |ev: MouseEvent| {
		let Some(root) = wrapper.get_untracked() else {
			return;
		};
		let target = ev.target().and_then(|t| t.dyn_into::<Node>().ok());
		if !root.contains(target.as_ref()) && state.with_untracked(|s| s.phase != Phase::Idle) {
			search_outside.cancel();
			state.update(|s| s.hide());
		}
	});
	on_cleanup(move || outside_click.remove());

	view! {
		<div class="tag-autocomplete" node_ref=wrapper style="position: relative;">
			<input
				type="text"
				class="form-control"
				autocomplete="off"
				placeholder=placeholder
				prop:value=move || text.get()
				on:input=on_input
				on:keydown=on_keydown
			/>
			<Show when=move || state.with(|s| s.is_open())>
				<div class="autocomplete-dropdown">
					{move || {
						state
							.with(|s| {
								s.candidates
									.iter()
									.cloned()
									.enumerate()
									.map(|(i, tag)| (i, tag, s.cursor == Some(i)))
									.collect::<Vec<_>>()
							})
							.into_iter()
							.map(|(i, tag, selected)| {
								view! {
									<div
										class="autocomplete-item"
										class:selected=selected
										on:mousedown=move |ev: MouseEvent| {
											ev.prevent_default();
											commit(i);
										}
									>
										<span
											class="badge"
											style=format!("background-color: {}", tag.badge_color())
										>
											{tag.badge_label().to_string()}
										</span>
										" "
										{tag.name.clone()}
									</div>
								}
							})
							.collect_view()
					}}
				</div>
			</Show>
		</div>
	}
}
