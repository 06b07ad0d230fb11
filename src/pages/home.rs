use std::rc::Rc;

use leptos::prelude::*;
use leptos::task::spawn_local;
use log::debug;
use web_sys::{HtmlFormElement, MouseEvent, SubmitEvent};

use crate::components::relation_graph::{GraphData, GraphLink, GraphNode};
use crate::components::tag_autocomplete::{Tag, category_color};
use crate::components::{RelationGraph, TagAutocomplete};
use crate::error::UploadError;
use crate::services::drafts::Autosave;
use crate::services::upload::UploadOptions;
use crate::services::use_services;

const SESSION_FORM: &str = "sessionForm";
const SAMPLE_CATEGORIES: [&str; 5] = ["症狀", "病因", "手法", "位置", "領域"];
const SAMPLE_RELATIONS: [&str; 5] = [
	"symptom_to_cause",
	"cause_to_treatment",
	"method_to_location",
	"same_category",
	"co_occurrence",
];

/// Generate a deterministic sample relation graph.
fn generate_sample_data(n: usize) -> GraphData {
	let nodes: Vec<GraphNode> = (0..n)
		.map(|i| {
			let category = SAMPLE_CATEGORIES[i % SAMPLE_CATEGORIES.len()];
			let importance = (rand_simple(i * 3) * 3.0).round();
			GraphNode {
				id: i.to_string(),
				name: format!("{category} {i}"),
				category: category.to_string(),
				level: if i < 5 { 0 } else { 1 + (i % 3) as u32 },
				importance,
				size: 8.0 + importance * 3.0,
				color: category_color(category).to_string(),
			}
		})
		.collect();

	let links: Vec<GraphLink> = (1..n)
		.map(|i| {
			let target = (rand_simple(i) * (i as f64)) as usize;
			GraphLink {
				source: i.to_string(),
				target: target.to_string(),
				relation_type: SAMPLE_RELATIONS[i % SAMPLE_RELATIONS.len()].to_string(),
				strength: rand_simple(i * 7),
			}
		})
		.collect();

	GraphData { nodes, links }
}

/// Simple pseudo-random number generator (deterministic for consistency).
fn rand_simple(seed: usize) -> f64 {
	let x = ((seed + 1) * 9301 + 49297) % 233280;
	(x as f64) / 233280.0
}

/// Session editor, search box and relation graph on one page.
#[component]
pub fn Home() -> impl IntoView {
	let services = use_services();
	let notifier = services.notifier;

	view! {
		<ErrorBoundary fallback=|errors| {
			view! {
				<h1>"Uh oh! Something went wrong!"</h1>

				<p>"Errors: "</p>
				<ul>
					{move || {
						errors
							.get()
							.into_iter()
							.map(|(_, e)| view! { <li>{e.to_string()}</li> })
							.collect_view()
					}}
				</ul>
			}
		}>
			<div class="container py-4">
				<h1>"Segment Desk"</h1>
				<div class="row g-4">
					<div class="col-lg-6">
						<SessionEditor />
					</div>
					<div class="col-lg-6">
						<SearchPanel />
						<ExportPanel />
					</div>
				</div>
				<h2 class="mt-4">"Relations"</h2>
				<div style="height: 600px;">
					<RelationGraph
						data=Signal::derive(move || generate_sample_data(40))
						config=services.config.graph.clone()
						on_node_click=move |node: GraphNode| {
							notifier.info(format!("{} ({})", node.name, node.category));
						}
					/>
				</div>
			</div>
		</ErrorBoundary>
	}
}

/// Session form with draft auto-save, tag entry and an attachment upload.
#[component]
fn SessionEditor() -> impl IntoView {
	let services = use_services();
	let notifier = services.notifier;
	let form_ref = NodeRef::<leptos::html::Form>::new();
	let file_ref = NodeRef::<leptos::html::Input>::new();
	let tags = RwSignal::new(Vec::<Tag>::new());
	let category = RwSignal::new(String::new());
	let progress = RwSignal::new(None::<f64>);

	let autosave = StoredValue::new_local(None::<Autosave>);
	let (drafts, wait) = (services.drafts.clone(), services.config.draft_debounce);
	Effect::new(move |_| {
		let Some(form) = form_ref.get() else {
			return;
		};
		let form: HtmlFormElement = form.into();
		if autosave.with_value(Option::is_none) {
			autosave.set_value(Some(Autosave::attach(form, SESSION_FORM, drafts.clone(), wait)));
		}
	});
	on_cleanup(move || {
		autosave.try_update_value(|a| {
			if let Some(a) = a.take() {
				a.detach();
			}
		});
	});

	let drafts = services.drafts.clone();
	let on_submit = move |ev: SubmitEvent| {
		ev.prevent_default();
		autosave.with_value(|a| match a {
			Some(a) => a.discard(),
			None => drafts.clear(SESSION_FORM),
		});
		if let Some(form) = form_ref.get_untracked() {
			form.reset();
		}
		tags.set(Vec::new());
		notifier.success("Session saved");
	};

	let uploader = Rc::clone(&services.uploader);
	let on_upload = move |_: MouseEvent| {
		let Some(file) = file_ref
			.get_untracked()
			.and_then(|input| input.files())
			.and_then(|files| files.item(0))
		else {
			notifier.warning("Choose a file first");
			return;
		};
		let uploader = Rc::clone(&uploader);
		let options = UploadOptions {
			on_progress: Some(Rc::new(move |pct: f64| progress.set(Some(pct)))),
			on_error: Some(Rc::new(move |err: &UploadError| {
				notifier.error(err.to_string());
			})),
			..Default::default()
		};
		progress.set(Some(0.0));
		spawn_local(async move {
			let result = uploader.upload(&file, None, options).await;
			progress.set(None);
			if result.is_ok() {
				notifier.success(format!("Uploaded {}", file.name()));
			}
		});
	};

	view! {
		<form id=SESSION_FORM node_ref=form_ref on:submit=on_submit>
			<div class="mb-3">
				<label class="form-label" for="title">"Title"</label>
				<input class="form-control" id="title" name="title" type="text" />
			</div>
			<div class="mb-3">
				<label class="form-label" for="notes">"Notes"</label>
				<textarea class="form-control" id="notes" name="notes" rows="4"></textarea>
			</div>
			<div class="form-check mb-3">
				<input class="form-check-input" id="follow_up" name="follow_up" type="checkbox" />
				<label class="form-check-label" for="follow_up">"Needs follow-up"</label>
			</div>

			<div class="mb-3">
				<label class="form-label">"Tags"</label>
				<select
					class="form-select mb-2"
					on:change=move |ev| category.set(event_target_value(&ev))
				>
					<option value="">"Category from text"</option>
					{SAMPLE_CATEGORIES
						.iter()
						.map(|c| view! { <option value=*c>{*c}</option> })
						.collect_view()}
				</select>
				<TagAutocomplete
					api=services.api.clone()
					debounce_wait=services.config.search_debounce
					allow_manual=true
					manual_category=category
					placeholder="Type to search tags, Enter to add"
					on_select=move |tag: Tag| {
						tags.update(|list| {
							if !list.iter().any(|t| t.name == tag.name && t.category == tag.category) {
								list.push(tag);
							}
						});
					}
				/>
				<div class="selected-tags mt-2">
					<For
						each=move || tags.get()
						key=|tag| (tag.category.clone(), tag.name.clone())
						children=move |tag| {
							let key = (tag.category.clone(), tag.name.clone());
							view! {
								<span
									class="badge me-1"
									style=format!("background-color: {}", tag.badge_color())
								>
									{format!("{}: {}", tag.badge_label(), tag.name)}
									<button
										type="button"
										class="btn-close btn-close-white ms-1"
										on:click=move |_| {
											tags.update(|l| l.retain(|t| (&t.category, &t.name) != (&key.0, &key.1)))
										}
									/>
								</span>
							}
						}
					/>
				</div>
			</div>

			<div class="mb-3">
				<label class="form-label" for="attachment">"Attachment"</label>
				<div class="input-group">
					<input class="form-control" id="attachment" type="file" node_ref=file_ref />
					<button class="btn btn-outline-secondary" type="button" on:click=on_upload>
						"Upload"
					</button>
				</div>
				<Show when=move || progress.get().is_some()>
					<div class="progress mt-2">
						<div
							class="progress-bar"
							style=move || format!("width: {:.0}%", progress.get().unwrap_or(0.0))
						/>
					</div>
				</Show>
			</div>

			<button class="btn btn-primary" type="submit">"Save session"</button>
		</form>
	}
}

/// Search box that records queries in the persistent history.
#[component]
fn SearchPanel() -> impl IntoView {
	let services = use_services();
	let query = RwSignal::new(String::new());
	let entries = RwSignal::new(services.history.entries());

	let history = StoredValue::new_local(services.history.clone());
	let on_search = move |ev: SubmitEvent| {
		ev.prevent_default();
		let text = query.get_untracked();
		debug!("search submitted: {text}");
		if let Some(list) = history.try_with_value(|h| h.add(&text)) {
			entries.set(list);
		}
	};
	let on_clear = move |_: MouseEvent| {
		history.with_value(|h| h.clear());
		entries.set(Vec::new());
	};

	view! {
		<form class="mb-3" on:submit=on_search>
			<div class="input-group">
				<input
					class="form-control"
					type="search"
					placeholder="Search segments"
					prop:value=move || query.get()
					on:input=move |ev| query.set(event_target_value(&ev))
				/>
				<button class="btn btn-primary" type="submit">"Search"</button>
			</div>
		</form>
		<Show when=move || entries.with(|e| !e.is_empty())>
			<div class="d-flex justify-content-between align-items-center">
				<h6>"Recent searches"</h6>
				<button class="btn btn-link btn-sm" on:click=on_clear>
					"Clear"
				</button>
			</div>
			<ul class="list-group mb-3">
				{move || {
					entries
						.get()
						.into_iter()
						.map(|entry| {
							let text = entry.query.clone();
							view! {
								<li
									class="list-group-item list-group-item-action"
									on:click=move |_| query.set(text.clone())
								>
									{entry.query}
									<small class="text-muted ms-2">
										{entry.timestamp.format("%Y-%m-%d %H:%M").to_string()}
									</small>
								</li>
							}
						})
						.collect_view()
				}}
			</ul>
		</Show>
	}
}

/// Downloads a session export from the server.
#[component]
fn ExportPanel() -> impl IntoView {
	let services = use_services();
	let notifier = services.notifier;
	let session_id = RwSignal::new(String::new());
	let format = RwSignal::new("json".to_string());

	let api = services.api.clone();
	let on_export = move |_: MouseEvent| {
		let api = api.clone();
		let (id, fmt) = (session_id.get_untracked(), format.get_untracked());
		spawn_local(async move {
			match api.export_session(&id, &fmt).await {
				Ok(file) => {
					notifier.success(format!("Downloaded {file}"));
				}
				Err(err) => {
					notifier.error(err.to_string());
				}
			}
		});
	};

	view! {
		<div class="input-group">
			<input
				class="form-control"
				placeholder="Session id"
				prop:value=move || session_id.get()
				on:input=move |ev| session_id.set(event_target_value(&ev))
			/>
			<select class="form-select" on:change=move |ev| format.set(event_target_value(&ev))>
				<option value="json">"JSON"</option>
				<option value="markdown">"Markdown"</option>
				<option value="txt">"Text"</option>
			</select>
			<button class="btn btn-outline-primary" on:click=on_export>
				"Export"
			</button>
		</div>
	}
}
