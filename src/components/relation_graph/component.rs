use std::cell::RefCell;
use std::rc::Rc;

use leptos::ev;
use leptos::prelude::*;
use leptos_dom::helpers::window_event_listener;
use log::{debug, error, info};
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlElement, MouseEvent, WheelEvent};

use super::engine::ForceGraphEngine;
use super::render;
use super::state::RelationGraphState;
use super::types::{GraphData, GraphNode};
use crate::config::GraphConfig;
use crate::util::download::trigger_download;

const FIRST_FRAME_DT: f64 = 1.0 / 60.0;
const TOOLTIP_STYLE: &str = "position: absolute; background: rgba(0, 0, 0, 0.8); color: white; \
	padding: 8px; border-radius: 4px; font-size: 12px; pointer-events: none; opacity: 0; \
	z-index: 1000; white-space: pre-line;";

/// Per-instance browser resources. Dropped pieces are detached in
/// [`GraphRuntime::teardown`].
#[derive(Default)]
struct GraphRuntime {
	state: Option<RelationGraphState<ForceGraphEngine>>,
	tooltip: Option<HtmlElement>,
	tooltip_text: String,
	frame: Option<i32>,
	animate: Option<Closure<dyn FnMut(f64)>>,
	last_frame: Option<f64>,
	stopped: bool,
}

impl GraphRuntime {
	fn sync_tooltip(&mut self) {
		let (Some(state), Some(el)) = (&self.state, &self.tooltip) else {
			return;
		};
		let style = el.style();
		match state.tooltip() {
			Some(view) => {
				let c = &view.content;
				let text = format!(
					"{}\nCategory: {}\nLevel: {}\nConnections: {}\nImportance: {}",
					c.name, c.category, c.level, c.connections, c.importance
				);
				if text != self.tooltip_text {
					el.set_inner_text(&text);
					self.tooltip_text = text;
				}
				let _ = style.set_property("left", &format!("{}px", view.left));
				let _ = style.set_property("top", &format!("{}px", view.top));
				let _ = style.set_property("opacity", &view.opacity.to_string());
			}
			None => {
				let _ = style.set_property("opacity", "0");
			}
		}
	}

	fn teardown(&mut self) {
		self.stopped = true;
		if let Some(state) = &mut self.state {
			state.stop();
		}
		if let (Some(id), Some(window)) = (self.frame.take(), web_sys::window()) {
			let _ = window.cancel_animation_frame(id);
		}
		if let Some(el) = self.tooltip.take() {
			el.remove();
		}
		self.animate = None;
		debug!("relation graph torn down");
	}
}

/// Seconds elapsed between two `requestAnimationFrame` timestamps.
fn frame_delta(previous_ms: Option<f64>, now_ms: f64) -> f64 {
	match previous_ms {
		Some(prev) => ((now_ms - prev) / 1000.0).max(0.0),
		None => FIRST_FRAME_DT,
	}
}

fn local_point(canvas: &HtmlCanvasElement, ev: &MouseEvent) -> (f64, f64) {
	let rect = canvas.get_bounding_client_rect();
	(
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	)
}

fn canvas_size(canvas: &HtmlCanvasElement, width: Option<f64>, height: Option<f64>) -> (f64, f64) {
	let parent = canvas.parent_element();
	(
		width.unwrap_or_else(|| {
			parent
				.as_ref()
				.map(|p| p.client_width() as f64)
				.filter(|w| *w > 0.0)
				.unwrap_or(800.0)
		}),
		height.unwrap_or_else(|| {
			parent
				.as_ref()
				.map(|p| p.client_height() as f64)
				.filter(|h| *h > 0.0)
				.unwrap_or(600.0)
		}),
	)
}

fn create_tooltip() -> Option<HtmlElement> {
	let document = web_sys::window()?.document()?;
	let el: HtmlElement = document.create_element("div").ok()?.dyn_into().ok()?;
	el.set_class_name("relation-tooltip");
	el.set_attribute("style", TOOLTIP_STYLE).ok()?;
	document.body()?.append_child(&el).ok()?;
	Some(el)
}

/// Interactive force-directed view of a relation dataset.
#[component]
pub fn RelationGraph(
	#[prop(into)] data: Signal<GraphData>,
	#[prop(default = None)] width: Option<f64>,
	#[prop(default = None)] height: Option<f64>,
	#[prop(optional)] config: GraphConfig,
	#[prop(optional, into)] on_node_click: Option<Callback<GraphNode>>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let runtime: Rc<RefCell<GraphRuntime>> = Rc::new(RefCell::new(GraphRuntime::default()));
	let empty = Signal::derive(move || data.with(|d| d.is_empty()));

	let rt_init = runtime.clone();
	Effect::new(move |_| {
		let data = data.get();
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let (w, h) = canvas_size(&canvas, width, height);
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);

		let ctx: CanvasRenderingContext2d = match canvas.get_context("2d") {
			Ok(Some(ctx)) => match ctx.dyn_into() {
				Ok(ctx) => ctx,
				Err(_) => {
					error!("2d context has unexpected type");
					return;
				}
			},
			_ => {
				error!("canvas 2d context unavailable");
				return;
			}
		};

		let mut rt = rt_init.borrow_mut();
		if let Some(old) = &mut rt.state {
			old.stop();
		}
		rt.state = Some(RelationGraphState::new(
			&data,
			w,
			h,
			config.clone(),
			ForceGraphEngine::new(),
		));
		info!(
			"relation graph loaded: {} nodes, {} links",
			data.nodes.len(),
			data.links.len()
		);
		if rt.tooltip.is_none() {
			rt.tooltip = create_tooltip();
		}
		if rt.animate.is_some() {
			return;
		}

		let rt_anim = rt_init.clone();
		rt.animate = Some(Closure::new(move |now: f64| {
			let mut rt = rt_anim.borrow_mut();
			if rt.stopped {
				return;
			}
			let dt = frame_delta(rt.last_frame, now);
			rt.last_frame = Some(now);
			if let Some(state) = &mut rt.state {
				state.tick(dt);
				render::render(state, &ctx);
			}
			rt.sync_tooltip();
			let next = rt
				.animate
				.as_ref()
				.zip(web_sys::window())
				.and_then(|(cb, win)| win.request_animation_frame(cb.as_ref().unchecked_ref()).ok());
			rt.frame = next;
		}));
		rt.frame = rt
			.animate
			.as_ref()
			.zip(web_sys::window())
			.and_then(|(cb, win)| win.request_animation_frame(cb.as_ref().unchecked_ref()).ok());
	});

	if width.is_none() || height.is_none() {
		let rt_resize = runtime.clone();
		let on_resize = window_event_listener(ev::resize, move |_| {
			let Some(canvas) = canvas_ref.get_untracked() else {
				return;
			};
			let canvas: HtmlCanvasElement = canvas.into();
			let (w, h) = canvas_size(&canvas, width, height);
			canvas.set_width(w as u32);
			canvas.set_height(h as u32);
			if let Some(state) = &mut rt_resize.borrow_mut().state {
				state.resize(w, h);
			}
		});
		on_cleanup(move || on_resize.remove());
	}

	let teardown = StoredValue::new_local(runtime.clone());
	on_cleanup(move || {
		teardown.try_with_value(|rt| rt.borrow_mut().teardown());
	});

	let rt_md = runtime.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let Some(canvas) = canvas_ref.get_untracked() else {
			return;
		};
		let (x, y) = local_point(&canvas, &ev);
		if let Some(s) = &mut rt_md.borrow_mut().state {
			match s.node_at_position(x, y) {
				Some(idx) => s.begin_drag(idx, x, y),
				None => s.begin_pan(x, y),
			}
		}
	};

	let rt_mm = runtime.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some(canvas) = canvas_ref.get_untracked() else {
			return;
		};
		let (x, y) = local_point(&canvas, &ev);
		let mut rt = rt_mm.borrow_mut();
		let Some(s) = &mut rt.state else {
			return;
		};
		let cursor = if s.drag.node.is_some() {
			s.drag_to(x, y);
			"grabbing"
		} else if s.pan.active {
			s.pan_to(x, y);
			"grabbing"
		} else {
			match s.node_at_position(x, y) {
				Some(idx) => s.show_tooltip(idx, ev.page_x() as f64, ev.page_y() as f64),
				None => s.hide_tooltip(),
			}
			if s.hovered().is_some() { "pointer" } else { "grab" }
		};
		let _ = HtmlElement::style(&canvas).set_property("cursor", cursor);
	};

	let rt_mu = runtime.clone();
	let on_mouseup = move |_: MouseEvent| {
		let clicked = {
			let mut rt = rt_mu.borrow_mut();
			let Some(s) = &mut rt.state else {
				return;
			};
			s.end_pan();
			let clicked = s.end_drag();
			if let Some(idx) = clicked {
				s.click(idx);
			}
			clicked.and_then(|idx| s.nodes.get(idx).cloned())
		};
		if let (Some(node), Some(cb)) = (clicked, on_node_click) {
			cb.run(node);
		}
	};

	let rt_ml = runtime.clone();
	let on_mouseleave = move |_: MouseEvent| {
		if let Some(s) = &mut rt_ml.borrow_mut().state {
			s.end_drag();
			s.end_pan();
			s.hide_tooltip();
		}
	};

	let rt_wh = runtime.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some(canvas) = canvas_ref.get_untracked() else {
			return;
		};
		let (x, y) = local_point(&canvas, &ev);
		if let Some(s) = &mut rt_wh.borrow_mut().state {
			let factor = if ev.delta_y() > 0.0 { 0.9 } else { 1.1 };
			s.zoom_at(x, y, factor);
		}
	};

	let rt_reset = runtime.clone();
	let on_reset = move |_: MouseEvent| {
		if let Some(s) = &mut rt_reset.borrow_mut().state {
			s.reset_highlight();
			s.reset_view();
		}
	};

	let rt_center = runtime.clone();
	let on_center = move |_: MouseEvent| {
		if let Some(s) = &mut rt_center.borrow_mut().state {
			s.center_view();
		}
	};

	let on_export = move |_: MouseEvent| {
		let Some(canvas) = canvas_ref.get_untracked() else {
			return;
		};
		let result = canvas
			.to_data_url_with_type("image/png")
			.map_err(|err| format!("{err:?}"))
			.and_then(|url| trigger_download(&url, "relation-graph.png"));
		if let Err(err) = result {
			error!("graph export failed: {err}");
		}
	};

	view! {
		<div class="relation-graph" style="position: relative;">
			<Show when=move || empty.get()>
				<p class="text-center text-muted">"No relation data to display"</p>
			</Show>
			<canvas
				node_ref=canvas_ref
				class="relation-graph-canvas"
				on:mousedown=on_mousedown
				on:mousemove=on_mousemove
				on:mouseup=on_mouseup
				on:mouseleave=on_mouseleave
				on:wheel=on_wheel
				style="display: block; cursor: grab; border: 1px solid #ddd; border-radius: 8px;"
			/>
			<div
				class="graph-controls"
				style="position: absolute; top: 10px; right: 10px; background: white; padding: 10px; border-radius: 4px;"
			>
				<button class="btn btn-sm btn-outline-primary me-2" on:click=on_reset>
					"Reset view"
				</button>
				<button class="btn btn-sm btn-outline-secondary me-2" on:click=on_center>
					"Center"
				</button>
				<button class="btn btn-sm btn-outline-secondary" on:click=on_export>
					"Export PNG"
				</button>
			</div>
		</div>
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn first_frame_uses_nominal_delta() {
		assert_eq!(frame_delta(None, 12_345.0), FIRST_FRAME_DT);
	}

	#[test]
	fn delta_follows_timestamps() {
		assert!((frame_delta(Some(1000.0), 1006.944) - 0.006944).abs() < 1e-9);
		assert!((frame_delta(Some(1000.0), 1250.0) - 0.25).abs() < 1e-9);
	}

	#[test]
	fn backwards_timestamps_do_not_rewind() {
		assert_eq!(frame_delta(Some(2000.0), 1990.0), 0.0);
	}
}
