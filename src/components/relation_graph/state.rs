use std::collections::{HashMap, HashSet};
use std::f64::consts::PI;

use log::warn;

use super::engine::{
	Body, Layout, LayoutEngine, Point, Spring, collision_radius, link_distance, node_charge,
};
use super::types::{GraphData, GraphNode};
use crate::config::GraphConfig;

pub const NODE_OPACITY: f64 = 1.0;
pub const NODE_DIMMED: f64 = 0.3;
pub const LINK_OPACITY: f64 = 0.6;
pub const LINK_DIMMED: f64 = 0.1;
pub const LINK_FOCUSED: f64 = 0.8;
pub const NODE_STROKE: f64 = 2.0;
pub const NODE_STROKE_FOCUSED: f64 = 4.0;

const TOOLTIP_OPACITY: f64 = 0.9;
const TOOLTIP_FADE_IN: f64 = 0.2;
const TOOLTIP_FADE_OUT: f64 = 0.5;
/// Pointer travel, in pixels, that turns a press into a drag.
const DRAG_THRESHOLD: f64 = 3.0;
/// Largest step handed to the physics engine; timers still use the full dt.
const MAX_PHYSICS_STEP: f64 = 0.05;
const MIN_HIT_RADIUS: f64 = 6.0;

#[derive(Clone, Debug)]
pub struct LinkInfo {
	pub source: usize,
	pub target: usize,
	pub relation_type: String,
	pub strength: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	pub k: f64,
}

impl Default for ViewTransform {
	fn default() -> Self {
		Self::IDENTITY
	}
}

impl ViewTransform {
	pub const IDENTITY: Self = Self {
		x: 0.0,
		y: 0.0,
		k: 1.0,
	};

	pub fn invert(&self, sx: f64, sy: f64) -> Point {
		Point::new((sx - self.x) / self.k, (sy - self.y) / self.k)
	}

	fn lerp(&self, to: &Self, t: f64) -> Self {
		Self {
			x: self.x + (to.x - self.x) * t,
			y: self.y + (to.y - self.y) * t,
			k: self.k + (to.k - self.k) * t,
		}
	}
}

fn ease_in_out_cubic(t: f64) -> f64 {
	if t < 0.5 {
		4.0 * t * t * t
	} else {
		1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
	}
}

#[derive(Clone, Debug)]
struct Transition {
	from: ViewTransform,
	to: ViewTransform,
	elapsed: f64,
	duration: f64,
}

#[derive(Clone, Debug, Default)]
pub struct DragState {
	pub node: Option<usize>,
	pub start_x: f64,
	pub start_y: f64,
	pub moved: bool,
}

#[derive(Clone, Debug, Default)]
pub struct PanState {
	pub active: bool,
	pub start_x: f64,
	pub start_y: f64,
	pub transform_start_x: f64,
	pub transform_start_y: f64,
}

#[derive(Clone, Debug)]
struct Highlight {
	focus: usize,
	nodes: HashSet<usize>,
	remaining: f64,
}

#[derive(Clone, Debug)]
struct Tooltip {
	node: usize,
	left: f64,
	top: f64,
	opacity: f64,
	target: f64,
	/// Opacity change per second.
	rate: f64,
}

/// Text shown in the hover tooltip.
#[derive(Clone, Debug, PartialEq)]
pub struct TooltipContent {
	pub name: String,
	pub category: String,
	pub level: u32,
	pub connections: usize,
	pub importance: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TooltipView {
	pub content: TooltipContent,
	pub left: f64,
	pub top: f64,
	pub opacity: f64,
}

/// Everything the relationship graph needs between frames.
pub struct RelationGraphState<E: LayoutEngine> {
	engine: E,
	pub nodes: Vec<GraphNode>,
	pub links: Vec<LinkInfo>,
	positions: Vec<Point>,
	pub transform: ViewTransform,
	transition: Option<Transition>,
	pub drag: DragState,
	pub pan: PanState,
	highlight: Option<Highlight>,
	tooltip: Option<Tooltip>,
	pub width: f64,
	pub height: f64,
	config: GraphConfig,
}

impl<E: LayoutEngine> RelationGraphState<E> {
	pub fn new(data: &GraphData, width: f64, height: f64, config: GraphConfig, mut engine: E) -> Self {
		let index: HashMap<&str, usize> = data
			.nodes
			.iter()
			.enumerate()
			.map(|(i, n)| (n.id.as_str(), i))
			.collect();

		let links: Vec<LinkInfo> = data
			.links
			.iter()
			.filter_map(|link| {
				match (index.get(link.source.as_str()), index.get(link.target.as_str())) {
					(Some(&source), Some(&target)) => Some(LinkInfo {
						source,
						target,
						relation_type: link.relation_type.clone(),
						strength: link.strength,
					}),
					_ => {
						warn!("skipping link {} -> {}: unknown node", link.source, link.target);
						None
					}
				}
			})
			.collect();

		let center = Point::new(width / 2.0, height / 2.0);
		let count = data.nodes.len().max(1) as f64;
		let layout = Layout {
			bodies: data
				.nodes
				.iter()
				.enumerate()
				.map(|(i, node)| {
					let angle = i as f64 * 2.0 * PI / count;
					Body {
						charge: node_charge(node.importance),
						radius: collision_radius(node.size),
						start: Point::new(
							center.x + 100.0 * angle.cos(),
							center.y + 100.0 * angle.sin(),
						),
					}
				})
				.collect(),
			springs: links
				.iter()
				.map(|l| Spring {
					source: l.source,
					target: l.target,
					distance: link_distance(l.strength),
				})
				.collect(),
			center,
		};
		engine.load(&layout);
		let positions = engine.positions();

		Self {
			engine,
			nodes: data.nodes.clone(),
			links,
			positions,
			transform: ViewTransform::IDENTITY,
			transition: None,
			drag: DragState::default(),
			pan: PanState::default(),
			highlight: None,
			tooltip: None,
			width,
			height,
			config,
		}
	}

	#[cfg(test)]
	pub fn engine(&self) -> &E {
		&self.engine
	}

	pub fn position(&self, idx: usize) -> Point {
		self.positions.get(idx).copied().unwrap_or_default()
	}

	pub fn node_at_position(&self, sx: f64, sy: f64) -> Option<usize> {
		let p = self.transform.invert(sx, sy);
		// Last drawn is on top.
		(0..self.nodes.len()).rev().find(|&i| {
			self.position(i).distance(p) <= self.nodes[i].size.max(MIN_HIT_RADIUS)
		})
	}

	pub fn connection_count(&self, idx: usize) -> usize {
		self.links
			.iter()
			.filter(|l| l.source == idx || l.target == idx)
			.count()
	}

	pub fn neighbors(&self, idx: usize) -> HashSet<usize> {
		self.links
			.iter()
			.filter_map(|l| {
				if l.source == idx {
					Some(l.target)
				} else if l.target == idx {
					Some(l.source)
				} else {
					None
				}
			})
			.collect()
	}

	/// Emphasizes `idx` and its direct neighbours for the highlight window.
	/// A new click replaces the current highlight and restarts the window.
	pub fn click(&mut self, idx: usize) {
		if idx >= self.nodes.len() {
			return;
		}
		let mut nodes = self.neighbors(idx);
		nodes.insert(idx);
		self.highlight = Some(Highlight {
			focus: idx,
			nodes,
			remaining: self.config.highlight_window.as_secs_f64(),
		});
	}

	pub fn reset_highlight(&mut self) {
		self.highlight = None;
	}

	#[cfg(test)]
	pub fn is_highlighting(&self) -> bool {
		self.highlight.is_some()
	}

	pub fn node_opacity(&self, idx: usize) -> f64 {
		match &self.highlight {
			Some(h) if !h.nodes.contains(&idx) => NODE_DIMMED,
			_ => NODE_OPACITY,
		}
	}

	pub fn node_stroke(&self, idx: usize) -> f64 {
		match &self.highlight {
			Some(h) if h.focus == idx => NODE_STROKE_FOCUSED,
			_ => NODE_STROKE,
		}
	}

	pub fn link_opacity(&self, link: usize) -> f64 {
		let Some(h) = &self.highlight else {
			return LINK_OPACITY;
		};
		match self.links.get(link) {
			Some(l) if l.source == h.focus || l.target == h.focus => LINK_FOCUSED,
			_ => LINK_DIMMED,
		}
	}

	pub fn tooltip_content(&self, idx: usize) -> Option<TooltipContent> {
		let node = self.nodes.get(idx)?;
		Some(TooltipContent {
			name: node.name.clone(),
			category: node.category.clone(),
			level: node.level,
			connections: self.connection_count(idx),
			importance: node.importance,
		})
	}

	/// Fades the tooltip in next to the pointer (page coordinates).
	pub fn show_tooltip(&mut self, idx: usize, page_x: f64, page_y: f64) {
		let opacity = self.tooltip.as_ref().map_or(0.0, |t| t.opacity);
		self.tooltip = Some(Tooltip {
			node: idx,
			left: page_x + 10.0,
			top: page_y - 28.0,
			opacity,
			target: TOOLTIP_OPACITY,
			rate: TOOLTIP_OPACITY / TOOLTIP_FADE_IN,
		});
	}

	pub fn hide_tooltip(&mut self) {
		if let Some(t) = &mut self.tooltip {
			t.target = 0.0;
			t.rate = TOOLTIP_OPACITY / TOOLTIP_FADE_OUT;
		}
	}

	pub fn hovered(&self) -> Option<usize> {
		self.tooltip.as_ref().filter(|t| t.target > 0.0).map(|t| t.node)
	}

	pub fn tooltip(&self) -> Option<TooltipView> {
		let t = self.tooltip.as_ref()?;
		Some(TooltipView {
			content: self.tooltip_content(t.node)?,
			left: t.left,
			top: t.top,
			opacity: t.opacity,
		})
	}

	/// Pins `idx` under the pointer and keeps the simulation warm.
	pub fn begin_drag(&mut self, idx: usize, sx: f64, sy: f64) {
		if self.drag.node.is_none() {
			self.engine.reheat();
		}
		self.drag = DragState {
			node: Some(idx),
			start_x: sx,
			start_y: sy,
			moved: false,
		};
		let at = self.position(idx);
		self.engine.pin(idx, at);
	}

	pub fn drag_to(&mut self, sx: f64, sy: f64) {
		let Some(idx) = self.drag.node else {
			return;
		};
		if !self.drag.moved
			&& (sx - self.drag.start_x).hypot(sy - self.drag.start_y) < DRAG_THRESHOLD
		{
			return;
		}
		self.drag.moved = true;
		let at = self.transform.invert(sx, sy);
		self.engine.pin(idx, at);
		if let Some(p) = self.positions.get_mut(idx) {
			*p = at;
		}
	}

	/// Releases the dragged node. Returns it when the pointer never moved,
	/// which makes the gesture a click.
	pub fn end_drag(&mut self) -> Option<usize> {
		let drag = std::mem::take(&mut self.drag);
		let idx = drag.node?;
		self.engine.unpin(idx);
		self.engine.cool();
		(!drag.moved).then_some(idx)
	}

	pub fn begin_pan(&mut self, sx: f64, sy: f64) {
		self.transition = None;
		self.pan = PanState {
			active: true,
			start_x: sx,
			start_y: sy,
			transform_start_x: self.transform.x,
			transform_start_y: self.transform.y,
		};
	}

	pub fn pan_to(&mut self, sx: f64, sy: f64) {
		if self.pan.active {
			self.transform.x = self.pan.transform_start_x + (sx - self.pan.start_x);
			self.transform.y = self.pan.transform_start_y + (sy - self.pan.start_y);
		}
	}

	pub fn end_pan(&mut self) {
		self.pan.active = false;
	}

	/// Zooms around the screen point `(sx, sy)`, within the scale extent.
	pub fn zoom_at(&mut self, sx: f64, sy: f64, factor: f64) {
		self.transition = None;
		let k = (self.transform.k * factor).clamp(self.config.min_scale, self.config.max_scale);
		let ratio = k / self.transform.k;
		self.transform.x = sx - (sx - self.transform.x) * ratio;
		self.transform.y = sy - (sy - self.transform.y) * ratio;
		self.transform.k = k;
	}

	fn animate_to(&mut self, to: ViewTransform) {
		self.transition = Some(Transition {
			from: self.transform,
			to,
			elapsed: 0.0,
			duration: self.config.transition.as_secs_f64(),
		});
	}

	pub fn reset_view(&mut self) {
		self.animate_to(ViewTransform::IDENTITY);
	}

	/// Transform that fits every node into 80% of the viewport.
	pub fn fit_transform(&self) -> Option<ViewTransform> {
		let first = self.positions.first()?;
		let (mut min, mut max) = (*first, *first);
		for p in &self.positions {
			min.x = min.x.min(p.x);
			min.y = min.y.min(p.y);
			max.x = max.x.max(p.x);
			max.y = max.y.max(p.y);
		}
		let (w, h) = ((max.x - min.x).max(1.0), (max.y - min.y).max(1.0));
		let mid = Point::new((min.x + max.x) / 2.0, (min.y + max.y) / 2.0);
		let k = ((self.width / w).min(self.height / h) * 0.8)
			.clamp(self.config.min_scale, self.config.max_scale);
		Some(ViewTransform {
			x: self.width / 2.0 - k * mid.x,
			y: self.height / 2.0 - k * mid.y,
			k,
		})
	}

	pub fn center_view(&mut self) {
		if let Some(to) = self.fit_transform() {
			self.animate_to(to);
		}
	}

	/// Advances physics, view animation, tooltip fade and the highlight
	/// timer by `dt` seconds.
	pub fn tick(&mut self, dt: f64) {
		if self.engine.is_running() {
			self.engine.step(dt.min(MAX_PHYSICS_STEP));
			self.positions = self.engine.positions();
		}

		if let Some(h) = &mut self.highlight {
			h.remaining -= dt;
			if h.remaining <= 1e-9 {
				self.highlight = None;
			}
		}

		if let Some(t) = &mut self.tooltip {
			let step = t.rate * dt;
			if t.opacity < t.target {
				t.opacity = (t.opacity + step).min(t.target);
			} else {
				t.opacity = (t.opacity - step).max(t.target);
			}
			if t.target == 0.0 && t.opacity == 0.0 {
				self.tooltip = None;
			}
		}

		if let Some(tr) = &mut self.transition {
			tr.elapsed += dt;
			let t = if tr.duration > 0.0 {
				(tr.elapsed / tr.duration).min(1.0)
			} else {
				1.0
			};
			if t >= 1.0 {
				self.transform = tr.to;
				self.transition = None;
			} else {
				self.transform = tr.from.lerp(&tr.to, ease_in_out_cubic(t));
			}
		}
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
	}

	/// Halts the simulation; used on teardown.
	pub fn stop(&mut self) {
		self.engine.stop();
		self.drag = DragState::default();
		self.pan = PanState::default();
		self.tooltip = None;
	}
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use super::*;
	use crate::components::relation_graph::engine::FakeEngine;
	use crate::components::relation_graph::types::GraphLink;

	fn node(id: &str) -> GraphNode {
		GraphNode {
			id: id.into(),
			name: format!("node {id}"),
			category: "症狀".into(),
			level: 1,
			importance: 0.5,
			size: 10.0,
			color: "#dc3545".into(),
		}
	}

	fn link(source: &str, target: &str) -> GraphLink {
		GraphLink {
			source: source.into(),
			target: target.into(),
			relation_type: "symptom_to_cause".into(),
			strength: 0.7,
		}
	}

	/// a - b - c, a - d, e isolated.
	fn state() -> RelationGraphState<FakeEngine> {
		let data = GraphData {
			nodes: ["a", "b", "c", "d", "e"].iter().map(|id| node(id)).collect(),
			links: vec![link("a", "b"), link("b", "c"), link("d", "a")],
		};
		RelationGraphState::new(&data, 800.0, 600.0, GraphConfig::default(), FakeEngine::default())
	}

	#[test]
	fn forces_are_derived_from_data() {
		let s = state();
		let layout = &s.engine().layout;
		assert_eq!(layout.center, Point::new(400.0, 300.0));
		assert_eq!(layout.bodies[0].charge, -325.0);
		assert_eq!(layout.bodies[0].radius, 15.0);
		assert_eq!(layout.springs.len(), 3);
		assert_eq!(layout.springs[0].distance, link_distance(0.7));
	}

	#[test]
	fn links_to_unknown_nodes_are_skipped() {
		let data = GraphData {
			nodes: vec![node("a")],
			links: vec![link("a", "ghost")],
		};
		let s = RelationGraphState::new(&data, 100.0, 100.0, GraphConfig::default(), FakeEngine::default());
		assert!(s.links.is_empty());
	}

	#[test]
	fn click_highlights_one_hop_and_reverts_after_window() {
		let mut s = state();
		s.click(0);

		assert_eq!(s.node_opacity(0), NODE_OPACITY);
		assert_eq!(s.node_opacity(1), NODE_OPACITY);
		assert_eq!(s.node_opacity(3), NODE_OPACITY);
		assert_eq!(s.node_opacity(2), NODE_DIMMED);
		assert_eq!(s.node_opacity(4), NODE_DIMMED);
		assert_eq!(s.node_stroke(0), NODE_STROKE_FOCUSED);
		assert_eq!(s.node_stroke(1), NODE_STROKE);
		assert_eq!(s.link_opacity(0), LINK_FOCUSED);
		assert_eq!(s.link_opacity(2), LINK_FOCUSED);
		assert_eq!(s.link_opacity(1), LINK_DIMMED);

		s.tick(1.0);
		s.tick(1.0);
		assert!(s.is_highlighting());
		s.tick(1.0);
		assert!(!s.is_highlighting());
		for i in 0..5 {
			assert_eq!(s.node_opacity(i), NODE_OPACITY);
			assert_eq!(s.node_stroke(i), NODE_STROKE);
		}
		for l in 0..3 {
			assert_eq!(s.link_opacity(l), LINK_OPACITY);
		}
	}

	#[test]
	fn new_click_restarts_window() {
		let mut s = state();
		s.click(0);
		s.tick(2.5);
		s.click(2);
		s.tick(2.5);
		assert!(s.is_highlighting());
		assert_eq!(s.node_opacity(1), NODE_OPACITY);
		assert_eq!(s.node_opacity(0), NODE_DIMMED);
		s.tick(0.5);
		assert!(!s.is_highlighting());
	}

	#[test]
	fn tooltip_counts_connections_and_fades() {
		let mut s = state();
		s.show_tooltip(1, 100.0, 200.0);
		let view = s.tooltip().unwrap();
		assert_eq!(view.content.connections, 2);
		assert_eq!(view.content.name, "node b");
		assert_eq!((view.left, view.top), (110.0, 172.0));
		assert_eq!(view.opacity, 0.0);

		s.tick(0.2);
		assert!((s.tooltip().unwrap().opacity - 0.9).abs() < 1e-9);
		s.hide_tooltip();
		assert_eq!(s.hovered(), None);
		s.tick(0.25);
		assert!((s.tooltip().unwrap().opacity - 0.45).abs() < 1e-9);
		s.tick(0.3);
		assert!(s.tooltip().is_none());
	}

	#[test]
	fn drag_pins_and_releases() {
		let mut s = state();
		let start = s.position(0);
		s.begin_drag(0, start.x, start.y);
		assert_eq!(s.engine().heat, 1);
		s.drag_to(start.x + 40.0, start.y);
		assert_eq!(s.engine().pinned[&0], Point::new(start.x + 40.0, start.y));
		assert_eq!(s.end_drag(), None);
		assert!(s.engine().pinned.is_empty());
		assert_eq!(s.engine().heat, 0);
	}

	#[test]
	fn press_without_movement_is_a_click() {
		let mut s = state();
		let p = s.position(2);
		assert_eq!(s.node_at_position(p.x + 2.0, p.y), Some(2));
		s.begin_drag(2, p.x, p.y);
		s.drag_to(p.x + 1.0, p.y + 1.0);
		assert_eq!(s.end_drag(), Some(2));
	}

	#[test]
	fn zoom_is_clamped_to_scale_extent() {
		let mut s = state();
		for _ in 0..50 {
			s.zoom_at(400.0, 300.0, 1.5);
		}
		assert_eq!(s.transform.k, 4.0);
		for _ in 0..100 {
			s.zoom_at(0.0, 0.0, 0.5);
		}
		assert_eq!(s.transform.k, 0.1);
	}

	#[test]
	fn reset_animates_back_to_identity() {
		let mut s = state();
		s.zoom_at(100.0, 100.0, 2.0);
		s.reset_view();
		s.tick(0.3);
		assert_ne!(s.transform, ViewTransform::IDENTITY);
		s.tick(0.5);
		assert_eq!(s.transform, ViewTransform::IDENTITY);
	}

	#[test]
	fn center_fits_bounding_box() {
		let mut s = state();
		s.engine.points = vec![
			Point::new(0.0, 0.0),
			Point::new(200.0, 0.0),
			Point::new(200.0, 100.0),
			Point::new(0.0, 100.0),
			Point::new(100.0, 50.0),
		];
		s.tick(0.0);
		let fit = s.fit_transform().unwrap();
		// min(800/200, 600/100) * 0.8 = 3.2
		assert!((fit.k - 3.2).abs() < 1e-9);
		assert!((fit.x - (400.0 - 3.2 * 100.0)).abs() < 1e-9);
		assert!((fit.y - (300.0 - 3.2 * 50.0)).abs() < 1e-9);

		s.center_view();
		s.tick(Duration::from_millis(750).as_secs_f64());
		assert_eq!(s.transform, fit);
	}

	#[test]
	fn stop_halts_engine() {
		let mut s = state();
		s.tick(0.016);
		assert_eq!(s.engine().steps, 1);
		s.stop();
		s.tick(0.016);
		assert_eq!(s.engine().steps, 1);
	}

	#[test]
	fn highlight_window_tracks_elapsed_time_at_high_refresh() {
		let mut s = state();
		s.click(0);
		let frame = 1.0 / 144.0;
		for _ in 0..425 {
			s.tick(frame);
		}
		assert!(s.is_highlighting());
		for _ in 0..15 {
			s.tick(frame);
		}
		assert!(!s.is_highlighting());
	}

	#[test]
	fn long_frame_expires_timers_but_clamps_physics() {
		let mut s = state();
		s.click(0);
		s.tick(3.0);
		assert!(!s.is_highlighting());
		assert_eq!(s.engine().last_dt, MAX_PHYSICS_STEP);
	}
}
