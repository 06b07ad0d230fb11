//! Layout physics behind a small trait.
//!
//! The graph state only tells the engine what forces to apply and when to
//! pin, heat or cool nodes; the engine owns positions. Production code uses
//! [`ForceGraphEngine`], a wrapper over the `force_graph` crate.

use force_graph::{DefaultNodeIdx, EdgeData, ForceGraph, NodeData, SimulationParameters};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
	pub x: f64,
	pub y: f64,
}

impl Point {
	pub fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}

	pub fn distance(self, other: Point) -> f64 {
		((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
	}
}

/// Per-node forces.
#[derive(Clone, Debug, PartialEq)]
pub struct Body {
	/// Negative values repel.
	pub charge: f64,
	pub radius: f64,
	pub start: Point,
}

/// Per-link forces, by node index.
#[derive(Clone, Debug, PartialEq)]
pub struct Spring {
	pub source: usize,
	pub target: usize,
	pub distance: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Layout {
	pub bodies: Vec<Body>,
	pub springs: Vec<Spring>,
	pub center: Point,
}

/// Stronger links are shorter: 150 at strength 0, 50 at strength 1.
pub fn link_distance(strength: f64) -> f64 {
	50.0 + (1.0 - strength.clamp(0.0, 1.0)) * 100.0
}

pub fn node_charge(importance: f64) -> f64 {
	-300.0 - importance * 50.0
}

pub fn collision_radius(size: f64) -> f64 {
	size + 5.0
}

pub trait LayoutEngine {
	/// Replaces the simulated graph and starts it hot.
	fn load(&mut self, layout: &Layout);
	/// Advances the simulation by `dt` seconds if it is running.
	fn step(&mut self, dt: f64);
	/// Current positions, indexed like [`Layout::bodies`].
	fn positions(&self) -> Vec<Point>;
	/// Fixes a node at `at` until [`LayoutEngine::unpin`].
	fn pin(&mut self, node: usize, at: Point);
	fn unpin(&mut self, node: usize);
	/// Keeps the simulation moving, e.g. while dragging.
	fn reheat(&mut self);
	/// Lets the simulation settle and stop.
	fn cool(&mut self);
	fn stop(&mut self);
	fn is_running(&self) -> bool;
}

const ALPHA_MIN: f64 = 0.001;
const ALPHA_DECAY: f64 = 0.0228;
const REHEAT_TARGET: f64 = 0.3;
/// Charge units per unit of `force_graph` mass; the default charge maps to 10.
const CHARGE_PER_MASS: f64 = 30.0;
const SPRING_NUDGE: f64 = 0.05;

#[derive(Clone, Copy, Debug, Default)]
struct Slot(usize);

/// [`LayoutEngine`] over `force_graph`.
///
/// `force_graph` provides charge repulsion (scaled by mass) and springs.
/// Link rest lengths, centering and collision are not part of that crate,
/// so they are applied as a position correction after each update.
pub struct ForceGraphEngine {
	graph: ForceGraph<Slot, ()>,
	radii: Vec<f64>,
	springs: Vec<Spring>,
	center: Point,
	alpha: f64,
	alpha_target: f64,
	stopped: bool,
}

fn parameters() -> SimulationParameters {
	SimulationParameters {
		force_charge: 150.0,
		force_spring: 0.05,
		force_max: 100.0,
		node_speed: 3000.0,
		damping_factor: 0.9,
	}
}

impl Default for ForceGraphEngine {
	fn default() -> Self {
		Self::new()
	}
}

impl ForceGraphEngine {
	pub fn new() -> Self {
		Self {
			graph: ForceGraph::new(parameters()),
			radii: Vec::new(),
			springs: Vec::new(),
			center: Point::default(),
			alpha: 0.0,
			alpha_target: 0.0,
			stopped: true,
		}
	}

	fn snapshot(&self) -> (Vec<Point>, Vec<bool>) {
		let mut points = vec![Point::default(); self.radii.len()];
		let mut anchored = vec![false; self.radii.len()];
		self.graph.visit_nodes(|node| {
			let slot = node.data.user_data.0;
			points[slot] = Point::new(node.x() as f64, node.y() as f64);
			anchored[slot] = node.data.is_anchor;
		});
		(points, anchored)
	}

	fn constrain(&mut self) {
		let (mut points, anchored) = self.snapshot();
		let n = points.len();
		if n == 0 {
			return;
		}

		for spring in &self.springs {
			let (a, b) = (points[spring.source], points[spring.target]);
			let d = a.distance(b);
			if d < 1e-6 {
				continue;
			}
			let k = (d - spring.distance) / d * SPRING_NUDGE * 0.5;
			let (dx, dy) = ((b.x - a.x) * k, (b.y - a.y) * k);
			if !anchored[spring.source] {
				points[spring.source].x += dx;
				points[spring.source].y += dy;
			}
			if !anchored[spring.target] {
				points[spring.target].x -= dx;
				points[spring.target].y -= dy;
			}
		}

		let (sx, sy) = points.iter().fold((0.0, 0.0), |(x, y), p| (x + p.x, y + p.y));
		let (shift_x, shift_y) = (self.center.x - sx / n as f64, self.center.y - sy / n as f64);
		for (point, _) in points.iter_mut().zip(&anchored).filter(|(_, a)| !**a) {
			point.x += shift_x;
			point.y += shift_y;
		}

		for i in 0..n {
			for j in (i + 1)..n {
				let min = self.radii[i] + self.radii[j];
				let d = points[i].distance(points[j]);
				if d >= min || d < 1e-6 {
					continue;
				}
				let push = (min - d) / d * 0.5;
				let (dx, dy) = (
					(points[j].x - points[i].x) * push,
					(points[j].y - points[i].y) * push,
				);
				if !anchored[i] {
					points[i].x -= dx;
					points[i].y -= dy;
				}
				if !anchored[j] {
					points[j].x += dx;
					points[j].y += dy;
				}
			}
		}

		self.graph.visit_nodes_mut(|node| {
			if node.data.is_anchor {
				return;
			}
			let p = points[node.data.user_data.0];
			node.data.x = p.x as f32;
			node.data.y = p.y as f32;
		});
	}
}

impl LayoutEngine for ForceGraphEngine {
	fn load(&mut self, layout: &Layout) {
		self.graph = ForceGraph::new(parameters());
		let indices: Vec<DefaultNodeIdx> = layout
			.bodies
			.iter()
			.enumerate()
			.map(|(slot, body)| {
				self.graph.add_node(NodeData {
					x: body.start.x as f32,
					y: body.start.y as f32,
					mass: (body.charge.abs() / CHARGE_PER_MASS) as f32,
					is_anchor: false,
					user_data: Slot(slot),
				})
			})
			.collect();
		for spring in &layout.springs {
			self.graph.add_edge(
				indices[spring.source],
				indices[spring.target],
				EdgeData::default(),
			);
		}
		self.radii = layout.bodies.iter().map(|b| b.radius).collect();
		self.springs = layout.springs.clone();
		self.center = layout.center;
		self.alpha = 1.0;
		self.alpha_target = 0.0;
		self.stopped = false;
	}

	fn step(&mut self, dt: f64) {
		if !self.is_running() {
			return;
		}
		self.graph.update(dt as f32);
		self.constrain();
		self.alpha += (self.alpha_target - self.alpha) * ALPHA_DECAY;
	}

	fn positions(&self) -> Vec<Point> {
		self.snapshot().0
	}

	fn pin(&mut self, node: usize, at: Point) {
		self.graph.visit_nodes_mut(|n| {
			if n.data.user_data.0 == node {
				n.data.x = at.x as f32;
				n.data.y = at.y as f32;
				n.data.is_anchor = true;
			}
		});
	}

	fn unpin(&mut self, node: usize) {
		self.graph.visit_nodes_mut(|n| {
			if n.data.user_data.0 == node {
				n.data.is_anchor = false;
			}
		});
	}

	fn reheat(&mut self) {
		self.alpha_target = REHEAT_TARGET;
		self.alpha = self.alpha.max(ALPHA_MIN * 2.0);
		self.stopped = false;
	}

	fn cool(&mut self) {
		self.alpha_target = 0.0;
	}

	fn stop(&mut self) {
		self.stopped = true;
	}

	fn is_running(&self) -> bool {
		!self.stopped && self.alpha >= ALPHA_MIN
	}
}

#[cfg(test)]
pub use fake::FakeEngine;


#[cfg(test)]
mod tests {
	use super::*;

	fn body(x: f64, y: f64) -> Body {
		Body {
			charge: node_charge(0.0),
			radius: collision_radius(10.0),
			start: Point::new(x, y),
		}
	}

	#[test]
	fn force_parameters_follow_node_and_link_data() {
		assert_eq!(link_distance(1.0), 50.0);
		assert_eq!(link_distance(0.0), 150.0);
		assert_eq!(link_distance(0.5), 100.0);
		assert_eq!(node_charge(2.0), -400.0);
		assert_eq!(collision_radius(12.0), 17.0);
	}

	#[test]
	fn overlapping_nodes_are_pushed_apart() {
		let mut engine = ForceGraphEngine::new();
		engine.load(&Layout {
			bodies: vec![body(100.0, 100.0), body(101.0, 100.0)],
			springs: vec![],
			center: Point::new(100.0, 100.0),
		});
		let before = engine.positions();
		engine.step(0.016);
		let after = engine.positions();
		assert_eq!(after.len(), 2);
		assert!(after[0].distance(after[1]) > before[0].distance(before[1]));
	}

	#[test]
	fn pinned_node_stays_put() {
		let mut engine = ForceGraphEngine::new();
		engine.load(&Layout {
			bodies: vec![body(0.0, 0.0), body(50.0, 0.0), body(0.0, 50.0)],
			springs: vec![Spring {
				source: 0,
				target: 1,
				distance: 50.0,
			}],
			center: Point::new(0.0, 0.0),
		});
		engine.pin(2, Point::new(300.0, 300.0));
		for _ in 0..10 {
			engine.step(0.016);
		}
		assert_eq!(engine.positions()[2], Point::new(300.0, 300.0));
	}

	#[test]
	fn cools_down_and_stops() {
		let mut engine = ForceGraphEngine::new();
		engine.load(&Layout {
			bodies: vec![body(0.0, 0.0)],
			springs: vec![],
			center: Point::default(),
		});
		assert!(engine.is_running());
		for _ in 0..1000 {
			engine.step(0.016);
		}
		assert!(!engine.is_running());
		engine.reheat();
		assert!(engine.is_running());
		engine.stop();
		assert!(!engine.is_running());
	}
}
