use serde::Deserialize;

fn default_size() -> f64 {
	10.0
}

fn default_color() -> String {
	"#6c757d".into()
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct GraphNode {
	pub id: String,
	pub name: String,
	#[serde(default)]
	pub category: String,
	/// Hierarchy depth; level 0 nodes are roots.
	#[serde(default)]
	pub level: u32,
	#[serde(default)]
	pub importance: f64,
	#[serde(default = "default_size")]
	pub size: f64,
	#[serde(default = "default_color")]
	pub color: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct GraphLink {
	pub source: String,
	pub target: String,
	#[serde(default)]
	pub relation_type: String,
	/// `0.0..=1.0`; stronger links are shorter.
	#[serde(default)]
	pub strength: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct GraphData {
	#[serde(default)]
	pub nodes: Vec<GraphNode>,
	#[serde(default)]
	pub links: Vec<GraphLink>,
}

impl GraphData {
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}
}
