mod component;
mod engine;
mod render;
mod state;
mod types;

pub use component::RelationGraph;
pub use types::{GraphData, GraphLink, GraphNode};
