//! Reusable UI pieces mounted by the pages.

pub mod notifications;
pub mod relation_graph;
pub mod tag_autocomplete;

pub use notifications::NotificationStack;
pub use relation_graph::RelationGraph;
pub use tag_autocomplete::TagAutocomplete;
