mod categories;
mod component;
mod state;
mod types;

pub use categories::{CATEGORY_COLORS, category_color, manual_tag};
pub use component::TagAutocomplete;
pub use state::{AutocompleteState, KeyOutcome, NavKey, Phase};
pub use types::Tag;
